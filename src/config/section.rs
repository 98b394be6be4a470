//! Typed projections of a loaded configuration document.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Read-only view of one subsection of a shared document.
///
/// A section keeps the document it was taken from alive, so it stays
/// consistent even if the singleton is reloaded while it is held.
pub struct Section<C, T: ?Sized> {
    document: Arc<C>,
    project: fn(&C) -> &T,
}

impl<C, T: ?Sized> Section<C, T> {
    pub(crate) fn new(document: Arc<C>, project: fn(&C) -> &T) -> Self {
        Self { document, project }
    }

    /// The whole document this section was projected from.
    pub fn document(&self) -> &Arc<C> {
        &self.document
    }
}

impl<C, T: ?Sized> Deref for Section<C, T> {
    type Target = T;

    fn deref(&self) -> &T {
        (self.project)(&self.document)
    }
}

impl<C, T: ?Sized> Clone for Section<C, T> {
    fn clone(&self) -> Self {
        Self {
            document: Arc::clone(&self.document),
            project: self.project,
        }
    }
}

impl<C, T> fmt::Debug for Section<C, T>
where
    T: fmt::Debug + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<C, T> PartialEq for Section<C, T>
where
    T: PartialEq + ?Sized,
{
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<C, T> Eq for Section<C, T> where T: Eq + ?Sized {}
