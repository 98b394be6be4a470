//! Document parsing — turns the raw text of the backing file into a typed,
//! validated configuration.

use std::path::Path;

use serde::de::DeserializeOwned;

use super::ConfigError;

/// Semantic checks run after a document has been deserialized.
pub trait Validate {
    /// Returns a human readable reason when the value is not acceptable.
    fn validate(&self) -> Result<(), String>;
}

/// Parser used by a [`ConfigSingleton`](super::ConfigSingleton) to build its
/// instance from the document text.
pub trait DocumentParser<C>: Send + Sync {
    /// Parse and validate `text`, read from `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for syntactically invalid input and
    /// [`ConfigError::Validation`] for input that does not fit the schema.
    fn parse(&self, path: &Path, text: &str) -> Result<C, ConfigError>;
}

/// YAML parser backed by [`serde_yaml`].
///
/// Parsing happens in two steps so that syntax errors and schema errors map to
/// different error kinds: the text is first read into a [`serde_yaml::Value`],
/// then deserialized into `C` and validated.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl<C> DocumentParser<C> for YamlParser
where
    C: DeserializeOwned + Validate,
{
    fn parse(&self, path: &Path, text: &str) -> Result<C, ConfigError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })?;

        let document: C = serde_yaml::from_value(value).map_err(|e| ConfigError::Validation {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;

        document
            .validate()
            .map_err(|reason| ConfigError::Validation {
                path: path.to_owned(),
                reason,
            })?;

        Ok(document)
    }
}
