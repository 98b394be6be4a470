//! Lazily loaded, process-wide configuration instance.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use super::{
    CentralConfig, CommunicationsApiConfig, ConfigError, DocumentParser, EngineConfig,
    IndexerConfig, ManagementApiConfig, Section, ServerConfig, ServerInternalConfig, YamlParser,
};

/// Holds at most one parsed configuration document, read from `path` on first
/// access.
///
/// Loading is guarded by a mutex, so concurrent first accesses parse the file
/// exactly once. After that, every accessor is a read-locked clone of an
/// [`Arc`]. A failed load is not remembered; the next access tries again.
///
/// # Examples
///
/// ```rust,no_run
/// use ctxconf::config::{CentralConfig, ConfigSingleton};
///
/// let config: ConfigSingleton<CentralConfig> = ConfigSingleton::new("/etc/ctxconf/server.yml");
/// let server = config.server()?;
/// println!("node {} listening on {}", server.node.name, server.port);
/// # Ok::<(), ctxconf::config::ConfigError>(())
/// ```
pub struct ConfigSingleton<C, P = YamlParser> {
    path: PathBuf,
    parser: P,
    instance: RwLock<Option<Arc<C>>>,
    load_lock: Mutex<()>,
}

impl<C> ConfigSingleton<C, YamlParser> {
    /// Create an unloaded singleton reading YAML from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_parser(path, YamlParser)
    }
}

impl<C, P> ConfigSingleton<C, P> {
    /// Create an unloaded singleton reading from `path` with a custom parser.
    pub fn with_parser(path: impl Into<PathBuf>, parser: P) -> Self {
        return Self {
            path: path.into(),
            parser,
            instance: RwLock::new(None),
            load_lock: Mutex::new(()),
        };
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parser this singleton loads with.
    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Returns `true` once a document has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        self.instance.read().is_some()
    }
}

impl<C, P> ConfigSingleton<C, P>
where
    P: DocumentParser<C>,
{
    /// Load the document unless it is already loaded.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] if the file does not exist.
    /// - [`ConfigError::Io`] if it cannot be read.
    /// - [`ConfigError::Parse`] / [`ConfigError::Validation`] from the parser.
    pub fn load(&self) -> Result<(), ConfigError> {
        self.get().map(|_| ())
    }

    /// Return the loaded document, loading it first if needed.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn get(&self) -> Result<Arc<C>, ConfigError> {
        if let Some(config) = self.instance.read().as_ref() {
            return Ok(Arc::clone(config));
        }

        let _guard = self.load_lock.lock();
        // Another caller may have finished loading while we waited.
        if let Some(config) = self.instance.read().as_ref() {
            return Ok(Arc::clone(config));
        }

        let config = Arc::new(self.read_document()?);
        *self.instance.write() = Some(Arc::clone(&config));
        info!(path = %self.path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse the document again and swap it in as a whole.
    ///
    /// Readers see either the previous or the new instance, never a mix. On
    /// failure the previous instance, if any, stays in place.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn reload(&self) -> Result<Arc<C>, ConfigError> {
        let _guard = self.load_lock.lock();
        let config = Arc::new(self.read_document()?);
        let previous = self.instance.write().replace(Arc::clone(&config));
        info!(
            path = %self.path.display(),
            replaced = previous.is_some(),
            "configuration reloaded"
        );
        Ok(config)
    }

    /// Return a typed view of one part of the document, loading it first if
    /// needed.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn section<T>(&self, project: fn(&C) -> &T) -> Result<Section<C, T>, ConfigError>
    where
        T: ?Sized,
    {
        Ok(Section::new(self.get()?, project))
    }

    fn read_document(&self) -> Result<C, ConfigError> {
        self.try_read_document().inspect_err(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to load configuration");
        })
    }

    fn try_read_document(&self) -> Result<C, ConfigError> {
        if !self.path.exists() {
            return Err(ConfigError::NotFound {
                path: self.path.clone(),
            });
        }

        let text = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                ConfigError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        self.parser.parse(&self.path, &text)
    }
}

impl<P> ConfigSingleton<CentralConfig, P>
where
    P: DocumentParser<CentralConfig>,
{
    /// The `server` section.
    pub fn server(&self) -> Result<Section<CentralConfig, ServerConfig>, ConfigError> {
        self.section(|config| &config.server)
    }

    /// The `indexer` section.
    pub fn indexer(&self) -> Result<Section<CentralConfig, IndexerConfig>, ConfigError> {
        self.section(|config| &config.indexer)
    }

    /// The `communications_api` section.
    pub fn communications_api(
        &self,
    ) -> Result<Section<CentralConfig, CommunicationsApiConfig>, ConfigError> {
        self.section(|config| &config.communications_api)
    }

    /// The `management_api` section.
    pub fn management_api(
        &self,
    ) -> Result<Section<CentralConfig, ManagementApiConfig>, ConfigError> {
        self.section(|config| &config.management_api)
    }

    /// The `engine` section.
    pub fn engine(&self) -> Result<Section<CentralConfig, EngineConfig>, ConfigError> {
        self.section(|config| &config.engine)
    }

    /// Internal server settings derived from the `server` section.
    pub fn internal_server(&self) -> Result<ServerInternalConfig, ConfigError> {
        Ok(self.get()?.server.internal_config())
    }
}

impl<C, P> fmt::Debug for ConfigSingleton<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSingleton")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
