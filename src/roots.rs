//! Trust material needed by Unbound at startup.
//!
//! Unbound needs two files before it can resolve and validate anything: the root hints (the
//! addresses of the DNS root servers) and the DNSSEC root trust anchor. [`RootsFetcher`]
//! downloads both from the configured URLs and replaces the configured files with the payload.
//! Each download only ever touches its own file.

use crate::config::Shared;
use crate::error::Error;
use crate::store::DynFileManager;
use crate::transport::DynHttpClient;
use std::fmt;
use std::path::Path;

/// Permission mode of newly created trust material files.
pub const TRUST_MATERIAL_MODE: u32 = 0o644;

const HTTP_STATUS_OK: u16 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustMaterial {
    RootHints,
    RootKey,
}

impl fmt::Display for TrustMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RootHints => "root hints",
            Self::RootKey => "root key",
        })
    }
}

#[derive(Clone)]
pub struct RootsFetcher {
    config: Shared,
    client: DynHttpClient,
    file_manager: DynFileManager,
}

impl RootsFetcher {
    #[must_use]
    pub fn new(config: Shared, client: DynHttpClient, file_manager: DynFileManager) -> Self {
        Self {
            config,
            client,
            file_manager,
        }
    }

    /// Download the root hints to [`Config::root_hints_path`][crate::config::Config].
    ///
    /// # Errors
    ///
    /// See [`RootsFetcher::download`].
    pub async fn download_root_hints(&self) -> Result<(), Error> {
        self.download(TrustMaterial::RootHints).await
    }

    /// Download the DNSSEC root key to [`Config::root_key_path`][crate::config::Config].
    ///
    /// # Errors
    ///
    /// See [`RootsFetcher::download`].
    pub async fn download_root_key(&self) -> Result<(), Error> {
        self.download(TrustMaterial::RootKey).await
    }

    /// Fetch `material` and replace its file with the response body. An empty body gives an
    /// empty file.
    ///
    /// # Errors
    ///
    /// Transport errors are returned unchanged, nothing is written.
    ///
    /// Returns [`Error::BadStatus`] if the server answers with anything but HTTP 200, nothing
    /// is written.
    ///
    /// Write errors from the [`FileManager`][crate::store::FileManager] are returned unchanged.
    pub async fn download(&self, material: TrustMaterial) -> Result<(), Error> {
        let (url, path) = self.source(material);
        tracing::info!("downloading {material} from {url}");
        let (content, status) = self.client.get(url).await?;
        if status != HTTP_STATUS_OK {
            return Err(Error::BadStatus {
                status,
                url: url.to_string(),
            });
        }
        self.file_manager
            .write_to_file(path, &content, TRUST_MATERIAL_MODE)
            .await
    }

    fn source(&self, material: TrustMaterial) -> (&str, &Path) {
        match material {
            TrustMaterial::RootHints => (
                self.config.root_hints_url.as_str(),
                self.config.root_hints_path.as_path(),
            ),
            TrustMaterial::RootKey => (
                self.config.root_key_url.as_str(),
                self.config.root_key_path.as_path(),
            ),
        }
    }
}
