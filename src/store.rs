//! File persistence for the trust material.
//!
//! [`FileManager`] is the seam between the [roots fetcher][crate::roots] and the disk, so the
//! fetcher can be exercised without touching the file system.

use crate::error::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// `DynFileManager` is a type alias for a [`FileManager`] shared between consumers through an
/// [`Arc`].
#[allow(clippy::module_name_repetitions)]
pub type DynFileManager = Arc<dyn FileManager + Send + Sync>;

/// An async trait describing whole-file writes.
#[async_trait::async_trait]
pub trait FileManager {
    /// Replace the content of the file at `path` with `data`, creating it with the given
    /// permission `mode` if it does not exist yet.
    async fn write_to_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<(), Error>;
}

/// A [`FileManager`] writing to the local file system with [`tokio::fs`].
#[derive(Default, Debug, Clone, Copy)]
pub struct OsFileManager;

#[async_trait::async_trait]
impl FileManager for OsFileManager {
    async fn write_to_file(&self, path: &Path, data: &[u8], mode: u32) -> Result<(), Error> {
        let mut f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(path)
            .await?;
        f.write_all(data).await?;
        f.flush().await?;
        Ok(())
    }
}
