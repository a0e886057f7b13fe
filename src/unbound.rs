//! Unbound process supervision.

use crate::command::{DynCommander, Started};
use crate::error::Error;
use std::path::PathBuf;

/// Name of the Unbound configuration file inside the Unbound configuration directory.
pub const UNBOUND_CONFIG_FILENAME: &str = "unbound.conf";

#[derive(Clone)]
pub struct Unbound {
    commander: DynCommander,
    etc_dir: PathBuf,
    path: PathBuf,
}

impl Unbound {
    #[must_use]
    pub fn new(
        commander: DynCommander,
        etc_dir: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            commander,
            etc_dir: etc_dir.into(),
            path: path.into(),
        }
    }

    /// Start Unbound in the foreground with its configuration file, logging at
    /// `verbosity_details_level` (`-v` repeated that many times, none for 0).
    ///
    /// # Errors
    ///
    /// Only spawn failures are returned. Once running, the outcome of the process arrives on
    /// [`Started::wait`].
    pub async fn start(&self, verbosity_details_level: u8) -> Result<Started, Error> {
        let args = self.start_args(verbosity_details_level);
        tracing::debug!("starting {} {}", self.path.display(), args.join(" "));
        self.commander.start(&self.path, &args).await
    }

    fn start_args(&self, verbosity_details_level: u8) -> Vec<String> {
        let config_path = self.etc_dir.join(UNBOUND_CONFIG_FILENAME);
        let mut args = vec![
            "-d".to_string(),
            "-c".to_string(),
            config_path.to_string_lossy().into_owned(),
        ];
        if verbosity_details_level > 0 {
            args.push(format!("-{}", "v".repeat(usize::from(verbosity_details_level))));
        }
        args
    }

    /// Query the version of the Unbound binary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Version`] wrapping the failure if `unbound -V` can't be run.
    ///
    /// Returns [`Error::VersionNotFound`] with the raw output if it holds no version.
    pub async fn version(&self) -> Result<String, Error> {
        let output = self
            .commander
            .run(&self.path, &["-V".to_string()])
            .await
            .map_err(|err| Error::Version(Box::new(err)))?;
        match parse_version(&output) {
            Some(version) => Ok(version.to_string()),
            None => Err(Error::VersionNotFound(output)),
        }
    }
}

/// Extracts the version from `unbound -V` output: the second word of a line containing
/// `"Version "`. When several lines match, the last one wins.
fn parse_version(output: &str) -> Option<&str> {
    output
        .split('\n')
        .filter(|line| line.contains("Version "))
        .filter_map(|line| line.split_whitespace().nth(1))
        .last()
}
