//! Error types.

use std::process::ExitStatus;

/// Error enumerates the possible DOT Crab error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when the HTTP transport fails to reach a URL, e.g. on a connection refused or a
    /// name resolution failure. The message is the transport's own.
    #[error(transparent)]
    HTTP(#[from] hyper::Error),

    /// Returned when a configured URL can't be parsed as an HTTP request URI.
    #[error(transparent)]
    InvalidURI(#[from] hyper::http::uri::InvalidUri),

    /// Returned when an HTTP request does not complete within
    /// [`Config::http_timeout`][crate::config::Config::http_timeout].
    #[error("request to {0} timed out")]
    Timeout(String),

    /// Returned when a trust material download answers with anything other than HTTP 200 (OK).
    ///
    /// Callers may match on this exact message.
    #[error("HTTP status code is {status} for {url}")]
    BadStatus { status: u16, url: String },

    /// Returned when a generic IO error occurs: opening, reading or writing a file, or spawning
    /// a process.
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// Yielded on the [`Started::wait`][crate::command::Started::wait] completion signal when a
    /// supervised process exits unsuccessfully.
    #[error("process exited with {0}")]
    ExitStatus(ExitStatus),

    /// Returned when a synchronously run process exits unsuccessfully. Carries its combined
    /// output.
    #[error("{status}: {output}")]
    Command { status: ExitStatus, output: String },

    /// Returned when querying the Unbound version fails to run the binary.
    #[error("unbound version: {0}")]
    Version(#[source] Box<Error>),

    /// Returned when no version could be found in the output of `unbound -V`. Carries the raw
    /// output.
    #[error("unbound version was not found in {0:?}")]
    VersionNotFound(String),

    /// Returned when the [configuration file][crate::config::Config::try_from_file] is not
    /// valid JSON.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the configuration deserializes but holds unusable values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_status_message() {
        let err = Error::BadStatus {
            status: 400,
            url: "https://example.com/root.key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP status code is 400 for https://example.com/root.key"
        );
    }

    #[test]
    fn io_errors_are_transparent() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "error").into();
        assert_eq!(err.to_string(), "error");
    }

    #[test]
    fn version_wraps_inner_message() {
        let inner: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "error").into();
        let err = Error::Version(Box::new(inner));
        assert_eq!(err.to_string(), "unbound version: error");
    }

    #[test]
    fn version_not_found_quotes_output() {
        assert_eq!(
            Error::VersionNotFound(String::new()).to_string(),
            r#"unbound version was not found in """#
        );
        assert_eq!(
            Error::VersionNotFound("a\nb".to_string()).to_string(),
            r#"unbound version was not found in "a\nb""#
        );
    }
}
