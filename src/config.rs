use crate::error::Error;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub type Shared = Arc<Config>;

/// Unbound verbosity tops out at 5 (`-vvvvv`).
pub const MAX_VERBOSITY_DETAILS_LEVEL: u8 = 5;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub root_hints_url: String,
    pub root_key_url: String,
    pub root_hints_path: PathBuf,
    pub root_key_path: PathBuf,
    pub unbound_etc_dir: PathBuf,
    pub unbound_path: PathBuf,
    pub resolv_conf_path: PathBuf,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub http_timeout: Duration,
    pub verbosity_details_level: u8,
    pub keep_nameserver: bool,
    pub resolver_ip: IpAddr,
    pub use_dns_internally: bool,
    pub use_dns_system_wide: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_hints_url: "https://raw.githubusercontent.com/qdm12/files/master/named.root.updated"
                .to_string(),
            root_key_url: "https://raw.githubusercontent.com/qdm12/files/master/root.key.updated"
                .to_string(),
            root_hints_path: PathBuf::from("/unbound/root.hints"),
            root_key_path: PathBuf::from("/unbound/root.key"),
            unbound_etc_dir: PathBuf::from("/unbound"),
            unbound_path: PathBuf::from("/unbound/unbound"),
            resolv_conf_path: PathBuf::from("/etc/resolv.conf"),
            http_timeout: Duration::from_secs(10),
            verbosity_details_level: 0,
            keep_nameserver: false,
            resolver_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            use_dns_internally: true,
            use_dns_system_wide: true,
        }
    }
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.validate()?;
        Ok(conf)
    }

    fn validate(&self) -> Result<(), Error> {
        for url in [&self.root_hints_url, &self.root_key_url] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::InvalidConfig(format!(
                    "URL {url} must use the http or https scheme"
                )));
            }
        }
        if self.verbosity_details_level > MAX_VERBOSITY_DETAILS_LEVEL {
            return Err(Error::InvalidConfig(format!(
                "verbosity details level {} is above {MAX_VERBOSITY_DETAILS_LEVEL}",
                self.verbosity_details_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(json: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn empty_object_uses_defaults() {
        let f = config_file("{}");
        let c = Config::try_from_file(f.path()).unwrap();
        assert_eq!(c.root_hints_path, PathBuf::from("/unbound/root.hints"));
        assert_eq!(c.resolv_conf_path, PathBuf::from("/etc/resolv.conf"));
        assert_eq!(c.http_timeout, Duration::from_secs(10));
        assert_eq!(c.resolver_ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(!c.keep_nameserver);
    }

    #[test]
    fn overrides() {
        let f = config_file(
            r#"{
                "unbound_etc_dir": "/etc/unbound",
                "http_timeout": 3,
                "verbosity_details_level": 2,
                "keep_nameserver": true,
                "resolver_ip": "::1"
            }"#,
        );
        let c = Config::try_from_file(f.path()).unwrap();
        assert_eq!(c.unbound_etc_dir, PathBuf::from("/etc/unbound"));
        assert_eq!(c.http_timeout, Duration::from_secs(3));
        assert_eq!(c.verbosity_details_level, 2);
        assert!(c.keep_nameserver);
        assert_eq!(c.resolver_ip, "::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn rejects_bad_scheme() {
        let f = config_file(r#"{"root_key_url": "ftp://example.com/root.key"}"#);
        assert!(matches!(
            Config::try_from_file(f.path()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_high_verbosity() {
        let f = config_file(r#"{"verbosity_details_level": 9}"#);
        assert!(matches!(
            Config::try_from_file(f.path()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_invalid_json() {
        let f = config_file("{");
        assert!(matches!(
            Config::try_from_file(f.path()),
            Err(Error::InvalidJSON(_))
        ));
    }
}
