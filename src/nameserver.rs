//! Steering DNS traffic to the local resolver.
//!
//! Two independent mechanisms are provided:
//!
//! * [`Nameserver::use_dns_system_wide`] rewrites the `nameserver` entries of the system
//!   resolver configuration file (`/etc/resolv.conf` by default), affecting every process in the
//!   container.
//! * [`use_dns_internally`] only affects this process: it installs a process-wide
//!   [`InternalResolver`] that [`lookup_ip`] (and therefore the
//!   [HTTP transport][crate::transport::HyperClient]) uses instead of the OS resolver.

use crate::error::Error;
use lazy_static::lazy_static;
use std::io;
use std::io::SeekFrom;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use trust_dns_resolver::config::{
    NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts,
};
use trust_dns_resolver::TokioAsyncResolver;

const NAMESERVER_PREFIX: &str = "nameserver ";
const DNS_PORT: u16 = 53;

lazy_static! {
    // Held across the whole read-modify-write of the resolver configuration file.
    static ref RESOLV_CONF_LOCK: Mutex<()> = Mutex::new(());

    // Set by `use_dns_internally`, never reset.
    static ref INTERNAL_RESOLVER: RwLock<Option<Arc<InternalResolver>>> = RwLock::new(None);
}

/// Rewrites the system resolver configuration file.
#[derive(Debug, Clone)]
pub struct Nameserver {
    resolv_conf_path: PathBuf,
}

impl Nameserver {
    #[must_use]
    pub fn new(resolv_conf_path: impl Into<PathBuf>) -> Self {
        Self {
            resolv_conf_path: resolv_conf_path.into(),
        }
    }

    /// Point the system resolver configuration at `ip`, see [`rewrite_resolv_conf`] for how the
    /// content is changed.
    ///
    /// The file is opened once, read in full, then truncated and rewritten through the same
    /// handle. Concurrent calls within this process are serialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be opened, read or written. A write failure
    /// after the truncation leaves the file empty or partially written.
    pub async fn use_dns_system_wide(
        &self,
        ip: IpAddr,
        keep_nameserver: bool,
    ) -> Result<(), Error> {
        let _guard = RESOLV_CONF_LOCK.lock().await;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.resolv_conf_path)
            .await?;
        let mut content = Vec::new();
        file.read_to_end(&mut content).await?;

        let content = rewrite_resolv_conf(&content, ip, keep_nameserver);
        file.set_len(0).await?;
        file.seek(SeekFrom::Start(0)).await?;
        file.write_all(&content).await?;
        file.flush().await?;

        tracing::info!(
            path = %self.resolv_conf_path.display(),
            "using DNS server {ip} system wide"
        );
        Ok(())
    }
}

/// Returns `content` with its nameserver lines pointed at `ip`.
///
/// Unless `keep_nameserver` is set, every line starting with `nameserver ` is replaced by
/// `nameserver <ip>`. A `nameserver <ip>` line is appended only when `content` has no
/// nameserver line at all. Other lines keep their bytes and order, whatever their encoding.
/// The result always ends with a single newline.
#[must_use]
pub fn rewrite_resolv_conf(content: &[u8], ip: IpAddr, keep_nameserver: bool) -> Vec<u8> {
    let nameserver = format!("{NAMESERVER_PREFIX}{ip}");
    let content = content.strip_suffix(&b"\n"[..]).unwrap_or(content);
    let mut lines: Vec<&[u8]> = if content.is_empty() {
        Vec::new()
    } else {
        content.split(|&b| b == b'\n').collect()
    };

    let mut found = false;
    for line in &mut lines {
        if line.starts_with(NAMESERVER_PREFIX.as_bytes()) {
            found = true;
            if !keep_nameserver {
                *line = nameserver.as_bytes();
            }
        }
    }
    if !found {
        lines.push(nameserver.as_bytes());
    }

    let mut out = lines.join(&b'\n');
    out.push(b'\n');
    out
}

/// The process-wide resolver installed by [`use_dns_internally`]: plain DNS over UDP to a
/// single nameserver, ignoring the OS resolver configuration and hosts file.
#[derive(Clone)]
pub struct InternalResolver {
    resolver: TokioAsyncResolver,
}

impl InternalResolver {
    fn new(ip: IpAddr) -> Result<Self, trust_dns_resolver::error::ResolveError> {
        let udp_only: Vec<NameServerConfig> =
            NameServerConfigGroup::from_ips_clear(&[ip], DNS_PORT, true)
                .iter()
                .filter(|ns| ns.protocol == Protocol::Udp)
                .cloned()
                .collect();
        let config =
            ResolverConfig::from_parts(None, vec![], NameServerConfigGroup::from(udp_only));
        let mut opts = ResolverOpts::default();
        opts.use_hosts_file = false;
        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, opts)?,
        })
    }
}

/// Make every further name lookup of this process done through [`lookup_ip`] go to `ip:53`
/// over UDP.
///
/// The override lasts for the lifetime of the process. Calling this again replaces the
/// nameserver; there is no way to go back to the OS resolver.
pub fn use_dns_internally(ip: IpAddr) {
    match InternalResolver::new(ip) {
        Ok(resolver) => {
            *INTERNAL_RESOLVER
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(resolver));
            tracing::info!("using DNS server {ip} internally");
        }
        Err(err) => tracing::error!("cannot use DNS server {ip} internally: {err}"),
    }
}

/// The resolver installed by [`use_dns_internally`], if any.
#[must_use]
pub fn internal_resolver() -> Option<Arc<InternalResolver>> {
    INTERNAL_RESOLVER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Resolve `host` to its IP addresses, through the [`InternalResolver`] when one is installed
/// and through the OS resolver otherwise. IP literals are returned as is.
///
/// # Errors
///
/// Returns the underlying resolution failure as an [`io::Error`].
pub async fn lookup_ip(host: &str) -> io::Result<Vec<IpAddr>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }
    match internal_resolver() {
        Some(internal) => {
            let lookup = internal
                .resolver
                .lookup_ip(host)
                .await
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
            Ok(lookup.iter().collect())
        }
        None => Ok(tokio::net::lookup_host((host, 0))
            .await?
            .map(|addr| addr.ip())
            .collect()),
    }
}
