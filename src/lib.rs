//! DOT Crab
//!
//! Bootstrap and supervision of an [Unbound] DNS over TLS resolver running in a container.
//!
//! At startup the orchestrator (the `dotcrab` binary):
//!
//! 1. downloads the [root hints and DNSSEC root key][roots] Unbound needs,
//! 2. [starts Unbound][unbound::Unbound::start] and forwards its output to the logs,
//! 3. points DNS at it, [for this process][nameserver::use_dns_internally] and/or
//!    [system wide][nameserver::Nameserver::use_dns_system_wide].
//!
//! The network, disk and process collaborators are behind the [`HttpClient`], [`FileManager`]
//! and [`Commander`] traits.
//!
//! [Unbound]: https://nlnetlabs.nl/projects/unbound/about/
//!
#![warn(clippy::pedantic)]

pub mod command;
pub mod config;
pub mod error;
pub mod nameserver;
pub mod roots;
pub mod store;
pub mod transport;
pub mod unbound;

pub use command::{Commander, Started, TokioCommander};
pub use config::{Config, Shared};
pub use nameserver::{use_dns_internally, Nameserver};
pub use roots::{RootsFetcher, TrustMaterial};
pub use store::{FileManager, OsFileManager};
pub use transport::{HttpClient, HyperClient};
pub use unbound::Unbound;
