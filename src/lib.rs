//! Remote-storage bag cache and streaming engine.
//!
//! Resolves content-addressed "bag" identifiers to active P2P torrents,
//! caches them under an LRU policy, and streams individual files out of a
//! piece range with backpressure and cancellation. The P2P transport, local
//! storage daemon and HTTP front end are all external collaborators,
//! consumed here only through narrow traits ([`transport::Connector`],
//! [`local_storage::LocalStorageClient`], [`facade::BanStore`]).

pub mod bag_id;
pub mod cache;
pub mod config;
pub mod error;
pub mod facade;
pub mod lister;
pub mod local_storage;
pub mod metered;
pub mod metrics;
pub mod prefetch;
pub mod resolver;
pub mod single_flight;
pub mod streaming;
pub mod transport;

#[cfg(test)]
pub mod mock;


pub use bag_id::BagId;
pub use cache::BagCache;
pub use config::Config;
pub use error::GatewayError;
pub use facade::{BanStore, FilesServiceFacade, FolderInfo};
pub use lister::{BagInfo, FileEntry, FileLister};
pub use local_storage::{BagDetails, LocalStorageClient};
pub use resolver::BagResolver;
pub use single_flight::SingleFlightRegistry;
pub use streaming::{FileStream, StreamingPipeline};
pub use transport::{Connector, Downloader, TorrentHandle};
