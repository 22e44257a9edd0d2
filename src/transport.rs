//! The narrow interfaces through which the core consumes the P2P transport
//! layer (DHT client, ADNL gateway, connector, downloader, prefetcher).
//!
//! None of this is implemented here -- the transport is an external
//! collaborator per the specification's scope. [`crate::mock`] provides a
//! deterministic in-memory implementation used by the test suite.

use std::time::Instant;

use async_trait::async_trait;

use crate::bag_id::BagId;

/// Byte offsets of a single file inside a bag's piece layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOffsets {
    pub from_piece: u32,
    pub from_piece_offset: u32,
    pub to_piece: u32,
    pub to_piece_offset: u32,
    pub size: u64,
    pub index: u32,
    pub name: String,
}

/// Error returned by a [`TorrentHandle`] or [`Connector`] operation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Other(#[source] anyhow::Error),
}

/// An opaque handle to a bag's torrent metadata and piece layout.
///
/// Created by [`Connector::new_torrent`], started in header-only mode by the
/// resolver, and owned thereafter by the bag cache.
#[async_trait]
pub trait TorrentHandle: Send + Sync {
    /// Whether the piece layout header has been loaded.
    fn header_loaded(&self) -> bool;
    /// Whether the torrent's info (size, description) has been loaded.
    fn info_loaded(&self) -> bool;
    fn description(&self) -> String;
    fn file_size(&self) -> u64;
    fn files_count(&self) -> u32;
    fn get_peers_count(&self) -> u32;
    fn get_file_offsets(&self, path: &str) -> Option<FileOffsets>;
    fn get_file_offsets_by_id(&self, index: u32) -> Option<FileOffsets>;

    /// Start the torrent. `header_only` mirrors the reference's
    /// `torrent.Start(true, false, false)` call for resolve-only use.
    async fn start(&self, header_only: bool) -> Result<(), TransportError>;
    async fn stop(&self);
}

/// An opaque handle to a live piece downloader for one torrent.
///
/// Must be closed exactly once, always by the bag cache (on eviction, clear,
/// or shutdown) and never by any other component.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn close(&self);
}

/// Creates torrents and downloaders bound to the shared virtual store and
/// P2P connector. One `Connector` is shared by an entire gateway instance.
#[async_trait]
pub trait Connector: Send + Sync {
    type Torrent: TorrentHandle + 'static;
    type Downloader: Downloader + 'static;

    /// Allocate a fresh, unstarted torrent handle bound to `bag_id`.
    fn new_torrent(&self, bag_id: BagId) -> Self::Torrent;

    /// Create a downloader for `torrent`, failing with
    /// [`TransportError::Timeout`] if `deadline` elapses first.
    async fn create_downloader(
        &self,
        torrent: &Self::Torrent,
        deadline: Instant,
    ) -> Result<Self::Downloader, TransportError>;
}
