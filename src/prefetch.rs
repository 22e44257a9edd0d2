//! Component D: the piece prefetch adapter contract.
//!
//! The core does not implement the prefetch algorithm (out-of-order window
//! fetching, peer selection, retry) -- only this contract, driven
//! sequentially by [`crate::streaming::StreamingPipeline`], and a
//! deterministic mock used by tests (see [`crate::mock`]).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::transport::{Downloader, TorrentHandle};

#[derive(Debug, thiserror::Error)]
pub enum PrefetchError {
    #[error("prefetch cancelled")]
    Cancelled,
    #[error("failed to fetch piece {piece}: {source}")]
    Fetch {
        piece: u32,
        #[source]
        source: anyhow::Error,
    },
}

/// A windowed pipeline that requests pieces ahead of consumption and
/// delivers them back in the order [`Prefetcher::get`] is called, regardless
/// of the order they actually arrive over the network.
#[async_trait]
pub trait Prefetcher: Send + Sync {
    async fn get(&self, piece_index: u32) -> Result<Bytes, PrefetchError>;
    async fn stop(&self);
}

/// Builds a [`Prefetcher`] bound to one torrent/downloader pair and a fixed
/// piece range.
#[async_trait]
pub trait PrefetcherFactory: Send + Sync {
    async fn new_prefetcher(
        &self,
        ctx: CancellationToken,
        torrent: Arc<dyn TorrentHandle>,
        downloader: Arc<dyn Downloader>,
        window: usize,
        pieces: Vec<u32>,
    ) -> Arc<dyn Prefetcher>;
}
