//! Component C: resolves a bag id to an active `(torrent, downloader)` pair.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::timeout_at;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bag_id::BagId;
use crate::cache::BagCache;
use crate::config::DOWNLOADER_DEADLINE;
use crate::error::ResolveError;
use crate::metrics::GatewayMetrics;
use crate::single_flight::SingleFlightRegistry;
use crate::transport::{Connector, Downloader, TorrentHandle, TransportError};

pub struct BagResolver<C: Connector> {
    cache: Arc<BagCache>,
    single_flight: Arc<SingleFlightRegistry>,
    connector: Arc<C>,
    metrics: Arc<GatewayMetrics>,
}

impl<C: Connector> BagResolver<C> {
    pub fn new(
        cache: Arc<BagCache>,
        single_flight: Arc<SingleFlightRegistry>,
        connector: Arc<C>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            cache,
            single_flight,
            connector,
            metrics,
        }
    }

    /// Resolves `bag_id` to an active torrent/downloader pair, coordinating
    /// concurrent callers through the single-flight registry.
    pub async fn resolve(
        &self,
        ctx: &CancellationToken,
        bag_id: BagId,
    ) -> Result<(Arc<dyn TorrentHandle>, Arc<dyn Downloader>), ResolveError> {
        if let Some(hit) = self.cache.get(&bag_id) {
            return Ok(hit);
        }

        let _guard = self.single_flight.lock_for(bag_id).await;

        if let Some(hit) = self.cache.get(&bag_id) {
            return Ok(hit);
        }

        if ctx.is_cancelled() {
            debug!(%bag_id, "resolve cancelled before torrent creation");
            return Err(ResolveError::Cancelled);
        }

        let torrent = self.connector.new_torrent(bag_id);

        if ctx.is_cancelled() {
            debug!(%bag_id, "resolve cancelled after torrent creation");
            return Err(ResolveError::Cancelled);
        }

        if let Err(e) = torrent.start(true).await {
            torrent.stop().await;
            warn!(%bag_id, error = %e, "torrent start failed");
            return Err(transport_err_to_resolve(e, 0));
        }

        let deadline = Instant::now() + DOWNLOADER_DEADLINE;
        let started = Instant::now();

        let create = self.connector.create_downloader(&torrent, deadline);
        let downloader = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                torrent.stop().await;
                debug!(%bag_id, "resolve cancelled while waiting on downloader creation");
                return Err(ResolveError::Cancelled);
            }
            res = timeout_at(deadline.into(), create) => {
                match res {
                    Ok(Ok(d)) => d,
                    Ok(Err(e)) => {
                        let peers_count = torrent.get_peers_count();
                        torrent.stop().await;
                        self.metrics.downloader_creation(started.elapsed(), "error");
                        warn!(%bag_id, peers_count, error = %e, "downloader creation failed");
                        return Err(transport_err_to_resolve(e, peers_count));
                    }
                    Err(_elapsed) => {
                        let peers_count = torrent.get_peers_count();
                        torrent.stop().await;
                        self.metrics.downloader_creation(started.elapsed(), "timeout");
                        warn!(%bag_id, peers_count, "downloader creation timed out");
                        return Err(ResolveError::Timeout { peers_count });
                    }
                }
            }
        };

        if !torrent.header_loaded() || !torrent.info_loaded() {
            torrent.stop().await;
            self.metrics.downloader_creation(started.elapsed(), "error");
            warn!(%bag_id, "torrent header/info not loaded after downloader creation");
            return Err(ResolveError::Unavailable(anyhow::anyhow!(
                "torrent header/info not loaded after downloader creation"
            )));
        }

        self.metrics.downloader_creation(started.elapsed(), "success");

        let torrent: Arc<dyn TorrentHandle> = Arc::new(torrent);
        let downloader: Arc<dyn Downloader> = Arc::new(downloader);
        self.cache
            .set(bag_id, torrent.clone(), downloader.clone(), torrent.file_size())
            .await;

        Ok((torrent, downloader))
    }
}

fn transport_err_to_resolve(e: TransportError, peers_count: u32) -> ResolveError {
    match e {
        TransportError::Timeout => ResolveError::Timeout { peers_count },
        TransportError::Other(e) => ResolveError::Unavailable(e),
    }
}
