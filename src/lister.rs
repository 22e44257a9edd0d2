//! Component G: enumerates a resolved bag's files.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bag_id::BagId;
use crate::error::ListError;
use crate::metrics::GatewayMetrics;
use crate::resolver::BagResolver;
use crate::transport::Connector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub index: u32,
    pub name: String,
    pub size: u64,
    /// True for the synthetic grouping entries `ls` produces for a
    /// directory level; false for an actual file, including zero-byte ones.
    pub is_folder: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BagInfo {
    pub description: String,
    pub total_size: u64,
    pub peers_count: u32,
    pub files: Vec<FileEntry>,
}

pub struct FileLister<C: Connector> {
    resolver: Arc<BagResolver<C>>,
    metrics: Arc<GatewayMetrics>,
}

impl<C: Connector> FileLister<C> {
    pub fn new(resolver: Arc<BagResolver<C>>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { resolver, metrics }
    }

    pub async fn list_files(
        &self,
        ctx: &CancellationToken,
        bag_id: BagId,
    ) -> Result<BagInfo, ListError> {
        let started = std::time::Instant::now();
        let result = self.list_files_inner(ctx, bag_id).await;
        self.metrics
            .list_files(started.elapsed(), result_label(&result));
        if let Err(e) = &result {
            warn!(%bag_id, error = %e, "list_files failed");
        }
        result
    }

    async fn list_files_inner(
        &self,
        ctx: &CancellationToken,
        bag_id: BagId,
    ) -> Result<BagInfo, ListError> {
        let (torrent, _downloader) = self.resolver.resolve(ctx, bag_id).await?;

        let mut files = Vec::with_capacity(torrent.files_count() as usize);
        for i in 0..torrent.files_count() {
            if let Some(offsets) = torrent.get_file_offsets_by_id(i) {
                files.push(FileEntry {
                    index: offsets.index,
                    name: offsets.name,
                    size: offsets.size,
                    is_folder: false,
                });
            }
        }

        Ok(BagInfo {
            description: torrent.description(),
            total_size: torrent.file_size(),
            peers_count: torrent.get_peers_count(),
            files,
        })
    }
}

fn result_label(result: &Result<BagInfo, ListError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(ListError::Timeout { .. }) => "timeout",
        Err(ListError::Cancelled) => "cancelled",
        Err(ListError::InvalidBagId) => "invalid_bag_id",
        Err(ListError::Unavailable(_)) => "error",
    }
}
