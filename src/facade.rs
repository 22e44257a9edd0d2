//! Component H: orchestrates local-then-remote resolution, ban checks and
//! the single-file/directory branch.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bag_id::BagId;
use crate::config::MAX_FILE_SERVE_SIZE;
use crate::error::GatewayError;
use crate::lister::{FileEntry, FileLister};
use crate::local_storage::{BagDetails, LocalStorageClient, LocalStorageError};
use crate::metrics::GatewayMetrics;
use crate::prefetch::PrefetcherFactory;
use crate::streaming::StreamingPipeline;
use crate::transport::Connector;

/// Consulted before any backend lookup; an external collaborator (the
/// reports/bans persistence layer is out of scope here).
#[async_trait]
pub trait BanStore: Send + Sync {
    async fn has_ban(&self, bag_id: &BagId) -> bool;
}

pub struct FolderInfo {
    pub bag_id: BagId,
    pub description: String,
    pub total_size: u64,
    pub peers_count: u32,
    pub files: Vec<FileEntry>,
    pub single_file_path: Option<PathBuf>,
    pub stream: Option<crate::streaming::FileStream>,
    pub is_valid: bool,
}

pub struct FilesServiceFacade<C: Connector, F: PrefetcherFactory, L: LocalStorageClient, B: BanStore>
{
    local_storage: Arc<L>,
    ban_store: Arc<B>,
    lister: Arc<FileLister<C>>,
    streaming: Arc<StreamingPipeline<C, F>>,
    metrics: Arc<GatewayMetrics>,
}

impl<C: Connector, F: PrefetcherFactory, L: LocalStorageClient, B: BanStore>
    FilesServiceFacade<C, F, L, B>
{
    pub fn new(
        local_storage: Arc<L>,
        ban_store: Arc<B>,
        lister: Arc<FileLister<C>>,
        streaming: Arc<StreamingPipeline<C, F>>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            local_storage,
            ban_store,
            lister,
            streaming,
            metrics,
        }
    }

    pub async fn get_path_info(
        &self,
        ctx: CancellationToken,
        bag_id_raw: &str,
        path: &str,
    ) -> Result<FolderInfo, GatewayError> {
        let bag_id: BagId = bag_id_raw
            .parse()
            .map_err(|_| GatewayError::InvalidBagId)?;

        if self.ban_store.has_ban(&bag_id).await {
            debug!(%bag_id, "bag is banned");
            return Err(GatewayError::Banned);
        }

        match self.local_storage.get_bag(&bag_id.to_string()).await {
            Ok(bag) => return Ok(self.from_local(bag_id, bag, path)),
            Err(LocalStorageError::NotFound) => {
                debug!(%bag_id, "not found locally, falling back to remote");
            }
            Err(e) => {
                warn!(%bag_id, error = %e, "local storage lookup failed, falling back to remote");
            }
        }

        self.from_remote(ctx, bag_id, path).await
    }

    fn from_local(&self, bag_id: BagId, bag: BagDetails, path: &str) -> FolderInfo {
        let projected = ls(&bag.files, path);
        let single_file_path = single_file(&projected, path)
            .map(|entry| bag.path.join(&bag.dir_name).join(&entry.name));

        FolderInfo {
            bag_id,
            description: bag.description,
            total_size: bag.size,
            peers_count: bag.peers_count,
            files: projected,
            single_file_path,
            stream: None,
            is_valid: true,
        }
    }

    async fn from_remote(
        &self,
        ctx: CancellationToken,
        bag_id: BagId,
        path: &str,
    ) -> Result<FolderInfo, GatewayError> {
        let info = match self.lister.list_files(&ctx, bag_id).await {
            Ok(info) => info,
            Err(e) => {
                if let crate::error::ListError::Timeout { peers_count } = e {
                    return Err(GatewayError::Timeout { peers_count });
                }
                return Err(e.into());
            }
        };

        let projected = ls(&info.files, path);

        if let Some(entry) = single_file(&projected, path) {
            if entry.size > MAX_FILE_SERVE_SIZE {
                return Err(GatewayError::TooLarge);
            }
            let stream = self
                .streaming
                .stream_file(ctx, bag_id, path)
                .await
                .map_err(GatewayError::from)?;
            return Ok(FolderInfo {
                bag_id,
                description: info.description,
                total_size: info.total_size,
                peers_count: info.peers_count,
                files: projected,
                single_file_path: None,
                stream: Some(stream),
                is_valid: true,
            });
        }

        Ok(FolderInfo {
            bag_id,
            description: info.description,
            total_size: info.total_size,
            peers_count: info.peers_count,
            files: projected,
            single_file_path: None,
            stream: None,
            is_valid: true,
        })
    }
}

impl std::fmt::Debug for FolderInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderInfo")
            .field("bag_id", &self.bag_id)
            .field("total_size", &self.total_size)
            .field("peers_count", &self.peers_count)
            .field("files", &self.files)
            .field("single_file_path", &self.single_file_path)
            .field("has_stream", &self.stream.is_some())
            .field("is_valid", &self.is_valid)
            .finish()
    }
}

/// Returns the single file entry if `projected` resolves `path` to exactly
/// one non-folder entry whose name equals the last path segment.
fn single_file<'a>(projected: &'a [FileEntry], path: &str) -> Option<&'a FileEntry> {
    let last_segment = path.trim_matches('/').rsplit('/').next()?;
    if projected.len() == 1 && projected[0].name == last_segment && !projected[0].is_folder {
        Some(&projected[0])
    } else {
        None
    }
}

/// Projects the flat file list onto one directory level at `path`, grouping
/// deeper entries into synthetic zero-size folders. Folders sort before
/// files; each group sorts by name ascending.
pub fn ls(files: &[FileEntry], path: &str) -> Vec<FileEntry> {
    let normalized = path.trim_matches('/');

    // Exact match against a leaf file: the facade's single-file fast path.
    if !normalized.is_empty() {
        if let Some(hit) = files.iter().find(|f| f.name == normalized) {
            let basename = normalized.rsplit('/').next().unwrap_or(normalized);
            return vec![FileEntry {
                index: hit.index,
                name: basename.to_string(),
                size: hit.size,
                is_folder: false,
            }];
        }
    }

    let prefix = if normalized.is_empty() {
        String::new()
    } else {
        format!("{normalized}/")
    };

    let mut folders: std::collections::BTreeMap<String, u32> = std::collections::BTreeMap::new();
    let mut leaves: Vec<FileEntry> = Vec::new();

    for f in files {
        let rest = match f.name.strip_prefix(&prefix as &str) {
            Some(rest) => rest,
            None => continue,
        };
        if rest.is_empty() {
            continue;
        }
        match rest.split_once('/') {
            Some((folder, _)) => {
                folders.entry(folder.to_string()).or_insert(f.index);
            }
            None => leaves.push(FileEntry {
                index: f.index,
                name: rest.to_string(),
                size: f.size,
                is_folder: false,
            }),
        }
    }

    leaves.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out: Vec<FileEntry> = folders
        .into_iter()
        .map(|(name, index)| FileEntry {
            index,
            name,
            size: 0,
            is_folder: true,
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out.extend(leaves);
    out
}
