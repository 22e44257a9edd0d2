//! Component M: the local storage daemon's narrow contract.
//!
//! The daemon itself (a sibling HTTP/JSON service) is out of scope; only the
//! trait and DTO shape are modeled here so the Files Service Facade can be
//! written and tested against a mock.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::lister::FileEntry;

/// Mirrors the sibling daemon's `/api/v1/details` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagDetails {
    pub description: String,
    pub size: u64,
    pub path: PathBuf,
    pub dir_name: String,
    pub files: Vec<FileEntry>,
    pub peers_count: u32,
    pub merkle_hash: String,
    pub info_loaded: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LocalStorageError {
    #[error("bag not found locally")]
    NotFound,
    /// A bag the daemon knows about but whose info hasn't finished loading;
    /// `merkle_hash` is empty while `info_loaded` is true.
    #[error("bag details stale, update required")]
    UpdateRequired,
    #[error("local storage request failed: {0}")]
    Transport(#[source] anyhow::Error),
}

#[async_trait]
pub trait LocalStorageClient: Send + Sync {
    async fn get_bag(&self, bag_id: &str) -> Result<BagDetails, LocalStorageError>;
}
