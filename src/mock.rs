//! Deterministic in-memory implementations of the external transport and
//! storage traits, used only by this crate's own test suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::bag_id::BagId;
use crate::facade::BanStore;
use crate::local_storage::{BagDetails, LocalStorageClient, LocalStorageError};
use crate::prefetch::{PrefetchError, Prefetcher, PrefetcherFactory};
use crate::transport::{Connector, Downloader, FileOffsets, TorrentHandle, TransportError};

/// Canned behavior for [`MockConnector::create_downloader`].
#[derive(Clone)]
pub enum DownloaderBehavior {
    Success,
    /// Sleeps past any reasonable deadline so the caller's own timeout fires.
    Hang,
    Error,
}

#[derive(Clone)]
pub struct MockBagSpec {
    pub file_size: u64,
    pub description: String,
    pub peers_count: u32,
    pub files: Vec<FileOffsets>,
    pub behavior: DownloaderBehavior,
}

impl Default for MockBagSpec {
    fn default() -> Self {
        Self {
            file_size: 0,
            description: "mock bag".to_string(),
            peers_count: 1,
            files: Vec::new(),
            behavior: DownloaderBehavior::Success,
        }
    }
}

pub struct MockTorrentHandle {
    spec: MockBagSpec,
    stopped: AtomicBool,
}

impl MockTorrentHandle {
    pub fn new(_bag_id: BagId, file_size: u64) -> Self {
        Self {
            spec: MockBagSpec {
                file_size,
                ..Default::default()
            },
            stopped: AtomicBool::new(false),
        }
    }

    fn from_spec(_bag_id: BagId, spec: MockBagSpec) -> Self {
        Self {
            spec,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TorrentHandle for MockTorrentHandle {
    fn header_loaded(&self) -> bool {
        true
    }

    fn info_loaded(&self) -> bool {
        true
    }

    fn description(&self) -> String {
        self.spec.description.clone()
    }

    fn file_size(&self) -> u64 {
        self.spec.file_size
    }

    fn files_count(&self) -> u32 {
        self.spec.files.len() as u32
    }

    fn get_peers_count(&self) -> u32 {
        self.spec.peers_count
    }

    fn get_file_offsets(&self, path: &str) -> Option<FileOffsets> {
        self.spec.files.iter().find(|f| f.name == path).cloned()
    }

    fn get_file_offsets_by_id(&self, index: u32) -> Option<FileOffsets> {
        self.spec.files.iter().find(|f| f.index == index).cloned()
    }

    async fn start(&self, _header_only: bool) -> Result<(), TransportError> {
        Ok(())
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub struct MockDownloader {
    closed: AtomicBool,
}

impl Default for MockDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDownloader {
    pub fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector whose behavior per bag-id is configured up front via
/// [`MockConnector::register`]; unregistered bags get
/// [`MockBagSpec::default`].
pub struct MockConnector {
    specs: DashMap<BagId, MockBagSpec>,
    create_downloader_calls: AtomicU32,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            specs: DashMap::new(),
            create_downloader_calls: AtomicU32::new(0),
        }
    }

    pub fn register(&self, bag_id: BagId, spec: MockBagSpec) {
        self.specs.insert(bag_id, spec);
    }

    pub fn create_downloader_call_count(&self) -> u32 {
        self.create_downloader_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Torrent = MockTorrentHandle;
    type Downloader = MockDownloader;

    fn new_torrent(&self, bag_id: BagId) -> Self::Torrent {
        let spec = self
            .specs
            .get(&bag_id)
            .map(|r| r.clone())
            .unwrap_or_default();
        MockTorrentHandle::from_spec(bag_id, spec)
    }

    async fn create_downloader(
        &self,
        torrent: &Self::Torrent,
        _deadline: Instant,
    ) -> Result<Self::Downloader, TransportError> {
        self.create_downloader_calls.fetch_add(1, Ordering::SeqCst);
        match torrent.spec.behavior {
            DownloaderBehavior::Success => Ok(MockDownloader::new()),
            DownloaderBehavior::Error => {
                Err(TransportError::Other(anyhow::anyhow!("mock transport error")))
            }
            DownloaderBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(MockDownloader::new())
            }
        }
    }
}

/// Prefetcher serving pieces from an in-memory map; missing pieces error.
pub struct MockPrefetcher {
    pieces: HashMap<u32, Bytes>,
    stopped: AtomicBool,
    get_calls: Mutex<Vec<u32>>,
}

impl Default for MockPrefetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPrefetcher {
    pub fn new() -> Self {
        Self {
            pieces: HashMap::new(),
            stopped: AtomicBool::new(false),
            get_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pieces(pieces: HashMap<u32, Bytes>) -> Self {
        Self {
            pieces,
            stopped: AtomicBool::new(false),
            get_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prefetcher for MockPrefetcher {
    async fn get(&self, piece_index: u32) -> Result<Bytes, PrefetchError> {
        self.get_calls.lock().push(piece_index);
        self.pieces
            .get(&piece_index)
            .cloned()
            .ok_or(PrefetchError::Fetch {
                piece: piece_index,
                source: anyhow::anyhow!("no such piece registered in mock"),
            })
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Factory that always builds a [`MockPrefetcher`] over a fixed piece map,
/// ignoring the requested window/piece-list (the mock has no real pipeline
/// to bound).
pub struct MockPrefetcherFactory {
    pieces: HashMap<u32, Bytes>,
}

impl MockPrefetcherFactory {
    pub fn new(pieces: HashMap<u32, Bytes>) -> Self {
        Self { pieces }
    }
}

#[async_trait]
impl PrefetcherFactory for MockPrefetcherFactory {
    async fn new_prefetcher(
        &self,
        _ctx: CancellationToken,
        _torrent: Arc<dyn TorrentHandle>,
        _downloader: Arc<dyn Downloader>,
        _window: usize,
        _pieces: Vec<u32>,
    ) -> Arc<dyn Prefetcher> {
        Arc::new(MockPrefetcher::with_pieces(self.pieces.clone()))
    }
}

#[derive(Default)]
pub struct MockLocalStorageClient {
    bags: DashMap<String, BagDetails>,
}

impl MockLocalStorageClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, bag_id: &str, details: BagDetails) {
        self.bags.insert(bag_id.to_string(), details);
    }
}

#[async_trait]
impl LocalStorageClient for MockLocalStorageClient {
    async fn get_bag(&self, bag_id: &str) -> Result<BagDetails, LocalStorageError> {
        self.bags
            .get(bag_id)
            .map(|r| r.clone())
            .ok_or(LocalStorageError::NotFound)
    }
}

#[derive(Default)]
pub struct MockBanStore {
    banned: DashMap<BagId, ()>,
}

impl MockBanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ban(&self, bag_id: BagId) {
        self.banned.insert(bag_id, ());
    }
}

#[async_trait]
impl BanStore for MockBanStore {
    async fn has_ban(&self, bag_id: &BagId) -> bool {
        self.banned.contains_key(bag_id)
    }
}
