use thiserror::Error;

use crate::bag_id::InvalidBagId;

/// Error surfaced by [`crate::resolver::BagResolver::resolve`].
///
/// Kept distinct from [`StreamError`]/[`ListError`]/[`GatewayError`] so the
/// resolver never needs to know which of its callers is asking.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid bag id")]
    InvalidBagId,
    #[error("timed out creating downloader, found {peers_count} peers")]
    Timeout { peers_count: u32 },
    #[error("resolve cancelled")]
    Cancelled,
    #[error("bag unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

impl From<InvalidBagId> for ResolveError {
    fn from(_: InvalidBagId) -> Self {
        ResolveError::InvalidBagId
    }
}

/// Error surfaced by [`crate::streaming::StreamingPipeline::stream_file`].
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid bag id")]
    InvalidBagId,
    #[error("file not found")]
    NotFound,
    #[error("timed out, found {peers_count} peers")]
    Timeout { peers_count: u32 },
    #[error("stream cancelled")]
    Cancelled,
    #[error("bag unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

impl From<ResolveError> for StreamError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::InvalidBagId => StreamError::InvalidBagId,
            ResolveError::Timeout { peers_count } => StreamError::Timeout { peers_count },
            ResolveError::Cancelled => StreamError::Cancelled,
            ResolveError::Unavailable(e) => StreamError::Unavailable(e),
        }
    }
}

/// Error surfaced by [`crate::lister::FileLister::list_files`].
#[derive(Debug, Error)]
pub enum ListError {
    #[error("invalid bag id")]
    InvalidBagId,
    #[error("timed out, found {peers_count} peers")]
    Timeout { peers_count: u32 },
    #[error("list cancelled")]
    Cancelled,
    #[error("bag unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

impl From<ResolveError> for ListError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::InvalidBagId => ListError::InvalidBagId,
            ResolveError::Timeout { peers_count } => ListError::Timeout { peers_count },
            ResolveError::Cancelled => ListError::Cancelled,
            ResolveError::Unavailable(e) => ListError::Unavailable(e),
        }
    }
}

/// Public error type returned by the Files Service Facade, one variant per
/// abstract kind in the specification's error handling design.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid bagid")]
    InvalidBagId,
    #[error("bag not found")]
    NotFound,
    #[error("bag is banned")]
    Banned,
    #[error("found {peers_count} peers, but request timed out")]
    Timeout { peers_count: u32 },
    #[error("file too large, use a native client")]
    TooLarge,
    #[error("request cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl From<InvalidBagId> for GatewayError {
    fn from(_: InvalidBagId) -> Self {
        GatewayError::InvalidBagId
    }
}

impl From<ListError> for GatewayError {
    fn from(e: ListError) -> Self {
        match e {
            ListError::InvalidBagId => GatewayError::InvalidBagId,
            ListError::Timeout { peers_count } => GatewayError::Timeout { peers_count },
            ListError::Cancelled => GatewayError::Cancelled,
            ListError::Unavailable(e) => GatewayError::Internal(e),
        }
    }
}

impl From<StreamError> for GatewayError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::InvalidBagId => GatewayError::InvalidBagId,
            StreamError::NotFound => GatewayError::NotFound,
            StreamError::Timeout { peers_count } => GatewayError::Timeout { peers_count },
            StreamError::Cancelled => GatewayError::Cancelled,
            StreamError::Unavailable(e) => GatewayError::Internal(e),
        }
    }
}

/// A label suitable for a Prometheus `result` metric label.
pub trait ResultLabel {
    fn result_label(&self) -> &'static str;
}

impl<T> ResultLabel for Result<T, ResolveError> {
    fn result_label(&self) -> &'static str {
        match self {
            Ok(_) => "success",
            Err(ResolveError::Timeout { .. }) => "timeout",
            Err(ResolveError::Cancelled) => "cancelled",
            Err(ResolveError::InvalidBagId) => "invalid_bag_id",
            Err(ResolveError::Unavailable(_)) => "error",
        }
    }
}

impl<T> ResultLabel for Result<T, StreamError> {
    fn result_label(&self) -> &'static str {
        match self {
            Ok(_) => "success",
            Err(StreamError::Timeout { .. }) => "timeout",
            Err(StreamError::NotFound) => "not_found",
            Err(StreamError::Cancelled) => "cancelled",
            Err(StreamError::InvalidBagId) => "invalid_bag_id",
            Err(StreamError::Unavailable(_)) => "error",
        }
    }
}

impl<T> ResultLabel for Result<T, ListError> {
    fn result_label(&self) -> &'static str {
        match self {
            Ok(_) => "success",
            Err(ListError::Timeout { .. }) => "timeout",
            Err(ListError::Cancelled) => "cancelled",
            Err(ListError::InvalidBagId) => "invalid_bag_id",
            Err(ListError::Unavailable(_)) => "error",
        }
    }
}
