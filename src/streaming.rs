//! Component E: turns a piece range into a byte stream with backpressure,
//! head/tail trimming and cancellation.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bag_id::BagId;
use crate::config::PREFETCH_WINDOW;
use crate::error::{ResultLabel, StreamError};
use crate::metered::MeteredStream;
use crate::metrics::GatewayMetrics;
use crate::prefetch::{Prefetcher, PrefetcherFactory};
use crate::resolver::BagResolver;
use crate::transport::Connector;

/// Result of [`StreamingPipeline::stream_file`]: a metered, one-shot body
/// plus the metadata the HTTP layer needs for headers.
pub struct FileStream {
    pub body: MeteredStream<ChannelReader>,
    pub size: u64,
    pub peers_count: u32,
}

/// `AsyncRead` adapter over the producer task's bounded channel.
pub struct ChannelReader {
    rx: mpsc::Receiver<Result<Bytes, io::Error>>,
    current: Bytes,
}

impl AsyncRead for ChannelReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.current.is_empty() {
                let n = this.current.len().min(buf.remaining());
                buf.put_slice(&this.current[..n]);
                this.current = this.current.split_off(n);
                return Poll::Ready(Ok(()));
            }
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.current = chunk;
                    continue;
                }
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Err(e)),
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

pub struct StreamingPipeline<C: Connector, F: PrefetcherFactory> {
    resolver: Arc<BagResolver<C>>,
    prefetcher_factory: Arc<F>,
    metrics: Arc<GatewayMetrics>,
    channel_capacity: usize,
}

impl<C: Connector, F: PrefetcherFactory> StreamingPipeline<C, F> {
    pub fn new(
        resolver: Arc<BagResolver<C>>,
        prefetcher_factory: Arc<F>,
        metrics: Arc<GatewayMetrics>,
        channel_capacity: usize,
    ) -> Self {
        Self {
            resolver,
            prefetcher_factory,
            metrics,
            channel_capacity,
        }
    }

    pub async fn stream_file(
        &self,
        ctx: CancellationToken,
        bag_id: BagId,
        path: &str,
    ) -> Result<FileStream, StreamError> {
        let result = self.stream_file_inner(ctx, bag_id, path).await;
        self.metrics.stream_file_requests(result.result_label());
        result
    }

    async fn stream_file_inner(
        &self,
        ctx: CancellationToken,
        bag_id: BagId,
        path: &str,
    ) -> Result<FileStream, StreamError> {
        let (torrent, downloader) = match self.resolver.resolve(&ctx, bag_id).await {
            Ok(pair) => pair,
            Err(e) => return Err(e.into()),
        };

        let offsets = torrent
            .get_file_offsets(path)
            .ok_or(StreamError::NotFound)?;

        let pieces: Vec<u32> = (offsets.from_piece..=offsets.to_piece).collect();
        let prefetcher = self
            .prefetcher_factory
            .new_prefetcher(
                ctx.clone(),
                torrent.clone(),
                downloader.clone(),
                PREFETCH_WINDOW,
                pieces.clone(),
            )
            .await;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        spawn_producer(
            ctx,
            prefetcher.clone(),
            pieces,
            offsets.from_piece,
            offsets.from_piece_offset,
            offsets.to_piece,
            offsets.to_piece_offset,
            tx,
        );

        let reader = ChannelReader {
            rx,
            current: Bytes::new(),
        };
        let body = MeteredStream::new(reader, prefetcher, self.metrics.clone());

        Ok(FileStream {
            body,
            size: offsets.size,
            peers_count: torrent.get_peers_count(),
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_producer(
    ctx: CancellationToken,
    prefetcher: Arc<dyn Prefetcher>,
    pieces: Vec<u32>,
    from_piece: u32,
    from_offset: u32,
    to_piece: u32,
    to_offset: u32,
    tx: mpsc::Sender<Result<Bytes, io::Error>>,
) {
    tokio::spawn(async move {
        for &p in &pieces {
            if ctx.is_cancelled() {
                debug!(piece = p, "stream cancelled before piece fetch");
                let _ = tx
                    .send(Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled")))
                    .await;
                break;
            }

            let data = match prefetcher.get(p).await {
                Ok(d) => d,
                Err(e) => {
                    let _ = tx
                        .send(Err(io::Error::new(io::ErrorKind::Other, e.to_string())))
                        .await;
                    break;
                }
            };

            let mut start = 0usize;
            let mut end = data.len();
            if p == from_piece {
                start = (from_offset as usize).min(data.len());
            }
            if p == to_piece {
                end = (to_offset as usize).min(data.len());
            }
            if start > end {
                start = end;
            }
            let slice = data.slice(start..end);

            if slice.is_empty() {
                continue;
            }

            if tx.send(Ok(slice)).await.is_err() {
                debug!(piece = p, "stream consumer dropped, stopping producer");
                break;
            }
        }
        prefetcher.stop().await;
    });
}
