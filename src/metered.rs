//! Component F: wraps the streaming pipeline's reader with TTFB, byte-count
//! and lifetime observation.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::io::{AsyncRead, ReadBuf};

use crate::metrics::GatewayMetrics;
use crate::prefetch::Prefetcher;

/// A one-shot, closeable `AsyncRead` that records time-to-first-byte, total
/// bytes and stream duration exactly once each.
pub struct MeteredStream<R> {
    inner: R,
    prefetcher: Arc<dyn Prefetcher>,
    metrics: Arc<GatewayMetrics>,
    start: Instant,
    ttfb_observed: AtomicBool,
    closed: AtomicBool,
}

impl<R: AsyncRead + Unpin> MeteredStream<R> {
    pub fn new(inner: R, prefetcher: Arc<dyn Prefetcher>, metrics: Arc<GatewayMetrics>) -> Self {
        metrics.inc_active_streams();
        Self {
            inner,
            prefetcher,
            metrics,
            start: Instant::now(),
            ttfb_observed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Idempotent: stops the prefetcher, records the final duration and
    /// decrements the active-streams gauge. Safe to call concurrently with
    /// an in-flight read.
    pub async fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.prefetcher.stop().await;
            self.metrics
                .observe_stream_duration(self.start.elapsed(), "success");
            self.metrics.dec_active_streams();
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for MeteredStream<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let n = buf.filled().len() - before;
            if n > 0 {
                this.metrics.add_stream_bytes(n as u64);
                if this
                    .ttfb_observed
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    this.metrics.observe_ttfb(this.start.elapsed(), "success");
                }
            }
        }
        poll
    }
}
