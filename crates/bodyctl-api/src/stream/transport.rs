// ── Push transports ──
//
// `PushTransport` is the seam between the event stream state machine and
// the wire. `SseTransport` talks to the service; `ChannelTransport` is an
// in-memory transport fed by the caller (tests, simulators).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::stream::sse::{PushFrame, SseDecoder};

/// Stream of frames from one open subscription. Ends when the connection
/// closes.
pub type FrameStream = BoxStream<'static, Result<PushFrame, Error>>;

/// Opens push subscriptions.
pub trait PushTransport: Send + Sync + 'static {
    /// Open a new subscription. Each call is a fresh connection.
    fn open(&self) -> BoxFuture<'static, Result<FrameStream, Error>>;
}

// ── SSE over HTTP ───────────────────────────────────────────────────

/// `GET <url>` with `Accept: text/event-stream`.
#[derive(Debug, Clone)]
pub struct SseTransport {
    http: reqwest::Client,
    url: Url,
}

impl SseTransport {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl PushTransport for SseTransport {
    fn open(&self) -> BoxFuture<'static, Result<FrameStream, Error>> {
        let http = self.http.clone();
        let url = self.url.clone();

        Box::pin(async move {
            debug!(url = %url, "opening event stream");
            let resp = http
                .get(url.clone())
                .header(ACCEPT, "text/event-stream")
                .header(CACHE_CONTROL, "no-cache")
                .send()
                .await
                .map_err(|e| Error::StreamConnect(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(Error::StreamConnect(format!("HTTP {status} from {url}")));
            }

            let mut body = resp.bytes_stream();
            let frames = async_stream::try_stream! {
                let mut decoder = SseDecoder::new();
                while let Some(chunk) = body.next().await {
                    let chunk = chunk.map_err(|e| Error::StreamConnect(e.to_string()))?;
                    for frame in decoder.push(&chunk)? {
                        yield frame;
                    }
                }
            };

            let frames: FrameStream = frames.boxed();
            Ok(frames)
        })
    }
}

// ── In-memory transport ─────────────────────────────────────────────

type SessionFeed = mpsc::UnboundedReceiver<Result<PushFrame, Error>>;

/// Transport whose sessions are scripted by the caller.
///
/// Each `open()` consumes the next queued session. Dropping a session's
/// sender ends that stream, which the client sees as a lost connection.
/// When nothing is queued, `open()` fails.
#[derive(Debug, Default)]
pub struct ChannelTransport {
    queue: Mutex<VecDeque<Result<SessionFeed, String>>>,
    opens: AtomicU32,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a session that the next `open()` will succeed with.
    pub fn push_session(&self) -> mpsc::UnboundedSender<Result<PushFrame, Error>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_queue().push_back(Ok(rx));
        tx
    }

    /// Queue a failed connection attempt.
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.lock_queue().push_back(Err(reason.into()));
    }

    /// Number of `open()` calls so far.
    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<SessionFeed, String>>> {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl PushTransport for ChannelTransport {
    fn open(&self) -> BoxFuture<'static, Result<FrameStream, Error>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let next = self.lock_queue().pop_front();

        Box::pin(async move {
            match next {
                Some(Ok(rx)) => {
                    let frames = futures_util::stream::unfold(rx, |mut rx| async move {
                        rx.recv().await.map(|item| (item, rx))
                    });
                    let frames: FrameStream = frames.boxed();
                    Ok(frames)
                }
                Some(Err(reason)) => Err(Error::StreamConnect(reason)),
                None => Err(Error::StreamConnect("no session available".into())),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_transport_serves_sessions_in_order() {
        let transport = ChannelTransport::new();
        transport.push_failure("refused");
        let tx = transport.push_session();

        assert!(matches!(transport.open().await, Err(Error::StreamConnect(r)) if r == "refused"));

        let mut frames = transport.open().await.unwrap();
        tx.send(Ok(PushFrame::message("{}"))).unwrap();
        drop(tx);
        assert_eq!(frames.next().await.unwrap().unwrap().data, "{}");
        assert!(frames.next().await.is_none());

        assert!(transport.open().await.is_err());
        assert_eq!(transport.open_count(), 3);
    }
}
