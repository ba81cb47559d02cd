use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::QrApi;
use crate::error::AppResult;
use crate::models::{QrTokenMeta, QrTokenType};

/// Refresh window of the displayed QR token in seconds
const REFRESH_WINDOW_SECS: u64 = 50;

/// Source of QR display metadata
#[async_trait]
pub trait MetaFetcher: Send + Sync + 'static {
    async fn fetch(&self) -> AppResult<QrTokenMeta>;
}

/// Org-scoped fetcher over `GET /admin/org-qr/meta`
pub struct OrgQrMetaFetcher {
    pub api: QrApi,
    pub university_id: String,
    pub organization_id: String,
    pub token_type: QrTokenType,
}

#[async_trait]
impl MetaFetcher for OrgQrMetaFetcher {
    async fn fetch(&self) -> AppResult<QrTokenMeta> {
        self.api
            .org_qr_meta(&self.university_id, &self.organization_id, self.token_type)
            .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QrDisplayState {
    Loading,
    /// Currently displayed token and the seconds left in its window
    Active { token: String, seconds_left: u64 },
    Failed(String),
}

/// Handle to a running QR display loop. Closing (or dropping) the handle
/// cancels the countdown task; the one-second ticker never outlives it.
pub struct QrDisplayHandle {
    rx: watch::Receiver<QrDisplayState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl QrDisplayHandle {
    pub fn state(&self) -> QrDisplayState {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QrDisplayState> {
        self.rx.clone()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for QrDisplayHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start the display loop: fetch the current token, count its window
/// down once per second, re-fetch when the window closes.
pub fn start_qr_display<F: MetaFetcher>(fetcher: F) -> QrDisplayHandle {
    let (tx, rx) = watch::channel(QrDisplayState::Loading);
    let cancel = CancellationToken::new();
    let child = cancel.clone();

    let task = tokio::spawn(async move {
        loop {
            let meta = tokio::select! {
                _ = child.cancelled() => return,
                meta = fetcher.fetch() => meta,
            };
            let meta = match meta {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!("qr meta fetch failed: {}", e);
                    let _ = tx.send(QrDisplayState::Failed(e.user_message().to_string()));
                    return;
                }
            };

            let mut seconds_left = REFRESH_WINDOW_SECS;
            let _ = tx.send(QrDisplayState::Active {
                token: meta.token.clone(),
                seconds_left,
            });

            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await; // first tick completes immediately
            loop {
                tokio::select! {
                    _ = child.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                if seconds_left == 0 {
                    break; // window closed, fetch a fresh token
                }
                seconds_left -= 1;
                let _ = tx.send(QrDisplayState::Active {
                    token: meta.token.clone(),
                    seconds_left,
                });
            }
        }
    });

    QrDisplayHandle { rx, cancel, task }
}
