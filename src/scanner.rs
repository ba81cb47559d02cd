use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};

/// Source of scanned QR payloads. The browser build reads camera frames;
/// here the terminal (or a test fake) plays that role. `release` must be
/// safe to call more than once.
#[async_trait]
pub trait ScanSource: Send {
    /// Next scanned payload, or None when the source is exhausted
    async fn next_scan(&mut self) -> AppResult<Option<String>>;

    /// Give back the underlying capture resource
    fn release(&mut self) {}
}

/// Reads scan payloads line-by-line from stdin
pub struct TerminalScanner {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalScanner {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for TerminalScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScanSource for TerminalScanner {
    async fn next_scan(&mut self) -> AppResult<Option<String>> {
        let line = self
            .lines
            .next_line()
            .await
            .map_err(|e| AppError::Internal(format!("stdin read error: {}", e)))?;
        Ok(line.map(|l| l.trim().to_string()))
    }
}

/// One scanning screen's exclusive claim on a scan source. The source is
/// released on every exit path: successful scan, explicit stop, or drop.
pub struct ScanSession<S: ScanSource> {
    source: S,
    cancel: CancellationToken,
    released: bool,
}

impl<S: ScanSource> ScanSession<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cancel: CancellationToken::new(),
            released: false,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for one scan. Returns None when stopped or exhausted. The
    /// session is one-shot: whichever way this returns, the source has
    /// been released.
    pub async fn scan(&mut self) -> AppResult<Option<String>> {
        if self.cancel.is_cancelled() {
            self.do_release();
            return Ok(None);
        }
        let cancel = self.cancel.clone();
        let result = tokio::select! {
            _ = cancel.cancelled() => Ok(None),
            scan = self.source.next_scan() => scan,
        };
        self.do_release();
        result
    }

    /// Explicit stop (the user backed out of the scanning screen)
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.do_release();
    }

    fn do_release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
            tracing::debug!("scan session released");
        }
    }
}

impl<S: ScanSource> Drop for ScanSession<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.do_release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FakeSource {
        payload: Option<String>,
        released: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ScanSource for FakeSource {
        async fn next_scan(&mut self) -> AppResult<Option<String>> {
            Ok(self.payload.take())
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn fake(payload: Option<&str>) -> (FakeSource, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        (
            FakeSource {
                payload: payload.map(String::from),
                released: released.clone(),
            },
            released,
        )
    }

    #[tokio::test]
    async fn test_released_after_successful_scan() {
        let (source, released) = fake(Some("abc.def.ghi"));
        let mut session = ScanSession::new(source);
        let scan = session.scan().await.unwrap();
        assert_eq!(scan.as_deref(), Some("abc.def.ghi"));
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_released_on_explicit_stop() {
        let (source, released) = fake(Some("abc.def.ghi"));
        let mut session = ScanSession::new(source);
        session.stop();
        assert!(released.load(Ordering::SeqCst));
        // stopped sessions never observe another scan
        assert_eq!(session.scan().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_released_on_drop() {
        let (source, released) = fake(None);
        drop(ScanSession::new(source));
        assert!(released.load(Ordering::SeqCst));
    }
}
