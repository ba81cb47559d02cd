use tokio::sync::watch;

/// Global modal/notice state. Never persisted; cleared by `close()`
/// or process exit.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ModalState {
    #[default]
    Hidden,
    Open {
        title: String,
        message: String,
    },
}

/// Same read/write/subscribe shape as the auth store, minus persistence
pub struct ModalStore {
    tx: watch::Sender<ModalState>,
}

impl ModalStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ModalState::Hidden);
        Self { tx }
    }

    pub fn state(&self) -> ModalState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ModalState> {
        self.tx.subscribe()
    }

    pub fn open(&self, title: &str, message: &str) {
        self.tx.send_replace(ModalState::Open {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    pub fn close(&self) {
        self.tx.send_replace(ModalState::Hidden);
    }
}

impl Default for ModalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close() {
        let store = ModalStore::new();
        assert_eq!(store.state(), ModalState::Hidden);

        store.open("返却申請", "写真を確認してください");
        assert!(matches!(store.state(), ModalState::Open { .. }));

        store.close();
        assert_eq!(store.state(), ModalState::Hidden);
    }
}
