use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::watch;

use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, QrClaim};

use super::flow::FlowBackend;
use super::state::SessionState;

struct Inner<E, O> {
    claim: Option<QrClaim>,
    user: Option<AuthUser>,
    entries: Vec<E>,
    selected: Option<usize>,
    outcome: Option<O>,
}

impl<E, O> Inner<E, O> {
    fn clear(&mut self) {
        self.claim = None;
        self.user = None;
        self.entries.clear();
        self.selected = None;
        self.outcome = None;
    }
}

/// Orchestrates one QR-driven flow: token validation, the automatic
/// list fetch, selection, and submission.
///
/// Shared by reference between UI event handlers, so the concurrency
/// guards live here: a generation counter discards async results that
/// settle after the flow was reset, and a single in-flight flag per
/// machine swallows duplicate submits during network latency.
pub struct SessionMachine<F: FlowBackend> {
    backend: F,
    state_tx: watch::Sender<SessionState>,
    inner: Mutex<Inner<F::Entry, F::Outcome>>,
    in_flight: AtomicBool,
    generation: AtomicU64,
}

impl<F: FlowBackend> SessionMachine<F> {
    pub fn new(backend: F) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            backend,
            state_tx,
            inner: Mutex::new(Inner {
                claim: None,
                user: None,
                entries: Vec::new(),
                selected: None,
                outcome: None,
            }),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn entries(&self) -> Vec<F::Entry> {
        self.lock().entries.clone()
    }

    pub fn claim(&self) -> Option<QrClaim> {
        self.lock().claim.clone()
    }

    pub fn selected(&self) -> Option<F::Entry> {
        let inner = self.lock();
        inner.selected.and_then(|i| inner.entries.get(i).cloned())
    }

    pub fn outcome(&self) -> Option<F::Outcome> {
        self.lock().outcome.clone()
    }

    /// Enter the flow with the token from the navigation query string.
    /// A missing token is an immediate terminal error; a valid one rolls
    /// straight into the scoped list fetch with no user action.
    pub async fn start(&self, token: Option<&str>, user: &AuthUser) -> SessionState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut inner = self.lock();
            inner.clear();
            inner.user = Some(user.clone());
        }

        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => {
                self.set_state(SessionState::TokenError(
                    AppError::BadRequest(String::new()).user_message().to_string(),
                ));
                return self.state();
            }
        };

        self.set_state(SessionState::TokenLoading);
        let claim = match self.backend.validate(token, user).await {
            _ if self.is_stale(generation) => return self.state(),
            Ok(claim) => claim,
            Err(AppError::Forbidden(reason)) => {
                tracing::debug!("flow unauthorized: {}", reason);
                self.set_state(SessionState::Unauthorized(
                    AppError::Forbidden(reason).user_message().to_string(),
                ));
                return self.state();
            }
            Err(e) => {
                self.set_state(SessionState::TokenError(e.user_message().to_string()));
                return self.state();
            }
        };

        self.lock().claim = Some(claim.clone());
        self.set_state(SessionState::TokenValid);

        self.set_state(SessionState::ListLoading);
        match self.backend.fetch_entries(&claim, user).await {
            _ if self.is_stale(generation) => return self.state(),
            Ok(entries) if entries.is_empty() => self.set_state(SessionState::ListEmpty),
            Ok(entries) => {
                self.lock().entries = entries;
                self.set_state(SessionState::ListReady);
            }
            Err(e) => self.set_state(SessionState::ListError(e.user_message().to_string())),
        }
        self.state()
    }

    /// Open the detail/selection view for one list entry
    pub fn select(&self, index: usize) -> AppResult<()> {
        if !matches!(
            self.state(),
            SessionState::ListReady | SessionState::Selecting | SessionState::SubmitFailed(_)
        ) {
            return Err(AppError::Validation("nothing to select yet".to_string()));
        }
        let mut inner = self.lock();
        if index >= inner.entries.len() {
            return Err(AppError::Validation(format!("no entry at index {}", index)));
        }
        inner.selected = Some(index);
        drop(inner);
        self.set_state(SessionState::Selecting);
        Ok(())
    }

    /// Leave the detail view, keeping the fetched list
    pub fn back_to_list(&self) {
        if self.state().can_submit() {
            self.lock().selected = None;
            self.set_state(SessionState::ListReady);
        }
    }

    /// Submit the action for the selected entry. While a submission is
    /// in flight every further submit is ignored; a failure returns
    /// control to the selection, retryable by another explicit submit.
    pub async fn submit(&self, input: &F::Input) -> SessionState {
        if !self.state().can_submit() {
            tracing::warn!("submit ignored: state={:?}", self.state());
            return self.state();
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("submit ignored: already in flight");
            return self.state();
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let (claim, user, entry) = {
            let inner = self.lock();
            let claim = inner.claim.clone();
            let user = inner.user.clone();
            let entry = inner.selected.and_then(|i| inner.entries.get(i).cloned());
            (claim, user, entry)
        };
        let (claim, user, entry) = match (claim, user, entry) {
            (Some(c), Some(u), Some(e)) => (c, u, e),
            _ => {
                self.in_flight.store(false, Ordering::SeqCst);
                self.set_state(SessionState::SubmitFailed(
                    "選択内容が見つかりません".to_string(),
                ));
                return self.state();
            }
        };

        self.set_state(SessionState::Submitting);
        let result = self.backend.submit(&claim, &user, &entry, input).await;
        self.in_flight.store(false, Ordering::SeqCst);

        if self.is_stale(generation) {
            // the flow was torn down while the call was in the air
            return self.state();
        }

        match result {
            Ok(outcome) => {
                self.lock().outcome = Some(outcome);
                self.set_state(SessionState::Success);
            }
            Err(e) => self.set_state(SessionState::SubmitFailed(e.user_message().to_string())),
        }
        self.state()
    }

    /// Abandon the flow (navigation away). In-flight results are
    /// discarded by the generation guard when they settle.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.lock().clear();
        self.set_state(SessionState::Idle);
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<F::Entry, F::Outcome>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdminRole, OrganizationInfo, QrTokenType};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn claim() -> QrClaim {
        QrClaim {
            token_type: QrTokenType::Org,
            university_id: "univ-1".into(),
            organization_id: "org-1".into(),
            issued_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::minutes(1),
        }
    }

    fn user() -> AuthUser {
        AuthUser {
            id: "u-1".into(),
            name: "学生A".into(),
            admin: AdminRole::None,
            organization_info: OrganizationInfo::default(),
        }
    }

    #[derive(Default)]
    struct FakeFlow {
        entries: Vec<String>,
        forbidden: bool,
        invalid_token: bool,
        fail_submits: AtomicUsize,
        validate_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
        submit_calls: AtomicUsize,
        submit_gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl FlowBackend for FakeFlow {
        type Entry = String;
        type Input = ();
        type Outcome = String;

        async fn validate(&self, _token: &str, _user: &AuthUser) -> AppResult<QrClaim> {
            self.validate_calls.fetch_add(1, Ordering::SeqCst);
            if self.forbidden {
                return Err(AppError::Forbidden("scope mismatch".into()));
            }
            if self.invalid_token {
                return Err(AppError::InvalidToken("expired".into()));
            }
            Ok(claim())
        }

        async fn fetch_entries(&self, _claim: &QrClaim, _user: &AuthUser) -> AppResult<Vec<String>> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.clone())
        }

        async fn submit(
            &self,
            _claim: &QrClaim,
            _user: &AuthUser,
            _entry: &String,
            _input: &(),
        ) -> AppResult<String> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.submit_gate {
                gate.notified().await;
            }
            if self.fail_submits.load(Ordering::SeqCst) > 0 {
                self.fail_submits.fetch_sub(1, Ordering::SeqCst);
                return Err(AppError::Conflict("already rented".into()));
            }
            Ok("done".to_string())
        }
    }

    fn machine_with(flow: FakeFlow) -> SessionMachine<FakeFlow> {
        SessionMachine::new(flow)
    }

    #[tokio::test]
    async fn test_missing_token_is_terminal_without_validation() {
        let machine = machine_with(FakeFlow::default());
        let state = machine.start(None, &user()).await;
        assert!(matches!(state, SessionState::TokenError(_)));
        assert_eq!(machine.backend.validate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_happy_path_reaches_list_ready() {
        let machine = machine_with(FakeFlow {
            entries: vec!["充電器".into(), "カメラ".into()],
            ..Default::default()
        });
        let state = machine.start(Some("a.b.c"), &user()).await;
        assert_eq!(state, SessionState::ListReady);
        assert_eq!(machine.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_list_is_not_an_error() {
        let machine = machine_with(FakeFlow::default());
        let state = machine.start(Some("a.b.c"), &user()).await;
        assert_eq!(state, SessionState::ListEmpty);
    }

    #[tokio::test]
    async fn test_invalid_token_reaches_token_error() {
        let machine = machine_with(FakeFlow {
            invalid_token: true,
            ..Default::default()
        });
        let state = machine.start(Some("a.b.c"), &user()).await;
        assert!(matches!(state, SessionState::TokenError(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_never_fetches_the_list() {
        let machine = machine_with(FakeFlow {
            forbidden: true,
            entries: vec!["充電器".into()],
            ..Default::default()
        });
        let state = machine.start(Some("a.b.c"), &user()).await;
        assert!(matches!(state, SessionState::Unauthorized(_)));
        assert_eq!(machine.backend.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_select_and_submit_succeed() {
        let machine = machine_with(FakeFlow {
            entries: vec!["充電器".into()],
            ..Default::default()
        });
        machine.start(Some("a.b.c"), &user()).await;
        machine.select(0).unwrap();
        assert_eq!(machine.state(), SessionState::Selecting);

        let state = machine.submit(&()).await;
        assert_eq!(state, SessionState::Success);
        assert_eq!(machine.outcome().as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn test_failed_submit_returns_control_and_is_retryable() {
        let flow = FakeFlow {
            entries: vec!["充電器".into()],
            ..Default::default()
        };
        flow.fail_submits.store(1, Ordering::SeqCst);
        let machine = machine_with(flow);
        machine.start(Some("a.b.c"), &user()).await;
        machine.select(0).unwrap();

        let state = machine.submit(&()).await;
        assert!(matches!(state, SessionState::SubmitFailed(_)));
        // selection survives the failure; an explicit re-submit succeeds
        assert!(machine.selected().is_some());
        let state = machine.submit(&()).await;
        assert_eq!(state, SessionState::Success);
    }

    #[tokio::test]
    async fn test_duplicate_submit_is_swallowed_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let machine = Arc::new(machine_with(FakeFlow {
            entries: vec!["充電器".into()],
            submit_gate: Some(gate.clone()),
            ..Default::default()
        }));
        machine.start(Some("a.b.c"), &user()).await;
        machine.select(0).unwrap();

        let first = tokio::spawn({
            let machine = machine.clone();
            async move { machine.submit(&()).await }
        });
        // let the first submission reach the gate
        while machine.backend.submit_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let second = machine.submit(&()).await;
        assert_eq!(second, SessionState::Submitting);
        assert_eq!(machine.backend.submit_calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), SessionState::Success);
    }

    #[tokio::test]
    async fn test_reset_discards_results_settling_afterwards() {
        let gate = Arc::new(Notify::new());
        let machine = Arc::new(machine_with(FakeFlow {
            entries: vec!["充電器".into()],
            submit_gate: Some(gate.clone()),
            ..Default::default()
        }));
        machine.start(Some("a.b.c"), &user()).await;
        machine.select(0).unwrap();

        let pending = tokio::spawn({
            let machine = machine.clone();
            async move { machine.submit(&()).await }
        });
        while machine.backend.submit_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        machine.reset();
        gate.notify_one();
        let state = pending.await.unwrap();
        // the settled result was discarded, not promoted to Success
        assert_eq!(state, SessionState::Idle);
        assert!(machine.outcome().is_none());
    }

    #[tokio::test]
    async fn test_select_out_of_bounds_rejected() {
        let machine = machine_with(FakeFlow {
            entries: vec!["充電器".into()],
            ..Default::default()
        });
        machine.start(Some("a.b.c"), &user()).await;
        assert!(machine.select(3).is_err());
    }
}
