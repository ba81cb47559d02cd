/// Screen sequence of one QR-driven flow:
/// scan → validate → list → select → submit → confirm.
///
/// Error states are terminal for their step and always require explicit
/// user re-action; nothing retries on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    TokenLoading,
    /// Token absent, malformed, expired, or resolution failed
    TokenError(String),
    /// Token valid but its organization is outside the user's scope
    Unauthorized(String),
    TokenValid,
    ListLoading,
    ListReady,
    /// Zero entries. A distinct screen, not an error
    ListEmpty,
    /// Scoped list fetch failed
    ListError(String),
    Selecting,
    Submitting,
    Success,
    /// Control returns to the selection with the message shown inline
    SubmitFailed(String),
}

impl SessionState {
    /// States from which a submission may be dispatched
    pub fn can_submit(&self) -> bool {
        matches!(self, SessionState::Selecting | SessionState::SubmitFailed(_))
    }
}
