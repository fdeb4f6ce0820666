//! Latest-wins request tracking for one view.
//!
//! Every trigger issues a new [`Ticket`]. Only the most recently issued
//! ticket may change what is displayed; older completions are discarded.
//! A failure records an error but never clears an earlier result.

use super::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Failed,
    /// Superseded by a newer request; nothing changed
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing requested yet, or nothing to show
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone)]
pub struct AnalysisSession<T> {
    latest: u64,
    in_flight: bool,
    result: Option<T>,
    last_error: Option<String>,
}

impl<T> Default for AnalysisSession<T> {
    fn default() -> Self {
        Self {
            latest: 0,
            in_flight: false,
            result: None,
            last_error: None,
        }
    }
}

impl<T> AnalysisSession<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new request, superseding any in flight
    pub fn begin(&mut self) -> Ticket {
        self.latest += 1;
        self.in_flight = true;
        Ticket(self.latest)
    }

    pub fn complete(&mut self, ticket: Ticket, outcome: Result<T, AnalysisError>) -> Completion {
        if ticket.0 != self.latest {
            return Completion::Stale;
        }

        self.in_flight = false;
        match outcome {
            Ok(value) => {
                self.result = Some(value);
                self.last_error = None;
                Completion::Applied
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Completion::Failed
            }
        }
    }

    /// Drop the result, any error and any outstanding request. Completions
    /// for tickets issued before this call come back `Stale`.
    pub fn discard(&mut self) {
        self.latest += 1;
        self.in_flight = false;
        self.result = None;
        self.last_error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        if self.in_flight {
            SessionStatus::Loading
        } else if self.last_error.is_some() {
            SessionStatus::Failed
        } else if self.result.is_some() {
            SessionStatus::Ready
        } else {
            SessionStatus::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_idle() {
        let session: AnalysisSession<u32> = AnalysisSession::new();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.result().is_none());
    }

    #[test]
    fn test_success_then_failure_keeps_result() {
        let mut session = AnalysisSession::new();
        let first = session.begin();
        assert_eq!(session.status(), SessionStatus::Loading);
        assert_eq!(session.complete(first, Ok(42)), Completion::Applied);

        let second = session.begin();
        let outcome = session.complete(second, Err(AnalysisError::EmptyResponse));

        assert_eq!(outcome, Completion::Failed);
        assert_eq!(session.result(), Some(&42));
        assert_eq!(session.status(), SessionStatus::Failed);
        assert!(session.last_error().is_some());
    }

    #[test]
    fn test_initial_failure_has_nothing_to_show() {
        let mut session: AnalysisSession<u32> = AnalysisSession::new();
        let ticket = session.begin();
        session.complete(ticket, Err(AnalysisError::config("no key")));

        assert!(session.result().is_none());
        assert!(!session.is_loading());
    }

    #[test]
    fn test_stale_completion_discarded() {
        let mut session = AnalysisSession::new();
        let older = session.begin();
        let newer = session.begin();

        assert_eq!(session.complete(newer, Ok("new")), Completion::Applied);
        assert_eq!(session.complete(older, Ok("old")), Completion::Stale);
        assert_eq!(session.result(), Some(&"new"));
    }

    #[test]
    fn test_stale_completion_does_not_end_loading() {
        let mut session = AnalysisSession::new();
        let older = session.begin();
        let _newer = session.begin();

        assert_eq!(session.complete(older, Ok(1)), Completion::Stale);
        assert!(session.is_loading());
        assert!(session.result().is_none());
    }

    #[test]
    fn test_discard_forgets_result_and_outstanding_ticket() {
        let mut session = AnalysisSession::new();
        let done = session.begin();
        session.complete(done, Ok(5));
        let pending = session.begin();

        session.discard();

        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.result().is_none());
        assert_eq!(session.complete(pending, Ok(9)), Completion::Stale);
        assert!(session.result().is_none());
    }

    #[test]
    fn test_success_clears_previous_error() {
        let mut session = AnalysisSession::new();
        let t1 = session.begin();
        session.complete(t1, Err(AnalysisError::EmptyResponse));
        let t2 = session.begin();
        session.complete(t2, Ok(7));

        assert_eq!(session.status(), SessionStatus::Ready);
        assert!(session.last_error().is_none());
    }
}
