//! Session state: at most one analysis in flight, latest result kept.
//!
//! A [`Session`] is what a front-end holds between submissions. It refuses a
//! second submission while one is running, discards the previous result when
//! a new one starts, and keeps whatever the latest attempt produced (package
//! or error) until the next attempt or [`Session::reset`].

use crate::analyze::analyze;
use crate::config::AnalysisConfig;
use crate::error::SenseiError;
use crate::package::LearningPackage;
use crate::pipeline::input::IngestedInput;
use tracing::debug;

/// Where a session stands.
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// A request is outstanding; submissions are refused.
    Submitting,
    Succeeded(LearningPackage),
    Failed(SenseiError),
}

/// Holds the configuration and the state of the most recent attempt.
#[derive(Debug)]
pub struct Session {
    config: AnalysisConfig,
    state: SessionState,
}

impl Session {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The package of the last successful attempt, if that is the current state.
    pub fn package(&self) -> Option<&LearningPackage> {
        match &self.state {
            SessionState::Succeeded(p) => Some(p),
            _ => None,
        }
    }

    /// The error of the last failed attempt, if that is the current state.
    pub fn error(&self) -> Option<&SenseiError> {
        match &self.state {
            SessionState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, SessionState::Submitting)
    }

    /// Enter `Submitting`, discarding any previous result.
    ///
    /// # Errors
    /// [`SenseiError::AnalysisInProgress`] if already submitting; the state is
    /// left untouched.
    pub fn begin(&mut self) -> Result<(), SenseiError> {
        if self.is_busy() {
            return Err(SenseiError::AnalysisInProgress);
        }
        self.state = SessionState::Submitting;
        debug!("Session: submitting");
        Ok(())
    }

    /// Record the outcome of the outstanding attempt.
    ///
    /// Ignored unless the session is `Submitting`.
    pub fn finish(&mut self, result: Result<LearningPackage, SenseiError>) -> &SessionState {
        if self.is_busy() {
            self.state = match result {
                Ok(p) => SessionState::Succeeded(p),
                Err(e) => SessionState::Failed(e),
            };
            debug!("Session: finished ({})", if self.package().is_some() { "ok" } else { "error" });
        }
        &self.state
    }

    /// Run one full attempt: [`begin`](Self::begin), [`analyze`], [`finish`](Self::finish).
    pub async fn submit(&mut self, input: &IngestedInput) -> Result<&SessionState, SenseiError> {
        self.begin()?;
        let result = analyze(input, &self.config).await;
        Ok(self.finish(result))
    }

    /// Back to `Idle`, dropping any result.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::package::fixtures::sample_package;

    fn session() -> Session {
        Session::new(AnalysisConfig::default())
    }

    #[test]
    fn starts_idle() {
        let s = session();
        assert!(matches!(s.state(), SessionState::Idle));
        assert!(s.package().is_none());
        assert!(!s.is_busy());
    }

    #[test]
    fn double_begin_is_refused() {
        let mut s = session();
        s.begin().unwrap();
        let err = s.begin().unwrap_err();
        assert!(matches!(err, SenseiError::AnalysisInProgress));
        assert_eq!(err.kind(), ErrorKind::Session);
        assert!(s.is_busy());
    }

    #[test]
    fn success_then_resubmit_discards_previous_result() {
        let mut s = session();
        s.begin().unwrap();
        s.finish(Ok(sample_package()));
        assert_eq!(s.package(), Some(&sample_package()));

        s.begin().unwrap();
        assert!(s.package().is_none());
        assert!(s.is_busy());
    }

    #[test]
    fn failure_is_kept_until_next_attempt() {
        let mut s = session();
        s.begin().unwrap();
        s.finish(Err(SenseiError::MissingInput));
        assert!(matches!(s.error(), Some(SenseiError::MissingInput)));
        assert!(!s.is_busy());
        s.begin().unwrap();
        assert!(s.error().is_none());
    }

    #[test]
    fn finish_without_begin_is_ignored() {
        let mut s = session();
        s.finish(Ok(sample_package()));
        assert!(matches!(s.state(), SessionState::Idle));
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut s = session();
        s.begin().unwrap();
        s.finish(Ok(sample_package()));
        s.reset();
        assert!(matches!(s.state(), SessionState::Idle));
    }

    #[tokio::test]
    async fn submit_with_blank_text_fails_into_session_state() {
        let mut s = session();
        let state = s.submit(&IngestedInput::Text("  ".into())).await.unwrap();
        assert!(matches!(state, SessionState::Failed(SenseiError::MissingInput)));
        assert!(!s.is_busy());
    }
}
