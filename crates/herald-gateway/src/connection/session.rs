//! Session state
//!
//! What is needed to resume instead of identifying again.

/// Resumable session data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    session_id: Option<String>,
    resume_url: Option<String>,
    sequence: Option<u64>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session from READY
    pub fn save(
        &mut self,
        session_id: impl Into<String>,
        resume_url: impl Into<String>,
        sequence: Option<u64>,
    ) {
        self.session_id = Some(session_id.into());
        self.resume_url = Some(resume_url.into());
        self.sequence = sequence;
    }

    /// Forget the session; the next handshake must identify
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True while a session id and resume endpoint are present
    pub fn is_resumable(&self) -> bool {
        self.session_id.is_some() && self.resume_url.is_some()
    }

    /// Remember the last sequence seen before a disconnect
    pub fn record_sequence(&mut self, sequence: Option<u64>) {
        if sequence.is_some() {
            self.sequence = sequence;
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url.as_deref()
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }
}
