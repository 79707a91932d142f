use crate::error::Result;
use crate::models::TurnSessionState;

/// Keyed store that keeps session state between invocations.
pub trait SessionStore: Send + Sync {
    /// The most recently updated session that has not expired.
    fn find_recent_session(&self) -> Option<TurnSessionState>;

    fn load_session(&self, session_id: &str) -> Result<Option<TurnSessionState>>;

    fn save_session(&self, session: &TurnSessionState) -> Result<()>;

    fn clear_all_sessions(&self) -> Result<()>;
}
