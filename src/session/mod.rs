mod filesystem;
mod storage;

pub use filesystem::FilesystemSessionStore;
pub use storage::SessionStore;

use crate::models::TurnSessionState;

/// Resume the most recent session unless a fresh one is requested. The flag
/// is `true` when an existing session was resumed.
pub fn load_or_create(
    store: &dyn SessionStore,
    start_new: bool,
    greeting: Option<&str>,
) -> (TurnSessionState, bool) {
    let resumed = if start_new {
        None
    } else {
        store.find_recent_session()
    };
    match resumed {
        Some(state) => (state, true),
        None => (TurnSessionState::new(greeting), false),
    }
}
