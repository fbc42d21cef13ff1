use std::sync::Arc;

use crate::session::Session;

pub trait SessionDirectory: Send + Sync {
    fn live_session_ids(&self) -> Vec<String>;

    fn session(&self, id: &str) -> Option<Arc<Session>>;
}
