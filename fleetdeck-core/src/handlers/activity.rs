//! Activity logging and the per-dispatch status reset.

use std::sync::Arc;

use crate::dispatch::{Action, Handler};
use crate::error::HandlerError;
use crate::store::Db;

/// Registered first: logs every action and clears the last failure message
/// so each user action starts with a clean status line.
#[derive(Debug, Clone)]
pub struct ActivityHandler {
    db: Arc<Db>,
}

impl ActivityHandler {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

impl Handler for ActivityHandler {
    fn handle(&self, action: &Action) -> Result<(), HandlerError> {
        tracing::info!(kind = action.kind(), "action");
        if !self.db.post_status.get().is_empty() {
            self.db.post_status.reset(String::new());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn clears_status_once() {
        let db = Arc::new(Db::new());
        let handler = ActivityHandler::new(db.clone());
        db.post_status.reset("boom".into());

        let resets = Arc::new(AtomicI32::new(0));
        let resets_clone = resets.clone();
        db.post_status.add_watch("status-bar", move || {
            resets_clone.fetch_add(1, Ordering::SeqCst);
        });

        handler.handle(&Action::GetDevices).unwrap();
        handler.handle(&Action::GetPackages).unwrap();

        assert_eq!(db.error_message(), None);
        // An already-empty status is left alone.
        assert_eq!(resets.load(Ordering::SeqCst), 1);
    }
}
