use async_trait::async_trait;
use skiff_core::{StatusEvent, Subscribe};

use crate::subscriber::view::log_status;

/// Writes every task status change to the log.
#[derive(Debug, Default)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for Journal {
    async fn on_status(&self, event: &StatusEvent) {
        log_status(event);
    }

    fn name(&self) -> &'static str {
        "journal"
    }
}
