use std::sync::Arc;

use duel::DuelService;
use tokio::sync::mpsc;

use crate::events::OpsEvent;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DuelService>,
    ops: mpsc::UnboundedSender<OpsEvent>,
}

impl AppState {
    pub fn new(service: Arc<DuelService>, ops: mpsc::UnboundedSender<OpsEvent>) -> Self {
        Self { service, ops }
    }

    /// Forwards an operator event; the console (or the log, in headless
    /// mode) consumes the other end.
    pub fn emit(&self, event: OpsEvent) {
        let _ = self.ops.send(event);
    }
}
