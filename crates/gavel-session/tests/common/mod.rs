//! Shared helpers for session integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gavel_session::{Presenter, PresenterEvent, ServerSelection};

/// Presenter that records every event into a shared log, so a test can
/// watch a machine that lives inside a running driver.
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    pub events: Arc<Mutex<Vec<PresenterEvent>>>,
    pub selection: Option<ServerSelection>,
}

impl RecordingPresenter {
    pub fn snapshot(&self) -> Vec<PresenterEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &PresenterEvent) -> bool {
        self.events.lock().unwrap().contains(event)
    }

    /// Poll until `predicate` matches a recorded event or `timeout` passes.
    pub async fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl Fn(&PresenterEvent) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.events.lock().unwrap().iter().any(&predicate) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, event: PresenterEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn selected_server(&self) -> Option<ServerSelection> {
        self.selection
    }

    fn lobby_chat_log(&self) -> String {
        String::new()
    }
}
