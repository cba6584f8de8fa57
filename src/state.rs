use crate::types::{MonitorSnapshot, Reading, SystemState};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::Instant;
use log::info;
use std::sync::Arc;

/// Shared-state owner. The control loop and the HTTP handler threads both
/// go through the same mutex; the Reading is only ever replaced whole, so
/// last-write-wins needs nothing beyond the lock.
pub struct StateManager {
    state: Arc<Mutex<CriticalSectionRawMutex, SystemState>>,
}

impl StateManager {
    pub fn new(boot: Instant) -> Self {
        Self {
            state: Arc::new(Mutex::new(SystemState::new(boot))),
        }
    }

    pub fn get_state_handle(&self) -> Arc<Mutex<CriticalSectionRawMutex, SystemState>> {
        Arc::clone(&self.state)
    }

    pub async fn latest_reading(&self) -> Reading {
        let state = self.state.lock().await;
        state.reading
    }

    pub async fn publish_snapshot(&self, snapshot: MonitorSnapshot, display_visible: bool) {
        let mut state = self.state.lock().await;
        state.snapshot = snapshot;
        state.display_visible = display_visible;
    }

    pub async fn set_wifi_ready(&self, ready: bool) {
        let mut state = self.state.lock().await;
        if state.wifi_ready != ready {
            info!("Wi-Fi AP {}", if ready { "up" } else { "down" });
            state.wifi_ready = ready;
            self.add_log_message(&mut state, format!("Wi-Fi: {}", if ready { "up" } else { "down" }));
        }
    }

    pub async fn add_log(&self, message: String) {
        let mut state = self.state.lock().await;
        self.add_log_message(&mut state, message);
    }

    fn add_log_message(&self, state: &mut SystemState, message: String) {
        if state.log_messages.len() >= state.log_messages.capacity() {
            state.log_messages.remove(0);
        }
        let _ = state.log_messages.push(message);
    }

    pub async fn get_full_state(&self) -> SystemState {
        let state = self.state.lock().await;
        state.clone()
    }
}
