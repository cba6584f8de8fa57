use embassy_time::Instant;
use serde::{Deserialize, Serialize};

/// Coarse heater status, inferred from accumulated current-draw history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaterState {
    Startup,
    Off,
    Cool,
    Warm,
    Hot,
    Unknown,
}

/// Instantaneous current direction. Independent axis from `HeaterState`:
/// the trend can read Cooling while the state is still Hot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaterTrend {
    Heating,
    Cooling,
    Maintaining,
    Idle,
    Unknown,
}

/// Latest amperage sample from the plug. Overwritten in place on every
/// ingest request; no history, no averaging.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub amps: f32,
    pub received_at: Instant,
}

impl Reading {
    /// Boot-time placeholder: zero current stamped with the boot instant.
    /// If the plug never shows up this ages into staleness like any other
    /// reading.
    pub fn at_boot(boot: Instant) -> Self {
        Self {
            amps: 0.0,
            received_at: boot,
        }
    }
}

/// The full externally observable monitor status, recomputed each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSnapshot {
    pub state: HeaterState,
    pub trend: HeaterTrend,
    pub last_state_change: Instant,
    pub last_trend_change: Instant,
    pub stale: bool,
}

impl MonitorSnapshot {
    pub fn initial(boot: Instant) -> Self {
        Self {
            state: HeaterState::Startup,
            trend: HeaterTrend::Unknown,
            last_state_change: boot,
            last_trend_change: boot,
            stale: false,
        }
    }

    pub fn seconds_in_state(&self, now: Instant) -> u64 {
        now.duration_since(self.last_state_change).as_secs()
    }

    pub fn seconds_in_trend(&self, now: Instant) -> u64 {
        now.duration_since(self.last_trend_change).as_secs()
    }
}

/// Shared system state behind the controller mutex. HTTP handlers overwrite
/// `reading` (last-write-wins) and read everything else.
#[derive(Debug, Clone)]
pub struct SystemState {
    pub reading: Reading,
    pub snapshot: MonitorSnapshot,
    pub display_visible: bool,
    pub wifi_ready: bool,
    pub log_messages: heapless::Vec<String, 50>,
}

impl SystemState {
    pub fn new(boot: Instant) -> Self {
        Self {
            reading: Reading::at_boot(boot),
            snapshot: MonitorSnapshot::initial(boot),
            display_visible: true,
            wifi_ready: false,
            log_messages: heapless::Vec::new(),
        }
    }
}
