use crate::{
    config::{MonitorProfile, READING_LOG_INTERVAL, TICK_INTERVAL},
    hardware::panel::Hub75Frame,
    heater_states::HeaterStateMachine,
    ingest::{IngestServer, SampleSignal},
    render::{StatusFrame, StatusRenderer},
    schedule::{self, DisplaySchedule},
    state::StateManager,
    types::HeaterState,
};
use embassy_executor::Spawner;
use embassy_futures::select::select;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Timer};
use log::{debug, info, warn};
use std::sync::Arc;

/// Owns the tick loop: reads the latest plug sample, runs the state
/// machine, consults the visibility schedule and paints the panel. The
/// ingest server runs as its own embassy task and only touches the shared
/// state mutex.
pub struct HeaterController {
    state_manager: StateManager,
    monitor: HeaterStateMachine,
    schedule: DisplaySchedule,
    renderer: StatusRenderer,
    panel: Hub75Frame,
    ingest_server: IngestServer,
    fresh_sample: Arc<SampleSignal>,
    last_reading_log: Instant,
}

impl HeaterController {
    pub fn new(profile: MonitorProfile) -> Self {
        let boot = Instant::now();
        let state_manager = StateManager::new(boot);
        let fresh_sample = Arc::new(Signal::new());
        let ingest_server = IngestServer::new(
            state_manager.get_state_handle(),
            Arc::clone(&fresh_sample),
        );

        Self {
            state_manager,
            monitor: HeaterStateMachine::new(profile, boot),
            schedule: DisplaySchedule::shop_hours(),
            renderer: StatusRenderer::new(),
            panel: Hub75Frame::new(),
            ingest_server,
            fresh_sample,
            last_reading_log: boot,
        }
    }

    pub async fn set_wifi_ready(&self, ready: bool) {
        self.state_manager.set_wifi_ready(ready).await;
    }

    pub async fn start(&mut self, spawner: Spawner) -> Result<(), Box<dyn std::error::Error>> {
        info!("Starting heater controller");

        if spawner.spawn(ingest_task(self.ingest_server.clone())).is_err() {
            warn!("Failed to spawn ingest task - continuing without HTTP ingestion");
        }

        self.main_control_loop().await;
        Ok(())
    }

    async fn main_control_loop(&mut self) {
        info!("Starting main control loop");

        loop {
            // Fresh samples wake the loop early; the tick bounds how long a
            // silent plug can go unnoticed.
            select(self.fresh_sample.wait(), Timer::after(TICK_INTERVAL)).await;
            self.evaluate_tick(Instant::now()).await;
        }
    }

    async fn evaluate_tick(&mut self, now: Instant) {
        let reading = self.state_manager.latest_reading().await;

        if let Some(transition) = self.monitor.update(reading.amps, reading.received_at, now) {
            self.state_manager
                .add_log(format!("State: {:?} -> {:?}", transition.from, transition.to))
                .await;
        }

        let snapshot = self.monitor.snapshot();

        // The schedule only ever hides a confirmed-Off sign; anything else
        // renders around the clock, Unknown included.
        let visible = snapshot.state != HeaterState::Off
            || self.schedule.is_visible(schedule::synced_local_now());

        self.state_manager.publish_snapshot(snapshot, visible).await;

        if now.duration_since(self.last_reading_log) >= READING_LOG_INTERVAL {
            debug!(
                "Reading: {:.2} A, state {:?}, trend {:?}, stale {}",
                reading.amps,
                snapshot.state,
                snapshot.trend,
                snapshot.stale
            );
            self.last_reading_log = now;
        }

        let frame = StatusFrame::compose(&snapshot, now, visible);
        if let Ok(true) = self.renderer.render(&mut self.panel, &frame, now) {
            debug!("Panel redraw: {:?} / {:?}", frame.state, frame.trend);
        }
    }
}

#[embassy_executor::task]
async fn ingest_task(server: IngestServer) {
    info!("Ingest task started");
    if let Err(e) = server.start().await {
        warn!(
            "Ingest server failed: {:?} - continuing without HTTP ingestion",
            e
        );
    }
}
