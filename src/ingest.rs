//! HTTP ingestion and status endpoints.
//!
//! The plug pushes one sample per second as `GET /current?value=<amps>`;
//! some plug firmwares only speak the Tasmota command form, so `/cm` accepts
//! the same value wrapped in a `cmnd` argument. `/state` serves the
//! read-only monitor snapshot for anything that wants to poll it.

use crate::types::{Reading, SystemState};
use anyhow;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex, signal::Signal};
use embassy_time::{Duration, Instant, Timer};
use esp_idf_svc::http::server::{Configuration, EspHttpConnection, EspHttpServer, Request};
use esp_idf_svc::http::Method;
use esp_idf_svc::io::Write;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Raised by the ingest handlers when a fresh sample lands, so the control
/// loop can evaluate immediately instead of waiting out its tick.
pub type SampleSignal = Signal<CriticalSectionRawMutex, ()>;

#[derive(Debug, Serialize)]
struct StatusMsg {
    state: String,
    trend: String,
    amps: f32,
    stale: bool,
    seconds_in_state: u64,
    seconds_in_trend: u64,
    display_visible: bool,
    wifi_ready: bool,
    log_messages: Vec<String>,
}

#[derive(Clone)]
pub struct IngestServer {
    state: Arc<Mutex<CriticalSectionRawMutex, SystemState>>,
    fresh_sample: Arc<SampleSignal>,
}

impl IngestServer {
    pub fn new(
        state: Arc<Mutex<CriticalSectionRawMutex, SystemState>>,
        fresh_sample: Arc<SampleSignal>,
    ) -> Self {
        Self {
            state,
            fresh_sample,
        }
    }

    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Starting ingest HTTP server");

        let config = Configuration {
            stack_size: 8192,
            max_sessions: 8,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&config)?;

        // Primary ingestion: GET /current?value=3.2
        let state_handle = Arc::clone(&self.state);
        let sample_signal = Arc::clone(&self.fresh_sample);
        server.fn_handler("/current", Method::Get, move |request| -> Result<(), anyhow::Error> {
            let value = query_param(request.uri(), "value").map(str::to_owned);
            match value {
                Some(raw) => {
                    let amps = parse_amps(&raw);
                    debug!("Current reading: {} -> {:.2} A", raw, amps);
                    accept_reading(&state_handle, &sample_signal, amps, request)
                }
                None => {
                    let mut response = request.into_response(400, Some("Bad Request"), &[])?;
                    response.write_all(b"No current value provided")?;
                    Ok(())
                }
            }
        })?;

        // Tasmota-style command alias: GET /cm?cmnd=/current?value=3.2
        let state_handle = Arc::clone(&self.state);
        let sample_signal = Arc::clone(&self.fresh_sample);
        server.fn_handler("/cm", Method::Get, move |request| -> Result<(), anyhow::Error> {
            let value = query_param(request.uri(), "cmnd")
                .and_then(|cmnd| cmnd.strip_prefix("/current?value="))
                .map(str::to_owned);
            match value {
                Some(raw) => {
                    let amps = parse_amps(&raw);
                    debug!("Current reading via cm: {} -> {:.2} A", raw, amps);
                    accept_reading(&state_handle, &sample_signal, amps, request)
                }
                None => {
                    let mut response = request.into_response(400, Some("Bad Request"), &[])?;
                    response.write_all(b"Invalid command")?;
                    Ok(())
                }
            }
        })?;

        // Read-only monitor snapshot for polling clients.
        let state_handle = Arc::clone(&self.state);
        server.fn_handler("/state", Method::Get, move |request| -> Result<(), anyhow::Error> {
            if let Ok(state) = state_handle.try_lock() {
                let now = Instant::now();
                let msg = StatusMsg {
                    state: format!("{:?}", state.snapshot.state),
                    trend: format!("{:?}", state.snapshot.trend),
                    amps: state.reading.amps,
                    stale: state.snapshot.stale,
                    seconds_in_state: state.snapshot.seconds_in_state(now),
                    seconds_in_trend: state.snapshot.seconds_in_trend(now),
                    display_visible: state.display_visible,
                    wifi_ready: state.wifi_ready,
                    log_messages: state.log_messages.iter().cloned().collect(),
                };
                drop(state);

                let json = serde_json::to_string(&msg)?;
                let mut response = request.into_response(
                    200,
                    Some("OK"),
                    &[
                        ("Content-Type", "application/json"),
                        ("Cache-Control", "no-cache"),
                    ],
                )?;
                response.write_all(json.as_bytes())?;
            } else {
                warn!("State locked, returning 503");
                let mut response = request.into_response(503, Some("Service Unavailable"), &[])?;
                response.write_all(b"State temporarily unavailable")?;
            }
            Ok(())
        })?;

        info!("Ingest server ready:");
        info!("  GET /current?value=<amps> - plug sample ingestion");
        info!("  GET /cm?cmnd=/current?value=<amps> - Tasmota command alias");
        info!("  GET /state - monitor snapshot (JSON)");

        // The server lives as long as this future.
        loop {
            Timer::after(Duration::from_secs(10)).await;
            debug!("Ingest server heartbeat");
        }
    }
}

/// Overwrite the shared Reading (last-write-wins) and wake the control loop.
fn accept_reading(
    state: &Arc<Mutex<CriticalSectionRawMutex, SystemState>>,
    fresh_sample: &Arc<SampleSignal>,
    amps: f32,
    request: Request<&mut EspHttpConnection>,
) -> Result<(), anyhow::Error> {
    if let Ok(mut state) = state.try_lock() {
        state.reading = Reading {
            amps,
            received_at: Instant::now(),
        };
        drop(state);
        fresh_sample.signal(());

        let mut response = request.into_response(200, Some("OK"), &[("Content-Type", "text/plain")])?;
        response.write_all(format!("Received: {:.2}", amps).as_bytes())?;
    } else {
        // Dropped sample; the plug retries every second anyway.
        warn!("State locked, dropping sample");
        let mut response = request.into_response(503, Some("Service Unavailable"), &[])?;
        response.write_all(b"Busy")?;
    }
    Ok(())
}

/// Amperage parse with the fail-safe the plug firmware relies on: anything
/// that is not a finite number reads as "no current".
fn parse_amps(raw: &str) -> f32 {
    match raw.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Value of `key` in the URI query string. The value may itself contain
/// `?` and `=` (the Tasmota command form does), so only the first `?` and
/// the first `=` per pair delimit.
fn query_param<'a>(uri: &'a str, key: &str) -> Option<&'a str> {
    let (_, query) = uri.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}
