//! Threshold and timing profiles for the heater monitor.

use embassy_time::Duration;

/// Wi-Fi access point the plug joins.
pub const AP_SSID: &str = "ember-ap";
pub const AP_PASSWORD: &str = "powerpass";

/// Control loop cadence.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Minimum interval between panel redraws.
pub const MIN_REDRAW_INTERVAL: Duration = Duration::from_millis(200);

/// Cadence of the raw-reading debug log line.
pub const READING_LOG_INTERVAL: Duration = Duration::from_secs(3);

/// Thresholds and hysteresis timeouts for one deployment. Selected once at
/// startup and passed by value into the state machine; never switched at
/// runtime.
///
/// Thresholds are LOWER bounds of the current band for each trend.
#[derive(Debug, Clone, Copy)]
pub struct MonitorProfile {
    /// Above this the heater element is drawing full power (~12.4 A measured).
    pub heating_threshold_a: f32,
    /// Above this (and below heating) the heater is holding temperature.
    pub maintaining_threshold_a: f32,
    /// Any draw above this counts as "some current" during startup.
    pub off_threshold_a: f32,

    /// No current for this long after boot -> assume the heater is off.
    pub startup_timeout: Duration,
    /// Sustained heating in Warm before we call it Hot. Measured.
    pub warm_to_hot: Duration,
    /// Sustained cooling in Hot before it drops to Warm. Takes a long time!
    pub hot_to_warm: Duration,
    /// Sustained cooling in Warm before it drops to Cool.
    pub warm_to_cool: Duration,
    /// Quiet time in Cool before it settles to Off.
    pub cool_to_off: Duration,

    /// No sample from the plug for this long -> signal is stale.
    /// Normal is one sample per second.
    pub lost_signal_timeout: Duration,
}

impl MonitorProfile {
    /// Production magnitudes, measured against the real heater.
    pub const fn measured() -> Self {
        Self {
            heating_threshold_a: 12.0,
            maintaining_threshold_a: 0.05,
            off_threshold_a: 0.0,
            startup_timeout: Duration::from_secs(20),
            warm_to_hot: Duration::from_secs(100),
            hot_to_warm: Duration::from_secs(72 * 60),
            warm_to_cool: Duration::from_secs(30 * 60),
            cool_to_off: Duration::from_secs(15 * 60),
            lost_signal_timeout: Duration::from_secs(10),
        }
    }

    /// Desk-testing magnitudes: same shape, small enough currents to fake
    /// with a phone charger and short enough timeouts to watch transitions
    /// happen.
    pub const fn bench() -> Self {
        Self {
            heating_threshold_a: 0.33,
            maintaining_threshold_a: 0.10,
            off_threshold_a: 0.0,
            startup_timeout: Duration::from_secs(20),
            warm_to_hot: Duration::from_secs(10),
            hot_to_warm: Duration::from_secs(60),
            warm_to_cool: Duration::from_secs(30),
            cool_to_off: Duration::from_secs(15 * 60),
            lost_signal_timeout: Duration::from_secs(10),
        }
    }

    /// Profile named at build time via `EMBER_PROFILE=bench`; anything else
    /// gets the measured profile.
    pub fn from_build_env() -> Self {
        match option_env!("EMBER_PROFILE") {
            Some("bench") => Self::bench(),
            _ => Self::measured(),
        }
    }
}
