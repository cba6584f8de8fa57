use crate::config::MonitorProfile;
use crate::staleness::StalenessMonitor;
use crate::trend;
use crate::types::{HeaterState, HeaterTrend, MonitorSnapshot};
use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

/// Hysteresis state machine over the plug's amperage readings.
///
/// Threshold crossings alone never flip the state; transitions out of Warm,
/// Hot and Cool additionally require the trend to persist for a profile
/// timeout, which absorbs sensor noise near the band edges. The trend axis
/// is evaluated independently so the sign can show "cooling" long before
/// the coarse state label moves.
pub struct HeaterStateMachine {
    profile: MonitorProfile,
    staleness: StalenessMonitor,
    state: HeaterState,
    trend: HeaterTrend,
    last_state_change: Instant,
    last_trend_change: Instant,
    stale: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct StateTransition {
    pub from: HeaterState,
    pub to: HeaterState,
}

impl HeaterStateMachine {
    pub fn new(profile: MonitorProfile, boot: Instant) -> Self {
        Self {
            staleness: StalenessMonitor::new(profile.lost_signal_timeout),
            profile,
            state: HeaterState::Startup,
            trend: HeaterTrend::Unknown,
            last_state_change: boot,
            last_trend_change: boot,
            stale: false,
        }
    }

    /// One evaluation tick: staleness first, then trend, then the state
    /// table. `received_at` is when the reading arrived, `now` is the tick
    /// time; all hysteresis gates measure from the last state change.
    pub fn update(&mut self, amps: f32, received_at: Instant, now: Instant) -> Option<StateTransition> {
        let previous = self.state;

        if self.staleness.is_stale(now, received_at) {
            // Staleness pre-empts everything: no reading, no inference.
            self.stale = true;
            self.set_state(HeaterState::Unknown, now);
            self.set_trend(HeaterTrend::Unknown, now);
            return self.transition_from(previous);
        }
        self.stale = false;

        self.set_trend(trend::classify(amps, self.state, &self.profile), now);

        let next = self.next_state(amps, now);
        self.set_state(next, now);

        self.transition_from(previous)
    }

    fn next_state(&self, amps: f32, now: Instant) -> HeaterState {
        let elapsed = now.duration_since(self.last_state_change);
        let p = &self.profile;

        match self.state {
            // Power during startup means the element is live and was
            // probably on for a while before we booted: assume Hot.
            HeaterState::Startup => {
                if amps > p.off_threshold_a {
                    HeaterState::Hot
                } else if elapsed > p.startup_timeout {
                    HeaterState::Off
                } else {
                    HeaterState::Startup
                }
            }

            HeaterState::Off | HeaterState::Cool => {
                if amps > p.heating_threshold_a {
                    HeaterState::Warm
                } else if amps >= p.maintaining_threshold_a {
                    // A cold heater drawing maintain-level current should be
                    // physically impossible; the plug does this briefly
                    // sometimes. Reclassify rather than fault.
                    warn!(
                        "Unexpected {:.2} A while {:?}, reclassifying as Hot",
                        amps, self.state
                    );
                    HeaterState::Hot
                } else if self.state == HeaterState::Cool && elapsed > p.cool_to_off {
                    HeaterState::Off
                } else {
                    self.state
                }
            }

            HeaterState::Warm => {
                if self.trend == HeaterTrend::Maintaining {
                    // Maintaining means it reached temperature; it should
                    // already have been Hot.
                    HeaterState::Hot
                } else if self.trend == HeaterTrend::Heating && elapsed > p.warm_to_hot {
                    HeaterState::Hot
                } else if self.trend == HeaterTrend::Cooling && elapsed > p.warm_to_cool {
                    HeaterState::Cool
                } else {
                    HeaterState::Warm
                }
            }

            HeaterState::Hot => {
                if self.trend == HeaterTrend::Cooling && elapsed > p.hot_to_warm {
                    HeaterState::Warm
                } else {
                    HeaterState::Hot
                }
            }

            // Reached only with a fresh reading, i.e. the stale flag just
            // cleared. The outage made the prior physical state unknowable,
            // so re-enter Startup instead of resuming.
            HeaterState::Unknown => HeaterState::Startup,
        }
    }

    fn set_state(&mut self, new_state: HeaterState, now: Instant) {
        if new_state != self.state {
            info!("Heater state: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
            self.last_state_change = now;
        }
    }

    fn set_trend(&mut self, new_trend: HeaterTrend, now: Instant) {
        if new_trend != self.trend {
            debug!("Heater trend: {:?} -> {:?}", self.trend, new_trend);
            self.trend = new_trend;
            self.last_trend_change = now;
        }
    }

    fn transition_from(&self, previous: HeaterState) -> Option<StateTransition> {
        if self.state != previous {
            Some(StateTransition {
                from: previous,
                to: self.state,
            })
        } else {
            None
        }
    }

    pub fn state(&self) -> HeaterState {
        self.state
    }

    pub fn trend(&self) -> HeaterTrend {
        self.trend
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn time_in_state(&self, now: Instant) -> Duration {
        now.duration_since(self.last_state_change)
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            state: self.state,
            trend: self.trend,
            last_state_change: self.last_state_change,
            last_trend_change: self.last_trend_change,
            stale: self.stale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_at(state: HeaterState, changed_at_ms: u64) -> HeaterStateMachine {
        let mut m = HeaterStateMachine::new(MonitorProfile::measured(), Instant::from_millis(0));
        m.state = state;
        m.last_state_change = Instant::from_millis(changed_at_ms);
        m
    }

    /// Feed one fresh reading at `now_ms`; the sample itself is also
    /// stamped `now_ms` so staleness never triggers.
    fn tick(m: &mut HeaterStateMachine, amps: f32, now_ms: u64) -> Option<StateTransition> {
        m.update(amps, Instant::from_millis(now_ms), Instant::from_millis(now_ms))
    }

    #[test]
    fn test_startup_with_current_goes_hot() {
        let mut m = machine_at(HeaterState::Startup, 0);
        tick(&mut m, 7.5, 1_000);
        assert_eq!(m.state(), HeaterState::Hot);
    }

    #[test]
    fn test_startup_times_out_to_off() {
        // Scenario A: 21 s of zero current in Startup.
        let mut m = machine_at(HeaterState::Startup, 0);
        tick(&mut m, 0.0, 19_000);
        assert_eq!(m.state(), HeaterState::Startup);
        tick(&mut m, 0.0, 21_000);
        assert_eq!(m.state(), HeaterState::Off);
    }

    #[test]
    fn test_off_jumps_to_warm_on_heating_current() {
        // Scenario B: 13 A from Off.
        let mut m = machine_at(HeaterState::Off, 0);
        let transition = tick(&mut m, 13.0, 1_000).unwrap();
        assert_eq!(transition.from, HeaterState::Off);
        assert_eq!(transition.to, HeaterState::Warm);
        assert_eq!(m.trend(), HeaterTrend::Heating);
    }

    #[test]
    fn test_anomalous_midrange_current_reclassifies_hot() {
        let mut m = machine_at(HeaterState::Cool, 0);
        tick(&mut m, 7.6, 1_000);
        assert_eq!(m.state(), HeaterState::Hot);

        let mut m = machine_at(HeaterState::Off, 0);
        tick(&mut m, 0.05, 1_000);
        assert_eq!(m.state(), HeaterState::Hot);
    }

    #[test]
    fn test_cool_settles_to_off_after_timeout() {
        let mut m = machine_at(HeaterState::Cool, 0);
        tick(&mut m, 0.0, 14 * 60_000);
        assert_eq!(m.state(), HeaterState::Cool);
        tick(&mut m, 0.0, 15 * 60_000 + 1_000);
        assert_eq!(m.state(), HeaterState::Off);
    }

    #[test]
    fn test_warm_to_hot_after_sustained_heating() {
        // Scenario C: heating held for 101 s.
        let mut m = machine_at(HeaterState::Warm, 0);
        tick(&mut m, 13.0, 99_000);
        assert_eq!(m.state(), HeaterState::Warm);
        tick(&mut m, 13.0, 101_000);
        assert_eq!(m.state(), HeaterState::Hot);
    }

    #[test]
    fn test_warm_to_hot_immediately_on_maintaining() {
        let mut m = machine_at(HeaterState::Warm, 0);
        tick(&mut m, 7.6, 1_000);
        assert_eq!(m.state(), HeaterState::Hot);
    }

    #[test]
    fn test_warm_cools_back_down() {
        let mut m = machine_at(HeaterState::Warm, 0);
        tick(&mut m, 0.0, 29 * 60_000);
        assert_eq!(m.state(), HeaterState::Warm);
        assert_eq!(m.trend(), HeaterTrend::Cooling);
        tick(&mut m, 0.0, 30 * 60_000 + 1_000);
        assert_eq!(m.state(), HeaterState::Cool);
    }

    #[test]
    fn test_hot_to_warm_after_long_cooldown() {
        // Scenario D: cooling held past 72 minutes.
        let mut m = machine_at(HeaterState::Hot, 0);
        tick(&mut m, 0.0, 71 * 60_000);
        assert_eq!(m.state(), HeaterState::Hot);
        tick(&mut m, 0.0, 72 * 60_000 + 1);
        assert_eq!(m.state(), HeaterState::Warm);
    }

    #[test]
    fn test_stale_signal_forces_unknown() {
        // Scenario E: last sample at t=0, evaluated at t=10.001 s.
        let mut m = machine_at(HeaterState::Hot, 0);
        let transition = m
            .update(13.0, Instant::from_millis(0), Instant::from_millis(10_001))
            .unwrap();
        assert_eq!(transition.to, HeaterState::Unknown);
        assert!(m.is_stale());
        assert_eq!(m.state(), HeaterState::Unknown);
        assert_eq!(m.trend(), HeaterTrend::Unknown);
    }

    #[test]
    fn test_recovery_reenters_startup_not_prior_state() {
        let mut m = machine_at(HeaterState::Hot, 0);
        m.update(13.0, Instant::from_millis(0), Instant::from_millis(20_000));
        assert_eq!(m.state(), HeaterState::Unknown);

        // Fresh sample with heavy current: must go through Startup, never
        // straight back to Hot/Warm.
        let transition = tick(&mut m, 13.0, 21_000).unwrap();
        assert_eq!(transition.from, HeaterState::Unknown);
        assert_eq!(transition.to, HeaterState::Startup);
        assert!(!m.is_stale());

        // The next fresh tick may then classify normally.
        tick(&mut m, 13.0, 22_000);
        assert_eq!(m.state(), HeaterState::Hot);
    }

    #[test]
    fn test_self_transition_keeps_timestamps() {
        let mut m = machine_at(HeaterState::Hot, 0);
        tick(&mut m, 13.0, 5_000);
        let first = m.snapshot();
        assert!(tick(&mut m, 13.0, 6_000).is_none());
        let second = m.snapshot();
        assert_eq!(first.last_state_change, second.last_state_change);
        assert_eq!(first.last_trend_change, second.last_trend_change);
    }

    #[test]
    fn test_repeated_stale_ticks_do_not_reset_clock() {
        let mut m = machine_at(HeaterState::Hot, 0);
        m.update(0.0, Instant::from_millis(0), Instant::from_millis(15_000));
        let entered_unknown = m.snapshot().last_state_change;
        m.update(0.0, Instant::from_millis(0), Instant::from_millis(30_000));
        assert_eq!(m.snapshot().last_state_change, entered_unknown);
    }

    #[test]
    fn test_trend_timestamp_updates_only_on_change() {
        let mut m = machine_at(HeaterState::Hot, 0);
        tick(&mut m, 13.0, 1_000);
        assert_eq!(m.trend(), HeaterTrend::Heating);
        let stamped = m.snapshot().last_trend_change;
        tick(&mut m, 13.2, 2_000);
        assert_eq!(m.snapshot().last_trend_change, stamped);
        tick(&mut m, 0.0, 3_000);
        assert_eq!(m.trend(), HeaterTrend::Cooling);
        assert_eq!(
            m.snapshot().last_trend_change,
            Instant::from_millis(3_000)
        );
    }
}
