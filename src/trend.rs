use crate::config::MonitorProfile;
use crate::types::{HeaterState, HeaterTrend};

/// Classify the instantaneous current direction from the latest amperage and
/// the state confirmed on the previous tick.
///
/// Below the maintaining band the reading alone cannot distinguish a heater
/// that is cooling down from one that was never on; the prior state breaks
/// the tie.
pub fn classify(amps: f32, prior_state: HeaterState, profile: &MonitorProfile) -> HeaterTrend {
    if amps >= profile.heating_threshold_a {
        HeaterTrend::Heating
    } else if amps >= profile.maintaining_threshold_a {
        HeaterTrend::Maintaining
    } else if matches!(prior_state, HeaterState::Cool | HeaterState::Off) {
        HeaterTrend::Idle
    } else {
        HeaterTrend::Cooling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: MonitorProfile = MonitorProfile::measured();

    #[test]
    fn test_heating_at_or_above_threshold() {
        for state in [
            HeaterState::Startup,
            HeaterState::Off,
            HeaterState::Cool,
            HeaterState::Warm,
            HeaterState::Hot,
            HeaterState::Unknown,
        ] {
            assert_eq!(classify(12.0, state, &PROFILE), HeaterTrend::Heating);
            assert_eq!(classify(13.4, state, &PROFILE), HeaterTrend::Heating);
        }
    }

    #[test]
    fn test_maintaining_band() {
        assert_eq!(
            classify(7.6, HeaterState::Hot, &PROFILE),
            HeaterTrend::Maintaining
        );
        assert_eq!(
            classify(0.05, HeaterState::Cool, &PROFILE),
            HeaterTrend::Maintaining
        );
    }

    #[test]
    fn test_no_current_is_idle_when_cold() {
        assert_eq!(
            classify(0.0, HeaterState::Cool, &PROFILE),
            HeaterTrend::Idle
        );
        assert_eq!(classify(0.04, HeaterState::Off, &PROFILE), HeaterTrend::Idle);
    }

    #[test]
    fn test_no_current_is_cooling_when_warm() {
        assert_eq!(
            classify(0.0, HeaterState::Hot, &PROFILE),
            HeaterTrend::Cooling
        );
        assert_eq!(
            classify(0.0, HeaterState::Warm, &PROFILE),
            HeaterTrend::Cooling
        );
        assert_eq!(
            classify(0.0, HeaterState::Startup, &PROFILE),
            HeaterTrend::Cooling
        );
    }
}
