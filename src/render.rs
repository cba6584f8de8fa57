//! Status sign rendering: label/color tables, elapsed-time formatting and
//! the debounced frame painter.

use crate::config::MIN_REDRAW_INTERVAL;
use crate::types::{HeaterState, HeaterTrend, MonitorSnapshot};
use embassy_time::{Duration, Instant};
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, ascii::FONT_9X15, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::*,
    text::{Alignment, Baseline, Text},
};

/// Label + panel color for one state or trend value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusStyle {
    pub label: &'static str,
    pub color: Rgb565,
}

pub fn state_style(state: HeaterState) -> StatusStyle {
    match state {
        HeaterState::Startup => StatusStyle {
            label: "STARTUP",
            color: Rgb565::WHITE,
        },
        HeaterState::Off => StatusStyle {
            label: "OFF",
            color: Rgb565::CSS_GRAY,
        },
        HeaterState::Cool => StatusStyle {
            label: "COOL",
            color: Rgb565::CSS_LIGHT_BLUE,
        },
        HeaterState::Warm => StatusStyle {
            label: "WARMING",
            color: Rgb565::CSS_DARK_ORANGE,
        },
        HeaterState::Hot => StatusStyle {
            label: "HOT",
            color: Rgb565::RED,
        },
        HeaterState::Unknown => StatusStyle {
            label: "????",
            color: Rgb565::RED,
        },
    }
}

pub fn trend_style(trend: HeaterTrend) -> StatusStyle {
    match trend {
        HeaterTrend::Heating => StatusStyle {
            label: "heating",
            color: Rgb565::CSS_ORANGE,
        },
        HeaterTrend::Cooling => StatusStyle {
            label: "cooling",
            color: Rgb565::CSS_LIGHT_BLUE,
        },
        HeaterTrend::Maintaining => StatusStyle {
            label: "holding",
            color: Rgb565::GREEN,
        },
        HeaterTrend::Idle => StatusStyle {
            label: "idle",
            color: Rgb565::CSS_GRAY,
        },
        HeaterTrend::Unknown => StatusStyle {
            label: "--",
            color: Rgb565::RED,
        },
    }
}

/// `H:MM:SS` once the counter passes an hour, `MM:SS` below it.
pub fn format_elapsed(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Everything one redraw depends on. Comparing against the previously drawn
/// frame is what debounces the panel: identical frames are never repainted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFrame {
    pub state: HeaterState,
    pub trend: HeaterTrend,
    pub state_elapsed: String,
    pub trend_elapsed: String,
    pub visible: bool,
}

impl StatusFrame {
    pub fn compose(snapshot: &MonitorSnapshot, now: Instant, visible: bool) -> Self {
        Self {
            state: snapshot.state,
            trend: snapshot.trend,
            state_elapsed: format_elapsed(snapshot.seconds_in_state(now)),
            trend_elapsed: format_elapsed(snapshot.seconds_in_trend(now)),
            visible,
        }
    }
}

/// Paints [`StatusFrame`]s into the panel framebuffer, throttled to the
/// minimum redraw interval and skipping frames identical to the last one
/// drawn.
pub struct StatusRenderer {
    last_frame: Option<StatusFrame>,
    last_draw: Option<Instant>,
    min_redraw: Duration,
}

impl StatusRenderer {
    pub fn new() -> Self {
        Self {
            last_frame: None,
            last_draw: None,
            min_redraw: MIN_REDRAW_INTERVAL,
        }
    }

    /// Returns true when the frame was actually painted.
    pub fn render<D>(&mut self, target: &mut D, frame: &StatusFrame, now: Instant) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if self.last_frame.as_ref() == Some(frame) {
            return Ok(false);
        }
        if let Some(last) = self.last_draw {
            if now.duration_since(last) < self.min_redraw {
                return Ok(false);
            }
        }

        target.clear(Rgb565::BLACK)?;

        if frame.visible {
            self.draw_status(target, frame)?;
        }

        self.last_frame = Some(frame.clone());
        self.last_draw = Some(now);
        Ok(true)
    }

    fn draw_status<D>(&self, target: &mut D, frame: &StatusFrame) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let state = state_style(frame.state);
        let trend = trend_style(frame.trend);

        let state_font = MonoTextStyle::new(&FONT_9X15, state.color);
        let trend_font = MonoTextStyle::new(&FONT_6X10, trend.color);
        let timer_font = MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE);

        // State label centered on the top half of the 64x32 panel.
        Text::with_alignment(state.label, Point::new(32, 13), state_font, Alignment::Center)
            .draw(target)?;

        // Bottom line: trend on the left, its elapsed counter on the right.
        Text::with_baseline(trend.label, Point::new(0, 21), trend_font, Baseline::Top)
            .draw(target)?;
        Text::with_alignment(
            &frame.trend_elapsed,
            Point::new(64, 31),
            timer_font,
            Alignment::Right,
        )
        .draw(target)?;

        Ok(())
    }
}

impl Default for StatusRenderer {
    fn default() -> Self {
        Self::new()
    }
}
