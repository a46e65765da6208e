//! Frame timing statistics and the info panel contents.

use crate::modes::{EditMode, RenderMode};
use crate::moving_average::MovingAverage;

/// Durations reported by the pipeline for the frame about to be rendered.
///
/// All values in milliseconds except `current_time` (seconds into the video).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTimings {
    pub current_time: f64,
    pub frame_time: f64,
    pub spare_time: f64,
    pub decode_time: f64,
    pub stabilize_time: f64,
    pub encode_time: f64,
}

/// Row colouring hint for the info panel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Normal,
    Good,
    Bad,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InfoRow {
    pub label: String,
    pub value: String,
    pub tone: Tone,
}

impl InfoRow {
    fn new(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
            tone: Tone::Normal,
        }
    }

    /// Blank spacer between groups
    fn separator() -> Self {
        Self::new("", String::new())
    }

    pub fn is_separator(&self) -> bool {
        self.label.is_empty()
    }
}

/// Smoothed per-frame statistics.
#[derive(Clone, Debug)]
pub struct Telemetry {
    fps: MovingAverage,
    frame_time: MovingAverage,
    decode_time: MovingAverage,
    stabilize_time: MovingAverage,
    render_time: MovingAverage,
    encode_time: MovingAverage,
    spare_time: MovingAverage,
    last_render_time: f64,
    current_time: f64,
    visible: bool,
}

impl Telemetry {
    pub fn new(alpha: f64, visible: bool) -> Self {
        let average = MovingAverage::new(alpha);
        Self {
            fps: average,
            frame_time: average,
            decode_time: average,
            stabilize_time: average,
            render_time: average,
            encode_time: average,
            spare_time: average,
            last_render_time: 0.0,
            current_time: 0.0,
            visible,
        }
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        for average in self.averages_mut() {
            average.set_alpha(alpha);
        }
    }

    pub fn reset(&mut self) {
        for average in self.averages_mut() {
            average.reset();
        }
        self.last_render_time = 0.0;
    }

    fn averages_mut(&mut self) -> [&mut MovingAverage; 7] {
        [
            &mut self.fps,
            &mut self.frame_time,
            &mut self.decode_time,
            &mut self.stabilize_time,
            &mut self.render_time,
            &mut self.encode_time,
            &mut self.spare_time,
        ]
    }

    /// Feed one frame of timings. The render time entering the average is the
    /// one latched at the end of the previous frame.
    pub fn begin_frame(&mut self, timings: &FrameTimings) {
        self.current_time = timings.current_time;

        if timings.frame_time > 0.0 {
            self.fps.add_measurement(1000.0 / timings.frame_time);
        }
        self.frame_time.add_measurement(timings.frame_time);
        self.decode_time.add_measurement(timings.decode_time);
        self.stabilize_time.add_measurement(timings.stabilize_time);
        self.render_time.add_measurement(self.last_render_time);
        self.encode_time.add_measurement(timings.encode_time);
        self.spare_time.add_measurement(timings.spare_time);
    }

    pub fn latch_render_time(&mut self, milliseconds: f64) {
        self.last_render_time = milliseconds;
    }

    pub fn last_render_time(&self) -> f64 {
        self.last_render_time
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn toggle_visible(&mut self) {
        self.visible = !self.visible;
    }

    pub fn fps(&self) -> f64 {
        self.fps.average()
    }

    pub fn frame_time(&self) -> f64 {
        self.frame_time.average()
    }

    pub fn decode_time(&self) -> f64 {
        self.decode_time.average()
    }

    pub fn stabilize_time(&self) -> f64 {
        self.stabilize_time.average()
    }

    pub fn render_time(&self) -> f64 {
        self.render_time.average()
    }

    pub fn encode_time(&self) -> f64 {
        self.encode_time.average()
    }

    pub fn spare_time(&self) -> f64 {
        self.spare_time.average()
    }

    /// Info panel rows, top to bottom.
    pub fn info_rows(
        &self,
        is_encoding: bool,
        edit_mode: EditMode,
        render_mode: RenderMode,
        video_scale: f64,
        map_scale: f64,
    ) -> Vec<InfoRow> {
        let mut rows = vec![
            InfoRow::new("time:", format_time(self.current_time)),
            InfoRow::separator(),
            InfoRow::new("fps:", format!("{:.2}", self.fps())),
            InfoRow::new("frame:", format_ms(self.frame_time())),
            InfoRow::new("decode:", format_ms(self.decode_time())),
            InfoRow::new("stabilize:", format_ms(self.stabilize_time())),
            InfoRow::new("render:", format_ms(self.render_time())),
        ];

        if is_encoding {
            rows.push(InfoRow::new("encode:", format_ms(self.encode_time())));
        } else {
            let spare = self.spare_time();
            let mut row = InfoRow::new("spare:", format_ms(spare));
            row.tone = spare_tone(spare);
            rows.push(row);
        }

        rows.push(InfoRow::separator());
        rows.push(InfoRow::new("edit:", edit_mode.as_str().to_string()));
        rows.push(InfoRow::new("render:", render_mode.as_str().to_string()));
        rows.push(InfoRow::separator());
        rows.push(InfoRow::new("video scale:", format!("{:.2}", video_scale)));
        rows.push(InfoRow::new("map scale:", format!("{:.2}", map_scale)));
        rows
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new(0.1, false)
    }
}

/// Red when behind schedule, green when ahead.
pub fn spare_tone(spare_ms: f64) -> Tone {
    if spare_ms < 0.0 {
        Tone::Bad
    } else if spare_ms > 0.0 {
        Tone::Good
    } else {
        Tone::Normal
    }
}

fn format_ms(value: f64) -> String {
    format!("{:.2} ms", value)
}

/// Seconds to `HH:mm:ss.zzz`, wrapping at 24 hours.
pub fn format_time(seconds: f64) -> String {
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    let total_ms = ((seconds * 1000.0 + 0.5) as i64).rem_euclid(DAY_MS);

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}
