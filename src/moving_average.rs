//! Exponential moving average for scalar telemetry streams.

/// Exponential moving average with O(1) memory.
///
/// `average = alpha * sample + (1 - alpha) * average`, seeded by the first sample.
#[derive(Debug, Clone, Copy)]
pub struct MovingAverage {
    alpha: f64,
    average: f64,
    seeded: bool,
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl MovingAverage {
    /// Create with smoothing factor in (0, 1]. Out of range values are clamped.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: clamp_alpha(alpha),
            average: 0.0,
            seeded: false,
        }
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = clamp_alpha(alpha);
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Forget the current value; the next sample seeds the average again.
    pub fn reset(&mut self) {
        self.average = 0.0;
        self.seeded = false;
    }

    pub fn add_measurement(&mut self, value: f64) {
        if self.seeded {
            self.average = self.alpha * value + (1.0 - self.alpha) * self.average;
        } else {
            self.average = value;
            self.seeded = true;
        }
    }

    /// Current average, 0.0 before any sample.
    pub fn average(&self) -> f64 {
        self.average
    }
}

fn clamp_alpha(alpha: f64) -> f64 {
    if alpha.is_nan() || alpha <= 0.0 {
        f64::EPSILON
    } else {
        alpha.min(1.0)
    }
}
