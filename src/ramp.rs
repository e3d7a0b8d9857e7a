use std::time::Duration;

/// Linear warm-up from 0 to full rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampProfile {
    ramp_duration: Duration,
}

impl RampProfile {
    pub fn new(ramp_duration: Duration) -> Self {
        Self { ramp_duration }
    }

    /// No warm-up: full rate from the first tick.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ramp_duration(&self) -> Duration {
        self.ramp_duration
    }

    /// Fraction of the configured rate in effect `elapsed` after start.
    ///
    /// 0 at start, 1 once the ramp is over (or immediately for a zero ramp),
    /// always clamped into [0, 1].
    pub fn factor(&self, elapsed: Duration) -> f64 {
        if self.ramp_duration.is_zero() {
            return 1.0;
        }
        let factor = elapsed.as_secs_f64() / self.ramp_duration.as_secs_f64();
        factor.clamp(0.0, 1.0)
    }

    /// Rate in effect at `elapsed` for a configured `full_rate`.
    pub fn rate_at(&self, full_rate: f64, elapsed: Duration) -> f64 {
        full_rate * self.factor(elapsed)
    }
}

impl Default for RampProfile {
    fn default() -> Self {
        Self::none()
    }
}
