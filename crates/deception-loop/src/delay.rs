use deception_core::{round_to, DelayParameters, EntropySource, MetricState};
use std::thread;
use std::time::Duration;

pub const CONSEQUENCE_PACING_GAIN: f64 = 0.7;
pub const ENTROPY_PACING_GAIN: f64 = 0.3;

/// Suspends the single flow of control for a pacing delay.
pub trait Pacer {
    fn pause(&mut self, duration: Duration);
}

impl<P: Pacer + ?Sized> Pacer for &mut P {
    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Records requested pauses without sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingPacer {
    pauses: Vec<Duration>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> &[Duration] {
        &self.pauses
    }

    pub fn total(&self) -> Duration {
        self.pauses.iter().sum()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}

/// Counts pauses and their total length without sleeping or keeping history.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountingPacer {
    pauses: u64,
    total: Duration,
}

impl CountingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> u64 {
        self.pauses
    }

    pub fn total(&self) -> Duration {
        self.total
    }
}

impl Pacer for CountingPacer {
    fn pause(&mut self, duration: Duration) {
        self.pauses = self.pauses.saturating_add(1);
        self.total = self.total.saturating_add(duration);
    }
}

pub fn effective_scale(metrics: &MetricState, delay: &DelayParameters) -> f64 {
    delay.scale
        * (1.0
            + metrics.consequence * CONSEQUENCE_PACING_GAIN
            + metrics.entropy * ENTROPY_PACING_GAIN)
}

pub fn delay_ms(metrics: &MetricState, delay: &DelayParameters, jitter: f64) -> f64 {
    (delay.base_ms + jitter) * effective_scale(metrics, delay)
}

/// Saturates at `Duration::MAX` for delays too large to represent.
pub fn pause_for(millis: f64) -> Duration {
    Duration::try_from_secs_f64(millis.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
}

/// Draws jitter, pauses for the paced delay and returns it in milliseconds
/// rounded to two decimals.
pub fn compute_and_wait(
    metrics: &MetricState,
    delay: &DelayParameters,
    entropy: &mut impl EntropySource,
    pacer: &mut impl Pacer,
) -> f64 {
    let jitter = entropy.unit() * delay.jitter_ms;
    let millis = delay_ms(metrics, delay, jitter);
    pacer.pause(pause_for(millis));
    round_to(millis, 2)
}
