use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Source of the random draws made by the probe synthesizer and the
/// adaptive delay.
pub trait EntropySource {
    /// Uniform draw in [0, 1).
    fn unit(&mut self) -> f64;
    /// Uniform index in [0, len). Returns 0 when `len` is 0.
    fn pick(&mut self, len: usize) -> usize;
}

impl<E: EntropySource + ?Sized> EntropySource for &mut E {
    fn unit(&mut self) -> f64 {
        (**self).unit()
    }

    fn pick(&mut self, len: usize) -> usize {
        (**self).pick(len)
    }
}

/// Adapts any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> EntropySource for RngSource<R> {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Replays fixed draws in order; once a queue runs dry it yields 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    units: VecDeque<f64>,
    picks: VecDeque<usize>,
}

impl ScriptedSource {
    pub fn new(
        units: impl IntoIterator<Item = f64>,
        picks: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            units: units.into_iter().collect(),
            picks: picks.into_iter().collect(),
        }
    }

    pub fn push_unit(&mut self, value: f64) {
        self.units.push_back(value);
    }

    pub fn push_pick(&mut self, index: usize) {
        self.picks.push_back(index);
    }
}

impl EntropySource for ScriptedSource {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(0.0)
    }

    fn pick(&mut self, len: usize) -> usize {
        match self.picks.pop_front() {
            Some(idx) if len > 0 => idx % len,
            _ => 0,
        }
    }
}
