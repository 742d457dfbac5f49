//! Probabilistic admission control.

use std::sync::Arc;

/// Source of uniform random numbers in `[0, 1)`.
///
/// Implemented for any `Fn() -> f64`, so tests can inject a fixed sequence.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

impl<F> RandomSource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn next_f64(&self) -> f64 {
        self()
    }
}

/// Thread-local generator from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Shared handle to a random source.
pub type SharedRandom = Arc<dyn RandomSource>;

/// The default random source.
pub fn default_random() -> SharedRandom {
    Arc::new(ThreadRandom)
}

/// Decide whether a record is admitted at `probability`.
///
/// `probability >= 1` always admits and `probability <= 0` always rejects,
/// without consulting the random source. Otherwise one number is drawn and the
/// record is admitted if it is strictly below the probability. NaN rejects.
pub fn admits(probability: f64, random: &dyn RandomSource) -> bool {
    if probability >= 1.0 {
        return true;
    }
    if probability <= 0.0 {
        return false;
    }
    random.next_f64() < probability
}
