use std::time::Duration;

/// Cosmetic suffixes appended to outgoing text so that repeated
/// forwards of identical messages do not look byte-identical to the
/// destination platform's duplicate detection.
pub const TEXT_VARIATIONS: [&str; 5] = ["", " ", ".", "...", " ."];

/// Seedable random source for all pacing decisions of one tenant.
///
/// Injected so tests can pin the seed and assert exact delays and
/// variation picks.
#[derive(Debug)]
pub struct Pacer {
    rng: fastrand::Rng,
}

impl Pacer {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self { rng }
    }

    /// Uniform delay in `[min, max]`.
    pub fn delay_in(&mut self, range: (Duration, Duration)) -> Duration {
        let (min, max) = range;
        let lo = min.as_millis() as u64;
        let hi = (max.as_millis() as u64).max(lo);
        Duration::from_millis(self.rng.u64(lo..=hi))
    }

    /// Pick one text variation. Rolled once per job, not per
    /// destination, so every destination of a fan-out sees the same
    /// suffix.
    pub fn variation(&mut self) -> &'static str {
        TEXT_VARIATIONS[self.rng.usize(0..TEXT_VARIATIONS.len())]
    }
}
