use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// RNG интерфейс для модулей правил и ботов.
pub trait RandomSource {
    fn shuffle<T>(&mut self, slice: &mut [T]);

    /// Случайный индекс в диапазоне 0..len. len должен быть > 0.
    fn pick_index(&mut self, len: usize) -> usize;

    /// true с вероятностью `p`.
    fn chance(&mut self, p: f64) -> bool;
}

/// Недетерминированный RNG (для ботов в dev-CLI).
#[derive(Clone, Debug, Default)]
pub struct SystemRng;

impl RandomSource for SystemRng {
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut rand::thread_rng());
    }

    fn pick_index(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }

    fn chance(&mut self, p: f64) -> bool {
        rand::thread_rng().gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Детерминированный RNG для раздачи и реплея.
/// Одинаковый seed, одинаковая колода и одинаковый дилер.
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    inner: StdRng,
}

impl DeterministicRng {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            inner: StdRng::from_seed(seed),
        }
    }

    pub fn from_u64(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for DeterministicRng {
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.inner);
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.inner.gen_range(0..len)
    }

    fn chance(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p.clamp(0.0, 1.0))
    }
}
