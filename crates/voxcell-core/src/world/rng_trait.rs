//! RNG trait abstraction for world simulation
//!
//! Every engine receives its randomness through this trait so that:
//! - the runner can thread one seeded RNG through a whole tick
//! - tests can substitute a scripted RNG and assert exact outcomes

/// Random number generator trait for world simulation
pub trait WorldRng {
    /// Generate random f32 in [0.0, 1.0)
    fn gen_f32(&mut self) -> f32;

    /// Uniform index in [0, len); `len` must be non-zero
    fn gen_index(&mut self, len: usize) -> usize;

    /// Check if random value is less than probability threshold
    fn check_probability(&mut self, probability: f32) -> bool {
        self.gen_f32() < probability
    }

    /// Uniformly pick one element of a slice
    fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.gen_index(items.len())])
        }
    }
}

// Blanket implementation for any type implementing rand::Rng
// This covers the seeded Xoshiro RNG the runner passes into each step and thread_rng()
impl<T: ?Sized + rand::Rng> WorldRng for T {
    fn gen_f32(&mut self) -> f32 {
        rand::Rng::r#gen(self)
    }

    fn gen_index(&mut self, len: usize) -> usize {
        rand::Rng::gen_range(self, 0..len)
    }
}
