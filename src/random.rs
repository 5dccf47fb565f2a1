use rand::{rngs::SmallRng, SeedableRng};

/// The generator shared by a lattice and the Monte Carlo driver of one run.
///
/// It is always passed explicitly as `&mut`, so a single stream is consumed in
/// a fixed order and independent runs never share state.
pub type RandomSource = SmallRng;

/// Build a seeded source for reproducible runs, or one seeded from the OS.
pub fn random_source(seed: Option<u64>) -> RandomSource {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}
