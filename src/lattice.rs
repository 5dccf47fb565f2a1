use crate::error::IsingError;
use std::fmt::Debug;
use std::hash::Hash;

pub const K_BOLTZMANN: f64 = 1.; // using Planck units

pub mod square_lattice;

/// Accept `temperature` only if it yields a well defined Boltzmann factor.
/// NaN is rejected as well.
pub fn validate_temperature(temperature: f64) -> Result<f64, IsingError> {
    if temperature > 0. {
        Ok(temperature)
    } else {
        Err(IsingError::InvalidTemperature(temperature))
    }
}

/// A lattice of classical ±1 spins with ferromagnetic nearest neighbour coupling (J = 1).
///
/// The aggregate energy and sum of spins are cached. Flipping a spin leaves the caches
/// untouched; they are only brought up to date by `recompute_derived`.
pub trait Lattice {
    type Idx: Copy + PartialEq + Eq + Hash + Debug;

    fn number_sites(&self) -> usize;

    fn linear_system_size(&self) -> usize;

    fn get_temperature(&self) -> f64;

    fn set_temperature(&mut self, temperature: f64) -> Result<(), IsingError>;

    fn sum_neighbouring_spins(&self, flip_idx: Self::Idx) -> i64;

    /// Energy change if the spin at `flip_idx` were flipped.
    fn calc_delta_energy(&self, flip_idx: Self::Idx) -> i64;

    fn flip(self, flip_idx: Self::Idx) -> Self;

    fn idx_into(&self, idx: Self::Idx) -> i8;

    fn draw_random_index<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> <Self as Lattice>::Idx;

    fn get_all_indices(&self) -> Vec<Self::Idx>;

    /// Total energy computed from scratch, every bond counted once.
    fn compute_energy(&self) -> i64;

    /// Sum of all spins computed from scratch.
    fn compute_sum_of_spins(&self) -> i64;

    fn recompute_derived(&mut self);

    fn get_energy(&self) -> i64;

    fn get_sum_of_spins(&self) -> i64;

    fn get_magnetisation(&self) -> f64 {
        (self.get_sum_of_spins() as f64) / (self.number_sites() as f64)
    }

    fn get_energy_per_site(&self) -> f64 {
        self.get_energy() as f64 / self.number_sites() as f64
    }

    fn describe(&self) -> String {
        String::from("Unknown lattice")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_temperature_accepts_positive_values() {
        assert_eq!(validate_temperature(2.269), Ok(2.269));
        assert_eq!(validate_temperature(f64::MIN_POSITIVE), Ok(f64::MIN_POSITIVE));
        assert_eq!(validate_temperature(f64::INFINITY), Ok(f64::INFINITY));
    }

    #[test]
    fn validate_temperature_rejects_non_positive_values() {
        assert_eq!(
            validate_temperature(0.),
            Err(IsingError::InvalidTemperature(0.))
        );
        assert_eq!(
            validate_temperature(-1.5),
            Err(IsingError::InvalidTemperature(-1.5))
        );
        assert!(matches!(
            validate_temperature(f64::NAN),
            Err(IsingError::InvalidTemperature(_))
        ));
    }
}
