use super::binning::BinningAccumulator;
use super::mc_results::{CampaignResult, ObservableSummary};
use crate::error::IsingError;
use crate::lattice::{Lattice, K_BOLTZMANN};
use rand::{self, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

fn mrt2_prob(delta_energy: f64, temperature: f64) -> f64 {
    f64::min(1.0, (-delta_energy / (K_BOLTZMANN * temperature)).exp())
}

/// Try to flip the spin at `flip_idx` with the Metropolis rule.
///
/// A flip that does not raise the energy is always accepted and consumes no random number.
/// Otherwise a single uniform draw decides against the Boltzmann factor.
/// Returns the lattice together with whether the flip was accepted.
pub fn metropolis_attempt<L: Lattice, R: Rng + ?Sized>(
    lattice: L,
    flip_idx: L::Idx,
    rng: &mut R,
) -> (L, bool) {
    let delta_energy = lattice.calc_delta_energy(flip_idx);
    let accepted = delta_energy <= 0
        || rng.random::<f64>() < mrt2_prob(delta_energy as f64, lattice.get_temperature());

    if accepted {
        (lattice.flip(flip_idx), true)
    } else {
        (lattice, false)
    }
}

/// Perform `num_steps` Metropolis attempts at uniformly drawn sites, then refresh the
/// cached energy and sum of spins.
///
/// Sites are drawn independently, so a batch of `number_sites` steps is not guaranteed
/// to visit every site.
pub fn run_steps<L: Lattice, R: Rng + ?Sized>(lattice: L, num_steps: u64, rng: &mut R) -> L {
    let mut current_lattice = lattice;
    for _ in 0..num_steps {
        let flip_idx = current_lattice.draw_random_index(rng);
        (current_lattice, _) = metropolis_attempt(current_lattice, flip_idx, rng);
    }
    current_lattice.recompute_derived();
    current_lattice
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSettings {
    num_warmup_steps: u64,
    num_steps_between: u64,
    num_levels: usize,
}

impl Default for CampaignSettings {
    fn default() -> Self {
        CampaignSettings {
            num_warmup_steps: 0,
            num_steps_between: 1_000,
            num_levels: 12,
        }
    }
}

impl CampaignSettings {
    pub fn new(num_warmup_steps: u64, num_steps_between: u64, num_levels: usize) -> Self {
        CampaignSettings {
            num_warmup_steps,
            num_steps_between,
            num_levels,
        }
    }

    pub fn get_num_warmup_steps(&self) -> u64 {
        self.num_warmup_steps
    }

    pub fn get_num_steps_between(&self) -> u64 {
        self.num_steps_between
    }

    pub fn get_num_levels(&self) -> usize {
        self.num_levels
    }
}

/// Measure magnetisation, absolute magnetisation and energy at the lattice's current
/// temperature.
///
/// After the warmup, `2^num_levels` measurements are taken, each preceded by
/// `num_steps_between` steps, so every binning level is filled exactly.
pub fn measurement_campaign<L: Lattice, R: Rng + ?Sized>(
    lattice: L,
    settings: &CampaignSettings,
    rng: &mut R,
) -> Result<(L, CampaignResult), IsingError> {
    let mut magnetisations = BinningAccumulator::new(settings.num_levels)?;
    let mut abs_magnetisations = BinningAccumulator::new(settings.num_levels)?;
    let mut energies = BinningAccumulator::new(settings.num_levels)?;

    let mut current_lattice = run_steps(lattice, settings.num_warmup_steps, rng);
    debug!(
        temperature = current_lattice.get_temperature(),
        steps = settings.num_warmup_steps,
        "warmup finished"
    );

    for _ in 0..magnetisations.capacity() {
        current_lattice = run_steps(current_lattice, settings.num_steps_between, rng);

        let sum_of_spins = current_lattice.get_sum_of_spins() as f64;
        magnetisations.add_measurement(sum_of_spins);
        abs_magnetisations.add_measurement(sum_of_spins.abs());
        energies.add_measurement(current_lattice.get_energy() as f64);
    }

    let result = CampaignResult::new(
        current_lattice.get_temperature(),
        current_lattice.number_sites(),
        current_lattice.linear_system_size(),
        current_lattice.describe(),
        *settings,
        ObservableSummary::from_accumulator(&magnetisations)?,
        ObservableSummary::from_accumulator(&abs_magnetisations)?,
        ObservableSummary::from_accumulator(&energies)?,
    );
    info!(
        temperature = result.get_temperature(),
        abs_magnetisation = result.get_avg_abs_magnetisation_per_site(),
        energy = result.get_avg_energy_per_site(),
        energy_correlation_time = result.get_energy().get_correlation_time(),
        "measurement campaign finished"
    );

    Ok((current_lattice, result))
}
