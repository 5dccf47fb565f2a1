use super::binning::BinningAccumulator;
use super::single_spin_flip::CampaignSettings;
use crate::error::IsingError;
use serde::{Deserialize, Serialize};

/// Statistics of one observable after a measurement campaign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservableSummary {
    mean: f64,
    error: f64,
    correlation_time: f64,
}

impl ObservableSummary {
    pub fn from_accumulator(accumulator: &BinningAccumulator) -> Result<Self, IsingError> {
        Ok(ObservableSummary {
            mean: accumulator.mean()?,
            error: accumulator.error()?,
            correlation_time: accumulator.correlation_time()?,
        })
    }

    pub fn get_mean(&self) -> f64 {
        self.mean
    }

    pub fn get_error(&self) -> f64 {
        self.error
    }

    pub fn get_correlation_time(&self) -> f64 {
        self.correlation_time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignResult {
    temperature: f64,
    num_spins: usize,
    linear_system_size: usize,
    lattice_description: String,
    settings: CampaignSettings,
    magnetisation: ObservableSummary,
    abs_magnetisation: ObservableSummary,
    energy: ObservableSummary,
}

impl CampaignResult {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        temperature: f64,
        num_spins: usize,
        linear_system_size: usize,
        lattice_description: String,
        settings: CampaignSettings,
        magnetisation: ObservableSummary,
        abs_magnetisation: ObservableSummary,
        energy: ObservableSummary,
    ) -> Self {
        CampaignResult {
            temperature,
            num_spins,
            linear_system_size,
            lattice_description,
            settings,
            magnetisation,
            abs_magnetisation,
            energy,
        }
    }

    pub fn get_temperature(&self) -> f64 {
        self.temperature
    }

    pub fn get_num_spins(&self) -> usize {
        self.num_spins
    }

    pub fn get_linear_system_size(&self) -> usize {
        self.linear_system_size
    }

    pub fn get_lattice_description(&self) -> &String {
        &self.lattice_description
    }

    pub fn get_settings(&self) -> &CampaignSettings {
        &self.settings
    }

    /// Summary of the sum of spins, not normalised by the number of sites.
    pub fn get_magnetisation(&self) -> &ObservableSummary {
        &self.magnetisation
    }

    pub fn get_abs_magnetisation(&self) -> &ObservableSummary {
        &self.abs_magnetisation
    }

    /// Summary of the total energy, not normalised by the number of sites.
    pub fn get_energy(&self) -> &ObservableSummary {
        &self.energy
    }

    pub fn get_avg_abs_magnetisation_per_site(&self) -> f64 {
        self.abs_magnetisation.mean / self.num_spins as f64
    }

    pub fn get_avg_energy_per_site(&self) -> f64 {
        self.energy.mean / self.num_spins as f64
    }

    /// One line of the sweep output: `<|m| per site>\t<e per site>\n`.
    pub fn to_result_line(&self) -> String {
        format!(
            "{}\t{}\n",
            self.get_avg_abs_magnetisation_per_site(),
            self.get_avg_energy_per_site()
        )
    }
}
