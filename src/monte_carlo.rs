pub mod binning;
pub mod mc_results;
pub mod single_spin_flip;
