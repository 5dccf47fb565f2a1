use thiserror::Error;

/// Precondition violations reported by the lattice and the binning statistics.
///
/// None of these are fatal for a simulation; the caller is expected to adjust
/// its inputs and try again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IsingError {
    #[error("temperature must be strictly positive, got {0}")]
    InvalidTemperature(f64),

    #[error("level {level} holds {count} samples but at least {required} are needed")]
    InsufficientSamples {
        level: usize,
        count: u64,
        required: u64,
    },

    #[error("malformed lattice: {0}")]
    MalformedLattice(String),

    #[error("binning needs between {min} and {max} levels, got {requested}")]
    InvalidLevelCount {
        requested: usize,
        min: usize,
        max: usize,
    },

    #[error("level {level} does not exist, the accumulator has levels 0..={max_level}")]
    LevelOutOfRange { level: usize, max_level: usize },
}
