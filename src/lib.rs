pub mod error;
pub mod lattice;
pub mod monte_carlo;
pub mod random;
