use crate::error::IsingError;
use crate::lattice::{validate_temperature, Lattice};
use itertools::iproduct;
use rand::{self, distr::Distribution};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SquareLattice {
    width: usize,
    temperature: f64,
    sights: Vec<Vec<i8>>,
    energy: i64,
    sum_of_spins: i64,
    uniform_dist: rand::distr::Uniform<usize>,
}

impl SquareLattice {
    /// Draw every spin independently as +1 or -1 with equal probability.
    pub fn new_random<R: rand::Rng + ?Sized>(
        width: usize,
        temperature: f64,
        rng: &mut R,
    ) -> Result<Self, IsingError> {
        let sights = (0..width)
            .map(|_| {
                (0..width)
                    .map(|_| if rng.random_bool(0.5) { 1 } else { -1 })
                    .collect()
            })
            .collect();
        Self::from_spins(sights, temperature)
    }

    pub fn new_with_ones(width: usize, temperature: f64) -> Result<Self, IsingError> {
        Self::from_spins(vec![vec![1; width]; width], temperature)
    }

    /// Build a lattice from an explicit grid, indexed as `sights[row][column]`.
    ///
    /// The grid has to be square with a linear size of at least 2 and hold only ±1.
    pub fn from_spins(sights: Vec<Vec<i8>>, temperature: f64) -> Result<Self, IsingError> {
        let temperature = validate_temperature(temperature)?;

        let width = sights.len();
        if width < 2 {
            return Err(IsingError::MalformedLattice(format!(
                "linear size must be at least 2, got {width}"
            )));
        }
        if let Some((row_idx, row)) = sights.iter().enumerate().find(|(_, row)| row.len() != width)
        {
            return Err(IsingError::MalformedLattice(format!(
                "row {row_idx} has {} sites but the lattice is {width} wide",
                row.len()
            )));
        }
        if let Some((i, j)) =
            iproduct!(0..width, 0..width).find(|&(i, j)| !matches!(sights[i][j], 1 | -1))
        {
            return Err(IsingError::MalformedLattice(format!(
                "spin at ({i}, {j}) is {} instead of +1 or -1",
                sights[i][j]
            )));
        }

        let uniform_dist = rand::distr::Uniform::new(0, width)
            .map_err(|err| IsingError::MalformedLattice(err.to_string()))?;

        let mut lattice = SquareLattice {
            width,
            temperature,
            sights,
            energy: 0,
            sum_of_spins: 0,
            uniform_dist,
        };
        lattice.recompute_derived();
        Ok(lattice)
    }

    fn get_all_neighbour_indices(&self, idx_i: usize, idx_j: usize) -> [(usize, usize); 4] {
        [
            (
                (idx_i as isize - 1).rem_euclid(self.width as isize) as usize,
                idx_j,
            ),
            (
                idx_i,
                (idx_j as isize - 1).rem_euclid(self.width as isize) as usize,
            ),
            ((idx_i + 1).rem_euclid(self.width), idx_j),
            (idx_i, (idx_j + 1).rem_euclid(self.width)),
        ]
    }

    pub fn get_all_neighbour_values(&self, idx_i: usize, idx_j: usize) -> [i8; 4] {
        self.get_all_neighbour_indices(idx_i, idx_j)
            .map(|(i, j)| self.sights[i][j])
    }

    pub fn is_state_equal(&self, other: &Self) -> bool {
        self.sights == other.sights
    }

    pub fn get_spins(&self) -> &Vec<Vec<i8>> {
        &self.sights
    }

    // only the bonds to the next row and the next column, so each bond is seen once
    fn get_forward_bond_energy(&self, idx: <Self as Lattice>::Idx) -> i64 {
        let (idx_i, idx_j) = idx;
        let forward_sum = self.sights[(idx_i + 1) % self.width][idx_j] as i64
            + self.sights[idx_i][(idx_j + 1) % self.width] as i64;
        -(self.idx_into(idx) as i64) * forward_sum
    }
}

impl Lattice for SquareLattice {
    type Idx = (usize, usize);

    fn number_sites(&self) -> usize {
        self.width * self.width
    }

    fn linear_system_size(&self) -> usize {
        self.width
    }

    fn get_temperature(&self) -> f64 {
        self.temperature
    }

    fn set_temperature(&mut self, temperature: f64) -> Result<(), IsingError> {
        self.temperature = validate_temperature(temperature)?;
        debug!(temperature, "lattice temperature changed");
        Ok(())
    }

    fn sum_neighbouring_spins(&self, flip_idx: Self::Idx) -> i64 {
        self.get_all_neighbour_values(flip_idx.0, flip_idx.1)
            .iter()
            .map(|item| *item as i64)
            .sum::<i64>()
    }

    fn calc_delta_energy(&self, flip_idx: Self::Idx) -> i64 {
        2 * (self.idx_into(flip_idx) as i64) * self.sum_neighbouring_spins(flip_idx)
    }

    fn flip(mut self, flip_idx: Self::Idx) -> Self {
        self.sights[flip_idx.0][flip_idx.1] *= -1;
        self
    }

    fn idx_into(&self, idx: Self::Idx) -> i8 {
        self.sights[idx.0][idx.1]
    }

    fn draw_random_index<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> <Self as Lattice>::Idx {
        (self.uniform_dist.sample(rng), self.uniform_dist.sample(rng))
    }

    fn get_all_indices(&self) -> Vec<Self::Idx> {
        iproduct!(0..self.width, 0..self.width).collect()
    }

    fn compute_energy(&self) -> i64 {
        iproduct!(0..self.width, 0..self.width)
            .map(|idx| self.get_forward_bond_energy(idx))
            .sum::<i64>()
    }

    fn compute_sum_of_spins(&self) -> i64 {
        self.sights
            .iter()
            .map(|v| v.iter().map(|i| *i as i64).sum::<i64>())
            .sum::<i64>()
    }

    fn recompute_derived(&mut self) {
        self.energy = self.compute_energy();
        self.sum_of_spins = self.compute_sum_of_spins();
    }

    fn get_energy(&self) -> i64 {
        self.energy
    }

    fn get_sum_of_spins(&self) -> i64 {
        self.sum_of_spins
    }

    fn describe(&self) -> String {
        format!(
            "{}x{} Periodic Square Lattice At Temperature {}",
            self.width, self.width, self.temperature,
        )
    }
}
