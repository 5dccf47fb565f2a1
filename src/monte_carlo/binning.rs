use crate::error::IsingError;

/// Number of levels between the error level and the top of the hierarchy.
const ERROR_LEVEL_MARGIN: usize = 6;
/// Largest level count for which `2^level_count` measurements still fit in a `u64`.
const MAX_LEVEL_COUNT: usize = 63;

/// Running sums of the values that reached one binning level.
///
/// The spread is tracked with Welford's update, which stays exactly zero for
/// a constant stream where `sum_squares - sum^2 / count` leaves rounding noise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelStats {
    count: u64,
    sum: f64,
    sum_squares: f64,
    pending_value: f64,
    running_mean: f64,
    squared_deviations: f64,
}

impl LevelStats {
    pub fn get_count(&self) -> u64 {
        self.count
    }

    pub fn get_sum(&self) -> f64 {
        self.sum
    }

    pub fn get_sum_squares(&self) -> f64 {
        self.sum_squares
    }

    /// The last value that arrived with an odd count and waits for a partner.
    pub fn get_pending_value(&self) -> f64 {
        self.pending_value
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_squares += value * value;

        let deviation = value - self.running_mean;
        self.running_mean += deviation / self.count as f64;
        self.squared_deviations += deviation * (value - self.running_mean);
    }

    fn standard_error(&self, level: usize) -> Result<f64, IsingError> {
        if self.count < 2 {
            return Err(IsingError::InsufficientSamples {
                level,
                count: self.count,
                required: 2,
            });
        }
        let n = self.count as f64;
        let squared_deviations = f64::max(0., self.squared_deviations);
        Ok((squared_deviations / (n * (n - 1.))).sqrt())
    }
}

/// Mean, standard error and integrated autocorrelation time of a stream of
/// measurements, using recursive pairwise binning.
///
/// Every value is added to level 0. Whenever a level has received an even number of
/// values, the mean of the last two is passed on to the next level, so level `L`
/// holds averages over blocks of `2^L` consecutive raw measurements. The error is
/// read at `level_count - 6`, where correlations between neighbouring samples are
/// expected to have been averaged out.
///
/// Pairs completed at the top level `level_count` are not passed on any further.
#[derive(Debug, Clone, PartialEq)]
pub struct BinningAccumulator {
    levels: Vec<LevelStats>,
    error_level: usize,
}

impl BinningAccumulator {
    pub fn new(level_count: usize) -> Result<Self, IsingError> {
        if !(ERROR_LEVEL_MARGIN..=MAX_LEVEL_COUNT).contains(&level_count) {
            return Err(IsingError::InvalidLevelCount {
                requested: level_count,
                min: ERROR_LEVEL_MARGIN,
                max: MAX_LEVEL_COUNT,
            });
        }

        Ok(BinningAccumulator {
            levels: vec![LevelStats::default(); level_count + 1],
            error_level: level_count - ERROR_LEVEL_MARGIN,
        })
    }

    pub fn add_measurement(&mut self, value: f64) {
        let mut value = value;
        for level in self.levels.iter_mut() {
            level.push(value);
            if level.count % 2 == 1 {
                level.pending_value = value;
                break;
            }
            value = (value + level.pending_value) / 2.;
        }
    }

    pub fn get_level_count(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn get_error_level(&self) -> usize {
        self.error_level
    }

    /// Number of raw measurements that bring exactly one value to the top level.
    pub fn capacity(&self) -> u64 {
        1 << self.get_level_count()
    }

    pub fn level_stats(&self, level: usize) -> Result<&LevelStats, IsingError> {
        self.levels.get(level).ok_or(IsingError::LevelOutOfRange {
            level,
            max_level: self.get_level_count(),
        })
    }

    pub fn count(&self, level: usize) -> Result<u64, IsingError> {
        Ok(self.level_stats(level)?.count)
    }

    pub fn sum(&self, level: usize) -> Result<f64, IsingError> {
        Ok(self.level_stats(level)?.sum)
    }

    pub fn sum_squares(&self, level: usize) -> Result<f64, IsingError> {
        Ok(self.level_stats(level)?.sum_squares)
    }

    pub fn pending_value(&self, level: usize) -> Result<f64, IsingError> {
        Ok(self.level_stats(level)?.pending_value)
    }

    /// Whether `level` holds enough values for a standard error.
    pub fn is_level_filled(&self, level: usize) -> bool {
        self.levels
            .get(level)
            .is_some_and(|stats| stats.count >= 2)
    }

    /// Whether `error` and `correlation_time` can be evaluated.
    pub fn is_filled(&self) -> bool {
        self.is_level_filled(self.error_level)
    }

    /// Standard error of the mean estimated from the values at `level`.
    pub fn standard_error_at(&self, level: usize) -> Result<f64, IsingError> {
        self.level_stats(level)?.standard_error(level)
    }

    /// Standard error at every level that holds at least two values, as `(level, error)`.
    ///
    /// For correlated data the errors grow with the level and plateau once the blocks
    /// are effectively independent.
    pub fn binned_errors(&self) -> Vec<(usize, f64)> {
        self.levels
            .iter()
            .enumerate()
            .filter_map(|(level, stats)| stats.standard_error(level).ok().map(|err| (level, err)))
            .collect()
    }

    pub fn error(&self) -> Result<f64, IsingError> {
        self.standard_error_at(self.error_level)
    }

    /// Integrated autocorrelation time from the growth of the binned error over the naive one.
    ///
    /// A vanishing naive error only happens for a constant stream, whose binned
    /// errors vanish as well. It is treated as uncorrelated and yields exactly -0.5.
    pub fn correlation_time(&self) -> Result<f64, IsingError> {
        let naive_error = self.standard_error_at(0)?;
        let binned_error = self.error()?;

        let ratio = if naive_error > 0. {
            (binned_error / naive_error).powi(2)
        } else {
            0.
        };
        Ok((ratio - 1.) / 2.)
    }

    /// Arithmetic mean of all raw measurements.
    pub fn mean(&self) -> Result<f64, IsingError> {
        let raw = &self.levels[0];
        if raw.count == 0 {
            return Err(IsingError::InsufficientSamples {
                level: 0,
                count: 0,
                required: 1,
            });
        }
        Ok(raw.sum / raw.count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use statrs::statistics::Statistics;

    #[test]
    fn binning_rejects_too_few_levels() {
        assert_eq!(
            BinningAccumulator::new(5),
            Err(IsingError::InvalidLevelCount {
                requested: 5,
                min: 6,
                max: 63
            })
        );
        assert!(BinningAccumulator::new(64).is_err());

        let accumulator = BinningAccumulator::new(6).unwrap();
        assert_eq!(accumulator.get_error_level(), 0);
        assert_eq!(accumulator.get_level_count(), 6);
        assert_eq!(accumulator.capacity(), 64);
    }

    #[test]
    fn binning_constant_input() {
        let mut accumulator = BinningAccumulator::new(8).unwrap();
        for _ in 0..8 {
            accumulator.add_measurement(1.);
        }

        assert_eq!(accumulator.count(0), Ok(8));
        assert_eq!(accumulator.sum(0), Ok(8.));
        assert_eq!(accumulator.count(1), Ok(4));
        assert_eq!(accumulator.count(2), Ok(2));
        assert_eq!(accumulator.count(3), Ok(1));
        assert_eq!(accumulator.count(4), Ok(0));

        assert_eq!(accumulator.standard_error_at(0), Ok(0.));
        assert_eq!(accumulator.get_error_level(), 2);
        assert_eq!(accumulator.error(), Ok(0.));
        assert_eq!(accumulator.correlation_time(), Ok(-0.5));
        assert_eq!(accumulator.mean(), Ok(1.));
    }

    #[test]
    fn binning_constant_non_dyadic_input_has_no_spread() {
        for level_count in [6, 8, 10, 12] {
            for value in [0.1, 0.3, 1.7, 3.3, -2.9] {
                let mut accumulator = BinningAccumulator::new(level_count).unwrap();
                for _ in 0..accumulator.capacity() {
                    accumulator.add_measurement(value);
                }

                for (level, err) in accumulator.binned_errors() {
                    assert_eq!(err, 0., "Level {level} of {level_count} for {value}");
                }
                assert_eq!(
                    accumulator.correlation_time(),
                    Ok(-0.5),
                    "Constant {value} with {level_count} levels"
                );
                approx::assert_relative_eq!(accumulator.mean().unwrap(), value, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn binning_frozen_stream_after_motion_keeps_positive_errors() {
        let mut accumulator = BinningAccumulator::new(8).unwrap();
        accumulator.add_measurement(1.);
        for _ in 1..accumulator.capacity() {
            accumulator.add_measurement(0.1);
        }

        assert!(accumulator.standard_error_at(0).unwrap() > 0.);
        assert!(!accumulator.correlation_time().unwrap().is_nan());
    }

    #[test]
    fn binning_alternating_input_pairs_to_zero() {
        let mut accumulator = BinningAccumulator::new(6).unwrap();

        accumulator.add_measurement(1.);
        assert_eq!(accumulator.count(0), Ok(1));
        assert_eq!(accumulator.pending_value(0), Ok(1.));
        assert_eq!(accumulator.count(1), Ok(0));

        accumulator.add_measurement(-1.);
        assert_eq!(accumulator.count(0), Ok(2));
        assert_eq!(accumulator.count(1), Ok(1));
        assert_eq!(accumulator.sum(1), Ok(0.));
        assert_eq!(accumulator.pending_value(1), Ok(0.));
        assert_eq!(accumulator.count(2), Ok(0));

        accumulator.add_measurement(1.);
        assert_eq!(accumulator.count(1), Ok(1));

        accumulator.add_measurement(-1.);
        assert_eq!(accumulator.count(0), Ok(4));
        assert_eq!(accumulator.count(1), Ok(2));
        assert_eq!(accumulator.count(2), Ok(1));
        assert_eq!(accumulator.sum(2), Ok(0.));
        assert_eq!(accumulator.sum_squares(2), Ok(0.));
        assert_eq!(accumulator.count(3), Ok(0));

        for value in [1., -1., 1., -1.] {
            accumulator.add_measurement(value);
        }
        assert_eq!(accumulator.count(3), Ok(1));
        assert_eq!(accumulator.sum(3), Ok(0.));
        assert_eq!(accumulator.sum_squares(0), Ok(8.));
        assert_eq!(accumulator.mean(), Ok(0.));
    }

    #[test]
    fn binning_pairs_block_averages() {
        let mut accumulator = BinningAccumulator::new(6).unwrap();
        for value in [1., 3., 5., 7.] {
            accumulator.add_measurement(value);
        }

        // level 1 sees 2 and 6, level 2 sees 4
        assert_eq!(accumulator.sum(1), Ok(8.));
        assert_eq!(accumulator.sum_squares(1), Ok(40.));
        assert_eq!(accumulator.sum(2), Ok(4.));
        assert_eq!(accumulator.pending_value(2), Ok(4.));
    }

    #[test]
    fn binning_top_level_keeps_accumulating() {
        let mut accumulator = BinningAccumulator::new(6).unwrap();
        for i in 0..3 * accumulator.capacity() {
            accumulator.add_measurement(i as f64);
        }

        assert_eq!(accumulator.count(0), Ok(192));
        assert_eq!(accumulator.count(6), Ok(3));
        assert!(accumulator.is_level_filled(6));
        approx::assert_relative_eq!(accumulator.mean().unwrap(), 95.5, epsilon = 1e-12);
    }

    #[test]
    fn binning_mean_matches_top_level_for_power_of_two_input() {
        let mut accumulator = BinningAccumulator::new(7).unwrap();
        let mut test_rng = SmallRng::seed_from_u64(21);
        for _ in 0..accumulator.capacity() {
            accumulator.add_measurement(test_rng.random_range(-5.0..5.0));
        }

        assert_eq!(accumulator.count(7), Ok(1));
        approx::assert_relative_eq!(
            accumulator.mean().unwrap(),
            accumulator.sum(7).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn binning_insufficient_samples_are_reported() {
        let mut accumulator = BinningAccumulator::new(8).unwrap();
        assert_eq!(
            accumulator.mean(),
            Err(IsingError::InsufficientSamples {
                level: 0,
                count: 0,
                required: 1
            })
        );

        accumulator.add_measurement(2.);
        assert_eq!(
            accumulator.standard_error_at(0),
            Err(IsingError::InsufficientSamples {
                level: 0,
                count: 1,
                required: 2
            })
        );

        for _ in 0..6 {
            accumulator.add_measurement(2.);
        }
        assert!(accumulator.standard_error_at(0).is_ok());
        assert!(!accumulator.is_filled());
        assert_eq!(
            accumulator.error(),
            Err(IsingError::InsufficientSamples {
                level: 2,
                count: 1,
                required: 2
            })
        );
        assert!(accumulator.correlation_time().is_err());

        accumulator.add_measurement(2.);
        assert!(accumulator.is_filled());
    }

    #[test]
    fn binning_level_out_of_range() {
        let accumulator = BinningAccumulator::new(6).unwrap();
        assert_eq!(
            accumulator.standard_error_at(7),
            Err(IsingError::LevelOutOfRange {
                level: 7,
                max_level: 6
            })
        );
        assert!(!accumulator.is_level_filled(7));
    }

    #[test]
    fn binning_naive_error_matches_sample_std_dev() {
        let mut accumulator = BinningAccumulator::new(10).unwrap();
        let mut test_rng = SmallRng::seed_from_u64(5);
        let data: Vec<f64> = (0..1_000).map(|_| test_rng.random_range(0.0..10.0)).collect();
        for value in &data {
            accumulator.add_measurement(*value);
        }

        let expected = data.iter().std_dev() / (data.len() as f64).sqrt();
        approx::assert_relative_eq!(
            accumulator.standard_error_at(0).unwrap(),
            expected,
            max_relative = 1e-9
        );
        approx::assert_relative_eq!(accumulator.mean().unwrap(), data.iter().mean(), epsilon = 1e-9);
    }

    #[test]
    fn binning_uncorrelated_data_converges() {
        let mut accumulator = BinningAccumulator::new(16).unwrap();
        let mut test_rng = SmallRng::seed_from_u64(1234);
        for _ in 0..accumulator.capacity() {
            accumulator.add_measurement(test_rng.random::<f64>());
        }

        // uniform on [0, 1) has a standard deviation of 1 / sqrt(12)
        let expected_error = 1. / (12. * accumulator.capacity() as f64).sqrt();
        approx::assert_relative_eq!(
            accumulator.standard_error_at(0).unwrap(),
            expected_error,
            max_relative = 0.02
        );
        // 64 blocks at the error level
        approx::assert_relative_eq!(accumulator.error().unwrap(), expected_error, max_relative = 0.35);
        assert!(accumulator.correlation_time().unwrap().abs() < 0.4);
        approx::assert_abs_diff_eq!(accumulator.mean().unwrap(), 0.5, epsilon = 0.01);
    }

    #[test]
    fn binning_correlated_data_has_positive_correlation_time() {
        let mut accumulator = BinningAccumulator::new(14).unwrap();
        let mut test_rng = SmallRng::seed_from_u64(99);

        // every value is repeated 8 times, so level 3 holds independent samples
        // and the correlation time is 3.5
        let mut value = 0.;
        for i in 0..accumulator.capacity() {
            if i % 8 == 0 {
                value = test_rng.random::<f64>();
            }
            accumulator.add_measurement(value);
        }

        let errors = accumulator.binned_errors();
        assert_eq!(errors.len(), 14);
        approx::assert_abs_diff_eq!(errors[3].1 / errors[0].1, 8f64.sqrt(), epsilon = 0.05);
        let correlation_time = accumulator.correlation_time().unwrap();
        assert!(
            correlation_time > 1. && correlation_time < 8.,
            "Correlation time {correlation_time} too far from 3.5"
        );
    }
}
