//! Train/test partition of absolute time-step indices.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// Absolute time-step indices used for training and testing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSplit {
    /// Training time steps, ascending
    pub train: Vec<usize>,
    /// Test time steps, ascending
    pub test: Vec<usize>,
}

impl TimeSplit {
    pub fn new(mut train: Vec<usize>, mut test: Vec<usize>) -> Self {
        train.sort_unstable();
        test.sort_unstable();
        Self { train, test }
    }

    /// Number of target columns needed to address every training step,
    /// i.e. `max(train) + 1` (zero when there is no training step).
    pub fn time_train_dim(&self) -> usize {
        self.train.iter().max().map_or(0, |&t| t + 1)
    }

    /// Contiguous range spanned by the test steps.
    pub fn test_range(&self) -> Option<RangeInclusive<usize>> {
        let min = *self.test.iter().min()?;
        let max = *self.test.iter().max()?;
        Some(min..=max)
    }

    /// Largest absolute time index referenced by either set.
    pub fn max_index(&self) -> Option<usize> {
        self.train.iter().chain(&self.test).max().copied()
    }
}

/// Parameters of the calendar-year split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearSplitParams {
    /// Calendar year of the first entry in the per-year index list
    pub first_year: u32,
    /// First year entirely reserved for testing
    pub first_test_year: u32,
    /// Last year (inclusive) reserved for testing
    pub end_year: u32,
    /// Trailing steps of the year before `first_test_year` moved to the test set
    pub holdout_steps: usize,
    /// Leading absolute steps excluded from training (encoder history)
    pub warmup_steps: usize,
}

impl Default for YearSplitParams {
    fn default() -> Self {
        Self {
            first_year: 2001,
            first_test_year: 2016,
            end_year: 2016,
            holdout_steps: 31 * 24,
            warmup_steps: 24,
        }
    }
}

impl YearSplitParams {
    pub fn validate(&self) -> CommonResult<()> {
        if self.first_test_year <= self.first_year {
            return Err(CommonError::InvalidTimeSplit(format!(
                "first_test_year {} must come after first_year {}",
                self.first_test_year, self.first_year
            )));
        }
        if self.end_year < self.first_test_year {
            return Err(CommonError::InvalidTimeSplit(format!(
                "end_year {} is before first_test_year {}",
                self.end_year, self.first_test_year
            )));
        }
        Ok(())
    }
}

/// Split per-year time-step lists into train and test sets.
///
/// Years before `first_test_year - 1` train entirely. The year right before
/// `first_test_year` trains except for its last `holdout_steps` entries, which
/// join the test set together with every year in `first_test_year..=end_year`.
pub fn split_by_years(years: &[Vec<usize>], params: &YearSplitParams) -> CommonResult<TimeSplit> {
    params.validate()?;

    let year_slot = |year: u32| -> CommonResult<&Vec<usize>> {
        years
            .get((year - params.first_year) as usize)
            .ok_or_else(|| {
                CommonError::InvalidTimeSplit(format!(
                    "no time indices for year {year} ({} years listed from {})",
                    years.len(),
                    params.first_year
                ))
            })
    };

    let prior_year = params.first_test_year - 1;
    let prior = year_slot(prior_year)?;

    let mut train: Vec<usize> = years[..(prior_year - params.first_year) as usize]
        .iter()
        .flatten()
        .copied()
        .collect();
    let cut = prior.len().saturating_sub(params.holdout_steps);
    train.extend_from_slice(&prior[..cut]);

    let mut test = prior[cut..].to_vec();
    for year in params.first_test_year..=params.end_year {
        test.extend_from_slice(year_slot(year)?);
    }

    train.retain(|&t| t >= params.warmup_steps);
    Ok(TimeSplit::new(train, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_years() -> Vec<Vec<usize>> {
        vec![(0..10).collect(), (10..20).collect(), (20..30).collect()]
    }

    fn params() -> YearSplitParams {
        YearSplitParams {
            first_year: 2001,
            first_test_year: 2003,
            end_year: 2003,
            holdout_steps: 3,
            warmup_steps: 2,
        }
    }

    #[test]
    fn test_split_moves_holdout_to_test() {
        let split = split_by_years(&three_years(), &params()).unwrap();
        assert_eq!(split.train, (2..17).collect::<Vec<_>>());
        assert_eq!(split.test, (17..30).collect::<Vec<_>>());
        assert_eq!(split.time_train_dim(), 17);
        assert_eq!(split.test_range(), Some(17..=29));
    }

    #[test]
    fn test_split_missing_year_is_an_error() {
        let mut p = params();
        p.end_year = 2004;
        assert!(matches!(
            split_by_years(&three_years(), &p),
            Err(CommonError::InvalidTimeSplit(_))
        ));
    }

    #[test]
    fn test_split_rejects_inverted_years() {
        let mut p = params();
        p.first_test_year = 2001;
        assert!(split_by_years(&three_years(), &p).is_err());
    }

    #[test]
    fn test_empty_split() {
        let split = TimeSplit::default();
        assert_eq!(split.time_train_dim(), 0);
        assert_eq!(split.test_range(), None);
        assert_eq!(split.max_index(), None);
    }
}
