//! Classification and regression targets per node and time step.

use ndarray::{s, Array2, Zip};
use precip_common::TimeSplit;

use crate::error::{PreprocessError, Result};

/// Binary rain/no-rain target: NaN where the raw value is NaN.
pub fn classify(pr: f32, threshold: f32) -> f32 {
    if pr.is_nan() {
        f32::NAN
    } else if pr >= threshold {
        1.0
    } else {
        0.0
    }
}

/// Rain amount target: `log1p(pr)` at or above the threshold, NaN otherwise.
pub fn regress(pr: f32, threshold: f32) -> f32 {
    if pr >= threshold {
        pr.ln_1p()
    } else {
        f32::NAN
    }
}

/// Training-period targets, shape `(n_nodes, time_train_dim)`.
///
/// Column `t` holds absolute time step `t`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTargets {
    pub classification: Array2<f32>,
    pub regression: Array2<f32>,
}

impl TrainingTargets {
    /// Derive both targets from node-major precipitation over steps `0..time_train_dim`.
    pub fn derive(precipitation: &Array2<f32>, time_train_dim: usize, threshold: f32) -> Result<Self> {
        check_time_range(precipitation, time_train_dim)?;
        let train = precipitation.slice(s![.., ..time_train_dim]);

        Ok(Self {
            classification: train.mapv(|pr| classify(pr, threshold)),
            regression: train.mapv(|pr| regress(pr, threshold)),
        })
    }

    /// `true` wherever the classification target is defined.
    pub fn classification_mask(&self) -> Array2<bool> {
        self.classification.mapv(|v| !v.is_nan())
    }

    /// `true` wherever the regression target is defined.
    pub fn regression_mask(&self) -> Array2<bool> {
        self.regression.mapv(|v| !v.is_nan())
    }

    /// Whether any of `nodes` has a defined classification and regression
    /// target at column `t`.
    pub fn any_defined(&self, nodes: &[usize], t: usize) -> (bool, bool) {
        let cl = nodes.iter().any(|&n| !self.classification[[n, t]].is_nan());
        let reg = cl && nodes.iter().any(|&n| !self.regression[[n, t]].is_nan());
        (cl, reg)
    }
}

/// Raw precipitation over the test period: columns cover
/// `min(test)..=max(test)`, untransformed. Zero columns when there is no test step.
pub fn test_targets(precipitation: &Array2<f32>, split: &TimeSplit) -> Result<Array2<f32>> {
    match split.test_range() {
        Some(range) => {
            check_time_range(precipitation, range.end() + 1)?;
            Ok(precipitation.slice(s![.., *range.start()..=*range.end()]).to_owned())
        }
        None => Ok(Array2::zeros((precipitation.nrows(), 0))),
    }
}

fn check_time_range(precipitation: &Array2<f32>, needed: usize) -> Result<()> {
    if needed > precipitation.ncols() {
        return Err(PreprocessError::TimeRangeExceeded {
            requested: needed - 1,
            available: precipitation.ncols(),
        });
    }
    Ok(())
}

/// Count of defined entries per mask, for logging.
pub(crate) fn defined_counts(targets: &TrainingTargets) -> (usize, usize) {
    let mut cl = 0;
    let mut reg = 0;
    Zip::from(&targets.classification)
        .and(&targets.regression)
        .for_each(|c, r| {
            cl += usize::from(!c.is_nan());
            reg += usize::from(!r.is_nan());
        });
    (cl, reg)
}
