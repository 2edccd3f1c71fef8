//! The four lossy reduction stages.
//!
//! Each stage is a pure function over a [`CoefficientMatrix`]. The order is
//! fixed: band truncation, precision downcast, decimal rounding, magnitude
//! thresholding.

use serde::{Deserialize, Serialize};

use crate::core::{
    CoefficientMatrix, Error, MdzResult, Precision, Stage, DEFAULT_CUTOFF_BIN, DEFAULT_DECIMALS,
    DEFAULT_THRESHOLD, MAX_DECIMALS,
};

/// bins `[start, end)` zeroed by band truncation; no `end` means the top of the bin axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandRange {
    pub start: usize,
    #[serde(default)]
    pub end: Option<usize>,
}

impl BandRange {
    /// everything from `start` up
    pub fn from_bin(start: usize) -> Self {
        BandRange { start, end: None }
    }

    pub fn new(start: usize, end: usize) -> Self {
        BandRange {
            start,
            end: Some(end),
        }
    }

    /// the part of the range that exists in a matrix with `bins` bins
    pub fn clamp(self, bins: usize) -> std::ops::Range<usize> {
        let end = self.end.unwrap_or(bins).min(bins);
        let start = self.start.min(end);
        start..end
    }

    fn validate(self) -> MdzResult<()> {
        match self.end {
            Some(end) if end < self.start => Err(Error::InvalidConfiguration(format!(
                "truncation range ends at bin {} before it starts at {}",
                end, self.start
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for BandRange {
    fn default() -> Self {
        BandRange::from_bin(DEFAULT_CUTOFF_BIN)
    }
}

/// which stages run and with what parameters; `None` skips a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    pub truncate: Option<BandRange>,
    pub precision: Option<Precision>,
    pub decimals: Option<i32>,
    pub threshold: Option<f64>,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        ReductionConfig {
            truncate: Some(BandRange::default()),
            precision: Some(Precision::Half),
            decimals: Some(DEFAULT_DECIMALS),
            threshold: Some(DEFAULT_THRESHOLD),
        }
    }
}

impl ReductionConfig {
    /// every stage off; encode output is the raw transform
    pub fn none() -> Self {
        ReductionConfig {
            truncate: None,
            precision: None,
            decimals: None,
            threshold: None,
        }
    }

    pub fn with_truncate(mut self, range: Option<BandRange>) -> Self {
        self.truncate = range;
        self
    }

    pub fn with_precision(mut self, precision: Option<Precision>) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_decimals(mut self, decimals: Option<i32>) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold;
        self
    }

    /// reject anything a stage could not run with
    pub fn validate(&self) -> MdzResult<()> {
        if let Some(range) = self.truncate {
            range.validate()?;
        }
        if let Some(d) = self.decimals {
            if d < 0 {
                return Err(Error::InvalidConfiguration(format!(
                    "rounding digit count must not be negative, got {}",
                    d
                )));
            }
            if d > MAX_DECIMALS {
                return Err(Error::InvalidConfiguration(format!(
                    "rounding digit count {} is above the maximum of {}",
                    d, MAX_DECIMALS
                )));
            }
        }
        if let Some(t) = self.threshold {
            if t.is_nan() || t < 0.0 {
                return Err(Error::InvalidConfiguration(format!(
                    "threshold must be a non-negative number, got {}",
                    t
                )));
            }
        }
        Ok(())
    }
}

// stages

/// Stage 1: zero every coefficient in `range`, across all blocks and channels
pub fn truncate_band(matrix: &CoefficientMatrix, range: BandRange) -> CoefficientMatrix {
    let bins = range.clamp(matrix.bins());
    let mut out = matrix.clone();

    if bins.is_empty() {
        return out;
    }

    // rows are contiguous: one bin is blocks * channels values
    let row = matrix.blocks() * matrix.channels();
    out.values_mut()[bins.start * row..bins.end * row].fill(0.0);
    out
}

/// Stage 2: round every coefficient to the nearest value of `precision`
pub fn downcast(matrix: &CoefficientMatrix, precision: Precision) -> CoefficientMatrix {
    let mut out = matrix.map(|c| precision.quantize(c));
    out.set_precision(precision);
    out
}

/// Stage 3: round to `digits` decimals, ties to even
///
/// The result is re-quantized to the matrix precision, so a half-precision
/// matrix stays half precision (0.13 is stored as the nearest binary16).
pub fn round_decimals(matrix: &CoefficientMatrix, digits: u32) -> CoefficientMatrix {
    let precision = matrix.precision();
    let factor = 10f64.powi(digits as i32);
    matrix.map(|c| {
        let scaled = c * factor;
        if !scaled.is_finite() {
            return c;
        }
        precision.quantize(round_half_even(scaled) / factor)
    })
}

/// Stage 4: anything with magnitude below `threshold` becomes exactly 0.0
pub fn threshold(matrix: &CoefficientMatrix, threshold: f64) -> CoefficientMatrix {
    matrix.map(|c| if c.abs() < threshold { 0.0 } else { c })
}

/// banker's rounding, matches numpy's `round`
#[inline]
pub fn round_half_even(x: f64) -> f64 {
    let r = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        // tie: pick the even neighbour
        2.0 * (x / 2.0).round()
    } else {
        r
    }
}

// pipeline

/// Runs the configured stages in order
#[derive(Debug, Clone)]
pub struct ReductionPipeline {
    config: ReductionConfig,
}

impl ReductionPipeline {
    pub fn new(config: ReductionConfig) -> MdzResult<Self> {
        config.validate()?;
        Ok(ReductionPipeline { config })
    }

    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    /// apply a single stage; disabled stages and `Transformed` pass through
    pub fn apply_stage(&self, stage: Stage, matrix: &CoefficientMatrix) -> CoefficientMatrix {
        match stage {
            Stage::Transformed => matrix.clone(),
            Stage::Truncated => match self.config.truncate {
                Some(range) => truncate_band(matrix, range),
                None => matrix.clone(),
            },
            Stage::Downcast => match self.config.precision {
                Some(p) => downcast(matrix, p),
                None => matrix.clone(),
            },
            Stage::Rounded => match self.config.decimals {
                // validated non-negative
                Some(d) => round_decimals(matrix, d as u32),
                None => matrix.clone(),
            },
            Stage::Thresholded => match self.config.threshold {
                Some(t) => threshold(matrix, t),
                None => matrix.clone(),
            },
        }
    }

    /// stages 1-4, calling `observer` with the result of each
    pub fn run_with<F>(&self, matrix: CoefficientMatrix, mut observer: F) -> CoefficientMatrix
    where
        F: FnMut(Stage, &CoefficientMatrix),
    {
        let mut current = matrix;

        for stage in &Stage::ALL[1..] {
            current = self.apply_stage(*stage, &current);
            log::debug!(
                "stage {} ({}): {} of {} coefficients are zero",
                stage.index(),
                stage.name(),
                current.count_zeros(),
                current.values().len()
            );
            observer(*stage, &current);
        }

        current
    }

    /// stages 1-4, final matrix only
    pub fn run(&self, matrix: CoefficientMatrix) -> CoefficientMatrix {
        self.run_with(matrix, |_, _| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_even_ties() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(-0.5), 0.0);
        assert_eq!(round_half_even(-1.5), -2.0);
        assert_eq!(round_half_even(12.7), 13.0);
        assert_eq!(round_half_even(-12.2), -12.0);
    }

    #[test]
    fn test_band_range_clamp() {
        assert_eq!(BandRange::from_bin(150).clamp(256), 150..256);
        assert_eq!(BandRange::new(150, 511).clamp(256), 150..256);
        assert_eq!(BandRange::from_bin(300).clamp(256), 256..256);
        assert_eq!(BandRange::new(10, 10).clamp(256), 10..10);
    }
}
