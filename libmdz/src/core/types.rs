//! common types for the mdz codec

use serde::{Deserialize, Serialize};

use super::error::{Error, MdzResult};

// waveform

/// pcm audio, interleaved `[L, R, L, R, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl Waveform {
    /// build a waveform, checking rate and channel layout
    pub fn new(samples: Vec<f64>, sample_rate: u32, channels: usize) -> MdzResult<Self> {
        if sample_rate == 0 {
            return Err(Error::MalformedInput("sample rate must be positive".into()));
        }
        if channels == 0 {
            return Err(Error::MalformedInput("waveform has no channels".into()));
        }
        if samples.len() % channels != 0 {
            return Err(Error::MalformedInput(format!(
                "{} samples do not split evenly into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Waveform {
            samples,
            sample_rate,
            channels,
        })
    }

    /// single-channel waveform
    pub fn mono(samples: Vec<f64>, sample_rate: u32) -> MdzResult<Self> {
        Self::new(samples, sample_rate, 1)
    }

    /// samples per channel
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// split into one vector per channel
    pub fn deinterleave(&self) -> Vec<Vec<f64>> {
        let mut planar: Vec<Vec<f64>> = (0..self.channels)
            .map(|_| Vec::with_capacity(self.frames()))
            .collect();

        for (i, &s) in self.samples.iter().enumerate() {
            planar[i % self.channels].push(s);
        }

        planar
    }

    /// inverse of [`Waveform::deinterleave`]; channels are cut to the shortest
    pub fn interleave(planar: &[Vec<f64>], sample_rate: u32) -> MdzResult<Self> {
        let channels = planar.len();
        let frames = planar.iter().map(Vec::len).min().unwrap_or(0);

        let mut samples = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            for ch in planar {
                samples.push(ch[i]);
            }
        }

        Self::new(samples, sample_rate, channels)
    }
}

// precision

/// floating point format the coefficient values are representable in
///
/// | Variant  | Format           | npy dtype |
/// |----------|------------------|-----------|
/// | Half     | IEEE 754 binary16 | `<f2`    |
/// | BFloat16 | bfloat16         | `<f4`     |
/// | Single   | IEEE 754 binary32 | `<f4`    |
/// | Double   | IEEE 754 binary64 | `<f8`    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Half,
    #[serde(alias = "bf16")]
    BFloat16,
    Single,
    Double,
}

impl Precision {
    /// round `value` to the nearest value this format can hold
    #[inline]
    pub fn quantize(self, value: f64) -> f64 {
        match self {
            Precision::Half => half::f16::from_f64(value).to_f64(),
            Precision::BFloat16 => half::bf16::from_f64(value).to_f64(),
            Precision::Single => value as f32 as f64,
            Precision::Double => value,
        }
    }

    /// bytes per stored value
    pub fn byte_width(self) -> usize {
        match self {
            Precision::Half => 2,
            // numpy has no bfloat16, stored widened
            Precision::BFloat16 | Precision::Single => 4,
            Precision::Double => 8,
        }
    }
}

impl std::str::FromStr for Precision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "half" | "f16" | "float16" => Ok(Precision::Half),
            "bfloat16" | "bf16" => Ok(Precision::BFloat16),
            "single" | "f32" | "float32" => Ok(Precision::Single),
            "double" | "f64" | "float64" => Ok(Precision::Double),
            _ => Err(Error::InvalidConfiguration(format!(
                "unknown precision '{}', use half, bfloat16, single or double",
                s
            ))),
        }
    }
}

// coefficients

/// mdct coefficients, row-major `[bin][block][channel]`
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientMatrix {
    bins: usize,
    blocks: usize,
    channels: usize,
    data: Vec<f64>,
    precision: Precision,
}

impl CoefficientMatrix {
    /// all-zero matrix
    pub fn zeros(bins: usize, blocks: usize, channels: usize) -> Self {
        CoefficientMatrix {
            bins,
            blocks,
            channels,
            data: vec![0.0; bins * blocks * channels],
            precision: Precision::Double,
        }
    }

    /// wrap existing row-major values
    pub fn from_vec(
        bins: usize,
        blocks: usize,
        channels: usize,
        data: Vec<f64>,
        precision: Precision,
    ) -> MdzResult<Self> {
        if channels == 0 {
            return Err(Error::MalformedInput("coefficients have no channels".into()));
        }
        let count = super::npy::element_count(&[bins, blocks, channels])?;
        if count != data.len() {
            return Err(Error::MalformedInput(format!(
                "shape ({}, {}, {}) needs {} values, got {}",
                bins,
                blocks,
                channels,
                count,
                data.len()
            )));
        }
        Ok(CoefficientMatrix {
            bins,
            blocks,
            channels,
            data,
            precision,
        })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
    }

    /// `(bins, blocks)` for mono, `(bins, blocks, channels)` otherwise
    pub fn shape(&self) -> Vec<usize> {
        if self.channels == 1 {
            vec![self.bins, self.blocks]
        } else {
            vec![self.bins, self.blocks, self.channels]
        }
    }

    /// block size this matrix was produced with
    pub fn block_size(&self) -> MdzResult<usize> {
        self.bins.checked_mul(2).ok_or_else(|| {
            Error::MalformedInput(format!("{} bins is not a usable block size", self.bins))
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_values(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    fn index(&self, bin: usize, block: usize, channel: usize) -> usize {
        (bin * self.blocks + block) * self.channels + channel
    }

    #[inline]
    pub fn get(&self, bin: usize, block: usize, channel: usize) -> f64 {
        self.data[self.index(bin, block, channel)]
    }

    #[inline]
    pub fn set(&mut self, bin: usize, block: usize, channel: usize, value: f64) {
        let idx = self.index(bin, block, channel);
        self.data[idx] = value;
    }

    /// copy one block of one channel out as a spectrum
    pub fn block(&self, block: usize, channel: usize) -> Vec<f64> {
        (0..self.bins).map(|k| self.get(k, block, channel)).collect()
    }

    /// write a spectrum into one block of one channel
    pub fn set_block(&mut self, block: usize, channel: usize, spectrum: &[f64]) {
        for (k, &c) in spectrum.iter().enumerate().take(self.bins) {
            self.set(k, block, channel, c);
        }
    }

    /// number of entries exactly equal to zero
    pub fn count_zeros(&self) -> usize {
        self.data.iter().filter(|&&c| c == 0.0).count()
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.len() - self.count_zeros()
    }

    /// apply `f` to every value, keeping shape and precision tag
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        CoefficientMatrix {
            data: self.data.iter().map(|&c| f(c)).collect(),
            ..self.clone()
        }
    }
}

// reduction stages

/// position in the reduction pipeline
///
/// | Index | Stage       | Matrix after ...          |
/// |-------|-------------|---------------------------|
/// | 0     | Transformed | forward mdct              |
/// | 1     | Truncated   | high band zeroed          |
/// | 2     | Downcast    | precision reduced         |
/// | 3     | Rounded     | decimal rounding          |
/// | 4     | Thresholded | small magnitudes zeroed   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    Transformed = 0,
    Truncated = 1,
    Downcast = 2,
    Rounded = 3,
    Thresholded = 4,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Transformed,
        Stage::Truncated,
        Stage::Downcast,
        Stage::Rounded,
        Stage::Thresholded,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn is_final(self) -> bool {
        self == Stage::Thresholded
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Transformed => "transform",
            Stage::Truncated => "band truncation",
            Stage::Downcast => "precision downcast",
            Stage::Rounded => "decimal rounding",
            Stage::Thresholded => "magnitude threshold",
        }
    }
}

impl TryFrom<u8> for Stage {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Stage::ALL
            .get(v as usize)
            .copied()
            .ok_or_else(|| Error::InvalidConfiguration(format!("no reduction stage {}", v)))
    }
}

// persisted record

/// what crosses the encode/decode boundary
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// sample rate in Hz
    pub rate: u32,
    /// coefficients at the stage this record was taken
    pub data: CoefficientMatrix,
    /// original samples per channel, if known
    pub length: Option<usize>,
}

impl Record {
    pub fn new(rate: u32, data: CoefficientMatrix) -> Self {
        Record {
            rate,
            data,
            length: None,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// fraction of coefficients that are exactly zero
    pub fn sparsity(&self) -> f64 {
        let total = self.data.values().len();
        if total == 0 {
            return 0.0;
        }
        self.data.count_zeros() as f64 / total as f64
    }
}
