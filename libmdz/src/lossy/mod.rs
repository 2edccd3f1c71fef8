//! MDCT lossy codec for mdz
//!
//! Forward MDCT, then a fixed sequence of destructive reduction stages,
//! then (on the way back) inverse MDCT with overlap-add.

pub mod decoder;
pub mod encoder;
pub mod mdct;
pub mod reduction;

use serde::{Deserialize, Serialize};

use crate::core::{MdzResult, DEFAULT_BLOCK_SIZE};

// Re-export main types
pub use decoder::Decoder;
pub use encoder::{Encoder, Snapshot};
pub use mdct::{Mdct, WindowType};
pub use reduction::{
    downcast, round_decimals, round_half_even, threshold, truncate_band, BandRange,
    ReductionConfig, ReductionPipeline,
};

/// Everything an encode needs besides the audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// samples per MDCT block, positive and even
    pub block_size: usize,
    pub window: WindowType,
    pub reduction: ReductionConfig,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            window: WindowType::Sine,
            reduction: ReductionConfig::default(),
        }
    }
}

impl CodecConfig {
    /// transform only, no reduction; decode gives back the input
    pub fn lossless() -> Self {
        CodecConfig {
            reduction: ReductionConfig::none(),
            ..Default::default()
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    pub fn with_reduction(mut self, reduction: ReductionConfig) -> Self {
        self.reduction = reduction;
        self
    }

    /// check everything up front; no partial output is ever produced
    pub fn validate(&self) -> MdzResult<()> {
        Mdct::check_block_size(self.block_size)?;
        self.reduction.validate()
    }
}
