use super::mdct::Mdct;
use super::reduction::ReductionPipeline;
use super::CodecConfig;
use crate::core::{CoefficientMatrix, MdzResult, Record, Stage, Waveform};

/// The coefficients as they stand after one stage of an encode
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub stage: Stage,
    /// sample rate in Hz
    pub rate: u32,
    /// samples per channel in the source waveform
    pub length: usize,
    pub data: &'a CoefficientMatrix,
}

impl Snapshot<'_> {
    /// owned record for this stage
    pub fn to_record(&self) -> Record {
        Record::new(self.rate, self.data.clone()).with_length(self.length)
    }
}

/// MDCT encoder: forward transform, then the reduction stages
pub struct Encoder {
    config: CodecConfig,
    mdct: Mdct,
    pipeline: ReductionPipeline,
}

impl Encoder {
    /// Create a new encoder, rejecting a bad config before any audio is touched
    pub fn new(config: CodecConfig) -> MdzResult<Self> {
        let mdct = Mdct::new(config.block_size, config.window)?;
        let pipeline = ReductionPipeline::new(config.reduction.clone())?;

        Ok(Encoder {
            config,
            mdct,
            pipeline,
        })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// encode to the final (stage 4) record
    pub fn encode(&self, waveform: &Waveform) -> MdzResult<Record> {
        self.encode_with(waveform, |_| {})
    }

    /// encode, handing `observer` the matrix after the transform and after each stage
    pub fn encode_with<F>(&self, waveform: &Waveform, mut observer: F) -> MdzResult<Record>
    where
        F: FnMut(Snapshot<'_>),
    {
        let rate = waveform.sample_rate;
        let length = waveform.frames();

        let coeffs = self.mdct.forward(waveform)?;
        observer(Snapshot {
            stage: Stage::Transformed,
            rate,
            length,
            data: &coeffs,
        });

        let reduced = self.pipeline.run_with(coeffs, |stage, data| {
            observer(Snapshot {
                stage,
                rate,
                length,
                data,
            })
        });

        log::debug!(
            "encoded {} frames at {} Hz, {:.1}% of coefficients zero",
            length,
            rate,
            100.0 * reduced.count_zeros() as f64 / reduced.values().len().max(1) as f64
        );

        Ok(Record::new(rate, reduced).with_length(length))
    }

    /// one record per stage, index 0 (raw transform) to 4 (final)
    pub fn encode_stages(&self, waveform: &Waveform) -> MdzResult<Vec<Record>> {
        let mut records = Vec::with_capacity(Stage::ALL.len());
        self.encode_with(waveform, |snapshot| records.push(snapshot.to_record()))?;
        Ok(records)
    }
}
