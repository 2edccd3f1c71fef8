use super::mdct::{Mdct, WindowType};
use crate::core::{Error, MdzResult, Record, Waveform};

/// MDCT decoder: inverse transform with overlap-add
///
/// The block size comes from the record (two samples per bin). The window
/// is not stored, so it has to match the one used to encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    window: WindowType,
}

impl Decoder {
    /// Create a new decoder using the sine window
    pub fn new() -> Self {
        Decoder::default()
    }

    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    /// reconstruct the waveform held by `record`
    pub fn decode(&self, record: &Record) -> MdzResult<Waveform> {
        let data = &record.data;
        if data.bins() == 0 {
            return Err(Error::MalformedInput("record has no frequency bins".into()));
        }
        if data.blocks() == 0 {
            return Err(Error::MalformedInput("record has no blocks".into()));
        }

        let mdct = Mdct::new(data.block_size()?, self.window)?;

        let channels = match record.length {
            Some(length) => mdct.inverse_exact(data, length)?,
            None => mdct.inverse(data)?,
        };

        log::debug!(
            "decoded {} blocks x {} channels at {} Hz",
            data.blocks(),
            data.channels(),
            record.rate
        );

        Waveform::interleave(&channels, record.rate)
    }
}
