// The FFT kernel follows FFmpeg's ff_mdct_calc_c for the forward direction
// and Symphonia's IMDCT for the inverse, rescaled to be orthonormal.

use std::f64::consts::PI;
use std::sync::Arc;

use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::core::{CoefficientMatrix, Error, MdzResult, Waveform};

/// Window types for MDCT
///
/// All of them satisfy the Princen-Bradley condition, so any of them gives
/// perfect reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    /// Sine window - simple, good for most content
    #[default]
    Sine,
    /// Kaiser-Bessel Derived - better frequency selectivity
    #[serde(alias = "kaiser-bessel-derived")]
    Kbd,
    /// Vorbis window - optimized for audio
    Vorbis,
}

impl std::str::FromStr for WindowType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sine" => Ok(WindowType::Sine),
            "kbd" | "kaiser-bessel-derived" => Ok(WindowType::Kbd),
            "vorbis" => Ok(WindowType::Vorbis),
            _ => Err(Error::InvalidConfiguration(format!(
                "unknown window '{}', use sine, kbd or vorbis",
                s
            ))),
        }
    }
}

/// how a single block gets transformed
enum Kernel {
    /// O(N log N), needs N divisible by 8
    Fft {
        fft: Arc<dyn rustfft::Fft<f64>>,
        /// Twiddle factors: e^(i*π/n2 * (k + 1/8))
        twiddle: Vec<Complex<f64>>,
    },
    /// O(N²) straight from the definition, any even N
    Direct,
}

/// MDCT transform for a specific window size
struct MdctTransform {
    /// Window size (N)
    n: usize,
    /// Number of coefficients (N/2)
    n2: usize,
    /// Window function
    window: Vec<f64>,
    /// sqrt(2/n2), applied in both directions
    scale: f64,
    kernel: Kernel,
}

impl MdctTransform {
    fn new(window_size: usize, window_type: WindowType) -> Self {
        let n = window_size;
        let n2 = n / 2;
        let n4 = n / 4;

        let window = match window_type {
            WindowType::Sine => Self::sine_window(n),
            WindowType::Kbd => Self::kbd_window(n, 4.0),
            WindowType::Vorbis => Self::vorbis_window(n),
        };

        let kernel = if n % 8 == 0 {
            let mut planner = FftPlanner::new();
            let fft = planner.plan_fft_forward(n4);

            let twiddle: Vec<Complex<f64>> = (0..n4)
                .map(|k| {
                    let theta = PI / n2 as f64 * (k as f64 + 0.125);
                    Complex::new(theta.cos(), theta.sin())
                })
                .collect();

            Kernel::Fft { fft, twiddle }
        } else {
            Kernel::Direct
        };

        Self {
            n,
            n2,
            window,
            scale: (2.0 / n2 as f64).sqrt(),
            kernel,
        }
    }

    /// Sine window: w[n] = sin(π(n+0.5)/N)
    fn sine_window(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (PI * (i as f64 + 0.5) / n as f64).sin())
            .collect()
    }

    /// Vorbis window: sin(π/2 * sin²(π(n+0.5)/N))
    fn vorbis_window(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let x = (PI * (i as f64 + 0.5) / n as f64).sin();
                (PI / 2.0 * x * x).sin()
            })
            .collect()
    }

    /// Kaiser-Bessel Derived window
    fn kbd_window(n: usize, alpha: f64) -> Vec<f64> {
        let half = n / 2;

        // Kaiser window of length half+1
        let kaiser: Vec<f64> = (0..=half)
            .map(|i| {
                Self::bessel_i0(
                    PI * alpha * (1.0 - (2.0 * i as f64 / half as f64 - 1.0).powi(2)).sqrt(),
                )
            })
            .collect();

        let mut cumsum = vec![0.0f64; half + 1];
        cumsum[0] = kaiser[0];
        for i in 1..=half {
            cumsum[i] = cumsum[i - 1] + kaiser[i];
        }
        let total = cumsum[half];

        let mut window = vec![0.0f64; n];
        for i in 0..half {
            window[i] = (cumsum[i] / total).sqrt();
            window[n - 1 - i] = window[i];
        }

        window
    }

    /// Modified Bessel function I0 (for KBD window)
    fn bessel_i0(x: f64) -> f64 {
        let mut sum = 1.0f64;
        let mut term = 1.0f64;
        let x_sq = x * x / 4.0;

        for k in 1..50 {
            term *= x_sq / (k * k) as f64;
            sum += term;
            if term < 1e-12 * sum {
                break;
            }
        }

        sum
    }

    fn forward(&self, samples: &[f64]) -> Vec<f64> {
        match &self.kernel {
            Kernel::Fft { fft, twiddle } => self.forward_fft(samples, fft.as_ref(), twiddle),
            Kernel::Direct => self.forward_direct(samples),
        }
    }

    fn inverse(&self, spec: &[f64]) -> Vec<f64> {
        match &self.kernel {
            Kernel::Fft { fft, twiddle } => self.inverse_fft(spec, fft.as_ref(), twiddle),
            Kernel::Direct => self.inverse_direct(spec),
        }
    }

    /// X[k] = s * Σ x[n] * w[n] * cos(π/n2 * (n + 0.5 + n2/2) * (k + 0.5))
    fn forward_direct(&self, samples: &[f64]) -> Vec<f64> {
        let n2 = self.n2 as f64;
        (0..self.n2)
            .map(|k| {
                let sum: f64 = (0..self.n)
                    .map(|i| {
                        let angle = PI / n2 * (i as f64 + 0.5 + n2 / 2.0) * (k as f64 + 0.5);
                        samples[i] * self.window[i] * angle.cos()
                    })
                    .sum();
                sum * self.scale
            })
            .collect()
    }

    /// y[n] = s * w[n] * Σ X[k] * cos(π/n2 * (n + 0.5 + n2/2) * (k + 0.5))
    fn inverse_direct(&self, spec: &[f64]) -> Vec<f64> {
        let n2 = self.n2 as f64;
        (0..self.n)
            .map(|i| {
                let sum: f64 = spec
                    .iter()
                    .enumerate()
                    .map(|(k, &c)| {
                        let angle = PI / n2 * (i as f64 + 0.5 + n2 / 2.0) * (k as f64 + 0.5);
                        c * angle.cos()
                    })
                    .sum();
                sum * self.scale * self.window[i]
            })
            .collect()
    }

    /// Forward MDCT using FFT - O(N log N)
    fn forward_fft(
        &self,
        samples: &[f64],
        fft: &dyn rustfft::Fft<f64>,
        twiddle: &[Complex<f64>],
    ) -> Vec<f64> {
        let n = self.n;
        let n2 = self.n2;
        let n4 = n / 4;
        let n8 = n4 / 2;
        let n3 = 3 * n4;

        let x: Vec<f64> = samples
            .iter()
            .zip(self.window.iter())
            .map(|(&s, &w)| s * w)
            .collect();

        // Pre-rotation: fold N windowed samples into N/4 complex FFT inputs
        let mut z: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); n4];

        for i in 0..n8 {
            let re = -x[2 * i + n3] - x[n3 - 1 - 2 * i];
            let im = -x[n4 + 2 * i] + x[n4 - 1 - 2 * i];

            let w = &twiddle[i];
            z[i] = Complex::new(-re * w.re - im * w.im, re * w.im - im * w.re);

            let re2 = x[2 * i] - x[n2 - 1 - 2 * i];
            let im2 = -x[n2 + 2 * i] - x[n - 1 - 2 * i];

            let w2 = &twiddle[n8 + i];
            z[n8 + i] = Complex::new(-re2 * w2.re - im2 * w2.im, re2 * w2.im - im2 * w2.re);
        }

        fft.process(&mut z);

        // Post-rotation: extract N/2 real coefficients
        let mut output = vec![0.0; n2];
        let scale = self.scale;

        for i in 0..n8 {
            let idx1 = n8 - i - 1;
            let idx2 = n8 + i;

            let w1 = &twiddle[idx1];
            let z1 = z[idx1];
            let i1 = -z1.re * w1.im + z1.im * w1.re;
            let r0 = -z1.re * w1.re - z1.im * w1.im;

            let w2 = &twiddle[idx2];
            let z2 = z[idx2];
            let i0 = -z2.re * w2.im + z2.im * w2.re;
            let r1 = -z2.re * w2.re - z2.im * w2.im;

            output[2 * idx1] = r0 * scale;
            output[2 * idx1 + 1] = i0 * scale;
            output[2 * idx2] = r1 * scale;
            output[2 * idx2 + 1] = i1 * scale;
        }

        output
    }

    /// Inverse MDCT using FFT - O(N log N)
    fn inverse_fft(
        &self,
        spec: &[f64],
        fft: &dyn rustfft::Fft<f64>,
        twiddle: &[Complex<f64>],
    ) -> Vec<f64> {
        let n = self.n;
        let n2 = self.n2;
        let n4 = n / 4;
        let n8 = n4 / 2;

        // Pre-FFT twiddling
        let mut z: Vec<Complex<f64>> = Vec::with_capacity(n4);

        for i in 0..n4 {
            let even = spec[i * 2];
            let odd = -spec[n2 - 1 - i * 2];

            let w = &twiddle[i];
            z.push(Complex::new(
                odd * w.im - even * w.re,
                odd * w.re + even * w.im,
            ));
        }

        fft.process(&mut z);

        // Post-FFT twiddling and unfolding
        let mut output = vec![0.0; n];
        let scale = self.scale;
        let window = &self.window;

        // First half of FFT output
        for i in 0..n8 {
            let w = &twiddle[i];
            let val_re = w.re * z[i].re + w.im * z[i].im;
            let val_im = w.im * z[i].re - w.re * z[i].im;

            let fi = 2 * i;
            let ri = n4 - 1 - 2 * i;

            output[ri] = -val_im * scale * window[ri];
            output[n4 + fi] = val_im * scale * window[n4 + fi];
            output[n2 + ri] = val_re * scale * window[n2 + ri];
            output[n2 + n4 + fi] = val_re * scale * window[n2 + n4 + fi];
        }

        // Second half of FFT output
        for i in 0..n8 {
            let idx = n8 + i;
            let w = &twiddle[idx];
            let val_re = w.re * z[idx].re + w.im * z[idx].im;
            let val_im = w.im * z[idx].re - w.re * z[idx].im;

            let fi = 2 * i;
            let ri = n4 - 1 - 2 * i;

            output[fi] = -val_re * scale * window[fi];
            output[n4 + ri] = val_re * scale * window[n4 + ri];
            output[n2 + fi] = val_im * scale * window[n2 + fi];
            output[n2 + n4 + ri] = val_im * scale * window[n2 + n4 + ri];
        }

        output
    }
}

/// MDCT processor with a pre-computed window and FFT plan
///
/// Blocks overlap by 50%, so the hop equals the number of coefficients per
/// block. The signal gets one hop of zeros in front and enough zeros at the
/// back that every real sample is covered by exactly two blocks.
pub struct Mdct {
    transform: MdctTransform,
    window_type: WindowType,
}

impl Mdct {
    /// Create a new MDCT processor for `block_size` samples per block
    pub fn new(block_size: usize, window_type: WindowType) -> MdzResult<Self> {
        Self::check_block_size(block_size)?;

        Ok(Self {
            transform: MdctTransform::new(block_size, window_type),
            window_type,
        })
    }

    /// block sizes must be positive and even
    pub fn check_block_size(block_size: usize) -> MdzResult<()> {
        if block_size == 0 || block_size % 2 != 0 {
            return Err(Error::InvalidConfiguration(format!(
                "block size must be positive and even, got {}",
                block_size
            )));
        }
        Ok(())
    }

    /// Sine window: w[n] = sin(π(n+0.5)/N)
    pub fn sine_window(n: usize) -> Vec<f64> {
        MdctTransform::sine_window(n)
    }

    /// Vorbis window: sin(π/2 * sin²(π(n+0.5)/N))
    pub fn vorbis_window(n: usize) -> Vec<f64> {
        MdctTransform::vorbis_window(n)
    }

    /// Kaiser-Bessel Derived window with the given alpha
    pub fn kbd_window(n: usize, alpha: f64) -> Vec<f64> {
        MdctTransform::kbd_window(n, alpha)
    }

    pub fn block_size(&self) -> usize {
        self.transform.n
    }

    /// coefficients per block, also the hop size
    pub fn bins(&self) -> usize {
        self.transform.n2
    }

    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    /// true when blocks go through rustfft rather than the direct sum
    pub fn is_fft_accelerated(&self) -> bool {
        matches!(self.transform.kernel, Kernel::Fft { .. })
    }

    /// blocks needed to cover `frames` samples per channel
    pub fn num_blocks(&self, frames: usize) -> usize {
        frames.div_ceil(self.bins()) + 1
    }

    /// Forward MDCT of one block: N time samples → N/2 coefficients
    pub fn forward_block(&self, samples: &[f64]) -> MdzResult<Vec<f64>> {
        let n = self.transform.n;
        if samples.len() < n {
            return Err(Error::MalformedInput(format!(
                "MDCT block needs {} samples, got {}",
                n,
                samples.len()
            )));
        }
        Ok(self.transform.forward(&samples[..n]))
    }

    /// Inverse MDCT of one block: N/2 coefficients → N windowed samples
    pub fn inverse_block(&self, coeffs: &[f64]) -> MdzResult<Vec<f64>> {
        let n2 = self.transform.n2;
        if coeffs.len() < n2 {
            return Err(Error::MalformedInput(format!(
                "IMDCT block needs {} coefficients, got {}",
                n2,
                coeffs.len()
            )));
        }
        Ok(self.transform.inverse(&coeffs[..n2]))
    }

    /// Transform a whole waveform into a `(bins, blocks, channels)` matrix
    pub fn forward(&self, waveform: &Waveform) -> MdzResult<CoefficientMatrix> {
        if waveform.is_empty() {
            return Err(Error::MalformedInput(
                "cannot transform an empty waveform".into(),
            ));
        }

        let n = self.block_size();
        let hop = self.bins();
        let blocks = self.num_blocks(waveform.frames());
        let mut matrix = CoefficientMatrix::zeros(hop, blocks, waveform.channels);

        for (ch, data) in waveform.deinterleave().iter().enumerate() {
            let padded = self.pad(data, blocks);

            let spectra: Vec<Vec<f64>> = (0..blocks)
                .into_par_iter()
                .map(|b| self.transform.forward(&padded[b * hop..b * hop + n]))
                .collect();

            for (b, spectrum) in spectra.iter().enumerate() {
                matrix.set_block(b, ch, spectrum);
            }
        }

        log::debug!(
            "mdct forward: {} frames x {} channels -> {} bins x {} blocks",
            waveform.frames(),
            waveform.channels,
            hop,
            blocks
        );

        Ok(matrix)
    }

    /// Inverse MDCT with overlap-add, one vector per channel
    ///
    /// Returns `(blocks - 1) * bins` samples per channel, which is the
    /// original length rounded up to a whole hop.
    pub fn inverse(&self, coeffs: &CoefficientMatrix) -> MdzResult<Vec<Vec<f64>>> {
        if coeffs.bins() != self.bins() {
            return Err(Error::MalformedInput(format!(
                "matrix has {} bins, block size {} expects {}",
                coeffs.bins(),
                self.block_size(),
                self.bins()
            )));
        }

        let hop = self.bins();
        let blocks = coeffs.blocks();
        if blocks == 0 {
            return Ok(vec![Vec::new(); coeffs.channels()]);
        }
        let out_len = (blocks - 1) * hop;

        let mut channels = Vec::with_capacity(coeffs.channels());

        for ch in 0..coeffs.channels() {
            let frames: Vec<Vec<f64>> = (0..blocks)
                .into_par_iter()
                .map(|b| self.transform.inverse(&coeffs.block(b, ch)))
                .collect();

            // overlap-add stays serial, neighbours write the same samples
            let mut signal = vec![0.0f64; (blocks + 1) * hop];
            for (b, frame) in frames.iter().enumerate() {
                for (out, &s) in signal[b * hop..].iter_mut().zip(frame.iter()) {
                    *out += s;
                }
            }

            channels.push(signal[hop..hop + out_len].to_vec());
        }

        Ok(channels)
    }

    /// Like [`Mdct::inverse`], trimmed to `length` samples per channel
    pub fn inverse_exact(
        &self,
        coeffs: &CoefficientMatrix,
        length: usize,
    ) -> MdzResult<Vec<Vec<f64>>> {
        let mut channels = self.inverse(coeffs)?;
        for ch in &mut channels {
            if length > ch.len() {
                return Err(Error::MalformedInput(format!(
                    "record claims {} samples but the coefficients cover only {}",
                    length,
                    ch.len()
                )));
            }
            ch.truncate(length);
        }
        Ok(channels)
    }

    /// one hop of leading zeros, zeros after the data up to the last block
    fn pad(&self, data: &[f64], blocks: usize) -> Vec<f64> {
        let hop = self.bins();
        let mut padded = vec![0.0f64; (blocks + 1) * hop];
        padded[hop..hop + data.len()].copy_from_slice(data);
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_selection() {
        assert!(Mdct::new(512, WindowType::Sine).unwrap().is_fft_accelerated());
        assert!(Mdct::new(64, WindowType::Sine).unwrap().is_fft_accelerated());
        assert!(!Mdct::new(12, WindowType::Sine).unwrap().is_fft_accelerated());
        assert!(!Mdct::new(2, WindowType::Sine).unwrap().is_fft_accelerated());
    }

    #[test]
    fn test_bessel_i0_known_values() {
        assert!((MdctTransform::bessel_i0(0.0) - 1.0).abs() < 1e-12);
        // I0(1) = 1.2660658777520082
        assert!((MdctTransform::bessel_i0(1.0) - 1.266_065_877_752_008).abs() < 1e-9);
    }

    #[test]
    fn test_padding_layout() {
        let mdct = Mdct::new(8, WindowType::Sine).unwrap();
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let blocks = mdct.num_blocks(data.len());
        assert_eq!(blocks, 3);

        let padded = mdct.pad(&data, blocks);
        assert_eq!(padded.len(), 16);
        assert_eq!(&padded[..4], &[0.0; 4]);
        assert_eq!(&padded[4..9], &data);
        assert!(padded[9..].iter().all(|&s| s == 0.0));
    }
}
