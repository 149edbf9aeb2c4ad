//! Sample format conversion
//!
//! Streams accumulate into `i32`. Before delivery every sample is either
//! clamped to the 16-bit range or scaled by `1/32768` into `f32`, depending
//! on the active [`OutputFormat`].

use crate::config::OutputFormat;
use crate::constants::SAMPLE_SCALE;
use crate::{Result, SoundError};

/// Borrowed view of a converted block, as handed to a sink
#[derive(Debug, Clone, Copy)]
pub enum Samples<'a> {
    /// Clamped 16-bit samples
    Int16(&'a [i16]),
    /// Normalized float samples
    Float(&'a [f32]),
}

impl Samples<'_> {
    /// Number of interleaved samples
    pub fn len(&self) -> usize {
        match self {
            Samples::Int16(s) => s.len(),
            Samples::Float(s) => s.len(),
        }
    }

    /// True when the block holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Format of this block
    pub fn format(&self) -> OutputFormat {
        match self {
            Samples::Int16(_) => OutputFormat::Int16,
            Samples::Float(_) => OutputFormat::Float,
        }
    }

    /// Copy out as normalized floats
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            Samples::Int16(s) => s.iter().map(|&v| v as f32 / SAMPLE_SCALE).collect(),
            Samples::Float(s) => s.to_vec(),
        }
    }
}

/// Owned output block in exactly one representation
#[derive(Debug, Clone, PartialEq)]
pub enum OutputBuffer {
    /// Clamped 16-bit samples
    Int16(Vec<i16>),
    /// Normalized float samples
    Float(Vec<f32>),
}

impl OutputBuffer {
    /// Allocate a zeroed buffer of `len` samples
    ///
    /// # Errors
    ///
    /// Returns `ResourceExhausted` if the allocation cannot be satisfied.
    pub fn new(format: OutputFormat, len: usize) -> Result<Self> {
        Ok(match format {
            OutputFormat::Int16 => OutputBuffer::Int16(zeroed_vec(len)?),
            OutputFormat::Float => OutputBuffer::Float(zeroed_vec(len)?),
        })
    }

    /// Active representation
    pub fn format(&self) -> OutputFormat {
        match self {
            OutputBuffer::Int16(_) => OutputFormat::Int16,
            OutputBuffer::Float(_) => OutputFormat::Float,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        match self {
            OutputBuffer::Int16(b) => b.len(),
            OutputBuffer::Float(b) => b.len(),
        }
    }

    /// True when the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero every sample
    pub fn clear(&mut self) {
        match self {
            OutputBuffer::Int16(b) => b.fill(0),
            OutputBuffer::Float(b) => b.fill(0.0),
        }
    }

    /// Overwrite with the converted contents of `raw`
    pub fn convert_from(&mut self, raw: &[i32]) {
        match self {
            OutputBuffer::Int16(b) => {
                for (out, &v) in b.iter_mut().zip(raw) {
                    *out = clamp_i16(v);
                }
            }
            OutputBuffer::Float(b) => {
                for (out, &v) in b.iter_mut().zip(raw) {
                    *out = v as f32 / SAMPLE_SCALE;
                }
            }
        }
    }

    /// Add one sample given in 16-bit scale
    ///
    /// Float buffers add the scaled value; integer buffers add the clamped
    /// value with saturation.
    #[inline]
    pub fn accumulate(&mut self, index: usize, sample: f64) {
        match self {
            OutputBuffer::Int16(b) => {
                let clamped = sample.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
                b[index] = b[index].saturating_add(clamped);
            }
            OutputBuffer::Float(b) => {
                b[index] += (sample / SAMPLE_SCALE as f64) as f32;
            }
        }
    }

    /// Borrow for delivery
    pub fn as_samples(&self) -> Samples<'_> {
        match self {
            OutputBuffer::Int16(b) => Samples::Int16(b),
            OutputBuffer::Float(b) => Samples::Float(b),
        }
    }
}

/// Clamp an accumulated sample into the 16-bit range
#[inline]
pub fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Allocate `len` zeroed elements, reporting failure instead of aborting
pub(crate) fn zeroed_vec<T: Default + Clone>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|e| {
        SoundError::ResourceExhausted(format!("cannot allocate {len} samples: {e}"))
    })?;
    v.resize(len, T::default());
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_i16() {
        assert_eq!(clamp_i16(40_000), 32767);
        assert_eq!(clamp_i16(-40_000), -32768);
        assert_eq!(clamp_i16(1234), 1234);
    }

    #[test]
    fn test_convert_int16() {
        let mut out = OutputBuffer::new(OutputFormat::Int16, 4).unwrap();
        out.convert_from(&[100, -100, 70_000, -70_000]);
        assert_eq!(out, OutputBuffer::Int16(vec![100, -100, 32767, -32768]));
    }

    #[test]
    fn test_convert_float() {
        let mut out = OutputBuffer::new(OutputFormat::Float, 3).unwrap();
        out.convert_from(&[16384, -32768, 65536]);
        // Float output is scaled but never clamped
        assert_eq!(out, OutputBuffer::Float(vec![0.5, -1.0, 2.0]));
    }

    #[test]
    fn test_accumulate_saturates() {
        let mut out = OutputBuffer::new(OutputFormat::Int16, 1).unwrap();
        out.accumulate(0, 30_000.0);
        out.accumulate(0, 30_000.0);
        assert_eq!(out.as_samples().to_f32_vec(), vec![32767.0 / 32768.0]);
    }

    #[test]
    fn test_oversized_allocation_fails() {
        let result = OutputBuffer::new(OutputFormat::Float, usize::MAX / 2);
        assert!(matches!(result, Err(SoundError::ResourceExhausted(_))));
    }
}
