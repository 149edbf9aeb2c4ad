//! Platform audio sinks
//!
//! The mixer hands every finished block to an [`AudioSink`]. Stream blocks
//! arrive on the emulation thread, CD blocks on the worker thread, so sinks
//! are shared behind an `Arc` and must be `Send + Sync`.

use crate::config::OutputFormat;
use crate::format::Samples;
use crate::stream::StreamKind;
use parking_lot::Mutex;

/// Destination of a delivered block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkTarget {
    /// One of the timed streams
    Stream(StreamKind),
    /// CD worker output
    CdAudio,
}

/// Platform audio output
pub trait AudioSink: Send + Sync {
    /// Receive one finished block of interleaved stereo samples
    fn deliver(&self, target: SinkTarget, samples: Samples<'_>);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn deliver(&self, _target: SinkTarget, _samples: Samples<'_>) {}
}

/// One block recorded by [`CaptureSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedBlock {
    /// Where the block was delivered
    pub target: SinkTarget,
    /// Format it arrived in
    pub format: OutputFormat,
    /// Samples normalized to float
    pub samples: Vec<f32>,
}

/// Sink that keeps every delivered block in memory
#[derive(Debug, Default)]
pub struct CaptureSink {
    blocks: Mutex<Vec<CapturedBlock>>,
}

impl CaptureSink {
    /// Create an empty capture sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every block delivered to `target`, oldest first
    pub fn blocks_for(&self, target: SinkTarget) -> Vec<CapturedBlock> {
        self.blocks
            .lock()
            .iter()
            .filter(|b| b.target == target)
            .cloned()
            .collect()
    }

    /// Number of blocks delivered to `target`
    pub fn count(&self, target: SinkTarget) -> usize {
        self.blocks.lock().iter().filter(|b| b.target == target).count()
    }

    /// Remove and return everything captured so far
    pub fn take(&self) -> Vec<CapturedBlock> {
        std::mem::take(&mut *self.blocks.lock())
    }
}

impl AudioSink for CaptureSink {
    fn deliver(&self, target: SinkTarget, samples: Samples<'_>) {
        let block = CapturedBlock {
            target,
            format: samples.format(),
            samples: samples.to_f32_vec(),
        };
        self.blocks.lock().push(block);
    }
}

#[cfg(feature = "export-wav")]
pub use wav::WavSink;

#[cfg(feature = "export-wav")]
mod wav {
    use super::{AudioSink, SinkTarget};
    use crate::constants::SAMPLE_SCALE;
    use crate::format::Samples;
    use crate::{Result, SoundError};
    use hound::{SampleFormat, WavSpec, WavWriter};
    use parking_lot::Mutex;
    use std::fs::File;
    use std::io::BufWriter;
    use std::path::Path;

    /// Sink writing one target to a 16-bit stereo WAV file
    pub struct WavSink {
        target: SinkTarget,
        writer: Mutex<Option<WavWriter<BufWriter<File>>>>,
    }

    impl WavSink {
        /// Create `path` and record blocks delivered to `target`
        pub fn create<P: AsRef<Path>>(
            path: P,
            target: SinkTarget,
            sample_rate: u32,
        ) -> Result<Self> {
            let spec = WavSpec {
                channels: 2,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            };
            let writer = WavWriter::create(path, spec)
                .map_err(|e| SoundError::Other(format!("cannot create WAV file: {e}")))?;
            Ok(WavSink {
                target,
                writer: Mutex::new(Some(writer)),
            })
        }

        /// Flush the header and close the file
        pub fn finalize(&self) -> Result<()> {
            if let Some(writer) = self.writer.lock().take() {
                writer
                    .finalize()
                    .map_err(|e| SoundError::Other(format!("cannot finalize WAV file: {e}")))?;
            }
            Ok(())
        }
    }

    impl AudioSink for WavSink {
        fn deliver(&self, target: SinkTarget, samples: Samples<'_>) {
            if target != self.target {
                return;
            }
            let mut guard = self.writer.lock();
            let Some(writer) = guard.as_mut() else {
                return;
            };
            let result = match samples {
                Samples::Int16(s) => s.iter().try_for_each(|&v| writer.write_sample(v)),
                Samples::Float(s) => s.iter().try_for_each(|&v| {
                    writer.write_sample((v * SAMPLE_SCALE).clamp(-32768.0, 32767.0) as i16)
                }),
            };
            if let Err(e) = result {
                log::warn!("WAV write failed, closing sink: {e}");
                guard.take();
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink_filters_by_target() {
        let sink = CaptureSink::new();
        sink.deliver(SinkTarget::CdAudio, Samples::Int16(&[16384, 0]));
        sink.deliver(
            SinkTarget::Stream(StreamKind::Sound),
            Samples::Float(&[0.25, -0.25]),
        );

        let cd = sink.blocks_for(SinkTarget::CdAudio);
        assert_eq!(cd.len(), 1);
        assert_eq!(cd[0].format, OutputFormat::Int16);
        assert_eq!(cd[0].samples, vec![0.5, 0.0]);
        assert_eq!(sink.count(SinkTarget::Stream(StreamKind::Sound)), 1);
        assert_eq!(sink.take().len(), 2);
        assert_eq!(sink.count(SinkTarget::CdAudio), 0);
    }
}
