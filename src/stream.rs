//! Fixed-period sample accumulator
//!
//! Each stream counts samples at its native rate. When a full period has
//! elapsed it zeroes its `i32` accumulation buffer, lets every handler add
//! into it, converts the sum to the output format and hands the block to
//! the sink.

use crate::config::OutputFormat;
use crate::constants::CHANNELS;
use crate::format::{zeroed_vec, OutputBuffer};
use crate::handler::{HandlerList, SoundHandler};
use crate::sink::{AudioSink, SinkTarget};
use crate::Result;

/// One of the independently clocked mixing pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Digital effects: DACs, PC speaker, sound card PCM
    Sound,
    /// FM / MIDI synthesis
    Music,
    /// Wavetable synthesis
    Wavetable,
}

impl StreamKind {
    /// Every stream, in tick order
    pub const ALL: [StreamKind; 3] = [
        StreamKind::Sound,
        StreamKind::Music,
        StreamKind::Wavetable,
    ];

    /// Position in [`StreamKind::ALL`]
    pub fn index(self) -> usize {
        match self {
            StreamKind::Sound => 0,
            StreamKind::Music => 1,
            StreamKind::Wavetable => 2,
        }
    }
}

/// Accumulation state for one stream
#[derive(Debug)]
pub struct Stream {
    kind: StreamKind,
    buffer_len: usize,
    pos: usize,
    raw: Vec<i32>,
    out: OutputBuffer,
    handlers: HandlerList,
}

impl Stream {
    /// Allocate a stream whose period is `buffer_len` stereo frames
    pub fn new(kind: StreamKind, buffer_len: usize, format: OutputFormat) -> Result<Self> {
        Ok(Stream {
            kind,
            buffer_len,
            pos: 0,
            raw: zeroed_vec(buffer_len * CHANNELS)?,
            out: OutputBuffer::new(format, buffer_len * CHANNELS)?,
            handlers: HandlerList::new(kind),
        })
    }

    /// Which stream this is
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Period length in stereo frames
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Samples elapsed in the current period
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Current output representation
    pub fn format(&self) -> OutputFormat {
        self.out.format()
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Attach a handler at the end of the mixing order
    pub fn add_handler(&mut self, handler: Box<dyn SoundHandler>) -> Result<()> {
        self.handlers.push(handler)
    }

    /// Drop all handlers
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Reallocate buffers for a new period length or format
    ///
    /// Handlers are kept. The position restarts at 0.
    pub fn realloc(&mut self, buffer_len: usize, format: OutputFormat) -> Result<()> {
        let raw = zeroed_vec(buffer_len * CHANNELS)?;
        let out = OutputBuffer::new(format, buffer_len * CHANNELS)?;
        self.raw = raw;
        self.out = out;
        self.buffer_len = buffer_len;
        self.pos = 0;
        Ok(())
    }

    /// Advance by one sample; flush when the period is complete
    ///
    /// Returns `true` if a block was delivered.
    pub fn tick(&mut self, sink: &dyn AudioSink) -> bool {
        self.pos += 1;
        if self.pos < self.buffer_len {
            return false;
        }
        self.flush(sink);
        true
    }

    fn flush(&mut self, sink: &dyn AudioSink) {
        self.raw.fill(0);
        self.handlers.run(&mut self.raw);
        self.out.convert_from(&self.raw);
        sink.deliver(SinkTarget::Stream(self.kind), self.out.as_samples());
        self.pos = 0;
    }
}
