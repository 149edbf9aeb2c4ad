//! Sound mixing core for a PC-compatible emulator
//!
//! Coordinates several independently clocked audio producers (FM and
//! wavetable synths, PCM DACs, CD-ROM drives) into period-sized blocks of
//! mixed output for a platform audio sink.
//!
//! # Features
//! - Three timed streams (sound, music, wavetable), each with up to 8 handlers
//! - 32-bit accumulation with clamped 16-bit or normalized float output
//! - Dedicated CD-audio worker thread with per-drive volume and channel routing
//! - Logarithmic CD volume table shared across the process
//! - Install-once filter hooks for CD audio and the PC speaker
//! - JSON-backed mixer configuration
//!
//! # Crate feature flags
//! - `registry` (default): Sound card lookup table (`registry`)
//! - `export-wav` (opt-in): WAV sink and the demo renderer (enables optional `hound` dep)
//!
//! # Quick start
//! ```no_run
//! use pcbox_sound::{MixerContext, NullSink, SoundConfig, StreamKind};
//! use std::sync::Arc;
//!
//! let mut mixer = MixerContext::new(SoundConfig::default(), Arc::new(NullSink)).unwrap();
//! mixer
//!     .register_handler(StreamKind::Sound, |buf: &mut [i32]| {
//!         for s in buf.iter_mut() {
//!             *s += 1000;
//!         }
//!     })
//!     .unwrap();
//! for _ in 0..mixer.buffer_len(StreamKind::Sound) {
//!     mixer.tick(StreamKind::Sound);
//! }
//! mixer.close();
//! ```

#![warn(missing_docs)]

pub mod cd_worker;
pub mod cdrom;
pub mod config;
pub mod constants;
pub mod filter;
pub mod format;
pub mod handler;
pub mod mixer;
#[cfg(feature = "registry")]
pub mod registry;
pub mod sink;
pub mod stream;
pub mod timer;
pub mod volume;

/// Error types for sound mixer operations
#[derive(thiserror::Error, Debug)]
pub enum SoundError {
    /// A stream's handler list is full
    #[error("{stream:?} stream already holds {capacity} handlers")]
    CapacityExceeded {
        /// Stream the registration targeted
        stream: StreamKind,
        /// Fixed handler capacity
        capacity: usize,
    },

    /// Buffer allocation or worker creation failed
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A filter of this kind is already installed
    #[error("{0:?} filter already installed")]
    FilterInstalled(FilterKind),

    /// CD-ROM drive slot out of range
    #[error("Invalid CD-ROM slot {0}")]
    InvalidSlot(usize),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for SoundError {
    /// Converts a String into `SoundError::Other`.
    ///
    /// Prefer the specific variants (`ConfigError`, `ResourceExhausted`) where
    /// the failure has a clear category.
    fn from(msg: String) -> Self {
        SoundError::Other(msg)
    }
}

impl From<&str> for SoundError {
    /// Converts a string slice into `SoundError::Other`.
    fn from(msg: &str) -> Self {
        SoundError::Other(msg.to_string())
    }
}

/// Result type for mixer operations
pub type Result<T> = std::result::Result<T, SoundError>;

// Public API exports
pub use cd_worker::CdWorker;
pub use cdrom::{CdAudioDrive, CdBus, CdStatus, ChannelRouting, SharedCdDrive};
pub use config::{OutputFormat, SoundConfig};
pub use filter::{AudioFilter, FilterKind};
pub use format::Samples;
pub use handler::SoundHandler;
pub use mixer::MixerContext;
#[cfg(feature = "registry")]
pub use registry::{SoundCardEntry, SoundCardFlags, SoundCardRegistry};
#[cfg(feature = "export-wav")]
pub use sink::WavSink;
pub use sink::{AudioSink, CaptureSink, NullSink, SinkTarget};
pub use stream::StreamKind;
pub use volume::cd_volume;
