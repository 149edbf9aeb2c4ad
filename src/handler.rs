//! Device handlers
//!
//! A handler represents one audio-producing device. Once per period it adds
//! its contribution into the stream's interleaved stereo `i32` buffer.
//! Handlers must add, never overwrite: the buffer already holds the output
//! of every handler registered before them.

use crate::constants::MAX_HANDLERS;
use crate::stream::StreamKind;
use crate::{Result, SoundError};

/// Audio-producing device attached to a stream
pub trait SoundHandler: Send {
    /// Add one period of interleaved stereo samples into `buffer`
    fn fill(&mut self, buffer: &mut [i32]);
}

impl<F> SoundHandler for F
where
    F: FnMut(&mut [i32]) + Send,
{
    fn fill(&mut self, buffer: &mut [i32]) {
        self(buffer)
    }
}

/// Bounded, insertion-ordered handler list
pub struct HandlerList {
    stream: StreamKind,
    handlers: Vec<Box<dyn SoundHandler>>,
}

impl HandlerList {
    /// Create an empty list for `stream`
    pub fn new(stream: StreamKind) -> Self {
        HandlerList {
            stream,
            handlers: Vec::with_capacity(MAX_HANDLERS),
        }
    }

    /// Append a handler
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` when [`MAX_HANDLERS`] are already present;
    /// the list is left unchanged.
    pub fn push(&mut self, handler: Box<dyn SoundHandler>) -> Result<()> {
        if self.handlers.len() >= MAX_HANDLERS {
            return Err(SoundError::CapacityExceeded {
                stream: self.stream,
                capacity: MAX_HANDLERS,
            });
        }
        self.handlers.push(handler);
        Ok(())
    }

    /// Run every handler in registration order
    pub fn run(&mut self, buffer: &mut [i32]) {
        for handler in self.handlers.iter_mut() {
            handler.fill(buffer);
        }
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Drop every handler
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl std::fmt::Debug for HandlerList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerList")
            .field("stream", &self.stream)
            .field("len", &self.handlers.len())
            .finish()
    }
}
