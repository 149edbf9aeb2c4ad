//! CD-ROM audio sources
//!
//! The storage subsystem owns the drives. The mixer only sees the audio
//! side: bus and playback status, block decoding, and the volume and
//! channel-routing controls exposed by the drive's audio command set.

use crate::constants::CDROM_NUM;
use crate::{Result, SoundError};
use bitflags::bitflags;
use parking_lot::Mutex;
use std::sync::Arc;

/// Bus a drive is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdBus {
    /// Slot configured but switched off
    Disabled,
    /// ATAPI on an IDE channel
    Atapi,
    /// SCSI host adapter
    Scsi,
    /// Proprietary sound-card interface (Mitsumi, Sony, Panasonic)
    Proprietary,
}

/// Audio playback status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdStatus {
    /// No disc in the drive
    Empty,
    /// Disc present, no audio activity
    Stopped,
    /// Audio playback in progress
    Playing,
    /// Audio playback paused
    Paused,
}

bitflags! {
    /// Source channels feeding one output channel
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelRouting: u8 {
        /// Left decoded channel
        const LEFT = 0x01;
        /// Right decoded channel
        const RIGHT = 0x02;
    }
}

impl ChannelRouting {
    /// Create routing from the drive's raw port value
    pub fn from_register(value: u8) -> Self {
        ChannelRouting::from_bits_truncate(value)
    }

    /// Routing used when a drive has no routing control
    pub fn default_for(channel: usize) -> Self {
        if channel == 0 {
            ChannelRouting::LEFT
        } else {
            ChannelRouting::RIGHT
        }
    }

    /// Select and sum the routed source channels of one frame
    #[inline]
    pub fn route(self, left: i16, right: i16) -> f64 {
        let mut out = 0.0;
        if self.contains(ChannelRouting::LEFT) {
            out += left as f64;
        }
        if self.contains(ChannelRouting::RIGHT) {
            out += right as f64;
        }
        out
    }
}

/// Audio interface of one CD-ROM drive
pub trait CdAudioDrive: Send {
    /// Bus the drive is attached to
    fn bus(&self) -> CdBus;

    /// Current playback status
    fn status(&self) -> CdStatus;

    /// Decode the next block of interleaved stereo frames into `buffer`
    ///
    /// Returns the number of frames produced. Frames past that count are
    /// treated as silence.
    fn decode_block(&mut self, buffer: &mut [i16]) -> usize;

    /// Drive-reported volume of `channel`, or `None` without volume control
    fn volume(&self, _channel: usize) -> Option<u8> {
        None
    }

    /// Routing for output `channel`, or `None` without routing control
    fn channel_routing(&self, _channel: usize) -> Option<ChannelRouting> {
        None
    }
}

/// Drive shared between the storage subsystem and the CD worker
pub type SharedCdDrive = Arc<Mutex<Box<dyn CdAudioDrive>>>;

/// Wrap a drive for sharing
pub fn share_drive<D: CdAudioDrive + 'static>(drive: D) -> SharedCdDrive {
    let drive: Box<dyn CdAudioDrive> = Box::new(drive);
    Arc::new(Mutex::new(drive))
}

/// Fixed table of drive slots
#[derive(Clone, Default)]
pub struct CdDriveTable {
    slots: [Option<SharedCdDrive>; CDROM_NUM],
}

impl CdDriveTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a drive in `slot`, replacing any previous one
    pub fn attach(&mut self, slot: usize, drive: SharedCdDrive) -> Result<()> {
        let entry = self.slots.get_mut(slot).ok_or(SoundError::InvalidSlot(slot))?;
        *entry = Some(drive);
        Ok(())
    }

    /// Remove and return the drive in `slot`
    pub fn detach(&mut self, slot: usize) -> Result<Option<SharedCdDrive>> {
        let entry = self.slots.get_mut(slot).ok_or(SoundError::InvalidSlot(slot))?;
        Ok(entry.take())
    }

    /// Drive in `slot`, if any
    pub fn get(&self, slot: usize) -> Option<&SharedCdDrive> {
        self.slots.get(slot).and_then(|d| d.as_ref())
    }

    /// Drives whose bus is not disabled, in slot order
    pub fn enabled(&self) -> Vec<SharedCdDrive> {
        self.slots
            .iter()
            .flatten()
            .filter(|d| d.lock().bus() != CdBus::Disabled)
            .cloned()
            .collect()
    }

    /// Number of drives whose bus is not disabled
    pub fn enabled_count(&self) -> usize {
        self.enabled().len()
    }
}

impl std::fmt::Debug for CdDriveTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let occupied: Vec<bool> = self.slots.iter().map(Option::is_some).collect();
        f.debug_struct("CdDriveTable")
            .field("occupied", &occupied)
            .finish()
    }
}
