//! CD audio worker
//!
//! CD audio is mixed on its own thread, decoupled from the stream ticks.
//! The sound stream signals the worker through a one-slot channel about
//! once per CD block; the worker decodes one block from every playing
//! drive, applies volume, routing and the CD filter, and delivers the mix.
//!
//! - `start` waits until the thread reports it is running.
//! - `signal` never blocks; a signal arriving while one is pending is dropped.
//! - `stop` closes the channel and joins the thread. Calling it again is a no-op.

use crate::config::OutputFormat;
use crate::cdrom::{CdBus, CdStatus, ChannelRouting, SharedCdDrive};
use crate::constants::{CD_VOLUME_MAX, CHANNELS, SAMPLE_SCALE};
use crate::filter::FilterSlot;
use crate::format::{zeroed_vec, OutputBuffer, Samples};
use crate::sink::{AudioSink, SinkTarget};
use crate::volume::cd_volume;
use crate::{Result, SoundError};
use crossbeam_channel::{bounded, Sender, TrySendError};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Master CD volume set by the active sound card's mixer
#[derive(Debug)]
pub struct CdMasterVolume {
    left: AtomicU32,
    right: AtomicU32,
}

impl CdMasterVolume {
    /// Unity gain on both channels
    pub fn new() -> Self {
        CdMasterVolume {
            left: AtomicU32::new(CD_VOLUME_MAX as u32),
            right: AtomicU32::new(CD_VOLUME_MAX as u32),
        }
    }

    /// Store both channel volumes (65535 = unity)
    pub fn set(&self, left: u16, right: u16) {
        self.left.store(left as u32, Ordering::Relaxed);
        self.right.store(right as u32, Ordering::Relaxed);
    }

    /// Raw volumes as last set
    pub fn get(&self) -> (u16, u16) {
        (
            self.left.load(Ordering::Relaxed) as u16,
            self.right.load(Ordering::Relaxed) as u16,
        )
    }

    /// Linear gains for left and right
    pub fn gains(&self) -> [f64; 2] {
        let (l, r) = self.get();
        [
            l as f64 / CD_VOLUME_MAX as f64,
            r as f64 / CD_VOLUME_MAX as f64,
        ]
    }
}

impl Default for CdMasterVolume {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-block CD mixing state, owned by the worker thread
pub struct CdMixer {
    drives: Vec<SharedCdDrive>,
    block_len: usize,
    decode: Vec<i16>,
    out: OutputBuffer,
    filter: Arc<Mutex<FilterSlot>>,
    volume: Arc<CdMasterVolume>,
}

impl CdMixer {
    /// Allocate buffers for blocks of `block_len` stereo frames
    pub fn new(
        drives: Vec<SharedCdDrive>,
        block_len: usize,
        format: OutputFormat,
        filter: Arc<Mutex<FilterSlot>>,
        volume: Arc<CdMasterVolume>,
    ) -> Result<Self> {
        Ok(CdMixer {
            drives,
            block_len,
            decode: zeroed_vec(block_len * CHANNELS)?,
            out: OutputBuffer::new(format, block_len * CHANNELS)?,
            filter,
            volume,
        })
    }

    /// Mix one block from every playing drive
    pub fn mix_block(&mut self) -> Samples<'_> {
        self.out.clear();
        let master = self.volume.gains();

        for drive in &self.drives {
            let mut drive = drive.lock();
            if drive.bus() == CdBus::Disabled || drive.status() != CdStatus::Playing {
                continue;
            }

            let frames = drive.decode_block(&mut self.decode).min(self.block_len);
            if frames == 0 {
                continue;
            }

            let gain =
                [0, 1].map(|ch| cd_volume(drive.volume(ch).unwrap_or(u8::MAX)) * master[ch]);
            let routing = [0, 1].map(|ch| {
                drive
                    .channel_routing(ch)
                    .unwrap_or_else(|| ChannelRouting::default_for(ch))
            });
            drop(drive);

            // Held for this drive's frames only, never across a decode
            let mut filter = self.filter.lock();
            for (frame, src) in self.decode.chunks_exact(CHANNELS).take(frames).enumerate() {
                for ch in 0..CHANNELS {
                    let mut sample = routing[ch].route(src[0], src[1]) * gain[ch];
                    if filter.is_installed() {
                        let mut normalized = sample / SAMPLE_SCALE as f64;
                        filter.apply(ch, &mut normalized);
                        sample = normalized * SAMPLE_SCALE as f64;
                    }
                    self.out.accumulate(frame * CHANNELS + ch, sample);
                }
            }
        }

        self.out.as_samples()
    }

    /// Drives this mixer reads from
    pub fn drives(&self) -> &[SharedCdDrive] {
        &self.drives
    }

    /// Frames per block
    pub fn block_len(&self) -> usize {
        self.block_len
    }
}

/// Handle to a running CD audio thread
pub struct CdWorker {
    signal: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    alive: Arc<AtomicBool>,
    drives: Vec<SharedCdDrive>,
    format: OutputFormat,
    block_len: usize,
}

impl CdWorker {
    /// Spawn the worker and wait for it to report readiness
    ///
    /// # Errors
    ///
    /// Returns `ResourceExhausted` if the buffers or the thread cannot be
    /// created, and `Other` if the thread exits before becoming ready.
    pub fn start(
        mut mixer: CdMixer,
        format: OutputFormat,
        sink: Arc<dyn AudioSink>,
    ) -> Result<Self> {
        let (signal_tx, signal_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<()>(1);
        let alive = Arc::new(AtomicBool::new(false));
        let alive_clone = Arc::clone(&alive);
        let drives = mixer.drives().to_vec();
        let block_len = mixer.block_len();

        let handle = std::thread::Builder::new()
            .name("cd-audio".into())
            .spawn(move || {
                alive_clone.store(true, Ordering::Release);
                let _ = ready_tx.send(());
                debug!("CD audio thread started");

                while signal_rx.recv().is_ok() {
                    let block = mixer.mix_block();
                    sink.deliver(SinkTarget::CdAudio, block);
                }

                debug!("CD audio thread finished");
                alive_clone.store(false, Ordering::Release);
            })
            .map_err(|e| {
                SoundError::ResourceExhausted(format!("cannot spawn CD audio thread: {e}"))
            })?;

        let mut worker = CdWorker {
            signal: Some(signal_tx),
            handle: Some(handle),
            alive,
            drives,
            format,
            block_len,
        };

        if ready_rx.recv().is_err() {
            worker.stop();
            return Err(SoundError::Other(
                "CD audio thread exited before signalling readiness".into(),
            ));
        }
        Ok(worker)
    }

    /// Ask for one more block; never blocks
    ///
    /// Returns `false` if the signal was dropped because one is already
    /// pending or the worker is stopped.
    pub fn signal(&self) -> bool {
        let Some(tx) = self.signal.as_ref() else {
            return false;
        };
        match tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                trace!("CD audio signal dropped, previous block still pending");
                false
            }
            Err(TrySendError::Disconnected(())) => false,
        }
    }

    /// Close the signal channel and wait for the thread to exit
    pub fn stop(&mut self) {
        self.signal.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("CD audio thread panicked");
            }
        }
    }

    /// True until `stop` has been called
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// True while the thread body is executing
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Whether this worker was started for exactly `drives`, `format` and
    /// blocks of `block_len` frames
    pub fn serves(
        &self,
        drives: &[SharedCdDrive],
        format: OutputFormat,
        block_len: usize,
    ) -> bool {
        self.format == format
            && self.block_len == block_len
            && self.drives.len() == drives.len()
            && self.drives.iter().zip(drives).all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl Drop for CdWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
