//! Mixer context
//!
//! Owns everything the sound core needs: the three timed streams and their
//! poll timers, the CD drive table, the CD worker, the filter slots and the
//! master CD volume. All operations go through one `MixerContext`; there is
//! no process-wide mixer state apart from the read-only volume table.

use crate::cd_worker::{CdMasterVolume, CdMixer, CdWorker};
use crate::cdrom::{CdDriveTable, SharedCdDrive};
use crate::config::{OutputFormat, SoundConfig};
use crate::constants::CD_VOLUME_MAX;
use crate::filter::{AudioFilter, FilterKind, FilterSlot};
use crate::handler::SoundHandler;
use crate::sink::AudioSink;
use crate::stream::{Stream, StreamKind};
use crate::timer::{PollTimer, DEFAULT_TIMER_USEC};
use crate::Result;
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;

/// Sound mixing core of one emulated machine
pub struct MixerContext {
    config: SoundConfig,
    sink: Arc<dyn AudioSink>,
    streams: Vec<Stream>,
    timers: Vec<PollTimer>,
    timer_usec: u64,
    cd_drives: CdDriveTable,
    cd_worker: Option<CdWorker>,
    cd_signal_countdown: u32,
    cd_volume: Arc<CdMasterVolume>,
    cd_filter: Arc<Mutex<FilterSlot>>,
    speaker_filter: FilterSlot,
}

impl MixerContext {
    /// Create a mixer delivering to `sink`, timed by the host clock
    pub fn new(config: SoundConfig, sink: Arc<dyn AudioSink>) -> Result<Self> {
        Self::with_timer(config, sink, DEFAULT_TIMER_USEC)
    }

    /// Create a mixer with an explicit timer resolution
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unusable configuration and
    /// `ResourceExhausted` if the stream buffers cannot be allocated.
    pub fn with_timer(
        config: SoundConfig,
        sink: Arc<dyn AudioSink>,
        timer_usec: u64,
    ) -> Result<Self> {
        config.validate()?;
        let streams = StreamKind::ALL
            .iter()
            .map(|&kind| Stream::new(kind, config.buffer_len(kind), config.output_format))
            .collect::<Result<Vec<_>>>()?;
        let timers = StreamKind::ALL
            .iter()
            .map(|&kind| PollTimer::new(config.freq(kind), timer_usec))
            .collect();

        Ok(MixerContext {
            config,
            sink,
            streams,
            timers,
            timer_usec,
            cd_drives: CdDriveTable::new(),
            cd_worker: None,
            cd_signal_countdown: config.cd_signal_interval(),
            cd_volume: Arc::new(CdMasterVolume::new()),
            cd_filter: Arc::new(Mutex::new(FilterSlot::default())),
            speaker_filter: FilterSlot::default(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &SoundConfig {
        &self.config
    }

    /// Active output format
    pub fn output_format(&self) -> OutputFormat {
        self.config.output_format
    }

    /// Period length of `stream` in stereo frames
    pub fn buffer_len(&self, stream: StreamKind) -> usize {
        self.streams[stream.index()].buffer_len()
    }

    /// Samples elapsed in the current period of `stream`
    pub fn position(&self, stream: StreamKind) -> usize {
        self.streams[stream.index()].position()
    }

    /// Attach a device to `stream`
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` once the stream holds 8 handlers.
    pub fn register_handler<H>(&mut self, stream: StreamKind, handler: H) -> Result<()>
    where
        H: SoundHandler + 'static,
    {
        self.streams[stream.index()].add_handler(Box::new(handler))
    }

    /// Number of handlers attached to `stream`
    pub fn handler_count(&self, stream: StreamKind) -> usize {
        self.streams[stream.index()].handler_count()
    }

    /// Advance `stream` by one sample
    ///
    /// Returns `true` when a block was delivered. Every sound-stream block
    /// counts down towards the next CD worker signal.
    pub fn tick(&mut self, stream: StreamKind) -> bool {
        let flushed = self.streams[stream.index()].tick(self.sink.as_ref());
        if flushed && stream == StreamKind::Sound {
            self.poll_cd_signal();
        }
        flushed
    }

    /// Advance every stream by `elapsed` timer units
    ///
    /// Returns the number of blocks delivered.
    pub fn advance(&mut self, elapsed: u64) -> usize {
        let mut flushed = 0;
        for kind in StreamKind::ALL {
            let due = self.timers[kind.index()].advance(elapsed);
            for _ in 0..due {
                if self.tick(kind) {
                    flushed += 1;
                }
            }
        }
        flushed
    }

    /// Recompute poll timers after an emulated CPU speed change
    pub fn speed_changed(&mut self, timer_usec: u64) {
        self.timer_usec = timer_usec;
        for timer in self.timers.iter_mut() {
            timer.speed_changed(timer_usec);
        }
        debug!("Sound poll timers recalculated for {timer_usec} units/us");
    }

    /// Timer units per microsecond currently in use
    pub fn timer_usec(&self) -> u64 {
        self.timer_usec
    }

    /// Machine reset
    ///
    /// Detaches every handler, clears both filter slots, restores unity CD
    /// volume, reallocates all buffers, restarts the poll timers and brings
    /// the CD worker in line with the drive table. Sound cards re-install
    /// their filters and volumes when they initialize again.
    pub fn reset(&mut self) -> Result<()> {
        for stream in self.streams.iter_mut() {
            stream.clear_handlers();
        }
        self.cd_filter.lock().clear();
        self.speaker_filter.clear();
        self.cd_volume.set(CD_VOLUME_MAX, CD_VOLUME_MAX);
        self.realloc_buffers()?;
        info!(
            "Sound reset: {:?} output, {} CD drive(s)",
            self.config.output_format,
            self.cd_drives.enabled_count()
        );
        Ok(())
    }

    /// Switch between float and 16-bit output
    ///
    /// Buffers are reallocated and the CD worker restarted; handlers stay
    /// attached.
    pub fn set_output_format(&mut self, format: OutputFormat) -> Result<()> {
        if format == self.config.output_format {
            return Ok(());
        }
        self.config.output_format = format;
        self.realloc_buffers()?;
        info!("Sound output format switched to {format:?}");
        Ok(())
    }

    /// Apply a new configuration and reallocate, keeping handlers
    ///
    /// The CD signal countdown restarts from the new interval.
    pub fn reconfigure(&mut self, config: SoundConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.timers = StreamKind::ALL
            .iter()
            .map(|&kind| PollTimer::new(config.freq(kind), self.timer_usec))
            .collect();
        self.cd_signal_countdown = config.cd_signal_interval();
        self.realloc_buffers()
    }

    fn realloc_buffers(&mut self) -> Result<()> {
        for stream in self.streams.iter_mut() {
            let kind = stream.kind();
            stream.realloc(self.config.buffer_len(kind), self.config.output_format)?;
        }
        for timer in self.timers.iter_mut() {
            timer.reset();
        }
        self.refresh_cd_worker()
    }

    /// Put a CD-ROM drive in `slot`; takes effect at the next reset
    pub fn attach_cd_drive(&mut self, slot: usize, drive: SharedCdDrive) -> Result<()> {
        self.cd_drives.attach(slot, drive)
    }

    /// Remove the drive in `slot`; takes effect at the next reset
    pub fn detach_cd_drive(&mut self, slot: usize) -> Result<Option<SharedCdDrive>> {
        self.cd_drives.detach(slot)
    }

    /// Start, stop or restart the CD worker to match the drive table
    ///
    /// The worker runs iff CD audio is enabled and at least one drive sits on
    /// a non-disabled bus. An unchanged drive set, format and block length
    /// keeps the running worker.
    pub fn refresh_cd_worker(&mut self) -> Result<()> {
        let drives = if self.config.cd_audio_enabled {
            self.cd_drives.enabled()
        } else {
            Vec::new()
        };
        let format = self.config.output_format;
        let block_len = self.config.cd_buffer_len();

        if let Some(worker) = self.cd_worker.as_ref() {
            if !drives.is_empty() && worker.serves(&drives, format, block_len) {
                return Ok(());
            }
        }
        if let Some(mut worker) = self.cd_worker.take() {
            worker.stop();
            debug!("CD audio worker stopped");
        }
        if drives.is_empty() {
            return Ok(());
        }

        let count = drives.len();
        let mixer = CdMixer::new(
            drives,
            block_len,
            format,
            Arc::clone(&self.cd_filter),
            Arc::clone(&self.cd_volume),
        )?;
        self.cd_worker = Some(CdWorker::start(mixer, format, Arc::clone(&self.sink))?);
        self.cd_signal_countdown = self.config.cd_signal_interval();
        debug!("CD audio worker started for {count} drive(s)");
        Ok(())
    }

    /// True while a CD worker is running
    pub fn cd_worker_running(&self) -> bool {
        self.cd_worker.as_ref().is_some_and(CdWorker::is_running)
    }

    fn poll_cd_signal(&mut self) {
        let Some(worker) = self.cd_worker.as_ref() else {
            return;
        };
        self.cd_signal_countdown = self.cd_signal_countdown.saturating_sub(1);
        if self.cd_signal_countdown == 0 {
            self.cd_signal_countdown = self.config.cd_signal_interval();
            worker.signal();
        }
    }

    /// Set the master CD volume (65535 = unity)
    pub fn set_cd_volume(&self, left: u16, right: u16) {
        self.cd_volume.set(left, right);
    }

    /// Master CD volume as last set
    pub fn cd_volume(&self) -> (u16, u16) {
        self.cd_volume.get()
    }

    /// Install or clear the filter for `kind`
    ///
    /// # Errors
    ///
    /// Returns `FilterInstalled` when installing over an existing filter;
    /// the existing one stays active.
    pub fn set_filter(
        &mut self,
        kind: FilterKind,
        filter: Option<Box<dyn AudioFilter>>,
    ) -> Result<()> {
        match kind {
            FilterKind::CdAudio => self.cd_filter.lock().set(kind, filter),
            FilterKind::PcSpeaker => self.speaker_filter.set(kind, filter),
        }
    }

    /// Run the filter for `kind` on one normalized sample
    pub fn apply_filter(&mut self, kind: FilterKind, channel: usize, sample: &mut f64) {
        match kind {
            FilterKind::CdAudio => self.cd_filter.lock().apply(channel, sample),
            FilterKind::PcSpeaker => self.speaker_filter.apply(channel, sample),
        }
    }

    /// Stop the CD worker; safe to call repeatedly
    pub fn close(&mut self) {
        if let Some(mut worker) = self.cd_worker.take() {
            worker.stop();
            debug!("CD audio worker stopped on close");
        }
    }
}

impl Drop for MixerContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{CaptureSink, NullSink, SinkTarget};
    use crate::SoundError;

    fn tiny_config() -> SoundConfig {
        // 4-frame sound periods, 2-frame CD blocks
        SoundConfig {
            sound_freq: 200,
            music_freq: 200,
            wavetable_freq: 200,
            cd_freq: 100,
            period_divisor: 50,
            cd_period_divisor: 50,
            ..SoundConfig::default()
        }
    }

    #[test]
    fn test_handlers_sum_exactly() {
        let sink = Arc::new(CaptureSink::new());
        let mut mixer = MixerContext::new(tiny_config(), sink.clone()).unwrap();
        for value in [100, -30, 7] {
            mixer
                .register_handler(StreamKind::Sound, move |buf: &mut [i32]| {
                    for s in buf.iter_mut() {
                        *s += value;
                    }
                })
                .unwrap();
        }
        for _ in 0..4 {
            mixer.tick(StreamKind::Sound);
        }
        let blocks = sink.blocks_for(SinkTarget::Stream(StreamKind::Sound));
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].samples.iter().all(|&s| s == 77.0 / 32768.0));
    }

    #[test]
    fn test_capacity_exceeded_per_stream() {
        let mut mixer = MixerContext::new(tiny_config(), Arc::new(NullSink)).unwrap();
        for _ in 0..8 {
            mixer.register_handler(StreamKind::Music, |_: &mut [i32]| {}).unwrap();
        }
        let err = mixer
            .register_handler(StreamKind::Music, |_: &mut [i32]| {})
            .unwrap_err();
        assert!(matches!(err, SoundError::CapacityExceeded { .. }));
        assert_eq!(mixer.handler_count(StreamKind::Music), 8);
        // Other streams unaffected
        mixer.register_handler(StreamKind::Wavetable, |_: &mut [i32]| {}).unwrap();
    }

    #[test]
    fn test_reset_clears_handlers() {
        let mut mixer = MixerContext::new(tiny_config(), Arc::new(NullSink)).unwrap();
        mixer.register_handler(StreamKind::Sound, |_: &mut [i32]| {}).unwrap();
        mixer.tick(StreamKind::Sound);
        mixer.reset().unwrap();
        assert_eq!(mixer.handler_count(StreamKind::Sound), 0);
        assert_eq!(mixer.position(StreamKind::Sound), 0);
    }

    #[test]
    fn test_advance_drives_all_streams() {
        let sink = Arc::new(CaptureSink::new());
        // 1 unit per microsecond: one tick every 5000 units at 200 Hz
        let mut mixer = MixerContext::with_timer(tiny_config(), sink.clone(), 1).unwrap();
        assert_eq!(mixer.advance(20_000), 3);
        for kind in StreamKind::ALL {
            assert_eq!(sink.count(SinkTarget::Stream(kind)), 1);
        }
    }

    #[test]
    fn test_speaker_filter_install_once() {
        let mut mixer = MixerContext::new(tiny_config(), Arc::new(NullSink)).unwrap();
        mixer
            .set_filter(
                FilterKind::PcSpeaker,
                Some(Box::new(|_: usize, s: &mut f64| *s *= 2.0)),
            )
            .unwrap();
        assert!(mixer
            .set_filter(
                FilterKind::PcSpeaker,
                Some(Box::new(|_: usize, s: &mut f64| *s = 0.0)),
            )
            .is_err());
        let mut sample = 0.25;
        mixer.apply_filter(FilterKind::PcSpeaker, 0, &mut sample);
        assert_eq!(sample, 0.5);

        // CD slot is independent
        let mut cd_sample = 0.25;
        mixer.apply_filter(FilterKind::CdAudio, 0, &mut cd_sample);
        assert_eq!(cd_sample, 0.25);
    }

    #[test]
    fn test_reset_clears_filters_and_cd_volume() {
        let mut mixer = MixerContext::new(tiny_config(), Arc::new(NullSink)).unwrap();
        mixer
            .set_filter(
                FilterKind::CdAudio,
                Some(Box::new(|_: usize, s: &mut f64| *s = 0.0)),
            )
            .unwrap();
        mixer
            .set_filter(
                FilterKind::PcSpeaker,
                Some(Box::new(|_: usize, s: &mut f64| *s = 0.0)),
            )
            .unwrap();
        mixer.set_cd_volume(0, 100);

        mixer.reset().unwrap();
        assert_eq!(mixer.cd_volume(), (u16::MAX, u16::MAX));
        let mut sample = 0.25;
        mixer.apply_filter(FilterKind::CdAudio, 0, &mut sample);
        mixer.apply_filter(FilterKind::PcSpeaker, 1, &mut sample);
        assert_eq!(sample, 0.25);

        // A re-initializing card can install again
        mixer
            .set_filter(
                FilterKind::CdAudio,
                Some(Box::new(|_: usize, s: &mut f64| *s *= 2.0)),
            )
            .unwrap();
        mixer
            .set_filter(
                FilterKind::PcSpeaker,
                Some(Box::new(|_: usize, s: &mut f64| *s *= 2.0)),
            )
            .unwrap();
        mixer.apply_filter(FilterKind::CdAudio, 0, &mut sample);
        assert_eq!(sample, 0.5);
    }

    #[test]
    fn test_format_switch_keeps_filters() {
        let mut mixer = MixerContext::new(tiny_config(), Arc::new(NullSink)).unwrap();
        mixer
            .set_filter(
                FilterKind::PcSpeaker,
                Some(Box::new(|_: usize, s: &mut f64| *s *= 2.0)),
            )
            .unwrap();
        mixer.set_output_format(OutputFormat::Float).unwrap();
        let mut sample = 0.25;
        mixer.apply_filter(FilterKind::PcSpeaker, 0, &mut sample);
        assert_eq!(sample, 0.5);
    }

    #[test]
    fn test_cd_volume_round_trip() {
        let mixer = MixerContext::new(tiny_config(), Arc::new(NullSink)).unwrap();
        assert_eq!(mixer.cd_volume(), (u16::MAX, u16::MAX));
        mixer.set_cd_volume(1000, 2000);
        assert_eq!(mixer.cd_volume(), (1000, 2000));
    }
}
