#[cfg(not(feature = "export-wav"))]
fn main() {
    eprintln!(
        "The pcbox-sound demo requires the \"export-wav\" feature. \
         Rebuild with `--features export-wav` to enable it."
    );
}

#[cfg(feature = "export-wav")]
mod cli {
    use std::env;
    use std::f64::consts::TAU;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use anyhow::{bail, Context};
    use log::info;
    use pcbox_sound::cdrom::share_drive;
    use pcbox_sound::filter::FilterKind;
    use pcbox_sound::timer::DEFAULT_TIMER_USEC;
    use pcbox_sound::{
        AudioSink, CdAudioDrive, CdBus, CdStatus, MixerContext, OutputFormat, Samples, SinkTarget,
        SoundConfig, StreamKind, WavSink,
    };

    struct Options {
        output: PathBuf,
        config: Option<PathBuf>,
        seconds: u32,
        float: bool,
    }

    fn parse_args() -> anyhow::Result<Options> {
        let mut output = None;
        let mut config = None;
        let mut seconds = 3;
        let mut float = false;

        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    config = Some(PathBuf::from(args.next().context("--config needs a path")?))
                }
                "--seconds" => {
                    seconds = args
                        .next()
                        .context("--seconds needs a value")?
                        .parse()
                        .context("--seconds must be a whole number")?
                }
                "--float" => float = true,
                "-h" | "--help" => {
                    println!(
                        "Usage: pcbox-sound-demo [--config FILE] [--seconds N] [--float] OUTPUT.wav"
                    );
                    std::process::exit(0);
                }
                other if other.starts_with('-') => bail!("unknown option {other}"),
                other => output = Some(PathBuf::from(other)),
            }
        }

        let Some(output) = output else {
            bail!("missing OUTPUT.wav argument");
        };
        Ok(Options {
            output,
            config,
            seconds,
            float,
        })
    }

    /// Routes the sound stream and CD audio to separate WAV files
    struct SplitSink {
        sound: WavSink,
        cd: WavSink,
    }

    impl AudioSink for SplitSink {
        fn deliver(&self, target: SinkTarget, samples: Samples<'_>) {
            self.sound.deliver(target, samples);
            self.cd.deliver(target, samples);
        }
    }

    /// Simulated drive playing a sine tone
    struct SineDrive {
        phase: f64,
        step: f64,
    }

    impl CdAudioDrive for SineDrive {
        fn bus(&self) -> CdBus {
            CdBus::Atapi
        }

        fn status(&self) -> CdStatus {
            CdStatus::Playing
        }

        fn decode_block(&mut self, buffer: &mut [i16]) -> usize {
            for frame in buffer.chunks_exact_mut(2) {
                let v = (self.phase.sin() * 12_000.0) as i16;
                frame[0] = v;
                frame[1] = v;
                self.phase = (self.phase + self.step) % TAU;
            }
            buffer.len() / 2
        }

        fn volume(&self, _channel: usize) -> Option<u8> {
            Some(200)
        }
    }

    fn square_wave(freq: f64, sample_rate: u32, amplitude: i32) -> impl FnMut(&mut [i32]) + Send {
        let half_period = sample_rate as f64 / freq / 2.0;
        let mut pos = 0.0f64;
        move |buf: &mut [i32]| {
            for frame in buf.chunks_exact_mut(2) {
                let v = if (pos / half_period) as u64 % 2 == 0 {
                    amplitude
                } else {
                    -amplitude
                };
                frame[0] += v;
                frame[1] += v;
                pos += 1.0;
            }
        }
    }

    fn cd_path(output: &Path) -> PathBuf {
        let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
        output.with_file_name(format!("{stem}-cd.wav"))
    }

    pub fn run() -> anyhow::Result<()> {
        env_logger::init();
        let opts = parse_args()?;

        let mut config = match &opts.config {
            Some(path) => SoundConfig::load(path)?,
            None => SoundConfig::default(),
        };
        if opts.float {
            config.output_format = OutputFormat::Float;
        }

        let sink = Arc::new(SplitSink {
            sound: WavSink::create(
                &opts.output,
                SinkTarget::Stream(StreamKind::Sound),
                config.sound_freq,
            )?,
            cd: WavSink::create(cd_path(&opts.output), SinkTarget::CdAudio, config.cd_freq)?,
        });

        let mut mixer = MixerContext::new(config, sink.clone())?;
        mixer.attach_cd_drive(
            0,
            share_drive(SineDrive {
                phase: 0.0,
                step: TAU * 330.0 / config.cd_freq as f64,
            }),
        )?;
        mixer.reset()?;
        let low = square_wave(440.0, config.sound_freq, 4000);
        let high = square_wave(660.0, config.sound_freq, 2000);
        mixer.register_handler(StreamKind::Sound, low)?;
        mixer.register_handler(StreamKind::Sound, high)?;
        mixer.set_filter(
            FilterKind::CdAudio,
            Some(Box::new(|_channel: usize, s: &mut f64| *s *= 0.8)),
        )?;

        info!("Rendering {}s to {}", opts.seconds, opts.output.display());
        let one_ms = DEFAULT_TIMER_USEC * 1000;
        let mut blocks = 0;
        for _ in 0..opts.seconds * 1000 {
            blocks += mixer.advance(one_ms);
        }
        mixer.close();

        sink.sound.finalize()?;
        sink.cd.finalize()?;
        println!(
            "Rendered {blocks} stream blocks to {} and CD audio to {}",
            opts.output.display(),
            cd_path(&opts.output).display()
        );
        Ok(())
    }
}

#[cfg(feature = "export-wav")]
fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
