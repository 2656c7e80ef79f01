//! WAV playback on a dedicated output thread.
//!
//! cpal streams are not `Send`, so one thread owns the device and the
//! current stream and is driven over a command channel. Starting a track
//! drops the previous stream, which stops it.

use crate::device::open_output_device;
use crate::wav::{decode_wav, DecodedTrack};
use crate::{AudioOutput, PlaybackError};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

enum PlayerCommand {
    Play {
        path: PathBuf,
        track: DecodedTrack,
        reply: Sender<crate::Result<()>>,
    },
    Stop,
}

/// Plays WAV files on one output device.
pub struct WavPlayer {
    tx: Option<Sender<PlayerCommand>>,
    playing: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl WavPlayer {
    /// Player on the named output device, or the default one.
    ///
    /// The device is opened on first playback.
    pub fn new(device_name: Option<String>) -> crate::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<PlayerCommand>();
        let playing = Arc::new(AtomicBool::new(false));
        let worker_playing = Arc::clone(&playing);

        let worker = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || run_output_thread(rx, device_name, worker_playing))
            .map_err(|e| {
                PlaybackError::DeviceUnavailable(format!("failed to spawn output thread: {e}"))
            })?;

        Ok(Self {
            tx: Some(tx),
            playing,
            worker: Some(worker),
        })
    }

    /// True while a track is audible.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(PlayerCommand::Stop);
        }
    }

    fn sender(&self) -> crate::Result<&Sender<PlayerCommand>> {
        self.tx
            .as_ref()
            .ok_or_else(|| PlaybackError::DeviceUnavailable("player is shut down".to_string()))
    }
}

impl AudioOutput for WavPlayer {
    fn play_track(&self, path: &Path) -> crate::Result<()> {
        // Decode on the caller so format errors never reach the device.
        let track = decode_wav(path)?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);

        self.sender()?
            .send(PlayerCommand::Play {
                path: path.to_path_buf(),
                track,
                reply: reply_tx,
            })
            .map_err(|_| output_thread_gone())?;

        reply_rx.recv().map_err(|_| output_thread_gone())?
    }
}

impl Drop for WavPlayer {
    fn drop(&mut self) {
        // Closing the channel ends the output thread.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Audio output thread panicked");
            }
        }
    }
}

fn output_thread_gone() -> PlaybackError {
    PlaybackError::DeviceUnavailable("audio output thread stopped".to_string())
}

fn run_output_thread(
    rx: Receiver<PlayerCommand>,
    device_name: Option<String>,
    playing: Arc<AtomicBool>,
) {
    let mut current: Option<Stream> = None;

    while let Ok(command) = rx.recv() {
        match command {
            PlayerCommand::Play { path, track, reply } => {
                // Stop any existing
                current = None;
                playing.store(false, Ordering::SeqCst);

                let result = start_stream(device_name.as_deref(), track, Arc::clone(&playing))
                    .map(|stream| {
                        tracing::info!(path = %path.display(), "Playback started");
                        current = Some(stream);
                    });
                let _ = reply.send(result);
            }
            PlayerCommand::Stop => {
                if current.take().is_some() {
                    tracing::info!("Playback stopped");
                }
                playing.store(false, Ordering::SeqCst);
            }
        }
    }

    drop(current);
    tracing::debug!("Audio output thread stopped");
}

fn start_stream(
    device_name: Option<&str>,
    track: DecodedTrack,
    playing: Arc<AtomicBool>,
) -> crate::Result<Stream> {
    let device = open_output_device(device_name)?;
    let supported = device.default_output_config().map_err(|e| {
        PlaybackError::DeviceUnavailable(format!("failed to get default config: {e}"))
    })?;
    let format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let playhead = Playhead::new(track, config.sample_rate.0);

    let stream = match format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, playhead, playing.clone())?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, playhead, playing.clone())?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, playhead, playing.clone())?,
        SampleFormat::I32 => build_stream::<i32>(&device, &config, playhead, playing.clone())?,
        format => {
            return Err(PlaybackError::DeviceUnavailable(format!(
                "unsupported output sample format: {format:?}"
            )));
        }
    };

    stream.play().map_err(|e| {
        PlaybackError::DeviceUnavailable(format!("failed to start output stream: {e}"))
    })?;
    playing.store(true, Ordering::SeqCst);
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut playhead: Playhead,
    playing: Arc<AtomicBool>,
) -> crate::Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels.max(1));
    let mut frame = vec![0.0f32; channels];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for out in data.chunks_mut(channels) {
                    playhead.next_frame(&mut frame);
                    for (sample, value) in out.iter_mut().zip(frame.iter()) {
                        *sample = T::from_sample(*value);
                    }
                }
                if playhead.is_finished() {
                    playing.store(false, Ordering::SeqCst);
                }
            },
            |err| tracing::error!("audio output stream error: {}", err),
            None,
        )
        .map_err(|e| PlaybackError::DeviceUnavailable(format!("failed to build stream: {e}")))
}

/// Read position in a decoded track, converting channel count and rate
/// to the output stream's on the fly.
struct Playhead {
    samples: Vec<f32>,
    channels: usize,
    frames: usize,
    /// Source frames per output frame.
    step: f64,
    position: f64,
}

impl Playhead {
    fn new(track: DecodedTrack, output_rate: u32) -> Self {
        let channels = usize::from(track.channels.max(1));
        let frames = track.samples.len() / channels;
        let step = if output_rate == 0 {
            1.0
        } else {
            f64::from(track.sample_rate) / f64::from(output_rate)
        };
        Self {
            samples: track.samples,
            channels,
            frames,
            step,
            position: 0.0,
        }
    }

    fn is_finished(&self) -> bool {
        self.position as usize >= self.frames
    }

    /// Fill one output frame and advance. Silence once the track has ended.
    fn next_frame(&mut self, out: &mut [f32]) {
        let index = self.position as usize;
        if index >= self.frames {
            out.fill(0.0);
            return;
        }

        let source = &self.samples[index * self.channels..(index + 1) * self.channels];
        if out.len() == 1 {
            out[0] = source.iter().sum::<f32>() / self.channels as f32;
        } else {
            for (c, sample) in out.iter_mut().enumerate() {
                *sample = source[c % self.channels];
            }
        }
        self.position += self.step;
    }
}
