// Native audio backend on top of cpal
//
// cpal streams are not Send, so each opened device lives on its own thread:
// the thread builds and starts the stream, reports the outcome, then parks
// until the engine asks it to stop. Dropping the stream on that thread
// releases the device and the host context it was opened with.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use super::backend::{ActiveStream, AudioBackend, AudioSource, AudioStreamSpec};
use super::buffer::FrameSink;
use super::tone::TriggerTone;
use crate::error::{RecorderError, RecorderResult};

pub struct NativeAudioBackend {
    tone: TriggerTone,
}

impl NativeAudioBackend {
    pub fn new() -> Self {
        Self {
            tone: TriggerTone::default(),
        }
    }
}

impl Default for NativeAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for NativeAudioBackend {
    fn open(
        &self,
        source: &AudioSource,
        spec: AudioStreamSpec,
        sink: FrameSink,
    ) -> RecorderResult<Box<dyn ActiveStream>> {
        let (opened_tx, opened_rx) = mpsc::sync_channel::<RecorderResult<()>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread_source = source.clone();

        let worker = thread::Builder::new()
            .name(format!("audio-{}", source.label()))
            .spawn(move || {
                let stream = match build_capture_stream(&thread_source, spec, sink) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = opened_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = opened_tx.send(Err(RecorderError::device(thread_source.label(), e)));
                    return;
                }

                let _ = opened_tx.send(Ok(()));

                // Park until stop is requested or the handle is dropped
                let _ = stop_rx.recv();
                drop(stream);
                debug!("{} device released", thread_source.label());
            })
            .map_err(|e| RecorderError::Worker(e.to_string()))?;

        match opened_rx.recv() {
            Ok(Ok(())) => {
                info!("{} device started", source.label());
                Ok(Box::new(NativeStream {
                    stop_tx: Some(stop_tx),
                    worker: Some(worker),
                }))
            }
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(RecorderError::device(
                    source.label(),
                    "device thread exited before reporting",
                ))
            }
        }
    }

    fn play_trigger_tone(&self) -> RecorderResult<()> {
        let tone = self.tone;
        thread::Builder::new()
            .name("trigger-tone".to_string())
            .spawn(move || {
                if let Err(e) = play_tone(tone) {
                    warn!("Trigger tone playback failed: {}", e);
                }
            })
            .map_err(|e| RecorderError::Worker(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

struct NativeStream {
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ActiveStream for NativeStream {
    fn stop(mut self: Box<Self>) -> RecorderResult<()> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| RecorderError::Worker("audio device thread panicked".to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        // Closing the channel wakes the device thread
        self.stop_tx.take();
    }
}

fn find_input_device(host: &cpal::Host, id: &str) -> RecorderResult<cpal::Device> {
    if id.is_empty() || id == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| RecorderError::device("default", "no input device available"));
    }

    host.input_devices()
        .map_err(|e| RecorderError::device(id, e))?
        .find(|d| d.name().map(|name| name == id).unwrap_or(false))
        .ok_or_else(|| RecorderError::device(id, "microphone not found"))
}

fn build_capture_stream(
    source: &AudioSource,
    spec: AudioStreamSpec,
    sink: FrameSink,
) -> RecorderResult<cpal::Stream> {
    let host = cpal::default_host();

    let (device, native_format) = match source {
        AudioSource::Microphone(id) => {
            let device = find_input_device(&host, id)?;
            let format = device
                .default_input_config()
                .map_err(|e| RecorderError::device(id.as_str(), e))?
                .sample_format();
            (device, format)
        }
        AudioSource::SystemLoopback => {
            // Input streams on an output device capture in loopback mode (WASAPI)
            let device = host
                .default_output_device()
                .ok_or_else(|| RecorderError::device("loopback", "no output device available"))?;
            let format = device
                .default_output_config()
                .map_err(|e| RecorderError::device("loopback", e))?
                .sample_format();
            (device, format)
        }
    };

    let device_name = device.name().unwrap_or_else(|_| source.label().to_string());
    info!(
        "Opening {} device '{}' ({:?} native, {}Hz, {} channels)",
        source.label(),
        device_name,
        native_format,
        spec.sample_rate,
        spec.channels
    );

    let config = StreamConfig {
        channels: spec.channels,
        sample_rate: cpal::SampleRate(spec.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let label = source.label().to_string();
    let err_fn = move |err: cpal::StreamError| error!("Error on {} stream: {}", label, err);

    let stream = match native_format {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| sink.push_i16(data),
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| sink.push_f32(data),
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| sink.push_u16(data),
            err_fn,
            None,
        ),
        other => {
            return Err(RecorderError::device(
                device_name,
                format!("unsupported sample format {:?}", other),
            ))
        }
    };

    stream.map_err(|e| RecorderError::device(device_name, e))
}

fn play_tone(tone: TriggerTone) -> RecorderResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| RecorderError::device("playback", "no output device available"))?;
    let supported = device
        .default_output_config()
        .map_err(|e| RecorderError::device("playback", e))?;

    let format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let mut generator = tone.generator(config.sample_rate.0, config.channels);
    let err_fn = |err: cpal::StreamError| warn!("Trigger tone stream error: {}", err);

    let stream = match format {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| generator.fill(data),
            err_fn,
            None,
        ),
        SampleFormat::I16 => {
            let mut scratch = Vec::new();
            device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0f32);
                    generator.fill(&mut scratch);
                    for (out, s) in data.iter_mut().zip(&scratch) {
                        *out = (s * i16::MAX as f32) as i16;
                    }
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(RecorderError::device(
                "playback",
                format!("unsupported sample format {:?}", other),
            ))
        }
    }
    .map_err(|e| RecorderError::device("playback", e))?;

    stream.play().map_err(|e| RecorderError::device("playback", e))?;
    debug!("Playing trigger tone ({:?})", tone.duration);

    thread::sleep(tone.duration + std::time::Duration::from_millis(100));
    drop(stream);

    Ok(())
}
