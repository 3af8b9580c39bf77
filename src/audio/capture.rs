use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use ringbuf::{Consumer, HeapRb};
use std::sync::Arc;

use super::{MeterError, SampleSource};

/// Microphone-backed sample source. Holding the stream keeps capture alive;
/// dropping this releases the device.
pub struct MicCapture {
    _stream: cpal::Stream,
    consumer: Consumer<i16, Arc<HeapRb<i16>>>,
}

impl SampleSource for MicCapture {
    fn read_samples(&mut self, buf: &mut [i16]) -> usize {
        self.consumer.pop_slice(buf)
    }
}

/// Checks that a default input device with a usable config is reachable and
/// returns its name. This is the microphone-access probe the GUI runs before
/// offering the start/stop toggle.
pub fn probe_input() -> Result<String, MeterError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(MeterError::NoInputDevice)?;
    device.default_input_config()?;
    Ok(device.name().unwrap_or_else(|_| "Unknown".into()))
}

/// Opens capture on the default input device.
/// Supports f32, i16, and u16 formats and performs stereo-to-mono downmixing;
/// everything lands in the ring buffer as full-scale i16 samples.
pub fn open_default() -> Result<MicCapture, MeterError> {
    let host = cpal::default_host();

    //
    // Log all available input devices for debugging.
    //
    log::info!("--- AVAILABLE INPUT DEVICES ---");
    if let Ok(devices) = host.input_devices() {
        for (i, dev) in devices.enumerate() {
            let name = dev.name().unwrap_or("Unknown".into());
            log::info!("  [{}]: {}", i, name);
        }
    }
    log::info!("-------------------------------");

    let device = host
        .default_input_device()
        .ok_or(MeterError::NoInputDevice)?;

    log::info!(
        "Selected audio device: {}",
        device.name().unwrap_or("Unknown".into())
    );

    //
    // Retrieve and log the device's default input configuration.
    //
    let supported_config = device.default_input_config()?;
    let sample_format = supported_config.sample_format();
    let config: cpal::StreamConfig = supported_config.into();
    let channels = config.channels as usize;

    log::info!(
        "Audio config: {:?} @ {}Hz, Channels: {}",
        sample_format,
        config.sample_rate.0,
        channels
    );

    //
    // Ring buffer holding several read intervals at the device rate, so a
    // late sampler tick does not drop audio.
    //
    let capacity = ((config.sample_rate.0 as usize / 10) * 4).max(1024);
    let (mut producer, consumer) = HeapRb::<i16>::new(capacity).split();

    let err_fn = |err| log::error!("Audio input error: {}", err);

    //
    // Push mono i16 samples into the buffer (downmix if necessary).
    //
    let mut push_mono = move |data: &[i16]| {
        if channels == 1 {
            let _ = producer.push_slice(data);
        } else if channels == 2 {
            //
            // Downmix stereo to mono using averaged samples.
            //
            for chunk in data.chunks_exact(2) {
                let mono = ((chunk[0] as i32 + chunk[1] as i32) / 2) as i16;
                let _ = producer.push(mono);
            }
        } else {
            //
            // Downmix multi-channel audio by selecting the first channel.
            //
            for chunk in data.chunks_exact(channels) {
                if let Some(&sample) = chunk.first() {
                    let _ = producer.push(sample);
                }
            }
        }
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &_| {
                push_mono(data);
            },
            err_fn,
            None,
        )?,
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &_| {
                //
                // Scale normalized f32 samples to full-scale i16.
                //
                let pcm: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                    .collect();
                push_mono(&pcm);
            },
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &_| {
                //
                // Re-center unsigned samples around zero.
                //
                let pcm: Vec<i16> = data.iter().map(|&s| (s as i32 - 32768) as i16).collect();
                push_mono(&pcm);
            },
            err_fn,
            None,
        )?,
        other => return Err(MeterError::UnsupportedFormat(other)),
    };

    stream.play()?;

    Ok(MicCapture {
        _stream: stream,
        consumer,
    })
}
