pub mod capture;

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::meter;

// Scratch buffer sized for several read intervals at the nominal rate, so a
// late tick still drains everything the capture callback queued.
const READ_CHUNK: usize = (meter::SAMPLE_RATE as usize / 10) * 4;

#[derive(Debug, Error)]
pub enum MeterError {
    #[error("no audio input device found")]
    NoInputDevice,
    #[error("failed to query input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),
    #[error("failed to spawn sampler thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("sampler thread exited before reporting capture state")]
    WorkerVanished,
}

/// Source of mono PCM samples consumed by the sampling loop.
pub trait SampleSource {
    /// Copies the samples accumulated since the last call into `buf` and
    /// returns how many were written. Zero means nothing to report this tick.
    fn read_samples(&mut self, buf: &mut [i16]) -> usize;
}

/// Cooperative stop flag with a wakeable timed wait.
struct StopSignal {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    fn new() -> Self {
        Self {
            flag: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn request(&self) {
        *self.flag.lock() = true;
        self.cond.notify_all();
    }

    fn is_requested(&self) -> bool {
        *self.flag.lock()
    }

    /// Waits up to `timeout`, returning true if a stop was requested. A
    /// request made during the wait wakes the waiter immediately.
    fn wait(&self, timeout: Duration) -> bool {
        let mut stop = self.flag.lock();
        if *stop {
            return true;
        }
        self.cond.wait_for(&mut stop, timeout);
        *stop
    }
}

/// One iteration per read interval: drain the source, convert the batch
/// peak to dB, hand it to the callback. Empty reads are skipped.
fn run_loop<S, F>(source: &mut S, stop: &StopSignal, on_level: F)
where
    S: SampleSource,
    F: Fn(f32),
{
    let mut buf = vec![0i16; READ_CHUNK];
    while !stop.is_requested() {
        let read = source.read_samples(&mut buf);
        if read > 0 {
            let level = meter::level_db(meter::peak_magnitude(&buf[..read]));
            log::debug!("level {:.1} dB ({} samples)", level, read);
            on_level(level);
        }
        if stop.wait(meter::READ_INTERVAL) {
            break;
        }
    }
}

/// Owns the microphone stream and the periodic read-and-convert loop.
///
/// At most one stream is open at a time: `start` on a running meter is a
/// no-op, `stop` is idempotent. The worker thread opens the stream itself
/// (cpal streams are not `Send`) and releases it when the loop exits.
pub struct SoundMeter {
    running: Arc<AtomicBool>,
    stop: Arc<StopSignal>,
    worker: Option<JoinHandle<()>>,
}

impl SoundMeter {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(StopSignal::new()),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Opens the default input device and starts delivering levels to
    /// `on_level`. No-op if already running; a failed open is returned to
    /// the caller and leaves the meter idle.
    pub fn start<F>(&mut self, on_level: F) -> Result<(), MeterError>
    where
        F: Fn(f32) + Send + 'static,
    {
        self.start_with(capture::open_default, on_level)
    }

    fn start_with<O, S, F>(&mut self, open: O, on_level: F) -> Result<(), MeterError>
    where
        O: FnOnce() -> Result<S, MeterError> + Send + 'static,
        S: SampleSource + 'static,
        F: Fn(f32) + Send + 'static,
    {
        //
        // The swap doubles as the serializer for concurrent starts: only
        // the caller that flips idle -> running proceeds to open a stream.
        //
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let stop = Arc::new(StopSignal::new());
        self.stop = stop.clone();
        let running = self.running.clone();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("loudness-sampler".into())
            .spawn(move || {
                //
                // The stream is opened on the worker so the worker owns it
                // and releases it on exit; the open result is reported back
                // to the starter before the loop begins.
                //
                let mut source = match open() {
                    Ok(source) => {
                        let _ = ready_tx.send(Ok(()));
                        source
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                run_loop(&mut source, &stop, on_level);
                running.store(false, Ordering::SeqCst);
            });

        let worker = match worker {
            Ok(handle) => handle,
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(MeterError::Spawn(err));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(worker);
                log::info!("Loudness sampler started");
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = worker.join();
                self.running.store(false, Ordering::SeqCst);
                Err(err)
            }
            Err(_) => {
                let _ = worker.join();
                self.running.store(false, Ordering::SeqCst);
                Err(MeterError::WorkerVanished)
            }
        }
    }

    /// Signals the loop to end and blocks until the worker has released the
    /// stream. Safe to call when not running.
    pub fn stop(&mut self) {
        self.stop.request();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Sampler thread panicked during shutdown");
            }
            log::info!("Loudness sampler stopped");
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for SoundMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SoundMeter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits the same buffer on every read.
    struct ConstSource {
        sample: i16,
        len: usize,
    }

    impl SampleSource for ConstSource {
        fn read_samples(&mut self, buf: &mut [i16]) -> usize {
            let n = self.len.min(buf.len());
            buf[..n].fill(self.sample);
            n
        }
    }

    /// Never has anything to report.
    struct EmptySource;

    impl SampleSource for EmptySource {
        fn read_samples(&mut self, _buf: &mut [i16]) -> usize {
            0
        }
    }

    #[test]
    fn full_scale_buffer_reports_expected_level() {
        let mut sampler = SoundMeter::new();
        let (tx, rx) = mpsc::channel();
        sampler
            .start_with(
                || {
                    Ok(ConstSource {
                        sample: i16::MAX,
                        len: 512,
                    })
                },
                move |level| {
                    let _ = tx.send(level);
                },
            )
            .unwrap();
        let level = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        sampler.stop();
        // 20 * log10(32767) ~= 90.3
        assert!((level - 20.0 * 32767.0f32.log10()).abs() < 1e-3);
    }

    #[test]
    fn silent_buffer_reports_zero() {
        let mut sampler = SoundMeter::new();
        let (tx, rx) = mpsc::channel();
        sampler
            .start_with(
                || Ok(ConstSource { sample: 0, len: 512 }),
                move |level| {
                    let _ = tx.send(level);
                },
            )
            .unwrap();
        let level = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        sampler.stop();
        assert_eq!(level, 0.0);
    }

    #[test]
    fn empty_reads_are_skipped() {
        let mut sampler = SoundMeter::new();
        let (tx, rx) = mpsc::channel();
        sampler
            .start_with(
                || Ok(EmptySource),
                move |level| {
                    let _ = tx.send(level);
                },
            )
            .unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
        sampler.stop();
    }

    #[test]
    fn start_while_running_is_a_noop() {
        let mut sampler = SoundMeter::new();
        sampler.start_with(|| Ok(EmptySource), |_| {}).unwrap();
        assert!(sampler.is_running());

        // A second start must not open a second stream.
        sampler
            .start_with::<_, EmptySource, _>(|| panic!("second stream opened"), |_| {})
            .unwrap();
        assert!(sampler.is_running());

        sampler.stop();
        assert!(!sampler.is_running());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut sampler = SoundMeter::new();
        sampler.stop();

        sampler.start_with(|| Ok(EmptySource), |_| {}).unwrap();
        sampler.stop();
        sampler.stop();
        assert!(!sampler.is_running());
    }

    #[test]
    fn open_failure_propagates_and_clears_the_guard() {
        let mut sampler = SoundMeter::new();
        let err = sampler
            .start_with::<_, EmptySource, _>(|| Err(MeterError::NoInputDevice), |_| {})
            .unwrap_err();
        assert!(matches!(err, MeterError::NoInputDevice));
        assert!(!sampler.is_running());

        // The failed start must not wedge the meter.
        sampler.start_with(|| Ok(EmptySource), |_| {}).unwrap();
        assert!(sampler.is_running());
        sampler.stop();
    }

    #[test]
    fn stop_wakes_a_sleeping_loop_promptly() {
        let mut sampler = SoundMeter::new();
        sampler.start_with(|| Ok(EmptySource), |_| {}).unwrap();

        let started = std::time::Instant::now();
        sampler.stop();
        // Well under the read interval thanks to the condvar wake.
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
