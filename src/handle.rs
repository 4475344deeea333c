//! Shared device handle with a background polling loop.
//!
//! [`Max44009Handle`] owns the driver behind a mutex so that configuration,
//! one-off reads and the polling thread never interleave on the bus. At most
//! one polling thread exists per handle; starting again replaces it and
//! halting joins it.

use core::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use embedded_hal::i2c::I2c;

use crate::{Configuration, Error, Max44009};

/// Callback invoked with the read error that ended a polling loop
pub type ErrorCallback<E> = Box<dyn FnMut(&Error<E>) + Send + 'static>;

/// How a polling loop reads and what it does when a read fails
pub struct PollOptions<E> {
    /// Pause between a delivered value and the next read. `None` reads again
    /// as soon as the consumer has taken the previous value.
    pub interval: Option<Duration>,
    /// Called once with the error that stops the loop. The error is also
    /// logged; it is never sent to the consumer, whose channel simply ends.
    pub on_error: Option<ErrorCallback<E>>,
}

impl<E> Default for PollOptions<E> {
    fn default() -> Self {
        Self {
            interval: None,
            on_error: None,
        }
    }
}

impl<E> PollOptions<E> {
    /// Wait `interval` between reads
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Observe the error that ends the loop
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Error<E>) + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }
}

impl<E> fmt::Debug for PollOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollOptions")
            .field("interval", &self.interval)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

enum PollState {
    Idle,
    Polling(Poller),
}

/// A running polling thread. Dropping it stops and joins the thread.
struct Poller {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Poller {
    fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        // Disconnecting the stop channel wakes the loop at its next select
        drop(self.stop.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("max44009 polling thread panicked");
            }
        }
    }
}

/// MAX44009 driver shared between callers and a polling thread
pub struct Max44009Handle<I2C> {
    device: Arc<Mutex<Max44009<I2C>>>,
    state: Mutex<PollState>,
}

impl<I2C, E> Max44009Handle<I2C>
where
    I2C: I2c<Error = E> + Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    /// Take ownership of a driver
    pub fn new(device: Max44009<I2C>) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            state: Mutex::new(PollState::Idle),
        }
    }

    /// Write the configuration register, see [`Max44009::configure`]
    pub fn configure(&self, config: Configuration) -> Result<u8, Error<E>> {
        lock(&self.device).configure(config)
    }

    /// Read the ambient light level once, see [`Max44009::read_lux`]
    pub fn read_lux(&self) -> Result<f64, Error<E>> {
        lock(&self.device).read_lux()
    }

    /// Run `f` with exclusive access to the driver
    pub fn with_device<R>(&self, f: impl FnOnce(&mut Max44009<I2C>) -> R) -> R {
        f(&mut lock(&self.device))
    }

    /// Start polling with default options.
    ///
    /// See [`Max44009Handle::start_with`].
    pub fn start(&self) -> Receiver<f64> {
        self.start_with(PollOptions::default())
    }

    /// Start polling on a background thread and return the stream of lux values.
    ///
    /// An already running loop is stopped and joined first, so its channel is
    /// disconnected before the new one produces anything. The returned channel
    /// has no buffer: each value is handed over only when the consumer
    /// receives it. It disconnects when the loop ends, either through
    /// [`halt`](Self::halt) or after a failed read.
    pub fn start_with(&self, options: PollOptions<E>) -> Receiver<f64> {
        let mut state = lock(&self.state);
        if let PollState::Polling(previous) = mem::replace(&mut *state, PollState::Idle) {
            log::debug!("max44009: replacing running polling loop");
            drop(previous);
        }

        let (readings_tx, readings_rx) = bounded(0);
        let (stop_tx, stop_rx) = bounded(0);
        let device = Arc::clone(&self.device);
        let worker = thread::spawn(move || poll(device, readings_tx, stop_rx, options));

        *state = PollState::Polling(Poller {
            stop: Some(stop_tx),
            worker: Some(worker),
        });
        log::debug!("max44009: polling started");
        readings_rx
    }

    /// Stop polling and wait for the loop to finish.
    ///
    /// Does nothing when no loop is running. A bus transaction already in
    /// flight completes first. No value is delivered once `halt` returns.
    pub fn halt(&self) {
        // Held until the join completes so a concurrent start cannot overlap
        let mut state = lock(&self.state);
        if let PollState::Polling(poller) = mem::replace(&mut *state, PollState::Idle) {
            drop(poller);
            log::debug!("max44009: polling halted");
        }
    }

    /// Whether a polling loop is installed and still running
    pub fn is_polling(&self) -> bool {
        match &*lock(&self.state) {
            PollState::Idle => false,
            PollState::Polling(poller) => poller.is_running(),
        }
    }

    /// Stop polling and hand back the bus.
    ///
    /// The polling thread is joined first, which releases its reference to
    /// the driver, so [`Error::BusInUse`] is not returned for a handle used
    /// only through its own methods.
    pub fn close(self) -> Result<I2C, Error<E>> {
        let Self { device, state } = self;
        drop(state.into_inner().unwrap_or_else(PoisonError::into_inner));

        match Arc::try_unwrap(device) {
            Ok(device) => Ok(device
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .destroy()),
            Err(_) => Err(Error::BusInUse),
        }
    }
}

#[cfg(feature = "linux")]
impl Max44009Handle<linux_embedded_hal::I2cdev> {
    /// Open an I2C character device and wrap a driver for it in a handle
    pub fn open<P: AsRef<std::path::Path>>(
        path: P,
        address: u8,
    ) -> Result<Self, Error<linux_embedded_hal::I2CError>> {
        Max44009::open(path, address).map(Self::new)
    }
}

fn poll<I2C, E>(
    device: Arc<Mutex<Max44009<I2C>>>,
    readings: Sender<f64>,
    stop: Receiver<()>,
    mut options: PollOptions<E>,
) where
    I2C: I2c<Error = E>,
    E: fmt::Debug,
{
    loop {
        let result = lock(&device).read_lux();
        let lux = match result {
            Ok(lux) => lux,
            Err(err) => {
                log::warn!("max44009: read failed, polling stopped: {err}");
                if let Some(on_error) = options.on_error.as_mut() {
                    on_error(&err);
                }
                return;
            }
        };

        select! {
            send(readings, lux) -> sent => {
                if sent.is_err() {
                    log::debug!("max44009: reader dropped, polling stopped");
                    return;
                }
            }
            recv(stop) -> _ => return,
        }

        if let Some(interval) = options.interval {
            select! {
                recv(stop) -> _ => return,
                default(interval) => {}
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
