use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{Error, Result, internal::panic_message};

type Callback = Box<dyn FnMut() + Send + 'static>;

/// Stop token of one run of the timer thread.
struct Signal {
    running: Mutex<bool>,
    wake: Condvar,
}

impl Signal {
    fn new(running: bool) -> Self {
        Self {
            running: Mutex::new(running),
            wake: Condvar::new(),
        }
    }
}

/// Runs a callback at a fixed cadence on a dedicated thread.
///
/// Each cycle waits `interval` and then invokes the callback, so the time the
/// callback takes is added to the period. The timer is created stopped; call
/// [`start`](Self::start) to spawn its thread and [`stop`](Self::stop), or
/// drop it, to end the loop. A stopped timer can be started again.
///
/// A timer is typically used to drive a producer:
///
/// ```rust
/// use std::{sync::Arc, time::Duration};
/// use kestrel::{Dispatcher, PeriodicTimer};
///
/// #[derive(Clone, Debug)]
/// struct Heartbeat;
///
/// let dispatcher = Arc::new(Dispatcher::default());
/// dispatcher.add_handling("monitor", |_: Heartbeat| {})?;
///
/// let d = dispatcher.clone();
/// let mut timer = PeriodicTimer::new(Duration::from_millis(10), move || {
///     let _ = d.publish(Heartbeat);
/// })
/// .with_name("heartbeat");
///
/// timer.start()?;
/// std::thread::sleep(Duration::from_millis(35));
/// timer.stop();
/// # Ok::<(), kestrel::Error>(())
/// ```
pub struct PeriodicTimer {
    interval: Duration,
    name: String,
    callback: Option<Arc<Mutex<Callback>>>,
    signal: Arc<Signal>,
    thread: Option<JoinHandle<()>>,
}

impl PeriodicTimer {
    pub fn new<F>(interval: Duration, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let mut timer = Self::default();
        timer.interval = interval;
        timer.callback = Some(Arc::new(Mutex::new(Box::new(callback))));
        timer
    }

    /// Name used for the timer thread and in log records.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Spawn the timer thread.
    ///
    /// # Errors
    ///
    /// - [`Error::TimerAlreadyRunning`] if the timer was started and not
    ///   stopped since.
    /// - [`Error::TimerEmpty`] if the timer was emptied by
    ///   [`take`](Self::take).
    /// - [`Error::Io`] if the thread cannot be spawned.
    pub fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            return Err(Error::TimerAlreadyRunning);
        }
        let callback = self.callback.clone().ok_or(Error::TimerEmpty)?;

        // A loop detached by a stop from its own callback keeps the old
        // signal, so it can never be revived by this start.
        self.signal = Arc::new(Signal::new(true));
        let signal = self.signal.clone();
        let interval = self.interval;
        let name = self.name.clone();
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run(&signal, interval, &callback, &name));

        match spawned {
            Ok(handle) => {
                tracing::debug!(timer = %self.name, interval = ?self.interval, "timer started");
                self.thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                *self.signal.running.lock() = false;
                Err(e.into())
            }
        }
    }

    /// Stop the loop and join the timer thread.
    ///
    /// A callback already executing completes first. Calling `stop` on a
    /// timer that is not running does nothing.
    pub fn stop(&mut self) {
        {
            let mut running = self.signal.running.lock();
            *running = false;
        }
        self.signal.wake.notify_all();

        let Some(handle) = self.thread.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // Stopped from its own callback; the loop exits after it returns.
            return;
        }
        if handle.join().is_err() {
            tracing::error!(timer = %self.name, "timer thread panicked");
        }
        tracing::debug!(timer = %self.name, "timer stopped");
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Returns `true` if the timer holds no callback and cannot be started.
    pub fn is_empty(&self) -> bool {
        self.callback.is_none()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Move this timer, including a running thread, into a new value.
    ///
    /// `self` is left empty: starting it fails with [`Error::TimerEmpty`].
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

fn run(signal: &Signal, interval: Duration, callback: &Mutex<Callback>, name: &str) {
    tracing::trace!(timer = %name, "timer loop started");
    loop {
        {
            let deadline = Instant::now() + interval;
            let mut running = signal.running.lock();
            while *running && !signal.wake.wait_until(&mut running, deadline).timed_out() {}
            if !*running {
                break;
            }
        }

        let mut callback = callback.lock();
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (*callback)())) {
            tracing::error!(
                timer = %name,
                panic = %panic_message(payload.as_ref()),
                "timer callback panicked, timer continues"
            );
        }
    }
    tracing::trace!(timer = %name, "timer loop exited");
}

impl Default for PeriodicTimer {
    /// An empty timer: it has no callback and cannot be started.
    fn default() -> Self {
        Self {
            interval: Duration::ZERO,
            name: "timer".to_string(),
            callback: None,
            signal: Arc::new(Signal::new(false)),
            thread: None,
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for PeriodicTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicTimer")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .field("empty", &self.is_empty())
            .finish()
    }
}
