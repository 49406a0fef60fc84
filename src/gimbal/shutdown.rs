use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep taken while waiting on a shutdown flag
const SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Cooperative stop flag for the receiver thread
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_signaled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless shutdown is signaled first
    ///
    /// Returns `false` if the sleep was cut short by shutdown.
    pub fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_signaled();
        }

        let deadline = Instant::now() + duration;
        loop {
            if self.is_signaled() {
                return false;
            }

            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}
