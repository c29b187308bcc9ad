//! Stop-aware sleeping for producer threads

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const SLICE: Duration = Duration::from_millis(20);

/// Sleep for `duration` or until `running` is cleared
///
/// Returns whether the producer should keep running.
pub(crate) fn sleep_while_running(running: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SLICE));
    }
}
