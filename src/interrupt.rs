//! Graceful interrupt capture.
//!
//! An [`InterruptGuard`] turns Ctrl-C into a flag the application polls, instead
//! of killing the process. Guards nest: each capture pushes a frame on a
//! process-wide stack and an interrupt goes to the innermost frame only. That
//! frame is popped as it is delivered, so the next interrupt reaches the
//! capture that was active before it. With no capture active, an interrupt
//! terminates the process with status 130, as an uncaught SIGINT would.
//!
//! ```no_run
//! use appsettings::InterruptGuard;
//!
//! let guard = InterruptGuard::capture()?;
//! for chunk in 0..100 {
//!     if guard.interrupted() {
//!         break;
//!     }
//!     // work on chunk
//! #   let _ = chunk;
//! }
//! # Ok::<(), appsettings::SettingsError>(())
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::{debug, warn};

use crate::error::SettingsError;

/// Exit status for an interrupt nobody captured (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

struct Frame {
    id: u64,
    flag: Arc<AtomicBool>,
}

static FRAMES: Mutex<Vec<Frame>> = Mutex::new(Vec::new());
static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static HANDLER: OnceLock<Result<(), String>> = OnceLock::new();

fn frames() -> MutexGuard<'static, Vec<Frame>> {
    FRAMES.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn install_handler() -> Result<(), SettingsError> {
    HANDLER
        .get_or_init(|| {
            ctrlc::set_handler(|| {
                if !deliver() {
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            })
            .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(SettingsError::Interrupt)
}

/// Hand one interrupt to the innermost capture.
///
/// Returns `false` when no capture is active. This is what the signal handler
/// runs; it is public so an application can route its own cancellation
/// through the same stack.
pub fn deliver() -> bool {
    let mut stack = frames();
    match stack.pop() {
        Some(frame) => {
            frame.flag.store(true, Ordering::SeqCst);
            debug!(capture = frame.id, "interrupt delivered");
            true
        }
        None => false,
    }
}

/// Scoped interrupt capture. Released on drop.
#[derive(Debug)]
pub struct InterruptGuard {
    id: u64,
    flag: Arc<AtomicBool>,
    released: bool,
}

impl InterruptGuard {
    /// Start capturing interrupts. The Ctrl-C handler is installed on first use.
    pub fn capture() -> Result<Self, SettingsError> {
        install_handler()?;
        Ok(Self::push())
    }

    fn push() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let flag = Arc::new(AtomicBool::new(false));
        frames().push(Frame {
            id,
            flag: Arc::clone(&flag),
        });
        debug!(capture = id, "interrupt capture started");
        InterruptGuard {
            id,
            flag,
            released: false,
        }
    }

    /// Whether an interrupt was delivered to this capture.
    pub fn interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Stop capturing. Returns `false` if this guard was already released or
    /// its frame was consumed by an interrupt.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;

        let mut stack = frames();
        let Some(pos) = stack.iter().position(|f| f.id == self.id) else {
            return false;
        };
        if pos + 1 != stack.len() {
            warn!(capture = self.id, "interrupt capture released out of order");
        }
        stack.remove(pos);
        true
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.release();
    }
}
