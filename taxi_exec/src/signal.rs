//! # Stop Signal
//!
//! Ctrl+C handling. The signal is awaited on a current-thread `tokio` runtime running on a helper
//! thread, which sets a shared flag the control loop polls once per cycle.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use log::{info, warn};
use tokio::{runtime::Builder, signal};

/// Spawn a thread which sets `stop` when Ctrl+C is received.
pub fn spawn_ctrl_c_handler(stop: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
    let runtime = Builder::new_current_thread().enable_all().build()?;

    thread::Builder::new()
        .name(String::from("ctrl_c"))
        .spawn(move || {
            runtime.block_on(async {
                match signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Ctrl+C received, stopping");
                        stop.store(true, Ordering::Relaxed);
                    }
                    Err(e) => warn!("Could not listen for Ctrl+C: {}", e),
                }
            })
        })
}
