//! Optional ctrl-c interrupt listener (`signals` feature), grounded on
//! the teacher's `init()` ctrl-c-then-exit pattern, generalised into a
//! dedicated thread with its own tiny current-thread runtime so the
//! core MCTS loop stays synchronous and can poll a flag between
//! iterations instead of racing an async runtime for the whole process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Spawns a background thread that blocks on `tokio::signal::ctrl_c()`
/// and flips the returned flag once. The caller polls the flag between
/// MCTS iterations; the process is never exited from here.
pub fn spawn_interrupt_listener() -> Arc<AtomicBool> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
            .expect("build ctrl-c listener runtime");
        rt.block_on(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("interrupt received, finishing current iteration");
                flag.store(true, Ordering::Relaxed);
            }
        });
    });
    interrupted
}
