use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Trips `token` on the first Ctrl-C so a running scan stops at its next
/// loop boundary. The listener gets its own thread and a single-threaded
/// runtime; the scan stays synchronous.
pub fn cancel_on_ctrl_c(token: Arc<AtomicBool>) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    debug!("No runtime for the Ctrl-C listener: {}", err);
                    return;
                }
            };
            runtime.block_on(cancel_when(tokio::signal::ctrl_c(), token));
        });

    if let Err(err) = spawned {
        debug!("Could not start the Ctrl-C listener: {}", err);
    }
}

async fn cancel_when<S>(signal: S, token: Arc<AtomicBool>)
where
    S: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            warn!("Interrupted, cancelling scan");
            token.store(true, Ordering::SeqCst);
        }
        Err(err) => debug!("Ctrl-C listener unavailable: {}", err),
    }
}
