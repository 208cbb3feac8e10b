use std::io;

use tracing::warn;

/// Spawns a named OS thread, logging (rather than panicking) if the
/// underlying `thread::Builder::spawn` call fails.
///
/// Every long-lived task in the framework (reader, writer, heartbeat,
/// worker, accept loop) goes through this so that a thread dump or a
/// panic backtrace shows which role the thread played instead of just
/// `<unnamed>`.
pub fn spawn_named<F>(name: impl Into<String>, f: F) -> Option<std::thread::JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let name = name.into();
    match std::thread::Builder::new().name(name.clone()).spawn(f) {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(thread = %name, %err, "failed to spawn thread");
            None
        }
    }
}

/// Turns a spawn failure into an `io::Result` for call sites that want to
/// propagate rather than merely log it (e.g. starting the fixed-size
/// worker pool, where a failed spawn should abort startup).
pub fn spawn_named_or_err<F>(name: impl Into<String>, f: F) -> io::Result<std::thread::JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let name = name.into();
    std::thread::Builder::new().name(name).spawn(f)
}
