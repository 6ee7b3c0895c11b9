//! Progress and log sinks for batch jobs.

use tracing::{debug, info};

/// Receives batch progress.
///
/// `progress` is called once after every input file, failed or not, with the
/// number of inputs handled so far. `log` receives one human-readable line
/// per stage.
pub trait Observer {
    fn progress(&mut self, completed: usize);
    fn log(&mut self, line: &str);
}

/// Forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn progress(&mut self, completed: usize) {
        debug!(completed, "batch progress");
    }

    fn log(&mut self, line: &str) {
        info!("{line}");
    }
}

/// Observer built from two closures.
pub struct FnObserver<P, L> {
    progress: P,
    log: L,
}

impl<P, L> FnObserver<P, L>
where
    P: FnMut(usize),
    L: FnMut(&str),
{
    pub fn new(progress: P, log: L) -> Self {
        Self { progress, log }
    }
}

impl<P, L> Observer for FnObserver<P, L>
where
    P: FnMut(usize),
    L: FnMut(&str),
{
    fn progress(&mut self, completed: usize) {
        (self.progress)(completed);
    }

    fn log(&mut self, line: &str) {
        (self.log)(line);
    }
}
