//! Throbber: an animated spinner shown while work runs
//!
//! The work runs on the calling thread. A scoped ticker thread writes one
//! frame per interval and waits on a channel between frames; the channel
//! disconnects when the work returns (or unwinds), so the animation stops
//! within one interval and the last glyph is erased.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::trace;

use crate::infrastructure::console::SharedOutput;

pub const FRAMES: [char; 4] = ['-', '\\', '|', '/'];

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);

/// Run `work` while animating a spinner on `output`; returns the work's result.
pub fn throbber<T, F>(output: SharedOutput, interval: Duration, work: F) -> T
where
    F: FnOnce() -> T,
{
    let (done, finished) = mpsc::channel::<()>();
    thread::scope(|scope| {
        scope.spawn(move || tick(&output, interval, &finished));
        let result = work();
        drop(done);
        result
    })
}

fn tick(output: &SharedOutput, interval: Duration, finished: &Receiver<()>) {
    let mut frames = 0usize;
    for frame in FRAMES.iter().cycle() {
        if output.write_flushed(&format!("{frame}\x08")).is_err() {
            break;
        }
        frames += 1;
        match finished.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    trace!("throbber stopped after {} frames", frames);
    output.write_flushed(" \x08").ok();
}
