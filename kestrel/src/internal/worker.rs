use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use super::HandlingState;
use crate::Event;

/// Spawn one worker thread draining `state`'s queue.
///
/// Threads are named `<handling>-worker-<index>` so they can be told apart
/// in debuggers and panic messages.
pub(crate) fn spawn_worker<E: Event>(
    state: Arc<HandlingState<E>>,
    index: usize,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-worker-{}", state.name, index))
        .spawn(move || run(&state, index))
}

fn run<E: Event>(state: &HandlingState<E>, index: usize) {
    tracing::trace!(handling = %state.name, worker = index, "worker started");
    while state.is_alive() {
        let Some(event) = state
            .queue
            .pop_when(state.idle_timeout, || state.is_running())
        else {
            continue;
        };
        state.handle(event);
    }
    tracing::trace!(handling = %state.name, worker = index, "worker exited");
}
