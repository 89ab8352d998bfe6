mod handling_set;
mod handling_state;
mod worker;

pub(crate) use handling_set::{ErasedHandlings, HandlingSet};
pub(crate) use handling_state::{HandlingState, panic_message};
pub(crate) use worker::spawn_worker;
