#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Kestrel
//!
//! A typed, in-process pub/sub dispatcher backed by worker thread pools.
//!
//! Kestrel routes events to named *handlings* by event type. Each handling
//! couples a bounded queue with a handler closure and a pool of OS threads
//! that drain the queue. Producers publish from any thread and never block:
//! a full queue is reported back so the producer can slow down.
//!
//! ## Quick Start
//!
//! ```rust
//! use kestrel::{Dispatcher, Result};
//!
//! #[derive(Clone, Debug)]
//! enum Greeting {
//!     Hello(String),
//! }
//!
//! fn main() -> Result {
//!     let dispatcher = Dispatcher::default();
//!     dispatcher.add_handling("greeter", |g: Greeting| {
//!         let Greeting::Hello(name) = g;
//!         println!("Hello, {name}!");
//!     })?;
//!
//!     dispatcher.publish(Greeting::Hello("World".into()))?;
//!     Ok(())
//! } // dropping the dispatcher stops and joins every worker
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Dispatcher`] | Registry of handlings, routes published events by type |
//! | [`Handling`] | Queue + handler + worker pool with a stop/start lifecycle |
//! | [`BoundedQueue`] | Fixed-capacity FIFO shared by a handling's workers |
//! | [`PeriodicTimer`] | Invokes a callback at a fixed interval on its own thread |
//! | [`HandlerRef`] | Shareable handler; its identity can be bound only once per event type |
//! | [`Priority`] | Seven-level ordering of handlings within one event type |
//! | [`HandlingSnapshot`] | Point-in-time state of a handling |
//!
//! ## Backpressure
//!
//! [`Dispatcher::publish`] returns [`Error::QueueFull`] when one or more
//! handling queues rejected the event. The remaining handlings still got it.
//! Producers that need lossless delivery watch
//! [`Dispatcher::occupied_in_queue`] against [`Dispatcher::queue_size`]:
//!
//! ```rust
//! # use kestrel::Dispatcher;
//! # #[derive(Clone, Debug)] struct Sample(f64);
//! # let dispatcher = Dispatcher::default();
//! # dispatcher.add_handling("sink", |_: Sample| {})?;
//! let occupied = dispatcher.occupied_in_queue::<Sample>("sink").unwrap_or(0);
//! let capacity = dispatcher.queue_size::<Sample>("sink").unwrap_or(0);
//! if occupied * 10 < capacity * 8 {
//!     dispatcher.publish(Sample(0.5))?;
//! }
//! # Ok::<(), kestrel::Error>(())
//! ```
//!
//! ## Features
//!
//! - **`serde`** - Serialization of configs and snapshots, and [`Dispatcher::to_json()`]
//!
//! ## Examples
//!
//! See the [`examples/`](https://github.com/kestrel-rs/kestrel/tree/main/kestrel/examples) directory:
//!
//! - `hello.rs` - Registering handlings and publishing events
//! - `backpressure.rs` - A timer-driven producer throttled by queue occupancy

mod bounded_queue;
mod config;
mod delivery;
mod dispatcher;
mod error;
mod event;
mod handler_ref;
mod handling;
mod handling_builder;
mod handling_config;
mod handling_name;
mod priority;
mod snapshot;
mod timer;

mod internal;

pub use bounded_queue::BoundedQueue;
pub use config::DispatcherConfig;
pub use delivery::Delivery;
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use event::Event;
pub use handler_ref::HandlerRef;
pub use handling::Handling;
pub use handling_builder::HandlingBuilder;
pub use handling_config::HandlingConfig;
pub use handling_name::HandlingName;
pub use priority::Priority;
pub use snapshot::HandlingSnapshot;
pub use timer::PeriodicTimer;

/// Convenience alias for `Result<T, kestrel::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
