//! Lunar dataflow runtime
//!
//! Work is written as *continuation frames*: closures that run one step at a
//! time and either finish, yield, wait for a *data future* that has not been
//! produced yet, or shut the runtime down. Futures are write-once values
//! addressed by numeric identifiers.
//!
//! # Example
//!
//! ```
//! use lunar::{request, Scheduler, Signal};
//!
//! let mut scheduler = Scheduler::new();
//! let sum = scheduler.create_future().unwrap();
//!
//! // The reader runs first and suspends on `sum`.
//! scheduler.spawn(
//!     move |cx, _: &mut ()| {
//!         let value = request!(cx, sum).as_int()?;
//!         assert_eq!(value, 10);
//!         Ok(Signal::Done)
//!     },
//!     (),
//! );
//! scheduler.spawn(
//!     move |cx, &mut (a, b): &mut (i32, i32)| {
//!         cx.submit(sum, a + b)?;
//!         Ok(Signal::Done)
//!     },
//!     (3, 7),
//! );
//!
//! let report = scheduler.run();
//! assert_eq!(report.completed, 2);
//! ```

#![warn(rust_2018_idioms)]

pub mod programs;
pub mod runtime;
pub mod util;

pub use runtime::{
    BlockResult, DestroyPolicy, FrameCx, FrameId, FrameState, FutureId, FutureStore, Payload,
    PayloadKind, RemoteHandle, RunOutcome, RunReport, RuntimeError, RuntimeResult, Scheduler,
    SchedulerConfig, SchedulerStats, Signal, Step,
};

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime name
pub const NAME: &str = "Lunar";
