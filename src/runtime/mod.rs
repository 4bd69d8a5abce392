//! Runtime system
//!
//! Two layers: the [`future`] store owns every data future, the
//! [`scheduler`] owns every continuation frame and drives them.

#[macro_use]
mod macros;

pub mod error;
pub mod future;
pub mod id;
pub mod scheduler;

pub use error::{RuntimeError, RuntimeResult};
pub use future::{DestroyPolicy, FutureState, FutureStore, Payload, PayloadKind};
pub use id::{FrameId, FutureId};
pub use scheduler::{
    BlockResult, FrameCx, FrameState, RemoteHandle, RunOutcome, RunReport, Scheduler,
    SchedulerConfig, SchedulerStats, Signal, Step,
};
