//! Small host programs built on the public runtime surface
//!
//! These are ordinary user code: they only spawn frames, request and submit
//! futures, and read results through the typed accessors.

use tracing::info;

use crate::request;
use crate::runtime::{FrameId, FutureId, RuntimeResult, Scheduler, Signal};

/// Handles of the addition program.
#[derive(Debug, Clone, Copy)]
pub struct AddProgram {
    /// Receives `a + b` as an `int`.
    pub sum: FutureId,
    /// Frame that waits for the sum and reports it.
    pub reader: FrameId,
    /// Frame that computes and submits the sum.
    pub adder: FrameId,
}

/// Spawn a reader of `sum` and a frame computing `a + b` into it.
///
/// The reader is queued first so it suspends before the sum exists.
pub fn spawn_add(
    scheduler: &mut Scheduler,
    a: i32,
    b: i32,
) -> RuntimeResult<AddProgram> {
    let sum = scheduler.create_future()?;

    let reader = scheduler.spawn_named(
        "print",
        move |cx, _: &mut ()| {
            let value = request!(cx, sum).as_int()?;
            info!("{} = {}", sum, value);
            Ok(Signal::Done)
        },
        (),
    );

    let adder = scheduler.spawn_named(
        "add",
        move |cx, &mut (a, b): &mut (i32, i32)| {
            let Some(total) = a.checked_add(b) else {
                return Ok(Signal::fail(format!("{} + {} overflows int", a, b)));
            };
            cx.submit(sum, total)?;
            Ok(Signal::Done)
        },
        (a, b),
    );

    Ok(AddProgram { sum, reader, adder })
}

/// Handles of the initializer program.
#[derive(Debug, Clone, Copy)]
pub struct InitProgram {
    /// Receives the value the reader observed.
    pub output: FutureId,
    /// Frame that creates, fills and hands over the value future.
    pub initializer: FrameId,
}

/// Value stored by the initializer frame.
pub const INIT_VALUE: i32 = 10;

/// Spawn an initializer that fills a fresh future with [`INIT_VALUE`] and
/// a reader that copies it into `output`, then destroys the original.
pub fn spawn_init(scheduler: &mut Scheduler) -> RuntimeResult<InitProgram> {
    let output = scheduler.create_future()?;

    let initializer = scheduler.spawn_named(
        "init",
        move |cx, _: &mut ()| {
            let value = cx.create()?;
            cx.submit(value, INIT_VALUE)?;
            cx.spawn_named(
                "print",
                |cx, &mut (value, output): &mut (FutureId, FutureId)| {
                    let observed = request!(cx, value).as_int()?;
                    info!("{} = {}", value, observed);
                    cx.submit(output, observed)?;
                    cx.destroy(value)?;
                    Ok(Signal::Done)
                },
                (value, output),
            );
            Ok(Signal::Done)
        },
        (),
    );

    Ok(InitProgram {
        output,
        initializer,
    })
}
