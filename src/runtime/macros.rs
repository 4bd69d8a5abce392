/// Request a future from inside a frame body.
///
/// Evaluates to the [`Payload`](crate::runtime::Payload) when the future is
/// ready. Otherwise the frame is registered as a waiter and the enclosing
/// body returns `Ok(Signal::Wait(id))`. Store errors propagate with `?`, so
/// the body must return [`BlockResult`](crate::runtime::BlockResult).
///
/// ```
/// use lunar::{request, Scheduler, Signal};
///
/// let mut scheduler = Scheduler::new();
/// let value = scheduler.create_future().unwrap();
///
/// scheduler.spawn(
///     move |cx, seen: &mut Option<i32>| {
///         *seen = Some(request!(cx, value).as_int()?);
///         Ok(Signal::Done)
///     },
///     None,
/// );
/// scheduler.spawn(
///     move |cx, _: &mut ()| {
///         cx.submit(value, 10)?;
///         Ok(Signal::Done)
///     },
///     (),
/// );
///
/// scheduler.run();
/// assert_eq!(scheduler.read(value).unwrap().unwrap().as_int().unwrap(), 10);
/// ```
#[macro_export]
macro_rules! request {
    ($cx:expr, $id:expr) => {{
        let id = $id;
        match $cx.request(id)? {
            ::core::option::Option::Some(value) => value,
            ::core::option::Option::None => {
                return ::core::result::Result::Ok($crate::runtime::Signal::Wait(id));
            }
        }
    }};
}
