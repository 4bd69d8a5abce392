//! FutureStore 单元测试
//!
//! 测试标识符分配、写一次语义、销毁策略和类型化访问

use crate::runtime::error::RuntimeError;
use crate::runtime::future::{DestroyPolicy, FutureState, FutureStore, Payload, PayloadKind};
use crate::runtime::id::{FrameId, FutureId, IdAllocator};

#[cfg(test)]
mod id_allocator_tests {
    use super::*;

    #[test]
    fn test_allocate_sequential() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(), Ok(FutureId(0)));
        assert_eq!(ids.allocate(), Ok(FutureId(1)));
        assert_eq!(ids.allocate(), Ok(FutureId(2)));
    }

    #[test]
    fn test_released_ids_reused_fifo() {
        let mut ids = IdAllocator::new();
        for _ in 0..4 {
            ids.allocate().unwrap();
        }
        ids.release(FutureId(2));
        ids.release(FutureId(0));

        assert_eq!(ids.allocate(), Ok(FutureId(2)));
        assert_eq!(ids.allocate(), Ok(FutureId(0)));
        assert_eq!(ids.allocate(), Ok(FutureId(4)));
    }

    #[test]
    fn test_limit_exhaustion() {
        let mut ids = IdAllocator::with_limit(2);
        ids.allocate().unwrap();
        ids.allocate().unwrap();
        assert_eq!(ids.allocate(), Err(RuntimeError::ExhaustedIdentifiers));

        ids.release(FutureId(1));
        assert_eq!(ids.allocate(), Ok(FutureId(1)));
    }

    #[test]
    fn test_claim_ahead_is_skipped() {
        let mut ids = IdAllocator::new();
        ids.claim(FutureId(1)).unwrap();

        assert_eq!(ids.allocate(), Ok(FutureId(0)));
        assert_eq!(ids.allocate(), Ok(FutureId(2)));
    }

    #[test]
    fn test_claim_free_id_removes_it_from_free_list() {
        let mut ids = IdAllocator::new();
        ids.allocate().unwrap();
        ids.allocate().unwrap();
        ids.release(FutureId(0));
        assert_eq!(ids.free_count(), 1);

        ids.claim(FutureId(0)).unwrap();
        assert_eq!(ids.free_count(), 0);
        assert_eq!(ids.allocate(), Ok(FutureId(2)));
    }

    #[test]
    fn test_claim_beyond_limit() {
        let mut ids = IdAllocator::with_limit(8);
        assert_eq!(ids.claim(FutureId(8)), Err(RuntimeError::ExhaustedIdentifiers));
    }
}

#[cfg(test)]
mod payload_tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        assert_eq!(Payload::from(10i32).as_int(), Ok(10));
        assert_eq!(Payload::from(10i64).as_long(), Ok(10));
        assert_eq!(Payload::from(1.5f32).as_float(), Ok(1.5));
        assert_eq!(Payload::from(2.5f64).as_double(), Ok(2.5));
    }

    #[test]
    fn test_type_mismatch() {
        let err = Payload::Int(10).as_double().unwrap_err();
        assert_eq!(
            err,
            RuntimeError::TypeMismatch {
                expected: PayloadKind::Double,
                found: PayloadKind::Int,
            }
        );
        assert_eq!(err.to_string(), "Type mismatch: expected double, found int");
    }

    #[test]
    fn test_opaque_downcast() {
        let payload = Payload::opaque(String::from("hello"));
        assert_eq!(payload.kind(), PayloadKind::Opaque);
        assert_eq!(payload.downcast::<String>().unwrap().as_str(), "hello");
        assert!(payload.downcast::<u8>().is_err());
        assert!(payload.as_int().is_err());
        assert!(Payload::Long(1).downcast::<String>().is_err());
    }

    #[test]
    fn test_opaque_clone_shares_value() {
        let payload = Payload::opaque(vec![1u8, 2, 3]);
        let copy = payload.clone();
        assert_eq!(payload, copy);
        assert_ne!(payload, Payload::opaque(vec![1u8, 2, 3]));
    }

    #[test]
    fn test_display() {
        assert_eq!(Payload::Int(-4).to_string(), "-4");
        assert_eq!(Payload::opaque(()).to_string(), "<opaque>");
        assert_eq!(format!("{:?}", Payload::opaque(())), "Opaque(..)");
    }
}

#[cfg(test)]
mod store_tests {
    use super::*;

    #[test]
    fn test_create_is_pending() {
        let mut store = FutureStore::new();
        let id = store.create().unwrap();

        assert!(store.contains(id));
        assert_eq!(store.is_ready(id), Ok(false));
        assert_eq!(store.read(id), Ok(None));
        assert_eq!(store.get(id).unwrap().state(), &FutureState::Pending);
        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn test_submit_then_read() {
        let mut store = FutureStore::new();
        let id = store.create().unwrap();

        let woken = store.submit(id, Payload::Int(10)).unwrap();
        assert!(woken.is_empty());
        assert_eq!(store.read(id), Ok(Some(Payload::Int(10))));
        // Read-many
        assert_eq!(store.read(id), Ok(Some(Payload::Int(10))));
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn test_second_submit_rejected() {
        let mut store = FutureStore::new();
        let id = store.create().unwrap();
        store.submit(id, Payload::Int(1)).unwrap();

        assert_eq!(
            store.submit(id, Payload::Int(2)),
            Err(RuntimeError::AlreadyCompleted(id))
        );
        assert_eq!(store.read(id), Ok(Some(Payload::Int(1))));
    }

    #[test]
    fn test_unknown_future() {
        let mut store = FutureStore::new();
        let id = FutureId(99);

        assert_eq!(store.read(id), Err(RuntimeError::UnknownFuture(id)));
        assert_eq!(
            store.submit(id, Payload::Int(1)),
            Err(RuntimeError::UnknownFuture(id))
        );
        assert_eq!(store.destroy(id), Err(RuntimeError::UnknownFuture(id)));
    }

    #[test]
    fn test_destroy_pending_rejected() {
        let mut store = FutureStore::new();
        let id = store.create().unwrap();

        assert_eq!(store.destroy(id), Err(RuntimeError::StillPending(id)));
        assert!(store.contains(id));
    }

    #[test]
    fn test_destroy_ready_then_unknown() {
        let mut store = FutureStore::new();
        let id = store.create().unwrap();
        store.submit(id, Payload::Long(5)).unwrap();

        assert!(store.destroy(id).unwrap().is_empty());
        assert_eq!(store.read(id), Err(RuntimeError::UnknownFuture(id)));
        assert_eq!(store.destroy(id), Err(RuntimeError::UnknownFuture(id)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_destroyed_id_is_reused() {
        let mut store = FutureStore::new();
        let first = store.create().unwrap();
        let second = store.create().unwrap();
        store.submit(first, Payload::Int(0)).unwrap();
        store.destroy(first).unwrap();

        let third = store.create().unwrap();
        assert_eq!(third, first);
        assert_ne!(third, second);
        assert_eq!(store.read(third), Ok(None));
    }

    #[test]
    fn test_request_registers_waiter_once() {
        let mut store = FutureStore::new();
        let id = store.create().unwrap();

        assert_eq!(store.request(id, FrameId(1)), Ok(None));
        assert_eq!(store.request(id, FrameId(1)), Ok(None));
        assert_eq!(store.request(id, FrameId(2)), Ok(None));
        assert_eq!(store.waiters(id).unwrap(), &[FrameId(1), FrameId(2)]);

        let woken = store.submit(id, Payload::Int(3)).unwrap();
        assert_eq!(woken.as_slice(), &[FrameId(1), FrameId(2)]);
        assert!(store.waiters(id).unwrap().is_empty());
        assert_eq!(store.request(id, FrameId(3)), Ok(Some(Payload::Int(3))));
    }

    #[test]
    fn test_request_creates_unknown_future() {
        let mut store = FutureStore::new();
        let id = FutureId(5);

        assert_eq!(store.request(id, FrameId(0)), Ok(None));
        assert!(store.contains(id));

        // The claimed identifier is never handed out by create.
        let created: Vec<_> = (0..6).map(|_| store.create().unwrap()).collect();
        assert!(!created.contains(&id));
    }

    #[test]
    fn test_add_waiter_on_ready() {
        let mut store = FutureStore::new();
        let id = store.create().unwrap();
        assert_eq!(store.add_waiter(id, FrameId(0)), Ok(true));

        store.submit(id, Payload::Int(1)).unwrap();
        assert_eq!(store.add_waiter(id, FrameId(0)), Ok(false));
    }

    #[test]
    fn test_remove_waiter() {
        let mut store = FutureStore::new();
        let id = store.create().unwrap();
        store.request(id, FrameId(0)).unwrap();
        store.request(id, FrameId(1)).unwrap();

        store.remove_waiter(id, FrameId(0));
        assert_eq!(store.waiters(id).unwrap(), &[FrameId(1)]);
        store.remove_waiter(FutureId(77), FrameId(0));
    }

    #[test]
    fn test_abandon_policy_returns_waiters() {
        let mut store = FutureStore::with_config(None, DestroyPolicy::Abandon);
        let id = store.create().unwrap();
        store.request(id, FrameId(4)).unwrap();

        let released = store.destroy(id).unwrap();
        assert_eq!(released.as_slice(), &[FrameId(4)]);
        assert!(!store.contains(id));
    }

    #[test]
    fn test_id_limit() {
        let mut store = FutureStore::with_config(Some(1), DestroyPolicy::Reject);
        let id = store.create().unwrap();
        assert_eq!(store.create(), Err(RuntimeError::ExhaustedIdentifiers));
        assert_eq!(
            store.request(FutureId(1), FrameId(0)),
            Err(RuntimeError::ExhaustedIdentifiers)
        );

        store.submit(id, Payload::Int(0)).unwrap();
        store.destroy(id).unwrap();
        assert_eq!(store.create(), Ok(id));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn payload_strategy() -> impl Strategy<Value = Payload> {
        prop_oneof![
            any::<i32>().prop_map(Payload::Int),
            any::<i64>().prop_map(Payload::Long),
            (-1.0e6f32..1.0e6f32).prop_map(Payload::Float),
            (-1.0e12f64..1.0e12f64).prop_map(Payload::Double),
        ]
    }

    proptest! {
        #[test]
        fn submitted_value_is_read_back(payload in payload_strategy(), reads in 1usize..5) {
            let mut store = FutureStore::new();
            let id = store.create().unwrap();
            store.submit(id, payload.clone()).unwrap();

            for _ in 0..reads {
                prop_assert_eq!(store.read(id).unwrap(), Some(payload.clone()));
            }
        }

        #[test]
        fn second_submit_never_overwrites(first in payload_strategy(), second in payload_strategy()) {
            let mut store = FutureStore::new();
            let id = store.create().unwrap();
            store.submit(id, first.clone()).unwrap();

            prop_assert_eq!(store.submit(id, second), Err(RuntimeError::AlreadyCompleted(id)));
            prop_assert_eq!(store.read(id).unwrap(), Some(first));
        }

        #[test]
        fn live_ids_stay_unique(ops in proptest::collection::vec(any::<bool>(), 1..64)) {
            let mut store = FutureStore::new();
            let mut live: Vec<FutureId> = Vec::new();

            for create in ops {
                if create || live.is_empty() {
                    let id = store.create().unwrap();
                    prop_assert!(!live.contains(&id));
                    live.push(id);
                } else {
                    let id = live.remove(0);
                    store.submit(id, Payload::Int(0)).unwrap();
                    store.destroy(id).unwrap();
                }
            }

            prop_assert_eq!(store.len(), live.len());
        }
    }
}
