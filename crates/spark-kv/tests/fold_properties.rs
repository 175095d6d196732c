use proptest::prelude::*;
use serde_json::json;
use spark_kv::KvStore;
use spark_test_utils::{session_over, ControlledStore};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Op {
    Push(i64),
    DropFirst,
    Reverse,
    Double,
}

impl Op {
    fn apply(self, items: &[i64]) -> Vec<i64> {
        let mut items = items.to_vec();
        match self {
            Op::Push(n) => items.push(n),
            Op::DropFirst => {
                if !items.is_empty() {
                    items.remove(0);
                }
            }
            Op::Reverse => items.reverse(),
            Op::Double => items.iter_mut().for_each(|n| *n = n.wrapping_mul(2)),
        }
        items
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i64>().prop_map(Op::Push),
        Just(Op::DropFirst),
        Just(Op::Reverse),
        Just(Op::Double),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_local_value_is_left_fold(
        initial in proptest::collection::vec(any::<i64>(), 0..8),
        ops in proptest::collection::vec(op_strategy(), 0..24),
    ) {
        runtime().block_on(async {
            let store = Arc::new(ControlledStore::with_entries([("fold", json!(initial))]));
            let session = session_over(store.clone());
            let handle = session.use_kv("fold", Vec::<i64>::new()).unwrap();
            handle.hydrated().await;

            // Every write stays pending while the updates are issued.
            store.hold_writes();
            for op in &ops {
                let op = *op;
                handle.update(move |items| op.apply(items)).unwrap();
            }

            let expected = ops.iter().fold(initial.clone(), |acc, op| op.apply(&acc));
            prop_assert_eq!(&*handle.get(), &expected);

            store.release_writes();
            session.flush().await;
            let stored = store.get("fold").await.unwrap().unwrap();
            prop_assert_eq!(stored, json!(expected));
            Ok(())
        })?;
    }

    #[test]
    fn prop_round_trip_any_list(values in proptest::collection::vec(".{0,12}", 0..10)) {
        runtime().block_on(async {
            let store = Arc::new(ControlledStore::new());

            let writer = session_over(store.clone());
            let handle = writer.use_kv("list", vec!["seed".to_string()]).unwrap();
            handle.hydrated().await;
            handle.set(values.clone()).unwrap();
            writer.flush().await;

            let reader = session_over(store.clone());
            let reloaded = reader.use_kv("list", vec!["seed".to_string()]).unwrap();
            prop_assert_eq!(&*reloaded.hydrated().await, &values);
            Ok(())
        })?;
    }
}
