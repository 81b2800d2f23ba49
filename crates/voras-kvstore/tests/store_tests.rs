use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use voras_kvstore::{KeyValueFile, KvAction, WatchEvent, Watcher};

type Seen = Arc<Mutex<Vec<(String, WatchEvent, Option<String>, Option<String>)>>>;

fn recording_watcher() -> (Seen, Arc<dyn Watcher>) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let watcher: Arc<dyn Watcher> = Arc::new(
        move |key: &str, event: WatchEvent, old: Option<&str>, new: Option<&str>| {
            sink.lock().push((
                key.to_string(),
                event,
                old.map(str::to_string),
                new.map(str::to_string),
            ));
        },
    );
    (seen, watcher)
}

#[test]
fn two_watches_on_one_key_each_see_one_identical_event() {
    let dir = TempDir::new().unwrap();
    let store = KeyValueFile::open(dir.path().join("dss.properties")).unwrap();
    let (seen_a, a) = recording_watcher();
    let (seen_b, b) = recording_watcher();
    store.watch(a, "dss.zos.image");
    store.watch(b, "dss.zos.image");

    store.set("dss.zos.image", "MV2C").unwrap();

    let a = seen_a.lock().clone();
    let b = seen_b.lock().clone();
    assert_eq!(a.len(), 1);
    assert_eq!(a, b);
    assert_eq!(
        a[0],
        (
            "dss.zos.image".to_string(),
            WatchEvent::New,
            None,
            Some("MV2C".to_string())
        )
    );
}

#[test]
fn concurrent_cas_increments_are_never_lost() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("counter.properties");
    let threads = 4;
    let per_thread = 15;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            // A separate store per thread stands in for a separate process.
            let store = KeyValueFile::open(&path).unwrap();
            thread::spawn(move || {
                for _ in 0..per_thread {
                    loop {
                        let current = store.get("counter").unwrap();
                        let next = current
                            .as_deref()
                            .map_or(1, |v| v.parse::<u32>().unwrap() + 1)
                            .to_string();
                        if store.set_atomic("counter", current.as_deref(), &next).unwrap() {
                            break;
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let store = KeyValueFile::open(&path).unwrap();
    assert_eq!(
        store.get("counter").unwrap().as_deref(),
        Some((threads * per_thread).to_string().as_str())
    );
}

#[test]
fn failed_batch_delivers_no_events() {
    let dir = TempDir::new().unwrap();
    let store = KeyValueFile::open(dir.path().join("dss.properties")).unwrap();
    let (seen, watcher) = recording_watcher();
    store.watch_prefix(watcher, "");

    let err = store
        .perform_actions(&[
            KvAction::update("a", "1"),
            KvAction::swap("b", Some("expected"), "2"),
        ])
        .unwrap_err();
    assert!(err.is_match_failure());
    assert!(seen.lock().is_empty());
}

#[derive(Debug, Clone)]
enum Op {
    Set(u8, u8),
    Delete(u8),
    Swap(u8, Option<u8>, u8),
    DeletePrefix,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4, 0u8..3).prop_map(|(k, v)| Op::Set(k, v)),
        (0u8..4).prop_map(Op::Delete),
        (0u8..4, proptest::option::of(0u8..3), 0u8..3).prop_map(|(k, o, n)| Op::Swap(k, o, n)),
        Just(Op::DeletePrefix),
    ]
}

fn key(k: u8) -> String {
    if k % 2 == 0 {
        format!("run.{k}")
    } else {
        format!("res.{k}")
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn store_matches_map_model(ops in proptest::collection::vec(op(), 1..20)) {
        let dir = TempDir::new().unwrap();
        let store = KeyValueFile::open(dir.path().join("model.properties")).unwrap();
        let mut model: BTreeMap<String, String> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Set(k, v) => {
                    store.set(&key(k), &v.to_string()).unwrap();
                    model.insert(key(k), v.to_string());
                }
                Op::Delete(k) => {
                    store.delete(&key(k)).unwrap();
                    model.remove(&key(k));
                }
                Op::Swap(k, old, new) => {
                    let old = old.map(|o| o.to_string());
                    let swapped = store.set_atomic(&key(k), old.as_deref(), &new.to_string()).unwrap();
                    let expected = model.get(&key(k)) == old.as_ref();
                    prop_assert_eq!(swapped, expected);
                    if expected {
                        model.insert(key(k), new.to_string());
                    }
                }
                Op::DeletePrefix => {
                    store.delete_prefix("run.").unwrap();
                    model.retain(|k, _| !k.starts_with("run."));
                }
            }
        }

        prop_assert_eq!(store.get_prefix("").unwrap(), model);
    }
}
