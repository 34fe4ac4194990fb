//! Chunkserver Integration Tests
//!
//! Store behaviour exercised against both backends:
//! - Chunk lifecycle (write, read, overwrite, delete)
//! - Bulk operations (delete_all, stats)
//! - Concurrency
//! - Input rejection

use std::sync::Arc;
use std::thread;

use assert_matches::assert_matches;
use bytes::Bytes;
use tempfile::TempDir;

use chunkserver::{ChunkStore, Error, StoreConfig, StoreStatus};

// =============================================================================
// Fixtures
// =============================================================================

struct Fixture {
    name: &'static str,
    store: ChunkStore,
    _dir: Option<TempDir>,
}

fn disk_fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        storage_path: dir.path().join("chunks"),
        node_id: "it-disk".to_string(),
        ..Default::default()
    };
    Fixture {
        name: "disk",
        store: ChunkStore::open(&config).unwrap(),
        _dir: Some(dir),
    }
}

fn memory_fixture() -> Fixture {
    Fixture {
        name: "memory",
        store: ChunkStore::open(&StoreConfig::in_memory("it-memory")).unwrap(),
        _dir: None,
    }
}

fn fixtures() -> Vec<Fixture> {
    vec![disk_fixture(), memory_fixture()]
}

// =============================================================================
// Chunk Lifecycle
// =============================================================================

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for f in fixtures() {
            let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
            f.store.write("obj", 0, payload.clone()).unwrap();
            assert_eq!(f.store.read("obj", 0).unwrap(), Bytes::from(payload), "{}", f.name);
        }
    }

    #[test]
    fn test_empty_payload_round_trip() {
        for f in fixtures() {
            f.store.write("empty", 7, Bytes::new()).unwrap();
            assert!(f.store.exists("empty", 7).unwrap(), "{}", f.name);
            assert!(f.store.read("empty", 7).unwrap().is_empty(), "{}", f.name);
        }
    }

    #[test]
    fn test_overwrite_replaces() {
        for f in fixtures() {
            f.store.write("obj", 1, &b"a much longer first payload"[..]).unwrap();
            f.store.write("obj", 1, &b"short"[..]).unwrap();
            assert_eq!(f.store.read("obj", 1).unwrap(), Bytes::from_static(b"short"), "{}", f.name);
        }
    }

    #[test]
    fn test_delete_is_idempotent() {
        for f in fixtures() {
            f.store.write("obj", 0, &b"x"[..]).unwrap();
            assert!(f.store.delete("obj", 0).unwrap(), "{}", f.name);
            assert!(!f.store.delete("obj", 0).unwrap(), "{}", f.name);
            assert!(!f.store.exists("obj", 0).unwrap(), "{}", f.name);
        }
    }

    #[test]
    fn test_not_found_semantics() {
        for f in fixtures() {
            assert_matches!(f.store.read("ghost", 3), Err(Error::ChunkNotFound { .. }));
            assert!(!f.store.exists("ghost", 3).unwrap(), "{}", f.name);
            assert!(!f.store.delete("ghost", 3).unwrap(), "{}", f.name);
        }
    }

    #[test]
    fn test_key_isolation() {
        for f in fixtures() {
            f.store.write("A", 1, &b"a1"[..]).unwrap();
            f.store.write("A", 2, &b"a2"[..]).unwrap();
            f.store.write("B", 1, &b"b1"[..]).unwrap();

            f.store.delete("A", 1).unwrap();

            assert!(!f.store.exists("A", 1).unwrap(), "{}", f.name);
            assert_eq!(f.store.read("A", 2).unwrap(), Bytes::from_static(b"a2"));
            assert_eq!(f.store.read("B", 1).unwrap(), Bytes::from_static(b"b1"));
        }
    }

    #[test]
    fn test_max_chunk_index() {
        for f in fixtures() {
            f.store.write("obj", u32::MAX, &b"tail"[..]).unwrap();
            assert_eq!(f.store.read("obj", u32::MAX).unwrap(), Bytes::from_static(b"tail"));
        }
    }
}

// =============================================================================
// Bulk Operations
// =============================================================================

mod bulk_tests {
    use super::*;

    #[test]
    fn test_delete_all_scope_and_count() {
        for f in fixtures() {
            for i in 0..5 {
                f.store.write("doomed", i, &b"data"[..]).unwrap();
            }
            f.store.write("survivor", 0, &b"data"[..]).unwrap();
            // Shares a prefix with "doomed" but is a different object
            f.store.write("doomed_chunk_1", 0, &b"data"[..]).unwrap();

            assert_eq!(f.store.delete_all("doomed").unwrap(), 5, "{}", f.name);
            assert_eq!(f.store.delete_all("doomed").unwrap(), 0, "{}", f.name);

            assert!(f.store.exists("survivor", 0).unwrap());
            assert!(f.store.exists("doomed_chunk_1", 0).unwrap());
            for i in 0..5 {
                assert!(!f.store.exists("doomed", i).unwrap());
            }
        }
    }

    #[test]
    fn test_stats_consistency() {
        for f in fixtures() {
            let sizes = [0usize, 1, 100, 4096, 65_536];
            for (i, size) in sizes.iter().enumerate() {
                f.store.write("sized", i as u32, vec![7u8; *size]).unwrap();
            }

            let stats = f.store.stats().unwrap();
            assert_eq!(stats.total_chunks, sizes.len() as u64, "{}", f.name);
            assert_eq!(stats.total_bytes, sizes.iter().sum::<usize>() as u64, "{}", f.name);
            assert_eq!(stats.status, StoreStatus::Ok);
            assert_eq!(stats.node_id, format!("it-{}", f.name));

            f.store.delete_all("sized").unwrap();
            let stats = f.store.stats().unwrap();
            assert_eq!(stats.total_chunks, 0);
            assert_eq!(stats.total_bytes, 0);
        }
    }

    #[test]
    fn test_stats_when_root_removed() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("chunks");
        let config = StoreConfig {
            storage_path: root.clone(),
            ..Default::default()
        };
        let store = ChunkStore::open(&config).unwrap();
        store.write("obj", 0, &b"x"[..]).unwrap();

        std::fs::remove_dir_all(&root).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.status, StoreStatus::DirectoryNotFound);
        assert_eq!(stats.total_chunks, 0);
    }
}

// =============================================================================
// Concurrency
// =============================================================================

mod concurrency_tests {
    use super::*;

    #[test]
    fn test_concurrent_distinct_key_writes() {
        for f in fixtures() {
            let store = Arc::new(f.store);
            let handles: Vec<_> = (0..8u32)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..25u32 {
                            let payload = format!("thread-{}-chunk-{}", t, i);
                            store.write(&format!("obj-{}", t), i, payload.into_bytes()).unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            for t in 0..8u32 {
                for i in 0..25u32 {
                    let data = store.read(&format!("obj-{}", t), i).unwrap();
                    let expected = Bytes::from(format!("thread-{}-chunk-{}", t, i));
                    assert_eq!(data, expected, "{}", f.name);
                }
            }
            assert_eq!(store.stats().unwrap().total_chunks, 200);
        }
    }

    #[test]
    fn test_same_key_writers_never_tear() {
        const SIZE: usize = 32 * 1024;

        for f in fixtures() {
            let store = Arc::new(f.store);
            let writers: Vec<_> = (1..=4u8)
                .map(|fill| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for _ in 0..20 {
                            store.write("hot", 0, vec![fill; SIZE]).unwrap();
                        }
                    })
                })
                .collect();

            let reader = {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        match store.read("hot", 0) {
                            Ok(data) => {
                                assert_eq!(data.len(), SIZE);
                                assert!(data.iter().all(|b| *b == data[0]));
                            }
                            Err(Error::ChunkNotFound { .. }) => {}
                            Err(e) => panic!("unexpected read error: {}", e),
                        }
                    }
                })
            };

            for handle in writers {
                handle.join().unwrap();
            }
            reader.join().unwrap();

            let last = store.read("hot", 0).unwrap();
            assert_eq!(last.len(), SIZE, "{}", f.name);
            assert!((1..=4).contains(&last[0]));
        }
    }
}

// =============================================================================
// Input Rejection
// =============================================================================

mod rejection_tests {
    use super::*;

    #[test]
    fn test_malformed_base64_leaves_store_unchanged() {
        for f in fixtures() {
            f.store.write_encoded("obj", 0, "b3JpZ2luYWw=").unwrap();

            assert_matches!(
                f.store.write_encoded("obj", 0, "not*base64!"),
                Err(Error::Encoding { .. })
            );
            assert_matches!(
                f.store.write_encoded("obj", 1, "%%%"),
                Err(Error::Encoding { .. })
            );

            assert_eq!(
                f.store.read("obj", 0).unwrap(),
                Bytes::from_static(b"original"),
                "{}",
                f.name
            );
            assert!(!f.store.exists("obj", 1).unwrap());
        }
    }

    #[test]
    fn test_traversal_rejected() {
        for f in fixtures() {
            for bad in ["../x", "a/b", "..", ".", "a\\b", ""] {
                assert_matches!(f.store.write(bad, 0, &b"x"[..]), Err(Error::Validation(_)));
                assert_matches!(f.store.read(bad, 0), Err(Error::Validation(_)));
                assert_matches!(f.store.exists(bad, 0), Err(Error::Validation(_)));
                assert_matches!(f.store.delete(bad, 0), Err(Error::Validation(_)));
                assert_matches!(f.store.delete_all(bad), Err(Error::Validation(_)));
            }
            assert_eq!(f.store.stats().unwrap().total_chunks, 0, "{}", f.name);
        }
    }

    #[test]
    fn test_traversal_never_escapes_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("chunks");
        let config = StoreConfig {
            storage_path: root,
            ..Default::default()
        };
        let store = ChunkStore::open(&config).unwrap();

        let _ = store.write("../escaped", 0, &b"x"[..]);

        let leaked: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "chunks")
            .collect();
        assert!(leaked.is_empty());
    }
}
