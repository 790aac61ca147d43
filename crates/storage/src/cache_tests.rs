// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tb_core::FakeClock;

fn cache(clock: &FakeClock) -> SpecCache<String, FakeClock> {
    SpecCache::new(Duration::from_secs(60), clock.clone())
}

#[test]
fn hit_until_ttl() {
    let clock = FakeClock::new();
    let cache = cache(&clock);
    let p = ProjectId::new();
    cache.insert(p, "h1", "dag".to_string());
    assert_eq!(cache.get(p, "h1").as_deref().map(String::as_str), Some("dag"));
    assert!(cache.get(p, "h2").is_none());

    clock.advance(Duration::from_secs(60));
    assert!(cache.get(p, "h1").is_none());
}

#[test]
fn invalidate_is_per_project() {
    let clock = FakeClock::new();
    let cache = cache(&clock);
    let (p1, p2) = (ProjectId::new(), ProjectId::new());
    cache.insert(p1, "h", "one".to_string());
    cache.insert(p2, "h", "two".to_string());
    cache.invalidate(p1);
    assert!(cache.get(p1, "h").is_none());
    assert!(cache.get(p2, "h").is_some());
    assert_eq!(cache.len(), 1);
}

#[test]
fn insert_evicts_expired_entries() {
    let clock = FakeClock::new();
    let cache = cache(&clock);
    cache.insert(ProjectId::new(), "old", "x".to_string());
    clock.advance(Duration::from_secs(61));
    cache.insert(ProjectId::new(), "new", "y".to_string());
    assert_eq!(cache.len(), 1);
}

#[test]
fn concurrent_readers_and_writer() {
    let clock = FakeClock::new();
    let cache = Arc::new(cache(&clock));
    let p = ProjectId::new();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for n in 0..100 {
                    if i == 0 {
                        cache.insert(p, &format!("h{n}"), n.to_string());
                    } else {
                        let _ = cache.get(p, "h1");
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(cache.len(), 100);
}

#[yare::parameterized(
    same_value   = { &["a", "b"], &["a", "b"], true },
    reordered    = { &["a", "b"], &["b", "a"], false },
    different    = { &["a"], &["c"], false },
)]
fn hash_tracks_content(left: &[&str], right: &[&str], equal: bool) {
    assert_eq!(content_hash(left) == content_hash(right), equal);
    assert_eq!(content_hash(left).len(), 64);
}
