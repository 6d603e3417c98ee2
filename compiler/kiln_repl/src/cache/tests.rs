use super::*;
use pretty_assertions::assert_eq;

fn key(project: ProjectId, text: &str) -> CacheKey {
    CacheKey::new(project, text, Some(text.len()))
}

#[test]
fn key_distinguishes_project_text_and_caret() {
    let project = ProjectId::fresh();
    let other = ProjectId::fresh();
    assert_eq!(CacheKey::new(project, "x + 1", Some(3)), CacheKey::new(project, "x + 1", Some(3)));
    assert_ne!(CacheKey::new(project, "x + 1", Some(3)), CacheKey::new(project, "x + 2", Some(3)));
    assert_ne!(CacheKey::new(project, "x + 1", Some(3)), CacheKey::new(project, "x + 1", Some(4)));
    assert_ne!(CacheKey::new(project, "x + 1", None), CacheKey::new(other, "x + 1", None));
}

#[test]
fn second_lookup_is_a_hit() {
    let cache = ResultCache::new(8, Duration::from_secs(60));
    let project = ProjectId::fresh();
    let mut computed = 0;

    for _ in 0..3 {
        let value = cache.get_or_insert_with(key(project, "abc"), || {
            computed += 1;
            "result".to_string()
        });
        assert_eq!(value, "result");
    }
    assert_eq!(computed, 1);
    assert_eq!((cache.hits(), cache.misses()), (2, 1));
}

#[test]
fn expired_entries_are_recomputed() {
    let cache = ResultCache::new(8, Duration::from_secs(2));
    let project = ProjectId::fresh();
    let start = Instant::now();

    assert_eq!(cache.get_or_insert_with_at(key(project, "a"), start, || 1), 1);
    let soon = start + Duration::from_secs(1);
    assert_eq!(cache.get_or_insert_with_at(key(project, "a"), soon, || 2), 1);
    let later = start + Duration::from_secs(3);
    assert_eq!(cache.get_or_insert_with_at(key(project, "a"), later, || 3), 3);
    assert_eq!(cache.len(), 1);
}

#[test]
fn capacity_evicts_oldest_first() {
    let cache = ResultCache::new(2, Duration::from_secs(60));
    let project = ProjectId::fresh();
    let start = Instant::now();

    cache.get_or_insert_with_at(key(project, "a"), start, || 'a');
    cache.get_or_insert_with_at(key(project, "b"), start + Duration::from_millis(1), || 'b');
    cache.get_or_insert_with_at(key(project, "c"), start + Duration::from_millis(2), || 'c');
    assert_eq!(cache.len(), 2);

    // "b" survived, "a" was evicted.
    let now = start + Duration::from_millis(3);
    assert_eq!(cache.get_or_insert_with_at(key(project, "b"), now, || 'x'), 'b');
    assert_eq!(cache.get_or_insert_with_at(key(project, "a"), now, || 'y'), 'y');
}

#[test]
fn expired_entries_are_evicted_before_live_ones() {
    let cache = ResultCache::new(2, Duration::from_secs(5));
    let project = ProjectId::fresh();
    let start = Instant::now();

    cache.get_or_insert_with_at(key(project, "old"), start, || 0);
    cache.get_or_insert_with_at(key(project, "live"), start + Duration::from_secs(4), || 1);
    cache.get_or_insert_with_at(key(project, "new"), start + Duration::from_secs(6), || 2);

    let now = start + Duration::from_secs(6);
    assert_eq!(cache.get_or_insert_with_at(key(project, "live"), now, || 9), 1);
    assert_eq!(cache.len(), 2);
}

#[test]
fn concurrent_readers_share_one_cache() {
    let cache = ResultCache::new(64, Duration::from_secs(60));
    let project = ProjectId::fresh();
    std::thread::scope(|scope| {
        for worker in 0..4 {
            let cache = &cache;
            scope.spawn(move || {
                for i in 0..16 {
                    let text = format!("{}", i % 8);
                    let value = cache.get_or_insert_with(key(project, &text), || text.clone());
                    assert_eq!(value, text, "worker {worker}");
                }
            });
        }
    });
    assert_eq!(cache.len(), 8);
}
