use std::time::Duration;

use kbcache::ResourcePool;

/// Test: capacity 2, keys inserted in order A, B, C leaves {B, C}
#[tokio::test]
async fn insertion_beyond_capacity_evicts_oldest() {
    let pool: ResourcePool<String, u32> = ResourcePool::new(Some(2));
    for (key, value) in [("A", 1), ("B", 2), ("C", 3)] {
        pool.get_or_create(key.to_string(), || async move { Ok(value) })
            .await
            .unwrap();
    }

    assert_eq!(pool.len().await, 2);
    assert!(!pool.contains(&"A".to_string()).await);
    assert!(pool.contains(&"B".to_string()).await);
    assert!(pool.contains(&"C".to_string()).await);
}

/// Test: accessing a key moves it to most-recently-used, so inserting
/// other keys up to capacity does not evict it
#[tokio::test]
async fn recent_access_protects_from_eviction() {
    let pool: ResourcePool<String, u32> = ResourcePool::new(Some(3));
    for (key, value) in [("A", 1), ("B", 2), ("C", 3)] {
        pool.get_or_create(key.to_string(), || async move { Ok(value) })
            .await
            .unwrap();
    }

    // Touch "A"; the next two insertions must evict B and C instead.
    pool.get(&"A".to_string()).await.unwrap();
    for (key, value) in [("D", 4), ("E", 5)] {
        pool.get_or_create(key.to_string(), || async move { Ok(value) })
            .await
            .unwrap();
    }

    assert!(pool.contains(&"A".to_string()).await);
    assert!(!pool.contains(&"B".to_string()).await);
    assert!(!pool.contains(&"C".to_string()).await);
}

/// Test: acquiring an entry also counts as access for LRU purposes
#[tokio::test]
async fn acquire_updates_recency() {
    let pool: ResourcePool<String, u32> = ResourcePool::new(Some(2));
    pool.get_or_create("A".to_string(), || async { Ok(1) })
        .await
        .unwrap();
    let entry_b = pool
        .get_or_create("B".to_string(), || async { Ok(2) })
        .await
        .unwrap();

    // "A" was refreshed by the hit below, then acquiring "B" makes it
    // the most recent again; the next insertion evicts "A".
    pool.get(&"A".to_string()).await.unwrap();
    drop(entry_b.acquire().await.unwrap());

    pool.get_or_create("C".to_string(), || async { Ok(3) })
        .await
        .unwrap();

    assert!(!pool.contains(&"A".to_string()).await);
    assert!(pool.contains(&"B".to_string()).await);
    assert!(pool.contains(&"C".to_string()).await);
}

/// Test: an entry whose construction is in flight is never evicted
#[tokio::test]
async fn loading_entries_survive_capacity_checks() {
    let pool: ResourcePool<String, u32> = ResourcePool::new(Some(1));

    let slow = {
        let pool = pool.clone();
        tokio::spawn(async move {
            pool.get_or_create("slow".to_string(), || async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(0)
            })
            .await
            .unwrap()
        })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    for i in 1..=3u32 {
        pool.get_or_create(format!("fast-{i}"), || async move { Ok(i) })
            .await
            .unwrap();
    }

    slow.await.unwrap();
    assert!(pool.contains(&"slow".to_string()).await);
    assert_eq!(pool.len().await, 1);
}

/// Test: an unbounded pool never evicts
#[tokio::test]
async fn unbounded_pool_keeps_everything() {
    let pool: ResourcePool<String, u32> = ResourcePool::unbounded();
    for i in 0..32u32 {
        pool.get_or_create(format!("k{i}"), || async move { Ok(i) })
            .await
            .unwrap();
    }
    assert_eq!(pool.len().await, 32);
}
