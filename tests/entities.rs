use strata::engine::entity::EntityPool;

#[test]
fn acquire_hands_out_lowest_ids_first() {
    let mut pool = EntityPool::new(4);
    assert_eq!(pool.acquire(), Some(0));
    assert_eq!(pool.acquire(), Some(1));
    assert_eq!(pool.acquire(), Some(2));
    assert_eq!(pool.acquire(), Some(3));
    assert_eq!(pool.acquire(), None);
}

#[test]
fn counts_track_acquire_and_release() {
    let mut pool = EntityPool::new(8);
    assert_eq!(pool.capacity(), 8);
    assert_eq!(pool.occupied_count(), 0);
    assert_eq!(pool.available_count(), 8);

    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    assert_eq!(pool.occupied_count(), 2);
    assert_eq!(pool.available_count(), 6);

    assert!(pool.release(a));
    assert_eq!(pool.occupied_count(), 1);
    assert!(pool.is_occupied(b));
    assert!(!pool.is_occupied(a));
}

#[test]
fn release_rejects_free_and_out_of_range_ids() {
    let mut pool = EntityPool::new(2);
    assert!(!pool.release(0), "id was never acquired");
    assert!(!pool.release(7), "id is out of range");

    let id = pool.acquire().unwrap();
    assert!(pool.release(id));
    assert!(!pool.release(id), "double release");
}

#[test]
fn released_ids_are_reused() {
    let mut pool = EntityPool::new(2);
    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    assert_eq!(pool.acquire(), None);

    pool.release(a);
    let c = pool.acquire().unwrap();
    assert_eq!(c, a, "freed id goes back into circulation");
    assert!(pool.is_occupied(b));
}

#[test]
fn iter_occupied_is_ascending() {
    let mut pool = EntityPool::new(8);
    for _ in 0..5 {
        pool.acquire();
    }
    pool.release(1);
    pool.release(3);

    let occupied: Vec<u32> = pool.iter_occupied().collect();
    assert_eq!(occupied, vec![0, 2, 4]);
}
