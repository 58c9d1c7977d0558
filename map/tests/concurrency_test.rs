//! Concurrency properties of `ConcurrentMap` under real thread contention.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use pwt_map::ConcurrentMap;

#[test]
fn disjoint_key_interleavings_balance() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 200;

    let map: ConcurrentMap<usize, usize> = ConcurrentMap::new();
    thread::scope(|scope| {
        for t in 0..THREADS {
            let map = &map;
            scope.spawn(move || {
                let base = t * PER_THREAD;
                for i in 0..PER_THREAD {
                    assert!(map.insert(base + i, t));
                }
                // Erase every other key this thread inserted.
                for i in (0..PER_THREAD).step_by(2) {
                    map.erase(&(base + i));
                }
            });
        }
    });

    // inserted - erased, per thread.
    assert_eq!(map.len(), THREADS * PER_THREAD / 2);
}

#[test]
fn insert_is_first_writer_wins_under_contention() {
    const THREADS: usize = 8;

    let map: ConcurrentMap<&str, usize> = ConcurrentMap::new();
    let winners = AtomicUsize::new(0);
    thread::scope(|scope| {
        for t in 0..THREADS {
            let map = &map;
            let winners = &winners;
            scope.spawn(move || {
                if map.insert("contested", t) {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(map.len(), 1);
}

#[test]
fn concurrent_pair_begin_hands_each_entry_to_one_taker() {
    const ENTRIES: usize = 500;
    const TAKERS: usize = 4;

    let map: ConcurrentMap<usize, usize> = ConcurrentMap::new();
    for i in 0..ENTRIES {
        map.store(i, i);
    }

    let mut taken: Vec<Vec<usize>> = Vec::new();
    thread::scope(|scope| {
        let handles: Vec<_> = (0..TAKERS)
            .map(|_| {
                let map = &map;
                scope.spawn(move || {
                    let mut mine = Vec::new();
                    while let Some((k, _)) = map.pair_begin() {
                        mine.push(k);
                    }
                    mine
                })
            })
            .collect();
        for handle in handles {
            if let Ok(mine) = handle.join() {
                taken.push(mine);
            }
        }
    });

    let all: Vec<usize> = taken.into_iter().flatten().collect();
    let unique: HashSet<usize> = all.iter().copied().collect();
    assert_eq!(all.len(), ENTRIES, "every entry taken exactly once");
    assert_eq!(unique.len(), ENTRIES, "no entry taken twice");
    assert!(map.is_empty());
}

#[test]
fn range_fans_out_over_every_pair() {
    const ENTRIES: usize = 256;

    let map: ConcurrentMap<usize, usize> = ConcurrentMap::new();
    for i in 0..ENTRIES {
        map.store(i, 1);
    }

    let visits = AtomicUsize::new(0);
    map.range(|_, v| {
        visits.fetch_add(*v, Ordering::Relaxed);
    });
    assert_eq!(visits.load(Ordering::Relaxed), ENTRIES);
}

#[test]
fn copy_from_both_directions_concurrently() {
    // Exercises the fixed lock order on symmetric two-map traffic.
    let a: ConcurrentMap<usize, usize> = ConcurrentMap::new();
    let b: ConcurrentMap<usize, usize> = ConcurrentMap::new();
    for i in 0..32 {
        a.store(i, 1);
        b.store(i, 2);
    }

    thread::scope(|scope| {
        let (a1, b1) = (&a, &b);
        scope.spawn(move || {
            for _ in 0..100 {
                a1.copy_from(b1);
            }
        });
        let (a2, b2) = (&a, &b);
        scope.spawn(move || {
            for _ in 0..100 {
                b2.copy_from(a2);
            }
        });
    });

    // Contents converged to one side or the other; no deadlock, no tear.
    assert_eq!(a.len(), 32);
    assert_eq!(b.len(), 32);
}
