/*!
 * Arena Concurrency Tests
 * Shared arenas under parallel allocation and first use
 */

use hetero_arena::arena::{ArenaCore, BasicArena, HostBackend, OomPolicy};
use hetero_arena::registry::{ArenaRegistry, RegistryConfig, StrategyKind};
use hetero_arena::{Arena, ArenaError, MemoryPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 4;
const BLOCKS_PER_THREAD: usize = 1000;

fn assert_disjoint(mut ranges: Vec<(usize, usize)>) {
    ranges.sort_unstable();
    for pair in ranges.windows(2) {
        assert!(
            pair[0].0 + pair[0].1 <= pair[1].0,
            "blocks at 0x{:x} and 0x{:x} overlap",
            pair[0].0,
            pair[1].0
        );
    }
}

fn hammer(arena: Arc<dyn Arena>) -> Vec<(usize, usize)> {
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let arena = Arc::clone(&arena);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..BLOCKS_PER_THREAD)
                    .map(|_| {
                        let block = arena.alloc(64).unwrap();
                        (block.as_ptr() as usize, 64)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect()
}

#[test]
fn test_parallel_allocations_never_overlap() {
    for strategy in [StrategyKind::Pool, StrategyKind::Basic] {
        let registry = ArenaRegistry::new(RegistryConfig {
            strategy,
            ..RegistryConfig::testing()
        });
        let arena = registry.default_arena().unwrap();

        let ranges = hammer(Arc::clone(&arena));
        assert_eq!(ranges.len(), THREADS * BLOCKS_PER_THREAD);
        assert_eq!(arena.usage().live_blocks, THREADS * BLOCKS_PER_THREAD);
        assert_disjoint(ranges.clone());

        for (address, _) in ranges {
            arena.free(address as *mut u8).unwrap();
        }
        assert_eq!(arena.usage().outstanding_bytes, 0);
    }
}

#[test]
fn test_parallel_free_and_realloc() {
    let registry = ArenaRegistry::new(RegistryConfig::testing());
    let arena = registry.host_arena().unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let arena = Arc::clone(&arena);
            thread::spawn(move || {
                for round in 0..200 {
                    let size = 16 * (1 + (t + round) % 32);
                    let block = arena.alloc(size).unwrap();
                    // SAFETY: the block holds at least `size` bytes owned by this thread
                    unsafe { std::ptr::write_bytes(block.as_ptr(), t as u8, size) };
                    arena.free(block.as_ptr()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let usage = arena.usage();
    assert_eq!(usage.live_blocks, 0);
    assert_eq!(usage.total_allocations, (THREADS * 200) as u64);
}

#[test]
fn test_concurrent_first_use_yields_one_arena() {
    let registry = Arc::new(ArenaRegistry::new(RegistryConfig::testing()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.managed_arena().unwrap()
            })
        })
        .collect();
    let arenas: Vec<Arc<dyn Arena>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for arena in &arenas[1..] {
        assert!(Arc::ptr_eq(&arenas[0], arena));
    }
}

#[test]
fn test_refused_request_does_not_starve_small_requests() {
    let arena = Arc::new(BasicArena::new(
        ArenaCore::new("capped", MemoryPolicy::device(), Arc::new(HostBackend::new()))
            .with_max_system_bytes(Some(64 * 1024))
            .with_oom_policy(OomPolicy::ReturnError),
    ));
    let stop = Arc::new(AtomicBool::new(false));

    let oversized = {
        let arena = Arc::clone(&arena);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut refused = 0u64;
            loop {
                match arena.alloc(1 << 20) {
                    Err(ArenaError::OutOfMemory { .. }) => refused += 1,
                    other => panic!("Expected OutOfMemory, got {:?}", other),
                }
                if stop.load(Ordering::Relaxed) {
                    break;
                }
            }
            refused
        })
    };

    let mut spurious = 0;
    for _ in 0..50_000 {
        match arena.alloc(16) {
            Ok(block) => arena.free(block.as_ptr()).unwrap(),
            Err(_) => spurious += 1,
        }
    }
    stop.store(true, Ordering::Relaxed);
    let refused = oversized.join().unwrap();

    assert_eq!(spurious, 0, "small requests failed while a refused request was in flight");
    assert!(refused > 0);
    assert_eq!(arena.usage().system_bytes, 0);
}
