/*!
 * Arena Strategy Tests
 * Behavior shared by the basic and pool strategies
 */

use hetero_arena::arena::{
    is_aligned, zero_sized_block, ArenaCore, BasicArena, HostBackend, OomPolicy, PoolArena,
    PoolOptions,
};
use hetero_arena::{Arena, ArenaError, MemoryPolicy};
use pretty_assertions::assert_eq;
use rand::Rng;
use std::sync::Arc;

fn core(name: &str, policy: MemoryPolicy) -> ArenaCore {
    ArenaCore::new(name, policy, Arc::new(HostBackend::new())).with_oom_policy(OomPolicy::ReturnError)
}

fn strategies(policy: MemoryPolicy) -> Vec<Box<dyn Arena>> {
    vec![
        Box::new(BasicArena::new(core("basic", policy))),
        Box::new(PoolArena::new(
            core("pool", policy),
            PoolOptions {
                chunk_size: 16 * 1024,
                coalesce_interval: 8,
            },
        )),
    ]
}

#[test]
fn test_every_block_is_aligned() {
    for policy in [
        MemoryPolicy::host(),
        MemoryPolicy::pinned(),
        MemoryPolicy::device(),
        MemoryPolicy::managed(),
    ] {
        for arena in strategies(policy) {
            for size in [1, 7, 16, 17, 100, 4095, 4096, 20_000] {
                let block = arena.alloc(size).unwrap();
                assert!(
                    is_aligned(block.as_ptr() as usize),
                    "{} returned unaligned block for {} bytes",
                    arena.name(),
                    size
                );
                arena.free(block.as_ptr()).unwrap();
            }
        }
    }
}

#[test]
fn test_blocks_are_writable() {
    for arena in strategies(MemoryPolicy::managed()) {
        let block = arena.alloc(100).unwrap();
        // SAFETY: block is 100 live bytes owned by this test
        unsafe {
            std::ptr::write_bytes(block.as_ptr(), 0xAB, 100);
            assert_eq!(*block.as_ptr().add(99), 0xAB);
        }
        arena.free(block.as_ptr()).unwrap();
    }
}

#[test]
fn test_zero_size_request() {
    for arena in strategies(MemoryPolicy::host()) {
        let block = arena.alloc(0).unwrap();
        assert_eq!(block, zero_sized_block());
        arena.free(block.as_ptr()).unwrap();
        assert_eq!(arena.usage().live_blocks, 0);
    }
}

#[test]
fn test_free_null_is_noop() {
    for arena in strategies(MemoryPolicy::host()) {
        arena.free(std::ptr::null_mut()).unwrap();
        assert_eq!(arena.usage().total_allocations, 0);
    }
}

#[test]
fn test_usage_tracks_aligned_sizes() {
    for arena in strategies(MemoryPolicy::device()) {
        let a = arena.alloc(1).unwrap();
        let b = arena.alloc(33).unwrap();

        let usage = arena.usage();
        assert_eq!(usage.outstanding_bytes, 16 + 48);
        assert_eq!(usage.live_blocks, 2);
        assert_eq!(usage.total_allocations, 2);

        arena.free(a.as_ptr()).unwrap();
        arena.free(b.as_ptr()).unwrap();

        let usage = arena.usage();
        assert_eq!(usage.outstanding_bytes, 0);
        assert_eq!(usage.high_water_bytes, 64);
    }
}

#[test]
fn test_random_workload_keeps_blocks_disjoint() {
    let mut rng = rand::thread_rng();
    for arena in strategies(MemoryPolicy::host()) {
        let mut live: Vec<(usize, usize)> = Vec::new();

        for _ in 0..500 {
            if !live.is_empty() && rng.gen_bool(0.4) {
                let (address, _) = live.swap_remove(rng.gen_range(0..live.len()));
                arena.free(address as *mut u8).unwrap();
            } else {
                let size = rng.gen_range(1..=8192);
                let block = arena.alloc(size).unwrap();
                live.push((block.as_ptr() as usize, arena.align(size)));
            }
        }

        let mut ranges = live.clone();
        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            assert!(pair[0].0 + pair[0].1 <= pair[1].0, "{}: overlapping blocks", arena.name());
        }
        assert_eq!(arena.usage().live_blocks, live.len());

        for (address, _) in live {
            arena.free(address as *mut u8).unwrap();
        }
        assert_eq!(arena.usage().outstanding_bytes, 0);
    }
}

#[test]
fn test_capacity_limit_returns_out_of_memory() {
    let arena = BasicArena::new(core("capped", MemoryPolicy::device()).with_max_system_bytes(Some(4096)));
    let block = arena.alloc(4000).unwrap();

    match arena.alloc(200) {
        Err(ArenaError::OutOfMemory {
            requested, limit, ..
        }) => {
            assert_eq!(requested, 208);
            assert_eq!(limit, Some(4096));
        }
        other => panic!("Expected OutOfMemory, got {:?}", other),
    }

    // Failed requests leave the accounting untouched
    assert_eq!(arena.usage().system_bytes, 4000);
    arena.free(block.as_ptr()).unwrap();
    assert!(arena.alloc(200).is_ok());
}

#[test]
fn test_unrepresentable_size_fails_cleanly() {
    for arena in strategies(MemoryPolicy::host()) {
        assert!(matches!(
            arena.alloc(usize::MAX),
            Err(ArenaError::OutOfMemory { .. })
        ));
    }
}

#[test]
fn test_retired_arena_rejects_requests() {
    for arena in strategies(MemoryPolicy::pinned()) {
        let _block = arena.alloc(64).unwrap();
        arena.shutdown();

        assert!(!arena.is_live());
        let err = arena.alloc(64).unwrap_err();
        assert!(err.is_lifecycle_violation());
        assert_eq!(arena.usage().system_bytes, 0);
    }
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "not a live block")]
fn test_pool_double_free_panics_in_debug() {
    let arena = PoolArena::new(core("pool", MemoryPolicy::host()), PoolOptions::default());
    let block = arena.alloc(64).unwrap();
    arena.free(block.as_ptr()).unwrap();
    let _ = arena.free(block.as_ptr());
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "not a live block")]
fn test_foreign_pointer_panics_in_debug() {
    let owner = BasicArena::new(core("owner", MemoryPolicy::host()));
    let other = BasicArena::new(core("other", MemoryPolicy::host()));
    let block = owner.alloc(64).unwrap();
    let _ = other.free(block.as_ptr());
}

#[cfg(not(debug_assertions))]
#[test]
fn test_foreign_pointer_is_error_in_release() {
    for arena in strategies(MemoryPolicy::host()) {
        let mut local = [0u8; 32];
        assert!(matches!(
            arena.free(local.as_mut_ptr()),
            Err(ArenaError::InvalidAddress(_))
        ));
    }
}
