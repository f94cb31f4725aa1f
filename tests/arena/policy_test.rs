/*!
 * Memory Policy Tests
 * Fluent configuration, hint preconditions and backing store selection
 */

use hetero_arena::{ArenaError, BackingStore, MemoryPolicy};
use pretty_assertions::assert_eq;

#[test]
fn test_read_only_without_managed_is_violation() {
    let result = MemoryPolicy::default().set_device_memory().set_read_only();
    match result {
        Err(ArenaError::PolicyViolation { setter, reason }) => {
            assert_eq!(setter, "set_read_only");
            assert!(reason.contains("managed"));
        }
        other => panic!("Expected PolicyViolation, got {:?}", other),
    }
}

#[test]
fn test_preferred_after_host_memory_is_violation() {
    assert!(matches!(
        MemoryPolicy::default().set_host_memory().set_preferred(),
        Err(ArenaError::PolicyViolation { .. })
    ));
}

#[test]
fn test_hints_on_managed_memory() {
    let policy = MemoryPolicy::default()
        .set_read_only()
        .and_then(MemoryPolicy::set_preferred)
        .expect("managed memory accepts hints");

    assert_eq!(
        policy.backing_store(),
        BackingStore::Managed {
            read_only: true,
            preferred: true
        }
    );
}

#[test]
fn test_host_memory_clears_every_device_flag() {
    let starts = [
        MemoryPolicy::default(),
        MemoryPolicy::default().set_read_only().unwrap(),
        MemoryPolicy::pinned(),
        MemoryPolicy::device(),
    ];

    for start in starts {
        let policy = start.set_host_memory();
        assert!(policy.use_host_memory());
        assert!(!policy.device_use_managed_memory());
        assert!(!policy.device_set_readonly());
        assert!(!policy.device_set_preferred());
        assert!(!policy.device_use_hostalloc());
        assert_eq!(policy.backing_store(), BackingStore::Host);
    }
}

#[test]
fn test_exactly_one_store_per_policy() {
    assert_eq!(MemoryPolicy::host().backing_store(), BackingStore::Host);
    assert_eq!(MemoryPolicy::pinned().backing_store(), BackingStore::Pinned);
    assert_eq!(MemoryPolicy::device().backing_store(), BackingStore::Device);
    assert!(matches!(
        MemoryPolicy::managed().backing_store(),
        BackingStore::Managed { .. }
    ));
}

#[test]
fn test_policy_serializes() {
    let policy = MemoryPolicy::pinned();
    let json = serde_json::to_string(&policy).unwrap();
    let parsed: MemoryPolicy = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, policy);
}
