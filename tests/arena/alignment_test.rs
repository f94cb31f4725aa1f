/*!
 * Alignment Tests
 * Properties of the size rounding shared by every arena
 */

use hetero_arena::arena::{align, aligned_size};
use hetero_arena::ALIGN_SIZE;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_aligned_size_is_smallest_multiple(shift in 0u32..16, size in 0usize..(1 << 40)) {
        let boundary = 1usize << shift;
        let aligned = aligned_size(boundary, size);

        prop_assert_eq!(aligned % boundary, 0);
        prop_assert!(aligned >= size);
        prop_assert!(aligned < size + boundary);
    }

    #[test]
    fn prop_align_uses_fixed_boundary(size in 0usize..(1 << 40)) {
        prop_assert_eq!(align(size), aligned_size(ALIGN_SIZE, size));
    }
}

#[test]
fn test_alignment_boundary_is_16() {
    assert_eq!(ALIGN_SIZE, 16);
    assert_eq!(align(0), 0);
    assert_eq!(align(100), 112);
}

#[test]
fn test_align_near_usize_max_panics_instead_of_wrapping() {
    assert_eq!(align(usize::MAX - 30), usize::MAX - 15);
    let result = std::panic::catch_unwind(|| align(usize::MAX - 3));
    assert!(result.is_err());
}
