/*!
 * Alignment
 * Size rounding shared by every arena
 */

use crate::core::limits::ALIGN_SIZE;
use crate::core::types::Size;

/// Smallest multiple of `boundary` that is at least `size`
///
/// `boundary` must be non-zero; it does not have to be a power of two.
///
/// # Panics
///
/// Panics if `boundary` is zero or the rounded size does not fit in `Size`.
///
/// ```
/// use hetero_arena::arena::aligned_size;
///
/// assert_eq!(aligned_size(16, 0), 0);
/// assert_eq!(aligned_size(16, 1), 16);
/// assert_eq!(aligned_size(16, 32), 32);
/// assert_eq!(aligned_size(24, 25), 48);
/// ```
#[inline]
pub const fn aligned_size(boundary: Size, size: Size) -> Size {
    assert!(boundary != 0, "alignment boundary must be non-zero");
    match size.div_ceil(boundary).checked_mul(boundary) {
        Some(aligned) => aligned,
        None => panic!("aligned size overflows usize"),
    }
}

/// Round `size` up to the arena alignment boundary ([`ALIGN_SIZE`])
///
/// Panics like [`aligned_size`] on overflow; arenas use a checked variant.
#[inline]
pub const fn align(size: Size) -> Size {
    aligned_size(ALIGN_SIZE, size)
}

/// [`align`] that reports overflow instead of panicking
#[inline]
pub(crate) const fn checked_align(size: Size) -> Option<Size> {
    match size.checked_add(ALIGN_SIZE - 1) {
        Some(padded) => Some(padded / ALIGN_SIZE * ALIGN_SIZE),
        None => None,
    }
}

/// Whether `address` sits on the arena alignment boundary
#[inline]
pub const fn is_aligned(address: usize) -> bool {
    address % ALIGN_SIZE == 0
}
