//! Binary heap algorithms over slices.
//!
//! The standard library only exposes heaps through [`std::collections::BinaryHeap`],
//! which cannot remove an arbitrary element. These functions work on any
//! `&mut [T]` laid out as an implicit binary tree (children of `i` at `2i + 1`
//! and `2i + 2`), so the caller keeps ownership of the storage and decides when
//! to grow or shrink it.
//!
//! Ordering follows `sort_by`: the element at index 0 is the *greatest* under
//! the comparator. Reverse the comparator (or use [`std::cmp::Reverse`] as the
//! key) for a min-heap.

use std::cmp::Ordering;

/// Sift the last element of `v` up so that all of `v` is a heap.
///
/// `v[..len - 1]` must already be a heap.
#[inline]
pub fn push_heap<T: Ord>(v: &mut [T]) {
    push_heap_by(v, T::cmp);
}

/// [`push_heap`] with a custom comparator.
pub fn push_heap_by<T, F>(v: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    if let Some(last) = v.len().checked_sub(1) {
        sift_up(v, last, &mut compare);
    }
}

/// [`push_heap`] ordering elements by the key `f` extracts.
#[inline]
pub fn push_heap_by_key<T, K, F>(v: &mut [T], mut f: F)
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    push_heap_by(v, |a, b| f(a).cmp(&f(b)));
}

/// Move the greatest element to the end of `v`, leaving `v[..len - 1]` a heap.
#[inline]
pub fn pop_heap<T: Ord>(v: &mut [T]) {
    pop_heap_by(v, T::cmp);
}

/// [`pop_heap`] with a custom comparator.
pub fn pop_heap_by<T, F>(v: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = v.len();
    if len < 2 {
        return;
    }

    let last = len - 1;
    v.swap(0, last);
    sift_down(v, 0, last, &mut compare);
}

/// [`pop_heap`] ordering elements by the key `f` extracts.
#[inline]
pub fn pop_heap_by_key<T, K, F>(v: &mut [T], mut f: F)
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    pop_heap_by(v, |a, b| f(a).cmp(&f(b)));
}

/// Move the element at `index` to the end of `v`, leaving `v[..len - 1]` a heap.
///
/// Works like [`pop_heap`] for an arbitrary position: the caller shrinks the
/// container by one afterwards to actually drop the element. Runs in
/// O(log n). An `index` that is out of range or already the last element is
/// a no-op.
#[inline]
pub fn remove_heap<T: Ord>(v: &mut [T], index: usize) {
    remove_heap_by(v, index, T::cmp);
}

/// [`remove_heap`] with a custom comparator.
pub fn remove_heap_by<T, F>(v: &mut [T], index: usize, mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = v.len();
    if len < 2 || index >= len - 1 {
        return;
    }

    let last = len - 1;
    v.swap(index, last);

    // v[..=index] was a heap before the swap, so the tail value that landed
    // on `index` is a fresh insertion into that prefix.
    sift_up(v, index, &mut compare);

    // The value may equally need to go down. If it just went up, the parent
    // that replaced it already dominates this subtree and this loop exits at
    // once.
    sift_down(v, index, last, &mut compare);
}

/// [`remove_heap`] ordering elements by the key `f` extracts.
#[inline]
pub fn remove_heap_by_key<T, K, F>(v: &mut [T], index: usize, mut f: F)
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    remove_heap_by(v, index, |a, b| f(a).cmp(&f(b)));
}

/// Rearrange arbitrary `v` into a heap in O(n).
#[inline]
pub fn make_heap<T: Ord>(v: &mut [T]) {
    make_heap_by(v, T::cmp);
}

/// [`make_heap`] with a custom comparator.
pub fn make_heap_by<T, F>(v: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = v.len();
    for pos in (0..len / 2).rev() {
        sift_down(v, pos, len, &mut compare);
    }
}

/// Whether `v` satisfies the heap property.
#[inline]
pub fn is_heap<T: Ord>(v: &[T]) -> bool {
    is_heap_by(v, T::cmp)
}

/// [`is_heap`] with a custom comparator.
pub fn is_heap_by<T, F>(v: &[T], mut compare: F) -> bool
where
    F: FnMut(&T, &T) -> Ordering,
{
    (1..v.len()).all(|child| compare(&v[(child - 1) / 2], &v[child]) != Ordering::Less)
}

/// [`is_heap`] ordering elements by the key `f` extracts.
#[inline]
pub fn is_heap_by_key<T, K, F>(v: &[T], mut f: F) -> bool
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    is_heap_by(v, |a, b| f(a).cmp(&f(b)))
}

#[inline]
fn sift_up<T, F>(v: &mut [T], mut pos: usize, compare: &mut F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    while pos > 0 {
        let parent = (pos - 1) / 2;
        if compare(&v[parent], &v[pos]) != Ordering::Less {
            break;
        }
        v.swap(parent, pos);
        pos = parent;
    }
}

/// Sift `v[pos]` down, treating `v[..len]` as the heap.
#[inline]
fn sift_down<T, F>(v: &mut [T], mut pos: usize, len: usize, compare: &mut F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    loop {
        let left = 2 * pos + 1;
        if left >= len {
            break;
        }

        // Only one child at the edge of the tree.
        let right = left + 1;
        let child = if right < len && compare(&v[left], &v[right]) == Ordering::Less {
            right
        } else {
            left
        };

        if compare(&v[pos], &v[child]) != Ordering::Less {
            break;
        }

        v.swap(pos, child);
        pos = child;
    }
}
