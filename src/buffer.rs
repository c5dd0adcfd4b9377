//! Copy-on-write element storage.

use std::sync::Arc;

/// Typed element storage under a shared-ownership, copy-on-write handle.
///
/// Cloning a `Buffer` only bumps a reference count. All mutation goes through
/// [`Buffer::write`], which clones the underlying vector exactly when the
/// storage is shared. This is the sole mechanism behind the invariant
/// "copying a variable is O(1); mutating the copy does not affect the
/// original".
#[derive(Debug, Clone)]
pub struct Buffer<T> {
    data: Arc<Vec<T>>,
}

impl<T: Clone> Buffer<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self {
            data: Arc::new(values),
        }
    }

    /// A buffer of `len` copies of `value`.
    pub fn filled(len: usize, value: T) -> Self {
        Self::new(vec![value; len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Immutable access to the elements.
    #[inline]
    pub fn read(&self) -> &[T] {
        &self.data
    }

    /// Mutable access; clones the storage iff it is shared.
    #[inline]
    pub fn write(&mut self) -> &mut [T] {
        let vec: &mut Vec<T> = Arc::make_mut(&mut self.data);
        vec.as_mut_slice()
    }

    /// True when both handles refer to the same storage.
    #[inline]
    pub fn ptr_eq(&self, other: &Buffer<T>) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl<T: Clone + PartialEq> PartialEq for Buffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.read() == other.read()
    }
}

impl<T: Clone + Default> Buffer<T> {
    /// A buffer of `len` default-initialised elements.
    pub fn with_default(len: usize) -> Self {
        Self::new((0..len).map(|_| T::default()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_is_shared() {
        let a = Buffer::new(vec![1.0, 2.0]);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn write_detaches_shared_storage() {
        let a = Buffer::new(vec![1.0, 2.0]);
        let mut b = a.clone();
        b.write()[0] = 9.0;
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.read(), &[1.0, 2.0]);
        assert_eq!(b.read(), &[9.0, 2.0]);
    }

    #[test]
    fn write_in_place_when_unique() {
        let mut a = Buffer::new(vec![1, 2, 3]);
        let before = a.read().as_ptr();
        a.write()[1] = 5;
        assert_eq!(a.read(), &[1, 5, 3]);
        assert_eq!(a.read().as_ptr(), before);
    }

    #[test]
    fn equality_is_elementwise() {
        let a = Buffer::new(vec![1, 2]);
        let b = Buffer::new(vec![1, 2]);
        let c = Buffer::new(vec![1, 3]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
