//! Dimension labels and labeled shapes.
//!
//! A [`Dimensions`] value is an ordered sequence of `(Dim, extent)` pairs in
//! row-major order: the last listed dimension is the innermost (fastest
//! varying) one. At most [`MAX_DIMS`] dimensions are supported, which keeps
//! the whole shape in a pair of fixed arrays.

use crate::{Error, Result};

/// Maximum number of dimensions of a single shape.
pub const MAX_DIMS: usize = 6;

/// Dimension label.
///
/// `Invalid` is the sentinel for "absent" and is rejected as a shape label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    X,
    Y,
    Z,
    Tof,
    MonitorTof,
    Spectrum,
    Monitor,
    Detector,
    Event,
    Row,
    Q,
    Component,
    Temperature,
    Time,
    Invalid,
}

/// Ordered labeled shape: up to six `(Dim, extent)` pairs.
///
/// Dimensions are accessed very frequently, so everything is packed into two
/// fixed arrays plus a count. Equality is order-sensitive.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    labels: [Dim; MAX_DIMS],
    shape: [usize; MAX_DIMS],
    ndim: usize,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.labels().iter().zip(self.shape().iter()))
            .finish()
    }
}

impl Dimensions {
    /// The empty (scalar) shape, volume 1.
    pub fn new() -> Self {
        Self {
            labels: [Dim::Invalid; MAX_DIMS],
            shape: [0; MAX_DIMS],
            ndim: 0,
        }
    }

    /// A one-dimensional shape.
    pub fn one(dim: Dim, size: usize) -> Result<Self> {
        Self::from_pairs(&[(dim, size)])
    }

    /// Build a shape from ordered `(Dim, extent)` pairs.
    ///
    /// Rejects more than [`MAX_DIMS`] entries, `Dim::Invalid` labels, and
    /// duplicate labels.
    pub fn from_pairs(pairs: &[(Dim, usize)]) -> Result<Self> {
        if pairs.len() > MAX_DIMS {
            return Err(Error::TooManyDimensions);
        }
        let mut dims = Self::new();
        for &(dim, size) in pairs {
            dims.add(dim, size)?;
        }
        Ok(dims)
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ndim == 0
    }

    /// Product of all extents; 1 for the scalar shape.
    pub fn volume(&self) -> usize {
        self.shape[..self.ndim].iter().product()
    }

    /// The extents, outermost first.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape[..self.ndim]
    }

    /// The labels, outermost first.
    #[inline]
    pub fn labels(&self) -> &[Dim] {
        &self.labels[..self.ndim]
    }

    /// Label at position `i` (0 is outermost).
    #[inline]
    pub fn label(&self, i: usize) -> Dim {
        self.labels[i]
    }

    /// Extent at position `i` (0 is outermost).
    #[inline]
    pub fn size_at(&self, i: usize) -> usize {
        self.shape[i]
    }

    /// Position of `dim` in the stored order.
    pub fn index_of(&self, dim: Dim) -> Option<usize> {
        self.labels().iter().position(|&d| d == dim)
    }

    #[inline]
    pub fn contains_dim(&self, dim: Dim) -> bool {
        self.index_of(dim).is_some()
    }

    /// True when every label of `other` is present with an equal extent.
    pub fn contains(&self, other: &Dimensions) -> bool {
        other
            .labels()
            .iter()
            .zip(other.shape().iter())
            .all(|(&dim, &size)| self.index_of(dim).map(|i| self.shape[i]) == Some(size))
    }

    /// Extent of `dim`.
    pub fn size(&self, dim: Dim) -> Result<usize> {
        self.index_of(dim)
            .map(|i| self.shape[i])
            .ok_or(Error::DimensionNotFound(dim))
    }

    /// Row-major stride of `dim`: the product of all extents listed after it.
    pub fn offset(&self, dim: Dim) -> Result<usize> {
        let i = self.index_of(dim).ok_or(Error::DimensionNotFound(dim))?;
        Ok(self.shape[i + 1..self.ndim].iter().product())
    }

    /// True when this shape addresses a contiguous memory range of `parent`.
    ///
    /// The labels must form a trailing (inner) run of `parent`'s labels with
    /// identical extents; only the outermost own dimension may cover a
    /// smaller range than the parent extent.
    pub fn is_contiguous_in(&self, parent: &Dimensions) -> bool {
        if self == parent {
            return true;
        }
        if parent.ndim < self.ndim {
            return false;
        }
        let offset = parent.ndim - self.ndim;
        for i in 0..self.ndim {
            if parent.labels[i + offset] != self.labels[i] {
                return false;
            }
            if i == 0 {
                if parent.shape[offset] < self.shape[0] {
                    return false;
                }
            } else if parent.shape[i + offset] != self.shape[i] {
                return false;
            }
        }
        true
    }

    /// Change the extent of an existing dimension.
    pub fn resize(&mut self, dim: Dim, size: usize) -> Result<()> {
        let i = self.index_of(dim).ok_or(Error::DimensionNotFound(dim))?;
        self.shape[i] = size;
        Ok(())
    }

    /// Remove a dimension, shifting inner dimensions outward.
    pub fn erase(&mut self, dim: Dim) -> Result<()> {
        let i = self.index_of(dim).ok_or(Error::DimensionNotFound(dim))?;
        for j in i..self.ndim - 1 {
            self.labels[j] = self.labels[j + 1];
            self.shape[j] = self.shape[j + 1];
        }
        self.ndim -= 1;
        self.labels[self.ndim] = Dim::Invalid;
        self.shape[self.ndim] = 0;
        Ok(())
    }

    /// Append a dimension as the new innermost one.
    pub fn add(&mut self, dim: Dim, size: usize) -> Result<()> {
        if dim == Dim::Invalid {
            return Err(Error::InvalidDimension);
        }
        if self.contains_dim(dim) {
            return Err(Error::DuplicateDimension(dim));
        }
        if self.ndim == MAX_DIMS {
            return Err(Error::TooManyDimensions);
        }
        self.labels[self.ndim] = dim;
        self.shape[self.ndim] = size;
        self.ndim += 1;
        Ok(())
    }

    /// Replace the label at position `i`, keeping the extent.
    pub fn relabel(&mut self, i: usize, dim: Dim) -> Result<()> {
        if dim == Dim::Invalid {
            return Err(Error::InvalidDimension);
        }
        if self.labels[i] != dim && self.contains_dim(dim) {
            return Err(Error::DuplicateDimension(dim));
        }
        self.labels[i] = dim;
        Ok(())
    }
}

/// Shape of the concatenation of `a` and `b` along `dim`.
///
/// An operand not containing `dim` contributes extent 1 (a volume joined with
/// a slice). All other dimensions must match exactly.
pub fn concatenate_dims(a: &Dimensions, b: &Dimensions, dim: Dim) -> Result<Dimensions> {
    for (&label, &size) in a.labels().iter().zip(a.shape().iter()) {
        if label == dim {
            continue;
        }
        if b.size(label).ok() != Some(size) {
            return Err(Error::DimensionMismatch {
                expected: *a,
                actual: *b,
            });
        }
    }
    let rank = |d: &Dimensions| d.ndim() - usize::from(d.contains_dim(dim));
    if rank(a) != rank(b) {
        return Err(Error::DimensionMismatch {
            expected: *a,
            actual: *b,
        });
    }
    let extent_a = a.size(dim).unwrap_or(1);
    let extent_b = b.size(dim).unwrap_or(1);
    let mut out = *a;
    if out.contains_dim(dim) {
        out.resize(dim, extent_a + extent_b)?;
    } else {
        out.add(dim, extent_a + extent_b)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct() {
        let dims = Dimensions::from_pairs(&[(Dim::Y, 3), (Dim::X, 2)]).unwrap();
        assert_eq!(dims.ndim(), 2);
        assert_eq!(dims.volume(), 6);
        assert_eq!(dims.labels(), &[Dim::Y, Dim::X]);
        assert_eq!(dims.shape(), &[3, 2]);
    }

    #[test]
    fn construct_rejects_invalid() {
        assert!(Dimensions::one(Dim::Invalid, 2).is_err());
        assert!(Dimensions::from_pairs(&[(Dim::X, 2), (Dim::X, 3)]).is_err());
        let seven = [
            (Dim::X, 1),
            (Dim::Y, 1),
            (Dim::Z, 1),
            (Dim::Tof, 1),
            (Dim::Row, 1),
            (Dim::Q, 1),
            (Dim::Event, 1),
        ];
        assert!(Dimensions::from_pairs(&seven).is_err());
    }

    #[test]
    fn scalar_shape() {
        let dims = Dimensions::new();
        assert!(dims.is_empty());
        assert_eq!(dims.volume(), 1);
    }

    #[test]
    fn offset_is_row_major() {
        let dims = Dimensions::from_pairs(&[(Dim::Z, 3), (Dim::Y, 2), (Dim::X, 4)]).unwrap();
        assert_eq!(dims.offset(Dim::X).unwrap(), 1);
        assert_eq!(dims.offset(Dim::Y).unwrap(), 4);
        assert_eq!(dims.offset(Dim::Z).unwrap(), 8);
        assert!(dims.offset(Dim::Tof).is_err());
    }

    #[test]
    fn equality_is_order_sensitive() {
        let a = Dimensions::from_pairs(&[(Dim::Y, 2), (Dim::X, 3)]).unwrap();
        let b = Dimensions::from_pairs(&[(Dim::X, 3), (Dim::Y, 2)]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn contains_checks_labels_and_extents() {
        let a = Dimensions::from_pairs(&[(Dim::Y, 3), (Dim::X, 2)]).unwrap();
        let sub = Dimensions::one(Dim::X, 2).unwrap();
        let transposed = Dimensions::from_pairs(&[(Dim::X, 2), (Dim::Y, 3)]).unwrap();
        let wrong = Dimensions::one(Dim::X, 3).unwrap();
        assert!(a.contains(&sub));
        assert!(a.contains(&transposed));
        assert!(a.contains(&Dimensions::new()));
        assert!(!a.contains(&wrong));
        assert!(!sub.contains(&a));
    }

    #[test]
    fn contiguous_in_parent() {
        let parent = Dimensions::from_pairs(&[(Dim::Z, 3), (Dim::Y, 2), (Dim::X, 4)]).unwrap();
        let inner = Dimensions::from_pairs(&[(Dim::Y, 2), (Dim::X, 4)]).unwrap();
        let outer_section =
            Dimensions::from_pairs(&[(Dim::Z, 2), (Dim::Y, 2), (Dim::X, 4)]).unwrap();
        let strided = Dimensions::from_pairs(&[(Dim::Z, 3), (Dim::Y, 1), (Dim::X, 4)]).unwrap();
        assert!(parent.is_contiguous_in(&parent));
        assert!(inner.is_contiguous_in(&parent));
        assert!(outer_section.is_contiguous_in(&parent));
        assert!(!strided.is_contiguous_in(&parent));
        assert!(!parent.is_contiguous_in(&inner));
    }

    #[test]
    fn erase_and_add() {
        let mut dims = Dimensions::from_pairs(&[(Dim::Z, 3), (Dim::Y, 2), (Dim::X, 4)]).unwrap();
        dims.erase(Dim::Y).unwrap();
        assert_eq!(dims.labels(), &[Dim::Z, Dim::X]);
        assert_eq!(dims.shape(), &[3, 4]);
        dims.add(Dim::Tof, 5).unwrap();
        assert_eq!(dims.labels(), &[Dim::Z, Dim::X, Dim::Tof]);
        assert!(dims.add(Dim::X, 1).is_err());
    }

    #[test]
    fn concatenate_sums_extents() {
        let a = Dimensions::from_pairs(&[(Dim::Y, 2), (Dim::X, 3)]).unwrap();
        let b = Dimensions::from_pairs(&[(Dim::Y, 2), (Dim::X, 5)]).unwrap();
        let joined = concatenate_dims(&a, &b, Dim::X).unwrap();
        assert_eq!(joined.size(Dim::X).unwrap(), 8);
        assert_eq!(joined.size(Dim::Y).unwrap(), 2);
    }

    #[test]
    fn concatenate_promotes_missing_dim() {
        let a = Dimensions::one(Dim::X, 1).unwrap();
        let scalar = Dimensions::new();
        let joined = concatenate_dims(&a, &scalar, Dim::X).unwrap();
        assert_eq!(joined.size(Dim::X).unwrap(), 2);
        let joined = concatenate_dims(&scalar, &scalar, Dim::X).unwrap();
        assert_eq!(joined.size(Dim::X).unwrap(), 2);
    }

    #[test]
    fn concatenate_rejects_extent_mismatch() {
        let a = Dimensions::from_pairs(&[(Dim::Y, 2), (Dim::X, 3)]).unwrap();
        let b = Dimensions::from_pairs(&[(Dim::Y, 4), (Dim::X, 3)]).unwrap();
        assert!(concatenate_dims(&a, &b, Dim::X).is_err());
    }
}
