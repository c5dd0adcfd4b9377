//! Typed, dimension-labeled, heterogeneous columnar datasets.
//!
//! This crate provides a [`Dataset`]: an ordered collection of columns
//! ([`Variable`]s), each carrying a [`Tag`], an optional name, a physical
//! [`Unit`], and a labeled shape ([`Dimensions`]). Datasets are the workspace
//! for arithmetic between whole columnar datasets with automatic
//! broadcasting, transposition, and unit algebra, plus structural operations
//! such as slicing, concatenation, filtering, sorting, and rebinning.
//!
//! # Core Types
//!
//! - [`Dimensions`]: ordered labeled shape of up to six `(Dim, extent)` pairs
//! - [`Buffer`]: typed element storage under a copy-on-write shared handle
//! - [`Variable`] / [`VariableSlice`] / [`VariableSliceMut`]: a tagged,
//!   dimensioned column and strided views into it
//! - [`Dataset`] / [`DatasetSlice`] / [`DatasetSliceMut`]: uniquely-keyed
//!   variable collections with a coherent union shape
//!
//! # Operations
//!
//! - In-place arithmetic (`add_assign`, `sub_assign`, `mul_assign`) with
//!   dimension broadcasting, transposition, and unit composition
//! - Pure-value arithmetic: [`add`], [`sub`], [`mul`]
//! - Structural: [`slice`], [`slice_range`], [`concatenate`], [`split`],
//!   [`filter`], [`permute`], and their dataset-level counterparts in [`ops`]
//! - [`rebin`]: overlap-weighted redistribution of binned values onto a new
//!   bin-edge coordinate
//!
//! # Example
//!
//! ```rust
//! use dataset_rs::{CoordTag, DataTag, Dataset, Dim, Dimensions, Variable};
//!
//! let mut d = Dataset::new();
//! d.insert(Variable::with_values(
//!     CoordTag::X.into(),
//!     Dimensions::one(Dim::X, 3)?,
//!     vec![0.1, 0.2, 0.3],
//! )?)?;
//! let mut counts = Variable::with_values(
//!     DataTag::Value.into(),
//!     Dimensions::one(Dim::X, 3)?,
//!     vec![10.0, 20.0, 30.0],
//! )?;
//! counts.set_name("counts")?;
//! d.insert(counts)?;
//!
//! let doubled = dataset_rs::ops::add(&d, &d)?;
//! assert_eq!(
//!     doubled.values_by_name::<f64>(DataTag::Value.into(), "counts")?[0],
//!     20.0,
//! );
//! # Ok::<(), dataset_rs::Error>(())
//! ```
//!
//! # Copy-on-write
//!
//! Copying a [`Variable`] or [`Dataset`] is O(1): column buffers are shared
//! by reference count, and any mutation goes through [`Buffer::write`] which
//! clones the storage when it is shared. This also makes in-place arithmetic
//! against an aliased view of the destination safe: the write access detaches
//! the destination, so the source keeps reading the pre-operation values.

mod buffer;
mod dataset;
mod dims;
mod element;
mod kernel;
pub mod ops;
mod rebin;
mod slice;
mod tag;
mod unit;
mod variable;
mod view;

pub use buffer::Buffer;
pub use dataset::Dataset;
pub use dims::{Dim, Dimensions, MAX_DIMS};
pub use element::{DType, Element, Elements};
pub use rebin::rebin;
pub use slice::{DatasetSlice, DatasetSliceMut};
pub use tag::{AttrTag, CoordTag, DataTag, Tag, TagRole, ValueWithDelta};
pub use unit::Unit;
pub use variable::{
    add, concatenate, filter, mul, permute, slice, slice_range, split, sub, Variable, VariableRef,
    VariableSlice, VariableSliceMut,
};

// ============================================================================
// Error types
// ============================================================================

/// Errors produced by dataset and variable operations.
///
/// Every failure carries a stable kind and a human-readable message; none of
/// these are used for control flow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shapes are incompatible for the operation.
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: Dimensions,
        actual: Dimensions,
    },

    /// A dimension label was not found in a shape.
    #[error("dimension not found: {0:?}")]
    DimensionNotFound(Dim),

    /// `Dim::Invalid` used as a dimension label.
    #[error("Dim::Invalid is not a valid dimension label")]
    InvalidDimension,

    /// The same dimension label appears twice in one shape.
    #[error("duplicate dimension label {0:?}")]
    DuplicateDimension(Dim),

    /// More than [`MAX_DIMS`] labels in one shape.
    #[error("at most six dimensions are supported")]
    TooManyDimensions,

    /// Data length does not match the volume given by the dimension extents.
    #[error("data size {actual} does not match shape volume {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A coordinate extent is neither `N` nor `N + 1` for data extent `N`.
    #[error("extent of dimension {dim:?} is {actual}, expected {expected} (or one more for a bin-edge coordinate)")]
    EdgeMismatch {
        dim: Dim,
        expected: usize,
        actual: usize,
    },

    /// Lookup by tag alone matched more than one variable.
    #[error("lookup by tag {0:?} is ambiguous, use the name-qualified accessor")]
    Uniqueness(Tag),

    /// Insertion would duplicate a `(tag, name)` key.
    #[error("dataset already contains a variable with tag {tag:?} and name {name:?}")]
    DuplicateKey { tag: Tag, name: String },

    /// Element types of the two operands differ.
    #[error("element type mismatch: {expected:?} vs {actual:?}")]
    TypeMismatch { expected: DType, actual: DType },

    /// The element type does not support the requested operation.
    #[error("element type {dtype:?} does not support {op}")]
    UnsupportedElement { dtype: DType, op: &'static str },

    /// Units cannot be combined by the requested operation.
    #[error("unit error: cannot {op} {left:?} and {right:?}")]
    Unit {
        left: Unit,
        right: Unit,
        op: &'static str,
    },

    /// A partial view attempted to change metadata of the full variable.
    #[error("partial view on data of a variable cannot be used to change the {0}")]
    Alias(&'static str),

    /// Operation is not defined for this variable kind.
    #[error("{0}")]
    Unsupported(&'static str),

    /// Two variables cannot be combined structurally.
    #[error("cannot {op} variables: {what} do not match")]
    Incompatible {
        op: &'static str,
        what: &'static str,
    },

    /// A matching variable was missing from the left-hand dataset.
    #[error("dataset does not contain a variable with tag {tag:?} and name {name:?}")]
    MissingVariable { tag: Tag, name: String },

    /// Coordinates of the two datasets disagree.
    #[error("coordinates with tag {0:?} do not match between the operands")]
    CoordMismatch(Tag),
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, Error>;
