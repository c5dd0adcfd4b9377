//! Variables: tagged, dimensioned, unit-carrying columns, plus strided views
//! into them and the structural free functions.
//!
//! A [`Variable`] owns its element buffer; [`VariableSlice`] and
//! [`VariableSliceMut`] are borrowed views produced by slicing, carrying the
//! sliced shape and a base offset into the parent buffer. Arithmetic accepts
//! any [`VariableRef`] operand, so variables and views mix freely.

use crate::dims::{concatenate_dims, Dim, Dimensions};
use crate::element::{DType, Element, Elements};
use crate::kernel::{self, BinOp, ViewRef};
use crate::tag::{Tag, TagRole};
use crate::unit::Unit;
use crate::view::ViewPlan;
use crate::{Dataset, Error, Result};

pub(crate) mod detail {
    use crate::kernel::ViewRef;

    /// Access to the raw view description. Crate-internal; sealing
    /// [`super::VariableRef`] against outside implementations.
    pub trait AsViewRef {
        fn view_ref(&self) -> ViewRef<'_>;
    }
}

use detail::AsViewRef;

/// Read-side interface shared by [`Variable`] and its slice views.
pub trait VariableRef: detail::AsViewRef {
    fn tag(&self) -> Tag;
    fn name(&self) -> &str;
    fn unit(&self) -> Unit;
    fn dims(&self) -> &Dimensions;
    fn dtype(&self) -> DType;
}

/// A typed, dimension-labeled column: `(tag, name, unit, dimensions, data)`.
///
/// The buffer length always equals `dims.volume()`, and the element type
/// always matches the tag's declared type. Coordinate variables are unnamed.
/// Cloning is O(1); see the crate-level notes on copy-on-write.
#[derive(Debug, Clone)]
pub struct Variable {
    tag: Tag,
    name: String,
    unit: Unit,
    dims: Dimensions,
    data: Elements,
}

impl Variable {
    /// Build a variable from a tag, a shape, and a matching column.
    pub fn new(tag: Tag, dims: Dimensions, data: Elements) -> Result<Self> {
        if data.dtype() != tag.dtype() {
            return Err(Error::TypeMismatch {
                expected: tag.dtype(),
                actual: data.dtype(),
            });
        }
        if data.len() != dims.volume() {
            return Err(Error::LengthMismatch {
                expected: dims.volume(),
                actual: data.len(),
            });
        }
        Ok(Self {
            tag,
            name: String::new(),
            unit: tag.default_unit(),
            dims,
            data,
        })
    }

    /// Build from explicit values; the value type must match the tag.
    pub fn with_values<T: Element>(tag: Tag, dims: Dimensions, values: Vec<T>) -> Result<Self> {
        Self::new(tag, dims, T::from_vec(values))
    }

    /// Build with default-initialised elements.
    pub fn with_default(tag: Tag, dims: Dimensions) -> Result<Self> {
        let volume = dims.volume();
        Self::new(tag, dims, Elements::with_default(tag.dtype(), volume))
    }

    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    #[inline]
    pub fn role(&self) -> TagRole {
        self.tag.role()
    }

    #[inline]
    pub fn is_coord(&self) -> bool {
        self.tag.is_coord()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the name. Coordinate variables cannot be named.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        if self.is_coord() {
            return Err(Error::Unsupported("coordinate variable cannot have a name"));
        }
        self.name = name.into();
        Ok(())
    }

    #[inline]
    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    #[inline]
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// The raw column.
    #[inline]
    pub fn data(&self) -> &Elements {
        &self.data
    }

    /// Typed read access to the elements.
    pub fn values<T: Element>(&self) -> Result<&[T]> {
        T::buffer(&self.data)
            .map(|b| b.read())
            .ok_or(Error::TypeMismatch {
                expected: self.data.dtype(),
                actual: T::DTYPE,
            })
    }

    /// Typed write access; detaches shared storage (copy-on-write).
    pub fn values_mut<T: Element>(&mut self) -> Result<&mut [T]> {
        let dtype = self.data.dtype();
        T::buffer_mut(&mut self.data)
            .map(|b| b.write())
            .ok_or(Error::TypeMismatch {
                expected: dtype,
                actual: T::DTYPE,
            })
    }

    /// Replace the shape. When the volume changes the data is reset to
    /// default-initialised elements; aliased views are not updated.
    pub fn set_dims(&mut self, dims: Dimensions) {
        if dims == self.dims {
            return;
        }
        let volume = dims.volume();
        self.dims = dims;
        if self.data.len() != volume {
            self.data = Elements::with_default(self.data.dtype(), volume);
        }
    }

    /// View with `dim` collapsed at `index` (rank drops by one).
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn slice(&self, dim: Dim, index: usize) -> Result<VariableSlice<'_>> {
        VariableSlice::whole(self).slice(dim, index)
    }

    /// View of the half-open range `begin..end` along `dim` (rank kept).
    ///
    /// # Panics
    /// Panics if the range is out of bounds.
    pub fn slice_range(&self, dim: Dim, begin: usize, end: usize) -> Result<VariableSlice<'_>> {
        VariableSlice::whole(self).slice_range(dim, begin, end)
    }

    /// Mutable view with `dim` collapsed at `index`.
    pub fn slice_mut(&mut self, dim: Dim, index: usize) -> Result<VariableSliceMut<'_>> {
        let (dims, base) = collapse(&self.dims, &self.dims, 0, dim, index)?;
        Ok(VariableSliceMut {
            var: self,
            dims,
            base,
        })
    }

    /// Mutable view of `begin..end` along `dim`.
    pub fn slice_range_mut(
        &mut self,
        dim: Dim,
        begin: usize,
        end: usize,
    ) -> Result<VariableSliceMut<'_>> {
        let (dims, base) = narrow(&self.dims, &self.dims, 0, dim, begin, end)?;
        Ok(VariableSliceMut {
            var: self,
            dims,
            base,
        })
    }

    /// `self += rhs`, broadcasting and transposing `rhs` as needed.
    ///
    /// Units must match. For event-list and table variables this
    /// concatenates per cell; see the crate docs.
    pub fn add_assign<R: VariableRef + ?Sized>(&mut self, rhs: &R) -> Result<()> {
        let dims = self.dims;
        op_assign(self, dims, 0, rhs, BinOp::Add)
    }

    /// `self -= rhs`. Units must match; not defined for event lists.
    pub fn sub_assign<R: VariableRef + ?Sized>(&mut self, rhs: &R) -> Result<()> {
        let dims = self.dims;
        op_assign(self, dims, 0, rhs, BinOp::Sub)
    }

    /// `self *= rhs`. The unit becomes the product of the operand units.
    pub fn mul_assign<R: VariableRef + ?Sized>(&mut self, rhs: &R) -> Result<()> {
        let dims = self.dims;
        op_assign(self, dims, 0, rhs, BinOp::Mul)
    }

    /// Write `slice` into `self` at position `index` along `dim`.
    ///
    /// `slice` must be compatible with the `dim`-reduced shape of `self`.
    /// Writing a variable into itself is a no-op.
    pub fn set_slice<R: VariableRef + ?Sized>(
        &mut self,
        slice: &R,
        dim: Dim,
        index: usize,
    ) -> Result<()> {
        if self.unit != slice.unit() {
            return Err(Error::Unit {
                left: self.unit,
                right: slice.unit(),
                op: "assign between",
            });
        }
        if self.data.ptr_eq(slice.view_ref().elements) {
            return Ok(());
        }
        if !self.dims.contains(slice.dims()) {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                actual: *slice.dims(),
            });
        }
        let mut iter_dims = self.dims;
        if iter_dims.contains_dim(dim) {
            iter_dims.resize(dim, 1)?;
        }
        let base = index * self.dims.offset(dim)?;
        let dims = self.dims;
        let plan = ViewPlan::new(&iter_dims, &iter_dims, &dims, base)?;
        kernel::copy_view(&mut self.data, &plan, &slice.view_ref())
    }
}

impl AsViewRef for Variable {
    fn view_ref(&self) -> ViewRef<'_> {
        ViewRef::whole(&self.data, &self.dims)
    }
}

impl VariableRef for Variable {
    fn tag(&self) -> Tag {
        self.tag
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn unit(&self) -> Unit {
        self.unit
    }
    fn dims(&self) -> &Dimensions {
        &self.dims
    }
    fn dtype(&self) -> DType {
        self.data.dtype()
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.name == other.name
            && self.unit == other.unit
            && self.dims == other.dims
            && self.data == other.data
    }
}

// ============================================================================
// Slice views
// ============================================================================

fn collapse(
    view: &Dimensions,
    parent: &Dimensions,
    base: usize,
    dim: Dim,
    index: usize,
) -> Result<(Dimensions, usize)> {
    let size = view.size(dim)?;
    assert!(index < size, "slice index {index} out of range for extent {size}");
    let mut dims = *view;
    dims.erase(dim)?;
    Ok((dims, base + index * parent.offset(dim)?))
}

fn narrow(
    view: &Dimensions,
    parent: &Dimensions,
    base: usize,
    dim: Dim,
    begin: usize,
    end: usize,
) -> Result<(Dimensions, usize)> {
    let size = view.size(dim)?;
    assert!(
        begin <= end && end <= size,
        "slice range {begin}..{end} out of range for extent {size}"
    );
    let mut dims = *view;
    dims.resize(dim, end - begin)?;
    Ok((dims, base + begin * parent.offset(dim)?))
}

/// Immutable strided view of a [`Variable`].
///
/// Range slices keep the rank and the parent strides; collapse slices drop
/// the dimension. Views can be sliced further.
#[derive(Debug, Clone, Copy)]
pub struct VariableSlice<'a> {
    var: &'a Variable,
    dims: Dimensions,
    base: usize,
}

impl<'a> VariableSlice<'a> {
    pub(crate) fn whole(var: &'a Variable) -> Self {
        Self {
            var,
            dims: var.dims,
            base: 0,
        }
    }

    pub fn tag(&self) -> Tag {
        self.var.tag
    }

    pub fn name(&self) -> &str {
        &self.var.name
    }

    pub fn unit(&self) -> Unit {
        self.var.unit
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn dtype(&self) -> DType {
        self.var.data.dtype()
    }

    /// Parent strides of the remaining dimensions, outermost first.
    pub fn strides(&self) -> Vec<usize> {
        self.dims
            .labels()
            .iter()
            .filter_map(|&label| self.var.dims.offset(label).ok())
            .collect()
    }

    pub fn slice(self, dim: Dim, index: usize) -> Result<Self> {
        let (dims, base) = collapse(&self.dims, &self.var.dims, self.base, dim, index)?;
        Ok(Self {
            var: self.var,
            dims,
            base,
        })
    }

    pub fn slice_range(self, dim: Dim, begin: usize, end: usize) -> Result<Self> {
        let (dims, base) = narrow(&self.dims, &self.var.dims, self.base, dim, begin, end)?;
        Ok(Self {
            var: self.var,
            dims,
            base,
        })
    }

    /// Copy the viewed elements into a vector, in view order.
    pub fn to_values<T: Element>(&self) -> Result<Vec<T>> {
        let dense = kernel::materialise(&self.view_ref())?;
        T::buffer(&dense)
            .map(|b| b.read().to_vec())
            .ok_or(Error::TypeMismatch {
                expected: dense.dtype(),
                actual: T::DTYPE,
            })
    }

    /// Materialise the view into an owned variable with fresh buffers.
    pub fn to_variable(&self) -> Result<Variable> {
        Ok(Variable {
            tag: self.var.tag,
            name: self.var.name.clone(),
            unit: self.var.unit,
            dims: self.dims,
            data: kernel::materialise(&self.view_ref())?,
        })
    }
}

impl AsViewRef for VariableSlice<'_> {
    fn view_ref(&self) -> ViewRef<'_> {
        ViewRef {
            elements: &self.var.data,
            dims: self.dims,
            parent: self.var.dims,
            base: self.base,
        }
    }
}

impl VariableRef for VariableSlice<'_> {
    fn tag(&self) -> Tag {
        self.var.tag
    }
    fn name(&self) -> &str {
        &self.var.name
    }
    fn unit(&self) -> Unit {
        self.var.unit
    }
    fn dims(&self) -> &Dimensions {
        &self.dims
    }
    fn dtype(&self) -> DType {
        self.var.data.dtype()
    }
}

/// Mutable strided view of a [`Variable`].
#[derive(Debug)]
pub struct VariableSliceMut<'a> {
    var: &'a mut Variable,
    dims: Dimensions,
    base: usize,
}

impl<'a> VariableSliceMut<'a> {
    pub(crate) fn whole(var: &'a mut Variable) -> Self {
        let dims = var.dims;
        Self { var, dims, base: 0 }
    }

    pub fn tag(&self) -> Tag {
        self.var.tag
    }

    pub fn name(&self) -> &str {
        &self.var.name
    }

    pub fn unit(&self) -> Unit {
        self.var.unit
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn dtype(&self) -> DType {
        self.var.data.dtype()
    }

    /// Narrow the view further, consuming it.
    pub fn slice(self, dim: Dim, index: usize) -> Result<Self> {
        let (dims, base) = collapse(&self.dims, &self.var.dims, self.base, dim, index)?;
        Ok(Self {
            var: self.var,
            dims,
            base,
        })
    }

    pub fn slice_range(self, dim: Dim, begin: usize, end: usize) -> Result<Self> {
        let (dims, base) = narrow(&self.dims, &self.var.dims, self.base, dim, begin, end)?;
        Ok(Self {
            var: self.var,
            dims,
            base,
        })
    }

    /// Reborrow as an immutable view.
    pub fn as_slice(&self) -> VariableSlice<'_> {
        VariableSlice {
            var: &*self.var,
            dims: self.dims,
            base: self.base,
        }
    }

    /// Change the unit of the underlying variable.
    ///
    /// Allowed only when the view covers the whole variable; a partial view
    /// fails with [`Error::Alias`]. Setting the unchanged unit is always
    /// permitted.
    pub fn set_unit(&mut self, unit: Unit) -> Result<()> {
        if unit != self.var.unit && self.dims != self.var.dims {
            return Err(Error::Alias("unit"));
        }
        self.var.unit = unit;
        Ok(())
    }

    pub fn add_assign<R: VariableRef + ?Sized>(&mut self, rhs: &R) -> Result<()> {
        op_assign(self.var, self.dims, self.base, rhs, BinOp::Add)
    }

    pub fn sub_assign<R: VariableRef + ?Sized>(&mut self, rhs: &R) -> Result<()> {
        op_assign(self.var, self.dims, self.base, rhs, BinOp::Sub)
    }

    pub fn mul_assign<R: VariableRef + ?Sized>(&mut self, rhs: &R) -> Result<()> {
        let unit = self.var.unit.multiply(rhs.unit())?;
        if unit != self.var.unit && self.dims != self.var.dims {
            return Err(Error::Alias("unit"));
        }
        op_assign(self.var, self.dims, self.base, rhs, BinOp::Mul)
    }

    /// Overwrite the viewed elements from `rhs`.
    ///
    /// Tags, units, and shapes must match exactly; the name is not assigned.
    pub fn copy_from<R: VariableRef + ?Sized>(&mut self, rhs: &R) -> Result<()> {
        if self.var.tag != rhs.tag() {
            return Err(Error::Incompatible {
                op: "assign between",
                what: "tags",
            });
        }
        if self.var.unit != rhs.unit() {
            return Err(Error::Unit {
                left: self.var.unit,
                right: rhs.unit(),
                op: "assign between",
            });
        }
        if self.dims != *rhs.dims() {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                actual: *rhs.dims(),
            });
        }
        let plan = ViewPlan::new(&self.dims, &self.dims, &self.var.dims, self.base)?;
        kernel::copy_view(&mut self.var.data, &plan, &rhs.view_ref())
    }
}

impl AsViewRef for VariableSliceMut<'_> {
    fn view_ref(&self) -> ViewRef<'_> {
        ViewRef {
            elements: &self.var.data,
            dims: self.dims,
            parent: self.var.dims,
            base: self.base,
        }
    }
}

impl VariableRef for VariableSliceMut<'_> {
    fn tag(&self) -> Tag {
        self.var.tag
    }
    fn name(&self) -> &str {
        &self.var.name
    }
    fn unit(&self) -> Unit {
        self.var.unit
    }
    fn dims(&self) -> &Dimensions {
        &self.dims
    }
    fn dtype(&self) -> DType {
        self.var.data.dtype()
    }
}

pub(crate) fn eq_refs<A: VariableRef + ?Sized, B: VariableRef + ?Sized>(a: &A, b: &B) -> bool {
    a.tag() == b.tag()
        && a.name() == b.name()
        && a.unit() == b.unit()
        && a.dims() == b.dims()
        && kernel::equal_views(&a.view_ref(), &b.view_ref())
}

impl PartialEq<VariableSlice<'_>> for Variable {
    fn eq(&self, other: &VariableSlice<'_>) -> bool {
        eq_refs(self, other)
    }
}

impl PartialEq<Variable> for VariableSlice<'_> {
    fn eq(&self, other: &Variable) -> bool {
        eq_refs(self, other)
    }
}

impl PartialEq for VariableSlice<'_> {
    fn eq(&self, other: &Self) -> bool {
        eq_refs(self, other)
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

fn op_assign<R: VariableRef + ?Sized>(
    var: &mut Variable,
    dst_dims: Dimensions,
    dst_base: usize,
    rhs: &R,
    op: BinOp,
) -> Result<()> {
    // All checks precede any mutation; a failed operation leaves the
    // destination untouched.
    let new_unit = match op {
        BinOp::Add | BinOp::Sub => {
            if var.unit != rhs.unit() {
                return Err(Error::Unit {
                    left: var.unit,
                    right: rhs.unit(),
                    op: op.name(),
                });
            }
            var.unit
        }
        BinOp::Mul => var.unit.multiply(rhs.unit())?,
    };
    if new_unit != var.unit && dst_dims != var.dims {
        return Err(Error::Alias("unit"));
    }
    if var.data.dtype() == DType::Dataset {
        return match op {
            BinOp::Add => add_nested_datasets(var, dst_dims, dst_base, rhs),
            BinOp::Sub => Err(Error::Unsupported(
                "subtraction of event lists is not supported",
            )),
            BinOp::Mul => Err(Error::Unsupported(
                "multiplication of event lists is not supported",
            )),
        };
    }
    if !dst_dims.contains(rhs.dims()) {
        return Err(Error::DimensionMismatch {
            expected: dst_dims,
            actual: *rhs.dims(),
        });
    }
    let parent = var.dims;
    let plan = ViewPlan::new(&dst_dims, &dst_dims, &parent, dst_base)?;
    kernel::apply_binary(&mut var.data, &plan, &rhs.view_ref(), op)?;
    var.unit = new_unit;
    Ok(())
}

/// Event-list and table addition: per-cell concatenation along the cell's
/// single dimension. Requires exactly matching shapes.
fn add_nested_datasets<R: VariableRef + ?Sized>(
    var: &mut Variable,
    dst_dims: Dimensions,
    dst_base: usize,
    rhs: &R,
) -> Result<()> {
    if rhs.dtype() != DType::Dataset {
        return Err(Error::TypeMismatch {
            expected: DType::Dataset,
            actual: rhs.dtype(),
        });
    }
    if dst_dims != *rhs.dims() {
        return Err(Error::DimensionMismatch {
            expected: dst_dims,
            actual: *rhs.dims(),
        });
    }
    let rhs_dense = kernel::materialise(&rhs.view_ref())?;
    let rhs_cells = match &rhs_dense {
        Elements::Dataset(buf) => buf.read(),
        _ => {
            return Err(Error::TypeMismatch {
                expected: DType::Dataset,
                actual: rhs_dense.dtype(),
            })
        }
    };
    if rhs_cells.is_empty() {
        return Ok(());
    }
    let parent = var.dims;
    let plan = ViewPlan::new(&dst_dims, &dst_dims, &parent, dst_base)?;
    let offsets: Vec<usize> = plan.offsets().collect();
    let new_cells = match &var.data {
        Elements::Dataset(buf) => {
            let lhs_cells = buf.read();
            let first = &lhs_cells[offsets[0]];
            if first.dimensions().ndim() != 1 || rhs_cells[0].dimensions().ndim() != 1 {
                return Err(Error::Unsupported(
                    "event-list addition requires nested datasets of dimension 1",
                ));
            }
            let dim = first.dimensions().label(0);
            concatenate_cells(lhs_cells, &offsets, rhs_cells, dim)?
        }
        other => {
            return Err(Error::TypeMismatch {
                expected: DType::Dataset,
                actual: other.dtype(),
            })
        }
    };
    if let Elements::Dataset(buf) = &mut var.data {
        let cells = buf.write();
        for (off, cell) in offsets.into_iter().zip(new_cells) {
            cells[off] = cell;
        }
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn concatenate_cells(
    lhs: &[Dataset],
    offsets: &[usize],
    rhs: &[Dataset],
    dim: Dim,
) -> Result<Vec<Dataset>> {
    use rayon::prelude::*;
    offsets
        .par_iter()
        .zip(rhs.par_iter())
        .map(|(&off, r)| crate::ops::concatenate(&lhs[off], r, dim))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn concatenate_cells(
    lhs: &[Dataset],
    offsets: &[usize],
    rhs: &[Dataset],
    dim: Dim,
) -> Result<Vec<Dataset>> {
    offsets
        .iter()
        .zip(rhs.iter())
        .map(|(&off, r)| crate::ops::concatenate(&lhs[off], r, dim))
        .collect()
}

/// `a + b` as a new variable.
pub fn add(a: &Variable, b: &Variable) -> Result<Variable> {
    let mut out = a.clone();
    out.add_assign(b)?;
    Ok(out)
}

/// `a - b` as a new variable.
pub fn sub(a: &Variable, b: &Variable) -> Result<Variable> {
    let mut out = a.clone();
    out.sub_assign(b)?;
    Ok(out)
}

/// `a * b` as a new variable.
pub fn mul(a: &Variable, b: &Variable) -> Result<Variable> {
    let mut out = a.clone();
    out.mul_assign(b)?;
    Ok(out)
}

// ============================================================================
// Structural free functions
// ============================================================================

/// Copy of the `index`-th layer along `dim`; the dimension is dropped.
pub fn slice(var: &Variable, dim: Dim, index: usize) -> Result<Variable> {
    let mut dims = var.dims;
    dims.erase(dim)?;
    let mut out = var.clone();
    out.set_dims(dims);
    kernel::copy_range(
        &mut out.data,
        &dims,
        dim,
        0,
        &var.data,
        &var.dims,
        index,
        index + 1,
    )?;
    Ok(out)
}

/// Copy of the `begin..end` range along `dim`; the dimension is kept.
pub fn slice_range(var: &Variable, dim: Dim, begin: usize, end: usize) -> Result<Variable> {
    let mut dims = var.dims;
    dims.resize(dim, end - begin)?;
    let mut out = var.clone();
    out.set_dims(dims);
    kernel::copy_range(&mut out.data, &dims, dim, 0, &var.data, &var.dims, begin, end)?;
    Ok(out)
}

/// Join two variables along `dim`.
///
/// An operand lacking `dim` contributes a single layer. Tags, names, units,
/// and all other dimensions must match.
pub fn concatenate(a: &Variable, b: &Variable, dim: Dim) -> Result<Variable> {
    if a.tag != b.tag {
        return Err(Error::Incompatible {
            op: "concatenate",
            what: "tags",
        });
    }
    if a.unit != b.unit {
        return Err(Error::Unit {
            left: a.unit,
            right: b.unit,
            op: "concatenate",
        });
    }
    if a.name != b.name {
        return Err(Error::Incompatible {
            op: "concatenate",
            what: "names",
        });
    }
    let dims = concatenate_dims(&a.dims, &b.dims, dim)?;
    let extent_a = a.dims.size(dim).unwrap_or(1);
    let extent_b = b.dims.size(dim).unwrap_or(1);
    let mut out = a.clone();
    out.set_dims(dims);
    kernel::copy_range(&mut out.data, &dims, dim, 0, &a.data, &a.dims, 0, extent_a)?;
    kernel::copy_range(
        &mut out.data,
        &dims,
        dim,
        extent_a,
        &b.data,
        &b.dims,
        0,
        extent_b,
    )?;
    Ok(out)
}

/// Split at the given positions along `dim`; the inverse of [`concatenate`].
pub fn split(var: &Variable, dim: Dim, indices: &[usize]) -> Result<Vec<Variable>> {
    if indices.is_empty() {
        return Ok(vec![var.clone()]);
    }
    let size = var.dims.size(dim)?;
    let mut parts = Vec::with_capacity(indices.len() + 1);
    let mut begin = 0;
    for &end in indices.iter().chain(std::iter::once(&size)) {
        parts.push(slice_range(var, dim, begin, end)?);
        begin = end;
    }
    Ok(parts)
}

/// Gather layers along `dim` in the order given by `indices`.
pub fn permute(var: &Variable, dim: Dim, indices: &[usize]) -> Result<Variable> {
    if indices.len() != var.dims.size(dim)? {
        return Err(Error::LengthMismatch {
            expected: var.dims.size(dim)?,
            actual: indices.len(),
        });
    }
    let mut out = var.clone();
    let dims = out.dims;
    for (i, &index) in indices.iter().enumerate() {
        kernel::copy_range(
            &mut out.data,
            &dims,
            dim,
            i,
            &var.data,
            &var.dims,
            index,
            index + 1,
        )?;
    }
    Ok(out)
}

/// Drop the layers along the mask's dimension where the mask is false.
///
/// The mask must be one-dimensional and boolean, with the extent of the
/// filtered dimension.
pub fn filter(var: &Variable, mask: &Variable) -> Result<Variable> {
    if mask.dims.ndim() != 1 {
        return Err(Error::Unsupported("filter mask must be one-dimensional"));
    }
    let dim = mask.dims.label(0);
    let keep = mask.values::<bool>()?;
    if keep.len() != var.dims.size(dim)? {
        return Err(Error::LengthMismatch {
            expected: var.dims.size(dim)?,
            actual: keep.len(),
        });
    }
    let kept = keep.iter().filter(|&&k| k).count();
    if kept == keep.len() {
        return Ok(var.clone());
    }
    let mut dims = var.dims;
    dims.resize(dim, kept)?;
    let mut out = var.clone();
    out.set_dims(dims);
    let mut out_index = 0;
    for (in_index, &k) in keep.iter().enumerate() {
        if k {
            kernel::copy_range(
                &mut out.data,
                &dims,
                dim,
                out_index,
                &var.data,
                &var.dims,
                in_index,
                in_index + 1,
            )?;
            out_index += 1;
        }
    }
    Ok(out)
}
