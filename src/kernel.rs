//! The element-wise execution engine.
//!
//! All data movement of the crate funnels through this module: in-place
//! binary arithmetic with broadcasting and transposition, strided copies for
//! the structural operations (slice, concatenate, set-slice, permute,
//! filter), view materialisation, and elementwise equality through views.
//!
//! Operands are described by a [`ViewRef`]: the element storage, the labels
//! the operand exposes, the layout of the underlying buffer, and a base
//! offset. The kernel derives a [`ViewPlan`] per operand and picks between a
//! dense zip walk and a strided odometer walk.

use num_traits::Num;

use crate::buffer::Buffer;
use crate::dims::{Dim, Dimensions};
use crate::element::{with_buffer_pair, Elements};
use crate::view::{broadcast_plan, ViewPlan};
use crate::{Error, Result};

/// In-place binary operations of the arithmetic kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
}

impl BinOp {
    pub fn name(self) -> &'static str {
        match self {
            BinOp::Add => "addition",
            BinOp::Sub => "subtraction",
            BinOp::Mul => "multiplication",
        }
    }
}

/// A read-side operand: storage plus the labeled view onto it.
///
/// For an owned variable `dims == parent` and `base == 0`; for a slice view
/// `parent` is the underlying variable's shape, `dims` the sliced shape, and
/// `base` the accumulated range offset.
#[derive(Clone, Copy)]
pub(crate) struct ViewRef<'a> {
    pub elements: &'a Elements,
    pub dims: Dimensions,
    pub parent: Dimensions,
    pub base: usize,
}

impl<'a> ViewRef<'a> {
    pub fn whole(elements: &'a Elements, dims: &Dimensions) -> Self {
        Self {
            elements,
            dims: *dims,
            parent: *dims,
            base: 0,
        }
    }

    fn plan_onto(&self, target: &Dimensions) -> Result<ViewPlan> {
        ViewPlan::new(target, &self.dims, &self.parent, self.base)
    }
}

/// Apply `dst[i] = dst[i] op src[i]` over the walk described by `dst_plan`.
///
/// The source is broadcast (and, where label order differs, transposed) onto
/// the destination's target shape; `dst_plan.dims()` must contain
/// `src.dims`. Element types must match and be arithmetic.
///
/// When source and destination share storage the write access detaches the
/// destination (copy-on-write), so the source keeps reading the
/// pre-operation values and self-overlapping updates stay correct.
pub(crate) fn apply_binary(
    dst: &mut Elements,
    dst_plan: &ViewPlan,
    src: &ViewRef<'_>,
    op: BinOp,
) -> Result<()> {
    let src_plan = broadcast_plan(dst_plan.dims(), &src.dims, &src.parent, src.base)?;
    match (dst, src.elements) {
        (Elements::F64(a), Elements::F64(b)) => apply_typed(a, b, dst_plan, &src_plan, op),
        (Elements::I32(a), Elements::I32(b)) => apply_typed(a, b, dst_plan, &src_plan, op),
        (Elements::I64(a), Elements::I64(b)) => apply_typed(a, b, dst_plan, &src_plan, op),
        (Elements::Str(_), Elements::Str(_)) => Err(Error::Unsupported(
            "cannot add strings, use concatenate to join them",
        )),
        (a, b) if a.dtype() == b.dtype() => Err(Error::UnsupportedElement {
            dtype: a.dtype(),
            op: op.name(),
        }),
        (a, b) => Err(Error::TypeMismatch {
            expected: a.dtype(),
            actual: b.dtype(),
        }),
    }
}

fn apply_typed<T: Num + Copy>(
    dst: &mut Buffer<T>,
    src: &Buffer<T>,
    dst_plan: &ViewPlan,
    src_plan: &ViewPlan,
    op: BinOp,
) -> Result<()> {
    let combine = |x: T, y: T| match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
    };
    let n = dst_plan.len();
    let s = src.read();
    let d = dst.write();
    if dst_plan.is_dense() && src_plan.is_dense() {
        let db = dst_plan.base();
        let sb = src_plan.base();
        for i in 0..n {
            d[db + i] = combine(d[db + i], s[sb + i]);
        }
    } else {
        for (od, os) in dst_plan.offsets().zip(src_plan.offsets()) {
            d[od] = combine(d[od], s[os]);
        }
    }
    Ok(())
}

/// Elementwise equality of two views of the same shape.
///
/// The caller is responsible for comparing metadata; shapes that differ in
/// label order compare unequal at the metadata level and never reach this.
pub(crate) fn equal_views(a: &ViewRef<'_>, b: &ViewRef<'_>) -> bool {
    if a.dims != b.dims {
        return false;
    }
    if a.elements.ptr_eq(b.elements) && a.parent == b.parent && a.base == b.base {
        return true;
    }
    let (Ok(pa), Ok(pb)) = (a.plan_onto(&a.dims), b.plan_onto(&a.dims)) else {
        return false;
    };
    with_buffer_pair!(a.elements, b.elements, (x, y) => {
        let xs = x.read();
        let ys = y.read();
        pa.offsets().zip(pb.offsets()).all(|(i, j)| xs[i] == ys[j])
    }, else => false)
}

/// Copy a view into a freshly allocated dense column, in view order.
pub(crate) fn materialise(src: &ViewRef<'_>) -> Result<Elements> {
    let plan = src.plan_onto(&src.dims)?;
    macro_rules! gather {
        ($buf:expr, $variant:ident) => {{
            let vals = $buf.read();
            Elements::$variant(Buffer::new(
                plan.offsets().map(|i| vals[i].clone()).collect(),
            ))
        }};
    }
    Ok(match src.elements {
        Elements::F64(b) => gather!(b, F64),
        Elements::I32(b) => gather!(b, I32),
        Elements::I64(b) => gather!(b, I64),
        Elements::Bool(b) => gather!(b, Bool),
        Elements::Str(b) => gather!(b, Str),
        Elements::StrList(b) => gather!(b, StrList),
        Elements::IndexList(b) => gather!(b, IndexList),
        Elements::IndexPair(b) => gather!(b, IndexPair),
        Elements::F64Triple(b) => gather!(b, F64Triple),
        Elements::F64Quad(b) => gather!(b, F64Quad),
        Elements::SharedF64List(b) => gather!(b, SharedF64List),
        Elements::FuzzyF64(b) => gather!(b, FuzzyF64),
        Elements::Dataset(b) => gather!(b, Dataset),
    })
}

/// Copy a source view into the destination walk, any element type.
///
/// The source is broadcast onto the destination's target shape.
pub(crate) fn copy_view(dst: &mut Elements, dst_plan: &ViewPlan, src: &ViewRef<'_>) -> Result<()> {
    let src_plan = broadcast_plan(dst_plan.dims(), &src.dims, &src.parent, src.base)?;
    let (expected, actual) = (dst.dtype(), src.elements.dtype());
    with_buffer_pair!(dst, src.elements, (d, s) => {
        let sv = s.read();
        let dv = d.write();
        for (od, os) in dst_plan.offsets().zip(src_plan.offsets()) {
            dv[od] = sv[os].clone();
        }
        Ok(())
    }, else => Err(Error::TypeMismatch { expected, actual }))
}

/// Copy a `dim`-range of `src` into `dst` at position `dst_begin` along
/// `dim`.
///
/// The iteration shape is `dst_dims` with `dim` resized to the copied range;
/// an operand lacking `dim` contributes a broadcast (or a plain full copy).
/// This single routine backs slice, concatenate, set-slice, permute, and
/// filter.
pub(crate) fn copy_range(
    dst: &mut Elements,
    dst_dims: &Dimensions,
    dim: Dim,
    dst_begin: usize,
    src: &Elements,
    src_dims: &Dimensions,
    src_begin: usize,
    src_end: usize,
) -> Result<()> {
    let delta = src_end - src_begin;
    let mut iter_dims = *dst_dims;
    if iter_dims.contains_dim(dim) {
        iter_dims.resize(dim, delta)?;
    }
    let dst_base = match dst_dims.offset(dim) {
        Ok(stride) => dst_begin * stride,
        Err(_) => dst_begin * dst_dims.volume(),
    };
    let src_base = match src_dims.offset(dim) {
        Ok(stride) => src_begin * stride,
        Err(_) => src_begin * src_dims.volume(),
    };
    let dst_plan = ViewPlan::new(&iter_dims, &iter_dims, dst_dims, dst_base)?;
    let src_ref = ViewRef {
        elements: src,
        dims: *src_dims,
        parent: *src_dims,
        base: src_base,
    };
    let src_plan = ViewPlan::new(&iter_dims, &src_ref.dims, &src_ref.parent, src_ref.base)?;
    let (expected, actual) = (dst.dtype(), src.dtype());
    with_buffer_pair!(dst, src, (d, s) => {
        let sv = s.read();
        let dv = d.write();
        for (od, os) in dst_plan.offsets().zip(src_plan.offsets()) {
            dv[od] = sv[os].clone();
        }
        Ok(())
    }, else => Err(Error::TypeMismatch { expected, actual }))
}
