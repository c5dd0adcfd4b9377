//! Overlap-weighted rebinning of histogrammed values.
//!
//! Redistributes binned values from one strictly increasing edge coordinate
//! onto another along a single dimension. Each output bin receives the
//! fraction of every overlapping input bin proportional to the overlap
//! width. Rebinning the innermost dimension with one-dimensional edges runs
//! one dense subhistogram at a time (in parallel under the `parallel`
//! feature); any other layout goes through stride-aware indexing.

use num_traits::Num;

use crate::element::DType;
use crate::variable::Variable;
use crate::view::ViewPlan;
use crate::{Error, Result};

/// Resample `var` from bin edges `old_coord` onto bin edges `new_coord`.
///
/// The rebinned dimension is the one `new_coord`'s tag binds to. `var` must
/// hold `f64` values with extent `M` along that dimension, `old_coord` holds
/// `M + 1` edges, and the result has `new_edges - 1` bins. Edges are assumed
/// strictly increasing. Units are untouched; variances can be rebinned
/// separately with the same call.
pub fn rebin(var: &Variable, old_coord: &Variable, new_coord: &Variable) -> Result<Variable> {
    let dim = new_coord
        .tag()
        .coord_dim()
        .ok_or(Error::Unsupported(
            "rebin requires a dimension-coordinate holding the new bin edges",
        ))?;
    if var.dtype() != DType::F64 {
        return Err(Error::UnsupportedElement {
            dtype: var.dtype(),
            op: "rebin",
        });
    }
    for coord in [old_coord, new_coord] {
        if coord.dtype() != DType::F64 {
            return Err(Error::TypeMismatch {
                expected: DType::F64,
                actual: coord.dtype(),
            });
        }
    }
    let old_size = var.dims().size(dim)?;
    let old_edges = old_coord.dims().size(dim)?;
    if old_edges != old_size + 1 {
        return Err(Error::EdgeMismatch {
            dim,
            expected: old_size,
            actual: old_edges,
        });
    }
    let new_edges = new_coord.dims().size(dim)?;
    if new_edges == 0 {
        return Err(Error::EdgeMismatch {
            dim,
            expected: 1,
            actual: 0,
        });
    }
    let new_size = new_edges - 1;

    let mut dims = *var.dims();
    dims.resize(dim, new_size)?;
    let mut out = var.clone();
    out.set_dims(dims);
    for value in out.values_mut::<f64>()? {
        *value = 0.0;
    }
    if new_size == 0 || old_size == 0 {
        return Ok(out);
    }

    let src = var.values::<f64>()?;
    let xold = old_coord.values::<f64>()?;
    let xnew = new_coord.values::<f64>()?;

    let innermost = var.dims().label(var.dims().ndim() - 1) == dim;
    if innermost && old_coord.dims().ndim() == 1 && new_coord.dims().ndim() == 1 {
        rebin_inner(out.values_mut::<f64>()?, new_size, src, old_size, xold, xnew);
        return Ok(out);
    }

    // Stride-aware path: walk the outer index product, one subhistogram per
    // outer position. Coordinates lacking outer dimensions broadcast.
    let mut outer = dims;
    outer.erase(dim)?;
    let dst_stride = dims.offset(dim)?;
    let src_stride = var.dims().offset(dim)?;
    let xo_stride = old_coord.dims().offset(dim)?;
    let xn_stride = new_coord.dims().offset(dim)?;
    let dst_outer = ViewPlan::new(&outer, &outer, &dims, 0)?;
    let src_outer = ViewPlan::new(&outer, var.dims(), var.dims(), 0)?;
    let xo_outer = ViewPlan::new(&outer, old_coord.dims(), old_coord.dims(), 0)?;
    let xn_outer = ViewPlan::new(&outer, new_coord.dims(), new_coord.dims(), 0)?;

    let dst = out.values_mut::<f64>()?;
    for (((d0, s0), xo0), xn0) in dst_outer
        .offsets()
        .zip(src_outer.offsets())
        .zip(xo_outer.offsets())
        .zip(xn_outer.offsets())
    {
        rebin_strided(
            dst, d0, dst_stride, new_size, src, s0, src_stride, old_size, xold, xo0, xo_stride,
            xnew, xn0, xn_stride,
        );
    }
    Ok(out)
}

/// Dense inner-dimension path: output and input decompose into contiguous
/// subhistograms sharing one pair of edge arrays.
fn rebin_inner(
    dst: &mut [f64],
    new_size: usize,
    src: &[f64],
    old_size: usize,
    xold: &[f64],
    xnew: &[f64],
) {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        dst.par_chunks_mut(new_size)
            .zip(src.par_chunks(old_size))
            .for_each(|(target, source)| {
                rebin_strided(
                    target, 0, 1, new_size, source, 0, 1, old_size, xold, 0, 1, xnew, 0, 1,
                );
            });
    }
    #[cfg(not(feature = "parallel"))]
    {
        for (target, source) in dst.chunks_mut(new_size).zip(src.chunks(old_size)) {
            rebin_strided(
                target, 0, 1, new_size, source, 0, 1, old_size, xold, 0, 1, xnew, 0, 1,
            );
        }
    }
}

/// Two-cursor overlap walk over one subhistogram.
#[allow(clippy::too_many_arguments)]
fn rebin_strided<T: Num + Copy + PartialOrd>(
    dst: &mut [T],
    d0: usize,
    d_stride: usize,
    n_new: usize,
    src: &[T],
    s0: usize,
    s_stride: usize,
    n_old: usize,
    xold: &[T],
    xo0: usize,
    xo_stride: usize,
    xnew: &[T],
    xn0: usize,
    xn_stride: usize,
) {
    let mut iold = 0;
    let mut inew = 0;
    while iold < n_old && inew < n_new {
        let xo_low = xold[xo0 + iold * xo_stride];
        let xo_high = xold[xo0 + (iold + 1) * xo_stride];
        let xn_low = xnew[xn0 + inew * xn_stride];
        let xn_high = xnew[xn0 + (inew + 1) * xn_stride];
        if xn_high <= xo_low {
            // New bin entirely below the old one.
            inew += 1;
        } else if xo_high <= xn_low {
            // New bin entirely above the old one.
            iold += 1;
        } else {
            let upper = if xo_high < xn_high { xo_high } else { xn_high };
            let lower = if xo_low > xn_low { xo_low } else { xn_low };
            let width = xo_high - xo_low;
            let i = d0 + inew * d_stride;
            dst[i] = dst[i] + src[s0 + iold * s_stride] * (upper - lower) / width;
            if xn_high > xo_high {
                iold += 1;
            } else {
                inew += 1;
            }
        }
    }
}
