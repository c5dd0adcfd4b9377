//! Whole-dataset operations: pure arithmetic, slicing, concatenation,
//! splitting, filtering, sorting, and rebinning.
//!
//! These are built from the per-variable structural primitives and follow
//! the dataset rules: variables are matched by `(tag, name)`, bin-edge
//! coordinates get their special treatment (range ends bumped, shared edges
//! merged), and dimension-coordinates of a collapsed dimension are dropped.

use std::cmp::Ordering;

use crate::dataset::Dataset;
use crate::dims::Dim;
use crate::element::DType;
use crate::tag::{Tag, TagRole};
use crate::variable::{self, Variable};
use crate::{Error, Result};

/// `a + b` as a new dataset.
pub fn add(a: &Dataset, b: &Dataset) -> Result<Dataset> {
    let mut out = a.clone();
    out.add_assign(b)?;
    Ok(out)
}

/// `a - b` as a new dataset.
pub fn sub(a: &Dataset, b: &Dataset) -> Result<Dataset> {
    let mut out = a.clone();
    out.sub_assign(b)?;
    Ok(out)
}

/// `a * b` as a new dataset.
pub fn mul(a: &Dataset, b: &Dataset) -> Result<Dataset> {
    let mut out = a.clone();
    out.mul_assign(b)?;
    Ok(out)
}

/// Copy of the `index`-th layer along `dim`.
///
/// The dimension is dropped, along with its dimension-coordinates.
pub fn slice(d: &Dataset, dim: Dim, index: usize) -> Result<Dataset> {
    let mut out = Dataset::new();
    for v in d.iter() {
        if v.dims().contains_dim(dim) {
            if v.tag().coord_dim() == Some(dim) {
                continue;
            }
            out.insert(variable::slice(v, dim, index)?)?;
        } else {
            out.insert(v.clone())?;
        }
    }
    Ok(out)
}

/// Copy of the `begin..end` range along `dim`.
///
/// A bin-edge coordinate of `dim` is sliced with `end` bumped by one, so the
/// result keeps valid edges.
pub fn slice_range(d: &Dataset, dim: Dim, begin: usize, end: usize) -> Result<Dataset> {
    let data_extent = d.dimensions().size(dim)?;
    let mut out = Dataset::new();
    for v in d.iter() {
        if v.dims().contains_dim(dim) {
            let edge = is_edge_coord(v, dim, data_extent);
            let stop = if edge { end + 1 } else { end };
            out.insert(variable::slice_range(v, dim, begin, stop)?)?;
        } else {
            out.insert(v.clone())?;
        }
    }
    Ok(out)
}

fn is_edge_coord(v: &Variable, dim: Dim, data_extent: usize) -> bool {
    v.tag().coord_dim() == Some(dim) && v.dims().size(dim).ok() == Some(data_extent + 1)
}

/// Join two datasets along `dim`, matching variables by `(tag, name)`.
///
/// Variables lacking `dim` must either be equal (kept once) or are promoted
/// to extent 2 along `dim`. Bin-edge coordinates of `dim` are merged on
/// their shared edge: the last edge of `a` must equal the first edge of
/// `b`, which is stored once.
pub fn concatenate(a: &Dataset, b: &Dataset, dim: Dim) -> Result<Dataset> {
    for vb in b.iter() {
        if a.find(vb.tag(), vb.name()).is_none() {
            return Err(Error::MissingVariable {
                tag: vb.tag(),
                name: vb.name().to_string(),
            });
        }
    }
    let a_extent = a.dimensions().size(dim).ok();
    let b_extent = b.dimensions().size(dim).ok();
    let mut out = Dataset::new();
    for va in a.iter() {
        let j = b.find(va.tag(), va.name()).ok_or(Error::MissingVariable {
            tag: va.tag(),
            name: va.name().to_string(),
        })?;
        let vb = &b[j];
        let a_edge = a_extent.is_some_and(|n| is_edge_coord(va, dim, n));
        let b_edge = b_extent.is_some_and(|n| is_edge_coord(vb, dim, n));
        let joined = if !va.dims().contains_dim(dim) && !vb.dims().contains_dim(dim) && va == vb {
            va.clone()
        } else if a_edge || b_edge {
            if !(a_edge && b_edge) {
                return Err(Error::Incompatible {
                    op: "concatenate",
                    what: "bin-edge coordinates",
                });
            }
            join_edges(va, vb, dim)?
        } else {
            variable::concatenate(va, vb, dim)?
        };
        out.insert(joined)?;
    }
    Ok(out)
}

/// Shared-edge join of two bin-edge coordinates: the duplicated boundary
/// edge is stored once.
fn join_edges(va: &Variable, vb: &Variable, dim: Dim) -> Result<Variable> {
    let na = va.dims().size(dim)?;
    let nb = vb.dims().size(dim)?;
    let a_last = variable::slice(va, dim, na - 1)?;
    let b_first = variable::slice(vb, dim, 0)?;
    if a_last != b_first {
        return Err(Error::Incompatible {
            op: "concatenate",
            what: "shared bin edges",
        });
    }
    let b_tail = variable::slice_range(vb, dim, 1, nb)?;
    variable::concatenate(va, &b_tail, dim)
}

/// Split at the given positions along `dim`; the inverse of [`concatenate`].
pub fn split(d: &Dataset, dim: Dim, indices: &[usize]) -> Result<Vec<Dataset>> {
    if indices.is_empty() {
        return Ok(vec![d.clone()]);
    }
    let size = d.dimensions().size(dim)?;
    let mut parts = Vec::with_capacity(indices.len() + 1);
    let mut begin = 0;
    for &end in indices.iter().chain(std::iter::once(&size)) {
        parts.push(slice_range(d, dim, begin, end)?);
        begin = end;
    }
    Ok(parts)
}

/// Drop the layers along the mask's dimension where the mask is false.
///
/// Every variable carrying the dimension is compressed; the mask must be a
/// one-dimensional boolean variable with the dimension's data extent.
pub fn filter(d: &Dataset, select: &Variable) -> Result<Dataset> {
    if select.dims().ndim() != 1 {
        return Err(Error::Unsupported("filter mask must be one-dimensional"));
    }
    let dim = select.dims().label(0);
    let mut out = Dataset::new();
    for v in d.iter() {
        if v.dims().contains_dim(dim) {
            out.insert(variable::filter(v, select)?)?;
        } else {
            out.insert(v.clone())?;
        }
    }
    Ok(out)
}

/// Stable sort by the `(tag, name)` column; the permutation is applied to
/// every variable carrying that column's dimension.
pub fn sort(d: &Dataset, tag: Tag, name: &str) -> Result<Dataset> {
    let key_index = d.find(tag, name).ok_or(Error::MissingVariable {
        tag,
        name: name.to_string(),
    })?;
    let key = &d[key_index];
    if key.dims().ndim() != 1 {
        return Err(Error::Unsupported("sort key must be one-dimensional"));
    }
    let dim = key.dims().label(0);
    let order = match key.dtype() {
        DType::F64 => argsort(key.values::<f64>()?, |x, y| x.total_cmp(y)),
        DType::I32 => argsort(key.values::<i32>()?, Ord::cmp),
        DType::I64 => argsort(key.values::<i64>()?, Ord::cmp),
        DType::Bool => argsort(key.values::<bool>()?, Ord::cmp),
        DType::Str => argsort(key.values::<String>()?, Ord::cmp),
        dtype => {
            return Err(Error::UnsupportedElement { dtype, op: "sort" });
        }
    };
    let mut out = Dataset::new();
    for v in d.iter() {
        if v.dims().contains_dim(dim) {
            out.insert(variable::permute(v, dim, &order)?)?;
        } else {
            out.insert(v.clone())?;
        }
    }
    Ok(out)
}

fn argsort<T, F: Fn(&T, &T) -> Ordering>(values: &[T], cmp: F) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| cmp(&values[i], &values[j]));
    order
}

/// Rebin every `f64` data variable carrying the dimension of `new_coord`
/// onto the new edges; the old dimension-coordinate is replaced.
pub fn rebin(d: &Dataset, new_coord: &Variable) -> Result<Dataset> {
    let dim = new_coord.tag().coord_dim().ok_or(Error::Unsupported(
        "rebin requires a dimension-coordinate holding the new bin edges",
    ))?;
    let old_coord = d.variable(new_coord.tag())?.clone();
    let mut out = Dataset::new();
    for v in d.iter() {
        if v.tag() == new_coord.tag() && v.name().is_empty() {
            out.insert(new_coord.clone())?;
        } else if v.dims().contains_dim(dim) {
            if v.tag().role() == TagRole::Data && v.dtype() == DType::F64 {
                out.insert(crate::rebin(v, &old_coord, new_coord)?)?;
            } else {
                return Err(Error::UnsupportedElement {
                    dtype: v.dtype(),
                    op: "rebin",
                });
            }
        } else {
            out.insert(v.clone())?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{CoordTag, DataTag};
    use crate::Dimensions;

    fn table() -> Dataset {
        let mut t = Dataset::new();
        t.insert(
            Variable::with_values(
                CoordTag::RowLabel.into(),
                Dimensions::one(Dim::Row, 3).unwrap(),
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
            )
            .unwrap(),
        )
        .unwrap();
        let mut value = Variable::with_values(
            DataTag::Value.into(),
            Dimensions::one(Dim::Row, 3).unwrap(),
            vec![1.0, -2.0, 3.0],
        )
        .unwrap();
        value.set_name("Data").unwrap();
        t.insert(value).unwrap();
        let mut comment = Variable::with_values(
            DataTag::String.into(),
            Dimensions::one(Dim::Row, 3).unwrap(),
            vec![String::new(), "negative".to_string(), String::new()],
        )
        .unwrap();
        comment.set_name("Comment").unwrap();
        t.insert(comment).unwrap();
        t
    }

    fn labels(d: &Dataset) -> Vec<String> {
        d.values::<String>(CoordTag::RowLabel.into()).unwrap().to_vec()
    }

    #[test]
    fn sort_by_column_reorders_all_columns() {
        let sorted = sort(&table(), DataTag::Value.into(), "Data").unwrap();
        assert_eq!(labels(&sorted), vec!["b", "a", "c"]);
        assert_eq!(
            sorted
                .values_by_name::<f64>(DataTag::Value.into(), "Data")
                .unwrap(),
            &[-2.0, 1.0, 3.0]
        );
        assert_eq!(
            sorted
                .values_by_name::<String>(DataTag::String.into(), "Comment")
                .unwrap(),
            &["negative".to_string(), String::new(), String::new()]
        );
    }

    #[test]
    fn sort_by_string_column() {
        let sorted = sort(&table(), CoordTag::RowLabel.into(), "").unwrap();
        assert_eq!(labels(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn concatenate_and_split_round_trip() {
        let t = table();
        let merged = concatenate(&t, &t, Dim::Row).unwrap();
        assert_eq!(merged.dimensions().size(Dim::Row).unwrap(), 6);
        let parts = split(&merged, Dim::Row, &[3]).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], t);
        assert_eq!(parts[1], t);
    }

    #[test]
    fn row_removal_via_range_slices() {
        let t = table();
        let merged = concatenate(&t, &t, Dim::Row).unwrap();
        let head = slice_range(&merged, Dim::Row, 0, 2).unwrap();
        let tail = slice_range(&merged, Dim::Row, 4, 6).unwrap();
        let recombined = concatenate(&head, &tail, Dim::Row).unwrap();
        assert_eq!(labels(&recombined), vec!["a", "b", "b", "c"]);
    }

    #[test]
    fn slice_of_table_row() {
        let row = slice(&table(), Dim::Row, 1).unwrap();
        // The Row dimension-coordinate is dropped.
        assert!(!row.contains(CoordTag::RowLabel.into(), ""));
        assert_eq!(
            row.values_by_name::<f64>(DataTag::Value.into(), "Data").unwrap(),
            &[-2.0]
        );
    }

    #[test]
    fn filter_compresses_all_columns() {
        let mask = Variable::with_values(
            CoordTag::Mask.into(),
            Dimensions::one(Dim::Row, 3).unwrap(),
            vec![true, false, true],
        )
        .unwrap();
        let filtered = filter(&table(), &mask).unwrap();
        assert_eq!(filtered.dimensions().size(Dim::Row).unwrap(), 2);
        assert_eq!(labels(&filtered), vec!["a", "c"]);
        assert_eq!(
            filtered
                .values_by_name::<f64>(DataTag::Value.into(), "Data")
                .unwrap(),
            &[1.0, 3.0]
        );
    }

    fn histogram() -> Dataset {
        let mut d = Dataset::new();
        d.insert(
            Variable::with_values(
                CoordTag::X.into(),
                Dimensions::one(Dim::X, 4).unwrap(),
                vec![0.0, 1.0, 2.0, 3.0],
            )
            .unwrap(),
        )
        .unwrap();
        let mut counts = Variable::with_values(
            DataTag::Value.into(),
            Dimensions::one(Dim::X, 3).unwrap(),
            vec![10.0, 20.0, 30.0],
        )
        .unwrap();
        counts.set_name("counts").unwrap();
        d.insert(counts).unwrap();
        d
    }

    #[test]
    fn concatenate_merges_shared_edge() {
        let left = histogram();
        let mut right = histogram();
        // Shift the right histogram to start where the left one ends.
        for edge in right.values_mut::<f64>(CoordTag::X.into()).unwrap() {
            *edge += 3.0;
        }
        let joined = concatenate(&left, &right, Dim::X).unwrap();
        assert_eq!(joined.dimensions().size(Dim::X).unwrap(), 6);
        assert_eq!(
            joined.values::<f64>(CoordTag::X.into()).unwrap(),
            &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
        assert_eq!(
            joined
                .values_by_name::<f64>(DataTag::Value.into(), "counts")
                .unwrap(),
            &[10.0, 20.0, 30.0, 10.0, 20.0, 30.0]
        );
    }

    #[test]
    fn concatenate_rejects_disjoint_edges() {
        let left = histogram();
        let mut right = histogram();
        for edge in right.values_mut::<f64>(CoordTag::X.into()).unwrap() {
            *edge += 10.0;
        }
        assert!(matches!(
            concatenate(&left, &right, Dim::X),
            Err(Error::Incompatible { .. })
        ));
    }

    #[test]
    fn slice_range_keeps_edges_valid() {
        let d = histogram();
        let cut = slice_range(&d, Dim::X, 1, 3).unwrap();
        assert_eq!(
            cut.values::<f64>(CoordTag::X.into()).unwrap(),
            &[1.0, 2.0, 3.0]
        );
        assert_eq!(
            cut.values_by_name::<f64>(DataTag::Value.into(), "counts").unwrap(),
            &[20.0, 30.0]
        );
    }

    #[test]
    fn rebin_dataset_replaces_coordinate() {
        let d = histogram();
        let new_coord = Variable::with_values(
            CoordTag::X.into(),
            Dimensions::one(Dim::X, 2).unwrap(),
            vec![0.0, 3.0],
        )
        .unwrap();
        let rebinned = rebin(&d, &new_coord).unwrap();
        assert_eq!(rebinned.dimensions().size(Dim::X).unwrap(), 1);
        assert_eq!(
            rebinned
                .values_by_name::<f64>(DataTag::Value.into(), "counts")
                .unwrap(),
            &[60.0]
        );
        assert_eq!(
            rebinned.values::<f64>(CoordTag::X.into()).unwrap(),
            &[0.0, 3.0]
        );
    }

    #[test]
    fn dataset_pure_arithmetic() {
        let d = histogram();
        let doubled = add(&d, &d).unwrap();
        assert_eq!(
            doubled
                .values_by_name::<f64>(DataTag::Value.into(), "counts")
                .unwrap(),
            &[20.0, 40.0, 60.0]
        );
        let zero = sub(&doubled, &doubled).unwrap();
        assert_eq!(
            zero.values_by_name::<f64>(DataTag::Value.into(), "counts").unwrap(),
            &[0.0, 0.0, 0.0]
        );
    }
}
