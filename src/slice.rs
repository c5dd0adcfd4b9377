//! Dataset slices: non-owning selections of variables with active
//! sub-ranges.
//!
//! A slice records which variables of a dataset are selected (by index) and
//! which dimension ranges are active. Selecting by name keeps all
//! coordinates plus the matching variables; selecting a sub-range along a
//! dimension narrows every variable that carries it; collapsing a dimension
//! additionally drops that dimension's dimension-coordinates (values keep
//! their bin-edge coordinate only while the dimension exists). Iteration
//! yields per-variable strided views.

use smallvec::SmallVec;

use crate::dataset::Dataset;
use crate::dims::Dim;
use crate::kernel::BinOp;
use crate::variable::{eq_refs, Variable, VariableRef, VariableSlice, VariableSliceMut};
use crate::{Error, Result};

type Ranges = SmallVec<[(Dim, usize, Option<usize>); 2]>;

fn set_range(ranges: &mut Ranges, dim: Dim, begin: usize, end: Option<usize>) {
    for range in ranges.iter_mut() {
        if range.0 == dim {
            range.1 = begin;
            range.2 = end;
            return;
        }
    }
    ranges.push((dim, begin, end));
}

fn make_slice<'a>(var: &'a Variable, ranges: &Ranges) -> Result<VariableSlice<'a>> {
    let mut slice = VariableSlice::whole(var);
    for &(dim, begin, end) in ranges.iter() {
        if !slice.dims().contains_dim(dim) {
            continue;
        }
        slice = match end {
            Some(end) => slice.slice_range(dim, begin, end)?,
            None => slice.slice(dim, begin)?,
        };
    }
    Ok(slice)
}

fn make_slice_mut<'a>(var: &'a mut Variable, ranges: &Ranges) -> Result<VariableSliceMut<'a>> {
    let mut slice = VariableSliceMut::whole(var);
    for &(dim, begin, end) in ranges.iter() {
        if !slice.dims().contains_dim(dim) {
            continue;
        }
        slice = match end {
            Some(end) => slice.slice_range(dim, begin, end)?,
            None => slice.slice(dim, begin)?,
        };
    }
    Ok(slice)
}

fn selected_by_name(dataset: &Dataset, name: &str) -> Vec<usize> {
    dataset
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_coord() || v.name() == name)
        .map(|(i, _)| i)
        .collect()
}

/// Immutable selection of a dataset's variables with active sub-ranges.
#[derive(Debug, Clone)]
pub struct DatasetSlice<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
    ranges: Ranges,
}

impl<'a> DatasetSlice<'a> {
    pub(crate) fn whole(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            indices: (0..dataset.len()).collect(),
            ranges: Ranges::new(),
        }
    }

    pub(crate) fn by_name(dataset: &'a Dataset, name: &str) -> Self {
        Self {
            dataset,
            indices: selected_by_name(dataset, name),
            ranges: Ranges::new(),
        }
    }

    /// Narrow to `begin..end` along `dim`; replaces an earlier range for the
    /// same dimension.
    pub fn range(mut self, dim: Dim, begin: usize, end: usize) -> Self {
        set_range(&mut self.ranges, dim, begin, Some(end));
        self
    }

    /// Collapse `dim` at `index`, dropping its dimension-coordinates.
    pub fn at(mut self, dim: Dim, index: usize) -> Self {
        set_range(&mut self.ranges, dim, index, None);
        self.indices
            .retain(|&i| self.dataset[i].tag().coord_dim() != Some(dim));
        self
    }

    /// Number of selected variables.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn contains(&self, tag: crate::Tag, name: &str) -> bool {
        self.indices
            .iter()
            .any(|&i| self.dataset[i].tag() == tag && self.dataset[i].name() == name)
    }

    /// The `i`-th selected variable as a strided view.
    pub fn get(&self, i: usize) -> Result<VariableSlice<'a>> {
        make_slice(&self.dataset[self.indices[i]], &self.ranges)
    }

    /// Views of all selected variables, in selection order.
    pub fn iter(&self) -> impl Iterator<Item = Result<VariableSlice<'a>>> + '_ {
        self.indices
            .iter()
            .map(|&i| make_slice(&self.dataset[i], &self.ranges))
    }

    /// Materialise into an owned dataset with fresh buffers.
    pub fn to_dataset(&self) -> Result<Dataset> {
        let mut out = Dataset::new();
        for slice in self.iter() {
            out.insert(slice?.to_variable()?)?;
        }
        Ok(out)
    }
}

impl PartialEq for DatasetSlice<'_> {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|slice| {
            let Ok(slice) = slice else { return false };
            other.iter().any(|candidate| match candidate {
                Ok(candidate) => slice == candidate,
                Err(_) => false,
            })
        })
    }
}

/// Mutable selection of a dataset's variables with active sub-ranges.
///
/// Supports in-place arithmetic and overwriting (`copy_from`) through the
/// selected views.
#[derive(Debug)]
pub struct DatasetSliceMut<'a> {
    dataset: &'a mut Dataset,
    indices: Vec<usize>,
    ranges: Ranges,
}

impl<'a> DatasetSliceMut<'a> {
    pub(crate) fn whole(dataset: &'a mut Dataset) -> Self {
        let indices = (0..dataset.len()).collect();
        Self {
            dataset,
            indices,
            ranges: Ranges::new(),
        }
    }

    pub(crate) fn by_name(dataset: &'a mut Dataset, name: &str) -> Self {
        let indices = selected_by_name(dataset, name);
        Self {
            dataset,
            indices,
            ranges: Ranges::new(),
        }
    }

    pub fn range(mut self, dim: Dim, begin: usize, end: usize) -> Self {
        set_range(&mut self.ranges, dim, begin, Some(end));
        self
    }

    pub fn at(mut self, dim: Dim, index: usize) -> Self {
        set_range(&mut self.ranges, dim, index, None);
        self.indices
            .retain(|&i| self.dataset[i].tag().coord_dim() != Some(dim));
        self
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Reborrow as an immutable selection.
    pub fn as_slice(&self) -> DatasetSlice<'_> {
        DatasetSlice {
            dataset: &*self.dataset,
            indices: self.indices.clone(),
            ranges: self.ranges.clone(),
        }
    }

    fn find_index(&self, tag: crate::Tag, name: &str) -> Option<usize> {
        self.indices
            .iter()
            .copied()
            .find(|&i| self.dataset[i].tag() == tag && self.dataset[i].name() == name)
    }

    fn op_assign_refs(&mut self, rhs: &[&dyn VariableRef], op: BinOp) -> Result<()> {
        for r in rhs {
            match r.tag().role() {
                crate::TagRole::Coord => {
                    if let Some(i) = self.find_index(r.tag(), r.name()) {
                        let mine = make_slice(&self.dataset[i], &self.ranges)?;
                        if !eq_refs(&mine, *r) {
                            return Err(Error::CoordMismatch(r.tag()));
                        }
                    }
                }
                crate::TagRole::Attr => {}
                crate::TagRole::Data => {
                    if self.find_index(r.tag(), r.name()).is_none() {
                        return Err(Error::MissingVariable {
                            tag: r.tag(),
                            name: r.name().to_string(),
                        });
                    }
                }
            }
        }
        for r in rhs {
            if r.tag().role() != crate::TagRole::Data {
                continue;
            }
            let i = self
                .find_index(r.tag(), r.name())
                .ok_or(Error::MissingVariable {
                    tag: r.tag(),
                    name: r.name().to_string(),
                })?;
            let mut view = make_slice_mut(&mut self.dataset.variables_mut()[i], &self.ranges)?;
            match op {
                BinOp::Add => view.add_assign(*r)?,
                BinOp::Sub => view.sub_assign(*r)?,
                BinOp::Mul => view.mul_assign(*r)?,
            }
        }
        Ok(())
    }

    /// `self += rhs` through the selected views.
    pub fn add_assign(&mut self, rhs: &Dataset) -> Result<()> {
        let refs: Vec<&dyn VariableRef> = rhs.iter().map(|v| v as &dyn VariableRef).collect();
        self.op_assign_refs(&refs, BinOp::Add)
    }

    pub fn sub_assign(&mut self, rhs: &Dataset) -> Result<()> {
        let refs: Vec<&dyn VariableRef> = rhs.iter().map(|v| v as &dyn VariableRef).collect();
        self.op_assign_refs(&refs, BinOp::Sub)
    }

    pub fn mul_assign(&mut self, rhs: &Dataset) -> Result<()> {
        let refs: Vec<&dyn VariableRef> = rhs.iter().map(|v| v as &dyn VariableRef).collect();
        self.op_assign_refs(&refs, BinOp::Mul)
    }

    /// `self += rhs` with a slice operand.
    pub fn add_assign_slice(&mut self, rhs: &DatasetSlice<'_>) -> Result<()> {
        let views: Vec<VariableSlice<'_>> = rhs.iter().collect::<Result<_>>()?;
        let refs: Vec<&dyn VariableRef> = views.iter().map(|v| v as &dyn VariableRef).collect();
        self.op_assign_refs(&refs, BinOp::Add)
    }

    pub fn sub_assign_slice(&mut self, rhs: &DatasetSlice<'_>) -> Result<()> {
        let views: Vec<VariableSlice<'_>> = rhs.iter().collect::<Result<_>>()?;
        let refs: Vec<&dyn VariableRef> = views.iter().map(|v| v as &dyn VariableRef).collect();
        self.op_assign_refs(&refs, BinOp::Sub)
    }

    pub fn mul_assign_slice(&mut self, rhs: &DatasetSlice<'_>) -> Result<()> {
        let views: Vec<VariableSlice<'_>> = rhs.iter().collect::<Result<_>>()?;
        let refs: Vec<&dyn VariableRef> = views.iter().map(|v| v as &dyn VariableRef).collect();
        self.op_assign_refs(&refs, BinOp::Mul)
    }

    /// Overwrite every selected view from the matching variable of `src`.
    pub fn copy_from(&mut self, src: &Dataset) -> Result<()> {
        for i in self.indices.clone() {
            let (tag, name) = {
                let variable = &self.dataset[i];
                (variable.tag(), variable.name().to_string())
            };
            let j = src.find(tag, &name).ok_or(Error::MissingVariable {
                tag,
                name: name.clone(),
            })?;
            let mut view = make_slice_mut(&mut self.dataset.variables_mut()[i], &self.ranges)?;
            view.copy_from(&src[j])?;
        }
        Ok(())
    }
}
