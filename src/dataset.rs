//! The dataset: an ordered, uniquely-keyed collection of variables with a
//! coherent union shape.
//!
//! Variables are keyed by `(tag, name)`; coordinates are unnamed. All
//! variables using a dimension agree on its extent, except that the unique
//! dimension-coordinate of a dimension may hold one extra element (bin edges
//! against bin values). The union shape caches the data extent of every
//! dimension in use and is maintained incrementally on insertion and rebuilt
//! on removal.

use smallvec::SmallVec;

use crate::dims::{Dim, Dimensions};
use crate::element::Element;
use crate::kernel::BinOp;
use crate::slice::{DatasetSlice, DatasetSliceMut};
use crate::tag::{Tag, TagRole};
use crate::unit::Unit;
use crate::variable::{eq_refs, Variable, VariableRef};
use crate::{Error, Result};

/// An insertion-ordered set of [`Variable`]s sharing a coherent union shape.
///
/// Typical datasets hold a handful of columns, so lookup is a linear scan
/// over a small inline vector. Cloning is O(1) per column (copy-on-write
/// buffers).
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    dims: Dimensions,
    variables: SmallVec<[Variable; 4]>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variables (not elements).
    #[inline]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.variables.iter()
    }

    pub(crate) fn variables_mut(&mut self) -> &mut SmallVec<[Variable; 4]> {
        &mut self.variables
    }

    /// The union shape: every dimension in use with its data extent.
    #[inline]
    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    /// Append a variable, validating key uniqueness and extent coherence.
    pub fn insert(&mut self, variable: Variable) -> Result<()> {
        if self.find(variable.tag(), variable.name()).is_some() {
            return Err(Error::DuplicateKey {
                tag: variable.tag(),
                name: variable.name().to_string(),
            });
        }
        self.merge_dims(&variable)?;
        self.variables.push(variable);
        Ok(())
    }

    /// Insert every variable of `other`. Variables equal to an existing one
    /// are skipped; conflicting keys fail.
    pub fn merge(&mut self, other: &Dataset) -> Result<()> {
        for variable in other.iter() {
            match self.find(variable.tag(), variable.name()) {
                Some(i) if self.variables[i] == *variable => {}
                Some(_) => {
                    return Err(Error::DuplicateKey {
                        tag: variable.tag(),
                        name: variable.name().to_string(),
                    })
                }
                None => self.insert(variable.clone())?,
            }
        }
        Ok(())
    }

    /// Remove the variable with the given key; dimensions no longer used by
    /// any variable leave the union shape.
    pub fn erase(&mut self, tag: Tag, name: &str) -> Result<()> {
        let i = self.find(tag, name).ok_or(Error::MissingVariable {
            tag,
            name: name.to_string(),
        })?;
        self.variables.remove(i);
        self.dims = derive_dims(&self.variables);
        Ok(())
    }

    /// Remove and return all variables carrying `name`; coordinates stay.
    pub fn extract(&mut self, name: &str) -> Result<Dataset> {
        if !self.variables.iter().any(|v| v.name() == name && !v.is_coord()) {
            return Err(Error::Unsupported(
                "dataset does not contain variables with the requested name",
            ));
        }
        let mut extracted = Dataset::new();
        let mut kept = SmallVec::new();
        for variable in std::mem::take(&mut self.variables) {
            if !variable.is_coord() && variable.name() == name {
                extracted.insert(variable)?;
            } else {
                kept.push(variable);
            }
        }
        self.variables = kept;
        self.dims = derive_dims(&self.variables);
        Ok(extracted)
    }

    /// Index of the variable with the exact `(tag, name)` key.
    pub fn find(&self, tag: Tag, name: &str) -> Option<usize> {
        self.variables
            .iter()
            .position(|v| v.tag() == tag && v.name() == name)
    }

    /// Index of the unique variable with `tag`; ambiguity is an error.
    pub fn find_unique(&self, tag: Tag) -> Result<usize> {
        let mut found = None;
        for (i, v) in self.variables.iter().enumerate() {
            if v.tag() == tag {
                if found.is_some() {
                    return Err(Error::Uniqueness(tag));
                }
                found = Some(i);
            }
        }
        found.ok_or(Error::MissingVariable {
            tag,
            name: String::new(),
        })
    }

    pub fn contains(&self, tag: Tag, name: &str) -> bool {
        self.find(tag, name).is_some()
    }

    /// The unique variable with `tag`.
    pub fn variable(&self, tag: Tag) -> Result<&Variable> {
        Ok(&self.variables[self.find_unique(tag)?])
    }

    pub fn variable_by_name(&self, tag: Tag, name: &str) -> Result<&Variable> {
        let i = self.find(tag, name).ok_or(Error::MissingVariable {
            tag,
            name: name.to_string(),
        })?;
        Ok(&self.variables[i])
    }

    /// Typed elements of the unique variable with `tag`.
    pub fn values<T: Element>(&self, tag: Tag) -> Result<&[T]> {
        self.variable(tag)?.values()
    }

    /// Typed mutable elements of the unique variable with `tag`.
    ///
    /// Shape, name, and unit stay under dataset control; only element values
    /// can change through this access.
    pub fn values_mut<T: Element>(&mut self, tag: Tag) -> Result<&mut [T]> {
        let i = self.find_unique(tag)?;
        self.variables[i].values_mut()
    }

    pub fn values_by_name<T: Element>(&self, tag: Tag, name: &str) -> Result<&[T]> {
        self.variable_by_name(tag, name)?.values()
    }

    pub fn values_by_name_mut<T: Element>(&mut self, tag: Tag, name: &str) -> Result<&mut [T]> {
        let i = self.find(tag, name).ok_or(Error::MissingVariable {
            tag,
            name: name.to_string(),
        })?;
        self.variables[i].values_mut()
    }

    /// Shape of the unique variable with `tag`.
    pub fn dimensions_of(&self, tag: Tag) -> Result<&Dimensions> {
        Ok(self.variable(tag)?.dims())
    }

    pub fn unit_of(&self, tag: Tag) -> Result<Unit> {
        Ok(self.variable(tag)?.unit())
    }

    /// View keeping coordinates plus the variables matching `name`.
    pub fn select<'a>(&'a self, name: &str) -> DatasetSlice<'a> {
        DatasetSlice::by_name(self, name)
    }

    /// View of the half-open range `begin..end` along `dim`.
    pub fn range(&self, dim: Dim, begin: usize, end: usize) -> DatasetSlice<'_> {
        DatasetSlice::whole(self).range(dim, begin, end)
    }

    /// View with `dim` collapsed at `index`; drops the dimension-coordinates
    /// of `dim`.
    pub fn at(&self, dim: Dim, index: usize) -> DatasetSlice<'_> {
        DatasetSlice::whole(self).at(dim, index)
    }

    /// Mutable view keeping coordinates plus the variables matching `name`.
    pub fn select_mut<'a>(&'a mut self, name: &str) -> DatasetSliceMut<'a> {
        DatasetSliceMut::by_name(self, name)
    }

    /// Mutable view of the half-open range `begin..end` along `dim`.
    pub fn range_mut(&mut self, dim: Dim, begin: usize, end: usize) -> DatasetSliceMut<'_> {
        DatasetSliceMut::whole(self).range(dim, begin, end)
    }

    /// Mutable view with `dim` collapsed at `index`; drops the
    /// dimension-coordinates of `dim`.
    pub fn at_mut(&mut self, dim: Dim, index: usize) -> DatasetSliceMut<'_> {
        DatasetSliceMut::whole(self).at(dim, index)
    }

    /// Write the `dim`-reduced dataset `src` into position `index` along
    /// `dim`. Dimension-coordinates of `dim` are left untouched.
    pub fn set_slice(&mut self, src: &Dataset, dim: Dim, index: usize) -> Result<()> {
        for i in 0..self.variables.len() {
            let variable = &self.variables[i];
            if !variable.dims().contains_dim(dim) || variable.tag().coord_dim() == Some(dim) {
                continue;
            }
            let tag = variable.tag();
            let name = variable.name().to_string();
            let j = src.find(tag, &name).ok_or(Error::MissingVariable {
                tag,
                name: name.clone(),
            })?;
            self.variables[i].set_slice(&src.variables[j], dim, index)?;
        }
        Ok(())
    }

    /// `self op= rhs` over all data variables of `rhs`.
    pub(crate) fn op_assign_refs(&mut self, rhs: &[&dyn VariableRef], op: BinOp) -> Result<()> {
        for r in rhs {
            match r.tag().role() {
                TagRole::Coord => {
                    if let Some(i) = self.find(r.tag(), r.name()) {
                        if !eq_refs(&self.variables[i], *r) {
                            return Err(Error::CoordMismatch(r.tag()));
                        }
                    }
                }
                TagRole::Attr => {}
                TagRole::Data => {
                    if self.find(r.tag(), r.name()).is_none() {
                        return Err(Error::MissingVariable {
                            tag: r.tag(),
                            name: r.name().to_string(),
                        });
                    }
                }
            }
        }
        for r in rhs {
            if r.tag().role() != TagRole::Data {
                continue;
            }
            let i = self.find(r.tag(), r.name()).ok_or(Error::MissingVariable {
                tag: r.tag(),
                name: r.name().to_string(),
            })?;
            let variable = &mut self.variables[i];
            match op {
                BinOp::Add => variable.add_assign(*r)?,
                BinOp::Sub => variable.sub_assign(*r)?,
                BinOp::Mul => variable.mul_assign(*r)?,
            }
        }
        Ok(())
    }

    /// `self += rhs`: element-wise over matching data variables; coordinates
    /// present in both operands must agree; event lists concatenate.
    pub fn add_assign(&mut self, rhs: &Dataset) -> Result<()> {
        let refs: Vec<&dyn VariableRef> = rhs.iter().map(|v| v as &dyn VariableRef).collect();
        self.op_assign_refs(&refs, BinOp::Add)
    }

    /// `self -= rhs`.
    pub fn sub_assign(&mut self, rhs: &Dataset) -> Result<()> {
        let refs: Vec<&dyn VariableRef> = rhs.iter().map(|v| v as &dyn VariableRef).collect();
        self.op_assign_refs(&refs, BinOp::Sub)
    }

    /// `self *= rhs`.
    pub fn mul_assign(&mut self, rhs: &Dataset) -> Result<()> {
        let refs: Vec<&dyn VariableRef> = rhs.iter().map(|v| v as &dyn VariableRef).collect();
        self.op_assign_refs(&refs, BinOp::Mul)
    }

    fn merge_dims(&mut self, variable: &Variable) -> Result<()> {
        let vdims = variable.dims();
        let new_edge_dim = variable.tag().coord_dim();
        let mut merged = self.dims;
        for (i, &dim) in vdims.labels().iter().enumerate() {
            let extent = vdims.size_at(i);
            for existing in &self.variables {
                let Ok(existing_extent) = existing.dims().size(dim) else {
                    continue;
                };
                if existing_extent == extent {
                    continue;
                }
                let new_is_edge = new_edge_dim == Some(dim) && extent == existing_extent + 1;
                let old_is_edge =
                    existing.tag().coord_dim() == Some(dim) && existing_extent == extent + 1;
                if new_is_edge || old_is_edge {
                    continue;
                }
                return Err(
                    if new_edge_dim == Some(dim) || existing.tag().coord_dim() == Some(dim) {
                        Error::EdgeMismatch {
                            dim,
                            expected: existing_extent,
                            actual: extent,
                        }
                    } else {
                        Error::DimensionMismatch {
                            expected: *existing.dims(),
                            actual: *vdims,
                        }
                    },
                );
            }
            match merged.size(dim) {
                Ok(current) if extent < current => merged.resize(dim, extent)?,
                Ok(_) => {}
                Err(_) => merged.add(dim, extent)?,
            }
        }
        self.dims = merged;
        Ok(())
    }
}

/// The union shape of a consistent variable list: per dimension the smallest
/// extent in use (the data extent when an edge coordinate is present).
fn derive_dims(variables: &[Variable]) -> Dimensions {
    let mut dims = Dimensions::new();
    for variable in variables {
        for (i, &dim) in variable.dims().labels().iter().enumerate() {
            let extent = variable.dims().size_at(i);
            match dims.size(dim) {
                Ok(current) if extent < current => {
                    let _ = dims.resize(dim, extent);
                }
                Ok(_) => {}
                Err(_) => {
                    let _ = dims.add(dim, extent);
                }
            }
        }
    }
    dims
}

impl std::ops::Index<usize> for Dataset {
    type Output = Variable;

    fn index(&self, i: usize) -> &Variable {
        &self.variables[i]
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter()
    }
}

impl PartialEq for Dataset {
    /// Same multiset of `(tag, name)` keys with equal variables; insertion
    /// order does not matter.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.variables.iter().all(|v| {
                other
                    .find(v.tag(), v.name())
                    .is_some_and(|j| other.variables[j] == *v)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{CoordTag, DataTag};

    fn coord_x(values: &[f64]) -> Variable {
        Variable::with_values(
            CoordTag::X.into(),
            Dimensions::one(Dim::X, values.len()).unwrap(),
            values.to_vec(),
        )
        .unwrap()
    }

    fn data(name: &str, pairs: &[(Dim, usize)], values: &[f64]) -> Variable {
        let mut var = Variable::with_values(
            DataTag::Value.into(),
            Dimensions::from_pairs(pairs).unwrap(),
            values.to_vec(),
        )
        .unwrap();
        var.set_name(name).unwrap();
        var
    }

    #[test]
    fn insert_and_lookup() {
        let mut d = Dataset::new();
        d.insert(coord_x(&[1.0, 2.0])).unwrap();
        d.insert(data("a", &[(Dim::X, 2)], &[10.0, 20.0])).unwrap();
        assert_eq!(d.len(), 2);
        assert!(d.contains(CoordTag::X.into(), ""));
        assert!(d.contains(DataTag::Value.into(), "a"));
        assert_eq!(d.values::<f64>(CoordTag::X.into()).unwrap(), &[1.0, 2.0]);
        assert_eq!(
            d.values_by_name::<f64>(DataTag::Value.into(), "a").unwrap(),
            &[10.0, 20.0]
        );
        assert_eq!(d.dimensions().size(Dim::X).unwrap(), 2);
    }

    #[test]
    fn insert_rejects_duplicate_key() {
        let mut d = Dataset::new();
        d.insert(data("a", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        let err = d.insert(data("a", &[(Dim::X, 2)], &[3.0, 4.0]));
        assert!(matches!(err, Err(Error::DuplicateKey { .. })));
        assert!(d.insert(data("b", &[(Dim::X, 2)], &[3.0, 4.0])).is_ok());
    }

    #[test]
    fn insert_rejects_extent_mismatch() {
        let mut d = Dataset::new();
        d.insert(data("a", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        let err = d.insert(data("b", &[(Dim::X, 3)], &[1.0, 2.0, 3.0]));
        assert!(matches!(err, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn edge_coordinate_may_exceed_data_extent_by_one() {
        let mut d = Dataset::new();
        d.insert(data("counts", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        d.insert(coord_x(&[0.0, 1.0, 2.0])).unwrap();
        // Union shape keeps the data extent.
        assert_eq!(d.dimensions().size(Dim::X).unwrap(), 2);
        // Edges first, data second works too.
        let mut d2 = Dataset::new();
        d2.insert(coord_x(&[0.0, 1.0, 2.0])).unwrap();
        d2.insert(data("counts", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        assert_eq!(d2.dimensions().size(Dim::X).unwrap(), 2);
        // Two apart is no edge.
        let mut d3 = Dataset::new();
        d3.insert(data("counts", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        assert!(matches!(
            d3.insert(coord_x(&[0.0, 1.0, 2.0, 3.0])),
            Err(Error::EdgeMismatch { .. })
        ));
    }

    #[test]
    fn find_unique_reports_ambiguity() {
        let mut d = Dataset::new();
        d.insert(data("a", &[(Dim::X, 1)], &[1.0])).unwrap();
        assert!(d.find_unique(DataTag::Value.into()).is_ok());
        d.insert(data("b", &[(Dim::X, 1)], &[2.0])).unwrap();
        assert!(matches!(
            d.find_unique(DataTag::Value.into()),
            Err(Error::Uniqueness(_))
        ));
        assert!(matches!(
            d.find_unique(DataTag::Variance.into()),
            Err(Error::MissingVariable { .. })
        ));
    }

    #[test]
    fn erase_shrinks_union_dims() {
        let mut d = Dataset::new();
        d.insert(coord_x(&[1.0, 2.0])).unwrap();
        d.insert(data("a", &[(Dim::Y, 3)], &[1.0, 2.0, 3.0])).unwrap();
        assert!(d.dimensions().contains_dim(Dim::Y));
        d.erase(DataTag::Value.into(), "a").unwrap();
        assert!(!d.dimensions().contains_dim(Dim::Y));
        assert!(d.dimensions().contains_dim(Dim::X));
    }

    #[test]
    fn extract_moves_named_variables() {
        let mut d = Dataset::new();
        d.insert(coord_x(&[1.0, 2.0])).unwrap();
        d.insert(data("a", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        d.insert(data("b", &[(Dim::X, 2)], &[3.0, 4.0])).unwrap();
        let extracted = d.extract("a").unwrap();
        assert_eq!(extracted.len(), 1);
        assert_eq!(d.len(), 2);
        assert!(!d.contains(DataTag::Value.into(), "a"));
        assert!(d.contains(CoordTag::X.into(), ""));
    }

    #[test]
    fn merge_accepts_equal_coords_and_rejects_conflicts() {
        let mut a = Dataset::new();
        a.insert(coord_x(&[1.0, 2.0])).unwrap();
        a.insert(data("a", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        let mut b = Dataset::new();
        b.insert(coord_x(&[1.0, 2.0])).unwrap();
        b.insert(data("b", &[(Dim::X, 2)], &[3.0, 4.0])).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.len(), 3);
        let mut c = Dataset::new();
        c.insert(data("a", &[(Dim::X, 2)], &[9.0, 9.0])).unwrap();
        assert!(matches!(a.merge(&c), Err(Error::DuplicateKey { .. })));
    }

    #[test]
    fn dataset_arithmetic_matches_by_key() {
        let mut a = Dataset::new();
        a.insert(coord_x(&[1.0, 2.0])).unwrap();
        a.insert(data("counts", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        let b = a.clone();
        a.add_assign(&b).unwrap();
        assert_eq!(
            a.values_by_name::<f64>(DataTag::Value.into(), "counts")
                .unwrap(),
            &[2.0, 4.0]
        );
        // Coordinates do not participate.
        assert_eq!(d_coord(&a), &[1.0, 2.0]);
    }

    fn d_coord(d: &Dataset) -> &[f64] {
        d.values::<f64>(CoordTag::X.into()).unwrap()
    }

    #[test]
    fn dataset_arithmetic_rejects_missing_variable() {
        let mut a = Dataset::new();
        a.insert(data("a", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        let mut b = Dataset::new();
        b.insert(data("other", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        assert!(matches!(
            a.add_assign(&b),
            Err(Error::MissingVariable { .. })
        ));
    }

    #[test]
    fn dataset_arithmetic_rejects_coord_mismatch() {
        let mut a = Dataset::new();
        a.insert(coord_x(&[1.0, 2.0])).unwrap();
        a.insert(data("counts", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        let mut b = Dataset::new();
        b.insert(coord_x(&[1.0, 3.0])).unwrap();
        b.insert(data("counts", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        assert!(matches!(a.add_assign(&b), Err(Error::CoordMismatch(_))));
    }

    #[test]
    fn equality_ignores_order() {
        let mut a = Dataset::new();
        a.insert(coord_x(&[1.0, 2.0])).unwrap();
        a.insert(data("v", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        let mut b = Dataset::new();
        b.insert(data("v", &[(Dim::X, 2)], &[1.0, 2.0])).unwrap();
        b.insert(coord_x(&[1.0, 2.0])).unwrap();
        assert_eq!(a, b);
        let mut c = b.clone();
        c.values_by_name_mut::<f64>(DataTag::Value.into(), "v").unwrap()[0] = 9.0;
        assert_ne!(a, c);
    }

    #[test]
    fn set_slice_round_trip() {
        let mut d = Dataset::new();
        d.insert(coord_x(&[1.0, 2.0, 3.0])).unwrap();
        d.insert(data(
            "v",
            &[(Dim::X, 3), (Dim::Y, 2)],
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        ))
        .unwrap();
        let mut rebuilt = d.clone();
        for value in rebuilt
            .values_by_name_mut::<f64>(DataTag::Value.into(), "v")
            .unwrap()
        {
            *value = 0.0;
        }
        for index in 0..3 {
            let layer = crate::ops::slice(&d, Dim::X, index).unwrap();
            rebuilt.set_slice(&layer, Dim::X, index).unwrap();
        }
        assert_eq!(rebuilt, d);
    }
}
