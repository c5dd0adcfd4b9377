//! End-to-end properties of the variable layer: copy-on-write, broadcast,
//! transposition, unit algebra, slicing round trips, and rebinning.

use approx::assert_relative_eq;
use dataset_rs::{
    concatenate, rebin, slice, slice_range, split, CoordTag, DataTag, Dim, Dimensions, Unit,
    Variable,
};

fn value_var(pairs: &[(Dim, usize)], values: &[f64]) -> Variable {
    Variable::with_values(
        DataTag::Value.into(),
        Dimensions::from_pairs(pairs).unwrap(),
        values.to_vec(),
    )
    .unwrap()
}

#[test]
fn data_size_matches_volume() {
    let var = value_var(&[(Dim::Y, 3), (Dim::X, 2)], &[0.0; 6]);
    assert_eq!(var.data().len(), var.dims().volume());
    assert!(Variable::with_values::<f64>(
        DataTag::Value.into(),
        Dimensions::one(Dim::X, 3).unwrap(),
        vec![0.0; 2],
    )
    .is_err());
}

#[test]
fn copy_on_write_preserves_original() {
    let original = value_var(&[(Dim::X, 3)], &[1.0, 2.0, 3.0]);
    let mut copy = original.clone();
    copy.values_mut::<f64>().unwrap()[1] = 99.0;
    assert_eq!(original.values::<f64>().unwrap(), &[1.0, 2.0, 3.0]);
    assert_eq!(copy.values::<f64>().unwrap(), &[1.0, 99.0, 3.0]);
}

#[test]
fn doubling_in_place() {
    // x = [1.1, 2.2]; x += x.
    let mut x = value_var(&[(Dim::X, 2)], &[1.1, 2.2]);
    let alias = x.clone();
    x.add_assign(&alias).unwrap();
    assert_relative_eq!(x.values::<f64>().unwrap()[0], 2.2);
    assert_relative_eq!(x.values::<f64>().unwrap()[1], 4.4);
}

#[test]
fn broadcast_add_keeps_lhs_shape() {
    let mut a = value_var(&[(Dim::Y, 2), (Dim::X, 3)], &[1.0; 6]);
    let row = value_var(&[(Dim::X, 3)], &[1.0, 2.0, 3.0]);
    let dims_before = *a.dims();
    a.add_assign(&row).unwrap();
    assert_eq!(*a.dims(), dims_before);
    assert_eq!(
        a.values::<f64>().unwrap(),
        &[2.0, 3.0, 4.0, 2.0, 3.0, 4.0]
    );
}

#[test]
fn transposed_operand_gives_identical_result() {
    let base = value_var(&[(Dim::Y, 3), (Dim::X, 2)], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let plain = value_var(&[(Dim::Y, 3), (Dim::X, 2)], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let transposed = value_var(&[(Dim::X, 2), (Dim::Y, 3)], &[1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);

    let mut via_plain = base.clone();
    via_plain.add_assign(&plain).unwrap();
    let mut via_transposed = base.clone();
    via_transposed.add_assign(&transposed).unwrap();
    assert_eq!(via_plain, via_transposed);
    assert_eq!(
        via_transposed.values::<f64>().unwrap(),
        &[2.0, 4.0, 6.0, 8.0, 10.0, 12.0]
    );
}

#[test]
fn unit_algebra_through_arithmetic() {
    // Multiplying two Length coordinates yields Area values.
    let mut coord = Variable::with_values(
        CoordTag::X.into(),
        Dimensions::one(Dim::X, 2).unwrap(),
        vec![2.0, 3.0],
    )
    .unwrap();
    let copy = coord.clone();
    coord.mul_assign(&copy).unwrap();
    assert_eq!(coord.values::<f64>().unwrap(), &[4.0, 9.0]);
    assert_eq!(coord.unit(), Unit::Area);

    // Addition requires equal units and keeps them.
    let mut a = value_var(&[(Dim::X, 2)], &[1.0, 2.0]);
    let b = value_var(&[(Dim::X, 2)], &[3.0, 4.0]);
    a.add_assign(&b).unwrap();
    assert_eq!(a.unit(), Unit::Dimensionless);
    let mut mismatched = a.clone();
    mismatched.set_unit(Unit::Length);
    assert!(mismatched.add_assign(&b).is_err());
}

#[test]
fn failed_operation_leaves_destination_unchanged() {
    let mut a = value_var(&[(Dim::X, 2)], &[1.0, 2.0]);
    let wrong_shape = value_var(&[(Dim::Y, 2)], &[1.0, 2.0]);
    assert!(a.add_assign(&wrong_shape).is_err());
    assert_eq!(a.values::<f64>().unwrap(), &[1.0, 2.0]);
    let mut wrong_unit = a.clone();
    wrong_unit.set_unit(Unit::Length);
    assert!(a.add_assign(&wrong_unit).is_err());
    assert_eq!(a.values::<f64>().unwrap(), &[1.0, 2.0]);
}

#[test]
fn slice_reassembly_reproduces_variable() {
    let parent = value_var(
        &[(Dim::Z, 2), (Dim::Y, 3), (Dim::X, 2)],
        &(1..=12).map(f64::from).collect::<Vec<_>>(),
    );
    for dim in [Dim::Z, Dim::Y, Dim::X] {
        let mut rebuilt =
            Variable::with_default(DataTag::Value.into(), *parent.dims()).unwrap();
        for index in 0..parent.dims().size(dim).unwrap() {
            rebuilt
                .set_slice(&slice(&parent, dim, index).unwrap(), dim, index)
                .unwrap();
        }
        assert_eq!(rebuilt, parent);
    }
}

#[test]
fn split_inverts_concatenate() {
    let a = value_var(&[(Dim::X, 2), (Dim::Y, 2)], &[1.0, 2.0, 3.0, 4.0]);
    let b = value_var(&[(Dim::X, 3), (Dim::Y, 2)], &[5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    let joined = concatenate(&a, &b, Dim::X).unwrap();
    assert_eq!(joined.dims().size(Dim::X).unwrap(), 5);
    let parts = split(&joined, Dim::X, &[2]).unwrap();
    assert_eq!(parts, vec![a, b]);
}

#[test]
fn slice_views_share_until_materialised() {
    let var = value_var(&[(Dim::Y, 2), (Dim::X, 3)], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let view = var.slice_range(Dim::X, 1, 3).unwrap();
    assert_eq!(view.to_values::<f64>().unwrap(), vec![2.0, 3.0, 5.0, 6.0]);
    let owned = view.to_variable().unwrap();
    assert!(!owned.data().ptr_eq(var.data()));
    assert_eq!(owned, view);
}

#[test]
fn rebin_identity() {
    let var = value_var(&[(Dim::X, 3)], &[1.5, 2.5, 3.5]);
    let edges = Variable::with_values(
        CoordTag::X.into(),
        Dimensions::one(Dim::X, 4).unwrap(),
        vec![0.0, 1.0, 2.0, 3.0],
    )
    .unwrap();
    let rebinned = rebin(&var, &edges, &edges).unwrap();
    let out = rebinned.values::<f64>().unwrap();
    for (r, o) in out.iter().zip(var.values::<f64>().unwrap()) {
        assert_relative_eq!(*r, *o, epsilon = 1e-12);
    }
}

#[test]
fn rebin_two_bins_into_one() {
    // v = [1, 2] on edges [1, 2, 3] rebinned to [1, 3] gives [3].
    let var = value_var(&[(Dim::X, 2)], &[1.0, 2.0]);
    let old_edges = Variable::with_values(
        CoordTag::X.into(),
        Dimensions::one(Dim::X, 3).unwrap(),
        vec![1.0, 2.0, 3.0],
    )
    .unwrap();
    let new_edges = Variable::with_values(
        CoordTag::X.into(),
        Dimensions::one(Dim::X, 2).unwrap(),
        vec![1.0, 3.0],
    )
    .unwrap();
    let rebinned = rebin(&var, &old_edges, &new_edges).unwrap();
    assert_eq!(rebinned.dims().volume(), 1);
    assert_eq!(rebinned.values::<f64>().unwrap(), &[3.0]);
}

#[test]
fn rebin_conserves_total_weight() {
    let var = value_var(&[(Dim::X, 6)], &[3.0, 1.0, 4.0, 1.0, 5.0, 9.0]);
    let old_edges = Variable::with_values(
        CoordTag::X.into(),
        Dimensions::one(Dim::X, 7).unwrap(),
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
    )
    .unwrap();
    let new_edges = Variable::with_values(
        CoordTag::X.into(),
        Dimensions::one(Dim::X, 4).unwrap(),
        vec![0.0, 2.5, 4.5, 6.0],
    )
    .unwrap();
    let rebinned = rebin(&var, &old_edges, &new_edges).unwrap();
    let total_before: f64 = var.values::<f64>().unwrap().iter().sum();
    let total_after: f64 = rebinned.values::<f64>().unwrap().iter().sum();
    assert_relative_eq!(total_before, total_after, epsilon = 1e-12);
}

#[test]
fn range_slice_of_materialised_variable() {
    let parent = value_var(
        &[(Dim::Z, 3), (Dim::Y, 2), (Dim::X, 4)],
        &(1..=24).map(f64::from).collect::<Vec<_>>(),
    );
    let cut = slice_range(&parent, Dim::X, 1, 3).unwrap();
    assert_eq!(
        *cut.dims(),
        Dimensions::from_pairs(&[(Dim::Z, 3), (Dim::Y, 2), (Dim::X, 2)]).unwrap()
    );
    assert_eq!(
        cut.values::<f64>().unwrap(),
        &[2.0, 3.0, 6.0, 7.0, 10.0, 11.0, 14.0, 15.0, 18.0, 19.0, 22.0, 23.0]
    );
}
