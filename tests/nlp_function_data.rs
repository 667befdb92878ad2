//! Structure-freeze tests for the sparse (A, B, D) helper.

use colloc::nlp_function_data::NlpFunctionData;
use colloc::types::ConfigError;
use ndarray::array;

#[test]
fn pattern_before_freeze_is_an_error() {
    let mut data = NlpFunctionData::new(2, 4, 2);
    let err = data.jac_sparsity_pattern().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSetup(_)));
}

#[test]
fn pattern_is_binarized_and_cached() {
    let mut data = NlpFunctionData::new(2, 4, 2);
    data.insert_b_identity().unwrap();
    data.insert_d_entry(0, 1, 1.0).unwrap();
    // Structural zero: the entry exists but can never be nonzero.
    data.insert_d_entry(1, 3, 0.0).unwrap();
    data.freeze().unwrap();

    let pat = data.jac_sparsity_pattern().unwrap().clone();
    assert_eq!(pat.shape(), (2, 4));
    for (&v, (row, col)) in pat.iter() {
        assert_eq!(v, if (row, col) == (0, 1) { 1.0 } else { 0.0 });
    }
    // Second call serves the cached pattern unchanged.
    assert_eq!(data.jac_sparsity_pattern().unwrap(), &pat);
}

#[test]
fn d_updates_outside_the_frozen_structure_fail() {
    let mut data = NlpFunctionData::new(1, 3, 1);
    data.insert_b_identity().unwrap();
    data.insert_d_entry(0, 0, 1.0).unwrap();
    data.freeze().unwrap();

    data.set_d_entry(0, 0, 4.0).unwrap();
    let err = data.set_d_entry(0, 2, 1.0).unwrap_err();
    assert!(matches!(err, ConfigError::PatternMismatch { row: 0, col: 2 }));

    let f = data.compute_functions(&array![5.0], &array![0.0, 0.0, 0.0]).unwrap();
    assert_eq!(f, array![5.0]);
    let jac = data.compute_jacobian().unwrap().to_dense();
    assert_eq!(jac[[0, 0]], 4.0);
}
