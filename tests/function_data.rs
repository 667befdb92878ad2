//! Validation tests for the evaluation-point and function-group
//! containers.

use colloc::function_data::{FunctionInputData, FunctionOutputData, PathFuncProperties};
use colloc::types::ConfigError;
use ndarray::{array, Array2};

// ─────────────────────────────────────────────────────────────
//  FunctionInputData
// ─────────────────────────────────────────────────────────────

#[test]
fn input_snapshot_round_trip() {
    let mut inp = FunctionInputData::new(3, 2, 1);
    assert_eq!(inp.phase_num(), 3);
    assert_eq!(inp.state(), &array![0.0, 0.0]);

    inp.set_state(&array![1.0, 2.0]);
    inp.set_time(4.5);
    inp.set_statics(&array![9.0]);
    inp.set_state_element(1, 7.0).unwrap();
    inp.set_static_element(0, 8.0).unwrap();

    assert_eq!(inp.state(), &array![1.0, 7.0]);
    assert_eq!(inp.time(), 4.5);
    assert_eq!(inp.statics(), &array![8.0]);
}

#[test]
fn input_flags_default_off() {
    let mut inp = FunctionInputData::new(0, 1, 0);
    assert!(!inp.is_perturbing());
    assert!(!inp.is_sparsity());
    inp.set_is_perturbing(true);
    inp.set_is_sparsity(true);
    assert!(inp.is_perturbing());
    assert!(inp.is_sparsity());
}

#[test]
fn input_rejects_out_of_range_elements() {
    let mut inp = FunctionInputData::new(0, 2, 0);
    let err = inp.set_state_element(2, 1.0).unwrap_err();
    assert!(matches!(err, ConfigError::IndexOutOfRange { .. }));
    let err = inp.set_static_element(0, 1.0).unwrap_err();
    assert!(matches!(err, ConfigError::IndexOutOfRange { .. }));
}

// ─────────────────────────────────────────────────────────────
//  FunctionOutputData
// ─────────────────────────────────────────────────────────────

#[test]
fn output_bounds_must_match_function_count() {
    let err = FunctionOutputData::new(
        array![1.0, 2.0], array![0.0], array![0.0, 0.0],
    ).unwrap_err();
    assert!(matches!(err, ConfigError::SizeMismatch { .. }));

    let err = FunctionOutputData::new(array![1.0], array![0.0], array![0.0])
        .unwrap()
        .with_names(vec!["a".into(), "b".into()])
        .unwrap_err();
    assert!(matches!(err, ConfigError::SizeMismatch { .. }));
}

#[test]
fn output_value_updates_keep_the_frozen_shape() {
    let mut out = FunctionOutputData::new(
        array![1.0, 2.0], array![-1.0, -1.0], array![1.0, 1.0],
    ).unwrap();
    assert!(out.has_functions());
    assert_eq!(out.num_functions(), 2);

    out.set_functions(array![3.0, 4.0]).unwrap();
    assert_eq!(out.functions(), &array![3.0, 4.0]);

    let err = out.set_functions(array![3.0]).unwrap_err();
    assert!(matches!(err, ConfigError::SizeMismatch { .. }));

    assert!(!FunctionOutputData::empty().has_functions());
}

// ─────────────────────────────────────────────────────────────
//  PathFuncProperties
// ─────────────────────────────────────────────────────────────

#[test]
fn path_properties_validate_pattern_rows() {
    let props = PathFuncProperties::new(
        Array2::ones((2, 3)),
        Array2::ones((2, 1)),
        Array2::zeros((2, 1)),
        2,
        true,
        true,
    ).unwrap();
    assert_eq!(props.num_functions(), 2);
    assert_eq!(props.state_jac_pattern().dim(), (2, 3));
    assert!(props.has_state_vars());
    assert!(props.has_control_vars());

    let err = PathFuncProperties::new(
        Array2::ones((1, 3)),
        Array2::ones((2, 1)),
        Array2::zeros((2, 1)),
        2,
        true,
        false,
    ).unwrap_err();
    assert!(matches!(err, ConfigError::SizeMismatch { .. }));
}
