//! End-to-end tests: user point function in, whole-problem NLP
//! function vector / sparse Jacobian / sparsity pattern out.

use approx::assert_relative_eq;
use colloc::decision_vector::{DecVecBetts, DecisionVector};
use colloc::function_data::{FunctionInputData, FunctionOutputData};
use colloc::manager::{PointFunction, PointFunctionManager, PointFunctionOutput};
use colloc::phase::Phase;
use colloc::types::{ConfigError, EvalError};
use ndarray::array;
use std::cell::Cell;
use std::rc::Rc;

// ─────────────────────────────────────────────────────────────
//  Helpers
// ─────────────────────────────────────────────────────────────

/// One phase, 2 states, 1 control, 2 mesh points:
/// [t0, tf, x0, x1, u, x0, x1, u] = 8 decision parameters.
fn two_state_phase() -> Phase {
    let mut dv = DecVecBetts::new(2, 1, 0, 0, 2, 2, 0, 0).unwrap();
    dv.set_times(0.0, 3.0);
    dv.set_state_vector_at(0, 0, &[2.0, -1.0]).unwrap();
    dv.set_state_vector_at(1, 0, &[4.0, 0.5]).unwrap();
    Phase::new(
        0,
        Box::new(dv),
        array![-10.0, -10.0],
        array![10.0, 10.0],
        array![],
        array![],
        0.0,
        5.0,
    ).unwrap()
}

// ─────────────────────────────────────────────────────────────
//  Boundary group:  f = x0(0) − 5
// ─────────────────────────────────────────────────────────────

#[derive(Debug)]
struct InitialOffset;

impl PointFunction for InitialOffset {
    fn evaluate(
        &mut self,
        initial: &[FunctionInputData],
        _final_points: &[FunctionInputData],
    ) -> Result<PointFunctionOutput, Box<dyn std::error::Error>> {
        let boundary = FunctionOutputData::new(
            array![initial[0].state()[0] - 5.0],
            array![0.0],
            array![0.0],
        )?.with_names(vec!["initial x0 offset".into()])?;
        Ok(PointFunctionOutput { boundary: Some(boundary), cost: None })
    }
}

#[test]
fn bound_functions_match_hand_computation() {
    let phase = two_state_phase();
    let n = phase.decision_vector().num_decision_params();
    let mut mgr = PointFunctionManager::initialize(
        InitialOffset, vec![phase], n, vec![0], 11,
    ).unwrap();

    assert!(mgr.has_boundary_functions());
    assert!(!mgr.has_cost_function());
    assert_eq!(mgr.num_boundary_functions(), 1);
    assert_eq!(mgr.function_names(), &["initial x0 offset".to_string()]);
    assert_eq!(mgr.con_lower_bound(), &array![0.0]);
    assert_eq!(mgr.con_upper_bound(), &array![0.0]);

    let f = mgr.compute_bound_nlp_functions().unwrap();
    assert_eq!(f, array![2.0 - 5.0]);
}

#[test]
fn bound_jacobian_lands_in_the_init_state_column() {
    let phase = two_state_phase();
    let n = phase.decision_vector().num_decision_params();
    let mut mgr = PointFunctionManager::initialize(
        InitialOffset, vec![phase], n, vec![0], 11,
    ).unwrap();

    let jac = mgr.compute_bound_nlp_jacobian().unwrap().to_dense();
    assert_eq!(jac.dim(), (1, 8));
    // x0(0) lives at whole-problem index 2.
    assert_relative_eq!(jac[[0, 2]], 1.0, max_relative = 1.0e-6);
    for col in (0..8).filter(|&c| c != 2) {
        assert!(jac[[0, col]].abs() < 1.0e-9,
                "unexpected jacobian entry in column {col}");
    }
}

#[test]
fn bound_sparsity_marks_only_the_init_state_column() {
    let phase = two_state_phase();
    let n = phase.decision_vector().num_decision_params();
    let mut mgr = PointFunctionManager::initialize(
        InitialOffset, vec![phase], n, vec![0], 11,
    ).unwrap();

    let pat = mgr.compute_bound_nlp_sparsity_pattern().unwrap();
    assert_eq!(pat.shape(), (1, 8));
    for (&v, (row, col)) in pat.iter() {
        if (row, col) == (0, 2) {
            assert_eq!(v, 1.0);
        } else {
            assert_eq!(v, 0.0,
                       "structural zero at ({row}, {col}) must stay zero");
        }
    }
}

#[test]
fn repeated_assembly_is_deterministic() {
    let phase = two_state_phase();
    let n = phase.decision_vector().num_decision_params();
    let mut mgr = PointFunctionManager::initialize(
        InitialOffset, vec![phase], n, vec![0], 11,
    ).unwrap();

    let f1 = mgr.compute_bound_nlp_functions().unwrap();
    let f2 = mgr.compute_bound_nlp_functions().unwrap();
    assert_eq!(f1, f2);

    let j1 = mgr.compute_bound_nlp_jacobian().unwrap();
    let j2 = mgr.compute_bound_nlp_jacobian().unwrap();
    assert_eq!(j1, j2);
}

// ─────────────────────────────────────────────────────────────
//  Cost group:  J = tf²
// ─────────────────────────────────────────────────────────────

struct FinalTimeCost;

impl PointFunction for FinalTimeCost {
    fn evaluate(
        &mut self,
        _initial: &[FunctionInputData],
        final_points: &[FunctionInputData],
    ) -> Result<PointFunctionOutput, Box<dyn std::error::Error>> {
        let tf = final_points[0].time();
        let cost = FunctionOutputData::new(
            array![tf * tf], array![0.0], array![0.0],
        )?;
        Ok(PointFunctionOutput { boundary: None, cost: Some(cost) })
    }
}

#[test]
fn cost_triad_without_boundary_group() {
    let phase = two_state_phase();
    let n = phase.decision_vector().num_decision_params();
    let mut mgr = PointFunctionManager::initialize(
        FinalTimeCost, vec![phase], n, vec![0], 11,
    ).unwrap();

    assert!(!mgr.has_boundary_functions());
    assert!(mgr.has_cost_function());

    let f = mgr.compute_cost_nlp_functions().unwrap();
    assert_eq!(f, array![9.0]);

    let jac = mgr.compute_cost_nlp_jacobian().unwrap().to_dense();
    assert_eq!(jac.dim(), (1, 8));
    // dJ/dtf = 2·tf at tf = 3; tf lives at whole-problem index 1.
    assert_relative_eq!(jac[[0, 1]], 6.0, max_relative = 1.0e-3);
    for col in (0..8).filter(|&c| c != 1) {
        assert!(jac[[0, col]].abs() < 1.0e-9,
                "unexpected cost jacobian entry in column {col}");
    }

    let pat = mgr.compute_cost_nlp_sparsity_pattern().unwrap();
    assert_eq!(pat.shape(), (1, 8));
    for (&v, (row, col)) in pat.iter() {
        assert_eq!(v, if (row, col) == (0, 1) { 1.0 } else { 0.0 });
    }

    // No boundary group means the boundary triad must refuse.
    let err = mgr.compute_bound_nlp_functions().unwrap_err();
    assert!(matches!(err, EvalError::Config(ConfigError::NoFunctions(_))));
}

/// Cost-only at first; grows a boundary group when the flag flips.
struct GrowingBoundary {
    grow: Rc<Cell<bool>>,
}

impl PointFunction for GrowingBoundary {
    fn evaluate(
        &mut self,
        _initial: &[FunctionInputData],
        final_points: &[FunctionInputData],
    ) -> Result<PointFunctionOutput, Box<dyn std::error::Error>> {
        let boundary = if self.grow.get() {
            Some(FunctionOutputData::new(
                array![1.0], array![0.0], array![0.0],
            )?)
        } else {
            None
        };
        let cost = FunctionOutputData::new(
            array![final_points[0].time()], array![0.0], array![0.0],
        )?;
        Ok(PointFunctionOutput { boundary, cost: Some(cost) })
    }
}

#[test]
fn boundary_group_cannot_appear_after_initialize() {
    let grow = Rc::new(Cell::new(false));
    let phase = two_state_phase();
    let n = phase.decision_vector().num_decision_params();
    let mut mgr = PointFunctionManager::initialize(
        GrowingBoundary { grow: Rc::clone(&grow) }, vec![phase], n, vec![0], 11,
    ).unwrap();
    assert!(!mgr.has_boundary_functions());

    // The group shapes were frozen at initialize; a boundary group
    // showing up later must be rejected, not silently adopted.
    grow.set(true);
    let err = mgr.evaluate_user_function().unwrap_err();
    assert!(matches!(err, EvalError::Config(ConfigError::SizeMismatch { .. })));
}

// ─────────────────────────────────────────────────────────────
//  User failures
// ─────────────────────────────────────────────────────────────

#[derive(Debug)]
struct AlwaysFails;

impl PointFunction for AlwaysFails {
    fn evaluate(
        &mut self,
        _initial: &[FunctionInputData],
        _final_points: &[FunctionInputData],
    ) -> Result<PointFunctionOutput, Box<dyn std::error::Error>> {
        Err("deliberate failure".into())
    }
}

#[test]
fn user_errors_carry_call_context() {
    let phase = two_state_phase();
    let n = phase.decision_vector().num_decision_params();
    let err = PointFunctionManager::initialize(
        AlwaysFails, vec![phase], n, vec![0], 11,
    ).unwrap_err();

    match err {
        EvalError::User { context, message } => {
            assert_eq!(context, "point function evaluation");
            assert_eq!(message, "deliberate failure");
        }
        other => panic!("expected a user error, got {other}"),
    }
}

#[test]
fn initialize_rejects_inconsistent_setup() {
    let phase = two_state_phase();
    let n = phase.decision_vector().num_decision_params();

    // Start-index list shorter than the phase list.
    let err = PointFunctionManager::initialize(
        InitialOffset, vec![phase], n, vec![], 11,
    ).unwrap_err();
    assert!(matches!(err, EvalError::Config(ConfigError::SizeMismatch { .. })));

    // Phase slice runs past the whole-problem vector.
    let phase = two_state_phase();
    let err = PointFunctionManager::initialize(
        InitialOffset, vec![phase], n - 1, vec![0], 11,
    ).unwrap_err();
    assert!(matches!(err, EvalError::Config(ConfigError::SizeMismatch { .. })));

    let err = PointFunctionManager::<InitialOffset>::initialize(
        InitialOffset, vec![], 0, vec![], 11,
    ).unwrap_err();
    assert!(matches!(err, EvalError::Config(ConfigError::EmptyPhaseList)));
}
