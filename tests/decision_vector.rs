//! Layout tests for the Betts interleaved decision vector.
//!
//! The key invariant: the time, state, control, static, and integral
//! index chunks are pairwise disjoint and together cover exactly
//! `[0, num_decision_params)`.

use colloc::decision_vector::{DecVecBetts, DecisionVector};
use colloc::types::ConfigError;
use ndarray::{array, Array2};

// ─────────────────────────────────────────────────────────────
//  Helpers
// ─────────────────────────────────────────────────────────────

/// Collect every index chunk the layout hands out.
fn collect_layout(
    dv: &DecVecBetts,
    n_state_mesh: usize,
    n_stage: usize,
    n_control_mesh: usize,
) -> Vec<usize> {
    let mut idxs = vec![dv.initial_time_idx(), dv.final_time_idx()];
    for mesh in 0..n_state_mesh - 1 {
        for stage in 0..=n_stage {
            idxs.extend(dv.state_idxs_at_mesh_point(mesh, stage).unwrap());
        }
    }
    idxs.extend(dv.state_idxs_at_mesh_point(n_state_mesh - 1, 0).unwrap());

    if dv.num_control_vars() > 0 {
        let same_mesh = n_state_mesh == n_control_mesh;
        let loops = if same_mesh { n_control_mesh - 1 } else { n_control_mesh };
        for mesh in 0..loops {
            for stage in 0..=n_stage {
                idxs.extend(dv.control_idxs_at_mesh_point(mesh, stage).unwrap());
            }
        }
        if same_mesh {
            idxs.extend(dv.control_idxs_at_mesh_point(loops, 0).unwrap());
        }
    }

    idxs.extend(dv.static_idxs());
    idxs.extend(dv.integral_idxs());
    idxs
}

fn assert_exact_cover(mut idxs: Vec<usize>, len: usize) {
    idxs.sort_unstable();
    let expected: Vec<usize> = (0..len).collect();
    assert_eq!(idxs, expected, "index chunks must exactly cover [0, {len})");
}

// ─────────────────────────────────────────────────────────────
//  Coverage invariant
// ─────────────────────────────────────────────────────────────

#[test]
fn minimal_layout_covers_exactly() {
    // 2 states, no control/static/integral, 2 mesh points, no stages:
    // [t0, tf, x(0), x(f)] = 2 + 2 + 2 = 6 entries.
    let dv = DecVecBetts::new(2, 0, 0, 0, 2, 2, 0, 0).unwrap();
    assert_eq!(dv.num_decision_params(), 6);
    assert_eq!(dv.initial_state_idxs(), vec![2, 3]);
    assert_eq!(dv.final_state_idxs(), vec![4, 5]);
    assert!(dv.static_idxs().is_empty());
    assert_exact_cover(collect_layout(&dv, 2, 0, 2), 6);
}

#[test]
fn interleaved_layout_covers_exactly() {
    // 2 states, 1 control, 3 mesh points, 1 stage point, 2 statics,
    // 1 integral.
    let dv = DecVecBetts::new(2, 1, 1, 2, 3, 3, 1, 1).unwrap();
    assert_eq!(dv.num_state_points(), 5);
    assert_eq!(dv.num_control_points(), 5);
    assert_eq!(dv.num_decision_params(), 2 + 10 + 5 + 2 + 1);
    assert_eq!(dv.initial_state_idxs(), vec![2, 3]);
    assert_eq!(dv.final_state_idxs(), vec![14, 15]);
    assert_eq!(dv.static_idxs(), vec![17, 18]);
    assert_eq!(dv.integral_idxs(), vec![19]);
    assert_exact_cover(collect_layout(&dv, 3, 1, 3), 20);
}

#[test]
fn unequal_mesh_drops_final_control() {
    // Radau-style: control mesh one short of the state mesh.
    let dv = DecVecBetts::new(1, 1, 0, 0, 3, 2, 0, 0).unwrap();
    assert_eq!(dv.num_state_points(), 3);
    assert_eq!(dv.num_control_points(), 2);
    assert_eq!(dv.num_decision_params(), 2 + 3 + 2);
    assert_exact_cover(collect_layout(&dv, 3, 0, 2), 7);
}

// ─────────────────────────────────────────────────────────────
//  Round trips
// ─────────────────────────────────────────────────────────────

#[test]
fn state_array_round_trip() {
    let mut dv = DecVecBetts::new(2, 1, 0, 0, 3, 3, 0, 0).unwrap();
    let states = Array2::from_shape_vec(
        (3, 2),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
    ).unwrap();
    dv.set_state_array(&states).unwrap();
    assert_eq!(dv.state_array(), states);
    assert_eq!(dv.first_state_vector(), array![1.0, 2.0]);
    assert_eq!(dv.last_state_vector(), array![5.0, 6.0]);
}

#[test]
fn control_array_round_trip() {
    let mut dv = DecVecBetts::new(2, 1, 0, 0, 3, 3, 0, 0).unwrap();
    let controls = Array2::from_shape_vec((3, 1), vec![0.1, 0.2, 0.3]).unwrap();
    dv.set_control_array(&controls).unwrap();
    assert_eq!(dv.control_array(), controls);
    // Controls must not clobber neighbouring state entries.
    assert_eq!(dv.state_array(), Array2::zeros((3, 2)));
}

#[test]
fn time_and_static_round_trip() {
    let mut dv = DecVecBetts::new(1, 0, 0, 2, 2, 2, 0, 0).unwrap();
    dv.set_times(1.5, 9.5);
    dv.set_static_vector(&[7.0, 8.0]).unwrap();
    assert_eq!(dv.first_time(), 1.5);
    assert_eq!(dv.last_time(), 9.5);
    assert_eq!(dv.static_vector(), array![7.0, 8.0]);
}

#[test]
fn whole_vector_round_trip() {
    let mut dv = DecVecBetts::new(1, 0, 0, 0, 2, 2, 0, 0).unwrap();
    let values = vec![0.0, 1.0, 2.0, 3.0];
    dv.set_vector(&values).unwrap();
    assert_eq!(dv.vector().to_vec(), values);
    assert_eq!(dv.element(2).unwrap(), 2.0);
    dv.set_element(2, 9.0).unwrap();
    assert_eq!(dv.first_state_vector(), array![9.0]);
}

// ─────────────────────────────────────────────────────────────
//  Validation
// ─────────────────────────────────────────────────────────────

#[test]
fn rejects_zero_state_vars() {
    let err = DecVecBetts::new(0, 1, 0, 0, 2, 2, 0, 0).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSetup(_)));
}

#[test]
fn rejects_single_state_mesh_point() {
    // With one mesh point the initial and final state chunks would
    // alias the same indices and break the coverage invariant.
    let err = DecVecBetts::new(1, 0, 0, 0, 1, 1, 0, 0).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSetup(_)));
}

#[test]
fn rejects_mismatched_stage_points() {
    let err = DecVecBetts::new(1, 1, 0, 0, 2, 2, 1, 0).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSetup(_)));
}

#[test]
fn rejects_out_of_range_mesh_and_stage() {
    let dv = DecVecBetts::new(1, 0, 0, 0, 2, 2, 0, 0).unwrap();
    assert!(dv.state_idxs_at_mesh_point(2, 0).is_err());
    assert!(dv.state_idxs_at_mesh_point(0, 1).is_err());
    // Final mesh point carries stage 0 only.
    assert!(dv.state_idxs_at_mesh_point(1, 1).is_err());
}

#[test]
fn rejects_wrong_vector_length() {
    let mut dv = DecVecBetts::new(1, 0, 0, 0, 2, 2, 0, 0).unwrap();
    let err = dv.set_vector(&[1.0, 2.0]).unwrap_err();
    assert!(matches!(err, ConfigError::SizeMismatch { .. }));
    let err = dv.set_element(99, 1.0).unwrap_err();
    assert!(matches!(err, ConfigError::IndexOutOfRange { .. }));
}
