//! **colloc** — NLP function assembly for direct-collocation trajectory
//! optimization.
//!
//! The crate turns user-supplied boundary/cost point functions and
//! per-phase discretized decision variables into the flattened function
//! vector and sparse Jacobian an SQP/IPOPT-class solver consumes:
//!
//! 1. **Layout** (`decision_vector`): per-phase flattened variable
//!    indexing (Betts interleaved layout).
//! 2. **Containers** (`function_data`, `phase`): evaluation-point
//!    snapshots, function outputs, and the phase surface.
//! 3. **Storage** (`jacobian_data`): per-phase Jacobian blocks,
//!    sparsity patterns, and dependency flags, bounds-checked.
//! 4. **Assembly** (`nlp_function_data`, `multipoint`): the sparse
//!    (A, B, D) block partition mapping phase-local data into the
//!    whole-problem Jacobian.
//! 5. **Orchestration** (`manager`): evaluation, hybrid
//!    finite-difference/analytic differentiation, and sampling-based
//!    sparsity discovery.

pub mod types;
pub mod decision_vector;
pub mod function_data;
pub mod phase;
pub mod jacobian_data;
pub mod nlp_function_data;
pub mod multipoint;
pub mod manager;
