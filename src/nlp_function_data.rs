//! Sparse (A, B, D) block partition for one function group.
//!
//! A function group's contribution to the NLP is
//!
//! ```text
//!     f(z)    = A·z + B·q(z)
//!     df/dz   = A + B·(∂q/∂z)
//!     pattern = pat(A) + pat(B)·pat(D)
//! ```
//!
//! where `z` is the whole-problem decision vector, `q` the group's
//! intermediate function vector, and `D` the frozen structure of
//! ∂q/∂z.  Structure is built from triplets and then frozen; explicit
//! zeros are kept so the downstream solver sees a stable structure
//! across iterations.  Numeric D updates after the freeze go through
//! nonzero-index lookup and fail on any coordinate outside the frozen
//! pattern.

use ndarray::{Array1, Array2};
use sprs::{CsMat, TriMat};

use crate::types::ConfigError;

/// y += M·x for a CSC matrix, walking the raw storage.
fn csc_mul_acc(mat: &CsMat<f64>, x: &Array1<f64>, y: &mut Array1<f64>) {
    let indptr = mat.indptr();
    let ptr = indptr.raw_storage();
    let indices = mat.indices();
    let data = mat.data();
    for col in 0..mat.cols() {
        let xv = x[col];
        if xv == 0.0 {
            continue;
        }
        for nz in ptr[col]..ptr[col + 1] {
            y[indices[nz]] += data[nz] * xv;
        }
    }
}

/// Copy of `mat` with every stored value mapped to 0/1.
fn binarize(mat: &CsMat<f64>) -> CsMat<f64> {
    mat.map(|&v| if v != 0.0 { 1.0 } else { 0.0 })
}

#[derive(Debug)]
pub struct NlpFunctionData {
    num_funcs: usize,
    num_vars: usize,
    num_func_dependencies: usize,

    // Triplet staging, alive until freeze().
    a_trip: TriMat<f64>,
    a_pat_trip: TriMat<f64>,
    b_trip: TriMat<f64>,
    b_pat_trip: TriMat<f64>,
    d_trip: TriMat<f64>,
    d_pat_trip: TriMat<f64>,

    // Frozen structure.
    a: Option<CsMat<f64>>,
    a_pat: Option<CsMat<f64>>,
    b: Option<CsMat<f64>>,
    b_pat: Option<CsMat<f64>>,
    d: Option<CsMat<f64>>,
    d_pat: Option<CsMat<f64>>,

    pattern_cache: Option<CsMat<f64>>,
}

impl NlpFunctionData {
    pub fn new(
        num_funcs: usize,
        num_vars: usize,
        num_func_dependencies: usize,
    ) -> Self {
        Self {
            num_funcs,
            num_vars,
            num_func_dependencies,
            a_trip: TriMat::new((num_funcs, num_vars)),
            a_pat_trip: TriMat::new((num_funcs, num_vars)),
            b_trip: TriMat::new((num_funcs, num_func_dependencies)),
            b_pat_trip: TriMat::new((num_funcs, num_func_dependencies)),
            d_trip: TriMat::new((num_func_dependencies, num_vars)),
            d_pat_trip: TriMat::new((num_func_dependencies, num_vars)),
            a: None,
            a_pat: None,
            b: None,
            b_pat: None,
            d: None,
            d_pat: None,
            pattern_cache: None,
        }
    }

    pub fn num_funcs(&self) -> usize { self.num_funcs }
    pub fn num_vars(&self) -> usize { self.num_vars }
    pub fn num_func_dependencies(&self) -> usize { self.num_func_dependencies }
    pub fn is_frozen(&self) -> bool { self.d.is_some() }

    fn check_building(&self) -> Result<(), ConfigError> {
        if self.is_frozen() {
            return Err(ConfigError::InvalidSetup(
                "sparse structure is already frozen".into(),
            ));
        }
        Ok(())
    }

    fn check_sub(
        what: &'static str,
        rows: usize,
        cols: usize,
        row_offset: usize,
        col_offset: usize,
        sub: &Array2<f64>,
    ) -> Result<(), ConfigError> {
        if row_offset + sub.nrows() > rows || col_offset + sub.ncols() > cols {
            return Err(ConfigError::IndexOutOfRange {
                what,
                phase: 0,
                row: row_offset + sub.nrows(),
                col: col_offset + sub.ncols(),
            });
        }
        Ok(())
    }

    // ── Structure construction ───────────────────────────────

    /// Insert a dense sub-block into A; only nonzeros become entries.
    pub fn insert_a_partition(
        &mut self,
        row_offset: usize,
        col_offset: usize,
        sub: &Array2<f64>,
    ) -> Result<(), ConfigError> {
        self.check_building()?;
        Self::check_sub("A partition", self.num_funcs, self.num_vars,
                        row_offset, col_offset, sub)?;
        for ((r, c), &v) in sub.indexed_iter() {
            if v != 0.0 {
                self.a_trip.add_triplet(row_offset + r, col_offset + c, v);
                self.a_pat_trip.add_triplet(row_offset + r, col_offset + c, 1.0);
            }
        }
        Ok(())
    }

    /// Insert a dense sub-block into B; only nonzeros become entries.
    pub fn insert_b_partition(
        &mut self,
        row_offset: usize,
        col_offset: usize,
        sub: &Array2<f64>,
    ) -> Result<(), ConfigError> {
        self.check_building()?;
        Self::check_sub("B partition", self.num_funcs, self.num_func_dependencies,
                        row_offset, col_offset, sub)?;
        for ((r, c), &v) in sub.indexed_iter() {
            if v != 0.0 {
                self.b_trip.add_triplet(row_offset + r, col_offset + c, v);
                self.b_pat_trip.add_triplet(row_offset + r, col_offset + c, 1.0);
            }
        }
        Ok(())
    }

    /// Set B to the identity: each function maps one-to-one to its own
    /// output row.
    pub fn insert_b_identity(&mut self) -> Result<(), ConfigError> {
        self.check_building()?;
        if self.num_funcs != self.num_func_dependencies {
            return Err(ConfigError::SizeMismatch {
                what: "identity B block".into(),
                expected: self.num_funcs,
                got: self.num_func_dependencies,
            });
        }
        for i in 0..self.num_funcs {
            self.b_trip.add_triplet(i, i, 1.0);
            self.b_pat_trip.add_triplet(i, i, 1.0);
        }
        Ok(())
    }

    /// Insert one structural D entry.  The numeric value starts at
    /// zero; `pattern_value` records whether the entry can ever be
    /// nonzero (explicit structural zeros are kept either way).
    pub fn insert_d_entry(
        &mut self,
        row: usize,
        col: usize,
        pattern_value: f64,
    ) -> Result<(), ConfigError> {
        self.check_building()?;
        if row >= self.num_func_dependencies || col >= self.num_vars {
            return Err(ConfigError::IndexOutOfRange {
                what: "D entry",
                phase: 0,
                row,
                col,
            });
        }
        self.d_trip.add_triplet(row, col, 0.0);
        self.d_pat_trip.add_triplet(row, col, if pattern_value != 0.0 { 1.0 } else { 0.0 });
        Ok(())
    }

    /// Fix the sparse structure.  Further structural insertions fail;
    /// numeric D updates become available.
    pub fn freeze(&mut self) -> Result<(), ConfigError> {
        self.check_building()?;
        self.a = Some(self.a_trip.to_csc());
        self.a_pat = Some(self.a_pat_trip.to_csc());
        self.b = Some(self.b_trip.to_csc());
        self.b_pat = Some(self.b_pat_trip.to_csc());
        self.d = Some(self.d_trip.to_csc());
        self.d_pat = Some(self.d_pat_trip.to_csc());
        self.pattern_cache = None;
        Ok(())
    }

    fn frozen<'a>(
        mat: &'a Option<CsMat<f64>>,
        name: &str,
    ) -> Result<&'a CsMat<f64>, ConfigError> {
        mat.as_ref().ok_or_else(|| ConfigError::InvalidSetup(
            format!("{name} accessed before structure freeze"),
        ))
    }

    // ── Numeric updates ──────────────────────────────────────

    /// Overwrite one live D value at a coordinate fixed at freeze time.
    pub fn set_d_entry(&mut self, row: usize, col: usize, value: f64)
        -> Result<(), ConfigError> {
        let d = self.d.as_mut().ok_or_else(|| ConfigError::InvalidSetup(
            "D updated before structure freeze".into(),
        ))?;
        match d.nnz_index(row, col) {
            Some(idx) => {
                d.data_mut()[idx.0] = value;
                Ok(())
            }
            None => Err(ConfigError::PatternMismatch { row, col }),
        }
    }

    // ── Assembly ─────────────────────────────────────────────

    /// f = A·z + B·q.
    pub fn compute_functions(&self, q: &Array1<f64>, z: &Array1<f64>)
        -> Result<Array1<f64>, ConfigError> {
        let a = Self::frozen(&self.a, "A")?;
        let b = Self::frozen(&self.b, "B")?;
        if z.len() != self.num_vars {
            return Err(ConfigError::SizeMismatch {
                what: "decision vector for function assembly".into(),
                expected: self.num_vars,
                got: z.len(),
            });
        }
        if q.len() != self.num_func_dependencies {
            return Err(ConfigError::SizeMismatch {
                what: "Q vector for function assembly".into(),
                expected: self.num_func_dependencies,
                got: q.len(),
            });
        }
        let mut f = Array1::zeros(self.num_funcs);
        csc_mul_acc(a, z, &mut f);
        csc_mul_acc(b, q, &mut f);
        Ok(f)
    }

    /// J = A + B·D, with D holding the live ∂q/∂z values.
    pub fn compute_jacobian(&self) -> Result<CsMat<f64>, ConfigError> {
        let a = Self::frozen(&self.a, "A")?;
        let b = Self::frozen(&self.b, "B")?;
        let d = Self::frozen(&self.d, "D")?;
        let bd = (b * d).to_csc();
        Ok(a + &bd)
    }

    /// pattern = binarize(pat(A) + pat(B)·pat(D)), cached after the
    /// first call.
    pub fn jac_sparsity_pattern(&mut self) -> Result<&CsMat<f64>, ConfigError> {
        if self.pattern_cache.is_none() {
            let a_pat = Self::frozen(&self.a_pat, "A pattern")?;
            let b_pat = Self::frozen(&self.b_pat, "B pattern")?;
            let d_pat = Self::frozen(&self.d_pat, "D pattern")?;
            let bd = (b_pat * d_pat).to_csc();
            let sum = a_pat + &bd;
            self.pattern_cache = Some(binarize(&sum));
        }
        Self::frozen(&self.pattern_cache, "sparsity pattern")
    }
}
