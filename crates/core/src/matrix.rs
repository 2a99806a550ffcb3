use std::fmt;
use std::ops::{Index, IndexMut};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{FwError, FwResult};

/// Edge weight / path length stored in the distance matrix.
pub type Weight = i32;

/// "No edge" sentinel. Half of `i32::MAX` so that `INF + INF` still fits.
pub const INF: Weight = Weight::MAX / 2;

/// Default exclusive upper bound for generated weights (2^20).
pub const DEFAULT_MAX_WEIGHT: Weight = 1 << 20;

/// Dense N×N distance matrix, row-major and contiguous.
///
/// Tiled strategies treat it as a grid of `bs × bs` blocks, but blocks are
/// only ever index ranges into this one allocation, never copies.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MatrixRepr")]
pub struct Matrix {
    n: usize,
    data: Vec<Weight>,
}

/// Wire shape of [`Matrix`]; checked before it becomes one.
#[derive(Deserialize)]
struct MatrixRepr {
    n: usize,
    data: Vec<Weight>,
}

impl TryFrom<MatrixRepr> for Matrix {
    type Error = FwError;

    fn try_from(repr: MatrixRepr) -> FwResult<Self> {
        let expected = repr
            .n
            .checked_mul(repr.n)
            .ok_or(FwError::Allocation { elements: usize::MAX })?;
        if repr.data.len() != expected {
            return Err(FwError::SizeMismatch {
                expected,
                actual: repr.data.len(),
            });
        }
        Ok(Self {
            n: repr.n,
            data: repr.data,
        })
    }
}

impl Matrix {
    /// Allocate an `n × n` matrix filled with `fill`.
    ///
    /// Uses fallible reservation so an oversized request surfaces as
    /// [`FwError::Allocation`] instead of aborting inside the allocator.
    pub fn new(n: usize, fill: Weight) -> FwResult<Self> {
        let elements = n
            .checked_mul(n)
            .ok_or(FwError::Allocation { elements: usize::MAX })?;
        let mut data = Vec::new();
        data.try_reserve_exact(elements)
            .map_err(|_| FwError::Allocation { elements })?;
        data.resize(elements, fill);
        Ok(Self { n, data })
    }

    /// Build a matrix from explicit rows. Every row must have `rows.len()` entries.
    pub fn from_rows(rows: &[Vec<Weight>]) -> FwResult<Self> {
        let n = rows.len();
        let mut m = Self::new(n, 0)?;
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(FwError::SizeMismatch {
                    expected: n,
                    actual: row.len(),
                });
            }
            m.row_mut(i).copy_from_slice(row);
        }
        Ok(m)
    }

    /// Deterministic pseudo-random adjacency matrix.
    ///
    /// Entries are drawn uniformly from `[0, max_weight)`; the diagonal is
    /// forced to zero. The same `(n, seed, max_weight)` always yields the
    /// same matrix.
    pub fn random(n: usize, seed: u64, max_weight: Weight) -> FwResult<Self> {
        if max_weight <= 0 {
            return Err(FwError::InvalidParams(format!(
                "max weight must be positive, got {}",
                max_weight
            )));
        }
        let mut m = Self::new(n, 0)?;
        let mut rng = StdRng::seed_from_u64(seed);
        for cell in m.data.iter_mut() {
            *cell = rng.gen_range(0..max_weight);
        }
        for i in 0..n {
            m[(i, i)] = 0;
        }
        Ok(m)
    }

    /// Side length N.
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, row: usize, col: usize) -> Weight {
        self.data[row * self.n + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Weight) {
        self.data[row * self.n + col] = value;
    }

    pub fn row(&self, row: usize) -> &[Weight] {
        &self.data[row * self.n..(row + 1) * self.n]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [Weight] {
        let n = self.n;
        &mut self.data[row * n..(row + 1) * n]
    }

    pub fn as_slice(&self) -> &[Weight] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Weight] {
        &mut self.data
    }

    /// First cell (row-major order) where `self` and `other` differ.
    ///
    /// Comparison is exact: distances are integers, and every correct
    /// schedule must reproduce the serial result bit for bit.
    pub fn first_mismatch(&self, other: &Matrix) -> Option<(usize, usize)> {
        if self.n != other.n {
            return Some((0, 0));
        }
        self.data
            .iter()
            .zip(other.data.iter())
            .position(|(a, b)| a != b)
            .map(|idx| (idx / self.n, idx % self.n))
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Weight;

    fn index(&self, (row, col): (usize, usize)) -> &Weight {
        &self.data[row * self.n + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Weight {
        &mut self.data[row * self.n + col]
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix({}x{}) [", self.n, self.n)?;
        for i in 0..self.n.min(16) {
            let cells: Vec<String> = self
                .row(i)
                .iter()
                .take(16)
                .map(|&w| if w >= INF { "INF".to_string() } else { w.to_string() })
                .collect();
            writeln!(f, "  [{}]", cells.join(", "))?;
        }
        write!(f, "]")
    }
}
