//! Basis function tabulation: Bernstein polynomials for Bezier curves and
//! Cox-de Boor B-spline basis functions.
//!
//! The B-spline basis is built as an explicit bottom-up table indexed by
//! `[degree][basis index][sample index]`, owned by a single generation call.
//! Knot-vector mutation between calls therefore can never serve stale values.

use crate::knot::{KnotError, KnotVector};

/// Binomial coefficient C(n, k) as a float, via the iterative product
/// formula. Avoids the factorial overflow of the naive definition.
#[must_use]
fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result = result * (n - k + 1 + i) as f64 / (i + 1) as f64;
    }
    result
}

/// Bernstein polynomial `B_{degree,index}(t) = C(n,j) t^j (1-t)^(n-j)`.
///
/// `t` is normally in `[0, 1]`; values outside extrapolate.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn bernstein(degree: usize, index: usize, t: f64) -> f64 {
    if index > degree {
        return 0.0;
    }
    binomial(degree, index) * t.powi(index as i32) * (1.0 - t).powi((degree - index) as i32)
}

/// Tabulates all `degree + 1` Bernstein polynomials over `resolution + 1`
/// evenly spaced parameters in `[0, 1]` inclusive.
///
/// The result is indexed `[coefficient][sample]`.
#[must_use]
pub fn generate_bernstein_basis(degree: usize, resolution: usize) -> Vec<Vec<f64>> {
    let samples: Vec<f64> = if resolution == 0 {
        vec![0.0]
    } else {
        (0..=resolution).map(|i| i as f64 / resolution as f64).collect()
    };

    (0..=degree)
        .map(|j| samples.iter().map(|&t| bernstein(degree, j, t)).collect())
        .collect()
}

/// Bottom-up Cox-de Boor basis table for one set of samples.
///
/// Level `k` holds the degree-`k` basis functions evaluated at every sample.
/// Basis index `i` at the top level corresponds to control point `i`; the
/// reduced knot convention is realized by extending the flattened knot list
/// with one duplicated value at each end before running the recursion.
#[derive(Debug, Clone)]
pub struct BasisTable {
    degree: usize,
    samples: Vec<f64>,
    // levels[k][i][s]
    levels: Vec<Vec<Vec<f64>>>,
}

impl BasisTable {
    /// Builds the table for all degrees `0..=degree` at the given samples.
    ///
    /// Samples are clamped into the support interval before evaluation; the
    /// support maximum closes the otherwise half-open last span so the top
    /// level still sums to 1 there.
    ///
    /// # Errors
    /// Propagates [`KnotError`] from the support query (`InvalidDegree`,
    /// `DegenerateSupport`).
    pub fn generate(knots: &KnotVector, degree: usize, samples: &[f64]) -> Result<Self, KnotError> {
        let (min, max) = knots.support(degree)?;

        let flat = knots.values();
        let mut ext = Vec::with_capacity(flat.len() + 2);
        ext.push(flat[0]);
        ext.extend_from_slice(&flat);
        ext.push(flat[flat.len() - 1]);

        let samples: Vec<f64> = samples.iter().map(|&u| u.clamp(min, max)).collect();

        let mut levels: Vec<Vec<Vec<f64>>> = Vec::with_capacity(degree + 1);

        // Degree 0: indicator of the half-open span [ext[i], ext[i+1]). The
        // support maximum belongs to the last non-empty span below it.
        let zero: Vec<Vec<f64>> = (0..ext.len() - 1)
            .map(|i| {
                samples
                    .iter()
                    .map(|&u| {
                        let inside = if u == max {
                            ext[i] < max && ext[i + 1] == max
                        } else {
                            ext[i] <= u && u < ext[i + 1]
                        };
                        if inside { 1.0 } else { 0.0 }
                    })
                    .collect()
            })
            .collect();
        levels.push(zero);

        for k in 1..=degree {
            let prev = &levels[k - 1];
            let level: Vec<Vec<f64>> = (0..ext.len() - k - 1)
                .map(|i| {
                    let left_denom = ext[i + k] - ext[i];
                    let right_denom = ext[i + k + 1] - ext[i + 1];
                    samples
                        .iter()
                        .enumerate()
                        .map(|(s, &u)| {
                            // Indeterminate ratios at repeated knots contribute 0.
                            let mut value = 0.0;
                            if left_denom > 0.0 {
                                value += (u - ext[i]) / left_denom * prev[i][s];
                            }
                            if right_denom > 0.0 {
                                value += (ext[i + k + 1] - u) / right_denom * prev[i + 1][s];
                            }
                            value
                        })
                        .collect()
                })
                .collect();
            levels.push(level);
        }

        Ok(Self { degree, samples, levels })
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// The clamped sample parameters the table was generated for.
    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Number of basis functions at the given level. At the top level this
    /// equals the spline's control point count.
    #[must_use]
    pub fn function_count(&self, degree: usize) -> usize {
        self.levels.get(degree).map_or(0, Vec::len)
    }

    /// Basis value `N_{index}^{degree}` at a sample; 0 outside the table.
    #[must_use]
    pub fn value(&self, degree: usize, index: usize, sample: usize) -> f64 {
        self.levels
            .get(degree)
            .and_then(|level| level.get(index))
            .and_then(|row| row.get(sample))
            .copied()
            .unwrap_or(0.0)
    }

    /// Top-level basis values at a sample, one per control point.
    #[must_use]
    pub fn control_point_row(&self, sample: usize) -> Vec<f64> {
        (0..self.function_count(self.degree))
            .map(|i| self.value(self.degree, i, sample))
            .collect()
    }
}
