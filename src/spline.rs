//! B-spline and NURBS curve evaluation.
//!
//! Two interchangeable algorithms are provided: the Cox-de Boor basis table
//! with a linear combination of control points, and de Boor's triangular
//! linear-interpolation scheme carried out in homogeneous coordinates so
//! rational (weighted) curves fall out of the same loop. For identical
//! inputs both produce the same points, tangents and basis weights within
//! floating tolerance.

use serde::{Deserialize, Serialize};

use crate::basis::BasisTable;
use crate::core::{Point3, Vec3};
use crate::knot::{KnotError, KnotVector};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Selects the spline evaluation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplineMethod {
    /// Cox-de Boor basis tabulation plus linear combination.
    CoxDeBoor,
    /// De Boor's triangular linear interpolation (rational-capable).
    DeBoorLinear,
}

/// Errors raised before spline sampling begins. Per-sample arithmetic is
/// total; all structural problems surface here.
#[derive(Debug, thiserror::Error)]
pub enum SplineError {
    /// No control points were supplied.
    #[error("control points must not be empty")]
    EmptyControlPoints,

    /// Control point count does not fit the knot vector and degree.
    #[error("knot vector of size {knot_count} requires {expected} control points for degree {degree}, got {actual}")]
    ControlPointCount { knot_count: usize, degree: usize, expected: usize, actual: usize },

    /// Weights array length differs from the control point count.
    #[error("weights length {weights} does not match control point count {points}")]
    MismatchedLengths { weights: usize, points: usize },

    /// A weight was non-finite or not strictly positive.
    #[error("weights must be finite and > 0, got {value} at index {index}")]
    InvalidWeight { index: usize, value: f64 },

    /// Structural knot-vector failure (degree, support).
    #[error(transparent)]
    Knot(#[from] KnotError),
}

/// Sampled spline curve: per-sample parallel vectors.
#[derive(Debug, Clone, Serialize)]
pub struct SplineCurveResult {
    /// Sampled parameters, evenly spaced over the support interval.
    pub parameters: Vec<f64>,
    /// Curve point at each sample.
    pub points: Vec<Point3>,
    /// Curve derivative at each sample.
    pub tangents: Vec<Vec3>,
    /// De Boor triangle rows at each sample (seed row first, apex last);
    /// empty for the Cox-de Boor method, which builds no triangle.
    pub intermediates: Vec<Vec<Vec<Point3>>>,
    /// Basis weight of every control point at each sample; sums to 1.
    pub basis_weights: Vec<Vec<f64>>,
}

impl SplineCurveResult {
    /// Unit tangent directions for display, zero where the derivative
    /// vanishes.
    #[must_use]
    pub fn unit_tangents(&self) -> Vec<Vec3> {
        self.tangents.iter().map(|t| t.normalized_or_zero()).collect()
    }
}

/// Control point in homogeneous coordinates, `(w*x, w*y, w*z, w)`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HPoint4 {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl HPoint4 {
    const fn from_weighted(point: Point3, weight: f64) -> Self {
        Self { x: point.x * weight, y: point.y * weight, z: point.z * weight, w: weight }
    }

    fn lerp(self, rhs: Self, t: f64) -> Self {
        let s = 1.0 - t;
        Self {
            x: self.x * s + rhs.x * t,
            y: self.y * s + rhs.y * t,
            z: self.z * s + rhs.z * t,
            w: self.w * s + rhs.w * t,
        }
    }

    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y, z: self.z - rhs.z, w: self.w - rhs.w }
    }

    fn scale(self, s: f64) -> Self {
        Self { x: self.x * s, y: self.y * s, z: self.z * s, w: self.w * s }
    }

    fn project(self) -> Point3 {
        if self.w.is_finite() && self.w != 0.0 {
            Point3::new(self.x / self.w, self.y / self.w, self.z / self.w)
        } else {
            Point3::new(self.x, self.y, self.z)
        }
    }

    /// Derivative of the projected point given the homogeneous derivative,
    /// by the quotient rule. Reduces to the plain derivative when `w == 1`
    /// everywhere.
    fn project_derivative(self, derivative: Self) -> Vec3 {
        let point = self.project();
        let w = if self.w.is_finite() && self.w != 0.0 { self.w } else { 1.0 };
        Vec3::new(
            (derivative.x - point.x * derivative.w) / w,
            (derivative.y - point.y * derivative.w) / w,
            (derivative.z - point.z * derivative.w) / w,
        )
    }
}

/// One evaluated sample.
struct SplineSample {
    point: Point3,
    tangent: Vec3,
    triangle: Vec<Vec<Point3>>,
    basis: Vec<f64>,
}

/// Evaluates a B-spline or NURBS curve over its support interval.
///
/// Samples `resolution + 1` evenly spaced parameters from the support
/// minimum to the support maximum inclusive. `weights` may be `None` for a
/// non-rational curve; when given it must match `control_points` in length
/// with finite, strictly positive entries.
///
/// # Errors
/// All structural preconditions are checked before sampling starts; see
/// [`SplineError`]. Per-sample evaluation never fails: indeterminate basis
/// ratios at repeated knots contribute 0 by convention.
pub fn evaluate_spline(
    knots: &KnotVector,
    control_points: &[Point3],
    weights: Option<&[f64]>,
    degree: usize,
    resolution: usize,
    method: SplineMethod,
) -> Result<SplineCurveResult, SplineError> {
    if control_points.is_empty() {
        return Err(SplineError::EmptyControlPoints);
    }

    // Fail fast on degree/support problems before any sampling.
    let (min, max) = knots.support(degree)?;

    let expected = knots.required_control_point_count(degree);
    if control_points.len() != expected {
        return Err(SplineError::ControlPointCount {
            knot_count: knots.size(),
            degree,
            expected,
            actual: control_points.len(),
        });
    }

    if let Some(weights) = weights {
        if weights.len() != control_points.len() {
            return Err(SplineError::MismatchedLengths {
                weights: weights.len(),
                points: control_points.len(),
            });
        }
        for (index, &value) in weights.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(SplineError::InvalidWeight { index, value });
            }
        }
    }

    log::debug!(
        "evaluating spline: degree {degree}, {} control points, {} samples, {method:?}",
        control_points.len(),
        resolution + 1
    );

    let parameters: Vec<f64> = if resolution == 0 {
        vec![min]
    } else {
        (0..=resolution)
            .map(|i| {
                if i == resolution {
                    max
                } else {
                    min + (max - min) * i as f64 / resolution as f64
                }
            })
            .collect()
    };

    // Call-scoped working set: flattened knots and homogeneous control
    // points are computed once and shared read-only across samples.
    let flat = knots.values();
    let homogeneous: Vec<HPoint4> = control_points
        .iter()
        .enumerate()
        .map(|(i, &p)| HPoint4::from_weighted(p, weights.map_or(1.0, |w| w[i])))
        .collect();

    let samples = match method {
        SplineMethod::CoxDeBoor => {
            let table = BasisTable::generate(knots, degree, &parameters)?;
            evaluate_cox_de_boor(&table, &flat, &homogeneous, degree)
        }
        SplineMethod::DeBoorLinear => {
            evaluate_de_boor(knots, &flat, &homogeneous, degree, &parameters, (min, max))
        }
    };

    let mut result = SplineCurveResult {
        parameters,
        points: Vec::with_capacity(samples.len()),
        tangents: Vec::with_capacity(samples.len()),
        intermediates: Vec::with_capacity(samples.len()),
        basis_weights: Vec::with_capacity(samples.len()),
    };
    for sample in samples {
        result.points.push(sample.point);
        result.tangents.push(sample.tangent);
        result.intermediates.push(sample.triangle);
        result.basis_weights.push(sample.basis);
    }
    Ok(result)
}

// ─────────────────────────────────────────────────────────────────────────────
// Method (a): Cox-de Boor basis + linear combination
// ─────────────────────────────────────────────────────────────────────────────

fn evaluate_cox_de_boor(
    table: &BasisTable,
    flat: &[f64],
    homogeneous: &[HPoint4],
    degree: usize,
) -> Vec<SplineSample> {
    let n = homogeneous.len();
    (0..table.samples().len())
        .map(|s| {
            let mut acc = HPoint4 { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };
            let row = table.control_point_row(s);
            for (i, h) in homogeneous.iter().enumerate() {
                let basis = row[i];
                if basis != 0.0 {
                    acc = HPoint4 {
                        x: acc.x + h.x * basis,
                        y: acc.y + h.y * basis,
                        z: acc.z + h.z * basis,
                        w: acc.w + h.w * basis,
                    };
                }
            }
            let point = acc.project();

            // Derivative identity: C'(u) = sum over i of
            //   degree / (knot(i+degree) - knot(i)) * (P[i+1] - P[i]) * N_{degree-1}[i+1](u)
            // with zero denominators contributing 0.
            let mut derivative = HPoint4 { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };
            for i in 0..n - 1 {
                let denom = flat[i + degree] - flat[i];
                if denom <= 0.0 {
                    continue;
                }
                let lower = table.value(degree - 1, i + 1, s);
                if lower == 0.0 {
                    continue;
                }
                let factor = degree as f64 / denom * lower;
                let leg = homogeneous[i + 1].sub(homogeneous[i]);
                derivative = HPoint4 {
                    x: derivative.x + leg.x * factor,
                    y: derivative.y + leg.y * factor,
                    z: derivative.z + leg.z * factor,
                    w: derivative.w + leg.w * factor,
                };
            }
            let tangent = acc.project_derivative(derivative);

            // Rational basis weights: w_i N_i / sum w_j N_j. With unit
            // weights this is the plain basis row.
            let denom = if acc.w != 0.0 { acc.w } else { 1.0 };
            let basis = (0..n).map(|i| row[i] * homogeneous[i].w / denom).collect();

            SplineSample { point, tangent, triangle: Vec::new(), basis }
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Method (b): de Boor triangular linear interpolation
// ─────────────────────────────────────────────────────────────────────────────

/// Runs the de Boor triangle for the span starting at flat knot index
/// `i_span` with `steps = degree - r` interpolation rows. Returns the
/// homogeneous rows and the alpha coefficients of every blend.
fn de_boor_triangle(
    flat: &[f64],
    homogeneous: &[HPoint4],
    degree: usize,
    u: f64,
    i_span: usize,
    multiplicity: usize,
) -> (Vec<Vec<HPoint4>>, Vec<Vec<f64>>) {
    let steps = degree - multiplicity;
    let seed_start = i_span + 1 - degree;

    let mut rows: Vec<Vec<HPoint4>> = Vec::with_capacity(steps + 1);
    rows.push((0..=steps).map(|j| homogeneous[seed_start + j]).collect());
    let mut alphas: Vec<Vec<f64>> = Vec::with_capacity(steps);

    for k in 1..=steps {
        let prev = &rows[k - 1];
        let mut row = Vec::with_capacity(steps + 1 - k);
        let mut alpha_row = Vec::with_capacity(steps + 1 - k);
        for j in 0..=steps - k {
            // Grouped so the index stays in range: i_span >= degree - 1
            // and k >= 1, but i_span - degree alone can underflow.
            let lo = flat[i_span + k + j - degree];
            let hi = flat[i_span + 1 + j];
            let denom = hi - lo;
            // A collapsed interval pins the blend to its left operand.
            let alpha = if denom > 0.0 { (u - lo) / denom } else { 0.0 };
            row.push(prev[j].lerp(prev[j + 1], alpha));
            alpha_row.push(alpha);
        }
        rows.push(row);
        alphas.push(alpha_row);
    }

    (rows, alphas)
}

/// Reconstructs the basis weights of the seed control points from the
/// recorded alphas: starting from the apex coefficient 1, each row of the
/// triangle is unrolled back down, splitting every coefficient over the two
/// points that were blended.
fn back_substitute_basis(alphas: &[Vec<f64>]) -> Vec<f64> {
    let mut coefficients = vec![1.0];
    for alpha_row in alphas.iter().rev() {
        let mut next = vec![0.0; coefficients.len() + 1];
        for (j, &c) in coefficients.iter().enumerate() {
            next[j] += c * (1.0 - alpha_row[j]);
            next[j + 1] += c * alpha_row[j];
        }
        coefficients = next;
    }
    coefficients
}

/// Derivative from the two-point row of a *full* (`r = 0`) triangle over the
/// span starting at `i_span`: `degree * (d1 - d0) / (knot(I+1) - knot(I))`,
/// rational-corrected through the quotient rule against the apex.
fn triangle_tangent(rows: &[Vec<HPoint4>], flat: &[f64], degree: usize, i_span: usize) -> Vec3 {
    if rows.len() < 2 {
        return Vec3::ZERO;
    }
    let span_width = flat[i_span + 1] - flat[i_span];
    if span_width <= 0.0 {
        return Vec3::ZERO;
    }
    let apex = rows[rows.len() - 1][0];
    let pair = &rows[rows.len() - 2];
    let derivative = pair[1].sub(pair[0]).scale(degree as f64 / span_width);
    apex.project_derivative(derivative)
}

fn de_boor_sample(
    flat: &[f64],
    homogeneous: &[HPoint4],
    degree: usize,
    u: f64,
    position: (usize, usize),
) -> SplineSample {
    let (found_index, found_multiplicity) = position;
    let multiplicity = found_multiplicity.min(degree);

    // The two-point-row derivative identity only holds for a full triangle,
    // so samples landing exactly on a knot evaluate one over an adjoining
    // span as well: the span to the right when its seeds exist (right limit),
    // otherwise the span left of the knot's run (left limit).
    let (i_span, full_rows, full_alphas) = if multiplicity == 0 {
        let (rows, alphas) = de_boor_triangle(flat, homogeneous, degree, u, found_index, 0);
        (found_index, rows, alphas)
    } else {
        // Right span needs seed and knot indices through found_index + degree.
        let i_span = if found_index + degree < flat.len() {
            found_index
        } else {
            found_index - found_multiplicity
        };
        let (rows, alphas) = de_boor_triangle(flat, homogeneous, degree, u, i_span, 0);
        (i_span, rows, alphas)
    };

    let tangent = triangle_tangent(&full_rows, flat, degree, i_span);

    // Point, basis weights and the reported triangle use the
    // multiplicity-shortened seeding; at full multiplicity that triangle is
    // a lone seed point, and the full triangle's apex is the same limit
    // point, so the full one is reported instead.
    let (rows, alphas, seed_start) = if multiplicity == 0 || multiplicity == degree {
        (full_rows, full_alphas, i_span + 1 - degree)
    } else {
        let (rows, alphas) =
            de_boor_triangle(flat, homogeneous, degree, u, found_index, multiplicity);
        (rows, alphas, found_index + 1 - degree)
    };

    let apex = rows[rows.len() - 1][0];
    let point = apex.project();

    // Scatter the seed-local coefficients into a full-length basis vector,
    // folding in the rational correction w_i N_i / w(u).
    let coefficients = back_substitute_basis(&alphas);
    let w = if apex.w != 0.0 { apex.w } else { 1.0 };
    let mut basis = vec![0.0; homogeneous.len()];
    for (j, &c) in coefficients.iter().enumerate() {
        basis[seed_start + j] = c * homogeneous[seed_start + j].w / w;
    }

    let triangle = rows
        .iter()
        .map(|row| row.iter().map(|h| h.project()).collect())
        .collect();

    SplineSample { point, tangent, triangle, basis }
}

fn evaluate_de_boor(
    knots: &KnotVector,
    flat: &[f64],
    homogeneous: &[HPoint4],
    degree: usize,
    parameters: &[f64],
    support: (f64, f64),
) -> Vec<SplineSample> {
    let (min, max) = support;

    let positions: Vec<(usize, usize)> = parameters
        .iter()
        .map(|&u| {
            let u = u.clamp(min, max);
            // In-support parameters always have a knot at or below them.
            knots
                .index_of(u)
                .map_or((degree - 1, 0), |p| (p.index, p.multiplicity))
        })
        .collect();

    let evaluate = |(&u, &position): (&f64, &(usize, usize))| {
        de_boor_sample(flat, homogeneous, degree, u.clamp(min, max), position)
    };

    #[cfg(feature = "parallel")]
    {
        parameters.par_iter().zip(positions.par_iter()).map(evaluate).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        parameters.iter().zip(positions.iter()).map(evaluate).collect()
    }
}
