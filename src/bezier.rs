//! Bezier curve and tensor-product surface evaluation via de Casteljau's
//! algorithm: repeated linear interpolation among control points.

use serde::Serialize;

use crate::core::{Point3, Vec3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Errors raised by Bezier evaluation entry points.
#[derive(Debug, thiserror::Error)]
pub enum BezierError {
    /// No control points were supplied.
    #[error("control points must not be empty")]
    EmptyControlPoints,

    /// The surface control grid has no rows, or an empty row.
    #[error("control grid must not be empty")]
    EmptyGrid,

    /// The surface control grid rows differ in length.
    #[error("control grid row {row} has {actual} points, expected {expected}")]
    RaggedGrid { row: usize, expected: usize, actual: usize },
}

/// Sampled Bezier curve: per-sample parallel vectors.
#[derive(Debug, Clone, Serialize)]
pub struct BezierCurveResult {
    /// Parameter of each sample, evenly spaced over `[0, 1]` inclusive.
    pub parameters: Vec<f64>,
    /// Curve point at each sample.
    pub points: Vec<Point3>,
    /// Curve derivative at each sample (zero for a single control point).
    pub tangents: Vec<Vec3>,
    /// De Casteljau stages at each sample, seed row first, apex last.
    pub intermediates: Vec<Vec<Vec<Point3>>>,
}

impl BezierCurveResult {
    /// Unit tangent directions for display, zero where the derivative
    /// vanishes.
    #[must_use]
    pub fn unit_tangents(&self) -> Vec<Vec3> {
        self.tangents.iter().map(|t| t.normalized_or_zero()).collect()
    }
}

/// Sampled tensor-product Bezier surface, indexed `[u sample][v sample]`.
#[derive(Debug, Clone, Serialize)]
pub struct BezierSurfaceResult {
    pub points: Vec<Vec<Point3>>,
    /// Unit surface normals, zero where the tangent fields degenerate.
    pub normals: Vec<Vec<Vec3>>,
    /// Partial derivative along the first grid axis.
    pub tangents: Vec<Vec<Vec3>>,
    /// Partial derivative along the second grid axis.
    pub bitangents: Vec<Vec<Vec3>>,
}

/// Evaluates a Bezier curve point at `t` by de Casteljau reduction.
///
/// `t` is normally in `[0, 1]`; values outside extrapolate.
///
/// # Errors
/// [`BezierError::EmptyControlPoints`] when `points` is empty.
pub fn evaluate_point(points: &[Point3], t: f64) -> Result<Point3, BezierError> {
    if points.is_empty() {
        return Err(BezierError::EmptyControlPoints);
    }
    let mut stage = points.to_vec();
    while stage.len() > 1 {
        for i in 0..stage.len() - 1 {
            stage[i] = stage[i].lerp(stage[i + 1], t);
        }
        stage.pop();
    }
    Ok(stage[0])
}

/// Evaluates the curve derivative at `t`: de Casteljau down to two points,
/// then `degree * (p1 - p0)`.
///
/// A single control point has a zero derivative.
///
/// # Errors
/// [`BezierError::EmptyControlPoints`] when `points` is empty.
pub fn evaluate_derivative(points: &[Point3], t: f64) -> Result<Vec3, BezierError> {
    if points.is_empty() {
        return Err(BezierError::EmptyControlPoints);
    }
    if points.len() == 1 {
        return Ok(Vec3::ZERO);
    }

    let degree = points.len() - 1;
    let mut stage = points.to_vec();
    while stage.len() > 2 {
        for i in 0..stage.len() - 1 {
            stage[i] = stage[i].lerp(stage[i + 1], t);
        }
        stage.pop();
    }
    Ok(stage[1].sub_point(stage[0]).mul_scalar(degree as f64))
}

/// Returns every stage of the de Casteljau reduction at `t`, from the seed
/// control points down to the single evaluated point.
///
/// # Errors
/// [`BezierError::EmptyControlPoints`] when `points` is empty.
pub fn calculate_intermediates(points: &[Point3], t: f64) -> Result<Vec<Vec<Point3>>, BezierError> {
    if points.is_empty() {
        return Err(BezierError::EmptyControlPoints);
    }
    let mut stages = vec![points.to_vec()];
    while stages[stages.len() - 1].len() > 1 {
        let prev = &stages[stages.len() - 1];
        let next: Vec<Point3> = (0..prev.len() - 1).map(|i| prev[i].lerp(prev[i + 1], t)).collect();
        stages.push(next);
    }
    Ok(stages)
}

fn sample_parameters(resolution: usize) -> Vec<f64> {
    if resolution == 0 {
        return vec![0.0];
    }
    (0..=resolution)
        .map(|i| if i == resolution { 1.0 } else { i as f64 / resolution as f64 })
        .collect()
}

/// Per-sample evaluation. Callers validate `points` is non-empty before the
/// sampling loop starts.
fn evaluate_curve_sample(points: &[Point3], t: f64) -> (Point3, Vec3, Vec<Vec<Point3>>) {
    let mut stages = vec![points.to_vec()];
    while stages[stages.len() - 1].len() > 1 {
        let prev = &stages[stages.len() - 1];
        let next: Vec<Point3> = (0..prev.len() - 1).map(|i| prev[i].lerp(prev[i + 1], t)).collect();
        stages.push(next);
    }
    let point = stages[stages.len() - 1][0];
    let tangent = if stages.len() > 1 {
        let pair = &stages[stages.len() - 2];
        pair[1].sub_point(pair[0]).mul_scalar((points.len() - 1) as f64)
    } else {
        Vec3::ZERO
    };
    (point, tangent, stages)
}

#[cfg(feature = "parallel")]
fn evaluate_curve_samples(points: &[Point3], parameters: &[f64]) -> Vec<(Point3, Vec3, Vec<Vec<Point3>>)> {
    parameters.par_iter().map(|&t| evaluate_curve_sample(points, t)).collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_curve_samples(points: &[Point3], parameters: &[f64]) -> Vec<(Point3, Vec3, Vec<Vec<Point3>>)> {
    parameters.iter().map(|&t| evaluate_curve_sample(points, t)).collect()
}

/// Samples a Bezier curve at `resolution + 1` evenly spaced parameters in
/// `[0, 1]` inclusive, returning points, tangents and de Casteljau stages.
///
/// # Errors
/// [`BezierError::EmptyControlPoints`] when `points` is empty.
pub fn evaluate_bezier_curve(points: &[Point3], resolution: usize) -> Result<BezierCurveResult, BezierError> {
    if points.is_empty() {
        return Err(BezierError::EmptyControlPoints);
    }
    log::debug!(
        "evaluating bezier curve: {} control points, {} samples",
        points.len(),
        resolution + 1
    );

    let parameters = sample_parameters(resolution);
    let samples = evaluate_curve_samples(points, &parameters);

    let mut result = BezierCurveResult {
        parameters,
        points: Vec::with_capacity(samples.len()),
        tangents: Vec::with_capacity(samples.len()),
        intermediates: Vec::with_capacity(samples.len()),
    };
    for (point, tangent, stages) in samples {
        result.points.push(point);
        result.tangents.push(tangent);
        result.intermediates.push(stages);
    }
    Ok(result)
}

fn validate_grid(grid: &[Vec<Point3>]) -> Result<(), BezierError> {
    if grid.is_empty() || grid[0].is_empty() {
        return Err(BezierError::EmptyGrid);
    }
    let expected = grid[0].len();
    for (row, points) in grid.iter().enumerate() {
        if points.len() != expected {
            return Err(BezierError::RaggedGrid { row, expected, actual: points.len() });
        }
    }
    Ok(())
}

/// Evaluates a tensor-product Bezier surface over a 2-D control grid.
///
/// The first grid axis (rows) is sampled at `resolution.0 + 1` parameters,
/// the second at `resolution.1 + 1`. Curve evaluation is applied along every
/// row, the intermediate grid is transposed, and curve evaluation is applied
/// again; because de Casteljau reduction is linear, running the second pass
/// over the first pass's tangent field yields the exact first-axis partial
/// derivative. Normals are the normalized cross product of the two tangent
/// fields.
///
/// # Errors
/// [`BezierError::EmptyGrid`] or [`BezierError::RaggedGrid`] for malformed
/// grids.
pub fn evaluate_bezier_surface(
    grid: &[Vec<Point3>],
    resolution: (usize, usize),
) -> Result<BezierSurfaceResult, BezierError> {
    validate_grid(grid)?;
    let (res_u, res_v) = resolution;
    log::debug!(
        "evaluating bezier surface: {}x{} control grid, {}x{} samples",
        grid.len(),
        grid[0].len(),
        res_u + 1,
        res_v + 1
    );

    let params_u = sample_parameters(res_u);
    let params_v = sample_parameters(res_v);

    // First pass: every grid row becomes a sampled row of points plus the
    // u-tangent field along it.
    let mut pass_points: Vec<Vec<Point3>> = Vec::with_capacity(grid.len());
    let mut pass_tangents: Vec<Vec<Vec3>> = Vec::with_capacity(grid.len());
    for row in grid {
        let samples = evaluate_curve_samples(row, &params_u);
        pass_points.push(samples.iter().map(|(p, _, _)| *p).collect());
        pass_tangents.push(samples.iter().map(|(_, t, _)| *t).collect());
    }

    let rows = grid.len();
    let mut points = Vec::with_capacity(params_u.len());
    let mut normals = Vec::with_capacity(params_u.len());
    let mut tangents = Vec::with_capacity(params_u.len());
    let mut bitangents = Vec::with_capacity(params_u.len());

    // Second pass: transpose and evaluate along the other axis.
    for su in 0..params_u.len() {
        let column: Vec<Point3> = (0..rows).map(|r| pass_points[r][su]).collect();
        let tangent_column: Vec<Point3> = (0..rows).map(|r| pass_tangents[r][su].to_point3()).collect();

        let column_samples = evaluate_curve_samples(&column, &params_v);
        let mut row_points = Vec::with_capacity(params_v.len());
        let mut row_normals = Vec::with_capacity(params_v.len());
        let mut row_tangents = Vec::with_capacity(params_v.len());
        let mut row_bitangents = Vec::with_capacity(params_v.len());

        for (sv, &t) in params_v.iter().enumerate() {
            let (point, bitangent, _) = column_samples[sv];
            let tangent = evaluate_point(&tangent_column, t)
                .map(Point3::to_vec3)
                .unwrap_or(Vec3::ZERO);
            row_points.push(point);
            row_tangents.push(tangent);
            row_bitangents.push(bitangent);
            row_normals.push(tangent.cross(bitangent).normalized_or_zero());
        }

        points.push(row_points);
        normals.push(row_normals);
        tangents.push(row_tangents);
        bitangents.push(row_bitangents);
    }

    Ok(BezierSurfaceResult { points, normals, tangents, bitangents })
}
