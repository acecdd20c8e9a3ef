#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

//! Evaluation kernel for parametric curves and surfaces used in
//! computer-aided geometric design.
//!
//! The crate implements the numerical core shared by rendering and
//! instruction front ends:
//!
//! - Bezier curves and tensor-product surfaces via de Casteljau's algorithm
//!   ([`evaluate_bezier_curve`], [`evaluate_bezier_surface`]).
//! - Bernstein and Cox-de Boor basis function tabulation
//!   ([`generate_bernstein_basis`], [`BasisTable`]).
//! - B-spline/NURBS curves over a mutable [`KnotVector`], evaluated either
//!   through the basis table or through de Boor's triangular scheme
//!   ([`evaluate_spline`], [`SplineMethod`]).
//!
//! All evaluation is synchronous and pure: the kernel never mutates
//! caller-supplied control points, and any memoization (the basis table) is
//! owned by a single call. Callers mutate control points, weights and knot
//! vectors between calls, never during one.
//!
//! The optional `parallel` feature distributes per-sample work with `rayon`.

mod basis;
mod bezier;
mod core;
mod knot;
mod spline;

pub use basis::{BasisTable, bernstein, generate_bernstein_basis};
pub use bezier::{
    BezierCurveResult, BezierError, BezierSurfaceResult, calculate_intermediates,
    evaluate_bezier_curve, evaluate_bezier_surface, evaluate_derivative, evaluate_point,
};
pub use core::{Point3, Tolerance, Vec3};
pub use knot::{Knot, KnotError, KnotPosition, KnotVector};
pub use spline::{SplineCurveResult, SplineError, SplineMethod, evaluate_spline};
