//! End-to-end checks of the evaluation kernel through its public API.

use cagd_kernel::{
    KnotVector, Point3, SplineMethod, Vec3, evaluate_bezier_curve, evaluate_bezier_surface,
    evaluate_spline,
};

fn assert_point_close(a: Point3, b: Point3, tol: f64, context: &str) {
    assert!(
        a.distance_to(b) < tol,
        "{context}: {a:?} vs {b:?} (distance {})",
        a.distance_to(b)
    );
}

fn assert_vec_close(a: Vec3, b: Vec3, tol: f64, context: &str) {
    assert!((a - b).length() < tol, "{context}: {a:?} vs {b:?}");
}

fn cubic_control_points() -> Vec<Point3> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 2.0, 0.0),
        Point3::new(3.0, 3.0, 1.0),
        Point3::new(4.0, 0.0, 2.0),
    ]
}

#[test]
fn bspline_on_bezier_knots_matches_de_casteljau() {
    let points = cubic_control_points();
    let knots = KnotVector::from_values(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).expect("knots");
    let bezier = evaluate_bezier_curve(&points, 100).expect("bezier");

    for method in [SplineMethod::CoxDeBoor, SplineMethod::DeBoorLinear] {
        let spline = evaluate_spline(&knots, &points, None, 3, 100, method).expect("spline");
        assert_eq!(spline.parameters.len(), 101);
        for s in 0..spline.parameters.len() {
            assert!((spline.parameters[s] - bezier.parameters[s]).abs() < 1e-12);
            assert_point_close(
                spline.points[s],
                bezier.points[s],
                1e-9,
                &format!("{method:?} point at sample {s}"),
            );
            assert_vec_close(
                spline.tangents[s],
                bezier.tangents[s],
                1e-6,
                &format!("{method:?} tangent at sample {s}"),
            );
        }
    }
}

#[test]
fn spline_methods_agree_including_knot_hits() {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 3.0, 0.0),
        Point3::new(3.0, 4.0, 1.0),
        Point3::new(5.0, 1.0, 2.0),
        Point3::new(7.0, -1.0, 1.0),
        Point3::new(8.0, 2.0, 0.0),
    ];
    let knots = KnotVector::from_values(&[0.0, 0.0, 0.0, 1.0, 2.0, 4.0, 4.0, 4.0]).expect("knots");

    // Resolution 60 over support [0, 4] lands samples exactly on the interior
    // knots 1 and 2.
    let cox = evaluate_spline(&knots, &points, None, 3, 60, SplineMethod::CoxDeBoor).expect("cox");
    let boor =
        evaluate_spline(&knots, &points, None, 3, 60, SplineMethod::DeBoorLinear).expect("boor");

    for s in 0..cox.parameters.len() {
        assert_point_close(cox.points[s], boor.points[s], 1e-9, &format!("point at sample {s}"));
        assert_vec_close(cox.tangents[s], boor.tangents[s], 1e-6, &format!("tangent at sample {s}"));
        for i in 0..points.len() {
            assert!(
                (cox.basis_weights[s][i] - boor.basis_weights[s][i]).abs() < 1e-9,
                "basis weight {i} at sample {s}"
            );
        }
    }
}

#[test]
fn spline_methods_agree_at_interior_double_knot() {
    // Interior knot of multiplicity 2 under degree 3: samples landing on it
    // take the multiplicity-shortened de Boor seeding, which must still match
    // the basis-table evaluation in points, tangents and basis weights.
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 2.0, 0.0),
        Point3::new(2.0, 3.0, 1.0),
        Point3::new(4.0, 2.0, 1.0),
        Point3::new(5.0, 0.0, 0.0),
        Point3::new(6.0, -2.0, 0.0),
    ];
    let knots = KnotVector::from_values(&[0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 2.0]).expect("knots");

    // Resolution 10 over support [0, 2] lands sample 5 exactly on u = 1.
    let cox = evaluate_spline(&knots, &points, None, 3, 10, SplineMethod::CoxDeBoor).expect("cox");
    let boor =
        evaluate_spline(&knots, &points, None, 3, 10, SplineMethod::DeBoorLinear).expect("boor");
    assert!((cox.parameters[5] - 1.0).abs() < 1e-15);

    for s in 0..cox.parameters.len() {
        assert_point_close(cox.points[s], boor.points[s], 1e-9, &format!("point at sample {s}"));
        assert_vec_close(cox.tangents[s], boor.tangents[s], 1e-6, &format!("tangent at sample {s}"));
        for i in 0..points.len() {
            assert!(
                (cox.basis_weights[s][i] - boor.basis_weights[s][i]).abs() < 1e-9,
                "basis weight {i} at sample {s}"
            );
        }
    }

    // The shortened triangle at the double knot blends just two seeds.
    let triangle = &boor.intermediates[5];
    assert_eq!(triangle.len(), 2);
    assert_eq!(triangle[0].len(), 2);
    let sum: f64 = boor.basis_weights[5].iter().sum();
    assert!((sum - 1.0).abs() < 1e-12);
}

#[test]
fn basis_weights_partition_unity_for_rational_curves() {
    let points = cubic_control_points();
    let knots = KnotVector::from_values(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).expect("knots");
    let weights = [1.0, 0.5, 2.0, 1.0];

    for method in [SplineMethod::CoxDeBoor, SplineMethod::DeBoorLinear] {
        let result =
            evaluate_spline(&knots, &points, Some(&weights), 3, 50, method).expect("spline");
        for (s, row) in result.basis_weights.iter().enumerate() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "{method:?} basis sum {sum} at sample {s}");
        }
    }
}

#[test]
fn curve_is_continuous_across_simple_knots() {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 3.0, 0.0),
        Point3::new(3.0, 4.0, 1.0),
        Point3::new(5.0, 1.0, 2.0),
        Point3::new(7.0, -1.0, 1.0),
        Point3::new(8.0, 2.0, 0.0),
    ];
    let knots = KnotVector::from_values(&[0.0, 0.0, 0.0, 1.0, 2.0, 4.0, 4.0, 4.0]).expect("knots");

    let result =
        evaluate_spline(&knots, &points, None, 3, 1000, SplineMethod::DeBoorLinear).expect("spline");
    for s in 1..result.points.len() {
        let step = result.points[s].distance_to(result.points[s - 1]);
        assert!(step < 0.1, "jump of {step} between samples {} and {s}", s - 1);
    }
}

#[test]
fn rational_quadratic_traces_a_quarter_circle() {
    let points = vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    let weights = [1.0, std::f64::consts::FRAC_1_SQRT_2, 1.0];
    let knots = KnotVector::from_values(&[0.0, 0.0, 1.0, 1.0]).expect("knots");

    let result = evaluate_spline(&knots, &points, Some(&weights), 2, 64, SplineMethod::DeBoorLinear)
        .expect("arc");
    for (s, point) in result.points.iter().enumerate() {
        let radius = point.to_vec3().length();
        assert!((radius - 1.0).abs() < 1e-12, "radius {radius} at sample {s}");
        // The tangent of a circle is perpendicular to the radius vector.
        let dot = point.to_vec3().dot(result.tangents[s]);
        assert!(dot.abs() < 1e-9, "tangent not perpendicular at sample {s}: {dot}");
    }
}

#[test]
fn degree_one_spline_interpolates_control_points() {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(2.0, 0.0, 1.0),
        Point3::new(3.0, 2.0, 1.0),
    ];
    let knots = KnotVector::from_values(&[0.0, 1.0, 2.0, 3.0]).expect("knots");

    let result =
        evaluate_spline(&knots, &points, None, 1, 6, SplineMethod::CoxDeBoor).expect("polyline");
    for (s, &u) in result.parameters.iter().enumerate() {
        let segment = (u.floor() as usize).min(points.len() - 2);
        let expected = points[segment].lerp(points[segment + 1], u - segment as f64);
        assert_point_close(result.points[s], expected, 1e-12, &format!("sample at u={u}"));
    }
}

#[test]
fn de_boor_intermediates_expose_the_triangle() {
    let points = cubic_control_points();
    let knots = KnotVector::from_values(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).expect("knots");

    let boor =
        evaluate_spline(&knots, &points, None, 3, 2, SplineMethod::DeBoorLinear).expect("boor");
    // Interior sample: the triangle runs from a full seed row down to the apex.
    let triangle = &boor.intermediates[1];
    assert_eq!(triangle[0].len(), 4);
    assert_eq!(triangle[triangle.len() - 1].len(), 1);
    assert_point_close(triangle[triangle.len() - 1][0], boor.points[1], 1e-12, "apex");

    let cox = evaluate_spline(&knots, &points, None, 3, 2, SplineMethod::CoxDeBoor).expect("cox");
    assert!(cox.intermediates.iter().all(Vec::is_empty));
}

#[test]
fn knot_insert_and_remove_round_trip() {
    let values = [0.0, 0.0, 0.0, 2.0, 4.0, 4.0, 5.0, 7.0, 7.0, 7.0, 9.0, 10.0, 12.0, 12.0];
    let mut knots = KnotVector::from_values(&values).expect("knots");
    assert_eq!(knots.size(), 14);
    assert_eq!(knots.required_control_point_count(3), 12);

    assert!(knots.insert(6.0, 3));
    assert_eq!(knots.size(), 15);
    let position = knots.index_of(6.0).expect("position");
    assert_eq!(position.multiplicity, 1);
    assert_eq!(knots.at(position.index), Some(6.0));

    assert!(knots.remove(6.0, 3));
    assert_eq!(knots.size(), 14);
    assert_eq!(knots.values(), values);

    // 7.0 already sits at multiplicity 3; inserting it again for a degree-2
    // curve would exceed degree + 1.
    assert!(!knots.insert(7.0, 2));
}

#[test]
fn refined_knot_vector_preserves_shape() {
    // A clamped uniform cubic, then the same curve after inserting a knot and
    // the matching control point computed by hand for the midpoint span.
    let points = cubic_control_points();
    let knots = KnotVector::clamped_uniform(points.len(), 3).expect("knots");
    let coarse =
        evaluate_spline(&knots, &points, None, 3, 40, SplineMethod::DeBoorLinear).expect("coarse");

    // Boehm's rule for one insertion at t = 0.5: every interior blend factor
    // is 0.5 on a clamped single-segment cubic.
    let mut refined_knots = knots.clone();
    assert!(refined_knots.insert(0.5, 3));
    let refined_points = vec![
        points[0],
        points[0].lerp(points[1], 0.5),
        points[1].lerp(points[2], 0.5),
        points[2].lerp(points[3], 0.5),
        points[3],
    ];
    let fine = evaluate_spline(&refined_knots, &refined_points, None, 3, 40, SplineMethod::DeBoorLinear)
        .expect("fine");

    for s in 0..coarse.points.len() {
        assert_point_close(coarse.points[s], fine.points[s], 1e-9, &format!("sample {s}"));
    }
}

#[test]
fn bezier_curve_interpolates_endpoints() {
    let points = cubic_control_points();
    let result = evaluate_bezier_curve(&points, 10).expect("bezier");

    assert_point_close(result.points[0], points[0], 1e-12, "start");
    assert_point_close(result.points[10], points[3], 1e-12, "end");
    assert_vec_close(
        result.tangents[0],
        points[1].sub_point(points[0]) * 3.0,
        1e-12,
        "start tangent",
    );
    assert_vec_close(
        result.tangents[10],
        points[3].sub_point(points[2]) * 3.0,
        1e-12,
        "end tangent",
    );
}

#[test]
fn planar_bezier_surface_has_vertical_normals() {
    let grid: Vec<Vec<Point3>> = (0..3)
        .map(|i| (0..4).map(|j| Point3::new(i as f64, j as f64, 0.0)).collect())
        .collect();
    let result = evaluate_bezier_surface(&grid, (8, 8)).expect("surface");

    assert_eq!(result.points.len(), 9);
    assert_eq!(result.points[0].len(), 9);
    for row in &result.normals {
        for normal in row {
            assert!(normal.x.abs() < 1e-12 && normal.y.abs() < 1e-12);
            assert!((normal.z.abs() - 1.0).abs() < 1e-12);
        }
    }
}
