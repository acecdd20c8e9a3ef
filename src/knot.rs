//! Knot vectors for B-spline and NURBS evaluation.
//!
//! A [`KnotVector`] stores a strictly increasing sequence of knot values with
//! positive multiplicities. Indexing is *flattened*: a knot of multiplicity 3
//! occupies three consecutive flat indices. The kernel uses a reduced knot
//! convention in which a degree-`p` curve over `size` knots takes
//! `size - p + 1` control points and is defined on the support interval
//! `[knot(p - 1), knot(size - p)]`.

use serde::{Deserialize, Serialize};

/// A single knot value together with its multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knot {
    pub value: f64,
    pub multiplicity: usize,
}

impl Knot {
    #[must_use]
    pub const fn new(value: f64, multiplicity: usize) -> Self {
        Self { value, multiplicity }
    }
}

/// Result of a [`KnotVector::index_of`] lookup.
///
/// `index` is the flat index of the last occurrence of the queried value when
/// present, otherwise the flat index of the last knot strictly below it.
/// `multiplicity` is the queried value's multiplicity, 0 when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnotPosition {
    pub index: usize,
    pub multiplicity: usize,
}

/// Errors raised by structural knot-vector queries.
#[derive(Debug, thiserror::Error)]
pub enum KnotError {
    /// Degree below 1, or the knot vector is too short for the degree.
    #[error("invalid degree {degree} for a knot vector of size {size}")]
    InvalidDegree { degree: usize, size: usize },

    /// The support interval collapses, either to fewer than two distinct
    /// flat indices or to a single parameter value; the curve degenerates to
    /// a point and has no derivative.
    #[error("support interval for degree {degree} is degenerate ({span} flat knot steps)")]
    DegenerateSupport { degree: usize, span: usize },

    /// Internal lookup outside the flattened index range. Valid preconditions
    /// make this unreachable.
    #[error("knot index {index} out of range for {size} knots")]
    IndexOutOfRange { index: usize, size: usize },

    /// A flat input sequence was not non-decreasing.
    #[error("knot values must be non-decreasing (value {value} at flat index {index})")]
    OutOfOrder { index: usize, value: f64 },
}

/// An ordered sequence of (knot value, multiplicity) pairs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KnotVector {
    knots: Vec<Knot>,
}

impl KnotVector {
    #[must_use]
    pub const fn new() -> Self {
        Self { knots: Vec::new() }
    }

    /// Builds a knot vector from a flat, non-decreasing list of values,
    /// collapsing repeats into multiplicities.
    ///
    /// # Errors
    /// Returns [`KnotError::OutOfOrder`] when the input decreases.
    pub fn from_values(values: &[f64]) -> Result<Self, KnotError> {
        let mut knots: Vec<Knot> = Vec::new();
        for (index, &value) in values.iter().enumerate() {
            match knots.last_mut() {
                Some(last) if last.value == value => last.multiplicity += 1,
                Some(last) if last.value > value => {
                    return Err(KnotError::OutOfOrder { index, value });
                }
                _ => knots.push(Knot::new(value, 1)),
            }
        }
        Ok(Self { knots })
    }

    /// Builds a clamped uniform knot vector for `control_point_count` control
    /// points of the given degree: `degree`-fold end knots at 0 and 1 with
    /// evenly spaced simple interior knots.
    ///
    /// # Errors
    /// Returns [`KnotError::InvalidDegree`] when `degree < 1` or there are
    /// not enough control points (`control_point_count <= degree`).
    pub fn clamped_uniform(control_point_count: usize, degree: usize) -> Result<Self, KnotError> {
        if degree < 1 || control_point_count <= degree {
            return Err(KnotError::InvalidDegree {
                degree,
                size: (control_point_count + degree).saturating_sub(1),
            });
        }

        let interior = control_point_count - degree - 1;
        let mut knots = Vec::with_capacity(interior + 2);
        knots.push(Knot::new(0.0, degree));
        for i in 1..=interior {
            knots.push(Knot::new(i as f64 / (interior + 1) as f64, 1));
        }
        knots.push(Knot::new(1.0, degree));
        Ok(Self { knots })
    }

    /// Number of distinct knot values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.knots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// Total knot count: the sum of all multiplicities.
    #[must_use]
    pub fn size(&self) -> usize {
        self.knots.iter().map(|k| k.multiplicity).sum()
    }

    /// The (value, multiplicity) pairs in increasing value order.
    #[must_use]
    pub fn knots(&self) -> &[Knot] {
        &self.knots
    }

    /// The flattened knot values, repeats expanded.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.size());
        for knot in &self.knots {
            for _ in 0..knot.multiplicity {
                values.push(knot.value);
            }
        }
        values
    }

    /// Knot value at a flat index, `None` when out of range.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<f64> {
        let mut remaining = index;
        for knot in &self.knots {
            if remaining < knot.multiplicity {
                return Some(knot.value);
            }
            remaining -= knot.multiplicity;
        }
        None
    }

    /// Locates `value` in the flattened sequence.
    ///
    /// When present, returns the flat index of its *last* occurrence along
    /// with its multiplicity, so `at(index_of(v)?.index) == Some(v)`. When
    /// absent, returns the flat index of the last knot strictly below `value`
    /// with multiplicity 0. Returns `None` when `value` precedes every knot.
    #[must_use]
    pub fn index_of(&self, value: f64) -> Option<KnotPosition> {
        let mut flat = 0usize;
        let mut best: Option<KnotPosition> = None;
        for knot in &self.knots {
            if knot.value > value {
                break;
            }
            let last = flat + knot.multiplicity - 1;
            if knot.value == value {
                return Some(KnotPosition { index: last, multiplicity: knot.multiplicity });
            }
            best = Some(KnotPosition { index: last, multiplicity: 0 });
            flat += knot.multiplicity;
        }
        best
    }

    /// Inserts `value`, raising its multiplicity when already present.
    ///
    /// Returns `false` (leaving the vector untouched) when the insertion
    /// would push the multiplicity past `degree + 1`, or when `value` is not
    /// finite. A rejected insertion is an expected outcome, not an error.
    pub fn insert(&mut self, value: f64, degree: usize) -> bool {
        if !value.is_finite() {
            log::debug!("knot insertion rejected: value {value} is not finite");
            return false;
        }

        match self.knots.iter().position(|k| k.value >= value) {
            Some(i) if self.knots[i].value == value => {
                if self.knots[i].multiplicity > degree {
                    log::debug!(
                        "knot insertion rejected: multiplicity {} at {value} is maximal for degree {degree}",
                        self.knots[i].multiplicity
                    );
                    return false;
                }
                self.knots[i].multiplicity += 1;
                true
            }
            Some(i) => {
                self.knots.insert(i, Knot::new(value, 1));
                true
            }
            None => {
                self.knots.push(Knot::new(value, 1));
                true
            }
        }
    }

    /// Removes one occurrence of `value`, dropping the pair when its
    /// multiplicity reaches 0.
    ///
    /// Returns `false` when `value` is absent, or when the removal would
    /// leave the degree-`degree` support interval without a viable span.
    pub fn remove(&mut self, value: f64, degree: usize) -> bool {
        let Some(i) = self.knots.iter().position(|k| k.value == value) else {
            return false;
        };

        // The shrunk vector must still carry a non-degenerate support.
        let new_size = self.size() - 1;
        if degree < 1 || new_size <= degree || new_size < 2 * degree {
            log::debug!(
                "knot removal rejected: removing {value} leaves {new_size} knots, too few for degree {degree}"
            );
            return false;
        }

        if self.knots[i].multiplicity > 1 {
            self.knots[i].multiplicity -= 1;
        } else {
            self.knots.remove(i);
        }
        true
    }

    /// Flat index bounds `(knot(degree - 1), knot(size - degree))` of the
    /// support interval.
    ///
    /// # Errors
    /// [`KnotError::InvalidDegree`] when `degree < 1` or `size <= degree`;
    /// [`KnotError::DegenerateSupport`] when the interval spans fewer than
    /// two distinct flat indices, or when both bounds carry the same knot
    /// value (a boundary knot at multiplicity `degree + 1`).
    pub fn support_indices(&self, degree: usize) -> Result<(usize, usize), KnotError> {
        let size = self.size();
        if degree < 1 || size <= degree {
            return Err(KnotError::InvalidDegree { degree, size });
        }
        let lo = degree - 1;
        let hi = size - degree;
        if hi <= lo {
            return Err(KnotError::DegenerateSupport { degree, span: 0 });
        }
        // Index bounds can be distinct while the values coincide, e.g.
        // [0,0,0,0,1,2] at degree 3; the curve still collapses to a point.
        if self.at(lo) == self.at(hi) {
            return Err(KnotError::DegenerateSupport { degree, span: hi - lo });
        }
        Ok((lo, hi))
    }

    /// Support interval in knot values for the given degree.
    ///
    /// # Errors
    /// Same conditions as [`Self::support_indices`].
    pub fn support(&self, degree: usize) -> Result<(f64, f64), KnotError> {
        let size = self.size();
        let (lo, hi) = self.support_indices(degree)?;
        let min = self.at(lo).ok_or(KnotError::IndexOutOfRange { index: lo, size })?;
        let max = self.at(hi).ok_or(KnotError::IndexOutOfRange { index: hi, size })?;
        Ok((min, max))
    }

    /// Control points required by a degree-`degree` spline over this vector:
    /// `size - degree + 1`.
    #[must_use]
    pub fn required_control_point_count(&self, degree: usize) -> usize {
        (self.size() + 1).saturating_sub(degree)
    }
}

#[cfg(test)]
mod tests {
    use super::{KnotError, KnotVector};

    fn vector(values: &[f64]) -> KnotVector {
        KnotVector::from_values(values).expect("non-decreasing")
    }

    #[test]
    fn from_values_collapses_multiplicities() {
        let knots = vector(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(knots.len(), 2);
        assert_eq!(knots.size(), 6);
        assert_eq!(knots.knots()[0].multiplicity, 3);
        assert_eq!(knots.values(), vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn from_values_rejects_decreasing_input() {
        assert!(matches!(
            KnotVector::from_values(&[0.0, 1.0, 0.5]),
            Err(KnotError::OutOfOrder { index: 2, .. })
        ));
    }

    #[test]
    fn at_walks_flat_indices() {
        let knots = vector(&[0.0, 0.0, 2.0, 4.0, 4.0, 5.0]);
        assert_eq!(knots.at(0), Some(0.0));
        assert_eq!(knots.at(1), Some(0.0));
        assert_eq!(knots.at(2), Some(2.0));
        assert_eq!(knots.at(4), Some(4.0));
        assert_eq!(knots.at(5), Some(5.0));
        assert_eq!(knots.at(6), None);
    }

    #[test]
    fn index_of_returns_last_occurrence() {
        let knots = vector(&[0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 2.0]);
        let pos = knots.index_of(0.0).expect("present");
        assert_eq!((pos.index, pos.multiplicity), (2, 3));
        let pos = knots.index_of(1.0).expect("present");
        assert_eq!((pos.index, pos.multiplicity), (3, 1));
        let pos = knots.index_of(2.0).expect("present");
        assert_eq!((pos.index, pos.multiplicity), (6, 3));
    }

    #[test]
    fn index_of_absent_value_reports_previous_knot() {
        let knots = vector(&[0.0, 0.0, 1.0, 3.0]);
        let pos = knots.index_of(2.0).expect("inside range");
        assert_eq!((pos.index, pos.multiplicity), (2, 0));
        assert!(knots.index_of(-1.0).is_none());
    }

    #[test]
    fn round_trip_holds_for_inserted_values() {
        let mut knots = KnotVector::new();
        for value in [0.0, 3.0, 1.5, 3.0, 0.0, 7.25, 1.5, 1.5] {
            assert!(knots.insert(value, 3));
        }
        for value in [0.0, 1.5, 3.0, 7.25] {
            let pos = knots.index_of(value).expect("present");
            assert_eq!(knots.at(pos.index), Some(value));
        }
    }

    #[test]
    fn insert_caps_multiplicity_at_degree_plus_one() {
        let mut knots = vector(&[0.0, 1.0]);
        let degree = 2;
        for _ in 0..degree {
            assert!(knots.insert(1.0, degree));
        }
        let size_before = knots.size();
        assert!(!knots.insert(1.0, degree));
        assert_eq!(knots.size(), size_before);
    }

    #[test]
    fn insertion_rejected_on_maximally_multiple_knot() {
        // Worked example: 7 already appears three times; for degree 2 that is
        // the maximum, so another insertion must be refused without mutation.
        let mut knots = vector(&[0.0, 0.0, 0.0, 2.0, 4.0, 4.0, 5.0, 7.0, 7.0, 7.0, 9.0, 10.0, 12.0, 12.0]);
        assert_eq!(knots.size(), 14);
        assert!(!knots.insert(7.0, 2));
        assert_eq!(knots.size(), 14);
        assert_eq!(knots.index_of(7.0).expect("present").multiplicity, 3);
    }

    #[test]
    fn remove_decrements_and_drops_pairs() {
        let mut knots = vector(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
        assert!(knots.remove(1.0, 2));
        assert_eq!(knots.size(), 7);
        assert!(knots.index_of(1.0).is_some_and(|p| p.multiplicity == 0));
        assert!(knots.remove(2.0, 2));
        assert_eq!(knots.size(), 6);
        assert!(!knots.remove(5.0, 2));
    }

    #[test]
    fn remove_preserves_minimum_viable_support() {
        // A minimal cubic Bezier-style vector: any removal degenerates it.
        let mut knots = vector(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert!(!knots.remove(0.0, 3));
        assert!(!knots.remove(1.0, 3));
        assert_eq!(knots.size(), 6);
    }

    #[test]
    fn support_reports_reduced_convention_interval() {
        let knots = vector(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(knots.support_indices(3).expect("valid"), (2, 3));
        assert_eq!(knots.support(3).expect("valid"), (0.0, 1.0));

        let uniform = vector(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(uniform.support(2).expect("valid"), (1.0, 4.0));
    }

    #[test]
    fn support_rejects_bad_degrees() {
        let knots = vector(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert!(matches!(knots.support(0), Err(KnotError::InvalidDegree { .. })));
        assert!(matches!(knots.support(6), Err(KnotError::InvalidDegree { .. })));

        let short = vector(&[0.0, 0.0, 0.0, 1.0, 1.0]);
        assert!(matches!(short.support(3), Err(KnotError::DegenerateSupport { .. })));
    }

    #[test]
    fn support_rejects_value_collapsed_interval() {
        // The index bounds (2, 3) are distinct but both land on 0: a boundary
        // knot at multiplicity degree + 1 pins the whole curve to one point.
        let knots = vector(&[0.0, 0.0, 0.0, 0.0, 1.0, 2.0]);
        assert!(matches!(knots.support(3), Err(KnotError::DegenerateSupport { degree: 3, span: 1 })));
        assert!(knots.support_indices(3).is_err());

        let trailing = vector(&[0.0, 1.0, 2.0, 2.0, 2.0, 2.0]);
        assert!(matches!(trailing.support(3), Err(KnotError::DegenerateSupport { .. })));
    }

    #[test]
    fn required_control_point_count_matches_size() {
        let knots = vector(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(knots.required_control_point_count(3), 4);
        let long = vector(&[0.0, 0.0, 0.0, 2.0, 4.0, 4.0, 5.0, 7.0, 7.0, 7.0, 9.0, 10.0, 12.0, 12.0]);
        assert_eq!(long.required_control_point_count(3), 12);
    }

    #[test]
    fn clamped_uniform_matches_reduced_convention() {
        let knots = KnotVector::clamped_uniform(4, 3).expect("valid");
        assert_eq!(knots.values(), vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);

        let knots = KnotVector::clamped_uniform(5, 3).expect("valid");
        assert_eq!(knots.values(), vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0]);
        assert_eq!(knots.required_control_point_count(3), 5);

        assert!(KnotVector::clamped_uniform(3, 3).is_err());
    }
}
