use crate::num_vec::Vector;

/// An axis-aligned bounding box, generic over the mesh dimensionality.
///
/// Used by the partition subsystem to decide which remote ranks a receiving
/// rank needs data from (§4.3): a receiver's local box, inflated by a safety
/// factor, is intersected against each sender's box.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox<const DIM: usize> {
    min: Vector<f64, DIM>,
    max: Vector<f64, DIM>,
    empty: bool,
}

impl<const DIM: usize> BoundingBox<DIM> {
    /// A box containing nothing; the first call to [`Self::expand_by_point`]
    /// initializes both bounds to that point.
    pub fn empty() -> Self {
        Self {
            min: Vector::zero(),
            max: Vector::zero(),
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn min(&self) -> &Vector<f64, DIM> {
        &self.min
    }

    pub fn max(&self) -> &Vector<f64, DIM> {
        &self.max
    }

    pub fn expand_by_point(&mut self, point: &Vector<f64, DIM>) {
        if self.empty {
            self.min = *point;
            self.max = *point;
            self.empty = false;
            return;
        }
        for i in 0..DIM {
            if point[i] < self.min[i] {
                self.min[i] = point[i];
            }
            if point[i] > self.max[i] {
                self.max[i] = point[i];
            }
        }
    }

    /// Returns a copy of this box with each face pushed out by `safety_factor`
    /// times the box's own extent along that axis (a zero-extent axis is
    /// inflated by `safety_factor` absolute units instead, so a degenerate
    /// box still gets some margin).
    pub fn inflated(&self, safety_factor: f64) -> Self {
        if self.empty {
            return *self;
        }
        let mut min = self.min;
        let mut max = self.max;
        for i in 0..DIM {
            let extent = self.max[i] - self.min[i];
            let margin = if extent > 0.0 {
                extent * safety_factor
            } else {
                safety_factor
            };
            min[i] -= margin;
            max[i] += margin;
        }
        Self { min, max, empty: false }
    }

    /// Whether `point` lies within this box (inclusive bounds).
    pub fn contains(&self, point: &Vector<f64, DIM>) -> bool {
        if self.empty {
            return false;
        }
        (0..DIM).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Whether this box overlaps `other`, after inflating `other` by
    /// `safety_factor` (§4.3's "inflated by a safety factor" comparison).
    pub fn intersects_inflated(&self, other: &Self, safety_factor: f64) -> bool {
        if self.empty || other.empty {
            return false;
        }
        let other = other.inflated(safety_factor);
        (0..DIM).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }
}
