//! # Principal axis frame
//!
//! A frame aligned to the dominant orientation of a set of points, found with a principal
//! component analysis. The first axis points along the direction of greatest spread.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Matrix2, SymmetricEigen, Vector2};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct PrincipalAxisFrame {
    /// Mean of the points, the origin of the frame
    mean: Vector2<f64>,

    /// Unit axes of the frame, in order of decreasing variance
    axes: [Vector2<f64>; 2],
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl PrincipalAxisFrame {
    /// Compute the frame of the given points.
    ///
    /// Each axis' sign is chosen so that its largest magnitude component is positive, making the
    /// frame deterministic. Returns `None` if there are no points.
    pub fn from_points(points: &[Vector2<f64>]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let n = points.len() as f64;
        let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p) / n;

        let cov = points.iter().fold(Matrix2::zeros(), |acc, p| {
            let d = p - mean;
            acc + d * d.transpose()
        }) / n;

        let eigen = SymmetricEigen::new(cov);

        let (major, minor) = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] {
            (0, 1)
        } else {
            (1, 0)
        };

        let axes = [
            fix_sign(eigen.eigenvectors.column(major).normalize()),
            fix_sign(eigen.eigenvectors.column(minor).normalize()),
        ];

        Some(Self { mean, axes })
    }

    /// The origin of the frame.
    pub fn mean(&self) -> &Vector2<f64> {
        &self.mean
    }

    /// The unit vector of the given axis (0 is the major axis).
    pub fn axis(&self, index: usize) -> &Vector2<f64> {
        &self.axes[index.min(1)]
    }

    /// Express a point in the frame.
    pub fn forward(&self, point: &Vector2<f64>) -> Vector2<f64> {
        let d = point - self.mean;
        Vector2::new(self.axes[0].dot(&d), self.axes[1].dot(&d))
    }

    /// Convert a point in the frame back to the original coordinates.
    pub fn inverse(&self, point: &Vector2<f64>) -> Vector2<f64> {
        self.mean + self.axes[0] * point.x + self.axes[1] * point.y
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Flip the vector so that its largest magnitude component is positive.
fn fix_sign(v: Vector2<f64>) -> Vector2<f64> {
    let dominant = if v.x.abs() >= v.y.abs() { v.x } else { v.y };

    if dominant < 0.0 {
        -v
    } else {
        v
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_major_axis() {
        // Points spread along the y = -x diagonal
        let points: Vec<Vector2<f64>> = (0..10)
            .map(|i| {
                let t = i as f64;
                Vector2::new(t, -t + 0.1 * (i % 2) as f64)
            })
            .collect();

        let frame = PrincipalAxisFrame::from_points(&points).unwrap();
        let a0 = frame.axis(0);
        let a1 = frame.axis(1);

        assert!((a0.norm() - 1.0).abs() < 1e-12);
        assert!(a0.dot(a1).abs() < 1e-12);
        assert!((a0.x.abs() - a0.y.abs()).abs() < 0.05);

        // Sign rule
        let dominant = if a0.x.abs() >= a0.y.abs() { a0.x } else { a0.y };
        assert!(dominant > 0.0);
    }

    #[test]
    fn test_round_trip() {
        let points = vec![
            Vector2::new(-74.4612, 40.5218),
            Vector2::new(-74.4610, 40.5219),
            Vector2::new(-74.4608, 40.5223),
            Vector2::new(-74.4613, 40.5224),
            Vector2::new(-74.4615, 40.5220),
        ];
        let frame = PrincipalAxisFrame::from_points(&points).unwrap();

        for p in &points {
            let back = frame.inverse(&frame.forward(p));
            assert!((back - p).norm() < 1e-9);
        }

        // The mean is the origin of the frame
        assert!(frame.forward(frame.mean()).norm() < 1e-12);
        assert!(PrincipalAxisFrame::from_points(&[]).is_none());
    }
}
