use align_core::PointCorrespondence;
use nalgebra::{DMatrix, Matrix3, SVD};

use crate::error::{GeometryError, GeometryResult};

/// Determinants below this magnitude are treated as singular
pub const SINGULAR_EPS: f64 = 1e-12;

/// Projective transform `p' ~ H p` between two image planes.
///
/// Stored with `h22 == 1` whenever the original matrix allows it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Wrap a matrix, rescaling it so the bottom-right element is 1
    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        let h22 = matrix[(2, 2)];
        let matrix = if h22.abs() > f64::EPSILON { matrix / h22 } else { matrix };
        Self { matrix }
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self::from_matrix(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    /// Pure translation by `(tx, ty)`
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::from_rows([[1.0, 0.0, tx], [0.0, 1.0, ty], [0.0, 0.0, 1.0]])
    }

    /// Rotation by `angle` radians and uniform `scale` about the origin,
    /// followed by a translation
    pub fn similarity(scale: f64, angle: f64, tx: f64, ty: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([
            [scale * c, -scale * s, tx],
            [scale * s, scale * c, ty],
            [0.0, 0.0, 1.0],
        ])
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    pub fn determinant(&self) -> f64 {
        self.matrix.determinant()
    }

    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }

    /// Map `(x, y)`; `None` when the point lands on the line at infinity
    pub fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = &self.matrix;
        let w = m[(2, 0)] * x + m[(2, 1)] * y + m[(2, 2)];
        if w.abs() < SINGULAR_EPS {
            return None;
        }
        let px = (m[(0, 0)] * x + m[(0, 1)] * y + m[(0, 2)]) / w;
        let py = (m[(1, 0)] * x + m[(1, 1)] * y + m[(1, 2)]) / w;
        Some((px, py))
    }

    /// Distance between `H * src` and `dst`; infinite if `src` maps to infinity
    pub fn reprojection_error(&self, pair: &PointCorrespondence) -> f64 {
        match self.project(pair.src.0, pair.src.1) {
            Some((x, y)) => (x - pair.dst.0).hypot(y - pair.dst.1),
            None => f64::INFINITY,
        }
    }

    pub fn try_inverse(&self) -> GeometryResult<Homography> {
        let determinant = self.determinant();
        if !(determinant.abs() >= SINGULAR_EPS) {
            return Err(GeometryError::NonInvertibleTransform { determinant });
        }
        self.matrix
            .try_inverse()
            .map(Self::from_matrix)
            .ok_or(GeometryError::NonInvertibleTransform { determinant })
    }

    /// `self` applied after `other`
    pub fn compose(&self, other: &Homography) -> Homography {
        Self::from_matrix(self.matrix * other.matrix)
    }
}

/// Similarity that moves the centroid of `points` to the origin and
/// scales their mean distance from it to sqrt(2).
///
/// Returns `None` when every point coincides.
fn normalization(points: impl Iterator<Item = (f64, f64)> + Clone) -> Option<Matrix3<f64>> {
    let n = points.clone().count() as f64;
    let (sx, sy) = points.clone().fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
    let (cx, cy) = (sx / n, sy / n);
    let mean_dist = points.map(|(x, y)| (x - cx).hypot(y - cy)).sum::<f64>() / n;
    if !(mean_dist > 1e-10) {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

/// Direct linear transform over `n >= 4` correspondences.
///
/// With exactly four pairs the result interpolates them; with more it is
/// the algebraic least-squares fit. Both point sets are Hartley-normalized
/// first. Returns `None` for fewer than four pairs or when the system
/// has no usable non-singular solution.
pub fn solve_homography(pairs: &[PointCorrespondence]) -> Option<Homography> {
    if pairs.len() < 4 {
        return None;
    }

    let t_src = normalization(pairs.iter().map(|p| p.src))?;
    let t_dst = normalization(pairs.iter().map(|p| p.dst))?;

    let n = pairs.len();
    // A thin SVD of fewer than 9 rows would drop the null vector: pad with zeros
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, pair) in pairs.iter().enumerate() {
        let (x, y) = apply(&t_src, pair.src);
        let (u, v) = apply(&t_dst, pair.dst);
        let eq_u = [-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u];
        let eq_v = [0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v];
        for c in 0..9 {
            a[(2 * i, c)] = eq_u[c];
            a[(2 * i + 1, c)] = eq_v[c];
        }
    }

    let svd = SVD::new(a, false, true);
    let v_t = svd.v_t?;
    let (smallest, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = v_t.row(smallest);
    let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    // Undo the normalization: H = T_dst^-1 * H_norm * T_src
    let t_dst_inv = t_dst.try_inverse()?;
    let m = t_dst_inv * h_norm * t_src;
    if m[(2, 2)].abs() < 1e-10 {
        return None;
    }

    let homography = Homography::from_matrix(m);
    if !homography.is_finite() || !(homography.determinant().abs() >= SINGULAR_EPS) {
        return None;
    }
    Some(homography)
}

#[inline]
fn apply(t: &Matrix3<f64>, (x, y): (f64, f64)) -> (f64, f64) {
    (t[(0, 0)] * x + t[(0, 2)], t[(1, 1)] * y + t[(1, 2)])
}
