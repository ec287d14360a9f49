use super::miller::Miller;
use nalgebra::{Matrix3, Vector3};

/// Relative tolerance used by the Niggli reduction when comparing
/// metric parameters of similar magnitude.
const REDUCTION_EPS_FACTOR: f64 = 1e-5;

/// Upper bound on reduction iterations; the Krivy-Gruber procedure
/// converges in a handful of steps for any physical cell.
const MAX_REDUCTION_ITERATIONS: usize = 100;

/// A crystallographic unit cell defined by its six parameters.
///
/// Lengths are in Angstroms, angles in degrees. The cell provides the
/// metric tensors needed for resolution (d-spacing) calculations and for
/// basis changes such as the Niggli reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl UnitCell {
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        }
    }

    /// The real-space metric tensor G, with G[i][j] = a_i . a_j.
    pub fn metric_tensor(&self) -> Matrix3<f64> {
        let (a, b, c) = (self.a, self.b, self.c);
        let ca = self.alpha.to_radians().cos();
        let cb = self.beta.to_radians().cos();
        let cg = self.gamma.to_radians().cos();
        Matrix3::new(
            a * a,
            a * b * cg,
            a * c * cb,
            a * b * cg,
            b * b,
            b * c * ca,
            a * c * cb,
            b * c * ca,
            c * c,
        )
    }

    /// The reciprocal metric tensor G* = G^-1.
    pub fn reciprocal_metric_tensor(&self) -> Matrix3<f64> {
        self.metric_tensor()
            .try_inverse()
            .unwrap_or_else(Matrix3::zeros)
    }

    pub fn volume(&self) -> f64 {
        self.metric_tensor().determinant().max(0.0).sqrt()
    }

    /// Resolution d(h,k,l) in Angstroms: 1/d^2 = h^T G* h.
    pub fn d_spacing(&self, hkl: Miller) -> f64 {
        let h = Vector3::new(hkl.h as f64, hkl.k as f64, hkl.l as f64);
        let inv_d_sq = (h.transpose() * self.reciprocal_metric_tensor() * h)[(0, 0)];
        if inv_d_sq <= 0.0 {
            f64::INFINITY
        } else {
            1.0 / inv_d_sq.sqrt()
        }
    }

    /// Re-expresses this cell in the basis given by `cob`: G' = M^T G M.
    pub fn change_basis(&self, cob: &ChangeOfBasis) -> Self {
        let m = cob.matrix_f64();
        Self::from_metric_tensor(&(m.transpose() * self.metric_tensor() * m))
    }

    fn from_metric_tensor(g: &Matrix3<f64>) -> Self {
        let a = g[(0, 0)].sqrt();
        let b = g[(1, 1)].sqrt();
        let c = g[(2, 2)].sqrt();
        let alpha = (g[(1, 2)] / (b * c)).clamp(-1.0, 1.0).acos().to_degrees();
        let beta = (g[(0, 2)] / (a * c)).clamp(-1.0, 1.0).acos().to_degrees();
        let gamma = (g[(0, 1)] / (a * b)).clamp(-1.0, 1.0).acos().to_degrees();
        Self::new(a, b, c, alpha, beta, gamma)
    }

    /// Computes the Niggli-reduced setting of this cell via the
    /// Krivy-Gruber (1976) algorithm.
    ///
    /// Returns the reduced cell together with the change of basis that
    /// re-expresses data given in this cell in the reduced setting. The
    /// transformation is unimodular and therefore exactly reversible.
    pub fn niggli_reduce(&self) -> (UnitCell, ChangeOfBasis) {
        let g = self.metric_tensor();
        let mut a = g[(0, 0)];
        let mut b = g[(1, 1)];
        let mut c = g[(2, 2)];
        let mut xi = 2.0 * g[(1, 2)];
        let mut eta = 2.0 * g[(0, 2)];
        let mut zeta = 2.0 * g[(0, 1)];
        let eps = REDUCTION_EPS_FACTOR * (a + b + c) / 3.0;
        let mut m = Matrix3::<i32>::identity();

        let mut iterations = 0;
        while iterations < MAX_REDUCTION_ITERATIONS {
            iterations += 1;

            // A1: order a <= b.
            if a > b + eps || ((a - b).abs() <= eps && xi.abs() > eta.abs() + eps) {
                std::mem::swap(&mut a, &mut b);
                std::mem::swap(&mut xi, &mut eta);
                m *= Matrix3::new(0, -1, 0, -1, 0, 0, 0, 0, -1);
            }
            // A2: order b <= c.
            if b > c + eps || ((b - c).abs() <= eps && eta.abs() > zeta.abs() + eps) {
                std::mem::swap(&mut b, &mut c);
                std::mem::swap(&mut eta, &mut zeta);
                m *= Matrix3::new(-1, 0, 0, 0, 0, -1, 0, -1, 0);
                continue;
            }
            if xi * eta * zeta > 0.0 {
                // A3: make all angle parameters positive.
                let i = if eta < 0.0 { -1 } else { 1 };
                let j = if xi < 0.0 { -1 } else { 1 };
                let k = 1;
                xi *= (j * k) as f64;
                eta *= (i * k) as f64;
                zeta *= (i * j) as f64;
                m *= Matrix3::new(i, 0, 0, 0, j, 0, 0, 0, k);
            } else {
                // A4: make all angle parameters non-positive.
                let mut f = [1i32; 3];
                let mut free = None;
                if xi > 0.0 {
                    f[0] = -1;
                } else if !(xi < 0.0) {
                    free = Some(0);
                }
                if eta > 0.0 {
                    f[1] = -1;
                } else if !(eta < 0.0) {
                    free = Some(1);
                }
                if zeta > 0.0 {
                    f[2] = -1;
                } else if !(zeta < 0.0) {
                    free = Some(2);
                }
                if f[0] * f[1] * f[2] < 0 {
                    if let Some(idx) = free {
                        f[idx] = -1;
                    }
                }
                let (i, j, k) = (f[0], f[1], f[2]);
                xi *= (j * k) as f64;
                eta *= (i * k) as f64;
                zeta *= (i * j) as f64;
                m *= Matrix3::new(i, 0, 0, 0, j, 0, 0, 0, k);
            }

            // A5
            if xi.abs() > b + eps
                || ((xi - b).abs() <= eps && 2.0 * eta < zeta - eps)
                || ((xi + b).abs() <= eps && zeta < -eps)
            {
                let s = if xi > 0.0 { 1.0 } else { -1.0 };
                c += b - s * xi;
                xi -= 2.0 * s * b;
                eta -= s * zeta;
                m *= Matrix3::new(1, 0, 0, 0, 1, -(s as i32), 0, 0, 1);
                continue;
            }
            // A6
            if eta.abs() > a + eps
                || ((eta - a).abs() <= eps && 2.0 * xi < zeta - eps)
                || ((eta + a).abs() <= eps && zeta < -eps)
            {
                let s = if eta > 0.0 { 1.0 } else { -1.0 };
                c += a - s * eta;
                eta -= 2.0 * s * a;
                xi -= s * zeta;
                m *= Matrix3::new(1, 0, -(s as i32), 0, 1, 0, 0, 0, 1);
                continue;
            }
            // A7
            if zeta.abs() > a + eps
                || ((zeta - a).abs() <= eps && 2.0 * xi < eta - eps)
                || ((zeta + a).abs() <= eps && eta < -eps)
            {
                let s = if zeta > 0.0 { 1.0 } else { -1.0 };
                b += a - s * zeta;
                zeta -= 2.0 * s * a;
                xi -= s * eta;
                m *= Matrix3::new(1, -(s as i32), 0, 0, 1, 0, 0, 0, 1);
                continue;
            }
            // A8
            let total = xi + eta + zeta + a + b;
            if total < -eps || (total.abs() <= eps && 2.0 * (a + eta) + zeta > eps) {
                c += a + b + xi + eta + zeta;
                xi += 2.0 * b + zeta;
                eta += 2.0 * a + zeta;
                m *= Matrix3::new(1, 0, 1, 0, 1, 1, 0, 0, 1);
                continue;
            }
            break;
        }

        let cob = ChangeOfBasis::new(m);
        (self.change_basis(&cob), cob)
    }
}

/// A unimodular change of basis between two settings of the same lattice.
///
/// The matrix columns express the new basis vectors in the old basis;
/// Miller indices transform covariantly (h' = M^T h). Because the
/// determinant is +/-1, the inverse is exact in integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeOfBasis {
    m: Matrix3<i32>,
}

impl ChangeOfBasis {
    pub fn new(m: Matrix3<i32>) -> Self {
        Self { m }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn is_identity(&self) -> bool {
        self.m == Matrix3::identity()
    }

    pub fn determinant(&self) -> i32 {
        let m = &self.m;
        m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
            - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
            + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
    }

    fn matrix_f64(&self) -> Matrix3<f64> {
        self.m.map(|v| v as f64)
    }

    /// Transforms a Miller index into the new setting.
    pub fn transform_miller(&self, hkl: Miller) -> Miller {
        let h = Vector3::new(hkl.h, hkl.k, hkl.l);
        let t = self.m.transpose() * h;
        Miller::new(t[0], t[1], t[2])
    }

    /// Conjugates a symmetry rotation part into the new setting:
    /// R' = M^-1 R M. Exact in integer arithmetic since M is unimodular.
    pub fn transform_rotation(&self, r: &Matrix3<i32>) -> Matrix3<i32> {
        self.inverse().m * r * self.m
    }

    /// The inverse change of basis, computed exactly from the adjugate.
    pub fn inverse(&self) -> Self {
        let det = self.determinant();
        debug_assert!(det == 1 || det == -1);
        let m = &self.m;
        let cof = |r1: usize, c1: usize, r2: usize, c2: usize| {
            m[(r1, c1)] * m[(r2, c2)] - m[(r1, c2)] * m[(r2, c1)]
        };
        let adj = Matrix3::new(
            cof(1, 1, 2, 2),
            -cof(0, 1, 2, 2),
            cof(0, 1, 1, 2),
            -cof(1, 0, 2, 2),
            cof(0, 0, 2, 2),
            -cof(0, 0, 1, 2),
            cof(1, 0, 2, 1),
            -cof(0, 0, 2, 1),
            cof(0, 0, 1, 1),
        );
        Self::new(adj.map(|v| v * det))
    }
}
