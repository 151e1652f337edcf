/// 2-D affine transform `(x, y) -> (a x + b y + c, d x + e y + f)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2 {
    pub m: [f32; 6],
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2 {
    pub const IDENTITY: Affine2 = Affine2 {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    };

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self {
            m: [1.0, 0.0, tx, 0.0, 1.0, ty],
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            m: [sx, 0.0, 0.0, 0.0, sy, 0.0],
        }
    }

    /// Counter-clockwise rotation in a y-up frame (clockwise on a y-down
    /// window).
    pub fn rotate_degrees(degrees: f32) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        // Snap quarter turns so axis-aligned quads stay exact.
        let snap = |v: f32| if v.abs() < 1e-6 { 0.0 } else { v };
        let (s, c) = (snap(s), snap(c));
        Self {
            m: [c, -s, 0.0, s, c, 0.0],
        }
    }

    /// `self` followed by `next`.
    pub fn then(self, next: Affine2) -> Self {
        let [a, b, c, d, e, f] = self.m;
        let [na, nb, nc, nd, ne, nf] = next.m;
        Self {
            m: [
                na * a + nb * d,
                na * b + nb * e,
                na * c + nb * f + nc,
                nd * a + ne * d,
                nd * b + ne * e,
                nd * c + ne * f + nf,
            ],
        }
    }

    pub fn apply(&self, point: (f32, f32)) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.m;
        (a * point.0 + b * point.1 + c, d * point.0 + e * point.1 + f)
    }

    pub fn inverse(&self) -> Option<Affine2> {
        let [a, b, c, d, e, f] = self.m;
        let det = a * e - b * d;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Self {
            m: [
                e * inv,
                -b * inv,
                (b * f - c * e) * inv,
                -d * inv,
                a * inv,
                (c * d - a * f) * inv,
            ],
        })
    }
}
