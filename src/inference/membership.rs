//! Piecewise-linear membership functions.

/// Shape of a fuzzy term over its universe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Membership {
    /// Triangle with feet at `a`, `c` and peak at `b`. `a == b` or `b == c`
    /// gives a shoulder.
    Tri(f64, f64, f64),
    /// Trapezoid rising over `a..b`, flat over `b..=c`, falling over `c..d`.
    Trap(f64, f64, f64, f64),
}

impl Membership {
    /// Degree of membership of `x`, in `[0, 1]`.
    pub fn grade(&self, x: f64) -> f64 {
        match *self {
            Membership::Tri(a, b, c) => {
                if x < a || x > c {
                    0.0
                } else if x < b {
                    (x - a) / (b - a)
                } else if x > b {
                    (c - x) / (c - b)
                } else {
                    1.0
                }
            }
            Membership::Trap(a, b, c, d) => {
                if x < a || x > d {
                    0.0
                } else if x < b {
                    (x - a) / (b - a)
                } else if x <= c {
                    1.0
                } else {
                    (d - x) / (d - c)
                }
            }
        }
    }

    /// Lowest and highest point of the support.
    pub fn support(&self) -> (f64, f64) {
        match *self {
            Membership::Tri(a, _, c) => (a, c),
            Membership::Trap(a, _, _, d) => (a, d),
        }
    }
}
