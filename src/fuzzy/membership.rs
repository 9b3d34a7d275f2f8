/// Piecewise-linear membership shapes and centroid defuzzification.
///
/// Shapes are evaluated directly rather than pre-sampled; only the
/// defuzzification step walks a discretized universe.

/// A fuzzy membership shape over one variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Triangle (a, b, c): rises a→b, peaks at b, falls b→c.
    Triangle(f64, f64, f64),
    /// Trapezoid (a, b, c, d): rises a→b, flat b→c, falls c→d.
    Trapezoid(f64, f64, f64, f64),
}

impl Shape {
    /// Degree of membership of `x` in this shape, in [0, 1].
    pub fn membership(&self, x: f64) -> f64 {
        match *self {
            Shape::Triangle(a, b, c) => trapezoid_membership(x, a, b, b, c),
            Shape::Trapezoid(a, b, c, d) => trapezoid_membership(x, a, b, c, d),
        }
    }
}

fn trapezoid_membership(x: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    if x < a || x > d {
        0.0
    } else if x < b {
        // Rising edge. A vertical edge (a == b) is handled by the x < b check:
        // x == a == b falls through to the flat section.
        (x - a) / (b - a)
    } else if x <= c {
        1.0
    } else if d > c {
        (d - x) / (d - c)
    } else {
        1.0
    }
}

/// A discretized universe of discourse for one output variable.
#[derive(Debug, Clone, Copy)]
pub struct Universe {
    pub lo: f64,
    pub hi: f64,
    pub step: f64,
}

impl Universe {
    pub const fn new(lo: f64, hi: f64, step: f64) -> Self {
        Universe { lo, hi, step }
    }

    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.lo, self.hi)
    }

    fn midpoint(&self) -> f64 {
        (self.lo + self.hi) / 2.0
    }

    /// Center-of-gravity defuzzification of an aggregated membership curve.
    ///
    /// `aggregated` is evaluated at each grid point. A zero-mass curve cannot
    /// occur with an overlapping rule base; the midpoint fallback only guards
    /// against division by zero.
    pub fn centroid<F>(&self, aggregated: F) -> f64
    where
        F: Fn(f64) -> f64,
    {
        let mut numerator = 0.0;
        let mut mass = 0.0;
        let mut x = self.lo;
        while x <= self.hi + self.step / 2.0 {
            let mu = aggregated(x);
            numerator += x * mu;
            mass += mu;
            x += self.step;
        }
        if mass <= f64::EPSILON {
            self.midpoint()
        } else {
            numerator / mass
        }
    }
}
