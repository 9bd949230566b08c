use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};
use thiserror::Error;

/// Numeric slack for tangency and containment tests. Matches the tolerance
/// the iterative position pass is allowed to leave behind.
pub const GEOMETRY_EPSILON: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The closed-form displacement solve has no real root: the circle and
    /// its enclosing circle were already inconsistent before the call.
    #[error(
        "no displacement of circle at ({x}, {y}) with r {r} stays inside an enclosing circle of radius {enclosing}"
    )]
    NoValidDisplacement {
        x: f64,
        y: f64,
        r: f64,
        enclosing: f64,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(&self, other: Vector) -> f64 {
        (*self - other).length()
    }

    /// Scale this vector to the requested length. The zero vector has no
    /// direction and stays at the origin.
    pub fn norm(&self, length: f64) -> Vector {
        let current = self.length();
        if current < GEOMETRY_EPSILON {
            return Vector::ZERO;
        }
        *self * (length / current)
    }

    /// Whether this point lies within the axis-aligned span of `a` and `b`.
    pub fn between(&self, a: Vector, b: Vector) -> bool {
        let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
        let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));
        self.x >= min_x && self.x <= max_x && self.y >= min_y && self.y <= max_y
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, rhs: f64) -> Vector {
        Vector::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vector,
    pub r: f64,
}

impl Circle {
    pub fn new(center: Vector, r: f64) -> Self {
        Self { center, r }
    }

    /// Containment test for a circle whose center is given relative to this
    /// circle's center.
    pub fn contains_relative(&self, other: &Circle, padding: f64) -> bool {
        other.center.length() + other.r + padding <= self.r + GEOMETRY_EPSILON
    }

    /// Scale this circle's position vector so that, taken relative to an
    /// enclosing circle of radius `enclosing_r`, it sits exactly
    /// tangent-inside.
    pub fn translated_into_enclosing_circle(&self, enclosing_r: f64, padding: f64) -> Circle {
        let reach = (enclosing_r - self.r - padding).max(0.0);
        Circle::new(self.center.norm(reach), self.r)
    }

    /// Displace this circle along `direction` as far as containment in a
    /// circle of radius `enclosing_r` allows, up to the full requested
    /// displacement.
    ///
    /// The tangency condition `|center + t * direction| = enclosing_r - r`
    /// is a quadratic in the displacement scale `t`; a negative discriminant
    /// means the geometry was already inconsistent and is reported as an
    /// error rather than clamped.
    pub fn translated_as_far_as_possible(
        &self,
        enclosing_r: f64,
        direction: Vector,
    ) -> Result<Circle, GeometryError> {
        let moved = Circle::new(self.center + direction, self.r);
        if moved.center.length() + self.r <= enclosing_r + GEOMETRY_EPSILON {
            return Ok(moved);
        }

        let reach = enclosing_r - self.r;
        let a = direction.x * direction.x + direction.y * direction.y;
        let b = 2.0 * (self.center.x * direction.x + self.center.y * direction.y);
        let c = self.center.x * self.center.x + self.center.y * self.center.y - reach * reach;

        let discriminant = b * b - 4.0 * a * c;
        if a < GEOMETRY_EPSILON || discriminant < 0.0 {
            return Err(GeometryError::NoValidDisplacement {
                x: self.center.x,
                y: self.center.y,
                r: self.r,
                enclosing: enclosing_r,
            });
        }

        let scale = (-b + discriminant.sqrt()) / (2.0 * a);
        if scale < 0.0 {
            return Err(GeometryError::NoValidDisplacement {
                x: self.center.x,
                y: self.center.y,
                r: self.r,
                enclosing: enclosing_r,
            });
        }

        Ok(Circle::new(self.center + direction * scale.min(1.0), self.r))
    }
}

/// A circle the force simulation may pin in place. A fixed circle acts as an
/// immovable obstacle for the running simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FixableCircle {
    pub center: Vector,
    pub r: f64,
    pub fixed: bool,
}

impl FixableCircle {
    pub fn new(center: Vector, r: f64) -> Self {
        Self {
            center,
            r,
            fixed: false,
        }
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.center, self.r)
    }

    pub fn fix(&mut self) {
        self.fixed = true;
    }

    pub fn unfix(&mut self) {
        self.fixed = false;
    }
}

/// An axis-aligned rectangle given by center and half extents. Only the root
/// of the containment tree is rectangular.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub center: Vector,
    pub half_width: f64,
    pub half_height: f64,
}

impl Rect {
    pub fn new(center: Vector, half_width: f64, half_height: f64) -> Self {
        Self {
            center,
            half_width,
            half_height,
        }
    }

    pub fn width(&self) -> f64 {
        self.half_width * 2.0
    }

    pub fn height(&self) -> f64 {
        self.half_height * 2.0
    }

    /// Containment test for a circle whose center is given relative to this
    /// rectangle's center.
    pub fn contains_relative_circle(&self, circle: &Circle, padding: f64) -> bool {
        circle.center.x.abs() + circle.r + padding <= self.half_width + GEOMETRY_EPSILON
            && circle.center.y.abs() + circle.r + padding <= self.half_height + GEOMETRY_EPSILON
    }

    /// Move a relative circle to the closest position fully inside, one axis
    /// at a time.
    pub fn clamp_relative_circle(&self, circle: &Circle, padding: f64) -> Circle {
        let reach_x = (self.half_width - circle.r - padding).max(0.0);
        let reach_y = (self.half_height - circle.r - padding).max(0.0);
        Circle::new(
            Vector::new(
                circle.center.x.clamp(-reach_x, reach_x),
                circle.center.y.clamp(-reach_y, reach_y),
            ),
            circle.r,
        )
    }
}

/// The geometry a node's relative position is composed against: the parent's
/// absolute shape, or `Zero` for the root, which has no parent.
///
/// `Zero` is a circle-like identity element at the origin with infinite
/// containment, so composing against it is a no-op and every containment
/// test passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReferenceShape {
    Zero,
    Circle { center: Vector, r: f64 },
    Rect(Rect),
}

impl ReferenceShape {
    pub fn center(&self) -> Vector {
        match self {
            ReferenceShape::Zero => Vector::ZERO,
            ReferenceShape::Circle { center, .. } => *center,
            ReferenceShape::Rect(rect) => rect.center,
        }
    }

    pub fn contains_relative(&self, circle: &Circle, padding: f64) -> bool {
        match self {
            ReferenceShape::Zero => true,
            ReferenceShape::Circle { r, .. } => {
                Circle::new(Vector::ZERO, *r).contains_relative(circle, padding)
            }
            ReferenceShape::Rect(rect) => rect.contains_relative_circle(circle, padding),
        }
    }

    /// Pull a relative circle back inside this shape; identity when it
    /// already fits.
    pub fn clamp_relative(&self, circle: &Circle, padding: f64) -> Circle {
        if self.contains_relative(circle, padding) {
            return *circle;
        }
        match self {
            ReferenceShape::Zero => *circle,
            ReferenceShape::Circle { r, .. } => {
                circle.translated_into_enclosing_circle(*r, padding)
            }
            ReferenceShape::Rect(rect) => rect.clamp_relative_circle(circle, padding),
        }
    }
}
