use circleview_core::{LayoutSettings, Vector, GEOMETRY_EPSILON};

/// A simulated circle. `fixed` bodies act as immovable obstacles: forces
/// never accelerate them and integration never moves them.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub position: Vector,
    pub velocity: Vector,
    pub r: f64,
    pub fixed: bool,
}

impl Body {
    pub fn new(position: Vector, r: f64) -> Self {
        Self {
            position,
            velocity: Vector::ZERO,
            r,
            fixed: false,
        }
    }
}

pub trait Force: Send {
    fn apply(&self, bodies: &mut [Body], alpha: f64);
}

/// Pairwise separation between the members of one sibling group. Overlapping
/// circles (inflated by the configured padding) are pushed apart along their
/// center line, the smaller one further than the larger.
#[derive(Debug)]
pub struct CollisionForce {
    members: Vec<usize>,
    padding: f64,
    strength: f64,
    iterations: usize,
}

impl CollisionForce {
    pub fn new(members: Vec<usize>, padding: f64, strength: f64, iterations: usize) -> Self {
        Self {
            members,
            padding,
            strength,
            iterations: iterations.max(1),
        }
    }
}

impl Force for CollisionForce {
    fn apply(&self, bodies: &mut [Body], _alpha: f64) {
        for _ in 0..self.iterations {
            for i in 0..self.members.len() {
                for j in (i + 1)..self.members.len() {
                    let (a, b) = (self.members[i], self.members[j]);
                    let ra = bodies[a].r + self.padding;
                    let rb = bodies[b].r + self.padding;
                    let target = ra + rb;

                    let mut delta = (bodies[b].position + bodies[b].velocity)
                        - (bodies[a].position + bodies[a].velocity);
                    let mut dist = delta.length();
                    if dist >= target {
                        continue;
                    }
                    if dist < GEOMETRY_EPSILON {
                        // Coincident centers have no separation direction;
                        // nudge deterministically instead of randomly so a
                        // pass stays reproducible.
                        delta =
                            Vector::new(GEOMETRY_EPSILON * (b as f64 - a as f64), GEOMETRY_EPSILON);
                        dist = delta.length();
                    }

                    let correction = delta * ((target - dist) / dist * self.strength);
                    let weight_a = (rb * rb) / (ra * ra + rb * rb);
                    match (bodies[a].fixed, bodies[b].fixed) {
                        (false, false) => {
                            bodies[a].velocity = bodies[a].velocity - correction * weight_a;
                            bodies[b].velocity =
                                bodies[b].velocity + correction * (1.0 - weight_a);
                        }
                        (false, true) => {
                            bodies[a].velocity = bodies[a].velocity - correction;
                        }
                        (true, false) => {
                            bodies[b].velocity = bodies[b].velocity + correction;
                        }
                        (true, true) => {}
                    }
                }
            }
        }
    }
}

/// Force simulation with a fixed, analytically derived tick budget.
///
/// The number of steps follows from the decay rate
/// (`ceil(ln(alpha_min) / ln(1 - alpha_decay))`) rather than from wall-clock
/// time, so a run is deterministic given the same bodies and forces.
pub struct Simulation {
    bodies: Vec<Body>,
    forces: Vec<Box<dyn Force>>,
    alpha: f64,
    alpha_min: f64,
    alpha_decay: f64,
    velocity_decay: f64,
    ticks_done: usize,
    ticks_total: usize,
}

impl Simulation {
    pub fn new(settings: &LayoutSettings) -> Self {
        Self {
            bodies: Vec::new(),
            forces: Vec::new(),
            alpha: 1.0,
            alpha_min: settings.alpha_min,
            alpha_decay: settings.alpha_decay,
            velocity_decay: settings.velocity_decay,
            ticks_done: 0,
            ticks_total: settings.simulation_ticks(),
        }
    }

    pub fn add_body(&mut self, body: Body) -> usize {
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    pub fn add_force(&mut self, force: impl Force + 'static) {
        self.forces.push(Box::new(force));
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body_mut(&mut self, index: usize) -> &mut Body {
        &mut self.bodies[index]
    }

    pub fn step(&mut self) {
        self.alpha *= 1.0 - self.alpha_decay;
        for force in &self.forces {
            force.apply(&mut self.bodies, self.alpha);
        }
        for body in &mut self.bodies {
            if body.fixed {
                body.velocity = Vector::ZERO;
                continue;
            }
            body.velocity = body.velocity * (1.0 - self.velocity_decay);
            body.position = body.position + body.velocity;
        }
        self.ticks_done += 1;
    }

    pub fn is_done(&self) -> bool {
        self.ticks_done >= self.ticks_total || self.alpha < self.alpha_min
    }
}

/// Deterministic seed position for the `index`-th body of a group whose
/// position was never set: a phyllotaxis spiral around the group center,
/// dense enough that the collision force can take over from there.
pub fn phyllotaxis_position(index: usize, spacing: f64) -> Vector {
    let radius = spacing * (0.5 + index as f64).sqrt();
    let angle = index as f64 * std::f64::consts::PI * (3.0 - 5.0f64.sqrt());
    Vector::new(radius * angle.cos(), radius * angle.sin())
}
