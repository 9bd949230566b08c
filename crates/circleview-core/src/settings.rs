use serde::{Deserialize, Serialize};

/// Tunables of the layout engine.
///
/// Every field has a serde default so partial configuration files keep
/// working when new knobs are added.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Minimum gap between sibling circles and between a circle and its
    /// parent's rim.
    pub padding: f64,
    /// Radius floor for inner nodes, so a folded or filtered-empty container
    /// still looks like a container rather than a point.
    pub min_node_radius: f64,
    /// Extra radius around a label so text never touches the rim.
    pub text_padding: f64,
    pub font_size: f64,

    /// Simulation stops once its energy drops below this value.
    #[serde(default = "default_alpha_min")]
    pub alpha_min: f64,
    /// Per-tick energy decay. Together with `alpha_min` this determines the
    /// fixed iteration count of a position pass.
    #[serde(default = "default_alpha_decay")]
    pub alpha_decay: f64,
    /// Fraction of velocity lost per tick.
    #[serde(default = "default_velocity_decay")]
    pub velocity_decay: f64,
    /// Scale of the pairwise separation applied to overlapping siblings.
    #[serde(default = "default_collision_strength")]
    pub collision_strength: f64,
    /// Separation sweeps per tick.
    #[serde(default = "default_collision_iterations")]
    pub collision_iterations: usize,

    /// Minimum wall-clock interval between intermediate animation kicks
    /// during a position pass.
    #[serde(default = "default_intermediate_move_interval_ms")]
    pub intermediate_move_interval_ms: u64,
}

impl LayoutSettings {
    /// Number of simulation ticks implied by `alpha_min` and `alpha_decay`.
    ///
    /// Derived analytically from the decay rate rather than from wall-clock
    /// time, so a pass is deterministic given the same inputs. The small
    /// margin keeps float noise from tipping an integer ratio over the next
    /// ceiling.
    pub fn simulation_ticks(&self) -> usize {
        (self.alpha_min.ln() / (1.0 - self.alpha_decay).ln() - 1e-6).ceil() as usize
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            padding: 10.0,
            min_node_radius: 15.0,
            text_padding: 5.0,
            font_size: 12.0,
            alpha_min: default_alpha_min(),
            alpha_decay: default_alpha_decay(),
            velocity_decay: default_velocity_decay(),
            collision_strength: default_collision_strength(),
            collision_iterations: default_collision_iterations(),
            intermediate_move_interval_ms: default_intermediate_move_interval_ms(),
        }
    }
}

fn default_alpha_min() -> f64 {
    0.001
}

fn default_alpha_decay() -> f64 {
    // Reaches alpha_min after ~300 ticks.
    1.0 - 0.001f64.powf(1.0 / 300.0)
}

fn default_velocity_decay() -> f64 {
    0.4
}

fn default_collision_strength() -> f64 {
    1.0
}

fn default_collision_iterations() -> usize {
    2
}

fn default_intermediate_move_interval_ms() -> u64 {
    100
}
