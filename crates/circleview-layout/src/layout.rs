use crate::packing;
use crate::shape;
use crate::simulation::{phyllotaxis_position, Body, CollisionForce, Simulation};
use crate::tree::{NodeIndex, Tree};
use crate::view::{NodeView, TextMeasure};
use circleview_core::{LayoutSettings, GEOMETRY_EPSILON};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Bottom-up sizing pass: recursively determine every node's radius from its
/// current children.
///
/// Post-order: children's radii must be known before the parent's can be.
/// Radius changes flow through the view one node at a time, children first,
/// self last; when this returns, every acknowledgement has resolved and the
/// position pass may start.
pub async fn initial_layout(
    tree: &mut Tree,
    view: &dyn NodeView,
    measure: &dyn TextMeasure,
    settings: &LayoutSettings,
) {
    let root = tree.root();
    let mut order: Vec<(NodeIndex, f64)> = Vec::with_capacity(tree.node_count());
    compute_radius(tree, measure, settings, root, &mut order);
    for (idx, radius) in order {
        shape::change_radius(tree, view, measure, settings, idx, radius).await;
    }
}

fn compute_radius(
    tree: &Tree,
    measure: &dyn TextMeasure,
    settings: &LayoutSettings,
    idx: NodeIndex,
    order: &mut Vec<(NodeIndex, f64)>,
) -> f64 {
    let children = tree[idx].current_children().to_vec();
    let child_radii: Vec<f64> = children
        .iter()
        .map(|&child| compute_radius(tree, measure, settings, child, order))
        .collect();

    let half_label = measure.label_width(&tree[idx].name, tree[idx].kind) / 2.0;
    let label_radius = half_label + settings.text_padding;

    let radius = match child_radii.as_slice() {
        // Currently a leaf: sized by the label alone. Inner nodes that are
        // only temporarily empty keep looking like containers.
        [] => {
            if tree[idx].is_original_leaf() {
                label_radius
            } else {
                label_radius.max(settings.min_node_radius)
            }
        }
        // A single child packs degenerately; use the closed form that stacks
        // the label above the child instead.
        [child_radius] => {
            let reach = child_radius + settings.font_size;
            (half_label * half_label + reach * reach)
                .sqrt()
                .max(settings.min_node_radius)
        }
        // Pack the children's circles, inflated by the padding so the
        // packing keeps the required gaps without growing any child itself.
        // Positions are discarded here; the position pass recomputes them.
        radii => {
            let padded: Vec<f64> = radii.iter().map(|r| r + settings.padding).collect();
            let (_, enclosing_r) = packing::pack_siblings(&padded);
            enclosing_r.max(label_radius)
        }
    };

    order.push((idx, radius));
    radius
}

/// Top-down position pass: level-by-level collision simulation that spaces
/// siblings apart while everything already settled stays pinned.
///
/// Per level, the current children of all nodes of the previous level are
/// simulated together, each sibling group under its own separation force.
/// Containment is re-imposed on every tick; intermediate positions are
/// handed to the view at a throttled rate so it can animate ahead of
/// convergence. Resolves once every repositioned node's move committed.
pub async fn force_layout(
    tree: &mut Tree,
    view: &dyn NodeView,
    settings: &LayoutSettings,
    start: NodeIndex,
) {
    let below: HashSet<NodeIndex> = tree.current_descendants(start).into_iter().collect();
    let all: Vec<NodeIndex> = tree.node_indices().collect();
    for idx in all {
        if below.contains(&idx) {
            tree[idx].shape.absolute.unfix();
        } else {
            // Ancestors and untouched subtrees act as immovable obstacles.
            tree[idx].shape.absolute.fix();
        }
    }

    let mut current_nodes = vec![start];
    loop {
        let mut groups: Vec<(NodeIndex, Vec<NodeIndex>)> = Vec::new();
        let mut new_nodes: Vec<NodeIndex> = Vec::new();
        for &parent in &current_nodes {
            let children = tree[parent].current_children().to_vec();
            if !children.is_empty() {
                new_nodes.extend(children.iter().copied());
                groups.push((parent, children));
            }
        }
        if new_nodes.is_empty() {
            break;
        }

        simulate_level(tree, view, settings, &groups, &new_nodes).await;

        // Commit the level: re-derive final positions, pin, animate.
        for &idx in &new_nodes {
            shape::complete_move_to_intermediate_position(tree, view, idx).await;
        }

        current_nodes = new_nodes;
    }
}

async fn simulate_level(
    tree: &mut Tree,
    view: &dyn NodeView,
    settings: &LayoutSettings,
    groups: &[(NodeIndex, Vec<NodeIndex>)],
    new_nodes: &[NodeIndex],
) {
    let mut sim = Simulation::new(settings);
    let mut body_of: HashMap<NodeIndex, usize> = HashMap::with_capacity(new_nodes.len());

    for (parent, children) in groups {
        let parent_center = tree[*parent].shape.absolute_center();
        let spacing = children
            .iter()
            .map(|&child| tree[child].shape.radius())
            .fold(settings.min_node_radius, f64::max);

        for (slot, &child) in children.iter().enumerate() {
            // A never-positioned child sits exactly on its parent's center;
            // seed it on a spiral so the separation force has leverage.
            if children.len() > 1
                && tree[child].shape.relative_position.length() < GEOMETRY_EPSILON
            {
                let seed = phyllotaxis_position(slot, spacing);
                tree[child].shape.relative_position = seed;
                tree[child].shape.absolute.set_center(parent_center + seed);
            }

            let mut body = Body::new(
                tree[child].shape.absolute_center(),
                tree[child].shape.radius(),
            );
            body.fixed = tree[child].shape.absolute.is_fixed();
            body_of.insert(child, sim.add_body(body));
        }

        let members: Vec<usize> = children.iter().map(|child| body_of[child]).collect();
        sim.add_force(CollisionForce::new(
            members,
            settings.padding,
            settings.collision_strength,
            settings.collision_iterations,
        ));
    }

    let throttle = Duration::from_millis(settings.intermediate_move_interval_ms);
    let mut last_kick = Instant::now();

    while !sim.is_done() {
        sim.step();

        // Reconcile what the physics computed with what containment
        // requires, then hand the corrected positions back to the bodies.
        for &idx in new_nodes {
            let body = body_of[&idx];
            if sim.bodies()[body].fixed {
                continue;
            }
            let position = sim.bodies()[body].position;
            tree[idx].shape.absolute.set_center(position);
            shape::take_absolute_position(tree, settings, idx);
            sim.body_mut(body).position = tree[idx].shape.absolute_center();
        }

        if last_kick.elapsed() >= throttle {
            last_kick = Instant::now();
            for &idx in new_nodes {
                let ack = shape::start_move_to_intermediate_position(tree, view, idx);
                // Intermediate moves are fire-and-forget: the simulation
                // keeps correcting underneath the running transition.
                tokio::spawn(ack);
            }
        }
    }

    log_residual_overlap(tree, settings, groups);
}

fn log_residual_overlap(tree: &Tree, settings: &LayoutSettings, groups: &[(NodeIndex, Vec<NodeIndex>)]) {
    let mut residual = 0usize;
    for (_, children) in groups {
        for (i, &a) in children.iter().enumerate() {
            for &b in children.iter().skip(i + 1) {
                let dist = tree[a]
                    .shape
                    .absolute_center()
                    .distance(tree[b].shape.absolute_center());
                if dist + 1.0 < tree[a].shape.radius() + tree[b].shape.radius() + settings.padding {
                    residual += 1;
                }
            }
        }
    }
    if residual > 0 {
        tracing::debug!(
            "position pass left {residual} sibling pair(s) within tolerance of overlapping"
        );
    }
}
