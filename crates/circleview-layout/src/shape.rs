use crate::tree::{NodeIndex, Tree};
use crate::view::{NodeView, TextMeasure, ViewAck};
use circleview_core::{
    Circle, FixableCircle, GeometryError, LayoutSettings, Rect, ReferenceShape, Vector,
    GEOMETRY_EPSILON,
};
use serde::{Deserialize, Serialize};

/// Absolute geometry of a node: inner nodes are circles the simulation may
/// pin, the root is a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AbsoluteShape {
    Circle(FixableCircle),
    Rect(Rect),
}

impl AbsoluteShape {
    pub fn center(&self) -> Vector {
        match self {
            AbsoluteShape::Circle(c) => c.center,
            AbsoluteShape::Rect(r) => r.center,
        }
    }

    pub fn set_center(&mut self, center: Vector) {
        match self {
            AbsoluteShape::Circle(c) => c.center = center,
            AbsoluteShape::Rect(r) => r.center = center,
        }
    }

    /// Circle radius; for the root rectangle the larger half extent.
    pub fn radius(&self) -> f64 {
        match self {
            AbsoluteShape::Circle(c) => c.r,
            AbsoluteShape::Rect(r) => r.half_width.max(r.half_height),
        }
    }

    /// The root rectangle never moves, so it counts as fixed.
    pub fn is_fixed(&self) -> bool {
        match self {
            AbsoluteShape::Circle(c) => c.fixed,
            AbsoluteShape::Rect(_) => true,
        }
    }

    pub fn fix(&mut self) {
        if let AbsoluteShape::Circle(c) = self {
            c.fix();
        }
    }

    pub fn unfix(&mut self) {
        if let AbsoluteShape::Circle(c) = self {
            c.unfix();
        }
    }

    pub fn as_reference(&self) -> ReferenceShape {
        match self {
            AbsoluteShape::Circle(c) => ReferenceShape::Circle {
                center: c.center,
                r: c.r,
            },
            AbsoluteShape::Rect(r) => ReferenceShape::Rect(*r),
        }
    }
}

/// Couples a node to its geometry: a position relative to the node's
/// reference shape (the parent's absolute shape, or the zero shape for the
/// root) and the absolute shape derived from it.
///
/// The committed fields remember what the view was last told, so a relayout
/// that leaves a node where it was does not re-animate it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeShape {
    pub relative_position: Vector,
    pub absolute: AbsoluteShape,
    pub(crate) committed_center: Vector,
    pub(crate) committed_radius: f64,
}

impl NodeShape {
    pub fn new_circle() -> Self {
        Self {
            relative_position: Vector::ZERO,
            absolute: AbsoluteShape::Circle(FixableCircle::new(Vector::ZERO, 0.0)),
            committed_center: Vector::ZERO,
            committed_radius: 0.0,
        }
    }

    pub fn new_root_rect() -> Self {
        Self {
            relative_position: Vector::ZERO,
            absolute: AbsoluteShape::Rect(Rect::new(Vector::ZERO, 0.0, 0.0)),
            committed_center: Vector::ZERO,
            committed_radius: 0.0,
        }
    }

    pub fn absolute_center(&self) -> Vector {
        self.absolute.center()
    }

    pub fn radius(&self) -> f64 {
        self.absolute.radius()
    }

    /// The node's circle relative to its reference shape.
    pub fn relative_circle(&self) -> Circle {
        Circle::new(self.relative_position, self.absolute.radius())
    }
}

/// Set the node's radius and tell the view. A no-op when the radius is
/// already committed at that value, so unaffected nodes are not re-animated.
pub async fn change_radius(
    tree: &mut Tree,
    view: &dyn NodeView,
    measure: &dyn TextMeasure,
    settings: &LayoutSettings,
    idx: NodeIndex,
    radius: f64,
) {
    if (tree[idx].shape.committed_radius - radius).abs() <= GEOMETRY_EPSILON {
        return;
    }

    let half_label = measure.label_width(&tree[idx].name, tree[idx].kind) / 2.0;
    let text_offset = if tree[idx].is_currently_leaf() {
        0.0
    } else {
        // The label sits on a chord near the rim instead of the center.
        (radius * radius - half_label * half_label).max(0.0).sqrt()
    };

    let ack = {
        let node = &mut tree[idx];
        node.shape.committed_radius = radius;
        match &mut node.shape.absolute {
            AbsoluteShape::Circle(c) => {
                c.r = radius;
                view.change_radius(&node.full_name, radius, text_offset)
            }
            AbsoluteShape::Rect(rect) => {
                rect.half_width = radius;
                rect.half_height = radius;
                view.resize_viewport(radius, radius)
            }
        }
    };
    ack.await;
}

/// Set the relative position, recompute the absolute positions of the node
/// and its current descendants, and wait for the view to commit the move.
pub async fn move_to_position(
    tree: &mut Tree,
    view: &dyn NodeView,
    idx: NodeIndex,
    position: Vector,
) {
    let reference_center = tree.reference_shape(idx).center();
    tree[idx].shape.relative_position = position;
    let absolute = reference_center + position;
    tree[idx].shape.absolute.set_center(absolute);
    tree.compose_absolute_positions_below(idx);

    if absolute.distance(tree[idx].shape.committed_center) > GEOMETRY_EPSILON {
        tree[idx].shape.committed_center = absolute;
        let ack = view.move_to_position(&tree[idx].full_name, absolute);
        ack.await;
    }
}

/// Kick off an animated move towards the node's current (provisional)
/// absolute position. The returned acknowledgement is not awaited by the
/// position pass; the simulation keeps running underneath the transition.
pub fn start_move_to_intermediate_position(
    tree: &Tree,
    view: &dyn NodeView,
    idx: NodeIndex,
) -> ViewAck {
    let node = &tree[idx];
    view.start_move_to_position(&node.full_name, node.shape.absolute_center())
}

/// Commit the node where the simulation left it: re-derive the absolute
/// position from the final relative position, then pin the circle unless a
/// previous pass already did.
pub async fn complete_move_to_intermediate_position(
    tree: &mut Tree,
    view: &dyn NodeView,
    idx: NodeIndex,
) {
    let position = tree[idx].shape.relative_position;
    move_to_position(tree, view, idx, position).await;
    if !tree[idx].shape.absolute.is_fixed() {
        tree[idx].shape.absolute.fix();
    }
}

/// Reconcile the simulation-perturbed absolute position with what
/// containment requires: read the absolute position back, express it
/// relative to the reference shape, pull it inside if it escaped, and write
/// the corrected absolute position again.
pub fn take_absolute_position(tree: &mut Tree, settings: &LayoutSettings, idx: NodeIndex) {
    let reference = tree.reference_shape(idx);
    let node = &mut tree[idx];
    let relative = node.shape.absolute.center() - reference.center();
    let circle = Circle::new(relative, node.shape.radius());
    let corrected = reference.clamp_relative(&circle, settings.padding);
    node.shape.relative_position = corrected.center;
    node.shape.absolute.set_center(reference.center() + corrected.center);
}

/// Displace the node by `(dx, dy)` relative to its reference shape, as a
/// drag gesture does. If the displaced circle no longer fits, either the
/// ancestor chain is expanded to restore containment (`expand_parent`), or
/// the displacement is cut short at the rim. Descendants follow instantly,
/// without a transition.
pub async fn jump_to_relative_displacement(
    tree: &mut Tree,
    view: &dyn NodeView,
    measure: &dyn TextMeasure,
    settings: &LayoutSettings,
    idx: NodeIndex,
    dx: f64,
    dy: f64,
    expand_parent: bool,
) -> Result<(), GeometryError> {
    if tree[idx].is_root() {
        tracing::warn!("ignoring drag of the root node '{}'", tree[idx].full_name);
        return Ok(());
    }

    let padding = settings.padding;
    let displacement = Vector::new(dx, dy);
    let current = tree[idx].shape.relative_circle();
    let proposed = Circle::new(current.center + displacement, current.r);
    let reference = tree.reference_shape(idx);

    let target = if reference.contains_relative(&proposed, padding) {
        proposed.center
    } else if expand_parent {
        let parent = tree[idx].parent.expect("non-root node has a parent");
        let growth = grow_to_contain(tree, settings, parent, proposed);
        notify_growth(tree, view, measure, &growth).await;
        proposed.center
    } else {
        match reference {
            ReferenceShape::Circle { r, .. } => {
                current
                    .translated_as_far_as_possible(r - padding, displacement)?
                    .center
            }
            ReferenceShape::Rect(rect) => rect.clamp_relative_circle(&proposed, padding).center,
            ReferenceShape::Zero => proposed.center,
        }
    };

    let reference_center = tree.reference_shape(idx).center();
    tree[idx].shape.relative_position = target;
    tree[idx].shape.absolute.set_center(reference_center + target);
    tree.compose_absolute_positions_below(idx);

    let mut affected = vec![idx];
    affected.extend(tree.current_descendants(idx));
    for moved in affected {
        let absolute = tree[moved].shape.absolute_center();
        tree[moved].shape.committed_center = absolute;
        let ack = view.jump_to_position(&tree[moved].full_name, absolute);
        ack.await;
    }
    Ok(())
}

/// Result of walking an expansion up the ancestor chain.
#[derive(Debug, Default)]
pub(crate) struct Growth {
    /// Inner nodes whose radius was raised, bottom-most first.
    pub grown: Vec<(NodeIndex, f64)>,
    /// New half extents when the expansion reached the root rectangle.
    pub viewport: Option<(f64, f64)>,
}

/// Grow `parent` (and transitively its ancestors) until `requested` fits.
///
/// This is the only place a radius increases outside the sizing pass. The
/// walk always terminates at the root, which grows per axis instead of
/// radially.
pub(crate) fn grow_to_contain(
    tree: &mut Tree,
    settings: &LayoutSettings,
    parent: NodeIndex,
    requested: Circle,
) -> Growth {
    let padding = settings.padding;
    let mut growth = Growth::default();
    let mut idx = parent;
    let mut needed = requested;

    loop {
        let is_rect = matches!(tree[idx].shape.absolute, AbsoluteShape::Rect(_));
        if is_rect {
            let AbsoluteShape::Rect(rect) = &mut tree[idx].shape.absolute else {
                unreachable!()
            };
            // Axes grow independently; a violated axis reaches out to the
            // full distance of the escaping circle so the drawing region
            // never lags behind it.
            let reach = needed.center.length() + needed.r + padding;
            let mut half_width = rect.half_width;
            let mut half_height = rect.half_height;
            if needed.center.x.abs() + needed.r + padding > half_width {
                half_width = half_width.max(reach);
            }
            if needed.center.y.abs() + needed.r + padding > half_height {
                half_height = half_height.max(reach);
            }
            if half_width > rect.half_width || half_height > rect.half_height {
                rect.half_width = half_width;
                rect.half_height = half_height;
                growth.viewport = Some((half_width, half_height));
            }
            break;
        }

        let new_radius = {
            let AbsoluteShape::Circle(circle) = &mut tree[idx].shape.absolute else {
                unreachable!()
            };
            let new_radius = (needed.center.length() + needed.r + padding).max(circle.r);
            if new_radius > circle.r {
                circle.r = new_radius;
                growth.grown.push((idx, new_radius));
            }
            new_radius
        };

        let own = Circle::new(tree[idx].shape.relative_position, new_radius);
        if tree.reference_shape(idx).contains_relative(&own, padding) {
            break;
        }
        needed = own;
        idx = tree[idx].parent.expect("inner circles always have a parent");
    }

    growth
}

pub(crate) async fn notify_growth(
    tree: &mut Tree,
    view: &dyn NodeView,
    measure: &dyn TextMeasure,
    growth: &Growth,
) {
    for &(idx, radius) in &growth.grown {
        // Bypass the committed-radius shortcut: the radius is already
        // written, the view still has to hear about it.
        tree[idx].shape.committed_radius = radius;
        let half_label = measure.label_width(&tree[idx].name, tree[idx].kind) / 2.0;
        let text_offset = (radius * radius - half_label * half_label).max(0.0).sqrt();
        let ack = view.change_radius(&tree[idx].full_name, radius, text_offset);
        ack.await;
    }
    if let Some((half_width, half_height)) = growth.viewport {
        view.resize_viewport(half_width, half_height).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circleview_core::{NodeData, NodeKind};

    fn sample_tree() -> Tree {
        let data = NodeData::new("root", "root", NodeKind::PACKAGE).with_children(vec![
            NodeData::new("root.a", "a", NodeKind::PACKAGE)
                .with_children(vec![NodeData::new("root.a.X", "X", NodeKind::CLASS)]),
        ]);
        Tree::build(&data).unwrap()
    }

    fn set_circle(tree: &mut Tree, full_name: &str, center: Vector, r: f64) {
        let idx = tree.index_of(full_name).unwrap();
        tree[idx].shape.absolute = AbsoluteShape::Circle(FixableCircle::new(center, r));
    }

    fn set_root_rect(tree: &mut Tree, half_width: f64, half_height: f64) {
        let root = tree.root();
        tree[root].shape.absolute =
            AbsoluteShape::Rect(Rect::new(Vector::ZERO, half_width, half_height));
    }

    #[test]
    fn test_take_absolute_position_pulls_escapee_back_inside() {
        let mut tree = sample_tree();
        let settings = LayoutSettings::default();
        set_root_rect(&mut tree, 100.0, 100.0);
        set_circle(&mut tree, "root.a", Vector::ZERO, 30.0);
        // X drifted far outside its parent circle mid-simulation.
        set_circle(&mut tree, "root.a.X", Vector::new(100.0, 0.0), 10.0);

        let x = tree.index_of("root.a.X").unwrap();
        take_absolute_position(&mut tree, &settings, x);

        // Tangent-inside: |center| = 30 - 10 - padding.
        let relative = tree[x].shape.relative_position;
        assert!((relative.length() - 10.0).abs() < GEOMETRY_EPSILON);
        assert!((tree[x].shape.absolute_center().x - 10.0).abs() < GEOMETRY_EPSILON);
    }

    #[test]
    fn test_take_absolute_position_keeps_contained_nodes_put() {
        let mut tree = sample_tree();
        let settings = LayoutSettings::default();
        set_root_rect(&mut tree, 100.0, 100.0);
        set_circle(&mut tree, "root.a", Vector::ZERO, 40.0);
        set_circle(&mut tree, "root.a.X", Vector::new(5.0, 5.0), 10.0);

        let x = tree.index_of("root.a.X").unwrap();
        take_absolute_position(&mut tree, &settings, x);

        assert_eq!(tree[x].shape.absolute_center(), Vector::new(5.0, 5.0));
    }

    #[test]
    fn test_expansion_cascades_up_to_the_root_rectangle() {
        let mut tree = sample_tree();
        let settings = LayoutSettings::default();
        set_root_rect(&mut tree, 50.0, 50.0);
        set_circle(&mut tree, "root.a", Vector::ZERO, 30.0);

        let a = tree.index_of("root.a").unwrap();
        let requested = Circle::new(Vector::new(50.0, 0.0), 10.0);
        let growth = grow_to_contain(&mut tree, &settings, a, requested);

        // The parent grows to 50 + 10 + padding, which in turn no longer
        // fits the 50-unit root rectangle, so the viewport grows as well.
        assert_eq!(growth.grown, vec![(a, 70.0)]);
        assert_eq!(growth.viewport, Some((80.0, 80.0)));
        assert_eq!(tree[a].shape.radius(), 70.0);
    }

    #[test]
    fn test_expansion_stops_where_containment_already_holds() {
        let mut tree = sample_tree();
        let settings = LayoutSettings::default();
        set_root_rect(&mut tree, 200.0, 200.0);
        set_circle(&mut tree, "root.a", Vector::ZERO, 30.0);

        let a = tree.index_of("root.a").unwrap();
        let requested = Circle::new(Vector::new(20.0, 0.0), 10.0);
        let growth = grow_to_contain(&mut tree, &settings, a, requested);

        assert_eq!(growth.grown, vec![(a, 40.0)]);
        assert_eq!(growth.viewport, None);
    }
}
