use circleview_core::{LayoutSettings, NodeData, NodeKind};
use circleview_layout::{Diagram, InstantView, TextMeasure};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Measures every label by a width chosen by the generator.
struct GeneratedWidths(HashMap<String, f64>);

impl TextMeasure for GeneratedWidths {
    fn label_width(&self, text: &str, _kind: NodeKind) -> f64 {
        self.0.get(text).copied().unwrap_or(20.0)
    }
}

/// One generated package: its own label width plus the label widths of its
/// leaf classes.
type PackageInput = (f64, Vec<f64>);

fn build_tree(packages: &[PackageInput]) -> (NodeData, GeneratedWidths) {
    let mut widths = HashMap::new();
    widths.insert("root".to_string(), 24.0);

    let mut children = Vec::new();
    for (p, (package_width, leaf_widths)) in packages.iter().enumerate() {
        let package_name = format!("p{p}");
        widths.insert(package_name.clone(), *package_width);

        let leaves: Vec<NodeData> = leaf_widths
            .iter()
            .enumerate()
            .map(|(c, leaf_width)| {
                let leaf_name = format!("p{p}c{c}");
                widths.insert(leaf_name.clone(), *leaf_width);
                NodeData::new(&format!("root.p{p}.{leaf_name}"), &leaf_name, NodeKind::CLASS)
            })
            .collect();

        children.push(
            NodeData::new(&format!("root.p{p}"), &package_name, NodeKind::PACKAGE)
                .with_children(leaves),
        );
    }

    let data = NodeData::new("root", "root", NodeKind::PACKAGE).with_children(children);
    (data, GeneratedWidths(widths))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("current-thread runtime")
}

fn package_strategy() -> impl Strategy<Value = PackageInput> {
    (8.0f64..60.0, proptest::collection::vec(8.0f64..60.0, 0..5))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// After a full relayout, every node lies inside its parent and no two
    /// current siblings overlap, within the physics tolerance of one unit.
    #[test]
    fn prop_containment_and_non_overlap(packages in proptest::collection::vec(package_strategy(), 1..5)) {
        let (data, widths) = build_tree(&packages);
        let settings = LayoutSettings::default();
        let padding = settings.padding;
        let diagram = Diagram::new(&data, settings, Arc::new(InstantView), Arc::new(widths)).unwrap();

        runtime().block_on(async {
            diagram.relayout_completely().await;
            diagram.inspect(|tree| {
                let mut parents = vec![tree.root()];
                parents.extend(tree.current_descendants(tree.root()));
                for parent in parents {
                    let children = tree[parent].current_children().to_vec();
                    for &child in &children {
                        let relative = tree[child].shape.relative_circle();
                        prop_assert!(
                            tree.reference_shape(child).contains_relative(&relative, padding - 1.0),
                            "'{}' escaped its parent", tree[child].full_name
                        );
                    }
                    for (i, &a) in children.iter().enumerate() {
                        for &b in children.iter().skip(i + 1) {
                            let dist = tree[a].shape.absolute_center()
                                .distance(tree[b].shape.absolute_center());
                            let required = tree[a].shape.radius() + tree[b].shape.radius() + padding;
                            prop_assert!(
                                dist + 1.0 >= required,
                                "'{}' and '{}' too close: {} < {}",
                                tree[a].full_name, tree[b].full_name, dist, required
                            );
                        }
                    }
                }
                Ok(())
            }).await
        })?;
    }

    /// An original leaf's radius is exactly half its label width plus the
    /// text padding; no minimum floor applies.
    #[test]
    fn prop_leaf_radius_is_label_radius(packages in proptest::collection::vec(package_strategy(), 1..5)) {
        let (data, widths) = build_tree(&packages);
        let settings = LayoutSettings::default();
        let text_padding = settings.text_padding;
        let diagram = Diagram::new(&data, settings, Arc::new(InstantView), Arc::new(widths)).unwrap();

        runtime().block_on(async {
            diagram.relayout_completely().await;
            diagram.inspect(|tree| {
                for (p, (_, leaf_widths)) in packages.iter().enumerate() {
                    for (c, leaf_width) in leaf_widths.iter().enumerate() {
                        let idx = tree.index_of(&format!("root.p{p}.p{p}c{c}")).unwrap();
                        let expected = leaf_width / 2.0 + text_padding;
                        prop_assert!(
                            (tree[idx].shape.radius() - expected).abs() < 1e-9,
                            "leaf radius {} != {expected}", tree[idx].shape.radius()
                        );
                    }
                }
                Ok(())
            }).await
        })?;
    }

    /// A node's radius is never smaller than the radius its own label
    /// requires (single-child containers use the stacked closed form and
    /// are exempt).
    #[test]
    fn prop_radius_monotonicity(packages in proptest::collection::vec(package_strategy(), 1..5)) {
        let (data, widths) = build_tree(&packages);
        let settings = LayoutSettings::default();
        let text_padding = settings.text_padding;
        let diagram = Diagram::new(&data, settings, Arc::new(InstantView), Arc::new(widths)).unwrap();

        runtime().block_on(async {
            diagram.relayout_completely().await;
            diagram.inspect(|tree| {
                for (p, (package_width, leaf_widths)) in packages.iter().enumerate() {
                    if leaf_widths.len() == 1 {
                        continue;
                    }
                    let idx = tree.index_of(&format!("root.p{p}")).unwrap();
                    let label_radius = package_width / 2.0 + text_padding;
                    prop_assert!(
                        tree[idx].shape.radius() + 1e-9 >= label_radius,
                        "package radius {} clips its label ({label_radius})",
                        tree[idx].shape.radius()
                    );
                }
                Ok(())
            }).await
        })?;
    }
}
