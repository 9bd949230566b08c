use circleview_core::{NodeData, NodeKind};
use std::path::Path;

/// Generate a synthetic three-level containment tree: `packages` packages
/// under one root, `classes` classes in each package.
pub fn generate_synthetic_tree(packages: usize, classes: usize) -> NodeData {
    let children = (0..packages)
        .map(|p| {
            let leaves = (0..classes)
                .map(|c| {
                    NodeData::new(
                        &format!("root.pkg{p}.Class{p}_{c}"),
                        &format!("Class{p}_{c}"),
                        NodeKind::CLASS,
                    )
                })
                .collect();
            NodeData::new(&format!("root.pkg{p}"), &format!("pkg{p}"), NodeKind::PACKAGE)
                .with_children(leaves)
        })
        .collect();

    NodeData::new("root", "root", NodeKind::PACKAGE).with_children(children)
}

/// Persist a generated tree as a JSON fixture, for profiling runs that want
/// a stable input outside the bench harness.
pub fn write_tree_fixture(path: &Path, tree: &NodeData) -> anyhow::Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(tree)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tree_has_expected_size() {
        let tree = generate_synthetic_tree(10, 9);
        assert_eq!(tree.node_count(), 1 + 10 + 90);
    }
}
