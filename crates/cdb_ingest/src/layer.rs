use crate::extent::Extent;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    #[default]
    Raster,
    Vector,
}

/// A dataset loaded in the project. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Layer {
    pub name: String,
    pub source: PathBuf,
    #[serde(default)]
    pub kind: LayerKind,
    #[serde(default)]
    pub band_count: u32,
    pub extent: Extent,
}

/// What `cdb-inject` should treat a raster as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerClass {
    Elevation,
    Imagery,
}

impl LayerClass {
    /// 1 band is elevation, 3 (RGB) or 4 (RGBA) bands are imagery.
    pub fn from_band_count(band_count: u32) -> Option<Self> {
        match band_count {
            1 => Some(LayerClass::Elevation),
            3 | 4 => Some(LayerClass::Imagery),
            _ => None,
        }
    }

    /// Classifies a layer; vector layers are never ingested.
    pub fn of(layer: &Layer) -> Option<Self> {
        match layer.kind {
            LayerKind::Raster => Self::from_band_count(layer.band_count),
            LayerKind::Vector => None,
        }
    }

    pub fn flag(self) -> &'static str {
        match self {
            LayerClass::Elevation => "-elevation",
            LayerClass::Imagery => "-imagery",
        }
    }
}

impl fmt::Display for LayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayerClass::Elevation => "elevation",
            LayerClass::Imagery => "imagery",
        })
    }
}

fn checked_default() -> bool {
    true
}

/// A node of the project's layer tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Group {
        group: String,
        #[serde(default = "checked_default")]
        checked: bool,
        #[serde(default)]
        children: Vec<TreeNode>,
    },
    Leaf {
        layer: String,
        #[serde(default = "checked_default")]
        checked: bool,
    },
}

impl TreeNode {
    pub fn leaf(name: impl Into<String>, checked: bool) -> Self {
        TreeNode::Leaf {
            layer: name.into(),
            checked,
        }
    }

    pub fn group(name: impl Into<String>, checked: bool, children: Vec<TreeNode>) -> Self {
        TreeNode::Group {
            group: name.into(),
            checked,
            children,
        }
    }

    pub fn is_checked(&self) -> bool {
        match self {
            TreeNode::Group { checked, .. } | TreeNode::Leaf { checked, .. } => *checked,
        }
    }
}

/// Collects the names of checked leaves, descending only into checked groups.
pub fn checked_layer_names(roots: &[TreeNode]) -> HashSet<String> {
    fn walk(nodes: &[TreeNode], out: &mut HashSet<String>) {
        for node in nodes.iter().filter(|n| n.is_checked()) {
            match node {
                TreeNode::Group { children, .. } => walk(children, out),
                TreeNode::Leaf { layer, .. } => {
                    out.insert(layer.clone());
                }
            }
        }
    }

    let mut names = HashSet::new();
    walk(roots, &mut names);
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_count_classification() {
        assert_eq!(LayerClass::from_band_count(1), Some(LayerClass::Elevation));
        assert_eq!(LayerClass::from_band_count(3), Some(LayerClass::Imagery));
        assert_eq!(LayerClass::from_band_count(4), Some(LayerClass::Imagery));
        for n in [0, 2, 5, 8] {
            assert_eq!(LayerClass::from_band_count(n), None);
        }
    }

    #[test]
    fn vector_layers_are_not_classified() {
        let layer = Layer {
            name: "roads".into(),
            source: "roads.shp".into(),
            kind: LayerKind::Vector,
            band_count: 1,
            extent: Extent::new(0.0, 0.0, 1.0, 1.0).unwrap(),
        };
        assert_eq!(LayerClass::of(&layer), None);
    }

    #[test]
    fn unchecked_group_hides_descendants() {
        let tree = vec![
            TreeNode::leaf("dem", true),
            TreeNode::leaf("hidden", false),
            TreeNode::group(
                "imagery",
                true,
                vec![
                    TreeNode::leaf("ortho", true),
                    TreeNode::group("old", false, vec![TreeNode::leaf("ortho_1998", true)]),
                ],
            ),
        ];

        let names = checked_layer_names(&tree);
        let mut sorted: Vec<_> = names.into_iter().collect();
        sorted.sort();
        assert_eq!(sorted, ["dem", "ortho"]);
    }

    #[test]
    fn tree_nodes_deserialize_from_json() {
        let json = r#"[
            {"layer": "dem"},
            {"group": "imagery", "checked": false, "children": [{"layer": "ortho"}]}
        ]"#;
        let tree: Vec<TreeNode> = serde_json::from_str(json).unwrap();
        assert_eq!(
            tree,
            vec![
                TreeNode::leaf("dem", true),
                TreeNode::group("imagery", false, vec![TreeNode::leaf("ortho", true)]),
            ]
        );
    }
}
