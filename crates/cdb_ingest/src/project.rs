//! JSON description of a GIS project: its layers in draw order and the
//! layer tree that carries the user's checked state.

use crate::error::{IngestError, Result};
use crate::layer::{checked_layer_names, Layer, TreeNode};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    /// Draw order: the first entry is painted first, i.e. sits at the bottom.
    pub layers: Vec<Layer>,
    /// Absent means every layer is a checked top-level leaf.
    #[serde(default)]
    pub tree: Option<Vec<TreeNode>>,
}

impl Project {
    /// Loads a project file. Relative layer sources are resolved against the
    /// directory containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| IngestError::ProjectIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut project: Project = serde_json::from_reader(BufReader::new(file)).map_err(
            |source| IngestError::ProjectParse {
                path: path.to_path_buf(),
                source,
            },
        )?;

        if let Some(base) = path.parent() {
            for layer in &mut project.layers {
                if layer.source.is_relative() {
                    layer.source = base.join(&layer.source);
                }
            }
        }

        Ok(project)
    }

    pub fn checked_names(&self) -> HashSet<String> {
        match &self.tree {
            Some(tree) => checked_layer_names(tree),
            None => self.layers.iter().map(|l| l.name.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;
    use std::io::Write;

    fn write_project(dir: &Path, json: &str) -> std::path::PathBuf {
        let path = dir.join("project.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_layers_and_resolves_relative_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(
            dir.path(),
            r#"{
                "layers": [
                    {"name": "dem", "source": "data/dem.tif", "band_count": 1,
                     "extent": {"x_min": 0, "y_min": 0, "x_max": 1, "y_max": 1}},
                    {"name": "roads", "source": "/abs/roads.shp", "kind": "vector",
                     "extent": {"x_min": 0, "y_min": 0, "x_max": 1, "y_max": 1}}
                ],
                "tree": [{"layer": "dem"}, {"layer": "roads", "checked": false}]
            }"#,
        );

        let project = Project::load(&path).unwrap();
        assert_eq!(project.layers.len(), 2);
        assert_eq!(project.layers[0].source, dir.path().join("data/dem.tif"));
        assert_eq!(project.layers[0].kind, LayerKind::Raster);
        assert_eq!(project.layers[1].kind, LayerKind::Vector);
        assert_eq!(project.layers[1].band_count, 0);

        let checked = project.checked_names();
        assert!(checked.contains("dem"));
        assert!(!checked.contains("roads"));
    }

    #[test]
    fn missing_tree_checks_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(
            dir.path(),
            r#"{"layers": [{"name": "a", "source": "a.tif", "band_count": 3,
                "extent": {"x_min": 0, "y_min": 0, "x_max": 1, "y_max": 1}}]}"#,
        );

        let project = Project::load(&path).unwrap();
        assert_eq!(project.checked_names(), HashSet::from(["a".to_owned()]));
    }

    #[test]
    fn reports_unreadable_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Project::load(&dir.path().join("nope.json")),
            Err(IngestError::ProjectIo { .. })
        ));

        let path = write_project(dir.path(), "{\"layers\": 3}");
        assert!(matches!(
            Project::load(&path),
            Err(IngestError::ProjectParse { .. })
        ));
    }

    #[test]
    fn rejects_inverted_layer_extents() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(
            dir.path(),
            r#"{"layers": [{"name": "a", "source": "a.tif", "band_count": 1,
                "extent": {"x_min": 5, "y_min": 0, "x_max": 1, "y_max": 1}}]}"#,
        );

        let err = Project::load(&path).unwrap_err();
        let IngestError::ProjectParse { source, .. } = err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert!(source.to_string().contains("x_min"), "{source}");
    }
}
