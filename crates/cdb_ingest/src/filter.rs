use crate::extent::Extent;
use crate::host::Host;
use crate::layer::Layer;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Unselected,
    OutOfBounds,
    MissingFile(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub layer: String,
    pub reason: SkipReason,
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::Unselected => write!(f, "Skipping unselected layer {}", self.layer),
            SkipReason::OutOfBounds => write!(f, "Skipping out of bounds layer {}", self.layer),
            SkipReason::MissingFile(path) => write!(
                f,
                "Skipping layer {} because file {} does not exist.",
                self.layer,
                path.display()
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Layers to import, topmost first.
    pub layers: Vec<Layer>,
    pub skipped: Vec<Skipped>,
}

/// Keeps layers that are checked, intersect `extent` and whose source file
/// exists according to `exists`. Tests run in that order; the first failure
/// decides the skip reason. `layers` is in draw order and the result is
/// reversed so the topmost layer comes first.
pub fn filter_layers<F>(
    layers: &[Layer],
    checked: &HashSet<String>,
    extent: &Extent,
    exists: F,
) -> Selection
where
    F: Fn(&Path) -> bool,
{
    let mut selection = Selection::default();

    for layer in layers.iter().rev() {
        let reason = if !checked.contains(&layer.name) {
            Some(SkipReason::Unselected)
        } else if !layer.extent.intersects(extent) {
            Some(SkipReason::OutOfBounds)
        } else if !exists(&layer.source) {
            Some(SkipReason::MissingFile(layer.source.clone()))
        } else {
            None
        };

        match reason {
            Some(reason) => selection.skipped.push(Skipped {
                layer: layer.name.clone(),
                reason,
            }),
            None => selection.layers.push(layer.clone()),
        }
    }

    selection
}

/// Filters the host's layers against `extent`, reporting each skip as status.
pub fn select_layers<H>(host: &mut H, extent: &Extent) -> Selection
where
    H: Host + ?Sized,
{
    let layers = host.layers();
    let checked = host.checked_names();
    let selection = filter_layers(&layers, &checked, extent, Path::exists);

    for skipped in &selection.skipped {
        host.report_status(&skipped.to_string());
    }

    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;

    fn layer(name: &str, extent: Extent) -> Layer {
        Layer {
            name: name.to_owned(),
            source: PathBuf::from(format!("/data/{name}.tif")),
            kind: LayerKind::Raster,
            band_count: 3,
            extent,
        }
    }

    fn ext(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Extent {
        Extent::new(x_min, y_min, x_max, y_max).unwrap()
    }

    fn names(layers: &[Layer]) -> Vec<&str> {
        layers.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn keeps_checked_intersecting_existing_layers_topmost_first() {
        let aoi = ext(0.0, 0.0, 10.0, 10.0);
        let layers = vec![
            layer("bottom", ext(1.0, 1.0, 2.0, 2.0)),
            layer("middle", ext(5.0, 5.0, 15.0, 15.0)),
            layer("top", ext(-5.0, -5.0, 0.5, 0.5)),
        ];
        let checked: HashSet<String> = ["bottom", "middle", "top"].map(String::from).into();

        let selection = filter_layers(&layers, &checked, &aoi, |_| true);
        assert_eq!(names(&selection.layers), ["top", "middle", "bottom"]);
        assert!(selection.skipped.is_empty());
    }

    #[test]
    fn first_failing_test_decides_the_reason() {
        let aoi = ext(0.0, 0.0, 10.0, 10.0);
        let far = ext(50.0, 50.0, 60.0, 60.0);
        let layers = vec![
            layer("unchecked_far", far),
            layer("far", far),
            layer("missing", ext(1.0, 1.0, 2.0, 2.0)),
            layer("ok", ext(1.0, 1.0, 2.0, 2.0)),
        ];
        let checked: HashSet<String> = ["far", "missing", "ok"].map(String::from).into();

        let selection = filter_layers(&layers, &checked, &aoi, |p| !p.ends_with("missing.tif"));
        assert_eq!(names(&selection.layers), ["ok"]);

        let reasons: Vec<_> = selection
            .skipped
            .iter()
            .map(|s| (s.layer.as_str(), s.reason.clone()))
            .collect();
        assert_eq!(
            reasons,
            [
                ("missing", SkipReason::MissingFile("/data/missing.tif".into())),
                ("far", SkipReason::OutOfBounds),
                ("unchecked_far", SkipReason::Unselected),
            ]
        );
    }

    #[test]
    fn membership_does_not_depend_on_input_order() {
        let aoi = ext(0.0, 0.0, 10.0, 10.0);
        let mut layers = vec![
            layer("a", ext(1.0, 1.0, 2.0, 2.0)),
            layer("b", ext(20.0, 20.0, 30.0, 30.0)),
            layer("c", ext(9.0, 9.0, 12.0, 12.0)),
            layer("d", ext(3.0, 3.0, 4.0, 4.0)),
        ];
        let checked: HashSet<String> = ["a", "b", "c"].map(String::from).into();

        let forward = filter_layers(&layers, &checked, &aoi, |_| true);
        layers.reverse();
        let backward = filter_layers(&layers, &checked, &aoi, |_| true);

        let mut f = names(&forward.layers);
        let mut b = names(&backward.layers);
        assert_eq!(f, ["c", "a"]);
        assert_eq!(b, ["a", "c"]);
        f.sort();
        b.sort();
        assert_eq!(f, b);
    }

    #[test]
    fn skip_messages() {
        let skipped = Skipped {
            layer: "dem".into(),
            reason: SkipReason::MissingFile("/data/dem.tif".into()),
        };
        assert_eq!(
            skipped.to_string(),
            "Skipping layer dem because file /data/dem.tif does not exist."
        );
        let skipped = Skipped {
            layer: "dem".into(),
            reason: SkipReason::OutOfBounds,
        };
        assert_eq!(skipped.to_string(), "Skipping out of bounds layer dem");
    }
}
