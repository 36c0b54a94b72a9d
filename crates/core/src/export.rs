//! JSON export and import of drawn configuration.
//!
//! Nothing is persisted in-process; the export is handed to the caller, which
//! may store or transmit it. Imports are re-validated region by region.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::camera::{Camera, CameraRegistry};
use crate::editor::RegionEditor;
use crate::error::{CoreError, CoreResult};
use crate::geometry::CoordinateSpace;
use crate::position::CameraPosition;
use crate::region::Region;
use crate::types::Timestamp;

/// Version stamped into every export.
pub const EXPORT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Regions of a single editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSetExport {
    pub version: String,
    pub exported_at: Timestamp,
    pub space: CoordinateSpace,
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraExport {
    pub camera: Camera,
    pub positions: Vec<CameraPosition>,
}

/// Every registered camera with its positions, regions and schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteExport {
    pub version: String,
    pub exported_at: Timestamp,
    pub cameras: Vec<CameraExport>,
}

impl RegionEditor {
    /// Snapshot of the saved regions (the draft is not included).
    pub fn export(&self) -> RegionSetExport {
        RegionSetExport {
            version: EXPORT_VERSION.to_string(),
            exported_at: chrono::Utc::now(),
            space: self.config().space,
            regions: self.regions().to_vec(),
        }
    }
}

/// Snapshot of all cameras in a registry.
pub fn export_site(registry: &CameraRegistry) -> SiteExport {
    SiteExport {
        version: EXPORT_VERSION.to_string(),
        exported_at: chrono::Utc::now(),
        cameras: registry
            .sites()
            .iter()
            .map(|site| CameraExport {
                camera: site.camera.clone(),
                positions: site.positions.positions().to_vec(),
            })
            .collect(),
    }
}

/// Pretty-printed JSON for any export.
pub fn to_json<T: Serialize>(export: &T) -> CoreResult<String> {
    Ok(serde_json::to_string_pretty(export)?)
}

/// Parse a [`RegionSetExport`] and validate every region against `space`.
///
/// The export's own coordinate space must match `space`; duplicate region
/// ids are rejected.
pub fn import_regions(json: &str, space: &CoordinateSpace) -> CoreResult<Vec<Region>> {
    let export: RegionSetExport = serde_json::from_str(json)?;
    if export.space != *space {
        return Err(CoreError::Validation(format!(
            "Export uses coordinate space {:?}, expected {:?}",
            export.space, space
        )));
    }
    let mut seen = HashSet::new();
    for (i, region) in export.regions.iter().enumerate() {
        region.validate(space).map_err(|e| match e {
            CoreError::Validation(msg) => CoreError::Validation(format!("regions[{i}]: {msg}")),
            other => other,
        })?;
        if !seen.insert(region.id) {
            return Err(CoreError::Conflict(format!(
                "regions[{i}]: duplicate region id {}",
                region.id
            )));
        }
    }
    tracing::debug!(count = export.regions.len(), version = %export.version, "Regions imported");
    Ok(export.regions)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraRegistration;
    use crate::editor::{DrawRequest, EditorConfig};
    use crate::geometry::Point;
    use crate::region::RegionKindKey;
    use assert_matches::assert_matches;

    fn editor_with_region() -> RegionEditor {
        let mut editor = RegionEditor::default();
        editor
            .start_drawing(DrawRequest::new("Fence", RegionKindKey::BoundaryCrossing, "red"))
            .unwrap();
        editor.add_point(Point::new(10.0, 10.0)).unwrap();
        editor.add_point(Point::new(30.0, 40.0)).unwrap();
        editor.finish().unwrap();
        editor
    }

    #[test]
    fn export_excludes_draft() {
        let mut editor = editor_with_region();
        editor
            .start_drawing(DrawRequest::new("Wip", RegionKindKey::BoundaryCrossing, "red"))
            .unwrap();
        editor.add_point(Point::new(1.0, 1.0)).unwrap();
        let export = editor.export();
        assert_eq!(export.regions.len(), 1);
        assert_eq!(export.version, EXPORT_VERSION);
    }

    #[test]
    fn exported_json_imports_back() {
        let editor = editor_with_region();
        let json = to_json(&editor.export()).unwrap();
        let regions = import_regions(&json, &CoordinateSpace::Percent).unwrap();
        assert_eq!(regions, editor.regions());
    }

    #[test]
    fn import_rejects_space_mismatch() {
        let json = to_json(&editor_with_region().export()).unwrap();
        let canvas = CoordinateSpace::Pixel {
            width: 640,
            height: 480,
        };
        assert_matches!(import_regions(&json, &canvas), Err(CoreError::Validation(_)));
    }

    #[test]
    fn import_rejects_invalid_region() {
        let mut export = editor_with_region().export();
        export.regions[0].points.truncate(1);
        let json = to_json(&export).unwrap();
        let err = import_regions(&json, &CoordinateSpace::Percent).unwrap_err();
        assert!(err.to_string().contains("regions[0]"));
    }

    #[test]
    fn import_rejects_duplicate_ids() {
        let mut export = editor_with_region().export();
        export.regions.push(export.regions[0].clone());
        let json = to_json(&export).unwrap();
        assert_matches!(
            import_regions(&json, &CoordinateSpace::Percent),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        assert_matches!(
            import_regions("{not json", &CoordinateSpace::Percent),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn site_export_nests_positions() {
        let mut registry = CameraRegistry::new(EditorConfig::overlay());
        registry
            .register(CameraRegistration {
                name: "Gate".to_string(),
                location: None,
                stream_url: "rtsp://10.0.0.5/live".to_string(),
                ptz_capable: false,
            })
            .unwrap();
        let export = export_site(&registry);
        assert_eq!(export.cameras.len(), 1);
        assert_eq!(export.cameras[0].positions.len(), 1);

        let value = serde_json::to_value(&export).unwrap();
        assert_eq!(value["cameras"][0]["camera"]["name"], "Gate");
        assert!(value["cameras"][0]["positions"][0]["schedules"].is_array());
    }
}
