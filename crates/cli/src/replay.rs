//! Session replay against the core model.
//!
//! Each operation is applied in order. Rejected operations are logged and
//! recorded in the [`ReplaySummary`]; they never abort the run, matching how
//! the configuration screens surface a message and carry on.

use std::collections::BTreeSet;

use serde::Serialize;

use vigil_core::camera::{CameraRegistry, CameraSite};
use vigil_core::editor::{EditorConfig, RegionEditor};
use vigil_core::error::{CoreError, CoreResult};
use vigil_core::export::{export_site, SiteExport};
use vigil_core::geometry::Point;
use vigil_core::position::{CameraPosition, LockPositionRequest};
use vigil_core::schedule::DayOfWeek;
use vigil_core::types::EntityId;

use crate::session::SessionOp;

/// One rejected operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub index: usize,
    pub op: &'static str,
    pub message: String,
}

/// Two enabled schedules of one position that are active at the same time.
/// Overlaps are allowed; they are only reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapWarning {
    pub index: usize,
    pub camera: String,
    pub position: String,
    pub first: String,
    pub second: String,
    pub days: BTreeSet<DayOfWeek>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
    pub overlaps: Vec<OverlapWarning>,
}

/// Editor opened on one camera position.
#[derive(Debug)]
struct OpenEditor {
    camera_id: EntityId,
    position_id: EntityId,
    editor: RegionEditor,
}

/// Replay state: the registry being configured and the open editor, if any.
#[derive(Debug)]
pub struct SessionReplay {
    registry: CameraRegistry,
    open: Option<OpenEditor>,
    summary: ReplaySummary,
}

impl SessionReplay {
    pub fn new(editor_config: EditorConfig) -> Self {
        Self {
            registry: CameraRegistry::new(editor_config),
            open: None,
            summary: ReplaySummary::default(),
        }
    }

    pub fn registry(&self) -> &CameraRegistry {
        &self.registry
    }

    pub fn summary(&self) -> &ReplaySummary {
        &self.summary
    }

    /// Apply every operation, then commit any editor left open.
    pub fn run(mut self, ops: Vec<SessionOp>) -> (SiteExport, ReplaySummary) {
        for (index, op) in ops.into_iter().enumerate() {
            self.step(index, op);
        }
        if let Err(e) = self.close_editor() {
            tracing::warn!(error = %e, "Could not commit the editor left open at end of session");
        }
        (export_site(&self.registry), self.summary)
    }

    /// Apply one operation, recording the outcome.
    pub fn step(&mut self, index: usize, op: SessionOp) {
        let name = op.name();
        match self.apply(index, op) {
            Ok(()) => {
                self.summary.applied += 1;
                tracing::debug!(index, op = name, "Operation applied");
            }
            Err(e) => {
                tracing::warn!(index, op = name, error = %e, "Operation rejected");
                self.summary.rejected += 1;
                self.summary.rejections.push(Rejection {
                    index,
                    op: name,
                    message: e.to_string(),
                });
            }
        }
    }

    fn apply(&mut self, index: usize, op: SessionOp) -> CoreResult<()> {
        match op {
            SessionOp::RegisterCamera(registration) => {
                self.registry.register(registration)?;
            }
            SessionOp::RemoveCamera { camera } => {
                let id = self.camera_id(&camera)?;
                if self.open.as_ref().is_some_and(|o| o.camera_id == id) {
                    self.open = None;
                }
                self.registry.remove(id);
            }
            SessionOp::LockPosition { camera, name, ptz } => {
                self.site_mut(&camera)?.positions.lock_position(LockPositionRequest {
                    name,
                    ptz,
                    regions: Vec::new(),
                })?;
            }
            SessionOp::UnlockPosition { camera, position } => {
                let (_, position_id) = self.position_ids(&camera, &position)?;
                self.site_mut(&camera)?
                    .positions
                    .set_locked(position_id, false)?;
            }
            SessionOp::MovePosition {
                camera,
                position,
                ptz,
            } => {
                let (_, position_id) = self.position_ids(&camera, &position)?;
                self.site_mut(&camera)?
                    .positions
                    .move_position(position_id, ptz)?;
            }
            SessionOp::DeletePosition { camera, position } => {
                let (_, position_id) = self.position_ids(&camera, &position)?;
                self.site_mut(&camera)?
                    .positions
                    .delete_position(position_id)?;
                if self.open.as_ref().is_some_and(|o| o.position_id == position_id) {
                    self.open = None;
                }
            }
            SessionOp::OpenEditor { camera, position } => {
                self.close_editor()?;
                let site = self.site(&camera)?;
                let position_id = match position {
                    Some(name) => lookup_position(site, &name)?.id,
                    None => match site.positions.positions() {
                        [only] => only.id,
                        [] => {
                            return Err(CoreError::Validation(format!(
                                "Camera '{camera}' has no positions; lock one first"
                            )))
                        }
                        _ => {
                            return Err(CoreError::Validation(format!(
                                "Camera '{camera}' has several positions; name one"
                            )))
                        }
                    },
                };
                let editor = site.positions.edit_regions(position_id)?;
                self.open = Some(OpenEditor {
                    camera_id: site.camera.id,
                    position_id,
                    editor,
                });
            }
            SessionOp::StartDrawing(request) => {
                self.editor()?.start_drawing(request)?;
            }
            SessionOp::AddPoint { x, y } => {
                self.editor()?.add_point(Point::new(x, y))?;
            }
            SessionOp::Click {
                client_x,
                client_y,
                bbox,
            } => {
                self.editor()?.click(Point::new(client_x, client_y), &bbox)?;
            }
            SessionOp::UndoPoint => {
                self.editor()?.undo_point()?;
            }
            SessionOp::Finish => {
                self.editor()?.finish()?;
            }
            SessionOp::Cancel => {
                self.editor()?.cancel();
            }
            SessionOp::DeleteRegion { region } => {
                let editor = self.editor()?;
                // Unknown names are a no-op, like unknown ids.
                if let Some(id) = region_id(editor, &region)? {
                    editor.delete_region(id);
                }
            }
            SessionOp::ToggleVisibility { region } => {
                let editor = self.editor()?;
                let id = region_id(editor, &region)?
                    .ok_or_else(|| CoreError::Validation(format!("No region named '{region}'")))?;
                editor.toggle_visibility(id)?;
            }
            SessionOp::CloseEditor => {
                if self.open.is_none() {
                    return Err(CoreError::Validation("No editor is open".to_string()));
                }
                self.close_editor()?;
            }
            SessionOp::AddSchedule {
                camera,
                position,
                schedule,
            } => {
                let (_, position_id) = self.position_ids(&camera, &position)?;
                let id = self
                    .site_mut(&camera)?
                    .positions
                    .add_schedule(position_id, schedule)?;
                self.report_overlaps(index, &camera, &position, id)?;
            }
            SessionOp::SetScheduleEnabled {
                camera,
                position,
                schedule,
                enabled,
            } => {
                let (_, position_id) = self.position_ids(&camera, &position)?;
                let schedules = self.site_mut(&camera)?.positions.schedules_mut(position_id)?;
                let id = schedules
                    .find_by_name(&schedule)
                    .map(|s| s.id)
                    .ok_or_else(|| {
                        CoreError::Validation(format!("No schedule named '{schedule}'"))
                    })?;
                schedules.set_enabled(id, enabled)?;
                if enabled {
                    self.report_overlaps(index, &camera, &position, id)?;
                }
            }
            SessionOp::DeleteSchedule {
                camera,
                position,
                schedule,
            } => {
                let (_, position_id) = self.position_ids(&camera, &position)?;
                let schedules = self.site_mut(&camera)?.positions.schedules_mut(position_id)?;
                if let Some(id) = schedules.find_by_name(&schedule).map(|s| s.id) {
                    schedules.delete(id);
                }
            }
        }
        Ok(())
    }

    /// Record overlaps between schedule `id` and the other enabled schedules
    /// of the same position.
    fn report_overlaps(
        &mut self,
        index: usize,
        camera: &str,
        position: &str,
        id: EntityId,
    ) -> CoreResult<()> {
        let site = self.site(camera)?;
        let schedules = &lookup_position(site, position)?.schedules;
        let name_of = |sid: EntityId| {
            schedules
                .get(sid)
                .map(|s| s.name.clone())
                .unwrap_or_default()
        };
        let warnings: Vec<OverlapWarning> = schedules
            .overlaps()
            .into_iter()
            .filter(|o| o.first == id || o.second == id)
            .map(|o| OverlapWarning {
                index,
                camera: camera.to_string(),
                position: position.to_string(),
                first: name_of(o.first),
                second: name_of(o.second),
                days: o.days,
            })
            .collect();
        for w in &warnings {
            tracing::warn!(
                index,
                camera,
                position,
                first = %w.first,
                second = %w.second,
                days = w.days.len(),
                "Schedules overlap",
            );
        }
        self.summary.overlaps.extend(warnings);
        Ok(())
    }

    /// Write the open editor's regions back to its position. An in-progress
    /// draft is discarded.
    fn close_editor(&mut self) -> CoreResult<()> {
        let Some(mut open) = self.open.take() else {
            return Ok(());
        };
        let discarded = open.editor.cancel();
        if discarded > 0 {
            tracing::warn!(discarded, "Unfinished drawing discarded when closing the editor");
        }
        let site = self.registry.site_mut(open.camera_id)?;
        site.positions
            .replace_regions(open.position_id, open.editor.into_regions())
    }

    fn editor(&mut self) -> CoreResult<&mut RegionEditor> {
        self.open
            .as_mut()
            .map(|o| &mut o.editor)
            .ok_or_else(|| CoreError::Validation("Open an editor first".to_string()))
    }

    fn site(&self, camera: &str) -> CoreResult<&CameraSite> {
        self.registry
            .find_by_name(camera)
            .ok_or_else(|| CoreError::Validation(format!("No camera named '{camera}'")))
    }

    fn site_mut(&mut self, camera: &str) -> CoreResult<&mut CameraSite> {
        let id = self.camera_id(camera)?;
        self.registry.site_mut(id)
    }

    fn camera_id(&self, camera: &str) -> CoreResult<EntityId> {
        Ok(self.site(camera)?.camera.id)
    }

    fn position_ids(&self, camera: &str, position: &str) -> CoreResult<(EntityId, EntityId)> {
        let site = self.site(camera)?;
        Ok((site.camera.id, lookup_position(site, position)?.id))
    }
}

/// Id of the region called `name`. Region names are not unique, so a name
/// shared by several regions is rejected instead of picking one.
fn region_id(editor: &RegionEditor, name: &str) -> CoreResult<Option<EntityId>> {
    let mut matches = editor.regions().iter().filter(|r| r.name == name);
    match (matches.next(), matches.next()) {
        (Some(_), Some(_)) => Err(CoreError::Validation(format!(
            "Several regions are named '{name}'; rename them to address one"
        ))),
        (found, _) => Ok(found.map(|r| r.id)),
    }
}

fn lookup_position<'a>(site: &'a CameraSite, name: &str) -> CoreResult<&'a CameraPosition> {
    site.positions.find_by_name(name).ok_or_else(|| {
        CoreError::Validation(format!(
            "Camera '{}' has no position named '{name}'",
            site.camera.name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use vigil_core::camera::CameraRegistration;
    use vigil_core::editor::DrawRequest;
    use vigil_core::position::PtzCoordinates;
    use vigil_core::region::RegionKindKey;
    use vigil_core::schedule::ScheduleRequest;

    fn register(name: &str, ptz: bool) -> SessionOp {
        SessionOp::RegisterCamera(CameraRegistration {
            name: name.to_string(),
            location: None,
            stream_url: "rtsp://10.0.0.9/live".to_string(),
            ptz_capable: ptz,
        })
    }

    fn fence() -> SessionOp {
        SessionOp::StartDrawing(DrawRequest::new(
            "Fence",
            RegionKindKey::BoundaryCrossing,
            "red",
        ))
    }

    #[test]
    fn fixed_camera_editor_opens_without_position_name() {
        let ops = vec![
            register("Yard", false),
            SessionOp::OpenEditor {
                camera: "Yard".to_string(),
                position: None,
            },
            fence(),
            SessionOp::point(10.0, 10.0),
            SessionOp::point(90.0, 10.0),
            SessionOp::Finish,
        ];
        let (export, summary) = SessionReplay::new(EditorConfig::overlay()).run(ops);
        assert_eq!(summary.rejected, 0);
        assert_eq!(export.cameras[0].positions[0].regions.len(), 1);
    }

    #[test]
    fn rejected_ops_are_counted_not_fatal() {
        let ops = vec![
            SessionOp::Finish,
            register("Yard", false),
            SessionOp::LockPosition {
                camera: "Yard".to_string(),
                name: "Preset".to_string(),
                ptz: PtzCoordinates::HOME,
            },
            register("Yard", false),
        ];
        let (export, summary) = SessionReplay::new(EditorConfig::overlay()).run(ops);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.rejected, 3);
        assert_eq!(summary.rejections[0].op, "finish");
        assert_eq!(summary.rejections[1].op, "lock_position");
        assert_eq!(summary.rejections[2].index, 3);
        assert_eq!(export.cameras.len(), 1);
    }

    #[test]
    fn deleting_open_position_closes_editor() {
        let mut replay = SessionReplay::new(EditorConfig::overlay());
        let ops = vec![
            register("Dome", true),
            SessionOp::LockPosition {
                camera: "Dome".to_string(),
                name: "Door".to_string(),
                ptz: PtzCoordinates::HOME,
            },
            SessionOp::OpenEditor {
                camera: "Dome".to_string(),
                position: Some("Door".to_string()),
            },
            SessionOp::DeletePosition {
                camera: "Dome".to_string(),
                position: "Door".to_string(),
            },
            fence(),
        ];
        for (i, op) in ops.into_iter().enumerate() {
            replay.step(i, op);
        }
        assert_eq!(replay.summary().rejected, 1);
        assert_eq!(replay.summary().rejections[0].op, "start_drawing");
        assert!(replay.registry().sites()[0].positions.positions().is_empty());
    }

    #[test]
    fn fixed_camera_position_cannot_be_deleted() {
        let ops = vec![
            register("Yard", false),
            SessionOp::DeletePosition {
                camera: "Yard".to_string(),
                position: "Fixed view".to_string(),
            },
            SessionOp::OpenEditor {
                camera: "Yard".to_string(),
                position: None,
            },
        ];
        let (export, summary) = SessionReplay::new(EditorConfig::overlay()).run(ops);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.rejections[0].op, "delete_position");
        assert!(summary.rejections[0].message.contains("fixed camera"));
        assert_eq!(export.cameras[0].positions.len(), 1);
    }

    #[test]
    fn overlapping_schedules_are_reported_not_rejected() {
        let schedule = |name: &str, start: u32, end: u32| SessionOp::AddSchedule {
            camera: "Dome".to_string(),
            position: "Door".to_string(),
            schedule: ScheduleRequest {
                name: name.to_string(),
                start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
                days: vec![DayOfWeek::Monday, DayOfWeek::Tuesday],
                enabled: true,
            },
        };
        let ops = vec![
            register("Dome", true),
            SessionOp::LockPosition {
                camera: "Dome".to_string(),
                name: "Door".to_string(),
                ptz: PtzCoordinates::HOME,
            },
            schedule("Day shift", 8, 18),
            schedule("Evening", 18, 23),
            schedule("Lunch", 12, 14),
        ];
        let (export, summary) = SessionReplay::new(EditorConfig::overlay()).run(ops);
        assert_eq!(summary.rejected, 0);
        assert_eq!(export.cameras[0].positions[0].schedules.len(), 3);

        let [overlap] = summary.overlaps.as_slice() else {
            panic!("expected one overlap, got {:?}", summary.overlaps);
        };
        assert_eq!(overlap.index, 4);
        assert_eq!(overlap.first, "Day shift");
        assert_eq!(overlap.second, "Lunch");
        assert_eq!(
            overlap.days,
            BTreeSet::from([DayOfWeek::Monday, DayOfWeek::Tuesday])
        );
    }

    #[test]
    fn ambiguous_region_names_rejected() {
        let ops = vec![
            register("Yard", false),
            SessionOp::OpenEditor {
                camera: "Yard".to_string(),
                position: None,
            },
            fence(),
            SessionOp::point(10.0, 10.0),
            SessionOp::point(20.0, 10.0),
            SessionOp::Finish,
            fence(),
            SessionOp::point(30.0, 30.0),
            SessionOp::point(40.0, 30.0),
            SessionOp::Finish,
            SessionOp::DeleteRegion {
                region: "Fence".to_string(),
            },
            SessionOp::ToggleVisibility {
                region: "Fence".to_string(),
            },
        ];
        let (export, summary) = SessionReplay::new(EditorConfig::overlay()).run(ops);
        let rejected: Vec<&str> = summary.rejections.iter().map(|r| r.op).collect();
        assert_eq!(rejected, vec!["delete_region", "toggle_visibility"]);
        let regions = &export.cameras[0].positions[0].regions;
        assert_eq!(regions.len(), 2);
        assert!(regions.iter().all(|r| r.visible));
    }
}
