//! Session script format.
//!
//! A session is a JSON array of operator actions, each tagged by `"op"`.
//! Cameras, positions, regions and schedules are addressed by name since
//! their ids are only assigned during replay. Region names need not be
//! unique; an operation naming a region shared by several is rejected.

use serde::{Deserialize, Serialize};

use vigil_core::camera::CameraRegistration;
use vigil_core::editor::DrawRequest;
use vigil_core::geometry::{BoundingBox, Point};
use vigil_core::position::PtzCoordinates;
use vigil_core::schedule::ScheduleRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SessionOp {
    RegisterCamera(CameraRegistration),
    RemoveCamera {
        camera: String,
    },
    LockPosition {
        camera: String,
        name: String,
        #[serde(flatten)]
        ptz: PtzCoordinates,
    },
    UnlockPosition {
        camera: String,
        position: String,
    },
    MovePosition {
        camera: String,
        position: String,
        #[serde(flatten)]
        ptz: PtzCoordinates,
    },
    DeletePosition {
        camera: String,
        position: String,
    },
    /// Open the region editor on a position. `position` may be omitted for
    /// fixed cameras.
    OpenEditor {
        camera: String,
        #[serde(default)]
        position: Option<String>,
    },
    StartDrawing(DrawRequest),
    AddPoint {
        x: f64,
        y: f64,
    },
    Click {
        client_x: f64,
        client_y: f64,
        bbox: BoundingBox,
    },
    UndoPoint,
    Finish,
    Cancel,
    DeleteRegion {
        region: String,
    },
    ToggleVisibility {
        region: String,
    },
    /// Commit the open editor's regions back to its position.
    CloseEditor,
    AddSchedule {
        camera: String,
        position: String,
        #[serde(flatten)]
        schedule: ScheduleRequest,
    },
    SetScheduleEnabled {
        camera: String,
        position: String,
        schedule: String,
        enabled: bool,
    },
    DeleteSchedule {
        camera: String,
        position: String,
        schedule: String,
    },
}

impl SessionOp {
    /// The `op` tag, for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterCamera(_) => "register_camera",
            Self::RemoveCamera { .. } => "remove_camera",
            Self::LockPosition { .. } => "lock_position",
            Self::UnlockPosition { .. } => "unlock_position",
            Self::MovePosition { .. } => "move_position",
            Self::DeletePosition { .. } => "delete_position",
            Self::OpenEditor { .. } => "open_editor",
            Self::StartDrawing(_) => "start_drawing",
            Self::AddPoint { .. } => "add_point",
            Self::Click { .. } => "click",
            Self::UndoPoint => "undo_point",
            Self::Finish => "finish",
            Self::Cancel => "cancel",
            Self::DeleteRegion { .. } => "delete_region",
            Self::ToggleVisibility { .. } => "toggle_visibility",
            Self::CloseEditor => "close_editor",
            Self::AddSchedule { .. } => "add_schedule",
            Self::SetScheduleEnabled { .. } => "set_schedule_enabled",
            Self::DeleteSchedule { .. } => "delete_schedule",
        }
    }

    pub fn point(x: f64, y: f64) -> Self {
        Self::AddPoint { x, y }
    }

    pub fn click(client: Point, bbox: BoundingBox) -> Self {
        Self::Click {
            client_x: client.x,
            client_y: client.y,
            bbox,
        }
    }
}

/// Parse a session script.
pub fn parse_session(json: &str) -> Result<Vec<SessionOp>, serde_json::Error> {
    serde_json::from_str(json)
}
