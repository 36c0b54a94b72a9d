//! PTZ position bookkeeping.
//!
//! A PTZ camera stores named pan/tilt/zoom presets. Each locked position owns
//! its analytic regions and activation schedules, so deleting a position
//! removes both. Fixed cameras are modelled as a single implicit position.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::editor::{EditorConfig, RegionEditor};
use crate::error::{CoreError, CoreResult};
use crate::region::Region;
use crate::schedule::{ScheduleRequest, ScheduleSet};
use crate::types::{new_id, EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MIN_PAN: f64 = -180.0;
pub const MAX_PAN: f64 = 180.0;
pub const MIN_TILT: f64 = -90.0;
pub const MAX_TILT: f64 = 90.0;
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 10.0;

/// Name given to the implicit position of a fixed camera.
pub const FIXED_POSITION_NAME: &str = "Fixed view";

/// Maximum length of a position name, in characters.
pub const MAX_POSITION_NAME_LEN: u64 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Pan/tilt in degrees, zoom as a magnification factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct PtzCoordinates {
    #[validate(range(min = MIN_PAN, max = MAX_PAN, message = "pan must be between -180 and 180"))]
    pub pan: f64,
    #[validate(range(min = MIN_TILT, max = MAX_TILT, message = "tilt must be between -90 and 90"))]
    pub tilt: f64,
    #[validate(range(min = MIN_ZOOM, max = MAX_ZOOM, message = "zoom must be between 1 and 10"))]
    pub zoom: f64,
}

impl PtzCoordinates {
    pub const HOME: PtzCoordinates = PtzCoordinates {
        pan: 0.0,
        tilt: 0.0,
        zoom: MIN_ZOOM,
    };

    /// Range check including NaN/infinity, which the derived ranges let through.
    pub fn check(&self) -> CoreResult<()> {
        if ![self.pan, self.tilt, self.zoom].iter().all(|v| v.is_finite()) {
            return Err(CoreError::Validation(
                "pan, tilt and zoom must be finite numbers".to_string(),
            ));
        }
        self.validate()?;
        Ok(())
    }
}

impl Default for PtzCoordinates {
    fn default() -> Self {
        Self::HOME
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPosition {
    pub id: EntityId,
    pub name: String,
    pub ptz: PtzCoordinates,
    pub regions: Vec<Region>,
    pub schedules: ScheduleSet,
    pub locked: bool,
    pub created_at: Timestamp,
}

/// Form input for locking the camera's current view as a named position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LockPositionRequest {
    #[validate(length(min = 1, max = MAX_POSITION_NAME_LEN, message = "position name must be 1-100 characters"))]
    pub name: String,
    #[validate(nested)]
    pub ptz: PtzCoordinates,
    #[serde(default)]
    pub regions: Vec<Region>,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Positions of one camera, plus the editor layout used for their regions.
#[derive(Debug, Clone, Serialize)]
pub struct CameraPositionManager {
    #[serde(skip)]
    editor_config: EditorConfig,
    /// Non-PTZ camera: exactly one locked home position, never moved or removed.
    #[serde(skip)]
    fixed: bool,
    positions: Vec<CameraPosition>,
}

impl CameraPositionManager {
    pub fn new(editor_config: EditorConfig) -> Self {
        Self {
            editor_config,
            fixed: false,
            positions: Vec::new(),
        }
    }

    /// Manager for a non-PTZ camera: one implicit, locked home position.
    pub fn fixed(editor_config: EditorConfig, regions: Vec<Region>) -> CoreResult<Self> {
        let mut manager = Self::new(editor_config);
        manager.lock_position(LockPositionRequest {
            name: FIXED_POSITION_NAME.to_string(),
            ptz: PtzCoordinates::HOME,
            regions,
        })?;
        manager.fixed = true;
        Ok(manager)
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn editor_config(&self) -> &EditorConfig {
        &self.editor_config
    }

    pub fn positions(&self) -> &[CameraPosition] {
        &self.positions
    }

    pub fn position(&self, id: EntityId) -> Option<&CameraPosition> {
        self.positions.iter().find(|p| p.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&CameraPosition> {
        self.positions.iter().find(|p| p.name == name)
    }

    pub fn into_positions(self) -> Vec<CameraPosition> {
        self.positions
    }

    /// Store the current view as a new locked position.
    pub fn lock_position(&mut self, request: LockPositionRequest) -> CoreResult<&CameraPosition> {
        self.ensure_ptz("add positions to")?;
        if request.name.trim().is_empty() {
            return Err(CoreError::Validation(
                "Position name must not be empty".to_string(),
            ));
        }
        request.ptz.check()?;
        request.validate()?;
        for region in &request.regions {
            region.validate(&self.editor_config.space)?;
        }

        let position = CameraPosition {
            id: new_id(),
            name: request.name.trim().to_string(),
            ptz: request.ptz,
            regions: request.regions,
            schedules: ScheduleSet::new(),
            locked: true,
            created_at: chrono::Utc::now(),
        };
        tracing::info!(
            position_id = %position.id,
            name = %position.name,
            pan = position.ptz.pan,
            tilt = position.ptz.tilt,
            zoom = position.ptz.zoom,
            regions = position.regions.len(),
            "PTZ position locked",
        );
        self.positions.push(position);
        let idx = self.positions.len() - 1;
        Ok(&self.positions[idx])
    }

    /// Remove a position together with its regions and schedules.
    /// Unknown ids are a no-op (`Ok(None)`).
    pub fn delete_position(&mut self, id: EntityId) -> CoreResult<Option<CameraPosition>> {
        self.ensure_ptz("delete the position of")?;
        let Some(idx) = self.positions.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let removed = self.positions.remove(idx);
        tracing::info!(
            position_id = %id,
            regions = removed.regions.len(),
            schedules = removed.schedules.len(),
            "PTZ position deleted",
        );
        Ok(Some(removed))
    }

    pub fn set_locked(&mut self, id: EntityId, locked: bool) -> CoreResult<()> {
        if !locked {
            self.ensure_ptz("unlock the position of")?;
        }
        self.position_mut(id)?.locked = locked;
        Ok(())
    }

    /// Move an unlocked position to new coordinates.
    pub fn move_position(&mut self, id: EntityId, ptz: PtzCoordinates) -> CoreResult<()> {
        ptz.check()?;
        let position = self.position_mut(id)?;
        if position.locked {
            return Err(CoreError::Conflict(format!(
                "Position '{}' is locked; unlock it before moving",
                position.name
            )));
        }
        position.ptz = ptz;
        Ok(())
    }

    /// Editor pre-loaded with a position's regions.
    pub fn edit_regions(&self, id: EntityId) -> CoreResult<RegionEditor> {
        let position = self.position(id).ok_or(CoreError::NotFound {
            entity: "position",
            id,
        })?;
        RegionEditor::with_regions(self.editor_config, position.regions.clone())
    }

    /// Replace a position's regions, e.g. with the result of an editor session.
    pub fn replace_regions(&mut self, id: EntityId, regions: Vec<Region>) -> CoreResult<()> {
        let space = self.editor_config.space;
        for region in &regions {
            region.validate(&space)?;
        }
        self.position_mut(id)?.regions = regions;
        Ok(())
    }

    /// Schedules of a position, for CRUD through [`ScheduleSet`].
    pub fn schedules_mut(&mut self, id: EntityId) -> CoreResult<&mut ScheduleSet> {
        Ok(&mut self.position_mut(id)?.schedules)
    }

    /// Shorthand for adding one schedule to a position.
    pub fn add_schedule(&mut self, id: EntityId, request: ScheduleRequest) -> CoreResult<EntityId> {
        Ok(self.schedules_mut(id)?.add(request)?.id)
    }

    fn ensure_ptz(&self, action: &str) -> CoreResult<()> {
        if self.fixed {
            return Err(CoreError::Conflict(format!(
                "Cannot {action} a fixed camera; it has a single implicit position"
            )));
        }
        Ok(())
    }

    fn position_mut(&mut self, id: EntityId) -> CoreResult<&mut CameraPosition> {
        self.positions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(CoreError::NotFound {
                entity: "position",
                id,
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
