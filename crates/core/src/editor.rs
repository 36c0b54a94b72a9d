//! Region editor state machine.
//!
//! One editor instance owns the regions drawn over a single reference frame.
//! It is either `Idle` or `Drawing` a draft; points are appended while
//! drawing and the draft becomes a [`Region`] on `finish`.
//!
//! ```text
//!  Idle --start_drawing--> Drawing --add_point--> Drawing
//!   ^                        |   |
//!   +--------finish (>=2)----+   |
//!   +--------cancel--------------+
//! ```
//!
//! All rejected operations return [`CoreError::Validation`] or
//! [`CoreError::Conflict`] and leave the editor untouched.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::geometry::{BoundingBox, CoordinateSpace, Point};
use crate::region::{
    validate_point_count, validate_region_name, CountSubject, Direction, Region, RegionColor,
    RegionKind, RegionKindKey, SEGMENT_POINTS,
};
use crate::types::{new_id, EntityId};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How many points a region drawn in this editor may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCap {
    /// Free polyline.
    Unbounded,
    /// Exactly two points.
    Segment,
}

impl PointCap {
    fn limit(&self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Segment => Some(SEGMENT_POINTS),
        }
    }
}

/// Rendering backend the editor is paired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Retained-mode overlay (SVG-like display list).
    Overlay,
    /// Immediate-mode canvas, fully redrawn on every change.
    Redraw,
}

/// Editor variant selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    pub point_cap: PointCap,
    pub space: CoordinateSpace,
    pub render_mode: RenderMode,
}

impl EditorConfig {
    /// Free polylines in percentage space over a retained overlay.
    pub fn overlay() -> Self {
        Self {
            point_cap: PointCap::Unbounded,
            space: CoordinateSpace::Percent,
            render_mode: RenderMode::Overlay,
        }
    }

    /// Free polylines in pixel space on a fixed-size canvas.
    pub fn canvas(width: u32, height: u32) -> Self {
        Self {
            point_cap: PointCap::Unbounded,
            space: CoordinateSpace::Pixel { width, height },
            render_mode: RenderMode::Redraw,
        }
    }

    /// Two-point counting lines in percentage space.
    pub fn counting_line() -> Self {
        Self {
            point_cap: PointCap::Segment,
            ..Self::overlay()
        }
    }

    pub fn builder() -> EditorConfigBuilder {
        EditorConfigBuilder {
            config: Self::overlay(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::overlay()
    }
}

/// Builder for [`EditorConfig`], starting from [`EditorConfig::overlay`].
#[derive(Debug, Clone)]
pub struct EditorConfigBuilder {
    config: EditorConfig,
}

impl EditorConfigBuilder {
    pub fn point_cap(mut self, cap: PointCap) -> Self {
        self.config.point_cap = cap;
        self
    }

    pub fn space(mut self, space: CoordinateSpace) -> Self {
        self.config.space = space;
        self
    }

    pub fn render_mode(mut self, mode: RenderMode) -> Self {
        self.config.render_mode = mode;
        self
    }

    pub fn build(self) -> CoreResult<EditorConfig> {
        self.config.space.validate()?;
        Ok(self.config)
    }
}

// ---------------------------------------------------------------------------
// Draw request (form input)
// ---------------------------------------------------------------------------

/// Form input that starts a new drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRequest {
    pub name: String,
    pub kind: RegionKindKey,
    pub color: String,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub count_subject: Option<CountSubject>,
}

impl DrawRequest {
    pub fn new(name: impl Into<String>, kind: RegionKindKey, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            color: color.into(),
            direction: None,
            count_subject: None,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_count_subject(mut self, subject: CountSubject) -> Self {
        self.count_subject = Some(subject);
        self
    }

    fn into_draft(self) -> CoreResult<Draft> {
        validate_region_name(&self.name)?;
        let color = RegionColor::parse(&self.color)?;
        let kind = self.kind.with_metadata(self.direction, self.count_subject)?;
        Ok(Draft {
            name: self.name.trim().to_string(),
            kind,
            color,
            points: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// A region being drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub name: String,
    pub kind: RegionKind,
    pub color: RegionColor,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditorState {
    #[default]
    Idle,
    Drawing(Draft),
}

impl EditorState {
    pub fn is_drawing(&self) -> bool {
        matches!(self, Self::Drawing(_))
    }
}

/// Notification emitted to the owning layer after each committed change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditorEvent {
    RegionCreated { region: Region },
    RegionUpdated { region: Region },
    RegionDeleted { id: EntityId },
    DrawingCancelled { discarded_points: usize },
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RegionEditor {
    config: EditorConfig,
    state: EditorState,
    regions: Vec<Region>,
    events: Vec<EditorEvent>,
}

impl RegionEditor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            state: EditorState::Idle,
            regions: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Editor pre-populated with regions, e.g. a locked PTZ position.
    ///
    /// Every region is validated against the editor's coordinate space.
    pub fn with_regions(config: EditorConfig, regions: Vec<Region>) -> CoreResult<Self> {
        for region in &regions {
            region.validate(&config.space)?;
        }
        Ok(Self {
            regions,
            ..Self::new(config)
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: EntityId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Points buffered by the current drawing (empty when idle).
    pub fn draft_points(&self) -> &[Point] {
        match &self.state {
            EditorState::Drawing(draft) => &draft.points,
            EditorState::Idle => &[],
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        match &self.state {
            EditorState::Drawing(draft) => Some(draft),
            EditorState::Idle => None,
        }
    }

    /// Drain pending change notifications.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Consume the editor, returning its saved regions.
    pub fn into_regions(self) -> Vec<Region> {
        self.regions
    }

    // -- drawing -----------------------------------------------------------

    /// Enter `Drawing` with an empty point buffer.
    pub fn start_drawing(&mut self, request: DrawRequest) -> CoreResult<()> {
        if let EditorState::Drawing(draft) = &self.state {
            return Err(CoreError::Conflict(format!(
                "Region '{}' is still being drawn; finish or cancel it first",
                draft.name
            )));
        }
        let draft = request.into_draft()?;
        tracing::debug!(name = %draft.name, kind = %draft.kind.key(), "Started drawing region");
        self.state = EditorState::Drawing(draft);
        Ok(())
    }

    /// Append a point to the draft. Returns the new buffer length.
    pub fn add_point(&mut self, point: Point) -> CoreResult<usize> {
        let cap = self.draft_cap();
        let space = self.config.space;
        let EditorState::Drawing(draft) = &mut self.state else {
            return Err(CoreError::Validation(
                "Start drawing a region before adding points".to_string(),
            ));
        };
        space.validate_point(point)?;
        if let Some(limit) = cap.filter(|&limit| draft.points.len() >= limit) {
            return Err(CoreError::Validation(format!(
                "Region '{}' already has the maximum of {limit} points",
                draft.name
            )));
        }
        draft.points.push(point);
        tracing::debug!(x = point.x, y = point.y, count = draft.points.len(), "Added point");
        Ok(draft.points.len())
    }

    /// Map a pointer click against the current frame box and add the point.
    ///
    /// The box is taken per call since the frame may have been resized.
    pub fn click(&mut self, client: Point, bbox: &BoundingBox) -> CoreResult<usize> {
        if !self.state.is_drawing() {
            return Err(CoreError::Validation(
                "Start drawing a region before adding points".to_string(),
            ));
        }
        let point = self.config.space.map_client(client, bbox)?;
        self.add_point(point)
    }

    /// Drop the most recently added point. Returns the new buffer length.
    pub fn undo_point(&mut self) -> CoreResult<usize> {
        let EditorState::Drawing(draft) = &mut self.state else {
            return Err(CoreError::Validation("No region is being drawn".to_string()));
        };
        if draft.points.pop().is_none() {
            return Err(CoreError::Validation("No points to undo".to_string()));
        }
        Ok(draft.points.len())
    }

    /// Save the draft as a new region and return to `Idle`.
    ///
    /// With too few points the editor stays in `Drawing` with its buffer
    /// intact.
    pub fn finish(&mut self) -> CoreResult<&Region> {
        let cap = self.draft_cap();
        let EditorState::Drawing(draft) = &self.state else {
            return Err(CoreError::Validation("No region is being drawn".to_string()));
        };
        validate_point_count(draft.points.len(), cap)?;

        let EditorState::Drawing(draft) = std::mem::take(&mut self.state) else {
            return Err(CoreError::Internal("editor state changed during finish".to_string()));
        };
        let region = Region {
            id: new_id(),
            name: draft.name,
            kind: draft.kind,
            points: draft.points,
            color: draft.color,
            visible: true,
            created_at: chrono::Utc::now(),
        };
        tracing::info!(
            region_id = %region.id,
            name = %region.name,
            kind = %region.kind.key(),
            points = region.points.len(),
            "Region saved",
        );
        self.events.push(EditorEvent::RegionCreated {
            region: region.clone(),
        });
        self.regions.push(region);
        let idx = self.regions.len() - 1;
        Ok(&self.regions[idx])
    }

    /// Abandon the draft. Always succeeds; returns the discarded point count.
    pub fn cancel(&mut self) -> usize {
        match std::mem::take(&mut self.state) {
            EditorState::Drawing(draft) => {
                let discarded_points = draft.points.len();
                tracing::debug!(name = %draft.name, discarded_points, "Drawing cancelled");
                self.events
                    .push(EditorEvent::DrawingCancelled { discarded_points });
                discarded_points
            }
            EditorState::Idle => 0,
        }
    }

    // -- saved regions -----------------------------------------------------

    /// Remove the region with `id`. Unknown ids are a no-op.
    pub fn delete_region(&mut self, id: EntityId) -> Option<Region> {
        let idx = self.regions.iter().position(|r| r.id == id)?;
        let removed = self.regions.remove(idx);
        tracing::info!(region_id = %id, name = %removed.name, "Region deleted");
        self.events.push(EditorEvent::RegionDeleted { id });
        Some(removed)
    }

    /// Remove every saved region, returning how many were removed.
    pub fn clear_regions(&mut self) -> usize {
        let removed: Vec<Region> = std::mem::take(&mut self.regions);
        for region in &removed {
            self.events.push(EditorEvent::RegionDeleted { id: region.id });
        }
        tracing::info!(count = removed.len(), "Regions cleared");
        removed.len()
    }

    pub fn set_visibility(&mut self, id: EntityId, visible: bool) -> CoreResult<()> {
        self.update_region(id, |r| {
            r.visible = visible;
            Ok(())
        })
    }

    /// Flip visibility, returning the new value.
    pub fn toggle_visibility(&mut self, id: EntityId) -> CoreResult<bool> {
        let mut visible = false;
        self.update_region(id, |r| {
            r.visible = !r.visible;
            visible = r.visible;
            Ok(())
        })?;
        Ok(visible)
    }

    pub fn rename_region(&mut self, id: EntityId, name: &str) -> CoreResult<()> {
        validate_region_name(name)?;
        let name = name.trim().to_string();
        self.update_region(id, |r| {
            r.name = name;
            Ok(())
        })
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    // -- helpers -----------------------------------------------------------

    /// Effective point cap of the current draft: the tighter of the editor's
    /// cap and the kind's own cap.
    fn draft_cap(&self) -> Option<usize> {
        let kind_cap = self.draft().and_then(|d| d.kind.point_cap());
        match (self.config.point_cap.limit(), kind_cap) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn update_region<F>(&mut self, id: EntityId, apply: F) -> CoreResult<()>
    where
        F: FnOnce(&mut Region) -> CoreResult<()>,
    {
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(CoreError::NotFound {
                entity: "region",
                id,
            })?;
        apply(region)?;
        self.events.push(EditorEvent::RegionUpdated {
            region: region.clone(),
        });
        Ok(())
    }
}

impl Default for RegionEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
