//! Rendering backends for region editors.
//!
//! Backends turn saved regions (and the in-progress draft) into plain draw
//! commands. [`OverlayBackend`] keeps a retained display list keyed by region
//! id and only touches entries that changed; [`CanvasBackend`] clears and
//! redraws the whole frame on every sync.

use std::fmt::Write as _;

use serde::Serialize;

use crate::editor::{Draft, EditorConfig, RegionEditor, RenderMode};
use crate::geometry::{arrowhead, CoordinateSpace, Point};
use crate::region::{Direction, Region};
use crate::types::EntityId;

/// SVG sizes below are tuned for a viewBox of this extent (percent space).
const SVG_REFERENCE_EXTENT: f64 = 100.0;
const SVG_STROKE_WIDTH: f64 = 0.5;
const SVG_FONT_SIZE: f64 = 3.0;

// ---------------------------------------------------------------------------
// Draw commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Wipe the canvas (immediate mode only).
    Clear,
    Polyline {
        points: Vec<Point>,
        color: String,
        dashed: bool,
    },
    Segment {
        from: Point,
        to: Point,
        color: String,
    },
    Label {
        at: Point,
        text: String,
        color: String,
    },
}

/// Counts of display-list changes made by one sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// Strategy interface shared by the overlay and canvas renderers.
pub trait RenderBackend {
    fn mode(&self) -> RenderMode;

    /// Bring the backend in line with the editor's current contents.
    fn sync(&mut self, regions: &[Region], draft: Option<&Draft>) -> SyncStats;

    /// Commands describing what is currently displayed, in paint order.
    fn display_list(&self) -> Vec<DrawCommand>;
}

/// Pick the backend matching an editor configuration.
pub fn backend_for(config: &EditorConfig) -> Box<dyn RenderBackend> {
    match config.render_mode {
        RenderMode::Overlay => Box::new(OverlayBackend::new(config.space)),
        RenderMode::Redraw => Box::new(CanvasBackend::new(config.space)),
    }
}

/// Sync a backend with an editor.
pub fn render(editor: &RegionEditor, backend: &mut dyn RenderBackend) -> SyncStats {
    backend.sync(editor.regions(), editor.draft())
}

// ---------------------------------------------------------------------------
// Shared primitive construction
// ---------------------------------------------------------------------------

fn arrow_commands(points: &[Point], direction: Direction, color: &str) -> Vec<DrawCommand> {
    let Some(head) = arrowhead(points, direction) else {
        return Vec::new();
    };
    vec![
        DrawCommand::Segment {
            from: head.tip,
            to: head.left_wing,
            color: color.to_string(),
        },
        DrawCommand::Segment {
            from: head.tip,
            to: head.right_wing,
            color: color.to_string(),
        },
    ]
}

fn region_commands(region: &Region) -> Vec<DrawCommand> {
    let color = region.color.hex();
    let mut cmds = vec![DrawCommand::Polyline {
        points: region.points.clone(),
        color: color.to_string(),
        dashed: false,
    }];
    if let Some(direction) = region.kind.direction() {
        cmds.extend(arrow_commands(&region.points, direction, color));
    }
    if let Some(first) = region.points.first() {
        cmds.push(DrawCommand::Label {
            at: *first,
            text: region.name.clone(),
            color: color.to_string(),
        });
    }
    cmds
}

fn draft_commands(draft: &Draft) -> Vec<DrawCommand> {
    if draft.points.is_empty() {
        return Vec::new();
    }
    let color = draft.color.hex();
    let mut cmds = vec![DrawCommand::Polyline {
        points: draft.points.clone(),
        color: color.to_string(),
        dashed: true,
    }];
    if let Some(direction) = draft.kind.direction() {
        cmds.extend(arrow_commands(&draft.points, direction, color));
    }
    cmds
}

// ---------------------------------------------------------------------------
// Retained overlay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct OverlayEntry {
    id: EntityId,
    source: Region,
    commands: Vec<DrawCommand>,
}

/// Retained-mode overlay: one display-list entry per visible region.
#[derive(Debug, Clone)]
pub struct OverlayBackend {
    space: CoordinateSpace,
    entries: Vec<OverlayEntry>,
    draft: Vec<DrawCommand>,
}

impl OverlayBackend {
    pub fn new(space: CoordinateSpace) -> Self {
        Self {
            space,
            entries: Vec::new(),
            draft: Vec::new(),
        }
    }

    /// Ids of regions currently in the display list, in paint order.
    pub fn region_ids(&self) -> Vec<EntityId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Render the display list as a standalone SVG document whose viewBox
    /// matches the coordinate space. Stroke and text sizes scale with the
    /// larger side so pixel canvases look like percentage overlays.
    pub fn to_svg(&self) -> String {
        let (w, h) = self.space.extent();
        let scale = w.max(h) / SVG_REFERENCE_EXTENT;
        let stroke = SVG_STROKE_WIDTH * scale;
        let font = SVG_FONT_SIZE * scale;
        let (dash_len, gap_len) = (2.0 * scale, scale);
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {w} {h}\" preserveAspectRatio=\"none\">\n"
        );
        for cmd in self.display_list() {
            // Writing to a String cannot fail.
            let _ = match cmd {
                DrawCommand::Clear => Ok(()),
                DrawCommand::Polyline {
                    points,
                    color,
                    dashed,
                } => {
                    let pts: Vec<String> =
                        points.iter().map(|p| format!("{},{}", p.x, p.y)).collect();
                    let dash = if dashed {
                        format!(" stroke-dasharray=\"{dash_len} {gap_len}\"")
                    } else {
                        String::new()
                    };
                    writeln!(
                        svg,
                        "  <polyline points=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{stroke}\"{dash}/>",
                        pts.join(" ")
                    )
                }
                DrawCommand::Segment { from, to, color } => writeln!(
                    svg,
                    "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{color}\" stroke-width=\"{stroke}\"/>",
                    from.x, from.y, to.x, to.y
                ),
                DrawCommand::Label { at, text, color } => writeln!(
                    svg,
                    "  <text x=\"{}\" y=\"{}\" fill=\"{color}\" font-size=\"{font}\">{}</text>",
                    at.x,
                    at.y,
                    escape_xml(&text)
                ),
            };
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl RenderBackend for OverlayBackend {
    fn mode(&self) -> RenderMode {
        RenderMode::Overlay
    }

    fn sync(&mut self, regions: &[Region], draft: Option<&Draft>) -> SyncStats {
        let mut stats = SyncStats::default();
        let visible: Vec<&Region> = regions.iter().filter(|r| r.visible).collect();

        let before = self.entries.len();
        self.entries
            .retain(|e| visible.iter().any(|r| r.id == e.id));
        stats.removed = before - self.entries.len();

        for region in visible {
            match self.entries.iter_mut().find(|e| e.id == region.id) {
                Some(entry) if entry.source == *region => stats.unchanged += 1,
                Some(entry) => {
                    entry.source = region.clone();
                    entry.commands = region_commands(region);
                    stats.updated += 1;
                }
                None => {
                    self.entries.push(OverlayEntry {
                        id: region.id,
                        source: region.clone(),
                        commands: region_commands(region),
                    });
                    stats.added += 1;
                }
            }
        }

        self.draft = draft.map(draft_commands).unwrap_or_default();
        stats
    }

    fn display_list(&self) -> Vec<DrawCommand> {
        self.entries
            .iter()
            .flat_map(|e| e.commands.iter().cloned())
            .chain(self.draft.iter().cloned())
            .collect()
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Immediate-mode canvas
// ---------------------------------------------------------------------------

/// Immediate-mode canvas: every sync repaints the full frame.
#[derive(Debug, Clone)]
pub struct CanvasBackend {
    space: CoordinateSpace,
    frame: Vec<DrawCommand>,
    frames_drawn: u64,
}

impl CanvasBackend {
    pub fn new(space: CoordinateSpace) -> Self {
        Self {
            space,
            frame: Vec::new(),
            frames_drawn: 0,
        }
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }
}

impl RenderBackend for CanvasBackend {
    fn mode(&self) -> RenderMode {
        RenderMode::Redraw
    }

    fn sync(&mut self, regions: &[Region], draft: Option<&Draft>) -> SyncStats {
        self.frame.clear();
        self.frame.push(DrawCommand::Clear);
        let mut drawn = 0;
        for region in regions.iter().filter(|r| r.visible) {
            self.frame.extend(region_commands(region));
            drawn += 1;
        }
        if let Some(draft) = draft {
            self.frame.extend(draft_commands(draft));
        }
        self.frames_drawn += 1;
        tracing::trace!(regions = drawn, frame = self.frames_drawn, "Canvas redrawn");
        SyncStats {
            added: drawn,
            ..SyncStats::default()
        }
    }

    fn display_list(&self) -> Vec<DrawCommand> {
        self.frame.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::DrawRequest;
    use crate::region::{CountSubject, RegionKindKey};

    fn editor_with_two_regions() -> (RegionEditor, EntityId, EntityId) {
        let mut editor = RegionEditor::default();
        editor
            .start_drawing(DrawRequest::new(
                "Fence",
                RegionKindKey::BoundaryCrossing,
                "red",
            ))
            .unwrap();
        editor.add_point(Point::new(10.0, 10.0)).unwrap();
        editor.add_point(Point::new(90.0, 10.0)).unwrap();
        let fence = editor.finish().unwrap().id;

        editor
            .start_drawing(
                DrawRequest::new("Door", RegionKindKey::FlowCounting, "blue")
                    .with_direction(Direction::LeftToRight)
                    .with_count_subject(CountSubject::People),
            )
            .unwrap();
        editor.add_point(Point::new(20.0, 50.0)).unwrap();
        editor.add_point(Point::new(80.0, 50.0)).unwrap();
        let door = editor.finish().unwrap().id;
        (editor, fence, door)
    }

    fn segments(cmds: &[DrawCommand]) -> usize {
        cmds.iter()
            .filter(|c| matches!(c, DrawCommand::Segment { .. }))
            .count()
    }

    #[test]
    fn overlay_adds_then_reports_unchanged() {
        let (editor, fence, door) = editor_with_two_regions();
        let mut overlay = OverlayBackend::new(CoordinateSpace::Percent);
        let first = render(&editor, &mut overlay);
        assert_eq!(first.added, 2);
        assert_eq!(overlay.region_ids(), vec![fence, door]);

        let second = render(&editor, &mut overlay);
        assert_eq!(
            second,
            SyncStats {
                unchanged: 2,
                ..SyncStats::default()
            }
        );
    }

    #[test]
    fn overlay_drops_hidden_and_deleted_regions() {
        let (mut editor, fence, door) = editor_with_two_regions();
        let mut overlay = OverlayBackend::new(CoordinateSpace::Percent);
        render(&editor, &mut overlay);

        editor.set_visibility(fence, false).unwrap();
        let stats = render(&editor, &mut overlay);
        assert_eq!(stats.removed, 1);
        assert_eq!(overlay.region_ids(), vec![door]);

        editor.delete_region(door);
        render(&editor, &mut overlay);
        assert!(overlay.display_list().is_empty());
    }

    #[test]
    fn overlay_updates_renamed_region() {
        let (mut editor, fence, _) = editor_with_two_regions();
        let mut overlay = OverlayBackend::new(CoordinateSpace::Percent);
        render(&editor, &mut overlay);
        editor.rename_region(fence, "Perimeter").unwrap();
        let stats = render(&editor, &mut overlay);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.unchanged, 1);
        assert!(overlay.display_list().iter().any(
            |c| matches!(c, DrawCommand::Label { text, .. } if text == "Perimeter")
        ));
    }

    #[test]
    fn only_directed_regions_get_arrowheads() {
        let (editor, _, _) = editor_with_two_regions();
        let mut overlay = OverlayBackend::new(CoordinateSpace::Percent);
        render(&editor, &mut overlay);
        assert_eq!(segments(&overlay.display_list()), 2);
    }

    #[test]
    fn draft_is_drawn_dashed() {
        let mut editor = RegionEditor::default();
        editor
            .start_drawing(DrawRequest::new("Wip", RegionKindKey::BoundaryCrossing, "green"))
            .unwrap();
        editor.add_point(Point::new(5.0, 5.0)).unwrap();
        let mut overlay = OverlayBackend::new(CoordinateSpace::Percent);
        render(&editor, &mut overlay);
        assert!(matches!(
            overlay.display_list().as_slice(),
            [DrawCommand::Polyline { dashed: true, .. }]
        ));
    }

    #[test]
    fn canvas_redraws_everything_each_sync() {
        let (editor, _, _) = editor_with_two_regions();
        let mut canvas = CanvasBackend::new(CoordinateSpace::Percent);
        render(&editor, &mut canvas);
        let stats = render(&editor, &mut canvas);
        assert_eq!(stats.added, 2);
        assert_eq!(canvas.frames_drawn(), 2);
        let list = canvas.display_list();
        assert_eq!(list.first(), Some(&DrawCommand::Clear));
        assert_eq!(
            list.iter()
                .filter(|c| matches!(c, DrawCommand::Polyline { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn backend_for_follows_render_mode() {
        assert_eq!(backend_for(&EditorConfig::overlay()).mode(), RenderMode::Overlay);
        assert_eq!(
            backend_for(&EditorConfig::canvas(640, 480)).mode(),
            RenderMode::Redraw
        );
    }

    #[test]
    fn svg_uses_space_extent_and_escapes_labels() {
        let mut editor = RegionEditor::default();
        editor
            .start_drawing(DrawRequest::new(
                "Gate <A>",
                RegionKindKey::BoundaryCrossing,
                "red",
            ))
            .unwrap();
        editor.add_point(Point::new(0.0, 0.0)).unwrap();
        editor.add_point(Point::new(50.0, 50.0)).unwrap();
        editor.finish().unwrap();
        let mut overlay = OverlayBackend::new(CoordinateSpace::Percent);
        render(&editor, &mut overlay);
        let svg = overlay.to_svg();
        assert!(svg.contains("viewBox=\"0 0 100 100\""));
        assert!(svg.contains("Gate &lt;A&gt;"));
        assert!(svg.contains("<polyline points=\"0,0 50,50\""));
        assert!(svg.contains("stroke-width=\"0.5\""));
        assert!(svg.contains("font-size=\"3\""));
    }

    #[test]
    fn svg_sizes_scale_with_pixel_canvas() {
        let space = CoordinateSpace::Pixel {
            width: 1920,
            height: 1080,
        };
        let mut editor = RegionEditor::new(EditorConfig::canvas(1920, 1080));
        editor
            .start_drawing(DrawRequest::new(
                "Kerb",
                RegionKindKey::BoundaryCrossing,
                "red",
            ))
            .unwrap();
        editor.add_point(Point::new(100.0, 100.0)).unwrap();
        editor.add_point(Point::new(900.0, 500.0)).unwrap();
        editor.finish().unwrap();
        let mut overlay = OverlayBackend::new(space);
        render(&editor, &mut overlay);
        let svg = overlay.to_svg();
        assert!(svg.contains("viewBox=\"0 0 1920 1080\""));
        assert!(svg.contains("stroke-width=\"9.6\""));
        assert!(!svg.contains("font-size=\"3\""));
    }
}
