//! Analytic regions drawn over camera frames.
//!
//! A region is a named polyline (or two-point segment) with kind-specific
//! metadata. The metadata is a tagged union so that, for instance, a
//! boundary-crossing region can never carry a count subject.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geometry::{CoordinateSpace, Point};
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a region name, in characters.
pub const MAX_REGION_NAME_LEN: usize = 100;

/// Minimum number of points a saved region must have.
pub const MIN_REGION_POINTS: usize = 2;

/// Exact number of points of a flow-counting segment.
pub const SEGMENT_POINTS: usize = 2;

// ---------------------------------------------------------------------------
// Direction / count subject
// ---------------------------------------------------------------------------

/// Travel direction used to orient the arrowhead and the counting semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
    /// Coarse horizontal direction used by some configuration screens.
    Horizontal,
    /// Coarse vertical direction used by some configuration screens.
    Vertical,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeftToRight => "left-to-right",
            Self::RightToLeft => "right-to-left",
            Self::TopToBottom => "top-to-bottom",
            Self::BottomToTop => "bottom-to-top",
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

/// What a flow-counting line counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountSubject {
    People,
    Vehicles,
    Objects,
}

// ---------------------------------------------------------------------------
// Region kind
// ---------------------------------------------------------------------------

/// Region kind together with the metadata that kind requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RegionKind {
    /// Flags entry into or out of a restricted area. Free polyline.
    BoundaryCrossing,
    /// Counts subjects crossing a two-point line in one direction.
    FlowCounting {
        direction: Direction,
        count_subject: CountSubject,
    },
    /// Flags subjects lingering inside a zone. Free polyline.
    LoiteringZone { direction: Direction },
}

impl RegionKind {
    pub fn key(&self) -> RegionKindKey {
        match self {
            Self::BoundaryCrossing => RegionKindKey::BoundaryCrossing,
            Self::FlowCounting { .. } => RegionKindKey::FlowCounting,
            Self::LoiteringZone { .. } => RegionKindKey::LoiteringZone,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match *self {
            Self::BoundaryCrossing => None,
            Self::FlowCounting { direction, .. } | Self::LoiteringZone { direction } => {
                Some(direction)
            }
        }
    }

    pub fn count_subject(&self) -> Option<CountSubject> {
        match *self {
            Self::FlowCounting { count_subject, .. } => Some(count_subject),
            _ => None,
        }
    }

    /// Point cap imposed by the kind itself (`None` = unbounded polyline).
    pub fn point_cap(&self) -> Option<usize> {
        match self {
            Self::FlowCounting { .. } => Some(SEGMENT_POINTS),
            _ => None,
        }
    }
}

/// Bare kind discriminant, as selected in a form before metadata is filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKindKey {
    BoundaryCrossing,
    FlowCounting,
    LoiteringZone,
}

const VALID_KIND_STRINGS: &[&str] = &["boundary-crossing", "flow-counting", "loitering-zone"];

impl RegionKindKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoundaryCrossing => "boundary-crossing",
            Self::FlowCounting => "flow-counting",
            Self::LoiteringZone => "loitering-zone",
        }
    }

    /// Parse a kind from its kebab-case name.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "boundary-crossing" => Ok(Self::BoundaryCrossing),
            "flow-counting" => Ok(Self::FlowCounting),
            "loitering-zone" => Ok(Self::LoiteringZone),
            _ => Err(CoreError::Validation(format!(
                "Invalid region kind '{s}'. Must be one of: {}",
                VALID_KIND_STRINGS.join(", ")
            ))),
        }
    }

    /// Attach form metadata to the kind, rejecting missing required fields.
    ///
    /// Fields a kind does not use are ignored rather than rejected, matching
    /// forms that keep stale selections in hidden inputs.
    pub fn with_metadata(
        self,
        direction: Option<Direction>,
        count_subject: Option<CountSubject>,
    ) -> Result<RegionKind, CoreError> {
        match self {
            Self::BoundaryCrossing => Ok(RegionKind::BoundaryCrossing),
            Self::FlowCounting => {
                let direction = direction.ok_or_else(|| {
                    CoreError::Validation("Flow-counting regions require a direction".to_string())
                })?;
                let count_subject = count_subject.ok_or_else(|| {
                    CoreError::Validation(
                        "Flow-counting regions require a count subject".to_string(),
                    )
                })?;
                Ok(RegionKind::FlowCounting {
                    direction,
                    count_subject,
                })
            }
            Self::LoiteringZone => {
                let direction = direction.ok_or_else(|| {
                    CoreError::Validation("Loitering zones require a direction".to_string())
                })?;
                Ok(RegionKind::LoiteringZone { direction })
            }
        }
    }
}

impl fmt::Display for RegionKindKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// Fixed colour palette offered by the region forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

impl PaletteColor {
    pub const ALL: [PaletteColor; 6] = [
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Purple,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Purple => "purple",
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            Self::Red => "#ef4444",
            Self::Orange => "#f97316",
            Self::Yellow => "#eab308",
            Self::Green => "#22c55e",
            Self::Blue => "#3b82f6",
            Self::Purple => "#a855f7",
        }
    }
}

/// Rendering colour of a region: a palette entry or a free-form hex colour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RegionColor {
    Palette(PaletteColor),
    Custom(String),
}

impl RegionColor {
    /// Parse a palette name (`"red"`) or a `#RRGGBB` / `#RRGGBBAA` colour.
    ///
    /// Hex colours equal to a palette entry collapse to that entry.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        if let Some(entry) = PaletteColor::ALL
            .iter()
            .find(|c| c.name() == s || c.hex().eq_ignore_ascii_case(s))
        {
            return Ok(Self::Palette(*entry));
        }
        validate_color_hex(s)?;
        Ok(Self::Custom(s.to_ascii_lowercase()))
    }

    pub fn hex(&self) -> &str {
        match self {
            Self::Palette(c) => c.hex(),
            Self::Custom(hex) => hex,
        }
    }
}

impl Default for RegionColor {
    fn default() -> Self {
        Self::Palette(PaletteColor::Red)
    }
}

impl From<PaletteColor> for RegionColor {
    fn from(c: PaletteColor) -> Self {
        Self::Palette(c)
    }
}

impl TryFrom<String> for RegionColor {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RegionColor> for String {
    fn from(c: RegionColor) -> Self {
        c.hex().to_string()
    }
}

/// Validate that a color string matches `#RRGGBB` or `#RRGGBBAA` hex format.
pub fn validate_color_hex(color: &str) -> Result<(), CoreError> {
    if color.len() != 7 && color.len() != 9 {
        return Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Must be a palette name or #RRGGBB / #RRGGBBAA hex"
        )));
    }
    let Some(hex_part) = color.strip_prefix('#') else {
        return Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Must start with '#'"
        )));
    };
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Must contain only hex digits after '#'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// A saved analytic region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: EntityId,
    pub name: String,
    #[serde(flatten)]
    pub kind: RegionKind,
    pub points: Vec<Point>,
    pub color: RegionColor,
    #[serde(default = "default_visible")]
    pub visible: bool,
    pub created_at: Timestamp,
}

fn default_visible() -> bool {
    true
}

impl Region {
    /// Check the invariants of a saved region against a coordinate space.
    pub fn validate(&self, space: &CoordinateSpace) -> Result<(), CoreError> {
        validate_region_name(&self.name)?;
        validate_point_count(self.points.len(), self.kind.point_cap())?;
        for p in &self.points {
            space.validate_point(*p)?;
        }
        Ok(())
    }
}

/// Validate a region name: non-blank and within the length limit.
pub fn validate_region_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Region name must not be empty".to_string(),
        ));
    }
    let len = name.chars().count();
    if len > MAX_REGION_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Region name too long: {len} chars (max {MAX_REGION_NAME_LEN})"
        )));
    }
    Ok(())
}

/// Validate the number of points of a finished region.
///
/// `cap` of `Some(n)` requires exactly `n` points.
pub fn validate_point_count(count: usize, cap: Option<usize>) -> Result<(), CoreError> {
    if count < MIN_REGION_POINTS {
        return Err(CoreError::Validation(format!(
            "A region needs at least {MIN_REGION_POINTS} points, got {count}"
        )));
    }
    match cap {
        Some(exact) if count != exact => Err(CoreError::Validation(format!(
            "This region must have exactly {exact} points, got {count}"
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
