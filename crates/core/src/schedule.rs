//! Activation schedules for PTZ positions.
//!
//! A schedule is a daily time window on a set of weekdays. Overlapping
//! schedules and windows whose end precedes their start are both accepted;
//! the latter is read as a window running past midnight into the next day.
//! [`ScheduleSet::overlaps`] reports conflicts without rejecting them.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{new_id, EntityId};

/// Maximum length of a schedule name, in characters.
pub const MAX_SCHEDULE_NAME_LEN: usize = 100;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Weekday
// ---------------------------------------------------------------------------

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % 7]
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(day: chrono::Weekday) -> Self {
        Self::ALL[day.num_days_from_monday() as usize]
    }
}

/// `HH:MM` time-of-day serialization, also accepting `HH:MM:SS` on input.
pub mod time_hm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| format!("Invalid time '{raw}'. Expected HH:MM"))
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: EntityId,
    pub name: String,
    #[serde(with = "time_hm")]
    pub start_time: NaiveTime,
    #[serde(with = "time_hm")]
    pub end_time: NaiveTime,
    pub days: BTreeSet<DayOfWeek>,
    pub enabled: bool,
}

impl Schedule {
    /// Whether the window ends on the following day.
    pub fn is_overnight(&self) -> bool {
        self.end_time < self.start_time
    }

    /// Active windows as `(day, start_sec, end_sec)` with `end_sec` exclusive.
    ///
    /// Equal start and end times cover the whole day.
    fn windows(&self) -> Vec<(DayOfWeek, u32, u32)> {
        let start = self.start_time.num_seconds_from_midnight();
        let end = self.end_time.num_seconds_from_midnight();
        let mut out = Vec::new();
        for &day in &self.days {
            if start == end {
                out.push((day, 0, SECONDS_PER_DAY));
            } else if start < end {
                out.push((day, start, end));
            } else {
                out.push((day, start, SECONDS_PER_DAY));
                if end > 0 {
                    out.push((day.next(), 0, end));
                }
            }
        }
        out
    }

    /// Whether the schedule covers `time` on `day`. Disabled schedules never do.
    pub fn is_active_at(&self, day: DayOfWeek, time: NaiveTime) -> bool {
        if !self.enabled {
            return false;
        }
        let t = time.num_seconds_from_midnight();
        self.windows()
            .into_iter()
            .any(|(d, start, end)| d == day && t >= start && t < end)
    }
}

/// Form input for a new schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub name: String,
    #[serde(with = "time_hm")]
    pub start_time: NaiveTime,
    #[serde(with = "time_hm")]
    pub end_time: NaiveTime,
    pub days: Vec<DayOfWeek>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Two enabled schedules whose windows intersect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleOverlap {
    pub first: EntityId,
    pub second: EntityId,
    pub days: BTreeSet<DayOfWeek>,
}

// ---------------------------------------------------------------------------
// Schedule set
// ---------------------------------------------------------------------------

/// Schedules attached to one camera position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleSet {
    items: Vec<Schedule>,
}

impl ScheduleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[Schedule] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Schedule> {
        self.items.iter().find(|s| s.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Schedule> {
        self.items.iter().find(|s| s.name == name)
    }

    /// Add a schedule. At least one day must be selected.
    pub fn add(&mut self, request: ScheduleRequest) -> CoreResult<&Schedule> {
        if request.days.is_empty() {
            return Err(CoreError::Validation(
                "Select at least one day for the schedule".to_string(),
            ));
        }
        let name = request.name.trim().to_string();
        if name.chars().count() > MAX_SCHEDULE_NAME_LEN {
            return Err(CoreError::Validation(format!(
                "Schedule name too long (max {MAX_SCHEDULE_NAME_LEN} chars)"
            )));
        }
        let schedule = Schedule {
            id: new_id(),
            name,
            start_time: request.start_time,
            end_time: request.end_time,
            days: request.days.into_iter().collect(),
            enabled: request.enabled,
        };
        tracing::info!(
            schedule_id = %schedule.id,
            name = %schedule.name,
            days = schedule.days.len(),
            overnight = schedule.is_overnight(),
            "Schedule added",
        );
        self.items.push(schedule);
        let idx = self.items.len() - 1;
        Ok(&self.items[idx])
    }

    pub fn set_enabled(&mut self, id: EntityId, enabled: bool) -> CoreResult<()> {
        let schedule = self
            .items
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(CoreError::NotFound {
                entity: "schedule",
                id,
            })?;
        schedule.enabled = enabled;
        Ok(())
    }

    /// Remove a schedule. Unknown ids are a no-op.
    pub fn delete(&mut self, id: EntityId) -> Option<Schedule> {
        let idx = self.items.iter().position(|s| s.id == id)?;
        Some(self.items.remove(idx))
    }

    /// Enabled schedules covering the given moment.
    pub fn active_at(&self, at: NaiveDateTime) -> Vec<&Schedule> {
        let day = DayOfWeek::from(at.weekday());
        let time = at.time();
        self.items
            .iter()
            .filter(|s| s.is_active_at(day, time))
            .collect()
    }

    /// Pairs of enabled schedules whose windows intersect, with the days on
    /// which they do.
    pub fn overlaps(&self) -> Vec<ScheduleOverlap> {
        let enabled: Vec<(&Schedule, Vec<(DayOfWeek, u32, u32)>)> = self
            .items
            .iter()
            .filter(|s| s.enabled)
            .map(|s| (s, s.windows()))
            .collect();

        let mut out = Vec::new();
        for (i, (a, a_windows)) in enabled.iter().enumerate() {
            for (b, b_windows) in &enabled[i + 1..] {
                let days: BTreeSet<DayOfWeek> = a_windows
                    .iter()
                    .flat_map(move |wa| b_windows.iter().map(move |wb| (wa, wb)))
                    .filter(|((da, sa, ea), (db, sb, eb))| da == db && sa < eb && sb < ea)
                    .map(|((day, _, _), _)| *day)
                    .collect();
                if !days.is_empty() {
                    out.push(ScheduleOverlap {
                        first: a.id,
                        second: b.id,
                        days,
                    });
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
