//! `vigil-core` -- camera analytics configuration model.
//!
//! Zero-I/O domain logic shared by the session tooling: frame geometry,
//! analytic regions and the region editor state machine, rendering
//! backends, PTZ positions, activation schedules, camera registration and
//! JSON export.

pub mod camera;
pub mod editor;
pub mod error;
pub mod export;
pub mod geometry;
pub mod position;
pub mod region;
pub mod render;
pub mod schedule;
pub mod types;

pub use error::{CoreError, CoreResult};
