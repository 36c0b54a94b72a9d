//! Session replay tool for camera region configuration.
//!
//! Reads a JSON script of operator actions, applies it to a fresh camera
//! registry and writes the resulting site export. Modules are public so the
//! integration tests can drive them directly.

pub mod config;
pub mod replay;
pub mod session;

use std::fs;
use std::path::Path;

use anyhow::Context;

use vigil_core::editor::RegionEditor;
use vigil_core::export::{to_json, SiteExport};
use vigil_core::render::{render, OverlayBackend};

use crate::config::CliConfig;
use crate::replay::{ReplaySummary, SessionReplay};

/// Replay the configured session and write its export.
pub fn run(config: &CliConfig) -> anyhow::Result<ReplaySummary> {
    let script = fs::read_to_string(&config.session_path)
        .with_context(|| format!("failed to read session {}", config.session_path.display()))?;
    let ops = session::parse_session(&script)
        .with_context(|| format!("failed to parse session {}", config.session_path.display()))?;
    tracing::info!(ops = ops.len(), path = %config.session_path.display(), "Replaying session");

    let replay = SessionReplay::new(config.editor);
    let (export, summary) = replay.run(ops);

    write_export(&export, config.export_path.as_deref())?;
    if let Some(dir) = &config.svg_dir {
        let written = write_previews(&export, config, dir)?;
        tracing::info!(written, dir = %dir.display(), "SVG previews written");
    }
    Ok(summary)
}

fn write_export(export: &SiteExport, path: Option<&Path>) -> anyhow::Result<()> {
    let json = to_json(export).context("failed to serialize export")?;
    match path {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write export {}", path.display()))?;
            tracing::info!(path = %path.display(), cameras = export.cameras.len(), "Export written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// One SVG per camera position, named `<camera>__<position>.svg`.
fn write_previews(export: &SiteExport, config: &CliConfig, dir: &Path) -> anyhow::Result<usize> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create preview directory {}", dir.display()))?;
    let mut written = 0;
    for camera in &export.cameras {
        for position in &camera.positions {
            let editor = RegionEditor::with_regions(config.editor, position.regions.clone())
                .with_context(|| {
                    format!("invalid regions for {}/{}", camera.camera.name, position.name)
                })?;
            let mut backend = OverlayBackend::new(config.editor.space);
            render(&editor, &mut backend);

            let file = dir.join(format!(
                "{}__{}.svg",
                file_stem(&camera.camera.name),
                file_stem(&position.name)
            ));
            fs::write(&file, backend.to_svg())
                .with_context(|| format!("failed to write preview {}", file.display()))?;
            written += 1;
        }
    }
    Ok(written)
}

/// Lowercase alphanumerics, everything else collapsed to `-`.
pub fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stems_are_filesystem_safe() {
        assert_eq!(file_stem("North Gate"), "north-gate");
        assert_eq!(file_stem("Fixed view"), "fixed-view");
        assert_eq!(file_stem("  ../Lobby #2 "), "lobby-2");
        assert_eq!(file_stem("***"), "unnamed");
    }
}
