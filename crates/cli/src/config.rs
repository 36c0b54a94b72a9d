use std::path::PathBuf;

use vigil_core::editor::EditorConfig;

/// Default canvas size for the `canvas` editor mode.
pub const DEFAULT_FRAME_WIDTH: u32 = 1920;
pub const DEFAULT_FRAME_HEIGHT: u32 = 1080;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("no session file given (pass a path or set VIGIL_SESSION_PATH)")]
    MissingSession,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Replay tool configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Session script to replay.
    pub session_path: PathBuf,
    /// Where to write the export; stdout when `None`.
    pub export_path: Option<PathBuf>,
    /// Directory for per-position SVG previews; skipped when `None`.
    pub svg_dir: Option<PathBuf>,
    /// Editor variant used for every camera in the session.
    pub editor: EditorConfig,
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var              | Default                      |
    /// |----------------------|------------------------------|
    /// | `VIGIL_SESSION_PATH` | -- (or first CLI argument)   |
    /// | `VIGIL_EXPORT_PATH`  | stdout                       |
    /// | `VIGIL_SVG_DIR`      | no previews                  |
    /// | `VIGIL_EDITOR_MODE`  | `overlay`                    |
    /// | `VIGIL_FRAME_WIDTH`  | `1920` (canvas mode only)    |
    /// | `VIGIL_FRAME_HEIGHT` | `1080` (canvas mode only)    |
    /// | `LOG_FORMAT`         | `text`                       |
    pub fn from_env(session_arg: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::from_lookup(session_arg, |key| std::env::var(key).ok())
    }

    /// Same as [`CliConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup<F>(session_arg: Option<PathBuf>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let session_path = session_arg
            .or_else(|| non_empty("VIGIL_SESSION_PATH").map(PathBuf::from))
            .ok_or(ConfigError::MissingSession)?;
        let export_path = non_empty("VIGIL_EXPORT_PATH").map(PathBuf::from);
        let svg_dir = non_empty("VIGIL_SVG_DIR").map(PathBuf::from);

        let width = parse_dimension(
            "VIGIL_FRAME_WIDTH",
            non_empty("VIGIL_FRAME_WIDTH"),
            DEFAULT_FRAME_WIDTH,
        )?;
        let height = parse_dimension(
            "VIGIL_FRAME_HEIGHT",
            non_empty("VIGIL_FRAME_HEIGHT"),
            DEFAULT_FRAME_HEIGHT,
        )?;

        let editor = match non_empty("VIGIL_EDITOR_MODE").as_deref().map(str::trim) {
            None | Some("overlay") => EditorConfig::overlay(),
            Some("canvas") => EditorConfig::canvas(width, height),
            Some("counting_line") => EditorConfig::counting_line(),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "VIGIL_EDITOR_MODE",
                    expected: "one of overlay, canvas, counting_line",
                    value: other.to_string(),
                })
            }
        };

        let log_format = match non_empty("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    expected: "text or json",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            session_path,
            export_path,
            svg_dir,
            editor,
            log_format,
        })
    }
}

fn parse_dimension(
    var: &'static str,
    raw: Option<String>,
    default: u32,
) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::Invalid {
            var,
            expected: "a positive integer",
            value: raw,
        }),
    }
}
