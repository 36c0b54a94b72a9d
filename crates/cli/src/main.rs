//! `vigil` -- replays a camera region configuration session.
//!
//! Usage: `vigil [SESSION.json]`
//!
//! # Environment variables
//!
//! | Variable             | Required | Default   | Description                              |
//! |----------------------|----------|-----------|------------------------------------------|
//! | `VIGIL_SESSION_PATH` | no*      | --        | Session script when no argument is given |
//! | `VIGIL_EXPORT_PATH`  | no       | stdout    | Where the site export is written         |
//! | `VIGIL_SVG_DIR`      | no       | --        | Directory for per-position SVG previews  |
//! | `VIGIL_EDITOR_MODE`  | no       | `overlay` | `overlay`, `canvas` or `counting_line`   |
//! | `VIGIL_FRAME_WIDTH`  | no       | `1920`    | Canvas width in pixels                   |
//! | `VIGIL_FRAME_HEIGHT` | no       | `1080`    | Canvas height in pixels                  |
//! | `LOG_FORMAT`         | no       | `text`    | `text` or `json`                         |

use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil_cli::config::{CliConfig, LogFormat};

fn main() {
    dotenvy::dotenv().ok();

    let config = CliConfig::from_env(std::env::args_os().nth(1).map(PathBuf::from));
    let json = matches!(&config, Ok(c) if c.log_format == LogFormat::Json);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil_cli=info,vigil_core=info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    let config = config.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        session = %config.session_path.display(),
        mode = ?config.editor.render_mode,
        "Starting vigil",
    );

    match vigil_cli::run(&config) {
        Ok(summary) => {
            tracing::info!(
                applied = summary.applied,
                rejected = summary.rejected,
                "Session replayed",
            );
        }
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "Replay failed");
            std::process::exit(1);
        }
    }
}
