//! touch-synth: command-line front end for the touch engine.
//!
//! Runs one gesture and writes every synthesised frame to stdout as a JSON
//! line, so the output can be piped into whatever injects touches on the
//! host.  Logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! touch-synth [OPTIONS] <COMMAND>
//!
//! Commands:
//!   tap             <X> <Y>
//!   long-press      <X> <Y> [--duration-ms <MS>]
//!   drag            <FROM_X> <FROM_Y> <TO_X> <TO_Y> [--steps <N>]
//!   drag-by         <X> <Y> <DX> <DY> [--steps <N>]
//!   drag-path       <X,Y>...
//!   two-finger-tap  <X> <Y>
//!   two-finger-pan  <FROM_X> <FROM_Y> <TO_X> <TO_Y> [--steps <N>]
//!   pinch           <X> <Y> <DISTANCE> [--steps <N>]
//!   zoom            <X> <Y> <DISTANCE> [--steps <N>]
//!   rotate          <X> <Y> <DEGREES>
//!   available
//!
//! Options:
//!   --config <PATH>   Config file [default: platform config dir]
//!   --window <ID>     Target window surface [default: 1]
//!   --view <ID>       Target view; overrides --window
//!   --instant         Skip inter-step delays
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable               | Description                         |
//! |------------------------|-------------------------------------|
//! | `TOUCH_SYNTH_CONFIG`   | Config file path                    |
//! | `TOUCH_SYNTH_WINDOW`   | Target window surface               |
//! | `RUST_LOG`             | Log filter; overrides `log_level`   |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use touch_core::{Displacement, GestureSpec, Point, SurfaceId};
use touch_synth::application::engine::TouchEngine;
use touch_synth::application::inject_gesture::{AbortSignal, Scheduler};
use touch_synth::infrastructure::diagnostics::{DebugModel, TouchLog};
use touch_synth::infrastructure::dispatch::JsonLinesSink;
use touch_synth::infrastructure::scheduler::{InstantScheduler, TokioScheduler};
use touch_synth::infrastructure::storage::config::{self, EngineConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Synthesises multi-touch frames from logical gesture commands.
#[derive(Debug, Parser)]
#[command(name = "touch-synth", version)]
struct Cli {
    /// Path to the TOML config file.
    ///
    /// When absent, the platform config directory is used; a missing file
    /// means built-in defaults.
    #[arg(long, global = true, env = "TOUCH_SYNTH_CONFIG")]
    config: Option<PathBuf>,

    /// Window surface the touches are delivered to.
    #[arg(long, global = true, default_value_t = 1, env = "TOUCH_SYNTH_WINDOW")]
    window: u64,

    /// View the touches are bound to.  Surface ids are unique across
    /// windows, so this takes precedence over `--window`.
    #[arg(long, global = true)]
    view: Option<u64>,

    /// Skip inter-step delays instead of waiting them out.
    #[arg(long, global = true)]
    instant: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Touch down and up at one point.
    Tap {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Touch down, hold, and lift at one point.
    LongPress {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(long, default_value_t = 1000)]
        duration_ms: u64,
    },
    /// Drag one finger between two points.
    Drag {
        #[arg(allow_negative_numbers = true)]
        from_x: f64,
        #[arg(allow_negative_numbers = true)]
        from_y: f64,
        #[arg(allow_negative_numbers = true)]
        to_x: f64,
        #[arg(allow_negative_numbers = true)]
        to_y: f64,
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Drag one finger by a displacement.
    DragBy {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(allow_negative_numbers = true)]
        dx: f64,
        #[arg(allow_negative_numbers = true)]
        dy: f64,
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Drag one finger through every given `x,y` point.
    DragPath {
        #[arg(required = true, value_parser = parse_point, allow_negative_numbers = true)]
        points: Vec<Point>,
    },
    /// Tap with two fingers side by side.
    TwoFingerTap {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Move two fingers in parallel.
    TwoFingerPan {
        #[arg(allow_negative_numbers = true)]
        from_x: f64,
        #[arg(allow_negative_numbers = true)]
        from_y: f64,
        #[arg(allow_negative_numbers = true)]
        to_x: f64,
        #[arg(allow_negative_numbers = true)]
        to_y: f64,
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Spread two fingers apart around a center.
    Pinch {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(allow_negative_numbers = true)]
        distance: f64,
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Bring two fingers together around a center.
    Zoom {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(allow_negative_numbers = true)]
        distance: f64,
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Rotate two fingers around a center.
    Rotate {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(allow_negative_numbers = true)]
        degrees: f64,
    },
    /// Print the identifier the next single-finger gesture would use.
    Available,
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in `{s}`: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in `{s}`: {e}"))?;
    Ok(Point::new(x, y))
}

impl Command {
    /// The gesture to perform, or `None` for non-gesture commands.
    fn into_gesture(self, default_steps: usize) -> Option<GestureSpec> {
        let spec = match self {
            Command::Tap { x, y } => GestureSpec::Tap {
                at: Point::new(x, y),
            },
            Command::LongPress { x, y, duration_ms } => GestureSpec::LongPress {
                at: Point::new(x, y),
                duration: Duration::from_millis(duration_ms),
            },
            Command::Drag {
                from_x,
                from_y,
                to_x,
                to_y,
                steps,
            } => GestureSpec::Drag {
                from: Point::new(from_x, from_y),
                to: Point::new(to_x, to_y),
                steps: steps.unwrap_or(default_steps),
            },
            Command::DragBy {
                x,
                y,
                dx,
                dy,
                steps,
            } => GestureSpec::drag_by(
                Point::new(x, y),
                Displacement::new(dx, dy),
                steps.unwrap_or(default_steps),
            ),
            Command::DragPath { points } => GestureSpec::DragPath { points },
            Command::TwoFingerTap { x, y } => GestureSpec::TwoFingerTap {
                at: Point::new(x, y),
            },
            Command::TwoFingerPan {
                from_x,
                from_y,
                to_x,
                to_y,
                steps,
            } => GestureSpec::TwoFingerPan {
                from: Point::new(from_x, from_y),
                to: Point::new(to_x, to_y),
                steps: steps.unwrap_or(default_steps),
            },
            Command::Pinch {
                x,
                y,
                distance,
                steps,
            } => GestureSpec::Pinch {
                center: Point::new(x, y),
                distance,
                steps: steps.unwrap_or(default_steps),
            },
            Command::Zoom {
                x,
                y,
                distance,
                steps,
            } => GestureSpec::Zoom {
                center: Point::new(x, y),
                distance,
                steps: steps.unwrap_or(default_steps),
            },
            Command::Rotate { x, y, degrees } => GestureSpec::Rotate {
                center: Point::new(x, y),
                angle_degrees: degrees,
            },
            Command::Available => return None,
        };
        Some(spec)
    }
}

fn load_engine_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => config::load_config().context("failed to load config"),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_engine_config(cli.config.as_ref())?;

    // `RUST_LOG` wins; otherwise the configured level.  stdout carries frames,
    // so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.engine.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let scheduler: Arc<dyn Scheduler> = if cli.instant {
        Arc::new(InstantScheduler::new())
    } else {
        Arc::new(TokioScheduler)
    };
    let mut engine = TouchEngine::new(Arc::new(JsonLinesSink::stdout()), scheduler)
        .with_capacity(cfg.table_capacity())
        .with_options(cfg.compile_options());

    if cfg.diagnostics.trace_enabled {
        let path = cfg.trace_path().context("failed to resolve trace log path")?;
        let log = TouchLog::create(&path, cfg.diagnostics.trace_rollover_lines)
            .with_context(|| format!("failed to create trace log at {}", path.display()))?;
        info!(path = %path.display(), "touch trace log enabled");
        engine = engine.with_observer(Arc::new(log));
    }
    let debug_model = cfg
        .diagnostics
        .debug_overlay
        .then(|| Arc::new(DebugModel::new(true)));
    if let Some(model) = &debug_model {
        engine = engine.with_observer(model.clone());
    }

    let injector = match cli.view {
        Some(view) => engine.on_view(SurfaceId(view)),
        None => engine.on_window(SurfaceId(cli.window)),
    };

    let Some(spec) = cli.command.into_gesture(cfg.gesture.drag_steps) else {
        match engine.available_identifier().await {
            Some(id) => println!("{id}"),
            None => println!("none"),
        }
        return Ok(());
    };

    // Ctrl+C cancels the in-flight gesture so no touch is left held.
    let abort = Arc::new(AbortSignal::new());
    {
        let abort = Arc::clone(&abort);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, aborting gesture");
                abort.abort();
            }
        });
    }

    let report = injector
        .with_abort(&abort)
        .perform(&spec)
        .await
        .with_context(|| format!("{} gesture failed", spec.name()))?;

    info!(
        gesture_id = %report.gesture_id,
        kind = report.kind,
        frames = report.frames_delivered,
        "done"
    );
    if let Some(model) = &debug_model {
        for (id, record) in model.snapshot().iter().enumerate() {
            info!(id, point = %record.point, phase = %record.phase, description = %record.description, "debug record");
        }
    }
    Ok(())
}
