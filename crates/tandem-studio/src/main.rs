use anyhow::Result;
use clap::{Parser, ValueEnum};

use tandem_engine::backend::BackendKind;
use tandem_engine::logging::{init_logging, LoggingConfig};
use tandem_engine::paint::Color;
use tandem_engine::window::{Runtime, RuntimeConfig};

mod scene;

use scene::Studio;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Backend {
    D3d9,
    Opengl,
}

impl From<Backend> for BackendKind {
    fn from(b: Backend) -> Self {
        match b {
            Backend::D3d9 => BackendKind::Direct3D9,
            Backend::Opengl => BackendKind::OpenGl,
        }
    }
}

/// Renders a small synthetic scene with either backend.
#[derive(Debug, Parser)]
#[command(name = "tandem-studio", version)]
struct Args {
    /// Graphics backend to render with.
    #[arg(long, value_enum, default_value_t = Backend::D3d9)]
    backend: Backend,

    /// Exit after this many frames.
    #[arg(long)]
    frames: Option<u64>,

    /// Renderables submitted per frame.
    #[arg(long, default_value_t = 8)]
    renderables: u32,

    /// Meshes the binder knows about; renderables past this fail to draw.
    #[arg(long)]
    loaded_meshes: Option<u32>,

    /// Log every frame call.
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(if args.trace {
        LoggingConfig::frame_trace()
    } else {
        LoggingConfig::default()
    });

    let mut config = RuntimeConfig {
        title: "Tandem Studio".to_string(),
        backend: args.backend.into(),
        max_frames: args.frames,
        ..RuntimeConfig::default()
    };
    config.renderer.clear_color = Color::new(0.08, 0.09, 0.12, 1.0);

    let studio = Studio::new(args.renderables, args.loaded_meshes.unwrap_or(args.renderables));
    Runtime::run(config, studio)
}
