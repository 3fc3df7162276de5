//! Tintcut - adjust, trim and export media from the command line
//!
//! Entry point. Every subcommand goes through the same editor session the UI
//! layer uses.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tintcut_app::{EditorConfig, EditorSession};
use tintcut_core::{human_file_size, Rgb8};
use tintcut_effects::{AdjustmentField, AdjustmentState};
use tintcut_media::{
    AudioSource, Axis, ExportEvent, ExportSession, FfprobeProbe, FileType, HandleRegistry,
    MediaFile, RuntimeSupport, SidecarEncoder,
};
use tintcut_project::{Project, ProjectStore, Selection};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Tintcut - colour adjustments, trimming and export for video and stills
#[derive(Parser, Debug)]
#[command(name = "tintcut")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `tintcut_media=trace`
    #[arg(long, global = true)]
    log: Option<String>,

    /// Encoder staging directory
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// ffmpeg binary to use
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    /// Metadata wait during import, in milliseconds
    #[arg(long, global = true)]
    metadata_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a file's metadata
    Probe { file: PathBuf },
    /// Export an adjusted, trimmed video
    Export(VideoArgs),
    /// Export an adjusted still
    ExportImage(ImageArgs),
    /// Print the encoder command for a video export without running it
    Command(VideoArgs),
}

#[derive(Args, Debug)]
struct AdjustArgs {
    #[arg(long)]
    red_scale: Option<f64>,
    #[arg(long)]
    green_scale: Option<f64>,
    #[arg(long)]
    blue_scale: Option<f64>,
    #[arg(long)]
    brightness: Option<f64>,
    #[arg(long)]
    contrast: Option<f64>,
    #[arg(long)]
    hue: Option<f64>,
    #[arg(long)]
    saturation: Option<f64>,
    #[arg(long)]
    blur: Option<f64>,
    #[arg(long)]
    opacity: Option<f64>,
    #[arg(long)]
    invert: bool,
    #[arg(long)]
    greyscale: bool,
    /// Background behind translucent frames, `#rrggbb`
    #[arg(long)]
    background: Option<String>,
}

impl AdjustArgs {
    fn values(&self) -> [(AdjustmentField, Option<f64>); 9] {
        [
            (AdjustmentField::RedScale, self.red_scale),
            (AdjustmentField::GreenScale, self.green_scale),
            (AdjustmentField::BlueScale, self.blue_scale),
            (AdjustmentField::Brightness, self.brightness),
            (AdjustmentField::Contrast, self.contrast),
            (AdjustmentField::Hue, self.hue),
            (AdjustmentField::Saturation, self.saturation),
            (AdjustmentField::BlurRadius, self.blur),
            (AdjustmentField::Opacity, self.opacity),
        ]
    }

    fn apply(&self, state: &mut AdjustmentState) -> Result<()> {
        for (field, value) in self.values() {
            if let Some(value) = value {
                state.set(field, value);
                let committed = state.commit_field(field);
                if committed != value {
                    warn!(field = field.descriptor().name, value, committed, "Value clamped");
                }
            }
        }
        state.set_invert(self.invert);
        state.set_greyscale(self.greyscale);
        if let Some(hex) = &self.background {
            state.set_background(Rgb8::from_hex(hex)?);
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output width; defaults to the source width
    #[arg(long)]
    width: Option<String>,
    /// Output height; defaults to the source height
    #[arg(long)]
    height: Option<String>,
    /// Output file name without extension
    #[arg(long)]
    name: Option<String>,
    /// Directory to write the result to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Args, Debug)]
struct VideoArgs {
    input: PathBuf,
    /// Trim start, seconds
    #[arg(long)]
    start: Option<f64>,
    /// Trim end, seconds
    #[arg(long)]
    end: Option<f64>,
    /// Replace the clip's audio with this file
    #[arg(long)]
    audio: Option<PathBuf>,
    #[arg(long = "type", default_value = "mp4")]
    file_type: FileType,
    #[command(flatten)]
    adjust: AdjustArgs,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct ImageArgs {
    input: PathBuf,
    #[arg(long = "type", default_value = "png")]
    file_type: FileType,
    #[command(flatten)]
    adjust: AdjustArgs,
    #[command(flatten)]
    output: OutputArgs,
}

type CliSession = EditorSession<SidecarEncoder>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EditorConfig::load_from(path)?,
        None => EditorConfig::load()?,
    };
    if let Some(dir) = cli.work_dir.clone() {
        config.work_dir = dir;
    }
    if let Some(ffmpeg) = cli.ffmpeg.clone() {
        config.ffmpeg_path = Some(ffmpeg);
    }
    if let Some(ms) = cli.metadata_timeout_ms {
        config.metadata_timeout_ms = ms;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli.log.as_deref().unwrap_or(&config.log_filter)))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Tintcut v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Probe { file } => {
            let session = build_session(config)?;
            let media = session.import(&file).await?;
            print_media(&media);
        }
        Command::Command(args) => {
            let session = prepare_video(build_session(config)?, &args).await?;
            println!("{}", session.export_command()?.to_command_line());
        }
        Command::Export(args) => {
            let out_dir = args.output.out_dir.clone();
            let session = prepare_video(build_session(config)?, &args).await?;
            run_export(&session, &out_dir).await?;
        }
        Command::ExportImage(args) => {
            let session = prepare_image(build_session(config)?, &args).await?;
            run_export(&session, &args.output.out_dir).await?;
        }
    }

    Ok(())
}

fn build_session(config: EditorConfig) -> Result<CliSession> {
    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("creating {}", config.work_dir.display()))?;

    let mut encoder = SidecarEncoder::new(&config.work_dir);
    let support = match &config.ffmpeg_path {
        Some(path) => {
            encoder = encoder.with_ffmpeg_path(path);
            RuntimeSupport::for_binary(path)
        }
        None => RuntimeSupport::detect(),
    };
    let export = ExportSession::with_support(encoder, support);

    let probe = match &config.ffmpeg_path {
        Some(ffmpeg) => match ffmpeg.parent() {
            Some(dir) if dir.join(ffprobe_name()).is_file() => {
                FfprobeProbe::new(dir.join(ffprobe_name()))
            }
            _ => FfprobeProbe::new(FfprobeProbe::find_binary()),
        },
        None => FfprobeProbe::new(FfprobeProbe::find_binary()),
    };
    if !probe.is_available() {
        warn!("ffprobe not found; imports will fail");
    }

    let store = ProjectStore::new(Project::new("Command line"), HandleRegistry::new());
    Ok(EditorSession::new(config, store, Arc::new(probe), export))
}

fn ffprobe_name() -> &'static str {
    if cfg!(windows) {
        "ffprobe.exe"
    } else {
        "ffprobe"
    }
}

async fn prepare_video(mut session: CliSession, args: &VideoArgs) -> Result<CliSession> {
    let clip = session.import(&args.input).await?;
    if !clip.is_video() {
        bail!("{} is not a video", clip.name);
    }
    let audio = match &args.audio {
        Some(path) => Some(session.import(path).await?),
        None => None,
    };
    session.select(Selection::Video(clip.id))?;
    session.adjust(|state| args.adjust.apply(state))?;

    if let Some(player) = session.player_mut() {
        let window = player.committed();
        player.set_pending(args.start.unwrap_or(window.start), args.end.unwrap_or(window.end));
        player.commit()?;
    }

    if let Some(options) = session.export_options_mut() {
        options.file_type = args.file_type;
        if let Some(audio) = &audio {
            options.audio = AudioSource::Replacement(audio.id);
        }
        apply_output(options, &args.output);
    }
    Ok(session)
}

async fn prepare_image(mut session: CliSession, args: &ImageArgs) -> Result<CliSession> {
    let still = session.import(&args.input).await?;
    if !still.is_image() {
        bail!("{} is not an image", still.name);
    }
    session.select(Selection::Image(still.id))?;
    session.adjust(|state| args.adjust.apply(state))?;
    if let Some(options) = session.export_options_mut() {
        options.file_type = args.file_type;
        apply_output(options, &args.output);
    }
    Ok(session)
}

fn apply_output(options: &mut tintcut_media::ExportOptions, output: &OutputArgs) {
    if let Some(name) = &output.name {
        options.file_name = name.clone();
    }
    if output.width.is_some() || output.height.is_some() {
        options.set_use_source_dimensions(false);
        for (axis, text) in [(Axis::Width, &output.width), (Axis::Height, &output.height)] {
            if let Some(text) = text {
                if !options.set_dimension_input(axis, text) {
                    warn!(?axis, input = %text, "Ignoring dimension");
                }
            }
        }
        options.commit_dimensions();
        for axis in [Axis::Width, Axis::Height] {
            if options.exceeds_source(axis) {
                warn!(?axis, "Output is larger than the source; quality may suffer");
            }
        }
    }
}

async fn run_export(session: &CliSession, out_dir: &Path) -> Result<()> {
    if let Some(reason) = session.export_disabled_reason() {
        bail!("export unavailable: {reason}");
    }

    let events = session.subscribe_export();
    let done = Arc::new(AtomicBool::new(false));
    let reporter = {
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            // A job refused up front sends nothing, so poll for `done` too.
            while !done.load(Ordering::Acquire) {
                match events.recv_timeout(Duration::from_millis(200)) {
                    Ok(ExportEvent::Status(status)) => info!(%status, "Export status"),
                    Ok(ExportEvent::Progress(p)) => {
                        info!(progress = format!("{p:.2}%"), "Export progress")
                    }
                    Ok(ExportEvent::Completed { .. } | ExportEvent::Failed(_)) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })
    };

    let result = session.export().await;
    done.store(true, Ordering::Release);
    if reporter.join().is_err() {
        warn!("Progress reporter panicked");
    }
    let artifact = result?;

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    println!(
        "{} ({}, {})",
        path.display(),
        artifact.mime_type,
        human_file_size(artifact.bytes.len() as u64)
    );
    Ok(())
}

fn print_media(media: &MediaFile) {
    println!("name:      {}", media.name);
    println!("type:      {}", media.mime_type);
    println!("size:      {}", human_file_size(media.size));
    if let Some((w, h)) = media.dimensions() {
        println!("size (px): {w}x{h}");
    }
    if let Some(d) = media.duration_seconds {
        println!("duration:  {}", tintcut_core::format_clock(d, true));
    }
}
