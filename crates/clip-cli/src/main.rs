use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use clip_core::{
    ForgeConfig, Priority, QualityPreset, RenderArtifact, Script, Theme, ThemeCatalog,
};
use clip_encode::{MediaCapabilityProvider, NativeProvider, PlatformProvider};
use clip_queue::{ArtifactSink, FileSink, JobOutcome, JobRequest, Scheduler, SchedulerConfig};
use clip_render::FrameRenderer;

#[derive(Parser)]
#[command(
    name = "clipforge",
    version,
    about = "Clipforge — render short vertical text clips",
    long_about = "Clipforge renders scripted short-form vertical videos: a hook, a\nsequence of body frames, and a call-to-action over an animated theme.\nJobs run through a memory-aware priority scheduler and encode to the\nbest format the platform supports."
)]
struct Cli {
    /// Path to a TTF font file loaded into the renderer
    #[arg(long, global = true)]
    font: Option<PathBuf>,

    /// Path to a clipforge.json config file
    #[arg(long, global = true, default_value = "clipforge.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a single clip to a file
    Render {
        /// Attention line pinned near the top
        #[arg(long, default_value = "")]
        hook: String,

        /// Body frame text; repeat for multiple frames
        #[arg(long = "frame", required = true)]
        frames: Vec<String>,

        /// Call-to-action pinned near the bottom
        #[arg(long, default_value = "")]
        cta: String,

        /// Theme id (see `clipforge themes`)
        #[arg(short, long)]
        theme: Option<String>,

        /// Quality preset id (see `clipforge presets`)
        #[arg(short, long)]
        quality: Option<String>,

        /// Output file path (default: output/clip_<job-id>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force the in-process APNG encoder, skipping ffmpeg
        #[arg(long)]
        native: bool,
    },

    /// Render a batch of clips described by a JSON file
    Batch {
        /// Path to a JSON array of jobs
        #[arg()]
        jobs: PathBuf,

        /// Directory to write the artifacts into
        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,

        /// Force the in-process APNG encoder, skipping ffmpeg
        #[arg(long)]
        native: bool,
    },

    /// Render a single frame to a still PNG without encoding a video
    Preview {
        /// Attention line pinned near the top
        #[arg(long, default_value = "")]
        hook: String,

        /// Body frame text; repeat for multiple frames
        #[arg(long = "frame", required = true)]
        frames: Vec<String>,

        /// Call-to-action pinned near the bottom
        #[arg(long, default_value = "")]
        cta: String,

        /// Theme id
        #[arg(short, long)]
        theme: Option<String>,

        /// Quality preset id
        #[arg(short, long)]
        quality: Option<String>,

        /// Body frame index to show
        #[arg(long, default_value_t = 0)]
        frame_index: usize,

        /// Animation time in milliseconds
        #[arg(long, default_value_t = 0.0)]
        at_ms: f64,

        /// Output PNG path
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
    },

    /// List the built-in themes
    Themes,

    /// List the built-in quality presets
    Presets,
}

/// One entry of a `batch` jobs file.
#[derive(Debug, Deserialize)]
struct BatchEntry {
    #[serde(default)]
    hook: String,
    frames: Vec<String>,
    #[serde(default)]
    cta: String,
    theme: Option<String>,
    quality: Option<String>,
    priority: Option<Priority>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = ForgeConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    if let Some(font) = &cli.font {
        config.font_path = Some(font.display().to_string());
    }

    match cli.command {
        Commands::Render {
            hook,
            frames,
            cta,
            theme,
            quality,
            output,
            native,
        } => run_async(cmd_render(
            config,
            Script::new(hook, frames, cta),
            theme,
            quality,
            output,
            native,
        )),
        Commands::Batch {
            jobs,
            out_dir,
            native,
        } => run_async(cmd_batch(config, jobs, out_dir, native)),
        Commands::Preview {
            hook,
            frames,
            cta,
            theme,
            quality,
            frame_index,
            at_ms,
            output,
        } => cmd_preview(
            config,
            Script::new(hook, frames, cta),
            theme,
            quality,
            frame_index,
            at_ms,
            output,
        ),
        Commands::Themes => cmd_themes(),
        Commands::Presets => cmd_presets(),
    }
}

fn run_async<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    runtime.block_on(future)
}

fn resolve_look(
    config: &ForgeConfig,
    theme: Option<String>,
    quality: Option<String>,
) -> Result<(Theme, QualityPreset)> {
    let catalog = ThemeCatalog::builtin();
    let theme_id = theme.unwrap_or_else(|| config.theme.clone());
    let quality_id = quality.unwrap_or_else(|| config.quality.clone());
    let theme = catalog
        .theme(&theme_id)
        .with_context(|| format!("unknown theme '{}' (try `clipforge themes`)", theme_id))?
        .clone();
    let quality = catalog
        .quality(&quality_id)
        .with_context(|| format!("unknown preset '{}' (try `clipforge presets`)", quality_id))?
        .clone();
    Ok((theme, quality))
}

fn scheduler_for(config: &ForgeConfig, native: bool) -> Scheduler {
    let provider: Arc<dyn MediaCapabilityProvider> = if native {
        Arc::new(NativeProvider)
    } else {
        Arc::new(PlatformProvider::new())
    };
    let mut sched_config = SchedulerConfig::new(provider);
    if let Some(cap) = config.max_concurrency {
        sched_config = sched_config.with_max_concurrency(cap);
    }
    sched_config.font_path = config.font_path.clone().map(PathBuf::from);
    Scheduler::new(sched_config)
}

async fn cmd_render(
    config: ForgeConfig,
    script: Script,
    theme: Option<String>,
    quality: Option<String>,
    output: Option<PathBuf>,
    native: bool,
) -> Result<()> {
    let (theme, quality) = resolve_look(&config, theme, quality)?;
    let scheduler = scheduler_for(&config, native);

    println!(
        "🎬 Rendering {} body frame(s) at {} ({}x{})...",
        script.frames.len(),
        quality.id,
        quality.width,
        quality.height
    );

    let mut handle = scheduler.enqueue(JobRequest {
        script,
        theme,
        quality,
        priority: Priority::Normal,
    })?;
    tracing::info!(job = %handle.id(), "render job enqueued");

    let artifact = loop {
        match handle.next_event().await {
            Some(clip_queue::JobEvent::Progress(p)) => {
                print!("\r   ⏳ {:5.1}%", p.percent);
                let _ = std::io::stdout().flush();
            }
            Some(clip_queue::JobEvent::Completed(artifact)) => {
                println!();
                break artifact;
            }
            Some(clip_queue::JobEvent::Failed { error, .. }) => {
                println!();
                bail!("render failed: {}", error);
            }
            Some(clip_queue::JobEvent::Cancelled) => {
                println!();
                bail!("render was cancelled");
            }
            None => bail!("render ended without a result"),
        }
    };

    let path = match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&path, &artifact.bytes)?;
            path
        }
        None => {
            let sink = FileSink::new("output");
            sink.save(&artifact)?;
            sink.path_for(&artifact)
        }
    };

    print_artifact_summary(&artifact, &path);
    Ok(())
}

async fn cmd_batch(
    config: ForgeConfig,
    jobs_file: PathBuf,
    out_dir: PathBuf,
    native: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(&jobs_file)
        .with_context(|| format!("failed to read jobs file {}", jobs_file.display()))?;
    let entries: Vec<BatchEntry> =
        serde_json::from_str(&raw).context("jobs file must be a JSON array of jobs")?;
    if entries.is_empty() {
        bail!("jobs file contains no jobs");
    }
    tracing::debug!(path = %jobs_file.display(), jobs = entries.len(), "batch loaded");

    let scheduler = scheduler_for(&config, native);
    let sink = FileSink::new(&out_dir);
    println!(
        "🎬 Enqueuing {} job(s), up to {} in flight...",
        entries.len(),
        scheduler.status().max_concurrency
    );

    let mut handles = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let (theme, quality) = resolve_look(&config, entry.theme, entry.quality)?;
        let handle = scheduler.enqueue(JobRequest {
            script: Script::new(entry.hook, entry.frames, entry.cta),
            theme,
            quality,
            priority: entry.priority.unwrap_or(Priority::Normal),
        })?;
        handles.push((index, handle));
    }

    let mut failures = Vec::new();
    for (index, handle) in handles {
        let job_id = handle.id();
        match handle.wait().await {
            JobOutcome::Completed(artifact) => {
                sink.save(&artifact)?;
                println!(
                    "   ✓ job {} ({}) → {}",
                    index,
                    job_id,
                    sink.path_for(&artifact).display()
                );
            }
            JobOutcome::Failed { error, .. } => {
                tracing::warn!(job = %job_id, error = %error, "batch job failed");
                println!("   ✗ job {} ({}) failed: {}", index, job_id, error);
                failures.push(index);
            }
            JobOutcome::Cancelled => {
                println!("   ✗ job {} ({}) was cancelled", index, job_id);
                failures.push(index);
            }
        }
    }

    if !failures.is_empty() {
        bail!("batch completed with {} failed job(s)", failures.len());
    }
    println!("   Done. Artifacts in {}", out_dir.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_preview(
    config: ForgeConfig,
    script: Script,
    theme: Option<String>,
    quality: Option<String>,
    frame_index: usize,
    at_ms: f64,
    output: PathBuf,
) -> Result<()> {
    script.validate()?;
    let (theme, quality) = resolve_look(&config, theme, quality)?;

    let mut renderer = FrameRenderer::new();
    if let Some(font) = &config.font_path {
        renderer.load_font(std::path::Path::new(font))?;
    }

    let mut surface = clip_core::FrameBuffer::new(quality.width, quality.height);
    renderer.render_frame(&mut surface, &theme, &quality, &script, frame_index, at_ms)?;

    let img = image::RgbaImage::from_raw(surface.width, surface.height, surface.data)
        .context("surface did not produce a full image")?;
    img.save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "🖼  Preview of frame {} at {}ms → {}",
        frame_index,
        at_ms,
        output.display()
    );
    Ok(())
}

fn cmd_themes() -> Result<()> {
    let catalog = ThemeCatalog::builtin();
    println!("🎨 Built-in themes:");
    for theme in catalog.themes() {
        println!(
            "   {:10} particles: {:?}, font: {}",
            theme.id, theme.particle_kind, theme.font_family
        );
    }
    Ok(())
}

fn cmd_presets() -> Result<()> {
    let catalog = ThemeCatalog::builtin();
    println!("📐 Built-in quality presets:");
    for q in catalog.qualities() {
        println!(
            "   {:6} {}x{} @ {}fps, {} bps",
            q.id, q.width, q.height, q.frame_rate, q.target_bitrate
        );
    }
    Ok(())
}

fn print_artifact_summary(artifact: &RenderArtifact, path: &std::path::Path) {
    println!("   ✓ {} ({} bytes)", path.display(), artifact.size_bytes);
    println!(
        "     {}x{}, {:.1}s, {}",
        artifact.width, artifact.height, artifact.duration_seconds, artifact.mime_type
    );
}
