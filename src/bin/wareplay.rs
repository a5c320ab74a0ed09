use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "wareplay", version, about = "Replay recorded warehouse simulation runs")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of a run dump.
    Info(InfoArgs),
    /// Render a single frame as a PNG and print its metrics.
    Frame(FrameArgs),
    /// Render a frame range into a looping GIF.
    Export(ExportArgs),
    /// Interactive player; reads commands from stdin and rewrites a PNG per frame.
    Play(PlayArgs),
}

#[derive(Args, Debug)]
struct TraceArgs {
    /// Run dump path or http(s) URL.
    #[arg(long, default_value = wareplay::DEFAULT_TRACE_SOURCE)]
    trace: String,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Surface width in pixels.
    #[arg(long, default_value_t = 960)]
    width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 640)]
    height: u32,

    /// Label font file (falls back to $WAREPLAY_FONT, then system fonts).
    #[arg(long)]
    font: Option<PathBuf>,

    /// JSON theme overriding palette entries.
    #[arg(long)]
    theme: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    #[command(flatten)]
    trace: TraceArgs,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    trace: TraceArgs,

    #[command(flatten)]
    view: ViewArgs,

    /// Frame index (0-based, clamped to the trace).
    #[arg(long, default_value_t = 0)]
    frame: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    trace: TraceArgs,

    #[command(flatten)]
    view: ViewArgs,

    /// Output path; must end in `.gif`.
    #[arg(long)]
    out: PathBuf,

    /// Frames per second (1..=10).
    #[arg(long, default_value_t = 2)]
    fps: u32,

    /// First frame to export.
    #[arg(long)]
    from: Option<usize>,

    /// Frame after the last one to export.
    #[arg(long)]
    to: Option<usize>,
}

#[derive(Args, Debug)]
struct PlayArgs {
    #[command(flatten)]
    trace: TraceArgs,

    #[command(flatten)]
    view: ViewArgs,

    /// PNG rewritten on every presented frame.
    #[arg(long, default_value = "wareplay_frame.png")]
    out: PathBuf,

    /// Initial frames per second (1..=10).
    #[arg(long, default_value_t = 2)]
    fps: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Command::Info(args) => cmd_info(args).await,
        Command::Frame(args) => cmd_frame(args).await,
        Command::Export(args) => cmd_export(args).await,
        Command::Play(args) => cmd_play(args).await,
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn load_trace(args: &TraceArgs) -> anyhow::Result<wareplay::Trace> {
    let source = wareplay::TraceSource::parse(&args.trace);
    wareplay::load(&source)
        .await
        .with_context(|| format!("load trace '{source}'"))
}

fn make_renderer(view: &ViewArgs) -> anyhow::Result<wareplay::CpuRenderer> {
    let theme = match &view.theme {
        Some(path) => wareplay::Theme::from_json_file(path)
            .with_context(|| format!("load theme '{}'", path.display()))?,
        None => wareplay::Theme::default(),
    };
    let settings = wareplay::RenderSettings {
        canvas: wareplay::Canvas::new(view.width, view.height)?,
        theme,
        font: view.font.clone(),
    };
    Ok(wareplay::CpuRenderer::new(settings)?)
}

async fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let trace = load_trace(&args.trace).await?;
    let (w, h) = trace.layout.extent();
    println!("zones:              {}", trace.layout.len());
    println!("frames:             {}", trace.frame_count());
    println!("extent:             {w} x {h}");
    println!("unresolved workers: {}", trace.unresolved_workers());
    Ok(())
}

async fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let trace = load_trace(&args.trace).await?;
    let mut renderer = make_renderer(&args.view)?;

    let index = wareplay::render_frame_png(&trace, args.frame, &mut renderer, &args.out)?;
    let frame = trace
        .frame(index)
        .with_context(|| format!("frame {index} vanished after rendering"))?;

    println!("frame {}/{}", index + 1, trace.frame_count());
    print!(
        "{}",
        wareplay::MetricsPanel::from_metrics(&frame.metrics).render_text()
    );
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

async fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let trace = load_trace(&args.trace).await?;
    let mut renderer = make_renderer(&args.view)?;

    let range = match (args.from, args.to) {
        (None, None) => None,
        (from, to) => Some(from.unwrap_or(0)..to.unwrap_or(trace.frame_count())),
    };
    let opts = wareplay::ExportOpts {
        range,
        fps: wareplay::FrameRate::new(args.fps)?,
        overwrite: true,
    };

    // Rendering is CPU bound; keep it off the async workers.
    let stats = tokio::task::block_in_place(|| {
        wareplay::export_trace(&trace, &args.out, &opts, &mut renderer)
    })?;

    eprintln!(
        "wrote {} ({} frames)",
        args.out.display(),
        stats.frames_written
    );
    Ok(())
}

async fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let trace = Arc::new(load_trace(&args.trace).await?);
    let renderer = make_renderer(&args.view)?;
    let sink = wareplay::PngFrameSink::new(renderer, &args.out, std::io::stdout());

    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    let (cmd_tx, mut cmd_rx) = mpsc::channel(16);

    let mut controller = wareplay::Controller::new(trace, sink, tick_tx);
    controller.set_frame_rate(args.fps)?;

    std::thread::Builder::new()
        .name("wareplay-stdin".into())
        .spawn(move || read_commands(cmd_tx))
        .context("spawn stdin reader")?;
    print_help(&args.out);

    wareplay::run_player(&mut controller, &mut tick_rx, &mut cmd_rx).await?;

    if controller.render_failures() > 0 {
        eprintln!("{} frame(s) failed to render", controller.render_failures());
    }
    Ok(())
}

/// Blocking stdin reader on its own thread; the runtime never waits on it at shutdown.
fn read_commands(tx: mpsc::Sender<wareplay::PlayerCommand>) {
    for line in std::io::stdin().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match wareplay::PlayerCommand::parse(&line) {
            Some(cmd) => {
                let quit = cmd == wareplay::PlayerCommand::Quit;
                if tx.blocking_send(cmd).is_err() || quit {
                    break;
                }
            }
            None => eprintln!("unknown command: {}", line.trim()),
        }
    }
}

fn print_help(out: &Path) {
    eprintln!("rendering into {}", out.display());
    eprintln!("commands: p (play/pause), n (next), b (back), s <n> (seek), f <1-10> (fps), q (quit)");
}
