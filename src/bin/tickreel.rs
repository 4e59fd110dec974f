use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

use tickreel::{
    CancelToken, EngineOpts, ExportJob, FfmpegSink, FfmpegSinkOpts, FrameSink, GifSink,
    GifSinkOpts, MapCatalog, PngSequenceSink, ReplayEngine, Tick, TickRange,
};

#[derive(Parser, Debug)]
#[command(name = "tickreel", version, about = "Radar replay rendering for recorded matches")]
struct Cli {
    /// Log verbosity (written to stderr).
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Export a tick range as MP4 (requires `ffmpeg` on PATH), animated GIF or a PNG sequence.
    Export(ExportArgs),
    /// Print per-round summaries as JSON.
    Rounds(MatchArgs),
    /// List known map profiles.
    Maps(MapsArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Parsed match recording (JSON).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Extra map profiles (JSON), merged over the built-in catalog.
    #[arg(long)]
    maps: Option<PathBuf>,

    /// Engine options (JSON). Missing fields keep their defaults.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Square canvas size in pixels (overrides the options file).
    #[arg(long)]
    size: Option<u32>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: MatchArgs,

    /// Absolute tick to render.
    #[arg(long, conflicts_with = "time")]
    tick: Option<u64>,

    /// Seconds from the first tick.
    #[arg(long)]
    time: Option<f64>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Mp4,
    Gif,
    Png,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    input: MatchArgs,

    /// Output MP4 or GIF path, or directory for a PNG sequence.
    #[arg(long)]
    out: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Mp4)]
    format: OutputFormat,

    /// Export one round by number.
    #[arg(long, conflicts_with_all = ["start", "end"])]
    round: Option<u32>,

    /// First tick (inclusive). Defaults to the first tick of the match.
    #[arg(long)]
    start: Option<u64>,

    /// End tick (exclusive). Defaults to one past the last tick.
    #[arg(long)]
    end: Option<u64>,

    /// Render every Nth tick.
    #[arg(long, default_value_t = 1)]
    interval: u64,

    /// Render frames in parallel.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for `--parallel`.
    #[arg(long)]
    threads: Option<usize>,

    /// x264 constant rate factor.
    #[arg(long, default_value_t = 20)]
    crf: u8,

    /// GIF palette speed, 1 (best) to 30 (fastest).
    #[arg(long, default_value_t = 10)]
    gif_speed: i32,
}

#[derive(Args, Debug)]
struct MapsArgs {
    /// Extra map profiles (JSON), merged over the built-in catalog.
    #[arg(long)]
    maps: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
        Command::Rounds(args) => cmd_rounds(args),
        Command::Maps(args) => cmd_maps(args),
    }
}

fn load_catalog(extra: Option<&PathBuf>) -> anyhow::Result<MapCatalog> {
    let mut catalog = MapCatalog::builtin();
    if let Some(path) = extra {
        let more = MapCatalog::from_path(path)
            .with_context(|| format!("load map profiles '{}'", path.display()))?;
        catalog.merge(more);
    }
    Ok(catalog)
}

fn load_engine(
    args: &MatchArgs,
    tweak: impl FnOnce(&mut EngineOpts),
) -> anyhow::Result<ReplayEngine> {
    let catalog = load_catalog(args.maps.as_ref())?;
    let mut opts = match &args.opts {
        Some(path) => EngineOpts::from_path(path)?,
        None => EngineOpts::default(),
    };
    tweak(&mut opts);
    if let Some(side) = args.size {
        opts.canvas = tickreel::Canvas::square(side);
    }
    let engine = ReplayEngine::open(&args.in_path, &catalog, opts)
        .with_context(|| format!("load match '{}'", args.in_path.display()))?;
    Ok(engine)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let engine = load_engine(&args.input, |_| {})?;
    let index = engine.index();
    let tick = match (args.tick, args.time) {
        (Some(t), _) => index.clamp(Tick(t)),
        (None, Some(secs)) => index.tick_at_secs(secs),
        (None, None) => index.first_tick(),
    };
    engine.save_png(tick, &args.out)?;
    eprintln!("wrote {} ({})", args.out.display(), tick);
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let engine = load_engine(&args.input, |opts| {
        if args.parallel || args.threads.is_some() {
            opts.export.parallel = true;
            opts.export.threads = args.threads.or(opts.export.threads);
        }
    })?;
    let index = engine.index();

    let range = if let Some(n) = args.round {
        index
            .round_by_number(n)
            .with_context(|| format!("no round numbered {n}"))?
            .range()
    } else {
        let start = args.start.map(Tick).unwrap_or(index.first_tick());
        let end = args.end.map(Tick).unwrap_or(index.range().end);
        TickRange::new(start, end)?
    };
    let job = ExportJob::new(range, args.interval)?;

    let mut sink: Box<dyn FrameSink> = match args.format {
        OutputFormat::Mp4 => Box::new(FfmpegSink::new(FfmpegSinkOpts {
            crf: args.crf,
            background: engine.settings().background,
            ..FfmpegSinkOpts::new(&args.out)
        })),
        OutputFormat::Gif => Box::new(GifSink::new(GifSinkOpts {
            speed: args.gif_speed,
            background: engine.settings().background,
            ..GifSinkOpts::new(&args.out)
        })),
        OutputFormat::Png => Box::new(PngSequenceSink::new(&args.out)),
    };

    let started = std::time::Instant::now();
    let report = engine.export(&job, sink.as_mut(), &CancelToken::new())?;
    let elapsed = started.elapsed();
    eprintln!(
        "wrote {} frames to {} in {:.2}s ({} failed)",
        report.frames_written,
        args.out.display(),
        elapsed.as_secs_f64(),
        report.frames_failed
    );
    if !report.failed_ticks.is_empty() {
        let shown: Vec<u64> = report.failed_ticks.iter().take(16).map(|t| t.0).collect();
        eprintln!("failed ticks: {shown:?}");
    }
    Ok(())
}

fn cmd_rounds(args: MatchArgs) -> anyhow::Result<()> {
    let engine = load_engine(&args, |_| {})?;
    let json = serde_json::to_string_pretty(&engine.round_summaries())
        .context("serialize round summaries")?;
    println!("{json}");
    Ok(())
}

fn cmd_maps(args: MapsArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(args.maps.as_ref())?;
    for p in catalog.profiles() {
        println!(
            "{:<12} origin=({}, {}) scale={} radar={}px{}",
            p.name,
            p.origin_x,
            p.origin_y,
            p.scale,
            p.radar_size,
            p.backdrop
                .as_ref()
                .map(|b| format!(" backdrop={}", b.display()))
                .unwrap_or_default()
        );
    }
    Ok(())
}
