use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use huebot_contracts::chat::{ChatMessage, COMMAND_PREFIX};
use huebot_contracts::events::EventLog;
use huebot_contracts::store::{ColorStore, JsonFileStore};
use huebot_contracts::HueError;
use huebot_engine::{
    decode_template, segment, BlobStore, CommandInterpreter, DirBlobStore, Outcome, RegionCheck,
    Renderer,
};

mod logger;
mod scheduler;
mod twitch;

#[derive(Debug, Parser)]
#[command(
    name = "huebot",
    version,
    about = "Chat-driven colorizer for line-art templates"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Join a chat channel and apply color commands, rendering on a timer.
    Bot(BotArgs),
    /// Read commands from stdin as if they were posted to the channel.
    Console(ConsoleArgs),
    /// Render the active image once.
    Render(RenderArgs),
    /// Render the active image on a fixed interval.
    Watch(WatchArgs),
    /// List the regions of a template in index order.
    Regions(RegionsArgs),
    /// Show the active image and stored colors.
    Status(StatusArgs),
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// JSON file holding the active image and color assignments.
    #[arg(long, env = "HUEBOT_STORE", default_value = "huebot-state/colors.json")]
    store: PathBuf,
}

#[derive(Debug, Args)]
struct BucketArgs {
    /// Directory templates are read from.
    #[arg(long, env = "HUEBOT_TEMPLATES", default_value = "templates")]
    templates: PathBuf,
    /// Directory rendered images and receipts are written to.
    #[arg(long, env = "HUEBOT_OUT", default_value = "rendered")]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct InterpreterArgs {
    /// Channel whose messages are accepted; everything else is dropped.
    #[arg(long, env = "HUEBOT_CHANNEL")]
    channel: String,
    /// Reject region indices the active template does not have.
    #[arg(long, env = "HUEBOT_EAGER_REGIONS")]
    eager_regions: bool,
    /// Append applied commands and renders to this JSONL file.
    #[arg(long, env = "HUEBOT_EVENTS")]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct BotArgs {
    #[command(flatten)]
    store: StoreArgs,
    #[command(flatten)]
    buckets: BucketArgs,
    #[command(flatten)]
    interpreter: InterpreterArgs,
    #[arg(long, env = "HUEBOT_USER")]
    user: String,
    #[arg(long, env = "TWITCH_OAUTH_TOKEN", hide_env_values = true)]
    oauth_token: String,
    #[arg(long, env = "HUEBOT_SERVER", default_value = twitch::DEFAULT_SERVER)]
    server: String,
    /// Seconds between renders; 0 disables the render thread.
    #[arg(long, env = "HUEBOT_RENDER_EVERY", default_value_t = 60)]
    render_every: u64,
    #[arg(long, default_value_t = 5)]
    max_reconnects: usize,
}

#[derive(Debug, Parser)]
struct ConsoleArgs {
    #[command(flatten)]
    store: StoreArgs,
    #[command(flatten)]
    buckets: BucketArgs,
    #[command(flatten)]
    interpreter: InterpreterArgs,
    #[arg(long, default_value = "console")]
    sender: String,
}

#[derive(Debug, Parser)]
struct RenderArgs {
    #[command(flatten)]
    store: StoreArgs,
    #[command(flatten)]
    buckets: BucketArgs,
    #[arg(long, env = "HUEBOT_EVENTS")]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct WatchArgs {
    #[command(flatten)]
    store: StoreArgs,
    #[command(flatten)]
    buckets: BucketArgs,
    #[arg(long, env = "HUEBOT_EVENTS")]
    events: Option<PathBuf>,
    #[arg(long, env = "HUEBOT_RENDER_EVERY", default_value_t = 60)]
    every: u64,
}

#[derive(Debug, Parser)]
struct RegionsArgs {
    /// Template image file.
    template: PathBuf,
}

#[derive(Debug, Parser)]
struct StatusArgs {
    #[command(flatten)]
    store: StoreArgs,
}

fn main() {
    logger::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("huebot error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Bot(args) => run_bot(args),
        Command::Console(args) => run_console(args),
        Command::Render(args) => run_render(args),
        Command::Watch(args) => run_watch(args),
        Command::Regions(args) => run_regions(args),
        Command::Status(args) => run_status(args),
    }
}

fn open_store(args: &StoreArgs) -> Arc<dyn ColorStore> {
    Arc::new(JsonFileStore::new(&args.store))
}

fn open_buckets(args: &BucketArgs) -> Arc<DirBlobStore> {
    Arc::new(DirBlobStore::new(&args.templates, &args.out))
}

fn event_log(path: Option<&PathBuf>) -> Option<EventLog> {
    let log = EventLog::new(path?, uuid::Uuid::new_v4().to_string());
    tracing::info!(
        path = %log.path().display(),
        session_id = log.session_id(),
        "recording events"
    );
    Some(log)
}

fn build_renderer(
    store: Arc<dyn ColorStore>,
    blobs: Arc<dyn BlobStore>,
    events: Option<EventLog>,
) -> Renderer {
    let renderer = Renderer::new(store, blobs);
    match events {
        Some(events) => renderer.with_events(events),
        None => renderer,
    }
}

fn build_interpreter(
    args: &InterpreterArgs,
    store: Arc<dyn ColorStore>,
    blobs: Arc<dyn BlobStore>,
    events: Option<EventLog>,
) -> Result<CommandInterpreter> {
    let channel = args.channel.trim();
    if channel.is_empty() {
        bail!("--channel must not be empty");
    }
    let region_check = if args.eager_regions {
        RegionCheck::Eager(blobs)
    } else {
        RegionCheck::Lazy
    };
    let interpreter = CommandInterpreter::new(channel, store).with_region_check(region_check);
    Ok(match events {
        Some(events) => interpreter.with_events(events),
        None => interpreter,
    })
}

fn run_bot(args: BotArgs) -> Result<i32> {
    let store = open_store(&args.store);
    let blobs = open_buckets(&args.buckets);
    let events = event_log(args.interpreter.events.as_ref());
    let interpreter =
        build_interpreter(&args.interpreter, store.clone(), blobs.clone(), events.clone())?;

    let stop = Arc::new(AtomicBool::new(false));
    let render_thread = if args.render_every > 0 {
        let renderer = build_renderer(store, blobs, events);
        Some(
            scheduler::spawn_periodic(
                renderer,
                Duration::from_secs(args.render_every),
                stop.clone(),
            )
            .context("failed to start render thread")?,
        )
    } else {
        None
    };

    let config = twitch::ChatConfig {
        server: args.server,
        user: args.user,
        oauth_token: args.oauth_token,
        channel: interpreter.channel().to_string(),
        max_reconnects: args.max_reconnects,
    };
    let result = twitch::run_bot(&config, &interpreter);

    stop.store(true, Ordering::SeqCst);
    if let Some(handle) = render_thread {
        let _ = handle.join();
    }
    result.map(|()| 0)
}

fn run_console(args: ConsoleArgs) -> Result<i32> {
    let store = open_store(&args.store);
    let blobs = open_buckets(&args.buckets);
    let events = event_log(args.interpreter.events.as_ref());
    let interpreter = build_interpreter(&args.interpreter, store, blobs, events)?;

    let stdin = io::stdin();
    let mut line = String::new();
    println!("huebot console on {}. Try !colorhelp", interpreter.channel());

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let text = input.strip_prefix(COMMAND_PREFIX).unwrap_or(input);
        let message = ChatMessage::new(&args.sender, interpreter.channel(), text);
        match interpreter.handle(&message) {
            Outcome::Help(reply) => println!("{reply}"),
            Outcome::ColorSet {
                image,
                region,
                color,
            } => println!("{image}: region {region} = {color}"),
            Outcome::ImageActivated { image } => println!("Active image set to {image}"),
            Outcome::Rejected(err) => println!("rejected: {err}"),
            Outcome::Ignored | Outcome::OffChannel => {}
        }
    }
    Ok(0)
}

fn run_render(args: RenderArgs) -> Result<i32> {
    let renderer = build_renderer(
        open_store(&args.store),
        open_buckets(&args.buckets),
        event_log(args.events.as_ref()),
    );
    let receipt = renderer.render_to_sink().context("render failed")?;
    println!(
        "Rendered {} ({} regions, {} colored) to {}",
        receipt.image,
        receipt.region_count,
        receipt.colored_regions,
        args.buckets.out.join(&receipt.image).display()
    );
    Ok(0)
}

fn run_watch(args: WatchArgs) -> Result<i32> {
    if args.every == 0 {
        bail!("--every must be at least 1 second");
    }
    let renderer = build_renderer(
        open_store(&args.store),
        open_buckets(&args.buckets),
        event_log(args.events.as_ref()),
    );
    let stop = AtomicBool::new(false);
    scheduler::run_periodic(&renderer, Duration::from_secs(args.every), &stop);
    Ok(0)
}

fn run_regions(args: RegionsArgs) -> Result<i32> {
    let id = args.template.display().to_string();
    let bytes = std::fs::read(&args.template).with_context(|| format!("failed reading {id}"))?;
    let template = decode_template(&id, &bytes)?;
    let segmentation = segment(&template);
    let (width, height) = segmentation.dimensions();
    println!(
        "{id}: {width}x{height}, {} regions",
        segmentation.region_count()
    );
    for region in segmentation.regions() {
        println!(
            "{:>5}  seed=({}, {})  pixels={}",
            region.index, region.seed.0, region.seed.1, region.pixel_count
        );
    }
    Ok(0)
}

fn run_status(args: StatusArgs) -> Result<i32> {
    let store = open_store(&args.store);
    match store.get_active_image() {
        Ok(image) => println!("Active image: {image}"),
        Err(HueError::NotConfigured) => println!("Active image: (none)"),
        Err(err) => return Err(err.into()),
    }
    for image in store.list_images()? {
        let colors = store.get_color_map(&image)?;
        println!("{image}: {} colored regions", colors.len());
        for (region, color) in colors {
            println!("  {region:>5} {color}");
        }
    }
    Ok(0)
}
