use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, ValueEnum};
use crossbeam::channel::{self, Receiver, never, select};
use kaosspad::audio::{EngineEvent, StreamManager};
use kaosspad::decoder::{SourceRange, WavDecoderFactory};
use kaosspad::fx::EffectMode;
use kaosspad::settings::Settings;
use log::{debug, error, info, warn};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "kaosspad")]
#[command(version)]
#[command(about = "XY pad effects player. Reads transport and pad commands from stdin.")]
struct Args {
    #[arg(help = "WAV file, or a container holding WAV data at --offset")]
    file: Option<PathBuf>,
    #[arg(long, default_value_t = 0, help = "Byte offset of the audio data")]
    offset: u64,
    #[arg(long, help = "Byte length of the audio data [default: rest of file]")]
    size: Option<u64>,
    #[arg(long, value_enum, env = "KAOSSPAD_MODE", help = "Initial effect")]
    mode: Option<EffectMode>,
    #[arg(long, default_value_t = 0.5, help = "Initial pad X position")]
    x: f32,
    #[arg(long, default_value_t = 0.5, help = "Initial pad Y position")]
    y: f32,
    #[arg(long, help = "Don't connect outputs to the configured playback ports")]
    no_connect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Play,
    Pause,
    Stop,
    Seek(u64),
    Mode(i32),
    Xy(f32, f32),
    Status,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            bail!("empty command");
        };
        let mut arg = |what: &str| {
            words
                .next()
                .ok_or_else(|| anyhow!("'{name}' needs {what}"))
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "play" => Self::Play,
            "pause" => Self::Pause,
            "stop" => Self::Stop,
            "seek" => Self::Seek(arg("a position in ms")?.parse().context("invalid position")?),
            "mode" => Self::Mode(parse_mode(arg("an effect name or number")?)?),
            "xy" => {
                let x = arg("x and y")?.parse().context("invalid x")?;
                let y = arg("x and y")?.parse().context("invalid y")?;
                Self::Xy(x, y)
            }
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command '{other}'"),
        };

        Ok(command)
    }
}

/// Mode names follow the `--mode` values; any integer is passed through raw.
fn parse_mode(word: &str) -> Result<i32> {
    if let Ok(tag) = word.parse::<i32>() {
        return Ok(tag);
    }

    EffectMode::from_str(word, true)
        .map(EffectMode::tag)
        .map_err(|_| anyhow!("unknown effect '{word}'"))
}

fn execute(stream: &StreamManager, command: Command) {
    let engine = stream.engine();
    match command {
        Command::Play => engine.play(),
        Command::Pause => engine.pause(),
        Command::Stop => engine.stop(),
        Command::Seek(ms) => engine.seek_to(ms),
        Command::Mode(tag) => {
            engine.set_effect_mode(tag);
            match EffectMode::from_tag(tag) {
                Some(mode) => {
                    let (x_axis, y_axis) = mode.axis_names();
                    info!("Effect: {mode} (x: {x_axis}, y: {y_axis})");
                }
                None => info!("Effect: none ({tag})"),
            }
        }
        Command::Xy(x, y) => engine.set_xy(x, y),
        Command::Status => print_status(stream),
        Command::Quit => {}
    }
}

fn print_status(stream: &StreamManager) {
    let engine = stream.engine();
    let (x, y) = engine.xy();
    let mode = engine
        .effect_mode()
        .map_or_else(|| "none".to_string(), |mode| mode.to_string());
    let peak = stream.peak();

    println!(
        "[{}{}] {} {}/{} ms | {mode} x={x:.2} y={y:.2} | peak {:.1} dB{} | starved {}",
        stream.settings().client_name,
        if stream.is_running() { "" } else { ", stopped" },
        if engine.is_playing() { "playing" } else { "paused" },
        engine.position_ms(),
        engine.duration_ms(),
        peak.peak_db,
        if peak.is_clipping { " CLIP" } else { "" },
        engine.starvation_count(),
    );
}

/// Forward stdin lines on a channel; the channel disconnects at EOF.
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = channel::unbounded();

    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        error!("Failed to read stdin: {e}");
                        break;
                    }
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn stdin reader")?;

    Ok(rx)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    info!("Kaosspad v{}", env!("CARGO_PKG_VERSION"));
    info!("Args: {args:?}");

    let mut settings = Settings::load().unwrap_or_else(|e| {
        warn!("Failed to load settings, using defaults: {e:#}");
        Settings::default()
    });
    if args.no_connect {
        settings.audio.auto_connect = false;
    }
    settings.apply_to_environment();
    debug!("{settings}");

    let mut stream = StreamManager::new(
        settings.audio.clone(),
        Arc::new(WavDecoderFactory::default()),
    );
    let engine = stream.engine().clone();

    engine.set_effect_mode(args.mode.unwrap_or(settings.effect_mode).tag());
    engine.set_xy(args.x, args.y);

    if let Some(path) = &args.file {
        let source = SourceRange::open(path, args.offset, args.size)
            .with_context(|| format!("failed to open '{}'", path.display()))?;
        if !engine.load_source(source) {
            bail!("failed to load '{}'", path.display());
        }
    }

    stream.start().context("failed to start audio stream")?;

    let running = Arc::new(AtomicBool::new(true));
    let shutdown_flag = Arc::clone(&running);

    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        shutdown_flag.store(false, Ordering::SeqCst);
    })
    .context("error setting Ctrl+C handler")?;

    let mut commands = spawn_stdin_reader()?;
    let mut stdin_closed = false;

    while running.load(Ordering::SeqCst) {
        if stdin_closed {
            commands = never();
            stdin_closed = false;
        }

        select! {
            recv(commands) -> line => match line {
                Ok(line) if line.trim().is_empty() => {}
                Ok(line) => match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(&stream, command),
                    Err(e) => warn!("{e:#}"),
                },
                Err(_) => {
                    debug!("stdin closed, no more commands");
                    stdin_closed = true;
                }
            },
            recv(engine.events()) -> event => match event {
                Ok(EngineEvent::PlaybackFinished) => info!("Playback finished"),
                Ok(EngineEvent::Starved { total }) => {
                    warn!("Decoder starved ({total} callbacks so far)");
                }
                Err(_) => break,
            },
            default(POLL_INTERVAL) => {}
        }
    }

    stream.stop();
    info!("Bye");

    Ok(())
}
