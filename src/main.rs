use anyhow::Result;
use clap::{CommandFactory, Parser};
use crossbeam_channel::Receiver;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use voxgate::audio::{AudioBatch, WavInput};
use voxgate::cli::{Cli, Commands};
use voxgate::config::Config;
use voxgate::pipeline::{Pipeline, PipelineEvent};
use voxgate::protocol::Event;
use voxgate::segment::EndReason;
use voxgate::session::{StdioTransport, run_session};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = effective_config(&cli)?;
            if std::io::stdin().is_terminal() {
                eprintln!("voxgate: stdin is a terminal, nothing to analyze");
                eprintln!("Pipe WAV data in (voxgate < clip.wav) or use 'voxgate run <FILE>'");
                std::process::exit(2);
            }
            // Pipe mode: stdin carries WAV data
            let wav = match WavInput::from_reader(
                Box::new(std::io::stdin()),
                config.audio.sample_rate,
                config.audio.samples_per_batch(),
            ) {
                Ok(wav) => wav,
                Err(e) => {
                    eprintln!("{}", format!("Failed to read WAV from stdin: {}", e).red());
                    std::process::exit(1);
                }
            };
            run_wav(config, wav, cli.json, cli.quiet)?;
        }
        Some(Commands::Run { ref file }) => {
            let config = effective_config(&cli)?;
            let wav = match WavInput::from_path(
                file,
                config.audio.sample_rate,
                config.audio.samples_per_batch(),
            ) {
                Ok(wav) => wav,
                Err(e) => {
                    eprintln!("{}", format!("Failed to read {}: {}", file.display(), e).red());
                    std::process::exit(1);
                }
            };
            run_wav(config, wav, cli.json, cli.quiet)?;
        }
        Some(Commands::Serve) => {
            let config = effective_config(&cli)?;
            let handle = Pipeline::new(config).start()?;
            run_session(handle, StdioTransport::new()).await?;
        }
        Some(Commands::Config { path }) => {
            handle_config_command(&cli, path)?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "voxgate", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/voxgate/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        // Load from custom path
        Config::load(path)?
    } else {
        // Try default path, fall back to defaults
        let default_path = Config::default_path();
        Config::load_or_default(&default_path)
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides())
}

/// Loaded config with the CLI flag overrides folded in and re-validated.
fn effective_config(cli: &Cli) -> Result<Config> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(threshold) = cli.threshold {
        config.classifier.threshold = threshold;
    }
    if let Some(max_speech) = cli.max_speech {
        config.detector.max_speech_duration_secs = max_speech;
    }
    config.validate()?;
    Ok(config)
}

/// Per-run statistics accumulated by the event printer.
struct RunSummary {
    segments: u64,
    speech_ms: u64,
    open_segment_ms: Option<u64>,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            segments: 0,
            speech_ms: 0,
            open_segment_ms: None,
        }
    }

    fn record(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::SpeechStart { timestamp_ms, .. } => {
                self.open_segment_ms = Some(*timestamp_ms);
            }
            PipelineEvent::SpeechEnd { timestamp_ms, .. } => {
                self.segments += 1;
                if let Some(started) = self.open_segment_ms.take() {
                    self.speech_ms += timestamp_ms.saturating_sub(started);
                }
            }
            _ => {}
        }
    }
}

/// Feed a decoded WAV through a fresh pipeline and print the events.
///
/// Batches carry stream-position timestamps (batch index times batch
/// duration), not wall-clock time, so the printed offsets match the file.
fn run_wav(config: Config, wav: WavInput, json: bool, quiet: bool) -> Result<()> {
    let batch_ms = u64::from(config.audio.batch_duration_ms());
    let samples_per_batch = config.audio.samples_per_batch();
    let audio_ms = wav.duration_ms(config.audio.sample_rate);

    let handle = Pipeline::new(config).start()?;
    handle.init()?;

    let events = handle.events();
    let printer = std::thread::spawn(move || print_events(&events, json, quiet));

    let mut sent: u64 = 0;
    for chunk in wav {
        if chunk.len() < samples_per_batch {
            // Trailing partial batch carries no complete verdict window.
            break;
        }
        sent += 1;
        handle.send_batch_blocking(AudioBatch::new(chunk, sent * batch_ms))?;
    }

    // close() stops any open segment first, so a file that ends mid-speech
    // still gets its SpeechEnd before the printer sees the channel close.
    let (pulled, leftover) = handle.close();
    drop(leftover);

    let mut summary = match printer.join() {
        Ok(summary) => summary,
        Err(_) => return Err(anyhow::anyhow!("event printer thread panicked")),
    };
    // Anything close() pulled aside bypassed the printer; render and count
    // it here.
    for event in &pulled {
        summary.record(event);
        render_event(event, json, quiet);
    }

    if !json && !quiet {
        println!(
            "{} segment(s), {} speech in {} audio",
            summary.segments,
            format_duration(summary.speech_ms),
            format_duration(audio_ms)
        );
    }

    Ok(())
}

/// Drain the pipeline's event stream until it disconnects, rendering each
/// event and tallying segment statistics.
fn print_events(events: &Receiver<PipelineEvent>, json: bool, quiet: bool) -> RunSummary {
    let mut summary = RunSummary::new();
    for event in events.iter() {
        summary.record(&event);
        render_event(&event, json, quiet);
    }
    summary
}

fn render_event(event: &PipelineEvent, json: bool, quiet: bool) {
    if json {
        match Event::from(event.clone()).to_json() {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("voxgate: failed to encode event: {}", e),
        }
        return;
    }

    match event {
        PipelineEvent::Initialized => {
            if !quiet {
                println!("{}", "classifier ready".dimmed());
            }
        }
        PipelineEvent::Status { message } => {
            if !quiet {
                println!("{}", message.dimmed());
            }
        }
        PipelineEvent::Error { message } => {
            eprintln!("{}", format!("Error: {}", message).red());
        }
        PipelineEvent::SpeechStart {
            timestamp_ms,
            pre_roll_ms,
            ..
        } => {
            println!(
                "{} {} speech start (pre-roll {}ms)",
                "●".green(),
                format_timestamp(*timestamp_ms),
                pre_roll_ms
            );
        }
        PipelineEvent::SpeechEnd {
            timestamp_ms,
            reason,
            ..
        } => {
            let label = match reason {
                EndReason::Timeout => "silence",
                EndReason::ManualStop => "stopped",
            };
            println!(
                "{} {} speech end ({})",
                "○".dimmed(),
                format_timestamp(*timestamp_ms),
                label
            );
        }
        PipelineEvent::State { .. } => {}
    }
}

/// Handle the `config` command: print the effective TOML or the default
/// config file path.
fn handle_config_command(cli: &Cli, path_only: bool) -> Result<()> {
    if path_only {
        println!("{}", Config::default_path().display());
        return Ok(());
    }

    let config = effective_config(cli)?;
    match toml::to_string(&config) {
        Ok(toml) => print!("{}", toml),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Stream offset as `m:ss.mmm`.
fn format_timestamp(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{}:{:02}.{:03}", minutes, seconds, millis)
}

/// Duration as decimal seconds, e.g. `3.4s`.
fn format_duration(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}
