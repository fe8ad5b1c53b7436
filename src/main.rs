// src/main.rs

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use audioseg_lib::audio::{DefaultTranscoder, ExportOptions, Fade, Position, Segment, Transcoder};
use audioseg_lib::TranscoderConfig;

/// Command-line tool for editing audio clips
#[derive(Parser, Debug)]
#[command(name = "audioseg")]
#[command(about = "Slice, fade, overlay and join audio clips", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Show detailed information
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print format and loudness of an audio file
    Info {
        /// Input audio file (MP3, FLAC, WAV, OGG, etc.)
        input: PathBuf,
    },

    /// Keep the milliseconds between --start and --end
    Slice {
        #[command(flatten)]
        io: InputOutput,

        /// Start in ms (negative counts from the end)
        #[arg(short, long, allow_hyphen_values = true)]
        start: Option<i64>,

        /// End in ms (negative counts from the end)
        #[arg(short, long, allow_hyphen_values = true)]
        end: Option<i64>,
    },

    /// Change the volume by a number of decibels
    Gain {
        #[command(flatten)]
        io: InputOutput,

        /// Volume change in dB
        #[arg(long, allow_hyphen_values = true)]
        db: f64,
    },

    /// Fade the volume between two gains
    Fade {
        #[command(flatten)]
        io: InputOutput,

        /// Gain at the end of the fade, in dB
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        to_gain: f64,

        /// Gain at the start of the fade, in dB
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        from_gain: f64,

        /// Fade start in ms
        #[arg(long, allow_hyphen_values = true)]
        start: Option<i64>,

        /// Fade end in ms
        #[arg(long, allow_hyphen_values = true, conflicts_with = "to_end")]
        end: Option<i64>,

        /// End the fade at the very end of the input
        #[arg(long)]
        to_end: bool,

        /// Fade length in ms
        #[arg(long)]
        duration: Option<i64>,
    },

    /// Mix a second file over the input
    Overlay {
        #[command(flatten)]
        io: InputOutput,

        /// Audio to mix in
        #[arg(long)]
        with: PathBuf,

        /// Where to start mixing, in ms
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        position: i64,

        /// Repeat the overlay until the input ends
        #[arg(long = "loop")]
        looped: bool,
    },

    /// Join files one after another
    Append {
        /// Input audio files, in order
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Crossfade between clips in ms
        #[arg(long, default_value_t = audioseg_lib::audio::DEFAULT_CROSSFADE_MS)]
        crossfade: i64,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Play the input backwards
    Reverse {
        #[command(flatten)]
        io: InputOutput,
    },
}

#[derive(Args, Debug)]
struct InputOutput {
    /// Input audio file (MP3, FLAC, WAV, OGG, etc.)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Output format (defaults to the output file extension)
    #[arg(long)]
    format: Option<String>,

    /// JSON file with export options (codec, bitrate, tags, ...)
    #[arg(long)]
    options: Option<PathBuf>,
}

impl ExportArgs {
    fn format_for(&self, output: &Path) -> String {
        self.format
            .clone()
            .or_else(|| output.extension().and_then(|e| e.to_str()).map(str::to_string))
            .unwrap_or_else(|| "wav".to_string())
    }

    fn load_options(&self) -> anyhow::Result<ExportOptions> {
        match &self.options {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading export options {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing export options {}", path.display()))
            }
            None => Ok(ExportOptions::default()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter support
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("audioseg=info")),
        )
        .init();

    let cli = Cli::parse();
    let transcoder = DefaultTranscoder::new(TranscoderConfig::from_env());

    match cli.command {
        Command::Info { input } => {
            let audio = load(&transcoder, &input, cli.verbose)?;
            print_info(&input, &audio);
        }
        Command::Slice { io, start, end } => {
            let audio = load(&transcoder, &io.input, cli.verbose)?;
            let sliced = match (start, end) {
                (Some(start), Some(end)) => audio.slice(start..end)?,
                (Some(start), None) => audio.slice(start..)?,
                (None, Some(end)) => audio.slice(..end)?,
                (None, None) => audio.slice(..)?,
            };
            println!("\n✂️  Sliced {}ms -> {}ms", audio.len_ms(), sliced.len_ms());
            save(&transcoder, &sliced, &io.output, &io.export)?;
        }
        Command::Gain { io, db } => {
            let audio = load(&transcoder, &io.input, cli.verbose)?;
            let louder = audio.apply_gain(db);
            println!("\n🔊 Gain {:+.1}dB: {:.1} dBFS -> {:.1} dBFS", db, audio.dbfs(), louder.dbfs());
            save(&transcoder, &louder, &io.output, &io.export)?;
        }
        Command::Fade {
            io,
            to_gain,
            from_gain,
            start,
            end,
            to_end,
            duration,
        } => {
            let audio = load(&transcoder, &io.input, cli.verbose)?;

            let mut fade = Fade::new().to_gain(to_gain).from_gain(from_gain);
            fade.start = start.map(Position::At);
            fade.end = if to_end { Some(Position::Unbounded) } else { end.map(Position::At) };
            fade.duration = duration;

            let faded = audio.fade(fade)?;
            println!("\n🎚️  Faded {:+.1}dB -> {:+.1}dB", from_gain, to_gain);
            save(&transcoder, &faded, &io.output, &io.export)?;
        }
        Command::Overlay {
            io,
            with,
            position,
            looped,
        } => {
            let audio = load(&transcoder, &io.input, cli.verbose)?;
            let other = load(&transcoder, &with, cli.verbose)?;
            let mixed = audio.overlay(&other, position, looped)?;
            println!("\n🎛️  Overlaid {} at {}ms{}", with.display(), position, if looped { " (looped)" } else { "" });
            save(&transcoder, &mixed, &io.output, &io.export)?;
        }
        Command::Append {
            inputs,
            output,
            crossfade,
            export,
        } => {
            let mut joined = Segment::empty();
            for (idx, input) in inputs.iter().enumerate() {
                let clip = load(&transcoder, input, cli.verbose)?;
                // nothing to crossfade into before the first clip
                let xf = if idx == 0 { 0 } else { crossfade };
                joined = joined.append(&clip, xf)?;
            }
            println!("\n🔗 Joined {} clips ({}ms crossfade): {}ms", inputs.len(), crossfade, joined.len_ms());
            save(&transcoder, &joined, &output, &export)?;
        }
        Command::Reverse { io } => {
            let audio = load(&transcoder, &io.input, cli.verbose)?;
            save(&transcoder, &audio.reverse(), &io.output, &io.export)?;
        }
    }

    Ok(())
}

fn load(transcoder: &DefaultTranscoder, path: &Path, verbose: bool) -> anyhow::Result<Segment> {
    let start_time = std::time::Instant::now();
    let audio = transcoder
        .decode_file(path, None)
        .with_context(|| format!("decoding {}", path.display()))?;

    if verbose {
        println!("📋 Loaded {} ({}ms) in {:.2}s", path.display(), audio.len_ms(), start_time.elapsed().as_secs_f64());
    }

    Ok(audio)
}

fn save(transcoder: &DefaultTranscoder, audio: &Segment, output: &Path, export: &ExportArgs) -> anyhow::Result<()> {
    let format = export.format_for(output);
    let options = export.load_options()?;

    transcoder
        .export_file(audio, output, &format, &options)
        .with_context(|| format!("exporting {}", output.display()))?;

    println!("\n✅ Done! Output saved to: {}", output.display());
    Ok(())
}

fn print_info(path: &Path, audio: &Segment) {
    println!("\n📊 Input File: {}", path.display());
    println!("   Duration: {}ms ({:.2} seconds)", audio.len_ms(), audio.duration_seconds());
    println!("   Frame Rate: {} Hz", audio.frame_rate());
    println!("   Channels: {}", audio.channels());
    println!("   Sample Width: {} bytes", audio.sample_width());
    println!("   Peak: {} / {}", audio.max(), audio.max_possible_amplitude());
    println!("   Loudness: {:.2} dBFS", audio.dbfs());
}
