// src/bin/audio_trim.rs

use audio_trimmer_lib::audio::{
    decode_audio_file, get_audio_info, trim_audio, write_wav, AudioInfo, TrimRange, WavFormat,
};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

/// Command-line tool for trimming audio files
#[derive(Parser, Debug)]
#[command(name = "audio-trim")]
#[command(about = "Trim audio files to a specific time range", long_about = None)]
struct Args {
    /// Input audio file (MP3, FLAC, WAV, OGG, etc.)
    #[arg(short, long)]
    input: PathBuf,

    /// Output WAV file
    #[arg(short, long)]
    output: PathBuf,

    /// Start time in seconds
    #[arg(short, long)]
    start: f64,

    /// End time in seconds (clamped to the input duration)
    #[arg(short, long)]
    end: f64,

    /// WAV sample encoding: pcm16 or float32
    #[arg(short, long, default_value_t = WavFormat::Pcm16)]
    format: WavFormat,

    /// Show detailed information
    #[arg(short, long)]
    verbose: bool,

    /// Print a JSON summary instead of progress output
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct TrimSummary<'a> {
    input: &'a PathBuf,
    output: &'a PathBuf,
    source: &'a AudioInfo,
    range: TrimRange,
    format: WavFormat,
    frames: usize,
    duration_seconds: f64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "audio_trimmer_lib=debug"
    } else {
        "audio_trimmer_lib=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let progress = !args.json;

    // Step 1: Validate the range before touching the file
    let range = TrimRange::new(args.start, args.end)?;

    // Step 2: Get audio info
    let info = get_audio_info(&args.input)?;

    if progress {
        println!("🎵 Audio Trimmer");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("\n📊 Input File: {}", args.input.display());
        println!(
            "   Duration: {:.2} seconds ({:.2} minutes)",
            info.duration_seconds,
            info.duration_seconds / 60.0
        );
        println!("   Sample Rate: {} Hz", info.sample_rate);
        println!("   Channels: {}", info.channels);
        println!("   Format: {}", info.format);

        println!("\n✂️  Trim Range:");
        println!("   Start: {:.2}s", range.start_seconds);
        println!("   End: {:.2}s", range.end_seconds);
        println!("   Duration: {:.2}s", range.trim_duration());

        if info.duration_seconds > 0.0 && range.end_seconds > info.duration_seconds {
            println!(
                "   ⚠️  End exceeds audio duration ({:.2}s), cutting to the end",
                info.duration_seconds
            );
        }
    }

    // Step 3: Decode audio
    if progress {
        println!("\n🔊 Decoding audio...");
    }
    let start_time = std::time::Instant::now();
    let audio = decode_audio_file(&args.input)?;

    if progress && args.verbose {
        println!(
            "   Loaded {} frames × {} channels ({:.2} MB)",
            audio.frame_count(),
            audio.channel_count(),
            (audio.frame_count() * audio.channel_count() * 4) as f64 / 1_048_576.0
        );
        println!("   Decode time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    // Step 4: Trim audio
    if progress {
        println!("\n✂️  Trimming audio...");
    }
    let trimmed = trim_audio(&audio, &range)?;

    if progress && args.verbose {
        println!("   Trimmed to {} frames", trimmed.frame_count());
        println!("   New duration: {:.2}s", trimmed.duration_seconds());
    }

    // Step 5: Encode to WAV
    if progress {
        println!("\n💾 Encoding to WAV ({})...", args.format);
    }
    let encode_start = std::time::Instant::now();
    write_wav(&trimmed, &args.output, args.format)?;

    if progress && args.verbose {
        println!("   Encode time: {:.2}s", encode_start.elapsed().as_secs_f64());
    }

    if args.json {
        let summary = TrimSummary {
            input: &args.input,
            output: &args.output,
            source: &info,
            range,
            format: args.format,
            frames: trimmed.frame_count(),
            duration_seconds: trimmed.duration_seconds(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("\n✅ Done! Output saved to: {}", args.output.display());
        println!("   Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    Ok(())
}
