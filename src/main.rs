// src/main.rs

use anyhow::Context;
use audio_trimmer_lib::{
    DecodeOutcome, DecodeStatus, ExportSettings, PreviewTarget, SourceAsset, TrimSession,
    WavFormat,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Interactive trimming session: open a file, set start/end, cut, download
#[derive(Parser, Debug)]
#[command(name = "audio-trimmer")]
#[command(about = "Trim an audio file interactively and export the cut as WAV", long_about = None)]
struct Args {
    /// Audio file to open right away
    file: Option<PathBuf>,

    /// Sample encoding of exported WAV files (pcm16 or float32)
    #[arg(short, long, default_value_t = WavFormat::Pcm16)]
    format: WavFormat,

    /// Where `download` saves when no path is given
    #[arg(short, long, default_value = ".")]
    download_dir: PathBuf,
}

/// One line typed into the shell
#[derive(Debug, PartialEq)]
enum Command {
    Open(PathBuf),
    Start(f64),
    End(f64),
    Cut,
    Download(Option<PathBuf>),
    Play(PreviewTarget),
    Pause,
    Resume,
    Seek(f64),
    Stop,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let seconds = |field: &str| {
            rest.parse::<f64>()
                .map_err(|_| format!("{} needs a number of seconds, got '{}'", field, rest))
        };

        match word {
            "open" if !rest.is_empty() => Ok(Command::Open(PathBuf::from(rest))),
            "open" => Err("open needs a file path".to_string()),
            "start" => seconds("start").map(Command::Start),
            "end" => seconds("end").map(Command::End),
            "cut" => Ok(Command::Cut),
            "download" if rest.is_empty() => Ok(Command::Download(None)),
            "download" => Ok(Command::Download(Some(PathBuf::from(rest)))),
            "play" if rest.is_empty() => Ok(Command::Play(PreviewTarget::Original)),
            "play" => rest.parse().map(Command::Play),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "seek" => seconds("seek").map(Command::Seek),
            "stop" => Ok(Command::Stop),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("Unknown command '{}', type `help`", other)),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  open <path>                  select an audio file");
    println!("  start <seconds>              set the start of the cut");
    println!("  end <seconds>                set the end of the cut");
    println!("  cut                          trim and encode the range");
    println!("  download [path]              save the latest cut");
    println!("  play [original|trimmed]      preview audio");
    println!("  pause / resume               pause or continue the preview");
    println!("  seek <seconds>               jump within the preview");
    println!("  stop                         stop the preview");
    println!("  status                       show the session as JSON");
    println!("  quit");
}

/// Read the file and start decoding it in the background
fn open_file(session: &mut TrimSession, decoded_tx: &mpsc::UnboundedSender<DecodeOutcome>, path: &Path) {
    let asset = match SourceAsset::from_path(path) {
        Ok(asset) => asset,
        Err(e) => {
            eprintln!("❌ {}", e);
            return;
        }
    };

    println!("🔊 Decoding {}...", asset.name);
    let request = session.select(asset);
    let decoded_tx = decoded_tx.clone();
    tokio::spawn(async move {
        // Receiver lives as long as the shell loop
        let _ = decoded_tx.send(request.run().await);
    });
}

fn report_decode(session: &mut TrimSession, outcome: DecodeOutcome) {
    let name = outcome.asset_name().to_string();

    match session.finish_decode(outcome) {
        Ok(DecodeStatus::Loaded { duration_seconds }) => {
            println!("\n📊 Loaded: {}", name);
            println!(
                "   Duration: {:.2} seconds ({:.2} minutes)",
                duration_seconds,
                duration_seconds / 60.0
            );
            println!("   Range: start 0.00s, end {:.2}s", duration_seconds);
        }
        Ok(DecodeStatus::Stale) => {}
        Err(e) => eprintln!("❌ {}: {}", name, e),
    }
}

fn run_command(session: &mut TrimSession, command: Command, download_dir: &Path) -> anyhow::Result<()> {
    match command {
        Command::Start(seconds) => session.set_start(seconds),
        Command::End(seconds) => session.set_end(seconds),
        Command::Cut => match session.cut() {
            Ok(handle) => {
                if let Some(range) = session.export_range() {
                    println!(
                        "✂️  Cut {:.2}s..{:.2}s ({:.2}s) ready at {}",
                        range.start_seconds,
                        range.end_seconds,
                        range.trim_duration(),
                        handle
                    );
                }
                println!("   Type `download` to save it");
            }
            Err(e) => eprintln!("❌ {}", e),
        },
        Command::Download(path) => {
            let saved = match path {
                Some(path) => session.download(&path).map(|()| path),
                None => session.download_to_dir(download_dir),
            };
            match saved {
                Ok(path) => println!("💾 Saved {}", path.display()),
                Err(e) => eprintln!("❌ {}", e),
            }
        }
        Command::Status => {
            let status = serde_json::to_string_pretty(&session.status())
                .context("Failed to render session status")?;
            println!("{}", status);
        }
        Command::Help => print_help(),
        Command::Open(_)
        | Command::Play(_)
        | Command::Pause
        | Command::Resume
        | Command::Seek(_)
        | Command::Stop
        | Command::Quit => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter support
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("audio_trimmer_lib=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut session = TrimSession::new(ExportSettings::new().with_format(args.format));
    let (decoded_tx, mut decoded_rx) = mpsc::unbounded_channel();

    #[cfg(feature = "playback")]
    let mut player = audio_trimmer_lib::AudioPlayer::new();

    println!("🎵 Audio Trimmer");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print_help();

    if let Some(path) = &args.file {
        open_file(&mut session, &decoded_tx, path);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(message) => {
                        eprintln!("❌ {}", message);
                        continue;
                    }
                };

                match command {
                    Command::Quit => break,
                    Command::Open(path) => open_file(&mut session, &decoded_tx, &path),
                    #[cfg(feature = "playback")]
                    Command::Play(target) => match session.preview_buffer(target) {
                        Some(audio) => match player.play(audio) {
                            Ok(()) => println!("▶️  Playing {:?}", target),
                            Err(e) => eprintln!("❌ {}", e),
                        },
                        None => eprintln!("❌ Nothing to play for {:?}", target),
                    },
                    #[cfg(feature = "playback")]
                    Command::Pause => player.pause(),
                    #[cfg(feature = "playback")]
                    Command::Resume => player.resume(),
                    #[cfg(feature = "playback")]
                    Command::Seek(seconds) => player.seek(seconds),
                    #[cfg(feature = "playback")]
                    Command::Stop => player.stop(),
                    #[cfg(not(feature = "playback"))]
                    Command::Play(_)
                    | Command::Pause
                    | Command::Resume
                    | Command::Seek(_)
                    | Command::Stop => {
                        eprintln!("❌ Preview needs the `playback` feature");
                    }
                    other => run_command(&mut session, other, &args.download_dir)?,
                }
            }
            Some(outcome) = decoded_rx.recv() => {
                report_decode(&mut session, outcome);
            }
        }
    }

    session.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "open  my song.mp3 ".parse::<Command>().unwrap(),
            Command::Open(PathBuf::from("my song.mp3"))
        );
        assert_eq!("start 1.5".parse::<Command>().unwrap(), Command::Start(1.5));
        assert_eq!("end 12".parse::<Command>().unwrap(), Command::End(12.0));
        assert_eq!("cut".parse::<Command>().unwrap(), Command::Cut);
        assert_eq!("download".parse::<Command>().unwrap(), Command::Download(None));
        assert_eq!(
            "play trimmed".parse::<Command>().unwrap(),
            Command::Play(PreviewTarget::Trimmed)
        );
        assert_eq!("play".parse::<Command>().unwrap(), Command::Play(PreviewTarget::Original));
        assert_eq!("pause".parse::<Command>().unwrap(), Command::Pause);
        assert_eq!("resume".parse::<Command>().unwrap(), Command::Resume);
        assert_eq!("seek 2.5".parse::<Command>().unwrap(), Command::Seek(2.5));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("start".parse::<Command>().is_err());
        assert!("end soon".parse::<Command>().is_err());
        assert!("open".parse::<Command>().is_err());
        assert!("seek".parse::<Command>().is_err());
        assert!("rewind".parse::<Command>().is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["audio-trimmer", "in.mp3", "--format", "float32"]).unwrap();
        assert_eq!(args.file, Some(PathBuf::from("in.mp3")));
        assert_eq!(args.format, WavFormat::Float32);
        assert_eq!(args.download_dir, PathBuf::from("."));
    }
}
