#[allow(dead_code)]
mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::Duration;

use crossterm::style::{Color, Stylize};
use trigger_core::config::BoardVariant;
use trigger_core::pulse::StatusColor;

use session::{HostClock, Session, SessionLine};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

struct Options {
    variant: BoardVariant,
    clock_offset: u32,
    transcript: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!(
            "Usage: trigger-emulator [--variant <feather|uno>] [--clock-offset <ms>] [--transcript <path>]"
        );
        process::exit(2);
    });

    let mut session = Session::new(options.variant, HostClock::with_offset(options.clock_offset));
    if let Some(path) = options.transcript.as_deref() {
        session = session.with_transcript(path, "Trigger box emulator interactive transcript")?;
    }

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    writeln!(
        writer,
        "Trigger box emulator ({}) ready. Type `?` for settings, anything unknown for help, `exit` to quit.",
        options.variant.tag()
    )?;
    writer.flush()?;

    let input = spawn_stdin_reader();

    loop {
        match input.try_recv() {
            Ok(line) => {
                let trimmed = line.trim();
                if should_terminate(trimmed) {
                    writeln!(writer, "Session closed.")?;
                    break;
                }
                if !trimmed.is_empty() {
                    print_lines(&mut writer, &session.handle_line(trimmed)?)?;
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                writeln!(writer)?;
                break;
            }
        }

        print_lines(&mut writer, &session.poll()?)?;
        thread::sleep(POLL_INTERVAL);
    }

    Ok(())
}

/// Reads stdin on a helper thread so the poll loop never blocks on input.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

fn print_lines<W: Write>(writer: &mut W, lines: &[SessionLine]) -> io::Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    for line in lines {
        match line {
            SessionLine::Text(text) => writeln!(writer, "{text}")?,
            SessionLine::Status(color) => {
                let swatch = "●".with(terminal_color(*color));
                writeln!(writer, "{swatch} status LED {}", color.label())?;
            }
        }
    }
    writer.flush()
}

fn terminal_color(color: StatusColor) -> Color {
    let (r, g, b) = color.rgb();
    Color::Rgb { r, g, b }
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        variant: BoardVariant::FeatherM4,
        clock_offset: 0,
        transcript: None,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--variant" => {
                let tag = value()?;
                options.variant = BoardVariant::from_tag(&tag)
                    .ok_or_else(|| format!("Unknown board variant `{tag}`"))?;
            }
            "--clock-offset" => {
                let raw = value()?;
                options.clock_offset = raw
                    .parse()
                    .map_err(|_| format!("Invalid clock offset `{raw}`"))?;
            }
            "--transcript" => options.transcript = Some(PathBuf::from(value()?)),
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(options)
}
