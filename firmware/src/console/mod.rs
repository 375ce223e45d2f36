//! Operator console plumbing between USB and the shared command dispatcher.
//!
//! Bytes arriving from the CDC interface are assembled into lines by
//! [`LineBuffer`]; replies and pulse logs are rendered into bounded
//! [`OutputLine`]s and queued toward USB by [`QueueSink`].

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt::{self, Write as _};
use core::str;

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Sender};
use heapless::{String, Vec};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};
use trigger_core::repl::console::ConsoleSink;

use crate::config::{INPUT_QUEUE_DEPTH, MAX_LINE_LEN, OUTPUT_LINE_LEN, OUTPUT_QUEUE_DEPTH};

#[cfg(target_os = "none")]
type ConsoleMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type ConsoleMutex = NoopRawMutex;

/// Maximum payload of a single USB full-speed bulk packet.
pub const INPUT_FRAME_LEN: usize = 64;

/// Raw bytes read from one USB packet.
pub type InputFrame = Vec<u8, INPUT_FRAME_LEN>;

/// Rendered console line including its `\r\n` terminator.
pub type OutputLine = String<OUTPUT_LINE_LEN>;

pub type InputQueue = Channel<ConsoleMutex, InputFrame, INPUT_QUEUE_DEPTH>;

pub type OutputQueue = Channel<ConsoleMutex, OutputLine, OUTPUT_QUEUE_DEPTH>;
pub type OutputSender<'a> = Sender<'a, ConsoleMutex, OutputLine, OUTPUT_QUEUE_DEPTH>;

/// Set while a host holds DTR on the console interface.
static CONSOLE_ATTACHED: AtomicBool = AtomicBool::new(false);
/// Lines discarded because the output queue was full or too long to render.
static DROPPED_LINES: AtomicU32 = AtomicU32::new(0);

pub fn set_attached(attached: bool) {
    CONSOLE_ATTACHED.store(attached, Ordering::Release);
}

pub fn is_attached() -> bool {
    CONSOLE_ATTACHED.load(Ordering::Acquire)
}

/// Returns and resets the dropped line counter.
pub fn take_dropped_lines() -> u32 {
    DROPPED_LINES.swap(0, Ordering::AcqRel)
}

/// Errors surfaced while assembling console lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    /// Input exceeded [`MAX_LINE_LEN`]; the rest of the line is discarded.
    LineOverflow,
    /// Completed line was not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::LineOverflow => write!(f, "line exceeds {MAX_LINE_LEN} bytes"),
            ConsoleError::InvalidUtf8 => f.write_str("line is not valid UTF-8"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LineState {
    Collecting,
    /// Previous call returned a complete line; cleared on the next byte.
    Complete,
    /// Overflowed; bytes are dropped until the next terminator.
    Discarding,
}

/// Assembles terminal bytes into command lines.
pub struct LineBuffer {
    buffer: Vec<u8, MAX_LINE_LEN>,
    state: LineState,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: LineState::Collecting,
        }
    }

    /// Feeds one byte. Returns the finished line when `byte` terminates a
    /// non-empty one.
    pub fn push(&mut self, byte: u8) -> Result<Option<&str>, ConsoleError> {
        if self.state == LineState::Complete {
            self.buffer.clear();
            self.state = LineState::Collecting;
        }

        match byte {
            b'\r' | b'\n' => {
                if self.state == LineState::Discarding {
                    self.state = LineState::Collecting;
                    return Ok(None);
                }
                if self.buffer.is_empty() {
                    return Ok(None);
                }

                self.state = LineState::Complete;
                match str::from_utf8(&self.buffer) {
                    Ok(line) => Ok(Some(line)),
                    Err(_) => Err(ConsoleError::InvalidUtf8),
                }
            }
            0x08 | 0x7f => {
                if self.state == LineState::Collecting {
                    self.buffer.pop();
                }
                Ok(None)
            }
            _ if self.state == LineState::Discarding => Ok(None),
            value => {
                if self.buffer.push(value).is_err() {
                    self.buffer.clear();
                    self.state = LineState::Discarding;
                    return Err(ConsoleError::LineOverflow);
                }
                Ok(None)
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.state {
            LineState::Collecting => self.buffer.len(),
            LineState::Complete | LineState::Discarding => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = LineState::Collecting;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a line with its terminator. Fails when the text does not fit.
pub fn render_line(line: fmt::Arguments<'_>) -> Result<OutputLine, fmt::Error> {
    let mut rendered = OutputLine::new();
    rendered.write_fmt(line)?;
    rendered.push_str("\r\n").map_err(|_| fmt::Error)?;
    Ok(rendered)
}

/// [`ConsoleSink`] feeding the USB output queue without ever blocking.
///
/// Lines produced while no host is attached, or while the queue is full, are
/// counted and dropped.
pub struct QueueSink<'a> {
    sender: OutputSender<'a>,
}

impl<'a> QueueSink<'a> {
    pub const fn new(sender: OutputSender<'a>) -> Self {
        Self { sender }
    }
}

impl ConsoleSink for QueueSink<'_> {
    fn write_line(&mut self, line: fmt::Arguments<'_>) -> fmt::Result {
        if !is_attached() {
            return Ok(());
        }

        let Ok(rendered) = render_line(line) else {
            DROPPED_LINES.fetch_add(1, Ordering::Relaxed);
            return Err(fmt::Error);
        };

        if self.sender.try_send(rendered).is_err() {
            DROPPED_LINES.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed<'a>(buffer: &'a mut LineBuffer, bytes: &[u8]) -> Result<Option<&'a str>, ConsoleError> {
        let (last, head) = bytes.split_last().expect("at least one byte");
        for byte in head {
            buffer.push(*byte)?;
        }
        buffer.push(*last)
    }

    #[test]
    fn assembles_lines_on_either_terminator() {
        let mut buffer = LineBuffer::new();
        assert_eq!(feed(&mut buffer, b"DT500\r"), Ok(Some("DT500")));
        assert_eq!(buffer.push(b'\n'), Ok(None));
        assert_eq!(feed(&mut buffer, b"s\n"), Ok(Some("s")));
    }

    #[test]
    fn backspace_edits_current_line() {
        let mut buffer = LineBuffer::new();
        assert_eq!(feed(&mut buffer, b"DT5x\x08\x7f00\r"), Ok(Some("DT00")));
    }

    #[test]
    fn overflow_discards_until_terminator() {
        let mut buffer = LineBuffer::new();
        for _ in 0..MAX_LINE_LEN {
            assert_eq!(buffer.push(b'1'), Ok(None));
        }
        assert_eq!(buffer.push(b'1'), Err(ConsoleError::LineOverflow));
        assert_eq!(buffer.push(b'2'), Ok(None));
        assert_eq!(buffer.push(b'\n'), Ok(None));
        assert_eq!(feed(&mut buffer, b"?\n"), Ok(Some("?")));
    }

    #[test]
    fn invalid_utf8_is_rejected_and_cleared() {
        let mut buffer = LineBuffer::new();
        assert_eq!(feed(&mut buffer, &[0xff, 0xfe, b'\n']), Err(ConsoleError::InvalidUtf8));
        assert_eq!(buffer.len(), 0);
        assert_eq!(feed(&mut buffer, b"s\r"), Ok(Some("s")));
    }

    #[test]
    fn rendered_lines_carry_terminator() {
        let line = render_line(format_args!("# {} @ t = {}", 3, "00:00:02.000"))
            .expect("line fits");
        assert_eq!(line.as_str(), "# 3 @ t = 00:00:02.000\r\n");
    }

    #[test]
    fn overlong_lines_fail_to_render() {
        let long = [b'x'; OUTPUT_LINE_LEN];
        let text = str::from_utf8(&long).expect("ascii");
        assert!(render_line(format_args!("{text}")).is_err());
    }

    #[test]
    fn queue_sink_drops_when_detached_or_full() {
        let queue: OutputQueue = Channel::new();
        let mut sink = QueueSink::new(queue.sender());

        set_attached(false);
        sink.write_line(format_args!("ignored")).expect("detached sink accepts lines");
        assert!(queue.try_receive().is_err());

        set_attached(true);
        let _ = take_dropped_lines();
        for index in 0..OUTPUT_QUEUE_DEPTH + 2 {
            sink.write_line(format_args!("# {index}")).expect("full queue drops silently");
        }
        assert_eq!(take_dropped_lines(), 2);

        let first = queue.try_receive().expect("first line queued");
        assert_eq!(first.as_str(), "# 0\r\n");
        set_attached(false);
    }
}
