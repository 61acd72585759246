//! Wire codec between raw bytes and [`Program`]s.
//!
//! Two binary decode modes share one grammar (`*<argc>\r\n` followed by
//! `$<len>\r\n<payload>\r\n` per argument):
//!
//! * [`DecodeMode::Resilient`] treats input as adversarial and never fails.
//!   Corrupt headers are resynchronised one byte later, malformed commands are
//!   dropped, and a frame running past the end of the buffer stops decoding.
//! * [`DecodeMode::Strict`] is for trusted, self-produced corpora. Any
//!   deviation is a [`DecodeError`].
//!
//! The token form is one command per line with space-separated, optionally
//! quoted arguments.

use crate::command::{Command, Program};
use rand::Rng;
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;
use tracing::trace;

pub const ARRAY_MARKER: u8 = b'*';
pub const BULK_MARKER: u8 = b'$';
const CRLF: &[u8] = b"\r\n";

/// Chance of quoting a token that does not need it, to exercise quote handling
/// in downstream parsers.
const GRATUITOUS_QUOTE_PROBABILITY: f64 = 0.10;

/// Grammar violations found by the strict decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A frame marker was expected but another byte was found.
    #[error("expected '{expected}' at offset {offset}, found byte 0x{found:02x}")]
    UnexpectedByte {
        expected: char,
        found: u8,
        offset: usize,
    },

    /// A header or payload was not followed by CRLF.
    #[error("missing CRLF terminator at offset {offset}")]
    MissingTerminator { offset: usize },

    /// An argument count or bulk length was not a plain decimal number.
    #[error("invalid count or length at offset {offset}")]
    InvalidLength { offset: usize },

    /// The buffer ended inside a frame.
    #[error("frame truncated at offset {offset}")]
    Truncated { offset: usize },

    /// An array header declared zero arguments.
    #[error("empty command at offset {offset}")]
    EmptyCommand { offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    Strict,
    Resilient,
}

/// Encoding used for mutated output.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable token lines.
    #[default]
    Token,
    /// Length-prefixed array/bulk-string frames.
    Binary,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token" | "inline" | "text" => Ok(OutputFormat::Token),
            "binary" | "resp" => Ok(OutputFormat::Binary),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// Decodes binary frames in the given mode. Resilient mode never returns `Err`.
pub fn decode(bytes: &[u8], mode: DecodeMode) -> Result<Program, DecodeError> {
    match mode {
        DecodeMode::Strict => decode_strict(bytes),
        DecodeMode::Resilient => Ok(decode_resilient(bytes)),
    }
}

/// Decodes a seed of either form. Buffers whose first non-whitespace byte is
/// the array marker are read as binary frames, everything else as token lines.
pub fn decode_any(bytes: &[u8]) -> Program {
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(&ARRAY_MARKER) => decode_resilient(bytes),
        _ => decode_tokens(bytes),
    }
}

/// Outcome of reading the arguments of one array frame.
enum Frame {
    Complete(Vec<Vec<u8>>),
    /// Drop this command and keep scanning from the current position.
    Malformed,
    /// The frame runs past the end of the buffer; stop decoding.
    Incomplete,
}

pub fn decode_resilient(bytes: &[u8]) -> Program {
    let mut cursor = Cursor::new(bytes);
    let mut program = Program::new();

    while let Some(byte) = cursor.peek() {
        if matches!(byte, b' ' | b'\t' | b'\r' | b'\n') {
            cursor.advance(1);
            continue;
        }

        // Inline lines are skipped, never lifted into commands.
        if byte != ARRAY_MARKER {
            match cursor.find_terminator() {
                Some(end) => cursor.seek(end + CRLF.len()),
                None => break,
            }
            continue;
        }

        let header_start = cursor.position();
        cursor.advance(1);
        let Some(line) = cursor.take_line() else {
            break;
        };
        let Some(argc) = parse_decimal(line) else {
            trace!(offset = header_start, "unparsable array header, resyncing");
            cursor.seek(header_start + 1);
            continue;
        };

        match read_arguments_resilient(&mut cursor, argc) {
            Frame::Complete(args) => {
                if !args.is_empty() {
                    program.push(Command::new(args));
                }
            }
            Frame::Malformed => {
                trace!(
                    offset = header_start,
                    resume = cursor.position(),
                    "dropping malformed command"
                );
            }
            Frame::Incomplete => break,
        }
    }

    program
}

fn read_arguments_resilient(cursor: &mut Cursor<'_>, argc: i64) -> Frame {
    let mut args = Vec::new();
    for _ in 0..argc.max(0) {
        if cursor.peek() != Some(BULK_MARKER) {
            return Frame::Malformed;
        }
        cursor.advance(1);

        let Some(line) = cursor.take_line() else {
            return Frame::Incomplete;
        };
        let Some(len) = parse_decimal(line).and_then(|len| usize::try_from(len).ok()) else {
            return Frame::Malformed;
        };
        if len
            .checked_add(CRLF.len())
            .is_none_or(|needed| needed > cursor.remaining())
        {
            return Frame::Incomplete;
        }

        args.push(cursor.take(len).to_vec());
        cursor.advance(CRLF.len());
    }
    Frame::Complete(args)
}

pub fn decode_strict(bytes: &[u8]) -> Result<Program, DecodeError> {
    let mut cursor = Cursor::new(bytes);
    let mut program = Program::new();

    while !cursor.is_at_end() {
        let offset = cursor.position();
        cursor.expect_marker(ARRAY_MARKER)?;
        let argc = cursor.read_length()?;
        if argc == 0 {
            return Err(DecodeError::EmptyCommand { offset });
        }

        let mut args = Vec::with_capacity(argc.min(1024));
        for _ in 0..argc {
            args.push(cursor.read_bulk_string()?.to_vec());
        }
        program.push(Command::new(args));
    }

    Ok(program)
}

/// Decodes token lines. Blank lines and lines starting with `#` or `//` are
/// skipped.
pub fn decode_tokens(bytes: &[u8]) -> Program {
    bytes
        .split(|&b| b == b'\n' || b == b'\r')
        .map(<[u8]>::trim_ascii)
        .filter(|line| !line.is_empty() && !line.starts_with(b"#") && !line.starts_with(b"//"))
        .map(tokenize_line)
        .filter(|args| !args.is_empty())
        .map(Command::new)
        .collect()
}

fn tokenize_line(line: &[u8]) -> Vec<Vec<u8>> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < line.len() {
        if line[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let end = if line[i] == b'"' {
            scan_quoted(line, i).unwrap_or_else(|| scan_bare(line, i))
        } else {
            scan_bare(line, i)
        };
        tokens.push(unquote(&line[i..end]));
        i = end;
    }
    tokens
}

/// End (exclusive) of a closed quoted token starting at `start`.
fn scan_quoted(line: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < line.len() {
        match line[i] {
            b'\\' if i + 1 < line.len() => i += 2,
            b'\\' => return None,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn scan_bare(line: &[u8], start: usize) -> usize {
    line[start..]
        .iter()
        .position(u8::is_ascii_whitespace)
        .map_or(line.len(), |offset| start + offset)
}

fn unquote(token: &[u8]) -> Vec<u8> {
    if token.len() < 2 || token[0] != b'"' || token[token.len() - 1] != b'"' {
        return token.to_vec();
    }
    let inner = &token[1..token.len() - 1];
    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        match (inner[i], inner.get(i + 1)) {
            (b'\\', Some(&next @ (b'\\' | b'"'))) => {
                out.push(next);
                i += 2;
            }
            (b'\\', Some(b'r')) => {
                out.push(b'\r');
                i += 2;
            }
            (b'\\', Some(b'n')) => {
                out.push(b'\n');
                i += 2;
            }
            (byte, _) => {
                out.push(byte);
                i += 1;
            }
        }
    }
    out
}

fn needs_quoting(arg: &[u8]) -> bool {
    arg.is_empty() || arg.iter().any(|&b| b.is_ascii_whitespace() || b == b'"')
}

/// Quotes `arg`, escaping backslash, quote, CR and LF so that a quoted
/// token never spans lines.
fn push_quoted(out: &mut Vec<u8>, arg: &[u8]) {
    out.push(b'"');
    for &byte in arg {
        match byte {
            b'\\' | b'"' => out.extend_from_slice(&[b'\\', byte]),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(byte),
        }
    }
    out.push(b'"');
}

fn write_tokens<F>(program: &[Command], mut quote: F) -> Vec<u8>
where
    F: FnMut(&[u8]) -> bool,
{
    let mut out = Vec::new();
    for command in program.iter().filter(|c| !c.is_empty()) {
        for (i, arg) in command.args().iter().enumerate() {
            if i > 0 {
                out.push(b' ');
            }
            if quote(arg) {
                push_quoted(&mut out, arg);
            } else {
                out.extend_from_slice(arg);
            }
        }
        out.push(b'\n');
    }
    out
}

/// Token form with quoting only where an argument needs it.
pub fn encode_tokens(program: &[Command]) -> Vec<u8> {
    write_tokens(program, needs_quoting)
}

/// Token form that also quotes a small share of plain arguments.
pub fn encode_tokens_randomized<R: Rng + ?Sized>(program: &[Command], rng: &mut R) -> Vec<u8> {
    write_tokens(program, |arg| {
        needs_quoting(arg) || rng.random_bool(GRATUITOUS_QUOTE_PROBABILITY)
    })
}

pub fn encode_binary(program: &[Command]) -> Vec<u8> {
    let mut out = Vec::new();
    for command in program.iter().filter(|c| !c.is_empty()) {
        out.push(ARRAY_MARKER);
        out.extend_from_slice(command.len().to_string().as_bytes());
        out.extend_from_slice(CRLF);
        for arg in command.args() {
            out.push(BULK_MARKER);
            out.extend_from_slice(arg.len().to_string().as_bytes());
            out.extend_from_slice(CRLF);
            out.extend_from_slice(arg);
            out.extend_from_slice(CRLF);
        }
    }
    out
}

pub fn encode<R: Rng + ?Sized>(program: &[Command], format: OutputFormat, rng: &mut R) -> Vec<u8> {
    match format {
        OutputFormat::Token => encode_tokens_randomized(program, rng),
        OutputFormat::Binary => encode_binary(program),
    }
}

/// Lenient decimal parse used by the resilient decoder: surrounding
/// whitespace and a sign are accepted.
fn parse_decimal(line: &[u8]) -> Option<i64> {
    std::str::from_utf8(line.trim_ascii()).ok()?.parse().ok()
}

struct Cursor<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.buffer.len() - self.pos
    }

    #[inline]
    fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.pos >= self.buffer.len()
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.buffer.get(self.pos).copied()
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buffer.len());
    }

    #[inline]
    fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.buffer.len());
    }

    /// Absolute index of the next CRLF at or after the cursor.
    fn find_terminator(&self) -> Option<usize> {
        self.buffer[self.pos..]
            .windows(CRLF.len())
            .position(|window| window == CRLF)
            .map(|offset| self.pos + offset)
    }

    /// Returns the bytes up to the next CRLF and moves past it. The cursor does
    /// not move when no terminator is left.
    fn take_line(&mut self) -> Option<&'a [u8]> {
        let end = self.find_terminator()?;
        let line = &self.buffer[self.pos..end];
        self.pos = end + CRLF.len();
        Some(line)
    }

    fn take(&mut self, len: usize) -> &'a [u8] {
        let end = (self.pos + len).min(self.buffer.len());
        let bytes = &self.buffer[self.pos..end];
        self.pos = end;
        bytes
    }

    fn expect_marker(&mut self, marker: u8) -> Result<(), DecodeError> {
        let offset = self.pos;
        match self.peek() {
            None => Err(DecodeError::Truncated { offset }),
            Some(found) if found != marker => Err(DecodeError::UnexpectedByte {
                expected: marker as char,
                found,
                offset,
            }),
            Some(_) => {
                self.advance(1);
                Ok(())
            }
        }
    }

    /// Strict count/length: ASCII digits only, terminated by CRLF.
    fn read_length(&mut self) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let line = self
            .take_line()
            .ok_or(DecodeError::MissingTerminator { offset })?;

        // usize::MAX has 20 digits; 19 cannot overflow.
        if line.is_empty() || line.len() > 19 || !line.iter().all(u8::is_ascii_digit) {
            return Err(DecodeError::InvalidLength { offset });
        }
        let mut value = 0usize;
        for &byte in line {
            value = value * 10 + usize::from(byte - b'0');
        }
        Ok(value)
    }

    fn read_bulk_string(&mut self) -> Result<&'a [u8], DecodeError> {
        self.expect_marker(BULK_MARKER)?;
        let len = self.read_length()?;

        let offset = self.pos;
        if self.remaining() < len {
            return Err(DecodeError::Truncated { offset });
        }
        let payload = self.take(len);

        let offset = self.pos;
        if self.remaining() < CRLF.len() {
            return Err(DecodeError::Truncated { offset });
        }
        if &self.buffer[self.pos..self.pos + CRLF.len()] != CRLF {
            return Err(DecodeError::MissingTerminator { offset });
        }
        self.advance(CRLF.len());
        Ok(payload)
    }
}
