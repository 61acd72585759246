//! Corpus reduction: collapses pathologically repeated command blocks and
//! bounds per-command size.
//!
//! This is a best-effort heuristic, not an equivalence-preserving minimizer.

use crate::codec::{DecodeError, decode_strict, encode_tokens};
use crate::command::{Command, Program};
use crate::config::ReducerSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Suffix marking a truncated argument.
pub const TRUNCATION_MARKER: &[u8] = b"...";
const NUMBER_PLACEHOLDER: &[u8] = b"#";

#[derive(Error, Debug)]
pub enum ReduceError {
    #[error("Failed to read corpus file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write reduced corpus to {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed corpus: {0}")]
    Decode(#[from] DecodeError),
}

/// How two commands are judged equal when looking for repeated blocks.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Equivalence {
    /// Operation name only.
    #[default]
    Identity,
    /// Operation name and argument count.
    Shape,
    /// Operation name and every argument, with numbers collapsed and case folded.
    Template,
}

impl FromStr for Equivalence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" | "opcode" => Ok(Equivalence::Identity),
            "shape" => Ok(Equivalence::Shape),
            "template" => Ok(Equivalence::Template),
            other => Err(format!("unknown equivalence '{other}'")),
        }
    }
}

impl Equivalence {
    /// The normalized view of `command` under this equivalence.
    pub fn key(&self, command: &Command) -> Vec<Vec<u8>> {
        let opcode = command.opcode();
        match self {
            Equivalence::Identity => vec![opcode],
            Equivalence::Shape => vec![opcode, command.len().to_string().into_bytes()],
            Equivalence::Template => {
                let mut key = Vec::with_capacity(command.len());
                key.push(opcode);
                key.extend(command.args().iter().skip(1).map(|arg| {
                    if looks_numeric(arg) {
                        NUMBER_PLACEHOLDER.to_vec()
                    } else {
                        arg.to_ascii_lowercase()
                    }
                }));
                key
            }
        }
    }
}

fn looks_numeric(arg: &[u8]) -> bool {
    arg.iter().any(u8::is_ascii_digit)
        && arg
            .iter()
            .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReduceStats {
    pub commands_in: usize,
    pub commands_out: usize,
}

/// Collapses repeated contiguous blocks until a pass changes nothing.
///
/// Each pass is greedy: at every position block sizes are tried in ascending
/// order and the first size whose run repeats more than `keep_count` times
/// wins. Only `keep_count` repetitions are kept and the rest of the run is
/// skipped. A partial repetition is only swallowed when it ends the program.
/// A pass that changes anything makes the program strictly shorter, so the
/// loop terminates.
pub fn collapse_blocks(program: &[Command], settings: &ReducerSettings) -> Program {
    let mut current = collapse_pass(program, settings);
    loop {
        let next = collapse_pass(&current, settings);
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

fn collapse_pass(program: &[Command], settings: &ReducerSettings) -> Program {
    let keys: Vec<Vec<Vec<u8>>> = program
        .iter()
        .map(|command| settings.equivalence.key(command))
        .collect();
    let mut out = Program::with_capacity(program.len());
    let mut i = 0;

    while i < program.len() {
        let mut advanced = false;
        for size in settings.min_block..=settings.max_block {
            if size == 0 || i + size > keys.len() {
                continue;
            }
            let block = &keys[i..i + size];
            let mut reps = 1;
            while i + (reps + 1) * size <= keys.len()
                && keys[i + reps * size..i + (reps + 1) * size] == *block
            {
                reps += 1;
            }
            if reps <= settings.keep_count {
                continue;
            }
            let run_end = i + reps * size;
            let mut partial = keys[run_end..]
                .iter()
                .zip(block)
                .take_while(|(key, expected)| key == expected)
                .count();
            if run_end + partial != keys.len() {
                partial = 0;
            }
            out.extend_from_slice(&program[i..i + settings.keep_count * size]);
            i = run_end + partial;
            advanced = true;
            break;
        }
        if !advanced {
            out.push(program[i].clone());
            i += 1;
        }
    }
    out
}

/// Bounds the size of one command: caps the tuple list of the configured
/// tuple operation, the total argument count, and each argument's length.
pub fn shrink_command(command: &Command, settings: &ReducerSettings) -> Command {
    let mut args = command.args().to_vec();
    let tuple_head = 2;
    if command.is_named(&settings.tuple_operation)
        && args.len() > tuple_head + settings.tuple_width
    {
        args.truncate(tuple_head + settings.max_tuples * settings.tuple_width);
    }
    args.truncate(settings.max_arguments);
    for arg in args.iter_mut() {
        if arg.len() > settings.max_argument_length {
            arg.truncate(settings.max_argument_length);
            arg.extend_from_slice(TRUNCATION_MARKER);
        }
    }
    Command::new(args)
}

/// Collapses blocks, then shrinks every surviving command.
pub fn reduce_program(program: &[Command], settings: &ReducerSettings) -> Program {
    collapse_blocks(program, settings)
        .iter()
        .map(|command| shrink_command(command, settings))
        .collect()
}

/// Strict-decodes binary frames and returns the reduced program as token lines.
pub fn reduce_bytes(
    bytes: &[u8],
    settings: &ReducerSettings,
) -> Result<(Vec<u8>, ReduceStats), ReduceError> {
    let program = decode_strict(bytes)?;
    let reduced = reduce_program(&program, settings);
    let stats = ReduceStats {
        commands_in: program.len(),
        commands_out: reduced.len(),
    };
    Ok((encode_tokens(&reduced), stats))
}

/// Offline entry point: reads `input`, reduces it and writes token lines to
/// `output`. Any grammar violation in the input is fatal.
pub fn reduce(
    input: &Path,
    output: &Path,
    settings: &ReducerSettings,
) -> Result<ReduceStats, ReduceError> {
    let bytes = std::fs::read(input).map_err(|source| ReduceError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let (encoded, stats) = reduce_bytes(&bytes, settings)?;
    std::fs::write(output, encoded).map_err(|source| ReduceError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    info!(
        input = %input.display(),
        output = %output.display(),
        commands_in = stats.commands_in,
        commands_out = stats.commands_out,
        "corpus reduced"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_tokens, encode_binary};

    fn settings() -> ReducerSettings {
        ReducerSettings::default()
    }

    fn repeated(name: &str, count: usize) -> Program {
        (0..count).map(|i| Command::from_parts(&[name, &format!("k{i}")])).collect()
    }

    #[test]
    fn ten_identical_commands_collapse_to_six() {
        let program = repeated("INCR", 10);
        let collapsed = collapse_blocks(&program, &settings());
        assert_eq!(collapsed.len(), 6);
        assert_eq!(collapsed[..], program[..6]);
    }

    #[test]
    fn runs_at_or_below_keep_count_survive() {
        let mut program = repeated("GET", 6);
        program.push(Command::from_parts(&["SET", "a", "b"]));
        let collapsed = collapse_blocks(&program, &settings());
        assert_eq!(collapsed, program);
    }

    #[test]
    fn alternating_pair_collapses_with_smallest_block_first() {
        let settings = ReducerSettings {
            min_block: 2,
            ..settings()
        };
        let program: Program = (0..12)
            .map(|i| {
                if i % 2 == 0 {
                    Command::from_parts(&["LPUSH", "l", "x"])
                } else {
                    Command::from_parts(&["LPOP", "l"])
                }
            })
            .collect();
        let collapsed = collapse_blocks(&program, &settings);
        assert_eq!(collapsed.len(), 4);
    }

    #[test]
    fn collapse_is_stable() {
        let mut program = repeated("INCR", 10);
        program.extend(repeated("DEL", 3));
        program.extend(repeated("HSET", 25));
        program.push(Command::from_parts(&["PING"]));
        let once = collapse_blocks(&program, &settings());
        let twice = collapse_blocks(&once, &settings());
        assert_eq!(once, twice);
    }

    #[test]
    fn interleaved_runs_collapse_in_one_pass() {
        let program: Program = "ABAABAABAAABA"
            .chars()
            .map(|name| Command::from_parts(&[name.to_string()]))
            .collect();
        let once = collapse_blocks(&program, &settings());
        let twice = collapse_blocks(&once, &settings());
        assert_eq!(once, twice);
    }

    #[test]
    fn collapse_repeats_until_nothing_changes() {
        let settings = ReducerSettings {
            min_block: 1,
            keep_count: 1,
            ..settings()
        };
        let program: Program = "AABAB"
            .chars()
            .map(|name| Command::from_parts(&[name.to_string()]))
            .collect();
        let once = collapse_blocks(&program, &settings);
        assert_eq!(once, program[1..3].to_vec());
        assert_eq!(collapse_blocks(&once, &settings), once);
    }

    #[test]
    fn partial_repetition_survives_unless_it_ends_the_program() {
        let mut program = repeated("INCR", 10);
        assert_eq!(collapse_blocks(&program, &settings()).len(), 6);
        program.push(Command::from_parts(&["PING"]));
        let collapsed = collapse_blocks(&program, &settings());
        assert_eq!(collapsed.len(), 8);
        assert_eq!(collapsed[6], program[9]);
    }

    #[test]
    fn shape_equivalence_distinguishes_argument_counts() {
        let settings = ReducerSettings {
            equivalence: Equivalence::Shape,
            ..settings()
        };
        let program: Program = (0..9)
            .map(|i| {
                let parts: Vec<String> = std::iter::once("SADD".to_string())
                    .chain((0..=i % 2).map(|j| format!("m{j}")))
                    .collect();
                Command::from_parts(&parts)
            })
            .collect();
        assert_eq!(collapse_blocks(&program, &settings).len(), 9);
        let identity = ReducerSettings::default();
        assert_eq!(collapse_blocks(&program, &identity).len(), 6);
    }

    #[test]
    fn template_equivalence_collapses_numbers_and_case() {
        let a = Command::from_parts(&["expire", "Key", "10"]);
        let b = Command::from_parts(&["EXPIRE", "key", "-2.5e3"]);
        let c = Command::from_parts(&["EXPIRE", "other", "10"]);
        assert_eq!(Equivalence::Template.key(&a), Equivalence::Template.key(&b));
        assert_ne!(Equivalence::Template.key(&a), Equivalence::Template.key(&c));
        assert_eq!(Equivalence::Identity.key(&a), Equivalence::Identity.key(&c));
    }

    #[test]
    fn shrink_caps_tuples_arguments_and_lengths() {
        let settings = settings();
        let mut parts = vec!["GEOADD".to_string(), "places".to_string()];
        for i in 0..20 {
            parts.extend(["13.3".to_string(), "38.1".to_string(), format!("m{i}")]);
        }
        let shrunk = shrink_command(&Command::from_parts(&parts), &settings);
        assert_eq!(shrunk.len(), 2 + 5 * 3);

        let long = "x".repeat(100);
        let many: Vec<String> = std::iter::once("MSET".to_string())
            .chain(std::iter::repeat_n(long, 200))
            .collect();
        let shrunk = shrink_command(&Command::from_parts(&many), &settings);
        assert_eq!(shrunk.len(), 64);
        let mut expected = vec![b'x'; 64];
        expected.extend_from_slice(TRUNCATION_MARKER);
        assert_eq!(shrunk.args()[1], expected);
    }

    #[test]
    fn reduce_bytes_rejects_malformed_input() {
        let err = reduce_bytes(b"*1\r\n$3\r\nGE", &settings()).unwrap_err();
        assert!(matches!(err, ReduceError::Decode(_)));
    }

    #[test]
    fn reduce_round_trips_through_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("corpus.resp");
        let output = dir.path().join("corpus.txt");
        let mut program = repeated("INCR", 10);
        program.push(Command::from_parts(&["SET", "greeting", "hello world"]));
        std::fs::write(&input, encode_binary(&program)).expect("write input");

        let stats = reduce(&input, &output, &settings()).expect("reduce");
        assert_eq!(
            stats,
            ReduceStats {
                commands_in: 11,
                commands_out: 8
            }
        );
        let written = decode_tokens(&std::fs::read(&output).expect("read output"));
        assert_eq!(written.len(), 8);
        assert_eq!(written[7], Command::from_parts(&["SET", "greeting", "hello world"]));
    }

    #[test]
    fn reduce_reports_missing_input() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = reduce(
            &dir.path().join("absent"),
            &dir.path().join("out"),
            &settings(),
        )
        .unwrap_err();
        assert!(matches!(err, ReduceError::Read { .. }));
    }
}
