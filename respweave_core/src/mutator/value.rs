//! Mutators for a single argument value.

use crate::dictionary::Dictionary;
use rand::Rng;
use rand::seq::IndexedRandom;

/// Powers of two and their neighbours, plus the signed 32/64-bit extrema.
pub const BOUNDARY_INTEGERS: &[i128] = &[
    -1,
    0,
    1,
    7,
    8,
    9,
    15,
    16,
    31,
    32,
    63,
    64,
    127,
    128,
    255,
    256,
    1024,
    4096,
    i32::MAX as i128,
    i32::MIN as i128,
    i64::MAX as i128,
    i64::MIN as i128,
];

const INTEGER_MUTATION_PROBABILITY: f64 = 0.75;
const BOUNDARY_SUBSTITUTION_PROBABILITY: f64 = 0.3;
const MAX_INTEGER_DELTA: i128 = 4096;

const MAX_RUN_REPEATS: usize = 40;
const MAX_PRINTABLE_SUFFIX: usize = 256;
const MAX_NUL_SUFFIX: usize = 32;

/// The seven string operators, chosen uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    FlipByte,
    DuplicateRun,
    DeleteRange,
    Replace,
    AppendPrintable,
    Truncate,
    AppendNul,
}

impl StringOp {
    pub const ALL: [StringOp; 7] = [
        StringOp::FlipByte,
        StringOp::DuplicateRun,
        StringOp::DeleteRange,
        StringOp::Replace,
        StringOp::AppendPrintable,
        StringOp::Truncate,
        StringOp::AppendNul,
    ];
}

/// Matches `-?[0-9]+`.
pub fn looks_like_integer(arg: &[u8]) -> bool {
    let digits = arg.strip_prefix(b"-").unwrap_or(arg);
    !digits.is_empty() && digits.iter().all(u8::is_ascii_digit)
}

pub fn mutate_integer<R: Rng + ?Sized>(
    dictionary: &Dictionary,
    arg: &[u8],
    rng: &mut R,
) -> Vec<u8> {
    if rng.random_bool(INTEGER_MUTATION_PROBABILITY) {
        let parsed = std::str::from_utf8(arg)
            .ok()
            .and_then(|text| text.parse::<i128>().ok());
        if let Some(value) = parsed {
            let mutated = if rng.random_bool(BOUNDARY_SUBSTITUTION_PROBABILITY) {
                BOUNDARY_INTEGERS.choose(rng).copied().unwrap_or(0)
            } else {
                value.saturating_add(rng.random_range(-MAX_INTEGER_DELTA..=MAX_INTEGER_DELTA))
            };
            return mutated.to_string().into_bytes();
        }
    }
    dictionary.token(rng).as_bytes().to_vec()
}

pub fn mutate_string<R: Rng + ?Sized>(dictionary: &Dictionary, arg: &[u8], rng: &mut R) -> Vec<u8> {
    let mut s = if arg.is_empty() {
        match dictionary.token(rng) {
            "" => b"A".to_vec(),
            token => token.as_bytes().to_vec(),
        }
    } else {
        arg.to_vec()
    };
    let len = s.len();

    match StringOp::ALL[rng.random_range(0..StringOp::ALL.len())] {
        StringOp::FlipByte => {
            let i = rng.random_range(0..len);
            s[i] ^= rng.random_range(1..=255u8);
            s
        }
        StringOp::DuplicateRun => {
            if len < 2 {
                return s.repeat(2);
            }
            let (i, j) = random_span(len, rng);
            let run = if j > i { &s[i..j] } else { &s[i..=i] };
            let repeats = rng.random_range(2..MAX_RUN_REPEATS);
            let mut out = Vec::with_capacity(len + run.len() * repeats);
            out.extend_from_slice(&s[..i]);
            out.extend_from_slice(&run.repeat(repeats));
            out.extend_from_slice(&s[i..]);
            out
        }
        StringOp::DeleteRange => {
            if len < 2 {
                return Vec::new();
            }
            let (i, j) = random_span(len, rng);
            s.drain(i..j);
            s
        }
        StringOp::Replace => dictionary.any_string(rng).as_bytes().to_vec(),
        StringOp::AppendPrintable => {
            let count = rng.random_range(1..MAX_PRINTABLE_SUFFIX);
            s.extend((0..count).map(|_| rng.random_range(32u8..127u8)));
            s
        }
        StringOp::Truncate => {
            s.truncate(rng.random_range(0..=len));
            s
        }
        StringOp::AppendNul => {
            let count = rng.random_range(0..MAX_NUL_SUFFIX);
            s.resize(len + count, 0);
            s
        }
    }
}

/// `i` uniform over `0..len`, `j` uniform over `i..len`.
fn random_span<R: Rng + ?Sized>(len: usize, rng: &mut R) -> (usize, usize) {
    let i = rng.random_range(0..len);
    let j = rng.random_range(i..len);
    (i, j)
}
