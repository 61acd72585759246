//! Value generators used to fill argument slots.

use crate::dictionary::{Dictionary, pick};
use crate::mutator::value::{BOUNDARY_INTEGERS, mutate_string};
use rand::Rng;
use rand::seq::IndexedRandom;

const BOUNDARY_INTEGER_PROBABILITY: f64 = 0.3;
const FLOAT_EDGE_PROBABILITY: f64 = 0.2;
const PLAIN_KEY_PROBABILITY: f64 = 0.7;
const PLAIN_FIELD_PROBABILITY: f64 = 0.8;
const PLAIN_VALUE_PROBABILITY: f64 = 0.8;
const PLAIN_STREAM_ID_PROBABILITY: f64 = 0.85;

const FLOAT_EDGE_CASES: &[&str] = &[
    "NaN",
    "Inf",
    "-Inf",
    "1e309",
    "-1e309",
    "1.7976931348623157e308",
];

pub fn integer<R: Rng + ?Sized>(rng: &mut R) -> Vec<u8> {
    let value = if rng.random_bool(BOUNDARY_INTEGER_PROBABILITY) {
        BOUNDARY_INTEGERS.choose(rng).copied().unwrap_or(0)
    } else {
        rng.random_range(i128::from(i32::MIN)..=i128::from(i32::MAX))
    };
    value.to_string().into_bytes()
}

pub fn float<R: Rng + ?Sized>(rng: &mut R) -> Vec<u8> {
    if rng.random_bool(FLOAT_EDGE_PROBABILITY) {
        return pick(rng, FLOAT_EDGE_CASES).as_bytes().to_vec();
    }
    let magnitude = 10f64.powi(rng.random_range(0..12));
    let value = (rng.random::<f64>() - 0.5) * magnitude;
    value.to_string().into_bytes()
}

/// Draws from `pool`, passing the draw through the string mutator with
/// probability `1 - plain_probability`.
fn curated<R: Rng + ?Sized>(
    dictionary: &Dictionary,
    pool: &[String],
    plain_probability: f64,
    rng: &mut R,
) -> Vec<u8> {
    let base = pick(rng, pool).as_bytes().to_vec();
    if rng.random_bool(plain_probability) {
        base
    } else {
        mutate_string(dictionary, &base, rng)
    }
}

pub fn key<R: Rng + ?Sized>(dictionary: &Dictionary, rng: &mut R) -> Vec<u8> {
    curated(dictionary, &dictionary.keys, PLAIN_KEY_PROBABILITY, rng)
}

pub fn field<R: Rng + ?Sized>(dictionary: &Dictionary, rng: &mut R) -> Vec<u8> {
    curated(dictionary, &dictionary.fields, PLAIN_FIELD_PROBABILITY, rng)
}

pub fn value<R: Rng + ?Sized>(dictionary: &Dictionary, rng: &mut R) -> Vec<u8> {
    curated(dictionary, &dictionary.values, PLAIN_VALUE_PROBABILITY, rng)
}

pub fn pattern<R: Rng + ?Sized>(dictionary: &Dictionary, rng: &mut R) -> Vec<u8> {
    pick(rng, &dictionary.patterns).as_bytes().to_vec()
}

pub fn channel<R: Rng + ?Sized>(dictionary: &Dictionary, rng: &mut R) -> Vec<u8> {
    pick(rng, &dictionary.channels).as_bytes().to_vec()
}

pub fn group<R: Rng + ?Sized>(dictionary: &Dictionary, rng: &mut R) -> Vec<u8> {
    pick(rng, &dictionary.groups).as_bytes().to_vec()
}

pub fn consumer<R: Rng + ?Sized>(dictionary: &Dictionary, rng: &mut R) -> Vec<u8> {
    pick(rng, &dictionary.consumers).as_bytes().to_vec()
}

/// `<ms>-<seq>` with a 48-bit millisecond part and a 16-bit sequence.
pub fn stream_id<R: Rng + ?Sized>(rng: &mut R) -> Vec<u8> {
    let ms = rng.random_range(0..1u64 << 48);
    let seq = rng.random_range(0..1u64 << 16);
    format!("{ms}-{seq}").into_bytes()
}

/// A stream id that is occasionally corrupted by the string mutator.
pub fn fuzzy_stream_id<R: Rng + ?Sized>(dictionary: &Dictionary, rng: &mut R) -> Vec<u8> {
    let id = stream_id(rng);
    if rng.random_bool(PLAIN_STREAM_ID_PROBABILITY) {
        id
    } else {
        mutate_string(dictionary, &id, rng)
    }
}
