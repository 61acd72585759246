//! Grammar registry: maps an operation name to a description of its argument
//! shape and evaluates those descriptions into commands.
//!
//! The registry is a static table of [`GeneratorSpec`]s (see `table.rs`). Every
//! entry is data; [`Grammar`] is the only code that interprets it. Names that
//! are not in the table go through a generic fallback, so generation is total.

mod table;
pub mod values;

use crate::command::Command;
use crate::dictionary::{Dictionary, pick};
use crate::mutator::value::mutate_string;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub use table::SPECS;

/// Counts concentrated at binary-size boundaries, used for declared-count
/// operations and id-list stress.
pub const BOUNDARY_COUNTS: &[usize] = &[
    0, 1, 2, 7, 8, 9, 15, 16, 17, 31, 32, 63, 64, 65, 128, 256, 512,
];

/// Upper bound on generated list lengths for counted operations.
pub const MAX_COUNTED_ELEMENTS: usize = 512;

const REGISTERED_SPEC_PROBABILITY: f64 = 0.85;
const FRESH_OVERSHOOT_PROBABILITY: f64 = 0.3;
const STRESS_OVERSHOOT_PROBABILITY: f64 = 0.4;
const STRESS_UNDERSHOOT_PROBABILITY: f64 = 0.2;
const STRESS_REPEAT_PROBABILITY: f64 = 0.3;
const MAX_OVERSHOOT: usize = 128;
const MAX_LIST_REPEATS: usize = 20;

const MAX_WEIGHTED_KEYS: usize = 32;
const AGGREGATE_FUNCTIONS: &[&str] = &["SUM", "MIN", "MAX", "foo", ""];

const GENERIC_MAX_INTEGERS: usize = 32;
const GENERIC_MAX_VALUES: usize = 64;

/// One argument slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    Lit(&'static str),
    Key,
    Field,
    Value,
    Int,
    Float,
    Pattern,
    Channel,
    Group,
    Consumer,
    StreamId,
    FuzzyStreamId,
    /// Decimal in `0..n`.
    Below(u64),
    /// Decimal in `lo..hi`.
    Between(i64, i64),
    OneOf(&'static [&'static str]),
    /// One of the literals or a fresh stream id, all equally likely.
    OneOfOrId(&'static [&'static str]),
    /// A literal passed through the string mutator.
    Mutated(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Part {
    Arg(Slot),
    /// The slots are emitted with the given probability.
    Opt(f64, &'static [Slot]),
    /// The first branch with the given probability, else the second.
    Either(f64, &'static [Slot], &'static [Slot]),
    /// One branch, chosen uniformly.
    Choice(&'static [&'static [Slot]]),
}

/// A homogeneous repeated group: `item` is emitted `0..max` times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tail {
    pub item: &'static [Slot],
    pub max: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Fixed(&'static [Part]),
    VariadicTail {
        head: &'static [Part],
        tail: Tail,
        trailer: &'static [Part],
    },
    /// `name head... [marker count] element...`. With a marker the count is
    /// declared explicitly and deliberately disagrees with the element list;
    /// without one the list length itself is the stressed quantity.
    CountedList {
        head: &'static [Slot],
        marker: Option<&'static str>,
        element: Slot,
    },
    /// `name script numkeys key... arg...` with `numkeys` matching the keys.
    NumberedKeys {
        scripts: &'static [&'static str],
        max_keys: usize,
        args: Tail,
        args_probability: f64,
    },
    /// `name [destination] numkeys key... [WEIGHTS w...] [AGGREGATE f] [WITHSCORES]`
    /// with one weight per key.
    WeightedAggregate { destination: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorSpec {
    pub name: &'static str,
    pub shape: Shape,
}

pub(crate) const fn spec(name: &'static str, shape: Shape) -> GeneratorSpec {
    GeneratorSpec { name, shape }
}

impl GeneratorSpec {
    pub fn is_counted_list(&self) -> bool {
        matches!(self.shape, Shape::CountedList { .. })
    }

    pub fn variadic_tail(&self) -> Option<Tail> {
        match self.shape {
            Shape::VariadicTail { tail, .. } => Some(tail),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenericShape {
    Bare,
    Key,
    KeyKey,
    KeyInt,
    KeyValue,
    KeyField,
    KeyFieldValue,
    Pattern,
    Integers,
    Values,
}

const GENERIC_SHAPES: [GenericShape; 10] = [
    GenericShape::Bare,
    GenericShape::Key,
    GenericShape::KeyKey,
    GenericShape::KeyInt,
    GenericShape::KeyValue,
    GenericShape::KeyField,
    GenericShape::KeyFieldValue,
    GenericShape::Pattern,
    GenericShape::Integers,
    GenericShape::Values,
];

/// Evaluates generator descriptions against a shared [`Dictionary`].
#[derive(Debug, Clone)]
pub struct Grammar {
    dictionary: Arc<Dictionary>,
    index: HashMap<&'static str, &'static GeneratorSpec>,
    declared_count: Vec<&'static GeneratorSpec>,
}

impl Grammar {
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        let index: HashMap<_, _> = SPECS.iter().map(|spec| (spec.name, spec)).collect();
        let declared_count = SPECS
            .iter()
            .filter(|spec| matches!(spec.shape, Shape::CountedList { marker: Some(_), .. }))
            .collect();
        debug!(registered = index.len(), "grammar registry built");
        Self {
            dictionary,
            index,
            declared_count,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Case-insensitive lookup of a registered operation.
    pub fn lookup(&self, name: &[u8]) -> Option<&'static GeneratorSpec> {
        let upper = String::from_utf8_lossy(name).to_ascii_uppercase();
        self.index.get(upper.as_str()).copied()
    }

    /// The homogeneous tail of `name`, if it has one.
    pub fn variadic_tail(&self, name: &[u8]) -> Option<Tail> {
        self.lookup(name).and_then(GeneratorSpec::variadic_tail)
    }

    pub fn is_counted_list(&self, name: &[u8]) -> bool {
        self.lookup(name).is_some_and(GeneratorSpec::is_counted_list)
    }

    /// Generates a command for `name`. Unregistered names use the generic
    /// fallback with `name` as given.
    pub fn generate<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> Command {
        match self.lookup(name.as_bytes()) {
            Some(spec) => self.evaluate(spec, rng),
            None => self.generate_generic(name, rng),
        }
    }

    /// Draws an operation name from the dictionary and generates a command for
    /// it; registered operations still go through the generic fallback some of
    /// the time.
    pub fn generate_any<R: Rng + ?Sized>(&self, rng: &mut R) -> Command {
        let name = pick(rng, &self.dictionary.commands).to_ascii_uppercase();
        match self.lookup(name.as_bytes()) {
            Some(spec) if rng.random_bool(REGISTERED_SPEC_PROBABILITY) => self.evaluate(spec, rng),
            _ => self.generate_generic(&name, rng),
        }
    }

    /// A fresh command from one of the declared-count operations.
    pub fn generate_declared_count<R: Rng + ?Sized>(&self, rng: &mut R) -> Command {
        match self.declared_count.choose(rng) {
            Some(spec) => self.evaluate(spec, rng),
            None => self.generate_any(rng),
        }
    }

    pub fn evaluate<R: Rng + ?Sized>(&self, spec: &GeneratorSpec, rng: &mut R) -> Command {
        let mut command = Command::from_parts(&[spec.name]);
        match spec.shape {
            Shape::Fixed(parts) => self.emit_parts(parts, &mut command, rng),
            Shape::VariadicTail {
                head,
                tail,
                trailer,
            } => {
                self.emit_parts(head, &mut command, rng);
                let count = rng.random_range(0..tail.max.max(1));
                self.emit_tail(tail, count, &mut command, rng);
                self.emit_parts(trailer, &mut command, rng);
            }
            Shape::CountedList {
                head,
                marker,
                element,
            } => {
                self.emit_slots(head, &mut command, rng);
                match marker {
                    Some(marker) => {
                        let declared = self.boundary_count(rng);
                        let mut length = declared;
                        if rng.random_bool(FRESH_OVERSHOOT_PROBABILITY) {
                            length += rng.random_range(0..MAX_OVERSHOOT);
                        }
                        command.push(marker);
                        command.push(declared.to_string());
                        let length = length.min(MAX_COUNTED_ELEMENTS);
                        self.emit_elements(element, length, &mut command, rng);
                    }
                    None => {
                        let length = rng.random_range(0..MAX_COUNTED_ELEMENTS);
                        self.emit_elements(element, length, &mut command, rng);
                    }
                }
            }
            Shape::NumberedKeys {
                scripts,
                max_keys,
                args,
                args_probability,
            } => {
                command.push(pick(rng, scripts));
                let keys = rng.random_range(0..=max_keys);
                command.push(keys.to_string());
                for _ in 0..keys {
                    command.push(values::key(&self.dictionary, rng));
                }
                if rng.random_bool(args_probability) {
                    let count = rng.random_range(0..args.max.max(1));
                    self.emit_tail(args, count, &mut command, rng);
                }
            }
            Shape::WeightedAggregate { destination } => {
                if destination {
                    command.push(values::key(&self.dictionary, rng));
                }
                let keys = rng.random_range(0..MAX_WEIGHTED_KEYS);
                command.push(keys.to_string());
                for _ in 0..keys {
                    command.push(values::key(&self.dictionary, rng));
                }
                if rng.random_bool(0.5) && keys > 0 {
                    command.push("WEIGHTS");
                    for _ in 0..keys {
                        command.push(values::float(rng));
                    }
                }
                if rng.random_bool(0.5) {
                    command.push("AGGREGATE");
                    command.push(pick(rng, AGGREGATE_FUNCTIONS));
                }
                if rng.random_bool(0.3) {
                    command.push("WITHSCORES");
                }
            }
        }
        command
    }

    /// Rebuilds a counted-list command around a boundary count, reusing the
    /// existing head arguments. Returns `None` for any other operation.
    ///
    /// With a marker, the declared count and the element list are made to
    /// disagree some of the time. Without one, the id list may be repeated.
    pub fn restress<R: Rng + ?Sized>(&self, command: &Command, rng: &mut R) -> Option<Command> {
        let spec = self.lookup(command.name())?;
        let Shape::CountedList {
            head,
            marker,
            element,
        } = spec.shape
        else {
            return None;
        };

        let mut out = Command::from_parts(&[spec.name]);
        for (i, slot) in head.iter().enumerate() {
            match command.args().get(i + 1) {
                Some(existing) => out.push(existing.clone()),
                None => out.push(self.fill(*slot, rng)),
            }
        }

        let declared = self.boundary_count(rng);
        match marker {
            Some(marker) => {
                let mut length = declared;
                if rng.random_bool(STRESS_OVERSHOOT_PROBABILITY) {
                    length = (declared + rng.random_range(1..MAX_OVERSHOOT))
                        .min(MAX_COUNTED_ELEMENTS);
                }
                if rng.random_bool(STRESS_UNDERSHOOT_PROBABILITY) {
                    length = (declared / 2).min(MAX_COUNTED_ELEMENTS);
                }
                out.push(marker);
                out.push(declared.to_string());
                self.emit_elements(element, length, &mut out, rng);
            }
            None => {
                let elements: Vec<Vec<u8>> = (0..declared.min(MAX_COUNTED_ELEMENTS))
                    .map(|_| self.fill(element, rng))
                    .collect();
                let repeats = if rng.random_bool(STRESS_REPEAT_PROBABILITY) {
                    rng.random_range(2..MAX_LIST_REPEATS)
                } else {
                    1
                };
                for _ in 0..repeats {
                    out.args_mut().extend(elements.iter().cloned());
                }
            }
        }
        Some(out)
    }

    /// `count` freshly generated tail items.
    pub fn tail_elements<R: Rng + ?Sized>(
        &self,
        tail: Tail,
        count: usize,
        rng: &mut R,
    ) -> Vec<Vec<u8>> {
        let mut out = Command::default();
        self.emit_tail(tail, count, &mut out, rng);
        out.into_args()
    }

    pub fn generate_generic<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> Command {
        let dictionary = self.dictionary.as_ref();
        let mut command = Command::from_parts(&[name]);
        match GENERIC_SHAPES[rng.random_range(0..GENERIC_SHAPES.len())] {
            GenericShape::Bare => {}
            GenericShape::Key => command.push(values::key(dictionary, rng)),
            GenericShape::KeyKey => {
                command.push(values::key(dictionary, rng));
                command.push(values::key(dictionary, rng));
            }
            GenericShape::KeyInt => {
                command.push(values::key(dictionary, rng));
                command.push(values::integer(rng));
            }
            GenericShape::KeyValue => {
                command.push(values::key(dictionary, rng));
                command.push(values::value(dictionary, rng));
            }
            GenericShape::KeyField => {
                command.push(values::key(dictionary, rng));
                command.push(values::field(dictionary, rng));
            }
            GenericShape::KeyFieldValue => {
                command.push(values::key(dictionary, rng));
                command.push(values::field(dictionary, rng));
                command.push(values::value(dictionary, rng));
            }
            GenericShape::Pattern => command.push(values::pattern(dictionary, rng)),
            GenericShape::Integers => {
                for _ in 0..rng.random_range(0..GENERIC_MAX_INTEGERS) {
                    command.push(values::integer(rng));
                }
            }
            GenericShape::Values => {
                for _ in 0..rng.random_range(0..GENERIC_MAX_VALUES) {
                    command.push(values::value(dictionary, rng));
                }
            }
        }
        command
    }

    fn boundary_count<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        BOUNDARY_COUNTS.choose(rng).copied().unwrap_or(0)
    }

    fn fill<R: Rng + ?Sized>(&self, slot: Slot, rng: &mut R) -> Vec<u8> {
        let dictionary = self.dictionary.as_ref();
        match slot {
            Slot::Lit(text) => text.as_bytes().to_vec(),
            Slot::Key => values::key(dictionary, rng),
            Slot::Field => values::field(dictionary, rng),
            Slot::Value => values::value(dictionary, rng),
            Slot::Int => values::integer(rng),
            Slot::Float => values::float(rng),
            Slot::Pattern => values::pattern(dictionary, rng),
            Slot::Channel => values::channel(dictionary, rng),
            Slot::Group => values::group(dictionary, rng),
            Slot::Consumer => values::consumer(dictionary, rng),
            Slot::StreamId => values::stream_id(rng),
            Slot::FuzzyStreamId => values::fuzzy_stream_id(dictionary, rng),
            Slot::Below(n) => rng.random_range(0..n.max(1)).to_string().into_bytes(),
            Slot::Between(lo, hi) => {
                let value = if lo < hi { rng.random_range(lo..hi) } else { lo };
                value.to_string().into_bytes()
            }
            Slot::OneOf(options) => pick(rng, options).as_bytes().to_vec(),
            Slot::OneOfOrId(options) => {
                let index = rng.random_range(0..=options.len());
                match options.get(index) {
                    Some(option) => option.as_bytes().to_vec(),
                    None => values::stream_id(rng),
                }
            }
            Slot::Mutated(text) => mutate_string(dictionary, text.as_bytes(), rng),
        }
    }

    fn emit_slots<R: Rng + ?Sized>(&self, slots: &[Slot], command: &mut Command, rng: &mut R) {
        for slot in slots {
            let arg = self.fill(*slot, rng);
            command.push(arg);
        }
    }

    fn emit_parts<R: Rng + ?Sized>(&self, parts: &[Part], command: &mut Command, rng: &mut R) {
        for part in parts {
            match *part {
                Part::Arg(slot) => {
                    let arg = self.fill(slot, rng);
                    command.push(arg);
                }
                Part::Opt(probability, slots) => {
                    if rng.random_bool(probability) {
                        self.emit_slots(slots, command, rng);
                    }
                }
                Part::Either(probability, first, second) => {
                    let branch = if rng.random_bool(probability) { first } else { second };
                    self.emit_slots(branch, command, rng);
                }
                Part::Choice(branches) => {
                    if let Some(branch) = branches.choose(rng) {
                        self.emit_slots(branch, command, rng);
                    }
                }
            }
        }
    }

    fn emit_tail<R: Rng + ?Sized>(
        &self,
        tail: Tail,
        count: usize,
        command: &mut Command,
        rng: &mut R,
    ) {
        for _ in 0..count {
            self.emit_slots(tail.item, command, rng);
        }
    }

    fn emit_elements<R: Rng + ?Sized>(
        &self,
        element: Slot,
        count: usize,
        command: &mut Command,
        rng: &mut R,
    ) {
        for _ in 0..count {
            let arg = self.fill(element, rng);
            command.push(arg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    fn grammar() -> Grammar {
        Grammar::new(Arc::new(Dictionary::default()))
    }

    #[test]
    fn registry_has_no_duplicate_names() {
        let grammar = grammar();
        assert_eq!(grammar.len(), SPECS.len());
        assert!(grammar.len() >= 150);
    }

    #[test]
    fn registered_names_are_upper_case() {
        for spec in SPECS {
            assert_eq!(spec.name, spec.name.to_ascii_uppercase());
        }
    }

    #[test]
    fn set_always_has_name_key_and_value() {
        let grammar = grammar();
        let mut rng = ChaCha8Rng::from_seed([21u8; 32]);
        for _ in 0..500 {
            let command = grammar.generate("set", &mut rng);
            assert_eq!(command.args()[0], b"SET".to_vec());
            assert!(command.len() >= 3);
        }
    }

    #[test]
    fn lookup_ignores_case() {
        let grammar = grammar();
        assert_eq!(grammar.lookup(b"xAdD").map(|s| s.name), Some("XADD"));
        assert!(grammar.lookup(b"NOSUCHOP").is_none());
    }

    #[test]
    fn unknown_names_use_generic_fallback() {
        let grammar = grammar();
        let mut rng = ChaCha8Rng::from_seed([22u8; 32]);
        for _ in 0..200 {
            let command = grammar.generate("FROBNICATE", &mut rng);
            assert!(command.is_named("FROBNICATE"));
            assert!(command.len() <= 1 + GENERIC_MAX_VALUES);
        }
    }

    #[test]
    fn generate_any_never_yields_empty_command() {
        let grammar = grammar();
        let mut rng = ChaCha8Rng::from_seed([23u8; 32]);
        for _ in 0..2000 {
            assert!(!grammar.generate_any(&mut rng).is_empty());
        }
    }

    #[test]
    fn declared_count_commands_carry_marker_and_boundary_count() {
        let grammar = grammar();
        let mut rng = ChaCha8Rng::from_seed([24u8; 32]);
        let mut mismatched = 0;
        for _ in 0..200 {
            let command = grammar.generate_declared_count(&mut rng);
            assert!(command.is_named("XACKDEL"));
            assert_eq!(command.args()[3], b"IDS".to_vec());
            let declared: usize = String::from_utf8_lossy(&command.args()[4])
                .parse()
                .expect("count");
            assert!(BOUNDARY_COUNTS.contains(&declared));
            let listed = command.len() - 5;
            assert!(listed <= MAX_COUNTED_ELEMENTS);
            if listed != declared {
                mismatched += 1;
            }
        }
        assert!(mismatched > 0);
    }

    #[test]
    fn restress_reuses_head_arguments() {
        let grammar = grammar();
        let mut rng = ChaCha8Rng::from_seed([25u8; 32]);
        let original = Command::from_parts(&["xack", "orders", "workers", "1-1"]);
        for _ in 0..50 {
            let stressed = grammar.restress(&original, &mut rng).expect("counted list");
            assert_eq!(stressed.args()[0], b"XACK".to_vec());
            assert_eq!(stressed.args()[1], b"orders".to_vec());
            assert_eq!(stressed.args()[2], b"workers".to_vec());
        }
        let short = Command::from_parts(&["XDEL"]);
        let rebuilt = grammar.restress(&short, &mut rng).expect("counted list");
        assert!(rebuilt.len() >= 2);
        assert!(grammar.restress(&Command::from_parts(&["GET", "k"]), &mut rng).is_none());
    }

    #[test]
    fn numbered_keys_match_declared_count() {
        let grammar = grammar();
        let mut rng = ChaCha8Rng::from_seed([26u8; 32]);
        for _ in 0..200 {
            let command = grammar.generate("EVAL", &mut rng);
            let keys: usize = String::from_utf8_lossy(&command.args()[2]).parse().expect("numkeys");
            assert!(keys <= 2);
            assert!(command.len() >= 3 + keys);
        }
    }

    #[test]
    fn weighted_aggregate_weights_match_keys() {
        let grammar = grammar();
        let mut rng = ChaCha8Rng::from_seed([27u8; 32]);
        for _ in 0..200 {
            let command = grammar.generate("ZUNIONSTORE", &mut rng);
            let keys: usize = String::from_utf8_lossy(&command.args()[2]).parse().expect("numkeys");
            if command.args().get(3 + keys).is_some_and(|a| a == b"WEIGHTS") {
                let after = &command.args()[4 + keys..];
                let weights = after
                    .iter()
                    .take_while(|a| a.as_slice() != b"AGGREGATE" && a.as_slice() != b"WITHSCORES")
                    .count();
                assert_eq!(weights, keys);
            }
        }
    }

    #[test]
    fn variadic_tails_are_exposed_for_bulk_operations() {
        let grammar = grammar();
        assert_eq!(grammar.variadic_tail(b"mset").map(|t| t.item.len()), Some(2));
        assert_eq!(grammar.variadic_tail(b"DEL").map(|t| t.item), Some(&[Slot::Key][..]));
        assert!(grammar.variadic_tail(b"GET").is_none());
        assert!(grammar.is_counted_list(b"xackdel"));
    }

    #[test]
    fn every_registered_spec_evaluates() {
        let grammar = grammar();
        let mut rng = ChaCha8Rng::from_seed([28u8; 32]);
        for spec in SPECS {
            for _ in 0..5 {
                let command = grammar.evaluate(spec, &mut rng);
                assert_eq!(command.name(), spec.name.as_bytes());
            }
        }
    }
}
