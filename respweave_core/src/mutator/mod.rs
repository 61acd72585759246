pub mod value;

use crate::command::{Command, Program};
use crate::dictionary::pick;
use crate::grammar::{Grammar, values};
use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::debug;

use self::value::{looks_like_integer, mutate_integer, mutate_string};

const SPLICE_PROBABILITY: f64 = 0.25;
const MAX_BOOTSTRAP_COMMANDS: usize = 8;
const MAX_BATCH: usize = 8;
const MAX_BLOCK_REPEATS: usize = 30;
const REWRITE_PROBABILITY: f64 = 0.6;

const REGENERATE_PROBABILITY: f64 = 0.18;
const RESTRESS_PROBABILITY: f64 = 0.85;
const NORMALIZE_NAME_PROBABILITY: f64 = 0.9;
const ARGUMENT_MUTATION_PROBABILITY: f64 = 0.2;
const INSERT_PROBABILITY: f64 = 0.22;
const INSERT_OPTION_PROBABILITY: f64 = 0.3;
const DELETE_PROBABILITY: f64 = 0.15;
const DUPLICATE_PROBABILITY: f64 = 0.12;
const MAX_SLICE_REPEATS: usize = 40;
const EXPLODE_PROBABILITY: f64 = 0.35;
const MAX_EXPLOSION: usize = 512;

/// A `Mutator` turns an optional base program into a new candidate program.
///
/// Implementations must be total: whatever the input, a usable program comes
/// back. All decisions are drawn from `rng`, so a mutator run is a pure
/// function of its inputs and the generator state.
///
/// # Type Parameters
/// * `R`: The random number generator driving every decision.
pub trait Mutator<R: Rng + ?Sized> {
    /// Produces a new program.
    ///
    /// # Arguments
    /// * `program`: The program to mutate. `None` or an empty program makes the
    ///   mutator synthesize a fresh one.
    /// * `donor`: A second program whose commands may be spliced in.
    /// * `rng`: The random number generator.
    fn mutate(&self, program: Option<&Program>, donor: Option<&Program>, rng: &mut R) -> Program;
}

/// Size caps applied to every mutated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_program_length: usize,
    pub max_arguments: usize,
    pub max_argument_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_program_length: 2000,
            max_arguments: 4096,
            max_argument_length: 65536,
        }
    }
}

/// The eight program-level operators, one chosen uniformly per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramOp {
    MutateOne,
    MutateBatch,
    Insert,
    Delete,
    Shuffle,
    DuplicateBlock,
    Prelude,
    Rewrite,
}

impl ProgramOp {
    pub const ALL: [ProgramOp; 8] = [
        ProgramOp::MutateOne,
        ProgramOp::MutateBatch,
        ProgramOp::Insert,
        ProgramOp::Delete,
        ProgramOp::Shuffle,
        ProgramOp::DuplicateBlock,
        ProgramOp::Prelude,
        ProgramOp::Rewrite,
    ];
}

/// Structure-aware mutator working at program, command and value granularity.
#[derive(Debug, Clone)]
pub struct ProgramMutator {
    grammar: Arc<Grammar>,
    limits: Limits,
}

impl ProgramMutator {
    pub fn new(grammar: Arc<Grammar>, limits: Limits) -> Self {
        Self { grammar, limits }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// A fresh program of 1 to 8 generated commands.
    pub fn bootstrap<R: Rng + ?Sized>(&self, rng: &mut R) -> Program {
        let count = rng.random_range(1..=MAX_BOOTSTRAP_COMMANDS);
        (0..count).map(|_| self.grammar.generate_any(rng)).collect()
    }

    /// Joins a prefix of `primary` with a suffix of `donor` on command
    /// boundaries.
    pub fn splice<R: Rng + ?Sized>(
        &self,
        primary: Program,
        donor: &[Command],
        rng: &mut R,
    ) -> Program {
        if donor.is_empty() {
            return primary;
        }
        let cut_primary = if primary.is_empty() {
            0
        } else {
            rng.random_range(0..=primary.len())
        };
        let cut_donor = rng.random_range(0..=donor.len());
        let mut spliced: Program = primary.into_iter().take(cut_primary).collect();
        spliced.extend_from_slice(&donor[cut_donor..]);
        spliced
    }

    pub fn apply<R: Rng + ?Sized>(&self, op: ProgramOp, program: &mut Program, rng: &mut R) {
        if program.is_empty() {
            *program = self.bootstrap(rng);
        }
        let len = program.len();
        match op {
            ProgramOp::MutateOne => {
                let index = rng.random_range(0..len);
                program[index] = self.mutate_command(&program[index], rng);
            }
            ProgramOp::MutateBatch => {
                let batch = rng.random_range(1..=MAX_BATCH.min(len));
                for _ in 0..batch {
                    let index = rng.random_range(0..len);
                    program[index] = self.mutate_command(&program[index], rng);
                }
            }
            ProgramOp::Insert => {
                let index = rng.random_range(0..=len);
                let command = self.grammar.generate_any(rng);
                program.insert(index, command);
            }
            ProgramOp::Delete => {
                if len > 1 {
                    program.remove(rng.random_range(0..len));
                }
            }
            ProgramOp::Shuffle => program.shuffle(rng),
            ProgramOp::DuplicateBlock => {
                let start = rng.random_range(0..len);
                let end = rng.random_range(start..len);
                let block: Vec<Command> = if end > start {
                    program[start..end].to_vec()
                } else {
                    vec![program[start].clone()]
                };
                let at = rng.random_range(0..=len);
                let repeats = rng.random_range(2..=MAX_BLOCK_REPEATS);
                let room = self.limits.max_program_length.saturating_sub(len);
                let copies: Vec<Command> = block
                    .iter()
                    .cycle()
                    .take((block.len() * repeats).min(room))
                    .cloned()
                    .collect();
                program.splice(at..at, copies);
            }
            ProgramOp::Prelude => {
                let dictionary = self.grammar.dictionary();
                let stream = values::key(dictionary, rng);
                let group = pick(rng, &dictionary.groups).as_bytes().to_vec();
                let create = Command::new(vec![
                    b"XGROUP".to_vec(),
                    b"CREATE".to_vec(),
                    stream.clone(),
                    group,
                    b"0-0".to_vec(),
                    b"MKSTREAM".to_vec(),
                ]);
                let add = Command::new(vec![
                    b"XADD".to_vec(),
                    stream,
                    b"*".to_vec(),
                    b"field1".to_vec(),
                    b"value1".to_vec(),
                ]);
                program.splice(0..0, [add, create]);
                program.push(self.grammar.generate_declared_count(rng));
            }
            ProgramOp::Rewrite => {
                for command in program.iter_mut() {
                    if rng.random_bool(REWRITE_PROBABILITY) {
                        *command = self.grammar.generate_any(rng);
                    }
                }
            }
        }
    }

    /// Mutates a single command.
    ///
    /// Counted-list operations are usually rebuilt around a boundary count.
    /// Everything else gets its name normalized (rarely corrupted), a share
    /// of its arguments mutated, and independent insert/delete/duplicate
    /// passes. Operations with a homogeneous tail may also grow by up to
    /// several hundred tail elements.
    pub fn mutate_command<R: Rng + ?Sized>(&self, command: &Command, rng: &mut R) -> Command {
        if command.is_empty() {
            return command.clone();
        }
        if rng.random_bool(REGENERATE_PROBABILITY) {
            return self.grammar.generate_any(rng);
        }
        if self.grammar.is_counted_list(command.name()) && rng.random_bool(RESTRESS_PROBABILITY) {
            if let Some(mut stressed) = self.grammar.restress(command, rng) {
                stressed.truncate_args(self.limits.max_arguments);
                return stressed;
            }
        }

        let dictionary = self.grammar.dictionary();
        let mut args = command.args().to_vec();

        args[0] = if rng.random_bool(NORMALIZE_NAME_PROBABILITY) {
            args[0].to_ascii_uppercase()
        } else {
            mutate_string(dictionary, &args[0], rng)
        };

        for arg in args.iter_mut().skip(1) {
            if rng.random_bool(ARGUMENT_MUTATION_PROBABILITY) {
                *arg = if looks_like_integer(arg) {
                    mutate_integer(dictionary, arg, rng)
                } else {
                    mutate_string(dictionary, arg, rng)
                };
            }
        }

        if rng.random_bool(INSERT_PROBABILITY) {
            let at = rng.random_range(1..=args.len());
            let with_options = rng.random_bool(INSERT_OPTION_PROBABILITY);
            let token = dictionary.insertable(rng, with_options).as_bytes().to_vec();
            args.insert(at, token);
        }
        if rng.random_bool(DELETE_PROBABILITY) && args.len() > 1 {
            args.remove(rng.random_range(1..args.len()));
        }
        if rng.random_bool(DUPLICATE_PROBABILITY) && args.len() > 2 {
            let start = rng.random_range(1..args.len());
            let end = rng.random_range(start..args.len());
            let slice: Vec<Vec<u8>> = if end > start {
                args[start..end].to_vec()
            } else {
                vec![args[start].clone()]
            };
            let at = rng.random_range(1..=args.len());
            let repeats = rng.random_range(2..MAX_SLICE_REPEATS);
            let room = self.limits.max_arguments.saturating_sub(args.len());
            let copies: Vec<Vec<u8>> = slice
                .iter()
                .cycle()
                .take((slice.len() * repeats).min(room))
                .cloned()
                .collect();
            args.splice(at..at, copies);
        }

        if let Some(tail) = self.grammar.variadic_tail(command.name()) {
            if rng.random_bool(EXPLODE_PROBABILITY) {
                let extra = rng.random_range(0..MAX_EXPLOSION);
                let count = extra / tail.item.len().max(1);
                args.extend(self.grammar.tail_elements(tail, count, rng));
            }
        }

        let mut mutated = Command::new(args);
        mutated.truncate_args(self.limits.max_arguments);
        mutated
    }

    /// Clamps a program to the configured caps.
    pub fn enforce_limits(&self, program: &mut Program) {
        program.truncate(self.limits.max_program_length);
        for command in program.iter_mut() {
            command.truncate_args(self.limits.max_arguments);
            command.clamp_argument_length(self.limits.max_argument_length);
        }
    }
}

impl<R: Rng + ?Sized> Mutator<R> for ProgramMutator {
    fn mutate(&self, program: Option<&Program>, donor: Option<&Program>, rng: &mut R) -> Program {
        let mut current: Program = program
            .map(|program| program.iter().filter(|command| !command.is_empty()).cloned().collect())
            .unwrap_or_default();

        if let Some(donor) = donor {
            if rng.random_bool(SPLICE_PROBABILITY) {
                current = self.splice(current, donor, rng);
            }
        }

        if current.is_empty() {
            current = self.bootstrap(rng);
        }

        let op = ProgramOp::ALL[rng.random_range(0..ProgramOp::ALL.len())];
        debug!(?op, commands = current.len(), "applying program operator");
        self.apply(op, &mut current, rng);
        self.enforce_limits(&mut current);
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    fn mutator(limits: Limits) -> ProgramMutator {
        let grammar = Grammar::new(Arc::new(Dictionary::default()));
        ProgramMutator::new(Arc::new(grammar), limits)
    }

    fn sample() -> Program {
        vec![
            Command::from_parts(&["SET", "k", "v"]),
            Command::from_parts(&["GET", "k"]),
            Command::from_parts(&["INCRBY", "counter", "5"]),
        ]
    }

    #[test]
    fn empty_input_is_bootstrapped() {
        let mutator = mutator(Limits::default());
        let mut rng = ChaCha8Rng::from_seed([31u8; 32]);
        for _ in 0..100 {
            let program = mutator.mutate(None, None, &mut rng);
            assert!(!program.is_empty());
            assert!(program.iter().all(|command| !command.is_empty()));
        }
    }

    #[test]
    fn mutation_is_deterministic_for_equal_seeds() {
        let mutator = mutator(Limits::default());
        let input = sample();
        let mut first = ChaCha8Rng::from_seed([32u8; 32]);
        let mut second = ChaCha8Rng::from_seed([32u8; 32]);
        for _ in 0..50 {
            let a = mutator.mutate(Some(&input), None, &mut first);
            let b = mutator.mutate(Some(&input), None, &mut second);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn limits_are_enforced() {
        let limits = Limits {
            max_program_length: 5,
            max_arguments: 6,
            max_argument_length: 8,
        };
        let mutator = mutator(limits);
        let mut rng = ChaCha8Rng::from_seed([33u8; 32]);
        let mut program = sample();
        for _ in 0..300 {
            program = mutator.mutate(Some(&program), None, &mut rng);
            assert!(program.len() <= 5);
            for command in &program {
                assert!(command.len() <= 6);
                assert!(command.args().iter().all(|arg| arg.len() <= 8));
            }
        }
    }

    #[test]
    fn delete_keeps_single_command_programs() {
        let mutator = mutator(Limits::default());
        let mut rng = ChaCha8Rng::from_seed([34u8; 32]);
        let mut program = vec![Command::from_parts(&["PING"])];
        mutator.apply(ProgramOp::Delete, &mut program, &mut rng);
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn prelude_sets_up_stream_and_group() {
        let mutator = mutator(Limits::default());
        let mut rng = ChaCha8Rng::from_seed([35u8; 32]);
        let mut program = sample();
        mutator.apply(ProgramOp::Prelude, &mut program, &mut rng);
        assert_eq!(program.len(), 6);
        assert!(program[0].is_named("XADD"));
        assert!(program[1].is_named("XGROUP"));
        assert_eq!(program[0].args()[1], program[1].args()[2]);
        assert_eq!(program[1].args()[5], b"MKSTREAM".to_vec());
        assert!(program[5].is_named("XACKDEL"));
    }

    #[test]
    fn duplicate_block_respects_program_cap() {
        let limits = Limits {
            max_program_length: 10,
            ..Limits::default()
        };
        let mutator = mutator(limits);
        let mut rng = ChaCha8Rng::from_seed([36u8; 32]);
        for _ in 0..50 {
            let mut program = sample();
            mutator.apply(ProgramOp::DuplicateBlock, &mut program, &mut rng);
            assert!(program.len() <= 10);
            assert!(program.len() >= 3);
        }
    }

    #[test]
    fn splice_takes_donor_suffix() {
        let mutator = mutator(Limits::default());
        let mut rng = ChaCha8Rng::from_seed([37u8; 32]);
        let donor = vec![
            Command::from_parts(&["LPUSH", "l", "a"]),
            Command::from_parts(&["LPOP", "l"]),
        ];
        for _ in 0..50 {
            let spliced = mutator.splice(sample(), &donor, &mut rng);
            let donor_part = spliced
                .iter()
                .filter(|command| command.is_named("LPUSH") || command.is_named("LPOP"))
                .count();
            assert!(spliced.len() <= sample().len() + donor.len());
            assert!(spliced.ends_with(&donor[donor.len() - donor_part..]));
        }
        assert_eq!(mutator.splice(sample(), &[], &mut rng), sample());
    }

    #[test]
    fn command_mutation_keeps_a_name_and_respects_argument_cap() {
        let limits = Limits {
            max_arguments: 16,
            ..Limits::default()
        };
        let mutator = mutator(limits);
        let mut rng = ChaCha8Rng::from_seed([38u8; 32]);
        let command = Command::from_parts(&["mset", "a", "1", "b", "2"]);
        for _ in 0..300 {
            let mutated = mutator.mutate_command(&command, &mut rng);
            assert!(!mutated.is_empty());
            assert!(mutated.len() <= 16);
        }
    }

    #[test]
    fn counted_lists_are_usually_restressed() {
        let mutator = mutator(Limits::default());
        let mut rng = ChaCha8Rng::from_seed([39u8; 32]);
        let command = Command::from_parts(&["xackdel", "s", "g", "IDS", "1", "1-1"]);
        let restressed = (0..200)
            .map(|_| mutator.mutate_command(&command, &mut rng))
            .filter(|mutated| {
                mutated.args()[0] == b"XACKDEL"
                    && mutated.args().get(1).is_some_and(|stream| stream == b"s")
            })
            .count();
        assert!(restressed > 100, "{restressed} of 200");
    }

    #[test]
    fn mutator_works_through_a_shared_trait_object() {
        let mutator = mutator(Limits::default());
        let shared: &dyn Mutator<ChaCha8Rng> = &mutator;
        let mut first = ChaCha8Rng::from_seed([41u8; 32]);
        let mut second = ChaCha8Rng::from_seed([41u8; 32]);
        let a = shared.mutate(Some(&sample()), None, &mut first);
        let b = mutator.mutate(Some(&sample()), None, &mut second);
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn bulk_operations_sometimes_explode() {
        let mutator = mutator(Limits::default());
        let mut rng = ChaCha8Rng::from_seed([40u8; 32]);
        let command = Command::from_parts(&["DEL", "k"]);
        let grew = (0..200)
            .filter(|_| mutator.mutate_command(&command, &mut rng).len() > 60)
            .count();
        assert!(grew > 0);
    }
}
