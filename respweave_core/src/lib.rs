pub mod afl;
pub mod codec;
pub mod command;
pub mod config;
pub mod dictionary;
pub mod grammar;
pub mod mutator;
pub mod reducer;
pub mod session;

pub use codec::{DecodeError, DecodeMode, OutputFormat, decode, decode_any, encode};
pub use command::{Command, Program};
pub use config::{ConfigError, MutatorSettings, ReducerSettings, RespweaveConfig};
pub use dictionary::{Dictionary, DictionaryError};
pub use grammar::{GeneratorSpec, Grammar, Shape};
pub use mutator::{Limits, Mutator, ProgramMutator, ProgramOp};
pub use reducer::{Equivalence, ReduceError, ReduceStats, reduce};
pub use session::Session;
