use crate::codec::{OutputFormat, decode_any, encode};
use crate::config::{ConfigError, RespweaveConfig};
use crate::grammar::Grammar;
use crate::mutator::{Limits, Mutator, ProgramMutator};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info};

/// Number of leading input bytes hashed into the RNG seed.
pub const SEED_PREFIX_LEN: usize = 256;

/// Derives the per-call generator from the first [`SEED_PREFIX_LEN`] bytes of
/// `buffer`.
pub fn seed_rng(buffer: &[u8]) -> ChaCha8Rng {
    let prefix = &buffer[..buffer.len().min(SEED_PREFIX_LEN)];
    let digest = md5::compute(prefix);
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.0[..8]);
    ChaCha8Rng::seed_from_u64(u64::from_le_bytes(seed))
}

/// One mutator instance, alive between `init` and `deinit`.
///
/// The session owns the dictionary, the grammar and the caps; every call
/// receives it explicitly instead of consulting global state.
#[derive(Debug, Clone)]
pub struct Session {
    mutator: ProgramMutator,
    output_format: OutputFormat,
    iteration_count: u32,
}

impl Session {
    /// Validates `config`, loads the dictionary and builds the grammar.
    pub fn init(config: RespweaveConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let dictionary = config.mutator.load_dictionary()?;
        let grammar = Grammar::new(Arc::new(dictionary));
        let limits = config.mutator.limits();
        info!(
            format = ?config.mutator.output_format,
            iterations = config.mutator.iteration_count,
            max_program_length = limits.max_program_length,
            max_arguments = limits.max_arguments,
            max_argument_length = limits.max_argument_length,
            "mutator session initialised"
        );
        Ok(Self {
            mutator: ProgramMutator::new(Arc::new(grammar), limits),
            output_format: config.mutator.output_format,
            iteration_count: config.mutator.iteration_count,
        })
    }

    /// A session on the built-in dictionary and default caps.
    pub fn with_defaults() -> Self {
        let grammar = Grammar::new(Arc::default());
        Self {
            mutator: ProgramMutator::new(Arc::new(grammar), Limits::default()),
            output_format: OutputFormat::default(),
            iteration_count: crate::config::default_iteration_count(),
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn limits(&self) -> Limits {
        self.mutator.limits()
    }

    /// How many mutate calls the driver should request per seed. Fixed by
    /// configuration, independent of the buffer.
    pub fn iteration_count(&self, _buffer: &[u8]) -> u32 {
        self.iteration_count
    }

    /// Produces one mutated candidate from `buffer` (and optionally `donor`),
    /// never longer than `max_size` bytes.
    ///
    /// Output may end mid-frame when `max_size` forces truncation.
    pub fn mutate(&self, buffer: &[u8], donor: Option<&[u8]>, max_size: usize) -> Vec<u8> {
        let mut rng = seed_rng(buffer);
        let program = decode_any(buffer);
        let donor = donor.map(decode_any);
        let mutated = self.mutator.mutate(Some(&program), donor.as_ref(), &mut rng);
        let mut out = encode(&mutated, self.output_format, &mut rng);
        if out.len() > max_size {
            debug!(encoded = out.len(), max_size, "truncating mutated output");
            out.truncate(max_size);
        }
        out
    }

    pub fn deinit(self) {
        debug!("mutator session torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_strict;
    use rand::Rng;

    fn binary_session() -> Session {
        let mut config = RespweaveConfig::default();
        config.mutator.output_format = OutputFormat::Binary;
        Session::init(config).expect("valid config")
    }

    #[test]
    fn seeding_uses_only_the_prefix() {
        let mut a = vec![b'a'; SEED_PREFIX_LEN];
        let mut b = a.clone();
        a.extend_from_slice(b"tail one");
        b.extend_from_slice(b"different tail");
        assert_eq!(seed_rng(&a).random::<u64>(), seed_rng(&b).random::<u64>());
        assert_ne!(seed_rng(b"x").random::<u64>(), seed_rng(b"y").random::<u64>());
    }

    #[test]
    fn mutate_is_deterministic() {
        let session = Session::with_defaults();
        let seed = b"SET k v\nGET k\n";
        let donor = b"*1\r\n$4\r\nPING\r\n";
        for max_size in [16, 256, 4096] {
            assert_eq!(
                session.mutate(seed, Some(&donor[..]), max_size),
                session.mutate(seed, Some(&donor[..]), max_size)
            );
        }
    }

    #[test]
    fn mutate_respects_max_size() {
        let session = Session::with_defaults();
        let mut buffer = b"XADD s * f v\n".to_vec();
        for max_size in [0, 1, 7, 64, 300] {
            let out = session.mutate(&buffer, None, max_size);
            assert!(out.len() <= max_size);
            buffer.extend_from_slice(&out);
        }
    }

    #[test]
    fn binary_output_decodes_strictly_when_not_truncated() {
        let session = binary_session();
        assert_eq!(session.output_format(), OutputFormat::Binary);
        let mut buffer = b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n".to_vec();
        for _ in 0..10 {
            let out = session.mutate(&buffer, None, usize::MAX);
            let program = decode_strict(&out).expect("self-produced frames are well formed");
            assert!(!program.is_empty());
            buffer = out;
        }
    }

    #[test]
    fn empty_and_garbage_buffers_still_produce_output() {
        let session = Session::with_defaults();
        assert!(!session.mutate(b"", None, 1 << 16).is_empty());
        assert!(!session.mutate(b"*\r\n*x\r\n$$$", None, 1 << 16).is_empty());
    }

    #[test]
    fn iteration_count_is_fixed_by_configuration() {
        let mut config = RespweaveConfig::default();
        config.mutator.iteration_count = 5;
        let session = Session::init(config).expect("valid config");
        assert_eq!(session.iteration_count(b"anything"), 5);
        assert_eq!(session.iteration_count(b""), 5);
        session.deinit();
    }

    #[test]
    fn init_rejects_invalid_configuration() {
        let mut config = RespweaveConfig::default();
        config.mutator.max_arguments = 0;
        assert!(matches!(Session::init(config), Err(ConfigError::OutOfRange { .. })));
    }
}
