use proptest::prelude::*;
use respweave_core::codec::{OutputFormat, decode_strict};
use respweave_core::config::RespweaveConfig;
use respweave_core::session::Session;

fn binary_session() -> Session {
    let mut config = RespweaveConfig::default();
    config.mutator.output_format = OutputFormat::Binary;
    Session::init(config).expect("valid config")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mutate_output_fits_max_size(
        buffer in prop::collection::vec(any::<u8>(), 0..256),
        max_size in 0usize..2048,
    ) {
        let session = Session::with_defaults();
        prop_assert!(session.mutate(&buffer, None, max_size).len() <= max_size);
    }

    #[test]
    fn mutate_is_deterministic(
        buffer in prop::collection::vec(any::<u8>(), 0..256),
        donor in prop::option::of(prop::collection::vec(any::<u8>(), 0..128)),
        max_size in 1usize..4096,
    ) {
        let session = Session::with_defaults();
        let first = session.mutate(&buffer, donor.as_deref(), max_size);
        let second = session.mutate(&buffer, donor.as_deref(), max_size);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn untruncated_binary_output_is_well_formed(
        seed in "(SET|GET|HSET|XADD|LPUSH) [a-z]{1,6}( [a-z0-9]{1,6}){0,4}\n",
    ) {
        let session = binary_session();
        let out = session.mutate(seed.as_bytes(), None, usize::MAX);
        let program = decode_strict(&out).expect("self-produced frames decode strictly");
        prop_assert!(program.len() <= session.limits().max_program_length);
        prop_assert!(program.iter().all(|c| c.len() <= session.limits().max_arguments));
    }
}
