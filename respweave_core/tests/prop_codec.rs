use proptest::prelude::*;
use respweave_core::codec::{
    DecodeMode, decode, decode_any, decode_resilient, decode_strict, decode_tokens, encode_binary,
    encode_tokens,
};
use respweave_core::command::{Command, Program};

fn binary_program() -> impl Strategy<Value = Program> {
    prop::collection::vec(
        prop::collection::vec(prop::collection::vec(any::<u8>(), 0..24), 1..8)
            .prop_map(Command::new),
        0..16,
    )
}

fn token_program() -> impl Strategy<Value = Program> {
    let name = "[A-Z]{1,10}".prop_map(String::into_bytes);
    let arg = r#"[a-z0-9 "\\:_\r\n-]{0,12}"#.prop_map(String::into_bytes);
    prop::collection::vec(
        (name, prop::collection::vec(arg, 0..6)).prop_map(|(name, rest)| {
            let mut args = vec![name];
            args.extend(rest);
            Command::new(args)
        }),
        0..12,
    )
}

proptest! {
    #[test]
    fn binary_frames_round_trip_strictly(program in binary_program()) {
        let encoded = encode_binary(&program);
        prop_assert_eq!(decode_strict(&encoded).expect("well-formed frames"), program.clone());
        prop_assert_eq!(decode(&encoded, DecodeMode::Resilient).expect("resilient"), program);
    }

    #[test]
    fn token_lines_round_trip(program in token_program()) {
        prop_assert_eq!(decode_tokens(&encode_tokens(&program)), program);
    }

    #[test]
    fn resilient_decoding_terminates_on_noise(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let program = decode_resilient(&bytes);
        prop_assert!(program.iter().all(|command| !command.is_empty()));
        let _ = decode_any(&bytes);
    }

    #[test]
    fn resilient_decoding_survives_marker_storms(
        pieces in prop::collection::vec(
            prop::sample::select(vec![&b"*"[..], b"$", b"\r\n", b"3", b"-1", b"x"]),
            0..256,
        )
    ) {
        let bytes: Vec<u8> = pieces.concat();
        let _ = decode_resilient(&bytes);
    }

    #[test]
    fn truncated_frames_never_panic_in_strict_mode(
        program in binary_program(),
        cut in any::<prop::sample::Index>(),
    ) {
        let encoded = encode_binary(&program);
        let end = if encoded.is_empty() { 0 } else { cut.index(encoded.len()) };
        let _ = decode_strict(&encoded[..end]);
        let prefix = decode_resilient(&encoded[..end]);
        prop_assert!(prefix.len() <= program.len());
        prop_assert_eq!(&program[..prefix.len()], &prefix[..]);
    }
}
