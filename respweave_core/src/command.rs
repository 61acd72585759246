/// One protocol command: an ordered list of opaque byte-string arguments.
///
/// `args[0]` is the operation name. It is matched case-insensitively but
/// stored exactly as received, so casing survives a decode/encode cycle.
/// A `Command` carries no size bound of its own; callers enforce caps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Command {
    args: Vec<Vec<u8>>,
}

/// One fuzz candidate. Commands replay in order against a stateful server,
/// so order is significant.
pub type Program = Vec<Command>;

impl Command {
    pub fn new(args: Vec<Vec<u8>>) -> Self {
        Self { args }
    }

    /// Builds a command from string parts, mostly useful for literals and tests.
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Self {
        Self {
            args: parts
                .iter()
                .map(|part| part.as_ref().as_bytes().to_vec())
                .collect(),
        }
    }

    /// The operation name, or an empty slice for an empty command.
    pub fn name(&self) -> &[u8] {
        self.args.first().map(Vec::as_slice).unwrap_or_default()
    }

    /// The operation name lower-cased; the reducer's opcode.
    pub fn opcode(&self) -> Vec<u8> {
        self.name().to_ascii_lowercase()
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name.as_bytes())
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut Vec<Vec<u8>> {
        &mut self.args
    }

    pub fn into_args(self) -> Vec<Vec<u8>> {
        self.args
    }

    pub fn push<A: Into<Vec<u8>>>(&mut self, arg: A) {
        self.args.push(arg.into());
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Caps the argument count, dropping the tail.
    pub fn truncate_args(&mut self, max_arguments: usize) {
        self.args.truncate(max_arguments);
    }

    /// Caps every argument to `max_len` bytes.
    pub fn clamp_argument_length(&mut self, max_len: usize) {
        for arg in self.args.iter_mut() {
            arg.truncate(max_len);
        }
    }
}
