use thiserror::Error;

/// Every failure this crate can report.
///
/// Failures raised inside a patch are wrapped in [`Error::Patch`] by the scheduler so the
/// operator can tell which unit (and, through the inner error, which fingerprint) broke.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Resolution
    /// A fingerprint matched zero or more than one method where exactly one was required.
    #[error("fingerprint `{fingerprint}` matched {count} methods, expected exactly one")]
    Resolution { fingerprint: String, count: usize },

    /// A locator scan ran out of instructions.
    #[error("no instruction in {method} satisfies: {description}")]
    InstructionNotFound { method: String, description: String },

    #[error("instruction {index} is `{opcode}`, not an invoke")]
    NotAnInvoke { index: usize, opcode: String },

    #[error("class {0} not found")]
    ClassNotFound(String),

    #[error("method {0} not found")]
    MethodNotFound(String),

    #[error("method {0} has no implementation")]
    NoImplementation(String),

    #[error("malformed descriptor `{0}`")]
    Descriptor(String),

    // Mutation
    #[error("invalid mutation at instruction {index}: {reason}")]
    InvalidMutation { index: usize, reason: String },

    /// The anchor was taken before an edit that moved or removed its instruction.
    #[error("anchor at instruction {index} is stale, derive a fresh one after editing")]
    StaleAnchor { index: usize },

    #[error("smali line {line}: {message}")]
    Assembly { line: usize, message: String },

    // Scheduling
    #[error("dependency cycle between patches: {}", patches.join(", "))]
    DependencyCycle { patches: Vec<String> },

    #[error("patch `{patch}` depends on `{dependency}` which is not part of this run")]
    UnsatisfiedDependency { patch: String, dependency: String },

    #[error("patch `{patch}` skipped because its dependency `{dependency}` failed")]
    DependencyFailed { patch: String, dependency: String },

    #[error("patch `{0}` was added twice")]
    DuplicatePatch(String),

    #[error("registry key `{0}` is already set")]
    RegistryConflict(String),

    #[error("registry key `{0}` is not set")]
    RegistryMissing(String),

    #[error("patch `{patch}` failed: {source}")]
    Patch {
        patch: String,
        #[source]
        source: Box<Error>,
    },

    /// Raised by patches themselves
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// The innermost error, unwrapping any [`Error::Patch`] layers
    pub fn root(&self) -> &Error {
        match self {
            Error::Patch { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
