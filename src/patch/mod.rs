pub mod context;
pub mod registry;
pub mod scheduler;

pub use context::PatchContext;
pub use registry::SharedRegistry;
pub use scheduler::{run, Patcher, PatcherOptions, RunResult};

use crate::{error::Result, fingerprint::Fingerprint};

/// A named transformation applied at most once to a program image
pub trait Patch {
    /// Unique within a run. Dependencies refer to patches by this name.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Patches that must be done before this one executes
    fn dependencies(&self) -> &[&str] {
        &[]
    }

    /// Fingerprints resolved against the whole program before [`Patch::execute`] runs.
    /// Each must match exactly one method, otherwise the patch fails without executing.
    fn fingerprints(&self) -> &[Fingerprint] {
        &[]
    }

    fn execute(&self, context: &mut PatchContext<'_>) -> Result<()>;
}

/// `Pending -> Resolving -> Executing -> Done`, or `Failed` from either of the middle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchState {
    Pending,
    Resolving,
    Executing,
    Done,
    Failed,
}
