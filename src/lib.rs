//! Fingerprint Dalvik methods by shape and rewrite their bodies without leaving branches,
//! switch tables or try ranges pointing at the wrong instruction.

pub mod dalvik;
pub mod error;
pub mod fingerprint;
pub mod helpers;
pub mod locator;
pub mod patch;
pub mod resolver;
pub mod smali;
pub mod traits;
pub mod utils;

pub use error::{Error, Result};

pub mod prelude {
    pub use crate::dalvik::{
        code_objects::{
            AccessFlags, ClassDef, Field, Handler, Method, MethodImplementation, ProgramImage,
            TryBlock,
        },
        editor::{Anchor, Block, ExternalLabel, Receipt},
        instructions::{Instruction, Instructions, Literal, Operand, Register, SwitchCase},
        opcodes::{Format, Opcode},
        references::{FieldReference, MethodReference},
    };
    pub use crate::error::{Error, Result};
    pub use crate::fingerprint::{Fingerprint, MatchResult, PatternOpcode};
    pub use crate::helpers::{inject_literal_instruction_boolean_call, replace_literal_instruction_call};
    pub use crate::locator::{walk, walk_mut, InstructionLocator};
    pub use crate::patch::{
        run, Patch, PatchContext, PatchState, Patcher, PatcherOptions, RunResult, SharedRegistry,
    };
    pub use crate::resolver::{resolve, resolve_exactly_one, resolve_relative, Scope};
    pub use crate::smali::{assemble, RegisterLayout, REGISTER_TEMPLATE_REPLACEMENT};
    pub use crate::traits::{GenericInstruction, GenericOpcode, InstructionAccess};
}
