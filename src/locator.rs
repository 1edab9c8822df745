use crate::{
    dalvik::{
        code_objects::{Method, ProgramImage},
        editor::Anchor,
        instructions::Instruction,
        opcodes::Opcode,
        references::MethodReference,
    },
    error::{Error, Result},
    traits::GenericOpcode,
};

/// Secondary scans inside an already resolved method. Every scan returns anchors so the
/// results cannot outlive an edit that moves them.
pub trait InstructionLocator {
    /// First instruction at or after `from` satisfying `predicate`
    fn index_of_first_instruction<P>(&self, from: usize, predicate: P) -> Result<Anchor>
    where
        P: Fn(&Instruction) -> bool;

    /// First instruction at or before `from` satisfying `predicate`, scanning backwards.
    /// `from` past the end starts at the last instruction.
    fn index_of_first_instruction_reversed<P>(&self, from: usize, predicate: P) -> Result<Anchor>
    where
        P: Fn(&Instruction) -> bool;

    /// First instruction at or after `from` carrying `value`, comparing wide literals on all 64 bits
    fn index_of_first_literal(&self, value: i64, from: usize) -> Result<Anchor>;

    /// Every matching instruction, highest index first
    fn indices_reversed_where<P>(&self, predicate: P) -> Result<Vec<Anchor>>
    where
        P: Fn(&Instruction) -> bool;

    /// The method called by the invoke at `at`
    fn callee(&self, at: &Anchor) -> Result<&MethodReference>;

    fn index_of_first_opcode(&self, from: usize, opcode: Opcode) -> Result<Anchor> {
        self.index_of_first_instruction(from, |instruction| instruction.opcode == opcode)
    }

    fn index_of_last_instruction<P>(&self, predicate: P) -> Result<Anchor>
    where
        P: Fn(&Instruction) -> bool,
    {
        self.index_of_first_instruction_reversed(usize::MAX, predicate)
    }
}

impl Method {
    fn not_found(&self, description: String) -> Error {
        Error::InstructionNotFound {
            method: self.to_string(),
            description,
        }
    }
}

impl InstructionLocator for Method {
    fn index_of_first_instruction<P>(&self, from: usize, predicate: P) -> Result<Anchor>
    where
        P: Fn(&Instruction) -> bool,
    {
        let implementation = self.implementation()?;

        implementation
            .instructions()
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, instruction)| predicate(*instruction))
            .map(|(index, _)| implementation.anchor_at(index))
            .ok_or_else(|| self.not_found(format!("predicate, scanning forward from {from}")))
    }

    fn index_of_first_instruction_reversed<P>(&self, from: usize, predicate: P) -> Result<Anchor>
    where
        P: Fn(&Instruction) -> bool,
    {
        let implementation = self.implementation()?;
        let instructions = implementation.instructions();
        let end = from.saturating_add(1).min(instructions.len());

        instructions[..end]
            .iter()
            .rposition(|instruction| predicate(instruction))
            .map(|index| implementation.anchor_at(index))
            .ok_or_else(|| self.not_found(format!("predicate, scanning backward from {from}")))
    }

    fn index_of_first_literal(&self, value: i64, from: usize) -> Result<Anchor> {
        self.index_of_first_instruction(from, |instruction| {
            instruction.literal().map(|literal| literal.value()) == Some(value)
        })
        .map_err(|error| match error {
            Error::InstructionNotFound { .. } => {
                self.not_found(format!("literal {value:#x}, scanning forward from {from}"))
            }
            other => other,
        })
    }

    fn indices_reversed_where<P>(&self, predicate: P) -> Result<Vec<Anchor>>
    where
        P: Fn(&Instruction) -> bool,
    {
        let implementation = self.implementation()?;

        let anchors = implementation
            .instructions()
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, instruction)| predicate(*instruction))
            .map(|(index, _)| implementation.anchor_at(index))
            .collect::<Vec<_>>();

        if anchors.is_empty() {
            return Err(self.not_found("predicate, collecting every match".to_string()));
        }

        Ok(anchors)
    }

    fn callee(&self, at: &Anchor) -> Result<&MethodReference> {
        let implementation = self.implementation()?;
        let index = implementation.index_of(at)?;
        let instruction = implementation.instruction(at)?;

        if !instruction.opcode.is_invoke() {
            return Err(Error::NotAnInvoke {
                index,
                opcode: instruction.opcode.to_string(),
            });
        }

        instruction.method_reference().ok_or_else(|| Error::NotAnInvoke {
            index,
            opcode: instruction.opcode.to_string(),
        })
    }
}

/// Follows the invoke at `at` inside `caller` to the called method, looked up in its declaring class
pub fn walk<'a>(program: &'a ProgramImage, caller: &MethodReference, at: &Anchor) -> Result<&'a Method> {
    let callee = program.method(caller)?.callee(at)?.clone();
    program.method(&callee)
}

pub fn walk_mut<'a>(
    program: &'a mut ProgramImage,
    caller: &MethodReference,
    at: &Anchor,
) -> Result<&'a mut Method> {
    let callee = program.method(caller)?.callee(at)?.clone();
    program.method_mut(&callee)
}
