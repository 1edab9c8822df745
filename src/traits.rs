use std::collections::BTreeMap;

/// Opcode classes every instruction set has to describe so the scanners and the editor can work generically
pub trait GenericOpcode {
    /// `goto` and `if-*` style instructions with a single target
    fn is_branch(&self) -> bool;
    /// Instructions with a table of targets
    fn is_switch(&self) -> bool;
    /// Calls with a method reference
    fn is_invoke(&self) -> bool;
    /// `const*` loads of a numeric literal
    fn is_literal_load(&self) -> bool;
    fn is_wide_literal(&self) -> bool;
    fn is_string_load(&self) -> bool;
    fn is_return(&self) -> bool;
    /// Every instruction with a literal operand, including arithmetic with an immediate
    fn carries_literal(&self) -> bool;
}

/// Generic instruction functions used by the scanners
pub trait GenericInstruction {
    type Opcode: GenericOpcode;

    fn get_opcode(&self) -> Self::Opcode;

    /// Instruction indexes this instruction can transfer control to
    fn get_targets(&self) -> Vec<usize>;

    /// Mutable access to every target slot, in the same order as `get_targets`
    fn get_targets_mut(&mut self) -> Vec<&mut usize>;

    fn is_branch(&self) -> bool {
        self.get_opcode().is_branch()
    }

    fn is_switch(&self) -> bool {
        self.get_opcode().is_switch()
    }

    fn is_invoke(&self) -> bool {
        self.get_opcode().is_invoke()
    }
}

/// Read access to the control flow references inside a list of instructions
pub trait InstructionAccess
where
    Self: AsRef<[Self::Instruction]>,
{
    type Instruction: GenericInstruction;

    fn get_instructions(&self) -> &[Self::Instruction] {
        self.as_ref()
    }

    /// Returns the targets of the instruction at `index`. Empty if the index is out of bounds or not a jump.
    fn get_jump_targets(&self, index: usize) -> Vec<usize> {
        self.as_ref()
            .get(index)
            .map(|instruction| instruction.get_targets())
            .unwrap_or_default()
    }

    /// Returns a list of all indexes that jump to the given index
    fn get_jump_xrefs(&self, index: usize) -> Vec<usize> {
        self.as_ref()
            .iter()
            .enumerate()
            .filter(|(_, instruction)| instruction.get_targets().contains(&index))
            .map(|(from, _)| from)
            .collect()
    }

    /// Returns a map of jump instruction indexes and their targets
    fn get_jump_map(&self) -> BTreeMap<usize, Vec<usize>> {
        self.as_ref()
            .iter()
            .enumerate()
            .filter_map(|(index, instruction)| {
                let targets = instruction.get_targets();
                (!targets.is_empty()).then_some((index, targets))
            })
            .collect()
    }
}

impl<I: GenericInstruction> InstructionAccess for [I] {
    type Instruction = I;
}
