use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use crate::{
    dalvik::{
        opcodes::{Format, Opcode},
        references::{FieldReference, MethodReference},
    },
    traits::{GenericInstruction, GenericOpcode},
};

pub type Register = u16;

/// A decoded numeric literal. Wide and narrow literals are never compared by their low word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Narrow(i32),
    Wide(i64),
}

impl Literal {
    /// The value as a signed 64-bit integer (narrow values are sign-extended)
    pub fn value(&self) -> i64 {
        match self {
            Literal::Narrow(value) => *value as i64,
            Literal::Wide(value) => *value,
        }
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, Literal::Wide(_))
    }
}

/// One entry of a packed or sparse switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwitchCase {
    pub key: i32,
    pub target: usize,
}

/// The non-register operand of an instruction.
/// Branch and switch targets are instruction indexes into the owning method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    None,
    Literal(Literal),
    String(String),
    Type(String),
    Method(MethodReference),
    Field(FieldReference),
    /// `invoke-polymorphic` carries the call target and the call site prototype
    MethodProto(MethodReference, String),
    CallSite(String),
    MethodHandle(String),
    Proto(String),
    Target(usize),
    Switch(Vec<SwitchCase>),
    ArrayData { element_width: u16, elements: Vec<i64> },
}

/// A single Dalvik instruction. It is addressed only by its position in the owning method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Register operands in encoding order (`vA, vB, ..` or the expanded `{vC .. vN}` list)
    pub registers: Vec<Register>,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(opcode: Opcode, registers: &[Register], operand: Operand) -> Self {
        Instruction {
            opcode,
            registers: registers.to_vec(),
            operand,
        }
    }

    /// An instruction without operands, like `nop` or `return-void`
    pub fn simple(opcode: Opcode) -> Self {
        Instruction::new(opcode, &[], Operand::None)
    }

    pub fn literal_load(opcode: Opcode, register: Register, value: i64) -> Self {
        let literal = if opcode.is_wide_literal() {
            Literal::Wide(value)
        } else {
            Literal::Narrow(value as i32)
        };

        Instruction::new(opcode, &[register], Operand::Literal(literal))
    }

    pub fn const_string(register: Register, value: impl Into<String>) -> Self {
        Instruction::new(
            Opcode::CONST_STRING,
            &[register],
            Operand::String(value.into()),
        )
    }

    pub fn invoke(opcode: Opcode, registers: &[Register], method: MethodReference) -> Self {
        Instruction::new(opcode, registers, Operand::Method(method))
    }

    pub fn branch(opcode: Opcode, registers: &[Register], target: usize) -> Self {
        Instruction::new(opcode, registers, Operand::Target(target))
    }

    /// Width in 16-bit code units, switch and array payloads excluded
    pub fn code_units(&self) -> u16 {
        self.opcode.format().code_units()
    }

    /// The literal this instruction carries, for `const*` loads and arithmetic with an immediate
    pub fn literal(&self) -> Option<Literal> {
        match self.operand {
            Operand::Literal(literal) if self.opcode.carries_literal() => Some(literal),
            _ => None,
        }
    }

    /// The string of a `const-string` or `const-string/jumbo`
    pub fn string(&self) -> Option<&str> {
        match &self.operand {
            Operand::String(value) if self.opcode.is_string_load() => Some(value),
            _ => None,
        }
    }

    pub fn method_reference(&self) -> Option<&MethodReference> {
        match &self.operand {
            Operand::Method(reference) | Operand::MethodProto(reference, _) => Some(reference),
            _ => None,
        }
    }

    pub fn field_reference(&self) -> Option<&FieldReference> {
        match &self.operand {
            Operand::Field(reference) => Some(reference),
            _ => None,
        }
    }

    /// First register (`vA`, or `vC` for invokes)
    pub fn register_a(&self) -> Option<Register> {
        self.registers.first().copied()
    }

    pub fn register(&self, position: usize) -> Option<Register> {
        self.registers.get(position).copied()
    }
}

impl GenericInstruction for Instruction {
    type Opcode = Opcode;

    fn get_opcode(&self) -> Self::Opcode {
        self.opcode
    }

    fn get_targets(&self) -> Vec<usize> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(cases) => cases.iter().map(|case| case.target).collect(),
            _ => vec![],
        }
    }

    fn get_targets_mut(&mut self) -> Vec<&mut usize> {
        match &mut self.operand {
            Operand::Target(target) => vec![target],
            Operand::Switch(cases) => cases.iter_mut().map(|case| &mut case.target).collect(),
            _ => vec![],
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in value.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for Instruction {
    /// Smali-like text. Targets are printed as `:index` since this crate has no label names.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;

        let registers = self
            .registers
            .iter()
            .map(|r| format!("v{r}"))
            .collect::<Vec<_>>();

        let mut parts = match self.opcode.format() {
            Format::Format35c | Format::Format45cc => vec![format!("{{{}}}", registers.join(", "))],
            Format::Format3rc | Format::Format4rcc => match (registers.first(), registers.last()) {
                (Some(first), Some(last)) => vec![format!("{{{first} .. {last}}}")],
                _ => vec!["{}".to_string()],
            },
            _ => registers,
        };

        match &self.operand {
            Operand::None => {}
            Operand::Literal(literal) => parts.push(format!("{:#x}", literal.value())),
            Operand::String(value) => {
                write!(f, " {}", parts.join(", "))?;
                write!(f, ", ")?;
                return write_escaped(f, value);
            }
            Operand::Type(descriptor) => parts.push(descriptor.clone()),
            Operand::Method(reference) => parts.push(reference.to_string()),
            Operand::Field(reference) => parts.push(reference.to_string()),
            Operand::MethodProto(reference, proto) => {
                parts.push(reference.to_string());
                parts.push(proto.clone());
            }
            Operand::CallSite(site) => parts.push(site.clone()),
            Operand::MethodHandle(handle) => parts.push(handle.clone()),
            Operand::Proto(proto) => parts.push(proto.clone()),
            Operand::Target(target) => parts.push(format!(":{target}")),
            Operand::Switch(cases) => parts.push(
                cases
                    .iter()
                    .map(|case| format!("{:#x} -> :{}", case.key, case.target))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Operand::ArrayData { elements, .. } => parts.push(format!("{elements:?}")),
        }

        if !parts.is_empty() {
            write!(f, " {}", parts.join(", "))?;
        }

        Ok(())
    }
}

/// A list of instructions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Instructions(Vec<Instruction>);

impl Instructions {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Instructions(instructions)
    }

    /// The raw vector. Only the editor may change the length, everything else goes through `DerefMut`.
    pub(crate) fn inner_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.0
    }

    /// The opcode sequence, used by the pattern scanner
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.0.iter().map(|instruction| instruction.opcode).collect()
    }
}

impl Deref for Instructions {
    type Target = [Instruction];

    /// Allow the user to get a reference slice to the instructions
    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl DerefMut for Instructions {
    /// Allow the user to get a mutable reference slice for making modifications to existing instructions.
    fn deref_mut(&mut self) -> &mut [Instruction] {
        self.0.deref_mut()
    }
}

impl AsRef<[Instruction]> for Instructions {
    fn as_ref(&self) -> &[Instruction] {
        &self.0
    }
}

impl From<&[Instruction]> for Instructions {
    fn from(value: &[Instruction]) -> Self {
        Instructions::new(value.to_vec())
    }
}

impl From<Vec<Instruction>> for Instructions {
    fn from(value: Vec<Instruction>) -> Self {
        Instructions::new(value)
    }
}

impl FromIterator<Instruction> for Instructions {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Instructions(iter.into_iter().collect())
    }
}
