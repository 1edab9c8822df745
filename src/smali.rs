//! A small assembler for the smali snippets patches insert.
//!
//! Supported: `vN`/`pN` registers, `:label` definitions and references, `#` comments,
//! method/field/type references, string literals and decimal or hex integer literals.
//! Labels not defined in the snippet become [`LabelRef`]s bound at insertion time.
//! Directives and payload instructions (`packed-switch`, `sparse-switch`, `fill-array-data`) are rejected.

use indexmap::IndexMap;

use crate::{
    dalvik::{
        code_objects::Method,
        editor::{Block, LabelRef},
        instructions::{Instruction, Literal, Operand, Register},
        opcodes::{Format, Opcode},
        references::is_type_descriptor,
    },
    error::{Error, Result},
    traits::{GenericInstruction, GenericOpcode},
    utils::literal_fits,
};

/// Placeholder for a register number in snippet templates, see [`crate::utils::fill_register_template`]
pub const REGISTER_TEMPLATE_REPLACEMENT: &str = "REGISTER_INDEX";

/// Register frame of the method a snippet is assembled for. `pN` maps to `v(registers_count - parameter_registers + N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    pub registers_count: u16,
    pub parameter_registers: u16,
}

impl RegisterLayout {
    pub fn of(method: &Method) -> Result<Self> {
        Ok(RegisterLayout {
            registers_count: method.implementation()?.registers_count,
            parameter_registers: method.parameter_registers(),
        })
    }
}

fn error(line: usize, message: impl Into<String>) -> Error {
    Error::Assembly {
        line,
        message: message.into(),
    }
}

/// Splits on top-level commas, keeping quoted strings and `{..}` lists together
fn split_operands(text: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut start = 0;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }

    let last = text[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }

    parts
}

fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;

    for (index, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }

    line
}

fn parse_string(token: &str, line: usize) -> Result<String> {
    let inner = token
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|_| token.len() >= 2)
        .ok_or_else(|| error(line, format!("expected a string literal, got `{token}`")))?;

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some('b') => value.push('\u{8}'),
            Some('f') => value.push('\u{c}'),
            Some(c @ ('"' | '\'' | '\\')) => value.push(c),
            Some('u') => {
                let code = chars.by_ref().take(4).collect::<String>();
                let decoded = u32::from_str_radix(&code, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| error(line, format!("bad unicode escape `\\u{code}`")))?;
                value.push(decoded);
            }
            other => {
                return Err(error(line, format!("bad escape `\\{}`", other.unwrap_or(' '))));
            }
        }
    }

    Ok(value)
}

/// Decimal or hex integer, with smali's optional `L`, `t` and `s` width suffixes
fn parse_literal(token: &str, line: usize) -> Result<i64> {
    let unsuffixed = token.trim_end_matches(['L', 'l', 't', 's', 'S', 'T']);
    let (negative, digits) = match unsuffixed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, unsuffixed),
    };

    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse::<u64>(),
    }
    .map_err(|_| error(line, format!("expected an integer literal, got `{token}`")))?;

    // Hex literals may spell out the two's complement bit pattern
    let value = magnitude as i64;
    Ok(if negative { value.wrapping_neg() } else { value })
}

impl RegisterLayout {
    fn register(&self, token: &str, line: usize) -> Result<Register> {
        let bad = || error(line, format!("expected a register, got `{token}`"));

        if let Some(number) = token.strip_prefix('v') {
            return number.parse::<Register>().map_err(|_| bad());
        }

        let number = token
            .strip_prefix('p')
            .ok_or_else(bad)?
            .parse::<Register>()
            .map_err(|_| bad())?;

        if number >= self.parameter_registers {
            return Err(error(
                line,
                format!(
                    "`{token}` is out of range, the method has {} parameter registers",
                    self.parameter_registers
                ),
            ));
        }

        let first_parameter = self
            .registers_count
            .checked_sub(self.parameter_registers)
            .ok_or_else(|| {
                error(
                    line,
                    format!(
                        "the method declares {} registers but its parameters need {}",
                        self.registers_count, self.parameter_registers
                    ),
                )
            })?;

        Ok(first_parameter + number)
    }

    /// `{v0, v1}`, `{ }` or a range `{v0 .. v3}`
    fn register_list(&self, token: &str, line: usize) -> Result<Vec<Register>> {
        let inner = token
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| error(line, format!("expected a register list, got `{token}`")))?
            .trim();

        if inner.is_empty() {
            return Ok(vec![]);
        }

        if let Some((first, last)) = inner.split_once("..") {
            let first = self.register(first.trim(), line)?;
            let last = self.register(last.trim(), line)?;

            if last < first {
                return Err(error(line, format!("register range `{token}` is reversed")));
            }

            return Ok((first..=last).collect());
        }

        inner
            .split(',')
            .map(|register| self.register(register.trim(), line))
            .collect()
    }
}

/// Range formats encode a first register and a count
fn is_contiguous(registers: &[Register]) -> bool {
    registers
        .windows(2)
        .all(|pair| pair[0].checked_add(1) == Some(pair[1]))
}

fn label_name(token: &str, line: usize) -> Result<String> {
    token
        .strip_prefix(':')
        .filter(|name| {
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
        .map(str::to_string)
        .ok_or_else(|| error(line, format!("expected a label, got `{token}`")))
}

fn reference(opcode: Opcode, token: &str, line: usize) -> Result<Operand> {
    let descriptor_error = |e: Error| error(line, e.to_string());

    Ok(match opcode {
        Opcode::CONST_STRING | Opcode::CONST_STRING_JUMBO => Operand::String(parse_string(token, line)?),
        Opcode::CONST_CLASS
        | Opcode::CHECK_CAST
        | Opcode::NEW_INSTANCE
        | Opcode::INSTANCE_OF
        | Opcode::NEW_ARRAY
        | Opcode::FILLED_NEW_ARRAY
        | Opcode::FILLED_NEW_ARRAY_RANGE => {
            if !is_type_descriptor(token) {
                return Err(error(line, format!("malformed type `{token}`")));
            }
            Operand::Type(token.to_string())
        }
        Opcode::CONST_METHOD_HANDLE => Operand::MethodHandle(token.to_string()),
        Opcode::CONST_METHOD_TYPE => Operand::Proto(token.to_string()),
        Opcode::INVOKE_CUSTOM | Opcode::INVOKE_CUSTOM_RANGE => Operand::CallSite(token.to_string()),
        opcode if opcode.is_invoke() => Operand::Method(token.parse().map_err(descriptor_error)?),
        _ => Operand::Field(token.parse().map_err(descriptor_error)?),
    })
}

/// Largest register number each register position of `format` can encode
fn register_limits(format: Format) -> &'static [u16] {
    const NIBBLE: u16 = 0xf;
    const BYTE: u16 = 0xff;
    const WORD: u16 = 0xffff;

    match format {
        Format::Format12x | Format::Format22t | Format::Format22s | Format::Format22c => &[NIBBLE, NIBBLE],
        Format::Format11n => &[NIBBLE],
        Format::Format11x | Format::Format21t | Format::Format21s | Format::Format21h => &[BYTE],
        Format::Format21c | Format::Format31i | Format::Format31c | Format::Format51l => &[BYTE],
        Format::Format23x => &[BYTE, BYTE, BYTE],
        Format::Format22b => &[BYTE, BYTE],
        Format::Format22x => &[BYTE, WORD],
        Format::Format32x => &[WORD, WORD],
        Format::Format35c | Format::Format45cc => &[NIBBLE; 5],
        _ => &[],
    }
}

/// A label operand pending resolution
struct PendingLabel {
    position: usize,
    label: String,
    line: usize,
}

struct Assembler {
    layout: RegisterLayout,
    instructions: Vec<Instruction>,
    definitions: IndexMap<String, usize>,
    labels: Vec<PendingLabel>,
}

impl Assembler {
    fn expect_operands(
        &self,
        operands: &[&str],
        count: usize,
        opcode: Opcode,
        line: usize,
    ) -> Result<()> {
        if operands.len() != count {
            return Err(error(
                line,
                format!("`{opcode}` takes {count} operands, got {}", operands.len()),
            ));
        }
        Ok(())
    }

    fn literal(&self, opcode: Opcode, token: &str, line: usize) -> Result<Literal> {
        let mut value = parse_literal(token, line)?;

        if !opcode.is_wide_literal() && (0x8000_0000..=0xffff_ffff).contains(&value) {
            value = value as u32 as i32 as i64;
        }

        if !literal_fits(opcode, value) {
            return Err(error(
                line,
                format!("literal {token} does not fit in `{opcode}`"),
            ));
        }

        Ok(if opcode.is_wide_literal() {
            Literal::Wide(value)
        } else {
            Literal::Narrow(value as i32)
        })
    }

    fn target(&mut self, token: &str, line: usize) -> Result<Operand> {
        let label = label_name(token, line)?;
        self.labels.push(PendingLabel {
            position: self.instructions.len(),
            label,
            line,
        });

        // Filled in once every label of the block is known
        Ok(Operand::Target(0))
    }

    fn instruction(&mut self, opcode: Opcode, operands: &[&str], line: usize) -> Result<Instruction> {
        let layout = self.layout;
        let register = |token: &str| layout.register(token, line);

        let (registers, operand) = match opcode.format() {
            Format::Format10x => {
                self.expect_operands(operands, 0, opcode, line)?;
                (vec![], Operand::None)
            }
            Format::Format12x | Format::Format22x | Format::Format32x => {
                self.expect_operands(operands, 2, opcode, line)?;
                (vec![register(operands[0])?, register(operands[1])?], Operand::None)
            }
            Format::Format11x => {
                self.expect_operands(operands, 1, opcode, line)?;
                (vec![register(operands[0])?], Operand::None)
            }
            Format::Format11n
            | Format::Format21s
            | Format::Format21h
            | Format::Format31i
            | Format::Format51l => {
                self.expect_operands(operands, 2, opcode, line)?;
                (
                    vec![register(operands[0])?],
                    Operand::Literal(self.literal(opcode, operands[1], line)?),
                )
            }
            Format::Format10t | Format::Format20t | Format::Format30t => {
                self.expect_operands(operands, 1, opcode, line)?;
                (vec![], self.target(operands[0], line)?)
            }
            Format::Format21t => {
                self.expect_operands(operands, 2, opcode, line)?;
                (vec![register(operands[0])?], self.target(operands[1], line)?)
            }
            Format::Format22t => {
                self.expect_operands(operands, 3, opcode, line)?;
                (
                    vec![register(operands[0])?, register(operands[1])?],
                    self.target(operands[2], line)?,
                )
            }
            Format::Format21c | Format::Format31c => {
                self.expect_operands(operands, 2, opcode, line)?;
                (
                    vec![register(operands[0])?],
                    reference(opcode, operands[1], line)?,
                )
            }
            Format::Format22c => {
                self.expect_operands(operands, 3, opcode, line)?;
                (
                    vec![register(operands[0])?, register(operands[1])?],
                    reference(opcode, operands[2], line)?,
                )
            }
            Format::Format23x => {
                self.expect_operands(operands, 3, opcode, line)?;
                (
                    vec![
                        register(operands[0])?,
                        register(operands[1])?,
                        register(operands[2])?,
                    ],
                    Operand::None,
                )
            }
            Format::Format22b | Format::Format22s => {
                self.expect_operands(operands, 3, opcode, line)?;
                (
                    vec![register(operands[0])?, register(operands[1])?],
                    Operand::Literal(self.literal(opcode, operands[2], line)?),
                )
            }
            Format::Format35c | Format::Format3rc => {
                self.expect_operands(operands, 2, opcode, line)?;
                let registers = layout.register_list(operands[0], line)?;
                let is_range = operands[0].contains("..");

                if opcode.format() == Format::Format35c && (is_range || registers.len() > 5) {
                    return Err(error(line, format!("`{opcode}` takes at most 5 listed registers")));
                }
                if opcode.format() == Format::Format3rc && !is_contiguous(&registers) {
                    return Err(error(line, format!("`{opcode}` needs consecutive registers")));
                }

                (registers, reference(opcode, operands[1], line)?)
            }
            Format::Format45cc | Format::Format4rcc => {
                self.expect_operands(operands, 3, opcode, line)?;
                let reference = operands[1]
                    .parse()
                    .map_err(|e: Error| error(line, e.to_string()))?;

                let registers = layout.register_list(operands[0], line)?;

                if opcode.format() == Format::Format4rcc && !is_contiguous(&registers) {
                    return Err(error(line, format!("`{opcode}` needs consecutive registers")));
                }

                (registers, Operand::MethodProto(reference, operands[2].to_string()))
            }
            Format::Format31t => {
                return Err(error(
                    line,
                    format!("`{opcode}` needs a payload, which snippets cannot define"),
                ))
            }
        };

        if let Some((register, limit)) = registers
            .iter()
            .zip(register_limits(opcode.format()))
            .find(|(register, limit)| register > limit)
        {
            return Err(error(
                line,
                format!("v{register} does not fit in `{opcode}` (at most v{limit})"),
            ));
        }

        Ok(Instruction {
            opcode,
            registers,
            operand,
        })
    }

    fn line(&mut self, text: &str, line: usize) -> Result<()> {
        let text = strip_comment(text).trim();

        if text.is_empty() {
            return Ok(());
        }

        if text.starts_with(':') {
            let label = label_name(text, line)?;
            if self.definitions.contains_key(&label) {
                return Err(error(line, format!("label `{label}` is defined twice")));
            }
            self.definitions.insert(label, self.instructions.len());
            return Ok(());
        }

        if text.starts_with('.') {
            return Err(error(line, format!("directives are not supported: `{text}`")));
        }

        let (mnemonic, rest) = text
            .split_once(char::is_whitespace)
            .unwrap_or((text, ""));

        let opcode = Opcode::from_name(mnemonic)
            .ok_or_else(|| error(line, format!("unknown instruction `{mnemonic}`")))?;

        let operands = split_operands(rest);
        let instruction = self.instruction(opcode, &operands, line)?;
        self.instructions.push(instruction);

        Ok(())
    }

    fn finish(mut self) -> Result<Block> {
        let count = self.instructions.len();
        let mut external = vec![];

        for pending in self.labels {
            let instruction = &mut self.instructions[pending.position];

            match self.definitions.get(&pending.label) {
                Some(&target) if target >= count => {
                    return Err(error(
                        pending.line,
                        format!("label `{}` is not followed by an instruction", pending.label),
                    ))
                }
                Some(&target) => {
                    if let Some(slot) = instruction.get_targets_mut().into_iter().next() {
                        *slot = target;
                    }
                }
                None => external.push(LabelRef {
                    position: pending.position,
                    slot: 0,
                    label: pending.label,
                }),
            }
        }

        Ok(Block {
            instructions: self.instructions,
            external,
        })
    }
}

/// Assembles newline separated smali into a block with block-relative targets
pub fn assemble(text: &str, layout: RegisterLayout) -> Result<Block> {
    let mut assembler = Assembler {
        layout,
        instructions: vec![],
        definitions: IndexMap::new(),
        labels: vec![],
    };

    for (number, line) in text.lines().enumerate() {
        assembler.line(line, number + 1)?;
    }

    assembler.finish()
}

/// Assembles exactly one instruction without labels
pub fn assemble_instruction(text: &str, layout: RegisterLayout) -> Result<Instruction> {
    let mut block = assemble(text, layout)?;

    if block.instructions.len() != 1
        || !block.external.is_empty()
        || !block.instructions[0].get_targets().is_empty()
    {
        return Err(error(1, "expected a single instruction without labels"));
    }

    Ok(block.instructions.remove(0))
}
