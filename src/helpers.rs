use log::debug;

use crate::{
    dalvik::{
        code_objects::{Method, ProgramImage},
        editor::Receipt,
        opcodes::Opcode,
    },
    error::{Error, Result},
    locator::InstructionLocator,
    smali::{assemble, RegisterLayout},
    traits::{GenericInstruction, GenericOpcode},
    utils::fill_register_template,
};

/// Replaces every narrow `const*` loading `literal`, anywhere in the program, with `template`.
///
/// `template` is a straight-line smali snippet in which `REGISTER_INDEX` stands for the
/// register the constant was loaded into. The first snippet instruction takes the place of the
/// constant, so branches to the constant now land on the snippet. Returns the number of replaced loads.
pub fn replace_literal_instruction_call(
    program: &mut ProgramImage,
    literal: i64,
    template: &str,
) -> Result<usize> {
    let mut replaced = 0;

    for class in program.classes_mut() {
        for method in class.methods.iter_mut() {
            if method.implementation.is_none() {
                continue;
            }

            let anchors = match method.indices_reversed_where(|instruction| {
                instruction.opcode.is_literal_load()
                    && !instruction.opcode.is_wide_literal()
                    && instruction.literal().map(|l| l.value()) == Some(literal)
            }) {
                Ok(anchors) => anchors,
                Err(Error::InstructionNotFound { .. }) => continue,
                Err(error) => return Err(error),
            };

            let layout = RegisterLayout::of(method)?;

            for anchor in anchors {
                let implementation = method.implementation_mut()?;
                let register = implementation
                    .instruction(&anchor)?
                    .register_a()
                    .ok_or_else(|| Error::Custom(format!("constant at {} has no register", anchor.index())))?;

                let mut block = assemble(&fill_register_template(template, register), layout)?;
                if block.is_empty()
                    || !block.external.is_empty()
                    || block
                        .instructions
                        .iter()
                        .any(|instruction| !instruction.get_targets().is_empty())
                {
                    return Err(Error::Assembly {
                        line: 1,
                        message: "literal replacements must be non-empty and free of branches"
                            .to_string(),
                    });
                }

                let first = block.instructions.remove(0);
                let after = anchor.next();

                implementation.replace_instruction(anchor, first)?;
                implementation.insert_instructions(after, &block.instructions)?;
                replaced += 1;
            }
        }
    }

    debug!("replaced {replaced} loads of literal {literal:#x}");

    Ok(replaced)
}

/// Routes the boolean produced right after `literal` through the static hook `descriptor`,
/// which must have the shape `(Z)Z`.
///
/// Finds the first load of `literal`, then the first `move-result` at or after it, and inserts
/// `invoke-static {vR}, descriptor` and `move-result vR` behind that `move-result`.
pub fn inject_literal_instruction_boolean_call(
    method: &mut Method,
    literal: i64,
    descriptor: &str,
) -> Result<Receipt> {
    let literal_at = method.index_of_first_literal(literal, 0)?;
    let target = method.index_of_first_opcode(literal_at.index(), Opcode::MOVE_RESULT)?;

    let register = method
        .implementation()?
        .instruction(&target)?
        .register_a()
        .ok_or_else(|| Error::Custom(format!("move-result at {} has no register", target.index())))?;

    method.add_instructions(
        target.next(),
        &format!(
            "invoke-static {{v{register}}}, {descriptor}
            move-result v{register}"
        ),
    )
}
