use crate::{
    dalvik::{instructions::Register, opcodes::{Format, Opcode}},
    smali::REGISTER_TEMPLATE_REPLACEMENT,
};

/// Whether `value` can be encoded as the literal operand of `opcode`
pub fn literal_fits(opcode: Opcode, value: i64) -> bool {
    match (opcode, opcode.format()) {
        (_, Format::Format11n) => (-8..=7).contains(&value),
        (_, Format::Format22b) => i8::try_from(value).is_ok(),
        (_, Format::Format21s | Format::Format22s) => i16::try_from(value).is_ok(),
        (Opcode::CONST_HIGH16, _) => i32::try_from(value).is_ok() && value & 0xffff == 0,
        (Opcode::CONST_WIDE_HIGH16, _) => value & 0xffff_ffff_ffff == 0,
        (_, Format::Format31i) => i32::try_from(value).is_ok(),
        (_, Format::Format51l) => true,
        _ => false,
    }
}

/// The narrowest `const` opcode able to load `value` into a 32-bit register
pub fn narrowest_const(register: Register, value: i32) -> Opcode {
    let value = value as i64;

    if register < 16 && literal_fits(Opcode::CONST_4, value) {
        Opcode::CONST_4
    } else if literal_fits(Opcode::CONST_16, value) {
        Opcode::CONST_16
    } else if literal_fits(Opcode::CONST_HIGH16, value) {
        Opcode::CONST_HIGH16
    } else {
        Opcode::CONST
    }
}

/// Substitutes the register number into a snippet written with [`REGISTER_TEMPLATE_REPLACEMENT`]
pub fn fill_register_template(template: &str, register: Register) -> String {
    template.replace(REGISTER_TEMPLATE_REPLACEMENT, &register.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_fits() {
        assert!(literal_fits(Opcode::CONST_4, -8));
        assert!(!literal_fits(Opcode::CONST_4, 8));
        assert!(literal_fits(Opcode::CONST_16, -32768));
        assert!(!literal_fits(Opcode::CONST_16, 40000));
        assert!(literal_fits(Opcode::CONST_HIGH16, 0x7f01_0000));
        assert!(!literal_fits(Opcode::CONST_HIGH16, 0x7f01_0001));
        assert!(literal_fits(Opcode::CONST_WIDE_HIGH16, 0x4000_0000_0000_0000));
        assert!(!literal_fits(Opcode::CONST, 0x1_0000_0000));
        assert!(literal_fits(Opcode::CONST_WIDE, i64::MIN));
        assert!(literal_fits(Opcode::ADD_INT_LIT8, -128));
        assert!(!literal_fits(Opcode::NOP, 0));
    }

    #[test]
    fn test_narrowest_const() {
        assert_eq!(narrowest_const(0, 1), Opcode::CONST_4);
        assert_eq!(narrowest_const(20, 1), Opcode::CONST_16);
        assert_eq!(narrowest_const(0, 0x7f0a_0000), Opcode::CONST_HIGH16);
        assert_eq!(narrowest_const(0, 0x7f0a_0001), Opcode::CONST);
    }

    #[test]
    fn test_fill_register_template() {
        assert_eq!(
            fill_register_template("move-result vREGISTER_INDEX", 3),
            "move-result v3"
        );
    }
}
