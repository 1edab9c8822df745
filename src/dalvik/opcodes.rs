#![allow(non_camel_case_types)]

use std::fmt;

use crate::traits::GenericOpcode;

/// Dalvik instruction formats. The first digit of the format id is the width in code units.
/// See https://source.android.com/docs/core/runtime/instruction-formats
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Format {
    /// `op`
    Format10x,
    /// `op vA, vB`
    Format12x,
    /// `op vA, #+B`
    Format11n,
    /// `op vAA`
    Format11x,
    /// `op +AA`
    Format10t,
    /// `op +AAAA`
    Format20t,
    /// `op vAA, vBBBB`
    Format22x,
    /// `op vAA, +BBBB`
    Format21t,
    /// `op vAA, #+BBBB`
    Format21s,
    /// `op vAA, #+BBBB0000` / `op vAA, #+BBBB000000000000`
    Format21h,
    /// `op vAA, type@BBBB` / `field@BBBB` / `string@BBBB`
    Format21c,
    /// `op vAA, vBB, vCC`
    Format23x,
    /// `op vAA, vBB, #+CC`
    Format22b,
    /// `op vA, vB, +CCCC`
    Format22t,
    /// `op vA, vB, #+CCCC`
    Format22s,
    /// `op vA, vB, type@CCCC` / `field@CCCC`
    Format22c,
    /// `op +AAAAAAAA`
    Format30t,
    /// `op vAAAA, vBBBB`
    Format32x,
    /// `op vAA, #+BBBBBBBB`
    Format31i,
    /// `op vAA, +BBBBBBBB`
    Format31t,
    /// `op vAA, string@BBBBBBBB`
    Format31c,
    /// `op {vC, vD, vE, vF, vG}, meth@BBBB`
    Format35c,
    /// `op {vCCCC .. vNNNN}, meth@BBBB`
    Format3rc,
    /// `op {vC, vD, vE, vF, vG}, meth@BBBB, proto@HHHH`
    Format45cc,
    /// `op {vCCCC .. vNNNN}, meth@BBBB, proto@HHHH`
    Format4rcc,
    /// `op vAA, #+BBBBBBBBBBBBBBBB`
    Format51l,
}

impl Format {
    /// Width of an instruction of this format in 16-bit code units.
    pub fn code_units(&self) -> u16 {
        match self {
            Format::Format10x
            | Format::Format12x
            | Format::Format11n
            | Format::Format11x
            | Format::Format10t => 1,
            Format::Format20t
            | Format::Format22x
            | Format::Format21t
            | Format::Format21s
            | Format::Format21h
            | Format::Format21c
            | Format::Format23x
            | Format::Format22b
            | Format::Format22t
            | Format::Format22s
            | Format::Format22c => 2,
            Format::Format30t
            | Format::Format32x
            | Format::Format31i
            | Format::Format31t
            | Format::Format31c
            | Format::Format35c
            | Format::Format3rc => 3,
            Format::Format45cc | Format::Format4rcc => 4,
            Format::Format51l => 5,
        }
    }
}

macro_rules! define_opcodes {
    ($($name:ident = $value:literal, $mnemonic:literal, $format:ident;)*) => {
        /// Every Dalvik opcode this crate understands.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($name,)*
        }

        impl Opcode {
            /// All opcodes in numeric order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name,)*];

            pub fn value(&self) -> u8 {
                match self {
                    $(Opcode::$name => $value,)*
                }
            }

            /// The smali mnemonic, e.g. `const/16`.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Opcode::$name => $mnemonic,)*
                }
            }

            pub fn format(&self) -> Format {
                match self {
                    $(Opcode::$name => Format::$format,)*
                }
            }

            pub fn from_name(name: &str) -> Option<Opcode> {
                match name {
                    $($mnemonic => Some(Opcode::$name),)*
                    _ => None,
                }
            }
        }

        impl TryFrom<u8> for Opcode {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Opcode::$name),)*
                    _ => Err(value),
                }
            }
        }
    };
}

define_opcodes!(
    NOP = 0x00, "nop", Format10x;
    MOVE = 0x01, "move", Format12x;
    MOVE_FROM16 = 0x02, "move/from16", Format22x;
    MOVE_16 = 0x03, "move/16", Format32x;
    MOVE_WIDE = 0x04, "move-wide", Format12x;
    MOVE_WIDE_FROM16 = 0x05, "move-wide/from16", Format22x;
    MOVE_WIDE_16 = 0x06, "move-wide/16", Format32x;
    MOVE_OBJECT = 0x07, "move-object", Format12x;
    MOVE_OBJECT_FROM16 = 0x08, "move-object/from16", Format22x;
    MOVE_OBJECT_16 = 0x09, "move-object/16", Format32x;
    MOVE_RESULT = 0x0a, "move-result", Format11x;
    MOVE_RESULT_WIDE = 0x0b, "move-result-wide", Format11x;
    MOVE_RESULT_OBJECT = 0x0c, "move-result-object", Format11x;
    MOVE_EXCEPTION = 0x0d, "move-exception", Format11x;
    RETURN_VOID = 0x0e, "return-void", Format10x;
    RETURN = 0x0f, "return", Format11x;
    RETURN_WIDE = 0x10, "return-wide", Format11x;
    RETURN_OBJECT = 0x11, "return-object", Format11x;
    CONST_4 = 0x12, "const/4", Format11n;
    CONST_16 = 0x13, "const/16", Format21s;
    CONST = 0x14, "const", Format31i;
    CONST_HIGH16 = 0x15, "const/high16", Format21h;
    CONST_WIDE_16 = 0x16, "const-wide/16", Format21s;
    CONST_WIDE_32 = 0x17, "const-wide/32", Format31i;
    CONST_WIDE = 0x18, "const-wide", Format51l;
    CONST_WIDE_HIGH16 = 0x19, "const-wide/high16", Format21h;
    CONST_STRING = 0x1a, "const-string", Format21c;
    CONST_STRING_JUMBO = 0x1b, "const-string/jumbo", Format31c;
    CONST_CLASS = 0x1c, "const-class", Format21c;
    MONITOR_ENTER = 0x1d, "monitor-enter", Format11x;
    MONITOR_EXIT = 0x1e, "monitor-exit", Format11x;
    CHECK_CAST = 0x1f, "check-cast", Format21c;
    INSTANCE_OF = 0x20, "instance-of", Format22c;
    ARRAY_LENGTH = 0x21, "array-length", Format12x;
    NEW_INSTANCE = 0x22, "new-instance", Format21c;
    NEW_ARRAY = 0x23, "new-array", Format22c;
    FILLED_NEW_ARRAY = 0x24, "filled-new-array", Format35c;
    FILLED_NEW_ARRAY_RANGE = 0x25, "filled-new-array/range", Format3rc;
    FILL_ARRAY_DATA = 0x26, "fill-array-data", Format31t;
    THROW = 0x27, "throw", Format11x;
    GOTO = 0x28, "goto", Format10t;
    GOTO_16 = 0x29, "goto/16", Format20t;
    GOTO_32 = 0x2a, "goto/32", Format30t;
    PACKED_SWITCH = 0x2b, "packed-switch", Format31t;
    SPARSE_SWITCH = 0x2c, "sparse-switch", Format31t;
    CMPL_FLOAT = 0x2d, "cmpl-float", Format23x;
    CMPG_FLOAT = 0x2e, "cmpg-float", Format23x;
    CMPL_DOUBLE = 0x2f, "cmpl-double", Format23x;
    CMPG_DOUBLE = 0x30, "cmpg-double", Format23x;
    CMP_LONG = 0x31, "cmp-long", Format23x;
    IF_EQ = 0x32, "if-eq", Format22t;
    IF_NE = 0x33, "if-ne", Format22t;
    IF_LT = 0x34, "if-lt", Format22t;
    IF_GE = 0x35, "if-ge", Format22t;
    IF_GT = 0x36, "if-gt", Format22t;
    IF_LE = 0x37, "if-le", Format22t;
    IF_EQZ = 0x38, "if-eqz", Format21t;
    IF_NEZ = 0x39, "if-nez", Format21t;
    IF_LTZ = 0x3a, "if-ltz", Format21t;
    IF_GEZ = 0x3b, "if-gez", Format21t;
    IF_GTZ = 0x3c, "if-gtz", Format21t;
    IF_LEZ = 0x3d, "if-lez", Format21t;
    AGET = 0x44, "aget", Format23x;
    AGET_WIDE = 0x45, "aget-wide", Format23x;
    AGET_OBJECT = 0x46, "aget-object", Format23x;
    AGET_BOOLEAN = 0x47, "aget-boolean", Format23x;
    AGET_BYTE = 0x48, "aget-byte", Format23x;
    AGET_CHAR = 0x49, "aget-char", Format23x;
    AGET_SHORT = 0x4a, "aget-short", Format23x;
    APUT = 0x4b, "aput", Format23x;
    APUT_WIDE = 0x4c, "aput-wide", Format23x;
    APUT_OBJECT = 0x4d, "aput-object", Format23x;
    APUT_BOOLEAN = 0x4e, "aput-boolean", Format23x;
    APUT_BYTE = 0x4f, "aput-byte", Format23x;
    APUT_CHAR = 0x50, "aput-char", Format23x;
    APUT_SHORT = 0x51, "aput-short", Format23x;
    IGET = 0x52, "iget", Format22c;
    IGET_WIDE = 0x53, "iget-wide", Format22c;
    IGET_OBJECT = 0x54, "iget-object", Format22c;
    IGET_BOOLEAN = 0x55, "iget-boolean", Format22c;
    IGET_BYTE = 0x56, "iget-byte", Format22c;
    IGET_CHAR = 0x57, "iget-char", Format22c;
    IGET_SHORT = 0x58, "iget-short", Format22c;
    IPUT = 0x59, "iput", Format22c;
    IPUT_WIDE = 0x5a, "iput-wide", Format22c;
    IPUT_OBJECT = 0x5b, "iput-object", Format22c;
    IPUT_BOOLEAN = 0x5c, "iput-boolean", Format22c;
    IPUT_BYTE = 0x5d, "iput-byte", Format22c;
    IPUT_CHAR = 0x5e, "iput-char", Format22c;
    IPUT_SHORT = 0x5f, "iput-short", Format22c;
    SGET = 0x60, "sget", Format21c;
    SGET_WIDE = 0x61, "sget-wide", Format21c;
    SGET_OBJECT = 0x62, "sget-object", Format21c;
    SGET_BOOLEAN = 0x63, "sget-boolean", Format21c;
    SGET_BYTE = 0x64, "sget-byte", Format21c;
    SGET_CHAR = 0x65, "sget-char", Format21c;
    SGET_SHORT = 0x66, "sget-short", Format21c;
    SPUT = 0x67, "sput", Format21c;
    SPUT_WIDE = 0x68, "sput-wide", Format21c;
    SPUT_OBJECT = 0x69, "sput-object", Format21c;
    SPUT_BOOLEAN = 0x6a, "sput-boolean", Format21c;
    SPUT_BYTE = 0x6b, "sput-byte", Format21c;
    SPUT_CHAR = 0x6c, "sput-char", Format21c;
    SPUT_SHORT = 0x6d, "sput-short", Format21c;
    INVOKE_VIRTUAL = 0x6e, "invoke-virtual", Format35c;
    INVOKE_SUPER = 0x6f, "invoke-super", Format35c;
    INVOKE_DIRECT = 0x70, "invoke-direct", Format35c;
    INVOKE_STATIC = 0x71, "invoke-static", Format35c;
    INVOKE_INTERFACE = 0x72, "invoke-interface", Format35c;
    INVOKE_VIRTUAL_RANGE = 0x74, "invoke-virtual/range", Format3rc;
    INVOKE_SUPER_RANGE = 0x75, "invoke-super/range", Format3rc;
    INVOKE_DIRECT_RANGE = 0x76, "invoke-direct/range", Format3rc;
    INVOKE_STATIC_RANGE = 0x77, "invoke-static/range", Format3rc;
    INVOKE_INTERFACE_RANGE = 0x78, "invoke-interface/range", Format3rc;
    NEG_INT = 0x7b, "neg-int", Format12x;
    NOT_INT = 0x7c, "not-int", Format12x;
    NEG_LONG = 0x7d, "neg-long", Format12x;
    NOT_LONG = 0x7e, "not-long", Format12x;
    NEG_FLOAT = 0x7f, "neg-float", Format12x;
    NEG_DOUBLE = 0x80, "neg-double", Format12x;
    INT_TO_LONG = 0x81, "int-to-long", Format12x;
    INT_TO_FLOAT = 0x82, "int-to-float", Format12x;
    INT_TO_DOUBLE = 0x83, "int-to-double", Format12x;
    LONG_TO_INT = 0x84, "long-to-int", Format12x;
    LONG_TO_FLOAT = 0x85, "long-to-float", Format12x;
    LONG_TO_DOUBLE = 0x86, "long-to-double", Format12x;
    FLOAT_TO_INT = 0x87, "float-to-int", Format12x;
    FLOAT_TO_LONG = 0x88, "float-to-long", Format12x;
    FLOAT_TO_DOUBLE = 0x89, "float-to-double", Format12x;
    DOUBLE_TO_INT = 0x8a, "double-to-int", Format12x;
    DOUBLE_TO_LONG = 0x8b, "double-to-long", Format12x;
    DOUBLE_TO_FLOAT = 0x8c, "double-to-float", Format12x;
    INT_TO_BYTE = 0x8d, "int-to-byte", Format12x;
    INT_TO_CHAR = 0x8e, "int-to-char", Format12x;
    INT_TO_SHORT = 0x8f, "int-to-short", Format12x;
    ADD_INT = 0x90, "add-int", Format23x;
    SUB_INT = 0x91, "sub-int", Format23x;
    MUL_INT = 0x92, "mul-int", Format23x;
    DIV_INT = 0x93, "div-int", Format23x;
    REM_INT = 0x94, "rem-int", Format23x;
    AND_INT = 0x95, "and-int", Format23x;
    OR_INT = 0x96, "or-int", Format23x;
    XOR_INT = 0x97, "xor-int", Format23x;
    SHL_INT = 0x98, "shl-int", Format23x;
    SHR_INT = 0x99, "shr-int", Format23x;
    USHR_INT = 0x9a, "ushr-int", Format23x;
    ADD_LONG = 0x9b, "add-long", Format23x;
    SUB_LONG = 0x9c, "sub-long", Format23x;
    MUL_LONG = 0x9d, "mul-long", Format23x;
    DIV_LONG = 0x9e, "div-long", Format23x;
    REM_LONG = 0x9f, "rem-long", Format23x;
    AND_LONG = 0xa0, "and-long", Format23x;
    OR_LONG = 0xa1, "or-long", Format23x;
    XOR_LONG = 0xa2, "xor-long", Format23x;
    SHL_LONG = 0xa3, "shl-long", Format23x;
    SHR_LONG = 0xa4, "shr-long", Format23x;
    USHR_LONG = 0xa5, "ushr-long", Format23x;
    ADD_FLOAT = 0xa6, "add-float", Format23x;
    SUB_FLOAT = 0xa7, "sub-float", Format23x;
    MUL_FLOAT = 0xa8, "mul-float", Format23x;
    DIV_FLOAT = 0xa9, "div-float", Format23x;
    REM_FLOAT = 0xaa, "rem-float", Format23x;
    ADD_DOUBLE = 0xab, "add-double", Format23x;
    SUB_DOUBLE = 0xac, "sub-double", Format23x;
    MUL_DOUBLE = 0xad, "mul-double", Format23x;
    DIV_DOUBLE = 0xae, "div-double", Format23x;
    REM_DOUBLE = 0xaf, "rem-double", Format23x;
    ADD_INT_2ADDR = 0xb0, "add-int/2addr", Format12x;
    SUB_INT_2ADDR = 0xb1, "sub-int/2addr", Format12x;
    MUL_INT_2ADDR = 0xb2, "mul-int/2addr", Format12x;
    DIV_INT_2ADDR = 0xb3, "div-int/2addr", Format12x;
    REM_INT_2ADDR = 0xb4, "rem-int/2addr", Format12x;
    AND_INT_2ADDR = 0xb5, "and-int/2addr", Format12x;
    OR_INT_2ADDR = 0xb6, "or-int/2addr", Format12x;
    XOR_INT_2ADDR = 0xb7, "xor-int/2addr", Format12x;
    SHL_INT_2ADDR = 0xb8, "shl-int/2addr", Format12x;
    SHR_INT_2ADDR = 0xb9, "shr-int/2addr", Format12x;
    USHR_INT_2ADDR = 0xba, "ushr-int/2addr", Format12x;
    ADD_LONG_2ADDR = 0xbb, "add-long/2addr", Format12x;
    SUB_LONG_2ADDR = 0xbc, "sub-long/2addr", Format12x;
    MUL_LONG_2ADDR = 0xbd, "mul-long/2addr", Format12x;
    DIV_LONG_2ADDR = 0xbe, "div-long/2addr", Format12x;
    REM_LONG_2ADDR = 0xbf, "rem-long/2addr", Format12x;
    AND_LONG_2ADDR = 0xc0, "and-long/2addr", Format12x;
    OR_LONG_2ADDR = 0xc1, "or-long/2addr", Format12x;
    XOR_LONG_2ADDR = 0xc2, "xor-long/2addr", Format12x;
    SHL_LONG_2ADDR = 0xc3, "shl-long/2addr", Format12x;
    SHR_LONG_2ADDR = 0xc4, "shr-long/2addr", Format12x;
    USHR_LONG_2ADDR = 0xc5, "ushr-long/2addr", Format12x;
    ADD_FLOAT_2ADDR = 0xc6, "add-float/2addr", Format12x;
    SUB_FLOAT_2ADDR = 0xc7, "sub-float/2addr", Format12x;
    MUL_FLOAT_2ADDR = 0xc8, "mul-float/2addr", Format12x;
    DIV_FLOAT_2ADDR = 0xc9, "div-float/2addr", Format12x;
    REM_FLOAT_2ADDR = 0xca, "rem-float/2addr", Format12x;
    ADD_DOUBLE_2ADDR = 0xcb, "add-double/2addr", Format12x;
    SUB_DOUBLE_2ADDR = 0xcc, "sub-double/2addr", Format12x;
    MUL_DOUBLE_2ADDR = 0xcd, "mul-double/2addr", Format12x;
    DIV_DOUBLE_2ADDR = 0xce, "div-double/2addr", Format12x;
    REM_DOUBLE_2ADDR = 0xcf, "rem-double/2addr", Format12x;
    ADD_INT_LIT16 = 0xd0, "add-int/lit16", Format22s;
    RSUB_INT = 0xd1, "rsub-int", Format22s;
    MUL_INT_LIT16 = 0xd2, "mul-int/lit16", Format22s;
    DIV_INT_LIT16 = 0xd3, "div-int/lit16", Format22s;
    REM_INT_LIT16 = 0xd4, "rem-int/lit16", Format22s;
    AND_INT_LIT16 = 0xd5, "and-int/lit16", Format22s;
    OR_INT_LIT16 = 0xd6, "or-int/lit16", Format22s;
    XOR_INT_LIT16 = 0xd7, "xor-int/lit16", Format22s;
    ADD_INT_LIT8 = 0xd8, "add-int/lit8", Format22b;
    RSUB_INT_LIT8 = 0xd9, "rsub-int/lit8", Format22b;
    MUL_INT_LIT8 = 0xda, "mul-int/lit8", Format22b;
    DIV_INT_LIT8 = 0xdb, "div-int/lit8", Format22b;
    REM_INT_LIT8 = 0xdc, "rem-int/lit8", Format22b;
    AND_INT_LIT8 = 0xdd, "and-int/lit8", Format22b;
    OR_INT_LIT8 = 0xde, "or-int/lit8", Format22b;
    XOR_INT_LIT8 = 0xdf, "xor-int/lit8", Format22b;
    SHL_INT_LIT8 = 0xe0, "shl-int/lit8", Format22b;
    SHR_INT_LIT8 = 0xe1, "shr-int/lit8", Format22b;
    USHR_INT_LIT8 = 0xe2, "ushr-int/lit8", Format22b;
    INVOKE_POLYMORPHIC = 0xfa, "invoke-polymorphic", Format45cc;
    INVOKE_POLYMORPHIC_RANGE = 0xfb, "invoke-polymorphic/range", Format4rcc;
    INVOKE_CUSTOM = 0xfc, "invoke-custom", Format35c;
    INVOKE_CUSTOM_RANGE = 0xfd, "invoke-custom/range", Format3rc;
    CONST_METHOD_HANDLE = 0xfe, "const-method-handle", Format21c;
    CONST_METHOD_TYPE = 0xff, "const-method-type", Format21c;
);

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl GenericOpcode for Opcode {
    fn is_branch(&self) -> bool {
        matches!(
            self,
            Opcode::GOTO
                | Opcode::GOTO_16
                | Opcode::GOTO_32
                | Opcode::IF_EQ
                | Opcode::IF_NE
                | Opcode::IF_LT
                | Opcode::IF_GE
                | Opcode::IF_GT
                | Opcode::IF_LE
                | Opcode::IF_EQZ
                | Opcode::IF_NEZ
                | Opcode::IF_LTZ
                | Opcode::IF_GEZ
                | Opcode::IF_GTZ
                | Opcode::IF_LEZ
        )
    }

    fn is_switch(&self) -> bool {
        matches!(self, Opcode::PACKED_SWITCH | Opcode::SPARSE_SWITCH)
    }

    fn is_invoke(&self) -> bool {
        matches!(
            self,
            Opcode::INVOKE_VIRTUAL
                | Opcode::INVOKE_SUPER
                | Opcode::INVOKE_DIRECT
                | Opcode::INVOKE_STATIC
                | Opcode::INVOKE_INTERFACE
                | Opcode::INVOKE_VIRTUAL_RANGE
                | Opcode::INVOKE_SUPER_RANGE
                | Opcode::INVOKE_DIRECT_RANGE
                | Opcode::INVOKE_STATIC_RANGE
                | Opcode::INVOKE_INTERFACE_RANGE
                | Opcode::INVOKE_POLYMORPHIC
                | Opcode::INVOKE_POLYMORPHIC_RANGE
        )
    }

    fn is_literal_load(&self) -> bool {
        matches!(
            self,
            Opcode::CONST_4
                | Opcode::CONST_16
                | Opcode::CONST
                | Opcode::CONST_HIGH16
                | Opcode::CONST_WIDE_16
                | Opcode::CONST_WIDE_32
                | Opcode::CONST_WIDE
                | Opcode::CONST_WIDE_HIGH16
        )
    }

    fn is_wide_literal(&self) -> bool {
        matches!(
            self,
            Opcode::CONST_WIDE_16
                | Opcode::CONST_WIDE_32
                | Opcode::CONST_WIDE
                | Opcode::CONST_WIDE_HIGH16
        )
    }

    fn is_string_load(&self) -> bool {
        matches!(self, Opcode::CONST_STRING | Opcode::CONST_STRING_JUMBO)
    }

    fn is_return(&self) -> bool {
        matches!(
            self,
            Opcode::RETURN_VOID | Opcode::RETURN | Opcode::RETURN_WIDE | Opcode::RETURN_OBJECT
        )
    }

    fn carries_literal(&self) -> bool {
        self.is_literal_load()
            || matches!(self.format(), Format::Format22s | Format::Format22b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_roundtrip_through_table() {
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::try_from(opcode.value()), Ok(*opcode));
            assert_eq!(Opcode::from_name(opcode.name()), Some(*opcode));
        }
    }

    #[test]
    fn test_unused_values_are_rejected() {
        assert_eq!(Opcode::try_from(0x3e), Err(0x3e));
        assert_eq!(Opcode::try_from(0x73), Err(0x73));
    }

    #[test]
    fn test_widths() {
        assert_eq!(Opcode::CONST_4.format().code_units(), 1);
        assert_eq!(Opcode::CONST_16.format().code_units(), 2);
        assert_eq!(Opcode::INVOKE_VIRTUAL.format().code_units(), 3);
        assert_eq!(Opcode::CONST_WIDE.format().code_units(), 5);
    }

    #[test]
    fn test_classes() {
        assert!(Opcode::IF_EQZ.is_branch());
        assert!(!Opcode::PACKED_SWITCH.is_branch());
        assert!(Opcode::PACKED_SWITCH.is_switch());
        assert!(Opcode::INVOKE_STATIC_RANGE.is_invoke());
        assert!(!Opcode::INVOKE_CUSTOM.is_invoke());
        assert!(Opcode::CONST_WIDE_HIGH16.is_wide_literal());
        assert!(Opcode::ADD_INT_LIT8.carries_literal());
        assert!(!Opcode::ADD_INT_LIT8.is_literal_load());
    }
}
