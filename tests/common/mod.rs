#![allow(dead_code)]

use dexpatch::prelude::*;
use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

pub const TOOLBAR: &str = "Lcom/app/Toolbar;";
pub const HEADER_ID: i64 = 0x7f08_0123;
pub const WIDE_FORTY: i64 = 0x1_0000_0028;

pub fn setup() {
    LOGGER_INIT.call_once(|| {
        env_logger::init();
    });
}

pub fn set_visibility() -> MethodReference {
    MethodReference::new("Landroid/view/View;", "setVisibility", &["I"], "V")
}

pub fn header_reference() -> MethodReference {
    MethodReference::new(TOOLBAR, "header", &["I"], "Z")
}

pub fn setup_reference() -> MethodReference {
    MethodReference::new(TOOLBAR, "setup", &["Landroid/view/View;"], "V")
}

/// `setup(View)` with 4 registers, so `p0` is `v2` and `p1` is `v3`:
///
/// ```text
/// 0  const/16 v0, 40
/// 1  move v1, v0
/// 2  invoke-virtual {p1, v1}, Landroid/view/View;->setVisibility(I)V
/// 3  const v0, HEADER_ID
/// 4  invoke-direct {p0, v0}, Lcom/app/Toolbar;->header(I)Z
/// 5  move-result v0
/// 6  if-eqz v0, 8
/// 7  const-string v1, "toolbar_ready"
/// 8  return-void
/// ```
pub fn setup_method() -> Method {
    Method::new(
        TOOLBAR,
        "setup",
        AccessFlags::PUBLIC | AccessFlags::FINAL,
        &["Landroid/view/View;"],
        "V",
    )
    .with_implementation(MethodImplementation::new(
        4,
        vec![
            Instruction::literal_load(Opcode::CONST_16, 0, 40),
            Instruction::new(Opcode::MOVE, &[1, 0], Operand::None),
            Instruction::invoke(Opcode::INVOKE_VIRTUAL, &[3, 1], set_visibility()),
            Instruction::literal_load(Opcode::CONST, 0, HEADER_ID),
            Instruction::invoke(Opcode::INVOKE_DIRECT, &[2, 0], header_reference()),
            Instruction::new(Opcode::MOVE_RESULT, &[0], Operand::None),
            Instruction::branch(Opcode::IF_EQZ, &[0], 8),
            Instruction::const_string(1, "toolbar_ready"),
            Instruction::simple(Opcode::RETURN_VOID),
        ],
    ))
}

pub fn header_method() -> Method {
    Method::new(TOOLBAR, "header", AccessFlags::PRIVATE, &["I"], "Z").with_implementation(
        MethodImplementation::new(
            3,
            vec![
                Instruction::literal_load(Opcode::CONST_4, 0, 1),
                Instruction::new(Opcode::RETURN, &[0], Operand::None),
            ],
        ),
    )
}

/// A constructor whose only literal is wide and shares its low word with `40`
pub fn constructor() -> Method {
    Method::new(TOOLBAR, "<init>", AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR, &[], "V")
        .with_implementation(MethodImplementation::new(
            3,
            vec![
                Instruction::literal_load(Opcode::CONST_WIDE, 0, WIDE_FORTY),
                Instruction::simple(Opcode::RETURN_VOID),
            ],
        ))
}

/// A second class with a constructor and a `setup(View)` of its own, so whole-program
/// resolution of either is ambiguous
pub fn other_class() -> ClassDef {
    ClassDef::new("Lcom/app/Other;", AccessFlags::PUBLIC)
        .with_super_class("Ljava/lang/Object;")
        .with_method(
            Method::new("", "<init>", AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR, &[], "V")
                .with_implementation(MethodImplementation::new(
                    1,
                    vec![Instruction::simple(Opcode::RETURN_VOID)],
                )),
        )
        .with_method(
            Method::new(
                "",
                "setup",
                AccessFlags::PUBLIC | AccessFlags::FINAL,
                &["Landroid/view/View;"],
                "V",
            )
            .with_implementation(MethodImplementation::new(
                2,
                vec![Instruction::simple(Opcode::RETURN_VOID)],
            )),
        )
}

pub fn program() -> ProgramImage {
    [
        ClassDef::new(TOOLBAR, AccessFlags::PUBLIC | AccessFlags::FINAL)
            .with_super_class("Ljava/lang/Object;")
            .with_method(constructor())
            .with_method(setup_method())
            .with_method(header_method()),
        other_class(),
    ]
    .into_iter()
    .collect()
}

pub fn opcodes(method: &Method) -> Vec<Opcode> {
    method.instructions().iter().map(|instruction| instruction.opcode).collect()
}
