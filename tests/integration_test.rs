use dexpatch::{fingerprint::scan_pattern, prelude::*};
use pretty_assertions::assert_eq;
use std::{cell::RefCell, rc::Rc};

use crate::common::{HEADER_ID, TOOLBAR, WIDE_FORTY};

mod common;

fn visibility_fingerprint() -> Fingerprint {
    Fingerprint::new("visibility")
        .opcodes([
            Some(Opcode::CONST_16),
            None,
            Some(Opcode::INVOKE_VIRTUAL),
        ])
        .literals(&[40])
}

#[test]
fn test_skeleton_with_literal_resolves_once() {
    common::setup();
    let program = common::program();

    let first = resolve_exactly_one(&visibility_fingerprint(), &program, &Scope::Program).unwrap();
    let second = resolve_exactly_one(&visibility_fingerprint(), &program, &Scope::Program).unwrap();

    assert_eq!(first.method, common::setup_reference());
    assert_eq!(first.class, TOOLBAR);
    assert_eq!(first.pattern.map(|range| (range.start, range.end)), Some((0, 2)));
    assert_eq!(first, second);

    let method = first.method(&program).unwrap();
    let end = first.pattern_end().unwrap();
    assert_eq!(method.callee(&end).unwrap(), &common::set_visibility());
}

#[test]
fn test_exact_skeleton_is_substring_search() {
    let program = common::program();
    let method = program.method(&common::setup_reference()).unwrap();
    let opcodes = common::opcodes(method);

    let patterns = [
        vec![Opcode::CONST_16, Opcode::MOVE],
        vec![Opcode::MOVE_RESULT, Opcode::IF_EQZ, Opcode::CONST_STRING],
        vec![Opcode::RETURN_VOID],
        vec![Opcode::INVOKE_VIRTUAL, Opcode::INVOKE_DIRECT],
        opcodes.clone(),
    ];

    for pattern in patterns {
        let expected = opcodes
            .windows(pattern.len())
            .position(|window| window == pattern.as_slice());
        let slots = pattern.iter().copied().map(PatternOpcode::from).collect::<Vec<_>>();

        assert_eq!(
            scan_pattern(&opcodes, &slots, 0).map(|range| range.start),
            expected,
            "{pattern:?}"
        );
    }
}

#[test]
fn test_fuzzy_threshold_tolerates_mismatches() {
    let program = common::program();
    let fingerprint = |threshold| {
        Fingerprint::new("fuzzy")
            .opcodes([Opcode::CONST_16, Opcode::MOVE_OBJECT, Opcode::INVOKE_VIRTUAL])
            .fuzzy_threshold(threshold)
    };

    assert!(resolve(&fingerprint(0), &program, &Scope::Program).is_empty());

    let result = resolve_exactly_one(&fingerprint(1), &program, &Scope::Program).unwrap();
    assert_eq!(result.pattern.map(|range| range.start), Some(0));
}

#[test]
fn test_wide_and_narrow_literals_are_distinct() {
    let program = common::program();

    let wide = Fingerprint::new("wide").literals(&[WIDE_FORTY]);
    let result = resolve_exactly_one(&wide, &program, &Scope::Program).unwrap();
    assert_eq!(result.method.name, "<init>");
    assert_eq!(result.class, TOOLBAR);

    // The constructor's wide load shares its low word with 40 and must not match
    let narrow = Fingerprint::new("narrow").literals(&[0x28]);
    let result = resolve_exactly_one(&narrow, &program, &Scope::Program).unwrap();
    assert_eq!(result.method.name, "setup");
}

#[test]
fn test_relative_resolution_narrows_to_parent_class() {
    let program = common::program();
    let constructor = Fingerprint::new("constructor")
        .access_flags(AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR)
        .returns("V")
        .parameters(&[]);

    assert_eq!(
        resolve_exactly_one(&constructor, &program, &Scope::Program),
        Err(Error::Resolution {
            fingerprint: "constructor".to_string(),
            count: 2,
        })
    );

    let parent = resolve_exactly_one(&visibility_fingerprint(), &program, &Scope::Program).unwrap();
    let result = resolve_relative(&constructor, &program, &parent).unwrap();
    assert_eq!(result.method.defining_class, TOOLBAR);
    assert!(result.pattern.is_none());
}

#[test]
fn test_walk_follows_invokes() {
    let program = common::program();
    let reference = common::setup_reference();
    let method = program.method(&reference).unwrap();

    let call = method.index_of_first_opcode(0, Opcode::INVOKE_DIRECT).unwrap();
    let header = walk(&program, &reference, &call).unwrap();
    assert_eq!(header.reference(), common::header_reference());

    let not_a_call = method.index_of_first_opcode(0, Opcode::MOVE).unwrap();
    assert!(matches!(
        walk(&program, &reference, &not_a_call),
        Err(Error::NotAnInvoke { index: 1, .. })
    ));

    // The framework class is not part of the image
    let framework = method.index_of_first_opcode(0, Opcode::INVOKE_VIRTUAL).unwrap();
    assert_eq!(
        walk(&program, &reference, &framework).map(|method| method.name.clone()),
        Err(Error::ClassNotFound("Landroid/view/View;".to_string()))
    );
}

#[test]
fn test_insert_then_remove_round_trip() {
    let mut method = common::setup_method();
    let original = method.instructions().to_vec();

    let receipt = method
        .add_instructions(
            method.anchor_at(3).unwrap(),
            "
            nop
            if-eqz v0, :after
            const/4 v0, 0x0
            :after
            nop
            ",
        )
        .unwrap();
    assert_eq!((receipt.start(), receipt.end()), (3, 7));
    assert_eq!(method.instructions()[4].get_targets(), vec![6]);
    assert_eq!(method.instructions()[10].get_targets(), vec![12]);

    let count = receipt.end() - receipt.start();
    method.remove_instructions(receipt.anchor(), count).unwrap();

    assert_eq!(method.instructions(), original.as_slice());
}

#[test]
fn test_insert_shifts_targets_at_or_after_insertion_point() {
    let body = || {
        MethodImplementation::new(
            2,
            vec![
                Instruction::branch(Opcode::GOTO, &[], 5),
                Instruction::branch(Opcode::IF_EQZ, &[0], 0),
                Instruction::branch(Opcode::IF_NEZ, &[0], 3),
                Instruction::new(
                    Opcode::PACKED_SWITCH,
                    &[0],
                    Operand::Switch(vec![
                        SwitchCase { key: 0, target: 2 },
                        SwitchCase { key: 1, target: 4 },
                    ]),
                ),
                Instruction::simple(Opcode::NOP),
                Instruction::simple(Opcode::RETURN_VOID),
            ],
        )
        .with_try_blocks(vec![TryBlock {
            start: 1,
            end: 3,
            handlers: vec![Handler {
                exception_type: None,
                target: 4,
            }],
        }])
    };
    let block = [Instruction::simple(Opcode::NOP), Instruction::simple(Opcode::NOP)];
    let shift = |index: usize, at: usize| if index >= at { index + block.len() } else { index };

    let before = body();
    for at in 0..=before.len() {
        let mut after = body();
        after.insert_instructions(after.anchor_at(at), &block).unwrap();

        for (position, instruction) in before.instructions().iter().enumerate() {
            let expected = instruction
                .get_targets()
                .into_iter()
                .map(|target| shift(target, at))
                .collect::<Vec<_>>();

            assert_eq!(
                after.instructions().get_jump_targets(shift(position, at)),
                expected,
                "instruction {position}, inserted at {at}"
            );
        }

        let try_block = &after.try_blocks()[0];
        assert_eq!(
            (try_block.start, try_block.end, try_block.handlers[0].target),
            (shift(1, at), shift(3, at), shift(4, at))
        );
    }
}

#[test]
fn test_removing_a_branch_target_fails_untouched() {
    let mut method = common::setup_method();
    let original = method.clone();

    // return-void is the target of the if-eqz
    let target = method.anchor_at(8).unwrap();
    assert!(matches!(
        method.remove_instructions(target, 1),
        Err(Error::InvalidMutation { index: 8, .. })
    ));
    assert_eq!(method, original);
}

#[test]
fn test_reversed_replacements_land_on_intended_instructions() {
    let mut method = Method::new(TOOLBAR, "flags", AccessFlags::PUBLIC, &[], "V")
        .with_implementation(MethodImplementation::new(
            2,
            vec![
                Instruction::literal_load(Opcode::CONST_4, 0, 1),
                Instruction::literal_load(Opcode::CONST_4, 1, 2),
                Instruction::literal_load(Opcode::CONST_4, 1, 1),
                Instruction::simple(Opcode::NOP),
                Instruction::literal_load(Opcode::CONST_4, 0, 1),
                Instruction::simple(Opcode::RETURN_VOID),
            ],
        ));

    let is_one = |instruction: &Instruction| instruction.literal() == Some(Literal::Narrow(1));
    let anchors = method.indices_reversed_where(is_one).unwrap();
    let indices = anchors.iter().map(Anchor::index).collect::<Vec<_>>();
    assert_eq!(indices, vec![4, 2, 0]);

    for anchor in anchors {
        let register = method.implementation().unwrap().instruction(&anchor).unwrap().registers[0];
        method
            .replace_instruction_smali(anchor, &format!("const/4 v{register}, 0x0"))
            .unwrap();
    }

    let literals = method
        .instructions()
        .iter()
        .map(|instruction| instruction.literal().map(|literal| literal.value()))
        .collect::<Vec<_>>();
    assert_eq!(
        literals,
        vec![Some(0), Some(2), Some(0), None, Some(0), None]
    );
    assert_eq!(method.instructions()[2].registers, vec![1]);

    // High to low inserts keep the remaining anchors valid as well
    let anchors = method
        .indices_reversed_where(|instruction| instruction.literal() == Some(Literal::Narrow(0)))
        .unwrap();
    for anchor in anchors {
        method.add_instructions(anchor, "nop").unwrap();
    }
    assert_eq!(
        common::opcodes(&method),
        vec![
            Opcode::NOP,
            Opcode::CONST_4,
            Opcode::CONST_4,
            Opcode::NOP,
            Opcode::CONST_4,
            Opcode::NOP,
            Opcode::NOP,
            Opcode::CONST_4,
            Opcode::RETURN_VOID,
        ]
    );
}

#[test]
fn test_low_to_high_reuse_is_stale() {
    let mut method = common::setup_method();

    let late = method.anchor_at(7).unwrap();
    let early = method.anchor_at(2).unwrap();
    method.add_instructions(early, "nop").unwrap();

    assert_eq!(
        method.implementation().unwrap().index_of(&late),
        Err(Error::StaleAnchor { index: 7 })
    );
    assert_eq!(
        method.add_instructions(late, "nop").map(|receipt| receipt.start()),
        Err(Error::StaleAnchor { index: 7 })
    );
}

type Log = Rc<RefCell<Vec<String>>>;

struct Step {
    name: &'static str,
    dependencies: Vec<&'static str>,
    log: Log,
}

impl Patch for Step {
    fn name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> &[&str] {
        &self.dependencies
    }

    fn execute(&self, _context: &mut PatchContext<'_>) -> Result<()> {
        self.log.borrow_mut().push(self.name.to_string());
        Ok(())
    }
}

fn chain(log: &Log, cyclic: bool) -> Vec<Box<dyn Patch>> {
    let step = |name, dependencies: &[&'static str]| -> Box<dyn Patch> {
        Box::new(Step {
            name,
            dependencies: dependencies.to_vec(),
            log: log.clone(),
        })
    };

    let first: &[&'static str] = if cyclic { &["c"] } else { &[] };

    vec![
        step("a", first),
        step("b", &["a"]),
        step("c", &["b"]),
    ]
}

#[test]
fn test_chain_runs_in_order_for_every_declaration_order() {
    common::setup();

    let orders = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in orders {
        let log = Log::default();
        let mut steps = chain(&log, false).into_iter().map(Some).collect::<Vec<_>>();
        let patches = order
            .iter()
            .filter_map(|index| steps[*index].take())
            .collect::<Vec<_>>();

        let mut program = common::program();
        let result = run(&mut program, patches);

        assert!(result.is_success(), "{order:?}: {:?}", result.error);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"], "{order:?}");
    }
}

#[test]
fn test_cycle_aborts_before_any_execute() {
    common::setup();
    let log = Log::default();
    let mut program = common::program();

    let result = run(&mut program, chain(&log, true));

    assert_eq!(
        result.error,
        Some(Error::DependencyCycle {
            patches: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        })
    );
    assert!(result.succeeded.is_empty());
    assert!(log.borrow().is_empty());
}

/// Publishes the resource id the other patches look up
struct ResourceIds;

impl Patch for ResourceIds {
    fn name(&self) -> &str {
        "resource-ids"
    }

    fn execute(&self, context: &mut PatchContext<'_>) -> Result<()> {
        context.registry.insert("toolbarHeader", HEADER_ID)
    }
}

struct HideHeader {
    fingerprints: Vec<Fingerprint>,
}

impl HideHeader {
    fn new() -> Self {
        HideHeader {
            fingerprints: vec![Fingerprint::new("toolbar-setup")
                .returns("V")
                .strings(&["toolbar_ready"])
                .opcodes([Opcode::MOVE_RESULT, Opcode::IF_EQZ])],
        }
    }
}

impl Patch for HideHeader {
    fn name(&self) -> &str {
        "hide-header"
    }

    fn dependencies(&self) -> &[&str] {
        &["resource-ids"]
    }

    fn fingerprints(&self) -> &[Fingerprint] {
        &self.fingerprints
    }

    fn execute(&self, context: &mut PatchContext<'_>) -> Result<()> {
        let id = context.registry.get("toolbarHeader")?;
        let setup = context.result(&self.fingerprints[0])?;
        let method = setup.method_mut(context.program)?;

        inject_literal_instruction_boolean_call(method, id, "Lcom/app/Hooks;->hideHeader(Z)Z")?;
        Ok(())
    }
}

/// Jumps over the `setVisibility` call when the hook says so
struct SkipVisibility;

impl Patch for SkipVisibility {
    fn name(&self) -> &str {
        "skip-visibility"
    }

    fn dependencies(&self) -> &[&str] {
        &["hide-header"]
    }

    fn execute(&self, context: &mut PatchContext<'_>) -> Result<()> {
        let found = context.result(&visibility_fingerprint())?;
        let Some(range) = found.pattern else {
            return context.fail("visibility fingerprint has no pattern");
        };

        let method = found.method_mut(context.program)?;
        method.add_instructions_with_labels(
            found.anchor_at(range.start),
            "
            invoke-static {}, Lcom/app/Hooks;->hideVisibility()Z
            move-result v0
            if-nez v0, :skip
            ",
            vec![ExternalLabel::new("skip", found.anchor_at(range.end + 1))],
        )?;

        Ok(())
    }
}

/// Calls a hook at the top of the toolbar's constructor
struct ConstructorHook;

impl Patch for ConstructorHook {
    fn name(&self) -> &str {
        "constructor-hook"
    }

    fn execute(&self, context: &mut PatchContext<'_>) -> Result<()> {
        let constructor = Fingerprint::new("constructor")
            .access_flags(AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR)
            .parameters(&[]);

        let found = context.resolve_relative(&constructor, &visibility_fingerprint())?;
        let method = found.method_mut(context.program)?;
        method.add_instructions(
            found.anchor_at(0),
            "invoke-static {p0}, Lcom/app/Hooks;->onToolbar(Lcom/app/Toolbar;)V",
        )?;

        Ok(())
    }
}

#[test]
fn test_toolbar_patches_end_to_end() {
    common::setup();
    let mut program = common::program();
    let mut patcher = Patcher::new(&mut program);

    patcher
        .add_patches([
            Box::new(ConstructorHook) as Box<dyn Patch>,
            Box::new(SkipVisibility),
            Box::new(HideHeader::new()),
            Box::new(ResourceIds),
        ])
        .unwrap();

    let result = patcher.run();
    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(
        result.succeeded,
        vec!["constructor-hook", "resource-ids", "hide-header", "skip-visibility"]
    );
    assert_eq!(patcher.registry().get("toolbarHeader"), Ok(HEADER_ID));

    // Nothing is left to do
    assert_eq!(patcher.run(), RunResult::default());

    let setup = patcher.program().method(&common::setup_reference()).unwrap();
    assert_eq!(
        common::opcodes(setup),
        vec![
            Opcode::INVOKE_STATIC,
            Opcode::MOVE_RESULT,
            Opcode::IF_NEZ,
            Opcode::CONST_16,
            Opcode::MOVE,
            Opcode::INVOKE_VIRTUAL,
            Opcode::CONST,
            Opcode::INVOKE_DIRECT,
            Opcode::MOVE_RESULT,
            Opcode::INVOKE_STATIC,
            Opcode::MOVE_RESULT,
            Opcode::IF_EQZ,
            Opcode::CONST_STRING,
            Opcode::RETURN_VOID,
        ]
    );

    let instructions = setup.implementation().unwrap().instructions();
    // The skip lands on the header constant, the original branch still reaches the return
    assert_eq!(instructions.get_jump_targets(2), vec![6]);
    assert_eq!(instructions[6].literal(), Some(Literal::Narrow(HEADER_ID as i32)));
    assert_eq!(instructions.get_jump_targets(11), vec![13]);
    assert_eq!(instructions[9].registers, vec![0]);

    let constructor = patcher
        .program()
        .class(TOOLBAR)
        .and_then(|class| class.constructors().next())
        .unwrap();
    assert_eq!(
        constructor.instructions()[0].to_string(),
        "invoke-static {v2}, Lcom/app/Hooks;->onToolbar(Lcom/app/Toolbar;)V"
    );
}

/// Edits the method its fingerprint matched, so the fingerprint no longer matches afterwards
struct PadVisibility {
    fingerprints: Vec<Fingerprint>,
}

impl Patch for PadVisibility {
    fn name(&self) -> &str {
        "pad-visibility"
    }

    fn fingerprints(&self) -> &[Fingerprint] {
        &self.fingerprints
    }

    fn execute(&self, context: &mut PatchContext<'_>) -> Result<()> {
        let found = context.result(&self.fingerprints[0])?;
        let method = found.method_mut(context.program)?;
        method
            .implementation_mut()?
            .insert_instructions(found.anchor_at(1), &[Instruction::simple(Opcode::NOP)])?;

        Ok(())
    }
}

/// Finds the constructor through the class [`PadVisibility`] matched in
struct HookAfterPadding;

impl Patch for HookAfterPadding {
    fn name(&self) -> &str {
        "hook-after-padding"
    }

    fn dependencies(&self) -> &[&str] {
        &["pad-visibility"]
    }

    fn execute(&self, context: &mut PatchContext<'_>) -> Result<()> {
        let parent = context.result(&visibility_fingerprint())?;
        assert_eq!(parent, context.published("pad-visibility", "visibility")?);

        // The padding went in at 1, so only the start of the pattern is still addressable
        let setup = parent.method(context.program)?.implementation()?;
        assert_eq!(setup.instruction(&parent.anchor_at(0))?.opcode, Opcode::CONST_16);
        let end = parent.pattern_end().ok_or(Error::Custom("no pattern".to_string()))?;
        assert_eq!(setup.instruction(&end), Err(Error::StaleAnchor { index: 2 }));

        let constructor = Fingerprint::new("constructor")
            .access_flags(AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR)
            .parameters(&[]);
        let found = context.resolve_relative(&constructor, &visibility_fingerprint())?;
        assert_eq!(found.class, TOOLBAR);

        found.method_mut(context.program)?.add_instructions(
            found.anchor_at(0),
            "invoke-static {p0}, Lcom/app/Hooks;->onToolbar(Lcom/app/Toolbar;)V",
        )?;

        Ok(())
    }
}

#[test]
fn test_dependent_chains_off_an_edited_match() {
    common::setup();
    let mut program = common::program();
    let mut patcher = Patcher::new(&mut program);

    patcher
        .add_patches([
            Box::new(HookAfterPadding) as Box<dyn Patch>,
            Box::new(PadVisibility {
                fingerprints: vec![visibility_fingerprint()],
            }),
        ])
        .unwrap();

    let result = patcher.run();
    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(result.succeeded, vec!["pad-visibility", "hook-after-padding"]);

    // Resolving again from scratch finds nothing
    assert!(resolve(&visibility_fingerprint(), patcher.program(), &Scope::Program).is_empty());
    assert_eq!(
        patcher
            .registry()
            .published("pad-visibility", "visibility")
            .map(|found| found.method.clone()),
        Ok(common::setup_reference())
    );

    let setup = patcher.program().method(&common::setup_reference()).unwrap();
    assert_eq!(
        &common::opcodes(setup)[..4],
        &[Opcode::CONST_16, Opcode::NOP, Opcode::MOVE, Opcode::INVOKE_VIRTUAL]
    );

    let constructor = patcher
        .program()
        .class(TOOLBAR)
        .and_then(|class| class.constructors().next())
        .unwrap();
    assert_eq!(constructor.instructions()[0].opcode, Opcode::INVOKE_STATIC);
}

#[test]
fn test_ambiguous_fingerprint_fails_its_patch() {
    common::setup();

    struct Ambiguous {
        fingerprints: Vec<Fingerprint>,
    }

    impl Patch for Ambiguous {
        fn name(&self) -> &str {
            "ambiguous"
        }

        fn fingerprints(&self) -> &[Fingerprint] {
            &self.fingerprints
        }

        fn execute(&self, context: &mut PatchContext<'_>) -> Result<()> {
            context.fail("must not execute")
        }
    }

    let mut program = common::program();
    let before = program.clone();

    let result = run(
        &mut program,
        vec![
            Box::new(ResourceIds) as Box<dyn Patch>,
            Box::new(Ambiguous {
                fingerprints: vec![Fingerprint::new("any-setup")
                    .parameters(&["Landroid/view/View;"])
                    .returns("V")],
            }),
        ],
    );

    assert_eq!(result.succeeded, vec!["resource-ids"]);
    assert_eq!(result.failed.as_deref(), Some("ambiguous"));
    assert_eq!(
        result.error.as_ref().map(ToString::to_string),
        Some(
            "patch `ambiguous` failed: fingerprint `any-setup` matched 2 methods, expected exactly one"
                .to_string()
        )
    );
    assert_eq!(program, before);
}
