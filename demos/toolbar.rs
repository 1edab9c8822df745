use dexpatch::{prelude::*, utils::narrowest_const};

const WORDMARK_HEADER: i64 = 0x7f08_0123;
const PREMIUM_HEADER: i32 = 0x7f08_0000;

fn toolbar() -> ProgramImage {
    let setup = Method::new(
        "",
        "setupHeader",
        AccessFlags::PUBLIC | AccessFlags::FINAL,
        &["Landroid/widget/ImageView;"],
        "V",
    )
    .with_implementation(MethodImplementation::new(
        3,
        vec![
            Instruction::literal_load(Opcode::CONST, 0, WORDMARK_HEADER),
            Instruction::invoke(
                Opcode::INVOKE_VIRTUAL,
                &[2, 0],
                "Landroid/widget/ImageView;->setImageResource(I)V"
                    .parse()
                    .expect("Valid descriptor"),
            ),
            Instruction::const_string(1, "header_ready"),
            Instruction::simple(Opcode::RETURN_VOID),
        ],
    ));

    [ClassDef::new("Lcom/app/Toolbar;", AccessFlags::PUBLIC).with_method(setup)]
        .into_iter()
        .collect()
}

/// Publishes the header id the way a resource patch would
struct HeaderResources;

impl Patch for HeaderResources {
    fn name(&self) -> &str {
        "header-resources"
    }

    fn execute(&self, context: &mut PatchContext<'_>) -> Result<()> {
        context.registry.insert("premiumHeader", PREMIUM_HEADER as i64)
    }
}

/// Swaps the wordmark for the premium header
struct PremiumHeader {
    fingerprints: Vec<Fingerprint>,
}

impl Patch for PremiumHeader {
    fn name(&self) -> &str {
        "premium-header"
    }

    fn description(&self) -> &str {
        "Shows the premium header in the toolbar"
    }

    fn dependencies(&self) -> &[&str] {
        &["header-resources"]
    }

    fn fingerprints(&self) -> &[Fingerprint] {
        &self.fingerprints
    }

    fn execute(&self, context: &mut PatchContext<'_>) -> Result<()> {
        let header = context.registry.get("premiumHeader")?;
        let Ok(header) = i32::try_from(header) else {
            return context.fail(format!("header id {header:#x} does not fit a register"));
        };

        let setup = context.result(&self.fingerprints[0])?;
        let method = setup.method_mut(context.program)?;
        let at = method.index_of_first_literal(WORDMARK_HEADER, 0)?;

        let register = method.implementation()?.instruction(&at)?.registers[0];
        let load = Instruction::literal_load(narrowest_const(register, header), register, header as i64);
        method.implementation_mut()?.replace_instruction(at, load)?;

        Ok(())
    }
}

fn main() {
    env_logger::init();

    let mut program = toolbar();

    let result = run(
        &mut program,
        vec![
            Box::new(PremiumHeader {
                fingerprints: vec![Fingerprint::new("setupHeader")
                    .returns("V")
                    .parameters(&["Landroid/widget/ImageView;"])
                    .strings(&["header_ready"])],
            }) as Box<dyn Patch>,
            Box::new(HeaderResources),
        ],
    );

    if let Some(error) = &result.error {
        eprintln!("{error}");
    }

    for class in program.classes() {
        for method in &class.methods {
            println!("{method}");
            for instruction in method.instructions() {
                println!("    {instruction}");
            }
        }
    }
}
