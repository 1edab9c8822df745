use indexmap::IndexMap;
use log::debug;

use crate::{
    dalvik::code_objects::ProgramImage,
    error::{Error, Result},
    fingerprint::{Fingerprint, MatchResult},
    patch::registry::SharedRegistry,
    resolver::{resolve_exactly_one, resolve_relative, Scope},
};

/// Everything a patch may touch while it executes
pub struct PatchContext<'a> {
    pub program: &'a mut ProgramImage,
    pub registry: &'a mut SharedRegistry,
    patch: String,
    dependencies: Vec<String>,
    matches: IndexMap<String, MatchResult>,
}

impl<'a> PatchContext<'a> {
    pub fn new(
        patch: impl Into<String>,
        program: &'a mut ProgramImage,
        registry: &'a mut SharedRegistry,
    ) -> Self {
        PatchContext {
            program,
            registry,
            patch: patch.into(),
            dependencies: vec![],
            matches: IndexMap::new(),
        }
    }

    /// Patches whose published matches [`PatchContext::result`] falls back to, in order
    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|name| name.to_string()).collect();
        self
    }

    /// Name of the executing patch
    pub fn patch(&self) -> &str {
        &self.patch
    }

    pub(crate) fn record(&mut self, fingerprint: &Fingerprint, result: MatchResult) {
        self.matches.insert(fingerprint.name().to_string(), result);
    }

    /// The match of `fingerprint`: this patch's own, then the first one a dependency published,
    /// otherwise a fresh resolution over the whole program
    pub fn result(&mut self, fingerprint: &Fingerprint) -> Result<MatchResult> {
        if let Some(result) = self.matches.get(fingerprint.name()) {
            return Ok(result.clone());
        }

        if let Some(result) = self
            .dependencies
            .iter()
            .find_map(|dependency| self.registry.published(dependency, fingerprint.name()).ok())
        {
            debug!(
                "fingerprint `{}` taken from a dependency of `{}`",
                fingerprint.name(),
                self.patch
            );
            return Ok(result.clone());
        }

        self.resolve(fingerprint, &Scope::Program)
    }

    /// The match `patch` published for the fingerprint named `fingerprint`
    pub fn published(&self, patch: &str, fingerprint: &str) -> Result<MatchResult> {
        self.registry.published(patch, fingerprint).cloned()
    }

    /// Hands every match made by this patch to the registry
    pub(crate) fn publish_matches(self) -> Result<()> {
        let PatchContext {
            registry,
            patch,
            matches,
            ..
        } = self;

        for (fingerprint, result) in matches {
            registry.publish(patch.as_str(), fingerprint, result)?;
        }

        Ok(())
    }

    /// Resolves `fingerprint` in `scope`, remembering the match for [`PatchContext::result`]
    pub fn resolve(&mut self, fingerprint: &Fingerprint, scope: &Scope) -> Result<MatchResult> {
        let result = resolve_exactly_one(fingerprint, self.program, scope)?;
        self.record(fingerprint, result.clone());
        Ok(result)
    }

    /// Resolves `fingerprint` inside the class `parent` matched in
    pub fn resolve_relative(
        &mut self,
        fingerprint: &Fingerprint,
        parent: &Fingerprint,
    ) -> Result<MatchResult> {
        let parent = self.result(parent)?;
        let result = resolve_relative(fingerprint, self.program, &parent)?;
        self.record(fingerprint, result.clone());
        Ok(result)
    }

    /// Fails the patch with a message, for checks no other error describes
    pub fn fail<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(Error::Custom(message.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dalvik::{
        code_objects::{AccessFlags, ClassDef, Method, MethodImplementation},
        instructions::Instruction,
        opcodes::Opcode,
    };
    use crate::resolver::resolve;

    fn program() -> ProgramImage {
        let method = |name: &str, return_type: &str| {
            Method::new("", name, AccessFlags::PUBLIC, &[], return_type).with_implementation(
                MethodImplementation::new(0, vec![Instruction::simple(Opcode::RETURN_VOID)]),
            )
        };

        [
            ClassDef::new("La;", AccessFlags::PUBLIC)
                .with_method(method("parent", "Z"))
                .with_method(method("child", "V")),
            ClassDef::new("Lb;", AccessFlags::PUBLIC).with_method(method("child", "V")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_relative_results_are_remembered() {
        let mut program = program();
        let mut registry = SharedRegistry::new();
        let mut context = PatchContext::new("test", &mut program, &mut registry);

        let parent = Fingerprint::new("parent").returns("Z");
        let child = Fingerprint::new("child").returns("V");

        assert!(matches!(
            context.result(&child),
            Err(Error::Resolution { count: 2, .. })
        ));

        let result = context.resolve_relative(&child, &parent).unwrap();
        assert_eq!(result.class, "La;");
        assert_eq!(context.result(&child).unwrap(), result);

        context.publish_matches().unwrap();
        assert_eq!(registry.published("test", "child"), Ok(&result));
        assert_eq!(registry.published("test", "parent").map(|found| found.method.name.as_str()), Ok("parent"));
    }

    #[test]
    fn test_dependency_matches_come_first() {
        let mut program = program();
        let mut registry = SharedRegistry::new();
        let child = Fingerprint::new("child").returns("V");

        let published = resolve(&child, &program, &Scope::Class("Lb;".to_string())).remove(0);
        registry.publish("parent-patch", "child", published.clone()).unwrap();

        let mut context = PatchContext::new("dependent", &mut program, &mut registry)
            .with_dependencies(&["parent-patch"]);
        assert_eq!(context.result(&child), Ok(published.clone()));
        assert_eq!(context.published("parent-patch", "child"), Ok(published));

        let mut unrelated = PatchContext::new("unrelated", &mut program, &mut registry);
        assert!(matches!(
            unrelated.result(&child),
            Err(Error::Resolution { count: 2, .. })
        ));
    }
}
