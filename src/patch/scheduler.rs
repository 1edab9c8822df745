use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};

use crate::{
    dalvik::code_objects::ProgramImage,
    error::{Error, Result},
    patch::{context::PatchContext, registry::SharedRegistry, Patch, PatchState},
    resolver::{resolve_exactly_one, Scope},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatcherOptions {
    /// Patches that stay registered but are not run. Depending on one is an error.
    pub excluded: IndexSet<String>,
}

impl PatcherOptions {
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.excluded.insert(name.into());
        self
    }
}

/// Outcome of [`Patcher::run`]
#[derive(Debug, Default, PartialEq)]
pub struct RunResult {
    /// Patches completed during this run, in execution order
    pub succeeded: Vec<String>,
    pub failed: Option<String>,
    pub error: Option<Error>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    fn aborted(error: Error) -> Self {
        RunResult {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Runs patches in dependency order over one program image.
///
/// Units are ordered topologically, ties broken by the order they were added in.
/// Each unit executes at most once; the first failure halts the run.
pub struct Patcher<'a> {
    program: &'a mut ProgramImage,
    units: IndexMap<String, Box<dyn Patch>>,
    states: IndexMap<String, PatchState>,
    registry: SharedRegistry,
    options: PatcherOptions,
}

/// Resolves the fingerprints `patch` declares into `context`
fn resolve_fingerprints(patch: &dyn Patch, context: &mut PatchContext<'_>) -> Result<()> {
    for fingerprint in patch.fingerprints() {
        let found = resolve_exactly_one(fingerprint, context.program, &Scope::Program)?;
        context.record(fingerprint, found);
    }

    Ok(())
}

impl<'a> Patcher<'a> {
    pub fn new(program: &'a mut ProgramImage) -> Self {
        Self::with_options(program, PatcherOptions::default())
    }

    pub fn with_options(program: &'a mut ProgramImage, options: PatcherOptions) -> Self {
        Patcher {
            program,
            units: IndexMap::new(),
            states: IndexMap::new(),
            registry: SharedRegistry::new(),
            options,
        }
    }

    pub fn add_patch(&mut self, patch: Box<dyn Patch>) -> Result<()> {
        let name = patch.name().to_string();

        if self.units.contains_key(&name) {
            return Err(Error::DuplicatePatch(name));
        }

        self.states.insert(name.clone(), PatchState::Pending);
        self.units.insert(name, patch);

        Ok(())
    }

    pub fn add_patches(&mut self, patches: impl IntoIterator<Item = Box<dyn Patch>>) -> Result<()> {
        patches
            .into_iter()
            .try_for_each(|patch| self.add_patch(patch))
    }

    pub fn state(&self, name: &str) -> Option<PatchState> {
        self.states.get(name).copied()
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn program(&self) -> &ProgramImage {
        self.program
    }

    /// The order units would execute in, without executing anything.
    /// Excluded units are left out.
    pub fn execution_plan(&self) -> Result<Vec<String>> {
        let included = self
            .units
            .iter()
            .filter(|(name, _)| !self.options.excluded.contains(*name))
            .collect::<Vec<_>>();

        for (name, patch) in &included {
            if let Some(dependency) = patch.dependencies().iter().find(|dependency| {
                !self.units.contains_key(**dependency)
                    || self.options.excluded.contains(**dependency)
            }) {
                return Err(Error::UnsatisfiedDependency {
                    patch: name.to_string(),
                    dependency: dependency.to_string(),
                });
            }
        }

        let mut plan: IndexSet<String> = IndexSet::with_capacity(included.len());
        let mut remaining = included;

        while !remaining.is_empty() {
            // Earliest declared unit whose dependencies are all planned
            let ready = remaining.iter().position(|(_, patch)| {
                patch
                    .dependencies()
                    .iter()
                    .all(|dependency| plan.contains(*dependency))
            });

            match ready {
                Some(position) => {
                    let (name, _) = remaining.remove(position);
                    plan.insert(name.clone());
                }
                // Nothing left can be ordered
                None => {
                    return Err(Error::DependencyCycle {
                        patches: remaining.iter().map(|(name, _)| name.to_string()).collect(),
                    })
                }
            }
        }

        let plan = plan.into_iter().collect::<Vec<_>>();
        debug!("execution plan: {}", plan.join(" -> "));

        Ok(plan)
    }

    fn fail(&mut self, name: &str, error: Error, mut result: RunResult) -> RunResult {
        warn!("patch `{name}` failed: {error}");

        self.states.insert(name.to_string(), PatchState::Failed);
        result.failed = Some(name.to_string());
        result.error = Some(error);
        result
    }

    /// Executes every pending unit. Units already done are skipped, so running twice is a no-op.
    pub fn run(&mut self) -> RunResult {
        let plan = match self.execution_plan() {
            Ok(plan) => plan,
            Err(error) => {
                warn!("not running any patch: {error}");
                return RunResult::aborted(error);
            }
        };

        let mut result = RunResult::default();

        for name in plan {
            match self.state(&name) {
                Some(PatchState::Done) | None => continue,
                Some(PatchState::Failed) => {
                    warn!("skipping patch `{name}`, it failed in an earlier run");
                    continue;
                }
                _ => {
                    self.states.insert(name.clone(), PatchState::Resolving);
                }
            }

            let Some(patch) = self.units.get(&name) else {
                continue;
            };

            let failed_dependency = patch
                .dependencies()
                .iter()
                .find(|dependency| self.state(dependency) != Some(PatchState::Done))
                .map(|dependency| dependency.to_string());

            if let Some(dependency) = failed_dependency {
                let error = Error::DependencyFailed {
                    patch: name.clone(),
                    dependency,
                };
                return self.fail(&name, error, result);
            }

            let outcome = {
                let mut context =
                    PatchContext::new(name.as_str(), &mut *self.program, &mut self.registry)
                        .with_dependencies(patch.dependencies());

                match resolve_fingerprints(patch.as_ref(), &mut context) {
                    Ok(()) => {
                        self.states.insert(name.clone(), PatchState::Executing);
                        info!("executing patch `{name}`");
                        // Dependents only see the matches of a patch that finished
                        patch
                            .execute(&mut context)
                            .and_then(|()| context.publish_matches())
                    }
                    Err(error) => Err(error),
                }
            };

            if let Err(error) = outcome {
                let error = Error::Patch {
                    patch: name.clone(),
                    source: Box::new(error),
                };
                return self.fail(&name, error, result);
            }

            self.states.insert(name.clone(), PatchState::Done);
            info!("patch `{name}` done");
            result.succeeded.push(name);
        }

        result
    }
}

/// Runs `patches` over `program` with default options
pub fn run(program: &mut ProgramImage, patches: Vec<Box<dyn Patch>>) -> RunResult {
    let mut patcher = Patcher::new(program);

    if let Err(error) = patcher.add_patches(patches) {
        return RunResult::aborted(error);
    }

    patcher.run()
}
