use log::debug;

use crate::{
    dalvik::code_objects::ProgramImage,
    error::{Error, Result},
    fingerprint::{Fingerprint, MatchResult},
};

/// Where the resolver looks for candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Program,
    /// Only the methods of one class, by descriptor
    Class(String),
}

impl From<&MatchResult> for Scope {
    /// The class a previous match was found in
    fn from(parent: &MatchResult) -> Self {
        Scope::Class(parent.class.clone())
    }
}

/// Every method in `scope` satisfying `fingerprint`, in class then method order
pub fn resolve(fingerprint: &Fingerprint, program: &ProgramImage, scope: &Scope) -> Vec<MatchResult> {
    let results: Vec<MatchResult> = match scope {
        Scope::Program => program
            .classes()
            .flat_map(|class| {
                class
                    .methods
                    .iter()
                    .filter_map(move |method| fingerprint.match_method(method, class))
            })
            .collect(),
        Scope::Class(descriptor) => program
            .class(descriptor)
            .map(|class| {
                class
                    .methods
                    .iter()
                    .filter_map(|method| fingerprint.match_method(method, class))
                    .collect()
            })
            .unwrap_or_default(),
    };

    debug!(
        "fingerprint `{}` matched {} methods in {:?}",
        fingerprint.name(),
        results.len(),
        scope
    );

    results
}

/// The single method in `scope` satisfying `fingerprint`
pub fn resolve_exactly_one(
    fingerprint: &Fingerprint,
    program: &ProgramImage,
    scope: &Scope,
) -> Result<MatchResult> {
    let mut results = resolve(fingerprint, program, scope);

    if results.len() != 1 {
        return Err(Error::Resolution {
            fingerprint: fingerprint.name().to_string(),
            count: results.len(),
        });
    }

    let result = results.remove(0);
    debug!(
        "fingerprint `{}` resolved to {} (pattern {:?})",
        fingerprint.name(),
        result.method,
        result.pattern
    );

    Ok(result)
}

/// Resolves inside the class `parent` was found in
pub fn resolve_relative(
    fingerprint: &Fingerprint,
    program: &ProgramImage,
    parent: &MatchResult,
) -> Result<MatchResult> {
    resolve_exactly_one(fingerprint, program, &Scope::from(parent))
}
