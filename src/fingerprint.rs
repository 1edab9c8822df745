use std::fmt;

use crate::{
    dalvik::{
        code_objects::{AccessFlags, ClassDef, Method, ProgramImage},
        editor::{Anchor, BodyId},
        opcodes::Opcode,
        references::MethodReference,
    },
    error::Result,
    traits::GenericOpcode,
};

/// One slot of an opcode pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternOpcode {
    Exact(Opcode),
    /// Matches any single instruction
    Any,
}

impl PatternOpcode {
    pub fn matches(&self, opcode: Opcode) -> bool {
        match self {
            PatternOpcode::Exact(expected) => *expected == opcode,
            PatternOpcode::Any => true,
        }
    }
}

impl From<Opcode> for PatternOpcode {
    fn from(value: Opcode) -> Self {
        PatternOpcode::Exact(value)
    }
}

/// `None` is a wildcard slot
impl From<Option<Opcode>> for PatternOpcode {
    fn from(value: Option<Opcode>) -> Self {
        value.map_or(PatternOpcode::Any, PatternOpcode::Exact)
    }
}

type CustomPredicate = Box<dyn Fn(&Method, &ClassDef) -> bool + Send + Sync>;

/// A partial signature of a method. Unset constraints match anything.
pub struct Fingerprint {
    name: String,
    access_flags: Option<AccessFlags>,
    return_type: Option<String>,
    parameters: Option<Vec<String>>,
    opcodes: Option<Vec<PatternOpcode>>,
    strings: Vec<String>,
    literals: Vec<i64>,
    custom: Option<CustomPredicate>,
    fuzzy_threshold: usize,
}

impl Fingerprint {
    pub fn new(name: impl Into<String>) -> Self {
        Fingerprint {
            name: name.into(),
            access_flags: None,
            return_type: None,
            parameters: None,
            opcodes: None,
            strings: vec![],
            literals: vec![],
            custom: None,
            fuzzy_threshold: 0,
        }
    }

    /// The method's flags must be exactly these
    pub fn access_flags(mut self, access_flags: AccessFlags) -> Self {
        self.access_flags = Some(access_flags);
        self
    }

    pub fn returns(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn parameters(mut self, parameters: &[&str]) -> Self {
        self.parameters = Some(parameters.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn opcodes<P>(mut self, opcodes: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<PatternOpcode>,
    {
        self.opcodes = Some(opcodes.into_iter().map(Into::into).collect());
        self
    }

    /// Strings that must each be loaded by some `const-string`
    pub fn strings(mut self, strings: &[&str]) -> Self {
        self.strings = strings.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Literals that must each be loaded by some `const*` instruction.
    /// Narrow loads are compared sign-extended, wide loads on all 64 bits.
    pub fn literals(mut self, literals: &[i64]) -> Self {
        self.literals = literals.to_vec();
        self
    }

    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Method, &ClassDef) -> bool + Send + Sync + 'static,
    {
        self.custom = Some(Box::new(predicate));
        self
    }

    /// Number of exact pattern slots allowed to disagree within a window
    pub fn fuzzy_threshold(mut self, threshold: usize) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> Option<&[PatternOpcode]> {
        self.opcodes.as_deref().filter(|pattern| !pattern.is_empty())
    }

    /// Checks every declared constraint against `method`
    pub fn match_method(&self, method: &Method, class: &ClassDef) -> Option<MatchResult> {
        if let Some(return_type) = &self.return_type {
            if *return_type != method.return_type {
                return None;
            }
        }

        if let Some(access_flags) = self.access_flags {
            if access_flags != method.access_flags {
                return None;
            }
        }

        if let Some(parameters) = &self.parameters {
            if *parameters != method.parameters {
                return None;
            }
        }

        if let Some(custom) = &self.custom {
            if !custom(method, class) {
                return None;
            }
        }

        let needs_body =
            self.pattern().is_some() || !self.strings.is_empty() || !self.literals.is_empty();
        let instructions = method.instructions();

        if needs_body && method.implementation.is_none() {
            return None;
        }

        let mut strings = Vec::with_capacity(self.strings.len());
        for string in &self.strings {
            let index = instructions
                .iter()
                .position(|instruction| instruction.string() == Some(string.as_str()))?;

            strings.push(StringMatch {
                string: string.clone(),
                index,
            });
        }

        let all_literals_present = self.literals.iter().all(|literal| {
            instructions.iter().any(|instruction| {
                instruction.opcode.is_literal_load()
                    && instruction.literal().map(|l| l.value()) == Some(*literal)
            })
        });
        if !all_literals_present {
            return None;
        }

        let pattern = match self.pattern() {
            Some(pattern) => {
                let opcodes = instructions
                    .iter()
                    .map(|instruction| instruction.opcode)
                    .collect::<Vec<_>>();
                Some(scan_pattern(&opcodes, pattern, self.fuzzy_threshold)?)
            }
            None => None,
        };

        Some(MatchResult {
            class: class.descriptor.clone(),
            method: method.reference(),
            pattern,
            strings,
            generation: method
                .implementation
                .as_ref()
                .map_or(0, |implementation| implementation.generation()),
            body: method
                .implementation
                .as_ref()
                .map_or(BodyId::NONE, |implementation| implementation.edits.body()),
        })
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprint")
            .field("name", &self.name)
            .field("access_flags", &self.access_flags)
            .field("return_type", &self.return_type)
            .field("parameters", &self.parameters)
            .field("opcodes", &self.opcodes)
            .field("strings", &self.strings)
            .field("literals", &self.literals)
            .field("custom", &self.custom.is_some())
            .field("fuzzy_threshold", &self.fuzzy_threshold)
            .finish()
    }
}

/// Returns the first window of `opcodes` matching `pattern` with at most `threshold` mismatches
pub fn scan_pattern(opcodes: &[Opcode], pattern: &[PatternOpcode], threshold: usize) -> Option<ScanRange> {
    if pattern.is_empty() || pattern.len() > opcodes.len() {
        return None;
    }

    opcodes
        .windows(pattern.len())
        .position(|window| {
            window
                .iter()
                .zip(pattern)
                .filter(|(opcode, slot)| !slot.matches(**opcode))
                .count()
                <= threshold
        })
        .map(|start| ScanRange {
            start,
            end: start + pattern.len() - 1,
        })
}

/// Inclusive instruction range matched by an opcode pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub start: usize,
    pub end: usize,
}

/// First `const-string` loading a required string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringMatch {
    pub string: String,
    pub index: usize,
}

/// A resolved fingerprint. Indexes are only meaningful until the method is edited,
/// which the anchors handed out here enforce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub class: String,
    pub method: MethodReference,
    pub pattern: Option<ScanRange>,
    pub strings: Vec<StringMatch>,
    generation: usize,
    body: BodyId,
}

impl MatchResult {
    pub fn method<'a>(&self, program: &'a ProgramImage) -> Result<&'a Method> {
        program.method(&self.method)
    }

    pub fn method_mut<'a>(&self, program: &'a mut ProgramImage) -> Result<&'a mut Method> {
        program.method_mut(&self.method)
    }

    pub fn class<'a>(&self, program: &'a ProgramImage) -> Result<&'a ClassDef> {
        program.class_or_err(&self.class)
    }

    /// An anchor at `index`, valid as of the resolution
    pub fn anchor_at(&self, index: usize) -> Anchor {
        Anchor::new(index, self.generation, self.body)
    }

    pub fn pattern_start(&self) -> Option<Anchor> {
        self.pattern.map(|range| self.anchor_at(range.start))
    }

    /// Last instruction of the pattern (inclusive)
    pub fn pattern_end(&self) -> Option<Anchor> {
        self.pattern.map(|range| self.anchor_at(range.end))
    }

    pub fn string_anchor(&self, string: &str) -> Option<Anchor> {
        self.strings
            .iter()
            .find(|found| found.string == string)
            .map(|found| self.anchor_at(found.index))
    }
}
