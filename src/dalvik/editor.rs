use log::trace;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    dalvik::{
        code_objects::{Method, MethodImplementation, TryBlock},
        instructions::{Instruction, Instructions},
    },
    error::{Error, Result},
    smali::{assemble, assemble_instruction, RegisterLayout},
    traits::GenericInstruction,
};

static NEXT_BODY: AtomicU64 = AtomicU64::new(1);

/// Identity of one method body. Anchors carry it so they cannot be spent on another body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BodyId(u64);

impl BodyId {
    /// Stamped on matches of methods without a body
    pub(crate) const NONE: BodyId = BodyId(0);

    fn fresh() -> Self {
        BodyId(NEXT_BODY.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lowest affected index of every count-changing edit, oldest first.
/// The number of entries is the generation of the body.
///
/// Equality ignores the identity, and a clone is a new body with the same history.
#[derive(Debug)]
pub(crate) struct EditLog {
    body: BodyId,
    edits: Vec<usize>,
}

impl Default for EditLog {
    fn default() -> Self {
        EditLog {
            body: BodyId::fresh(),
            edits: vec![],
        }
    }
}

impl Clone for EditLog {
    fn clone(&self) -> Self {
        EditLog {
            body: BodyId::fresh(),
            edits: self.edits.clone(),
        }
    }
}

impl PartialEq for EditLog {
    fn eq(&self, other: &Self) -> bool {
        self.edits == other.edits
    }
}

impl EditLog {
    pub(crate) fn body(&self) -> BodyId {
        self.body
    }

    pub(crate) fn generation(&self) -> usize {
        self.edits.len()
    }

    fn record(&mut self, index: usize) {
        self.edits.push(index);
    }

    /// An anchor survives every later edit that only touched instructions after it
    fn validate(&self, anchor: &Anchor) -> Result<usize> {
        if anchor.body != self.body {
            return Err(Error::InvalidMutation {
                index: anchor.index,
                reason: "anchor was taken from another method body".to_string(),
            });
        }

        let later = self
            .edits
            .get(anchor.generation..)
            .ok_or(Error::StaleAnchor {
                index: anchor.index,
            })?;

        if later.iter().any(|&edited| edited <= anchor.index) {
            return Err(Error::StaleAnchor {
                index: anchor.index,
            });
        }

        Ok(anchor.index)
    }
}

/// An instruction index into one body, tied to the edit generation it was computed at.
///
/// Mutations take anchors by value, so an index cannot be reused after the edit it was
/// spent on. Derive the next anchor from the returned [`Receipt`] or by scanning again.
#[derive(Debug, PartialEq, Eq)]
pub struct Anchor {
    index: usize,
    generation: usize,
    body: BodyId,
}

impl Anchor {
    pub(crate) fn new(index: usize, generation: usize, body: BodyId) -> Self {
        Anchor {
            index,
            generation,
            body,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// An anchor `delta` instructions away, taken at the same generation
    pub fn offset(&self, delta: isize) -> Option<Anchor> {
        self.index
            .checked_add_signed(delta)
            .map(|index| Anchor::new(index, self.generation, self.body))
    }

    pub fn next(&self) -> Anchor {
        Anchor::new(self.index + 1, self.generation, self.body)
    }
}

/// Returned by every mutation. `start..end` is the range the edit produced:
/// the inserted block, the replaced instruction, or an empty range where instructions were removed.
#[derive(Debug, PartialEq, Eq)]
pub struct Receipt {
    start: usize,
    end: usize,
    generation: usize,
    body: BodyId,
}

impl Receipt {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// First instruction of the edited range
    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.start, self.generation, self.body)
    }

    /// The instruction right after the edited range
    pub fn end_anchor(&self) -> Anchor {
        Anchor::new(self.end, self.generation, self.body)
    }
}

/// Binds a label name used in a [`Block`] to an existing instruction of the method
#[derive(Debug)]
pub struct ExternalLabel {
    pub name: String,
    pub anchor: Anchor,
}

impl ExternalLabel {
    pub fn new(name: impl Into<String>, anchor: Anchor) -> Self {
        ExternalLabel {
            name: name.into(),
            anchor,
        }
    }
}

/// A branch slot in a [`Block`] that refers to a label outside the block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRef {
    /// Instruction inside the block
    pub position: usize,
    /// Index into the instruction's target slots
    pub slot: usize,
    pub label: String,
}

/// Instructions to insert. Targets are relative to the block, except for the slots in `external`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub instructions: Vec<Instruction>,
    pub external: Vec<LabelRef>,
}

impl Block {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    fn is_external(&self, position: usize, slot: usize) -> bool {
        self.external
            .iter()
            .any(|reference| reference.position == position && reference.slot == slot)
    }
}

impl From<Vec<Instruction>> for Block {
    fn from(instructions: Vec<Instruction>) -> Self {
        Block {
            instructions,
            external: vec![],
        }
    }
}

impl From<&[Instruction]> for Block {
    fn from(instructions: &[Instruction]) -> Self {
        instructions.to_vec().into()
    }
}

impl Instructions {
    /// Inserts `block` at `index` and moves every target `>= index` along with its instruction.
    /// The block's own targets must already be absolute.
    fn insert_instructions(&mut self, index: usize, block: Vec<Instruction>) {
        let count = block.len();

        self.iter_mut().for_each(|instruction| {
            instruction
                .get_targets_mut()
                .into_iter()
                .filter(|target| **target >= index)
                .for_each(|target| *target += count)
        });

        self.inner_mut().splice(index..index, block);
    }

    /// Deletes `index..index + count`. Targets into the range must already be ruled out.
    fn delete_instructions(&mut self, index: usize, count: usize) {
        self.inner_mut().drain(index..index + count);

        self.iter_mut().for_each(|instruction| {
            instruction
                .get_targets_mut()
                .into_iter()
                .filter(|target| **target >= index + count)
                .for_each(|target| *target -= count)
        });
    }
}

impl TryBlock {
    fn shift_for_insert(&mut self, index: usize, count: usize) {
        if self.start >= index {
            self.start += count;
        }
        if self.end >= index {
            self.end += count;
        }
        self.handlers
            .iter_mut()
            .filter(|handler| handler.target >= index)
            .for_each(|handler| handler.target += count);
    }

    fn shift_for_delete(&mut self, index: usize, count: usize) {
        let removed_end = index + count;

        let map = |position: usize| {
            if position >= removed_end {
                position - count
            } else {
                position
            }
        };

        if self.start >= index && self.start < removed_end {
            // The first covered instruction is now whatever followed the removed range
            self.start = index;
        } else {
            self.start = map(self.start);
        }

        if self.end >= index && self.end < removed_end {
            self.end = index - 1;
        } else {
            self.end = map(self.end);
        }

        self.handlers
            .iter_mut()
            .for_each(|handler| handler.target = map(handler.target));
    }
}

impl MethodImplementation {
    /// Number of count-changing edits applied to this body
    pub fn generation(&self) -> usize {
        self.edits.generation()
    }

    /// An anchor at a raw index, taken now. Prefer the locator, which returns anchors directly.
    pub fn anchor_at(&self, index: usize) -> Anchor {
        Anchor::new(index, self.generation(), self.edits.body())
    }

    /// Anchor just past the last instruction, for appending
    pub fn end_anchor(&self) -> Anchor {
        self.anchor_at(self.len())
    }

    /// The current index of `anchor`, or `StaleAnchor` if an edit has moved its instruction
    pub fn index_of(&self, anchor: &Anchor) -> Result<usize> {
        self.edits.validate(anchor)
    }

    pub fn instruction(&self, anchor: &Anchor) -> Result<&Instruction> {
        let index = self.index_of(anchor)?;
        self.instructions
            .get(index)
            .ok_or_else(|| Self::invalid(index, format!("index past the end ({})", self.len())))
    }

    fn invalid(index: usize, reason: impl Into<String>) -> Error {
        Error::InvalidMutation {
            index,
            reason: reason.into(),
        }
    }

    /// Inserts instructions before `at`. Targets inside `instructions` are relative to the block.
    pub fn insert_instructions(
        &mut self,
        at: Anchor,
        instructions: &[Instruction],
    ) -> Result<Receipt> {
        self.insert_instructions_with_labels(at, instructions.into(), vec![])
    }

    /// Inserts `block` before `at`, binding the block's external label references to the given labels.
    ///
    /// A label anchored at an instruction that the insertion moves is bound to that instruction's
    /// new position.
    pub fn insert_instructions_with_labels(
        &mut self,
        at: Anchor,
        block: Block,
        labels: Vec<ExternalLabel>,
    ) -> Result<Receipt> {
        let index = self.edits.validate(&at)?;
        let count = block.len();

        if index > self.len() {
            return Err(Self::invalid(
                index,
                format!("insertion point is past the end ({})", self.len()),
            ));
        }

        let mut bound = Vec::with_capacity(labels.len());
        for label in labels {
            let target = self.edits.validate(&label.anchor)?;
            if target >= self.len() {
                return Err(Self::invalid(
                    index,
                    format!("label `{}` points past the end", label.name),
                ));
            }

            // The insertion itself moves everything at or after the insertion point
            let target = if target >= index { target + count } else { target };
            bound.push((label.name, target));
        }

        let mut instructions = block.instructions.clone();

        for (position, instruction) in instructions.iter_mut().enumerate() {
            for (slot, target) in instruction.get_targets_mut().into_iter().enumerate() {
                if block.is_external(position, slot) {
                    continue;
                }

                if *target >= count {
                    return Err(Self::invalid(
                        index,
                        format!("inserted instruction {position} jumps outside the block"),
                    ));
                }

                *target += index;
            }
        }

        for reference in &block.external {
            let target = bound
                .iter()
                .find(|(name, _)| *name == reference.label)
                .map(|(_, target)| *target)
                .ok_or_else(|| Error::Assembly {
                    line: reference.position + 1,
                    message: format!("label `{}` is not defined", reference.label),
                })?;

            let slot = instructions
                .get_mut(reference.position)
                .and_then(|instruction| instruction.get_targets_mut().into_iter().nth(reference.slot))
                .ok_or_else(|| {
                    Self::invalid(index, format!("label `{}` has no branch slot", reference.label))
                })?;

            *slot = target;
        }

        if count == 0 {
            return Ok(Receipt {
                start: index,
                end: index,
                generation: self.generation(),
                body: self.edits.body(),
            });
        }

        trace!("inserting {count} instructions at {index}");

        self.instructions.insert_instructions(index, instructions);
        self.try_blocks
            .iter_mut()
            .for_each(|try_block| try_block.shift_for_insert(index, count));
        self.edits.record(index);

        Ok(Receipt {
            start: index,
            end: index + count,
            generation: self.generation(),
            body: self.edits.body(),
        })
    }

    /// Removes the instruction at `at`. Fails without changing anything if it is a
    /// branch, switch or handler target, or the only instruction of a try range.
    pub fn remove_instruction(&mut self, at: Anchor) -> Result<Receipt> {
        self.remove_instructions(at, 1)
    }

    /// Removes `count` instructions starting at `at`
    pub fn remove_instructions(&mut self, at: Anchor, count: usize) -> Result<Receipt> {
        let index = self.edits.validate(&at)?;
        let removed = index..index + count;

        if removed.end > self.len() {
            return Err(Self::invalid(
                index,
                format!("cannot remove {count} instructions from {}", self.len()),
            ));
        }

        if count == 0 {
            return Ok(Receipt {
                start: index,
                end: index,
                generation: self.generation(),
                body: self.edits.body(),
            });
        }

        if let Some((from, to)) = self
            .instructions
            .iter()
            .enumerate()
            .filter(|(from, _)| !removed.contains(from))
            .find_map(|(from, instruction)| {
                instruction
                    .get_targets()
                    .into_iter()
                    .find(|target| removed.contains(target))
                    .map(|to| (from, to))
            })
        {
            return Err(Self::invalid(
                to,
                format!("instruction is the target of the jump at {from}"),
            ));
        }

        for try_block in &self.try_blocks {
            if let Some(handler) = try_block
                .handlers
                .iter()
                .find(|handler| removed.contains(&handler.target))
            {
                return Err(Self::invalid(
                    handler.target,
                    "instruction is the start of a catch handler",
                ));
            }

            if removed.contains(&try_block.start) && removed.contains(&try_block.end) {
                return Err(Self::invalid(
                    try_block.start,
                    "removal would leave an empty try range",
                ));
            }
        }

        trace!("removing {count} instructions at {index}");

        self.instructions.delete_instructions(index, count);
        self.try_blocks
            .iter_mut()
            .for_each(|try_block| try_block.shift_for_delete(index, count));
        self.edits.record(index);

        Ok(Receipt {
            start: index,
            end: index,
            generation: self.generation(),
            body: self.edits.body(),
        })
    }

    /// Replaces the instruction at `at`. Targets of the replacement are absolute.
    /// The instruction count does not change, so other anchors stay valid.
    pub fn replace_instruction(&mut self, at: Anchor, instruction: Instruction) -> Result<Receipt> {
        let index = self.edits.validate(&at)?;
        let len = self.len();

        if index >= len {
            return Err(Self::invalid(index, format!("index past the end ({len})")));
        }

        if let Some(target) = instruction.get_targets().into_iter().find(|t| *t >= len) {
            return Err(Self::invalid(
                index,
                format!("replacement jumps to {target}, past the end ({len})"),
            ));
        }

        trace!("replacing instruction {index} with `{instruction}`");

        self.instructions[index] = instruction;

        Ok(Receipt {
            start: index,
            end: index + 1,
            generation: self.generation(),
            body: self.edits.body(),
        })
    }
}

/// Smali conveniences. Snippets are assembled against this method's register layout.
impl Method {
    pub fn add_instructions(&mut self, at: Anchor, smali: &str) -> Result<Receipt> {
        self.add_instructions_with_labels(at, smali, vec![])
    }

    pub fn add_instructions_with_labels(
        &mut self,
        at: Anchor,
        smali: &str,
        labels: Vec<ExternalLabel>,
    ) -> Result<Receipt> {
        let block = assemble(smali, RegisterLayout::of(self)?)?;
        self.implementation_mut()?
            .insert_instructions_with_labels(at, block, labels)
    }

    pub fn replace_instruction_smali(&mut self, at: Anchor, smali: &str) -> Result<Receipt> {
        let instruction = assemble_instruction(smali, RegisterLayout::of(self)?)?;
        self.implementation_mut()?.replace_instruction(at, instruction)
    }

    pub fn remove_instructions(&mut self, at: Anchor, count: usize) -> Result<Receipt> {
        self.implementation_mut()?.remove_instructions(at, count)
    }

    /// Anchor into this method's body at the current generation
    pub fn anchor_at(&self, index: usize) -> Result<Anchor> {
        Ok(self.implementation()?.anchor_at(index))
    }
}
