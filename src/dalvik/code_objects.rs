use bitflags::bitflags;

use indexmap::IndexMap;

use crate::{
    dalvik::{
        editor::EditLog,
        instructions::{Instruction, Instructions, Register},
        references::{register_width, MethodReference},
    },
    error::Error,
};
use std::fmt;

bitflags! {
    /// Access flags of classes, methods and fields as stored in the dex file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        /// `VOLATILE` on fields
        const BRIDGE = 0x40;
        /// `TRANSIENT` on fields
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

impl fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .iter_names()
            .map(|(name, _)| name.to_lowercase())
            .collect::<Vec<_>>();

        write!(f, "{}", names.join(" "))
    }
}

/// A catch handler. `exception_type` is `None` for a catch-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub exception_type: Option<String>,
    pub target: usize,
}

/// Instruction indexes are inclusive on both ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryBlock {
    pub start: usize,
    pub end: usize,
    pub handlers: Vec<Handler>,
}

/// The body of a method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodImplementation {
    pub registers_count: u16,
    pub(crate) instructions: Instructions,
    pub(crate) try_blocks: Vec<TryBlock>,
    pub(crate) edits: EditLog,
}

impl MethodImplementation {
    pub fn new(registers_count: u16, instructions: impl Into<Instructions>) -> Self {
        MethodImplementation {
            registers_count,
            instructions: instructions.into(),
            try_blocks: vec![],
            edits: EditLog::default(),
        }
    }

    pub fn with_try_blocks(mut self, try_blocks: Vec<TryBlock>) -> Self {
        self.try_blocks = try_blocks;
        self
    }

    pub fn instructions(&self) -> &Instructions {
        &self.instructions
    }

    pub fn try_blocks(&self) -> &[TryBlock] {
        &self.try_blocks
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Offset in code units of the instruction at `index`. `index == len()` gives the total size.
    pub fn code_offset(&self, index: usize) -> Option<u32> {
        (index <= self.len()).then(|| {
            self.instructions[..index]
                .iter()
                .map(|instruction| instruction.code_units() as u32)
                .sum()
        })
    }
}

/// A method with its signature and optional body (abstract and native methods have none)
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub defining_class: String,
    pub name: String,
    pub access_flags: AccessFlags,
    pub parameters: Vec<String>,
    pub return_type: String,
    pub implementation: Option<MethodImplementation>,
}

impl Method {
    pub fn new(
        defining_class: impl Into<String>,
        name: impl Into<String>,
        access_flags: AccessFlags,
        parameters: &[&str],
        return_type: impl Into<String>,
    ) -> Self {
        Method {
            defining_class: defining_class.into(),
            name: name.into(),
            access_flags,
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            return_type: return_type.into(),
            implementation: None,
        }
    }

    pub fn with_implementation(mut self, implementation: MethodImplementation) -> Self {
        self.implementation = Some(implementation);
        self
    }

    /// The reference an invoke instruction would use to call this method
    pub fn reference(&self) -> MethodReference {
        MethodReference {
            defining_class: self.defining_class.clone(),
            name: self.name.clone(),
            parameters: self.parameters.clone(),
            return_type: self.return_type.clone(),
        }
    }

    pub fn matches_reference(&self, reference: &MethodReference) -> bool {
        self.defining_class == reference.defining_class
            && self.name == reference.name
            && self.parameters == reference.parameters
            && self.return_type == reference.return_type
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>" || self.name == "<clinit>"
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(AccessFlags::STATIC)
    }

    /// Registers taken by the incoming arguments, `this` included
    pub fn parameter_registers(&self) -> u16 {
        let this = if self.is_static() { 0 } else { 1 };
        this + self
            .parameters
            .iter()
            .map(|parameter| register_width(parameter))
            .sum::<u16>()
    }

    pub fn implementation(&self) -> Result<&MethodImplementation, Error> {
        self.implementation
            .as_ref()
            .ok_or_else(|| Error::NoImplementation(self.to_string()))
    }

    pub fn implementation_mut(&mut self) -> Result<&mut MethodImplementation, Error> {
        let name = self.to_string();
        self.implementation
            .as_mut()
            .ok_or(Error::NoImplementation(name))
    }

    /// The instructions of the body, empty for methods without one
    pub fn instructions(&self) -> &[Instruction] {
        self.implementation
            .as_ref()
            .map(|implementation| implementation.instructions.as_ref())
            .unwrap_or(&[])
    }

    /// Maps `pN` to its `vN` register number
    pub fn parameter_register(&self, index: u16) -> Option<Register> {
        let implementation = self.implementation.as_ref()?;
        let parameters = self.parameter_registers();

        if index >= parameters {
            return None;
        }

        // A body with fewer registers than its parameters need has no `pN` mapping
        implementation
            .registers_count
            .checked_sub(parameters)
            .map(|first| first + index)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}({}){}",
            self.defining_class,
            self.name,
            self.parameters.concat(),
            self.return_type
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: String,
    pub access_flags: AccessFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// Type descriptor, e.g. `Lcom/example/Foo;`
    pub descriptor: String,
    pub super_class: Option<String>,
    pub access_flags: AccessFlags,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

impl ClassDef {
    pub fn new(descriptor: impl Into<String>, access_flags: AccessFlags) -> Self {
        ClassDef {
            descriptor: descriptor.into(),
            super_class: Some("Ljava/lang/Object;".to_string()),
            access_flags,
            fields: vec![],
            methods: vec![],
        }
    }

    pub fn with_super_class(mut self, super_class: impl Into<String>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a method. Its defining class is rewritten to this class.
    pub fn with_method(mut self, mut method: Method) -> Self {
        method.defining_class = self.descriptor.clone();
        self.methods.push(method);
        self
    }

    pub fn constructors(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().filter(|method| method.is_constructor())
    }

    pub fn method(&self, reference: &MethodReference) -> Option<&Method> {
        self.methods
            .iter()
            .find(|method| method.matches_reference(reference))
    }

    pub fn method_mut(&mut self, reference: &MethodReference) -> Option<&mut Method> {
        self.methods
            .iter_mut()
            .find(|method| method.matches_reference(reference))
    }
}

/// All classes being transformed during one run, keyed by descriptor in load order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramImage {
    classes: IndexMap<String, ClassDef>,
}

impl ProgramImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a class
    pub fn add_class(&mut self, class: ClassDef) -> Option<ClassDef> {
        self.classes.insert(class.descriptor.clone(), class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.values()
    }

    pub fn classes_mut(&mut self) -> impl Iterator<Item = &mut ClassDef> {
        self.classes.values_mut()
    }

    pub fn class(&self, descriptor: &str) -> Option<&ClassDef> {
        self.classes.get(descriptor)
    }

    pub fn class_mut(&mut self, descriptor: &str) -> Option<&mut ClassDef> {
        self.classes.get_mut(descriptor)
    }

    pub fn class_or_err(&self, descriptor: &str) -> Result<&ClassDef, Error> {
        self.class(descriptor)
            .ok_or_else(|| Error::ClassNotFound(descriptor.to_string()))
    }

    pub fn class_mut_or_err(&mut self, descriptor: &str) -> Result<&mut ClassDef, Error> {
        self.class_mut(descriptor)
            .ok_or_else(|| Error::ClassNotFound(descriptor.to_string()))
    }

    /// Resolves a reference to the method defined in the referenced class
    pub fn method(&self, reference: &MethodReference) -> Result<&Method, Error> {
        self.class_or_err(&reference.defining_class)?
            .method(reference)
            .ok_or_else(|| Error::MethodNotFound(reference.to_string()))
    }

    pub fn method_mut(&mut self, reference: &MethodReference) -> Result<&mut Method, Error> {
        self.class_mut_or_err(&reference.defining_class)?
            .method_mut(reference)
            .ok_or_else(|| Error::MethodNotFound(reference.to_string()))
    }

    /// Returns the first method of `class` matching `predicate`
    pub fn find_method<P>(&mut self, class: &str, predicate: P) -> Result<&mut Method, Error>
    where
        P: Fn(&Method) -> bool,
    {
        self.class_mut_or_err(class)?
            .methods
            .iter_mut()
            .find(|method| predicate(method))
            .ok_or_else(|| Error::MethodNotFound(format!("{class} (by predicate)")))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<ClassDef> for ProgramImage {
    fn from_iter<T: IntoIterator<Item = ClassDef>>(iter: T) -> Self {
        let mut program = ProgramImage::new();
        for class in iter {
            program.add_class(class);
        }
        program
    }
}
