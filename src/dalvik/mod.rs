pub mod code_objects;
pub mod editor;
pub mod instructions;
pub mod opcodes;
pub mod references;
