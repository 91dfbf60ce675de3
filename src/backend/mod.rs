//! The backend turns the quads of each body into x86-64 assembly (Intel
//! syntax, x87 for reals). Every quad is expanded on its own: operands are
//! reloaded from memory through the display, there is no register
//! allocation.

pub mod assemblers;
pub mod targets;

use crate::{
    backend::targets::{CodeGenerator, Target},
    middle::symbol_table::{SymbolId, SymbolTable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodegenOptions {
    /// Interleave `# QUAD n` comments and prologue/epilogue markers with
    /// the generated code
    pub trace: bool,
}

/// The complete assembly file: entry point, the generated bodies in the
/// order they were compiled and the glue for the predefined callables
pub fn emit_program(target: Target, symbols: &SymbolTable, program: SymbolId, bodies: &[String]) -> String {
    target
        .get_code_generator()
        .translate_to_asm(symbols, program, bodies)
}
