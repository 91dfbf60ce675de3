//! Runs the passes over one body at a time and stitches the generated bodies
//! into a program.
//!
//! Bodies must be handed over while their scope is the innermost open one,
//! which for nested procedures means inner bodies are compiled before the
//! body that declares them.

use colored::Colorize;

use crate::{
    backend::{
        self, CodegenOptions,
        targets::{CodeGenerator, Target},
    },
    frontend::ast::Body,
    middle::{
        diagnostics::Diagnostics,
        optimization::optimize_body,
        quads::{ast_lowering::QuadGenerator, pretty_print::pretty_print_quads},
        symbol_table::{SymbolId, SymbolTable},
        type_checker::TypeChecker,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Fold constant subexpressions before generating quads
    pub optimize: bool,
    pub print_ast: bool,
    pub print_quads: bool,
    pub codegen: CodegenOptions,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            print_ast: false,
            print_quads: false,
            codegen: CodegenOptions::default(),
        }
    }
}

pub struct Session {
    symbols: SymbolTable,
    diagnostics: Diagnostics,
    options: CompilerOptions,
    target: Target,
    /// Assembly of every compiled body, in compilation order
    bodies: Vec<String>,
}

impl Session {
    pub fn new(options: CompilerOptions, target: Target) -> Self {
        Self {
            symbols: SymbolTable::new(),
            diagnostics: Diagnostics::new(),
            options,
            target,
            bodies: Vec::new(),
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Declarations go straight into the table, there is no parser to do it
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    pub fn bodies(&self) -> &[String] {
        &self.bodies
    }

    /// Type checks, optimizes, lowers and generates code for one body.
    /// Later passes run even when the body has semantic errors, whether the
    /// output is used is up to the caller. Returns the number of errors
    /// found in this body.
    pub fn compile_body(&mut self, body: &mut Body) -> usize {
        let environment = body.environment;
        let name = self.symbols.name(environment);

        let _span = tracing::debug_span!("compile_body", body = name).entered();

        let errors = TypeChecker::check_body(&self.symbols, &mut self.diagnostics, body);
        tracing::debug!(errors, "type checking finished");

        if self.options.optimize {
            optimize_body(&self.symbols, body);
        }

        if self.options.print_ast {
            println!("{} {}", "ast".magenta(), name.blue());
            println!("{body:#?}");
        }

        let quads = QuadGenerator::lower_body(&mut self.symbols, body);
        tracing::debug!(quads = quads.len(), "quads generated");

        if self.options.print_quads {
            pretty_print_quads(&self.symbols, environment, &quads);
        }

        let assembly = self.target.get_code_generator().generate_body(
            &mut self.symbols,
            environment,
            &quads,
            &self.options.codegen,
        );
        tracing::trace!(lines = assembly.lines().count(), "assembly generated");

        self.bodies.push(assembly);

        errors
    }

    /// The whole program, `program` being the outermost procedure that
    /// `main` calls
    pub fn finish(&self, program: SymbolId) -> String {
        backend::emit_program(self.target, &self.symbols, program, &self.bodies)
    }
}
