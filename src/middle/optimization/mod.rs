//! AST level optimizations. These run on a type checked body, in place,
//! before quads are generated. The only one for now is local constant
//! folding.

pub mod constant_folding;

use crate::{frontend::ast::Body, middle::symbol_table::SymbolTable};

pub fn optimize_body(symbols: &SymbolTable, body: &mut Body) {
    let folded = constant_folding::fold_statements(symbols, &mut body.statements);

    tracing::debug!(
        environment = symbols.name(body.environment),
        folded,
        "constant folding finished"
    );
}
