//! Names are already resolved to symbols when a body gets here. The middle
//! of the compiler type checks the AST in place (inserting casts), folds
//! constant expressions and flattens the tree into quads.

pub mod diagnostics;
pub mod optimization;
pub mod quads;
pub mod symbol_table;
pub mod type_checker;
