//! `dieselc`: semantic analysis, constant folding, quad generation and x86-64
//! code generation for the Diesel language.

pub mod backend;
pub mod driver;
pub mod frontend;
pub mod index;
pub mod middle;
pub mod samples;
