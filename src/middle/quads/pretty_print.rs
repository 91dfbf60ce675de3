use colored::Colorize;

use crate::{
    index::Index,
    middle::{
        quads::{Operand, QuadList, Quadruple},
        symbol_table::{SymbolId, SymbolTable},
    },
};

const COLUMN_WIDTH: usize = 11;

fn format_operand(symbols: &SymbolTable, operand: Operand) -> String {
    let text = match operand {
        Operand::Symbol(symbol) => symbols.name(symbol).to_string(),
        Operand::Immediate(value) => value.to_string(),
        Operand::Label(label) => label.index().to_string(),
        Operand::None => "-".to_string(),
    };

    let padded = format!("{text:>COLUMN_WIDTH$}");

    match operand {
        Operand::Symbol(_) => padded.blue().to_string(),
        Operand::Immediate(_) => padded.yellow().to_string(),
        Operand::Label(_) => padded.bright_red().to_string(),
        Operand::None => padded.white().to_string(),
    }
}

/// One row of the quad table: the opcode and its three operand columns
pub fn format_quad(symbols: &SymbolTable, quad: &Quadruple) -> String {
    format!(
        "{}{}{}{}",
        format!("{:>COLUMN_WIDTH$}", format!("q_{}", quad.op)).cyan(),
        format_operand(symbols, quad.first),
        format_operand(symbols, quad.second),
        format_operand(symbols, quad.third),
    )
}

/// The full numbered table for one body
pub fn format_quad_list(symbols: &SymbolTable, quads: &QuadList) -> String {
    quads
        .iter()
        .enumerate()
        .map(|(index, quad)| format!("{:>5}{}\n", index + 1, format_quad(symbols, quad)))
        .collect()
}

pub fn pretty_print_quads(symbols: &SymbolTable, environment: SymbolId, quads: &QuadList) {
    println!(
        "{} {}{}",
        "quads".magenta(),
        symbols.name(environment).blue(),
        format!(" (return to {})", quads.return_label()).white()
    );
    print!("{}", format_quad_list(symbols, quads));
}
