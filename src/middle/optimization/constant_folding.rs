use crate::{
    frontend::{
        Position,
        ast::{BinaryOperator, ElsIf, Expression, ExpressionKind, Statement, StatementKind},
    },
    middle::symbol_table::{ConstantValue, SymbolKind, SymbolTable},
};

/// Folds every expression reachable from the given statements, returning how
/// many binary operations were replaced by literals
pub fn fold_statements(symbols: &SymbolTable, statements: &mut [Statement]) -> usize {
    statements
        .iter_mut()
        .map(|statement| fold_statement(symbols, statement))
        .sum()
}

fn fold_statement(symbols: &SymbolTable, statement: &mut Statement) -> usize {
    match &mut statement.kind {
        StatementKind::Assign { target, value } => {
            fold_constants(symbols, target) + fold_constants(symbols, value)
        }
        StatementKind::ProcedureCall { arguments, .. } => fold_all(symbols, arguments),
        StatementKind::While { condition, body } => {
            fold_constants(symbols, condition) + fold_statements(symbols, body)
        }
        StatementKind::If {
            condition,
            body,
            elsif,
            else_body,
        } => {
            let mut folded = fold_constants(symbols, condition) + fold_statements(symbols, body);

            for ElsIf { condition, body, .. } in elsif {
                folded += fold_constants(symbols, condition) + fold_statements(symbols, body);
            }

            if let Some(else_body) = else_body {
                folded += fold_statements(symbols, else_body);
            }

            folded
        }
        StatementKind::Return(Some(value)) => fold_constants(symbols, value),
        StatementKind::Return(None) => 0,
    }
}

fn fold_all(symbols: &SymbolTable, expressions: &mut [Expression]) -> usize {
    expressions
        .iter_mut()
        .map(|expression| fold_constants(symbols, expression))
        .sum()
}

/// Folds an expression in place, children first. A binary operation whose
/// operands end up as literals is replaced by a literal holding its value.
///
/// A bare identifier naming a constant is substituted by its value only when
/// the other operand is not an identifier too, so folding never reaches more
/// than one level through constants.
pub fn fold_constants(symbols: &SymbolTable, expression: &mut Expression) -> usize {
    let mut folded = match &mut expression.kind {
        ExpressionKind::Integer(_) | ExpressionKind::Real(_) | ExpressionKind::Identifier(_) => 0,
        ExpressionKind::Indexed { index, .. } => fold_constants(symbols, index),
        ExpressionKind::FunctionCall { arguments, .. } => fold_all(symbols, arguments),
        ExpressionKind::Unary { operand, .. } => fold_constants(symbols, operand),
        ExpressionKind::Cast(inner) => fold_constants(symbols, inner),
        ExpressionKind::Binary { lhs, rhs, .. } | ExpressionKind::Relation { lhs, rhs, .. } => {
            fold_constants(symbols, lhs) + fold_constants(symbols, rhs)
        }
    };

    let ExpressionKind::Binary { operator, lhs, rhs } = &mut expression.kind else {
        return folded;
    };

    if !rhs.is_identifier() {
        substitute_constant(symbols, lhs);
    }
    if !lhs.is_identifier() {
        substitute_constant(symbols, rhs);
    }

    if let (Some(lhs), Some(rhs)) = (literal_value(lhs), literal_value(rhs)) {
        if let Some(value) = evaluate(*operator, lhs, rhs) {
            tracing::trace!(%operator, ?lhs, ?rhs, ?value, "folded binary operation");

            *expression = literal(expression.position, value);
            folded += 1;
        }
    }

    folded
}

/// Replaces a bare identifier of a compile time constant by a literal
fn substitute_constant(symbols: &SymbolTable, expression: &mut Expression) {
    let ExpressionKind::Identifier(symbol) = expression.kind else {
        return;
    };

    if let SymbolKind::Constant(value) = symbols[symbol].kind {
        *expression = literal(expression.position, value);
    }
}

fn literal_value(expression: &Expression) -> Option<ConstantValue> {
    match expression.kind {
        ExpressionKind::Integer(value) => Some(ConstantValue::Integer(value)),
        ExpressionKind::Real(value) => Some(ConstantValue::Real(value)),
        _ => None,
    }
}

fn literal(position: Position, value: ConstantValue) -> Expression {
    match value {
        ConstantValue::Integer(value) => Expression::integer(position, value),
        ConstantValue::Real(value) => Expression::real(position, value),
    }
}

/// Computes `lhs operator rhs` the way the generated code would, or returns
/// `None` when the operation has to be left for run time
pub fn evaluate(operator: BinaryOperator, lhs: ConstantValue, rhs: ConstantValue) -> Option<ConstantValue> {
    use ConstantValue::{Integer, Real};

    let as_real = |value: ConstantValue| match value {
        Integer(value) => value as f64,
        Real(value) => value,
    };

    let value = match (operator, lhs, rhs) {
        (BinaryOperator::Add, Integer(a), Integer(b)) => Integer(a.wrapping_add(b)),
        (BinaryOperator::Subtract, Integer(a), Integer(b)) => Integer(a.wrapping_sub(b)),
        (BinaryOperator::Multiply, Integer(a), Integer(b)) => Integer(a.wrapping_mul(b)),
        (BinaryOperator::Add, ..) => Real(as_real(lhs) + as_real(rhs)),
        (BinaryOperator::Subtract, ..) => Real(as_real(lhs) - as_real(rhs)),
        (BinaryOperator::Multiply, ..) => Real(as_real(lhs) * as_real(rhs)),
        (BinaryOperator::Divide, ..) => Real(as_real(lhs) / as_real(rhs)),
        // Division by zero and `MIN DIV -1` trap on the target
        (BinaryOperator::IntegerDivide, Integer(a), Integer(b)) => Integer(a.checked_div(b)?),
        (BinaryOperator::Modulus, Integer(a), Integer(b)) => Integer(a.checked_rem(b)?),
        (BinaryOperator::And, Integer(a), Integer(b)) => Integer((a != 0 && b != 0) as i64),
        (BinaryOperator::Or, Integer(a), Integer(b)) => Integer((a != 0 || b != 0) as i64),
        (
            BinaryOperator::IntegerDivide
            | BinaryOperator::Modulus
            | BinaryOperator::And
            | BinaryOperator::Or,
            ..,
        ) => return None,
    };

    Some(value)
}
