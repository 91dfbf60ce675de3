//! The AST of one procedure or function body, as produced by the parser.
//!
//! All names are already resolved to [`SymbolId`]s. Every expression carries
//! a synthesized type slot which starts out as `void` and is filled in by the
//! type checker. Children are uniquely owned, so the passes that rewrite the
//! tree (cast insertion, constant folding) simply move a new node in.

use crate::{frontend::Position, middle::symbol_table::SymbolId};

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// The procedure or function this is the body of
    pub environment: SymbolId,
    pub position: Position,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub position: Position,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `target := value`. The target is an identifier or an indexed access
    Assign {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    ProcedureCall {
        procedure: SymbolId,
        arguments: Vec<Expression>,
    },
    While {
        condition: Box<Expression>,
        body: Vec<Statement>,
    },
    If {
        condition: Box<Expression>,
        body: Vec<Statement>,
        elsif: Vec<ElsIf>,
        else_body: Option<Vec<Statement>>,
    },
    Return(Option<Box<Expression>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElsIf {
    pub position: Position,
    pub condition: Box<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub position: Position,
    /// Synthesized type, `void` until the node has been type checked
    pub ty: SymbolId,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Integer(i64),
    Real(f64),
    Identifier(SymbolId),
    Indexed {
        array: SymbolId,
        index: Box<Expression>,
    },
    FunctionCall {
        function: SymbolId,
        arguments: Vec<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    /// Arithmetic and logical operations
    Binary {
        operator: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// Comparisons, always integer valued
    Relation {
        operator: RelationOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// Integer to real widening, only ever inserted by the type checker
    Cast(Box<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum UnaryOperator {
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "NOT")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "DIV")]
    IntegerDivide,
    #[strum(serialize = "MOD")]
    Modulus,
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
}

impl BinaryOperator {
    /// `AND OR DIV MOD` accept integer operands only
    pub fn is_integer_only(self) -> bool {
        matches!(
            self,
            Self::IntegerDivide | Self::Modulus | Self::And | Self::Or
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum RelationOperator {
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = "<>")]
    NotEqual,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = ">")]
    GreaterThan,
}

/* Constructors used by the parser (and the bundled samples) */

impl Expression {
    fn new(position: Position, kind: ExpressionKind) -> Self {
        Self {
            position,
            ty: SymbolId::VOID,
            kind,
        }
    }

    /// Literals know their type from the start
    pub fn integer(position: Position, value: i64) -> Self {
        Self {
            position,
            ty: SymbolId::INTEGER,
            kind: ExpressionKind::Integer(value),
        }
    }

    pub fn real(position: Position, value: f64) -> Self {
        Self {
            position,
            ty: SymbolId::REAL,
            kind: ExpressionKind::Real(value),
        }
    }

    pub fn identifier(position: Position, symbol: SymbolId) -> Self {
        Self::new(position, ExpressionKind::Identifier(symbol))
    }

    pub fn indexed(position: Position, array: SymbolId, index: Expression) -> Self {
        Self::new(
            position,
            ExpressionKind::Indexed {
                array,
                index: Box::new(index),
            },
        )
    }

    pub fn call(position: Position, function: SymbolId, arguments: Vec<Expression>) -> Self {
        Self::new(
            position,
            ExpressionKind::FunctionCall {
                function,
                arguments,
            },
        )
    }

    pub fn unary(position: Position, operator: UnaryOperator, operand: Expression) -> Self {
        Self::new(
            position,
            ExpressionKind::Unary {
                operator,
                operand: Box::new(operand),
            },
        )
    }

    pub fn binary(
        position: Position,
        operator: BinaryOperator,
        lhs: Expression,
        rhs: Expression,
    ) -> Self {
        Self::new(
            position,
            ExpressionKind::Binary {
                operator,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    pub fn relation(
        position: Position,
        operator: RelationOperator,
        lhs: Expression,
        rhs: Expression,
    ) -> Self {
        Self::new(
            position,
            ExpressionKind::Relation {
                operator,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    /// Wraps an integer expression in a widening cast
    pub fn cast(inner: Expression) -> Self {
        Self {
            position: inner.position,
            ty: SymbolId::REAL,
            kind: ExpressionKind::Cast(Box::new(inner)),
        }
    }

    /// Replaces `self` with a cast of its old value, in place
    pub fn wrap_in_cast(&mut self) {
        let inner = std::mem::replace(self, Expression::integer(self.position, 0));
        *self = Self::cast(inner);
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, ExpressionKind::Identifier(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExpressionKind::Integer(_) | ExpressionKind::Real(_))
    }
}

impl Body {
    pub fn new(environment: SymbolId, position: Position, statements: Vec<Statement>) -> Self {
        Self {
            environment,
            position,
            statements,
        }
    }
}

impl Statement {
    pub fn assign(position: Position, target: Expression, value: Expression) -> Self {
        Self {
            position,
            kind: StatementKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
            },
        }
    }

    pub fn procedure_call(position: Position, procedure: SymbolId, arguments: Vec<Expression>) -> Self {
        Self {
            position,
            kind: StatementKind::ProcedureCall {
                procedure,
                arguments,
            },
        }
    }

    pub fn while_loop(position: Position, condition: Expression, body: Vec<Statement>) -> Self {
        Self {
            position,
            kind: StatementKind::While {
                condition: Box::new(condition),
                body,
            },
        }
    }

    pub fn if_then(
        position: Position,
        condition: Expression,
        body: Vec<Statement>,
        elsif: Vec<ElsIf>,
        else_body: Option<Vec<Statement>>,
    ) -> Self {
        Self {
            position,
            kind: StatementKind::If {
                condition: Box::new(condition),
                body,
                elsif,
                else_body,
            },
        }
    }

    pub fn return_value(position: Position, value: Option<Expression>) -> Self {
        Self {
            position,
            kind: StatementKind::Return(value.map(Box::new)),
        }
    }
}

impl ElsIf {
    pub fn new(position: Position, condition: Expression, body: Vec<Statement>) -> Self {
        Self {
            position,
            condition: Box::new(condition),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_in_cast_keeps_the_original_node() {
        let position = Position::new(3, 7);
        let mut expression = Expression::integer(position, 42);

        expression.wrap_in_cast();

        assert_eq!(expression.ty, SymbolId::REAL);
        assert_eq!(expression.position, position);
        match expression.kind {
            ExpressionKind::Cast(inner) => {
                assert_eq!(inner.kind, ExpressionKind::Integer(42));
                assert_eq!(inner.ty, SymbolId::INTEGER);
            }
            kind => panic!("expected a cast, found {kind:?}"),
        }
    }

    #[test]
    fn operators_print_as_source_text() {
        assert_eq!(BinaryOperator::IntegerDivide.to_string(), "DIV");
        assert_eq!(RelationOperator::NotEqual.to_string(), "<>");
        assert_eq!(UnaryOperator::Not.to_string(), "NOT");
    }
}
