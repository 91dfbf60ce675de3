//! Lowers a type checked (and optionally folded) body into quads.
//!
//! Every expression yields the symbol holding its value: identifiers yield
//! themselves, everything else gets a fresh temporary in the activation
//! record of the body being lowered. Ill-typed trees are lowered on a best
//! effort basis and never abort here.

use crate::{
    frontend::ast::{
        BinaryOperator, Body, ElsIf, Expression, ExpressionKind, RelationOperator, Statement,
        StatementKind, UnaryOperator,
    },
    middle::{
        quads::{Operand, QuadList, QuadOp, Quadruple},
        symbol_table::{SymbolId, SymbolTable},
    },
};

pub struct QuadGenerator<'a> {
    symbols: &'a mut SymbolTable,
    quads: QuadList,
}

impl<'a> QuadGenerator<'a> {
    /// Lowers a whole body. The scope of the body's environment must be the
    /// current one, temporaries are allocated in it.
    pub fn lower_body(symbols: &'a mut SymbolTable, body: &Body) -> QuadList {
        assert_eq!(
            symbols.current_environment(),
            body.environment,
            "quads must be generated inside the scope of the body being lowered"
        );

        let return_label = symbols.next_label();
        let mut generator = Self {
            symbols,
            quads: QuadList::new(return_label),
        };

        generator.lower_statements(&body.statements);
        generator.quads.push(Quadruple::label(return_label));

        generator.quads
    }

    fn emit(&mut self, op: QuadOp, first: impl Into<Operand>, second: impl Into<Operand>, third: impl Into<Operand>) {
        self.quads.push(Quadruple::new(op, first, second, third));
    }

    /* Statements */

    fn lower_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.lower_statement(statement);
        }
    }

    fn lower_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Assign { target, value } => {
                let value = self.lower_expression(value);
                self.lower_assignment(target, value);
            }
            StatementKind::ProcedureCall {
                procedure,
                arguments,
            } => {
                self.lower_call(*procedure, arguments, Operand::None);
            }
            StatementKind::While { condition, body } => {
                let top = self.symbols.next_label();
                let bottom = self.symbols.next_label();

                self.quads.push(Quadruple::label(top));
                let condition = self.lower_expression(condition);
                self.quads.push(Quadruple::jump_if_false(bottom, condition));
                self.lower_statements(body);
                self.quads.push(Quadruple::jump(top));
                self.quads.push(Quadruple::label(bottom));
            }
            StatementKind::If {
                condition,
                body,
                elsif,
                else_body,
            } => {
                let skip = self.symbols.next_label();
                let condition = self.lower_expression(condition);
                self.quads.push(Quadruple::jump_if_false(skip, condition));
                self.lower_statements(body);

                if elsif.is_empty() && else_body.is_none() {
                    self.quads.push(Quadruple::label(skip));
                    return;
                }

                let end = self.symbols.next_label();
                self.quads.push(Quadruple::jump(end));
                self.quads.push(Quadruple::label(skip));

                for ElsIf { condition, body, .. } in elsif {
                    let skip = self.symbols.next_label();
                    let condition = self.lower_expression(condition);
                    self.quads.push(Quadruple::jump_if_false(skip, condition));
                    self.lower_statements(body);
                    self.quads.push(Quadruple::jump(end));
                    self.quads.push(Quadruple::label(skip));
                }

                if let Some(else_body) = else_body {
                    self.lower_statements(else_body);
                }

                self.quads.push(Quadruple::label(end));
            }
            StatementKind::Return(None) => {
                self.quads.push(Quadruple::jump(self.quads.return_label()));
            }
            StatementKind::Return(Some(value)) => {
                let result = self.lower_expression(value);
                let op = if value.ty == SymbolId::REAL {
                    QuadOp::Rreturn
                } else {
                    QuadOp::Ireturn
                };

                self.emit(op, self.quads.return_label(), result, Operand::None);
            }
        }
    }

    fn lower_assignment(&mut self, target: &Expression, value: SymbolId) {
        let is_real = target.ty == SymbolId::REAL;

        match &target.kind {
            ExpressionKind::Identifier(symbol) => {
                let op = if is_real { QuadOp::Rassign } else { QuadOp::Iassign };
                self.emit(op, value, Operand::None, *symbol);
            }
            ExpressionKind::Indexed { array, index } => {
                let index = self.lower_expression(index);
                let address = self.symbols.gen_temp_var(SymbolId::INTEGER);
                self.emit(QuadOp::Lindex, *array, index, address);

                let op = if is_real { QuadOp::Rstore } else { QuadOp::Istore };
                self.emit(op, value, Operand::None, address);
            }
            kind => panic!("cannot assign to {kind:?}"),
        }
    }

    /// Pushes the arguments last to first and emits the call. Calls to
    /// something that is not callable were already reported and are dropped.
    fn lower_call(&mut self, callee: SymbolId, arguments: &[Expression], destination: Operand) {
        if !self.symbols[callee].is_callable() {
            return;
        }

        for argument in arguments.iter().rev() {
            let argument = self.lower_expression(argument);
            self.emit(QuadOp::Param, argument, Operand::None, Operand::None);
        }

        self.emit(
            QuadOp::Call,
            callee,
            Operand::Immediate(arguments.len() as i64),
            destination,
        );
    }

    /* Expressions */

    fn lower_expression(&mut self, expression: &Expression) -> SymbolId {
        let ty = expression.ty;

        match &expression.kind {
            ExpressionKind::Integer(value) => {
                let result = self.symbols.gen_temp_var(SymbolId::INTEGER);
                self.emit(QuadOp::Iload, Operand::Immediate(*value), Operand::None, result);
                result
            }
            ExpressionKind::Real(value) => {
                let result = self.symbols.gen_temp_var(SymbolId::REAL);
                let bits = self.symbols.ieee(*value);
                self.emit(QuadOp::Rload, Operand::Immediate(bits), Operand::None, result);
                result
            }
            ExpressionKind::Identifier(symbol) => *symbol,
            ExpressionKind::Indexed { array, index } => {
                let index = self.lower_expression(index);
                let result = self.symbols.gen_temp_var(ty);
                let op = if ty == SymbolId::REAL {
                    QuadOp::Rrindex
                } else {
                    QuadOp::Irindex
                };

                self.emit(op, *array, index, result);
                result
            }
            ExpressionKind::FunctionCall {
                function,
                arguments,
            } => {
                let result = self.symbols.gen_temp_var(ty);
                self.lower_call(*function, arguments, Operand::Symbol(result));
                result
            }
            ExpressionKind::Unary { operator, operand } => {
                let operand = self.lower_expression(operand);

                let (op, result_type) = match operator {
                    UnaryOperator::Not => (QuadOp::Inot, SymbolId::INTEGER),
                    UnaryOperator::Negate if ty == SymbolId::REAL => (QuadOp::Ruminus, SymbolId::REAL),
                    UnaryOperator::Negate => (QuadOp::Iuminus, SymbolId::INTEGER),
                };

                let result = self.symbols.gen_temp_var(result_type);
                self.emit(op, operand, Operand::None, result);
                result
            }
            ExpressionKind::Binary { operator, lhs, rhs } => {
                let both_integer = lhs.ty == SymbolId::INTEGER && rhs.ty == SymbolId::INTEGER;
                let lhs = self.lower_expression(lhs);
                let rhs = self.lower_expression(rhs);

                let (op, result_type) = binary_op(*operator, both_integer);
                let result = self.symbols.gen_temp_var(result_type);
                self.emit(op, lhs, rhs, result);
                result
            }
            ExpressionKind::Relation { operator, lhs, rhs } => {
                let both_integer = lhs.ty == SymbolId::INTEGER && rhs.ty == SymbolId::INTEGER;
                let lhs = self.lower_expression(lhs);
                let rhs = self.lower_expression(rhs);

                let result = self.symbols.gen_temp_var(SymbolId::INTEGER);
                self.emit(relation_op(*operator, both_integer), lhs, rhs, result);
                result
            }
            ExpressionKind::Cast(inner) => {
                let inner = self.lower_expression(inner);
                let result = self.symbols.gen_temp_var(SymbolId::REAL);
                self.emit(QuadOp::Itor, inner, Operand::None, result);
                result
            }
        }
    }
}

/// Picks the opcode for a binary operation and the type of its result
fn binary_op(operator: BinaryOperator, both_integer: bool) -> (QuadOp, SymbolId) {
    use SymbolId as T;

    match (operator, both_integer) {
        (BinaryOperator::Add, true) => (QuadOp::Iplus, T::INTEGER),
        (BinaryOperator::Add, false) => (QuadOp::Rplus, T::REAL),
        (BinaryOperator::Subtract, true) => (QuadOp::Iminus, T::INTEGER),
        (BinaryOperator::Subtract, false) => (QuadOp::Rminus, T::REAL),
        (BinaryOperator::Multiply, true) => (QuadOp::Imult, T::INTEGER),
        (BinaryOperator::Multiply, false) => (QuadOp::Rmult, T::REAL),
        (BinaryOperator::Divide, _) => (QuadOp::Rdivide, T::REAL),
        (BinaryOperator::IntegerDivide, _) => (QuadOp::Idivide, T::INTEGER),
        (BinaryOperator::Modulus, _) => (QuadOp::Imod, T::INTEGER),
        (BinaryOperator::And, _) => (QuadOp::Iand, T::INTEGER),
        (BinaryOperator::Or, _) => (QuadOp::Ior, T::INTEGER),
    }
}

fn relation_op(operator: RelationOperator, both_integer: bool) -> QuadOp {
    match (operator, both_integer) {
        (RelationOperator::Equal, true) => QuadOp::Ieq,
        (RelationOperator::Equal, false) => QuadOp::Req,
        (RelationOperator::NotEqual, true) => QuadOp::Ine,
        (RelationOperator::NotEqual, false) => QuadOp::Rne,
        (RelationOperator::LessThan, true) => QuadOp::Ilt,
        (RelationOperator::LessThan, false) => QuadOp::Rlt,
        (RelationOperator::GreaterThan, true) => QuadOp::Igt,
        (RelationOperator::GreaterThan, false) => QuadOp::Rgt,
    }
}
