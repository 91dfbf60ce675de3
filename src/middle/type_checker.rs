//! Semantic analysis of one procedure or function body.
//!
//! Every expression node gets its synthesized type written back into the
//! tree and integer operands that meet a real are wrapped in explicit cast
//! nodes. Problems are reported to [`Diagnostics`] and the walk continues.

use crate::{
    frontend::{
        Position,
        ast::{BinaryOperator, Body, ElsIf, Expression, ExpressionKind, Statement, StatementKind, UnaryOperator},
    },
    middle::{
        diagnostics::{ConditionalConstruct, Diagnostics, SemanticError, SemanticErrorKind, report_error},
        symbol_table::{SymbolId, SymbolKind, SymbolTable},
    },
};

pub struct TypeChecker<'a> {
    symbols: &'a SymbolTable,
    /// The procedure or function whose body is being checked
    environment: SymbolId,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> TypeChecker<'a> {
    /// Type checks a whole body in place, returning the number of errors
    /// reported for it
    pub fn check_body(symbols: &'a SymbolTable, diagnostics: &'a mut Diagnostics, body: &mut Body) -> usize {
        let errors_before = diagnostics.error_count();

        let mut checker = Self {
            symbols,
            environment: body.environment,
            diagnostics,
        };

        let saw_return = checker.check_statements(&mut body.statements);

        // Every other return problem is caught at the return statement itself
        if matches!(symbols[body.environment].kind, SymbolKind::Function(_)) && !saw_return {
            let position = body
                .statements
                .last()
                .map(|statement| statement.position)
                .unwrap_or(body.position);

            report_error!(checker, position, SemanticErrorKind::MissingReturn);
        }

        checker.diagnostics.error_count() - errors_before
    }

    fn report_error(&mut self, error: SemanticError) {
        self.diagnostics.push(error);
    }

    /* Statements */

    /// Returns whether a `return` statement was seen anywhere in the list
    fn check_statements(&mut self, statements: &mut [Statement]) -> bool {
        statements
            .iter_mut()
            .fold(false, |saw_return, statement| self.check_statement(statement) || saw_return)
    }

    fn check_statement(&mut self, statement: &mut Statement) -> bool {
        let position = statement.position;

        match &mut statement.kind {
            StatementKind::Assign { target, value } => {
                let target_type = self.check_expression(target);
                let value_type = self.check_expression(value);

                if target_type == SymbolId::INTEGER && value_type == SymbolId::REAL {
                    report_error!(self, value.position, SemanticErrorKind::RealAssignedToInteger);
                } else if target_type == SymbolId::REAL && value_type == SymbolId::INTEGER {
                    value.wrap_in_cast();
                }

                false
            }
            StatementKind::ProcedureCall { procedure, arguments } => {
                let callee = &self.symbols[*procedure];

                if callee.is_callable() {
                    self.check_parameters(*procedure, position, arguments);
                } else {
                    report_error!(
                        self,
                        position,
                        SemanticErrorKind::not_callable(callee.name, &callee.kind)
                    );
                    self.check_arguments(arguments);
                }

                false
            }
            StatementKind::While { condition, body } => {
                self.check_condition(condition, ConditionalConstruct::While);
                self.check_statements(body)
            }
            StatementKind::If {
                condition,
                body,
                elsif,
                else_body,
            } => {
                self.check_condition(condition, ConditionalConstruct::If);
                let mut saw_return = self.check_statements(body);

                for ElsIf { condition, body, .. } in elsif {
                    self.check_condition(condition, ConditionalConstruct::ElsIf);
                    saw_return |= self.check_statements(body);
                }

                if let Some(else_body) = else_body {
                    saw_return |= self.check_statements(else_body);
                }

                saw_return
            }
            StatementKind::Return(value) => {
                self.check_return(position, value.as_deref_mut());
                true
            }
        }
    }

    fn check_condition(&mut self, condition: &mut Expression, construct: ConditionalConstruct) {
        if self.check_expression(condition) != SymbolId::INTEGER {
            report_error!(
                self,
                condition.position,
                SemanticErrorKind::NonIntegerCondition { construct }
            );
        }
    }

    fn check_return(&mut self, position: Position, value: Option<&mut Expression>) {
        let environment = &self.symbols[self.environment];

        let Some(value) = value else {
            if !matches!(environment.kind, SymbolKind::Procedure(_)) {
                report_error!(self, position, SemanticErrorKind::MissingReturnValue);
            }
            return;
        };

        let value_type = self.check_expression(value);

        if !matches!(environment.kind, SymbolKind::Function(_)) {
            report_error!(self, position, SemanticErrorKind::ProcedureReturnsValue);
        } else if environment.ty != value_type {
            report_error!(self, value.position, SemanticErrorKind::BadReturnType);
        }
    }

    /* Calls */

    fn check_arguments(&mut self, arguments: &mut [Expression]) -> Vec<SymbolId> {
        arguments
            .iter_mut()
            .map(|argument| self.check_expression(argument))
            .collect()
    }

    /// Compares the actual arguments of a call against the callee's formal
    /// parameters in declaration order. A count mismatch is reported on its
    /// own; otherwise only the first mismatching pair is reported.
    fn check_parameters(&mut self, callee: SymbolId, position: Position, arguments: &mut [Expression]) {
        let actual_types = self.check_arguments(arguments);
        let formals = &self.symbols[callee].callable().parameters;

        if formals.len() > arguments.len() {
            report_error!(self, position, SemanticErrorKind::MoreFormalsThanActuals);
            return;
        }

        if arguments.len() > formals.len() {
            let first_extra = arguments[formals.len()].position;
            report_error!(self, first_extra, SemanticErrorKind::MoreActualsThanFormals);
            return;
        }

        let mismatch = formals
            .iter()
            .zip(actual_types)
            .position(|(formal, actual_type)| self.symbols[*formal].ty != actual_type);

        if let Some(index) = mismatch {
            report_error!(
                self,
                arguments[index].position,
                SemanticErrorKind::ParameterTypeMismatch
            );
        }
    }

    /* Expressions */

    fn check_expression(&mut self, expression: &mut Expression) -> SymbolId {
        let position = expression.position;

        let ty = match &mut expression.kind {
            ExpressionKind::Integer(_) => SymbolId::INTEGER,
            ExpressionKind::Real(_) => SymbolId::REAL,
            ExpressionKind::Identifier(symbol) => {
                let symbol = &self.symbols[*symbol];

                match symbol.kind {
                    // Named types are compared as values, so they stand for
                    // themselves
                    SymbolKind::NameType => symbol.id,
                    _ => symbol.ty,
                }
            }
            ExpressionKind::Indexed { array, index } => {
                if self.check_expression(index) != SymbolId::INTEGER {
                    report_error!(self, position, SemanticErrorKind::NonIntegerIndex);
                }

                self.symbols[*array].ty
            }
            ExpressionKind::FunctionCall { function, arguments } => {
                let callee = &self.symbols[*function];

                if let SymbolKind::Function(_) = callee.kind {
                    self.check_parameters(*function, position, arguments);
                    callee.ty
                } else {
                    report_error!(
                        self,
                        position,
                        SemanticErrorKind::not_a_function(callee.name, &callee.kind)
                    );
                    self.check_arguments(arguments);
                    SymbolId::VOID
                }
            }
            ExpressionKind::Unary {
                operator: UnaryOperator::Negate,
                operand,
            } => {
                let operand_type = self.check_expression(operand);

                if operand_type == SymbolId::VOID {
                    report_error!(self, position, SemanticErrorKind::VoidNegation);
                }

                operand_type
            }
            ExpressionKind::Unary {
                operator: UnaryOperator::Not,
                operand,
            } => {
                if self.check_expression(operand) != SymbolId::INTEGER {
                    report_error!(self, position, SemanticErrorKind::NonIntegerNegation);
                }

                SymbolId::INTEGER
            }
            ExpressionKind::Binary { operator, lhs, rhs } => {
                let operator = *operator;
                let lhs_type = self.check_expression(lhs);
                let rhs_type = self.check_expression(rhs);

                match operator {
                    BinaryOperator::Add | BinaryOperator::Subtract | BinaryOperator::Multiply => {
                        if lhs_type == SymbolId::VOID || rhs_type == SymbolId::VOID {
                            report_error!(self, position, SemanticErrorKind::VoidOperands { operator });
                        }

                        Self::promote(lhs, lhs_type, rhs, rhs_type)
                    }
                    BinaryOperator::Divide => {
                        if lhs_type == SymbolId::INTEGER {
                            lhs.wrap_in_cast();
                        }
                        if rhs_type == SymbolId::INTEGER {
                            rhs.wrap_in_cast();
                        }

                        SymbolId::REAL
                    }
                    BinaryOperator::IntegerDivide
                    | BinaryOperator::Modulus
                    | BinaryOperator::And
                    | BinaryOperator::Or => {
                        if lhs_type != SymbolId::INTEGER || rhs_type != SymbolId::INTEGER {
                            report_error!(
                                self,
                                position,
                                SemanticErrorKind::NonIntegerOperands { operator }
                            );
                        }

                        SymbolId::INTEGER
                    }
                }
            }
            ExpressionKind::Relation { lhs, rhs, .. } => {
                let lhs_type = self.check_expression(lhs);
                let rhs_type = self.check_expression(rhs);

                if lhs_type == SymbolId::VOID || rhs_type == SymbolId::VOID {
                    report_error!(self, position, SemanticErrorKind::VoidRelation);
                }

                Self::promote(lhs, lhs_type, rhs, rhs_type);
                SymbolId::INTEGER
            }
            ExpressionKind::Cast(inner) => {
                self.check_expression(inner);
                SymbolId::REAL
            }
        };

        expression.ty = ty;
        ty
    }

    /// Applies the implicit integer to real widening to a pair of operands,
    /// returning the type of the combination
    fn promote(
        lhs: &mut Expression,
        lhs_type: SymbolId,
        rhs: &mut Expression,
        rhs_type: SymbolId,
    ) -> SymbolId {
        if lhs_type == rhs_type {
            return lhs_type;
        }

        if lhs_type == SymbolId::REAL && rhs_type == SymbolId::INTEGER {
            rhs.wrap_in_cast();
        } else if lhs_type == SymbolId::INTEGER && rhs_type == SymbolId::REAL {
            lhs.wrap_in_cast();
        }

        SymbolId::REAL
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::middle::symbol_table::ConstantValue;

    fn at(line: u32) -> Position {
        Position::new(line, 1)
    }

    struct Fixture {
        symbols: SymbolTable,
        program: SymbolId,
        i: SymbolId,
        r: SymbolId,
        v: SymbolId,
    }

    fn fixture() -> Fixture {
        let mut symbols = SymbolTable::new();
        let program = symbols.enter_procedure("program");
        symbols.open_scope(program);

        let i = symbols.enter_variable("i", SymbolId::INTEGER);
        let r = symbols.enter_variable("r", SymbolId::REAL);
        let v = symbols.enter_array("v", SymbolId::REAL, 10);

        Fixture {
            symbols,
            program,
            i,
            r,
            v,
        }
    }

    fn check(symbols: &SymbolTable, environment: SymbolId, statements: Vec<Statement>) -> (Body, Vec<SemanticErrorKind>) {
        let mut diagnostics = Diagnostics::new();
        let mut body = Body {
            environment,
            position: at(1),
            statements,
        };

        TypeChecker::check_body(symbols, &mut diagnostics, &mut body);

        let kinds = diagnostics.errors().iter().map(|error| error.kind.clone()).collect();
        (body, kinds)
    }

    fn assigned_value(body: &Body, index: usize) -> &Expression {
        match &body.statements[index].kind {
            StatementKind::Assign { value, .. } => value,
            kind => panic!("expected an assignment, found {kind:?}"),
        }
    }

    #[test]
    fn mixed_arithmetic_casts_the_integer_side() {
        let f = fixture();
        let sum = Expression::binary(
            at(2),
            BinaryOperator::Add,
            Expression::identifier(at(2), f.i),
            Expression::identifier(at(2), f.r),
        );

        let (body, errors) = check(
            &f.symbols,
            f.program,
            vec![Statement::assign(at(2), Expression::identifier(at(2), f.r), sum)],
        );

        assert!(errors.is_empty());
        let value = assigned_value(&body, 0);
        assert_eq!(value.ty, SymbolId::REAL);
        let ExpressionKind::Binary { lhs, rhs, .. } = &value.kind else {
            panic!("expected a binary operation");
        };
        assert!(matches!(lhs.kind, ExpressionKind::Cast(_)));
        assert_eq!(rhs.kind, ExpressionKind::Identifier(f.r));
    }

    #[test]
    fn division_always_yields_real() {
        let f = fixture();
        let quotient = Expression::binary(
            at(2),
            BinaryOperator::Divide,
            Expression::integer(at(2), 7),
            Expression::identifier(at(2), f.i),
        );

        let (body, errors) = check(
            &f.symbols,
            f.program,
            vec![Statement::assign(at(2), Expression::identifier(at(2), f.r), quotient)],
        );

        assert!(errors.is_empty());
        let ExpressionKind::Binary { lhs, rhs, .. } = &assigned_value(&body, 0).kind else {
            panic!("expected a binary operation");
        };
        assert!(matches!(lhs.kind, ExpressionKind::Cast(_)));
        assert!(matches!(rhs.kind, ExpressionKind::Cast(_)));
    }

    #[rstest]
    #[case(BinaryOperator::IntegerDivide)]
    #[case(BinaryOperator::Modulus)]
    #[case(BinaryOperator::And)]
    #[case(BinaryOperator::Or)]
    fn integer_operators_reject_reals(#[case] operator: BinaryOperator) {
        let f = fixture();
        let expression = Expression::binary(
            at(3),
            operator,
            Expression::identifier(at(3), f.i),
            Expression::real(at(3), 1.5),
        );

        let (_, errors) = check(
            &f.symbols,
            f.program,
            vec![Statement::assign(at(3), Expression::identifier(at(3), f.i), expression)],
        );

        assert_eq!(errors, vec![SemanticErrorKind::NonIntegerOperands { operator }]);
    }

    #[test]
    fn relation_is_integer_and_promotes() {
        let f = fixture();
        let relation = Expression::relation(
            at(2),
            crate::frontend::ast::RelationOperator::LessThan,
            Expression::identifier(at(2), f.r),
            Expression::integer(at(2), 3),
        );

        let (body, errors) = check(
            &f.symbols,
            f.program,
            vec![Statement::assign(at(2), Expression::identifier(at(2), f.i), relation)],
        );

        assert!(errors.is_empty());
        let value = assigned_value(&body, 0);
        assert_eq!(value.ty, SymbolId::INTEGER);
        let ExpressionKind::Relation { rhs, .. } = &value.kind else {
            panic!("expected a relation");
        };
        assert!(matches!(rhs.kind, ExpressionKind::Cast(_)));
    }

    #[test]
    fn assignment_widening_and_narrowing() {
        let f = fixture();

        let (body, errors) = check(
            &f.symbols,
            f.program,
            vec![
                Statement::assign(at(2), Expression::identifier(at(2), f.r), Expression::integer(at(2), 1)),
                Statement::assign(at(3), Expression::identifier(at(3), f.i), Expression::real(at(3), 1.0)),
            ],
        );

        assert!(matches!(assigned_value(&body, 0).kind, ExpressionKind::Cast(_)));
        assert_eq!(errors, vec![SemanticErrorKind::RealAssignedToInteger]);
    }

    #[test]
    fn indexing_requires_an_integer_index() {
        let f = fixture();
        let element = Expression::indexed(at(4), f.v, Expression::identifier(at(4), f.r));

        let (body, errors) = check(
            &f.symbols,
            f.program,
            vec![Statement::assign(at(4), Expression::identifier(at(4), f.r), element)],
        );

        assert_eq!(errors, vec![SemanticErrorKind::NonIntegerIndex]);
        assert_eq!(assigned_value(&body, 0).ty, SymbolId::REAL);
    }

    #[rstest]
    #[case(ConditionalConstruct::While)]
    #[case(ConditionalConstruct::If)]
    fn conditions_must_be_integer(#[case] construct: ConditionalConstruct) {
        let f = fixture();
        let condition = Expression::identifier(at(5), f.r);
        let statement = match construct {
            ConditionalConstruct::While => Statement::while_loop(at(5), condition, vec![]),
            _ => Statement::if_then(at(5), condition, vec![], vec![], None),
        };

        let (_, errors) = check(&f.symbols, f.program, vec![statement]);

        assert_eq!(errors, vec![SemanticErrorKind::NonIntegerCondition { construct }]);
    }

    #[test]
    fn unary_operators() {
        let f = fixture();

        let (body, errors) = check(
            &f.symbols,
            f.program,
            vec![
                Statement::assign(
                    at(2),
                    Expression::identifier(at(2), f.r),
                    Expression::unary(at(2), UnaryOperator::Negate, Expression::identifier(at(2), f.r)),
                ),
                Statement::assign(
                    at(3),
                    Expression::identifier(at(3), f.i),
                    Expression::unary(at(3), UnaryOperator::Not, Expression::identifier(at(3), f.r)),
                ),
            ],
        );

        assert_eq!(assigned_value(&body, 0).ty, SymbolId::REAL);
        assert_eq!(assigned_value(&body, 1).ty, SymbolId::INTEGER);
        assert_eq!(errors, vec![SemanticErrorKind::NonIntegerNegation]);
    }

    #[test]
    fn named_type_identifier_is_its_own_type() {
        let f = fixture();
        let mut diagnostics = Diagnostics::new();
        let mut checker = TypeChecker {
            symbols: &f.symbols,
            environment: f.program,
            diagnostics: &mut diagnostics,
        };

        let mut expression = Expression::identifier(at(1), SymbolId::REAL);
        assert_eq!(checker.check_expression(&mut expression), SymbolId::REAL);

        let mut expression = Expression::identifier(at(1), f.i);
        assert_eq!(checker.check_expression(&mut expression), SymbolId::INTEGER);
    }

    #[test]
    fn function_without_return_is_reported_once() {
        let mut f = fixture();
        let g = f.symbols.enter_function("g", SymbolId::INTEGER);
        f.symbols.open_scope(g);
        let local = f.symbols.enter_variable("x", SymbolId::INTEGER);

        let (_, errors) = check(
            &f.symbols,
            g,
            vec![
                Statement::assign(at(2), Expression::identifier(at(2), local), Expression::integer(at(2), 1)),
                Statement::while_loop(at(3), Expression::integer(at(3), 0), vec![]),
            ],
        );

        assert_eq!(errors, vec![SemanticErrorKind::MissingReturn]);
    }

    #[test]
    fn missing_return_points_at_the_end_of_the_body() {
        let mut f = fixture();
        let g = f.symbols.enter_function("g", SymbolId::INTEGER);
        f.symbols.open_scope(g);
        let local = f.symbols.enter_variable("x", SymbolId::INTEGER);

        let mut diagnostics = Diagnostics::new();
        let mut body = Body {
            environment: g,
            position: at(1),
            statements: vec![
                Statement::assign(at(2), Expression::identifier(at(2), local), Expression::integer(at(2), 1)),
                Statement::while_loop(at(5), Expression::integer(at(5), 0), vec![]),
                Statement::assign(at(9), Expression::identifier(at(9), local), Expression::integer(at(9), 2)),
            ],
        };
        TypeChecker::check_body(&f.symbols, &mut diagnostics, &mut body);

        assert_eq!(diagnostics.errors().len(), 1);
        assert_eq!(diagnostics.errors()[0].position, at(9));

        let mut empty = Body {
            environment: g,
            position: at(12),
            statements: vec![],
        };
        let mut diagnostics = Diagnostics::new();
        TypeChecker::check_body(&f.symbols, &mut diagnostics, &mut empty);

        assert_eq!(diagnostics.errors()[0].position, at(12));
    }

    #[test]
    fn return_on_every_path_is_accepted() {
        let mut f = fixture();
        let g = f.symbols.enter_function("g", SymbolId::INTEGER);
        f.symbols.open_scope(g);

        let (_, errors) = check(
            &f.symbols,
            g,
            vec![Statement::if_then(
                at(2),
                Expression::integer(at(2), 1),
                vec![Statement::return_value(at(3), Some(Expression::integer(at(3), 1)))],
                vec![],
                Some(vec![Statement::return_value(at(5), Some(Expression::integer(at(5), 0)))]),
            )],
        );

        assert!(errors.is_empty());
    }

    #[test]
    fn return_errors_are_distinct() {
        let mut f = fixture();
        let g = f.symbols.enter_function("g", SymbolId::INTEGER);

        let (_, function_errors) = check(
            &f.symbols,
            g,
            vec![
                Statement::return_value(at(2), None),
                Statement::return_value(at(3), Some(Expression::real(at(3), 1.0))),
            ],
        );
        assert_eq!(
            function_errors,
            vec![SemanticErrorKind::MissingReturnValue, SemanticErrorKind::BadReturnType]
        );

        let (_, procedure_errors) = check(
            &f.symbols,
            f.program,
            vec![Statement::return_value(at(2), Some(Expression::integer(at(2), 1)))],
        );
        assert_eq!(procedure_errors, vec![SemanticErrorKind::ProcedureReturnsValue]);
    }

    #[test]
    fn parameter_checks() {
        let mut f = fixture();
        let p = f.symbols.enter_procedure("p");
        f.symbols.open_scope(p);
        f.symbols.enter_parameter("a", SymbolId::INTEGER);
        f.symbols.enter_parameter("b", SymbolId::REAL);
        f.symbols.close_scope();

        let call = |arguments: Vec<Expression>| Statement::procedure_call(at(7), p, arguments);

        let (_, errors) = check(
            &f.symbols,
            f.program,
            vec![
                call(vec![Expression::integer(at(7), 1), Expression::real(at(7), 1.0)]),
                call(vec![Expression::real(at(8), 1.0), Expression::integer(at(8), 1)]),
                call(vec![Expression::integer(at(9), 1)]),
                call(vec![
                    Expression::integer(at(10), 1),
                    Expression::real(at(10), 1.0),
                    Expression::integer(at(10), 2),
                ]),
            ],
        );

        assert_eq!(
            errors,
            vec![
                SemanticErrorKind::ParameterTypeMismatch,
                SemanticErrorKind::MoreFormalsThanActuals,
                SemanticErrorKind::MoreActualsThanFormals,
            ]
        );
    }

    #[test]
    fn calling_a_constant_is_reported() {
        let mut f = fixture();
        let limit = f.symbols.enter_constant("limit", ConstantValue::Integer(10));

        let (body, errors) = check(
            &f.symbols,
            f.program,
            vec![
                Statement::procedure_call(at(2), limit, vec![]),
                Statement::assign(
                    at(3),
                    Expression::identifier(at(3), f.i),
                    Expression::call(at(3), limit, vec![Expression::integer(at(3), 1)]),
                ),
            ],
        );

        assert!(matches!(errors[0], SemanticErrorKind::NotCallable { .. }));
        assert!(matches!(errors[1], SemanticErrorKind::NotAFunction { .. }));
        assert_eq!(assigned_value(&body, 1).ty, SymbolId::VOID);
    }
}
