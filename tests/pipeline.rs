use indoc::indoc;

use dieselc::{
    backend::{
        CodegenOptions,
        targets::{CodeGenerator, Target},
    },
    driver::{CompilerOptions, Session},
    frontend::{
        Position,
        ast::{
            BinaryOperator, Body, ElsIf, Expression, ExpressionKind, RelationOperator, Statement,
            StatementKind, UnaryOperator,
        },
    },
    middle::{
        diagnostics::{Diagnostics, SemanticErrorKind},
        optimization::optimize_body,
        quads::{Operand, QuadList, QuadOp, Quadruple, ast_lowering::QuadGenerator},
        symbol_table::{ConstantValue, SymbolId, SymbolKind, SymbolTable},
        type_checker::TypeChecker,
    },
};

fn at(line: u32) -> Position {
    Position::new(line, 1)
}

/// Runs the middle end over a body whose scope is the current one
fn lower(symbols: &mut SymbolTable, body: &mut Body) -> (QuadList, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    TypeChecker::check_body(symbols, &mut diagnostics, body);
    optimize_body(symbols, body);

    (QuadGenerator::lower_body(symbols, body), diagnostics)
}

fn generate(symbols: &mut SymbolTable, environment: SymbolId, quads: &QuadList) -> String {
    Target::default()
        .get_code_generator()
        .generate_body(symbols, environment, quads, &CodegenOptions::default())
}

#[test]
fn arithmetic_is_folded_before_lowering() {
    let mut symbols = SymbolTable::new();
    let program = symbols.enter_procedure("program");
    symbols.open_scope(program);
    let x = symbols.enter_variable("x", SymbolId::INTEGER);

    let value = Expression::binary(
        at(2),
        BinaryOperator::Add,
        Expression::integer(at(2), 2),
        Expression::binary(
            at(2),
            BinaryOperator::Multiply,
            Expression::integer(at(2), 3),
            Expression::integer(at(2), 4),
        ),
    );
    let mut body = Body::new(
        program,
        at(1),
        vec![Statement::assign(at(2), Expression::identifier(at(2), x), value)],
    );

    let (quads, diagnostics) = lower(&mut symbols, &mut body);

    assert!(diagnostics.is_empty());
    assert_eq!(
        quads.ops().collect::<Vec<_>>(),
        vec![QuadOp::Iload, QuadOp::Iassign, QuadOp::Labl]
    );
    assert_eq!(quads[0].first, Operand::Immediate(14));
    assert_eq!(quads[1].third, Operand::Symbol(x));
}

#[test]
fn while_loops_use_two_labels() {
    let mut symbols = SymbolTable::new();
    let program = symbols.enter_procedure("program");
    symbols.open_scope(program);
    let i = symbols.enter_variable("i", SymbolId::INTEGER);

    let condition = Expression::relation(
        at(2),
        RelationOperator::LessThan,
        Expression::identifier(at(2), i),
        Expression::integer(at(2), 10),
    );
    let increment = Statement::assign(
        at(3),
        Expression::identifier(at(3), i),
        Expression::binary(
            at(3),
            BinaryOperator::Add,
            Expression::identifier(at(3), i),
            Expression::integer(at(3), 1),
        ),
    );
    let mut body = Body::new(
        program,
        at(1),
        vec![Statement::while_loop(at(2), condition, vec![increment])],
    );

    let (quads, _) = lower(&mut symbols, &mut body);

    let labels: Vec<_> = quads
        .iter()
        .filter(|quad| quad.op == QuadOp::Labl)
        .map(|quad| quad.first.label())
        .filter(|label| *label != quads.return_label())
        .collect();
    assert_eq!(labels.len(), 2);

    let jmpf = quads.iter().find(|quad| quad.op == QuadOp::Jmpf).expect("conditional jump");
    let last_jump = quads
        .iter()
        .rposition(|quad| quad.op == QuadOp::Jmp)
        .expect("jump back to the top");

    assert_eq!(quads[last_jump].first.label(), labels[0]);
    assert_eq!(quads[last_jump + 1], Quadruple::label(jmpf.first.label()));
}

#[test]
fn arguments_are_pushed_last_to_first() {
    let mut symbols = SymbolTable::new();
    let program = symbols.enter_procedure("program");
    symbols.open_scope(program);

    let p = symbols.enter_procedure("p");
    symbols.open_scope(p);
    for name in ["a", "b", "c"] {
        symbols.enter_parameter(name, SymbolId::INTEGER);
    }
    symbols.close_scope();

    let variables: Vec<_> = ["x", "y", "z"]
        .into_iter()
        .map(|name| symbols.enter_variable(name, SymbolId::INTEGER))
        .collect();

    let arguments = variables
        .iter()
        .map(|variable| Expression::identifier(at(2), *variable))
        .collect();
    let mut body = Body::new(program, at(1), vec![Statement::procedure_call(at(2), p, arguments)]);

    let (quads, diagnostics) = lower(&mut symbols, &mut body);
    assert!(diagnostics.is_empty());

    let pushed: Vec<_> = quads
        .iter()
        .filter(|quad| quad.op == QuadOp::Param)
        .map(|quad| quad.first.symbol())
        .collect();
    assert_eq!(pushed, variables.into_iter().rev().collect::<Vec<_>>());

    let assembly = generate(&mut symbols, program, &quads);
    assert!(assembly.contains("\t\tadd rsp, 24\n"));
}

#[test]
fn nested_bodies_address_through_the_display() {
    let mut symbols = SymbolTable::new();
    let program = symbols.enter_procedure("program");
    symbols.open_scope(program);
    let outer_variable = symbols.enter_variable("outer_variable", SymbolId::INTEGER);

    let inner = symbols.enter_procedure("inner");
    symbols.open_scope(inner);
    let local = symbols.enter_variable("local", SymbolId::INTEGER);

    let mut body = Body::new(
        inner,
        at(1),
        vec![Statement::assign(
            at(2),
            Expression::identifier(at(2), local),
            Expression::identifier(at(2), outer_variable),
        )],
    );

    let (quads, _) = lower(&mut symbols, &mut body);
    let inner_label = symbols[inner].callable().label;
    let return_label = quads.return_label();
    let assembly = generate(&mut symbols, inner, &quads);

    let expected = format!(
        indoc! {"
            {}:\t\t\t# inner
            \t\tpush rbp
            \t\tmov rcx, rsp
            \t\tpush [rbp-8]
            \t\tpush rcx
            \t\tmov rbp, rcx
            \t\tsub rsp, 8
            \t\tmov rcx, [rbp-8]
            \t\tmov rax, [rcx-16]
            \t\tmov rcx, [rbp-16]
            \t\tmov [rcx-24], rax
            {}:
            \t\tleave
            \t\tret
        "},
        inner_label, return_label
    );

    assert_eq!(assembly, expected);
}

#[test]
fn level_two_procedures_copy_two_display_entries() {
    let mut symbols = SymbolTable::new();
    let program = symbols.enter_procedure("program");
    symbols.open_scope(program);
    let outer = symbols.enter_procedure("outer");
    symbols.open_scope(outer);
    let inner = symbols.enter_procedure("inner");
    symbols.open_scope(inner);

    assert_eq!(symbols[inner].level, 2);

    let mut body = Body::new(inner, at(1), Vec::new());
    let (quads, _) = lower(&mut symbols, &mut body);
    let assembly = generate(&mut symbols, inner, &quads);

    let copies: Vec<_> = assembly
        .lines()
        .filter(|line| line.trim_start().starts_with("push [rbp-"))
        .map(str::trim)
        .collect();
    assert_eq!(copies, vec!["push [rbp-8]", "push [rbp-16]"]);
}

#[test]
fn functions_must_return_on_some_path() {
    let mut symbols = SymbolTable::new();
    let f = symbols.enter_function("f", SymbolId::INTEGER);
    symbols.open_scope(f);
    let n = symbols.enter_parameter("n", SymbolId::INTEGER);

    let mut missing = Body::new(
        f,
        at(1),
        vec![Statement::assign(
            at(2),
            Expression::identifier(at(2), n),
            Expression::integer(at(2), 0),
        )],
    );
    let mut diagnostics = Diagnostics::new();
    assert_eq!(TypeChecker::check_body(&symbols, &mut diagnostics, &mut missing), 1);
    assert_eq!(diagnostics.errors()[0].kind, SemanticErrorKind::MissingReturn);

    let mut returning = Body::new(
        f,
        at(1),
        vec![Statement::if_then(
            at(2),
            Expression::identifier(at(2), n),
            vec![Statement::return_value(at(3), Some(Expression::integer(at(3), 1)))],
            Vec::new(),
            Some(vec![Statement::return_value(at(5), Some(Expression::integer(at(5), 0)))]),
        )],
    );
    let mut diagnostics = Diagnostics::new();
    assert_eq!(TypeChecker::check_body(&symbols, &mut diagnostics, &mut returning), 0);
}

#[test]
fn constants_reach_the_assembly_as_immediates() {
    let mut session = Session::new(CompilerOptions::default(), Target::default());
    let program = session.symbols_mut().enter_procedure("program");
    session.symbols_mut().open_scope(program);
    let limit = session
        .symbols_mut()
        .enter_constant("limit", ConstantValue::Integer(7));
    let x = session.symbols_mut().enter_variable("x", SymbolId::INTEGER);

    let mut body = Body::new(
        program,
        at(1),
        vec![Statement::assign(
            at(2),
            Expression::identifier(at(2), x),
            Expression::identifier(at(2), limit),
        )],
    );
    session.compile_body(&mut body);
    session.symbols_mut().close_scope();

    assert!(session.bodies()[0].contains("\t\tmov rax, 7\n"));

    let program_text = session.finish(program);
    assert!(program_text.contains(".intel_syntax noprefix"));
    assert!(program_text.ends_with(".section .note.GNU-stack,\"\",@progbits\n"));
}

/// Collects every expression of a statement list, children included
fn expressions<'a>(statements: &'a [Statement], found: &mut Vec<&'a Expression>) {
    fn visit<'a>(expression: &'a Expression, found: &mut Vec<&'a Expression>) {
        found.push(expression);

        match &expression.kind {
            ExpressionKind::Integer(_) | ExpressionKind::Real(_) | ExpressionKind::Identifier(_) => {}
            ExpressionKind::Indexed { index, .. } => visit(index, found),
            ExpressionKind::FunctionCall { arguments, .. } => {
                arguments.iter().for_each(|argument| visit(argument, found))
            }
            ExpressionKind::Unary { operand, .. } => visit(operand, found),
            ExpressionKind::Binary { lhs, rhs, .. } | ExpressionKind::Relation { lhs, rhs, .. } => {
                visit(lhs, found);
                visit(rhs, found);
            }
            ExpressionKind::Cast(inner) => visit(inner, found),
        }
    }

    for statement in statements {
        match &statement.kind {
            StatementKind::Assign { target, value } => {
                visit(target, found);
                visit(value, found);
            }
            StatementKind::ProcedureCall { arguments, .. } => {
                arguments.iter().for_each(|argument| visit(argument, found))
            }
            StatementKind::While { condition, body } => {
                visit(condition, found);
                expressions(body, found);
            }
            StatementKind::If {
                condition,
                body,
                elsif,
                else_body,
            } => {
                visit(condition, found);
                expressions(body, found);
                for branch in elsif {
                    visit(&branch.condition, found);
                    expressions(&branch.body, found);
                }
                if let Some(else_body) = else_body {
                    expressions(else_body, found);
                }
            }
            StatementKind::Return(value) => {
                if let Some(value) = value {
                    visit(value, found);
                }
            }
        }
    }
}

#[test]
fn checked_trees_only_carry_known_types() {
    let mut symbols = SymbolTable::new();
    let program = symbols.enter_procedure("program");
    symbols.open_scope(program);

    let g = symbols.enter_function("g", SymbolId::REAL);
    symbols.open_scope(g);
    symbols.enter_parameter("a", SymbolId::INTEGER);
    symbols.enter_parameter("b", SymbolId::REAL);
    symbols.close_scope();

    let color = symbols.enter_nametype("color");
    let i = symbols.enter_variable("i", SymbolId::INTEGER);
    let r = symbols.enter_variable("r", SymbolId::REAL);
    let v = symbols.enter_array("v", SymbolId::REAL, 10);
    let write = symbols.builtins().write;

    let id = |line, symbol| Expression::identifier(at(line), symbol);
    let integer = |line, value| Expression::integer(at(line), value);

    // r := g(i + 1, v[i]) + i
    let call = Expression::call(
        at(2),
        g,
        vec![
            Expression::binary(at(2), BinaryOperator::Add, id(2, i), integer(2, 1)),
            Expression::indexed(at(2), v, id(2, i)),
        ],
    );
    let first = Statement::assign(
        at(2),
        id(2, r),
        Expression::binary(at(2), BinaryOperator::Add, call, id(2, i)),
    );

    // v[i * 2] := -r / 2
    let second = Statement::assign(
        at(3),
        Expression::indexed(
            at(3),
            v,
            Expression::binary(at(3), BinaryOperator::Multiply, id(3, i), integer(3, 2)),
        ),
        Expression::binary(
            at(3),
            BinaryOperator::Divide,
            Expression::unary(at(3), UnaryOperator::Negate, id(3, r)),
            integer(3, 2),
        ),
    );

    // while NOT (i < r) do i := i MOD 3
    let third = Statement::while_loop(
        at(4),
        Expression::unary(
            at(4),
            UnaryOperator::Not,
            Expression::relation(at(4), RelationOperator::LessThan, id(4, i), id(4, r)),
        ),
        vec![Statement::assign(
            at(5),
            id(5, i),
            Expression::binary(at(5), BinaryOperator::Modulus, id(5, i), integer(5, 3)),
        )],
    );

    // if color = color then write(i) elsif i > 0 then r := 1 else r := 2.0
    let fourth = Statement::if_then(
        at(6),
        Expression::relation(at(6), RelationOperator::Equal, id(6, color), id(6, color)),
        vec![Statement::procedure_call(at(7), write, vec![id(7, i)])],
        vec![ElsIf::new(
            at(8),
            Expression::relation(at(8), RelationOperator::GreaterThan, id(8, i), integer(8, 0)),
            vec![Statement::assign(at(9), id(9, r), integer(9, 1))],
        )],
        Some(vec![Statement::assign(at(11), id(11, r), Expression::real(at(11), 2.0))]),
    );

    let mut body = Body::new(program, at(1), vec![first, second, third, fourth]);
    let mut diagnostics = Diagnostics::new();
    TypeChecker::check_body(&symbols, &mut diagnostics, &mut body);
    assert!(diagnostics.is_empty());

    let mut found = Vec::new();
    expressions(&body.statements, &mut found);

    for expression in &found {
        let ty = expression.ty;
        assert!(
            [SymbolId::INTEGER, SymbolId::REAL, SymbolId::VOID].contains(&ty)
                || symbols[ty].kind == SymbolKind::NameType,
            "{expression:?} has type {}",
            symbols.name(ty)
        );
    }

    // `+ i`, `/ 2`, `i <` and `:= 1` are widened
    let casts: Vec<_> = found
        .iter()
        .filter_map(|expression| match &expression.kind {
            ExpressionKind::Cast(inner) => Some(inner),
            _ => None,
        })
        .collect();
    assert_eq!(casts.len(), 4);
    assert!(casts.iter().all(|inner| inner.ty == SymbolId::INTEGER));

    let arguments: Vec<_> = found
        .iter()
        .filter_map(|expression| match &expression.kind {
            ExpressionKind::FunctionCall { arguments, .. } => Some(arguments),
            _ => None,
        })
        .flatten()
        .map(|argument| argument.ty)
        .collect();
    assert_eq!(arguments, vec![SymbolId::INTEGER, SymbolId::REAL]);

    let colors = found.iter().filter(|expression| expression.ty == color).count();
    assert_eq!(colors, 2);
}
