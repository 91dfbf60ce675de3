//! Bundled Diesel programs. There is no parser in this crate, so each sample
//! declares its symbols and builds its bodies directly, the way the parser
//! would: inner bodies are compiled (and their scopes closed) before the
//! body that declares them.

use crate::{
    driver::Session,
    frontend::{
        Position,
        ast::{BinaryOperator, Body, ElsIf, Expression, RelationOperator, Statement, UnaryOperator},
    },
    middle::symbol_table::{Builtins, ConstantValue, SymbolId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Sample {
    /// Constant folding and integer arithmetic, prints `14`
    Arithmetic,
    /// A counting `while` loop, prints `0123456789`
    Loops,
    /// Procedures reaching variables of enclosing levels, prints `22`
    Nested,
    /// A recursive function with a parameter, prints `6`
    Functions,
    /// Real arithmetic, implicit casts and `trunc`, prints `6+`
    Reals,
    /// Filling and summing an array, prints `285`
    Arrays,
    /// Echoes its input up to the first `.`
    Echo,
    /// Ill-typed on purpose, every statement reports a diagnostic
    Errors,
}

impl Sample {
    /// Declares and compiles the whole sample, returning the outermost
    /// procedure
    pub fn compile(self, session: &mut Session) -> SymbolId {
        let builtins = session.symbols().builtins();
        let program = session.symbols_mut().enter_procedure(&self.to_string());
        session.symbols_mut().open_scope(program);

        let statements = match self {
            Sample::Arithmetic => arithmetic(session, builtins),
            Sample::Loops => loops(session, builtins),
            Sample::Nested => nested(session, builtins),
            Sample::Functions => functions(session, builtins),
            Sample::Reals => reals(session, builtins),
            Sample::Arrays => arrays(session, builtins),
            Sample::Echo => echo(session, builtins),
            Sample::Errors => errors(session, builtins),
        };

        compile_body(session, program, line(1), statements);

        program
    }
}

/* Building blocks */

fn line(line: u32) -> Position {
    Position::new(line, 5)
}

fn compile_body(session: &mut Session, environment: SymbolId, position: Position, statements: Vec<Statement>) {
    let mut body = Body::new(environment, position, statements);
    session.compile_body(&mut body);
    session.symbols_mut().close_scope();
}

fn integer(at: Position, value: i64) -> Expression {
    Expression::integer(at, value)
}

fn name(at: Position, symbol: SymbolId) -> Expression {
    Expression::identifier(at, symbol)
}

fn binary(at: Position, operator: BinaryOperator, lhs: Expression, rhs: Expression) -> Expression {
    Expression::binary(at, operator, lhs, rhs)
}

fn relation(at: Position, operator: RelationOperator, lhs: Expression, rhs: Expression) -> Expression {
    Expression::relation(at, operator, lhs, rhs)
}

fn assign(at: Position, target: SymbolId, value: Expression) -> Statement {
    Statement::assign(at, name(at, target), value)
}

/// `target := target + 1`
fn increment(at: Position, target: SymbolId) -> Statement {
    assign(
        at,
        target,
        binary(at, BinaryOperator::Add, name(at, target), integer(at, 1)),
    )
}

fn write(at: Position, builtins: Builtins, character: Expression) -> Statement {
    Statement::procedure_call(at, builtins.write, vec![character])
}

/// Writes a single decimal digit
fn write_digit(at: Position, builtins: Builtins, digit: Expression) -> Statement {
    write(
        at,
        builtins,
        binary(at, BinaryOperator::Add, integer(at, '0' as i64), digit),
    )
}

fn newline(at: Position, builtins: Builtins) -> Statement {
    write(at, builtins, integer(at, '\n' as i64))
}

/* Samples */

fn arithmetic(session: &mut Session, builtins: Builtins) -> Vec<Statement> {
    let symbols = session.symbols_mut();
    let ten = symbols.enter_constant("ten", ConstantValue::Integer(10));
    let x = symbols.enter_variable("x", SymbolId::INTEGER);

    vec![
        assign(
            line(5),
            x,
            binary(
                line(5),
                BinaryOperator::Add,
                integer(line(5), 2),
                binary(line(5), BinaryOperator::Multiply, integer(line(5), 3), integer(line(5), 4)),
            ),
        ),
        write_digit(
            line(6),
            builtins,
            binary(line(6), BinaryOperator::IntegerDivide, name(line(6), x), name(line(6), ten)),
        ),
        write_digit(
            line(7),
            builtins,
            binary(line(7), BinaryOperator::Modulus, name(line(7), x), name(line(7), ten)),
        ),
        newline(line(8), builtins),
    ]
}

fn loops(session: &mut Session, builtins: Builtins) -> Vec<Statement> {
    let i = session.symbols_mut().enter_variable("i", SymbolId::INTEGER);

    vec![
        assign(line(4), i, integer(line(4), 0)),
        Statement::while_loop(
            line(5),
            relation(line(5), RelationOperator::LessThan, name(line(5), i), integer(line(5), 10)),
            vec![
                write_digit(line(6), builtins, name(line(6), i)),
                increment(line(7), i),
            ],
        ),
        newline(line(9), builtins),
    ]
}

fn nested(session: &mut Session, builtins: Builtins) -> Vec<Statement> {
    let depth = session.symbols_mut().enter_variable("depth", SymbolId::INTEGER);

    let outer = session.symbols_mut().enter_procedure("outer");
    session.symbols_mut().open_scope(outer);
    let x = session.symbols_mut().enter_variable("x", SymbolId::INTEGER);

    let inner = session.symbols_mut().enter_procedure("inner");
    session.symbols_mut().open_scope(inner);
    compile_body(
        session,
        inner,
        line(8),
        vec![increment(line(9), x), increment(line(10), depth)],
    );

    compile_body(
        session,
        outer,
        line(12),
        vec![
            assign(line(13), x, integer(line(13), 0)),
            Statement::procedure_call(line(14), inner, Vec::new()),
            Statement::procedure_call(line(15), inner, Vec::new()),
            write_digit(line(16), builtins, name(line(16), x)),
        ],
    );

    vec![
        assign(line(20), depth, integer(line(20), 0)),
        Statement::procedure_call(line(21), outer, Vec::new()),
        write_digit(line(22), builtins, name(line(22), depth)),
        newline(line(23), builtins),
    ]
}

fn functions(session: &mut Session, builtins: Builtins) -> Vec<Statement> {
    let fact = session.symbols_mut().enter_function("fact", SymbolId::INTEGER);
    session.symbols_mut().open_scope(fact);
    let n = session.symbols_mut().enter_parameter("n", SymbolId::INTEGER);

    compile_body(
        session,
        fact,
        line(3),
        vec![
            Statement::if_then(
                line(4),
                relation(line(4), RelationOperator::LessThan, name(line(4), n), integer(line(4), 2)),
                vec![Statement::return_value(line(5), Some(integer(line(5), 1)))],
                Vec::new(),
                None,
            ),
            Statement::return_value(
                line(7),
                Some(binary(
                    line(7),
                    BinaryOperator::Multiply,
                    name(line(7), n),
                    Expression::call(
                        line(7),
                        fact,
                        vec![binary(line(7), BinaryOperator::Subtract, name(line(7), n), integer(line(7), 1))],
                    ),
                )),
            ),
        ],
    );

    vec![
        write_digit(
            line(11),
            builtins,
            Expression::call(line(11), fact, vec![integer(line(11), 3)]),
        ),
        newline(line(12), builtins),
    ]
}

fn reals(session: &mut Session, builtins: Builtins) -> Vec<Statement> {
    let symbols = session.symbols_mut();
    let pi = symbols.enter_constant("pi", ConstantValue::Real(3.14159));
    let r = symbols.enter_variable("r", SymbolId::REAL);
    let i = symbols.enter_variable("i", SymbolId::INTEGER);

    let compare = |operator| relation(line(8), operator, name(line(8), r), Expression::real(line(8), 6.0));

    vec![
        // The integer literal is widened before the multiplication
        assign(
            line(5),
            r,
            binary(line(5), BinaryOperator::Multiply, name(line(5), pi), integer(line(5), 2)),
        ),
        assign(
            line(6),
            i,
            Expression::call(line(6), builtins.trunc, vec![name(line(6), r)]),
        ),
        write_digit(line(7), builtins, name(line(7), i)),
        Statement::if_then(
            line(8),
            compare(RelationOperator::GreaterThan),
            vec![write(line(9), builtins, integer(line(9), '+' as i64))],
            vec![ElsIf::new(
                line(10),
                compare(RelationOperator::Equal),
                vec![write(line(11), builtins, integer(line(11), '=' as i64))],
            )],
            Some(vec![write(line(13), builtins, integer(line(13), '-' as i64))]),
        ),
        newline(line(15), builtins),
    ]
}

fn arrays(session: &mut Session, builtins: Builtins) -> Vec<Statement> {
    let symbols = session.symbols_mut();
    let v = symbols.enter_array("v", SymbolId::INTEGER, 10);
    let i = symbols.enter_variable("i", SymbolId::INTEGER);
    let sum = symbols.enter_variable("sum", SymbolId::INTEGER);

    let element = |at| Expression::indexed(at, v, name(at, i));
    let below_ten = |at| relation(at, RelationOperator::LessThan, name(at, i), integer(at, 10));

    let digit = |at, divisor| {
        binary(
            at,
            BinaryOperator::Modulus,
            binary(at, BinaryOperator::IntegerDivide, name(at, sum), integer(at, divisor)),
            integer(at, 10),
        )
    };

    vec![
        assign(line(5), i, integer(line(5), 0)),
        Statement::while_loop(
            line(6),
            below_ten(line(6)),
            vec![
                Statement::assign(
                    line(7),
                    element(line(7)),
                    binary(line(7), BinaryOperator::Multiply, name(line(7), i), name(line(7), i)),
                ),
                increment(line(8), i),
            ],
        ),
        assign(line(10), sum, integer(line(10), 0)),
        assign(line(11), i, integer(line(11), 0)),
        Statement::while_loop(
            line(12),
            below_ten(line(12)),
            vec![
                assign(
                    line(13),
                    sum,
                    binary(line(13), BinaryOperator::Add, name(line(13), sum), element(line(13))),
                ),
                increment(line(14), i),
            ],
        ),
        write_digit(line(16), builtins, digit(line(16), 100)),
        write_digit(line(17), builtins, digit(line(17), 10)),
        write_digit(line(18), builtins, digit(line(18), 1)),
        newline(line(19), builtins),
    ]
}

fn echo(session: &mut Session, builtins: Builtins) -> Vec<Statement> {
    let c = session.symbols_mut().enter_variable("c", SymbolId::INTEGER);
    let read = |at| Expression::call(at, builtins.read, Vec::new());

    vec![
        assign(line(4), c, read(line(4))),
        Statement::while_loop(
            line(5),
            relation(line(5), RelationOperator::NotEqual, name(line(5), c), integer(line(5), '.' as i64)),
            vec![
                write(line(6), builtins, name(line(6), c)),
                assign(line(7), c, read(line(7))),
            ],
        ),
        newline(line(9), builtins),
    ]
}

fn errors(session: &mut Session, builtins: Builtins) -> Vec<Statement> {
    let f = session.symbols_mut().enter_function("f", SymbolId::INTEGER);
    session.symbols_mut().open_scope(f);
    let a = session.symbols_mut().enter_parameter("a", SymbolId::INTEGER);
    let r = session.symbols_mut().enter_variable("r", SymbolId::REAL);

    // No return anywhere, on top of the statement level errors
    compile_body(
        session,
        f,
        line(3),
        vec![
            assign(line(4), a, Expression::real(line(4), 1.5)),
            Statement::while_loop(line(5), name(line(5), r), Vec::new()),
            Statement::procedure_call(line(6), builtins.write, vec![integer(line(6), 1), integer(line(6), 2)]),
            assign(
                line(7),
                a,
                Expression::unary(line(7), UnaryOperator::Not, name(line(7), r)),
            ),
        ],
    );

    vec![Statement::procedure_call(line(10), f, vec![integer(line(10), 1)])]
}
