//! User facing semantic errors. These are collected, never fatal: the type
//! checker keeps walking after reporting one so that a single compilation
//! can surface as many problems as possible.

use colored::Colorize;

use crate::{
    frontend::{Position, ast::BinaryOperator, intern::InternedSymbol},
    middle::symbol_table::SymbolKind,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticError {
    pub position: Position,
    pub kind: SemanticErrorKind,
    /// Where in the analyzer the error was raised
    #[cfg(feature = "error-backtrace")]
    pub origin: ErrorOrigin,
}

#[cfg(feature = "error-backtrace")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorOrigin {
    pub module: &'static str,
    pub function: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SemanticErrorKind {
    /* Expressions */
    VoidOperands { operator: BinaryOperator },
    VoidRelation,
    NonIntegerOperands { operator: BinaryOperator },
    VoidNegation,
    NonIntegerNegation,
    NonIntegerIndex,
    /* Statements */
    RealAssignedToInteger,
    NonIntegerCondition { construct: ConditionalConstruct },
    /* Calls */
    NotCallable { name: InternedSymbol, kind: String },
    NotAFunction { name: InternedSymbol, kind: String },
    MoreFormalsThanActuals,
    MoreActualsThanFormals,
    ParameterTypeMismatch,
    /* Returns */
    MissingReturn,
    MissingReturnValue,
    ProcedureReturnsValue,
    BadReturnType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConditionalConstruct {
    While,
    If,
    ElsIf,
}

impl SemanticErrorKind {
    pub fn not_callable(name: InternedSymbol, kind: &SymbolKind) -> Self {
        Self::NotCallable {
            name,
            kind: kind.to_string(),
        }
    }

    pub fn not_a_function(name: InternedSymbol, kind: &SymbolKind) -> Self {
        Self::NotAFunction {
            name,
            kind: kind.to_string(),
        }
    }
}

impl core::fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VoidOperands { operator } => {
                write!(f, "binary operation `{operator}` with void operands")
            }
            Self::VoidRelation => f.write_str("binary relation with void operands"),
            Self::NonIntegerOperands { operator } => {
                write!(f, "integer operation `{operator}` with non-integer operands")
            }
            Self::VoidNegation => f.write_str("unary minus applied to a void operand"),
            Self::NonIntegerNegation => f.write_str("logical negation of a non-integer operand"),
            Self::NonIntegerIndex => f.write_str("array index is not of integer type"),
            Self::RealAssignedToInteger => {
                f.write_str("cannot assign a real value to an integer variable")
            }
            Self::NonIntegerCondition { construct } => {
                write!(f, "{construct} condition must be of integer type")
            }
            Self::NotCallable { name, kind } => {
                write!(f, "`{name}` is a {kind}, not a procedure or function")
            }
            Self::NotAFunction { name, kind } => {
                write!(f, "`{name}` is a {kind}, not of function type")
            }
            Self::MoreFormalsThanActuals => f.write_str("more formal than actual parameters"),
            Self::MoreActualsThanFormals => f.write_str("more actual than formal parameters"),
            Self::ParameterTypeMismatch => {
                f.write_str("type discrepancy between formal and actual parameters")
            }
            Self::MissingReturn => f.write_str("a function must return a value"),
            Self::MissingReturnValue => f.write_str("must return a value from a function"),
            Self::ProcedureReturnsValue => f.write_str("procedures may not return a value"),
            Self::BadReturnType => f.write_str("bad return type from function"),
        }
    }
}

impl SemanticError {
    /// Renders the error the way it is shown to the user
    pub fn render(&self) -> String {
        let message = format!(
            "{}: {} {}",
            "error".red(),
            self.kind,
            format!("(at {})", self.position).white()
        );

        #[cfg(feature = "error-backtrace")]
        let message = format!(
            "{}: {}\n{}",
            "backtrace".blue(),
            format!(
                "{}::{} {}",
                self.origin.module,
                self.origin.function,
                format!(
                    "(at {}:{}:{})",
                    self.origin.file, self.origin.line, self.origin.column
                )
                .white()
            ),
            message
        );

        message
    }
}

/// Collects semantic errors across all bodies of a compilation unit
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<SemanticError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: SemanticError) {
        tracing::debug!(position = %error.position, "semantic error: {}", error.kind);
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[SemanticError] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Prints every collected error to stderr
    pub fn emit(&self) {
        for error in &self.errors {
            eprintln!("{}", error.render());
        }
    }
}

/// Expands to the name of the enclosing function
macro_rules! function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        type_name_of(f)
            .rsplit("::")
            .find(|&part| part != "f" && part != "{{closure}}")
            .unwrap_or("<unknown>")
    }};
}

/// Builds a [`SemanticError`] at the call site and hands it to
/// `$self.report_error`
macro_rules! report_error {
    ($self:expr, $position:expr, $kind:expr $(,)?) => {{
        let error = $crate::middle::diagnostics::SemanticError {
            position: $position,
            kind: $kind,
            #[cfg(feature = "error-backtrace")]
            origin: $crate::middle::diagnostics::ErrorOrigin {
                module: module_path!(),
                function: $crate::middle::diagnostics::function!(),
                file: file!(),
                line: line!(),
                column: column!(),
            },
        };

        $self.report_error(error)
    }};
}

pub(crate) use function;
pub(crate) use report_error;
