//! The symbol table consumed by every pass. It owns the scope stack, the
//! monotonic label and temporary counters and the per-callable activation
//! record bookkeeping. Nothing here knows about source text: the front end
//! enters symbols as it parses and hands out [`SymbolId`]s in the AST.

use crate::{
    frontend::intern::InternedSymbol,
    index::{Index, IndexVec, simple_index},
};

/// Every value (integer, real, address, array element) occupies one machine
/// word on the target
pub const WORD_SIZE: u32 = 8;

simple_index! {
    /// Identifies a symbol. Types are symbols too (named types), so this also
    /// serves as the type of every expression.
    pub struct SymbolId;
}

impl SymbolId {
    pub const VOID: Self = Self(0);
    pub const INTEGER: Self = Self(1);
    pub const REAL: Self = Self(2);
}

simple_index! {
    /// A label number in the generated assembly (`L<n>`). Unique across the
    /// whole compilation unit.
    pub struct LabelId;
}

impl core::fmt::Display for LabelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.index())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: InternedSymbol,
    /// Declared type. Named types (and procedures) have type `void`
    pub ty: SymbolId,
    /// Lexical nesting level of the scope the symbol was declared in
    pub level: u32,
    /// Byte offset inside the owning activation record (or parameter area)
    pub offset: u32,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SymbolKind {
    Undefined,
    Constant(ConstantValue),
    Variable,
    Array { cardinality: u32 },
    Parameter { size: u32 },
    Procedure(Callable),
    Function(Callable),
    NameType,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantValue {
    Integer(i64),
    Real(f64),
}

/// Shared by procedures and functions
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    pub label: LabelId,
    /// Bytes of locals and temporaries, grows while the body is compiled
    pub ar_size: u32,
    /// Formal parameters in declaration order
    pub parameters: Vec<SymbolId>,
}

impl Symbol {
    pub fn is_callable(&self) -> bool {
        matches!(self.kind, SymbolKind::Procedure(_) | SymbolKind::Function(_))
    }

    #[track_caller]
    pub fn callable(&self) -> &Callable {
        match &self.kind {
            SymbolKind::Procedure(callable) | SymbolKind::Function(callable) => callable,
            kind => panic!(
                "symbol `{}` is a {kind}, expected a procedure or function",
                self.name
            ),
        }
    }

    #[track_caller]
    fn callable_mut(&mut self) -> &mut Callable {
        match &mut self.kind {
            SymbolKind::Procedure(callable) | SymbolKind::Function(callable) => callable,
            kind => panic!(
                "symbol `{}` is a {kind}, expected a procedure or function",
                self.name
            ),
        }
    }

    pub fn constant_value(&self) -> Option<ConstantValue> {
        match self.kind {
            SymbolKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Size of a parameter in the argument area
    #[track_caller]
    pub fn parameter_size(&self) -> u32 {
        match self.kind {
            SymbolKind::Parameter { size } => size,
            ref kind => panic!("symbol `{}` is a {kind}, expected a parameter", self.name),
        }
    }
}

/// The predefined callables every program can use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtins {
    /// `function read() : integer`, one character from standard input
    pub read: SymbolId,
    /// `procedure write(c : integer)`, one character to standard output
    pub write: SymbolId,
    /// `function trunc(r : real) : integer`
    pub trunc: SymbolId,
}

#[derive(Debug)]
pub struct SymbolTable {
    symbols: IndexVec<SymbolId, Symbol>,
    /// Environments of the currently open scopes, innermost last. The global
    /// scope (level 0) is implicit and has no environment.
    scopes: Vec<SymbolId>,
    next_label: LabelId,
    next_temporary: u32,
    builtins: Builtins,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            symbols: IndexVec::new(),
            scopes: Vec::new(),
            next_label: LabelId::new(1),
            next_temporary: 1,
            builtins: Builtins {
                read: SymbolId::VOID,
                write: SymbolId::VOID,
                trunc: SymbolId::VOID,
            },
        };

        // The order matters, these land on the reserved ids
        let void = table.enter_nametype("void");
        let integer = table.enter_nametype("integer");
        let real = table.enter_nametype("real");
        debug_assert_eq!(
            (void, integer, real),
            (SymbolId::VOID, SymbolId::INTEGER, SymbolId::REAL)
        );

        let read = table.enter_function("read", SymbolId::INTEGER);

        let write = table.enter_procedure("write");
        table.open_scope(write);
        table.enter_parameter("c", SymbolId::INTEGER);
        table.close_scope();

        let trunc = table.enter_function("trunc", SymbolId::INTEGER);
        table.open_scope(trunc);
        table.enter_parameter("r", SymbolId::REAL);
        table.close_scope();

        table.builtins = Builtins { read, write, trunc };
        table
    }

    pub fn builtins(&self) -> Builtins {
        self.builtins
    }

    /// Converts a real literal to the 64-bit pattern the target loads as an
    /// immediate
    pub fn ieee(&self, value: f64) -> i64 {
        value.to_bits() as i64
    }

    /* Scopes */

    pub fn current_level(&self) -> u32 {
        self.scopes.len() as u32
    }

    #[track_caller]
    pub fn current_environment(&self) -> SymbolId {
        *self
            .scopes
            .last()
            .expect("no procedure or function scope is open")
    }

    /// Enters the body scope of a procedure or function. Symbols entered
    /// afterwards live one level deeper than the callable itself.
    #[track_caller]
    pub fn open_scope(&mut self, environment: SymbolId) {
        assert!(
            self.symbols[environment].is_callable(),
            "cannot open a scope for non-callable symbol `{}`",
            self.symbols[environment].name
        );

        self.scopes.push(environment);
    }

    #[track_caller]
    pub fn close_scope(&mut self) -> SymbolId {
        self.scopes.pop().expect("closed more scopes than were opened")
    }

    /* Counters */

    pub fn next_label(&mut self) -> LabelId {
        let label = self.next_label;
        self.next_label.increment_by(1);
        label
    }

    /// Allocates a fresh temporary in the current activation record
    pub fn gen_temp_var(&mut self, ty: SymbolId) -> SymbolId {
        let name = format!("${}", self.next_temporary);
        self.next_temporary += 1;

        self.enter_variable(&name, ty)
    }

    /* Declarations */

    fn push_symbol(&mut self, name: &str, ty: SymbolId, offset: u32, kind: SymbolKind) -> SymbolId {
        let id = self.symbols.next_index();
        self.symbols.push(Symbol {
            id,
            name: InternedSymbol::new(name),
            ty,
            level: self.current_level(),
            offset,
            kind,
        })
    }

    /// Reserves `size` bytes in the activation record of the current
    /// environment, returning the offset of the reserved area
    fn allocate(&mut self, size: u32) -> u32 {
        let environment = self.current_environment();
        let callable = self.symbols[environment].callable_mut();

        let offset = callable.ar_size;
        callable.ar_size += size;
        offset
    }

    pub fn enter_constant(&mut self, name: &str, value: ConstantValue) -> SymbolId {
        let ty = match value {
            ConstantValue::Integer(_) => SymbolId::INTEGER,
            ConstantValue::Real(_) => SymbolId::REAL,
        };

        self.push_symbol(name, ty, 0, SymbolKind::Constant(value))
    }

    #[track_caller]
    pub fn enter_variable(&mut self, name: &str, ty: SymbolId) -> SymbolId {
        let offset = self.allocate(WORD_SIZE);
        self.push_symbol(name, ty, offset, SymbolKind::Variable)
    }

    #[track_caller]
    pub fn enter_array(&mut self, name: &str, element_type: SymbolId, cardinality: u32) -> SymbolId {
        let offset = self.allocate(WORD_SIZE * cardinality);
        self.push_symbol(name, element_type, offset, SymbolKind::Array { cardinality })
    }

    /// Appends a formal parameter to the current environment
    #[track_caller]
    pub fn enter_parameter(&mut self, name: &str, ty: SymbolId) -> SymbolId {
        let environment = self.current_environment();
        let offset = self.symbols[environment]
            .callable()
            .parameters
            .iter()
            .map(|parameter| self.symbols[*parameter].parameter_size())
            .sum();

        let id = self.push_symbol(name, ty, offset, SymbolKind::Parameter { size: WORD_SIZE });
        self.symbols[environment].callable_mut().parameters.push(id);
        id
    }

    pub fn enter_procedure(&mut self, name: &str) -> SymbolId {
        let label = self.next_label();
        self.push_symbol(
            name,
            SymbolId::VOID,
            0,
            SymbolKind::Procedure(Callable {
                label,
                ar_size: 0,
                parameters: Vec::new(),
            }),
        )
    }

    pub fn enter_function(&mut self, name: &str, return_type: SymbolId) -> SymbolId {
        let label = self.next_label();
        self.push_symbol(
            name,
            return_type,
            0,
            SymbolKind::Function(Callable {
                label,
                ar_size: 0,
                parameters: Vec::new(),
            }),
        )
    }

    pub fn enter_nametype(&mut self, name: &str) -> SymbolId {
        self.push_symbol(name, SymbolId::VOID, 0, SymbolKind::NameType)
    }

    /* Rendering */

    /// Name of a symbol, used in dumps and assembly comments
    pub fn name(&self, id: SymbolId) -> &'static str {
        self.symbols[id].name.value()
    }
}

impl core::ops::Index<SymbolId> for SymbolTable {
    type Output = Symbol;

    fn index(&self, index: SymbolId) -> &Self::Output {
        &self.symbols[index]
    }
}
