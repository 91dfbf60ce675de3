use crate::middle::symbol_table::{ConstantValue, LabelId, SymbolId, SymbolKind, SymbolTable, WORD_SIZE};

/// Rounds a frame size up to a whole number of words
pub fn align(frame_size: u32) -> u32 {
    frame_size.div_ceil(WORD_SIZE) * WORD_SIZE
}

/// Writes Intel syntax assembly text for one body, knowing how to address
/// any symbol through the display of the current activation record
pub struct Assembler<'a> {
    output: String,
    symbols: &'a mut SymbolTable,
}

impl<'a> Assembler<'a> {
    pub fn new(symbols: &'a mut SymbolTable) -> Self {
        Self {
            output: String::new(),
            symbols,
        }
    }

    pub fn into_output(self) -> String {
        self.output
    }

    pub fn symbols(&self) -> &SymbolTable {
        &*self.symbols
    }

    pub fn next_label(&mut self) -> LabelId {
        self.symbols.next_label()
    }

    fn push_line(&mut self, string: impl AsRef<str>) {
        self.output.push_str(string.as_ref());
        self.output.push('\n');
    }

    pub fn emit(&mut self, string: impl AsRef<str>) {
        self.output.push_str("\t\t");
        self.push_line(string);
    }

    /// A jump target at the start of the line
    pub fn label(&mut self, label: LabelId) {
        self.push_line(format!("{label}:"));
    }

    /// A jump target local to the expansion of one quad
    pub fn local_label(&mut self, label: LabelId) {
        self.emit(format!("{label}:"));
    }

    pub fn comment(&mut self, comment: impl AsRef<str>) {
        self.output.push('\t');
        self.push_line(format!("# {}", comment.as_ref()));
    }

    /// Entry of a procedure or function: saves the caller's frame pointer,
    /// copies the caller's display entries, installs the new frame as the
    /// innermost display entry and reserves room for locals and temporaries
    #[track_caller]
    pub fn function_prologue(&mut self, environment: SymbolId, trace: bool) {
        let symbol = &self.symbols[environment];
        let callable = symbol.callable();
        let (label, ar_size, level) = (callable.label, align(callable.ar_size), symbol.level);
        let name = symbol.name;

        self.push_line(format!("{label}:\t\t\t# {name}"));

        if trace {
            self.comment(format!("PROLOGUE ({name})"));
        }

        self.emit("push rbp");
        self.emit("mov rcx, rsp");

        for i in 1..=level {
            self.emit(format!("push [rbp-{}]", i * WORD_SIZE));
        }

        self.emit("push rcx");
        self.emit("mov rbp, rcx");
        self.emit(format!("sub rsp, {ar_size}"));
    }

    pub fn function_epilogue(&mut self, environment: SymbolId, trace: bool) {
        if trace {
            let name = self.symbols.name(environment);
            self.comment(format!("EPILOGUE ({name})"));
        }

        self.emit("leave");
        self.emit("ret");
    }

    /* Addressing */

    /// The lexical level a symbol lives at and its signed offset from the
    /// frame pointer of that level
    #[track_caller]
    pub fn find(&self, symbol: SymbolId) -> (u32, i64) {
        let symbol = &self.symbols[symbol];

        let offset = match symbol.kind {
            // Above the frame pointer, past the return address
            SymbolKind::Parameter { size } => (WORD_SIZE + symbol.offset + size) as i64,
            SymbolKind::Variable | SymbolKind::Array { .. } => {
                // Below the frame pointer, past the display
                -(((symbol.level + 1) * WORD_SIZE) as i64) - symbol.offset as i64
            }
            ref kind => panic!("symbol `{}` is a {kind} and has no address", symbol.name),
        };

        (symbol.level, offset)
    }

    /// Loads the frame pointer of the given lexical level into `rcx`
    pub fn frame_address(&mut self, level: u32) {
        self.emit(format!("mov {}, [rbp-{}]", Register::Rcx, level * WORD_SIZE));
    }

    /// `[rcx+offset]` after pointing `rcx` at the frame the symbol lives in
    fn memory_operand(&mut self, symbol: SymbolId) -> String {
        let (level, offset) = self.find(symbol);
        self.frame_address(level);

        format!("[{}{offset:+}]", Register::Rcx)
    }

    fn constant(&self, symbol: SymbolId) -> Option<ConstantValue> {
        self.symbols[symbol].constant_value()
    }

    /// Loads an integer sized value (or the bit pattern of a real) into a
    /// register. Constants are loaded as immediates.
    pub fn fetch(&mut self, symbol: SymbolId, destination: Register) {
        match self.constant(symbol) {
            Some(ConstantValue::Integer(value)) => {
                self.emit(format!("mov {destination}, {value}"));
            }
            Some(ConstantValue::Real(value)) => {
                let bits = self.symbols.ieee(value);
                self.emit(format!("mov {destination}, {bits}"));
            }
            None => {
                let source = self.memory_operand(symbol);
                self.emit(format!("mov {destination}, {source}"));
            }
        }
    }

    /// Pushes a real onto the x87 stack
    pub fn fetch_float(&mut self, symbol: SymbolId) {
        match self.constant(symbol) {
            Some(value) => {
                let real = match value {
                    ConstantValue::Integer(value) => value as f64,
                    ConstantValue::Real(value) => value,
                };
                self.push_immediate(self.symbols.ieee(real), "fld");
            }
            None => {
                let source = self.memory_operand(symbol);
                self.emit(format!("fld qword ptr {source}"));
            }
        }
    }

    /// Pushes an integer onto the x87 stack, converting it to a real
    pub fn fetch_integer_as_float(&mut self, symbol: SymbolId) {
        match self.constant(symbol) {
            Some(ConstantValue::Integer(value)) => self.push_immediate(value, "fild"),
            Some(ConstantValue::Real(value)) => self.push_immediate(self.symbols.ieee(value), "fld"),
            None => {
                let source = self.memory_operand(symbol);
                self.emit(format!("fild qword ptr {source}"));
            }
        }
    }

    /// x87 loads only take memory operands, so immediates go through the
    /// machine stack
    fn push_immediate(&mut self, value: i64, load: &str) {
        self.emit(format!("mov {}, {value}", Register::Rcx));
        self.emit(format!("push {}", Register::Rcx));
        self.emit(format!("{load} qword ptr [rsp]"));
        self.emit(format!("add rsp, {WORD_SIZE}"));
    }

    pub fn store(&mut self, source: Register, symbol: SymbolId) {
        let destination = self.memory_operand(symbol);
        self.emit(format!("mov {destination}, {source}"));
    }

    /// Pops the top of the x87 stack into a symbol
    pub fn store_float(&mut self, symbol: SymbolId) {
        let destination = self.memory_operand(symbol);
        self.emit(format!("fstp qword ptr {destination}"));
    }

    /// Loads the address of the first element of an array
    pub fn array_address(&mut self, symbol: SymbolId, destination: Register) {
        let (level, offset) = self.find(symbol);
        self.frame_address(level);

        if offset >= 0 {
            self.emit(format!("add {}, {offset}", Register::Rcx));
        } else {
            self.emit(format!("sub {}, {}", Register::Rcx, -offset));
        }

        self.emit(format!("mov {destination}, {}", Register::Rcx));
    }
}

/// The only registers generated code uses. `rax` is the accumulator, `rcx`
/// holds the second operand and addresses, `rdx` receives the remainder of
/// `idiv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Register {
    Rax,
    Rcx,
    Rdx,
}
