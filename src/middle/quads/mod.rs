//! Quads: the three-address intermediate representation. Expression trees are
//! flattened into an ordered list of instructions whose operands are symbol
//! table slots (variables, parameters, temporaries), immediates or labels.
//! Control flow is explicit labels and jumps.

use crate::middle::symbol_table::{LabelId, SymbolId};

pub mod ast_lowering;
pub mod pretty_print;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum QuadOp {
    Rload,
    Iload,
    Inot,
    Ruminus,
    Iuminus,
    Rplus,
    Iplus,
    Rminus,
    Iminus,
    Ior,
    Iand,
    Rmult,
    Imult,
    Rdivide,
    Idivide,
    Imod,
    Req,
    Ieq,
    Rne,
    Ine,
    Rlt,
    Ilt,
    Rgt,
    Igt,
    Rstore,
    Istore,
    Rassign,
    Iassign,
    Call,
    Rreturn,
    Ireturn,
    Lindex,
    Rrindex,
    Irindex,
    Itor,
    Jmp,
    Jmpf,
    Param,
    Labl,
    /// Placeholder that must never survive to code generation
    Nop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Symbol(SymbolId),
    Immediate(i64),
    Label(LabelId),
    None,
}

impl Operand {
    #[track_caller]
    pub fn symbol(self) -> SymbolId {
        match self {
            Self::Symbol(symbol) => symbol,
            operand => panic!("expected a symbol operand, found {operand:?}"),
        }
    }

    #[track_caller]
    pub fn immediate(self) -> i64 {
        match self {
            Self::Immediate(value) => value,
            operand => panic!("expected an immediate operand, found {operand:?}"),
        }
    }

    #[track_caller]
    pub fn label(self) -> LabelId {
        match self {
            Self::Label(label) => label,
            operand => panic!("expected a label operand, found {operand:?}"),
        }
    }
}

impl From<SymbolId> for Operand {
    fn from(value: SymbolId) -> Self {
        Self::Symbol(value)
    }
}

impl From<LabelId> for Operand {
    fn from(value: LabelId) -> Self {
        Self::Label(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quadruple {
    pub op: QuadOp,
    pub first: Operand,
    pub second: Operand,
    /// Result slot for everything that produces a value
    pub third: Operand,
}

impl Quadruple {
    pub fn new(
        op: QuadOp,
        first: impl Into<Operand>,
        second: impl Into<Operand>,
        third: impl Into<Operand>,
    ) -> Self {
        Self {
            op,
            first: first.into(),
            second: second.into(),
            third: third.into(),
        }
    }

    pub fn label(label: LabelId) -> Self {
        Self::new(QuadOp::Labl, label, Operand::None, Operand::None)
    }

    pub fn jump(label: LabelId) -> Self {
        Self::new(QuadOp::Jmp, label, Operand::None, Operand::None)
    }

    /// Jumps to `label` when `condition` holds zero
    pub fn jump_if_false(label: LabelId, condition: SymbolId) -> Self {
        Self::new(QuadOp::Jmpf, label, condition, Operand::None)
    }
}

/// The quads of one procedure or function body
#[derive(Debug, Clone, PartialEq)]
pub struct QuadList {
    quads: Vec<Quadruple>,
    /// Every `return` in the body jumps here, it is emitted as the last quad
    return_label: LabelId,
}

impl QuadList {
    pub fn new(return_label: LabelId) -> Self {
        Self {
            quads: Vec::new(),
            return_label,
        }
    }

    pub fn push(&mut self, quad: Quadruple) {
        self.quads.push(quad);
    }

    pub fn return_label(&self) -> LabelId {
        self.return_label
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Quadruple> {
        self.quads.iter()
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    pub fn ops(&self) -> impl Iterator<Item = QuadOp> + '_ {
        self.quads.iter().map(|quad| quad.op)
    }
}

impl core::ops::Index<usize> for QuadList {
    type Output = Quadruple;

    fn index(&self, index: usize) -> &Self::Output {
        &self.quads[index]
    }
}

impl<'a> IntoIterator for &'a QuadList {
    type Item = &'a Quadruple;
    type IntoIter = std::slice::Iter<'a, Quadruple>;

    fn into_iter(self) -> Self::IntoIter {
        self.quads.iter()
    }
}
