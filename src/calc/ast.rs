use super::value::Number;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Invert,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    MatMul,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::FloorDiv | Self::Mod | Self::Pow
        )
    }

    pub fn construct(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mult",
            Self::Div => "Div",
            Self::FloorDiv => "FloorDiv",
            Self::Mod => "Mod",
            Self::Pow => "Pow",
            Self::MatMul => "MatMult",
            Self::LShift => "LShift",
            Self::RShift => "RShift",
            Self::BitAnd => "BitAnd",
            Self::BitOr => "BitOr",
            Self::BitXor => "BitXor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    LtE,
    GtE,
    Eq,
    NotEq,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrKind {
    Text,
    Bytes,
    Formatted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompKind {
    List,
    Set,
    Dict,
    Generator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    /// `None` for `**mapping` unpacking.
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompClause {
    pub target: Expr,
    pub iter: Expr,
    pub conditions: Vec<Expr>,
}

/// Syntax tree for the full expression grammar. Most variants exist only so
/// that the validator can name what it rejects.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Number),
    Imaginary(f64),
    Str {
        value: String,
        kind: StrKind,
    },
    Bool(bool),
    NoneLiteral,
    Ellipsis,
    Name(String),
    Group(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        rest: Vec<(CompareOp, Expr)>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Starred(Box<Expr>),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Set(Vec<Expr>),
    Dict(Vec<(Option<Expr>, Expr)>),
    Comprehension {
        kind: CompKind,
        element: Box<Expr>,
        value: Option<Box<Expr>>,
        clauses: Vec<CompClause>,
    },
    Conditional {
        body: Box<Expr>,
        test: Box<Expr>,
        orelse: Box<Expr>,
    },
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    NamedExpr {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        augmented: bool,
    },
}

impl Expr {
    /// Node name used in rejection messages.
    pub fn construct(&self) -> String {
        let name = match self {
            Self::Number(_) => "Constant",
            Self::Imaginary(_) => "Constant complex",
            Self::Str { kind, .. } => match kind {
                StrKind::Text => "Constant str",
                StrKind::Bytes => "Constant bytes",
                StrKind::Formatted => "JoinedStr",
            },
            Self::Bool(_) => "Constant bool",
            Self::NoneLiteral => "Constant None",
            Self::Ellipsis => "Constant Ellipsis",
            Self::Name(name) => return format!("Name '{name}'"),
            Self::Group(_) => "Group",
            Self::Unary { op, .. } => match op {
                UnaryOp::Pos => "UAdd",
                UnaryOp::Neg => "USub",
                UnaryOp::Invert => "Invert",
                UnaryOp::Not => "Not",
            },
            Self::Binary { op, .. } => op.construct(),
            Self::Compare { .. } => "Compare",
            Self::BoolOp { .. } => "BoolOp",
            Self::Call { .. } => "Call",
            Self::Attribute { .. } => "Attribute",
            Self::Subscript { .. } => "Subscript",
            Self::Slice { .. } => "Slice",
            Self::Starred(_) => "Starred",
            Self::Tuple(_) => "Tuple",
            Self::List(_) => "List",
            Self::Set(_) => "Set",
            Self::Dict(_) => "Dict",
            Self::Comprehension { kind, .. } => match kind {
                CompKind::List => "ListComp",
                CompKind::Set => "SetComp",
                CompKind::Dict => "DictComp",
                CompKind::Generator => "GeneratorExp",
            },
            Self::Conditional { .. } => "IfExp",
            Self::Lambda { .. } => "Lambda",
            Self::NamedExpr { .. } => "NamedExpr",
            Self::Assign {
                augmented: false, ..
            } => "Assign",
            Self::Assign { augmented: true, .. } => "AugAssign",
        };
        name.to_string()
    }
}
