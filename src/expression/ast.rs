use std::fmt;

use super::functions::Function;

/// A parsed expression in the single variable `x`.
///
/// Every node owns its children; there is no sharing between nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(f64),
    Variable,
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
    /// `inner` is defined only where every predicate holds.
    DomainRestricted {
        inner: Box<Expr>,
        predicates: Vec<Predicate>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Power => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    NotEqual,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::NotEqual => "!=",
        }
    }

    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Less => left < right,
            Comparison::LessOrEqual => left <= right,
            Comparison::Greater => left > right,
            Comparison::GreaterOrEqual => left >= right,
            Comparison::NotEqual => left != right,
        }
    }
}

/// One inequality of a domain restriction, e.g. `-2 < x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub left: Expr,
    pub op: Comparison,
    pub right: Expr,
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Constant(value)
    }

    pub fn negate(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(function: Function, args: Vec<Expr>) -> Self {
        Expr::Call { function, args }
    }

    /// Whether the expression refers to `x` anywhere, restrictions included.
    pub fn depends_on_x(&self) -> bool {
        match self {
            Expr::Constant(_) => false,
            Expr::Variable => true,
            Expr::Unary { operand, .. } => operand.depends_on_x(),
            Expr::Binary { left, right, .. } => left.depends_on_x() || right.depends_on_x(),
            Expr::Call { args, .. } => args.iter().any(Expr::depends_on_x),
            Expr::DomainRestricted { inner, predicates } => {
                inner.depends_on_x()
                    || predicates
                        .iter()
                        .any(|p| p.left.depends_on_x() || p.right.depends_on_x())
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::DomainRestricted { .. } => 0,
            Expr::Binary { op, .. } => match op {
                BinaryOp::Add | BinaryOp::Subtract => 1,
                BinaryOp::Multiply | BinaryOp::Divide => 2,
                BinaryOp::Power => 4,
            },
            Expr::Unary { .. } => 3,
            Expr::Constant(value) if value.is_sign_negative() => 3,
            Expr::Constant(_) | Expr::Variable | Expr::Call { .. } => 5,
        }
    }

    fn fmt_at(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "(")?;
            self.fmt_bare(f)?;
            write!(f, ")")
        } else {
            self.fmt_bare(f)
        }
    }

    fn fmt_bare(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{value}"),
            Expr::Variable => write!(f, "x"),
            Expr::Unary { op: UnaryOp::Negate, operand } => {
                write!(f, "-")?;
                operand.fmt_at(f, 3)
            }
            Expr::Binary { op, left, right } => {
                let (left_min, right_min) = match op {
                    BinaryOp::Add | BinaryOp::Subtract => (1, 2),
                    BinaryOp::Multiply | BinaryOp::Divide => (2, 3),
                    BinaryOp::Power => (5, 3),
                };
                left.fmt_at(f, left_min)?;
                write!(f, "{}", op.symbol())?;
                right.fmt_at(f, right_min)
            }
            Expr::Call { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    arg.fmt_at(f, 1)?;
                }
                write!(f, ")")
            }
            Expr::DomainRestricted { inner, predicates } => {
                inner.fmt_at(f, 1)?;
                write!(f, " | ")?;
                for (i, predicate) in predicates.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{predicate}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_at(f, 0)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.left.fmt_at(f, 1)?;
        write!(f, " {} ", self.op.symbol())?;
        self.right.fmt_at(f, 1)
    }
}
