//! Query AST.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Set operator joining two sub-expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    /// `a + b`
    Union,
    /// `a & b`
    Intersection,
    /// `a - b` or `a \ b`
    Complement,
}

impl SetOp {
    pub fn symbol(self) -> char {
        match self {
            SetOp::Union => '+',
            SetOp::Intersection => '&',
            SetOp::Complement => '-',
        }
    }
}

/// Lookup direction of a query node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMethod {
    /// key -> offsets
    Forward,
    /// offset -> keys
    Reverse,
    /// forward and reverse in one pass
    Combined,
}

impl QueryMethod {
    pub fn name(self) -> &'static str {
        match self {
            QueryMethod::Forward => "forward",
            QueryMethod::Reverse => "reverse",
            QueryMethod::Combined => "combined",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "forward" => Some(QueryMethod::Forward),
            "reverse" => Some(QueryMethod::Reverse),
            "combined" => Some(QueryMethod::Combined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Identifier(String),
    Number(u128),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Binary {
        op: SetOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `index(key)` or `index.method(key)`
    Query {
        index: String,
        method: QueryMethod,
        key: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: SetOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Forward lookup of `key` in `index`.
    pub fn query(index: impl Into<String>, key: Expr) -> Self {
        Expr::Query {
            index: index.into(),
            method: QueryMethod::Forward,
            key: Box::new(key),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identifier(name) => write!(f, "{}", name),
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Ipv4(a) => write!(f, "{}", a),
            Expr::Ipv6(a) => write!(f, "{}", a),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Query {
                index,
                method: QueryMethod::Forward,
                key,
            } => write!(f, "{}({})", index, key),
            Expr::Query { index, method, key } => write!(f, "{}.{}({})", index, method.name(), key),
        }
    }
}
