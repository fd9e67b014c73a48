//! Recursive-descent parser for the textual query surface.
//!
//! ```text
//! expr   := term (op term)*            left-associative, one precedence level
//! op     := '+' | '&' | '-' | '\'
//! term   := '(' expr ')' | name '(' key ')' | name '.' method '(' key ')'
//! key    := number | ipv4 | ipv6
//! ```
//!
//! Keys are read as one raw token up to the closing parenthesis, so IPv6
//! literals need no escaping.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{IndexError, Result};
use crate::query::ast::{Expr, QueryMethod, SetOp};

/// Parse a complete query string.
pub fn parse(input: &str) -> Result<Expr> {
    let mut parser = Parser { input, pos: 0 };
    let expr = parser.expr()?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

/// Parse a key literal: decimal or `0x` number, IPv4, or IPv6.
pub fn parse_key(raw: &str) -> Result<Expr> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        return u128::from_str_radix(hex, 16)
            .map(Expr::Number)
            .map_err(|e| IndexError::Query(format!("bad hex key '{}': {}", raw, e)));
    }
    if let Ok(n) = raw.parse::<u128>() {
        return Ok(Expr::Number(n));
    }
    if let Ok(a) = raw.parse::<Ipv4Addr>() {
        return Ok(Expr::Ipv4(a));
    }
    if let Ok(a) = raw.parse::<Ipv6Addr>() {
        return Ok(Expr::Ipv6(a));
    }
    Err(IndexError::Query(format!("invalid key literal '{}'", raw)))
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, msg: &str) -> IndexError {
        IndexError::Query(format!("{} at position {}", msg, self.pos))
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some('+') => SetOp::Union,
                Some('&') => SetOp::Intersection,
                Some('-') | Some('\\') => SetOp::Complement,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr> {
        if self.peek() == Some('(') {
            self.pos += 1;
            let inner = self.expr()?;
            self.expect(')')?;
            return Ok(inner);
        }

        let name = self.ident()?;
        let method = if self.peek() == Some('.') {
            self.pos += 1;
            let m = self.ident()?;
            QueryMethod::from_name(&m)
                .ok_or_else(|| self.error(&format!("unknown query method '{}'", m)))?
        } else {
            QueryMethod::Forward
        };

        self.expect('(')?;
        let close = self
            .rest()
            .find(')')
            .ok_or_else(|| self.error("unterminated key"))?;
        let key = parse_key(&self.rest()[..close])?;
        self.pos += close + 1;

        Ok(Expr::Query {
            index: name,
            method,
            key: Box::new(key),
        })
    }

    fn ident(&mut self) -> Result<String> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 || rest.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(self.error("expected index name"));
        }
        self.pos += len;
        Ok(rest[..len].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_of_two_queries() {
        let expr = parse("ix(1) + iy(2)").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                SetOp::Union,
                Expr::query("ix", Expr::Number(1)),
                Expr::query("iy", Expr::Number(2)),
            )
        );
    }

    #[test]
    fn test_left_associative_and_grouping() {
        let flat = parse("a(1) - b(2) & c(3)").unwrap();
        assert_eq!(flat.to_string(), "((a(1) - b(2)) & c(3))");
        let grouped = parse("a(1) \\ (b(2) & c(3))").unwrap();
        assert_eq!(grouped.to_string(), "(a(1) - (b(2) & c(3)))");
    }

    #[test]
    fn test_address_literals() {
        assert_eq!(
            parse("i4(10.0.0.1)").unwrap(),
            Expr::query("i4", Expr::Ipv4(Ipv4Addr::new(10, 0, 0, 1)))
        );
        let v6 = parse("i6( fe80::1 )").unwrap();
        assert_eq!(v6, Expr::query("i6", Expr::Ipv6("fe80::1".parse().unwrap())));
        assert_eq!(parse_key("0x1bb").unwrap(), Expr::Number(443));
    }

    #[test]
    fn test_query_methods() {
        match parse("i4.reverse(5)").unwrap() {
            Expr::Query { method, .. } => assert_eq!(method, QueryMethod::Reverse),
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse("i4.sideways(5)").is_err());
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["", "ix", "ix(1", "ix(1) +", "(ix(1)", "ix(zzz)", "ix(1) ix(2)", "9x(1)"] {
            let err = parse(bad).unwrap_err();
            assert!(matches!(err, IndexError::Query(_)), "{}", bad);
        }
    }
}
