//! Query evaluator
//!
//! Walks an `Expr` tree against an `Environment` of named index views.

use std::collections::HashMap;

use crate::error::{IndexError, Result};
use crate::index::resultset::ResultSet;
use crate::index::view::OffsetIndex;
use crate::query::ast::{Expr, QueryMethod, SetOp};

/// Name -> index view bindings for one evaluation.
///
/// An environment covers one segment. The first bound view fixes that
/// segment unless it was given up front with `for_segment`; queries against
/// names with no binding evaluate to the empty set of that segment.
#[derive(Default)]
pub struct Environment<'a> {
    views: HashMap<String, Box<dyn OffsetIndex + 'a>>,
    segment_offset: Option<u64>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Self {
            views: HashMap::new(),
            segment_offset: None,
        }
    }

    /// Empty environment for the segment starting at `segment_offset`.
    pub fn for_segment(segment_offset: u64) -> Self {
        Self {
            views: HashMap::new(),
            segment_offset: Some(segment_offset),
        }
    }

    /// Bind `name`, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, view: Box<dyn OffsetIndex + 'a>) {
        self.segment_offset.get_or_insert(view.segment_offset());
        self.views.insert(name.into(), view);
    }

    pub fn get(&self, name: &str) -> Option<&(dyn OffsetIndex + 'a)> {
        self.views.get(name).map(|v| v.as_ref())
    }

    /// Segment this environment evaluates against, once known.
    pub fn segment_offset(&self) -> Option<u64> {
        self.segment_offset
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.views.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Tree-walking evaluator
pub struct Evaluator<'e, 'a> {
    env: &'e Environment<'a>,
}

impl<'e, 'a> Evaluator<'e, 'a> {
    pub fn new(env: &'e Environment<'a>) -> Self {
        Evaluator { env }
    }

    /// Evaluate `expr` to a result set.
    pub fn eval(&self, expr: &Expr) -> Result<ResultSet> {
        match expr {
            Expr::Binary { op, lhs, rhs } => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                Ok(match op {
                    SetOp::Union => left.union(&right),
                    SetOp::Intersection => left.intersection(&right),
                    SetOp::Complement => left.complement(&right),
                })
            }
            Expr::Query { index, method, key } => self.eval_query(index, *method, key),
            Expr::Identifier(_) | Expr::Number(_) | Expr::Ipv4(_) | Expr::Ipv6(_) => Err(
                IndexError::Query(format!("'{}' is a key, not a set expression", expr)),
            ),
        }
    }

    fn eval_query(&self, index: &str, method: QueryMethod, key: &Expr) -> Result<ResultSet> {
        if method != QueryMethod::Forward {
            return Err(IndexError::NotImplemented(format!(
                "{} lookup on '{}'",
                method.name(),
                index
            )));
        }
        let Some(view) = self.env.get(index) else {
            tracing::debug!("query against unbound index '{}'", index);
            // a kind with no file in this segment has no hits
            return Ok(self
                .env
                .segment_offset()
                .map_or_else(ResultSet::detached, ResultSet::empty));
        };
        match key {
            Expr::Number(n) => view.lookup_numeric(*n),
            Expr::Ipv4(a) => view.lookup_forward_32(u32::from(*a)),
            Expr::Ipv6(a) => view.lookup_forward_128(u128::from(*a)),
            other => Err(IndexError::Query(format!(
                "'{}' is not a key literal",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Method;
    use crate::index::builder::IndexBuilder;
    use crate::index::serializer::serialize_to_vec;
    use crate::index::view::make_poly_index_view;
    use crate::query::parser::parse;
    use std::net::Ipv4Addr;

    fn v4_index() -> Vec<u8> {
        let mut b = IndexBuilder::<u32>::for_method(Method::BitPack128);
        b.add(u32::from(Ipv4Addr::new(10, 0, 0, 1)), 10);
        b.add(u32::from(Ipv4Addr::new(10, 0, 0, 1)), 30);
        b.add(u32::from(Ipv4Addr::new(10, 0, 0, 2)), 20);
        b.add(u32::from(Ipv4Addr::new(10, 0, 0, 2)), 30);
        serialize_to_vec(b, Method::BitPack128, 0).unwrap()
    }

    #[test]
    fn test_eval_set_operations() {
        let bytes = v4_index();
        let mut env = Environment::new();
        env.bind("i4", make_poly_index_view(&bytes).unwrap());
        let eval = Evaluator::new(&env);

        let run = |q: &str| eval.eval(&parse(q).unwrap()).unwrap().into_values();
        assert_eq!(run("i4(10.0.0.1) + i4(10.0.0.2)"), vec![10, 20, 30]);
        assert_eq!(run("i4(10.0.0.1) & i4(10.0.0.2)"), vec![30]);
        assert_eq!(run("i4(10.0.0.1) - i4(10.0.0.2)"), vec![10]);
        assert_eq!(run("i4(167772161)"), vec![10, 30]);
        assert!(run("i4(::1)").is_empty());
    }

    #[test]
    fn test_unbound_index_is_empty() {
        let env = Environment::new();
        let r = Evaluator::new(&env).eval(&parse("nope(1)").unwrap()).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.segment_offset(), None);

        let env = Environment::for_segment(512);
        let r = Evaluator::new(&env).eval(&parse("nope(1)").unwrap()).unwrap();
        assert_eq!(r, ResultSet::empty(512));
    }

    #[test]
    fn test_unbound_operand_acts_as_empty_set() {
        let bytes = v4_index();
        let mut env = Environment::new();
        env.bind("i4", make_poly_index_view(&bytes).unwrap());
        assert_eq!(env.segment_offset(), Some(0));
        let eval = Evaluator::new(&env);

        let run = |q: &str| eval.eval(&parse(q).unwrap()).unwrap();
        let alone = run("i4(10.0.0.1)");
        assert_eq!(alone.values(), &[10, 30]);
        assert_eq!(run("i4(10.0.0.1) + i6(::1)"), alone);
        assert_eq!(run("i6(::1) + i4(10.0.0.1)"), alone);
        assert_eq!(run("i4(10.0.0.1) - iy(7)"), alone);
        assert!(run("i4(10.0.0.1) & iy(7)").is_empty());
        assert!(run("iy(7) - i4(10.0.0.1)").is_empty());
    }

    #[test]
    fn test_reverse_lookup_not_implemented() {
        let bytes = v4_index();
        let mut env = Environment::new();
        env.bind("i4", make_poly_index_view(&bytes).unwrap());
        let err = Evaluator::new(&env)
            .eval(&parse("i4.combined(1)").unwrap())
            .unwrap_err();
        assert!(matches!(err, IndexError::NotImplemented(_)));
    }

    #[test]
    fn test_bare_literal_rejected() {
        let env = Environment::new();
        assert!(Evaluator::new(&env).eval(&Expr::Number(1)).is_err());
    }

    #[test]
    fn test_identifier_key_rejected() {
        let bytes = v4_index();
        let mut env = Environment::new();
        env.bind("i4", make_poly_index_view(&bytes).unwrap());
        let expr = Expr::query("i4", Expr::Identifier("x".into()));
        assert!(matches!(
            Evaluator::new(&env).eval(&expr).unwrap_err(),
            IndexError::Query(_)
        ));
    }
}
