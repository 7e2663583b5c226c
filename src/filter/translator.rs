//! Translating filters into the native query language of a backend.
//!
//! A backend describes what it can express by implementing
//! [`FilterTranslator`]. [`translate`] then rewrites the filter so that as
//! much of it as possible is pushed down:
//!
//! 1. negations are pushed to the leaves (De Morgan),
//! 2. branches the backend cannot express are pruned and `and` is
//!    distributed over `or` where that enables native conjunctions,
//! 3. the remaining tree is turned into a list of native expressions,
//! 4. duplicate expressions are dropped, keeping first-seen order.
//!
//! The result is a list of queries whose union is a superset of the matching
//! resources. An empty list means everything has to be fetched. Either way
//! the caller still evaluates the filter against what comes back.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use tracing::{debug, trace, warn};

use crate::error::{AppError, AppResult};
use crate::filter::{ComparisonOp, Filter, ScalarValue, SubstringOp};
use crate::path::Path;

/// Native expression factories of a backend.
///
/// Every method defaults to `None`, meaning "cannot be expressed". The
/// `not` flag asks for the negated form of a leaf.
///
/// Factories must be pure: the translator calls them speculatively while
/// simplifying and again while translating, and requires the same answer
/// both times. A differing answer fails with
/// [`AppError::FilterInconsistent`].
pub trait FilterTranslator {
    type Expr: Clone + Eq + Hash;

    fn create_and(&self, _lhs: &Self::Expr, _rhs: &Self::Expr) -> Option<Self::Expr> {
        None
    }

    fn create_or(&self, _lhs: &Self::Expr, _rhs: &Self::Expr) -> Option<Self::Expr> {
        None
    }

    fn create_pr(&self, _path: &Path, _not: bool) -> Option<Self::Expr> {
        None
    }

    fn create_eq(&self, _path: &Path, _value: &ScalarValue, _not: bool) -> Option<Self::Expr> {
        None
    }

    fn create_gt(&self, _path: &Path, _value: &ScalarValue, _not: bool) -> Option<Self::Expr> {
        None
    }

    fn create_ge(&self, _path: &Path, _value: &ScalarValue, _not: bool) -> Option<Self::Expr> {
        None
    }

    fn create_lt(&self, _path: &Path, _value: &ScalarValue, _not: bool) -> Option<Self::Expr> {
        None
    }

    fn create_le(&self, _path: &Path, _value: &ScalarValue, _not: bool) -> Option<Self::Expr> {
        None
    }

    fn create_sw(&self, _path: &Path, _value: &ScalarValue, _not: bool) -> Option<Self::Expr> {
        None
    }

    fn create_ew(&self, _path: &Path, _value: &ScalarValue, _not: bool) -> Option<Self::Expr> {
        None
    }

    fn create_co(&self, _path: &Path, _value: &ScalarValue, _not: bool) -> Option<Self::Expr> {
        None
    }

    fn translate(&self, filter: Option<&Filter>) -> AppResult<Vec<Self::Expr>> {
        translate(self, filter)
    }
}

/// Translate `filter` into native expressions.
///
/// `None`, or a filter of which nothing can be expressed, yields an empty
/// list: fetch everything and filter in memory.
pub fn translate<T>(translator: &T, filter: Option<&Filter>) -> AppResult<Vec<T::Expr>>
where
    T: FilterTranslator + ?Sized,
{
    // nothing matching is left to the caller's in-memory pass as well
    let node = match filter.map(lower).and_then(Lowered::node) {
        Some(node) => normalize(node),
        None => {
            debug!("no constraint to translate");
            return Ok(Vec::new());
        }
    };
    trace!(filter = %node, "normalized filter");

    let node = match simplify(translator, node)? {
        Some(node) => node,
        None => {
            debug!("filter simplified to everything");
            return Ok(Vec::new());
        }
    };
    trace!(filter = %node, "simplified filter");

    let expressions = translate_node(translator, &node)?;
    let mut seen = HashSet::with_capacity(expressions.len());
    let result: Vec<T::Expr> = expressions
        .into_iter()
        .filter(|expr| seen.insert(expr.clone()))
        .collect();
    debug!(expressions = result.len(), "translated filter");
    Ok(result)
}

/// Binary form of a filter. `Not` wraps a leaf once normalized.
#[derive(Debug, Clone)]
enum Node<'f> {
    And(Box<Node<'f>>, Box<Node<'f>>),
    Or(Box<Node<'f>>, Box<Node<'f>>),
    Not(Box<Node<'f>>),
    Leaf(&'f Filter),
}

impl<'f> Node<'f> {
    fn and(lhs: Node<'f>, rhs: Node<'f>) -> Self {
        Node::And(Box::new(lhs), Box::new(rhs))
    }

    fn or(lhs: Node<'f>, rhs: Node<'f>) -> Self {
        Node::Or(Box::new(lhs), Box::new(rhs))
    }

    fn not(inner: Node<'f>) -> Self {
        Node::Not(Box::new(inner))
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::And(lhs, rhs) => write!(f, "({} and {})", lhs, rhs),
            Node::Or(lhs, rhs) => write!(f, "({} or {})", lhs, rhs),
            Node::Not(inner) => write!(f, "not ({})", inner),
            Node::Leaf(filter) => write!(f, "{}", filter),
        }
    }
}

/// A filter folded into binary nodes, or one of the two constants an empty
/// group stands for.
#[derive(Debug)]
enum Lowered<'f> {
    Everything,
    Nothing,
    Node(Node<'f>),
}

impl<'f> Lowered<'f> {
    fn node(self) -> Option<Node<'f>> {
        match self {
            Lowered::Node(node) => Some(node),
            Lowered::Everything | Lowered::Nothing => None,
        }
    }
}

/// Folds n-ary `and`/`or` into binary nodes, left to right. `And([])` is
/// everything and `Or([])` is nothing; constants are absorbed by their
/// parents and swapped by `not`.
fn lower(filter: &Filter) -> Lowered<'_> {
    match filter {
        Filter::And(children) => {
            let mut folded: Option<Node> = None;
            for child in children {
                match lower(child) {
                    Lowered::Nothing => return Lowered::Nothing,
                    Lowered::Everything => {}
                    Lowered::Node(node) => {
                        folded = Some(match folded {
                            Some(lhs) => Node::and(lhs, node),
                            None => node,
                        })
                    }
                }
            }
            folded.map_or(Lowered::Everything, Lowered::Node)
        }
        Filter::Or(children) => {
            let mut folded: Option<Node> = None;
            for child in children {
                match lower(child) {
                    Lowered::Everything => return Lowered::Everything,
                    Lowered::Nothing => {}
                    Lowered::Node(node) => {
                        folded = Some(match folded {
                            Some(lhs) => Node::or(lhs, node),
                            None => node,
                        })
                    }
                }
            }
            folded.map_or(Lowered::Nothing, Lowered::Node)
        }
        Filter::Not(inner) => match lower(inner) {
            Lowered::Everything => Lowered::Nothing,
            Lowered::Nothing => Lowered::Everything,
            Lowered::Node(node) => Lowered::Node(Node::not(node)),
        },
        _ => Lowered::Node(Node::Leaf(filter)),
    }
}

fn normalize(node: Node<'_>) -> Node<'_> {
    match node {
        Node::And(lhs, rhs) => Node::and(normalize(*lhs), normalize(*rhs)),
        Node::Or(lhs, rhs) => Node::or(normalize(*lhs), normalize(*rhs)),
        Node::Not(inner) => negate(normalize(*inner)),
        leaf => leaf,
    }
}

fn negate(node: Node<'_>) -> Node<'_> {
    match node {
        Node::And(lhs, rhs) => Node::or(negate(*lhs), negate(*rhs)),
        Node::Or(lhs, rhs) => Node::and(negate(*lhs), negate(*rhs)),
        Node::Not(inner) => *inner,
        leaf => Node::not(leaf),
    }
}

fn simplify<'f, T>(translator: &T, node: Node<'f>) -> AppResult<Option<Node<'f>>>
where
    T: FilterTranslator + ?Sized,
{
    match node {
        Node::And(lhs, rhs) => {
            let lhs = simplify(translator, *lhs)?;
            let rhs = simplify(translator, *rhs)?;
            let (lhs, rhs) = match (lhs, rhs) {
                (None, rhs) => return Ok(rhs),
                (lhs, None) => return Ok(lhs),
                (Some(lhs), Some(rhs)) => (lhs, rhs),
            };

            let lex = translate_node(translator, &lhs)?;
            if lex.is_empty() {
                return Err(inconsistent("simplify: left operand of and"));
            }
            let rex = translate_node(translator, &rhs)?;
            if rex.is_empty() {
                return Err(inconsistent("simplify: right operand of and"));
            }

            let possible_and = lex
                .iter()
                .any(|l| rex.iter().any(|r| translator.create_and(l, r).is_some()));
            if !possible_and {
                // the dropped side is left to in-memory evaluation
                let (kept, dropped) = if lex.len() <= rex.len() {
                    (lhs, rhs)
                } else {
                    (rhs, lhs)
                };
                trace!(kept = %kept, dropped = %dropped, "and not expressible");
                return Ok(Some(kept));
            }

            if lex.len() > 1 {
                match lhs {
                    Node::Or(a, b) => {
                        trace!(over = %rhs, "distributing and over left or");
                        let distributed = Node::or(Node::and(*a, rhs.clone()), Node::and(*b, rhs));
                        simplify(translator, distributed)
                    }
                    _ => Err(inconsistent("simplify: left operand of and")),
                }
            } else if rex.len() > 1 {
                match rhs {
                    Node::Or(a, b) => {
                        trace!(over = %lhs, "distributing and over right or");
                        let distributed = Node::or(Node::and(lhs.clone(), *a), Node::and(lhs, *b));
                        simplify(translator, distributed)
                    }
                    _ => Err(inconsistent("simplify: right operand of and")),
                }
            } else {
                Ok(Some(Node::and(lhs, rhs)))
            }
        }
        Node::Or(lhs, rhs) => {
            let lhs = simplify(translator, *lhs)?;
            let rhs = simplify(translator, *rhs)?;
            match (lhs, rhs) {
                (Some(lhs), Some(rhs)) => Ok(Some(Node::or(lhs, rhs))),
                _ => Ok(None),
            }
        }
        leaf => {
            if create_leaf(translator, &leaf).is_some() {
                Ok(Some(leaf))
            } else {
                trace!(leaf = %leaf, "leaf not expressible");
                Ok(None)
            }
        }
    }
}

fn translate_node<T>(translator: &T, node: &Node<'_>) -> AppResult<Vec<T::Expr>>
where
    T: FilterTranslator + ?Sized,
{
    match node {
        Node::And(lhs, rhs) => Ok(vec![translate_and(translator, lhs, rhs)?]),
        Node::Or(lhs, rhs) => translate_or(translator, lhs, rhs),
        leaf => Ok(create_leaf(translator, leaf).into_iter().collect()),
    }
}

fn translate_and<T>(translator: &T, lhs: &Node<'_>, rhs: &Node<'_>) -> AppResult<T::Expr>
where
    T: FilterTranslator + ?Sized,
{
    let mut lex = translate_node(translator, lhs)?;
    let mut rex = translate_node(translator, rhs)?;
    if lex.len() != 1 {
        return Err(inconsistent("translate: left operand of and"));
    }
    if rex.len() != 1 {
        return Err(inconsistent("translate: right operand of and"));
    }
    match (lex.pop(), rex.pop()) {
        (Some(l), Some(r)) => translator
            .create_and(&l, &r)
            .ok_or_else(|| inconsistent("createAND")),
        _ => Err(inconsistent("createAND")),
    }
}

fn translate_or<T>(translator: &T, lhs: &Node<'_>, rhs: &Node<'_>) -> AppResult<Vec<T::Expr>>
where
    T: FilterTranslator + ?Sized,
{
    let mut lex = translate_node(translator, lhs)?;
    let rex = translate_node(translator, rhs)?;
    if lex.is_empty() {
        return Err(inconsistent("translate: left operand of or"));
    }
    if rex.is_empty() {
        return Err(inconsistent("translate: right operand of or"));
    }
    if lex.len() == 1 && rex.len() == 1 {
        if let Some(combined) = translator.create_or(&lex[0], &rex[0]) {
            return Ok(vec![combined]);
        }
    }
    lex.extend(rex);
    Ok(lex)
}

fn create_leaf<T>(translator: &T, node: &Node<'_>) -> Option<T::Expr>
where
    T: FilterTranslator + ?Sized,
{
    match node {
        Node::Leaf(filter) => create_expression(translator, filter, false),
        Node::Not(inner) => match inner.as_ref() {
            Node::Leaf(filter) => create_expression(translator, filter, true),
            _ => None,
        },
        _ => None,
    }
}

fn create_expression<T>(translator: &T, filter: &Filter, not: bool) -> Option<T::Expr>
where
    T: FilterTranslator + ?Sized,
{
    match filter {
        Filter::Presence(path) => translator.create_pr(path, not),
        Filter::Comparison { op, path, value } => match op {
            ComparisonOp::Eq => translator.create_eq(path, value, not),
            ComparisonOp::Ne => translator.create_eq(path, value, !not),
            ComparisonOp::Gt => translator.create_gt(path, value, not),
            ComparisonOp::Ge => translator.create_ge(path, value, not),
            ComparisonOp::Lt => translator.create_lt(path, value, not),
            ComparisonOp::Le => translator.create_le(path, value, not),
        },
        Filter::Substring { op, path, value } => match op {
            SubstringOp::StartsWith => translator.create_sw(path, value, not),
            SubstringOp::EndsWith => translator.create_ew(path, value, not),
            SubstringOp::Contains => translator.create_co(path, value, not),
        },
        // value filters stay in memory
        Filter::Complex { .. } => None,
        Filter::And(_) | Filter::Or(_) | Filter::Not(_) => None,
    }
}

fn inconsistent(method: &str) -> AppError {
    warn!(method, "filter translator factory answered inconsistently");
    AppError::FilterInconsistent(method.to_string())
}
