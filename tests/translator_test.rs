use std::cell::Cell;

use scim_filter::error::AppError;
use scim_filter::filter::{Filter, FilterTranslator, ScalarValue};
use scim_filter::path::Path;

/// Renders leaves as `attr=value` / `attr!=value` for a fixed set of
/// attributes; `and`/`or` are native only when enabled.
struct TextTranslator {
    attributes: &'static [&'static str],
    and: bool,
    or: bool,
}

impl TextTranslator {
    fn new(and: bool, or: bool) -> Self {
        Self {
            attributes: &["a", "b"],
            and,
            or,
        }
    }

    fn run(&self, filter: &str) -> Vec<String> {
        let filter = Filter::from(filter).unwrap();
        self.translate(Some(&filter)).unwrap()
    }
}

impl FilterTranslator for TextTranslator {
    type Expr = String;

    fn create_and(&self, lhs: &String, rhs: &String) -> Option<String> {
        self.and.then(|| format!("({} AND {})", lhs, rhs))
    }

    fn create_or(&self, lhs: &String, rhs: &String) -> Option<String> {
        self.or.then(|| format!("({} OR {})", lhs, rhs))
    }

    fn create_pr(&self, path: &Path, not: bool) -> Option<String> {
        let attribute = path.attribute_names();
        self.attributes
            .contains(&attribute.as_str())
            .then(|| format!("{}{}", attribute, if not { " absent" } else { " present" }))
    }

    fn create_eq(&self, path: &Path, value: &ScalarValue, not: bool) -> Option<String> {
        let attribute = path.attribute_names();
        self.attributes
            .contains(&attribute.as_str())
            .then(|| format!("{}{}{}", attribute, if not { "!=" } else { "=" }, value))
    }
}

#[test]
fn test_and_distributes_over_or_without_native_or() {
    let result = TextTranslator::new(true, false).run("(a eq 1 or a eq 2) and b eq 3");
    assert_eq!(result, vec!["(a=1 AND b=3)", "(a=2 AND b=3)"]);

    let result = TextTranslator::new(true, false).run("b eq 3 and (a eq 1 or a eq 2)");
    assert_eq!(result, vec!["(b=3 AND a=1)", "(b=3 AND a=2)"]);
}

#[test]
fn test_native_or_keeps_single_expression() {
    let result = TextTranslator::new(true, true).run("(a eq 1 or a eq 2) and b eq 3");
    assert_eq!(result, vec!["((a=1 OR a=2) AND b=3)"]);
}

#[test]
fn test_or_of_ands_without_native_or() {
    let result = TextTranslator::new(true, false).run("(a eq 1 and b eq 2) or (a eq 3 and b eq 4)");
    assert_eq!(result, vec!["(a=1 AND b=2)", "(a=3 AND b=4)"]);
}

#[test]
fn test_no_filter_fetches_everything() {
    let translator = TextTranslator::new(true, true);
    assert!(translator.translate(None).unwrap().is_empty());
    assert!(translator.translate(Some(&Filter::And(vec![]))).unwrap().is_empty());
    assert!(translator.translate(Some(&Filter::Or(vec![]))).unwrap().is_empty());
}

#[test]
fn test_inexpressible_filters_fetch_everything() {
    let translator = TextTranslator::new(true, true);
    for filter in [
        "c eq 1",
        "a gt 1",
        "a sw \"x\"",
        "a eq 1 or c eq 2",
        "emails[type eq \"work\"]",
        "not (emails[type eq \"work\"])",
    ] {
        assert!(translator.run(filter).is_empty(), "filter: {}", filter);
    }
}

#[test]
fn test_and_prunes_inexpressible_side() {
    let translator = TextTranslator::new(true, true);
    assert_eq!(translator.run("a eq 1 and c eq 2"), vec!["a=1"]);
    assert_eq!(translator.run("c eq 2 and a eq 1"), vec!["a=1"]);
    assert_eq!(translator.run("c eq 2 and (a eq 1 or b pr)"), vec!["(a=1 OR b present)"]);
}

#[test]
fn test_without_native_and_keeps_the_smaller_side() {
    let translator = TextTranslator::new(false, false);
    assert_eq!(translator.run("a eq 1 and (b eq 2 or b eq 3)"), vec!["a=1"]);
    assert_eq!(translator.run("(b eq 2 or b eq 3) and a eq 1"), vec!["a=1"]);
    // ties keep the left side
    assert_eq!(translator.run("a eq 1 and b eq 2"), vec!["a=1"]);
}

#[test]
fn test_duplicates_keep_first_seen_order() {
    let translator = TextTranslator::new(true, false);
    assert_eq!(
        translator.run("a eq 2 or a eq 1 or a eq 2 or b eq 1 or a eq 1"),
        vec!["a=2", "a=1", "b=1"]
    );
}

#[test]
fn test_negation_is_pushed_to_leaves() {
    let translator = TextTranslator::new(true, false);
    assert_eq!(
        translator.run("not (a eq 1 and b eq 2)"),
        vec!["a!=1", "b!=2"]
    );
    assert_eq!(
        translator.run("not (a eq 1 or b eq 2)"),
        vec!["(a!=1 AND b!=2)"]
    );
    assert_eq!(translator.run("not (not (a eq 1))"), vec!["a=1"]);
    assert_eq!(translator.run("a ne 1"), vec!["a!=1"]);
    assert_eq!(translator.run("not (a ne 1)"), vec!["a=1"]);
    assert_eq!(translator.run("not (b pr)"), vec!["b absent"]);
}

#[test]
fn test_de_morgan_equivalence() {
    let translator = TextTranslator::new(true, true);
    assert_eq!(
        translator.run("not (a eq 1 and b eq 2)"),
        translator.run("not (a eq 1) or not (b eq 2)")
    );
    assert_eq!(
        translator.run("not (a eq 1 or b pr)"),
        translator.run("a ne 1 and not (b pr)")
    );
}

/// Answers `create_eq` only for the first `budget` calls.
struct Forgetful {
    budget: usize,
    calls: Cell<usize>,
}

impl FilterTranslator for Forgetful {
    type Expr = String;

    fn create_and(&self, lhs: &String, rhs: &String) -> Option<String> {
        Some(format!("({} AND {})", lhs, rhs))
    }

    fn create_eq(&self, path: &Path, value: &ScalarValue, _not: bool) -> Option<String> {
        let calls = self.calls.get() + 1;
        self.calls.set(calls);
        (calls <= self.budget).then(|| format!("{}={}", path, value))
    }
}

#[test]
fn test_inconsistent_leaf_factory() {
    let translator = Forgetful {
        budget: 2,
        calls: Cell::new(0),
    };
    let filter = Filter::from("a eq 1 and b eq 2").unwrap();
    let result = translator.translate(Some(&filter));
    assert!(matches!(result, Err(AppError::FilterInconsistent(_))));
}

/// Joins with `AND` only once.
struct OneShotAnd {
    used: Cell<bool>,
}

impl FilterTranslator for OneShotAnd {
    type Expr = String;

    fn create_and(&self, lhs: &String, rhs: &String) -> Option<String> {
        if self.used.replace(true) {
            None
        } else {
            Some(format!("({} AND {})", lhs, rhs))
        }
    }

    fn create_eq(&self, path: &Path, value: &ScalarValue, _not: bool) -> Option<String> {
        Some(format!("{}={}", path, value))
    }
}

#[test]
fn test_inconsistent_and_factory() {
    let translator = OneShotAnd {
        used: Cell::new(false),
    };
    let filter = Filter::from("a eq 1 and b eq 2").unwrap();
    match translator.translate(Some(&filter)) {
        Err(AppError::FilterInconsistent(method)) => assert_eq!(method, "createAND"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_inconsistency_maps_to_internal_error() {
    let err = AppError::FilterInconsistent("createAND".to_string());
    let body = err.to_response();
    assert_eq!(body["status"], "500");
    assert!(body["detail"].as_str().unwrap().contains("createAND"));
}
