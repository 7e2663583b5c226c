use scim_filter::filter::{Evaluator, Filter};
use scim_filter::schema::SchemaResolver;

mod common;

// Macro to run the same operator against both case policies of userName
macro_rules! case_matrix_test {
    ($op:ident, $operand:expr) => {
        paste::paste! {
            #[test]
            fn [<test_ $op _ignores_case_by_default>]() {
                let resolver = SchemaResolver::builtin();
                assert!(evaluate_username(&resolver, stringify!($op), $operand));
            }

            #[test]
            fn [<test_ $op _honours_case_exact>]() {
                let resolver = common::case_exact_username_resolver();
                assert!(!evaluate_username(&resolver, stringify!($op), $operand));
            }

            #[test]
            fn [<test_ $op _case_exact_exact_operand>]() {
                let resolver = common::case_exact_username_resolver();
                let operand = $operand.to_lowercase();
                assert!(evaluate_username(&resolver, stringify!($op), &operand));
            }
        }
    };
}

fn evaluate_username(resolver: &SchemaResolver, op: &str, operand: &str) -> bool {
    let user = common::bjensen();
    let filter = Filter::from(&format!("userName {} \"{}\"", op, operand)).unwrap();
    Evaluator::new(resolver).evaluate(&filter, &user).unwrap()
}

case_matrix_test!(eq, "BJENSEN@EXAMPLE.COM");
case_matrix_test!(sw, "BJENSEN");
case_matrix_test!(ew, "EXAMPLE.COM");
case_matrix_test!(co, "JENSEN@EX");
case_matrix_test!(le, "BJENSEN@EXAMPLE.COM");
