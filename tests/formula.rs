//! Tests for formula tokenizing, parsing, substitution and evaluation.
mod common;
use ahash::AHashMap;
use common::*;
use formwork::error::FormulaError;
use formwork::formula::lexer::{Token, tokenize};
use formwork::formula::{self, Value, fallback_formula, substitute};
use formwork::prelude::*;

fn eval(text: &str) -> DerivedValue {
    pinned_evaluator().evaluate_text(text)
}

mod lexing_and_parsing {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_dates_numbers_and_strings() {
        let tokens: Vec<Token> = tokenize("year(1990-05-01) + 2.5 * 'x'")
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Function(formwork::formula::Function::Year),
                Token::LParen,
                Token::Date("1990-05-01".into()),
                Token::RParen,
                Token::Plus,
                Token::Number(2.5),
                Token::Star,
                Token::Str("x".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_rejects_text_outside_vocabulary() {
        assert_eq!(
            tokenize("Hello Ann").unwrap_err(),
            FormulaError::UnknownName("Hello".into())
        );
        assert!(matches!(
            tokenize("3 % 2"),
            Err(FormulaError::UnexpectedCharacter { found: '%', .. })
        ));
        assert_eq!(
            tokenize("'open").unwrap_err(),
            FormulaError::UnterminatedString(0)
        );
    }

    #[test]
    fn test_subtraction_is_not_a_date() {
        let tokens = tokenize("2025 - 1990").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].token, Token::Minus);
    }

    #[test]
    fn test_parse_respects_precedence() {
        assert_eq!(formula::parse("1 + 2 * 3").unwrap().to_string(), "1 + 2 * 3");
        assert_eq!(formula::parse("(1 + 2) * 3").unwrap().to_string(), "(1 + 2) * 3");
        assert_eq!(formula::parse("1 - (2 - 3)").unwrap().to_string(), "1 - (2 - 3)");
        assert_eq!(formula::parse("-(1 + 2)").unwrap().to_string(), "-(1 + 2)");
        assert_eq!(
            formula::parse("yearsSince(1990-05-01)").unwrap().to_string(),
            "yearsSince(1990-05-01)"
        );
    }

    #[test]
    fn test_parse_checks_arity() {
        assert_eq!(
            formula::parse("year()").unwrap_err(),
            FormulaError::Arity {
                function: "year",
                expected: 1,
                found: 0
            }
        );
        assert!(matches!(
            formula::parse("currentYear(1)"),
            Err(FormulaError::Arity { expected: 0, found: 1, .. })
        ));
    }

    #[test]
    fn test_parse_reports_incomplete_expressions() {
        assert_eq!(formula::parse("2 +").unwrap_err(), FormulaError::UnexpectedEnd);
        assert!(matches!(
            formula::parse("(1 + 2"),
            Err(FormulaError::UnexpectedEnd)
        ));
        assert!(matches!(
            formula::parse("1 2"),
            Err(FormulaError::UnexpectedToken { position: 2, .. })
        ));
    }
}

mod evaluation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2 + 3 * 4"), DerivedValue::Number(14.0));
        assert_eq!(eval("(2 + 3) * 4"), DerivedValue::Number(20.0));
        assert_eq!(eval("-3 + 5"), DerivedValue::Number(2.0));
        assert_eq!(eval("10 / 4"), DerivedValue::Number(2.5));
        assert_eq!(eval("10 * -3"), DerivedValue::Number(-30.0));
        assert_eq!(eval(".5 + .5"), DerivedValue::Number(1.0));
    }

    #[test]
    fn test_failures_yield_error_marker() {
        assert_eq!(eval("1 / 0"), DerivedValue::Failed);
        assert_eq!(eval(" * "), DerivedValue::Failed);
        assert_eq!(eval("2 +"), DerivedValue::Failed);
        assert_eq!(eval("year(1990-13-01)"), DerivedValue::Failed);
        assert_eq!(eval("yearsSince('not a date')"), DerivedValue::Failed);

        let marker = DerivedValue::Failed.into_field_value();
        assert_eq!(marker, FieldValue::Text(ERROR_MARKER.to_string()));
        assert_eq!(DerivedValue::Failed.to_string(), "Error in formula");
    }

    #[test]
    fn test_text_outside_vocabulary_is_literal() {
        assert_eq!(eval("Hello Ann"), DerivedValue::Text("Hello Ann".into()));
        assert_eq!(eval("3 apples"), DerivedValue::Text("3 apples".into()));
        assert_eq!(eval("alert(1)"), DerivedValue::Text("alert(1)".into()));
        assert_eq!(eval(""), DerivedValue::Text(String::new()));
    }

    #[test]
    fn test_date_functions() {
        assert_eq!(eval("yearsSince(1990-05-01)"), DerivedValue::Number(35.0));
        assert_eq!(eval("currentYear() - year(1990-05-01)"), DerivedValue::Number(35.0));
        assert_eq!(eval("year('2001-02-03')"), DerivedValue::Number(2001.0));
        assert_eq!(eval("year('2001-02-03T08:30')"), DerivedValue::Number(2001.0));
        assert_eq!(eval("currentYear()"), DerivedValue::Number(2025.0));
    }

    #[test]
    fn test_commas_and_strings_outside_calls_are_literal() {
        assert_eq!(eval("3, 4"), DerivedValue::Text("3, 4".into()));
        assert_eq!(eval("1,000"), DerivedValue::Text("1,000".into()));
        assert_eq!(eval("1,000 * 2"), DerivedValue::Text("1,000 * 2".into()));
        assert_eq!(eval("'a' + 1"), DerivedValue::Text("'a' + 1".into()));
        assert_eq!(eval("(1, 2)"), DerivedValue::Text("(1, 2)".into()));
        // Inside a call the string is an argument.
        assert_eq!(eval("year('2001-02-03') + 1"), DerivedValue::Number(2002.0));
        assert_eq!(eval("(year('2001-02-03'))"), DerivedValue::Number(2001.0));
    }

    #[test]
    fn test_non_numeric_results() {
        assert_eq!(eval("'done'"), DerivedValue::Text("'done'".into()));
        assert_eq!(eval("1990-05-01"), DerivedValue::Text("1990-05-01".into()));
    }

    #[test]
    fn test_evaluate_expression_returns_typed_values() {
        let evaluator = pinned_evaluator();
        let expr = formula::parse("year(2000-01-01) + 1").unwrap();
        assert_eq!(
            evaluator.evaluate_expression(&expr).unwrap(),
            Value::Number(2001.0)
        );

        let expr = formula::parse("1 / (2 - 2)").unwrap();
        assert_eq!(
            evaluator.evaluate_expression(&expr).unwrap_err(),
            FormulaError::DivisionByZero
        );
    }

    #[test]
    fn test_unpinned_evaluator_uses_local_date() {
        let today = chrono::Local::now().date_naive();
        assert_eq!(FormulaEvaluator::new().today(), today);
    }
}

mod substitution {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values_of(pairs: &[(&Field, FieldValue)]) -> AHashMap<FieldId, FieldValue> {
        pairs
            .iter()
            .map(|(field, value)| (field.id().clone(), value.clone()))
            .collect()
    }

    fn by_id(fields: &[&Field]) -> AHashMap<FieldId, Field> {
        fields
            .iter()
            .map(|f| (f.id().clone(), (*f).clone()))
            .collect()
    }

    #[test]
    fn test_substitute_replaces_every_occurrence() {
        let text = substitute("{A} + {A}", &[("{A}".into(), "2".into())]);
        assert_eq!(text, "2 + 2");
    }

    #[test]
    fn test_substitute_escapes_label_metacharacters() {
        let text = substitute("{Cost ($)} * 2", &[("{Cost ($)}".into(), "5".into())]);
        assert_eq!(text, "5 * 2");

        let text = substitute("x {A}", &[("{A}".into(), "$1".into())]);
        assert_eq!(text, "x $1");
    }

    #[test]
    fn test_evaluate_substitutes_parent_values() {
        let (price, qty, total) = order_fields();
        let fields = by_id(&[&price, &qty, &total]);
        let values = values_of(&[(&price, 10.into()), (&qty, 3.into())]);

        let evaluator = pinned_evaluator();
        assert_eq!(
            evaluator.evaluate(&total, &fields, &values),
            DerivedValue::Number(30.0)
        );
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let (price, qty, total) = order_fields();
        let fields = by_id(&[&price, &qty, &total]);
        let evaluator = pinned_evaluator();

        for values in [
            values_of(&[(&price, 10.into()), (&qty, 3.into())]),
            values_of(&[(&price, 10.into()), (&qty, "three".into())]),
            values_of(&[(&price, 10.into())]),
        ] {
            let first = evaluator.evaluate(&total, &fields, &values);
            let second = evaluator.evaluate(&total, &fields, &values);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_missing_parent_substitutes_empty() {
        let (price, qty, _) = order_fields();
        let total = derived_field(FieldType::Number, "Total", &[&price, &qty], "{Price} + {Qty}");
        // `price` is left out of the form.
        let fields = by_id(&[&qty, &total]);
        let values = values_of(&[(&qty, 3.into())]);

        let evaluator = pinned_evaluator();
        assert_eq!(
            evaluator.evaluate(&total, &fields, &values),
            DerivedValue::Number(3.0)
        );
    }

    #[test]
    fn test_unlabelled_parent_uses_type_placeholder() {
        let dob = Field::builder(FieldType::Date).build().unwrap();
        let age = derived_field(FieldType::Number, "Age", &[&dob], "yearsSince({date})");
        let fields = by_id(&[&dob, &age]);
        let values = values_of(&[(&dob, "2000-01-01".into())]);

        assert_eq!(
            pinned_evaluator().evaluate(&age, &fields, &values),
            DerivedValue::Number(25.0)
        );
    }

    #[test]
    fn test_checkbox_parent_substitutes_as_literal_list() {
        let sizes = Field::builder(FieldType::Checkbox)
            .label("Sizes")
            .options(["1", "2", "3"])
            .build()
            .unwrap();
        let picked = derived_field(FieldType::Text, "Picked", &[&sizes], "{Sizes}");
        let fields = by_id(&[&sizes, &picked]);
        let values = values_of(&[(&sizes, FieldValue::List(vec!["1".into(), "2".into()]))]);

        assert_eq!(
            pinned_evaluator().evaluate(&picked, &fields, &values),
            DerivedValue::Text("1,2".into())
        );
    }

    #[test]
    fn test_fallback_formula() {
        let (price, qty, _) = order_fields();
        assert_eq!(fallback_formula(&[&price, &qty]), "{Price} + {Qty}");
        assert_eq!(fallback_formula(&[&price]), "{Price} + {Price}");
        assert_eq!(fallback_formula(&[]), "");
    }
}
