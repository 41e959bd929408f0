//! Integration tests for the agreement interpreter.
//!
//! These tests run whole sources, from parsing through weaving to
//! evaluation of the instrumented functions.

use agreement_contracts::{ContractError, ViolationKind, WeaverConfig};
use agreement_interpreter::{Interpreter, LoadError, RuntimeError, Value};
use pretty_assertions::assert_eq;

/// Load a source and run its `main`.
fn run_source(source: &str) -> Result<Value, LoadError> {
    let (program, errors) = agreement_parser::parse(source);
    if !errors.is_empty() {
        panic!("Parse errors: {:?}", errors);
    }
    Interpreter::new().run(&program)
}

/// Load a source whose functions are called from the test.
fn load(source: &str) -> Interpreter {
    let mut interpreter = Interpreter::new();
    if let Err(e) = interpreter.load(source) {
        panic!("Load failed: {:?}", e);
    }
    interpreter
}

fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().copied().map(Value::Int).collect())
}

/// Message of the violation a call failed with.
fn violation_message(result: Result<Value, RuntimeError>) -> String {
    match result {
        Err(RuntimeError::Violation(violation)) => violation.to_string(),
        other => panic!("Expected a violation, got {:?}", other),
    }
}

// ============================================================================
// Basic Evaluation
// ============================================================================

mod expressions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_main_value() {
        let result = run_source(
            r#"
            fn main()
              42
            end
            "#,
        );
        assert_eq!(result.unwrap(), Value::Int(42));
    }

    #[test]
    fn test_let_and_arithmetic() {
        let result = run_source(
            r#"
            fn main()
              let x = 10
              let y = 3
              x * y - x % y
            end
            "#,
        );
        assert_eq!(result.unwrap(), Value::Int(29));
    }

    #[test]
    fn test_collections() {
        let result = run_source(
            r#"
            fn main()
              let colours = {"apple": :red, "blueberry": :blue}
              let xs = [1, 2, 3]
              xs[0] = 10
              [colours["blueberry"], length(colours), sum(xs)]
            end
            "#,
        );
        assert_eq!(
            result.unwrap(),
            Value::array(vec![Value::atom("blue"), Value::Int(2), Value::Int(15)])
        );
    }

    #[test]
    fn test_no_main_returns_nil() {
        let result = run_source("fn helper()\n  1\nend\n");
        assert_eq!(result.unwrap(), Value::Nil);
    }
}

mod control_flow {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_elsif_chain() {
        let mut interp = load(
            r#"
            fn classify(n)
              if n < 0
                :negative
              elsif n == 0
                :zero
              else
                :positive
              end
            end
            "#,
        );
        assert_eq!(
            interp.call("classify", vec![Value::Int(-3)]).unwrap(),
            Value::atom("negative")
        );
        assert_eq!(
            interp.call("classify", vec![Value::Int(0)]).unwrap(),
            Value::atom("zero")
        );
        assert_eq!(
            interp.call("classify", vec![Value::Int(8)]).unwrap(),
            Value::atom("positive")
        );
    }

    #[test]
    fn test_while_with_break_and_continue() {
        let result = run_source(
            r#"
            fn main()
              let i = 0
              let total = 0
              while true
                i = i + 1
                if i > 6
                  break
                end
                if i % 2 == 0
                  continue
                end
                total = total + i
              end
              total
            end
            "#,
        );
        // 1 + 3 + 5
        assert_eq!(result.unwrap(), Value::Int(9));
    }

    #[test]
    fn test_for_over_range_and_array() {
        let result = run_source(
            r#"
            fn main()
              let total = 0
              for i in 1..=3
                total = total + i
              end
              for x in [10, 20]
                total = total + x
              end
              total
            end
            "#,
        );
        assert_eq!(result.unwrap(), Value::Int(36));
    }

    #[test]
    fn test_return_from_inside_loop() {
        let mut interp = load(
            r#"
            fn find_index(xs, target)
              let i = 0
              for x in xs
                if x == target
                  return i
                end
                i = i + 1
              end
              -1
            end
            "#,
        );
        assert_eq!(
            interp.call("find_index", vec![ints(&[4, 5, 6]), Value::Int(6)]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            interp.call("find_index", vec![ints(&[4, 5, 6]), Value::Int(7)]).unwrap(),
            Value::Int(-1)
        );
    }

    #[test]
    fn test_break_outside_loop() {
        let result = run_source("fn main()\n  break\nend\n");
        assert!(matches!(
            result,
            Err(LoadError::Runtime(RuntimeError::BreakOutsideLoop { .. }))
        ));
    }
}

mod functions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_recursion() {
        let mut interp = load(
            r#"
            fn fact(n)
              if n <= 1
                return 1
              end
              n * fact(n - 1)
            end
            "#,
        );
        assert_eq!(interp.call("fact", vec![Value::Int(5)]).unwrap(), Value::Int(120));
    }

    #[test]
    fn test_nested_function_sees_enclosing_scope() {
        let mut interp = load(
            r#"
            fn scale_all(xs, factor)
              fn scale(x)
                x * factor
              end
              let out = []
              for x in xs
                out = push(out, scale(x))
              end
              out
            end
            "#,
        );
        assert_eq!(
            interp.call("scale_all", vec![ints(&[1, 2]), Value::Int(3)]).unwrap(),
            ints(&[3, 6])
        );
    }

    #[test]
    fn test_arguments_are_values() {
        let mut interp = load(
            r#"
            fn bump_first(xs)
              xs[0] = xs[0] + 1
              xs
            end
            "#,
        );
        let original = ints(&[1, 2]);
        let bumped = interp.call("bump_first", vec![original.clone()]).unwrap();
        assert_eq!(bumped, ints(&[2, 2]));
        assert_eq!(original, ints(&[1, 2]));
    }

    #[test]
    fn test_arity_mismatch() {
        let mut interp = load("fn id(x)\n  x\nend\n");
        let err = interp.call("id", vec![]).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ArityMismatch {
                expected: 1,
                got: 0,
                ..
            }
        ));
    }
}

// ============================================================================
// Contracts
// ============================================================================

mod requirements {
    use super::*;
    use pretty_assertions::assert_eq;

    const PUT_ENTRY: &str = r#"
        contract
          require(length(dict) < 2, length(key) > 0)
          ensure(length(result) > length(dict))
          fn put_entry(dict, key, value)
            put(dict, key, value)
          end
        end
        "#;

    #[test]
    fn test_dictionary_scenario() {
        let mut interp = load(PUT_ENTRY);
        let dict = Value::map([("apple", Value::atom("red"))]);

        let dict = interp
            .call(
                "put_entry",
                vec![dict, Value::string("blueberry"), Value::atom("blue")],
            )
            .unwrap();
        assert_eq!(
            dict,
            Value::map([
                ("apple", Value::atom("red")),
                ("blueberry", Value::atom("blue")),
            ])
        );

        let message = violation_message(interp.call(
            "put_entry",
            vec![dict.clone(), Value::string(""), Value::atom("purple")],
        ));
        assert_eq!(
            message,
            "Breach on Requirement Expression 'length(dict) < 2' in function 'put_entry'"
        );

        let dict = interp
            .call("delete", vec![dict, Value::string("blueberry")])
            .unwrap();
        let message = violation_message(interp.call(
            "put_entry",
            vec![dict, Value::string(""), Value::atom("purple")],
        ));
        assert_eq!(
            message,
            "Breach on Requirement Expression 'length(key) > 0' in function 'put_entry'"
        );
    }

    #[test]
    fn test_body_does_not_run_after_failed_requirement() {
        let mut interp = load(
            r#"
            contract
              require(x > 0)
              fn f(x)
                1 / 0
              end
            end
            "#,
        );
        let err = interp.call("f", vec![Value::Int(0)]).unwrap_err();
        let violation = err.as_violation().expect("violation");
        assert_eq!(violation.kind, ViolationKind::Requirement);
        assert_eq!(violation.expression, "x > 0");
        assert_eq!(violation.function, "f");

        assert!(matches!(
            interp.call("f", vec![Value::Int(1)]),
            Err(RuntimeError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_requirements_checked_in_declared_order() {
        let mut interp = load(
            r#"
            contract
              require(a > 0)
              require(b > 0)
              fn f(a, b)
                a + b
              end
            end
            "#,
        );
        let message = violation_message(interp.call("f", vec![Value::Int(0), Value::Int(0)]));
        assert_eq!(message, "Breach on Requirement Expression 'a > 0' in function 'f'");
        let message = violation_message(interp.call("f", vec![Value::Int(1), Value::Int(0)]));
        assert_eq!(message, "Breach on Requirement Expression 'b > 0' in function 'f'");
        assert_eq!(
            interp.call("f", vec![Value::Int(1), Value::Int(2)]).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_non_boolean_condition() {
        let mut interp = load(
            r#"
            contract
              require(length(xs))
              fn f(xs)
                xs
              end
            end
            "#,
        );
        let err = interp.call("f", vec![ints(&[1])]).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::NonBooleanCheck { found: "Int", .. }
        ));
    }
}

mod ensures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sum_scenario() {
        let mut interp = load(
            r#"
            contract
              ensure(sum(arr) > 5)
              fn increment_all(arr)
                let out = arr
                for i in 0..length(arr)
                  out[i] = out[i] + 1
                end
                out
              end
            end
            "#,
        );

        let message =
            violation_message(interp.call("increment_all", vec![ints(&[1, 1, 1, 1, 1])]));
        assert_eq!(
            message,
            "Breach on Ensure Expression 'sum(arr) > 5' in function 'increment_all'"
        );

        let result = interp
            .call("increment_all", vec![ints(&[1, 2, 3, 4, 5])])
            .unwrap();
        assert_eq!(result, ints(&[2, 3, 4, 5, 6]));
        assert_eq!(interp.call("sum", vec![result]).unwrap(), Value::Int(20));
    }

    #[test]
    fn test_each_exit_is_checked() {
        let mut interp = load(
            r#"
            contract
              ensure(result >= 0)
              fn clamp(x)
                if x > 100
                  return 100
                end
                if x < -100
                  return x
                end
                x
              end
            end
            "#,
        );
        assert_eq!(interp.call("clamp", vec![Value::Int(150)]).unwrap(), Value::Int(100));
        assert_eq!(interp.call("clamp", vec![Value::Int(5)]).unwrap(), Value::Int(5));

        let expected = "Breach on Ensure Expression 'result >= 0' in function 'clamp'";
        assert_eq!(
            violation_message(interp.call("clamp", vec![Value::Int(-150)])),
            expected
        );
        assert_eq!(
            violation_message(interp.call("clamp", vec![Value::Int(-5)])),
            expected
        );
    }

    #[test]
    fn test_return_inside_loop_is_checked() {
        let mut interp = load(
            r#"
            contract
              ensure(result != :missing)
              fn first_even(xs)
                for x in xs
                  if x % 2 == 0
                    return x
                  end
                end
                :missing
              end
            end
            "#,
        );
        assert_eq!(interp.call("first_even", vec![ints(&[1, 4])]).unwrap(), Value::Int(4));
        assert_eq!(
            violation_message(interp.call("first_even", vec![ints(&[1, 3])])),
            "Breach on Ensure Expression 'result != :missing' in function 'first_even'"
        );
    }

    #[test]
    fn test_bare_return_binds_nil() {
        let mut interp = load(
            r#"
            contract
              ensure(result != nil)
              fn maybe(x)
                if x
                  return
                end
                x
              end
            end
            "#,
        );
        assert_eq!(
            interp.call("maybe", vec![Value::Bool(false)]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            violation_message(interp.call("maybe", vec![Value::Bool(true)])),
            "Breach on Ensure Expression 'result != nil' in function 'maybe'"
        );
    }

    #[test]
    fn test_ensures_checked_in_declared_order() {
        let mut interp = load(
            r#"
            contract
              ensure(result > 0, result < 10)
              fn id(x)
                x
              end
            end
            "#,
        );
        assert_eq!(
            violation_message(interp.call("id", vec![Value::Int(-1)])),
            "Breach on Ensure Expression 'result > 0' in function 'id'"
        );
        assert_eq!(
            violation_message(interp.call("id", vec![Value::Int(20)])),
            "Breach on Ensure Expression 'result < 10' in function 'id'"
        );
    }

    #[test]
    fn test_result_is_not_visible_to_the_body() {
        let mut interp = load(
            r#"
            contract
              ensure(result > 0)
              fn f(x)
                result
              end
            end
            "#,
        );
        assert!(matches!(
            interp.call("f", vec![Value::Int(1)]),
            Err(RuntimeError::UndefinedVariable { name, .. }) if name == "result"
        ));
    }

    #[test]
    fn test_result_is_not_visible_to_requirements() {
        let mut interp = load(
            r#"
            contract
              require(result > 0)
              fn f(x)
                x
              end
            end

            contract
              require(total > 0)
              result = total
              fn g(x)
                x
              end
            end
            "#,
        );
        assert!(matches!(
            interp.call("f", vec![Value::Int(1)]),
            Err(RuntimeError::UndefinedVariable { name, .. }) if name == "result"
        ));
        assert!(matches!(
            interp.call("g", vec![Value::Int(1)]),
            Err(RuntimeError::UndefinedVariable { name, .. }) if name == "total"
        ));
    }

    #[test]
    fn test_huge_range_in_a_requirement_is_an_error() {
        let mut interp = load(
            r#"
            contract
              require(length(r) > 0)
              ensure(result >= 0)
              fn widest(r)
                sum(r)
              end
            end

            fn main()
              widest(0..=9223372036854775807)
            end
            "#,
        );
        assert!(matches!(
            interp.call("main", vec![]),
            Err(RuntimeError::TypeError { message, .. }) if message == "length overflowed"
        ));
        assert_eq!(
            interp.call(
                "widest",
                vec![Value::Range {
                    start: i64::MAX - 1,
                    end: i64::MAX,
                    inclusive: false,
                }]
            ),
            Ok(Value::Int(i64::MAX - 1))
        );
    }
}

mod return_alias {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_alias_names_the_returned_value() {
        let mut interp = load(
            r#"
            contract
              ensure(total == sum(xs), total >= 0)
              result = total
              fn add_all(xs)
                let acc = 0
                for x in xs
                  acc = acc + x
                end
                acc
              end
            end
            "#,
        );
        assert_eq!(interp.call("add_all", vec![ints(&[1, 2, 3])]).unwrap(), Value::Int(6));
        assert_eq!(
            violation_message(interp.call("add_all", vec![ints(&[1, -5])])),
            "Breach on Ensure Expression 'total >= 0' in function 'add_all'"
        );
    }

    #[test]
    fn test_result_is_ordinary_after_alias() {
        let mut interp = load(
            r#"
            contract
              ensure(result > 0)
              result = out
              fn f(x)
                x
              end
            end
            "#,
        );
        assert!(matches!(
            interp.call("f", vec![Value::Int(1)]),
            Err(RuntimeError::UndefinedVariable { name, .. }) if name == "result"
        ));
    }

    #[test]
    fn test_alias_shadows_a_parameter_inside_ensures_only() {
        let mut interp = load(
            r#"
            contract
              ensure(x == 2)
              result = x
              fn double(x)
                x * 2
              end
            end
            "#,
        );
        assert_eq!(interp.call("double", vec![Value::Int(1)]).unwrap(), Value::Int(2));
        assert_eq!(
            violation_message(interp.call("double", vec![Value::Int(2)])),
            "Breach on Ensure Expression 'x == 2' in function 'double'"
        );
    }
}

// ============================================================================
// Loop Invariants
// ============================================================================

mod invariants {
    use super::*;
    use pretty_assertions::assert_eq;

    const COUNT_DOWN: &str = r#"
        fn count_down(n)
          let i = n
          invariant(i >= 0)
          while i > 0
            i = i - 2
          end
          i
        end
        "#;

    #[test]
    fn test_invariant_holds() {
        let mut interp = load(COUNT_DOWN);
        assert_eq!(interp.call("count_down", vec![Value::Int(4)]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_invariant_broken_inside_body() {
        let mut interp = load(COUNT_DOWN);
        assert_eq!(
            violation_message(interp.call("count_down", vec![Value::Int(3)])),
            "Breach on Invariant Expression 'i >= 0' in function 'count_down'"
        );
    }

    #[test]
    fn test_invariant_checked_before_first_iteration() {
        let mut interp = load(
            r#"
            fn f(n)
              invariant(n >= 0)
              while true
                1 / 0
              end
            end
            "#,
        );
        let err = interp.call("f", vec![Value::Int(-1)]).unwrap_err();
        assert_eq!(err.as_violation().map(|v| v.kind), Some(ViolationKind::Invariant));
    }

    #[test]
    fn test_check_fires_before_next_statement() {
        let mut interp = load(
            r#"
            fn f(n)
              let i = n
              invariant(i >= 0)
              while true
                i = -1
                1 / 0
              end
            end
            "#,
        );
        let err = interp.call("f", vec![Value::Int(1)]).unwrap_err();
        assert_eq!(err.as_violation().map(|v| v.kind), Some(ViolationKind::Invariant));
    }

    #[test]
    fn test_nested_statements_are_not_checked() {
        let mut interp = load(
            r#"
            fn g(n)
              let i = 0
              invariant(i == 0)
              while n > 0
                if true
                  i = 1
                  i = 0
                end
                n = n - 1
              end
              i
            end
            "#,
        );
        assert_eq!(interp.call("g", vec![Value::Int(2)]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_nested_function_is_named_in_report() {
        let mut interp = load(
            r#"
            fn outer(n)
              fn inner(m)
                invariant(m < 3)
                while true
                  m = m + 1
                end
              end
              inner(n)
            end
            "#,
        );
        assert_eq!(
            violation_message(interp.call("outer", vec![Value::Int(0)])),
            "Breach on Invariant Expression 'm < 3' in function 'inner'"
        );
    }

    #[test]
    fn test_invariant_inside_contract() {
        let mut interp = load(
            r#"
            contract
              require(length(xs) > 0)
              ensure(result >= 0)
              fn total(xs)
                let acc = 0
                invariant(acc >= 0)
                for x in xs
                  acc = acc + x
                end
                acc
              end
            end
            "#,
        );
        assert_eq!(interp.call("total", vec![ints(&[1, 2])]).unwrap(), Value::Int(3));
        assert_eq!(
            violation_message(interp.call("total", vec![ints(&[1, -2, 5])])),
            "Breach on Invariant Expression 'acc >= 0' in function 'total'"
        );
        assert_eq!(
            violation_message(interp.call("total", vec![ints(&[])])),
            "Breach on Requirement Expression 'length(xs) > 0' in function 'total'"
        );
    }
}

// ============================================================================
// Configuration and Errors
// ============================================================================

mod configuration {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_disabled_weaver_skips_contract_checks_only() {
        let mut interp = Interpreter::new().with_weaver_config(WeaverConfig::disabled());
        interp
            .load(
                r#"
                contract
                  require(n > 0)
                  ensure(result == 0)
                  fn f(n)
                    invariant(n <= 10)
                    while n < 10
                      n = n + 1
                    end
                    n
                  end
                end
                "#,
            )
            .unwrap();

        // Requirement and ensure are gone
        assert_eq!(interp.call("f", vec![Value::Int(-20)]).unwrap(), Value::Int(10));
        // The invariant still fires
        assert_eq!(
            violation_message(interp.call("f", vec![Value::Int(50)])),
            "Breach on Invariant Expression 'n <= 10' in function 'f'"
        );
    }
}

mod errors {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_malformed_contract_is_not_registered() {
        let mut interp = Interpreter::new();
        let err = interp
            .load(
                r#"
                contract
                  require(x > 0)
                  result = a
                  result = b
                  fn f(x)
                    x
                  end
                end
                "#,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Contract(ContractError::DuplicateReturnAlias { .. })
        ));
        assert!(interp.global("f").is_none());
    }

    #[test]
    fn test_empty_clause_list() {
        let err = Interpreter::new()
            .load("contract\n  ensure()\n  fn f()\n    1\n  end\nend\n")
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Contract(ContractError::EmptyClauseList {
                keyword: "ensure",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_errors_are_reported() {
        let err = Interpreter::new().load("fn f(x)\n  x +\nend\n").unwrap_err();
        match err {
            LoadError::Parse(errors) => assert!(!errors.is_empty()),
            other => panic!("Expected parse errors, got {:?}", other),
        }
    }
}
