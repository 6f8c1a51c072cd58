// tests/integration_tests.rs

use esq_lang::cli::{
    CheckMode, CheckOptions, CheckResult, CliError, DryRunExecutor, RunOptions, execute_check,
    execute_run,
};
use esq_lang::dump::dump_program;
use esq_lang::{FormatOptions, Functions, Value, Vm, format_program, parse, to_json};
use pretty_assertions::assert_eq;

fn session() -> (Vm, DryRunExecutor) {
    let executor = DryRunExecutor::new();
    let vm = Vm::new(Functions::with_builtins(), executor.clone());
    (vm, executor)
}

fn check(source: &str, mode: CheckMode) -> Result<CheckResult, CliError> {
    execute_check(&CheckOptions {
        source: source.to_string(),
        mode,
        payload_only: false,
    })
}

// ============================================================================
// Properties of the language
// ============================================================================

#[test]
fn test_format_parse_format_is_stable() {
    let source = "let index = \"logs\"\n\
                  for i in range(2) {\n\
                  GET (\"/\" + index + \"-\" + i + \"/_search\") size=5\n\
                  {\"query\": {\"match_all\": {}}}\n\
                  }\n\n\
                  echo @pretty _.hits k=1";
    for pretty in [true, false] {
        let first = format_program(&parse(source).unwrap(), pretty);
        let second = format_program(&parse(&first).unwrap(), pretty);
        let third = format_program(&parse(&second).unwrap(), pretty);
        assert_eq!(first, second);
        assert_eq!(second, third);
    }
}

#[test]
fn test_precedence_dump() {
    let statements = parse("f 1 * 2 + (3 - 2) g(3)").unwrap();
    assert_eq!(
        dump_program(&statements),
        "FuncCall statement\n\
         \x20 Name f\n\
         \x20 BinOp +\n\
         \x20   BinOp *\n\
         \x20     Number 1\n\
         \x20     Number 2\n\
         \x20   Group\n\
         \x20     BinOp -\n\
         \x20       Number 3\n\
         \x20       Number 2\n\
         \x20 FuncCall expression\n\
         \x20   Name g\n\
         \x20   Number 3"
    );
}

#[test]
fn test_ndjson_bulk_payload() {
    let (mut vm, executor) = session();
    let outcomes = vm
        .run("PUT _bulk\n{ \"index\" : { \"_index\" : \"test\", \"_id\" : \"1\" } }\n{ \"field1\" : \"value1\" }")
        .unwrap();
    assert!(outcomes[0].result.is_ok());

    let payload = executor.requests()[0].payload.clone().unwrap();
    let lines: Vec<&str> = payload.split('\n').collect();
    assert_eq!(
        lines,
        vec![
            r#"{"index":{"_index":"test","_id":"1"}}"#,
            r#"{"field1":"value1"}"#,
        ]
    );
    for line in lines {
        assert!(serde_json::from_str::<serde_json::Value>(line).is_ok());
    }
}

#[test]
fn test_error_location() {
    let err = parse("get\n").unwrap_err();
    assert_eq!((err.line, err.column), (1, 4));
    assert!(err.to_string().starts_with("Syntax error at Line 1, Column 4:\n"));
}

#[test]
fn test_nested_assignment() {
    let (mut vm, _) = session();
    vm.run("let foo={\"a\":[3,4,5]}\n\nlet foo.@a.1 = 42").unwrap();
    assert_eq!(
        to_json(vm.env().get("foo").unwrap()),
        r#"{"a":[3,42,5]}"#
    );
}

#[test]
fn test_loop_bindings_outlive_the_loop() {
    let (mut vm, _) = session();
    vm.run("for x in [1,2,3] {\n  let y = x\n}").unwrap();
    assert_eq!(vm.env().get("y"), Some(&Value::Integer(3)));
    assert_eq!(vm.env().get("x"), Some(&Value::Integer(3)));
}

#[test]
fn test_date_math_path() {
    let (mut vm, executor) = session();
    vm.run("GET /<my-index-{now/d}>/_search").unwrap();
    assert_eq!(
        executor.requests()[0].path,
        "/%3Cmy-index-%7Bnow%2Fd%7D%3E/_search"
    );
}

#[test]
fn test_session_keeps_state_between_runs() {
    let (mut vm, executor) = session();
    vm.run("let index = \"logs\"").unwrap();
    vm.run("GET (index + \"/_count\")").unwrap();
    vm.run("let path = _.path").unwrap();

    assert_eq!(executor.requests()[0].to_string(), "GET /logs/_count");
    assert_eq!(vm.env().get("path"), Some(&Value::from("/logs/_count")));
}

// ============================================================================
// Check command
// ============================================================================

#[test]
fn test_check_valid_and_invalid() {
    assert_eq!(check("GET /x", CheckMode::Syntax).unwrap(), CheckResult::SyntaxValid);

    match check("let a = )", CheckMode::Syntax) {
        Err(CliError::Syntax(err)) => {
            assert_eq!((err.line, err.column), (1, 9));
        }
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_check_format() {
    assert_eq!(
        check("get /x size=1+1\n{'a':1}", CheckMode::Format(FormatOptions::pretty())).unwrap(),
        CheckResult::Formatted("GET /x size=1 + 1\n{\n  'a': 1\n}".to_string())
    );
    assert_eq!(
        check(
            "f {'a': {'b': 1}}",
            CheckMode::Format(FormatOptions {
                pretty: true,
                indent: 4,
            })
        )
        .unwrap(),
        CheckResult::Formatted("f {\n    'a': {\n        'b': 1\n    }\n}".to_string())
    );
    assert_eq!(
        check("f {'a': [1, 2]}", CheckMode::Format(FormatOptions::default())).unwrap(),
        CheckResult::Formatted("f {'a':[1,2]}".to_string())
    );
}

#[test]
fn test_check_dump() {
    assert_eq!(
        check("!ls", CheckMode::Dump).unwrap(),
        CheckResult::Dump("ShellOut ls".to_string())
    );
}

#[test]
fn test_check_payload_only() {
    let options = |mode| CheckOptions {
        source: "{\"a\": 1}\n\n{\"b\": [true]}".to_string(),
        mode,
        payload_only: true,
    };

    assert_eq!(
        execute_check(&options(CheckMode::Syntax)).unwrap(),
        CheckResult::SyntaxValid
    );
    assert_eq!(
        execute_check(&options(CheckMode::Format(FormatOptions::default()))).unwrap(),
        CheckResult::Formatted("{\"a\":1}\n{\"b\":[true]}".to_string())
    );
    assert_eq!(
        execute_check(&options(CheckMode::Dump)).unwrap(),
        CheckResult::Dump(
            "Dict\n  KeyValue :\n    String \"a\"\n    Number 1\n\
             Dict\n  KeyValue :\n    String \"b\"\n    Array\n      Name true"
                .to_string()
        )
    );
}

// ============================================================================
// Run command
// ============================================================================

#[test]
fn test_run_collects_outputs_and_errors() {
    let report = execute_run(&RunOptions {
        source: "let a = 1\n\necho a\n\nlet b = missing\n\n!ls".to_string(),
        pretty: false,
    })
    .unwrap();

    assert_eq!(report.outputs, vec!["1".to_string(), "ls".to_string()]);
    assert_eq!(
        report.errors,
        vec!["Name error: 'missing' is not defined".to_string()]
    );
}

#[test]
fn test_run_echoes_requests() {
    let report = execute_run(&RunOptions {
        source: "GET /x".to_string(),
        pretty: false,
    })
    .unwrap();
    assert_eq!(
        report.outputs,
        vec![r#"{"method":"GET","path":"/x","options":{},"payload":null}"#.to_string()]
    );

    let report = execute_run(&RunOptions {
        source: "GET /x".to_string(),
        pretty: true,
    })
    .unwrap();
    assert_eq!(
        report.outputs,
        vec![
            "{\n  \"method\": \"GET\",\n  \"path\": \"/x\",\n  \"options\": {},\n  \"payload\": null\n}"
                .to_string()
        ]
    );
}

#[test]
fn test_run_reports_each_loop_result() {
    let report = execute_run(&RunOptions {
        source: "for i in range(2) {\n  GET (\"/i-\" + i)\n}\n\necho done".to_string(),
        pretty: false,
    })
    .unwrap();
    assert_eq!(
        report.outputs,
        vec![
            r#"{"method":"GET","path":"/i-0","options":{},"payload":null}"#.to_string(),
            r#"{"method":"GET","path":"/i-1","options":{},"payload":null}"#.to_string(),
            "done".to_string(),
        ]
    );
    assert!(report.errors.is_empty());
}

#[test]
fn test_run_aborts_on_syntax_error() {
    let result = execute_run(&RunOptions {
        source: "echo 1\n\nlet = 2".to_string(),
        pretty: false,
    });
    assert!(matches!(result, Err(CliError::Syntax(_))));
}
