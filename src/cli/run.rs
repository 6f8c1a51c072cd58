//! Execute programs without a database connection

use std::{cell::RefCell, rc::Rc};

use serde_json::json;

use super::CliError;
use crate::{
    ApiRequest, ExecutorError, Functions, RequestExecutor, Stmt, Value, Vm, output::to_json_pretty,
    parse,
};

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Program text
    pub source: String,
    /// Pretty-print structured results
    pub pretty: bool,
}

/// Printable results of a run, in statement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outputs: Vec<String>,
    /// Error messages of failed statements
    pub errors: Vec<String>,
}

/// Stands in for a connection: records every request and answers with an
/// echo of it as JSON.
#[derive(Debug, Clone, Default)]
pub struct DryRunExecutor {
    requests: Rc<RefCell<Vec<ApiRequest>>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        DryRunExecutor::default()
    }

    /// Requests seen so far, shared with every clone of this executor.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }
}

impl RequestExecutor for DryRunExecutor {
    fn execute(&mut self, request: &ApiRequest) -> Result<String, ExecutorError> {
        self.requests.borrow_mut().push(request.clone());
        let options: serde_json::Map<String, serde_json::Value> = request
            .options
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::Value::from(value)))
            .collect();
        let echo = json!({
            "method": request.method.as_str(),
            "path": request.path,
            "options": options,
            "payload": request.payload,
        });
        Ok(echo.to_string())
    }
}

/// Runs a whole program against a [`DryRunExecutor`].
///
/// Syntax errors abort the run. Statement errors are collected and the run
/// continues. Each result a loop body produces is its own output.
pub fn execute_run(options: &RunOptions) -> Result<RunReport, CliError> {
    let executor = DryRunExecutor::new();
    let mut vm = Vm::new(Functions::with_builtins(), executor);
    let statements = parse(&options.source)?;

    let mut report = RunReport::default();
    for stmt in &statements {
        match (stmt, vm.execute(stmt).result) {
            // One output per statement the loop body produced
            (Stmt::ForIn(_), Ok(Some(Value::Array(results)))) => report
                .outputs
                .extend(results.iter().map(|value| render(value, options.pretty))),
            (_, Ok(Some(value))) => report.outputs.push(render(&value, options.pretty)),
            (_, Ok(None)) => {}
            (_, Err(err)) => report.errors.push(err.to_string()),
        }
    }
    Ok(report)
}

fn render(value: &Value, pretty: bool) -> String {
    match value {
        Value::String(s) if pretty => serde_json::from_str::<serde_json::Value>(s)
            .map_or_else(|_| s.clone(), |json| to_json_pretty(&Value::from(json))),
        Value::String(s) => s.clone(),
        other if pretty => to_json_pretty(other),
        other => other.to_canonical_string(),
    }
}
