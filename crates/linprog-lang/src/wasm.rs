//! WASM bindings for the LP text format
//!
//! JavaScript-friendly entry points for editors and web front ends.

use wasm_bindgen::prelude::*;

use crate::compiler::{CompileError, Compiler, LoadError};
use crate::lexer::{Lexer, TokenKind};
use crate::parser::Parser;
use linprog_solver::{Solution, Solver};

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Parse source code and return the AST as JSON
#[wasm_bindgen]
pub fn parse(source: &str) -> Result<JsValue, JsValue> {
    let program = Parser::parse(source).map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&program).map_err(to_js_error)
}

/// Tokenize source code and return tokens as JSON
#[wasm_bindgen]
pub fn tokenize(source: &str) -> Result<JsValue, JsValue> {
    let tokens: Vec<TokenInfo> = Lexer::tokenize(source)
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| TokenInfo {
            kind: format!("{:?}", t.kind),
            text: t.text,
            start: t.span.start,
            end: t.span.end,
        })
        .collect();
    serde_wasm_bindgen::to_value(&tokens).map_err(to_js_error)
}

#[derive(serde::Serialize)]
struct TokenInfo {
    kind: String,
    text: String,
    start: usize,
    end: usize,
}

/// Validate source code and return diagnostics as JSON
#[wasm_bindgen]
pub fn validate(source: &str) -> JsValue {
    let diagnostics = get_diagnostics(source);
    serde_wasm_bindgen::to_value(&diagnostics).unwrap_or(JsValue::NULL)
}

#[derive(serde::Serialize)]
struct Diagnostic {
    start: usize,
    end: usize,
    severity: String,
    message: String,
}

fn get_diagnostics(source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    match Compiler::new().load(source) {
        Ok(_) => {}
        Err(e) => {
            let span = match &e {
                LoadError::Parse(parse) => parse.span(),
                LoadError::Compile(CompileError::DuplicateObjective { span, .. }) => Some(*span),
                LoadError::Compile(_) => None,
            };
            let (start, end) = span.map_or((0, source.len()), |s| (s.start, s.end));
            diagnostics.push(Diagnostic {
                start,
                end,
                severity: "error".to_string(),
                message: e.to_string(),
            });
        }
    }

    for token in Lexer::tokenize(source) {
        if token.kind == TokenKind::Error {
            diagnostics.push(Diagnostic {
                start: token.span.start,
                end: token.span.end,
                severity: "warning".to_string(),
                message: format!("Unrecognized character '{}'", token.text),
            });
        }
    }

    diagnostics
}

/// Solve the program in `source` and return the solution as JSON
#[wasm_bindgen]
pub fn solve(source: &str, max_iterations: Option<u32>) -> Result<JsValue, JsValue> {
    let problem = Compiler::new().load(source).map_err(to_js_error)?;

    let mut solver = Solver::new();
    if let Some(n) = max_iterations {
        solver = solver.with_max_iterations(n as usize);
    }
    let solution: Solution = solver.solve(&problem).map_err(to_js_error)?;

    serde_wasm_bindgen::to_value(&solution).map_err(to_js_error)
}
