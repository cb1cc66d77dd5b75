//! WASM bindings for Jinx.
//!
//! Exposes `parse()`, `render()` and `version()` to JavaScript via
//! wasm-bindgen. Errors are thrown as JS exceptions.

use jinx_exec::{Context, Evaluator, ExecError};
use jinx_parser::{ParseError, Parser};
use wasm_bindgen::prelude::*;

/// Canonical and debug forms of a parsed expression.
struct Parsed {
    canonical: String,
    ast: String,
}

fn parse_expression(source: &str) -> Result<Parsed, ParseError> {
    let expr = Parser::parse_expression(source)?;
    Ok(Parsed {
        canonical: expr.to_string(),
        ast: format!("{expr:#?}"),
    })
}

fn render_template(source: &str) -> Result<String, ExecError> {
    Evaluator::new().render_str(source, &mut Context::new())
}

/// Parse an expression.
///
/// Returns a JS object `{ canonical: string, ast: string }`.
/// Throws a JS error if the expression does not parse.
#[wasm_bindgen]
pub fn parse(source: &str) -> Result<JsValue, JsError> {
    let parsed = parse_expression(source).map_err(|e| JsError::new(&e.to_string()))?;

    let js_obj = js_sys::Object::new();
    js_sys::Reflect::set(&js_obj, &"canonical".into(), &parsed.canonical.into())
        .map_err(|_| JsError::new("Failed to set canonical property"))?;
    js_sys::Reflect::set(&js_obj, &"ast".into(), &parsed.ast.into())
        .map_err(|_| JsError::new("Failed to set ast property"))?;

    Ok(js_obj.into())
}

/// Render a template with an empty context.
#[wasm_bindgen]
pub fn render(source: &str) -> Result<String, JsError> {
    render_template(source).map_err(|e| JsError::new(&e.to_string()))
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
