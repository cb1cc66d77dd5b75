//! Tree-walking evaluator for expressions and template bodies.

use std::collections::BTreeMap;
use std::sync::Arc;

use jinx_lexer::Token;
use jinx_parser::ast::{FilterCall, TestCall};
use jinx_parser::{BinaryOp, ExprKind, Expression, Macro, Node, Parser};
use tracing::{debug, trace};

use crate::context::Context;
use crate::macros::MacroFunc;
use crate::operators;
use crate::registry::{FilterSet, TestSet};
use crate::value::Value;
use crate::varargs::VarArgs;
use crate::ExecError;

/// What macro bodies and callables are executed by.
pub trait Renderer {
    /// Evaluate `expr` in `ctx`. Failures are returned as [`Value::Error`].
    fn eval(&self, expr: &Expression, ctx: &mut Context) -> Value;

    /// Render `body` into `out`.
    fn execute(&self, body: &[Node], ctx: &mut Context, out: &mut String) -> Result<(), ExecError>;
}

type EvalResult = Result<Value, Arc<ExecError>>;

fn fail(token: &Token, message: impl Into<String>) -> Arc<ExecError> {
    Arc::new(ExecError::Eval {
        message: message.into(),
        line: token.span.line,
        column: token.span.column,
    })
}

/// Turn an error value coming back from a callable into `Err`.
fn check(value: Value) -> EvalResult {
    match value {
        Value::Error(err) => Err(err),
        value => Ok(value),
    }
}

fn into_owned(err: Arc<ExecError>) -> ExecError {
    Arc::try_unwrap(err).unwrap_or_else(|shared| (*shared).clone())
}

/// Evaluates expressions against a [`Context`], with host-registered
/// filters and tests.
#[derive(Debug)]
pub struct Evaluator {
    pub filters: FilterSet,
    pub tests: TestSet,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            filters: FilterSet::filters(),
            tests: TestSet::tests(),
        }
    }

    /// Declare `node` in the current scope of `ctx`.
    pub fn declare_macro(&self, node: Macro, ctx: &mut Context) -> Result<(), ExecError> {
        let name = node.name.clone();
        let func = MacroFunc::declare(Arc::new(node), self, ctx)?;
        ctx.define(name, Value::Callable(Arc::new(func)));
        Ok(())
    }

    /// Render a parsed template body.
    pub fn render(&self, body: &[Node], ctx: &mut Context) -> Result<String, ExecError> {
        let mut out = String::new();
        self.execute(body, ctx, &mut out)?;
        Ok(out)
    }

    /// Parse and render template source.
    pub fn render_str(&self, source: &str, ctx: &mut Context) -> Result<String, ExecError> {
        let body = Parser::parse_template(source)?;
        self.render(&body, ctx)
    }

    /// Parse and evaluate a single expression.
    pub fn eval_str(&self, source: &str, ctx: &mut Context) -> Result<Value, ExecError> {
        let expr = Parser::parse_expression(source)?;
        self.evaluate(&expr, ctx).map_err(into_owned)
    }

    fn evaluate(&self, expr: &Expression, ctx: &mut Context) -> EvalResult {
        trace!(node = %expr, "evaluate");

        match &expr.kind {
            ExprKind::Integer(n) => Ok(Value::Integer(*n)),
            ExprKind::Float(n) => Ok(Value::Float(*n)),
            ExprKind::String(s) => Ok(Value::String(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Name(name) => check(ctx.get(name).cloned().unwrap_or(Value::Null)),
            ExprKind::List(items) | ExprKind::Tuple(items) => {
                let values = items
                    .iter()
                    .map(|item| self.evaluate(item, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            }
            ExprKind::Dict(pairs) => {
                let mut map = BTreeMap::new();
                for pair in pairs {
                    let key = self.evaluate(&pair.key, ctx)?;
                    let value = self.evaluate(&pair.value, ctx)?;
                    map.insert(key.to_key(), value);
                }
                Ok(Value::Map(map))
            }
            ExprKind::GetAttr { node, attr } => {
                let value = self.evaluate(node, ctx)?;
                operators::getattr(&value, attr).map_err(|m| fail(&expr.token, m))
            }
            ExprKind::GetItem { node, arg } => {
                let value = self.evaluate(node, ctx)?;
                let key = self.evaluate(arg, ctx)?;
                operators::getitem(&value, &key).map_err(|m| fail(&expr.token, m))
            }
            ExprKind::GetItemRange { node, start, stop } => {
                let value = self.evaluate(node, ctx)?;
                let start = self.evaluate_optional(start.as_deref(), ctx)?;
                let stop = self.evaluate_optional(stop.as_deref(), ctx)?;
                operators::slice(&value, start.as_ref(), stop.as_ref()).map_err(|m| fail(&expr.token, m))
            }
            ExprKind::Call { func, args, kwargs } => {
                let callee = self.evaluate(func, ctx)?;
                let params = self.evaluate_arguments(args, kwargs, ctx)?;
                match callee {
                    Value::Callable(callable) => {
                        debug!(name = callable.name(), "call");
                        check(callable.call(self, ctx, params))
                    }
                    other => Err(fail(
                        &expr.token,
                        format!("'{}' object is not callable", other.type_name()),
                    )),
                }
            }
            ExprKind::Binary { left, op, right } => self.evaluate_binary(expr, left, *op, right, ctx),
            ExprKind::Negation(term) => Ok(Value::Bool(!self.evaluate(term, ctx)?.is_truthy())),
            ExprKind::Unary { op, term } => {
                let value = self.evaluate(term, ctx)?;
                operators::unary(*op, &value).map_err(|m| fail(&expr.token, m))
            }
            ExprKind::Test { expr: subject, test } => self.evaluate_test(expr, subject, test, ctx),
            ExprKind::Filtered {
                expr: subject,
                filter,
            } => self.evaluate_filter(subject, filter, ctx),
            ExprKind::InlineIf {
                condition,
                true_expr,
                false_expr,
            } => {
                if self.evaluate(condition, ctx)?.is_truthy() {
                    self.evaluate(true_expr, ctx)
                } else {
                    match false_expr {
                        Some(false_expr) => self.evaluate(false_expr, ctx),
                        None => Ok(Value::Null),
                    }
                }
            }
            ExprKind::VarArgs(_) | ExprKind::KwArgs(_) => Err(fail(
                &expr.token,
                format!("'{}' unpacking is only allowed in call arguments", expr.token.val),
            )),
        }
    }

    fn evaluate_optional(&self, expr: Option<&Expression>, ctx: &mut Context) -> Result<Option<Value>, Arc<ExecError>> {
        expr.map(|expr| self.evaluate(expr, ctx)).transpose()
    }

    fn evaluate_binary(
        &self,
        expr: &Expression,
        left: &Expression,
        op: BinaryOp,
        right: &Expression,
        ctx: &mut Context,
    ) -> EvalResult {
        let left = self.evaluate(left, ctx)?;
        match op {
            BinaryOp::And if !left.is_truthy() => Ok(left),
            BinaryOp::Or if left.is_truthy() => Ok(left),
            BinaryOp::And | BinaryOp::Or => self.evaluate(right, ctx),
            op => {
                let right = self.evaluate(right, ctx)?;
                operators::binary(op, &left, &right).map_err(|m| fail(&expr.token, m))
            }
        }
    }

    fn evaluate_test(&self, expr: &Expression, subject: &Expression, test: &TestCall, ctx: &mut Context) -> EvalResult {
        let Some(func) = self.tests.get(&test.name) else {
            return Err(Arc::new(ExecError::UnknownTest(test.name.clone())));
        };
        let value = self.evaluate(subject, ctx)?;
        let arg = self.evaluate_optional(test.arg.as_deref(), ctx)?;
        func(&value, arg.as_ref())
            .map(Value::Bool)
            .map_err(|m| fail(&expr.token, m))
    }

    fn evaluate_filter(&self, subject: &Expression, filter: &FilterCall, ctx: &mut Context) -> EvalResult {
        let Some(func) = self.filters.get(&filter.name) else {
            return Err(Arc::new(ExecError::UnknownFilter(filter.name.clone())));
        };
        let value = self.evaluate(subject, ctx)?;
        let params = self.evaluate_arguments(&filter.args, &filter.kwargs, ctx)?;
        check(func(&value, &params))
    }

    /// Evaluate call-site arguments, spreading `*list` and `**map` markers.
    /// Explicit keywords are applied after spread ones and win on conflict.
    fn evaluate_arguments(
        &self,
        args: &[Expression],
        kwargs: &[(String, Expression)],
        ctx: &mut Context,
    ) -> Result<VarArgs, Arc<ExecError>> {
        let mut params = VarArgs::new();

        for arg in args {
            match &arg.kind {
                ExprKind::VarArgs(inner) => match self.evaluate(inner, ctx)? {
                    Value::List(items) => params.args.extend(items),
                    other => {
                        return Err(fail(
                            &arg.token,
                            format!("argument after * must be a list, not '{}'", other.type_name()),
                        ))
                    }
                },
                ExprKind::KwArgs(inner) => match self.evaluate(inner, ctx)? {
                    Value::Map(map) => params.kwargs.extend(map),
                    other => {
                        return Err(fail(
                            &arg.token,
                            format!("argument after ** must be a map, not '{}'", other.type_name()),
                        ))
                    }
                },
                _ => params.args.push(self.evaluate(arg, ctx)?),
            }
        }

        for (name, value) in kwargs {
            let value = self.evaluate(value, ctx)?;
            params.kwargs.insert(name.clone(), value);
        }

        Ok(params)
    }
}

impl Renderer for Evaluator {
    fn eval(&self, expr: &Expression, ctx: &mut Context) -> Value {
        self.evaluate(expr, ctx).unwrap_or_else(Value::Error)
    }

    fn execute(&self, body: &[Node], ctx: &mut Context, out: &mut String) -> Result<(), ExecError> {
        for node in body {
            match node {
                Node::Data(text) => out.push_str(text),
                Node::Output(expr) => {
                    let value = self.evaluate(expr, ctx).map_err(into_owned)?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::BindError;
    use crate::registry::MacroSet;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn eval(source: &str) -> Value {
        eval_in(source, &mut Context::new())
    }

    fn eval_in(source: &str, ctx: &mut Context) -> Value {
        let expr = Parser::parse_expression(source).unwrap();
        Evaluator::new().eval(&expr, ctx)
    }

    fn context(vars: &[(&str, Value)]) -> Context {
        vars.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn macro_node(name: &str, args: &[&str], kwargs: &[(&str, &str)], body: &str) -> Macro {
        Macro {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            kwargs: kwargs
                .iter()
                .map(|(k, v)| (k.to_string(), Parser::parse_expression(v).unwrap()))
                .collect(),
            body: Parser::parse_template(body).unwrap(),
        }
    }

    #[test]
    fn test_literals_and_math() {
        assert_eq!(eval("1 + 2 * 3"), Value::Integer(7));
        assert_eq!(eval("2 ** 3 ** 2"), Value::Integer(64));
        assert_eq!(eval("-7 // 2"), Value::Integer(-4));
        assert_eq!(eval("'a' ~ 1 ~ none"), Value::from("a1"));
        assert_eq!(eval("[1, (2, 3)]").to_string(), "[1, [2, 3]]");
    }

    #[test]
    fn test_logic_short_circuits_and_yields_operand() {
        assert_eq!(eval("0 or 'x'"), Value::from("x"));
        assert_eq!(eval("'' and missing()"), Value::from(""));
        assert_eq!(eval("1 or missing()"), Value::Integer(1));
        assert_eq!(eval("not 0"), Value::Bool(true));
        assert_eq!(eval("2 not in [1, 2]"), Value::Bool(false));
    }

    #[test]
    fn test_unbound_names_are_null() {
        assert_eq!(eval("nothing"), Value::Null);
        assert_eq!(eval("nothing.deeper"), Value::Null);
    }

    #[test]
    fn test_postfix_access() {
        let mut user = BTreeMap::new();
        user.insert("name".to_string(), Value::from("ada"));
        let mut ctx = context(&[
            ("user", Value::Map(user)),
            ("items", Value::List(vec![Value::from(1), Value::from(2), Value::from(3)])),
        ]);

        assert_eq!(eval_in("user.name", &mut ctx), Value::from("ada"));
        assert_eq!(eval_in("user['name']", &mut ctx), Value::from("ada"));
        assert_eq!(eval_in("items.0", &mut ctx), Value::Integer(1));
        assert_eq!(eval_in("items[-1]", &mut ctx), Value::Integer(3));
        assert_eq!(eval_in("items[1:]", &mut ctx).to_string(), "[2, 3]");
    }

    #[test]
    fn test_dict_literal_last_key_wins() {
        assert_eq!(eval("{'a': 1, 'a': 2}['a']"), Value::Integer(2));
    }

    #[test]
    fn test_inline_if() {
        assert_eq!(eval("'y' if 1 else 'n'"), Value::from("y"));
        assert_eq!(eval("'y' if 0"), Value::Null);
    }

    #[test]
    fn test_errors_carry_position() {
        let value = eval("1 // 0");
        match value.error() {
            Some(ExecError::Eval { message, line, column }) => {
                assert_eq!(message, "division by zero");
                assert_eq!((*line, *column), (1, 3));
            }
            other => panic!("Expected eval error, got {other:?}"),
        }
        assert!(eval("1(2)").to_string().contains("not callable"));
    }

    #[test]
    fn test_filters_and_tests_come_from_registries() {
        let mut evaluator = Evaluator::new();
        evaluator
            .filters
            .register_fn("upper", |v, _| Value::from(v.to_string().to_uppercase()))
            .unwrap();
        evaluator
            .tests
            .register_fn("divisibleby", |v, arg| match (v, arg) {
                (Value::Integer(a), Some(Value::Integer(b))) if *b != 0 => Ok(a % b == 0),
                _ => Err("divisibleby expects integers".to_string()),
            })
            .unwrap();

        let mut ctx = Context::new();
        let upper = Parser::parse_expression("'ab' | upper ~ 'c'").unwrap();
        assert_eq!(evaluator.eval(&upper, &mut ctx), Value::from("ABc"));

        let test = Parser::parse_expression("9 is not divisibleby 3").unwrap();
        assert_eq!(evaluator.eval(&test, &mut ctx), Value::Bool(false));

        let unknown = Parser::parse_expression("x | nope").unwrap();
        assert_eq!(
            evaluator.eval(&unknown, &mut ctx).error(),
            Some(&ExecError::UnknownFilter("nope".into()))
        );
    }

    #[test]
    fn test_host_function_receives_spread_arguments() {
        let mut ctx = context(&[
            ("args", Value::List(vec![Value::from(1), Value::from(2)])),
            ("count", Value::function("count", |p| Value::from(format!("{}/{}", p.args.len(), p.kwargs.len())))),
        ]);
        assert_eq!(eval_in("count(0, *args, x=1)", &mut ctx), Value::from("3/1"));
        assert_eq!(eval_in("count(**{'a': 1, 'b': 2})", &mut ctx), Value::from("0/2"));
        assert!(eval_in("count(*1)", &mut ctx).is_error());
    }

    #[test]
    fn test_render_template() {
        let mut ctx = context(&[("name", Value::from("World")), ("n", Value::Null)]);
        let out = Evaluator::new()
            .render_str("Hello, {{ name }}!{{ n }} {{ 1 == 1 }}", &mut ctx)
            .unwrap();
        assert_eq!(out, "Hello, World! True");
    }

    #[test]
    fn test_macro_call_binds_arguments() {
        let evaluator = Evaluator::new();
        let mut ctx = Context::new();
        let node = macro_node("greet", &["name"], &[("greeting", "'Hello'")], "{{ greeting }}, {{ name }}!");
        evaluator.declare_macro(node, &mut ctx).unwrap();

        assert_eq!(eval_in("greet('Ada')", &mut ctx), Value::SafeString("Hello, Ada!".into()));
        assert_eq!(
            eval_in("greet('Ada', greeting='Hi')", &mut ctx),
            Value::SafeString("Hi, Ada!".into())
        );
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_macro_signature_error_names_macro() {
        let evaluator = Evaluator::new();
        let mut ctx = Context::new();
        evaluator
            .declare_macro(macro_node("m", &["a", "b"], &[("c", "10")], "{{ a }}"), &mut ctx)
            .unwrap();

        let value = eval_in("m(1)", &mut ctx);
        assert_eq!(
            value.error(),
            Some(&ExecError::Signature {
                name: "m".into(),
                source: BindError::MissingArgument("b".into()),
            })
        );
        assert_eq!(
            value.to_string(),
            "Wrong 'm' macro signature: missing required positional argument: 'b'"
        );
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_macro_variadics_detected_from_body() {
        let evaluator = Evaluator::new();
        let mut ctx = Context::new();
        evaluator
            .declare_macro(macro_node("m", &["a"], &[], "{{ a }}:{{ varargs }}:{{ kwargs }}"), &mut ctx)
            .unwrap();

        assert_eq!(
            eval_in("m(1, 2, 3, k='v')", &mut ctx).to_string(),
            "1:[2, 3]:{'k': 'v'}"
        );
        assert_eq!(eval_in("m(1)", &mut ctx).to_string(), "1:[]:{}");
    }

    #[test]
    fn test_macro_without_variadics_rejects_extras() {
        let evaluator = Evaluator::new();
        let mut ctx = Context::new();
        evaluator.declare_macro(macro_node("m", &["a"], &[], "{{ a }}"), &mut ctx).unwrap();

        assert!(eval_in("m(1, 2)", &mut ctx).to_string().contains("expected at most 1"));
        assert!(eval_in("m(1, k=2)", &mut ctx).to_string().contains("unexpected keyword argument: 'k'"));
    }

    #[test]
    fn test_macro_defaults_are_evaluated_at_declaration() {
        let evaluator = Evaluator::new();
        let mut ctx = context(&[("base", Value::from(1))]);
        evaluator
            .declare_macro(macro_node("m", &[], &[("x", "base + 1")], "{{ x }}"), &mut ctx)
            .unwrap();

        ctx.set("base", Value::from(100));
        assert_eq!(eval_in("m()", &mut ctx).to_string(), "2");
    }

    #[test]
    fn test_macro_default_failure_is_reported() {
        let evaluator = Evaluator::new();
        let mut ctx = Context::new();
        let err = evaluator
            .declare_macro(macro_node("m", &[], &[("x", "1 / 0")], ""), &mut ctx)
            .unwrap_err();
        assert!(err.to_string().starts_with("Unable to evaluate parameter x of macro 'm'"));
        assert!(!ctx.has("m"));
    }

    #[test]
    fn test_macro_body_sees_closure_not_caller() {
        let evaluator = Evaluator::new();
        let mut ctx = context(&[("who", Value::from("global"))]);
        evaluator.declare_macro(macro_node("m", &[], &[], "{{ who }}"), &mut ctx).unwrap();

        ctx.inherit();
        ctx.define("who", Value::from("caller"));
        assert_eq!(eval_in("m()", &mut ctx).to_string(), "global");
        assert_eq!(eval_in("who", &mut ctx).to_string(), "caller");
    }

    #[test]
    fn test_macro_arguments_shadow_outer_names() {
        let evaluator = Evaluator::new();
        let mut ctx = context(&[("a", Value::from("outer"))]);
        evaluator.declare_macro(macro_node("m", &["a"], &[], "{{ a }}"), &mut ctx).unwrap();

        assert_eq!(eval_in("m('inner')", &mut ctx).to_string(), "inner");
        assert_eq!(ctx.get("a"), Some(&Value::from("outer")));
    }

    #[test]
    fn test_macro_body_failure_is_wrapped() {
        let evaluator = Evaluator::new();
        let mut ctx = Context::new();
        evaluator.declare_macro(macro_node("m", &["a"], &[], "{{ a + 'x' }}"), &mut ctx).unwrap();

        let value = eval_in("m(1)", &mut ctx);
        assert!(matches!(
            value.error(),
            Some(ExecError::MacroExecution { name, .. }) if name == "m"
        ));
        assert!(value.to_string().contains("unsupported operand types for +"));
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_macro_called_after_scope_ends() {
        let evaluator = Evaluator::new();
        let mut ctx = Context::new();
        ctx.inherit();
        evaluator.declare_macro(macro_node("m", &[], &[], "x"), &mut ctx).unwrap();
        let func = ctx.get("m").cloned().unwrap();
        ctx.pop();
        ctx.inherit();
        ctx.define("m", func);

        assert_eq!(
            eval_in("m()", &mut ctx).error(),
            Some(&ExecError::StaleScope("m".into()))
        );
    }

    #[test]
    fn test_macros_call_each_other() {
        let evaluator = Evaluator::new();
        let mut ctx = Context::new();
        evaluator.declare_macro(macro_node("inner", &["x"], &[], "<{{ x }}>"), &mut ctx).unwrap();
        evaluator
            .declare_macro(macro_node("outer", &[], &[], "[{{ inner(*varargs) }}]"), &mut ctx)
            .unwrap();

        assert_eq!(eval_in("outer(1)", &mut ctx).to_string(), "[<1>]");
    }

    #[test]
    fn test_macro_set_exports_into_context() {
        let evaluator = Evaluator::new();
        let mut scratch = Context::new();
        evaluator.declare_macro(macro_node("m", &[], &[], "hi"), &mut scratch).unwrap();

        let mut macros = MacroSet::macros();
        let Some(Value::Callable(func)) = scratch.get("m").cloned() else {
            panic!("macro was not declared");
        };
        macros.register("m", func.clone()).unwrap();
        assert!(macros.register("m", func).is_err());

        scratch.inherit();
        macros.export(&mut scratch);
        assert_eq!(eval_in("m()", &mut scratch).to_string(), "hi");
    }

    #[test]
    fn test_macro_exported_into_other_context_is_stale() {
        let evaluator = Evaluator::new();
        let mut scratch = Context::new();
        scratch.inherit();
        scratch.define("x", Value::from("declaring-scope"));
        evaluator.declare_macro(macro_node("m", &[], &[], "{{ x }}"), &mut scratch).unwrap();

        let mut macros = MacroSet::macros();
        let Some(Value::Callable(func)) = scratch.get("m").cloned() else {
            panic!("macro was not declared");
        };
        macros.register("m", func).unwrap();

        let mut other = Context::new();
        other.inherit();
        other.define("x", Value::from("unrelated-context-secret"));
        macros.export(&mut other);

        let value = eval_in("m()", &mut other);
        assert_eq!(value.error(), Some(&ExecError::StaleScope("m".into())));
        assert!(!value.to_string().contains("secret"));
        assert_eq!(other.depth(), 2);

        assert_eq!(eval_in("m()", &mut scratch).to_string(), "declaring-scope");
    }
}
