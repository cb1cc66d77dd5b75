//! Macro signatures, argument binding and invocation.
//!
//! A macro is declared once: its keyword defaults are evaluated in the
//! declaring scope, and that scope is captured as the macro's closure. Each
//! call binds the call-site arguments against the signature, runs the body
//! in a fresh child of the closure scope and returns the rendered body.

use std::collections::BTreeMap;
use std::sync::Arc;

use jinx_parser::Macro;
use tracing::debug;

use crate::context::{Context, ScopeId};
use crate::eval::Renderer;
use crate::value::{Callable, Value};
use crate::varargs::VarArgs;
use crate::ExecError;

/// Name under which surplus positional arguments are bound.
pub const VARARGS: &str = "varargs";

/// Name under which unknown keyword arguments are bound.
pub const KWARGS: &str = "kwargs";

/// Why a call did not fit a signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("expected at most {expected} positional arguments, got {got}")]
    TooManyArguments { expected: usize, got: usize },

    #[error("got an unexpected keyword argument: '{0}'")]
    UnexpectedKeyword(String),

    #[error("missing required positional argument: '{0}'")]
    MissingArgument(String),
}

/// A keyword parameter and its already-evaluated default.
#[derive(Debug, Clone, PartialEq)]
pub struct KwArg {
    pub name: String,
    pub default: Value,
}

impl KwArg {
    pub fn new(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
        }
    }
}

/// Parameter list of a callable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    /// Required parameters, in order.
    pub args: Vec<String>,
    /// Keyword parameters, in order. They may also be filled positionally.
    pub kwargs: Vec<KwArg>,
    pub accepts_varargs: bool,
    pub accepts_kwargs: bool,
}

impl Signature {
    pub fn new(args: &[&str], kwargs: Vec<KwArg>) -> Self {
        Self {
            args: args.iter().map(|a| a.to_string()).collect(),
            kwargs,
            accepts_varargs: false,
            accepts_kwargs: false,
        }
    }

    pub fn with_varargs(mut self) -> Self {
        self.accepts_varargs = true;
        self
    }

    pub fn with_kwargs(mut self) -> Self {
        self.accepts_kwargs = true;
        self
    }

    /// Parameter names in positional order: required first, then keyword.
    fn names(&self) -> impl Iterator<Item = &str> {
        self.args
            .iter()
            .map(String::as_str)
            .chain(self.kwargs.iter().map(|kw| kw.name.as_str()))
    }

    /// Map call-site arguments onto parameter names.
    ///
    /// Positionals fill parameters in order; only what is left over goes to
    /// `varargs`. Keywords then overwrite by name, and unknown keywords go
    /// to `kwargs`. `varargs` and `kwargs` are bound, possibly empty,
    /// whenever the signature accepts them.
    pub fn bind(&self, params: &VarArgs) -> Result<BTreeMap<String, Value>, BindError> {
        let mut mapping: BTreeMap<String, Value> = self
            .kwargs
            .iter()
            .map(|kw| (kw.name.clone(), kw.default.clone()))
            .collect();

        let names: Vec<&str> = self.names().collect();
        let mut varargs = Vec::new();
        for (i, value) in params.args.iter().enumerate() {
            match names.get(i) {
                Some(name) => {
                    mapping.insert((*name).to_string(), value.clone());
                }
                None if self.accepts_varargs => varargs.push(value.clone()),
                None => {
                    return Err(BindError::TooManyArguments {
                        expected: names.len(),
                        got: params.args.len(),
                    })
                }
            }
        }

        let mut kwargs = BTreeMap::new();
        for (name, value) in &params.kwargs {
            if names.contains(&name.as_str()) {
                mapping.insert(name.clone(), value.clone());
            } else if self.accepts_kwargs {
                kwargs.insert(name.clone(), value.clone());
            } else {
                return Err(BindError::UnexpectedKeyword(name.clone()));
            }
        }

        if let Some(missing) = names.iter().find(|name| !mapping.contains_key(**name)) {
            return Err(BindError::MissingArgument((*missing).to_string()));
        }

        if self.accepts_varargs {
            mapping.insert(VARARGS.to_string(), Value::List(varargs));
        }
        if self.accepts_kwargs {
            mapping.insert(KWARGS.to_string(), Value::Map(kwargs));
        }

        Ok(mapping)
    }
}

/// A declared macro, callable from expressions.
#[derive(Debug)]
pub struct MacroFunc {
    node: Arc<Macro>,
    signature: Signature,
    closure: ScopeId,
}

impl MacroFunc {
    /// Evaluate the keyword defaults of `node` in the current scope of `ctx`
    /// and capture that scope. The body accepts surplus positionals or
    /// keywords only if it references `varargs` or `kwargs`.
    pub fn declare(node: Arc<Macro>, renderer: &dyn Renderer, ctx: &mut Context) -> Result<Self, ExecError> {
        let mut kwargs = Vec::with_capacity(node.kwargs.len());
        for (param, default) in &node.kwargs {
            let value = renderer.eval(default, ctx);
            if let Value::Error(source) = value {
                return Err(ExecError::DefaultValue {
                    name: node.name.clone(),
                    param: param.clone(),
                    source,
                });
            }
            kwargs.push(KwArg {
                name: param.clone(),
                default: value,
            });
        }

        let signature = Signature {
            args: node.args.clone(),
            kwargs,
            accepts_varargs: node.references(VARARGS),
            accepts_kwargs: node.references(KWARGS),
        };

        debug!(name = %node.name, ?signature, "declared macro");

        Ok(Self {
            closure: ctx.current(),
            node,
            signature,
        })
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl Callable for MacroFunc {
    fn name(&self) -> &str {
        &self.node.name
    }

    fn call(&self, renderer: &dyn Renderer, ctx: &mut Context, args: VarArgs) -> Value {
        let name = self.node.name.clone();

        if ctx.inherit_from(self.closure).is_none() {
            debug!(%name, "macro scope is gone");
            return Value::from_error(ExecError::StaleScope(name));
        }

        let mapping = match self.signature.bind(&args) {
            Ok(mapping) => mapping,
            Err(source) => {
                ctx.pop();
                debug!(%name, error = %source, "macro call does not match signature");
                return Value::from_error(ExecError::Signature { name, source });
            }
        };
        ctx.update(mapping);

        let mut out = String::new();
        let result = renderer.execute(&self.node.body, ctx, &mut out);
        ctx.pop();

        match result {
            Ok(()) => Value::SafeString(out),
            Err(source) => {
                debug!(%name, error = %source, "macro body failed");
                Value::from_error(ExecError::MacroExecution {
                    name,
                    source: Arc::new(source),
                })
            }
        }
    }
}
