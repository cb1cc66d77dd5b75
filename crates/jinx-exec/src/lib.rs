//! Jinx Exec
//!
//! Runtime side of the expression core: the dynamic [`Value`] type, the
//! chained variable [`Context`], call-site [`VarArgs`], the macro argument
//! binder and invoker, and an [`Evaluator`] that walks the expression AST.
//!
//! ```text
//! Call site → VarArgs → Signature::bind → child scope → Renderer::execute → Value
//! ```

use std::sync::Arc;

pub mod context;
pub mod eval;
pub mod macros;
pub mod operators;
pub mod registry;
pub mod value;
pub mod varargs;

pub use context::{Context, ScopeId};
pub use eval::{Evaluator, Renderer};
pub use macros::{BindError, KwArg, MacroFunc, Signature};
pub use registry::{FilterSet, MacroSet, Registry, TestSet};
pub use value::{Callable, Function, Value};
pub use varargs::VarArgs;

/// Evaluation error. Carried inside [`Value::Error`] while evaluating and
/// returned as `Err` from [`Renderer::execute`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecError {
    /// A macro call did not match the macro's signature.
    #[error("Wrong '{name}' macro signature: {source}")]
    Signature {
        name: String,
        #[source]
        source: BindError,
    },

    /// The macro body failed while executing.
    #[error("Unable to execute macro '{name}': {source}")]
    MacroExecution {
        name: String,
        #[source]
        source: Arc<ExecError>,
    },

    /// A keyword parameter default could not be evaluated at declaration.
    #[error("Unable to evaluate parameter {param} of macro '{name}': {source}")]
    DefaultValue {
        name: String,
        param: String,
        #[source]
        source: Arc<ExecError>,
    },

    /// A macro was called after the scope it closes over was discarded, or
    /// from a context other than the one it was declared in.
    #[error("Macro '{0}' was called outside the scope it was declared in")]
    StaleScope(String),

    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("Unknown test '{0}'")]
    UnknownTest(String),

    /// Registering a name twice, or replacing a name that is not registered.
    #[error("{kind} with name '{name}' {problem}")]
    Registry {
        kind: &'static str,
        name: String,
        problem: &'static str,
    },

    /// Any other evaluation failure, located at the offending node.
    #[error("{message} (line {line}, column {column})")]
    Eval {
        message: String,
        line: usize,
        column: usize,
    },

    #[error(transparent)]
    Parse(#[from] jinx_parser::ParseError),
}
