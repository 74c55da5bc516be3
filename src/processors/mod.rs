//! Pluggable per-artifact processors.
//!
//! A processor inspects the output of one artifact and may contribute a
//! derived JSON result. Processors come in two shapes:
//!
//! - a plain callable taking the context ([`FnProcessor`])
//! - a parser object exposing `parse_context` ([`ContextParser`], wrapped
//!   in [`ParserProcessor`])
//!
//! Both are adapted to the single [`Processor`] capability when they are
//! registered, so the archive builder invokes every processor the same way.
//! Invocation goes through [`invoke_isolated`], which turns errors and
//! panics into an [`InvocationOutcome::Failure`] instead of letting them
//! escape into the ingestion path.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;

/// Built-in processors registered by the binary
pub mod builtin;

/// Registry mapping logical artifact names to processors
pub mod registry;

pub use registry::ProcessorRegistry;

/// What a processor sees: the artifact output split into lines and the
/// physical path the output was written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorContext {
    pub content: Vec<String>,
    pub path: PathBuf,
}

impl ProcessorContext {
    pub fn new(output: &str, path: &Path) -> Self {
        Self {
            content: output.lines().map(str::to_string).collect(),
            path: path.to_path_buf(),
        }
    }
}

/// Uniform invocation interface for every registered processor.
pub trait Processor: Send + Sync {
    /// Stable identity used to key accumulated results.
    fn id(&self) -> &str;

    /// Inspect one artifact. `Ok(None)` means "nothing to report".
    fn invoke(&self, ctx: &ProcessorContext) -> Result<Option<Value>>;
}

/// Adapter for processors written as plain functions or closures.
pub struct FnProcessor<F> {
    id: String,
    func: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(&ProcessorContext) -> Result<Option<Value>> + Send + Sync,
{
    pub fn new(id: impl Into<String>, func: F) -> Self {
        Self { id: id.into(), func }
    }
}

impl<F> Processor for FnProcessor<F>
where
    F: Fn(&ProcessorContext) -> Result<Option<Value>> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn invoke(&self, ctx: &ProcessorContext) -> Result<Option<Value>> {
        (self.func)(ctx)
    }
}

/// Processors written as parser objects.
pub trait ContextParser: Send + Sync {
    fn name(&self) -> &str;

    fn parse_context(&self, ctx: &ProcessorContext) -> Result<Option<Value>>;
}

/// Adapter exposing a [`ContextParser`] as a [`Processor`].
pub struct ParserProcessor<P>(pub P);

impl<P: ContextParser> Processor for ParserProcessor<P> {
    fn id(&self) -> &str {
        self.0.name()
    }

    fn invoke(&self, ctx: &ProcessorContext) -> Result<Option<Value>> {
        self.0.parse_context(ctx)
    }
}

/// Result of one isolated processor invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// The processor ran; `None` means it had nothing to contribute.
    Success(Option<Value>),
    /// The processor returned an error or panicked.
    Failure(String),
}

impl InvocationOutcome {
    /// The value worth accumulating, if any.
    pub fn into_result(self) -> Option<Value> {
        match self {
            InvocationOutcome::Success(Some(value)) if is_truthy(&value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for InvocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationOutcome::Success(Some(_)) => write!(f, "result"),
            InvocationOutcome::Success(None) => write!(f, "no result"),
            InvocationOutcome::Failure(cause) => write!(f, "failed: {}", cause),
        }
    }
}

/// Run a processor, converting errors and panics into a failure outcome.
pub fn invoke_isolated(processor: &dyn Processor, ctx: &ProcessorContext) -> InvocationOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| processor.invoke(ctx))) {
        Ok(Ok(value)) => InvocationOutcome::Success(value),
        Ok(Err(e)) => InvocationOutcome::Failure(format!("{:#}", e)),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            InvocationOutcome::Failure(format!("panicked: {}", message))
        }
    }
}

/// Whether a result carries anything: null, `false`, zero and empty
/// strings, arrays or objects do not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
