use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use log::debug;
use serde_json::Value;

use crate::processors::{ContextParser, FnProcessor, ParserProcessor, Processor, ProcessorContext};

/// Maps an artifact's logical name to the processors registered for it.
///
/// Built once by the process entry point and handed to the archive builder;
/// lookups preserve registration order per name.
#[derive(Default, Clone)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Vec<Arc<dyn Processor>>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already adapted processor under `name`.
    pub fn register(&mut self, name: &str, processor: Arc<dyn Processor>) -> &mut Self {
        debug!("Registering processor {} for {}", processor.id(), name);
        self.processors
            .entry(name.to_string())
            .or_default()
            .push(processor);
        self
    }

    /// Register a plain function or closure.
    pub fn register_fn<F>(&mut self, name: &str, id: &str, func: F) -> &mut Self
    where
        F: Fn(&ProcessorContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnProcessor::new(id, func)))
    }

    /// Register a parser object.
    pub fn register_parser<P>(&mut self, name: &str, parser: P) -> &mut Self
    where
        P: ContextParser + 'static,
    {
        self.register(name, Arc::new(ParserProcessor(parser)))
    }

    /// Processors registered under `name`, in registration order.
    pub fn lookup(&self, name: &str) -> &[Arc<dyn Processor>] {
        self.processors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.lookup(name).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.values().all(Vec::is_empty)
    }

    /// Logical names with at least one processor, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .processors
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for name in self.names() {
            let ids: Vec<&str> = self.lookup(name).iter().map(|p| p.id()).collect();
            map.entry(&name, &ids);
        }
        map.finish()
    }
}
