//! Outcome handler table.
//!
//! Every terminal outcome of [`LifecycleClient::request`](crate::LifecycleClient::request)
//! is mapped through this table. Lookup order:
//! - success: `Status(status)`, then `DefaultSuccess`
//! - failure: `Status(status)` (when the error carries one), then `Code(code)`, then `DefaultError`

use crate::error::ErrorCode;
use crate::types::Response;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeTag {
    Status(u16),
    Code(ErrorCode),
    DefaultSuccess,
    DefaultError,
}

/// A terminal outcome, as handed to a handler.
#[derive(Debug)]
pub enum Outcome {
    Success(Response),
    Failure(Error),
}

impl Outcome {
    /// Built-in mapping: the response payload, or the error unchanged.
    pub fn into_default(self) -> Result<Value> {
        match self {
            Outcome::Success(resp) => Ok(resp.data),
            Outcome::Failure(err) => Err(err),
        }
    }

    fn lookup_order(&self) -> Vec<OutcomeTag> {
        match self {
            Outcome::Success(resp) => vec![OutcomeTag::Status(resp.status), OutcomeTag::DefaultSuccess],
            Outcome::Failure(err) => {
                let mut tags = Vec::with_capacity(3);
                if let Some(status) = err.http_status() {
                    tags.push(OutcomeTag::Status(status));
                }
                tags.push(OutcomeTag::Code(err.code()));
                tags.push(OutcomeTag::DefaultError);
                tags
            }
        }
    }
}

pub type Handler = Arc<dyn Fn(Outcome) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
pub struct HandlerTable {
    handlers: HashMap<OutcomeTag, Handler>,
}

impl HandlerTable {
    /// Table with only the built-in defaults.
    pub fn new() -> Self {
        let mut handlers: HashMap<OutcomeTag, Handler> = HashMap::new();
        handlers.insert(OutcomeTag::DefaultSuccess, Arc::new(Outcome::into_default));
        handlers.insert(OutcomeTag::DefaultError, Arc::new(Outcome::into_default));
        Self { handlers }
    }

    /// Build from an explicit map. Both default tags must be present.
    pub fn from_handlers(handlers: HashMap<OutcomeTag, Handler>) -> Result<Self> {
        for tag in [OutcomeTag::DefaultSuccess, OutcomeTag::DefaultError] {
            if !handlers.contains_key(&tag) {
                return Err(Error::configuration_with_context(
                    "handler table is missing a default handler",
                    ErrorContext::new()
                        .with_field_path(format!("{:?}", tag))
                        .with_source("handler_table"),
                ));
            }
        }
        Ok(Self { handlers })
    }

    pub fn on<F>(mut self, tag: OutcomeTag, handler: F) -> Self
    where
        F: Fn(Outcome) -> Result<Value> + Send + Sync + 'static,
    {
        self.handlers.insert(tag, Arc::new(handler));
        self
    }

    pub fn contains(&self, tag: OutcomeTag) -> bool {
        self.handlers.contains_key(&tag)
    }

    pub fn handle(&self, outcome: Outcome) -> Result<Value> {
        let handler = outcome
            .lookup_order()
            .into_iter()
            .find_map(|tag| self.handlers.get(&tag).cloned());
        match handler {
            Some(h) => h(outcome),
            None => outcome.into_default(),
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("tags", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
