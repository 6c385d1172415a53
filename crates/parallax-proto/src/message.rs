//! Runtime messages and target addressing.

use std::sync::OnceLock;

use crate::value::Value;

/// One remote call inside a [`crate::Packet`].
///
/// A message is immutable after decode apart from its response slot: the
/// target and arguments come off the wire, and exactly one response value
/// may be recorded during dispatch.
#[derive(Debug)]
pub struct Message {
    target_uri: String,
    response_uri: String,
    arguments: Vec<Value>,
    response: OnceLock<Value>,
}

impl Message {
    /// Creates a message addressed at `target_uri`.
    #[must_use]
    pub fn new(
        target_uri: impl Into<String>,
        response_uri: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Self {
        Self {
            target_uri: target_uri.into(),
            response_uri: response_uri.into(),
            arguments,
            response: OnceLock::new(),
        }
    }

    /// The dot-delimited target identifier, e.g. `"pizza.order"`.
    #[must_use]
    pub fn target_uri(&self) -> &str {
        &self.target_uri
    }

    /// The client-assigned response URI echoed in the reply envelope.
    #[must_use]
    pub fn response_uri(&self) -> &str {
        &self.response_uri
    }

    /// The ordered call arguments.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Parses the target identifier into its typed form.
    #[must_use]
    pub fn target(&self) -> TargetUri {
        TargetUri::parse(&self.target_uri)
    }

    /// Records the response for this message.
    ///
    /// The slot is single-use: the first response wins and later calls are
    /// no-ops. Returns `true` if this call recorded the response.
    pub fn respond(&self, value: Value) -> bool {
        self.response.set(value).is_ok()
    }

    /// The recorded response, if any handler has responded.
    #[must_use]
    pub fn response(&self) -> Option<&Value> {
        self.response.get()
    }

    /// Whether a response has been recorded.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.response.get().is_some()
    }
}

/// A parsed `namespace.method` addressing key.
///
/// The wire target is split on its final dot: everything before is the
/// service namespace, the final segment is the method name. A target with
/// no dot has an empty namespace. Parsing never fails; whether the
/// namespace resolves to a service is a separate, modelled outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUri {
    namespace: String,
    method: String,
}

impl TargetUri {
    /// Splits a raw target identifier into namespace and method.
    #[must_use]
    pub fn parse(target: &str) -> Self {
        match target.rsplit_once('.') {
            Some((namespace, method)) => Self {
                namespace: namespace.to_owned(),
                method: method.to_owned(),
            },
            None => Self {
                namespace: String::new(),
                method: target.to_owned(),
            },
        }
    }

    /// The service namespace (empty for bare method targets).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The method name (the final target segment).
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl std::fmt::Display for TargetUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.method)
        } else {
            write!(f, "{}.{}", self.namespace, self.method)
        }
    }
}
