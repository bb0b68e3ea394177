//! Request type passed into the engine

use serde::{Deserialize, Serialize};

/// One orchestration request
///
/// Created per invocation and never mutated; the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Raw request text
    pub text: String,
    /// Optional command/intent used by the router
    pub command: Option<String>,
}

impl Request {
    /// Create a request with no command (routes to all groups)
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            command: None,
        }
    }

    /// Set the routing command
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
}
