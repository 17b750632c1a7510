//! Block errors raised when a flow-control check rejects a request.
//!
//! Every rule family reports rejection through [`BlockError`]. The fallback
//! layer only cares whether a cause was a block or something else, which is
//! what [`FallbackCause`] captures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rule family that produced a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// QPS or concurrency limit exceeded
    Flow,
    /// Circuit breaker open
    Degrade,
    /// System-level adaptive protection
    System,
    /// Origin not allowed by an authority rule
    Authority,
    /// Hot-parameter limit exceeded
    ParamFlow,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Flow => "flow",
            BlockType::Degrade => "degrade",
            BlockType::System => "system",
            BlockType::Authority => "authority",
            BlockType::ParamFlow => "param_flow",
        }
    }

    /// Parse a block type name as it appears on the command line.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flow" => Some(BlockType::Flow),
            "degrade" => Some(BlockType::Degrade),
            "system" => Some(BlockType::System),
            "authority" => Some(BlockType::Authority),
            "param_flow" | "param-flow" | "paramflow" => Some(BlockType::ParamFlow),
            _ => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request was rejected by a rule on `resource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockError {
    pub block_type: BlockType,
    /// Resource (route id or custom API name) that was checked
    pub resource: String,
    /// Identifier of the rule that triggered, when known
    pub rule_id: Option<String>,
    pub message: String,
}

impl BlockError {
    pub fn new(block_type: BlockType, resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self {
            message: format!("{block_type} rule blocked resource '{resource}'"),
            block_type,
            resource,
            rule_id: None,
        }
    }

    pub fn flow(resource: impl Into<String>) -> Self {
        Self::new(BlockType::Flow, resource)
    }

    pub fn degrade(resource: impl Into<String>) -> Self {
        Self::new(BlockType::Degrade, resource)
    }

    pub fn authority(resource: impl Into<String>) -> Self {
        Self::new(BlockType::Authority, resource)
    }

    #[must_use]
    pub fn with_rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule_id {
            Some(rule_id) => write!(f, "{} (rule {})", self.message, rule_id),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for BlockError {}

/// Why a fallback response is being produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackCause {
    /// A flow-control rule rejected the request
    Block(BlockError),
    /// Anything else, typically an upstream failure
    Other(String),
}

impl FallbackCause {
    #[inline]
    pub fn is_block(&self) -> bool {
        matches!(self, FallbackCause::Block(_))
    }

    pub fn as_block(&self) -> Option<&BlockError> {
        match self {
            FallbackCause::Block(err) => Some(err),
            FallbackCause::Other(_) => None,
        }
    }
}

impl From<BlockError> for FallbackCause {
    fn from(err: BlockError) -> Self {
        FallbackCause::Block(err)
    }
}

impl fmt::Display for FallbackCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackCause::Block(err) => write!(f, "blocked: {err}"),
            FallbackCause::Other(msg) => write!(f, "error: {msg}"),
        }
    }
}
