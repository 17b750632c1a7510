use std::fmt;

use serde::{Deserialize, Serialize};

/// What a gateway rule's `resource` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceMode {
    #[default]
    RouteId,
    CustomApiName,
}

/// Metric a flow rule limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowGrade {
    /// Passed requests per `interval_sec`
    #[default]
    Qps,
    /// Concurrent in-flight requests
    Thread,
}

fn default_interval_sec() -> u64 {
    1
}

/// Flow rule bound to a route id or a custom API name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayFlowRule {
    #[serde(default)]
    pub id: Option<String>,
    pub resource: String,
    #[serde(default)]
    pub resource_mode: ResourceMode,
    #[serde(default)]
    pub grade: FlowGrade,
    pub count: f64,
    /// Statistic window for QPS rules, in seconds
    #[serde(default = "default_interval_sec")]
    pub interval_sec: u64,
    /// Extra passes allowed on top of `count` within one window
    #[serde(default)]
    pub burst: u64,
}

impl GatewayFlowRule {
    pub fn qps(resource: impl Into<String>, count: f64) -> Self {
        Self {
            id: None,
            resource: resource.into(),
            resource_mode: ResourceMode::RouteId,
            grade: FlowGrade::Qps,
            count,
            interval_sec: 1,
            burst: 0,
        }
    }

    pub fn thread(resource: impl Into<String>, count: f64) -> Self {
        Self {
            grade: FlowGrade::Thread,
            ..Self::qps(resource, count)
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ResourceMode) -> Self {
        self.resource_mode = mode;
        self
    }

    #[must_use]
    pub fn with_interval_sec(mut self, interval_sec: u64) -> Self {
        self.interval_sec = interval_sec;
        self
    }

    #[must_use]
    pub fn with_burst(mut self, burst: u64) -> Self {
        self.burst = burst;
        self
    }

    /// Passes allowed per window: `count + burst`.
    pub fn threshold(&self) -> f64 {
        self.count + self.burst as f64
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        validate_resource(&self.resource)?;
        if !self.count.is_finite() || self.count < 0.0 {
            return Err(RuleError::InvalidCount {
                resource: self.resource.clone(),
                count: self.count,
            });
        }
        if self.grade == FlowGrade::Qps && self.interval_sec == 0 {
            return Err(RuleError::InvalidInterval {
                resource: self.resource.clone(),
            });
        }
        Ok(())
    }
}

/// Circuit breaker opened by errors within a statistic interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradeRule {
    #[serde(default)]
    pub id: Option<String>,
    pub resource: String,
    /// Errors within `stat_interval_ms` that open the breaker
    pub error_count: u64,
    #[serde(default = "DegradeRule::default_stat_interval_ms")]
    pub stat_interval_ms: u64,
    /// Time spent open before a probe request is let through
    pub recovery_timeout_ms: u64,
}

impl DegradeRule {
    fn default_stat_interval_ms() -> u64 {
        1000
    }

    pub fn new(resource: impl Into<String>, error_count: u64, recovery_timeout_ms: u64) -> Self {
        Self {
            id: None,
            resource: resource.into(),
            error_count,
            stat_interval_ms: Self::default_stat_interval_ms(),
            recovery_timeout_ms,
        }
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        validate_resource(&self.resource)?;
        if self.error_count == 0 {
            return Err(RuleError::InvalidCount {
                resource: self.resource.clone(),
                count: 0.0,
            });
        }
        if self.stat_interval_ms == 0 || self.recovery_timeout_ms == 0 {
            return Err(RuleError::InvalidInterval {
                resource: self.resource.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityStrategy {
    /// Only listed origins may pass
    #[default]
    White,
    /// Listed origins are rejected
    Black,
}

/// Origin allow/deny list for a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityRule {
    #[serde(default)]
    pub id: Option<String>,
    pub resource: String,
    #[serde(default)]
    pub strategy: AuthorityStrategy,
    pub limit_app: Vec<String>,
}

impl AuthorityRule {
    pub fn new(
        resource: impl Into<String>,
        strategy: AuthorityStrategy,
        limit_app: Vec<String>,
    ) -> Self {
        Self {
            id: None,
            resource: resource.into(),
            strategy,
            limit_app,
        }
    }

    /// Whether `origin` may pass. Requests without an origin always pass.
    pub fn permits(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return true;
        }
        let listed = self.limit_app.iter().any(|app| app.trim() == origin);
        match self.strategy {
            AuthorityStrategy::White => listed,
            AuthorityStrategy::Black => !listed,
        }
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        validate_resource(&self.resource)?;
        if self.limit_app.iter().all(|app| app.trim().is_empty()) {
            return Err(RuleError::EmptyLimitApp {
                resource: self.resource.clone(),
            });
        }
        Ok(())
    }
}

fn validate_resource(resource: &str) -> Result<(), RuleError> {
    if resource.trim().is_empty() {
        Err(RuleError::EmptyResource)
    } else {
        Ok(())
    }
}

/// A rule failed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleError {
    EmptyResource,
    InvalidCount { resource: String, count: f64 },
    InvalidInterval { resource: String },
    EmptyLimitApp { resource: String },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::EmptyResource => write!(f, "rule has an empty resource name"),
            RuleError::InvalidCount { resource, count } => {
                write!(f, "rule for '{resource}' has an invalid count {count}")
            }
            RuleError::InvalidInterval { resource } => {
                write!(f, "rule for '{resource}' has a zero interval")
            }
            RuleError::EmptyLimitApp { resource } => {
                write!(f, "authority rule for '{resource}' lists no origins")
            }
        }
    }
}

impl std::error::Error for RuleError {}
