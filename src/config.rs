//! # Gateway Configuration
//!
//! A YAML file describes fallbacks, API definitions and rules:
//!
//! ```yaml
//! fallbacks:
//!   - route: user-service
//!     status: 503
//!     message: "user service is busy"
//!   - route: "*"
//!     status: 429
//! api_definitions:
//!   - api_name: user-api
//!     predicates:
//!       - pattern: /users/**
//!         match_strategy: prefix
//! flow_rules:
//!   - resource: user-service
//!     count: 10
//!   - resource: user-api
//!     resource_mode: custom_api_name
//!     grade: thread
//!     count: 4
//! degrade_rules:
//!   - resource: user-service
//!     error_count: 5
//!     recovery_timeout_ms: 10000
//! authority_rules:
//!   - resource: user-service
//!     strategy: black
//!     limit_app: [crawler]
//! ```
//!
//! [`GatewayConfig::apply`] validates everything before touching any
//! component, so a bad file never leaves the gateway half-configured.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{ApiDefinition, ApiDefinitionError, ApiDefinitionManager};
use crate::fallback::{
    FallbackProvider, FallbackRegistry, StaticFallbackProvider, DEFAULT_BLOCK_MESSAGE,
    DEFAULT_BLOCK_STATUS,
};
use crate::flow::{AuthorityRule, DegradeRule, GatewayFlowRule, RuleError, RuleManager};

fn default_status() -> u16 {
    DEFAULT_BLOCK_STATUS
}

fn default_message() -> String {
    DEFAULT_BLOCK_MESSAGE.to_string()
}

/// Fallback entry of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub route: String,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl FallbackConfig {
    pub fn to_provider(&self) -> StaticFallbackProvider {
        let provider = StaticFallbackProvider::new(self.route.trim(), self.status, &self.message);
        match &self.content_type {
            Some(content_type) => provider.with_content_type(content_type),
            None => provider,
        }
    }
}

/// Contents of a gateway config file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub fallbacks: Vec<FallbackConfig>,
    pub api_definitions: Vec<ApiDefinition>,
    pub flow_rules: Vec<GatewayFlowRule>,
    pub degrade_rules: Vec<DegradeRule>,
    pub authority_rules: Vec<AuthorityRule>,
}

/// The config file parsed but describes an invalid gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidStatus { route: String, status: u16 },
    DuplicateFallback { route: String },
    Rule(RuleError),
    Api(ApiDefinitionError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidStatus { route, status } => {
                write!(f, "fallback for '{route}' has invalid status {status}")
            }
            ConfigError::DuplicateFallback { route } => {
                write!(f, "fallback for '{route}' is defined more than once")
            }
            ConfigError::Rule(e) => write!(f, "invalid rule: {e}"),
            ConfigError::Api(e) => write!(f, "invalid API definition: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Rule(e) => Some(e),
            ConfigError::Api(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RuleError> for ConfigError {
    fn from(e: RuleError) -> Self {
        ConfigError::Rule(e)
    }
}

impl From<ApiDefinitionError> for ConfigError {
    fn from(e: ApiDefinitionError) -> Self {
        ConfigError::Api(e)
    }
}

/// Read and parse a gateway config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GatewayConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    GatewayConfig::from_yaml(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}

impl GatewayConfig {
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Check everything `apply` would reject, without side effects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.fallbacks.len());
        for fb in &self.fallbacks {
            if !(100..=599).contains(&fb.status) {
                return Err(ConfigError::InvalidStatus {
                    route: fb.route.clone(),
                    status: fb.status,
                });
            }
            let route = fb.route.trim();
            if seen.contains(&route) {
                return Err(ConfigError::DuplicateFallback {
                    route: route.to_string(),
                });
            }
            seen.push(route);
        }
        for rule in &self.flow_rules {
            rule.validate()?;
        }
        for rule in &self.degrade_rules {
            rule.validate()?;
        }
        for rule in &self.authority_rules {
            rule.validate()?;
        }
        ApiDefinitionManager::new().load(self.api_definitions.clone())?;
        Ok(())
    }

    /// Install this config into the given components.
    pub fn apply(
        &self,
        fallbacks: &FallbackRegistry,
        rules: &RuleManager,
        apis: &ApiDefinitionManager,
    ) -> Result<(), ConfigError> {
        self.validate()?;
        apis.load(self.api_definitions.clone())?;
        rules.load_flow_rules(self.flow_rules.clone())?;
        rules.load_degrade_rules(self.degrade_rules.clone())?;
        rules.load_authority_rules(self.authority_rules.clone())?;
        fallbacks.replace_all(
            self.fallbacks
                .iter()
                .map(|fb| Arc::new(fb.to_provider()) as Arc<dyn FallbackProvider>),
        );
        info!(
            fallbacks = self.fallbacks.len(),
            apis = self.api_definitions.len(),
            flow_rules = self.flow_rules.len(),
            degrade_rules = self.degrade_rules.len(),
            authority_rules = self.authority_rules.len(),
            "gateway config applied"
        );
        Ok(())
    }
}
