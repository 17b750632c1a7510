//! # Custom API Definitions
//!
//! Besides the route id, gateway flow rules can target named API groups.
//! An [`ApiDefinition`] groups path predicates under one name; a request
//! path belongs to every API that has at least one matching predicate.
//!
//! ## Match Strategies
//!
//! - **Exact** - the path equals the pattern
//! - **Prefix** - the path starts with the pattern; a trailing `/**` or `**`
//!   is stripped first, so `/users/**` matches `/users` and `/users/42`
//! - **Regex** - the whole path matches the regular expression
//!
//! ```rust
//! use sentinel_gateway::api::{ApiDefinition, ApiDefinitionManager, ApiPathPredicate, MatchStrategy};
//!
//! let manager = ApiDefinitionManager::new();
//! manager.load(vec![ApiDefinition::new(
//!     "user-api",
//!     vec![ApiPathPredicate::new("/users/**", MatchStrategy::Prefix)],
//! )]).unwrap();
//!
//! assert_eq!(manager.matching_apis("/users/7"), vec!["user-api".to_string()]);
//! assert!(manager.matching_apis("/orders").is_empty());
//! ```

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// How a predicate pattern is compared against a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    #[default]
    Exact,
    Prefix,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPathPredicate {
    pub pattern: String,
    #[serde(default)]
    pub match_strategy: MatchStrategy,
}

impl ApiPathPredicate {
    pub fn new(pattern: impl Into<String>, match_strategy: MatchStrategy) -> Self {
        Self {
            pattern: pattern.into(),
            match_strategy,
        }
    }
}

/// A named group of path predicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDefinition {
    pub api_name: String,
    #[serde(default)]
    pub predicates: Vec<ApiPathPredicate>,
}

impl ApiDefinition {
    pub fn new(api_name: impl Into<String>, predicates: Vec<ApiPathPredicate>) -> Self {
        Self {
            api_name: api_name.into(),
            predicates,
        }
    }
}

/// Rejected API definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiDefinitionError {
    EmptyName,
    DuplicateName { api_name: String },
    EmptyPattern { api_name: String },
    InvalidRegex { api_name: String, pattern: String, reason: String },
}

impl fmt::Display for ApiDefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiDefinitionError::EmptyName => write!(f, "API definition has an empty name"),
            ApiDefinitionError::DuplicateName { api_name } => {
                write!(f, "API definition '{api_name}' is defined more than once")
            }
            ApiDefinitionError::EmptyPattern { api_name } => {
                write!(f, "API definition '{api_name}' has a predicate with an empty pattern")
            }
            ApiDefinitionError::InvalidRegex {
                api_name,
                pattern,
                reason,
            } => write!(
                f,
                "API definition '{api_name}' has an invalid regex '{pattern}': {reason}"
            ),
        }
    }
}

impl std::error::Error for ApiDefinitionError {}

#[derive(Debug)]
enum PathMatcher {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

impl PathMatcher {
    fn compile(api_name: &str, predicate: &ApiPathPredicate) -> Result<Self, ApiDefinitionError> {
        let pattern = predicate.pattern.trim();
        if pattern.is_empty() {
            return Err(ApiDefinitionError::EmptyPattern {
                api_name: api_name.to_string(),
            });
        }
        match predicate.match_strategy {
            MatchStrategy::Exact => Ok(PathMatcher::Exact(pattern.to_string())),
            MatchStrategy::Prefix => {
                let prefix = pattern
                    .strip_suffix("**")
                    .unwrap_or(pattern)
                    .to_string();
                Ok(PathMatcher::Prefix(prefix))
            }
            MatchStrategy::Regex => Regex::new(&format!("^(?:{pattern})$"))
                .map(PathMatcher::Regex)
                .map_err(|e| ApiDefinitionError::InvalidRegex {
                    api_name: api_name.to_string(),
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    fn is_match(&self, path: &str) -> bool {
        match self {
            PathMatcher::Exact(p) => path == p,
            PathMatcher::Prefix(prefix) => {
                // `/users/` also covers the bare `/users`
                path.starts_with(prefix.as_str())
                    || prefix
                        .strip_suffix('/')
                        .is_some_and(|bare| !bare.is_empty() && path == bare)
            }
            PathMatcher::Regex(re) => re.is_match(path),
        }
    }
}

#[derive(Debug)]
struct CompiledApi {
    api_name: String,
    matchers: Vec<PathMatcher>,
}

impl CompiledApi {
    fn is_match(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.is_match(path))
    }
}

/// Holds the active API definitions.
///
/// Definitions are compiled on load; lookups read a shared snapshot.
pub struct ApiDefinitionManager {
    definitions: ArcSwap<Vec<ApiDefinition>>,
    compiled: ArcSwap<Vec<CompiledApi>>,
}

impl Default for ApiDefinitionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiDefinitionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            definitions: ArcSwap::from_pointee(Vec::new()),
            compiled: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Replace all definitions.
    ///
    /// The whole set is validated first; on error nothing changes.
    pub fn load(&self, definitions: Vec<ApiDefinition>) -> Result<(), ApiDefinitionError> {
        let mut compiled = Vec::with_capacity(definitions.len());
        for def in &definitions {
            let name = def.api_name.trim();
            if name.is_empty() {
                return Err(ApiDefinitionError::EmptyName);
            }
            if compiled.iter().any(|c: &CompiledApi| c.api_name == name) {
                return Err(ApiDefinitionError::DuplicateName {
                    api_name: name.to_string(),
                });
            }
            let matchers = def
                .predicates
                .iter()
                .map(|p| PathMatcher::compile(name, p))
                .collect::<Result<Vec<_>, _>>()?;
            if matchers.is_empty() {
                warn!(api_name = %name, "API definition has no predicates and will never match");
            }
            compiled.push(CompiledApi {
                api_name: name.to_string(),
                matchers,
            });
        }
        info!(apis = compiled.len(), "API definitions loaded");
        self.compiled.store(Arc::new(compiled));
        self.definitions.store(Arc::new(definitions));
        Ok(())
    }

    /// Names of every API whose predicates match `path`, in definition order.
    #[must_use]
    pub fn matching_apis(&self, path: &str) -> Vec<String> {
        self.compiled
            .load()
            .iter()
            .filter(|api| api.is_match(path))
            .map(|api| api.api_name.clone())
            .collect()
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ApiDefinition> {
        self.definitions.load().as_ref().clone()
    }

    pub fn clear(&self) {
        self.compiled.store(Arc::new(Vec::new()));
        self.definitions.store(Arc::new(Vec::new()));
    }
}
