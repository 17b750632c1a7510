use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::degrade::CircuitBreaker;
use super::rule::{AuthorityRule, DegradeRule, FlowGrade, GatewayFlowRule, ResourceMode, RuleError};
use super::window::{MetricEvent, SlidingWindow};
use crate::block::{BlockError, BlockType};

/// Default number of buckets per statistic window.
pub const DEFAULT_BUCKET_COUNT: u32 = 2;

/// Per-resource runtime statistics.
#[derive(Debug)]
struct ResourceNode {
    window: SlidingWindow,
    threads: AtomicUsize,
    total_pass: AtomicU64,
    total_block: AtomicU64,
    total_success: AtomicU64,
    total_error: AtomicU64,
}

impl ResourceNode {
    fn new(bucket_count: u32) -> Self {
        Self {
            window: SlidingWindow::new(1000, bucket_count),
            threads: AtomicUsize::new(0),
            total_pass: AtomicU64::new(0),
            total_block: AtomicU64::new(0),
            total_success: AtomicU64::new(0),
            total_error: AtomicU64::new(0),
        }
    }

    fn record(&self, event: MetricEvent, now: u64) {
        self.window.add(event, now, 1);
        let total = match event {
            MetricEvent::Pass => &self.total_pass,
            MetricEvent::Block => &self.total_block,
            MetricEvent::Success => &self.total_success,
            MetricEvent::Error => &self.total_error,
        };
        total.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of a resource's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NodeStats {
    /// Passed requests in the last second
    pub pass_qps: u64,
    /// Blocked requests in the last second
    pub block_qps: u64,
    pub threads: usize,
    pub total_pass: u64,
    pub total_block: u64,
    pub total_success: u64,
    pub total_error: u64,
}

#[derive(Debug)]
struct FlowChecker {
    rule: GatewayFlowRule,
    window: SlidingWindow,
}

type FlowTable = HashMap<String, Vec<Arc<FlowChecker>>>;
type DegradeTable = HashMap<String, Vec<Arc<CircuitBreaker>>>;
type AuthorityTable = HashMap<String, Vec<AuthorityRule>>;

/// Checks gateway rules and tracks per-resource statistics.
///
/// Rule sets are swapped atomically on load. Checks run authority first,
/// then flow, then degrade; a request that passes every check receives an
/// [`Entry`] that must be dropped (or [`Entry::exit`]ed) when it completes.
pub struct RuleManager {
    clock: Arc<dyn Clock>,
    bucket_count: u32,
    flow: ArcSwap<FlowTable>,
    degrade: ArcSwap<DegradeTable>,
    authority: ArcSwap<AuthorityTable>,
    nodes: DashMap<String, Arc<ResourceNode>>,
}

impl Default for RuleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_BUCKET_COUNT)
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>, bucket_count: u32) -> Self {
        Self {
            clock,
            bucket_count: bucket_count.max(1),
            flow: ArcSwap::from_pointee(HashMap::new()),
            degrade: ArcSwap::from_pointee(HashMap::new()),
            authority: ArcSwap::from_pointee(HashMap::new()),
            nodes: DashMap::new(),
        }
    }

    /// Replace all flow rules. On a validation error nothing changes.
    pub fn load_flow_rules(&self, rules: Vec<GatewayFlowRule>) -> Result<(), RuleError> {
        let mut table = FlowTable::new();
        for rule in rules {
            rule.validate()?;
            let window = SlidingWindow::new(rule.interval_sec * 1000, self.bucket_count);
            table
                .entry(rule.resource.trim().to_string())
                .or_default()
                .push(Arc::new(FlowChecker { rule, window }));
        }
        info!(resources = table.len(), "flow rules loaded");
        self.flow.store(Arc::new(table));
        Ok(())
    }

    /// Replace all degrade rules. On a validation error nothing changes.
    pub fn load_degrade_rules(&self, rules: Vec<DegradeRule>) -> Result<(), RuleError> {
        let mut table = DegradeTable::new();
        for rule in rules {
            rule.validate()?;
            let resource = rule.resource.trim().to_string();
            table
                .entry(resource)
                .or_default()
                .push(Arc::new(CircuitBreaker::new(rule, self.bucket_count)));
        }
        info!(resources = table.len(), "degrade rules loaded");
        self.degrade.store(Arc::new(table));
        Ok(())
    }

    /// Replace all authority rules. On a validation error nothing changes.
    pub fn load_authority_rules(&self, rules: Vec<AuthorityRule>) -> Result<(), RuleError> {
        let mut table = AuthorityTable::new();
        for rule in rules {
            rule.validate()?;
            table
                .entry(rule.resource.trim().to_string())
                .or_default()
                .push(rule);
        }
        info!(resources = table.len(), "authority rules loaded");
        self.authority.store(Arc::new(table));
        Ok(())
    }

    pub fn flow_rules(&self) -> Vec<GatewayFlowRule> {
        self.flow
            .load()
            .values()
            .flat_map(|checkers| checkers.iter().map(|c| c.rule.clone()))
            .collect()
    }

    pub fn degrade_rules(&self) -> Vec<DegradeRule> {
        self.degrade
            .load()
            .values()
            .flat_map(|breakers| breakers.iter().map(|b| b.rule().clone()))
            .collect()
    }

    pub fn authority_rules(&self) -> Vec<AuthorityRule> {
        self.authority.load().values().flatten().cloned().collect()
    }

    /// Drop every rule. Statistics are kept.
    pub fn clear_rules(&self) {
        self.flow.store(Arc::new(FlowTable::new()));
        self.degrade.store(Arc::new(DegradeTable::new()));
        self.authority.store(Arc::new(AuthorityTable::new()));
    }

    fn node(&self, resource: &str) -> Arc<ResourceNode> {
        if let Some(node) = self.nodes.get(resource) {
            return Arc::clone(node.value());
        }
        let bucket_count = self.bucket_count;
        Arc::clone(
            self.nodes
                .entry(resource.to_string())
                .or_insert_with(|| Arc::new(ResourceNode::new(bucket_count)))
                .value(),
        )
    }

    /// Check `resource` for a request from `origin`.
    ///
    /// Flow rules only apply when their `resource_mode` equals `mode`.
    pub fn entry(
        &self,
        resource: &str,
        mode: ResourceMode,
        origin: &str,
    ) -> Result<Entry, BlockError> {
        let now = self.clock.now_millis();
        let node = self.node(resource);

        match self.check(resource, mode, origin, &node, now) {
            Ok(breakers) => {
                node.record(MetricEvent::Pass, now);
                Ok(Entry {
                    resource: resource.to_string(),
                    node,
                    breakers,
                    clock: Arc::clone(&self.clock),
                    error: None,
                    done: false,
                })
            }
            Err(err) => {
                node.record(MetricEvent::Block, now);
                debug!(
                    resource = %resource,
                    block_type = %err.block_type,
                    "request blocked"
                );
                Err(err)
            }
        }
    }

    /// Run every check, taking a thread slot, one pass in each QPS window and
    /// any half-open probes as it goes. A block gives all of them back.
    fn check(
        &self,
        resource: &str,
        mode: ResourceMode,
        origin: &str,
        node: &ResourceNode,
        now: u64,
    ) -> Result<Vec<Arc<CircuitBreaker>>, BlockError> {
        if let Some(rules) = self.authority.load().get(resource) {
            if let Some(rule) = rules.iter().find(|r| !r.permits(origin)) {
                let err = BlockError::authority(resource)
                    .with_message(format!("origin '{origin}' is not allowed on '{resource}'"));
                return Err(with_rule_id(err, &rule.id));
            }
        }

        // slot is ours from here on; thread rules compare against our own count
        let threads = node.threads.fetch_add(1, Ordering::AcqRel) + 1;
        let flow = self.flow.load();
        let checkers = flow.get(resource).map(Vec::as_slice).unwrap_or_default();
        let mut counted: Vec<&FlowChecker> = Vec::new();
        for checker in checkers.iter().filter(|c| c.rule.resource_mode == mode) {
            let passed = match checker.rule.grade {
                FlowGrade::Qps => {
                    checker
                        .window
                        .try_add(MetricEvent::Pass, now, checker.rule.threshold())
                }
                FlowGrade::Thread => threads as f64 <= checker.rule.threshold(),
            };
            if !passed {
                release_flow(node, &counted, now);
                return Err(with_rule_id(BlockError::flow(resource), &checker.rule.id));
            }
            if checker.rule.grade == FlowGrade::Qps {
                counted.push(checker.as_ref());
            }
        }

        let mut granted: Vec<Arc<CircuitBreaker>> = Vec::new();
        if let Some(breakers) = self.degrade.load().get(resource) {
            for breaker in breakers {
                if breaker.try_pass(now) {
                    granted.push(Arc::clone(breaker));
                } else {
                    for b in &granted {
                        b.release_probe();
                    }
                    release_flow(node, &counted, now);
                    let err = BlockError::new(BlockType::Degrade, resource);
                    return Err(with_rule_id(err, &breaker.rule().id));
                }
            }
        }

        Ok(granted)
    }

    /// Counters for `resource`, or zeros if it was never entered.
    #[must_use]
    pub fn node_stats(&self, resource: &str) -> NodeStats {
        let now = self.clock.now_millis();
        match self.nodes.get(resource) {
            Some(node) => NodeStats {
                pass_qps: node.window.sum(MetricEvent::Pass, now),
                block_qps: node.window.sum(MetricEvent::Block, now),
                threads: node.threads.load(Ordering::Acquire),
                total_pass: node.total_pass.load(Ordering::Relaxed),
                total_block: node.total_block.load(Ordering::Relaxed),
                total_success: node.total_success.load(Ordering::Relaxed),
                total_error: node.total_error.load(Ordering::Relaxed),
            },
            None => NodeStats::default(),
        }
    }

    /// Resources that have statistics, sorted.
    #[must_use]
    pub fn resources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

fn release_flow(node: &ResourceNode, counted: &[&FlowChecker], now: u64) {
    node.threads.fetch_sub(1, Ordering::AcqRel);
    for checker in counted {
        checker.window.remove(MetricEvent::Pass, now, 1);
    }
}

fn with_rule_id(err: BlockError, id: &Option<String>) -> BlockError {
    match id {
        Some(id) => err.with_rule_id(id.clone()),
        None => err,
    }
}

/// A request admitted on a resource.
///
/// Dropping the entry marks the request complete: the thread slot is
/// released and the outcome feeds the circuit breakers.
pub struct Entry {
    resource: String,
    node: Arc<ResourceNode>,
    breakers: Vec<Arc<CircuitBreaker>>,
    clock: Arc<dyn Clock>,
    error: Option<String>,
    done: bool,
}

impl Entry {
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Mark the request as failed.
    pub fn trace_error(&mut self, reason: impl Into<String>) {
        self.error = Some(reason.into());
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Complete the request.
    pub fn exit(self) {
        drop(self);
    }

    /// Release the entry without recording an outcome.
    ///
    /// Used when a later check rejects the same request.
    pub fn abandon(mut self) {
        self.done = true;
        self.node.threads.fetch_sub(1, Ordering::AcqRel);
        for breaker in &self.breakers {
            breaker.release_probe();
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("resource", &self.resource)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        let now = self.clock.now_millis();
        self.node.threads.fetch_sub(1, Ordering::AcqRel);
        let failed = self.error.is_some();
        if failed {
            self.node.record(MetricEvent::Error, now);
        } else {
            self.node.record(MetricEvent::Success, now);
        }
        for breaker in &self.breakers {
            breaker.on_complete(now, failed);
        }
    }
}
