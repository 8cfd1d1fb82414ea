//! Element search over the live accessibility tree
//!
//! Two strategies share one contract. The fast path hands a structured query
//! to the tree provider; the slow path walks the tree itself, pre-order,
//! with an explicit stack and hard time/node budgets.

use crate::control_type::ControlType;
use crate::element::UiElement;
use crate::selector::{MatchCriterion, NamePredicate};
use crate::types::{SearchScope, TraversalKind};
use crate::AutomationError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Slow-path time window when the caller gave none
pub const DEFAULT_SLOW_PATH_TIMEOUT: Duration = Duration::from_millis(5_000);
/// Slow-path node budget when the caller gave none
pub const DEFAULT_SLOW_PATH_MAX_NODES: usize = 10_000;

/// Limits and shape of one search. `None` or zero means unbounded, except
/// that the slow path substitutes its defaults for missing time/node limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBudget {
    pub max_elapsed_ms: Option<u64>,
    pub max_visited_nodes: Option<usize>,
    pub max_depth: Option<usize>,
    pub traversal: TraversalKind,
    pub scope: SearchScope,
}

impl SearchBudget {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.max_elapsed_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_max_nodes(mut self, nodes: usize) -> Self {
        self.max_visited_nodes = Some(nodes);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_traversal(mut self, traversal: TraversalKind) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Tighten the time limit to at most `remaining`, keeping a tighter one.
    /// Never yields zero, which would read as unbounded.
    pub fn capped_to(mut self, remaining: Duration) -> Self {
        let cap = (remaining.as_millis() as u64).max(1);
        self.max_elapsed_ms = Some(match self.time_limit() {
            Some(limit) => (limit.as_millis() as u64).min(cap),
            None => cap,
        });
        self
    }

    fn time_limit(&self) -> Option<Duration> {
        self.max_elapsed_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    fn node_limit(&self) -> Option<usize> {
        self.max_visited_nodes.filter(|n| *n > 0)
    }

    /// Children scope always means depth 1, whatever the caller asked for.
    pub fn effective_max_depth(&self) -> Option<usize> {
        match self.scope {
            SearchScope::Children => Some(1),
            SearchScope::Subtree => self.max_depth.filter(|d| *d > 0),
        }
    }
}

/// The AND of every exact predicate, in a shape a tree provider can run
/// natively. Only built when the name predicate is exact or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredQuery {
    /// Compared ignoring case
    pub name: Option<String>,
    pub automation_id: Option<String>,
    pub class_name: Option<String>,
    pub control_type: Option<ControlType>,
    pub process_id: Option<u32>,
    pub native_window_handle: Option<isize>,
    pub traversal: TraversalKind,
}

impl StructuredQuery {
    fn from_criterion(criterion: &MatchCriterion, traversal: TraversalKind) -> Option<Self> {
        let name = match &criterion.name {
            None => None,
            Some(NamePredicate::Exact(name)) => Some(name.clone()),
            Some(_) => return None,
        };
        Some(Self {
            name,
            automation_id: criterion.automation_id.clone(),
            class_name: criterion.class_name.clone(),
            control_type: criterion.control_type,
            process_id: criterion.process_id,
            native_window_handle: criterion.native_window_handle,
            traversal,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Fast,
    Slow,
}

/// Why a search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Found,
    /// Every reachable node was visited
    Exhausted,
    NodeBudget,
    TimeBudget,
    /// The provider query failed (stale root, disconnected tree)
    ProviderFailed,
}

/// Diagnostics for one search. Callers of [`ElementSearch::find`] never see
/// these: running out of budget and "not there" are the same `None`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchStats {
    pub strategy: SearchStrategy,
    pub visited: usize,
    pub elapsed: Duration,
    pub termination: Termination,
}

/// Resolves one element below a root
#[derive(Debug, Clone)]
pub struct ElementSearch {
    default_timeout: Duration,
    default_max_nodes: usize,
}

impl Default for ElementSearch {
    fn default() -> Self {
        Self::new(DEFAULT_SLOW_PATH_TIMEOUT, DEFAULT_SLOW_PATH_MAX_NODES)
    }
}

impl ElementSearch {
    pub fn new(default_timeout: Duration, default_max_nodes: usize) -> Self {
        Self {
            default_timeout,
            default_max_nodes: default_max_nodes.max(1),
        }
    }

    /// Return the `index`-th (0-based, negative clamps to 0) match below
    /// `root`, or `None`. Only a malformed criterion is an error.
    pub fn find(
        &self,
        root: &UiElement,
        criterion: &MatchCriterion,
        index: i32,
        budget: &SearchBudget,
    ) -> Result<Option<UiElement>, AutomationError> {
        self.find_with_stats(root, criterion, index, budget)
            .map(|(element, _)| element)
    }

    pub fn find_with_stats(
        &self,
        root: &UiElement,
        criterion: &MatchCriterion,
        index: i32,
        budget: &SearchBudget,
    ) -> Result<(Option<UiElement>, SearchStats), AutomationError> {
        let index = index.max(0) as usize;
        let compiled = criterion.compile()?;

        let result = match Self::choose_strategy(criterion, index, budget) {
            SearchStrategy::Fast => {
                let query = StructuredQuery::from_criterion(criterion, budget.traversal)
                    .ok_or_else(|| {
                        AutomationError::Internal("fast path chosen for non-exact name".into())
                    })?;
                self.fast_path(root, &query, budget.scope)
            }
            SearchStrategy::Slow => self.slow_path(root, index, budget, |el| {
                compiled.matches(el, budget.traversal)
            }),
        };

        let (element, stats) = &result;
        debug!(
            strategy = ?stats.strategy,
            visited = stats.visited,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            termination = ?stats.termination,
            found = element.is_some(),
            "element search finished"
        );
        Ok(result)
    }

    /// Fast path needs an exact-or-absent name, index 0, and no depth limit
    /// other than the one implied by children scope (providers cannot cap
    /// depth at arbitrary levels).
    pub fn choose_strategy(
        criterion: &MatchCriterion,
        index: usize,
        budget: &SearchBudget,
    ) -> SearchStrategy {
        let name_is_exact = matches!(criterion.name, None | Some(NamePredicate::Exact(_)));
        let depth_is_native = budget.scope == SearchScope::Children
            || budget.max_depth.filter(|d| *d > 0).is_none();
        if name_is_exact && index == 0 && depth_is_native {
            SearchStrategy::Fast
        } else {
            SearchStrategy::Slow
        }
    }

    fn fast_path(
        &self,
        root: &UiElement,
        query: &StructuredQuery,
        scope: SearchScope,
    ) -> (Option<UiElement>, SearchStats) {
        let start = Instant::now();
        let (element, termination) = match root.find_first(query, scope) {
            Ok(Some(el)) => (Some(el), Termination::Found),
            Ok(None) => (None, Termination::Exhausted),
            Err(e) => {
                debug!("fast path query failed, treating as not found: {}", e);
                (None, Termination::ProviderFailed)
            }
        };
        (
            element,
            SearchStats {
                strategy: SearchStrategy::Fast,
                visited: 0,
                elapsed: start.elapsed(),
                termination,
            },
        )
    }

    /// Iterative pre-order walk. The root itself is not a candidate.
    fn slow_path<F>(
        &self,
        root: &UiElement,
        index: usize,
        budget: &SearchBudget,
        is_match: F,
    ) -> (Option<UiElement>, SearchStats)
    where
        F: Fn(&UiElement) -> bool,
    {
        let start = Instant::now();
        let time_limit = budget.time_limit().unwrap_or(self.default_timeout);
        let node_limit = budget.node_limit().unwrap_or(self.default_max_nodes);
        let max_depth = budget.effective_max_depth();

        let mut visited = 0usize;
        let mut matched = 0usize;
        let mut termination = Termination::Exhausted;
        let mut stack: Vec<(UiElement, usize)> = Vec::new();

        if max_depth != Some(0) {
            if let Ok(Some(child)) = root.first_child() {
                stack.push((child, 1));
            }
        }

        while let Some((node, depth)) = stack.pop() {
            if start.elapsed() >= time_limit {
                termination = Termination::TimeBudget;
                break;
            }
            if visited >= node_limit {
                termination = Termination::NodeBudget;
                break;
            }
            visited += 1;

            // Sibling first so the child is popped first.
            match node.next_sibling() {
                Ok(Some(sibling)) => stack.push((sibling, depth)),
                Ok(None) => {}
                Err(e) => debug!("next_sibling failed at depth {}: {}", depth, e),
            }
            if max_depth.is_none_or(|limit| depth < limit) {
                match node.first_child() {
                    Ok(Some(child)) => stack.push((child, depth + 1)),
                    Ok(None) => {}
                    Err(e) => debug!("first_child failed at depth {}: {}", depth, e),
                }
            }

            if is_match(&node) {
                if matched == index {
                    return (
                        Some(node),
                        SearchStats {
                            strategy: SearchStrategy::Slow,
                            visited,
                            elapsed: start.elapsed(),
                            termination: Termination::Found,
                        },
                    );
                }
                matched += 1;
            }
        }

        (
            None,
            SearchStats {
                strategy: SearchStrategy::Slow,
                visited,
                elapsed: start.elapsed(),
                termination,
            },
        )
    }
}
