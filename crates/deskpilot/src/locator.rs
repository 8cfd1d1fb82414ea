use crate::config::AutomationConfig;
use crate::element::UiElement;
use crate::errors::AutomationError;
use crate::platforms::Platform;
use crate::search::SearchBudget;
use crate::selector::MatchCriterion;
use crate::window::{resolve_window_root, WindowCriterion};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Condition a [`Locator`] can wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    Exists,
    NotExists,
    Enabled,
    /// On screen with a non-empty bounding rectangle
    Visible,
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WaitState::Exists => "exists",
            WaitState::NotExists => "not-exists",
            WaitState::Enabled => "enabled",
            WaitState::Visible => "visible",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for WaitState {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "exists" | "attached" => Ok(WaitState::Exists),
            "not-exists" | "gone" | "detached" => Ok(WaitState::NotExists),
            "enabled" => Ok(WaitState::Enabled),
            "visible" => Ok(WaitState::Visible),
            other => Err(AutomationError::InvalidArgument(format!(
                "unknown wait state '{other}'"
            ))),
        }
    }
}

/// Result of a successful poll loop
#[derive(Debug, Clone)]
pub struct WaitOutcome<T> {
    pub value: T,
    pub elapsed: Duration,
    pub polls: u32,
}

/// Poll `probe` every `interval` until it yields a value or `timeout`
/// elapses on the monotonic clock.
///
/// The first probe runs immediately. Between probes the task sleeps for
/// `min(interval, remaining)`, so it never sleeps past the deadline. Errors
/// from `probe` end the loop at once.
pub async fn poll_until<T, F>(
    interval: Duration,
    timeout: Duration,
    probe: F,
) -> Result<WaitOutcome<T>, AutomationError>
where
    F: FnMut() -> Result<Option<T>, AutomationError>,
{
    poll_until_with(interval, timeout, probe, tokio::time::sleep).await
}

/// [`poll_until`] with an explicit sleep, for callers that drive their own clock.
pub async fn poll_until_with<T, F, S, Fut>(
    interval: Duration,
    timeout: Duration,
    mut probe: F,
    sleep: S,
) -> Result<WaitOutcome<T>, AutomationError>
where
    F: FnMut() -> Result<Option<T>, AutomationError>,
    S: Fn(Duration) -> Fut,
    Fut: Future<Output = ()>,
{
    let interval = interval.max(Duration::from_millis(1));
    let start = Instant::now();
    let mut polls = 0u32;
    loop {
        polls += 1;
        if let Some(value) = probe()? {
            return Ok(WaitOutcome {
                value,
                elapsed: start.elapsed(),
                polls,
            });
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(AutomationError::Timeout(format!(
                "condition not met after {polls} polls in {elapsed:?}"
            )));
        }
        sleep(interval.min(timeout - elapsed)).await;
    }
}

/// A reusable target: a window, an element inside it and the search limits
/// used to find it. Nothing is resolved until [`Locator::first`] or
/// [`Locator::wait_for`] runs, so the same locator can be polled repeatedly.
///
/// An empty element criterion targets the window element itself (or the
/// desktop root when the window criterion is empty too).
#[derive(Clone)]
pub struct Locator {
    platform: Platform,
    config: AutomationConfig,
    window: WindowCriterion,
    window_index: i32,
    element: MatchCriterion,
    index: i32,
    budget: SearchBudget,
    timeout: Duration,
    interval: Duration,
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("window", &self.window)
            .field("window_index", &self.window_index)
            .field("element", &self.element)
            .field("index", &self.index)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Locator {
    pub fn new(platform: Platform, config: AutomationConfig, element: MatchCriterion) -> Self {
        let timeout = config.wait_timeout();
        let interval = config.wait_interval();
        Self {
            platform,
            config,
            window: WindowCriterion::default(),
            window_index: 0,
            element,
            index: 0,
            budget: SearchBudget::default(),
            timeout,
            interval,
        }
    }

    /// Restrict the search to the `index`-th window matching `criterion`
    pub fn within_window(mut self, criterion: WindowCriterion, index: i32) -> Self {
        self.window = criterion;
        self.window_index = index;
        self
    }

    pub fn nth(mut self, index: i32) -> Self {
        self.index = index;
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Default timeout for waits on this locator
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn set_poll_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn element_criterion(&self) -> &MatchCriterion {
        &self.element
    }

    pub fn window_criterion(&self) -> &WindowCriterion {
        &self.window
    }

    /// Resolve once, without waiting. `Ok(None)` when the window or element
    /// is not there right now.
    pub fn first(&self) -> Result<Option<UiElement>, AutomationError> {
        self.first_with_budget(&self.budget)
    }

    fn first_with_budget(
        &self,
        budget: &SearchBudget,
    ) -> Result<Option<UiElement>, AutomationError> {
        let root =
            resolve_window_root(&self.platform, &self.config, &self.window, self.window_index)?;
        let Some(root) = root else {
            return Ok(None);
        };
        if self.element.is_empty() {
            return Ok(Some(root));
        }
        self.config
            .element_search()
            .find(&root, &self.element, self.index, budget)
    }

    /// Poll until `state` holds. For [`WaitState::NotExists`] the outcome
    /// carries `None`; for every other state the matched element.
    #[instrument(level = "debug", skip(self), fields(locator = ?self))]
    pub async fn wait_for(
        &self,
        state: WaitState,
    ) -> Result<WaitOutcome<Option<UiElement>>, AutomationError> {
        self.wait_for_with_timeout(state, self.timeout).await
    }

    pub async fn wait_for_with_timeout(
        &self,
        state: WaitState,
        timeout: Duration,
    ) -> Result<WaitOutcome<Option<UiElement>>, AutomationError> {
        // Surface malformed criteria before the first sleep.
        self.element.compile()?;

        // No single probe may search past the wait deadline.
        let deadline = Instant::now() + timeout;
        let outcome = poll_until(self.interval, timeout, || {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let current = self.first_with_budget(&self.budget.clone().capped_to(remaining))?;
            Ok(match (state, current) {
                (WaitState::NotExists, None) => Some(None),
                (WaitState::NotExists, Some(_)) => None,
                (_, None) => None,
                (WaitState::Exists, Some(el)) => Some(Some(el)),
                (WaitState::Enabled, Some(el)) => {
                    el.is_enabled().unwrap_or(false).then_some(Some(el))
                }
                (WaitState::Visible, Some(el)) => {
                    let on_screen = !el.is_offscreen().unwrap_or(true);
                    let has_area = matches!(el.bounds(), Ok(Some(r)) if !r.is_empty());
                    (on_screen && has_area).then_some(Some(el))
                }
            })
        })
        .await
        .map_err(|e| match e {
            AutomationError::Timeout(inner) => AutomationError::Timeout(format!(
                "timed out after {timeout:?} waiting for {state} on {:?}: {inner}",
                self.element
            )),
            other => other,
        })?;

        debug!(
            polls = outcome.polls,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "wait satisfied"
        );
        Ok(outcome)
    }

    /// Wait for the element to exist and return it
    pub async fn wait(&self) -> Result<UiElement, AutomationError> {
        let outcome = self.wait_for(WaitState::Exists).await?;
        outcome.value.ok_or_else(|| {
            AutomationError::Internal("exists wait finished without an element".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test(start_paused = true)]
    async fn test_third_poll_succeeds_inside_window() {
        let calls = Cell::new(0);
        let outcome = poll_until(Duration::from_millis(200), Duration::from_secs(10), || {
            calls.set(calls.get() + 1);
            Ok((calls.get() >= 3).then_some(calls.get()))
        })
        .await
        .unwrap();
        assert_eq!(outcome.polls, 3);
        assert_eq!(outcome.value, 3);
        assert!(outcome.elapsed >= Duration::from_millis(400));
        assert!(outcome.elapsed < Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_timeout() {
        let err = poll_until::<(), _>(Duration::from_millis(50), Duration::from_millis(120), || {
            Ok(None)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AutomationError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_never_sleeps_past_deadline() {
        let slept = std::sync::Mutex::new(Vec::new());
        let err = poll_until_with::<(), _, _, _>(
            Duration::from_millis(500),
            Duration::from_millis(30),
            || Ok(None),
            |d| {
                slept.lock().unwrap().push(d);
                tokio::time::sleep(d)
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AutomationError::Timeout(_)));
        for d in slept.lock().unwrap().iter() {
            assert!(*d <= Duration::from_millis(30), "slept {d:?}");
        }
    }

    #[tokio::test]
    async fn test_probe_error_stops_polling() {
        let calls = Cell::new(0);
        let err = poll_until::<(), _>(Duration::from_millis(1), Duration::from_secs(1), || {
            calls.set(calls.get() + 1);
            Err(AutomationError::InvalidCriterion("bad".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AutomationError::InvalidCriterion(_)));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_wait_state_parses() {
        assert_eq!("not_exists".parse::<WaitState>().unwrap(), WaitState::NotExists);
        assert_eq!("Visible".parse::<WaitState>().unwrap(), WaitState::Visible);
        assert!("sideways".parse::<WaitState>().is_err());
    }
}
