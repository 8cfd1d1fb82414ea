//! Desktop UI automation through accessibility APIs
//!
//! Resolves windows and elements in the live accessibility tree and drives
//! them with synthetic pointer and keyboard input. [`Desktop`] is the entry
//! point; the resolver, search engine and input sequencer underneath are
//! usable on their own.

use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub mod config;
pub mod control_type;
pub mod coords;
pub mod deferred;
pub mod element;
pub mod errors;
pub mod input;
pub mod keys;
pub mod locator;
pub mod platforms;
pub mod search;
pub mod selector;
#[cfg(test)]
mod tests;
pub mod types;
pub mod window;

pub use config::AutomationConfig;
pub use control_type::ControlType;
pub use coords::{CoordinateMapper, VirtualDesktop};
pub use deferred::DeferredAction;
pub use element::{ElementInfo, UiElement, UiElementImpl};
pub use errors::AutomationError;
pub use input::{ClickOptions, DragOptions, GestureReport, InputEvent, InputSequencer, SleepFn};
pub use keys::{parse_chord, parse_key, parse_keys, KeyId};
pub use locator::{poll_until, Locator, WaitOutcome, WaitState};
pub use platforms::{create_platform, Platform};
pub use search::{ElementSearch, SearchBudget, SearchStats, SearchStrategy, Termination};
pub use selector::{parse_selector, parse_window_selector, MatchCriterion, NamePredicate};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    Capabilities, KeyState, MouseButton, Point, Rect, SearchScope, TraversalKind, WindowHandle,
};
pub use window::{ResolvedWindow, WindowCriterion, WindowInfo, WindowResolver};

/// The main entry point for UI automation
///
/// Every gesture re-reads the display geometry, so monitor changes between
/// calls are picked up. Nothing is cached across calls.
pub struct Desktop {
    platform: Platform,
    config: AutomationConfig,
    sleep: SleepFn,
}

impl Desktop {
    #[instrument(skip(platform, config))]
    pub fn new(platform: Platform, config: AutomationConfig) -> Self {
        debug!(?config, "desktop created");
        Self {
            platform,
            config,
            sleep: input::thread_sleep(),
        }
    }

    /// The OS platform with configuration taken from `DESKPILOT_*` variables
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use deskpilot::Desktop;
    /// let desktop = Desktop::new_default()?;
    /// # Ok::<(), deskpilot::AutomationError>(())
    /// ```
    pub fn new_default() -> Result<Self, AutomationError> {
        let platform = platforms::create_platform()?;
        let config = AutomationConfig::from_env()?;
        Ok(Self::new(platform, config))
    }

    /// Replace the sleep used for gesture delays
    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn root(&self) -> Result<UiElement, AutomationError> {
        self.platform.tree.desktop_root()
    }

    /// Top-level windows, for display
    #[instrument(skip(self))]
    pub fn list_windows(&self) -> Result<Vec<WindowInfo>, AutomationError> {
        self.platform.windows.list_top_level_windows(
            self.config.visible_windows_only,
            self.config.include_untitled_windows,
        )
    }

    #[instrument(skip(self))]
    pub fn resolve_window(
        &self,
        criterion: &WindowCriterion,
        index: i32,
    ) -> Result<Option<ResolvedWindow>, AutomationError> {
        WindowResolver::configured(self.platform.windows.as_ref(), &self.config)
            .resolve(criterion, index)
    }

    /// Tree node to search under: the window element, or the desktop root
    /// for an empty criterion.
    pub fn window_root(
        &self,
        criterion: &WindowCriterion,
        index: i32,
    ) -> Result<Option<UiElement>, AutomationError> {
        window::resolve_window_root(&self.platform, &self.config, criterion, index)
    }

    /// One-shot element lookup. `Ok(None)` covers every "not there" case,
    /// including an exhausted budget.
    #[instrument(skip(self, budget))]
    pub fn find_element(
        &self,
        window: &WindowCriterion,
        window_index: i32,
        criterion: &MatchCriterion,
        index: i32,
        budget: &SearchBudget,
    ) -> Result<Option<UiElement>, AutomationError> {
        self.find_element_with_stats(window, window_index, criterion, index, budget)
            .map(|(element, _)| element)
    }

    /// Like [`find_element`](Self::find_element), with search diagnostics.
    /// Stats are `None` when the window did not resolve.
    pub fn find_element_with_stats(
        &self,
        window: &WindowCriterion,
        window_index: i32,
        criterion: &MatchCriterion,
        index: i32,
        budget: &SearchBudget,
    ) -> Result<(Option<UiElement>, Option<SearchStats>), AutomationError> {
        // Validate before touching the OS.
        criterion.compile()?;
        let Some(root) = self.window_root(window, window_index)? else {
            debug!("window did not resolve, element search skipped");
            return Ok((None, None));
        };
        let (element, stats) =
            self.config
                .element_search()
                .find_with_stats(&root, criterion, index, budget)?;
        Ok((element, Some(stats)))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn locator(&self, criterion: MatchCriterion) -> Locator {
        Locator::new(self.platform.clone(), self.config.clone(), criterion)
    }

    /// Locator from selector strings, e.g. `role:Button && name:OK` inside
    /// `title~:Notepad`.
    pub fn locator_from_selectors(
        &self,
        window_selector: Option<&str>,
        element_selector: &str,
    ) -> Result<Locator, AutomationError> {
        let (element, index) = parse_selector(element_selector)?;
        let mut locator = self.locator(element).nth(index);
        if let Some(window_selector) = window_selector {
            let (window, window_index) = parse_window_selector(window_selector)?;
            locator = locator.within_window(window, window_index);
        }
        Ok(locator)
    }

    /// Poll `locator` until `state` holds or `timeout` (config default) elapses
    pub async fn wait_for(
        &self,
        locator: &Locator,
        state: WaitState,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome<Option<UiElement>>, AutomationError> {
        let timeout = timeout.unwrap_or_else(|| self.config.wait_timeout());
        locator.wait_for_with_timeout(state, timeout).await
    }

    /// A sequencer bound to the display geometry as it is right now
    fn sequencer(&self) -> Result<InputSequencer<'_>, AutomationError> {
        let desktop = self.platform.geometry.virtual_desktop()?;
        if desktop.is_degenerate() {
            warn!(
                "virtual desktop {}x{} is degenerate, pointer moves collapse to the origin",
                desktop.width, desktop.height
            );
        }
        Ok(
            InputSequencer::new(self.platform.input.as_ref(), CoordinateMapper::new(desktop))
                .with_sleep(self.sleep.clone())
                .with_wheel_unit(self.config.wheel_unit),
        )
    }

    #[instrument(skip(self, element), fields(element = %element.describe()))]
    pub fn click(
        &self,
        element: &UiElement,
        options: ClickOptions,
    ) -> Result<GestureReport, AutomationError> {
        let point = element.click_point()?;
        self.sequencer()?.click(point, options)
    }

    #[instrument(skip(self, element), fields(element = %element.describe()))]
    pub fn double_click(
        &self,
        element: &UiElement,
        options: ClickOptions,
    ) -> Result<GestureReport, AutomationError> {
        let point = element.click_point()?;
        self.sequencer()?
            .double_click(point, options, self.config.double_click_delay_ms)
    }

    pub fn right_click(&self, element: &UiElement) -> Result<GestureReport, AutomationError> {
        self.click(
            element,
            ClickOptions {
                button: MouseButton::Right,
                settle_ms: None,
            },
        )
    }

    #[instrument(skip(self))]
    pub fn click_at(
        &self,
        point: Point,
        options: ClickOptions,
    ) -> Result<GestureReport, AutomationError> {
        self.sequencer()?.click(point, options)
    }

    /// Jump to `to`, or glide there from the current pointer position in
    /// `steps` moves when `steps > 1`.
    #[instrument(skip(self))]
    pub fn move_mouse(
        &self,
        to: Point,
        steps: u32,
        step_delay_ms: u64,
    ) -> Result<GestureReport, AutomationError> {
        let sequencer = self.sequencer()?;
        if steps <= 1 {
            return sequencer.move_to(to);
        }
        let from = self.platform.geometry.cursor_position()?;
        sequencer.move_smooth(from, to, steps, step_delay_ms)
    }

    /// Type `text` as literal characters, clicking `target` first if given
    #[instrument(skip(self, target, text), fields(len = text.chars().count()))]
    pub fn type_text(
        &self,
        target: Option<&UiElement>,
        text: &str,
        delay_ms: u64,
    ) -> Result<GestureReport, AutomationError> {
        let focus_point = target.map(UiElement::click_point).transpose()?;
        let sequencer = self.sequencer()?;
        let mut report = GestureReport::default();
        if let Some(point) = focus_point {
            report = sequencer.click(point, ClickOptions::default())?;
        }
        report.merge(sequencer.type_text(text, delay_ms)?);
        Ok(report)
    }

    #[instrument(skip(self))]
    pub fn press_key(
        &self,
        key: &str,
        repeat: u32,
        delay_ms: u64,
    ) -> Result<GestureReport, AutomationError> {
        let key = parse_key(key)?;
        self.sequencer()?.press_key(key, repeat, delay_ms)
    }

    /// Press a chord. Every token is parsed before anything is sent, so an
    /// unknown key aborts the whole chord.
    #[instrument(skip(self, keys))]
    pub fn hotkey<S: AsRef<str>>(&self, keys: &[S]) -> Result<GestureReport, AutomationError> {
        let keys = parse_keys(keys)?;
        let report = self.sequencer()?.hotkey(&keys)?;
        info!(
            "hotkey {} sent",
            keys.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("+")
        );
        Ok(report)
    }

    /// Drag between two screen points. `None` options take steps and settle
    /// time from the configuration.
    #[instrument(skip(self))]
    pub fn drag(
        &self,
        from: Point,
        to: Point,
        options: Option<DragOptions>,
    ) -> Result<GestureReport, AutomationError> {
        let options = options.unwrap_or(DragOptions {
            steps: self.config.drag_steps,
            settle_ms: self.config.drag_settle_ms,
            ..DragOptions::default()
        });
        self.sequencer()?.drag(from, to, options)
    }

    pub fn drag_elements(
        &self,
        from: &UiElement,
        to: &UiElement,
        options: Option<DragOptions>,
    ) -> Result<GestureReport, AutomationError> {
        let start = from.click_point()?;
        let end = to.click_point()?;
        self.drag(start, end, options)
    }

    /// Scroll by wheel notches, after moving to `at` when given
    #[instrument(skip(self))]
    pub fn scroll(
        &self,
        at: Option<Point>,
        vertical: i32,
        horizontal: i32,
    ) -> Result<GestureReport, AutomationError> {
        let sequencer = self.sequencer()?;
        let mut report = GestureReport::default();
        if let Some(point) = at {
            report = sequencer.move_to(point)?;
        }
        report.merge(sequencer.scroll(vertical, horizontal)?);
        Ok(report)
    }

    pub fn pointer_position(&self) -> Result<Point, AutomationError> {
        self.platform.geometry.cursor_position()
    }
}
