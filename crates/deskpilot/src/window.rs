//! Top-level window resolution

use crate::config::AutomationConfig;
use crate::element::UiElement;
use crate::platforms::{Platform, WindowSource};
use crate::selector::{CompiledName, NamePredicate};
use crate::types::{Rect, WindowHandle};
use crate::AutomationError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Display metadata for one top-level window, as reported by the OS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub process_id: u32,
    pub process_name: String,
    pub class_name: String,
    pub bounds: Option<Rect>,
    pub is_visible: bool,
}

/// Window-selection predicates. Empty means "the desktop itself".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowCriterion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<NamePredicate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    /// Case-insensitive substring of the process name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<WindowHandle>,
}

impl WindowCriterion {
    pub fn is_empty(&self) -> bool {
        *self == WindowCriterion::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(NamePredicate::Exact(title.into()));
        self
    }

    pub fn with_title_containing(mut self, needle: impl Into<String>) -> Self {
        self.title = Some(NamePredicate::Contains(needle.into()));
        self
    }

    pub fn with_title_regex(mut self, pattern: impl Into<String>) -> Self {
        self.title = Some(NamePredicate::Regex(pattern.into()));
        self
    }

    pub fn with_process_id(mut self, pid: u32) -> Self {
        self.process_id = Some(pid);
        self
    }

    pub fn with_process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = Some(name.into());
        self
    }

    pub fn with_handle(mut self, handle: WindowHandle) -> Self {
        self.handle = Some(handle);
        self
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedWindow {
    /// Sentinel for the empty criterion: search the whole desktop
    Desktop,
    Window(WindowInfo),
}

struct WindowFilter {
    title: Option<CompiledName>,
    process_id: Option<u32>,
    process_name: Option<String>,
    class_name: Option<String>,
}

impl WindowFilter {
    fn new(criterion: &WindowCriterion) -> Result<Self, AutomationError> {
        Ok(Self {
            title: criterion
                .title
                .as_ref()
                .map(NamePredicate::compile)
                .transpose()?,
            process_id: criterion.process_id,
            process_name: criterion.process_name.as_ref().map(|p| p.to_lowercase()),
            class_name: criterion.class_name.clone(),
        })
    }

    fn matches(&self, window: &WindowInfo) -> bool {
        if let Some(pid) = self.process_id {
            if window.process_id != pid {
                return false;
            }
        }
        if let Some(name) = &self.process_name {
            if !window.process_name.to_lowercase().contains(name.as_str()) {
                return false;
            }
        }
        if let Some(class) = &self.class_name {
            if window.class_name != *class {
                return false;
            }
        }
        match &self.title {
            Some(title) => title.matches(&window.title),
            None => true,
        }
    }
}

/// Matches a [`WindowCriterion`] against the OS window list
pub struct WindowResolver<'a> {
    source: &'a dyn WindowSource,
    visible_only: bool,
    include_empty_titles: bool,
}

impl<'a> WindowResolver<'a> {
    pub fn new(source: &'a dyn WindowSource) -> Self {
        Self {
            source,
            visible_only: true,
            include_empty_titles: false,
        }
    }

    /// Resolver with the window filters from `config`
    pub fn configured(source: &'a dyn WindowSource, config: &AutomationConfig) -> Self {
        Self::new(source)
            .visible_only(config.visible_windows_only)
            .include_empty_titles(config.include_untitled_windows)
    }

    pub fn visible_only(mut self, visible_only: bool) -> Self {
        self.visible_only = visible_only;
        self
    }

    pub fn include_empty_titles(mut self, include: bool) -> Self {
        self.include_empty_titles = include;
        self
    }

    /// Resolve to the `index`-th matching window in enumeration order.
    ///
    /// A direct handle is looked up without enumerating; `index` does not
    /// apply to it. Only a malformed title regex is an error.
    pub fn resolve(
        &self,
        criterion: &WindowCriterion,
        index: i32,
    ) -> Result<Option<ResolvedWindow>, AutomationError> {
        let filter = WindowFilter::new(criterion)?;

        if let Some(handle) = criterion.handle {
            let found = self
                .source
                .window_by_handle(handle)
                .filter(|w| filter.matches(w));
            debug!(%handle, found = found.is_some(), "window resolved by handle");
            return Ok(found.map(ResolvedWindow::Window));
        }

        if criterion.is_empty() {
            return Ok(Some(ResolvedWindow::Desktop));
        }

        let index = index.max(0) as usize;
        let windows = match self
            .source
            .list_top_level_windows(self.visible_only, self.include_empty_titles)
        {
            Ok(windows) => windows,
            Err(e) => {
                debug!("window enumeration failed, treating as not found: {}", e);
                return Ok(None);
            }
        };
        let total = windows.len();
        let found = windows
            .into_iter()
            .filter(|w| filter.matches(w))
            .nth(index);
        debug!(
            total,
            index,
            found = found.as_ref().map(|w| w.title.as_str()),
            "window resolved by enumeration"
        );
        Ok(found.map(ResolvedWindow::Window))
    }
}

/// Tree node to search under: the window element, or the desktop root for an
/// empty criterion. A window that has no tree element yet counts as absent.
pub(crate) fn resolve_window_root(
    platform: &Platform,
    config: &AutomationConfig,
    criterion: &WindowCriterion,
    index: i32,
) -> Result<Option<UiElement>, AutomationError> {
    let resolved =
        WindowResolver::configured(platform.windows.as_ref(), config).resolve(criterion, index)?;
    match resolved {
        None => Ok(None),
        Some(ResolvedWindow::Desktop) => match platform.tree.desktop_root() {
            Ok(root) => Ok(Some(root)),
            Err(e) => {
                debug!("desktop root unavailable: {}", e);
                Ok(None)
            }
        },
        Some(ResolvedWindow::Window(info)) => Ok(platform.tree.element_for_window(info.handle)),
    }
}
