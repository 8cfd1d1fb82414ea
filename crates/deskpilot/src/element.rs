//! Element handles into the externally owned accessibility tree

use crate::control_type::ControlType;
use crate::search::StructuredQuery;
use crate::types::{Capabilities, Rect, SearchScope};
use crate::AutomationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform side of an element handle.
///
/// Every accessor is fallible: the element may have disappeared between the
/// moment it was obtained and the moment it is read. Callers treat an error
/// from any of these as "stale" and move on.
pub trait UiElementImpl: Send + Sync + fmt::Debug {
    /// Stable-for-the-session identifier, used only for logging and equality
    fn id(&self) -> Option<String>;

    fn first_child(&self) -> Result<Option<UiElement>, AutomationError>;
    fn next_sibling(&self) -> Result<Option<UiElement>, AutomationError>;

    fn name(&self) -> Result<String, AutomationError>;
    fn automation_id(&self) -> Result<String, AutomationError>;
    fn class_name(&self) -> Result<String, AutomationError>;
    fn control_type(&self) -> Result<ControlType, AutomationError>;
    fn is_enabled(&self) -> Result<bool, AutomationError>;
    fn is_offscreen(&self) -> Result<bool, AutomationError>;
    fn process_id(&self) -> Result<u32, AutomationError>;
    /// `None` when the element reports no (or an empty) rectangle
    fn bounds(&self) -> Result<Option<Rect>, AutomationError>;
    /// `0` when the element has no native window
    fn native_window_handle(&self) -> Result<isize, AutomationError>;
    fn capabilities(&self) -> Result<Capabilities, AutomationError>;
    fn is_control_element(&self) -> Result<bool, AutomationError>;
    fn is_content_element(&self) -> Result<bool, AutomationError>;

    /// Ask the provider for the first element below this one matching every
    /// predicate in `query`. Cost is the provider's, not ours.
    fn find_first(
        &self,
        query: &StructuredQuery,
        scope: SearchScope,
    ) -> Result<Option<UiElement>, AutomationError>;

    fn clone_box(&self) -> Box<dyn UiElementImpl>;
}

/// An opaque, borrowed view of one node in the live tree.
///
/// Holding a `UiElement` never keeps the underlying UI alive; reads may fail
/// at any time.
pub struct UiElement {
    inner: Box<dyn UiElementImpl>,
}

impl UiElement {
    pub fn new(inner: Box<dyn UiElementImpl>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> Option<String> {
        self.inner.id()
    }

    pub fn first_child(&self) -> Result<Option<UiElement>, AutomationError> {
        self.inner.first_child()
    }

    pub fn next_sibling(&self) -> Result<Option<UiElement>, AutomationError> {
        self.inner.next_sibling()
    }

    pub fn name(&self) -> Result<String, AutomationError> {
        self.inner.name()
    }

    pub fn automation_id(&self) -> Result<String, AutomationError> {
        self.inner.automation_id()
    }

    pub fn class_name(&self) -> Result<String, AutomationError> {
        self.inner.class_name()
    }

    pub fn control_type(&self) -> Result<ControlType, AutomationError> {
        self.inner.control_type()
    }

    pub fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.inner.is_enabled()
    }

    pub fn is_offscreen(&self) -> Result<bool, AutomationError> {
        self.inner.is_offscreen()
    }

    pub fn process_id(&self) -> Result<u32, AutomationError> {
        self.inner.process_id()
    }

    pub fn bounds(&self) -> Result<Option<Rect>, AutomationError> {
        self.inner.bounds()
    }

    pub fn native_window_handle(&self) -> Result<isize, AutomationError> {
        self.inner.native_window_handle()
    }

    pub fn capabilities(&self) -> Result<Capabilities, AutomationError> {
        self.inner.capabilities()
    }

    pub fn is_control_element(&self) -> Result<bool, AutomationError> {
        self.inner.is_control_element()
    }

    pub fn is_content_element(&self) -> Result<bool, AutomationError> {
        self.inner.is_content_element()
    }

    pub fn find_first(
        &self,
        query: &StructuredQuery,
        scope: SearchScope,
    ) -> Result<Option<UiElement>, AutomationError> {
        self.inner.find_first(query, scope)
    }

    /// Centre of the bounding rectangle, for pointer gestures.
    pub fn click_point(&self) -> Result<crate::Point, AutomationError> {
        match self.bounds()? {
            Some(rect) if !rect.is_empty() => Ok(rect.center()),
            _ => Err(AutomationError::InvalidArgument(format!(
                "element {} has no clickable bounds",
                self.describe()
            ))),
        }
    }

    /// Read every attribute once. Reads that fail are left empty.
    pub fn info(&self) -> ElementInfo {
        ElementInfo {
            id: self.id(),
            name: self.name().ok().filter(|n| !n.is_empty()),
            automation_id: self.automation_id().ok().filter(|n| !n.is_empty()),
            class_name: self.class_name().ok().filter(|n| !n.is_empty()),
            control_type: self.control_type().ok().map(|t| t.name().to_string()),
            enabled: self.is_enabled().ok(),
            offscreen: self.is_offscreen().ok(),
            process_id: self.process_id().ok(),
            bounds: self.bounds().ok().flatten(),
            native_window_handle: self.native_window_handle().ok().filter(|h| *h != 0),
            capabilities: self
                .capabilities()
                .map(|c| c.names().into_iter().map(String::from).collect())
                .unwrap_or_default(),
        }
    }

    /// Short human readable label for log lines
    pub fn describe(&self) -> String {
        let role = self
            .control_type()
            .map(|t| t.name().to_string())
            .unwrap_or_else(|_| "?".to_string());
        match self.name() {
            Ok(name) if !name.is_empty() => format!("{role} '{name}'"),
            Ok(_) => role,
            Err(_) => format!("{role} (stale)"),
        }
    }
}

impl Clone for UiElement {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

impl fmt::Debug for UiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiElement")
            .field("id", &self.inner.id())
            .finish()
    }
}

impl PartialEq for UiElement {
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Serializable snapshot of an element, for display and CLI output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offscreen: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_window_handle: Option<isize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
}
