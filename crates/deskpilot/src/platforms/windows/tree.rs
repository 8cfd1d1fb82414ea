//! UI Automation tree provider

use crate::control_type::ControlType;
use crate::element::{UiElement, UiElementImpl};
use crate::platforms::TreeProvider;
use crate::search::StructuredQuery;
use crate::types::{Capabilities, Rect, SearchScope, TraversalKind, WindowHandle};
use crate::AutomationError;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uiautomation::patterns::{
    UIExpandCollapsePattern, UIInvokePattern, UIScrollPattern, UISelectionItemPattern,
    UITogglePattern, UIValuePattern,
};
use uiautomation::types::{PropertyConditionFlags, TreeScope, UIProperty};
use uiautomation::variants::Variant;
use uiautomation::{UIAutomation, UICondition, UITreeWalker};
use windows::Win32::Foundation::{E_POINTER, HWND};

/// find_first reports "nothing matched" as an error: either the crate's own
/// not-found code or the null result surfaced as E_POINTER (or an empty error).
fn is_not_found(e: &uiautomation::Error) -> bool {
    let code = e.code();
    code == uiautomation::errors::ERR_NOTFOUND || code == E_POINTER.0 || code == 0
}

/// COM interfaces are created in the multithreaded apartment and may be
/// used from any thread.
#[derive(Clone)]
pub struct ThreadSafeWinUIAutomation(pub Arc<UIAutomation>);

unsafe impl Send for ThreadSafeWinUIAutomation {}
unsafe impl Sync for ThreadSafeWinUIAutomation {}

#[derive(Clone)]
pub struct ThreadSafeWinUIElement(pub Arc<uiautomation::UIElement>);

unsafe impl Send for ThreadSafeWinUIElement {}
unsafe impl Sync for ThreadSafeWinUIElement {}

#[derive(Clone)]
struct ThreadSafeWalker(Arc<UITreeWalker>);

unsafe impl Send for ThreadSafeWalker {}
unsafe impl Sync for ThreadSafeWalker {}

pub struct WindowsTree {
    automation: ThreadSafeWinUIAutomation,
    walker: ThreadSafeWalker,
}

impl WindowsTree {
    pub fn new() -> Result<Self, AutomationError> {
        let automation = UIAutomation::new_direct()?;
        let walker = automation.get_raw_view_walker()?;
        Ok(Self {
            automation: ThreadSafeWinUIAutomation(Arc::new(automation)),
            walker: ThreadSafeWalker(Arc::new(walker)),
        })
    }

    fn wrap(&self, element: uiautomation::UIElement) -> UiElement {
        UiElement::new(Box::new(WindowsUiElement {
            element: ThreadSafeWinUIElement(Arc::new(element)),
            automation: self.automation.clone(),
            walker: self.walker.clone(),
        }))
    }
}

impl TreeProvider for WindowsTree {
    fn desktop_root(&self) -> Result<UiElement, AutomationError> {
        let root = self.automation.0.get_root_element()?;
        Ok(self.wrap(root))
    }

    fn element_for_window(&self, handle: WindowHandle) -> Option<UiElement> {
        let hwnd = HWND(handle.0 as *mut _);
        match self.automation.0.element_from_handle(hwnd.into()) {
            Ok(element) => Some(self.wrap(element)),
            Err(e) => {
                debug!("no automation element for window {}: {}", handle, e);
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct WindowsUiElement {
    element: ThreadSafeWinUIElement,
    automation: ThreadSafeWinUIAutomation,
    walker: ThreadSafeWalker,
}

impl fmt::Debug for WindowsUiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowsUiElement")
            .field("id", &self.id())
            .finish()
    }
}

impl WindowsUiElement {
    fn sibling(&self, element: uiautomation::UIElement) -> UiElement {
        UiElement::new(Box::new(WindowsUiElement {
            element: ThreadSafeWinUIElement(Arc::new(element)),
            automation: self.automation.clone(),
            walker: self.walker.clone(),
        }))
    }

    fn property(
        &self,
        property: UIProperty,
        value: Variant,
        flags: Option<PropertyConditionFlags>,
    ) -> Result<UICondition, AutomationError> {
        Ok(self
            .automation
            .0
            .create_property_condition(property, value, flags)?)
    }

    /// AND of every predicate in `query`, or the true condition when empty
    fn condition(&self, query: &StructuredQuery) -> Result<UICondition, AutomationError> {
        let mut parts: Vec<UICondition> = Vec::new();
        if let Some(name) = &query.name {
            parts.push(self.property(
                UIProperty::Name,
                Variant::from(name.as_str()),
                Some(PropertyConditionFlags::IgnoreCase),
            )?);
        }
        if let Some(id) = &query.automation_id {
            parts.push(self.property(UIProperty::AutomationId, Variant::from(id.as_str()), None)?);
        }
        if let Some(class) = &query.class_name {
            parts.push(self.property(UIProperty::ClassName, Variant::from(class.as_str()), None)?);
        }
        if let Some(control_type) = query.control_type {
            parts.push(self.property(
                UIProperty::ControlType,
                Variant::from(control_type.uia_id()),
                None,
            )?);
        }
        if let Some(pid) = query.process_id {
            parts.push(self.property(UIProperty::ProcessId, Variant::from(pid as i32), None)?);
        }
        if let Some(handle) = query.native_window_handle {
            parts.push(self.property(
                UIProperty::NativeWindowHandle,
                Variant::from(handle as i32),
                None,
            )?);
        }
        match query.traversal {
            TraversalKind::Raw => {}
            TraversalKind::Control => {
                parts.push(self.property(UIProperty::IsControlElement, Variant::from(true), None)?)
            }
            TraversalKind::Content => {
                parts.push(self.property(UIProperty::IsContentElement, Variant::from(true), None)?)
            }
        }

        let mut parts = parts.into_iter();
        let Some(first) = parts.next() else {
            return Ok(self.automation.0.create_true_condition()?);
        };
        parts.try_fold(first, |acc, next| {
            Ok(self.automation.0.create_and_condition(acc, next)?)
        })
    }
}

impl UiElementImpl for WindowsUiElement {
    fn id(&self) -> Option<String> {
        self.element.0.get_runtime_id().ok().map(|parts| {
            parts
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(".")
        })
    }

    fn first_child(&self) -> Result<Option<UiElement>, AutomationError> {
        // The walker reports "no child" as an error.
        Ok(self
            .walker
            .0
            .get_first_child(&self.element.0)
            .ok()
            .map(|c| self.sibling(c)))
    }

    fn next_sibling(&self) -> Result<Option<UiElement>, AutomationError> {
        Ok(self
            .walker
            .0
            .get_next_sibling(&self.element.0)
            .ok()
            .map(|s| self.sibling(s)))
    }

    fn name(&self) -> Result<String, AutomationError> {
        Ok(self.element.0.get_name()?)
    }

    fn automation_id(&self) -> Result<String, AutomationError> {
        Ok(self.element.0.get_automation_id()?)
    }

    fn class_name(&self) -> Result<String, AutomationError> {
        Ok(self.element.0.get_classname()?)
    }

    fn control_type(&self) -> Result<ControlType, AutomationError> {
        let raw = self.element.0.get_control_type()? as i32;
        ControlType::from_uia_id(raw).ok_or_else(|| {
            AutomationError::PlatformError(format!("unknown control type id {raw}"))
        })
    }

    fn is_enabled(&self) -> Result<bool, AutomationError> {
        Ok(self.element.0.is_enabled()?)
    }

    fn is_offscreen(&self) -> Result<bool, AutomationError> {
        Ok(self.element.0.is_offscreen()?)
    }

    fn process_id(&self) -> Result<u32, AutomationError> {
        Ok(self.element.0.get_process_id()? as u32)
    }

    fn bounds(&self) -> Result<Option<Rect>, AutomationError> {
        let r = self.element.0.get_bounding_rectangle()?;
        let rect = Rect::new(
            r.get_left() as f64,
            r.get_top() as f64,
            r.get_width() as f64,
            r.get_height() as f64,
        );
        Ok((!rect.is_empty()).then_some(rect))
    }

    fn native_window_handle(&self) -> Result<isize, AutomationError> {
        let hwnd: HWND = self.element.0.get_native_window_handle()?.into();
        Ok(hwnd.0 as isize)
    }

    fn capabilities(&self) -> Result<Capabilities, AutomationError> {
        let el = &self.element.0;
        Ok(Capabilities {
            invoke: el.get_pattern::<UIInvokePattern>().is_ok(),
            value: el.get_pattern::<UIValuePattern>().is_ok(),
            toggle: el.get_pattern::<UITogglePattern>().is_ok(),
            selection_item: el.get_pattern::<UISelectionItemPattern>().is_ok(),
            expand_collapse: el.get_pattern::<UIExpandCollapsePattern>().is_ok(),
            scroll: el.get_pattern::<UIScrollPattern>().is_ok(),
        })
    }

    fn is_control_element(&self) -> Result<bool, AutomationError> {
        Ok(self.element.0.is_control_element()?)
    }

    fn is_content_element(&self) -> Result<bool, AutomationError> {
        Ok(self.element.0.is_content_element()?)
    }

    fn find_first(
        &self,
        query: &StructuredQuery,
        scope: SearchScope,
    ) -> Result<Option<UiElement>, AutomationError> {
        let condition = self.condition(query)?;
        let scope = match scope {
            SearchScope::Children => TreeScope::Children,
            SearchScope::Subtree => TreeScope::Descendants,
        };
        match self.element.0.find_first(scope, &condition) {
            Ok(found) => Ok(Some(self.sibling(found))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clone_box(&self) -> Box<dyn UiElementImpl> {
        Box::new(self.clone())
    }
}
