//! In-memory platform: a synthetic tree, window list and display, plus an
//! input sink that records batches instead of injecting them.
//!
//! The tree can be mutated while handles are alive, the same way a real UI
//! changes under an automation client.

use super::{DesktopGeometry, InputSink, Platform, TreeProvider, WindowSource};
use crate::control_type::ControlType;
use crate::coords::VirtualDesktop;
use crate::element::{UiElement, UiElementImpl};
use crate::input::InputEvent;
use crate::search::StructuredQuery;
use crate::types::{Capabilities, Point, Rect, SearchScope, TraversalKind, WindowHandle};
use crate::window::WindowInfo;
use crate::AutomationError;
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

pub type NodeId = usize;

/// Attributes of one synthetic node
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub name: String,
    pub automation_id: String,
    pub class_name: String,
    pub control_type: ControlType,
    pub enabled: bool,
    pub offscreen: bool,
    pub process_id: u32,
    pub bounds: Option<Rect>,
    pub native_window_handle: isize,
    pub capabilities: Capabilities,
    pub is_control_element: bool,
    pub is_content_element: bool,
    /// Every property read fails while set
    pub stale: bool,
}

impl MemoryNode {
    pub fn new(control_type: ControlType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            automation_id: String::new(),
            class_name: String::new(),
            control_type,
            enabled: true,
            offscreen: false,
            process_id: 0,
            bounds: None,
            native_window_handle: 0,
            capabilities: Capabilities::default(),
            is_control_element: true,
            is_content_element: true,
            stale: false,
        }
    }

    pub fn automation_id(mut self, id: impl Into<String>) -> Self {
        self.automation_id = id.into();
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn process_id(mut self, pid: u32) -> Self {
        self.process_id = pid;
        self
    }

    pub fn bounds(mut self, rect: Rect) -> Self {
        self.bounds = Some(rect);
        self
    }

    pub fn native_window_handle(mut self, handle: isize) -> Self {
        self.native_window_handle = handle;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn offscreen(mut self, offscreen: bool) -> Self {
        self.offscreen = offscreen;
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Structural filler: neither a control nor a content element
    pub fn structural(mut self) -> Self {
        self.is_control_element = false;
        self.is_content_element = false;
        self
    }

    pub fn control_only(mut self) -> Self {
        self.is_control_element = true;
        self.is_content_element = false;
        self
    }

    pub fn stale(mut self) -> Self {
        self.stale = true;
        self
    }

    fn matches_query(&self, query: &StructuredQuery) -> bool {
        if self.stale {
            return false;
        }
        let kind_ok = match query.traversal {
            TraversalKind::Raw => true,
            TraversalKind::Control => self.is_control_element,
            TraversalKind::Content => self.is_content_element,
        };
        kind_ok
            && query
                .name
                .as_ref()
                .is_none_or(|n| n.to_lowercase() == self.name.to_lowercase())
            && query
                .automation_id
                .as_ref()
                .is_none_or(|id| *id == self.automation_id)
            && query
                .class_name
                .as_ref()
                .is_none_or(|c| *c == self.class_name)
            && query.control_type.is_none_or(|t| t == self.control_type)
            && query.process_id.is_none_or(|p| p == self.process_id)
            && query
                .native_window_handle
                .is_none_or(|h| h == self.native_window_handle)
    }
}

#[derive(Debug)]
struct Slot {
    node: MemoryNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    removed: bool,
}

#[derive(Debug, Default)]
struct TreeData {
    slots: Vec<Slot>,
}

impl TreeData {
    fn live(&self, id: NodeId) -> Result<&Slot, AutomationError> {
        match self.slots.get(id) {
            Some(slot) if !slot.removed => Ok(slot),
            _ => Err(AutomationError::StaleHandle(format!(
                "node {id} is no longer in the tree"
            ))),
        }
    }

    fn readable(&self, id: NodeId) -> Result<&MemoryNode, AutomationError> {
        let slot = self.live(id)?;
        if slot.node.stale {
            return Err(AutomationError::StaleHandle(format!(
                "node {id} cannot be read"
            )));
        }
        Ok(&slot.node)
    }
}

/// A mutable synthetic accessibility tree. Node 0 is the desktop root.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    data: Arc<RwLock<TreeData>>,
}

impl MemoryTree {
    pub const ROOT: NodeId = 0;

    pub fn new(root: MemoryNode) -> Self {
        let data = TreeData {
            slots: vec![Slot {
                node: root,
                parent: None,
                children: Vec::new(),
                removed: false,
            }],
        };
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TreeData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TreeData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Append `node` as the last child of `parent`
    pub fn add_child(&self, parent: NodeId, node: MemoryNode) -> NodeId {
        let mut data = self.write();
        let id = data.slots.len();
        data.slots.push(Slot {
            node,
            parent: Some(parent),
            children: Vec::new(),
            removed: false,
        });
        if let Some(slot) = data.slots.get_mut(parent) {
            slot.children.push(id);
        }
        id
    }

    /// Detach `id` and its subtree. Existing handles become stale.
    pub fn remove(&self, id: NodeId) {
        let mut data = self.write();
        let parent = data.slots.get(id).and_then(|s| s.parent);
        if let Some(parent) = parent {
            if let Some(slot) = data.slots.get_mut(parent) {
                slot.children.retain(|c| *c != id);
            }
        }
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(slot) = data.slots.get_mut(current) {
                slot.removed = true;
                pending.extend(slot.children.iter().copied());
            }
        }
    }

    pub fn update<F: FnOnce(&mut MemoryNode)>(&self, id: NodeId, f: F) {
        if let Some(slot) = self.write().slots.get_mut(id) {
            f(&mut slot.node);
        }
    }

    pub fn len(&self) -> usize {
        self.read().slots.iter().filter(|s| !s.removed).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element(&self, id: NodeId) -> UiElement {
        UiElement::new(Box::new(MemoryElement {
            tree: self.clone(),
            id,
        }))
    }

    /// The node id behind a handle produced by this tree
    pub fn node_id(element: &UiElement) -> Option<NodeId> {
        element
            .id()
            .and_then(|id| id.strip_prefix("mem:").and_then(|n| n.parse().ok()))
    }
}

#[derive(Debug, Clone)]
struct MemoryElement {
    tree: MemoryTree,
    id: NodeId,
}

impl MemoryElement {
    fn with_node<T>(&self, f: impl FnOnce(&MemoryNode) -> T) -> Result<T, AutomationError> {
        let data = self.tree.read();
        data.readable(self.id).map(f)
    }
}

impl UiElementImpl for MemoryElement {
    fn id(&self) -> Option<String> {
        Some(format!("mem:{}", self.id))
    }

    fn first_child(&self) -> Result<Option<UiElement>, AutomationError> {
        let first = self.tree.read().live(self.id)?.children.first().copied();
        Ok(first.map(|c| self.tree.element(c)))
    }

    fn next_sibling(&self) -> Result<Option<UiElement>, AutomationError> {
        let next = {
            let data = self.tree.read();
            let parent = data.live(self.id)?.parent;
            parent.and_then(|p| {
                let siblings = &data.slots[p].children;
                siblings
                    .iter()
                    .position(|c| *c == self.id)
                    .and_then(|pos| siblings.get(pos + 1).copied())
            })
        };
        Ok(next.map(|s| self.tree.element(s)))
    }

    fn name(&self) -> Result<String, AutomationError> {
        self.with_node(|n| n.name.clone())
    }

    fn automation_id(&self) -> Result<String, AutomationError> {
        self.with_node(|n| n.automation_id.clone())
    }

    fn class_name(&self) -> Result<String, AutomationError> {
        self.with_node(|n| n.class_name.clone())
    }

    fn control_type(&self) -> Result<ControlType, AutomationError> {
        self.with_node(|n| n.control_type)
    }

    fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.with_node(|n| n.enabled)
    }

    fn is_offscreen(&self) -> Result<bool, AutomationError> {
        self.with_node(|n| n.offscreen)
    }

    fn process_id(&self) -> Result<u32, AutomationError> {
        self.with_node(|n| n.process_id)
    }

    fn bounds(&self) -> Result<Option<Rect>, AutomationError> {
        self.with_node(|n| n.bounds.filter(|r| !r.is_empty()))
    }

    fn native_window_handle(&self) -> Result<isize, AutomationError> {
        self.with_node(|n| n.native_window_handle)
    }

    fn capabilities(&self) -> Result<Capabilities, AutomationError> {
        self.with_node(|n| n.capabilities)
    }

    fn is_control_element(&self) -> Result<bool, AutomationError> {
        self.with_node(|n| n.is_control_element)
    }

    fn is_content_element(&self) -> Result<bool, AutomationError> {
        self.with_node(|n| n.is_content_element)
    }

    fn find_first(
        &self,
        query: &StructuredQuery,
        scope: SearchScope,
    ) -> Result<Option<UiElement>, AutomationError> {
        let found = {
            let data = self.tree.read();
            let root = data.live(self.id)?;
            let mut stack: Vec<NodeId> = root.children.iter().rev().copied().collect();
            let mut found = None;
            while let Some(id) = stack.pop() {
                let slot = &data.slots[id];
                if slot.node.matches_query(query) {
                    found = Some(id);
                    break;
                }
                if scope == SearchScope::Subtree {
                    stack.extend(slot.children.iter().rev().copied());
                }
            }
            found
        };
        Ok(found.map(|id| self.tree.element(id)))
    }

    fn clone_box(&self) -> Box<dyn UiElementImpl> {
        Box::new(self.clone())
    }
}

/// Records every submitted batch. Optionally accepts only the first
/// `accept_limit` events of each batch, to exercise partial injection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<InputEvent>>>,
    accept_limit: Option<usize>,
    log_batches: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also emit each batch as an `info!` line (dry runs)
    pub fn logging() -> Self {
        Self {
            log_batches: true,
            ..Self::default()
        }
    }

    pub fn accepting_at_most(limit: usize) -> Self {
        Self {
            accept_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<InputEvent>> {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// All recorded events, flattened in submission order
    pub fn events(&self) -> Vec<InputEvent> {
        self.batches().into_iter().flatten().collect()
    }

    pub fn clear(&self) {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl InputSink for RecordingSink {
    fn send(&self, batch: &[InputEvent]) -> Result<usize, AutomationError> {
        if self.log_batches {
            info!(
                "dry-run batch: {}",
                serde_json::to_string(batch).unwrap_or_else(|_| format!("{batch:?}"))
            );
        }
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(batch.to_vec());
        Ok(self
            .accept_limit
            .map_or(batch.len(), |limit| batch.len().min(limit)))
    }
}

#[derive(Debug)]
struct DesktopState {
    desktop: VirtualDesktop,
    cursor: Point,
    windows: Vec<(WindowInfo, Option<NodeId>)>,
}

/// Synthetic desktop: tree, top-level windows and display geometry
#[derive(Debug, Clone)]
pub struct MemoryDesktop {
    pub tree: MemoryTree,
    pub sink: Arc<RecordingSink>,
    state: Arc<RwLock<DesktopState>>,
}

impl Default for MemoryDesktop {
    fn default() -> Self {
        Self::new(VirtualDesktop::new(0, 0, 1920, 1080))
    }
}

impl MemoryDesktop {
    pub fn new(desktop: VirtualDesktop) -> Self {
        Self::with_sink(desktop, Arc::new(RecordingSink::new()))
    }

    pub fn with_sink(desktop: VirtualDesktop, sink: Arc<RecordingSink>) -> Self {
        let root = MemoryNode::new(ControlType::Pane, "Desktop").bounds(Rect::new(
            desktop.x as f64,
            desktop.y as f64,
            desktop.width as f64,
            desktop.height as f64,
        ));
        Self {
            tree: MemoryTree::new(root),
            sink,
            state: Arc::new(RwLock::new(DesktopState {
                desktop,
                cursor: Point::default(),
                windows: Vec::new(),
            })),
        }
    }

    /// Add a top-level window and its tree node under the desktop root.
    /// Returns the node id of the window element.
    pub fn add_window(&self, info: WindowInfo) -> NodeId {
        let mut node = MemoryNode::new(ControlType::Window, info.title.clone())
            .class_name(info.class_name.clone())
            .process_id(info.process_id)
            .native_window_handle(info.handle.0);
        node.bounds = info.bounds;
        let id = self.tree.add_child(MemoryTree::ROOT, node);
        self.write_state().windows.push((info, Some(id)));
        id
    }

    /// Forget a window. Its handle and tree node go stale.
    pub fn close_window(&self, handle: WindowHandle) {
        let removed = {
            let mut state = self.write_state();
            let pos = state.windows.iter().position(|(w, _)| w.handle == handle);
            pos.map(|p| state.windows.remove(p))
        };
        if let Some((_, Some(node))) = removed {
            self.tree.remove(node);
        }
    }

    pub fn set_virtual_desktop(&self, desktop: VirtualDesktop) {
        self.write_state().desktop = desktop;
    }

    pub fn set_cursor(&self, point: Point) {
        self.write_state().cursor = point;
    }

    pub fn platform(&self) -> Platform {
        Platform::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            self.sink.clone(),
            Arc::new(self.clone()),
        )
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, DesktopState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, DesktopState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl TreeProvider for MemoryDesktop {
    fn desktop_root(&self) -> Result<UiElement, AutomationError> {
        Ok(self.tree.element(MemoryTree::ROOT))
    }

    fn element_for_window(&self, handle: WindowHandle) -> Option<UiElement> {
        self.read_state()
            .windows
            .iter()
            .find(|(w, _)| w.handle == handle)
            .and_then(|(_, node)| *node)
            .map(|node| self.tree.element(node))
    }
}

impl WindowSource for MemoryDesktop {
    fn list_top_level_windows(
        &self,
        visible_only: bool,
        include_empty_titles: bool,
    ) -> Result<Vec<WindowInfo>, AutomationError> {
        Ok(self
            .read_state()
            .windows
            .iter()
            .map(|(w, _)| w)
            .filter(|w| !visible_only || w.is_visible)
            .filter(|w| include_empty_titles || !w.title.is_empty())
            .cloned()
            .collect())
    }

    fn window_by_handle(&self, handle: WindowHandle) -> Option<WindowInfo> {
        self.read_state()
            .windows
            .iter()
            .find(|(w, _)| w.handle == handle)
            .map(|(w, _)| w.clone())
    }
}

impl DesktopGeometry for MemoryDesktop {
    fn virtual_desktop(&self) -> Result<VirtualDesktop, AutomationError> {
        Ok(self.read_state().desktop)
    }

    fn cursor_position(&self) -> Result<Point, AutomationError> {
        Ok(self.read_state().cursor)
    }
}

/// Convenience for building [`WindowInfo`] values in memory
pub fn window_info(handle: isize, title: &str, process_id: u32, process_name: &str) -> WindowInfo {
    WindowInfo {
        handle: WindowHandle(handle),
        title: title.to_string(),
        process_id,
        process_name: process_name.to_string(),
        class_name: String::new(),
        bounds: None,
        is_visible: true,
    }
}
