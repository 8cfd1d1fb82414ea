//! Control-type tags and the static name table used to parse them
//!
//! The numeric values are the UI Automation control type ids, so the Windows
//! backend can convert without a second table.

use crate::AutomationError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlType {
    Button,
    Calendar,
    CheckBox,
    ComboBox,
    Edit,
    Hyperlink,
    Image,
    ListItem,
    List,
    Menu,
    MenuBar,
    MenuItem,
    ProgressBar,
    RadioButton,
    ScrollBar,
    Slider,
    Spinner,
    StatusBar,
    Tab,
    TabItem,
    Text,
    ToolBar,
    ToolTip,
    Tree,
    TreeItem,
    Custom,
    Group,
    Thumb,
    DataGrid,
    DataItem,
    Document,
    SplitButton,
    Window,
    Pane,
    Header,
    HeaderItem,
    Table,
    TitleBar,
    Separator,
    SemanticZoom,
    AppBar,
}

/// (canonical name, type, UIA id). Order follows the UIA id sequence.
const CONTROL_TYPES: &[(&str, ControlType, i32)] = &[
    ("Button", ControlType::Button, 50000),
    ("Calendar", ControlType::Calendar, 50001),
    ("CheckBox", ControlType::CheckBox, 50002),
    ("ComboBox", ControlType::ComboBox, 50003),
    ("Edit", ControlType::Edit, 50004),
    ("Hyperlink", ControlType::Hyperlink, 50005),
    ("Image", ControlType::Image, 50006),
    ("ListItem", ControlType::ListItem, 50007),
    ("List", ControlType::List, 50008),
    ("Menu", ControlType::Menu, 50009),
    ("MenuBar", ControlType::MenuBar, 50010),
    ("MenuItem", ControlType::MenuItem, 50011),
    ("ProgressBar", ControlType::ProgressBar, 50012),
    ("RadioButton", ControlType::RadioButton, 50013),
    ("ScrollBar", ControlType::ScrollBar, 50014),
    ("Slider", ControlType::Slider, 50015),
    ("Spinner", ControlType::Spinner, 50016),
    ("StatusBar", ControlType::StatusBar, 50017),
    ("Tab", ControlType::Tab, 50018),
    ("TabItem", ControlType::TabItem, 50019),
    ("Text", ControlType::Text, 50020),
    ("ToolBar", ControlType::ToolBar, 50021),
    ("ToolTip", ControlType::ToolTip, 50022),
    ("Tree", ControlType::Tree, 50023),
    ("TreeItem", ControlType::TreeItem, 50024),
    ("Custom", ControlType::Custom, 50025),
    ("Group", ControlType::Group, 50026),
    ("Thumb", ControlType::Thumb, 50027),
    ("DataGrid", ControlType::DataGrid, 50028),
    ("DataItem", ControlType::DataItem, 50029),
    ("Document", ControlType::Document, 50030),
    ("SplitButton", ControlType::SplitButton, 50031),
    ("Window", ControlType::Window, 50032),
    ("Pane", ControlType::Pane, 50033),
    ("Header", ControlType::Header, 50034),
    ("HeaderItem", ControlType::HeaderItem, 50035),
    ("Table", ControlType::Table, 50036),
    ("TitleBar", ControlType::TitleBar, 50037),
    ("Separator", ControlType::Separator, 50038),
    ("SemanticZoom", ControlType::SemanticZoom, 50039),
    ("AppBar", ControlType::AppBar, 50040),
];

/// Extra spellings accepted at the parsing boundary.
const ALIASES: &[(&str, ControlType)] = &[
    ("textbox", ControlType::Edit),
    ("textfield", ControlType::Edit),
    ("input", ControlType::Edit),
    ("link", ControlType::Hyperlink),
    ("checkbox", ControlType::CheckBox),
    ("combobox", ControlType::ComboBox),
    ("radio", ControlType::RadioButton),
    ("label", ControlType::Text),
];

static BY_NAME: Lazy<HashMap<String, ControlType>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(CONTROL_TYPES.len() + ALIASES.len());
    for (name, ty, _) in CONTROL_TYPES {
        map.insert(name.to_lowercase(), *ty);
    }
    for (alias, ty) in ALIASES {
        map.insert((*alias).to_string(), *ty);
    }
    map
});

impl ControlType {
    pub fn name(self) -> &'static str {
        CONTROL_TYPES
            .iter()
            .find(|(_, ty, _)| *ty == self)
            .map(|(name, _, _)| *name)
            .unwrap_or("Custom")
    }

    /// The UI Automation control type id for this tag
    pub fn uia_id(self) -> i32 {
        CONTROL_TYPES
            .iter()
            .find(|(_, ty, _)| *ty == self)
            .map(|(_, _, id)| *id)
            .unwrap_or(50025)
    }

    pub fn from_uia_id(id: i32) -> Option<ControlType> {
        CONTROL_TYPES
            .iter()
            .find(|(_, _, uia)| *uia == id)
            .map(|(_, ty, _)| *ty)
    }

    /// Case-insensitive lookup by name or alias. An optional `UIA_` prefix and
    /// `ControlType`/`ControlTypeId` suffix are tolerated.
    pub fn parse(token: &str) -> Result<ControlType, AutomationError> {
        let mut key = token.trim().to_lowercase();
        if let Some(stripped) = key.strip_prefix("uia_") {
            key = stripped.to_string();
        }
        for suffix in ["controltypeid", "controltype"] {
            if let Some(stripped) = key.strip_suffix(suffix) {
                key = stripped.to_string();
                break;
            }
        }
        BY_NAME.get(&key).copied().ok_or_else(|| {
            AutomationError::InvalidCriterion(format!(
                "Unknown control type '{token}'. Expected one of: {}",
                CONTROL_TYPES
                    .iter()
                    .map(|(name, _, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ControlType {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ControlType::parse(s)
    }
}
