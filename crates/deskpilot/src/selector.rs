//! Match criteria and the selector-string syntax that produces them
//!
//! Selector strings are a boundary convenience; the core only ever sees the
//! parsed [`MatchCriterion`] / [`WindowCriterion`] values.

use crate::control_type::ControlType;
use crate::element::UiElement;
use crate::types::{TraversalKind, WindowHandle};
use crate::window::WindowCriterion;
use crate::AutomationError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// How a display name or title is compared. Exactly one mode applies per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum NamePredicate {
    /// Whole-string equality, ignoring case
    Exact(String),
    /// Substring, ignoring case
    Contains(String),
    /// Regular expression, case-insensitive unless the pattern says otherwise
    Regex(String),
}

impl NamePredicate {
    pub fn compile(&self) -> Result<CompiledName, AutomationError> {
        Ok(match self {
            NamePredicate::Exact(s) => CompiledName::Exact(s.to_lowercase()),
            NamePredicate::Contains(s) => CompiledName::Contains(s.to_lowercase()),
            NamePredicate::Regex(pattern) => CompiledName::Regex(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()?,
            ),
        })
    }
}

/// A [`NamePredicate`] ready for repeated evaluation
#[derive(Debug, Clone)]
pub enum CompiledName {
    Exact(String),
    Contains(String),
    Regex(Regex),
}

impl CompiledName {
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            CompiledName::Exact(expected) => candidate.to_lowercase() == *expected,
            CompiledName::Contains(needle) => candidate.to_lowercase().contains(needle.as_str()),
            CompiledName::Regex(re) => re.is_match(candidate),
        }
    }
}

/// Conjunction of element predicates. The empty criterion matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchCriterion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<NamePredicate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_type: Option<ControlType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_window_handle: Option<isize>,
}

impl MatchCriterion {
    pub fn is_empty(&self) -> bool {
        *self == MatchCriterion::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(NamePredicate::Exact(name.into()));
        self
    }

    pub fn with_name_containing(mut self, needle: impl Into<String>) -> Self {
        self.name = Some(NamePredicate::Contains(needle.into()));
        self
    }

    pub fn with_name_regex(mut self, pattern: impl Into<String>) -> Self {
        self.name = Some(NamePredicate::Regex(pattern.into()));
        self
    }

    pub fn with_automation_id(mut self, id: impl Into<String>) -> Self {
        self.automation_id = Some(id.into());
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_control_type(mut self, control_type: ControlType) -> Self {
        self.control_type = Some(control_type);
        self
    }

    pub fn with_process_id(mut self, pid: u32) -> Self {
        self.process_id = Some(pid);
        self
    }

    pub fn with_native_window_handle(mut self, handle: isize) -> Self {
        self.native_window_handle = Some(handle);
        self
    }

    /// Validate and precompile (regexes in particular). Fails before any
    /// tree access.
    pub fn compile(&self) -> Result<CompiledCriterion, AutomationError> {
        Ok(CompiledCriterion {
            name: self.name.as_ref().map(NamePredicate::compile).transpose()?,
            automation_id: self.automation_id.clone(),
            class_name: self.class_name.clone(),
            control_type: self.control_type,
            process_id: self.process_id,
            native_window_handle: self.native_window_handle,
        })
    }
}

/// Per-node evaluator for a [`MatchCriterion`]
#[derive(Debug, Clone)]
pub struct CompiledCriterion {
    name: Option<CompiledName>,
    automation_id: Option<String>,
    class_name: Option<String>,
    control_type: Option<ControlType>,
    process_id: Option<u32>,
    native_window_handle: Option<isize>,
}

impl CompiledCriterion {
    /// True when every predicate holds and the node is "real" under
    /// `traversal`. A property that cannot be read makes the node a non-match.
    pub fn matches(&self, element: &UiElement, traversal: TraversalKind) -> bool {
        let kind_ok = match traversal {
            TraversalKind::Raw => Ok(true),
            TraversalKind::Control => element.is_control_element(),
            TraversalKind::Content => element.is_content_element(),
        };
        if !matches!(kind_ok, Ok(true)) {
            return false;
        }
        if let Some(expected) = self.control_type {
            if !matches!(element.control_type(), Ok(t) if t == expected) {
                return false;
            }
        }
        if let Some(expected) = &self.automation_id {
            if !matches!(element.automation_id(), Ok(id) if id == *expected) {
                return false;
            }
        }
        if let Some(expected) = &self.class_name {
            if !matches!(element.class_name(), Ok(c) if c == *expected) {
                return false;
            }
        }
        if let Some(expected) = self.process_id {
            if !matches!(element.process_id(), Ok(pid) if pid == expected) {
                return false;
            }
        }
        if let Some(expected) = self.native_window_handle {
            if !matches!(element.native_window_handle(), Ok(h) if h == expected) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            return match element.name() {
                Ok(actual) => name.matches(&actual),
                Err(_) => false,
            };
        }
        true
    }
}

/// Parse an element selector such as `role:Button && name:OK && nth:2`.
///
/// Supported segments, joined with `&&`:
/// `role:` (control type), `name:` (exact), `name~:` (substring),
/// `name/:` (regex), `id:`, `classname:`, `pid:`, `handle:`, `nth:`.
/// Returns the criterion and the selection index.
pub fn parse_selector(input: &str) -> Result<(MatchCriterion, i32), AutomationError> {
    let mut criterion = MatchCriterion::default();
    let mut index = 0;

    for segment in split_segments(input)? {
        let (key, value) = split_key(segment)?;
        match key.as_str() {
            "role" | "controltype" => {
                criterion.control_type = Some(ControlType::parse(value)?);
            }
            "name" => set_name(&mut criterion.name, NamePredicate::Exact(value.to_string()))?,
            "name~" => set_name(
                &mut criterion.name,
                NamePredicate::Contains(value.to_string()),
            )?,
            "name/" => {
                let predicate = NamePredicate::Regex(value.to_string());
                predicate.compile()?;
                set_name(&mut criterion.name, predicate)?;
            }
            "id" | "automationid" | "nativeid" => {
                criterion.automation_id = Some(value.to_string());
            }
            "classname" | "class" => criterion.class_name = Some(value.to_string()),
            "pid" => criterion.process_id = Some(parse_number(&key, value)?),
            "handle" => criterion.native_window_handle = Some(parse_handle(value)?.0),
            "nth" => index = parse_number(&key, value)?,
            _ => {
                return Err(AutomationError::InvalidCriterion(format!(
                    "Unknown selector key '{key}' in \"{segment}\". Use role:, name:, name~:, \
                     name/:, id:, classname:, pid:, handle: or nth:."
                )))
            }
        }
    }

    Ok((criterion, index.max(0)))
}

/// Parse a window selector such as `title~:Notepad && process:notepad`.
///
/// Supported segments: `title:`, `title~:`, `title/:`, `process:`, `pid:`,
/// `class:`, `handle:`, `nth:`. An empty string selects the desktop root.
pub fn parse_window_selector(input: &str) -> Result<(WindowCriterion, i32), AutomationError> {
    let mut criterion = WindowCriterion::default();
    let mut index = 0;

    for segment in split_segments(input)? {
        let (key, value) = split_key(segment)?;
        match key.as_str() {
            "title" => set_name(&mut criterion.title, NamePredicate::Exact(value.to_string()))?,
            "title~" => set_name(
                &mut criterion.title,
                NamePredicate::Contains(value.to_string()),
            )?,
            "title/" => {
                let predicate = NamePredicate::Regex(value.to_string());
                predicate.compile()?;
                set_name(&mut criterion.title, predicate)?;
            }
            "process" | "app" => criterion.process_name = Some(value.to_string()),
            "pid" => criterion.process_id = Some(parse_number(&key, value)?),
            "class" | "classname" => criterion.class_name = Some(value.to_string()),
            "handle" | "hwnd" => criterion.handle = Some(parse_handle(value)?),
            "nth" => index = parse_number(&key, value)?,
            _ => {
                return Err(AutomationError::InvalidCriterion(format!(
                    "Unknown window selector key '{key}' in \"{segment}\". Use title:, title~:, \
                     title/:, process:, pid:, class:, handle: or nth:."
                )))
            }
        }
    }

    Ok((criterion, index.max(0)))
}

fn split_segments(input: &str) -> Result<Vec<&str>, AutomationError> {
    let s = input.trim();
    if s.contains(">>") {
        return Err(AutomationError::InvalidCriterion(
            "Chained selectors ('>>') are not supported; resolve the window first and search \
             inside it"
                .to_string(),
        ));
    }
    if s.contains("||") {
        return Err(AutomationError::InvalidCriterion(
            "Alternatives ('||') are not supported; every predicate must hold".to_string(),
        ));
    }
    Ok(s.split("&&")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect())
}

fn split_key(segment: &str) -> Result<(String, &str), AutomationError> {
    let Some((key, value)) = segment.split_once(':') else {
        return Err(AutomationError::InvalidCriterion(format!(
            "Selector segment \"{segment}\" must look like key:value"
        )));
    };
    Ok((key.trim().to_lowercase(), value.trim()))
}

fn set_name(
    slot: &mut Option<NamePredicate>,
    predicate: NamePredicate,
) -> Result<(), AutomationError> {
    if slot.is_some() {
        return Err(AutomationError::InvalidCriterion(
            "Only one name/title predicate (exact, substring or regex) may be given".to_string(),
        ));
    }
    *slot = Some(predicate);
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AutomationError> {
    value.parse::<T>().map_err(|_| {
        AutomationError::InvalidCriterion(format!("Invalid number for '{key}': '{value}'"))
    })
}

fn parse_handle(value: &str) -> Result<WindowHandle, AutomationError> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => isize::from_str_radix(hex, 16),
        None => value.parse::<isize>(),
    };
    parsed.map(WindowHandle).map_err(|_| {
        AutomationError::InvalidCriterion(format!("Invalid window handle '{value}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_and_name() {
        let (criterion, index) = parse_selector("role:Button && name:Submit").unwrap();
        assert_eq!(criterion.control_type, Some(ControlType::Button));
        assert_eq!(
            criterion.name,
            Some(NamePredicate::Exact("Submit".to_string()))
        );
        assert_eq!(index, 0);
    }

    #[test]
    fn test_parse_substring_regex_and_nth() {
        let (criterion, index) = parse_selector("name~:save && nth:3").unwrap();
        assert_eq!(
            criterion.name,
            Some(NamePredicate::Contains("save".to_string()))
        );
        assert_eq!(index, 3);

        let (criterion, _) = parse_selector("name/:^File.*$").unwrap();
        assert!(matches!(criterion.name, Some(NamePredicate::Regex(_))));
    }

    #[test]
    fn test_negative_nth_is_clamped() {
        let (_, index) = parse_selector("role:ListItem && nth:-4").unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_malformed_regex_is_invalid_criterion() {
        assert!(matches!(
            parse_selector("name/:(unclosed"),
            Err(AutomationError::InvalidCriterion(_))
        ));
    }

    #[test]
    fn test_two_name_predicates_rejected() {
        assert!(parse_selector("name:OK && name~:O").is_err());
    }

    #[test]
    fn test_unknown_role_and_chain_rejected() {
        assert!(matches!(
            parse_selector("role:Gizmo"),
            Err(AutomationError::InvalidCriterion(_))
        ));
        assert!(parse_selector("window:App >> role:Button").is_err());
        assert!(parse_selector("Submit").is_err());
    }

    #[test]
    fn test_empty_selector_is_empty_criterion() {
        let (criterion, index) = parse_selector("  ").unwrap();
        assert!(criterion.is_empty());
        assert_eq!(index, 0);
    }

    #[test]
    fn test_parse_window_selector() {
        let (criterion, index) =
            parse_window_selector("title~:notepad && pid:42 && handle:0x1A2B && nth:1").unwrap();
        assert_eq!(
            criterion.title,
            Some(NamePredicate::Contains("notepad".to_string()))
        );
        assert_eq!(criterion.process_id, Some(42));
        assert_eq!(criterion.handle, Some(WindowHandle(0x1A2B)));
        assert_eq!(index, 1);
        assert!(parse_window_selector("").unwrap().0.is_empty());
    }

    #[test]
    fn test_name_modes_are_case_insensitive() {
        assert!(NamePredicate::Exact("Save".into()).compile().unwrap().matches("SAVE"));
        assert!(!NamePredicate::Exact("Save".into()).compile().unwrap().matches("Save As"));
        assert!(NamePredicate::Contains("ave a".into()).compile().unwrap().matches("Save As"));
        assert!(NamePredicate::Regex("^save\\b".into()).compile().unwrap().matches("SAVE As"));
    }

    #[test]
    fn test_criterion_serde_shape() {
        let criterion = MatchCriterion::default()
            .with_name_containing("ok")
            .with_control_type(ControlType::Button);
        let json = serde_json::to_string(&criterion).unwrap();
        assert!(json.contains("\"mode\":\"contains\""));
        let parsed: MatchCriterion = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, criterion);
    }
}
