//! End-to-end gestures through `Desktop` against the in-memory platform

use deskpilot::platforms::memory::{window_info, MemoryDesktop, MemoryNode, MemoryTree};
use deskpilot::{
    AutomationConfig, AutomationError, ClickOptions, ControlType, CoordinateMapper, Desktop,
    InputEvent, KeyId, KeyState, MatchCriterion, MouseButton, Point, Rect, SearchBudget,
    VirtualDesktop, WaitState, WindowCriterion, WindowHandle,
};
use std::sync::Arc;
use std::time::Duration;

const NOTEPAD: isize = 0x100;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Notepad with an edit area, an OK button and a button with no bounds
fn notepad() -> (MemoryDesktop, Desktop) {
    init_tracing();
    let memory = MemoryDesktop::default();
    let mut info = window_info(NOTEPAD, "Untitled - Notepad", 42, "notepad.exe");
    info.bounds = Some(Rect::new(0.0, 0.0, 800.0, 600.0));
    let window = memory.add_window(info);
    memory.tree.add_child(
        window,
        MemoryNode::new(ControlType::Edit, "Text Editor")
            .automation_id("15")
            .bounds(Rect::new(0.0, 40.0, 800.0, 540.0)),
    );
    memory.tree.add_child(
        window,
        MemoryNode::new(ControlType::Button, "OK").bounds(Rect::new(100.0, 200.0, 50.0, 20.0)),
    );
    memory
        .tree
        .add_child(window, MemoryNode::new(ControlType::Button, "Hidden"));

    let desktop = Desktop::new(memory.platform(), AutomationConfig::default())
        .with_sleep(Arc::new(|_| {}));
    (memory, desktop)
}

fn find(desktop: &Desktop, criterion: MatchCriterion) -> deskpilot::UiElement {
    desktop
        .find_element(
            &WindowCriterion::default().with_title_containing("notepad"),
            0,
            &criterion,
            0,
            &SearchBudget::default(),
        )
        .unwrap()
        .expect("element should resolve")
}

fn normalized(point: Point) -> InputEvent {
    let (x, y) = CoordinateMapper::new(VirtualDesktop::new(0, 0, 1920, 1080))
        .to_normalized(point.x, point.y);
    InputEvent::PointerMove { x, y }
}

#[test]
fn test_click_targets_centre_of_element() {
    let (memory, desktop) = notepad();
    let ok = find(
        &desktop,
        MatchCriterion::default()
            .with_control_type(ControlType::Button)
            .with_name("ok"),
    );

    let report = desktop.click(&ok, ClickOptions::default()).unwrap();

    assert_eq!(report.batches, 3);
    assert!(!report.is_partial());
    assert_eq!(
        memory.sink.batches(),
        vec![
            vec![normalized(Point::new(125.0, 210.0))],
            vec![InputEvent::button(MouseButton::Left, KeyState::Down)],
            vec![InputEvent::button(MouseButton::Left, KeyState::Up)],
        ]
    );
}

#[test]
fn test_click_without_bounds_is_rejected_before_input() {
    let (memory, desktop) = notepad();
    let hidden = find(&desktop, MatchCriterion::default().with_name("Hidden"));

    let err = desktop.click(&hidden, ClickOptions::default()).unwrap_err();

    assert!(matches!(err, AutomationError::InvalidArgument(_)));
    assert!(memory.sink.events().is_empty());
}

#[test]
fn test_type_text_clicks_target_then_types() {
    let (memory, desktop) = notepad();
    let editor = find(&desktop, MatchCriterion::default().with_automation_id("15"));

    let report = desktop.type_text(Some(&editor), "hi", 0).unwrap();

    // click (3 batches) + one text batch
    assert_eq!(report.batches, 4);
    let batches = memory.sink.batches();
    assert_eq!(batches[0], vec![normalized(Point::new(400.0, 310.0))]);
    assert_eq!(
        batches[3],
        vec![
            InputEvent::Unicode { ch: 'h', state: KeyState::Down },
            InputEvent::Unicode { ch: 'h', state: KeyState::Up },
            InputEvent::Unicode { ch: 'i', state: KeyState::Down },
            InputEvent::Unicode { ch: 'i', state: KeyState::Up },
        ]
    );
}

#[test]
fn test_hotkey_with_unknown_token_sends_nothing() {
    let (memory, desktop) = notepad();

    let err = desktop.hotkey(&["ctrl", "hyper", "s"]).unwrap_err();

    assert!(matches!(err, AutomationError::InvalidKeyToken(_)));
    assert!(memory.sink.events().is_empty());
}

#[test]
fn test_hotkey_ctrl_s() {
    let (memory, desktop) = notepad();

    desktop.hotkey(&["ctrl", "s"]).unwrap();

    let s = KeyId(b'S');
    assert_eq!(
        memory.sink.events(),
        vec![
            InputEvent::key(KeyId::CONTROL, KeyState::Down),
            InputEvent::key(s, KeyState::Down),
            InputEvent::key(s, KeyState::Up),
            InputEvent::key(KeyId::CONTROL, KeyState::Up),
        ]
    );
}

#[test]
fn test_drag_between_elements_uses_configured_steps() {
    let (memory, desktop) = notepad();
    let ok = find(&desktop, MatchCriterion::default().with_name("OK"));
    let editor = find(&desktop, MatchCriterion::default().with_automation_id("15"));

    let report = desktop.drag_elements(&ok, &editor, None).unwrap();

    // move, down, 20 interpolated moves, up
    assert_eq!(report.batches, 23);
    let batches = memory.sink.batches();
    assert_eq!(batches[0], vec![normalized(Point::new(125.0, 210.0))]);
    assert_eq!(batches[21], vec![normalized(Point::new(400.0, 310.0))]);
    assert_eq!(
        batches[22],
        vec![InputEvent::button(MouseButton::Left, KeyState::Up)]
    );
}

#[test]
fn test_scroll_at_point() {
    let (memory, desktop) = notepad();

    let report = desktop
        .scroll(Some(Point::new(400.0, 300.0)), -3, 0)
        .unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(
        memory.sink.batches()[1],
        vec![InputEvent::Wheel {
            axis: deskpilot::input::WheelAxis::Vertical,
            delta: -360,
        }]
    );
}

#[test]
fn test_locator_from_selector_strings() {
    let (_memory, desktop) = notepad();

    let locator = desktop
        .locator_from_selectors(Some("title~:Notepad"), "role:Button && name:OK")
        .unwrap();
    let ok = locator.first().unwrap().expect("OK button");

    assert_eq!(ok.name().unwrap(), "OK");
    assert!(desktop
        .locator_from_selectors(None, "role:Button >> name:OK")
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_exists_sees_late_element() {
    let (memory, desktop) = notepad();
    let locator = desktop
        .locator(MatchCriterion::default().with_name("Save As"))
        .within_window(WindowCriterion::default().with_handle(WindowHandle(NOTEPAD)), 0)
        .set_poll_interval(Duration::from_millis(100));

    let window_root = desktop
        .window_root(&WindowCriterion::default().with_handle(WindowHandle(NOTEPAD)), 0)
        .unwrap()
        .expect("notepad window element");
    let window = MemoryTree::node_id(&window_root).expect("memory node");

    let tree = memory.tree.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        tree.add_child(window, MemoryNode::new(ControlType::Window, "Save As"));
    });

    let outcome = desktop
        .wait_for(&locator, WaitState::Exists, Some(Duration::from_secs(2)))
        .await
        .unwrap();

    let dialog = outcome.value.expect("dialog element");
    assert_eq!(dialog.name().unwrap(), "Save As");
    assert!(outcome.elapsed >= Duration::from_millis(350));
    assert!(outcome.elapsed < Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_not_exists_after_window_closes() {
    let (memory, desktop) = notepad();
    let locator = desktop
        .locator(MatchCriterion::default().with_name("OK"))
        .within_window(WindowCriterion::default().with_title("Untitled - Notepad"), 0);

    let closer = memory.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        closer.close_window(WindowHandle(NOTEPAD));
    });

    let outcome = desktop
        .wait_for(&locator, WaitState::NotExists, None)
        .await
        .unwrap();

    assert!(outcome.value.is_none());
    assert!(outcome.polls >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_times_out() {
    let (_memory, desktop) = notepad();
    let locator = desktop.locator(MatchCriterion::default().with_name("Never"));

    let err = desktop
        .wait_for(&locator, WaitState::Exists, Some(Duration::from_millis(500)))
        .await
        .unwrap_err();

    assert!(matches!(err, AutomationError::Timeout(_)));
}

#[tokio::test]
async fn test_wait_deadline_bounds_slow_search() {
    init_tracing();
    let memory = MemoryDesktop::default();
    let window = memory.add_window(window_info(0x200, "Inbox", 9, "mail.exe"));
    for i in 0..50_000 {
        memory
            .tree
            .add_child(window, MemoryNode::new(ControlType::ListItem, format!("message {i}")));
    }
    // A single unbudgeted walk of this list would run for seconds.
    let config = AutomationConfig {
        slow_path_timeout_ms: 3_000,
        slow_path_max_nodes: usize::MAX,
        ..AutomationConfig::default()
    };
    let desktop = Desktop::new(memory.platform(), config);
    let locator = desktop
        .locator(MatchCriterion::default().with_name_containing("missing"))
        .within_window(WindowCriterion::default().with_title("Inbox"), 0)
        .set_poll_interval(Duration::from_millis(50));

    let timeout = Duration::from_millis(200);
    let start = std::time::Instant::now();
    let err = desktop
        .wait_for(&locator, WaitState::Exists, Some(timeout))
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, AutomationError::Timeout(_)));
    assert!(
        elapsed < timeout + Duration::from_millis(800),
        "wait overran its timeout: {elapsed:?}"
    );
}

#[test]
fn test_resize_is_picked_up_by_next_gesture() {
    let (memory, desktop) = notepad();
    memory.set_virtual_desktop(VirtualDesktop::new(-1920, 0, 3840, 1080));

    desktop.click_at(Point::new(0.0, 0.0), ClickOptions::default()).unwrap();

    let (x, _) = CoordinateMapper::new(VirtualDesktop::new(-1920, 0, 3840, 1080))
        .to_normalized(0.0, 0.0);
    assert!(x > 32000 && x < 33000);
    assert_eq!(memory.sink.batches()[0], vec![InputEvent::PointerMove { x, y: 0 }]);
}
