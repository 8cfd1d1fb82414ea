//! `SendInput` translation of [`InputEvent`] batches

use crate::input::{InputEvent, WheelAxis};
use crate::platforms::InputSink;
use crate::types::{KeyState, MouseButton};
use crate::AutomationError;
use tracing::{debug, warn};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, MOUSEEVENTF_ABSOLUTE,
    MOUSEEVENTF_HWHEEL, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN,
    MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP,
    MOUSEEVENTF_VIRTUALDESK, MOUSEEVENTF_WHEEL, MOUSEEVENTF_XDOWN, MOUSEEVENTF_XUP,
    MOUSE_EVENT_FLAGS, MOUSEINPUT, VIRTUAL_KEY,
};

const XBUTTON1: u32 = 0x0001;
const XBUTTON2: u32 = 0x0002;

fn mouse(dx: i32, dy: i32, data: u32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: data,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn keyboard(vk: u16, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Platform records for one event. A character outside the BMP becomes two
/// records (a surrogate pair).
fn records_for(event: &InputEvent) -> Vec<INPUT> {
    match *event {
        InputEvent::PointerMove { x, y } => vec![mouse(
            x as i32,
            y as i32,
            0,
            MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
        )],
        InputEvent::PointerButton { button, state } => {
            let (flags, data) = match (button, state) {
                (MouseButton::Left, KeyState::Down) => (MOUSEEVENTF_LEFTDOWN, 0),
                (MouseButton::Left, KeyState::Up) => (MOUSEEVENTF_LEFTUP, 0),
                (MouseButton::Right, KeyState::Down) => (MOUSEEVENTF_RIGHTDOWN, 0),
                (MouseButton::Right, KeyState::Up) => (MOUSEEVENTF_RIGHTUP, 0),
                (MouseButton::Middle, KeyState::Down) => (MOUSEEVENTF_MIDDLEDOWN, 0),
                (MouseButton::Middle, KeyState::Up) => (MOUSEEVENTF_MIDDLEUP, 0),
                (MouseButton::X1, KeyState::Down) => (MOUSEEVENTF_XDOWN, XBUTTON1),
                (MouseButton::X1, KeyState::Up) => (MOUSEEVENTF_XUP, XBUTTON1),
                (MouseButton::X2, KeyState::Down) => (MOUSEEVENTF_XDOWN, XBUTTON2),
                (MouseButton::X2, KeyState::Up) => (MOUSEEVENTF_XUP, XBUTTON2),
            };
            vec![mouse(0, 0, data, flags)]
        }
        InputEvent::Wheel { axis, delta } => {
            let flags = match axis {
                WheelAxis::Vertical => MOUSEEVENTF_WHEEL,
                WheelAxis::Horizontal => MOUSEEVENTF_HWHEEL,
            };
            // Negative deltas travel as their two's complement.
            vec![mouse(0, 0, delta as u32, flags)]
        }
        InputEvent::Key {
            key,
            state,
            extended,
        } => {
            let mut flags = KEYBD_EVENT_FLAGS(0);
            if extended {
                flags |= KEYEVENTF_EXTENDEDKEY;
            }
            if state == KeyState::Up {
                flags |= KEYEVENTF_KEYUP;
            }
            vec![keyboard(key.code() as u16, 0, flags)]
        }
        InputEvent::Unicode { ch, state } => {
            let mut flags = KEYEVENTF_UNICODE;
            if state == KeyState::Up {
                flags |= KEYEVENTF_KEYUP;
            }
            let mut units = [0u16; 2];
            ch.encode_utf16(&mut units)
                .iter()
                .map(|unit| keyboard(0, *unit, flags))
                .collect()
        }
    }
}

/// How many whole events fit into `accepted` leading records
fn events_accepted(records_per_event: &[usize], accepted: usize) -> usize {
    let mut total = 0;
    for (i, n) in records_per_event.iter().enumerate() {
        total += n;
        if total > accepted {
            return i;
        }
    }
    records_per_event.len()
}

/// Hands each batch to one `SendInput` call
#[derive(Debug, Default, Clone, Copy)]
pub struct SendInputSink;

impl InputSink for SendInputSink {
    fn send(&self, batch: &[InputEvent]) -> Result<usize, AutomationError> {
        let mut records = Vec::with_capacity(batch.len());
        let mut per_event = Vec::with_capacity(batch.len());
        for event in batch {
            let r = records_for(event);
            per_event.push(r.len());
            records.extend(r);
        }
        if records.is_empty() {
            return Ok(0);
        }

        let sent = unsafe { SendInput(&records, std::mem::size_of::<INPUT>() as i32) } as usize;
        if sent < records.len() {
            warn!(
                sent,
                submitted = records.len(),
                "SendInput accepted a partial batch (UIPI or a secure desktop may block input)"
            );
        } else {
            debug!("SendInput delivered {} records", sent);
        }
        Ok(events_accepted(&per_event, sent))
    }
}
