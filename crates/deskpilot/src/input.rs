//! Synthetic input sequencing
//!
//! Turns gestures (click, drag, type, chord, wheel) into ordered batches of
//! low-level events and hands each batch to an [`InputSink`]. Ordering inside
//! a batch is preserved by the sink; nothing here reorders or deduplicates.

use crate::coords::{interpolate_points, CoordinateMapper};
use crate::keys::KeyId;
use crate::platforms::InputSink;
use crate::types::{KeyState, MouseButton, Point};
use crate::AutomationError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default wheel units per notch
pub const WHEEL_DELTA: i32 = 120;
/// Upper bound for gesture delays
pub const MAX_GESTURE_DELAY_MS: u64 = 5_000;
/// Upper bound for the pause between the two clicks of a double-click
pub const MAX_DOUBLE_CLICK_DELAY_MS: u64 = 2_000;
pub const MAX_KEY_REPEAT: u32 = 100;
pub const MAX_DRAG_STEPS: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WheelAxis {
    Vertical,
    Horizontal,
}

/// One low-level input record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// Absolute move in normalized (0..=65535) coordinates
    PointerMove { x: u16, y: u16 },
    PointerButton { button: MouseButton, state: KeyState },
    /// `delta` is already in wheel units (notches * unit)
    Wheel { axis: WheelAxis, delta: i32 },
    Key {
        key: KeyId,
        state: KeyState,
        extended: bool,
    },
    /// A literal character, bypassing the keyboard layout
    Unicode { ch: char, state: KeyState },
}

impl InputEvent {
    pub fn key(key: KeyId, state: KeyState) -> Self {
        InputEvent::Key {
            key,
            state,
            extended: key.is_extended(),
        }
    }

    pub fn button(button: MouseButton, state: KeyState) -> Self {
        InputEvent::PointerButton { button, state }
    }
}

/// What happened to the batches of one gesture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GestureReport {
    pub batches: usize,
    pub submitted: usize,
    pub accepted: usize,
}

impl GestureReport {
    /// The sink took fewer events than were offered. Best effort, not retried.
    pub fn is_partial(&self) -> bool {
        self.accepted < self.submitted
    }

    pub(crate) fn merge(&mut self, other: GestureReport) {
        self.batches += other.batches;
        self.submitted += other.submitted;
        self.accepted += other.accepted;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickOptions {
    pub button: MouseButton,
    /// Pause between the move and the button press
    pub settle_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragOptions {
    pub button: MouseButton,
    pub steps: u32,
    pub settle_ms: u64,
    pub post_down_ms: u64,
    pub pre_up_ms: u64,
    /// Pause between interpolated moves
    pub step_delay_ms: u64,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            button: MouseButton::Left,
            steps: 20,
            settle_ms: 50,
            post_down_ms: 0,
            pre_up_ms: 0,
            step_delay_ms: 0,
        }
    }
}

fn clamp_delay(ms: u64, max: u64) -> Duration {
    Duration::from_millis(ms.min(max))
}

/// Sleep hook, replaceable so gestures can run without wall-clock waits
pub type SleepFn = Arc<dyn Fn(Duration) + Send + Sync>;

pub fn thread_sleep() -> SleepFn {
    Arc::new(std::thread::sleep)
}

/// Builds and submits event batches for one gesture at a time.
///
/// The mapper is a snapshot of the virtual desktop taken by the caller for
/// this gesture.
pub struct InputSequencer<'a> {
    sink: &'a dyn InputSink,
    mapper: CoordinateMapper,
    sleep: SleepFn,
    wheel_unit: i32,
}

impl<'a> InputSequencer<'a> {
    pub fn new(sink: &'a dyn InputSink, mapper: CoordinateMapper) -> Self {
        Self {
            sink,
            mapper,
            sleep: thread_sleep(),
            wheel_unit: WHEEL_DELTA,
        }
    }

    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn with_wheel_unit(mut self, unit: i32) -> Self {
        self.wheel_unit = unit;
        self
    }

    /// Submit one batch as a single injection call.
    pub fn submit(&self, batch: &[InputEvent]) -> Result<GestureReport, AutomationError> {
        if batch.is_empty() {
            return Ok(GestureReport::default());
        }
        let accepted = self.sink.send(batch)?;
        if accepted < batch.len() {
            warn!(
                "input sink accepted {} of {} events; continuing best-effort",
                accepted,
                batch.len()
            );
        } else {
            debug!("submitted batch of {} events", batch.len());
        }
        Ok(GestureReport {
            batches: 1,
            submitted: batch.len(),
            accepted,
        })
    }

    fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            (self.sleep)(delay);
        }
    }

    fn move_event(&self, point: Point) -> InputEvent {
        let (x, y) = self.mapper.to_normalized(point.x, point.y);
        InputEvent::PointerMove { x, y }
    }

    pub fn move_to(&self, point: Point) -> Result<GestureReport, AutomationError> {
        self.submit(&[self.move_event(point)])
    }

    /// Interpolated move, one batch per step.
    pub fn move_smooth(
        &self,
        from: Point,
        to: Point,
        steps: u32,
        step_delay_ms: u64,
    ) -> Result<GestureReport, AutomationError> {
        let step_delay = clamp_delay(step_delay_ms, MAX_GESTURE_DELAY_MS);
        let mut report = GestureReport::default();
        for (x, y) in self
            .mapper
            .interpolate(from, to, steps.clamp(1, MAX_DRAG_STEPS))
        {
            report.merge(self.submit(&[InputEvent::PointerMove { x, y }])?);
            self.pause(step_delay);
        }
        Ok(report)
    }

    /// Move, press, release: three batches.
    pub fn click(
        &self,
        point: Point,
        options: ClickOptions,
    ) -> Result<GestureReport, AutomationError> {
        let mut report = self.move_to(point)?;
        if let Some(settle) = options.settle_ms {
            self.pause(clamp_delay(settle, MAX_GESTURE_DELAY_MS));
        }
        report.merge(self.submit(&[InputEvent::button(options.button, KeyState::Down)])?);
        report.merge(self.submit(&[InputEvent::button(options.button, KeyState::Up)])?);
        Ok(report)
    }

    /// Two full clicks with `interval_ms` (0..=2000) between them.
    pub fn double_click(
        &self,
        point: Point,
        options: ClickOptions,
        interval_ms: u64,
    ) -> Result<GestureReport, AutomationError> {
        let mut report = self.click(point, options)?;
        self.pause(clamp_delay(interval_ms, MAX_DOUBLE_CLICK_DELAY_MS));
        report.merge(self.click(point, options)?);
        Ok(report)
    }

    pub fn button(
        &self,
        button: MouseButton,
        state: KeyState,
    ) -> Result<GestureReport, AutomationError> {
        self.submit(&[InputEvent::button(button, state)])
    }

    /// Move to start, settle, press, optional pause, interpolated move to
    /// end, optional pause, release.
    ///
    /// No rollback: if a later batch fails the button may stay pressed.
    pub fn drag(
        &self,
        from: Point,
        to: Point,
        options: DragOptions,
    ) -> Result<GestureReport, AutomationError> {
        let mut report = self.move_to(from)?;
        self.pause(clamp_delay(options.settle_ms, MAX_GESTURE_DELAY_MS));
        report.merge(self.button(options.button, KeyState::Down)?);
        self.pause(clamp_delay(options.post_down_ms, MAX_GESTURE_DELAY_MS));
        report.merge(self.move_smooth(from, to, options.steps, options.step_delay_ms)?);
        self.pause(clamp_delay(options.pre_up_ms, MAX_GESTURE_DELAY_MS));
        report.merge(self.button(options.button, KeyState::Up)?);
        Ok(report)
    }

    /// Each character is a down/up pair carrying the character itself.
    /// With no delay the whole text is one batch, otherwise one batch per
    /// character.
    pub fn type_text(&self, text: &str, delay_ms: u64) -> Result<GestureReport, AutomationError> {
        let delay = clamp_delay(delay_ms, MAX_GESTURE_DELAY_MS);
        let pairs = text.chars().map(|ch| {
            [
                InputEvent::Unicode {
                    ch,
                    state: KeyState::Down,
                },
                InputEvent::Unicode {
                    ch,
                    state: KeyState::Up,
                },
            ]
        });

        if delay.is_zero() {
            let batch: Vec<InputEvent> = pairs.flatten().collect();
            return self.submit(&batch);
        }

        let mut report = GestureReport::default();
        let total = text.chars().count();
        for (i, pair) in pairs.enumerate() {
            report.merge(self.submit(&pair)?);
            if i + 1 < total {
                self.pause(delay);
            }
        }
        Ok(report)
    }

    /// Tap `key` `repeat` times (1..=100), `delay_ms` (0..=5000) apart.
    pub fn press_key(
        &self,
        key: KeyId,
        repeat: u32,
        delay_ms: u64,
    ) -> Result<GestureReport, AutomationError> {
        let repeat = repeat.clamp(1, MAX_KEY_REPEAT);
        let delay = clamp_delay(delay_ms, MAX_GESTURE_DELAY_MS);
        let mut report = GestureReport::default();
        for i in 0..repeat {
            report.merge(self.submit(&[
                InputEvent::key(key, KeyState::Down),
                InputEvent::key(key, KeyState::Up),
            ])?);
            if i + 1 < repeat {
                self.pause(delay);
            }
        }
        Ok(report)
    }

    /// Hold every key but the last, tap the last, release the held keys in
    /// reverse order. Submitted as one batch.
    pub fn hotkey(&self, keys: &[KeyId]) -> Result<GestureReport, AutomationError> {
        let batch = chord_events(keys)?;
        self.submit(&batch)
    }

    /// Wheel notches on each axis; a zero axis emits nothing.
    pub fn scroll(&self, vertical: i32, horizontal: i32) -> Result<GestureReport, AutomationError> {
        let mut batch = Vec::with_capacity(2);
        if vertical != 0 {
            batch.push(InputEvent::Wheel {
                axis: WheelAxis::Vertical,
                delta: vertical.saturating_mul(self.wheel_unit),
            });
        }
        if horizontal != 0 {
            batch.push(InputEvent::Wheel {
                axis: WheelAxis::Horizontal,
                delta: horizontal.saturating_mul(self.wheel_unit),
            });
        }
        self.submit(&batch)
    }
}

/// Event order for a chord `k1..kn`: down(k1)..down(kn), up(kn)..up(k1).
pub fn chord_events(keys: &[KeyId]) -> Result<Vec<InputEvent>, AutomationError> {
    if keys.is_empty() {
        return Err(AutomationError::InvalidArgument(
            "hotkey needs at least one key".to_string(),
        ));
    }
    let mut events = Vec::with_capacity(keys.len() * 2);
    events.extend(keys.iter().map(|k| InputEvent::key(*k, KeyState::Down)));
    events.extend(keys.iter().rev().map(|k| InputEvent::key(*k, KeyState::Up)));
    Ok(events)
}
