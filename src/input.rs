//! Keyboard state for the character controller.
//!
//! Physical keys are mapped to [`Action`]s through the [`KeyboardMap`]. The
//! debug toggle bypasses the map and is reported separately.

use std::collections::HashSet;

use winit::{
    event::{ElementState, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::config::{Action, KeyboardMap};

/// Which actions are held right now, and which were pressed since the last
/// [`ActionState::take_triggered`].
#[derive(Clone, Debug, Default)]
pub struct ActionState {
    held: HashSet<Action>,
    triggered: Vec<Action>,
}

impl ActionState {
    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    /// -1, 0 or 1 depending on which of the two opposing actions are held.
    pub fn axis(&self, positive: Action, negative: Action) -> f32 {
        let mut value = 0.0;
        if self.is_held(positive) {
            value += 1.0;
        }
        if self.is_held(negative) {
            value -= 1.0;
        }
        value
    }

    pub fn take_triggered(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.triggered)
    }

    pub fn press(&mut self, action: Action) {
        if self.held.insert(action) {
            self.triggered.push(action);
        }
    }

    pub fn release(&mut self, action: Action) {
        self.held.remove(&action);
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.triggered.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Action(Action),
    DebugToggle,
    Ignored,
}

#[derive(Debug)]
pub struct InputState {
    map: KeyboardMap,
    actions: ActionState,
    /// Physical keys currently down; an action stays held while any of its keys is.
    keys_down: HashSet<KeyCode>,
    debug_key_down: bool,
}

impl InputState {
    pub fn new(map: KeyboardMap) -> Self {
        Self {
            map,
            actions: ActionState::default(),
            keys_down: HashSet::new(),
            debug_key_down: false,
        }
    }

    pub fn actions(&self) -> &ActionState {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut ActionState {
        &mut self.actions
    }

    /// Feeds one physical key transition. The debug toggle fires once per
    /// press, key repeat included.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) -> KeyOutcome {
        if key == self.map.debug_toggle {
            let fired = pressed && !self.debug_key_down;
            self.debug_key_down = pressed;
            return if fired {
                KeyOutcome::DebugToggle
            } else {
                KeyOutcome::Ignored
            };
        }
        match self.map.action_for(key) {
            Some(action) => {
                if pressed {
                    self.keys_down.insert(key);
                    self.actions.press(action);
                } else {
                    self.keys_down.remove(&key);
                    let still_down = self
                        .map
                        .keys_for(action)
                        .iter()
                        .any(|k| self.keys_down.contains(k));
                    if !still_down {
                        self.actions.release(action);
                    }
                }
                KeyOutcome::Action(action)
            }
            None => KeyOutcome::Ignored,
        }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> KeyOutcome {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => {
                    self.handle_key(code, event.state == ElementState::Pressed)
                }
                PhysicalKey::Unidentified(_) => KeyOutcome::Ignored,
            },
            WindowEvent::Focused(false) => {
                self.actions.clear();
                self.keys_down.clear();
                self.debug_key_down = false;
                KeyOutcome::Ignored
            }
            _ => KeyOutcome::Ignored,
        }
    }
}
