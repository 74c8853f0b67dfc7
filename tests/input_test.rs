use levelwalk::{
    config::{Action, KeyboardMap},
    input::{ActionState, InputState, KeyOutcome},
};
use winit::{event::WindowEvent, keyboard::KeyCode};

fn input() -> InputState {
    InputState::new(KeyboardMap::default())
}

#[test]
fn should_map_both_key_sets() {
    let map = KeyboardMap::default();

    assert_eq!(map.action_for(KeyCode::KeyW), Some(Action::Forward));
    assert_eq!(map.action_for(KeyCode::ArrowUp), Some(Action::Forward));
    assert_eq!(map.action_for(KeyCode::KeyA), Some(Action::Leftward));
    assert_eq!(map.action_for(KeyCode::ShiftRight), Some(Action::Run));
    assert_eq!(map.action_for(KeyCode::KeyF), Some(Action::Action4));
    assert_eq!(map.action_for(KeyCode::KeyP), None);
    assert_eq!(map.keys_for(Action::Jump), &[KeyCode::Space]);
}

#[test]
fn should_hold_action_until_release() {
    let mut input = input();

    assert_eq!(input.handle_key(KeyCode::KeyW, true), KeyOutcome::Action(Action::Forward));
    assert!(input.actions().is_held(Action::Forward));

    input.handle_key(KeyCode::KeyW, false);
    assert!(!input.actions().is_held(Action::Forward));
}

#[test]
fn should_hold_action_while_any_bound_key_is_down() {
    let mut input = input();

    input.handle_key(KeyCode::KeyW, true);
    input.handle_key(KeyCode::ArrowUp, true);
    input.handle_key(KeyCode::ArrowUp, false);
    assert!(input.actions().is_held(Action::Forward));

    input.handle_key(KeyCode::KeyW, false);
    assert!(!input.actions().is_held(Action::Forward));

    input.handle_key(KeyCode::ShiftLeft, true);
    input.handle_key(KeyCode::ShiftRight, true);
    input.handle_key(KeyCode::ShiftLeft, false);
    assert!(input.actions().is_held(Action::Run));
    assert_eq!(input.actions_mut().take_triggered(), vec![Action::Forward, Action::Run]);
}

#[test]
fn should_trigger_once_per_press() {
    let mut input = input();

    input.handle_key(KeyCode::Digit1, true);
    input.handle_key(KeyCode::Digit1, true);
    assert_eq!(input.actions_mut().take_triggered(), vec![Action::Action1]);
    assert!(input.actions_mut().take_triggered().is_empty());

    input.handle_key(KeyCode::Digit1, false);
    input.handle_key(KeyCode::Digit1, true);
    assert_eq!(input.actions_mut().take_triggered(), vec![Action::Action1]);
}

#[test]
fn should_toggle_debug_once_per_press() {
    let mut input = input();

    assert_eq!(input.handle_key(KeyCode::KeyP, true), KeyOutcome::DebugToggle);
    // key repeat
    assert_eq!(input.handle_key(KeyCode::KeyP, true), KeyOutcome::Ignored);
    assert_eq!(input.handle_key(KeyCode::KeyP, false), KeyOutcome::Ignored);
    assert_eq!(input.handle_key(KeyCode::KeyP, true), KeyOutcome::DebugToggle);
}

#[test]
fn should_ignore_unmapped_keys() {
    let mut input = input();

    assert_eq!(input.handle_key(KeyCode::KeyZ, true), KeyOutcome::Ignored);
    assert!(input.actions_mut().take_triggered().is_empty());
}

#[test]
fn should_combine_opposing_actions_into_axis() {
    let mut actions = ActionState::default();
    assert_eq!(actions.axis(Action::Forward, Action::Backward), 0.0);

    actions.press(Action::Forward);
    assert_eq!(actions.axis(Action::Forward, Action::Backward), 1.0);

    actions.press(Action::Backward);
    assert_eq!(actions.axis(Action::Forward, Action::Backward), 0.0);

    actions.release(Action::Forward);
    assert_eq!(actions.axis(Action::Forward, Action::Backward), -1.0);
}

#[test]
fn should_release_everything_on_focus_loss() {
    let mut input = input();
    input.handle_key(KeyCode::KeyW, true);
    input.handle_key(KeyCode::KeyP, true);

    input.handle_window_event(&WindowEvent::Focused(false));

    assert!(!input.actions().is_held(Action::Forward));
    assert!(input.actions_mut().take_triggered().is_empty());
    // P was never seen released, but the next press still toggles
    assert_eq!(input.handle_key(KeyCode::KeyP, true), KeyOutcome::DebugToggle);
}
