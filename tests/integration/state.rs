//! Host save/restore through the bridge.

use crate::helpers::*;

#[test]
fn test_restored_instance_renders_identically() {
    let original = test_plugin();
    original.set_state("state", &encoded_params(0.3, false));
    let saved = original.get_state("state");

    let restored = test_plugin();
    restored.set_state("state", &saved);

    let input = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);
    let time = host_time(0, true);
    let (a_left, a_right) = run_stereo(&original, &input, &input, &time);
    let (b_left, b_right) = run_stereo(&restored, &input, &input, &time);

    assert_eq!(a_left, b_left);
    assert_eq!(a_right, b_right);
    assert_eq!(restored.get_state("state"), saved);
}

#[test]
fn test_empty_state_keeps_defaults() {
    let plugin = test_plugin();
    let defaults = plugin.get_state("state");
    assert_eq!(defaults, encoded_params(1.0, false));

    plugin.set_state("state", "");

    assert_eq!(plugin.get_state("state"), defaults);
}

#[test]
fn test_garbage_state_is_ignored() {
    let plugin = test_plugin();
    plugin.set_state("state", &encoded_params(0.5, true));
    let before = plugin.get_state("state");

    plugin.set_state("state", "@@ not base64 @@");
    plugin.set_state("state", "AAAA");

    assert_eq!(plugin.get_state("state"), before);
}

#[test]
fn test_restore_is_idempotent() {
    let plugin = test_plugin();
    let blob = encoded_params(2.0, false);

    plugin.set_state("state", &blob);
    plugin.set_state("state", &blob);

    assert_eq!(plugin.get_state("state"), blob);
}

#[test]
fn test_repeated_saves_are_stable() {
    let plugin = test_plugin();
    plugin.set_state("state", &encoded_params(0.8, false));
    let first = plugin.get_state("state");

    for _ in 0..100 {
        assert_eq!(plugin.get_state("state"), first);
    }
}

#[test]
fn test_state_is_text_safe() {
    let plugin = test_plugin();
    plugin.set_state("state", &encoded_params(1.5, true));
    let saved = plugin.get_state("state");

    assert!(!saved.is_empty());
    assert!(saved
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')));
}
