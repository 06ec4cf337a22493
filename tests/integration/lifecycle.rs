//! Library sharing and instance lifecycle.

use crate::helpers::*;
use std::sync::Arc;
use vessel::prelude::*;

#[test]
fn test_instances_share_one_library() {
    let library = linked_library();
    let config = BridgeConfig::default();

    let first = PluginShell::with_library(Arc::clone(&library), &config).unwrap();
    let second = PluginShell::with_library(Arc::clone(&library), &config).unwrap();
    assert_eq!(Arc::strong_count(&library), 3);
    assert!(Arc::ptr_eq(first.engine().library(), second.engine().library()));

    drop(first);
    drop(second);
    assert_eq!(Arc::strong_count(&library), 1);
}

#[test]
fn test_instances_are_independent() {
    let quiet = test_plugin();
    let loud = test_plugin();
    quiet.set_state("state", &encoded_params(0.0, false));

    let input = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);
    let time = host_time(0, true);
    let (quiet_out, _) = run_stereo(&quiet, &input, &input, &time);
    let (loud_out, _) = run_stereo(&loud, &input, &input, &time);

    assert!(quiet_out.iter().all(|s| s.abs() < tolerances::SILENCE_THRESHOLD));
    assert!(max_difference(&loud_out, &input) < tolerances::FLOAT_EPSILON);
}

#[test]
fn test_version_is_engine_crate_version() {
    let plugin = test_plugin();
    let expected = vessel_engine::version();

    assert_eq!(plugin.engine().library().version(), expected);
    assert_eq!(
        plugin.version(),
        (expected.major << 16) | (expected.minor << 8) | expected.patch
    );
}

#[test]
fn test_state_descriptor() {
    let descriptor = test_plugin().state_descriptor();
    assert_eq!(descriptor.key, "state");
    assert!(descriptor.default_value.is_empty());
    assert!(descriptor.base64_blob);
}

#[test]
fn test_many_create_destroy_cycles() {
    let library = linked_library();
    for _ in 0..100 {
        let plugin = PluginShell::with_library(Arc::clone(&library), &BridgeConfig::default()).unwrap();
        let input = [0.25f32; 64];
        let (left, _) = run_stereo(&plugin, &input, &input, &host_time(0, false));
        assert_eq!(left, input.to_vec());
    }
    assert_eq!(Arc::strong_count(&library), 1);
}
