//! Audio forwarding through the bridge into the reference engine.

use crate::helpers::*;
use approx::assert_abs_diff_eq;
use vessel::MAX_CHANNELS;

#[test]
fn test_default_state_passes_audio_through() {
    let plugin = test_plugin();
    let left = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);
    let right = generate_sine(660.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);

    let (out_left, out_right) = run_stereo(&plugin, &left, &right, &host_time(0, true));

    assert!(max_difference(&out_left, &left) < tolerances::FLOAT_EPSILON);
    assert!(max_difference(&out_right, &right) < tolerances::FLOAT_EPSILON);
}

#[test]
fn test_zero_frames_leaves_outputs_untouched() {
    let plugin = test_plugin();
    let input = [1.0f32; 32];
    let mut out = [7.0f32; 32];
    {
        let mut outputs: [&mut [f32]; 1] = [&mut out];
        plugin.run(&[&input], &mut outputs, 0, &host_time(0, true));
    }
    assert_eq!(out, [7.0; 32]);
}

#[test]
fn test_frames_clamped_to_shortest_buffer() {
    let plugin = test_plugin();
    let input = [0.5f32; 64];
    let mut out = [0.0f32; 32];
    {
        let mut outputs: [&mut [f32]; 1] = [&mut out];
        plugin.run(&[&input], &mut outputs, 128, &host_time(0, true));
    }
    assert_eq!(out, [0.5; 32]);
}

#[test]
fn test_channels_past_limit_are_silent() {
    let plugin = test_plugin();
    let channels = MAX_CHANNELS + 2;
    let inputs = vec![vec![1.0f32; 16]; channels];
    let mut outputs = vec![vec![9.0f32; 16]; channels];
    {
        let input_refs: Vec<&[f32]> = inputs.iter().map(|ch| ch.as_slice()).collect();
        let mut output_refs: Vec<&mut [f32]> =
            outputs.iter_mut().map(|ch| ch.as_mut_slice()).collect();
        plugin.run(&input_refs, &mut output_refs, 16, &host_time(0, false));
    }

    for channel in &outputs[..MAX_CHANNELS] {
        assert!(channel.iter().all(|&s| s == 1.0));
    }
    for channel in &outputs[MAX_CHANNELS..] {
        assert!(channel.iter().all(|&s| s == 0.0));
    }
}

#[test]
fn test_outputs_without_input_are_silent() {
    let plugin = test_plugin();
    let input = [0.75f32; 16];
    let mut left = [3.0f32; 16];
    let mut right = [3.0f32; 16];
    {
        let mut outputs: [&mut [f32]; 2] = [&mut left, &mut right];
        plugin.run(&[&input], &mut outputs, 16, &host_time(0, true));
    }
    assert_eq!(left, [0.75; 16]);
    assert_eq!(right, [0.0; 16]);
}

#[test]
fn test_negative_transport_position() {
    let plugin = test_plugin();
    let input = generate_sine(220.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);
    // Pre-roll reported through the host's unsigned frame field.
    let time = host_time((-4800i64) as u64, true);

    let (left, right) = run_stereo(&plugin, &input, &input, &time);

    assert!(left.iter().chain(&right).all(|s| s.is_finite()));
    assert!(max_difference(&left, &input) < tolerances::FLOAT_EPSILON);
}

#[test]
fn test_gain_applied_across_blocks() {
    let plugin = test_plugin();
    plugin.set_state("state", &encoded_params(0.5, false));
    let input = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE * 4);

    for (block, chunk) in input.chunks(TEST_BUFFER_SIZE).enumerate() {
        let time = host_time((block * TEST_BUFFER_SIZE) as u64, true);
        let (left, _) = run_stereo(&plugin, chunk, chunk, &time);
        for (out, sample) in left.iter().zip(chunk) {
            assert_abs_diff_eq!(*out, sample * 0.5, epsilon = tolerances::FLOAT_EPSILON);
        }
    }
}
