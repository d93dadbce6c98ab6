//! Encoder Integration Tests
//!
//! Drives the full encode path through the public API.
//! Verifies:
//! - Matrix dimensions for every order and source count
//! - Steady-state output equals the direct matrix product
//! - Crossfade endpoints, fade-in and fade-out of sources
//! - Fixed latency under arbitrary block sizes
//! - Output formats (AmbiX, N3D, FuMa)
//! - Control from another thread

use approx::assert_abs_diff_eq;
use rf_ambi_enc::hoa::encoding_weights;
use rf_ambi_enc::{
    AmbiEncoder, AmbisonicFormat, AmbisonicOrder, ChannelOrdering, EncoderConfig, Normalization,
    SourceDirection, FRAME_SIZE, MAX_NUM_INPUTS, MAX_NUM_SH_SIGNALS,
};

const SAMPLE_RATE: u32 = 48000;

// ============================================================================
// TEST UTILITIES
// ============================================================================

/// Deterministic test signal, distinct per source
fn generate_signal(samples: usize, source: usize) -> Vec<f32> {
    let freq = 0.013 * (source as f32 + 1.0);
    (0..samples)
        .map(|i| (i as f32 * freq).sin() * 0.5 + 0.1 * source as f32)
        .collect()
}

/// Run one `process` call over whole buffers
fn process(encoder: &mut AmbiEncoder, inputs: &[Vec<f32>], num_outputs: usize, samples: usize) -> Vec<Vec<f32>> {
    let input_refs: Vec<&[f32]> = inputs.iter().map(|ch| ch.as_slice()).collect();
    let mut out = vec![vec![0.0f32; samples]; num_outputs];
    let mut output_refs: Vec<&mut [f32]> = out.iter_mut().map(|ch| ch.as_mut_slice()).collect();
    encoder.process(&input_refs, &mut output_refs, samples).unwrap();
    out
}

/// Run `process` over consecutive chunks of the given lengths
fn process_chunked(encoder: &mut AmbiEncoder, input: &[f32], num_outputs: usize, chunks: &[usize]) -> Vec<Vec<f32>> {
    let mut out = vec![vec![0.0f32; input.len()]; num_outputs];
    let mut offset = 0;
    for &len in chunks {
        let end = offset + len;
        let mut output_refs: Vec<&mut [f32]> = out.iter_mut().map(|ch| &mut ch[offset..end]).collect();
        encoder.process(&[&input[offset..end]], &mut output_refs, len).unwrap();
        offset = end;
    }
    assert_eq!(offset, input.len());
    out
}

/// Constant input for `sources` slots
fn constant(sources: usize, value: f32, samples: usize) -> Vec<Vec<f32>> {
    vec![vec![value; samples]; sources]
}

/// Encoder with post-scaling off so matrix weights are plain harmonics
fn unscaled_encoder() -> AmbiEncoder {
    let encoder = AmbiEncoder::new(SAMPLE_RATE).unwrap();
    encoder.control().set_post_scaling(false).unwrap();
    encoder
}

fn sample_at(out: &[Vec<f32>], n: usize) -> Vec<f32> {
    out.iter().map(|ch| ch[n]).collect()
}

// ============================================================================
// MATRIX SHAPE
// ============================================================================

#[test]
fn test_matrix_dimensions_for_all_orders_and_counts() {
    let mut encoder = unscaled_encoder();
    let control = encoder.control();

    for order in AmbisonicOrder::all() {
        for k in [0, 1, 2, 5, 16, 63, MAX_NUM_INPUTS] {
            control.set_order(order).unwrap();
            control.set_num_sources(k).unwrap();
            process(&mut encoder, &[], 0, FRAME_SIZE);

            let matrix = encoder.encoding_matrix();
            assert_eq!(matrix.dim(), (order.channel_count(), k), "order {:?}, k {}", order, k);
            for column in matrix.columns() {
                assert!(column.iter().any(|&w| w != 0.0));
            }

            // Weights outside the logical matrix stay zero
            let full = encoder.matrices().current_block((MAX_NUM_SH_SIGNALS, MAX_NUM_INPUTS));
            for ((row, col), &w) in full.indexed_iter() {
                if row >= order.channel_count() || col >= k {
                    assert_eq!(w, 0.0, "stale weight at ({}, {})", row, col);
                }
            }
        }
    }
}

// ============================================================================
// STEADY STATE
// ============================================================================

#[test]
fn test_steady_state_equals_direct_product() {
    let mut encoder = unscaled_encoder();
    let control = encoder.control();
    control.set_order(AmbisonicOrder::Third).unwrap();
    control.set_num_sources(3).unwrap();
    control.set_source_direction(0, 30.0, 0.0).unwrap();
    control.set_source_direction(1, -110.0, 20.0).unwrap();
    control.set_source_direction(2, 180.0, -45.0).unwrap();

    let samples = 6 * FRAME_SIZE;
    let inputs: Vec<Vec<f32>> = (0..3).map(|s| generate_signal(samples, s)).collect();
    let out = process(&mut encoder, &inputs, 16, samples);

    let weights: Vec<_> = [(30.0, 0.0), (-110.0, 20.0), (180.0, -45.0)]
        .iter()
        .map(|&(az, el)| {
            encoding_weights(SourceDirection::new(az, el), AmbisonicOrder::Third, AmbisonicFormat::ambix())
        })
        .collect();

    // Frame 0 fades in from silence, later frames are steady
    for t in 2 * FRAME_SIZE..samples {
        for ch in 0..16 {
            let expected: f32 = (0..3)
                .map(|s| weights[s].get(ch) * inputs[s][t - FRAME_SIZE])
                .sum();
            assert_abs_diff_eq!(out[ch][t], expected, epsilon = 1e-5);
        }
    }
}

#[test]
fn test_first_order_front_source() {
    let mut encoder = AmbiEncoder::new(SAMPLE_RATE).unwrap();
    let out = process(&mut encoder, &constant(1, 1.0, 3 * FRAME_SIZE), 4, 3 * FRAME_SIZE);

    let last = sample_at(&out, 3 * FRAME_SIZE - 1);
    let expected = [1.0, 0.0, 0.0, 1.0];
    for (got, want) in last.iter().zip(expected) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
    }
}

#[test]
fn test_post_scaling_divides_by_sqrt_count() {
    let mut encoder = AmbiEncoder::new(SAMPLE_RATE).unwrap();
    encoder.control().set_num_sources(4).unwrap();
    process(&mut encoder, &[], 0, FRAME_SIZE);

    for column in encoder.encoding_matrix().columns() {
        assert_abs_diff_eq!(column[0], 0.5, epsilon = 1e-6);
    }
}

// ============================================================================
// CROSSFADE
// ============================================================================

#[test]
fn test_direction_change_fade_endpoints() {
    let mut encoder = unscaled_encoder();
    let control = encoder.control();
    let block = 2 * FRAME_SIZE;

    process(&mut encoder, &constant(1, 1.0, block), 4, block);
    control.set_source_direction(0, 90.0, 0.0).unwrap();
    let out = process(&mut encoder, &constant(1, 1.0, block), 4, block);

    // First half: steady front source; second half: fade front -> left
    let steady = sample_at(&out, FRAME_SIZE - 1);
    let start = sample_at(&out, FRAME_SIZE);
    let end = sample_at(&out, block - 1);
    for ch in 0..4 {
        assert_abs_diff_eq!(start[ch], steady[ch], epsilon = 1e-6);
    }
    for (got, want) in end.iter().zip([1.0, 1.0, 0.0, 0.0]) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
    }

    // Y rises monotonically through the fade
    let y = &out[1][FRAME_SIZE..block];
    assert!(y.windows(2).all(|w| w[1] >= w[0]));
    assert!(encoder.matrices().is_settled());
}

#[test]
fn test_added_source_fades_in_from_silence() {
    let mut encoder = unscaled_encoder();
    let control = encoder.control();
    control.set_source_direction(1, 90.0, 0.0).unwrap();
    let block = 2 * FRAME_SIZE;
    let inputs = vec![vec![0.0f32; block], vec![1.0f32; block]];

    let before = process(&mut encoder, &inputs, 4, block);
    assert!(before.iter().flatten().all(|&s| s == 0.0));

    control.set_num_sources(2).unwrap();
    let out = process(&mut encoder, &inputs, 4, block);

    assert!(sample_at(&out, FRAME_SIZE).iter().all(|&s| s == 0.0));
    for (got, want) in sample_at(&out, block - 1).iter().zip([1.0, 1.0, 0.0, 0.0]) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
    }
}

#[test]
fn test_removed_source_fades_out() {
    let mut encoder = unscaled_encoder();
    let control = encoder.control();
    control.set_num_sources(2).unwrap();
    control.set_source_direction(1, 90.0, 0.0).unwrap();
    let block = 2 * FRAME_SIZE;
    let inputs = vec![vec![0.0f32; block], vec![1.0f32; block]];

    process(&mut encoder, &inputs, 4, block);
    control.set_num_sources(1).unwrap();
    let out = process(&mut encoder, &inputs, 4, block);

    for (got, want) in sample_at(&out, FRAME_SIZE).iter().zip([1.0, 1.0, 0.0, 0.0]) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
    }
    for got in sample_at(&out, block - 1) {
        assert_abs_diff_eq!(got, 0.0, epsilon = 1e-6);
    }

    // No step larger than one ramp increment
    let step = 1.0 / (FRAME_SIZE - 1) as f32 + 1e-6;
    assert!(out[0].windows(2).all(|w| (w[1] - w[0]).abs() <= step));

    let after = process(&mut encoder, &inputs, 4, block);
    assert!(after[0][FRAME_SIZE..].iter().all(|&s| s == 0.0));
}

#[test]
fn test_redundant_updates_are_no_ops() {
    let mut encoder = unscaled_encoder();
    let control = encoder.control();
    control.set_source_direction(0, 45.0, 10.0).unwrap();
    process(&mut encoder, &[], 0, FRAME_SIZE);
    assert_eq!(control.pending_recalculations(), 0);

    control.set_source_direction(0, 45.0, 10.0).unwrap();
    control.set_order(AmbisonicOrder::First).unwrap();
    control.set_num_sources(1).unwrap();
    control.set_post_scaling(false).unwrap();
    assert_eq!(control.pending_recalculations(), 0);

    // Constant input stays constant: no fade was started
    let out = process(&mut encoder, &constant(1, 1.0, 2 * FRAME_SIZE), 4, 2 * FRAME_SIZE);
    let tail = &out[1][FRAME_SIZE..];
    assert!(tail.iter().all(|&s| s == tail[0]));

    // Repeated changes before a frame boundary count once
    control.set_source_direction(0, 50.0, 10.0).unwrap();
    control.set_source_direction(0, 60.0, 10.0).unwrap();
    assert_eq!(control.pending_recalculations(), 1);
}

// ============================================================================
// LATENCY
// ============================================================================

#[test]
fn test_latency_is_one_frame_for_any_chunking() {
    let total = 16 * FRAME_SIZE;
    let impulse_at = 300;
    let mut input = vec![0.0f32; total];
    input[impulse_at] = 1.0;

    let mut whole = AmbiEncoder::new(SAMPLE_RATE).unwrap();
    assert_eq!(whole.processing_delay(), FRAME_SIZE);
    let reference = process_chunked(&mut whole, &input, 4, &[total]);

    let mut chunked = AmbiEncoder::new(SAMPLE_RATE).unwrap();
    let chunks = [1, 7, 64, 13, 200, 3, 500, 236];
    let out = process_chunked(&mut chunked, &input, 4, &chunks);

    assert_eq!(out, reference);
    for (n, &s) in reference[0].iter().enumerate() {
        if n == impulse_at + FRAME_SIZE {
            assert_abs_diff_eq!(s, 1.0, epsilon = 1e-6);
        } else {
            assert_eq!(s, 0.0, "unexpected output at {}", n);
        }
    }
    assert_eq!(chunked.frames_processed(), (total / FRAME_SIZE) as u64);
}

#[test]
fn test_extra_output_channels_are_silenced() {
    let mut encoder = AmbiEncoder::new(SAMPLE_RATE).unwrap();
    let samples = 3 * FRAME_SIZE;
    let out = process(&mut encoder, &constant(1, 1.0, samples), 9, samples);

    assert!(out[0][samples - 1] != 0.0);
    for ch in &out[4..] {
        assert!(ch.iter().all(|&s| s == 0.0));
    }
}

// ============================================================================
// FORMATS
// ============================================================================

#[test]
fn test_fuma_output() {
    let mut encoder = unscaled_encoder();
    let control = encoder.control();
    control.set_channel_ordering(ChannelOrdering::FuMa).unwrap();
    control.set_normalization(Normalization::FuMa).unwrap();
    control.set_source_direction(0, 90.0, 0.0).unwrap();

    let samples = 3 * FRAME_SIZE;
    let out = process(&mut encoder, &constant(1, 1.0, samples), 4, samples);

    // W X Y Z
    let last = sample_at(&out, samples - 1);
    let expected = [std::f32::consts::FRAC_1_SQRT_2, 0.0, 1.0, 0.0];
    for (got, want) in last.iter().zip(expected) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
    }
}

#[test]
fn test_fuma_falls_back_above_first_order() {
    let encoder = AmbiEncoder::new(SAMPLE_RATE).unwrap();
    let control = encoder.control();
    control.set_channel_ordering(ChannelOrdering::FuMa).unwrap();
    control.set_normalization(Normalization::FuMa).unwrap();

    control.set_order(AmbisonicOrder::Second).unwrap();
    assert_eq!(control.channel_ordering(), ChannelOrdering::ACN);
    assert_eq!(control.normalization(), Normalization::SN3D);
    assert_eq!(control.num_sh_channels(), 9);
}

#[test]
fn test_n3d_to_sn3d_ratio() {
    let samples = 3 * FRAME_SIZE;
    let run = |normalization: Normalization| {
        let mut encoder = unscaled_encoder();
        let control = encoder.control();
        control.set_order(AmbisonicOrder::Third).unwrap();
        control.set_normalization(normalization).unwrap();
        control.set_source_direction(0, 37.0, 22.0).unwrap();
        let out = process(&mut encoder, &constant(1, 1.0, samples), 16, samples);
        sample_at(&out, samples - 1)
    };

    let n3d = run(Normalization::N3D);
    let sn3d = run(Normalization::SN3D);
    for acn in 0..16 {
        let l = (acn as f32).sqrt().floor();
        if sn3d[acn].abs() > 1e-3 {
            assert_abs_diff_eq!(n3d[acn] / sn3d[acn], (2.0 * l + 1.0).sqrt(), epsilon = 1e-4);
        }
    }
}

// ============================================================================
// CONFIGURATION AND CONTROL
// ============================================================================

#[test]
fn test_encoder_from_config() {
    let config = EncoderConfig::from_json(
        r#"{ "order": 2, "normalization": "N3D", "post_scaling": false,
             "sources": [ { "azimuth": 90.0, "elevation": 0.0, "gain": 0.5 } ] }"#,
    )
    .unwrap();
    let mut encoder = AmbiEncoder::with_config(SAMPLE_RATE, &config).unwrap();

    let samples = 3 * FRAME_SIZE;
    let out = process(&mut encoder, &constant(1, 1.0, samples), 9, samples);

    // N3D Y at the left is sqrt(3)
    assert_abs_diff_eq!(out[0][samples - 1], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(out[1][samples - 1], 0.5 * 3.0f32.sqrt(), epsilon = 1e-5);
    assert_eq!(encoder.control().config().order, AmbisonicOrder::Second);
}

#[test]
fn test_independent_encoders() {
    let mut a = AmbiEncoder::new(SAMPLE_RATE).unwrap();
    let mut b = AmbiEncoder::new(SAMPLE_RATE).unwrap();
    a.control().set_order(AmbisonicOrder::Fifth).unwrap();

    process(&mut a, &[], 0, FRAME_SIZE);
    process(&mut b, &[], 0, FRAME_SIZE);
    assert_eq!(a.num_sh_channels(), 36);
    assert_eq!(b.num_sh_channels(), 4);
}

#[test]
fn test_control_from_another_thread() {
    let mut encoder = AmbiEncoder::new(SAMPLE_RATE).unwrap();
    let control = encoder.control();
    let inputs = constant(4, 0.25, 37);

    std::thread::scope(|scope| {
        let writer = control.clone();
        let handle = scope.spawn(move || {
            for i in 0..200 {
                writer.set_source_direction(0, (i * 7) as f32, (i % 90) as f32).unwrap();
                writer.set_num_sources(1 + i % 4).unwrap();
            }
        });

        for _ in 0..400 {
            let out = process(&mut encoder, &inputs, 4, 37);
            assert!(out.iter().flatten().all(|s| s.is_finite()));
        }
        handle.join().unwrap();
    });

    process(&mut encoder, &constant(4, 0.25, 2 * FRAME_SIZE), 4, 2 * FRAME_SIZE);
    let applied = encoder.applied_params();
    assert_eq!(applied.num_sources, control.num_sources());
    assert_eq!(applied.sources[0].direction, control.source_direction(0).unwrap());
    assert!(encoder.matrices().is_settled());
}
