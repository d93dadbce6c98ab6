//! Source configuration presets
//!
//! Static direction sets for common loudspeaker-style and uniform layouts.
//! A loaded preset always fills every slot: slots past the preset's source
//! count get uniformly distributed default directions, so that raising the
//! source count later does not stack new sources in one direction.

use serde::{Deserialize, Serialize};

use crate::direction::SourceDirection;
use crate::MAX_NUM_INPUTS;

const STEREO: [SourceDirection; 2] = [SourceDirection::new(30.0, 0.0), SourceDirection::new(-30.0, 0.0)];

const SURROUND_5X: [SourceDirection; 5] = [
    SourceDirection::new(30.0, 0.0),
    SourceDirection::new(-30.0, 0.0),
    SourceDirection::new(0.0, 0.0),
    SourceDirection::new(110.0, 0.0),
    SourceDirection::new(-110.0, 0.0),
];

const SURROUND_7X: [SourceDirection; 7] = [
    SourceDirection::new(30.0, 0.0),
    SourceDirection::new(-30.0, 0.0),
    SourceDirection::new(0.0, 0.0),
    SourceDirection::new(90.0, 0.0),
    SourceDirection::new(-90.0, 0.0),
    SourceDirection::new(135.0, 0.0),
    SourceDirection::new(-135.0, 0.0),
];

const SURROUND_7X4: [SourceDirection; 11] = [
    SourceDirection::new(30.0, 0.0),
    SourceDirection::new(-30.0, 0.0),
    SourceDirection::new(0.0, 0.0),
    SourceDirection::new(90.0, 0.0),
    SourceDirection::new(-90.0, 0.0),
    SourceDirection::new(135.0, 0.0),
    SourceDirection::new(-135.0, 0.0),
    SourceDirection::new(45.0, 45.0),
    SourceDirection::new(-45.0, 45.0),
    SourceDirection::new(135.0, 45.0),
    SourceDirection::new(-135.0, 45.0),
];

/// Named source configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourcePreset {
    /// Single source straight ahead
    #[default]
    Default,
    /// Single source straight ahead
    Mono,
    /// L, R at +-30 degrees
    Stereo,
    /// L, R, C, Ls, Rs
    Surround5x,
    /// L, R, C, Lss, Rss, Lsr, Rsr
    Surround7x,
    /// 7.x bed plus four height sources
    Surround7x4,
    /// 4 sources, regular tetrahedron
    Tetrahedron,
    /// 6 sources, regular octahedron
    Octahedron,
    /// 8 sources, cube corners
    Cube,
    /// 12 sources, regular icosahedron
    Icosahedron,
    /// `MAX_NUM_INPUTS` sources, Fibonacci sphere
    Uniform,
}

/// Directions and source count produced by a preset
#[derive(Debug, Clone, Copy)]
pub struct PresetDirections {
    /// Number of sources the preset defines
    pub num_sources: usize,
    /// Every slot filled; slots `>= num_sources` hold padding
    pub directions: [SourceDirection; MAX_NUM_INPUTS],
}

impl SourcePreset {
    /// All presets
    pub const ALL: [SourcePreset; 11] = [
        SourcePreset::Default,
        SourcePreset::Mono,
        SourcePreset::Stereo,
        SourcePreset::Surround5x,
        SourcePreset::Surround7x,
        SourcePreset::Surround7x4,
        SourcePreset::Tetrahedron,
        SourcePreset::Octahedron,
        SourcePreset::Cube,
        SourcePreset::Icosahedron,
        SourcePreset::Uniform,
    ];

    /// Resolve to directions
    pub fn load(&self) -> PresetDirections {
        let mut directions = uniform_directions();
        let num_sources = match self {
            SourcePreset::Default | SourcePreset::Mono => {
                directions[0] = SourceDirection::front();
                1
            }
            SourcePreset::Stereo => copy_into(&mut directions, &STEREO),
            SourcePreset::Surround5x => copy_into(&mut directions, &SURROUND_5X),
            SourcePreset::Surround7x => copy_into(&mut directions, &SURROUND_7X),
            SourcePreset::Surround7x4 => copy_into(&mut directions, &SURROUND_7X4),
            SourcePreset::Tetrahedron => {
                let s = 1.0;
                let points = [[s, s, s], [s, -s, -s], [-s, s, -s], [-s, -s, s]];
                copy_vectors(&mut directions, &points)
            }
            SourcePreset::Octahedron => {
                let points = [
                    [1.0, 0.0, 0.0],
                    [-1.0, 0.0, 0.0],
                    [0.0, 1.0, 0.0],
                    [0.0, -1.0, 0.0],
                    [0.0, 0.0, 1.0],
                    [0.0, 0.0, -1.0],
                ];
                copy_vectors(&mut directions, &points)
            }
            SourcePreset::Cube => {
                let mut points = [[0.0; 3]; 8];
                for (i, p) in points.iter_mut().enumerate() {
                    let sign = |bit: usize| if i & bit == 0 { 1.0 } else { -1.0 };
                    *p = [sign(1), sign(2), sign(4)];
                }
                copy_vectors(&mut directions, &points)
            }
            SourcePreset::Icosahedron => {
                let phi = (1.0 + 5.0f64.sqrt()) / 2.0;
                let mut points = [[0.0; 3]; 12];
                let mut i = 0;
                for a in [1.0, -1.0] {
                    for b in [phi, -phi] {
                        points[i] = [0.0, a, b];
                        points[i + 1] = [a, b, 0.0];
                        points[i + 2] = [b, 0.0, a];
                        i += 3;
                    }
                }
                copy_vectors(&mut directions, &points)
            }
            SourcePreset::Uniform => MAX_NUM_INPUTS,
        };

        PresetDirections {
            num_sources,
            directions,
        }
    }
}

fn copy_into(directions: &mut [SourceDirection; MAX_NUM_INPUTS], preset: &[SourceDirection]) -> usize {
    directions[..preset.len()].copy_from_slice(preset);
    preset.len()
}

fn copy_vectors(directions: &mut [SourceDirection; MAX_NUM_INPUTS], points: &[[f64; 3]]) -> usize {
    for (slot, [x, y, z]) in directions.iter_mut().zip(points) {
        *slot = SourceDirection::from_unit_vector(*x, *y, *z);
    }
    points.len()
}

/// Fibonacci-sphere directions, one per slot
pub fn uniform_directions() -> [SourceDirection; MAX_NUM_INPUTS] {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0f64.sqrt());
    let n = MAX_NUM_INPUTS as f64;
    let mut directions = [SourceDirection::front(); MAX_NUM_INPUTS];
    for (i, d) in directions.iter_mut().enumerate() {
        let z = 1.0 - (2.0 * i as f64 + 1.0) / n;
        let r = (1.0 - z * z).sqrt();
        let phi = golden_angle * i as f64;
        *d = SourceDirection::from_unit_vector(r * phi.cos(), r * phi.sin(), z);
    }
    directions
}
