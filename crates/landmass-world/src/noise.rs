use fastnoise_lite::{FastNoiseLite, NoiseType};
use landmass_geom::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::settings::{NoiseSettings, NormalizeMode};

const OCTAVE_OFFSET_RANGE: i32 = 100_000;
// Global mode assumes the octave sum rarely gets near its theoretical peak.
const GLOBAL_HEADROOM: f32 = 0.9;

/// Seeded multi-octave Perlin sampler over the (x, z) grid.
pub struct NoiseField {
    perlin: FastNoiseLite,
    settings: NoiseSettings,
    octave_offsets: Vec<Vec2>,
    max_possible_height: f32,
}

impl NoiseField {
    pub fn new(settings: &NoiseSettings) -> Self {
        let mut perlin = FastNoiseLite::with_seed(settings.seed);
        perlin.set_noise_type(Some(NoiseType::Perlin));
        perlin.set_frequency(Some(1.0));

        let mut rng = ChaCha8Rng::seed_from_u64(settings.seed as u32 as u64);
        let mut octave_offsets = Vec::with_capacity(settings.octaves as usize);
        let mut max_possible_height = 0.0f32;
        let mut amplitude = 1.0f32;
        for _ in 0..settings.octaves {
            let ox = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32;
            let oy = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32;
            octave_offsets.push(Vec2::new(
                ox + settings.offset[0],
                oy + settings.offset[1],
            ));
            max_possible_height += amplitude;
            amplitude *= settings.persistence;
        }

        Self {
            perlin,
            settings: settings.clone(),
            octave_offsets,
            max_possible_height,
        }
    }

    #[inline]
    pub fn max_possible_height(&self) -> f32 {
        self.max_possible_height
    }

    /// Raw octave sum at grid-space position `(x, y)`; already includes any chunk offset.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let mut amplitude = 1.0f32;
        let mut frequency = 1.0f32;
        let mut h = 0.0f32;
        for o in &self.octave_offsets {
            let sx = (x + o.x) / self.settings.scale * frequency;
            let sy = (y + o.y) / self.settings.scale * frequency;
            h += self.perlin.get_noise_2d(sx, sy) * amplitude;
            amplitude *= self.settings.persistence;
            frequency *= self.settings.lacunarity;
        }
        h
    }

    /// Row-major `width * height` grid centred on `sample_center`, normalized per the
    /// configured mode.
    pub fn generate(&self, width: usize, height: usize, sample_center: Vec2) -> Vec<f32> {
        let half_w = width as f32 / 2.0;
        let half_h = height as f32 / 2.0;
        let mut values = Vec::with_capacity(width * height);
        let mut lo = f32::MAX;
        let mut hi = f32::MIN;
        for y in 0..height {
            for x in 0..width {
                let h = self.sample(
                    x as f32 - half_w + sample_center.x,
                    y as f32 - half_h + sample_center.y,
                );
                lo = lo.min(h);
                hi = hi.max(h);
                values.push(h);
            }
        }

        match self.settings.normalize_mode {
            NormalizeMode::Local => {
                let span = hi - lo;
                for v in &mut values {
                    *v = if span > 0.0 { (*v - lo) / span } else { 0.0 };
                }
            }
            NormalizeMode::Global => {
                let denom = self.max_possible_height / GLOBAL_HEADROOM;
                for v in &mut values {
                    *v = ((*v + 1.0) / denom).clamp(0.0, 1.0);
                }
            }
        }
        values
    }
}
