use std::sync::Arc;

use landmass_geom::Vec2;

use crate::falloff::FalloffField;
use crate::noise::NoiseField;
use crate::settings::HeightMapSettings;

/// Row-major grid of terrain heights (`index = y * width + x`) with its extremes.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
    pub min: f32,
    pub max: f32,
}

impl HeightMap {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }
}

/// Pure form: everything derived from `settings` is rebuilt per call.
pub fn generate_height_map(
    width: usize,
    height: usize,
    settings: &HeightMapSettings,
    sample_center: Vec2,
) -> HeightMap {
    let falloff = settings
        .use_falloff
        .then(|| FalloffField::generate(width.max(height)));
    build(width, height, settings, falloff.as_ref(), sample_center)
}

/// Holds a settings snapshot and the falloff mask for its chunk size, so worker
/// threads can share one generator behind an `Arc`.
#[derive(Clone, Debug)]
pub struct HeightMapGenerator {
    settings: Arc<HeightMapSettings>,
    falloff: Option<Arc<FalloffField>>,
}

impl HeightMapGenerator {
    pub fn new(settings: Arc<HeightMapSettings>, size: usize) -> Self {
        let falloff = settings
            .use_falloff
            .then(|| Arc::new(FalloffField::generate(size)));
        Self { settings, falloff }
    }

    pub fn generate(&self, width: usize, height: usize, sample_center: Vec2) -> HeightMap {
        let falloff = match &self.falloff {
            Some(f) if f.size() == width && f.size() == height => Some(Arc::clone(f)),
            Some(_) => Some(Arc::new(FalloffField::generate(width.max(height)))),
            None => None,
        };
        build(width, height, &self.settings, falloff.as_deref(), sample_center)
    }
}

fn build(
    width: usize,
    height: usize,
    settings: &HeightMapSettings,
    falloff: Option<&FalloffField>,
    sample_center: Vec2,
) -> HeightMap {
    let mut values = NoiseField::new(&settings.noise).generate(width, height, sample_center);
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let mut v = values[i];
            if let Some(f) = falloff {
                v = (v - f.get(x, y)).clamp(0.0, 1.0);
            }
            v *= settings.height_curve.evaluate(v) * settings.height_multiplier;
            min = min.min(v);
            max = max.max(v);
            values[i] = v;
        }
    }
    if values.is_empty() {
        min = 0.0;
        max = 0.0;
    }
    HeightMap {
        width,
        height,
        values,
        min,
        max,
    }
}
