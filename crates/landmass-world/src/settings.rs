use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::curve::HeightCurve;
use crate::error::ConfigError;

pub const NUM_SUPPORTED_LODS: usize = 5;
pub const NUM_SUPPORTED_CHUNK_SIZES: usize = 9;
pub const NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES: usize = 3;
pub const SUPPORTED_CHUNK_SIZES: [usize; NUM_SUPPORTED_CHUNK_SIZES] =
    [48, 72, 96, 120, 144, 168, 192, 216, 240];

/// Whole terrain description: sampling, meshing, LOD table and streaming knobs.
#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    #[serde(default)]
    pub height_map: HeightMapSettings,
    #[serde(default)]
    pub mesh: MeshSettings,
    #[serde(default = "default_lods")]
    pub lods: Vec<LodInfo>,
    #[serde(default)]
    pub streaming: StreamingSettings,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            height_map: HeightMapSettings::default(),
            mesh: MeshSettings::default(),
            lods: default_lods(),
            streaming: StreamingSettings::default(),
        }
    }
}

fn default_lods() -> Vec<LodInfo> {
    vec![
        LodInfo::new(0, 200.0),
        LodInfo::new(1, 400.0),
        LodInfo::new(4, 600.0),
    ]
}

impl TerrainConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: TerrainConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Farthest distance at which any chunk is shown.
    pub fn max_view_distance(&self) -> f32 {
        self.lods.last().map(|l| l.visible_distance).unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.height_map.validate()?;
        self.mesh.validate()?;

        if self.lods.is_empty() {
            return Err(ConfigError::invalid("lods", "at least one detail level is required"));
        }
        let mut prev: Option<f32> = None;
        for info in &self.lods {
            if info.lod >= NUM_SUPPORTED_LODS {
                return Err(ConfigError::invalid(
                    "lods.lod",
                    format!("{} is not below {}", info.lod, NUM_SUPPORTED_LODS),
                ));
            }
            if !(info.visible_distance >= 0.0) {
                return Err(ConfigError::invalid(
                    "lods.visible_distance",
                    format!("{} is negative", info.visible_distance),
                ));
            }
            if let Some(p) = prev
                && info.visible_distance <= p
            {
                return Err(ConfigError::invalid(
                    "lods.visible_distance",
                    format!(
                        "thresholds must increase strictly ({} after {})",
                        info.visible_distance, p
                    ),
                ));
            }
            prev = Some(info.visible_distance);
        }

        let s = &self.streaming;
        if s.collider_lod_index >= self.lods.len() {
            return Err(ConfigError::invalid(
                "streaming.collider_lod_index",
                format!(
                    "{} is outside the {}-entry LOD table",
                    s.collider_lod_index,
                    self.lods.len()
                ),
            ));
        }
        for (field, v) in [
            ("streaming.viewer_move_threshold", s.viewer_move_threshold),
            ("streaming.collider_move_epsilon", s.collider_move_epsilon),
            ("streaming.collider_generation_distance", s.collider_generation_distance),
        ] {
            if !(v >= 0.0) {
                return Err(ConfigError::invalid(field, format!("{v} is negative")));
            }
        }
        if s.max_in_flight == Some(0) {
            return Err(ConfigError::invalid(
                "streaming.max_in_flight",
                "zero would reject every request",
            ));
        }
        Ok(())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<TerrainConfig, ConfigError> {
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    TerrainConfig::from_toml_str(&s)
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Rescale by the min/max observed in this map. Chunks will not line up.
    Local,
    /// Rescale by the theoretical octave maximum. Identical across chunks.
    Global,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NoiseSettings {
    #[serde(default = "default_normalize_mode")]
    pub normalize_mode: NormalizeMode,
    #[serde(default = "default_noise_scale")]
    pub scale: f32,
    #[serde(default = "default_octaves")]
    pub octaves: u32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
    #[serde(default)]
    pub seed: i32,
    #[serde(default)]
    pub offset: [f32; 2],
}
fn default_normalize_mode() -> NormalizeMode {
    NormalizeMode::Global
}
fn default_noise_scale() -> f32 {
    50.0
}
fn default_octaves() -> u32 {
    6
}
fn default_persistence() -> f32 {
    0.6
}
fn default_lacunarity() -> f32 {
    2.0
}
impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            normalize_mode: default_normalize_mode(),
            scale: default_noise_scale(),
            octaves: default_octaves(),
            persistence: default_persistence(),
            lacunarity: default_lacunarity(),
            seed: 0,
            offset: [0.0, 0.0],
        }
    }
}

impl NoiseSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale > 0.0) {
            return Err(ConfigError::invalid(
                "noise.scale",
                format!("{} is not positive", self.scale),
            ));
        }
        if self.octaves == 0 {
            return Err(ConfigError::invalid("noise.octaves", "at least one octave is required"));
        }
        if !(self.lacunarity >= 1.0) {
            return Err(ConfigError::invalid(
                "noise.lacunarity",
                format!("{} is below 1", self.lacunarity),
            ));
        }
        if !(0.0..=1.0).contains(&self.persistence) {
            return Err(ConfigError::invalid(
                "noise.persistence",
                format!("{} is outside [0, 1]", self.persistence),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct HeightMapSettings {
    #[serde(default)]
    pub noise: NoiseSettings,
    #[serde(default)]
    pub use_falloff: bool,
    #[serde(default = "default_height_multiplier")]
    pub height_multiplier: f32,
    #[serde(default)]
    pub height_curve: HeightCurve,
}
fn default_height_multiplier() -> f32 {
    30.0
}
impl Default for HeightMapSettings {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            use_falloff: false,
            height_multiplier: default_height_multiplier(),
            height_curve: HeightCurve::default(),
        }
    }
}

impl HeightMapSettings {
    pub fn min_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(0.0)
    }

    pub fn max_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(1.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.noise.validate()?;
        self.height_curve.validate()?;
        if !self.height_multiplier.is_finite() {
            return Err(ConfigError::invalid("height_multiplier", "must be finite"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeshSettings {
    #[serde(default = "default_mesh_scale")]
    pub mesh_scale: f32,
    #[serde(default)]
    pub use_flat_shading: bool,
    #[serde(default = "default_chunk_size_index")]
    pub chunk_size_index: usize,
    #[serde(default = "default_flatshaded_chunk_size_index")]
    pub flatshaded_chunk_size_index: usize,
}
fn default_mesh_scale() -> f32 {
    2.5
}
fn default_chunk_size_index() -> usize {
    8
}
fn default_flatshaded_chunk_size_index() -> usize {
    2
}
impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            mesh_scale: default_mesh_scale(),
            use_flat_shading: false,
            chunk_size_index: default_chunk_size_index(),
            flatshaded_chunk_size_index: default_flatshaded_chunk_size_index(),
        }
    }
}

impl MeshSettings {
    /// Samples per side of a LOD 0 height map, including the two border rings
    /// used only for normals and seam stitching.
    ///
    /// # Panics
    ///
    /// If the active size index is out of range. [`MeshSettings::validate`]
    /// rules that out.
    pub fn num_verts_per_line(&self) -> usize {
        let size = if self.use_flat_shading {
            let flat = &SUPPORTED_CHUNK_SIZES[..NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES];
            flat[self.flatshaded_chunk_size_index]
        } else {
            SUPPORTED_CHUNK_SIZES[self.chunk_size_index]
        };
        size + 5
    }

    /// Side length of one chunk in world units.
    pub fn mesh_world_size(&self) -> f32 {
        (self.num_verts_per_line() - 3) as f32 * self.mesh_scale
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.mesh_scale > 0.0) {
            return Err(ConfigError::invalid(
                "mesh.mesh_scale",
                format!("{} is not positive", self.mesh_scale),
            ));
        }
        if self.chunk_size_index >= NUM_SUPPORTED_CHUNK_SIZES {
            return Err(ConfigError::invalid(
                "mesh.chunk_size_index",
                format!("{} is not below {}", self.chunk_size_index, NUM_SUPPORTED_CHUNK_SIZES),
            ));
        }
        if self.flatshaded_chunk_size_index >= NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES {
            return Err(ConfigError::invalid(
                "mesh.flatshaded_chunk_size_index",
                format!(
                    "{} is not below {}",
                    self.flatshaded_chunk_size_index, NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct LodInfo {
    pub lod: usize,
    pub visible_distance: f32,
}

impl LodInfo {
    pub const fn new(lod: usize, visible_distance: f32) -> Self {
        Self {
            lod,
            visible_distance,
        }
    }

    #[inline]
    pub fn sqr_visible_distance(&self) -> f32 {
        self.visible_distance * self.visible_distance
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreamingSettings {
    /// Index into the LOD table whose mesh doubles as the physics collider.
    #[serde(default)]
    pub collider_lod_index: usize,
    #[serde(default = "default_viewer_move_threshold")]
    pub viewer_move_threshold: f32,
    #[serde(default = "default_collider_move_epsilon")]
    pub collider_move_epsilon: f32,
    #[serde(default = "default_collider_generation_distance")]
    pub collider_generation_distance: f32,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: Option<usize>,
    #[serde(default)]
    pub eviction: EvictionSettings,
}
fn default_viewer_move_threshold() -> f32 {
    25.0
}
fn default_collider_move_epsilon() -> f32 {
    0.01
}
fn default_collider_generation_distance() -> f32 {
    5.0
}
fn default_max_in_flight() -> Option<usize> {
    Some(512)
}
impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            collider_lod_index: 0,
            viewer_move_threshold: default_viewer_move_threshold(),
            collider_move_epsilon: default_collider_move_epsilon(),
            collider_generation_distance: default_collider_generation_distance(),
            max_in_flight: default_max_in_flight(),
            eviction: EvictionSettings::default(),
        }
    }
}

impl StreamingSettings {
    #[inline]
    pub fn sqr_viewer_move_threshold(&self) -> f32 {
        self.viewer_move_threshold * self.viewer_move_threshold
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EvictionSettings {
    /// Window updates a chunk may stay hidden before it is dropped. `None` keeps chunks forever.
    #[serde(default)]
    pub max_idle_updates: Option<u64>,
}
