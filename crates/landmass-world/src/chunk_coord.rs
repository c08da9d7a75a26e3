use landmass_geom::Vec2;
use serde::{Deserialize, Serialize};

/// Grid address of one terrain tile. Grid `(cx, cz)` spans world `(x, z)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    /// Chunk whose centre is nearest to `pos`.
    #[inline]
    pub fn containing(pos: Vec2, chunk_world_size: f32) -> Self {
        Self {
            cx: (pos.x / chunk_world_size).round() as i32,
            cz: (pos.y / chunk_world_size).round() as i32,
        }
    }

    /// World-space centre of the chunk on the xz plane.
    #[inline]
    pub fn world_center(self, chunk_world_size: f32) -> Vec2 {
        Vec2::new(
            self.cx as f32 * chunk_world_size,
            self.cz as f32 * chunk_world_size,
        )
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}
