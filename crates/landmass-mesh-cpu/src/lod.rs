use landmass_world::{HeightMap, NUM_SUPPORTED_LODS};
use thiserror::Error;

/// Two border rings on each side plus one interior sample.
pub const MIN_VERTS_PER_LINE: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("height map is {width}x{height}, expected a square grid")]
    NotSquare { width: usize, height: usize },
    #[error("height map side {size} is below the minimum of {min}")]
    TooSmall { size: usize, min: usize },
    #[error(
        "height map side {size} leaves {} interior steps, not a multiple of stride {stride}",
        size - MIN_VERTS_PER_LINE
    )]
    StrideMismatch { size: usize, stride: usize },
    #[error("lod {lod} is not below {max}")]
    LodOutOfRange { lod: usize, max: usize },
}

/// Sample step for `lod`: every sample at 0, then every `2 * lod`-th.
#[inline]
pub fn lod_stride(lod: usize) -> Result<usize, MeshError> {
    if lod >= NUM_SUPPORTED_LODS {
        return Err(MeshError::LodOutOfRange {
            lod,
            max: NUM_SUPPORTED_LODS,
        });
    }
    Ok(if lod == 0 { 1 } else { lod * 2 })
}

/// Validates `map` for meshing at `stride`; returns the side length.
pub fn check_height_map(map: &HeightMap, stride: usize) -> Result<usize, MeshError> {
    if map.width != map.height {
        return Err(MeshError::NotSquare {
            width: map.width,
            height: map.height,
        });
    }
    let n = map.width;
    if n < MIN_VERTS_PER_LINE {
        return Err(MeshError::TooSmall {
            size: n,
            min: MIN_VERTS_PER_LINE,
        });
    }
    if (n - MIN_VERTS_PER_LINE) % stride != 0 {
        return Err(MeshError::StrideMismatch { size: n, stride });
    }
    Ok(n)
}
