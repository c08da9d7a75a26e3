//! Chunk streaming: which terrain tiles exist, at what detail, and with which colliders.
#![forbid(unsafe_code)]

mod chunk;
mod sink;
mod streamer;

pub use chunk::{ChunkPhase, ColliderState, HeightState, LodMesh, MeshSlot, TerrainChunk};
pub use sink::{NullSink, TerrainSink};
pub use streamer::{ChunkStreamer, StreamStats, TickReport};
