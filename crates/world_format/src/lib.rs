//! Reader and writer for `TWLD` tile-world save files, plus the in-memory
//! world model they decode into.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use world_format::{WorldCodec, CURRENT_FORMAT_VERSION};
//!
//! # fn main() -> Result<(), world_format::WorldCodecError> {
//! let codec = WorldCodec::default();
//! let loaded = codec.load_from_path(Path::new("world.wld"))?;
//! codec.save_to_path(&loaded.world, CURRENT_FORMAT_VERSION, Path::new("world.v5.wld"))?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod io;
pub mod model;

pub use io::backup_path_for;

pub use codec::{
    load, save, sections_for, ChecksumPolicy, CodecConfig, FormatFeatures, LoadWarning,
    LoadedWorld, NoProgress, ProgressSink, SectionDescriptor, SectionKind, WorldCodec,
    WorldCodecError, CHEST_CAPACITY, CURRENT_FORMAT_VERSION, LEGACY_CHEST_CAPACITY,
    LEGACY_SIGN_TEXT_LIMIT, MIN_FORMAT_VERSION, SECTION_TABLE, SIGNATURE, SIGN_TEXT_LIMIT,
};
pub use model::{
    BlockId, BlockShape, Chest, EntityRegistries, ItemSlot, LiquidKind, Npc, NpcName, Sign, Tile,
    TileFrame, TileGrid, TilePos, ValidationIssue, Vec2, WallId, Wiring, World, WorldError,
    WorldHeader, WorldSummary,
};
