pub mod entities;
pub mod grid;
pub mod position;
pub mod tile;
pub mod world;

pub use entities::{Chest, EntityRegistries, ItemSlot, Npc, NpcName, Sign};
pub use grid::{TileGrid, MAX_TILE_COUNT, MAX_WORLD_DIMENSION};
pub use position::{TilePos, Vec2};
pub use tile::{
    is_container_block, is_frame_important, is_sign_block, BlockId, BlockShape, LiquidKind,
    Tile, TileFrame, WallId, Wiring,
};
pub use world::{ValidationIssue, World, WorldError, WorldHeader, WorldSummary};
