use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::codec::CURRENT_FORMAT_VERSION;

use super::entities::EntityRegistries;
use super::grid::TileGrid;
use super::position::TilePos;
use super::tile::{is_container_block, is_sign_block, BlockId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("invalid world dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("coordinate ({x}, {y}) is outside the world")]
    OutOfBounds { x: i64, y: i64 },
}

/// Scalar metadata stored in the header section.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldHeader {
    pub name: String,
    pub world_id: i32,
    pub spawn: TilePos,
    pub ground_level: f64,
    pub rock_level: f64,
    pub time: f64,
    pub is_day: bool,
    pub blood_moon: bool,
    pub hard_mode: bool,
    /// Header flag bits 3..=7, carried through unchanged.
    pub reserved_flags: u8,
    /// Opaque progression bitset (bosses defeated, events seen).
    pub event_flags: u32,
}

impl WorldHeader {
    fn for_new_world(name: String, width: u32, height: u32) -> Self {
        Self {
            name,
            world_id: 0,
            spawn: TilePos::new((width / 2) as i32, 0),
            ground_level: f64::from(height) * 0.3,
            rock_level: f64::from(height) * 0.5,
            time: 13_500.0,
            is_day: true,
            blood_moon: false,
            hard_mode: false,
            reserved_flags: 0,
            event_flags: 0,
        }
    }
}

/// Root aggregate: one grid, all entity registries and header scalars.
///
/// `version` is the format version the world was read from (or the current
/// version for a new world); saving may target any supported version.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    version: u32,
    header: WorldHeader,
    tiles: TileGrid,
    entities: EntityRegistries,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("spawn point ({}, {}) is outside the world", .0.x, .0.y)]
    SpawnOutOfBounds(TilePos),
    #[error("chest at ({}, {}) is outside the world", .0.x, .0.y)]
    ChestOutOfBounds(TilePos),
    #[error("chest at ({}, {}) sits on block {block:?}, not a container", .position.x, .position.y)]
    ChestNotOnContainer {
        position: TilePos,
        block: Option<BlockId>,
    },
    #[error("more than one chest anchored at ({}, {})", .0.x, .0.y)]
    DuplicateChest(TilePos),
    #[error("sign at ({}, {}) is outside the world", .0.x, .0.y)]
    SignOutOfBounds(TilePos),
    #[error("sign at ({}, {}) sits on block {block:?}, not a sign", .position.x, .position.y)]
    SignNotOnSignBlock {
        position: TilePos,
        block: Option<BlockId>,
    },
    #[error("more than one sign anchored at ({}, {})", .0.x, .0.y)]
    DuplicateSign(TilePos),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSummary {
    pub name: String,
    pub format_version: u32,
    pub world_id: i32,
    pub width: u32,
    pub height: u32,
    pub spawn_x: i32,
    pub spawn_y: i32,
    pub block_tiles: usize,
    pub wall_tiles: usize,
    pub liquid_tiles: usize,
    pub wired_tiles: usize,
    pub chest_count: usize,
    pub sign_count: usize,
    pub npc_count: usize,
    pub homeless_npc_count: usize,
}

impl World {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Result<Self, WorldError> {
        let tiles = TileGrid::new(width, height)?;
        Ok(Self {
            version: CURRENT_FORMAT_VERSION,
            header: WorldHeader::for_new_world(name.into(), width, height),
            tiles,
            entities: EntityRegistries::default(),
        })
    }

    pub(crate) fn from_parts(
        version: u32,
        header: WorldHeader,
        tiles: TileGrid,
        entities: EntityRegistries,
    ) -> Self {
        Self {
            version,
            header,
            tiles,
            entities,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn width(&self) -> u32 {
        self.tiles.width()
    }

    pub fn height(&self) -> u32 {
        self.tiles.height()
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn spawn(&self) -> TilePos {
        self.header.spawn
    }

    pub fn header(&self) -> &WorldHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut WorldHeader {
        &mut self.header
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileGrid {
        &mut self.tiles
    }

    pub fn entities(&self) -> &EntityRegistries {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityRegistries {
        &mut self.entities
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.header.name = name.into();
    }

    pub fn set_spawn(&mut self, spawn: TilePos) -> Result<(), WorldError> {
        if !self.tiles.contains(spawn.x, spawn.y) {
            return Err(WorldError::OutOfBounds {
                x: i64::from(spawn.x),
                y: i64::from(spawn.y),
            });
        }
        self.header.spawn = spawn;
        Ok(())
    }

    pub fn set_event_flags(&mut self, event_flags: u32) {
        self.header.event_flags = event_flags;
    }

    fn block_at(&self, position: TilePos) -> Option<BlockId> {
        if !self.tiles.contains(position.x, position.y) {
            return None;
        }
        self.tiles
            .get(position.x as u32, position.y as u32)
            .and_then(|tile| tile.block)
    }

    /// Editor-side consistency checks the codec does not enforce on load.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if !self.tiles.contains(self.header.spawn.x, self.header.spawn.y) {
            issues.push(ValidationIssue::SpawnOutOfBounds(self.header.spawn));
        }

        let mut seen = HashSet::new();
        for chest in &self.entities.chests {
            let position = chest.position;
            if !seen.insert(position) {
                issues.push(ValidationIssue::DuplicateChest(position));
            }
            if !self.tiles.contains(position.x, position.y) {
                issues.push(ValidationIssue::ChestOutOfBounds(position));
                continue;
            }
            let block = self.block_at(position);
            if !block.is_some_and(is_container_block) {
                issues.push(ValidationIssue::ChestNotOnContainer { position, block });
            }
        }

        seen.clear();
        for sign in &self.entities.signs {
            let position = sign.position;
            if !seen.insert(position) {
                issues.push(ValidationIssue::DuplicateSign(position));
            }
            if !self.tiles.contains(position.x, position.y) {
                issues.push(ValidationIssue::SignOutOfBounds(position));
                continue;
            }
            let block = self.block_at(position);
            if !block.is_some_and(is_sign_block) {
                issues.push(ValidationIssue::SignNotOnSignBlock { position, block });
            }
        }
        issues
    }

    pub fn summary(&self) -> WorldSummary {
        let tiles = self.tiles.tiles();
        WorldSummary {
            name: self.header.name.clone(),
            format_version: self.version,
            world_id: self.header.world_id,
            width: self.width(),
            height: self.height(),
            spawn_x: self.header.spawn.x,
            spawn_y: self.header.spawn.y,
            block_tiles: tiles.iter().filter(|t| t.block.is_some()).count(),
            wall_tiles: tiles.iter().filter(|t| t.wall.is_some()).count(),
            liquid_tiles: tiles.iter().filter(|t| t.has_liquid()).count(),
            wired_tiles: tiles.iter().filter(|t| t.wiring.any()).count(),
            chest_count: self.entities.chests.len(),
            sign_count: self.entities.signs.len(),
            npc_count: self.entities.npcs.len(),
            homeless_npc_count: self.entities.npcs.iter().filter(|n| n.homeless).count(),
        }
    }
}
