//! Format version table.
//!
//! Every version-dependent decision goes through [`FormatFeatures`] (field
//! level) or [`SECTION_TABLE`] (section level). Load and save walk the same
//! table in the same order, so a section written under version `v` is read
//! back by the same routine under `v`.

use crate::io::{ByteReader, ByteWriter};
use crate::model::World;

use super::error::{SectionKind, WorldCodecError};
use super::progress::ProgressTracker;
use super::sections::{self, WorldDraft};
use super::tiles;

pub const MIN_FORMAT_VERSION: u32 = 1;
pub const CURRENT_FORMAT_VERSION: u32 = 5;

pub const LEGACY_CHEST_CAPACITY: usize = 20;
pub const CHEST_CAPACITY: usize = 40;
pub const LEGACY_SIGN_TEXT_LIMIT: usize = 255;
pub const SIGN_TEXT_LIMIT: usize = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatFeatures {
    pub version: u32,
    /// Header carries the `u32` event flag set.
    pub event_flags: bool,
    /// Tile records may be followed by a repeat count.
    pub tile_rle: bool,
    /// Red wire, actuators and the actuated (inactive) state.
    pub wiring: bool,
    pub paint: bool,
    pub honey: bool,
    pub checksum_footer: bool,
    pub block_shapes: bool,
    /// Blue and green wire.
    pub extra_wires: bool,
    /// Block ids are `u16` instead of `u8`.
    pub wide_block_ids: bool,
    pub chest_names: bool,
    pub chest_capacity: usize,
    pub sign_text_limit: usize,
}

impl FormatFeatures {
    pub fn for_version(version: u32) -> Result<Self, WorldCodecError> {
        if !(MIN_FORMAT_VERSION..=CURRENT_FORMAT_VERSION).contains(&version) {
            return Err(WorldCodecError::UnsupportedVersion {
                version,
                min: MIN_FORMAT_VERSION,
                max: CURRENT_FORMAT_VERSION,
            });
        }
        Ok(Self::build(version))
    }

    pub fn latest() -> Self {
        Self::build(CURRENT_FORMAT_VERSION)
    }

    fn build(version: u32) -> Self {
        Self {
            version,
            event_flags: version >= 2,
            tile_rle: version >= 2,
            wiring: version >= 2,
            paint: version >= 3,
            honey: version >= 3,
            checksum_footer: version >= 3,
            block_shapes: version >= 4,
            extra_wires: version >= 4,
            wide_block_ids: version >= 4,
            chest_names: version >= 4,
            chest_capacity: if version >= 5 {
                CHEST_CAPACITY
            } else {
                LEGACY_CHEST_CAPACITY
            },
            sign_text_limit: if version >= 5 {
                SIGN_TEXT_LIMIT
            } else {
                LEGACY_SIGN_TEXT_LIMIT
            },
        }
    }

    pub fn all() -> Vec<Self> {
        (MIN_FORMAT_VERSION..=CURRENT_FORMAT_VERSION)
            .map(Self::build)
            .collect()
    }

    /// Oldest version satisfying `predicate`, used to explain downgrade failures.
    pub fn first_version_with(predicate: impl Fn(&FormatFeatures) -> bool) -> Option<u32> {
        Self::all()
            .into_iter()
            .find(|features| predicate(features))
            .map(|features| features.version)
    }

    /// Tile flag bits this version assigns a meaning to.
    pub fn known_tile_flags(&self) -> u16 {
        let mut mask = tiles::ACTIVE | tiles::WALL | tiles::LIQUID;
        if self.wiring {
            mask |= tiles::WIRE_RED | tiles::ACTUATOR | tiles::INACTIVE;
        }
        if self.paint {
            mask |= tiles::BLOCK_PAINT | tiles::WALL_PAINT;
        }
        if self.block_shapes {
            mask |= tiles::SHAPE_MASK;
        }
        if self.extra_wires {
            mask |= tiles::WIRE_BLUE | tiles::WIRE_GREEN;
        }
        if self.tile_rle {
            mask |= tiles::RLE_MASK;
        }
        mask
    }
}

pub(crate) type DecodeFn = fn(
    &mut ByteReader<'_>,
    &FormatFeatures,
    &mut WorldDraft,
    &ProgressTracker<'_>,
) -> Result<(), WorldCodecError>;

pub(crate) type EncodeFn = fn(
    &World,
    &FormatFeatures,
    &mut ByteWriter,
    &ProgressTracker<'_>,
) -> Result<(), WorldCodecError>;

/// One length-framed section of the file body.
pub struct SectionDescriptor {
    kind: SectionKind,
    since: u32,
    pub(crate) decode: DecodeFn,
    pub(crate) encode: EncodeFn,
    /// Whether the world holds data only this section can carry.
    pub(crate) has_data: fn(&World) -> bool,
}

impl SectionDescriptor {
    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    pub fn since(&self) -> u32 {
        self.since
    }

    pub fn is_active(&self, version: u32) -> bool {
        version >= self.since
    }

    pub fn has_data(&self, world: &World) -> bool {
        (self.has_data)(world)
    }
}

fn always(_world: &World) -> bool {
    true
}

fn has_npc_names(world: &World) -> bool {
    !world.entities().npc_names.is_empty()
}

pub static SECTION_TABLE: &[SectionDescriptor] = &[
    SectionDescriptor {
        kind: SectionKind::Header,
        since: 1,
        decode: sections::decode_header,
        encode: sections::encode_header,
        has_data: always,
    },
    SectionDescriptor {
        kind: SectionKind::Tiles,
        since: 1,
        decode: tiles::decode_tile_section,
        encode: tiles::encode_tile_section,
        has_data: always,
    },
    SectionDescriptor {
        kind: SectionKind::Chests,
        since: 1,
        decode: sections::decode_chests,
        encode: sections::encode_chests,
        has_data: always,
    },
    SectionDescriptor {
        kind: SectionKind::Signs,
        since: 1,
        decode: sections::decode_signs,
        encode: sections::encode_signs,
        has_data: always,
    },
    SectionDescriptor {
        kind: SectionKind::Npcs,
        since: 1,
        decode: sections::decode_npcs,
        encode: sections::encode_npcs,
        has_data: always,
    },
    SectionDescriptor {
        kind: SectionKind::NpcNames,
        since: 4,
        decode: sections::decode_npc_names,
        encode: sections::encode_npc_names,
        has_data: has_npc_names,
    },
];

/// Sections present in files of `version`, in file order.
pub fn sections_for(version: u32) -> impl Iterator<Item = &'static SectionDescriptor> {
    SECTION_TABLE
        .iter()
        .filter(move |section| section.is_active(version))
}
