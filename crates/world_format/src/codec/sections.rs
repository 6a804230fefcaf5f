use crate::io::{ByteReader, ByteWriter};
use crate::model::grid::check_dimensions;
use crate::model::{
    Chest, EntityRegistries, ItemSlot, Npc, NpcName, Sign, TileGrid, TilePos, Vec2, World,
    WorldHeader,
};

use super::error::{InSection, SectionKind, WorldCodecError};
use super::progress::ProgressTracker;
use super::version::FormatFeatures;

const NPC_HOMELESS: u8 = 1 << 0;
const NPC_RESERVED_MASK: u8 = 0x7F;

/// Partially decoded world. Only turned into a [`World`] once every section
/// has been read, so a failed load never exposes it.
#[derive(Debug, Default)]
pub(crate) struct WorldDraft {
    pub header: Option<WorldHeader>,
    pub width: u32,
    pub height: u32,
    pub tiles: Option<TileGrid>,
    pub entities: EntityRegistries,
}

impl WorldDraft {
    pub(crate) fn dimensions(&self, offset: usize) -> Result<(u32, u32), WorldCodecError> {
        if self.header.is_none() {
            return Err(WorldCodecError::invalid_data(
                SectionKind::Header,
                offset,
                "section decoded before the header",
            ));
        }
        Ok((self.width, self.height))
    }

    fn check_anchor(
        &self,
        section: SectionKind,
        offset: usize,
        position: TilePos,
    ) -> Result<(), WorldCodecError> {
        let (width, height) = self.dimensions(offset)?;
        let inside = position.x >= 0
            && position.y >= 0
            && (position.x as u32) < width
            && (position.y as u32) < height;
        if !inside {
            return Err(WorldCodecError::invalid_data(
                section,
                offset,
                format!(
                    "anchor ({}, {}) is outside the {width}x{height} world",
                    position.x, position.y
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn finish(self, version: u32, end_offset: usize) -> Result<World, WorldCodecError> {
        let header = self.header.ok_or_else(|| {
            WorldCodecError::invalid_data(SectionKind::Header, end_offset, "header section missing")
        })?;
        let tiles = self.tiles.ok_or_else(|| {
            WorldCodecError::invalid_data(SectionKind::Tiles, end_offset, "tile section missing")
        })?;
        Ok(World::from_parts(version, header, tiles, self.entities))
    }
}

fn read_count(reader: &mut ByteReader<'_>, section: SectionKind) -> Result<usize, WorldCodecError> {
    Ok(usize::from(reader.read_u16().in_section(section)?))
}

fn write_count(
    writer: &mut ByteWriter,
    section: SectionKind,
    count: usize,
) -> Result<(), WorldCodecError> {
    let count = u16::try_from(count).map_err(|_| WorldCodecError::InvalidWorld {
        message: format!("{count} {section} records do not fit a u16 count"),
    })?;
    writer.write_u16(count);
    Ok(())
}

fn write_string(
    writer: &mut ByteWriter,
    section: SectionKind,
    value: &str,
) -> Result<(), WorldCodecError> {
    writer.write_string(value).map_err(|error| WorldCodecError::from_cursor(section, error))
}

fn read_pos(reader: &mut ByteReader<'_>, section: SectionKind) -> Result<TilePos, WorldCodecError> {
    Ok(TilePos {
        x: reader.read_i32().in_section(section)?,
        y: reader.read_i32().in_section(section)?,
    })
}

fn write_pos(writer: &mut ByteWriter, position: TilePos) {
    writer.write_i32(position.x);
    writer.write_i32(position.y);
}

fn ensure_anchor_inside(
    world: &World,
    section: SectionKind,
    position: TilePos,
) -> Result<(), WorldCodecError> {
    if !world.tiles().contains(position.x, position.y) {
        return Err(WorldCodecError::InvalidWorld {
            message: format!(
                "{section} record at ({}, {}) is outside the {}x{} world",
                position.x,
                position.y,
                world.width(),
                world.height()
            ),
        });
    }
    Ok(())
}

pub(crate) fn decode_header(
    reader: &mut ByteReader<'_>,
    features: &FormatFeatures,
    draft: &mut WorldDraft,
    _progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    const SECTION: SectionKind = SectionKind::Header;
    let name = reader.read_string().in_section(SECTION)?;
    let world_id = reader.read_i32().in_section(SECTION)?;
    let dims_offset = reader.position();
    let width = reader.read_u32().in_section(SECTION)?;
    let height = reader.read_u32().in_section(SECTION)?;
    check_dimensions(width, height).map_err(|error| {
        WorldCodecError::invalid_data(SECTION, dims_offset, error.to_string())
    })?;
    let spawn = read_pos(reader, SECTION)?;
    let ground_level = reader.read_f64().in_section(SECTION)?;
    let rock_level = reader.read_f64().in_section(SECTION)?;
    let time = reader.read_f64().in_section(SECTION)?;
    let flags = reader.read_flag_byte().in_section(SECTION)?;
    let reserved_flags = flags[3..]
        .iter()
        .enumerate()
        .fold(0u8, |acc, (bit, set)| acc | (u8::from(*set) << bit));
    let event_flags = if features.event_flags {
        reader.read_u32().in_section(SECTION)?
    } else {
        0
    };

    draft.width = width;
    draft.height = height;
    draft.header = Some(WorldHeader {
        name,
        world_id,
        spawn,
        ground_level,
        rock_level,
        time,
        is_day: flags[0],
        blood_moon: flags[1],
        hard_mode: flags[2],
        reserved_flags,
        event_flags,
    });
    Ok(())
}

pub(crate) fn encode_header(
    world: &World,
    features: &FormatFeatures,
    writer: &mut ByteWriter,
    _progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    const SECTION: SectionKind = SectionKind::Header;
    let header = world.header();
    if header.event_flags != 0 && !features.event_flags {
        return Err(WorldCodecError::UnsupportedDowngrade {
            target_version: features.version,
            feature: "event flags",
            required_version: FormatFeatures::first_version_with(|f| f.event_flags)
                .unwrap_or(features.version),
            detail: format!("event flags {:#010x} are set", header.event_flags),
        });
    }

    write_string(writer, SECTION, &header.name)?;
    writer.write_i32(header.world_id);
    writer.write_u32(world.width());
    writer.write_u32(world.height());
    write_pos(writer, header.spawn);
    writer.write_f64(header.ground_level);
    writer.write_f64(header.rock_level);
    writer.write_f64(header.time);
    let mut flags = [false; 8];
    flags[0] = header.is_day;
    flags[1] = header.blood_moon;
    flags[2] = header.hard_mode;
    for (bit, flag) in flags[3..].iter_mut().enumerate() {
        *flag = header.reserved_flags & (1 << bit) != 0;
    }
    writer.write_flag_byte(flags);
    if features.event_flags {
        writer.write_u32(header.event_flags);
    }
    Ok(())
}

pub(crate) fn decode_chests(
    reader: &mut ByteReader<'_>,
    features: &FormatFeatures,
    draft: &mut WorldDraft,
    _progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    const SECTION: SectionKind = SectionKind::Chests;
    let count = read_count(reader, SECTION)?;
    let mut chests = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = reader.position();
        let position = read_pos(reader, SECTION)?;
        draft.check_anchor(SECTION, offset, position)?;
        let name = if features.chest_names {
            Some(reader.read_string().in_section(SECTION)?).filter(|name| !name.is_empty())
        } else {
            None
        };
        let mut items = Vec::with_capacity(features.chest_capacity);
        for _ in 0..features.chest_capacity {
            let stack = reader.read_u16().in_section(SECTION)?;
            let slot = if stack > 0 {
                ItemSlot {
                    item_id: reader.read_i32().in_section(SECTION)?,
                    stack,
                    prefix: reader.read_u8().in_section(SECTION)?,
                }
            } else {
                ItemSlot::EMPTY
            };
            items.push(slot);
        }
        chests.push(Chest {
            position,
            name,
            items,
        });
    }
    draft.entities.chests = chests;
    Ok(())
}

pub(crate) fn encode_chests(
    world: &World,
    features: &FormatFeatures,
    writer: &mut ByteWriter,
    _progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    const SECTION: SectionKind = SectionKind::Chests;
    let chests = &world.entities().chests;
    write_count(writer, SECTION, chests.len())?;
    for chest in chests {
        ensure_anchor_inside(world, SECTION, chest.position)?;
        let used = chest.used_capacity();
        if used > features.chest_capacity {
            return Err(WorldCodecError::UnsupportedDowngrade {
                target_version: features.version,
                feature: "larger chests",
                required_version: FormatFeatures::first_version_with(|f| {
                    f.chest_capacity >= used
                })
                .unwrap_or(features.version),
                detail: format!(
                    "chest at ({}, {}) uses {used} slots, version {} holds {}",
                    chest.position.x, chest.position.y, features.version, features.chest_capacity
                ),
            });
        }
        let name = chest.name.as_deref().unwrap_or_default();
        if !name.is_empty() && !features.chest_names {
            return Err(WorldCodecError::UnsupportedDowngrade {
                target_version: features.version,
                feature: "chest names",
                required_version: FormatFeatures::first_version_with(|f| f.chest_names)
                    .unwrap_or(features.version),
                detail: format!(
                    "chest at ({}, {}) is named {name:?}",
                    chest.position.x, chest.position.y
                ),
            });
        }

        write_pos(writer, chest.position);
        if features.chest_names {
            write_string(writer, SECTION, name)?;
        }
        for index in 0..features.chest_capacity {
            let slot = chest.items.get(index).copied().unwrap_or(ItemSlot::EMPTY);
            writer.write_u16(slot.stack);
            if !slot.is_empty() {
                writer.write_i32(slot.item_id);
                writer.write_u8(slot.prefix);
            }
        }
    }
    Ok(())
}

pub(crate) fn decode_signs(
    reader: &mut ByteReader<'_>,
    features: &FormatFeatures,
    draft: &mut WorldDraft,
    _progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    const SECTION: SectionKind = SectionKind::Signs;
    let count = read_count(reader, SECTION)?;
    let mut signs = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = reader.position();
        let position = read_pos(reader, SECTION)?;
        draft.check_anchor(SECTION, offset, position)?;
        let text_offset = reader.position();
        let text = reader.read_string().in_section(SECTION)?;
        if text.len() > features.sign_text_limit {
            return Err(WorldCodecError::invalid_data(
                SECTION,
                text_offset,
                format!(
                    "sign at ({}, {}) holds {} bytes, version {} allows {}",
                    position.x,
                    position.y,
                    text.len(),
                    features.version,
                    features.sign_text_limit
                ),
            ));
        }
        signs.push(Sign { position, text });
    }
    draft.entities.signs = signs;
    Ok(())
}

pub(crate) fn encode_signs(
    world: &World,
    features: &FormatFeatures,
    writer: &mut ByteWriter,
    _progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    const SECTION: SectionKind = SectionKind::Signs;
    let signs = &world.entities().signs;
    write_count(writer, SECTION, signs.len())?;
    for sign in signs {
        ensure_anchor_inside(world, SECTION, sign.position)?;
        let len = sign.text.len();
        if len > features.sign_text_limit {
            let detail = format!(
                "sign at ({}, {}) holds {len} bytes, version {} allows {}",
                sign.position.x, sign.position.y, features.version, features.sign_text_limit
            );
            return Err(
                match FormatFeatures::first_version_with(|f| f.sign_text_limit >= len) {
                    Some(required_version) => WorldCodecError::UnsupportedDowngrade {
                        target_version: features.version,
                        feature: "longer sign text",
                        required_version,
                        detail,
                    },
                    None => WorldCodecError::InvalidWorld { message: detail },
                },
            );
        }
        write_pos(writer, sign.position);
        write_string(writer, SECTION, &sign.text)?;
    }
    Ok(())
}

pub(crate) fn decode_npcs(
    reader: &mut ByteReader<'_>,
    _features: &FormatFeatures,
    draft: &mut WorldDraft,
    _progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    const SECTION: SectionKind = SectionKind::Npcs;
    let count = read_count(reader, SECTION)?;
    let mut npcs = Vec::with_capacity(count);
    for _ in 0..count {
        let name = reader.read_string().in_section(SECTION)?;
        let position = Vec2 {
            x: reader.read_f32().in_section(SECTION)?,
            y: reader.read_f32().in_section(SECTION)?,
        };
        let flags = reader.read_u8().in_section(SECTION)?;
        let home = read_pos(reader, SECTION)?;
        npcs.push(Npc {
            name,
            position,
            home,
            homeless: flags & NPC_HOMELESS != 0,
            reserved_flags: flags >> 1,
        });
    }
    draft.entities.npcs = npcs;
    Ok(())
}

pub(crate) fn encode_npcs(
    world: &World,
    _features: &FormatFeatures,
    writer: &mut ByteWriter,
    _progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    const SECTION: SectionKind = SectionKind::Npcs;
    let npcs = &world.entities().npcs;
    write_count(writer, SECTION, npcs.len())?;
    for npc in npcs {
        write_string(writer, SECTION, &npc.name)?;
        writer.write_f32(npc.position.x);
        writer.write_f32(npc.position.y);
        let flags = u8::from(npc.homeless) | ((npc.reserved_flags & NPC_RESERVED_MASK) << 1);
        writer.write_u8(flags);
        write_pos(writer, npc.home);
    }
    Ok(())
}

pub(crate) fn decode_npc_names(
    reader: &mut ByteReader<'_>,
    _features: &FormatFeatures,
    draft: &mut WorldDraft,
    _progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    const SECTION: SectionKind = SectionKind::NpcNames;
    let count = read_count(reader, SECTION)?;
    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        names.push(NpcName {
            npc_type: reader.read_u16().in_section(SECTION)?,
            name: reader.read_string().in_section(SECTION)?,
        });
    }
    draft.entities.npc_names = names;
    Ok(())
}

pub(crate) fn encode_npc_names(
    world: &World,
    _features: &FormatFeatures,
    writer: &mut ByteWriter,
    _progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    const SECTION: SectionKind = SectionKind::NpcNames;
    let names = &world.entities().npc_names;
    write_count(writer, SECTION, names.len())?;
    for entry in names {
        writer.write_u16(entry.npc_type);
        write_string(writer, SECTION, &entry.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::progress::NoProgress;

    fn features(version: u32) -> FormatFeatures {
        FormatFeatures::for_version(version).expect("version")
    }

    fn draft(width: u32, height: u32) -> WorldDraft {
        let world = World::new("draft", width, height).expect("world");
        WorldDraft {
            header: Some(world.header().clone()),
            width,
            height,
            ..WorldDraft::default()
        }
    }

    fn encode_with(
        world: &World,
        version: u32,
        encode: fn(
            &World,
            &FormatFeatures,
            &mut ByteWriter,
            &ProgressTracker<'_>,
        ) -> Result<(), WorldCodecError>,
    ) -> Result<Vec<u8>, WorldCodecError> {
        let tracker = ProgressTracker::for_save(&NoProgress, 1, 64);
        let mut writer = ByteWriter::new();
        encode(world, &features(version), &mut writer, &tracker)?;
        Ok(writer.into_bytes())
    }

    fn decode_with(
        bytes: &[u8],
        version: u32,
        draft: &mut WorldDraft,
        decode: fn(
            &mut ByteReader<'_>,
            &FormatFeatures,
            &mut WorldDraft,
            &ProgressTracker<'_>,
        ) -> Result<(), WorldCodecError>,
    ) -> Result<usize, WorldCodecError> {
        let tracker = ProgressTracker::for_load(&NoProgress, bytes.len(), 64);
        let mut reader = ByteReader::new(bytes);
        decode(&mut reader, &features(version), draft, &tracker)?;
        Ok(reader.remaining())
    }

    #[test]
    fn header_roundtrips_reserved_and_event_flags() {
        let mut world = World::new("Aurora", 12, 8).expect("world");
        {
            let header = world.header_mut();
            header.world_id = -42;
            header.blood_moon = true;
            header.reserved_flags = 0b1_0010;
            header.event_flags = 0xdead_beef;
        }
        let bytes = encode_with(&world, 2, encode_header).expect("encode");
        let mut draft = WorldDraft::default();
        decode_with(&bytes, 2, &mut draft, decode_header).expect("decode");
        assert_eq!(draft.header.as_ref(), Some(world.header()));
        assert_eq!((draft.width, draft.height), (12, 8));
    }

    #[test]
    fn header_rejects_zero_width() {
        let world = World::new("Zero", 4, 4).expect("world");
        let mut bytes = encode_with(&world, 1, encode_header).expect("encode");
        // name (2 + 4 bytes) + world id (4) puts width at offset 10
        bytes[10..14].copy_from_slice(&0u32.to_le_bytes());
        let err = decode_with(&bytes, 1, &mut WorldDraft::default(), decode_header)
            .expect_err("zero width");
        assert!(matches!(
            err,
            WorldCodecError::InvalidData {
                section: SectionKind::Header,
                offset: 10,
                ..
            }
        ));
    }

    #[test]
    fn event_flags_need_version_two() {
        let mut world = World::new("Old", 4, 4).expect("world");
        world.set_event_flags(1);
        let err = encode_with(&world, 1, encode_header).expect_err("downgrade");
        assert!(matches!(
            err,
            WorldCodecError::UnsupportedDowngrade {
                required_version: 2,
                ..
            }
        ));
    }

    #[test]
    fn chest_decode_stops_at_declared_count() {
        let mut world = World::new("Chests", 4, 4).expect("world");
        let mut chest = Chest::new(TilePos::new(1, 2), 20);
        chest.items[0] = ItemSlot::new(5, 10, 0);
        chest.items[19] = ItemSlot::new(-3, 1, 7);
        world.entities_mut().chests.push(chest.clone());

        let mut bytes = encode_with(&world, 3, encode_chests).expect("encode");
        bytes.extend_from_slice(&[0xAA; 9]);
        let mut draft = draft(4, 4);
        let trailing = decode_with(&bytes, 3, &mut draft, decode_chests).expect("decode");
        assert_eq!(trailing, 9);
        assert_eq!(draft.entities.chests, vec![chest]);
    }

    #[test]
    fn chest_outside_grid_is_invalid_on_decode_and_encode() {
        let mut world = World::new("Chests", 4, 4).expect("world");
        world
            .entities_mut()
            .chests
            .push(Chest::new(TilePos::new(4, 0), 20));
        let err = encode_with(&world, 3, encode_chests).expect_err("outside");
        assert!(matches!(err, WorldCodecError::InvalidWorld { .. }));

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        let err = decode_with(&bytes, 1, &mut draft(4, 4), decode_chests).expect_err("outside");
        assert!(matches!(
            err,
            WorldCodecError::InvalidData {
                section: SectionKind::Chests,
                offset: 2,
                ..
            }
        ));
    }

    #[test]
    fn chest_capacity_and_names_are_version_gated() {
        let mut world = World::new("Chests", 4, 4).expect("world");
        let mut chest = Chest::new(TilePos::new(0, 0), 40);
        chest.items[25] = ItemSlot::new(9, 1, 0);
        world.entities_mut().chests.push(chest);
        let err = encode_with(&world, 4, encode_chests).expect_err("capacity");
        assert!(matches!(
            err,
            WorldCodecError::UnsupportedDowngrade {
                feature: "larger chests",
                required_version: 5,
                ..
            }
        ));

        let chest = &mut world.entities_mut().chests[0];
        chest.items[25] = ItemSlot::EMPTY;
        chest.name = Some("Hoard".to_string());
        let err = encode_with(&world, 3, encode_chests).expect_err("names");
        assert!(matches!(
            err,
            WorldCodecError::UnsupportedDowngrade {
                feature: "chest names",
                ..
            }
        ));
        // trailing empty slots beyond the target capacity are dropped without complaint
        assert!(encode_with(&world, 4, encode_chests).is_ok());
    }

    #[test]
    fn sign_text_limits_follow_version() {
        let mut world = World::new("Signs", 4, 4).expect("world");
        world.entities_mut().signs.push(Sign {
            position: TilePos::new(3, 3),
            text: "a".repeat(600),
        });
        let err = encode_with(&world, 4, encode_signs).expect_err("too long for v4");
        assert!(matches!(
            err,
            WorldCodecError::UnsupportedDowngrade {
                required_version: 5,
                ..
            }
        ));
        let bytes = encode_with(&world, 5, encode_signs).expect("fits v5");
        let mut draft = draft(4, 4);
        decode_with(&bytes, 5, &mut draft, decode_signs).expect("decode");
        assert_eq!(draft.entities.signs, world.entities().signs);

        world.entities_mut().signs[0].text = "a".repeat(5000);
        let err = encode_with(&world, 5, encode_signs).expect_err("too long anywhere");
        assert!(matches!(err, WorldCodecError::InvalidWorld { .. }));
    }

    #[test]
    fn over_limit_sign_text_fails_to_load() {
        let mut world = World::new("Signs", 4, 4).expect("world");
        world.entities_mut().signs.push(Sign {
            position: TilePos::new(1, 2),
            text: "b".repeat(300),
        });
        // written at v5, read back under the v4 limit
        let bytes = encode_with(&world, 5, encode_signs).expect("fits v5");
        let mut draft = draft(4, 4);
        let err = decode_with(&bytes, 4, &mut draft, decode_signs).expect_err("over v4 limit");
        match err {
            WorldCodecError::InvalidData {
                section, offset, ..
            } => {
                assert_eq!(section, SectionKind::Signs);
                // count (2) + anchor (8)
                assert_eq!(offset, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(draft.entities.signs.is_empty());
    }

    #[test]
    fn sign_at_limit_loads_and_saves_at_same_version() {
        let mut world = World::new("Signs", 4, 4).expect("world");
        world.entities_mut().signs.push(Sign {
            position: TilePos::new(0, 0),
            text: "c".repeat(255),
        });
        let bytes = encode_with(&world, 4, encode_signs).expect("fits v4");
        let mut draft = draft(4, 4);
        decode_with(&bytes, 4, &mut draft, decode_signs).expect("decode");
        let mut reloaded = World::new("Signs", 4, 4).expect("world");
        reloaded.entities_mut().signs = draft.entities.signs;
        let resaved = encode_with(&reloaded, 4, encode_signs).expect("resave at v4");
        assert_eq!(resaved, bytes);
    }

    #[test]
    fn homeless_npc_keeps_stale_home_tile() {
        let mut world = World::new("Town", 4, 4).expect("world");
        world.entities_mut().npcs.push(Npc {
            name: "Guide".to_string(),
            position: Vec2 { x: 812.5, y: -3.25 },
            home: TilePos::new(77, 12),
            homeless: true,
            reserved_flags: 0,
        });
        let bytes = encode_with(&world, 1, encode_npcs).expect("encode");
        let mut draft = draft(4, 4);
        decode_with(&bytes, 1, &mut draft, decode_npcs).expect("decode");
        assert_eq!(draft.entities.npcs, world.entities().npcs);
    }

    #[test]
    fn npc_reserved_flag_bits_survive_roundtrip() {
        let mut world = World::new("Town", 4, 4).expect("world");
        world.entities_mut().npcs.push(Npc {
            name: "Merchant".to_string(),
            position: Vec2 { x: 16.0, y: 32.0 },
            home: TilePos::new(2, 3),
            homeless: true,
            reserved_flags: 0b101_0011,
        });
        let bytes = encode_with(&world, 3, encode_npcs).expect("encode");
        // count (2) + name (2 + 8) + position (8)
        assert_eq!(bytes[20], 0b1010_0111);

        let mut draft = draft(4, 4);
        decode_with(&bytes, 3, &mut draft, decode_npcs).expect("decode");
        assert_eq!(draft.entities.npcs, world.entities().npcs);
        assert_eq!(draft.entities.npcs[0].reserved_flags, 0b101_0011);

        // raw byte with only reserved bits set
        let mut patched = bytes;
        patched[20] = 0b1000_0010;
        let mut draft = self::draft(4, 4);
        decode_with(&patched, 3, &mut draft, decode_npcs).expect("decode");
        assert!(!draft.entities.npcs[0].homeless);
        assert_eq!(draft.entities.npcs[0].reserved_flags, 0b100_0001);
    }

    #[test]
    fn finish_requires_header_and_tiles() {
        let err = WorldDraft::default().finish(1, 8).expect_err("empty");
        assert!(matches!(
            err,
            WorldCodecError::InvalidData {
                section: SectionKind::Header,
                ..
            }
        ));
        let err = draft(2, 2).finish(1, 8).expect_err("no tiles");
        assert!(matches!(
            err,
            WorldCodecError::InvalidData {
                section: SectionKind::Tiles,
                ..
            }
        ));
    }
}
