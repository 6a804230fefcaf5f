use tracing::debug;

use crate::io::{ByteReader, ByteWriter};
use crate::model::{is_frame_important, BlockShape, LiquidKind, Tile, TileFrame, TileGrid, World};

use super::error::{InSection, SectionKind, WorldCodecError};
use super::progress::ProgressTracker;
use super::sections::WorldDraft;
use super::version::FormatFeatures;

pub(crate) const ACTIVE: u16 = 1 << 0;
pub(crate) const WALL: u16 = 1 << 1;
pub(crate) const LIQUID: u16 = 1 << 2;
pub(crate) const WIRE_RED: u16 = 1 << 3;
pub(crate) const ACTUATOR: u16 = 1 << 4;
pub(crate) const INACTIVE: u16 = 1 << 5;
pub(crate) const BLOCK_PAINT: u16 = 1 << 6;
pub(crate) const WALL_PAINT: u16 = 1 << 7;
pub(crate) const SHAPE_SHIFT: u16 = 8;
pub(crate) const SHAPE_MASK: u16 = 0b111 << SHAPE_SHIFT;
pub(crate) const WIRE_BLUE: u16 = 1 << 11;
pub(crate) const WIRE_GREEN: u16 = 1 << 12;
pub(crate) const RESERVED: u16 = 1 << 13;
pub(crate) const RLE_SHIFT: u16 = 14;
pub(crate) const RLE_MASK: u16 = 0b11 << RLE_SHIFT;

const SECTION: SectionKind = SectionKind::Tiles;

pub(crate) fn decode_tile_section(
    reader: &mut ByteReader<'_>,
    features: &FormatFeatures,
    draft: &mut WorldDraft,
    progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    let (width, height) = draft.dimensions(reader.position())?;
    let grid = decode_tiles(reader, features, width, height, progress)?;
    draft.tiles = Some(grid);
    Ok(())
}

pub(crate) fn encode_tile_section(
    world: &World,
    features: &FormatFeatures,
    writer: &mut ByteWriter,
    progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    encode_tiles(world.tiles(), features, writer, progress)
}

/// Decodes `width * height` tiles in row-major order.
///
/// A repeat count that would run past the last tile is rejected rather than
/// clipped.
pub(crate) fn decode_tiles(
    reader: &mut ByteReader<'_>,
    features: &FormatFeatures,
    width: u32,
    height: u32,
    progress: &ProgressTracker<'_>,
) -> Result<TileGrid, WorldCodecError> {
    let total = width as usize * height as usize;
    let row_len = width as usize;
    let mut tiles = Vec::<Tile>::with_capacity(total);
    let mut records = 0usize;

    while tiles.len() < total {
        let offset = reader.position();
        let (tile, repeat) = decode_record(reader, features, tiles.len())?;
        let run = repeat.saturating_add(1);
        if run > total - tiles.len() {
            return Err(WorldCodecError::CorruptTileStream {
                offset,
                tile_index: tiles.len(),
                message: format!(
                    "repeat count {repeat} overruns the grid ({} of {total} tiles remain)",
                    total - tiles.len()
                ),
            });
        }

        let rows_before = tiles.len() / row_len;
        tiles.extend(std::iter::repeat(tile).take(run));
        records += 1;
        let rows_after = tiles.len() / row_len;
        for rows_done in rows_before + 1..=rows_after {
            progress.tile_row_done(rows_done as u32, height, reader.position());
        }
    }

    debug!(
        width,
        height,
        records,
        bytes = reader.position(),
        "world_tiles_decoded"
    );
    TileGrid::from_tiles(width, height, tiles).map_err(|error| {
        WorldCodecError::invalid_data(SECTION, reader.position(), error.to_string())
    })
}

fn decode_record(
    reader: &mut ByteReader<'_>,
    features: &FormatFeatures,
    tile_index: usize,
) -> Result<(Tile, usize), WorldCodecError> {
    let offset = reader.position();
    let flags = reader.read_u16().in_section(SECTION)?;
    let known = features.known_tile_flags();
    let corrupt = |message: String| WorldCodecError::CorruptTileStream {
        offset,
        tile_index,
        message,
    };

    let mut tile = Tile {
        extra_flags: flags & !known,
        ..Tile::EMPTY
    };

    if flags & ACTIVE != 0 {
        let block = if features.wide_block_ids {
            reader.read_u16().in_section(SECTION)?
        } else {
            u16::from(reader.read_u8().in_section(SECTION)?)
        };
        tile.block = Some(block);
        if is_frame_important(block) {
            tile.frame = Some(TileFrame {
                u: reader.read_u16().in_section(SECTION)?,
                v: reader.read_u16().in_section(SECTION)?,
            });
        }
    }
    if features.block_shapes {
        let bits = ((flags & SHAPE_MASK) >> SHAPE_SHIFT) as u8;
        tile.shape = BlockShape::from_bits(bits)
            .ok_or_else(|| corrupt(format!("invalid block shape {bits}")))?;
    }
    if features.paint && flags & BLOCK_PAINT != 0 {
        tile.block_paint = Some(reader.read_u8().in_section(SECTION)?);
    }
    if flags & WALL != 0 {
        tile.wall = Some(reader.read_u8().in_section(SECTION)?);
    }
    if features.paint && flags & WALL_PAINT != 0 {
        tile.wall_paint = Some(reader.read_u8().in_section(SECTION)?);
    }
    if flags & LIQUID != 0 {
        let raw = reader.read_u8().in_section(SECTION)?;
        let amount = reader.read_u8().in_section(SECTION)?;
        let kind = match LiquidKind::from_wire(raw) {
            Some(LiquidKind::Honey) if !features.honey => None,
            Some(LiquidKind::None) => None,
            other => other,
        }
        .ok_or_else(|| corrupt(format!("invalid liquid kind {raw}")))?;
        tile.set_liquid(kind, amount);
    }
    if features.wiring {
        tile.wiring.red = flags & WIRE_RED != 0;
        tile.actuator = flags & ACTUATOR != 0;
        tile.inactive = flags & INACTIVE != 0;
    }
    if features.extra_wires {
        tile.wiring.blue = flags & WIRE_BLUE != 0;
        tile.wiring.green = flags & WIRE_GREEN != 0;
    }

    let repeat = if features.tile_rle {
        match (flags & RLE_MASK) >> RLE_SHIFT {
            0 => 0,
            1 => usize::from(reader.read_u8().in_section(SECTION)?),
            2 => usize::from(reader.read_u16().in_section(SECTION)?),
            _ => reader.read_u32().in_section(SECTION)? as usize,
        }
    } else {
        0
    };
    Ok((tile, repeat))
}

/// Encodes the grid, coalescing each maximal run of identical tiles into a
/// single record when the version supports repeat counts.
pub(crate) fn encode_tiles(
    grid: &TileGrid,
    features: &FormatFeatures,
    writer: &mut ByteWriter,
    progress: &ProgressTracker<'_>,
) -> Result<(), WorldCodecError> {
    let row_len = grid.width() as usize;
    let mut records = 0usize;
    for (start, tile, len) in grid.runs() {
        check_tile_supported(tile, features, start, grid.width())?;
        let tile = tile.normalized();
        if features.tile_rle {
            encode_record(&tile, features, len - 1, writer);
            records += 1;
        } else {
            for _ in 0..len {
                encode_record(&tile, features, 0, writer);
            }
            records += len;
        }

        let end = start + len;
        for rows_done in start / row_len + 1..=end / row_len {
            progress.tile_row_done(rows_done as u32, grid.height(), writer.len());
        }
    }
    debug!(
        width = grid.width(),
        height = grid.height(),
        records,
        bytes = writer.len(),
        "world_tiles_encoded"
    );
    Ok(())
}

fn encode_record(tile: &Tile, features: &FormatFeatures, repeat: usize, writer: &mut ByteWriter) {
    let known = features.known_tile_flags();
    let mut flags = tile.extra_flags & !known;

    if tile.block.is_some() {
        flags |= ACTIVE;
    }
    if tile.wall.is_some() {
        flags |= WALL;
    }
    if tile.has_liquid() {
        flags |= LIQUID;
    }
    if features.wiring {
        flags |= bit(tile.wiring.red, WIRE_RED)
            | bit(tile.actuator, ACTUATOR)
            | bit(tile.inactive, INACTIVE);
    }
    if features.paint {
        flags |= bit(tile.block_paint.is_some(), BLOCK_PAINT)
            | bit(tile.wall_paint.is_some(), WALL_PAINT);
    }
    if features.block_shapes {
        flags |= u16::from(tile.shape.bits()) << SHAPE_SHIFT;
    }
    if features.extra_wires {
        flags |= bit(tile.wiring.blue, WIRE_BLUE) | bit(tile.wiring.green, WIRE_GREEN);
    }
    let repeat_width = if !features.tile_rle || repeat == 0 {
        0
    } else if repeat <= usize::from(u8::MAX) {
        1
    } else if repeat <= usize::from(u16::MAX) {
        2
    } else {
        3
    };
    flags |= repeat_width << RLE_SHIFT;

    writer.write_u16(flags);
    if let Some(block) = tile.block {
        if features.wide_block_ids {
            writer.write_u16(block);
        } else {
            writer.write_u8(block as u8);
        }
        if let Some(frame) = tile.frame {
            writer.write_u16(frame.u);
            writer.write_u16(frame.v);
        }
    }
    if features.paint {
        if let Some(color) = tile.block_paint {
            writer.write_u8(color);
        }
    }
    if let Some(wall) = tile.wall {
        writer.write_u8(wall);
    }
    if features.paint {
        if let Some(color) = tile.wall_paint {
            writer.write_u8(color);
        }
    }
    if tile.has_liquid() {
        writer.write_u8(tile.liquid.to_wire());
        writer.write_u8(tile.liquid_amount);
    }
    match repeat_width {
        1 => writer.write_u8(repeat as u8),
        2 => writer.write_u16(repeat as u16),
        3 => writer.write_u32(repeat as u32),
        _ => {}
    }
}

fn bit(set: bool, flag: u16) -> u16 {
    if set {
        flag
    } else {
        0
    }
}

/// Rejects tiles carrying data the target version has no field for.
fn check_tile_supported(
    tile: &Tile,
    features: &FormatFeatures,
    index: usize,
    width: u32,
) -> Result<(), WorldCodecError> {
    let downgrade = |feature: &'static str, predicate: fn(&FormatFeatures) -> bool| {
        let x = index % width as usize;
        let y = index / width as usize;
        WorldCodecError::UnsupportedDowngrade {
            target_version: features.version,
            feature,
            required_version: FormatFeatures::first_version_with(predicate)
                .unwrap_or(features.version),
            detail: format!("first used by tile ({x}, {y})"),
        }
    };

    if tile.block.is_some_and(|block| block > u16::from(u8::MAX)) && !features.wide_block_ids {
        return Err(downgrade("block ids above 255", |f| f.wide_block_ids));
    }
    if tile.liquid == LiquidKind::Honey && !features.honey {
        return Err(downgrade("honey", |f| f.honey));
    }
    if (tile.block_paint.is_some() || tile.wall_paint.is_some()) && !features.paint {
        return Err(downgrade("paint", |f| f.paint));
    }
    if tile.shape != BlockShape::Full && !features.block_shapes {
        return Err(downgrade("block shapes", |f| f.block_shapes));
    }
    if (tile.wiring.red || tile.actuator || tile.inactive) && !features.wiring {
        return Err(downgrade("red wire and actuators", |f| f.wiring));
    }
    if (tile.wiring.blue || tile.wiring.green) && !features.extra_wires {
        return Err(downgrade("blue and green wire", |f| f.extra_wires));
    }
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::codec::progress::NoProgress;
    use crate::codec::version::CURRENT_FORMAT_VERSION;
    use crate::model::Wiring;
    use proptest::prelude::*;

    fn liquid_strategy() -> impl Strategy<Value = (LiquidKind, u8)> {
        prop_oneof![
            Just((LiquidKind::None, 0)),
            (1u8..=255).prop_map(|amount| (LiquidKind::Water, amount)),
            (1u8..=255).prop_map(|amount| (LiquidKind::Lava, amount)),
            (1u8..=255).prop_map(|amount| (LiquidKind::Honey, amount)),
        ]
    }

    prop_compose! {
        fn current_tile()(
            block in proptest::option::of(0u16..600),
            frame in (any::<u16>(), any::<u16>()),
            block_paint in proptest::option::of(any::<u8>()),
            shape in 0u8..=5,
            wall in proptest::option::of(any::<u8>()),
            wall_paint in proptest::option::of(any::<u8>()),
            (liquid, liquid_amount) in liquid_strategy(),
            wires in any::<(bool, bool, bool)>(),
            actuator in any::<bool>(),
            inactive in any::<bool>(),
            reserved in any::<bool>(),
        ) -> Tile {
            Tile {
                block,
                frame: block
                    .filter(|id| is_frame_important(*id))
                    .map(|_| TileFrame { u: frame.0, v: frame.1 }),
                block_paint,
                shape: BlockShape::from_bits(shape).unwrap_or_default(),
                wall,
                wall_paint,
                liquid,
                liquid_amount,
                wiring: Wiring { red: wires.0, blue: wires.1, green: wires.2 },
                actuator,
                inactive,
                extra_flags: if reserved { RESERVED } else { 0 },
            }
        }
    }

    fn latest() -> FormatFeatures {
        FormatFeatures::latest()
    }

    proptest! {
        #[test]
        fn identical_run_is_one_record(tile in current_tile(), width in 1u32..64, height in 1u32..64) {
            let grid = TileGrid::filled(width, height, tile).expect("grid");
            let total = grid.len();
            let tracker = ProgressTracker::for_save(&NoProgress, 1, 64);
            let mut writer = ByteWriter::new();
            encode_tiles(&grid, &latest(), &mut writer, &tracker).expect("encode");
            let bytes = writer.into_bytes();

            let mut reader = ByteReader::new(&bytes);
            let (decoded, repeat) = decode_record(&mut reader, &latest(), 0).expect("record");
            prop_assert!(reader.is_empty());
            prop_assert_eq!(repeat, total - 1);
            prop_assert_eq!(decoded, tile);

            let tracker = ProgressTracker::for_load(&NoProgress, bytes.len(), 64);
            let back = decode_tiles(&mut ByteReader::new(&bytes), &latest(), width, height, &tracker)
                .expect("decode");
            prop_assert_eq!(back, grid);
        }

        #[test]
        fn mixed_grid_roundtrips(
            palette in proptest::collection::vec(current_tile(), 1..4),
            picks in proptest::collection::vec(any::<prop::sample::Index>(), 1..200),
            width in 1u32..20,
        ) {
            let tiles: Vec<Tile> = picks.iter().map(|pick| *pick.get(&palette)).collect();
            let width = width.min(tiles.len() as u32);
            let height = tiles.len() as u32 / width;
            let tiles = tiles[..(width * height) as usize].to_vec();
            let grid = TileGrid::from_tiles(width, height, tiles).expect("grid");

            let tracker = ProgressTracker::for_save(&NoProgress, 1, 64);
            let mut writer = ByteWriter::new();
            encode_tiles(&grid, &latest(), &mut writer, &tracker).expect("encode");
            let bytes = writer.into_bytes();
            let tracker = ProgressTracker::for_load(&NoProgress, bytes.len(), 64);
            let back = decode_tiles(&mut ByteReader::new(&bytes), &latest(), width, height, &tracker)
                .expect("decode");
            prop_assert_eq!(back, grid);
        }

        #[test]
        fn overrunning_repeat_is_always_corrupt(
            width in 1u32..32,
            height in 1u32..32,
            excess in 1u32..10_000,
        ) {
            let total = width * height;
            let repeat = total - 1 + excess;
            let mut writer = ByteWriter::new();
            writer.write_u16(3 << RLE_SHIFT);
            writer.write_u32(repeat);
            let bytes = writer.into_bytes();

            let tracker = ProgressTracker::for_load(&NoProgress, bytes.len(), 64);
            let features = FormatFeatures::for_version(CURRENT_FORMAT_VERSION).expect("version");
            let err = decode_tiles(&mut ByteReader::new(&bytes), &features, width, height, &tracker)
                .expect_err("overrun");
            let is_corrupt = matches!(err, WorldCodecError::CorruptTileStream { tile_index: 0, .. });
            prop_assert!(is_corrupt);
        }
    }
}
