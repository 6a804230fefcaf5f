use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::io::atomic_io::replace_file_atomic;
use crate::io::{sha256_bytes, to_hex_lower, ByteReader, ByteWriter, CHECKSUM_LEN};
use crate::model::World;

use super::error::{InSection, SectionKind, WorldCodecError};
use super::progress::{NoProgress, ProgressSink, ProgressTracker};
use super::sections::WorldDraft;
use super::version::{sections_for, FormatFeatures, SECTION_TABLE};

pub const SIGNATURE: [u8; 4] = *b"TWLD";

const DEFAULT_PROGRESS_ROWS_PER_REPORT: u32 = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    /// Load succeeds and the mismatch is reported as a [`LoadWarning`].
    #[default]
    Warn,
    Reject,
    /// The footer is read but not verified.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    pub checksum_policy: ChecksumPolicy,
    /// Tile rows between progress reports inside the tile section.
    pub progress_rows_per_report: u32,
    /// Copy the file being replaced to `<name>.bak` before saving over it.
    pub keep_backup: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            checksum_policy: ChecksumPolicy::default(),
            progress_rows_per_report: DEFAULT_PROGRESS_ROWS_PER_REPORT,
            keep_backup: false,
        }
    }
}

/// Non-fatal findings from a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    ChecksumMismatch { expected: String, actual: String },
    TrailingSectionBytes { section: SectionKind, count: usize },
    TrailingFileBytes { count: usize },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: footer {expected}, contents {actual}")
            }
            Self::TrailingSectionBytes { section, count } => {
                write!(f, "{count} unread bytes at the end of the {section} section")
            }
            Self::TrailingFileBytes { count } => {
                write!(f, "{count} bytes after the end of the world data")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedWorld {
    pub world: World,
    pub warnings: Vec<LoadWarning>,
}

impl LoadedWorld {
    pub fn checksum_mismatch(&self) -> bool {
        self.warnings
            .iter()
            .any(|warning| matches!(warning, LoadWarning::ChecksumMismatch { .. }))
    }
}

/// Reads and writes world files.
///
/// Holds no state between calls; one codec can serve any number of loads and
/// saves, each on its own buffer.
#[derive(Clone, Default)]
pub struct WorldCodec {
    config: CodecConfig,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl fmt::Debug for WorldCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldCodec")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl WorldCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn on_progress(self, callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.with_progress(Arc::new(callback))
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn sink(&self) -> &dyn ProgressSink {
        match &self.progress {
            Some(sink) => sink.as_ref(),
            None => &NoProgress,
        }
    }

    pub fn load(&self, bytes: &[u8]) -> Result<LoadedWorld, WorldCodecError> {
        let progress =
            ProgressTracker::for_load(self.sink(), bytes.len(), self.config.progress_rows_per_report);
        let mut reader = ByteReader::new(bytes);
        let mut warnings = Vec::new();

        let found = reader.read_array::<4>().in_section(SectionKind::Signature)?;
        if found != SIGNATURE {
            return Err(WorldCodecError::UnrecognizedFormat { found });
        }
        let version = reader.read_u32().in_section(SectionKind::Signature)?;
        let features = FormatFeatures::for_version(version)?;
        progress.report_bytes(reader.position());

        let mut draft = WorldDraft::default();
        for section in sections_for(version) {
            let kind = section.kind();
            let len = reader.read_u32().in_section(kind)? as usize;
            let mut payload = reader.sub_reader(len).in_section(kind)?;
            (section.decode)(&mut payload, &features, &mut draft, &progress)?;
            if !payload.is_empty() {
                let count = payload.remaining();
                warn!(section = %kind, count, offset = payload.position(), "world_section_trailing_bytes");
                warnings.push(LoadWarning::TrailingSectionBytes {
                    section: kind,
                    count,
                });
            }
            progress.report_bytes(reader.position());
        }

        if features.checksum_footer {
            let body_len = reader.position();
            let stored = reader.read_array::<CHECKSUM_LEN>().in_section(SectionKind::Footer)?;
            if self.config.checksum_policy != ChecksumPolicy::Skip {
                let computed = sha256_bytes(&bytes[..body_len]);
                if computed != stored {
                    let expected = to_hex_lower(&stored);
                    let actual = to_hex_lower(&computed);
                    if self.config.checksum_policy == ChecksumPolicy::Reject {
                        return Err(WorldCodecError::ChecksumMismatch { expected, actual });
                    }
                    warn!(expected = %expected, actual = %actual, "world_checksum_mismatch");
                    warnings.push(LoadWarning::ChecksumMismatch { expected, actual });
                }
            }
        }

        if !reader.is_empty() {
            let count = reader.remaining();
            warn!(count, offset = reader.position(), "world_trailing_file_bytes");
            warnings.push(LoadWarning::TrailingFileBytes { count });
        }

        let world = draft.finish(version, reader.position())?;
        progress.finish();
        info!(
            name = %world.name(),
            version,
            width = world.width(),
            height = world.height(),
            chests = world.entities().chests.len(),
            signs = world.entities().signs.len(),
            npcs = world.entities().npcs.len(),
            warnings = warnings.len(),
            "world_load_complete"
        );
        Ok(LoadedWorld { world, warnings })
    }

    /// Encodes `world` as format `target_version`.
    ///
    /// Fails rather than dropping data the target version cannot represent.
    pub fn save(&self, world: &World, target_version: u32) -> Result<Vec<u8>, WorldCodecError> {
        let features = FormatFeatures::for_version(target_version)?;
        for section in SECTION_TABLE {
            if !section.is_active(target_version) && section.has_data(world) {
                return Err(WorldCodecError::UnsupportedDowngrade {
                    target_version,
                    feature: section.kind().name(),
                    required_version: section.since(),
                    detail: format!("world has {} data", section.kind()),
                });
            }
        }

        let active = sections_for(target_version).collect::<Vec<_>>();
        let progress = ProgressTracker::for_save(
            self.sink(),
            active.len(),
            self.config.progress_rows_per_report,
        );
        let mut writer = ByteWriter::with_capacity(world.tiles().len() + 1024);
        writer.write_bytes(&SIGNATURE);
        writer.write_u32(target_version);

        for (index, section) in active.iter().enumerate() {
            progress.begin_section(index);
            let mut payload = ByteWriter::new();
            (section.encode)(world, &features, &mut payload, &progress)?;
            debug!(section = %section.kind(), len = payload.len(), "world_section_encoded");
            writer
                .write_framed(payload.as_bytes())
                .in_section(section.kind())?;
            progress.end_section();
        }

        if features.checksum_footer {
            let digest = sha256_bytes(writer.as_bytes());
            writer.write_bytes(&digest);
        }
        progress.finish();
        info!(
            name = %world.name(),
            version = target_version,
            bytes = writer.len(),
            "world_save_complete"
        );
        Ok(writer.into_bytes())
    }

    pub fn load_from_path(&self, path: &Path) -> Result<LoadedWorld, WorldCodecError> {
        let bytes = fs::read(path).map_err(|source| WorldCodecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load(&bytes)
    }

    /// Encodes fully in memory, then replaces `path` atomically.
    pub fn save_to_path(
        &self,
        world: &World,
        target_version: u32,
        path: &Path,
    ) -> Result<(), WorldCodecError> {
        let bytes = self.save(world, target_version)?;
        replace_file_atomic(path, &bytes, self.config.keep_backup).map_err(|source| {
            WorldCodecError::Io {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

pub fn load(bytes: &[u8]) -> Result<LoadedWorld, WorldCodecError> {
    WorldCodec::default().load(bytes)
}

pub fn save(world: &World, target_version: u32) -> Result<Vec<u8>, WorldCodecError> {
    WorldCodec::default().save(world, target_version)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::codec::version::{CHEST_CAPACITY, CURRENT_FORMAT_VERSION};
    use crate::model::{Chest, ItemSlot, Npc, Sign, Tile, TilePos, Vec2};
    use proptest::prelude::*;

    prop_compose! {
        fn world()(
            width in 1u32..24,
            height in 1u32..24,
            name in "[a-zA-Z ]{0,16}",
            blocks in proptest::collection::vec((any::<u16>(), any::<u16>(), 0u8..200), 0..40),
            chest_items in proptest::collection::vec((any::<i32>(), 1u16..999, any::<u8>()), 0..8),
            sign_text in "[ -~]{0,64}",
            npc in ("[A-Z][a-z]{2,8}", any::<(i16, i16)>(), any::<bool>(), 0u8..0x80),
            event_flags in any::<u32>(),
        ) -> World {
            let mut world = World::new(name, width, height).expect("world");
            world.set_event_flags(event_flags);
            for (x, y, block) in blocks {
                let tile = Tile::with_block(u16::from(block));
                world
                    .tiles_mut()
                    .set(u32::from(x) % width, u32::from(y) % height, tile)
                    .expect("in bounds");
            }
            let mut chest = Chest::new(TilePos::new(0, 0), CHEST_CAPACITY);
            for (slot, (item_id, stack, prefix)) in chest_items.into_iter().enumerate() {
                chest.items[slot * 3] = ItemSlot::new(item_id, stack, prefix);
            }
            world.entities_mut().chests.push(chest);
            world.entities_mut().signs.push(Sign {
                position: TilePos::new(width as i32 - 1, height as i32 - 1),
                text: sign_text,
            });
            let (npc_name, (hx, hy), homeless, reserved_flags) = npc;
            world.entities_mut().npcs.push(Npc {
                name: npc_name,
                position: Vec2 { x: f32::from(hx) * 16.0, y: f32::from(hy) * 16.0 },
                home: TilePos::new(i32::from(hx), i32::from(hy)),
                homeless,
                reserved_flags,
            });
            world
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn saved_worlds_load_back_equal(world in world()) {
            let bytes = save(&world, CURRENT_FORMAT_VERSION).expect("save");
            let loaded = load(&bytes).expect("load");
            prop_assert!(loaded.warnings.is_empty());
            prop_assert_eq!(loaded.world, world);
        }

        #[test]
        fn truncated_files_never_load(world in world(), cut in any::<prop::sample::Index>()) {
            let bytes = save(&world, CURRENT_FORMAT_VERSION).expect("save");
            let cut = cut.index(bytes.len());
            let err = load(&bytes[..cut]).expect_err("truncated");
            let structural = err.is_truncation()
                || matches!(err, WorldCodecError::CorruptTileStream { .. });
            prop_assert!(structural, "cut at {}: {}", cut, err);
        }
    }
}
