mod error;
mod progress;
mod sections;
mod tiles;
mod version;
mod world_codec;

pub use error::{SectionKind, WorldCodecError};
pub use progress::{NoProgress, ProgressSink};
pub use version::{
    sections_for, FormatFeatures, SectionDescriptor, CHEST_CAPACITY, CURRENT_FORMAT_VERSION,
    LEGACY_CHEST_CAPACITY, LEGACY_SIGN_TEXT_LIMIT, MIN_FORMAT_VERSION, SECTION_TABLE,
    SIGN_TEXT_LIMIT,
};
pub use world_codec::{
    load, save, ChecksumPolicy, CodecConfig, LoadWarning, LoadedWorld, WorldCodec, SIGNATURE,
};
