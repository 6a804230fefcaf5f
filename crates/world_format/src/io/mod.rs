pub(crate) mod atomic_io;
pub mod checksum;
pub mod cursor;

pub use atomic_io::backup_path_for;
pub use checksum::{sha256_bytes, to_hex_lower, CHECKSUM_LEN};
pub use cursor::{ByteReader, ByteWriter, CursorError, MAX_STRING_LEN};
