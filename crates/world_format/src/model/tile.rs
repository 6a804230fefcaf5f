pub type BlockId = u16;
pub type WallId = u8;

pub const CHEST_BLOCK: BlockId = 21;
pub const DRESSER_BLOCK: BlockId = 88;
pub const SIGN_BLOCK: BlockId = 55;
pub const TOMBSTONE_BLOCK: BlockId = 85;

/// Blocks that own a chest record at their top-left tile.
pub const CONTAINER_BLOCKS: &[BlockId] = &[CHEST_BLOCK, DRESSER_BLOCK];
/// Blocks that own a sign record at their top-left tile.
pub const SIGN_BLOCKS: &[BlockId] = &[SIGN_BLOCK, TOMBSTONE_BLOCK];

// Multi-tile objects whose sprite frame is stored per tile. Sorted for binary search.
const FRAME_IMPORTANT_BLOCKS: &[BlockId] = &[
    3, 4, 5, 10, 11, 12, 13, 14, 15, 16, 17, 18, 20, 21, 24, 26, 27, 28, 29, 31, 33, 34, 35, 36,
    42, 50, 55, 61, 71, 72, 73, 74, 77, 78, 79, 81, 82, 83, 84, 85, 86, 87, 88, 89, 90, 91, 92,
    93, 94, 95, 96, 97, 98, 99, 100, 101, 102, 103, 104, 105, 106, 110, 113, 114, 125, 126, 128,
    129, 132, 133, 134, 135, 136, 137, 138, 139, 141, 142, 143, 144, 149,
];

pub fn is_frame_important(block: BlockId) -> bool {
    FRAME_IMPORTANT_BLOCKS.binary_search(&block).is_ok()
}

pub fn is_container_block(block: BlockId) -> bool {
    CONTAINER_BLOCKS.contains(&block)
}

pub fn is_sign_block(block: BlockId) -> bool {
    SIGN_BLOCKS.contains(&block)
}

/// Sprite-sheet offset of a multi-tile object's cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TileFrame {
    pub u: u16,
    pub v: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LiquidKind {
    #[default]
    None,
    Water,
    Lava,
    Honey,
}

impl LiquidKind {
    pub fn to_wire(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Water => 1,
            Self::Lava => 2,
            Self::Honey => 3,
        }
    }

    pub fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Water),
            2 => Some(Self::Lava),
            3 => Some(Self::Honey),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlockShape {
    #[default]
    Full,
    HalfBrick,
    SlopeDownRight,
    SlopeDownLeft,
    SlopeUpRight,
    SlopeUpLeft,
}

impl BlockShape {
    pub fn bits(self) -> u8 {
        match self {
            Self::Full => 0,
            Self::HalfBrick => 1,
            Self::SlopeDownRight => 2,
            Self::SlopeDownLeft => 3,
            Self::SlopeUpRight => 4,
            Self::SlopeUpLeft => 5,
        }
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Full),
            1 => Some(Self::HalfBrick),
            2 => Some(Self::SlopeDownRight),
            3 => Some(Self::SlopeDownLeft),
            4 => Some(Self::SlopeUpRight),
            5 => Some(Self::SlopeUpLeft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Wiring {
    pub red: bool,
    pub blue: bool,
    pub green: bool,
}

impl Wiring {
    pub fn any(self) -> bool {
        self.red || self.blue || self.green
    }
}

/// One grid cell.
///
/// Paints are `Some` exactly when the governing flag is set on disk. `frame`
/// is derived from `block`: it exists only for frame-important blocks, and
/// the encoder writes [`Tile::normalized`], so a missing frame saves as the
/// origin frame and a frame on any other block is dropped. `liquid_amount` is
/// only meaningful when `liquid` is not `LiquidKind::None`. `extra_flags` holds tile flag bits the source format
/// version did not define; they are carried through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Tile {
    pub block: Option<BlockId>,
    pub frame: Option<TileFrame>,
    pub block_paint: Option<u8>,
    pub shape: BlockShape,
    pub wall: Option<WallId>,
    pub wall_paint: Option<u8>,
    pub liquid: LiquidKind,
    pub liquid_amount: u8,
    pub wiring: Wiring,
    pub actuator: bool,
    pub inactive: bool,
    pub extra_flags: u16,
}

impl Tile {
    pub const EMPTY: Tile = Tile {
        block: None,
        frame: None,
        block_paint: None,
        shape: BlockShape::Full,
        wall: None,
        wall_paint: None,
        liquid: LiquidKind::None,
        liquid_amount: 0,
        wiring: Wiring {
            red: false,
            blue: false,
            green: false,
        },
        actuator: false,
        inactive: false,
        extra_flags: 0,
    };

    /// A solid block; frame-important blocks get the origin frame.
    pub fn with_block(block: BlockId) -> Self {
        let mut tile = Self::EMPTY;
        tile.set_block(Some(block));
        tile
    }

    pub fn with_wall(wall: WallId) -> Self {
        Self {
            wall: Some(wall),
            ..Self::EMPTY
        }
    }

    pub fn with_liquid(kind: LiquidKind, amount: u8) -> Self {
        let mut tile = Self::EMPTY;
        tile.set_liquid(kind, amount);
        tile
    }

    pub fn set_block(&mut self, block: Option<BlockId>) {
        self.block = block;
        self.frame = match block {
            Some(id) if is_frame_important(id) => Some(self.frame.unwrap_or_default()),
            _ => None,
        };
        if block.is_none() {
            self.block_paint = None;
            self.shape = BlockShape::Full;
        }
    }

    pub fn set_liquid(&mut self, kind: LiquidKind, amount: u8) {
        self.liquid = kind;
        self.liquid_amount = if kind == LiquidKind::None { 0 } else { amount };
    }

    /// The tile as it reads back after a save: frame derived from the block,
    /// no liquid amount without a liquid.
    pub fn normalized(mut self) -> Tile {
        self.frame = match self.block {
            Some(id) if is_frame_important(id) => Some(self.frame.unwrap_or_default()),
            _ => None,
        };
        if self.liquid == LiquidKind::None {
            self.liquid_amount = 0;
        }
        self
    }

    pub fn has_liquid(&self) -> bool {
        self.liquid != LiquidKind::None
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_table_is_sorted_for_binary_search() {
        assert!(FRAME_IMPORTANT_BLOCKS.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(is_frame_important(CHEST_BLOCK));
        assert!(!is_frame_important(1));
    }

    #[test]
    fn set_block_keeps_frame_only_for_multi_tile_blocks() {
        let mut tile = Tile::with_block(CHEST_BLOCK);
        assert_eq!(tile.frame, Some(TileFrame::default()));
        tile.frame = Some(TileFrame { u: 18, v: 0 });
        tile.set_block(Some(DRESSER_BLOCK));
        assert_eq!(tile.frame, Some(TileFrame { u: 18, v: 0 }));
        tile.set_block(Some(1));
        assert_eq!(tile.frame, None);
    }

    #[test]
    fn normalized_derives_frame_from_block() {
        let unframed_chest = Tile {
            block: Some(CHEST_BLOCK),
            ..Tile::EMPTY
        };
        assert_eq!(unframed_chest.normalized().frame, Some(TileFrame::default()));

        let framed_dirt = Tile {
            block: Some(1),
            frame: Some(TileFrame { u: 36, v: 18 }),
            ..Tile::EMPTY
        };
        assert_eq!(framed_dirt.normalized(), Tile::with_block(1));

        let stale_amount = Tile {
            liquid_amount: 90,
            ..Tile::EMPTY
        };
        assert!(stale_amount.normalized().is_empty());

        let mut chest = Tile::with_block(CHEST_BLOCK);
        chest.frame = Some(TileFrame { u: 18, v: 18 });
        assert_eq!(chest.normalized(), chest);
    }

    #[test]
    fn clearing_block_drops_block_only_data() {
        let mut tile = Tile::with_block(1);
        tile.block_paint = Some(3);
        tile.shape = BlockShape::HalfBrick;
        tile.wall = Some(2);
        tile.set_block(None);
        assert_eq!(tile.block_paint, None);
        assert_eq!(tile.shape, BlockShape::Full);
        assert_eq!(tile.wall, Some(2));
    }

    #[test]
    fn liquid_amount_is_zero_without_liquid() {
        let tile = Tile::with_liquid(LiquidKind::None, 200);
        assert_eq!(tile.liquid_amount, 0);
        assert!(tile.is_empty());
        assert!(Tile::with_liquid(LiquidKind::Honey, 255).has_liquid());
    }

    #[test]
    fn liquid_wire_values_roundtrip() {
        for kind in [
            LiquidKind::None,
            LiquidKind::Water,
            LiquidKind::Lava,
            LiquidKind::Honey,
        ] {
            assert_eq!(LiquidKind::from_wire(kind.to_wire()), Some(kind));
        }
        assert_eq!(LiquidKind::from_wire(9), None);
        assert_eq!(BlockShape::from_bits(6), None);
    }
}
