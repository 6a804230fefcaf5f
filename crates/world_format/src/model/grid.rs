use super::tile::Tile;
use super::world::WorldError;

pub const MAX_WORLD_DIMENSION: u32 = 16_800;
pub const MAX_TILE_COUNT: usize = 40_320_000;

/// Dense row-major tile storage: tile `(x, y)` lives at `y * width + x`,
/// with `(0, 0)` the top-left corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

pub fn check_dimensions(width: u32, height: u32) -> Result<usize, WorldError> {
    let count = width as usize * height as usize;
    if width == 0
        || height == 0
        || width > MAX_WORLD_DIMENSION
        || height > MAX_WORLD_DIMENSION
        || count > MAX_TILE_COUNT
    {
        return Err(WorldError::InvalidDimensions { width, height });
    }
    Ok(count)
}

impl TileGrid {
    pub fn new(width: u32, height: u32) -> Result<Self, WorldError> {
        Self::filled(width, height, Tile::EMPTY)
    }

    pub fn filled(width: u32, height: u32, tile: Tile) -> Result<Self, WorldError> {
        let count = check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            tiles: vec![tile; count],
        })
    }

    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Result<Self, WorldError> {
        let expected = check_dimensions(width, height)?;
        let actual = tiles.len();
        if expected != actual {
            return Err(WorldError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&Tile> {
        self.index_of(x, y).and_then(|index| self.tiles.get(index))
    }

    pub fn get_mut(&mut self, x: u32, y: u32) -> Option<&mut Tile> {
        let index = self.index_of(x, y)?;
        self.tiles.get_mut(index)
    }

    pub fn set(&mut self, x: u32, y: u32, tile: Tile) -> Result<(), WorldError> {
        let slot = self.get_mut(x, y).ok_or(WorldError::OutOfBounds {
            x: x as i64,
            y: y as i64,
        })?;
        *slot = tile;
        Ok(())
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn row(&self, y: u32) -> Option<&[Tile]> {
        let start = self.index_of(0, y)?;
        self.tiles.get(start..start + self.width as usize)
    }

    /// Maximal runs of identical adjacent tiles in row-major order.
    /// Runs continue across row boundaries.
    pub fn runs(&self) -> Runs<'_> {
        Runs {
            tiles: &self.tiles,
            pos: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Runs<'a> {
    tiles: &'a [Tile],
    pos: usize,
}

impl<'a> Iterator for Runs<'a> {
    /// `(first index, prototype, run length)`
    type Item = (usize, &'a Tile, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.pos;
        let prototype = self.tiles.get(start)?;
        let len = self.tiles[start..]
            .iter()
            .take_while(|tile| *tile == prototype)
            .count();
        self.pos += len;
        Some((start, prototype, len))
    }
}
