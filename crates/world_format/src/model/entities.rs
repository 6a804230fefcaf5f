use super::position::{TilePos, Vec2};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ItemSlot {
    pub item_id: i32,
    pub stack: u16,
    pub prefix: u8,
}

impl ItemSlot {
    pub const EMPTY: ItemSlot = ItemSlot {
        item_id: 0,
        stack: 0,
        prefix: 0,
    };

    pub fn new(item_id: i32, stack: u16, prefix: u8) -> Self {
        Self {
            item_id,
            stack,
            prefix,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack == 0
    }
}

/// A container anchored at the top-left tile of its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chest {
    pub position: TilePos,
    pub name: Option<String>,
    pub items: Vec<ItemSlot>,
}

impl Chest {
    pub fn new(position: TilePos, capacity: usize) -> Self {
        Self {
            position,
            name: None,
            items: vec![ItemSlot::EMPTY; capacity],
        }
    }

    /// Number of slots needed to hold every non-empty item in place.
    pub fn used_capacity(&self) -> usize {
        self.items
            .iter()
            .rposition(|slot| !slot.is_empty())
            .map_or(0, |index| index + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.used_capacity() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sign {
    pub position: TilePos,
    pub text: String,
}

/// A town NPC.
///
/// `home` is written back exactly as read even while `homeless` is set; the
/// game ignores it in that state but older saves carry whatever value was
/// last assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Npc {
    pub name: String,
    pub position: Vec2,
    pub home: TilePos,
    pub homeless: bool,
    /// NPC flag bits 1..=7, shifted down and carried through unchanged.
    pub reserved_flags: u8,
}

/// Display name assigned to a town NPC type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcName {
    pub npc_type: u16,
    pub name: String,
}

/// Entity collections. Records hold coordinates by value; lookups scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRegistries {
    pub chests: Vec<Chest>,
    pub signs: Vec<Sign>,
    pub npcs: Vec<Npc>,
    pub npc_names: Vec<NpcName>,
}

impl EntityRegistries {
    pub fn chest_at(&self, position: TilePos) -> Option<&Chest> {
        self.chests.iter().find(|chest| chest.position == position)
    }

    pub fn chest_at_mut(&mut self, position: TilePos) -> Option<&mut Chest> {
        self.chests
            .iter_mut()
            .find(|chest| chest.position == position)
    }

    /// Inserts `chest`, replacing any chest already anchored at the same tile.
    pub fn put_chest(&mut self, chest: Chest) -> Option<Chest> {
        match self.chest_at_mut(chest.position) {
            Some(existing) => Some(std::mem::replace(existing, chest)),
            None => {
                self.chests.push(chest);
                None
            }
        }
    }

    pub fn remove_chest_at(&mut self, position: TilePos) -> Option<Chest> {
        let index = self
            .chests
            .iter()
            .position(|chest| chest.position == position)?;
        Some(self.chests.remove(index))
    }

    pub fn sign_at(&self, position: TilePos) -> Option<&Sign> {
        self.signs.iter().find(|sign| sign.position == position)
    }

    pub fn put_sign(&mut self, sign: Sign) -> Option<Sign> {
        match self.signs.iter_mut().find(|s| s.position == sign.position) {
            Some(existing) => Some(std::mem::replace(existing, sign)),
            None => {
                self.signs.push(sign);
                None
            }
        }
    }

    pub fn remove_sign_at(&mut self, position: TilePos) -> Option<Sign> {
        let index = self
            .signs
            .iter()
            .position(|sign| sign.position == position)?;
        Some(self.signs.remove(index))
    }

    pub fn npc_named(&self, name: &str) -> Option<&Npc> {
        self.npcs.iter().find(|npc| npc.name == name)
    }

    pub fn npc_name_for(&self, npc_type: u16) -> Option<&str> {
        self.npc_names
            .iter()
            .find(|entry| entry.npc_type == npc_type)
            .map(|entry| entry.name.as_str())
    }

    pub fn set_npc_name(&mut self, npc_type: u16, name: impl Into<String>) {
        let name = name.into();
        match self
            .npc_names
            .iter_mut()
            .find(|entry| entry.npc_type == npc_type)
        {
            Some(entry) => entry.name = name,
            None => self.npc_names.push(NpcName { npc_type, name }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chests.is_empty()
            && self.signs.is_empty()
            && self.npcs.is_empty()
            && self.npc_names.is_empty()
    }
}
