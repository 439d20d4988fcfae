use engine::MapLoadError;
use thiserror::Error;

/// Rejection of a player-facing inventory operation. The `Display` text is
/// what the player reads in the message log; state is unchanged on `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("Your belt is full.")]
    BeltFull,
    #[error("Your inventory is full.")]
    InventoryFull,
    #[error("{0} is full.")]
    ContainerFull(String),
    #[error("Only backpacks fit in the backpack slot.")]
    NotABackpack,
    #[error("That does not fit in the utility slot.")]
    NotUtility,
    #[error("Backpacks cannot go on the belt.")]
    BackpackOnBelt,
    #[error("A container cannot hold itself.")]
    ContainerIntoItself,
    #[error("That item cannot be split.")]
    NotSplittable,
    #[error("There is nothing there.")]
    NoItem,
    #[error("That slot is taken.")]
    SlotOccupied,
    #[error("Wait a moment before dropping again.")]
    DropCooldown,
    #[error("There is no room to put that down.")]
    NoFreeTile,
    #[error("Already reloading.")]
    AlreadyReloading,
    #[error("No weapon that takes ammo is equipped.")]
    NoAmmoWeapon,
    #[error("The magazine is already full.")]
    MagazineFull,
    #[error("No matching ammo.")]
    NoAmmo,
    #[error("That is too far away.")]
    TooFar,
    #[error("Nothing to grab nearby.")]
    NothingToGrab,
    #[error("You can't use {0}.")]
    NotUsable(String),
    #[error("That is not worn there.")]
    WrongWornSlot,
    #[error("Too tired to swing.")]
    NoStamina,
    #[error("Nothing to hit.")]
    NoTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DoorError {
    #[error("That is not a door.")]
    NotADoor,
    #[error("Something is in the doorway.")]
    PlayerInDoorway,
    #[error("tile ({x}, {y}) is outside the map")]
    OutOfBounds { x: i32, y: i32 },
}

#[derive(Debug, Error)]
pub enum WorldLoadError {
    #[error(transparent)]
    Maps(#[from] MapLoadError),
    #[error("no layer-1 map found for start chunk {chunk}")]
    StartChunkMissing { chunk: u32 },
    #[error("start chunk {chunk} has an empty map layer")]
    EmptyStartChunk { chunk: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_read_as_player_text() {
        assert_eq!(
            InventoryError::ContainerFull("Backpack".to_string()).to_string(),
            "Backpack is full."
        );
        assert_eq!(
            InventoryError::NotUsable("Rock".to_string()).to_string(),
            "You can't use Rock."
        );
    }
}
