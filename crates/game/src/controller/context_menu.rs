use engine::{ScreenRect, Vec2};

use crate::error::InventoryError;
use crate::item::{Item, ItemId, ItemKind, StackQuantity};
use crate::world::{GameWorld, SourceLocation, TransferTarget};

use super::modal::{ModalKind, ModalStack};

pub const MENU_WIDTH_PX: i32 = 150;
pub const MENU_ROW_PX: i32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Use,
    Reload,
    Equip,
    Unequip,
    TurnOn,
    TurnOff,
    Open,
    Read,
    Grab,
    PlaceOnBackpack,
    Drop,
    DropOne,
    DropAll,
    SendAllToBackpack,
    SendAllToUtility,
    SendAllToInventory,
}

impl MenuOption {
    pub fn label(self) -> &'static str {
        match self {
            Self::Use => "Use",
            Self::Reload => "Reload",
            Self::Equip => "Equip",
            Self::Unequip => "Unequip",
            Self::TurnOn => "Turn on",
            Self::TurnOff => "Turn off",
            Self::Open => "Open",
            Self::Read => "Read",
            Self::Grab => "Grab",
            Self::PlaceOnBackpack => "Place on Backpack",
            Self::Drop => "Drop",
            Self::DropOne => "Drop one",
            Self::DropAll => "Drop all",
            Self::SendAllToBackpack => "Send all to Backpack",
            Self::SendAllToUtility => "Send all to Utility",
            Self::SendAllToInventory => "Send all to Inventory",
        }
    }

    fn is_drop(self) -> bool {
        matches!(self, Self::Drop | Self::DropOne | Self::DropAll)
    }

    fn is_send_all(self) -> bool {
        matches!(
            self,
            Self::SendAllToBackpack | Self::SendAllToUtility | Self::SendAllToInventory
        )
    }
}

/// Options offered for `item` where it currently sits.
pub fn options_for(item: &Item, source: &SourceLocation) -> Vec<MenuOption> {
    use MenuOption::*;

    if item.is_corpse() {
        return vec![Open];
    }
    let mut options = match item.kind() {
        ItemKind::Text | ItemKind::Skill => vec![Read],
        ItemKind::Consumable if item.is_ammo() => vec![Reload],
        ItemKind::Consumable => vec![Use],
        ItemKind::Utility | ItemKind::Mobile => {
            let mut options = vec![if item.is_on() { TurnOff } else { TurnOn }];
            if item.utility().is_some_and(|attrs| attrs.fuel.is_some()) {
                options.push(Reload);
            }
            if item.kind() == ItemKind::Mobile {
                options.push(Open);
            }
            if item.text().is_some() {
                options.push(Read);
            }
            options
        }
        ItemKind::Backpack => vec![Open, Equip],
        ItemKind::Container => vec![Open],
        ItemKind::WeaponMelee | ItemKind::WeaponRanged | ItemKind::Tool | ItemKind::Cloth => {
            vec![Equip]
        }
    };
    options.push(Drop);
    if item.is_stackable() {
        options.extend([
            DropOne,
            DropAll,
            SendAllToBackpack,
            SendAllToUtility,
            SendAllToInventory,
        ]);
    }

    if source.is_equipped_slot() {
        options.retain(|option| *option != Equip);
        options.push(Unequip);
    }
    if source.is_outside_player() {
        options.retain(|option| !option.is_drop() && !option.is_send_all());
        options.extend([Grab, PlaceOnBackpack]);
    }
    options
}

/// What a menu was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuSubject {
    Slot(SourceLocation),
    /// A container built into the map; it can only be opened.
    WorldContainer(ItemId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    pub subject: MenuSubject,
    pub anchor: Vec2,
    pub options: Vec<MenuOption>,
}

impl ContextMenu {
    pub fn for_slot(world: &GameWorld, source: SourceLocation, anchor: Vec2) -> Option<Self> {
        let item = world.item_at(&source)?;
        let options = options_for(item, &source);
        Some(Self {
            subject: MenuSubject::Slot(source),
            anchor,
            options,
        })
    }

    pub fn for_world_container(id: ItemId, anchor: Vec2) -> Self {
        Self {
            subject: MenuSubject::WorldContainer(id),
            anchor,
            options: vec![MenuOption::Open],
        }
    }

    pub fn option_rect(&self, row: usize) -> ScreenRect {
        ScreenRect::new(
            self.anchor.x as i32,
            self.anchor.y as i32 + row as i32 * MENU_ROW_PX,
            MENU_WIDTH_PX,
            MENU_ROW_PX,
        )
    }

    pub fn rect(&self) -> ScreenRect {
        ScreenRect::new(
            self.anchor.x as i32,
            self.anchor.y as i32,
            MENU_WIDTH_PX,
            self.options.len() as i32 * MENU_ROW_PX,
        )
    }

    pub fn option_at(&self, point: Vec2) -> Option<MenuOption> {
        (0..self.options.len())
            .find(|row| self.option_rect(*row).contains(point))
            .map(|row| self.options[row])
    }
}

fn open_container(world: &GameWorld, modals: &mut ModalStack, id: ItemId) -> Result<(), InventoryError> {
    if world.container(id).is_none() {
        return Err(InventoryError::NoItem);
    }
    modals.open(ModalKind::Container(id));
    Ok(())
}

/// Runs the chosen option. Errors leave the world untouched.
pub fn apply_option(
    world: &mut GameWorld,
    modals: &mut ModalStack,
    subject: &MenuSubject,
    option: MenuOption,
) -> Result<(), InventoryError> {
    let source = match subject {
        MenuSubject::WorldContainer(id) => return open_container(world, modals, *id),
        MenuSubject::Slot(source) => source,
    };
    match option {
        MenuOption::Use => world.use_item(source),
        MenuOption::Reload => {
            let item = world.item_at(source).ok_or(InventoryError::NoItem)?;
            if item.utility().is_some() {
                world.reload_utility(source)
            } else {
                world.request_reload()
            }
        }
        MenuOption::Equip => world.equip(source),
        MenuOption::Unequip => world.unequip(source),
        MenuOption::TurnOn => world.set_utility_power(source, true),
        MenuOption::TurnOff => world.set_utility_power(source, false),
        MenuOption::Open => {
            let item = world.item_at(source).ok_or(InventoryError::NoItem)?;
            if !item.is_container() {
                return Err(InventoryError::NotUsable(item.name.clone()));
            }
            let id = item.id;
            open_container(world, modals, id)
        }
        MenuOption::Read => {
            let text = world.read_item(source)?;
            world.notify(text);
            Ok(())
        }
        MenuOption::Grab => world.grab(source, false),
        MenuOption::PlaceOnBackpack => world.place_on_backpack(source),
        MenuOption::Drop => world.drop_item(source),
        MenuOption::DropOne => world.drop_item_stack(source, StackQuantity::One),
        MenuOption::DropAll => world.drop_item_stack(source, StackQuantity::All),
        MenuOption::SendAllToBackpack => world.transfer_item_stack(source, TransferTarget::Backpack),
        MenuOption::SendAllToUtility => world.transfer_item_stack(source, TransferTarget::Utility),
        MenuOption::SendAllToInventory => world.transfer_item_stack(source, TransferTarget::Inventory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ConsumableAttrs, ItemAttrs, ItemId, MeleeAttrs};

    fn stack() -> Item {
        Item::new(ItemId(1), "Matches", ItemAttrs::Consumable(ConsumableAttrs::default()))
            .with_capacity(10)
            .with_load(4)
    }

    #[test]
    fn carried_stack_offers_drop_and_send_variants() {
        let options = options_for(&stack(), &SourceLocation::Inventory(0));
        assert_eq!(options[0], MenuOption::Use);
        assert!(options.contains(&MenuOption::DropOne));
        assert!(options.contains(&MenuOption::SendAllToBackpack));
        assert!(!options.contains(&MenuOption::Grab));
    }

    #[test]
    fn ground_items_swap_drop_for_grab() {
        let options = options_for(&stack(), &SourceLocation::Ground(0));
        assert!(!options.iter().any(|option| option.is_drop()));
        assert!(options.contains(&MenuOption::Grab));
        assert!(options.contains(&MenuOption::PlaceOnBackpack));
    }

    #[test]
    fn belt_weapon_offers_unequip_not_equip() {
        let bat = Item::new(
            ItemId(2),
            "Bat",
            ItemAttrs::WeaponMelee(MeleeAttrs {
                damage: engine::ValueRange::new(6.0, 9.0),
            }),
        );
        let options = options_for(&bat, &SourceLocation::Belt(0));
        assert_eq!(
            options,
            vec![MenuOption::Drop, MenuOption::Unequip]
        );
        assert_eq!(
            options_for(&bat, &SourceLocation::Inventory(0)),
            vec![MenuOption::Equip, MenuOption::Drop]
        );
    }

    #[test]
    fn menu_rows_hit_test_by_option() {
        let menu = ContextMenu {
            subject: MenuSubject::Slot(SourceLocation::Inventory(0)),
            anchor: Vec2::new(100.0, 100.0),
            options: vec![MenuOption::Use, MenuOption::Drop],
        };
        assert_eq!(menu.option_at(Vec2::new(110.0, 105.0)), Some(MenuOption::Use));
        assert_eq!(menu.option_at(Vec2::new(110.0, 125.0)), Some(MenuOption::Drop));
        assert_eq!(menu.option_at(Vec2::new(110.0, 140.0)), None);
    }
}
