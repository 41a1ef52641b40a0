//! The player's inventory.

/// Items the player has picked up, in pickup order.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    items: Vec<String>,
    /// Panel shown while the inventory key is held.
    pub visible: bool,
}

impl Inventory {
    /// Empty and hidden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `item`.
    pub fn add(&mut self, item: impl Into<String>) {
        let item = item.into();
        log::info!("picked up: {item}");
        self.items.push(item);
    }

    /// Items in pickup order.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// How many copies of `item` are held.
    pub fn count_of(&self, item: &str) -> usize {
        self.items.iter().filter(|i| *i == item).count()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Nothing picked up yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Slots to draw: never fewer than three.
    pub fn slot_count(&self) -> usize {
        self.items.len().max(3)
    }
}
