// src/map_data.rs
//! In-memory map model produced by the loader.

use crate::spatial::TileId;
use macroquad::prelude::*;
use std::collections::HashMap;

/// Typed value of a custom property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `bool`.
    Bool(bool),
    /// `int` and `object` references.
    I64(i64),
    /// `float`.
    F32(f32),
    /// `string`, `file`, `color` and `class`.
    String(String),
}

/// String-keyed property bag attached to maps, layers, tilesets and objects.
///
/// Lookups never fail: a missing key or a value of another type yields `None`
/// (or the supplied default for the `*_or` accessors).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    values: HashMap<String, PropertyValue>,
}

impl Properties {
    /// Empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.values.insert(name.into(), value);
    }

    /// Raw value of `name`.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Whether `name` is set.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// No properties.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a bool property.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Value of an int property.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            PropertyValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Int property that fits in `i32`.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    /// Integers are widened so `scale: 2` and `scale: 2.0` read the same.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        match self.values.get(name)? {
            PropertyValue::F32(v) => Some(*v),
            PropertyValue::I64(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Value of a string-like property.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            PropertyValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Bool property or `default`.
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get_bool(name).unwrap_or(default)
    }

    /// Numeric property or `default`.
    pub fn f32_or(&self, name: &str, default: f32) -> f32 {
        self.get_f32(name).unwrap_or(default)
    }
}

/// One atlas image cut into a regular grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    /// Gid of the first tile.
    pub first_gid: u32,
    /// Tileset name.
    pub name: String,
    /// Tiles in the atlas.
    pub tile_count: u32,
    /// Tiles per atlas row.
    pub columns: u32,
    /// Tile width in pixels.
    pub tile_w: u32,
    /// Tile height in pixels.
    pub tile_h: u32,
    /// Pixels between tiles.
    pub spacing: u32,
    /// Pixels around the atlas edge.
    pub margin: u32,
    /// Image path relative to the map document.
    pub image: String,
    /// Custom properties.
    pub properties: Properties,
}

impl Tileset {
    /// Source rectangle of a tileset-local tile index inside the atlas.
    pub fn source_rect(&self, local: u32) -> Rect {
        let cols = self.columns.max(1);
        let col = local % cols;
        let row = local / cols;
        let sx = self.margin + col * (self.tile_w + self.spacing);
        let sy = self.margin + row * (self.tile_h + self.spacing);
        Rect::new(sx as f32, sy as f32, self.tile_w as f32, self.tile_h as f32)
    }
}

/// A grid of encoded tile references. Cells are stored row-major.
#[derive(Debug, Clone)]
pub struct TileLayer {
    /// Layer name.
    pub name: String,
    /// Position of this layer in the document's layer list (draw order).
    pub z: usize,
    /// Width in cells.
    pub width: usize,
    /// Height in cells.
    pub height: usize,
    /// Authored visibility; hidden layers are not drawn.
    pub visible: bool,
    /// Draw alpha.
    pub opacity: f32,
    /// Pixel offset of the whole layer.
    pub offset: Vec2,
    /// Custom properties.
    pub properties: Properties,
    /// `width * height` encoded cells.
    pub cells: Vec<TileId>,
}

const COLLISION_NAME_HINTS: [&str; 3] = ["collision", "solid", "wall"];

impl TileLayer {
    /// Cell at `(col, row)`. Out-of-range cells are empty.
    pub fn tile(&self, col: usize, row: usize) -> TileId {
        if col >= self.width || row >= self.height {
            return TileId(0);
        }
        self.cells[row * self.width + col]
    }

    /// Whether every non-empty cell of this layer blocks movement.
    pub fn is_collidable(&self) -> bool {
        let lower = self.name.to_lowercase();
        COLLISION_NAME_HINTS.iter().any(|hint| lower.contains(hint))
            || self.properties.bool_or("collision", false)
    }
}

/// Objects authored on one layer.
#[derive(Debug, Clone)]
pub struct ObjectLayer {
    /// Layer name.
    pub name: String,
    /// Position in the document's layer list.
    pub z: usize,
    /// Authored visibility.
    pub visible: bool,
    /// Custom properties.
    pub properties: Properties,
    /// In authored order.
    pub objects: Vec<MapObject>,
}

/// A freely positioned rectangle authored on an object layer.
#[derive(Debug, Clone)]
pub struct MapObject {
    /// Tiled object id.
    pub id: u32,
    /// Object name.
    pub name: String,
    /// Tiled `type` / `class`.
    pub kind: String,
    /// Top-left corner in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width before scaling.
    pub width: f32,
    /// Height before scaling.
    pub height: f32,
    /// Degrees, as authored.
    pub rotation: f32,
    /// Live for doors: toggled by interaction.
    pub visible: bool,
    /// Tile drawn for tile objects.
    pub gid: Option<TileId>,
    /// Custom properties.
    pub properties: Properties,
}

impl MapObject {
    /// Integer-ish scale factor, never below 1.
    pub fn scale(&self) -> f32 {
        self.properties.f32_or("scale", 1.0).max(1.0)
    }

    /// World-space bounds with the `scale` property applied.
    pub fn rect(&self) -> Rect {
        let s = self.scale();
        Rect::new(self.x, self.y, self.width * s, self.height * s)
    }

    /// `solid` property set.
    pub fn is_solid(&self) -> bool {
        self.properties.bool_or("solid", false)
    }

    /// `interactive` property set.
    pub fn is_interactive(&self) -> bool {
        self.properties.bool_or("interactive", false)
    }
}

/// Immutable, format-agnostic result of loading one map document.
#[derive(Debug, Clone)]
pub struct MapData {
    /// Size in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Tile size in pixels.
    pub tile_w: u32,
    /// Tile height in pixels.
    pub tile_h: u32,
    /// Map-level custom properties.
    pub properties: Properties,
    /// Sorted by `first_gid`.
    pub tilesets: Vec<Tileset>,
    /// Draw order: array order.
    pub tile_layers: Vec<TileLayer>,
    /// Object layers in document order.
    pub object_layers: Vec<ObjectLayer>,
}

impl MapData {
    /// Map size in pixels.
    pub fn pixel_size(&self) -> Vec2 {
        vec2(
            (self.width * self.tile_w) as f32,
            (self.height * self.tile_h) as f32,
        )
    }

    /// Owning tileset of an encoded cell value plus the tile's local index.
    pub fn tileset_for(&self, id: TileId) -> Option<(usize, &Tileset, u32)> {
        let idx = crate::spatial::resolve_tileset(&self.tilesets, id)?;
        let ts = &self.tilesets[idx];
        Some((idx, ts, id.clean() - ts.first_gid))
    }

    /// Every object of every object layer, in layer order.
    pub fn objects(&self) -> impl Iterator<Item = &MapObject> {
        self.object_layers.iter().flat_map(|l| l.objects.iter())
    }

    /// First tile layer called `name`.
    pub fn layer_by_name(&self, name: &str) -> Option<&TileLayer> {
        self.tile_layers.iter().find(|l| l.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str, props: Properties) -> TileLayer {
        TileLayer {
            name: name.to_owned(),
            z: 0,
            width: 1,
            height: 1,
            visible: true,
            opacity: 1.0,
            offset: Vec2::ZERO,
            properties: props,
            cells: vec![TileId(1)],
        }
    }

    #[test]
    fn collision_layers_are_detected_by_name_or_property() {
        assert!(layer("Collision", Properties::new()).is_collidable());
        assert!(layer("outer_WALLS", Properties::new()).is_collidable());
        assert!(layer("solids", Properties::new()).is_collidable());
        assert!(!layer("decoration", Properties::new()).is_collidable());

        let mut props = Properties::new();
        props.insert("collision", PropertyValue::Bool(true));
        assert!(layer("rocks", props).is_collidable());
    }

    #[test]
    fn typed_accessors_do_not_coerce_strings() {
        let mut props = Properties::new();
        props.insert("solid", PropertyValue::String("true".into()));
        props.insert("scale", PropertyValue::I64(2));
        assert_eq!(props.get_bool("solid"), None);
        assert!(!props.bool_or("solid", false));
        assert_eq!(props.get_f32("scale"), Some(2.0));
        assert_eq!(props.get_i32("missing"), None);
    }

    #[test]
    fn object_rect_applies_scale_with_floor_of_one() {
        let mut props = Properties::new();
        props.insert("scale", PropertyValue::F32(0.5));
        let obj = MapObject {
            id: 1,
            name: "door".into(),
            kind: String::new(),
            x: 10.0,
            y: 20.0,
            width: 16.0,
            height: 32.0,
            rotation: 0.0,
            visible: true,
            gid: None,
            properties: props,
        };
        assert_eq!(obj.rect(), Rect::new(10.0, 20.0, 16.0, 32.0));
    }

    #[test]
    fn source_rect_honours_margin_and_spacing() {
        let ts = Tileset {
            first_gid: 1,
            name: "t".into(),
            tile_count: 8,
            columns: 4,
            tile_w: 16,
            tile_h: 16,
            spacing: 2,
            margin: 1,
            image: "t.png".into(),
            properties: Properties::new(),
        };
        assert_eq!(ts.source_rect(5), Rect::new(19.0, 19.0, 16.0, 16.0));
    }
}
