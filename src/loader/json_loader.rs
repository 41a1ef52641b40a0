// src/loader/json_loader.rs
//! Tiled JSON (`.json` / `.tmj`) map loading.

use crate::error::MapError;
use crate::map_data::*;
use crate::spatial::{resolve_tileset, TileId};
use macroquad::prelude::*;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(default)]
    data: Vec<u32>,
    #[serde(default)]
    chunks: Vec<JsonChunk>,
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default = "one")]
    opacity: f32,
    #[serde(default)]
    offsetx: f32,
    #[serde(default)]
    offsety: f32,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>, // "tilelayer" when absent
    #[serde(default)]
    properties: JsonProperties,
    #[serde(default)]
    objects: Vec<JsonObject>,
    #[serde(default)]
    layers: Vec<JsonLayer>, // group layers
}

fn default_true() -> bool {
    true
}
fn one() -> f32 {
    1.0
}

#[derive(Deserialize)]
struct JsonChunk {
    x: i32,
    y: i32,
    width: usize,
    height: usize,
    #[serde(default)]
    data: Vec<u32>,
}

/// Either an inline tileset or a reference to an external one.
#[derive(Deserialize)]
struct JsonTilesetRef {
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    #[serde(flatten)]
    inline: JsonTileset,
}

#[derive(Deserialize, Default)]
struct JsonTileset {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tilewidth: u32,
    #[serde(default)]
    tileheight: u32,
    #[serde(default)]
    tilecount: u32,
    #[serde(default)]
    columns: u32,
    #[serde(default)]
    image: String,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    properties: JsonProperties,
}

#[derive(Deserialize)]
struct JsonMap {
    width: Option<u32>,
    height: Option<u32>,
    tilewidth: Option<u32>,
    tileheight: Option<u32>,
    #[serde(default)]
    infinite: bool,
    layers: Option<Vec<JsonLayer>>,
    #[serde(default)]
    tilesets: Vec<JsonTilesetRef>,
    #[serde(default)]
    properties: JsonProperties,
}

/// Tiled writes `[{name, type, value}]`; hand-authored maps often use a plain object.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonProperties {
    List(Vec<JsonProperty>),
    Map(serde_json::Map<String, JsonValue>),
}

impl Default for JsonProperties {
    fn default() -> Self {
        JsonProperties::List(Vec::new())
    }
}

#[derive(Deserialize)]
struct JsonProperty {
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    value: JsonValue,
}

#[derive(Deserialize)]
struct JsonObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    gid: Option<u32>,
    #[serde(default)]
    properties: JsonProperties,
}

fn json_property_to_ir(prop: JsonProperty) -> Result<Option<(String, PropertyValue)>, MapError> {
    let JsonProperty { name, kind, value } = prop;

    let parsed = match kind.as_deref() {
        Some("bool") => value.as_bool().map(PropertyValue::Bool),
        Some("int") | Some("object") => value.as_i64().map(PropertyValue::I64),
        Some("float") => value.as_f64().map(|n| PropertyValue::F32(n as f32)),
        Some("string") | Some("file") | Some("color") => {
            value.as_str().map(|s| PropertyValue::String(s.to_owned()))
        }
        // class values are nested objects; keep them as a JSON string
        Some("class") => Some(PropertyValue::String(match value.as_str() {
            Some(s) => s.to_owned(),
            None => value.to_string(),
        })),
        Some(other) => {
            return Err(MapError::UnsupportedPropertyType {
                name,
                kind: other.to_owned(),
            });
        }
        None => untyped_value(&value),
    };

    Ok(parsed.map(|value| (name, value)))
}

fn untyped_value(value: &JsonValue) -> Option<PropertyValue> {
    if let Some(v) = value.as_bool() {
        Some(PropertyValue::Bool(v))
    } else if let Some(v) = value.as_i64() {
        Some(PropertyValue::I64(v))
    } else if let Some(v) = value.as_f64() {
        Some(PropertyValue::F32(v as f32))
    } else if let Some(s) = value.as_str() {
        Some(PropertyValue::String(s.to_owned()))
    } else if value.is_object() {
        Some(PropertyValue::String(value.to_string()))
    } else {
        None
    }
}

fn properties_from_json(props: JsonProperties) -> Result<Properties, MapError> {
    let mut out = Properties::new();
    match props {
        JsonProperties::List(list) => {
            for p in list {
                if let Some((name, value)) = json_property_to_ir(p)? {
                    out.insert(name, value);
                }
            }
        }
        JsonProperties::Map(map) => {
            for (name, value) in map {
                if let Some(value) = untyped_value(&value) {
                    out.insert(name, value);
                }
            }
        }
    }
    Ok(out)
}

fn object_to_ir(obj: JsonObject) -> Result<MapObject, MapError> {
    let kind = if !obj.class.is_empty() {
        obj.class
    } else {
        obj.kind
    };

    // Tile objects are anchored bottom-left in Tiled.
    let y = if obj.gid.is_some() {
        obj.y - obj.height
    } else {
        obj.y
    };

    Ok(MapObject {
        id: obj.id,
        name: obj.name,
        kind,
        x: obj.x,
        y,
        width: obj.width,
        height: obj.height,
        rotation: obj.rotation,
        visible: obj.visible,
        gid: obj.gid.map(TileId),
        properties: properties_from_json(obj.properties)?,
    })
}

fn tileset_to_ir(first_gid: u32, ts: JsonTileset) -> Result<Tileset, MapError> {
    Ok(Tileset {
        first_gid,
        name: ts.name,
        tile_count: ts.tilecount,
        columns: ts.columns,
        tile_w: ts.tilewidth,
        tile_h: ts.tileheight,
        spacing: ts.spacing,
        margin: ts.margin,
        image: ts.image,
        properties: properties_from_json(ts.properties)?,
    })
}

/// Loads a map document held in memory.
///
/// External tileset references cannot be followed from here; they keep their
/// `firstgid` range (so gids still resolve) with the `source` recorded as image.
pub fn load_map_str(json: &str) -> Result<MapData, MapError> {
    decode(json, None)
}

/// Loads a `.json`/`.tmj` map document, following external tileset files
/// relative to the map's directory. Returns the map and that directory.
pub fn load_map_file(path: impl AsRef<Path>) -> Result<(MapData, PathBuf), MapError> {
    let p = path.as_ref();
    match p.extension().and_then(|e| e.to_str()) {
        Some("json") | Some("tmj") => {}
        _ => return Err(MapError::UnsupportedFormat(p.to_path_buf())),
    }

    let txt = std::fs::read_to_string(p).map_err(|source| MapError::Io {
        path: p.to_path_buf(),
        source,
    })?;

    let map_dir = p
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));

    let map = decode(&txt, Some(&map_dir))?;
    Ok((map, map_dir))
}

fn required(value: Option<u32>, field: &str) -> Result<u32, MapError> {
    match value {
        Some(v) if v > 0 => Ok(v),
        Some(_) => Err(MapError::Malformed(format!("'{field}' must be positive"))),
        None => Err(MapError::Malformed(format!("missing '{field}'"))),
    }
}

fn decode(txt: &str, map_dir: Option<&Path>) -> Result<MapData, MapError> {
    let value: JsonValue = serde_json::from_str(txt)?;
    let j: JsonMap =
        serde_json::from_value(value).map_err(|e| MapError::Malformed(e.to_string()))?;

    let tile_w = required(j.tilewidth, "tilewidth")?;
    let tile_h = required(j.tileheight, "tileheight")?;
    let json_layers = match j.layers {
        Some(l) if !l.is_empty() => l,
        _ => return Err(MapError::Malformed("map has no layers".into())),
    };

    // Build IR tilesets
    let mut tilesets = Vec::with_capacity(j.tilesets.len());
    for ts in j.tilesets {
        let body = match (&ts.source, map_dir) {
            (Some(source), Some(dir)) => read_external_tileset(&dir.join(source))?,
            (Some(source), None) => JsonTileset {
                name: source.clone(),
                image: source.clone(),
                ..ts.inline
            },
            (None, _) => ts.inline,
        };
        tilesets.push(tileset_to_ir(ts.firstgid, body)?);
    }

    // Sort by first_gid so lookups can binary search
    tilesets.sort_by_key(|t| t.first_gid);

    let mut flat = Vec::new();
    flatten_layers(json_layers, &mut flat);

    let (width, height, chunk_origin) = if j.infinite {
        chunk_extents(&flat)
    } else {
        (required(j.width, "width")?, required(j.height, "height")?, (0, 0))
    };

    let mut tile_layers = Vec::new();
    let mut object_layers = Vec::new();
    for (z, l) in flat.into_iter().enumerate() {
        let properties = properties_from_json(l.properties)?;
        match l.kind.as_deref().unwrap_or("tilelayer") {
            "tilelayer" => {
                let (lw, lh, data) = if l.chunks.is_empty() {
                    let lw = if l.width == 0 { width as usize } else { l.width };
                    let lh = if l.height == 0 { height as usize } else { l.height };
                    (lw, lh, l.data)
                } else {
                    let data = assemble_chunks(&l.chunks, width as usize, height as usize, chunk_origin);
                    (width as usize, height as usize, data)
                };

                if data.len() != lw * lh {
                    return Err(MapError::InvalidLayerSize {
                        layer: l.name,
                        expected: lw * lh,
                        actual: data.len(),
                    });
                }

                let cells: Vec<TileId> = data.into_iter().map(TileId).collect();
                for (index, id) in cells.iter().enumerate() {
                    if !id.is_empty() && resolve_tileset(&tilesets, *id).is_none() {
                        return Err(MapError::UnresolvedTileset {
                            layer: l.name,
                            index,
                            gid: id.clean(),
                        });
                    }
                }

                tile_layers.push(TileLayer {
                    name: l.name,
                    z,
                    width: lw,
                    height: lh,
                    visible: l.visible,
                    opacity: l.opacity,
                    offset: vec2(l.offsetx, l.offsety),
                    properties,
                    cells,
                });
            }
            "objectgroup" => {
                let mut objects = Vec::with_capacity(l.objects.len());
                for obj in l.objects {
                    if let Some(raw_gid) = obj.gid {
                        if resolve_tileset(&tilesets, TileId(raw_gid)).is_none() {
                            return Err(MapError::UnresolvedTileset {
                                layer: l.name,
                                index: objects.len(),
                                gid: TileId(raw_gid).clean(),
                            });
                        }
                    }
                    objects.push(object_to_ir(obj)?);
                }
                object_layers.push(ObjectLayer {
                    name: l.name,
                    z,
                    visible: l.visible,
                    properties,
                    objects,
                });
            }
            other => {
                log::debug!("skipping layer '{}' of unsupported type '{}'", l.name, other);
            }
        }
    }

    Ok(MapData {
        width,
        height,
        tile_w,
        tile_h,
        properties: properties_from_json(j.properties)?,
        tilesets,
        tile_layers,
        object_layers,
    })
}

fn read_external_tileset(path: &Path) -> Result<JsonTileset, MapError> {
    let ext = path.extension().and_then(|e| e.to_str());
    if !matches!(ext, Some("json") | Some("tsj")) {
        return Err(MapError::UnsupportedFormat(path.to_path_buf()));
    }
    let txt = std::fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: JsonValue = serde_json::from_str(&txt)?;
    serde_json::from_value(value)
        .map_err(|e| MapError::Malformed(format!("tileset {}: {e}", path.display())))
}

/// Group layers contribute their children in place.
fn flatten_layers(layers: Vec<JsonLayer>, out: &mut Vec<JsonLayer>) {
    for mut l in layers {
        if l.kind.as_deref() == Some("group") {
            let children = std::mem::take(&mut l.layers);
            flatten_layers(children, out);
        } else {
            out.push(l);
        }
    }
}

/// Union of every chunk across all tile layers: (width, height, min corner).
fn chunk_extents(layers: &[JsonLayer]) -> (u32, u32, (i32, i32)) {
    let mut chunks = layers.iter().flat_map(|l| l.chunks.iter()).peekable();
    if chunks.peek().is_none() {
        return (0, 0, (0, 0));
    }
    let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
    for c in chunks {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x + c.width as i32);
        max_y = max_y.max(c.y + c.height as i32);
    }
    ((max_x - min_x) as u32, (max_y - min_y) as u32, (min_x, min_y))
}

fn assemble_chunks(chunks: &[JsonChunk], width: usize, height: usize, origin: (i32, i32)) -> Vec<u32> {
    let mut data = vec![0u32; width * height];
    for c in chunks {
        for r in 0..c.height {
            for col in 0..c.width {
                let Some(&gid) = c.data.get(r * c.width + col) else {
                    continue;
                };
                let x = c.x - origin.0 + col as i32;
                let y = c.y - origin.1 + r as i32;
                if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                    data[y as usize * width + x as usize] = gid;
                }
            }
        }
    }
    data
}
