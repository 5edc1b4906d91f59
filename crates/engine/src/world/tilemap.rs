use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::math::{Rect, Vec2};
use crate::content::{
    format_tile_key, parse_tile_key, LevelError, LevelFile, OffgridRecord, TileRecord,
};

/// 3x3 neighborhood in the order every query walks it.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 0),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Decor,
    LargeDecor,
    Grass,
    Stone,
    #[serde(alias = "spawner")]
    Spawners,
}

impl TileKind {
    pub const ALL: [TileKind; 5] = [
        TileKind::Decor,
        TileKind::LargeDecor,
        TileKind::Grass,
        TileKind::Stone,
        TileKind::Spawners,
    ];

    pub fn is_solid(self) -> bool {
        matches!(self, TileKind::Grass | TileKind::Stone)
    }

    pub fn is_autotiled(self) -> bool {
        matches!(self, TileKind::Grass | TileKind::Stone)
    }

    /// Asset table key holding this kind's variant images.
    pub fn asset_key(self) -> &'static str {
        match self {
            TileKind::Decor => "decor",
            TileKind::LargeDecor => "large_decor",
            TileKind::Grass => "grass",
            TileKind::Stone => "stone",
            TileKind::Spawners => "spawners",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `None` past the edge of the `i32` grid.
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }
}

/// Packed cell key: high 32 bits hold x, low 32 bits hold y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey(u64);

impl TileKey {
    pub fn pack(coord: TileCoord) -> Self {
        Self(((coord.x as u32 as u64) << 32) | coord.y as u32 as u64)
    }

    pub fn unpack(self) -> TileCoord {
        TileCoord::new((self.0 >> 32) as u32 as i32, self.0 as u32 as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub kind: TileKind,
    pub variant: u32,
    pub pos: TileCoord,
}

/// Free-floating tile. `pos` keeps the editor's value exactly; the
/// simulation works from [`OffgridTile::pixel_pos`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffgridTile {
    pub kind: TileKind,
    pub variant: u32,
    pub pos: [f64; 2],
}

impl OffgridTile {
    pub fn pixel_pos(&self) -> Vec2 {
        Vec2::new(self.pos[0] as f32, self.pos[1] as f32)
    }
}

/// A tile pulled out of the map by [`Tilemap::extract`], in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedTile {
    pub kind: TileKind,
    pub variant: u32,
    pub pos: Vec2,
}

const NEIGHBOR_RIGHT: u8 = 1;
const NEIGHBOR_LEFT: u8 = 1 << 1;
const NEIGHBOR_DOWN: u8 = 1 << 2;
const NEIGHBOR_UP: u8 = 1 << 3;

const CARDINAL_NEIGHBORS: [((i32, i32), u8); 4] = [
    ((1, 0), NEIGHBOR_RIGHT),
    ((-1, 0), NEIGHBOR_LEFT),
    ((0, 1), NEIGHBOR_DOWN),
    ((0, -1), NEIGHBOR_UP),
];

/// Neighbor pattern to variant. Patterns with no entry (empty, single
/// neighbor, straight runs) leave the tile's variant as authored.
fn autotile_variant(mask: u8) -> Option<u32> {
    const R: u8 = NEIGHBOR_RIGHT;
    const L: u8 = NEIGHBOR_LEFT;
    const D: u8 = NEIGHBOR_DOWN;
    const U: u8 = NEIGHBOR_UP;

    match mask {
        m if m == R | D => Some(0),
        m if m == R | D | L => Some(1),
        m if m == L | D => Some(2),
        m if m == L | U | D => Some(3),
        m if m == L | U => Some(4),
        m if m == L | U | R => Some(5),
        m if m == R | U => Some(6),
        m if m == R | U | D => Some(7),
        m if m == R | L | D | U => Some(8),
        _ => None,
    }
}

/// Sparse grid of tiles plus free-floating decor. Cell coordinates are
/// `floor(pixel / tile_size)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    tile_size: u32,
    tiles: HashMap<TileKey, Tile>,
    offgrid: Vec<OffgridTile>,
}

impl Tilemap {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size: tile_size.max(1),
            tiles: HashMap::new(),
            offgrid: Vec::new(),
        }
    }

    pub fn load(level: &LevelFile) -> Result<Self, LevelError> {
        if level.tile_size == 0 {
            return Err(LevelError::ZeroTileSize);
        }

        let mut tilemap = Self::new(level.tile_size);
        for (key, record) in &level.tilemap {
            let (x, y) = parse_tile_key(key)?;
            if [x, y] != record.pos {
                return Err(LevelError::KeyMismatch {
                    key: key.clone(),
                    x: record.pos[0],
                    y: record.pos[1],
                });
            }
            tilemap.insert(Tile {
                kind: record.kind,
                variant: record.variant,
                pos: TileCoord::new(x, y),
            });
        }
        tilemap.offgrid = level
            .offgrid
            .iter()
            .map(|record| OffgridTile {
                kind: record.kind,
                variant: record.variant,
                pos: record.pos,
            })
            .collect();
        Ok(tilemap)
    }

    pub fn to_level(&self) -> LevelFile {
        let tilemap = self
            .tiles
            .values()
            .map(|tile| {
                (
                    format_tile_key(tile.pos.x, tile.pos.y),
                    TileRecord {
                        kind: tile.kind,
                        variant: tile.variant,
                        pos: [tile.pos.x, tile.pos.y],
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();
        let offgrid = self
            .offgrid
            .iter()
            .map(|tile| OffgridRecord {
                kind: tile.kind,
                variant: tile.variant,
                pos: tile.pos,
            })
            .collect();
        LevelFile {
            tilemap,
            tile_size: self.tile_size,
            offgrid,
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Keyed by the tile's own position, so key and position cannot diverge.
    pub fn insert(&mut self, tile: Tile) -> Option<Tile> {
        self.tiles.insert(TileKey::pack(tile.pos), tile)
    }

    pub fn remove(&mut self, coord: TileCoord) -> Option<Tile> {
        self.tiles.remove(&TileKey::pack(coord))
    }

    pub fn get(&self, coord: TileCoord) -> Option<&Tile> {
        self.tiles.get(&TileKey::pack(coord))
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn push_offgrid(&mut self, tile: OffgridTile) {
        self.offgrid.push(tile);
    }

    pub fn offgrid(&self) -> &[OffgridTile] {
        &self.offgrid
    }

    pub fn cell_at(&self, pixel_pos: Vec2) -> TileCoord {
        let size = self.tile_size as f32;
        TileCoord::new(
            (pixel_pos.x / size).floor() as i32,
            (pixel_pos.y / size).floor() as i32,
        )
    }

    pub fn cell_rect(&self, coord: TileCoord) -> Rect {
        let size = self.tile_size as f32;
        Rect::new(coord.x as f32 * size, coord.y as f32 * size, size, size)
    }

    pub fn tiles_around(&self, pixel_pos: Vec2) -> Vec<&Tile> {
        let center = self.cell_at(pixel_pos);
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(|&(dx, dy)| center.offset(dx, dy).and_then(|coord| self.get(coord)))
            .collect()
    }

    pub fn solid_rects_around(&self, pixel_pos: Vec2) -> Vec<Rect> {
        self.tiles_around(pixel_pos)
            .into_iter()
            .filter(|tile| tile.kind.is_solid())
            .map(|tile| self.cell_rect(tile.pos))
            .collect()
    }

    pub fn is_solid_at(&self, pixel_pos: Vec2) -> bool {
        self.get(self.cell_at(pixel_pos))
            .is_some_and(|tile| tile.kind.is_solid())
    }

    /// Returns every tile matching one of `criteria`: offgrid tiles first in
    /// authored order, then grid tiles in ascending cell order. With
    /// `keep == false` the matches are removed from the map.
    pub fn extract(&mut self, criteria: &[(TileKind, u32)], keep: bool) -> Vec<ExtractedTile> {
        let matches = |kind: TileKind, variant: u32| criteria.contains(&(kind, variant));
        let mut extracted = Vec::new();

        for tile in &self.offgrid {
            if matches(tile.kind, tile.variant) {
                extracted.push(ExtractedTile {
                    kind: tile.kind,
                    variant: tile.variant,
                    pos: tile.pixel_pos(),
                });
            }
        }
        if !keep {
            self.offgrid.retain(|tile| !matches(tile.kind, tile.variant));
        }

        let mut grid_matches = self
            .tiles
            .values()
            .filter(|tile| matches(tile.kind, tile.variant))
            .map(|tile| tile.pos)
            .collect::<Vec<_>>();
        grid_matches.sort();
        for coord in grid_matches {
            let tile = if keep {
                self.get(coord).copied()
            } else {
                self.remove(coord)
            };
            if let Some(tile) = tile {
                extracted.push(ExtractedTile {
                    kind: tile.kind,
                    variant: tile.variant,
                    pos: self.cell_rect(coord).origin(),
                });
            }
        }

        extracted
    }

    /// Rewrites variants of autotiled tiles from their same-kind neighbors.
    /// Returns how many tiles were rewritten.
    pub fn autotile(&mut self) -> usize {
        let mut updates = Vec::new();
        for tile in self.tiles.values() {
            if !tile.kind.is_autotiled() {
                continue;
            }
            let mut mask = 0u8;
            for ((dx, dy), bit) in CARDINAL_NEIGHBORS {
                let same_kind = tile
                    .pos
                    .offset(dx, dy)
                    .and_then(|coord| self.get(coord))
                    .is_some_and(|neighbor| neighbor.kind == tile.kind);
                if same_kind {
                    mask |= bit;
                }
            }
            if let Some(variant) = autotile_variant(mask) {
                updates.push((tile.pos, variant));
            }
        }

        let count = updates.len();
        for (coord, variant) in updates {
            if let Some(tile) = self.tiles.get_mut(&TileKey::pack(coord)) {
                tile.variant = variant;
            }
        }
        debug!(tiles = self.tiles.len(), autotiled = count, "autotile_applied");
        count
    }

    /// Cells covered by a view of `view_size` pixels scrolled by `offset`,
    /// column-major, with one extra cell on the far edges.
    pub fn visible_tiles(&self, offset: (i32, i32), view_size: (u32, u32)) -> Vec<&Tile> {
        let size = self.tile_size as i32;
        let far_x = offset.0.saturating_add_unsigned(view_size.0);
        let far_y = offset.1.saturating_add_unsigned(view_size.1);
        let x_range = offset.0.div_euclid(size)..=far_x.div_euclid(size);
        let y_start = offset.1.div_euclid(size);
        let y_end = far_y.div_euclid(size);

        let mut visible = Vec::new();
        for x in x_range {
            for y in y_start..=y_end {
                if let Some(tile) = self.get(TileCoord::new(x, y)) {
                    visible.push(tile);
                }
            }
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{encode_level_json, parse_level_json};
    use serde_json::json;

    fn tile(kind: TileKind, x: i32, y: i32) -> Tile {
        Tile {
            kind,
            variant: 0,
            pos: TileCoord::new(x, y),
        }
    }

    fn filled(kind: TileKind, cells: &[(i32, i32)]) -> Tilemap {
        let mut tilemap = Tilemap::new(16);
        for &(x, y) in cells {
            tilemap.insert(tile(kind, x, y));
        }
        tilemap
    }

    #[test]
    fn packed_key_round_trips_extreme_coordinates() {
        for (x, y) in [(0, 0), (-1, -1), (i32::MIN, i32::MAX), (123, -456)] {
            let coord = TileCoord::new(x, y);
            assert_eq!(TileKey::pack(coord).unpack(), coord);
        }
        assert_ne!(
            TileKey::pack(TileCoord::new(1, 2)),
            TileKey::pack(TileCoord::new(2, 1))
        );
    }

    #[test]
    fn tiles_around_walks_neighborhood_in_fixed_order() {
        let mut tilemap = Tilemap::new(16);
        for &(dx, dy) in NEIGHBOR_OFFSETS.iter().rev() {
            tilemap.insert(tile(TileKind::Stone, 2 + dx, 2 + dy));
        }
        tilemap.insert(tile(TileKind::Stone, 5, 5));

        let around = tilemap.tiles_around(Vec2::new(40.0, 47.9));
        let positions = around
            .iter()
            .map(|tile| (tile.pos.x - 2, tile.pos.y - 2))
            .collect::<Vec<_>>();

        assert_eq!(positions, NEIGHBOR_OFFSETS.to_vec());
    }

    #[test]
    fn negative_pixels_floor_into_negative_cells() {
        let tilemap = Tilemap::new(16);
        assert_eq!(
            tilemap.cell_at(Vec2::new(-0.5, -16.0)),
            TileCoord::new(-1, -1)
        );
        assert_eq!(tilemap.cell_at(Vec2::new(15.99, 16.0)), TileCoord::new(0, 1));
    }

    #[test]
    fn solid_rects_skip_decor_and_use_pixel_space() {
        let mut tilemap = filled(TileKind::Grass, &[(0, 1)]);
        tilemap.insert(tile(TileKind::Decor, 1, 1));

        let rects = tilemap.solid_rects_around(Vec2::new(4.0, 4.0));

        assert_eq!(rects, vec![Rect::new(0.0, 16.0, 16.0, 16.0)]);
        assert!(tilemap.is_solid_at(Vec2::new(8.0, 20.0)));
        assert!(!tilemap.is_solid_at(Vec2::new(20.0, 20.0)));
        assert!(!tilemap.is_solid_at(Vec2::new(40.0, 20.0)));
    }

    #[test]
    fn extract_with_keep_leaves_map_untouched() {
        let mut tilemap = filled(TileKind::Spawners, &[(3, 1), (1, 2)]);
        tilemap.push_offgrid(OffgridTile {
            kind: TileKind::LargeDecor,
            variant: 2,
            pos: [30.0, 40.0],
        });

        let found = tilemap.extract(&[(TileKind::LargeDecor, 2), (TileKind::Spawners, 0)], true);

        assert_eq!(found.len(), 3);
        assert_eq!(found[0].pos, Vec2::new(30.0, 40.0));
        assert_eq!(found[1].pos, Vec2::new(16.0, 32.0));
        assert_eq!(found[2].pos, Vec2::new(48.0, 16.0));
        assert_eq!(tilemap.tile_count(), 2);
        assert_eq!(tilemap.offgrid().len(), 1);
    }

    #[test]
    fn extract_without_keep_removes_only_matches() {
        let mut tilemap = filled(TileKind::Stone, &[(0, 0)]);
        tilemap.insert(Tile {
            kind: TileKind::Spawners,
            variant: 1,
            pos: TileCoord::new(4, 0),
        });
        tilemap.insert(tile(TileKind::Spawners, 5, 0));

        let found = tilemap.extract(&[(TileKind::Spawners, 1)], false);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].variant, 1);
        assert!(tilemap.get(TileCoord::new(4, 0)).is_none());
        assert!(tilemap.get(TileCoord::new(5, 0)).is_some());
        assert!(tilemap.get(TileCoord::new(0, 0)).is_some());
    }

    #[test]
    fn autotile_gives_block_interior_the_cross_variant() {
        let cells = (0..3)
            .flat_map(|x| (0..3).map(move |y| (x, y)))
            .collect::<Vec<_>>();
        let mut tilemap = filled(TileKind::Grass, &cells);

        tilemap.autotile();

        let variant_at = |x, y| tilemap.get(TileCoord::new(x, y)).expect("tile").variant;
        assert_eq!(variant_at(1, 1), 8);
        assert_eq!(variant_at(0, 0), 0);
        assert_eq!(variant_at(1, 0), 1);
        assert_eq!(variant_at(2, 0), 2);
        assert_eq!(variant_at(2, 1), 3);
        assert_eq!(variant_at(2, 2), 4);
        assert_eq!(variant_at(1, 2), 5);
        assert_eq!(variant_at(0, 2), 6);
        assert_eq!(variant_at(0, 1), 7);
    }

    #[test]
    fn autotile_leaves_unmatched_patterns_untouched() {
        let mut tilemap = Tilemap::new(16);
        tilemap.insert(Tile {
            kind: TileKind::Stone,
            variant: 5,
            pos: TileCoord::new(10, 10),
        });
        // horizontal run: middle tile sees only left+right
        for x in 0..3 {
            tilemap.insert(Tile {
                kind: TileKind::Grass,
                variant: 3,
                pos: TileCoord::new(x, 0),
            });
        }

        tilemap.autotile();

        assert_eq!(tilemap.get(TileCoord::new(10, 10)).expect("tile").variant, 5);
        assert_eq!(tilemap.get(TileCoord::new(1, 0)).expect("tile").variant, 3);
    }

    #[test]
    fn autotile_ignores_neighbors_of_other_kinds() {
        let mut tilemap = filled(TileKind::Grass, &[(0, 0)]);
        tilemap.insert(tile(TileKind::Stone, 1, 0));
        tilemap.insert(tile(TileKind::Stone, 0, 1));

        tilemap.autotile();

        assert_eq!(tilemap.get(TileCoord::new(0, 0)).expect("tile").variant, 0);
        assert_eq!(tilemap.get(TileCoord::new(1, 0)).expect("tile").variant, 0);
    }

    #[test]
    fn level_round_trip_preserves_keys_fields_and_offgrid_order() {
        let raw = json!({
            "tilemap": {
                "0;5": {"type": "grass", "variant": 1, "pos": [0, 5]},
                "-2;7": {"type": "spawners", "variant": 0, "pos": [-2, 7]},
                "3;3": {"type": "decor", "variant": 2, "pos": [3, 3]}
            },
            "tile_size": 16,
            "offgrid": [
                {"type": "large_decor", "variant": 2, "pos": [50.0, 60.0]},
                {"type": "decor", "variant": 0, "pos": [1.5, 2.5]},
                {"type": "decor", "variant": 3, "pos": [-4.0, 9.0]}
            ]
        })
        .to_string();
        let level = parse_level_json(&raw).expect("level");

        let tilemap = Tilemap::load(&level).expect("load");
        let reloaded = Tilemap::load(&tilemap.to_level()).expect("reload");

        assert_eq!(tilemap.to_level(), level);
        assert_eq!(reloaded, tilemap);
        assert_eq!(reloaded.offgrid()[2].pixel_pos(), Vec2::new(-4.0, 9.0));
    }

    #[test]
    fn offgrid_positions_survive_round_trip_at_full_precision() {
        let raw = json!({
            "tilemap": {},
            "tile_size": 16,
            "offgrid": [{"type": "decor", "variant": 0, "pos": [123.456789012, -77.1234567]}]
        });
        let level = parse_level_json(&raw.to_string()).expect("level");

        let tilemap = Tilemap::load(&level).expect("load");
        let encoded = encode_level_json(&tilemap.to_level()).expect("encode");
        let reparsed: serde_json::Value = serde_json::from_str(&encoded).expect("json");

        assert_eq!(reparsed["offgrid"], raw["offgrid"]);
        assert_eq!(tilemap.offgrid()[0].pos, [123.456789012, -77.1234567]);
    }

    #[test]
    fn cells_at_the_grid_edge_have_no_wrapping_neighbors() {
        let raw = json!({
            "tilemap": {
                "2147483647;0": {"type": "stone", "variant": 4, "pos": [2147483647, 0]},
                "-2147483648;0": {"type": "stone", "variant": 4, "pos": [-2147483648, 0]}
            },
            "tile_size": 16,
            "offgrid": []
        });
        let level = parse_level_json(&raw.to_string()).expect("level");
        let mut tilemap = Tilemap::load(&level).expect("load");

        assert_eq!(tilemap.autotile(), 0);
        assert_eq!(TileCoord::new(i32::MAX, 0).offset(1, 0), None);
        assert_eq!(TileCoord::new(0, i32::MIN).offset(0, -1), None);
        assert_eq!(TileCoord::new(3, 4).offset(-1, 1), Some(TileCoord::new(2, 5)));

        let around = tilemap.tiles_around(Vec2::new(f32::MAX, 0.0));
        assert_eq!(around.len(), 1);
        assert_eq!(around[0].pos, TileCoord::new(i32::MAX, 0));
        assert!(tilemap.visible_tiles((i32::MAX - 8, 0), (320, 240)).is_empty());
    }

    #[test]
    fn load_rejects_key_that_disagrees_with_pos() {
        let raw = json!({
            "tilemap": {"1;1": {"type": "grass", "variant": 0, "pos": [1, 2]}},
            "tile_size": 16,
            "offgrid": []
        })
        .to_string();
        let level = parse_level_json(&raw).expect("level");

        assert!(matches!(
            Tilemap::load(&level),
            Err(LevelError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn load_rejects_zero_tile_size() {
        let level = LevelFile {
            tilemap: BTreeMap::new(),
            tile_size: 0,
            offgrid: Vec::new(),
        };
        assert!(matches!(
            Tilemap::load(&level),
            Err(LevelError::ZeroTileSize)
        ));
    }

    #[test]
    fn visible_tiles_cover_view_plus_one_cell() {
        let cells = (-2..30).map(|x| (x, 0)).collect::<Vec<_>>();
        let tilemap = filled(TileKind::Stone, &cells);

        let visible = tilemap.visible_tiles((0, -8), (64, 16));
        let xs = visible.iter().map(|tile| tile.pos.x).collect::<Vec<_>>();

        assert_eq!(xs, vec![0, 1, 2, 3, 4]);
    }
}
