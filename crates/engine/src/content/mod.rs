mod assets;
mod level;

pub use assets::{
    validate_asset_key, Asset, AssetError, AssetKeyError, AssetTable, ImageId, ImageSet,
};
pub use level::{
    encode_level_json, format_tile_key, parse_level_json, parse_tile_key, read_level, write_level,
    LevelError, LevelFile, OffgridRecord, TileRecord,
};

#[cfg(test)]
pub(crate) use assets::test_support;
