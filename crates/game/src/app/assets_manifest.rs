use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ninja_engine::world::AnimationTemplate;
use ninja_engine::world::DEFAULT_FRAME_DURATION;
use ninja_engine::{Asset, AssetTable, ImageId, ImageSet};
use serde::Deserialize;
use tracing::info;

/// One directory of numbered frames (`0.png`, `1.png`, ...) or a single file
/// when `count` is omitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImageSetEntry {
    path: String,
    #[serde(default)]
    count: Option<u32>,
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnimationEntry {
    path: String,
    count: u32,
    #[serde(default = "default_frame_duration")]
    frame_duration: u32,
    #[serde(default = "default_looping")]
    looping: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    images: BTreeMap<String, ImageSetEntry>,
    animations: BTreeMap<String, AnimationEntry>,
}

fn default_frame_duration() -> u32 {
    DEFAULT_FRAME_DURATION
}

fn default_looping() -> bool {
    true
}

/// The asset table plus the file behind every image id, indexed by
/// `ImageId.0`.
#[derive(Debug, Clone)]
pub(crate) struct LoadedAssets {
    pub(crate) table: AssetTable,
    pub(crate) image_paths: Vec<PathBuf>,
}

impl LoadedAssets {
    pub(crate) fn image_path(&self, image: ImageId) -> Option<&Path> {
        self.image_paths.get(image.0 as usize).map(PathBuf::as_path)
    }
}

pub(crate) fn load_assets_manifest(path: &Path, data_dir: &Path) -> Result<LoadedAssets, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read asset manifest '{}': {error}", path.display()))?;
    let assets = parse_assets_manifest(&raw, data_dir)?;
    info!(
        path = %path.display(),
        assets = assets.table.len(),
        images = assets.image_paths.len(),
        "asset_manifest_loaded"
    );
    Ok(assets)
}

/// Image ids are handed out in key order, image sets before animations, so
/// the same manifest always yields the same ids.
pub(crate) fn parse_assets_manifest(raw: &str, data_dir: &Path) -> Result<LoadedAssets, String> {
    let manifest = parse_manifest_json(raw)?;
    let mut table = AssetTable::new();
    let mut image_paths = Vec::new();

    for (key, entry) in &manifest.images {
        let images = match entry.count {
            Some(count) => allocate_frames(&mut image_paths, data_dir, &entry.path, count),
            None => {
                image_paths.push(data_dir.join(&entry.path));
                vec![ImageId(image_paths.len() as u32 - 1)]
            }
        };
        let set = ImageSet {
            images,
            width: entry.width,
            height: entry.height,
        };
        table
            .insert(key, Asset::Images(set))
            .map_err(|error| format!("images.{key}: {error}"))?;
    }

    for (key, entry) in &manifest.animations {
        let frames = allocate_frames(&mut image_paths, data_dir, &entry.path, entry.count);
        let template = AnimationTemplate::new(frames, entry.frame_duration, entry.looping);
        table
            .insert(key, Asset::Animation(template))
            .map_err(|error| format!("animations.{key}: {error}"))?;
    }

    Ok(LoadedAssets { table, image_paths })
}

fn allocate_frames(
    image_paths: &mut Vec<PathBuf>,
    data_dir: &Path,
    dir: &str,
    count: u32,
) -> Vec<ImageId> {
    (0..count)
        .map(|index| {
            image_paths.push(data_dir.join(dir).join(format!("{index}.png")));
            ImageId(image_paths.len() as u32 - 1)
        })
        .collect()
}

fn parse_manifest_json(raw: &str) -> Result<ManifestFile, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, ManifestFile>(&mut deserializer) {
        Ok(manifest) => Ok(manifest),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse asset manifest: {source}"))
            } else {
                Err(format!("parse asset manifest at {path}: {source}"))
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn shipped_assets() -> LoadedAssets {
    parse_assets_manifest(
        include_str!("../../../../data/assets.json"),
        Path::new("data"),
    )
    .expect("shipped manifest")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ninja_engine::world::{AnimationSet, EffectTemplates, EntityKind, TileKind};
    use serde_json::json;

    #[test]
    fn shipped_manifest_covers_every_world_key() {
        let assets = shipped_assets();

        for kind in TileKind::ALL {
            assert!(assets.table.images(kind.asset_key()).is_ok(), "{kind:?}");
        }
        for key in ["background", "clouds", "projectile"] {
            assert!(assets.table.images(key).is_ok(), "{key}");
        }
        assert!(AnimationSet::resolve(&assets.table, EntityKind::Player).is_ok());
        assert!(AnimationSet::resolve(&assets.table, EntityKind::Enemy).is_ok());
        assert!(EffectTemplates::resolve(&assets.table).is_ok());
    }

    #[test]
    fn shipped_levels_load_into_worlds() {
        let assets = shipped_assets();
        for raw in [
            include_str!("../../../../data/maps/0.json"),
            include_str!("../../../../data/maps/1.json"),
        ] {
            let level = ninja_engine::content::parse_level_json(raw).expect("level");
            let world = ninja_engine::World::new(&level, &assets.table, 0).expect("world");
            assert!(!world.enemies().is_empty());
            assert!(!world.leaf_spawners().is_empty());
        }
    }

    #[test]
    fn ids_follow_key_order_with_images_first() {
        let raw = json!({
            "images": {
                "stone": {"path": "tiles/stone", "count": 2, "width": 16, "height": 16},
                "background": {"path": "background.png", "width": 320, "height": 240}
            },
            "animations": {
                "player/run": {"path": "entities/player/run", "count": 2, "frame_duration": 4}
            }
        });

        let assets = parse_assets_manifest(&raw.to_string(), Path::new("data")).expect("manifest");

        assert_eq!(assets.table.images("background").expect("bg").images, vec![ImageId(0)]);
        assert_eq!(
            assets.table.images("stone").expect("stone").images,
            vec![ImageId(1), ImageId(2)]
        );
        let run = assets.table.animation("player/run").expect("run");
        assert_eq!(run.frames(), &[ImageId(3), ImageId(4)]);
        assert_eq!(run.frame_duration(), 4);
        assert!(run.is_looping());
        assert_eq!(
            assets.image_path(ImageId(4)),
            Some(Path::new("data/entities/player/run/1.png"))
        );
    }

    #[test]
    fn parse_error_reports_json_path() {
        let raw = json!({
            "images": {
                "grass": {"path": "tiles/grass", "count": "nine", "width": 16, "height": 16}
            },
            "animations": {}
        });

        let error =
            parse_assets_manifest(&raw.to_string(), Path::new("data")).expect_err("bad count");

        assert!(error.contains("images.grass.count"), "{error}");
    }

    #[test]
    fn empty_and_badly_named_entries_are_rejected() {
        let empty = json!({
            "images": {},
            "animations": {"enemy/idle": {"path": "entities/enemy/idle", "count": 0}}
        });
        let error =
            parse_assets_manifest(&empty.to_string(), Path::new("data")).expect_err("empty");
        assert!(error.starts_with("animations.enemy/idle"), "{error}");

        let bad_key = json!({
            "images": {"Grass": {"path": "tiles/grass", "width": 16, "height": 16}},
            "animations": {}
        });
        let error =
            parse_assets_manifest(&bad_key.to_string(), Path::new("data")).expect_err("key");
        assert!(error.starts_with("images.Grass"), "{error}");
    }
}
