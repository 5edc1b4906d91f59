use std::collections::HashMap;

use thiserror::Error;

use crate::world::AnimationTemplate;

/// Opaque handle to an image owned by the external renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSet {
    pub images: Vec<ImageId>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    Images(ImageSet),
    Animation(AnimationTemplate),
}

impl Asset {
    fn kind_name(&self) -> &'static str {
        match self {
            Asset::Images(_) => "images",
            Asset::Animation(_) => "animation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetKeyError {
    #[error("asset key must not be empty")]
    Empty,
    #[error("asset key must not start or end with '/'")]
    DanglingSlash,
    #[error("asset key must not contain an empty segment")]
    EmptySegment,
    #[error("asset key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("invalid asset key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: AssetKeyError,
    },
    #[error("asset '{key}' is not in the asset table")]
    Missing { key: String },
    #[error("asset '{key}' is {actual}, expected {expected}")]
    WrongKind {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("asset '{key}' has no frames")]
    Empty { key: String },
}

/// Keys are namespaced like `player/idle` or plain like `grass`.
pub fn validate_asset_key(key: &str) -> Result<(), AssetKeyError> {
    if key.is_empty() {
        return Err(AssetKeyError::Empty);
    }
    if key.starts_with('/') || key.ends_with('/') {
        return Err(AssetKeyError::DanglingSlash);
    }
    if key.contains("//") {
        return Err(AssetKeyError::EmptySegment);
    }
    for ch in key.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/') {
            continue;
        }
        return Err(AssetKeyError::InvalidCharacter { character: ch });
    }
    Ok(())
}

/// Lookup table the core indexes by composed keys. A miss is a content
/// error and is reported, never papered over.
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    assets: HashMap<String, Asset>,
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, asset: Asset) -> Result<(), AssetError> {
        validate_asset_key(key).map_err(|source| AssetError::InvalidKey {
            key: key.to_string(),
            source,
        })?;
        let empty = match &asset {
            Asset::Images(set) => set.images.is_empty(),
            Asset::Animation(template) => template.frames().is_empty(),
        };
        if empty {
            return Err(AssetError::Empty {
                key: key.to_string(),
            });
        }
        self.assets.insert(key.to_string(), asset);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, key: &str) -> Result<&Asset, AssetError> {
        self.assets.get(key).ok_or_else(|| AssetError::Missing {
            key: key.to_string(),
        })
    }

    pub fn images(&self, key: &str) -> Result<&ImageSet, AssetError> {
        match self.get(key)? {
            Asset::Images(set) => Ok(set),
            other => Err(AssetError::WrongKind {
                key: key.to_string(),
                expected: "images",
                actual: other.kind_name(),
            }),
        }
    }

    pub fn animation(&self, key: &str) -> Result<&AnimationTemplate, AssetError> {
        match self.get(key)? {
            Asset::Animation(template) => Ok(template),
            other => Err(AssetError::WrongKind {
                key: key.to_string(),
                expected: "animation",
                actual: other.kind_name(),
            }),
        }
    }
}
