use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
pub mod render;
pub mod world;

pub use app::{
    run_app, AppError, InputAction, InputCollector, InputSnapshot, InputSource, LoopConfig,
    LoopSummary, Scene, SceneCommand, StopReason,
};
pub use content::{
    read_level, write_level, Asset, AssetError, AssetTable, ImageId, ImageSet, LevelError,
    LevelFile,
};
pub use render::{Anchor, DrawCommand, DrawList, Renderer};
pub use world::{Camera2D, Rect, Vec2, World, WorldError, WorldEvent};

pub const ROOT_ENV_VAR: &str = "NINJA_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub maps_dir: PathBuf,
    pub assets_manifest: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        let data_dir = root.join("data");
        Self {
            maps_dir: data_dir.join("maps"),
            assets_manifest: data_dir.join("assets.json"),
            data_dir,
            root,
        }
    }

    /// Levels are numbered `0.json`, `1.json`, ...
    pub fn level_path(&self, index: usize) -> PathBuf {
        self.maps_dir.join(format!("{index}.json"))
    }

    /// Number of consecutively numbered levels present on disk.
    pub fn level_count(&self) -> usize {
        (0..)
            .take_while(|index| self.level_path(*index).is_file())
            .count()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "NINJA_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or data/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or data/.\n\
Set {env_var} explicitly, for example:\n\
export {env_var}=\"/path/to/ninja\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
    #[error("no levels found in {0}")]
    NoLevels(PathBuf),
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let exe_dir = exe
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
    let root = resolve_root(env::var(ROOT_ENV_VAR), &exe_dir)?;
    Ok(AppPaths::from_root(root))
}

fn resolve_root(
    env_value: Result<String, env::VarError>,
    start_dir: &Path,
) -> Result<PathBuf, StartupError> {
    match env_value {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => start_dir
            .ancestors()
            .find(|candidate| is_repo_marker(candidate))
            .map(normalize_path)
            .ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(start_dir),
                env_var: ROOT_ENV_VAR,
            }),
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_data = path.join("data").is_dir();

    cargo_toml && (has_crates || has_data)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
