pub(crate) mod assets_manifest;
pub(crate) mod bootstrap;
pub(crate) mod input_script;
pub(crate) mod loop_runner;
pub(crate) mod projectiles;
pub(crate) mod session;
