//! Layered configuration: defaults, optional TOML file, then environment.

use std::path::Path;

use crate::error::ConfigError;
use crate::integration::PipelineConfig;

/// Prefix for environment overrides, e.g. `IOU_TRACK__TRACKER__MAX_AGE=10`.
pub const ENV_PREFIX: &str = "IOU_TRACK";

/// Load and validate the pipeline configuration.
///
/// Missing keys fall back to [`PipelineConfig::default`]. A `path` that is
/// given must exist.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }
    let cfg = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let pipeline: PipelineConfig = cfg.try_deserialize()?;
    pipeline.validate()?;
    Ok(pipeline)
}
