use crate::config::PipelineConfig;
use crate::errors::{LtrError, LtrResult};
use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use std::path::Path;

/// Environment prefix for run-time overrides, e.g. `LTR_HOST=solr-2`
pub const ENV_PREFIX: &str = "LTR_";

/// Keys that may be overridden from the environment
const ENV_OVERRIDABLE: &[&str] = &["host", "port", "collection"];

/// Load the JSON run configuration, apply environment overrides and validate it.
pub fn load_config(path: impl AsRef<Path>) -> LtrResult<PipelineConfig> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LtrError::config(format!(
            "configuration file not found: {}",
            path.display()
        )));
    }

    let figment = Figment::new()
        .merge(Json::file(path))
        .merge(Env::prefixed(ENV_PREFIX).only(ENV_OVERRIDABLE));

    let config: PipelineConfig = figment.extract()?;
    config.validate()?;

    tracing::debug!(
        path = %path.display(),
        collection = %config.collection,
        host = %config.host,
        port = config.port,
        "configuration loaded"
    );

    Ok(config)
}
