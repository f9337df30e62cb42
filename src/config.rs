use crate::error::GalaxyError;
use crate::{CameraParams, FieldParams, FlyInParams, InteractionParams, RenderParams};
use serde::Deserialize;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
  pub field: FieldParams,
  pub interaction: InteractionParams,
  pub camera: CameraParams,
  pub fly_in: FlyInParams,
  pub render: RenderParams,
}

impl Config {
  pub fn load(path: &Path) -> Result<Self, GalaxyError> {
    let text = std::fs::read_to_string(path).map_err(|source| GalaxyError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let config = Self::from_toml_str(&text).map_err(|source| GalaxyError::Config {
      path: path.to_path_buf(),
      source,
    })?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
  }

  pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(text)
  }
}
