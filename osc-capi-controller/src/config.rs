use std::env::var;

use thiserror::Error;

pub const ACCESS_KEY_VAR: &str = "OSC_ACCESS_KEY";
pub const SECRET_KEY_VAR: &str = "OSC_SECRET_KEY";
pub const REGION_VAR: &str = "OSC_REGION";
pub const ENDPOINT_VAR: &str = "OSC_ENDPOINT";

#[derive(Clone)]
pub struct ProviderConfig {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// overrides `https://api.{region}.outscale.com`
    pub endpoint: Option<String>,
}

#[derive(Debug, Error)]
pub enum FromError {
    #[error("Env var {} unavailable: {}", .0, .1)]
    VarUnset(&'static str, std::env::VarError),
    #[error("Env var {} is empty!", .0)]
    VarEmpty(&'static str),
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self, FromError> {
        Ok(Self {
            access_key: required_var(ACCESS_KEY_VAR)?,
            secret_key: required_var(SECRET_KEY_VAR)?,
            region: required_var(REGION_VAR)?,
            endpoint: var(ENDPOINT_VAR).ok().filter(|endpoint| !endpoint.is_empty()),
        })
    }

    pub fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_owned(),
            None => format!("https://api.{}.outscale.com", self.region),
        }
    }
}

fn required_var(name: &'static str) -> Result<String, FromError> {
    let value = var(name).map_err(|err| FromError::VarUnset(name, err))?;

    if value.is_empty() {
        return Err(FromError::VarEmpty(name));
    }

    Ok(value)
}
