//! Runner configuration

use std::time::Duration;

use anyhow::Result;
use eduid_auth::IdentityConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub institution: InstitutionSettings,
    #[serde(default)]
    pub credentials: CredentialSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InstitutionSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for InstitutionSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8101/api".to_string(),
            timeout_secs: IdentityConfig::default().upstream_call_timeout_secs,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialSettings {
    /// Secret mixed into every credential hash.
    pub pepper: Option<String>,
}

impl Settings {
    /// Defaults come from the `Default` impls; files and environment
    /// override them field by field.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // EDUID_INSTITUTION__BASE_URL, EDUID_CREDENTIALS__PEPPER, ...
            .add_source(
                config::Environment::with_prefix("EDUID")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn institution_timeout(&self) -> Duration {
        Duration::from_secs(self.institution.timeout_secs)
    }
}
