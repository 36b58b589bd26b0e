//! Process configuration, read once at startup.

use std::net::SocketAddr;

use anyhow::{bail, Context};

use stockledger_core::OwnerId;
use stockledger_infra::LedgerConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres when set; in-memory stores otherwise.
    pub database_url: Option<String>,
    /// In-memory mode only: owner whose starter categories are created at boot.
    pub dev_seed_owner: Option<OwnerId>,
    pub ledger: LedgerConfig,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:8080")?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let use_persistent = lookup("USE_PERSISTENT_STORES")
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(false);

        let database_url = if use_persistent {
            match lookup("DATABASE_URL") {
                Some(url) if !url.trim().is_empty() => Some(url),
                _ => bail!("USE_PERSISTENT_STORES=true requires DATABASE_URL"),
            }
        } else {
            None
        };

        let dev_seed_owner = lookup("DEV_SEED_OWNER")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().parse::<OwnerId>())
            .transpose()
            .context("DEV_SEED_OWNER must be an owner uuid")?;

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url,
            dev_seed_owner,
            ledger: LedgerConfig::from_lookup(&lookup),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ApiConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_dev_setup() {
        let c = config(&[]).unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.jwt_secret, DEV_JWT_SECRET);
        assert!(c.database_url.is_none());
        assert!(c.dev_seed_owner.is_none());
        assert_eq!(c.ledger, LedgerConfig::default());
    }

    #[test]
    fn dev_seed_owner_must_be_a_uuid() {
        let owner = OwnerId::new();
        let raw = owner.to_string();
        let c = config(&[("DEV_SEED_OWNER", raw.as_str())]).unwrap();
        assert_eq!(c.dev_seed_owner, Some(owner));
        assert!(config(&[("DEV_SEED_OWNER", "someone")]).is_err());
    }

    #[test]
    fn persistent_mode_needs_database_url() {
        assert!(config(&[("USE_PERSISTENT_STORES", "true")]).is_err());
        let c = config(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/ledger"),
            ("MAX_BATCH_SIZE", "20"),
        ])
        .unwrap();
        assert_eq!(c.database_url.as_deref(), Some("postgres://localhost/ledger"));
        assert_eq!(c.ledger.max_batch_size, 20);
    }

    #[test]
    fn bad_bind_addr_is_an_error() {
        assert!(config(&[("BIND_ADDR", "nowhere")]).is_err());
    }
}
