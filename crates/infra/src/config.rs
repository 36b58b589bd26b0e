//! Ledger configuration loaded from the environment.

use stockledger_inventory::DEFAULT_MAX_BATCH_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Largest `quantity` accepted by a single batch creation.
    pub max_batch_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl LedgerConfig {
    /// Read `MAX_BATCH_SIZE`; unset or unparsable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_batch_size = lookup("MAX_BATCH_SIZE")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_BATCH_SIZE);

        Self { max_batch_size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset_or_invalid() {
        assert_eq!(LedgerConfig::from_lookup(|_| None), LedgerConfig::default());
        assert_eq!(
            LedgerConfig::from_lookup(|_| Some("lots".into())).max_batch_size,
            DEFAULT_MAX_BATCH_SIZE
        );
        assert_eq!(
            LedgerConfig::from_lookup(|_| Some("0".into())).max_batch_size,
            DEFAULT_MAX_BATCH_SIZE
        );
    }

    #[test]
    fn reads_override() {
        assert_eq!(LedgerConfig::from_lookup(|_| Some(" 25 ".into())).max_batch_size, 25);
    }
}
