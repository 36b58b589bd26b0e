//! Over-use policy: what happens when a usage consumes more than remains.

use rust_decimal::Decimal;
use serde::Serialize;

use stockledger_core::{DomainError, DomainResult, Quantity};

/// Strategy selected by [`crate::ItemKind::overuse_policy`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OverusePolicy {
    /// Record the real-world use anyway, clamp the balance at zero, warn the caller.
    WarnAndClamp,
    /// Refuse the usage; nothing is written.
    Reject,
}

/// Non-fatal signal attached to a successful usage write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UsageWarning {
    /// The recorded consumption was larger than the stock on hand.
    ExceedsRemaining {
        requested: Decimal,
        remaining: Quantity,
    },
}

impl core::fmt::Display for UsageWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UsageWarning::ExceedsRemaining {
                requested,
                remaining,
            } => write!(
                f,
                "usage of {requested} exceeds remaining stock of {remaining}; balance clamped to 0"
            ),
        }
    }
}

impl OverusePolicy {
    /// Evaluate a consumption of `requested` against `remaining`.
    ///
    /// `requested` is the net change for edits, so it may be zero or negative,
    /// in which case there is nothing to check.
    pub fn evaluate(self, requested: Decimal, remaining: Quantity) -> DomainResult<Option<UsageWarning>> {
        if requested <= remaining.value() {
            return Ok(None);
        }

        match self {
            OverusePolicy::WarnAndClamp => Ok(Some(UsageWarning::ExceedsRemaining {
                requested,
                remaining,
            })),
            OverusePolicy::Reject => Err(DomainError::exceeds_stock(requested, remaining.value())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_stock_is_silent_for_both_policies() {
        let remaining = Quantity::from_units(700);
        for policy in [OverusePolicy::WarnAndClamp, OverusePolicy::Reject] {
            assert_eq!(policy.evaluate(Decimal::from(700), remaining), Ok(None));
            assert_eq!(policy.evaluate(Decimal::from(-50), remaining), Ok(None));
        }
    }

    #[test]
    fn warn_and_clamp_returns_warning() {
        let warning = OverusePolicy::WarnAndClamp
            .evaluate(Decimal::from(900), Quantity::from_units(700))
            .unwrap()
            .unwrap();
        assert_eq!(
            warning,
            UsageWarning::ExceedsRemaining {
                requested: Decimal::from(900),
                remaining: Quantity::from_units(700),
            }
        );
    }

    #[test]
    fn reject_returns_exceeds_stock() {
        let err = OverusePolicy::Reject
            .evaluate(Decimal::from(4), Quantity::from_units(3))
            .unwrap_err();
        assert_eq!(err, DomainError::exceeds_stock(Decimal::from(4), Decimal::from(3)));
    }

    #[test]
    fn warning_serializes_with_type_tag() {
        let warning = UsageWarning::ExceedsRemaining {
            requested: Decimal::from(900),
            remaining: Quantity::from_units(700),
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["type"], "exceeds_remaining");
        assert_eq!(json["requested"].as_f64(), Some(900.0));
        assert_eq!(json["remaining"].as_f64(), Some(700.0));
    }
}
