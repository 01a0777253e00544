use crate::capability::{WriteScope, WriteTraits};
use stylepack_types::plan::RiskLevel;

/// `high` for elevated or machine-wide writes, `medium` when a restart is
/// needed for the change to show, `low` otherwise.
pub fn assess_risk(traits: WriteTraits) -> RiskLevel {
    if traits.requires_elevation || traits.scope == WriteScope::Machine {
        RiskLevel::High
    } else if traits.requires_restart {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_scope_outranks_restart() {
        let t = WriteTraits {
            requires_elevation: false,
            scope: WriteScope::Machine,
            requires_restart: true,
        };
        assert_eq!(assess_risk(t), RiskLevel::High);
        assert_eq!(
            assess_risk(WriteTraits {
                requires_restart: true,
                ..WriteTraits::default()
            }),
            RiskLevel::Medium
        );
        assert_eq!(assess_risk(WriteTraits::default()), RiskLevel::Low);
    }
}
