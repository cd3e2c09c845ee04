//! Engine constants.
//!
//! Wire-visible identifiers shared by the validator, the trust manager and
//! the HTTP layer.

/// Validation flag codes.
pub mod flags {
    /// Reported accuracy radius is too coarse to trust.
    pub const LOW_ACCURACY: &str = "LOW_ACCURACY";

    /// Reported accuracy is negative or not a number.
    pub const INVALID_ACCURACY: &str = "INVALID_ACCURACY";

    /// Coordinates are outside the valid range or not finite.
    pub const INVALID_COORDINATES: &str = "INVALID_COORDINATES";

    /// Implied speed exceeds anything a player can physically reach.
    pub const TELEPORT_DETECTED: &str = "TELEPORT_DETECTED";

    /// Implied speed is only reachable by aircraft.
    pub const IMPOSSIBLE_SPEED: &str = "IMPOSSIBLE_SPEED";

    /// Implied speed is faster than ground travel usually allows.
    pub const HIGH_SPEED: &str = "HIGH_SPEED";

    /// Recent path keeps reversing direction.
    pub const ZIGZAG_PATTERN: &str = "ZIGZAG_PATTERN";

    /// Client clock is ahead of the server clock.
    pub const FUTURE_TIMESTAMP: &str = "FUTURE_TIMESTAMP";

    /// Report is older than the last stored position.
    pub const TIME_REGRESSION: &str = "TIME_REGRESSION";

    /// Client runs inside an emulator.
    pub const EMULATOR_DETECTED: &str = "EMULATOR_DETECTED";

    /// Device is rooted or jailbroken.
    pub const ROOTED_DEVICE: &str = "ROOTED_DEVICE";

    /// OS-level mock locations are enabled.
    pub const MOCK_LOCATION: &str = "MOCK_LOCATION";

    /// Developer options are enabled.
    pub const DEVELOPER_OPTIONS: &str = "DEVELOPER_OPTIONS";

    /// Client binary failed its integrity attestation.
    pub const MODIFIED_CLIENT: &str = "MODIFIED_CLIENT";
}

/// Trust factor names.
pub mod factors {
    /// Score reduction caused by a risky location report.
    pub const LOCATION_RISK: &str = "location_risk";

    /// Compensation after an admin dismissed a report.
    pub const FALSE_POSITIVE_CLEARED: &str = "false_positive_cleared";
}

/// Enforcement reasons issued by automatic escalation.
pub mod reasons {
    /// Reason attached to automatic temporary bans.
    pub const AUTO_BAN: &str = "Automatic ban: trust score critically low with repeated violations";

    /// Reason attached to automatic warnings.
    pub const AUTO_WARNING: &str = "Automatic warning: trust score low with repeated violations";
}

/// Caller claims.
pub mod claims {
    /// Elevated privilege required for review endpoints.
    pub const ADMIN: &str = "admin";
}

/// Tracing targets.
pub mod targets {
    /// Audit-level events (fail-open decisions, enforcement).
    pub const AUDIT: &str = "geoguard::audit";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_codes_are_screaming_snake_case() {
        for code in [
            flags::LOW_ACCURACY,
            flags::TELEPORT_DETECTED,
            flags::ZIGZAG_PATTERN,
            flags::MOCK_LOCATION,
        ] {
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_audit_target_is_namespaced() {
        assert!(targets::AUDIT.starts_with("geoguard::"));
    }
}
