//! Process-wide configuration, read once at startup from the environment.

use crate::error::{CipherError, Result};
use crate::groups::NamedGroup;

/// Parsed process configuration. Constructed once via [`Config::from_env`]
/// and handed to whatever builds the [`crate::groups::NamedGroupRegistry`]
/// and selects a [`crate::provider::PrimitiveProvider`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Ordered curve preference; empty means "use the registry's default".
    pub preferred_groups: Vec<NamedGroup>,
    pub fips_mode: bool,
}

impl Config {
    /// Reads `TLS_PREFERRED_GROUPS` (comma-separated, optionally
    /// double-quoted curve names) and `TLS_FIPS_MODE` (`"true"`/`"false"`,
    /// default `false`). Malformed values are fatal: an unknown curve name
    /// or unparseable boolean returns `CipherError::Configuration`.
    pub fn from_env() -> Result<Self> {
        let preferred_groups = match std::env::var("TLS_PREFERRED_GROUPS") {
            Ok(raw) => Self::parse_preferred_groups(&raw)?,
            Err(std::env::VarError::NotPresent) => Vec::new(),
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(CipherError::Configuration(
                    "TLS_PREFERRED_GROUPS is not valid UTF-8".into(),
                ))
            }
        };

        let fips_mode = match std::env::var("TLS_FIPS_MODE") {
            Ok(raw) => Self::parse_bool(&raw)?,
            Err(std::env::VarError::NotPresent) => false,
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(CipherError::Configuration(
                    "TLS_FIPS_MODE is not valid UTF-8".into(),
                ))
            }
        };

        let preferred_groups = Self::apply_fips_restriction(preferred_groups, fips_mode)?;

        Ok(Config {
            preferred_groups,
            fips_mode,
        })
    }

    /// In FIPS mode with no explicit preference, don't let the registry
    /// fall back to its full default (which includes non-FIPS groups) --
    /// build a FIPS-restricted default instead. With an explicit
    /// preference, reject any non-FIPS group in it outright.
    fn apply_fips_restriction(
        preferred_groups: Vec<NamedGroup>,
        fips_mode: bool,
    ) -> Result<Vec<NamedGroup>> {
        if !fips_mode {
            return Ok(preferred_groups);
        }
        if preferred_groups.is_empty() {
            return Ok(crate::groups::default_preference()
                .iter()
                .copied()
                .filter(|g| g.fips_approved())
                .collect());
        }
        if let Some(group) = preferred_groups.iter().find(|g| !g.fips_approved()) {
            return Err(CipherError::Configuration(format!(
                "{:?} is not FIPS-approved but TLS_FIPS_MODE is set",
                group
            )));
        }
        Ok(preferred_groups)
    }

    fn parse_preferred_groups(raw: &str) -> Result<Vec<NamedGroup>> {
        raw.split(',')
            .map(str::trim)
            .map(|s| s.trim_matches('"'))
            .filter(|s| !s.is_empty())
            .map(|name| {
                NamedGroup::from_config_name(name)
                    .ok_or_else(|| CipherError::Configuration(format!("unknown curve name: {name}")))
            })
            .collect()
    }

    fn parse_bool(raw: &str) -> Result<bool> {
        match raw.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(CipherError::Configuration(format!(
                "invalid boolean value: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_preference_list() {
        let groups = Config::parse_preferred_groups("\"secp256r1\",secp384r1").unwrap();
        assert_eq!(groups, vec![NamedGroup::Secp256r1, NamedGroup::Secp384r1]);
    }

    #[test]
    fn rejects_unknown_curve_name() {
        assert!(Config::parse_preferred_groups("not_a_curve").is_err());
    }

    #[test]
    fn parses_bool() {
        assert!(Config::parse_bool("true").unwrap());
        assert!(!Config::parse_bool("false").unwrap());
        assert!(Config::parse_bool("yes").is_err());
    }

    #[test]
    fn empty_preference_list_is_empty_not_error() {
        assert_eq!(Config::parse_preferred_groups("").unwrap(), Vec::new());
    }

    #[test]
    fn fips_mode_without_explicit_preference_gets_fips_restricted_default() {
        let groups = Config::apply_fips_restriction(Vec::new(), true).unwrap();
        assert!(!groups.is_empty());
        assert!(groups.iter().all(|g| g.fips_approved()));
    }

    #[test]
    fn fips_mode_with_explicit_non_fips_preference_is_rejected() {
        let result = Config::apply_fips_restriction(vec![NamedGroup::X25519], true);
        assert!(result.is_err());
    }

    #[test]
    fn non_fips_mode_leaves_empty_preference_empty() {
        let groups = Config::apply_fips_restriction(Vec::new(), false).unwrap();
        assert!(groups.is_empty());
    }
}
