//! Gateway Configuration
//!
//! Credentials and environment mode supplied by the host. Values are opaque;
//! the only check is that none of them is empty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// Processor environment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Staging
    Test,
    /// Production
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Test => "test",
            Mode::Live => "live",
        }
    }
}

impl FromStr for Mode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "test" => Ok(Mode::Test),
            "live" => Ok(Mode::Live),
            _ => Err(GatewayError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merchant credentials for one processor environment
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfiguration {
    pub mode: Mode,
    pub merchant_id: String,
    pub entity_id: String,
    pub operator_id: String,
    pub operator_password: String,
    pub basic_username: String,
    pub basic_password: String,
}

impl GatewayConfiguration {
    /// Create from environment variables
    ///
    /// Unset credentials become empty strings and are rejected when a
    /// checkout is attempted. An unrecognised `MIPS_MODE` fails here.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from any key lookup (`MIPS_*` names)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = lookup("MIPS_MODE")
            .unwrap_or_else(|| Mode::Test.as_str().to_string())
            .parse()?;
        let get = |key: &str| lookup(key).unwrap_or_default();

        Ok(Self {
            mode,
            merchant_id: get("MIPS_ID_MERCHANT"),
            entity_id: get("MIPS_ID_ENTITY"),
            operator_id: get("MIPS_ID_OPERATOR"),
            operator_password: get("MIPS_OPERATOR_PASSWORD"),
            basic_username: get("MIPS_BASIC_USERNAME"),
            basic_password: get("MIPS_BASIC_PASSWORD"),
        })
    }

    /// Names of the credentials that are empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("id_merchant", &self.merchant_id),
            ("id_entity", &self.entity_id),
            ("id_operator", &self.operator_id),
            ("operator_password", &self.operator_password),
            ("basic_username", &self.basic_username),
            ("basic_password", &self.basic_password),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Fail with `ConfigurationIncomplete` unless every credential is set
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::ConfigurationIncomplete { missing })
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

// Passwords stay out of logs
impl fmt::Debug for GatewayConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfiguration")
            .field("mode", &self.mode)
            .field("merchant_id", &self.merchant_id)
            .field("entity_id", &self.entity_id)
            .field("operator_id", &self.operator_id)
            .field("operator_password", &"<redacted>")
            .field("basic_username", &self.basic_username)
            .field("basic_password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) fn complete_config() -> GatewayConfiguration {
        GatewayConfiguration {
            mode: Mode::Test,
            merchant_id: "M-1".into(),
            entity_id: "E-1".into(),
            operator_id: "OP-1".into(),
            operator_password: "op-secret".into(),
            basic_username: "basic-user".into(),
            basic_password: "basic-secret".into(),
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("test".parse::<Mode>().unwrap(), Mode::Test);
        assert_eq!("live".parse::<Mode>().unwrap(), Mode::Live);
        assert!(matches!("LIVE".parse::<Mode>(), Err(GatewayError::UnknownMode(_))));
        assert!(matches!(" live ".parse::<Mode>(), Err(GatewayError::UnknownMode(_))));
        assert!(matches!(
            "staging".parse::<Mode>(),
            Err(GatewayError::UnknownMode(m)) if m == "staging"
        ));
        assert!(matches!("".parse::<Mode>(), Err(GatewayError::UnknownMode(_))));
    }

    #[test]
    fn test_each_missing_field_is_reported() {
        let clear: [fn(&mut GatewayConfiguration); 6] = [
            |c| c.merchant_id.clear(),
            |c| c.entity_id.clear(),
            |c| c.operator_id.clear(),
            |c| c.operator_password.clear(),
            |c| c.basic_username.clear(),
            |c| c.basic_password.clear(),
        ];

        for clear_field in clear {
            let mut config = complete_config();
            clear_field(&mut config);
            assert!(matches!(
                config.validate(),
                Err(GatewayError::ConfigurationIncomplete { ref missing }) if missing.len() == 1
            ));
        }
        assert!(complete_config().validate().is_ok());
    }

    #[test]
    fn test_credentials_are_opaque() {
        let mut config = complete_config();
        config.operator_password = "   ".into();
        config.basic_password = " pass phrase ".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MIPS_MODE", "live"),
            ("MIPS_ID_MERCHANT", "m"),
            ("MIPS_ID_ENTITY", "e"),
            ("MIPS_ID_OPERATOR", "o"),
            ("MIPS_OPERATOR_PASSWORD", "op"),
            ("MIPS_BASIC_USERNAME", "u"),
        ]);
        let config =
            GatewayConfiguration::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();

        assert_eq!(config.mode, Mode::Live);
        assert_eq!(config.missing_fields(), vec!["basic_password"]);
    }

    #[test]
    fn test_from_lookup_rejects_bad_mode() {
        let result = GatewayConfiguration::from_lookup(|k| {
            (k == "MIPS_MODE").then(|| "sandbox".to_string())
        });
        assert!(matches!(result, Err(GatewayError::UnknownMode(_))));
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let rendered = format!("{:?}", complete_config());
        assert!(!rendered.contains("op-secret"));
        assert!(!rendered.contains("basic-secret"));
        assert!(rendered.contains("basic-user"));
    }
}
