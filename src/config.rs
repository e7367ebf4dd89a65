use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

pub const DEFAULT_MONTHLY_TARGET: f64 = 500_000.0;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STAFF: [&str; 6] = ["Ahmet", "Mehmet", "Ayşe", "Fatma", "Oğuz", "Yönetici"];

/// Staff names in insertion order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct StaffRoster {
    names: Vec<String>,
}

impl StaffRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str) -> LedgerResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidConfig {
                reason: "staff name is empty".to_string(),
            });
        }
        if self.contains(name) {
            return Err(LedgerError::DuplicateStaff {
                name: name.to_string(),
            });
        }
        self.names.push(name.to_string());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> LedgerResult<()> {
        let position = self
            .names
            .iter()
            .position(|existing| existing == name)
            .ok_or_else(|| LedgerError::UnknownStaff {
                name: name.to_string(),
            })?;
        self.names.remove(position);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|existing| existing == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TryFrom<Vec<String>> for StaffRoster {
    type Error = LedgerError;

    fn try_from(names: Vec<String>) -> LedgerResult<Self> {
        let mut roster = StaffRoster::new();
        for name in names {
            roster.add(&name)?;
        }
        Ok(roster)
    }
}

impl From<StaffRoster> for Vec<String> {
    fn from(roster: StaffRoster) -> Self {
        roster.names
    }
}

/// Settings the hosting layer owns for the length of a session and passes
/// into every aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub monthly_target: f64,
    pub staff_roster: StaffRoster,
    pub store_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mut staff_roster = StaffRoster::new();
        for name in DEFAULT_STAFF {
            // Defaults are distinct and non-empty.
            let _ = staff_roster.add(name);
        }

        Self {
            monthly_target: DEFAULT_MONTHLY_TARGET,
            staff_roster,
            store_timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&raw)?;
        config.check_target(config.monthly_target)?;
        log::debug!(
            "loaded session config from {} ({} staff, target {})",
            path.display(),
            config.staff_roster.len(),
            config.monthly_target
        );
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> LedgerResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn set_monthly_target(&mut self, target: f64) -> LedgerResult<()> {
        self.check_target(target)?;
        self.monthly_target = target;
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs.max(1))
    }

    fn check_target(&self, target: f64) -> LedgerResult<()> {
        if !target.is_finite() || target < 0.0 {
            return Err(LedgerError::InvalidConfig {
                reason: format!("monthly target {target} must be a non-negative number"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_club_setup() {
        let config = SessionConfig::default();
        assert_eq!(config.monthly_target, 500_000.0);
        let names: Vec<&str> = config.staff_roster.iter().collect();
        assert_eq!(names, DEFAULT_STAFF.to_vec());
        assert_eq!(config.store_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn roster_rejects_duplicates_and_keeps_order() {
        let mut roster = StaffRoster::new();
        roster.add("Zeynep").unwrap();
        roster.add("Ahmet").unwrap();

        let err = roster.add("Zeynep").unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateStaff { .. }));

        roster.add("Can").unwrap();
        let names: Vec<&str> = roster.iter().collect();
        assert_eq!(names, vec!["Zeynep", "Ahmet", "Can"]);
    }

    #[test]
    fn roster_remove_unknown_fails() {
        let mut roster = StaffRoster::new();
        roster.add("Ahmet").unwrap();
        assert!(matches!(
            roster.remove("Mehmet"),
            Err(LedgerError::UnknownStaff { .. })
        ));
        roster.remove("Ahmet").unwrap();
        assert!(roster.is_empty());
    }

    #[test]
    fn negative_target_is_rejected() {
        let mut config = SessionConfig::default();
        assert!(config.set_monthly_target(-1.0).is_err());
        config.set_monthly_target(250_000.0).unwrap();
        assert_eq!(config.monthly_target, 250_000.0);
    }

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{ "monthly_target": 120000, "staff_roster": ["Ece", "Can"] }"#)
            .unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.monthly_target, 120_000.0);
        assert_eq!(config.staff_roster.iter().collect::<Vec<_>>(), vec!["Ece", "Can"]);
        assert_eq!(config.store_timeout_secs, DEFAULT_STORE_TIMEOUT_SECS);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut config = SessionConfig::default();
        config.staff_roster.remove("Yönetici").unwrap();
        config.staff_roster.add("Deniz").unwrap();

        config.save(&path).unwrap();
        let loaded = SessionConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.staff_roster.iter().last(), Some("Deniz"));
    }

    #[test]
    fn load_rejects_duplicate_roster_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{ "staff_roster": ["Ece", "Ece"] }"#).unwrap();
        assert!(SessionConfig::load(&path).is_err());
    }
}
