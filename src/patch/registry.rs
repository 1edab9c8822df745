use indexmap::IndexMap;

use crate::{
    error::{Error, Result},
    fingerprint::MatchResult,
};

/// Values one patch publishes for others, such as resource ids. Every key can be set once.
///
/// It also keeps the matches of every finished patch, keyed by patch and fingerprint name,
/// so a dependent can chain off a method its dependency already edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedRegistry {
    values: IndexMap<String, i64>,
    matches: IndexMap<(String, String), MatchResult>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: i64) -> Result<()> {
        let key = key.into();

        if self.values.contains_key(&key) {
            return Err(Error::RegistryConflict(key));
        }

        self.values.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<i64> {
        self.values
            .get(key)
            .copied()
            .ok_or_else(|| Error::RegistryMissing(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|(key, value)| (key.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn publish(
        &mut self,
        patch: impl Into<String>,
        fingerprint: impl Into<String>,
        result: MatchResult,
    ) -> Result<()> {
        let key = (patch.into(), fingerprint.into());

        if self.matches.contains_key(&key) {
            return Err(Error::RegistryConflict(format!("{}/{}", key.0, key.1)));
        }

        self.matches.insert(key, result);
        Ok(())
    }

    /// The match `patch` made for the fingerprint named `fingerprint`
    pub fn published(&self, patch: &str, fingerprint: &str) -> Result<&MatchResult> {
        self.matches
            .get(&(patch.to_string(), fingerprint.to_string()))
            .ok_or_else(|| Error::RegistryMissing(format!("{patch}/{fingerprint}")))
    }
}
