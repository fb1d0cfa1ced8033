//! Collaboration subsystem configuration.

use std::collections::BTreeMap;

use packshare_core::lease::DEFAULT_LOCK_TIMEOUT_MINS;

/// One seeded group: a name and its member logins.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GroupSeed {
    pub name: String,
    pub members: Vec<String>,
}

/// Configuration consumed by the collaboration core.
#[derive(Debug, Clone)]
pub struct CollabConfig {
    /// Individual-lock inactivity timeout in minutes.
    pub lock_timeout_mins: i64,
    /// When `true`, storage errors in collaboration operations are logged
    /// and swallowed so the rest of the application keeps functioning
    /// against a broken collaboration store.
    pub fail_soft: bool,
    /// Static group membership, applied once at startup by
    /// [`crate::seed::seed_groups`].
    pub group_seeds: Vec<GroupSeed>,
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            lock_timeout_mins: DEFAULT_LOCK_TIMEOUT_MINS,
            fail_soft: false,
            group_seeds: Vec::new(),
        }
    }
}

impl CollabConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default |
    /// |------------------------|---------|
    /// | `LOCK_TIMEOUT_MINUTES` | `30`    |
    /// | `COLLAB_FAIL_SOFT`     | `false` |
    /// | `COLLAB_GROUPS_FILE`   | unset   |
    ///
    /// The groups file is a JSON object mapping group names to arrays of
    /// member logins. An unreadable or malformed file fails startup;
    /// silently seeding nothing would be worse.
    pub fn from_env() -> Self {
        let lock_timeout_mins: i64 = std::env::var("LOCK_TIMEOUT_MINUTES")
            .unwrap_or_else(|_| DEFAULT_LOCK_TIMEOUT_MINS.to_string())
            .parse()
            .expect("LOCK_TIMEOUT_MINUTES must be a valid i64");

        let fail_soft = matches!(
            std::env::var("COLLAB_FAIL_SOFT").as_deref(),
            Ok("1") | Ok("true") | Ok("yes")
        );

        let group_seeds = match std::env::var("COLLAB_GROUPS_FILE") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .unwrap_or_else(|e| panic!("cannot read COLLAB_GROUPS_FILE {path}: {e}"));
                parse_group_seeds(&raw)
                    .unwrap_or_else(|e| panic!("malformed COLLAB_GROUPS_FILE {path}: {e}"))
            }
            Err(_) => Vec::new(),
        };

        Self {
            lock_timeout_mins,
            fail_soft,
            group_seeds,
        }
    }
}

/// Parse the group-seed JSON: `{"Curators": ["alice", "carol"], ...}`.
pub fn parse_group_seeds(json: &str) -> Result<Vec<GroupSeed>, serde_json::Error> {
    let map: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
    Ok(map
        .into_iter()
        .map(|(name, members)| GroupSeed { name, members })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_table() {
        let config = CollabConfig::default();
        assert_eq!(config.lock_timeout_mins, 30);
        assert!(!config.fail_soft);
        assert!(config.group_seeds.is_empty());
    }

    #[test]
    fn group_seeds_parse_from_json_map() {
        let seeds = parse_group_seeds(r#"{"Curators": ["alice", "carol"], "Editors": []}"#)
            .expect("valid seed json");
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].name, "Curators");
        assert_eq!(seeds[0].members, vec!["alice", "carol"]);
        assert_eq!(seeds[1].name, "Editors");
        assert!(seeds[1].members.is_empty());
    }

    #[test]
    fn malformed_seed_json_is_rejected() {
        assert!(parse_group_seeds("[]").is_err());
        assert!(parse_group_seeds(r#"{"Curators": "alice"}"#).is_err());
    }
}
