// Directory backed by a TOML roster file:
//
//   [[users]]
//   account = "wangerxiao"
//   display_name = "王二小"
//   employee_id = "1987"

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{Directory, Identity, Subject};
use crate::error::DirectoryError;

#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    users: Vec<Identity>,
}

#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: Vec<Identity>,
}

impl StaticDirectory {
    pub fn new(users: Vec<Identity>) -> Self {
        Self { users }
    }

    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DirectoryError::Roster {
            path: path.to_path_buf(),
            source,
        })?;
        let roster: RosterFile =
            toml::from_str(&raw).map_err(|source| DirectoryError::RosterFormat {
                path: path.to_path_buf(),
                source: Box::new(source),
            })?;
        debug!(path = %path.display(), users = roster.users.len(), "loaded roster");
        Ok(Self::new(roster.users))
    }

    pub fn users(&self) -> &[Identity] {
        &self.users
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn lookup(&self, subject: &Subject) -> Result<Option<Identity>, DirectoryError> {
        let wanted = subject.common_name();
        Ok(self
            .users
            .iter()
            .find(|user| user.common_name().as_deref() == Some(wanted.as_str()))
            .cloned())
    }

    async fn find_account(&self, account: &str) -> Result<Option<Identity>, DirectoryError> {
        Ok(self.users.iter().find(|user| user.account == account).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ROSTER: &str = r#"
[[users]]
account = "wangerxiao"
display_name = "王二小"
employee_id = "1987"

[[users]]
account = "svc-backup"
"#;

    #[tokio::test]
    async fn roster_matches_on_name_and_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");
        std::fs::write(&path, ROSTER).unwrap();

        let directory = StaticDirectory::load(&path).unwrap();
        assert_eq!(directory.users().len(), 2);

        let found = directory
            .lookup(&Subject::new("王二小", "1987"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.account, "wangerxiao");

        assert!(directory
            .lookup(&Subject::new("王二小", "1988"))
            .await
            .unwrap()
            .is_none());
        assert!(directory
            .find_account("svc-backup")
            .await
            .unwrap()
            .is_some());
    }

    #[test]
    fn malformed_roster_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");
        std::fs::write(&path, "[[users]]\ndisplay_name = 3\n").unwrap();

        assert!(matches!(
            StaticDirectory::load(&path),
            Err(DirectoryError::RosterFormat { .. })
        ));
        assert!(matches!(
            StaticDirectory::load(&dir.path().join("missing.toml")),
            Err(DirectoryError::Roster { .. })
        ));
    }
}
