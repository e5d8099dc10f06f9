use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TrackerError};
use crate::models::{AuthPayload, Profile, User};

const SESSION_FILE: &str = "session.toml";

/// The signed-in user, their bearer token and the active profile.
///
/// Hydrated from `session.toml` on start, persisted after login or a
/// profile switch, and torn down on logout or when the server answers
/// 401. Handed to the API client explicitly.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(skip)]
    path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    profile: Option<Profile>,
}

impl Session {
    /// Load the stored session, or an empty one if nobody is logged in
    pub fn hydrate(cfg_dir: &Path) -> Result<Self> {
        let path = cfg_dir.join(SESSION_FILE);
        if !path.exists() {
            return Ok(Self {
                path,
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&path)?;
        let mut session: Session = toml::from_str(&content)
            .map_err(|e| TrackerError::ConfigParse {
                path: path.clone(),
                source: e,
            })?;
        session.path = path;
        debug!(authenticated = session.is_authenticated(), "hydrated session");
        Ok(session)
    }

    /// An in-memory session that is never written to disk
    pub fn ephemeral(token: Option<String>, profile: Option<Profile>) -> Self {
        Self {
            path: PathBuf::new(),
            token,
            user: None,
            profile,
        }
    }

    pub fn persist(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        let content = toml::to_string_pretty(self).map_err(|e| TrackerError::ConfigWrite {
            path: self.path.clone(),
            source: e,
        })?;
        write_private(&self.path, content.as_bytes())?;
        Ok(())
    }

    /// Forget everything and delete the stored file
    pub fn teardown(&mut self) -> Result<()> {
        self.token = None;
        self.user = None;
        self.profile = None;
        if !self.path.as_os_str().is_empty() && self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        debug!("session cleared");
        Ok(())
    }

    /// Adopt the token and user from a login or registration response
    pub fn establish(&mut self, payload: AuthPayload) {
        self.token = Some(payload.tokens.access_token);
        if let Some(profile) = payload.user.profile.clone() {
            self.profile = Some(profile);
        }
        self.user = Some(payload.user);
    }

    pub fn switch_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
    }

    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn profile_id(&self) -> Result<&str> {
        if !self.is_authenticated() {
            return Err(TrackerError::NotLoggedIn);
        }
        self.profile
            .as_ref()
            .map(|p| p.id.as_str())
            .ok_or(TrackerError::NoActiveProfile)
    }
}

/// Write a file only the owner can read, since it holds the bearer token
#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(content)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tokens;
    use tempfile::TempDir;

    fn payload() -> AuthPayload {
        AuthPayload {
            user: User {
                id: "u1".to_string(),
                email: "ana@example.com".to_string(),
                first_name: Some("Ana".to_string()),
                last_name: None,
                profile: Some(Profile {
                    id: "p1".to_string(),
                    profile_name: "Studio".to_string(),
                    currency: Some("USD".to_string()),
                    currency_symbol: Some("$".to_string()),
                }),
            },
            tokens: Tokens {
                access_token: "tok".to_string(),
                refresh_token: None,
            },
        }
    }

    #[test]
    fn test_missing_file_is_logged_out() {
        let dir = TempDir::new().unwrap();
        let session = Session::hydrate(dir.path()).unwrap();

        assert!(!session.is_authenticated());
        assert!(matches!(session.profile_id(), Err(TrackerError::NotLoggedIn)));
    }

    #[test]
    fn test_persist_and_hydrate() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::hydrate(dir.path()).unwrap();
        session.establish(payload());
        session.persist().unwrap();

        let restored = Session::hydrate(dir.path()).unwrap();
        assert_eq!(restored.token(), Some("tok"));
        assert_eq!(restored.profile_id().unwrap(), "p1");
        assert_eq!(restored.user().unwrap().display_name(), "Ana");
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SESSION_FILE);
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let mut session = Session::hydrate(dir.path()).unwrap();
        session.establish(payload());
        session.persist().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_teardown_removes_file() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::hydrate(dir.path()).unwrap();
        session.establish(payload());
        session.persist().unwrap();
        assert!(dir.path().join(SESSION_FILE).exists());

        session.teardown().unwrap();
        assert!(!session.is_authenticated());
        assert!(!dir.path().join(SESSION_FILE).exists());
    }

    #[test]
    fn test_no_profile_selected() {
        let session = Session::ephemeral(Some("tok".to_string()), None);
        assert!(matches!(
            session.profile_id(),
            Err(TrackerError::NoActiveProfile)
        ));
    }
}
