//! Client-side session state: access/refresh tokens and the cached user
//! profile, behind a pluggable storage backend.
//!
//! The expiry check only decodes the token payload; it never verifies the
//! signature. The issuer is trusted and real authorization is re-checked by
//! the backend on every forwarded call.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Navigation flag cookie consumed by the access gate.
pub const SESSION_COOKIE_NAME: &str = "auth-token";
pub const SESSION_COOKIE_VALUE: &str = "authenticated";
pub const SESSION_COOKIE_MAX_AGE_SECS: i64 = 7 * 24 * 3600;

const KEY_ACCESS_TOKEN: &str = "smartbin.access_token";
const KEY_REFRESH_TOKEN: &str = "smartbin.refresh_token";
const KEY_PROFILE: &str = "smartbin.user_profile";
const KEY_SESSION_FLAG: &str = "smartbin.session_flag";

/// `Set-Cookie` value marking the session as signed in.
pub fn session_cookie() -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE_NAME, SESSION_COOKIE_VALUE, SESSION_COOKIE_MAX_AGE_SECS
    )
}

/// `Set-Cookie` value expiring the session flag immediately.
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax",
        SESSION_COOKIE_NAME
    )
}

/// User role, ordered by capability: SUPER_ADMIN ⊇ ADMIN ⊇ VIEWER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "SUPER_ADMIN")]
    SuperAdmin,
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "VIEWER")]
    Viewer,
}

impl Role {
    fn rank(self) -> u8 {
        match self {
            Role::SuperAdmin => 2,
            Role::Admin => 1,
            Role::Viewer => 0,
        }
    }

    /// True when `self` carries at least the capabilities of `other`.
    pub fn at_least(self, other: Role) -> bool {
        self.rank() >= other.rank()
    }
}

/// Permission flags consumed by the dashboard UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPermissions {
    pub can_manage_users: bool,
    pub can_manage_bins: bool,
    pub can_manage_clients: bool,
    pub can_view_analytics: bool,
    pub can_export_data: bool,
}

impl UserPermissions {
    /// Baseline flags for a role. Every flag granted to a lower role is also
    /// granted to every higher role.
    pub fn for_role(role: Role) -> Self {
        Self {
            can_manage_users: role.at_least(Role::SuperAdmin),
            can_manage_bins: role.at_least(Role::Admin),
            can_manage_clients: role.at_least(Role::Admin),
            can_view_analytics: role.at_least(Role::Viewer),
            can_export_data: role.at_least(Role::Admin),
        }
    }

    fn flags(&self) -> [bool; 5] {
        [
            self.can_manage_users,
            self.can_manage_bins,
            self.can_manage_clients,
            self.can_view_analytics,
            self.can_export_data,
        ]
    }

    pub fn contains(&self, other: &UserPermissions) -> bool {
        self.flags()
            .iter()
            .zip(other.flags().iter())
            .all(|(mine, theirs)| *mine || !*theirs)
    }
}

/// UI preference bag, passed through as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserConfig {
    pub language: Option<String>,
    pub map_center: Option<[f64; 2]>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub permissions: UserPermissions,
    #[serde(default)]
    pub config: UserConfig,
}

impl UserProfile {
    /// Explicit flags merged with the role baseline (union).
    pub fn effective_permissions(&self) -> UserPermissions {
        let base = UserPermissions::for_role(self.role);
        UserPermissions {
            can_manage_users: base.can_manage_users || self.permissions.can_manage_users,
            can_manage_bins: base.can_manage_bins || self.permissions.can_manage_bins,
            can_manage_clients: base.can_manage_clients || self.permissions.can_manage_clients,
            can_view_analytics: base.can_view_analytics || self.permissions.can_view_analytics,
            can_export_data: base.can_export_data || self.permissions.can_export_data,
        }
    }
}

/// Successful sign-in or refresh payload from the backend.
/// Refresh responses usually omit `user`; the cached profile is kept then.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// Key-value storage seam so tests can run against an in-memory fake.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-memory backend, also the test fake.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// JSON-file backend in the data directory. All operations are best-effort:
/// an unreadable file behaves like an empty store.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> HashMap<String, String> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    fn store(&self, entries: &HashMap<String, String>) {
        if let Ok(content) = serde_json::to_string_pretty(entries) {
            if let Err(e) = fs::write(&self.path, content) {
                tracing::debug!("Failed to persist session file: {}", e);
            }
        }
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.load().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut entries = self.load();
        entries.insert(key.to_string(), value);
        self.store(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.load();
        if entries.remove(key).is_some() {
            self.store(&entries);
        }
    }
}

/// Credential and profile store with explicit lifecycle operations.
pub struct SessionStore {
    backend: Arc<dyn StorageBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Store tokens and profile from a sign-in or refresh response.
    /// Last write wins; nothing is merged. A response without a profile
    /// (token refresh) keeps the cached profile.
    pub fn set_auth_data(&self, auth: &AuthResponse) -> Result<(), String> {
        self.backend
            .set(KEY_ACCESS_TOKEN, auth.token.clone());

        match &auth.refresh_token {
            Some(refresh) => self.backend.set(KEY_REFRESH_TOKEN, refresh.clone()),
            None => self.backend.remove(KEY_REFRESH_TOKEN),
        }

        if let Some(user) = &auth.user {
            let serialized = serde_json::to_string(user)
                .map_err(|e| format!("Failed to serialize user profile: {}", e))?;
            self.backend.set(KEY_PROFILE, serialized);
        }

        self.backend
            .set(KEY_SESSION_FLAG, SESSION_COOKIE_VALUE.to_string());
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.backend.get(KEY_ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.backend.get(KEY_REFRESH_TOKEN)
    }

    pub fn user_profile(&self) -> Option<UserProfile> {
        let serialized = self.backend.get(KEY_PROFILE)?;
        serde_json::from_str(&serialized).ok()
    }

    /// Token presence only; expiry is a separate check.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Decode the token payload and compare its `exp` claim to now.
    /// Any decode failure counts as expired (fail-closed).
    pub fn is_token_expired(&self) -> bool {
        let Some(token) = self.token() else {
            return true;
        };
        match decode_claims(&token).and_then(|claims| claims.get("exp").and_then(|v| v.as_i64())) {
            Some(exp) => exp <= chrono::Utc::now().timestamp(),
            None => true,
        }
    }

    /// Clear every session key. Idempotent.
    pub fn remove_auth_data(&self) {
        self.backend.remove(KEY_ACCESS_TOKEN);
        self.backend.remove(KEY_REFRESH_TOKEN);
        self.backend.remove(KEY_PROFILE);
        self.backend.remove(KEY_SESSION_FLAG);
    }

    /// Token present and not expired; clears the session on failure.
    pub fn validate_auth(&self) -> bool {
        if self.is_authenticated() && !self.is_token_expired() {
            return true;
        }
        self.remove_auth_data();
        false
    }
}

/// Decode the middle JWT segment without verifying the signature.
fn decode_claims(token: &str) -> Option<serde_json::Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| general_purpose::URL_SAFE.decode(payload))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_with_exp(exp: i64) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload =
            general_purpose::URL_SAFE_NO_PAD.encode(json!({ "exp": exp }).to_string());
        format!("{}.{}.signature", header, payload)
    }

    fn sample_auth() -> AuthResponse {
        AuthResponse {
            token: token_with_exp(chrono::Utc::now().timestamp() + 3600),
            refresh_token: Some("refresh-1".to_string()),
            user: Some(UserProfile {
                username: "bilguun".to_string(),
                email: "bilguun@example.com".to_string(),
                role: Role::Admin,
                is_active: true,
                permissions: UserPermissions {
                    can_export_data: true,
                    ..UserPermissions::default()
                },
                config: UserConfig {
                    language: Some("mn".to_string()),
                    map_center: Some([47.918, 106.917]),
                    page_size: Some(25),
                },
            }),
        }
    }

    #[test]
    fn profile_round_trips_through_store() {
        let store = SessionStore::in_memory();
        let auth = sample_auth();
        store.set_auth_data(&auth).unwrap();

        let profile = store.user_profile().unwrap();
        assert_eq!(Some(profile), auth.user);
        assert_eq!(store.token().as_deref(), Some(auth.token.as_str()));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn remove_auth_data_leaves_store_unauthenticated() {
        let store = SessionStore::in_memory();
        store.set_auth_data(&sample_auth()).unwrap();
        assert!(store.is_authenticated());

        store.remove_auth_data();
        assert!(!store.is_authenticated());
        assert!(store.refresh_token().is_none());
        assert!(store.user_profile().is_none());

        // Idempotent
        store.remove_auth_data();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn expired_token_is_detected() {
        let store = SessionStore::in_memory();
        store
            .set_auth_data(&AuthResponse {
                token: token_with_exp(chrono::Utc::now().timestamp() - 60),
                refresh_token: None,
                user: None,
            })
            .unwrap();
        assert!(store.is_token_expired());
    }

    #[test]
    fn future_token_is_not_expired() {
        let store = SessionStore::in_memory();
        store
            .set_auth_data(&AuthResponse {
                token: token_with_exp(chrono::Utc::now().timestamp() + 600),
                refresh_token: None,
                user: None,
            })
            .unwrap();
        assert!(!store.is_token_expired());
    }

    #[test]
    fn malformed_token_fails_closed() {
        let store = SessionStore::in_memory();
        store
            .set_auth_data(&AuthResponse {
                token: "not-a-jwt".to_string(),
                refresh_token: None,
                user: None,
            })
            .unwrap();
        assert!(store.is_token_expired());
        assert!(!store.validate_auth());
        // validate_auth cleared the session as a side effect
        assert!(!store.is_authenticated());
    }

    #[test]
    fn missing_token_reads_as_absent_without_error() {
        let store = SessionStore::in_memory();
        assert!(store.token().is_none());
        assert!(!store.is_authenticated());
        assert!(store.is_token_expired());
    }

    #[test]
    fn refresh_without_profile_keeps_cached_profile() {
        let store = SessionStore::in_memory();
        store.set_auth_data(&sample_auth()).unwrap();
        store
            .set_auth_data(&AuthResponse {
                token: token_with_exp(chrono::Utc::now().timestamp() + 7200),
                refresh_token: Some("refresh-2".to_string()),
                user: None,
            })
            .unwrap();

        assert_eq!(store.refresh_token().as_deref(), Some("refresh-2"));
        assert_eq!(store.user_profile().unwrap().username, "bilguun");
    }

    #[test]
    fn role_capabilities_are_monotonic() {
        let super_admin = UserPermissions::for_role(Role::SuperAdmin);
        let admin = UserPermissions::for_role(Role::Admin);
        let viewer = UserPermissions::for_role(Role::Viewer);

        assert!(super_admin.contains(&admin));
        assert!(admin.contains(&viewer));
        assert!(super_admin.contains(&viewer));
        assert!(!viewer.contains(&admin));
    }

    #[test]
    fn effective_permissions_union_explicit_flags() {
        let profile = UserProfile {
            username: "viewer".to_string(),
            email: "viewer@example.com".to_string(),
            role: Role::Viewer,
            is_active: true,
            permissions: UserPermissions {
                can_export_data: true,
                ..UserPermissions::default()
            },
            config: UserConfig::default(),
        };
        let effective = profile.effective_permissions();
        assert!(effective.can_view_analytics);
        assert!(effective.can_export_data);
        assert!(!effective.can_manage_users);
    }

    #[test]
    fn file_backend_round_trips() {
        let dir = std::env::temp_dir().join(format!("smartbin-session-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let backend = FileBackend::new(dir.join("session.json"));

        backend.set("smartbin.access_token", "t1".to_string());
        assert_eq!(backend.get("smartbin.access_token").as_deref(), Some("t1"));
        backend.remove("smartbin.access_token");
        assert!(backend.get("smartbin.access_token").is_none());

        let _ = fs::remove_dir_all(&dir);
    }
}
