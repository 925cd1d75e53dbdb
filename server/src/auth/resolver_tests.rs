use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue};

use super::*;
use crate::auth::directory::DirectoryClient;
use crate::auth::identity::Credentials;
use crate::auth::password::hash_password;
use crate::auth::testing::{FakeDirectory, Failure, directory_config, tux_entry};
use crate::core::config::AuthConfig;
use crate::data::sqlite::SqliteService;
use crate::data::{NewUser, UserRepository};

struct Harness {
    db: Arc<SqliteService>,
    resolver: AuthResolver,
}

async fn harness(mode: TrustMode, directory: Option<FakeDirectory>) -> Harness {
    let db = Arc::new(SqliteService::in_memory().await.unwrap());
    let config = AuthConfig {
        trust_mode: mode,
        directory: Some(directory_config()),
        ..Default::default()
    };
    let client = directory.map(|d| Arc::new(d) as Arc<dyn DirectoryClient>);
    let strategy = AuthStrategy::from_config(&config, Arc::new(db.clone()), client).unwrap();
    let provisioner = UserProvisioner::new(Arc::new(db.clone()), config.create_home_project);
    let sessions = Arc::new(SessionManager::new(
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        vec![3u8; 32],
        config.session_ttl_days,
    ));
    Harness {
        db: db.clone(),
        resolver: AuthResolver::new(strategy, provisioner, sessions),
    }
}

impl Harness {
    async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.db.pool())
            .await
            .unwrap()
    }

    async fn add_local_user(&self, login: &str, password: &str) -> UserRow {
        self.db
            .create_user(&NewUser {
                login: login.to_string(),
                email: Some(format!("{}@example.org", login)),
                realname: Some("Alice Liddell".to_string()),
                password_hash: Some(hash_password(password).unwrap()),
                is_admin: false,
            })
            .await
            .unwrap()
    }
}

fn proxy_headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(*name, HeaderValue::from_str(value).unwrap());
    }
    map
}

fn bob_headers() -> HeaderMap {
    proxy_headers(&[
        ("x-username", "new_user"),
        ("x-email", "new_user@obs.com"),
        ("x-firstname", "Bob"),
        ("x-lastname", "Geldof"),
    ])
}

fn login(login: &str, password: &str) -> AuthRequest {
    AuthRequest::default().with_credentials(Credentials::new(login, password))
}

#[tokio::test]
async fn test_proxy_new_identity_is_provisioned() {
    let h = harness(TrustMode::Proxy, None).await;

    let resolved = h
        .resolver
        .resolve(&AuthRequest::new(bob_headers()))
        .await
        .unwrap();

    assert_eq!(resolved.user.login, "new_user");
    assert_eq!(resolved.user.realname.as_deref(), Some("Bob Geldof"));
    assert_eq!(resolved.user.email.as_deref(), Some("new_user@obs.com"));
    assert!(resolved.token.is_some());
    assert_eq!(h.count("users").await, 1);
    assert_eq!(h.count("projects").await, 1);
    assert_eq!(h.count("sessions").await, 1);
}

#[tokio::test]
async fn test_proxy_without_header_is_anonymous() {
    let h = harness(TrustMode::Proxy, None).await;
    let result = h.resolver.resolve(&AuthRequest::default()).await;
    assert!(matches!(result, Err(AuthError::Unauthenticated)));
    assert_eq!(h.count("users").await, 0);
}

#[tokio::test]
async fn test_proxy_forged_login_header_fails() {
    let h = harness(TrustMode::Proxy, None).await;
    let mut headers = proxy_headers(&[("x-username", "alice")]);
    headers.append("x-username", HeaderValue::from_static("mallory"));

    let result = h.resolver.resolve(&AuthRequest::new(headers)).await;

    assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    assert_eq!(h.count("users").await, 0);
    assert_eq!(h.count("sessions").await, 0);
}

#[tokio::test]
async fn test_session_storage_failure_is_not_anonymous() {
    let h = harness(TrustMode::Local, None).await;
    h.add_local_user("alice", "rabbit-hole").await;
    let token = h
        .resolver
        .resolve(&login("alice", "rabbit-hole"))
        .await
        .unwrap()
        .token
        .unwrap()
        .value;
    h.db.close().await;

    let result = h
        .resolver
        .resolve(&AuthRequest::default().with_session_token(token))
        .await;
    assert!(matches!(result, Err(AuthError::Persistence(_))));
}

#[tokio::test]
async fn test_proxy_session_is_dropped_when_header_disappears() {
    let h = harness(TrustMode::Proxy, None).await;
    let first = h
        .resolver
        .resolve(&AuthRequest::new(bob_headers()))
        .await
        .unwrap();
    let token = first.token.unwrap().value;

    let result = h
        .resolver
        .resolve(&AuthRequest::default().with_session_token(token))
        .await;
    assert!(matches!(result, Err(AuthError::Unauthenticated)));
}

#[tokio::test]
async fn test_repeated_proxy_logins_do_not_change_user() {
    let h = harness(TrustMode::Proxy, None).await;
    let first = h
        .resolver
        .resolve(&AuthRequest::new(bob_headers()))
        .await
        .unwrap();

    let renamed = proxy_headers(&[
        ("x-username", "new_user"),
        ("x-email", "changed@obs.com"),
        ("x-firstname", "Robert"),
        ("x-lastname", "Geldof"),
    ]);
    let second = h.resolver.resolve(&AuthRequest::new(renamed)).await.unwrap();

    assert_eq!(first.user, second.user);
    assert_eq!(h.count("users").await, 1);
    assert_eq!(h.count("projects").await, 1);
}

#[tokio::test]
async fn test_proxy_keeps_matching_session() {
    let h = harness(TrustMode::Proxy, None).await;
    let first = h
        .resolver
        .resolve(&AuthRequest::new(bob_headers()))
        .await
        .unwrap();
    let token = first.token.unwrap().value;

    let again = h
        .resolver
        .resolve(&AuthRequest::new(bob_headers()).with_session_token(token.clone()))
        .await
        .unwrap();
    assert!(again.token.is_none());
    assert_eq!(h.count("sessions").await, 1);

    // A different proxied login replaces the session
    let other = h
        .resolver
        .resolve(
            &AuthRequest::new(proxy_headers(&[("x-username", "someone_else")]))
                .with_session_token(token.clone()),
        )
        .await
        .unwrap();
    assert_eq!(other.user.login, "someone_else");
    assert!(other.token.is_some());
    assert!(h.resolver.sessions().try_current(&token).await.unwrap().is_none());
    assert_eq!(h.count("sessions").await, 1);
}

#[tokio::test]
async fn test_disabled_mode_ignores_headers_and_credentials() {
    let h = harness(TrustMode::Disabled, None).await;
    h.add_local_user("alice", "rabbit-hole").await;

    let request = AuthRequest::new(bob_headers())
        .with_credentials(Credentials::new("alice", "rabbit-hole"));
    let result = h.resolver.resolve(&request).await;

    assert!(matches!(result, Err(AuthError::Unauthenticated)));
    assert_eq!(h.count("users").await, 1);
    assert_eq!(h.count("sessions").await, 0);
}

#[tokio::test]
async fn test_disabled_mode_honors_existing_session() {
    let h = harness(TrustMode::Disabled, None).await;
    let alice = h.add_local_user("alice", "rabbit-hole").await;
    let token = h
        .resolver
        .sessions()
        .start(None, &alice, "password")
        .await
        .unwrap();

    let resolved = h
        .resolver
        .resolve(&AuthRequest::default().with_session_token(token.value))
        .await
        .unwrap();
    assert_eq!(resolved.user, alice);
    assert!(resolved.token.is_none());
}

#[tokio::test]
async fn test_local_wrong_password_creates_no_session() {
    let h = harness(TrustMode::Local, None).await;
    h.add_local_user("alice", "rabbit-hole").await;

    let result = h.resolver.resolve(&login("alice", "wrong")).await;

    assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    assert_eq!(h.count("sessions").await, 0);
}

#[tokio::test]
async fn test_local_unknown_login_is_indistinguishable() {
    let h = harness(TrustMode::Local, None).await;
    let result = h.resolver.resolve(&login("nobody", "whatever")).await;
    assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    assert_eq!(h.count("users").await, 0);
}

#[tokio::test]
async fn test_local_login_then_resume() {
    let h = harness(TrustMode::Local, None).await;
    let alice = h.add_local_user("alice", "rabbit-hole").await;

    let resolved = h
        .resolver
        .resolve(&login("alice", "rabbit-hole"))
        .await
        .unwrap();
    assert_eq!(resolved.user, alice);
    let token = resolved.token.unwrap().value;

    let resumed = h
        .resolver
        .resolve(&AuthRequest::default().with_session_token(token))
        .await
        .unwrap();
    assert_eq!(resumed.user, alice);
    assert!(resumed.token.is_none());
}

#[tokio::test]
async fn test_login_rotates_presented_session() {
    let h = harness(TrustMode::Local, None).await;
    h.add_local_user("alice", "rabbit-hole").await;

    let first = h
        .resolver
        .resolve(&login("alice", "rabbit-hole"))
        .await
        .unwrap()
        .token
        .unwrap()
        .value;
    let second = h
        .resolver
        .resolve(&login("alice", "rabbit-hole").with_session_token(first.clone()))
        .await
        .unwrap()
        .token
        .unwrap()
        .value;

    assert_ne!(first, second);
    assert!(h.resolver.sessions().try_current(&first).await.unwrap().is_none());
    assert_eq!(h.count("sessions").await, 1);
}

#[tokio::test]
async fn test_failed_login_keeps_existing_session() {
    let h = harness(TrustMode::Local, None).await;
    h.add_local_user("alice", "rabbit-hole").await;
    let token = h
        .resolver
        .resolve(&login("alice", "rabbit-hole"))
        .await
        .unwrap()
        .token
        .unwrap()
        .value;

    let result = h
        .resolver
        .resolve(&login("alice", "wrong").with_session_token(token.clone()))
        .await;
    assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    assert!(h.resolver.sessions().try_current(&token).await.unwrap().is_some());
}

#[tokio::test]
async fn test_logout_keeps_user() {
    let h = harness(TrustMode::Local, None).await;
    let alice = h.add_local_user("alice", "rabbit-hole").await;
    let token = h
        .resolver
        .resolve(&login("alice", "rabbit-hole"))
        .await
        .unwrap()
        .token
        .unwrap()
        .value;

    let request = AuthRequest::default().with_session_token(token.clone());
    h.resolver.logout(&request).await.unwrap();

    assert!(h.resolver.sessions().try_current(&token).await.unwrap().is_none());
    assert!(matches!(
        h.resolver.resolve(&request).await,
        Err(AuthError::Unauthenticated)
    ));
    assert_eq!(h.db.find_user_by_login("alice").await.unwrap(), Some(alice));
}

#[tokio::test]
async fn test_logout_without_session_is_noop() {
    let h = harness(TrustMode::Local, None).await;
    h.resolver.logout(&AuthRequest::default()).await.unwrap();
}

#[tokio::test]
async fn test_directory_login_provisions_user() {
    let directory = FakeDirectory::new().with_entry(tux_entry(), "tux_password");
    let h = harness(TrustMode::Directory, Some(directory.clone())).await;

    let resolved = h
        .resolver
        .resolve(&login("tux", "tux_password"))
        .await
        .unwrap();

    assert_eq!(resolved.user.login, "tux");
    assert_eq!(resolved.user.realname.as_deref(), Some("Tux"));
    assert_eq!(resolved.user.email.as_deref(), Some("tux@example.org"));
    assert!(resolved.token.is_some());
    assert_eq!(h.count("sessions").await, 1);
    assert_eq!(directory.unbinds(), 1);
}

#[tokio::test]
async fn test_directory_no_or_ambiguous_match_fails() {
    let twin = tux_entry();
    let directory = FakeDirectory::new()
        .with_entry(tux_entry(), "tux_password")
        .with_entry(twin, "tux_password");
    let h = harness(TrustMode::Directory, Some(directory)).await;

    for (user, password) in [("tux", "tux_password"), ("ghost", "tux_password")] {
        let result = h.resolver.resolve(&login(user, password)).await;
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }
    assert_eq!(h.count("users").await, 0);
    assert_eq!(h.count("sessions").await, 0);
}

#[tokio::test]
async fn test_directory_outage_is_distinct_from_bad_credentials() {
    let directory = FakeDirectory::new()
        .with_entry(tux_entry(), "tux_password")
        .failing(Failure::Search);
    let h = harness(TrustMode::Directory, Some(directory.clone())).await;

    let result = h.resolver.resolve(&login("tux", "tux_password")).await;

    assert!(matches!(result, Err(AuthError::DirectoryUnavailable(_))));
    assert_eq!(directory.unbinds(), 1);
    assert_eq!(h.count("sessions").await, 0);
}

#[tokio::test]
async fn test_directory_without_credentials_resumes_session() {
    let directory = FakeDirectory::new().with_entry(tux_entry(), "tux_password");
    let h = harness(TrustMode::Directory, Some(directory.clone())).await;

    let token = h
        .resolver
        .resolve(&login("tux", "tux_password"))
        .await
        .unwrap()
        .token
        .unwrap()
        .value;

    let resumed = h
        .resolver
        .resolve(&AuthRequest::default().with_session_token(token))
        .await
        .unwrap();
    assert_eq!(resumed.user.login, "tux");
    assert_eq!(directory.connects(), 1);
}

#[tokio::test]
async fn test_concurrent_first_proxy_logins() {
    let h = Arc::new(harness(TrustMode::Proxy, None).await);

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                h.resolver
                    .resolve(&AuthRequest::new(bob_headers()))
                    .await
                    .map(|r| r.user.id)
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(h.count("users").await, 1);
    assert_eq!(h.count("projects").await, 1);
}
