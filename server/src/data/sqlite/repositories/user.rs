//! User repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{NewUser, UserRow};

type UserTuple = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
    i64,
    i64,
);

const USER_COLUMNS: &str =
    "id, login, email, realname, password_hash, is_admin, created_at, updated_at";

fn to_row(
    (id, login, email, realname, password_hash, is_admin, created_at, updated_at): UserTuple,
) -> UserRow {
    UserRow {
        id,
        login,
        email,
        realname,
        password_hash,
        is_admin,
        created_at,
        updated_at,
    }
}

/// Create a new user with a generated CUID2 ID
///
/// A login that is already taken yields `SqliteError::Conflict`.
pub async fn create_user(pool: &SqlitePool, user: &NewUser) -> Result<UserRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO users (id, login, email, realname, password_hash, is_admin, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&user.login)
    .bind(&user.email)
    .bind(&user.realname)
    .bind(&user.password_hash)
    .bind(user.is_admin)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| SqliteError::on_insert(e, &format!("user '{}'", user.login)))?;

    Ok(UserRow {
        id,
        login: user.login.clone(),
        email: user.email.clone(),
        realname: user.realname.clone(),
        password_hash: user.password_hash.clone(),
        is_admin: user.is_admin,
        created_at: now,
        updated_at: now,
    })
}

/// Get a user by ID
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserTuple>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_row))
}

/// Get a user by exact login
pub async fn get_by_login(pool: &SqlitePool, login: &str) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserTuple>(&format!(
        "SELECT {} FROM users WHERE login = ?",
        USER_COLUMNS
    ))
    .bind(login)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_row))
}

/// Replace a user's password hash. Returns false if the user does not exist.
pub async fn set_password_hash(
    pool: &SqlitePool,
    id: &str,
    hash: &str,
) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(hash)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    fn new_user(login: &str) -> NewUser {
        NewUser {
            login: login.to_string(),
            email: Some(format!("{}@example.org", login)),
            realname: Some("Bob Geldof".to_string()),
            password_hash: None,
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_create_user() {
        let pool = setup_test_pool().await;
        let user = create_user(&pool, &new_user("bob")).await.unwrap();

        assert!(!user.id.is_empty());
        assert_eq!(user.login, "bob");
        assert_eq!(user.email.as_deref(), Some("bob@example.org"));
        assert_eq!(user.realname.as_deref(), Some("Bob Geldof"));
        assert!(!user.is_admin);
        assert!(user.created_at > 0);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[tokio::test]
    async fn test_create_user_duplicate_login_conflicts() {
        let pool = setup_test_pool().await;
        create_user(&pool, &new_user("bob")).await.unwrap();

        let err = create_user(&pool, &new_user("bob")).await.unwrap_err();
        assert!(matches!(err, SqliteError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_user_and_by_login() {
        let pool = setup_test_pool().await;
        let created = create_user(&pool, &new_user("tux")).await.unwrap();

        let by_id = get_user(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);

        let by_login = get_by_login(&pool, "tux").await.unwrap().unwrap();
        assert_eq!(by_login.id, created.id);
    }

    #[tokio::test]
    async fn test_get_by_login_is_exact() {
        let pool = setup_test_pool().await;
        create_user(&pool, &new_user("tux")).await.unwrap();

        assert!(get_by_login(&pool, "Tux").await.unwrap().is_none());
        assert!(get_by_login(&pool, "tu").await.unwrap().is_none());
        assert!(get_user(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_password_hash() {
        let pool = setup_test_pool().await;
        let created = create_user(&pool, &new_user("tom")).await.unwrap();

        assert!(set_password_hash(&pool, &created.id, "$argon2id$x").await.unwrap());
        let fetched = get_user(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(fetched.password_hash.as_deref(), Some("$argon2id$x"));

        assert!(!set_password_hash(&pool, "missing", "h").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_admin_with_hash() {
        let pool = setup_test_pool().await;
        let mut admin = new_user("root");
        admin.is_admin = true;
        admin.password_hash = Some("$argon2id$y".to_string());
        let created = create_user(&pool, &admin).await.unwrap();

        let fetched = get_by_login(&pool, "root").await.unwrap().unwrap();
        assert!(fetched.is_admin);
        assert_eq!(fetched.password_hash, created.password_hash);
    }
}
