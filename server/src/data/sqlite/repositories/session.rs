//! Session record repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::SessionRow;

/// Delete the prior session (if any) and insert the new one in a single transaction
pub async fn rotate(
    pool: &SqlitePool,
    prior_id: Option<&str>,
    session: &SessionRow,
) -> Result<(), SqliteError> {
    let mut tx = pool.begin().await?;

    if let Some(prior_id) = prior_id {
        let removed = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(prior_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tracing::trace!(removed, "Prior session invalidated");
    }

    sqlx::query(
        "INSERT INTO sessions (id, user_id, auth_method, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.auth_method)
    .bind(session.created_at)
    .bind(session.expires_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| SqliteError::on_insert(e, "session"))?;

    tx.commit().await?;
    Ok(())
}

/// Get a session by ID (expired records are returned as-is)
pub async fn get_session(pool: &SqlitePool, id: &str) -> Result<Option<SessionRow>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String, String, i64, i64)>(
        "SELECT id, user_id, auth_method, created_at, expires_at FROM sessions WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(id, user_id, auth_method, created_at, expires_at)| SessionRow {
            id,
            user_id,
            auth_method,
            created_at,
            expires_at,
        },
    ))
}

pub async fn delete_session(pool: &SqlitePool, id: &str) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_expired(pool: &SqlitePool, now: i64) -> Result<u64, SqliteError> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::user::create_user;
    use crate::data::types::NewUser;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> (SqlitePool, String) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        let user = create_user(
            &pool,
            &NewUser {
                login: "tom".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (pool, user.id)
    }

    fn session(id: &str, user_id: &str, expires_at: i64) -> SessionRow {
        SessionRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            auth_method: "password".to_string(),
            created_at: 10,
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_rotate_without_prior() {
        let (pool, user_id) = setup().await;
        let s = session("s1", &user_id, 1000);
        rotate(&pool, None, &s).await.unwrap();

        assert_eq!(get_session(&pool, "s1").await.unwrap(), Some(s));
    }

    #[tokio::test]
    async fn test_rotate_replaces_prior() {
        let (pool, user_id) = setup().await;
        rotate(&pool, None, &session("s1", &user_id, 1000))
            .await
            .unwrap();
        rotate(&pool, Some("s1"), &session("s2", &user_id, 2000))
            .await
            .unwrap();

        assert!(get_session(&pool, "s1").await.unwrap().is_none());
        assert!(get_session(&pool, "s2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rotate_unknown_prior_still_inserts() {
        let (pool, user_id) = setup().await;
        rotate(&pool, Some("never-existed"), &session("s1", &user_id, 1000))
            .await
            .unwrap();
        assert!(get_session(&pool, "s1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rotate_failure_keeps_prior() {
        let (pool, user_id) = setup().await;
        rotate(&pool, None, &session("s1", &user_id, 1000))
            .await
            .unwrap();
        rotate(&pool, None, &session("s2", &user_id, 1000))
            .await
            .unwrap();

        // Inserting a duplicate id fails; the prior delete must roll back
        let err = rotate(&pool, Some("s1"), &session("s2", &user_id, 3000))
            .await
            .unwrap_err();
        assert!(matches!(err, SqliteError::Conflict(_)));
        assert!(get_session(&pool, "s1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (pool, user_id) = setup().await;
        rotate(&pool, None, &session("s1", &user_id, 1000))
            .await
            .unwrap();

        assert!(delete_session(&pool, "s1").await.unwrap());
        assert!(!delete_session(&pool, "s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let (pool, user_id) = setup().await;
        rotate(&pool, None, &session("old", &user_id, 100))
            .await
            .unwrap();
        rotate(&pool, None, &session("edge", &user_id, 200))
            .await
            .unwrap();
        rotate(&pool, None, &session("fresh", &user_id, 300))
            .await
            .unwrap();

        assert_eq!(delete_expired(&pool, 200).await.unwrap(), 2);
        assert!(get_session(&pool, "fresh").await.unwrap().is_some());
        assert!(get_session(&pool, "edge").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_deletion_cascades() {
        let (pool, user_id) = setup().await;
        rotate(&pool, None, &session("s1", &user_id, 1000))
            .await
            .unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(&user_id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(get_session(&pool, "s1").await.unwrap().is_none());
    }
}
