//! Project repository for SQLite operations

use sqlx::SqlitePool;

use crate::core::constants::HOME_PROJECT_PREFIX;
use crate::data::sqlite::SqliteError;
use crate::data::types::ProjectRow;

/// Name of the personal project for `login`
pub fn home_project_name(login: &str) -> String {
    format!("{}{}", HOME_PROJECT_PREFIX, login)
}

/// Create a project with a generated CUID2 ID
pub async fn create_project(
    pool: &SqlitePool,
    name: &str,
    owner_user_id: Option<&str>,
) -> Result<ProjectRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query("INSERT INTO projects (id, name, owner_user_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(name)
        .bind(owner_user_id)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| SqliteError::on_insert(e, &format!("project '{}'", name)))?;

    Ok(ProjectRow {
        id,
        name: name.to_string(),
        owner_user_id: owner_user_id.map(String::from),
        created_at: now,
    })
}

/// Get a project by name
pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<ProjectRow>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String, Option<String>, i64)>(
        "SELECT id, name, owner_user_id, created_at FROM projects WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, name, owner_user_id, created_at)| ProjectRow {
        id,
        name,
        owner_user_id,
        created_at,
    }))
}
