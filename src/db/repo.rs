use super::model::CatalogEntry;
use crate::model::{Exercise, ExerciseUpdate, MuscleGroup, NewExercise, User};
use anyhow::{bail, Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {normalized}"))?
        .create_if_missing(true)
        .foreign_keys(true);

    // Every connection to `:memory:` is a separate database, so keep exactly one alive.
    if normalized.starts_with("sqlite::memory") {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;
        return Ok(pool);
    }

    let pool = SqlitePoolOptions::new()
        .connect_with(options.journal_mode(SqliteJournalMode::Wal))
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ---- users ----

/// Creates the user on first contact, refreshes the username afterwards.
/// A stored bot token is preserved.
#[instrument(skip_all)]
pub async fn upsert_user(pool: &Pool, telegram_id: i64, username: Option<&str>) -> Result<()> {
    sqlx::query(
        "INSERT INTO users (telegram_id, username) VALUES (?, ?) \
         ON CONFLICT(telegram_id) DO UPDATE SET username = excluded.username",
    )
    .bind(telegram_id)
    .bind(username)
    .execute(pool)
    .await
    .context("failed to upsert user")?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn get_user(pool: &Pool, telegram_id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT telegram_id, username, bot_token, created_at FROM users WHERE telegram_id = ?",
    )
    .bind(telegram_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

#[instrument(skip_all)]
pub async fn set_user_token(pool: &Pool, telegram_id: i64, token: &str) -> Result<bool> {
    let res = sqlx::query("UPDATE users SET bot_token = ? WHERE telegram_id = ?")
        .bind(token)
        .bind(telegram_id)
        .execute(pool)
        .await
        .context("failed to store bot token")?;
    Ok(res.rows_affected() > 0)
}

// ---- muscle groups ----

/// Returns `false` when the user already has a group with this name.
#[instrument(skip_all)]
pub async fn add_muscle_group(pool: &Pool, user_id: i64, name: &str) -> Result<bool> {
    let res = sqlx::query("INSERT INTO muscle_groups (user_id, name) VALUES (?, ?)")
        .bind(user_id)
        .bind(name)
        .execute(pool)
        .await;
    match res {
        Ok(_) => {
            info!(user_id, name, "added muscle group");
            Ok(true)
        }
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err).context("failed to insert muscle group"),
    }
}

#[instrument(skip_all)]
pub async fn get_muscle_groups(pool: &Pool, user_id: i64) -> Result<Vec<MuscleGroup>> {
    let groups = sqlx::query_as::<_, MuscleGroup>(
        "SELECT id, user_id, name FROM muscle_groups WHERE user_id = ? ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(groups)
}

#[instrument(skip_all)]
pub async fn get_muscle_group_by_name(
    pool: &Pool,
    user_id: i64,
    name: &str,
) -> Result<Option<MuscleGroup>> {
    let group = sqlx::query_as::<_, MuscleGroup>(
        "SELECT id, user_id, name FROM muscle_groups WHERE user_id = ? AND name = ?",
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(group)
}

/// Returns `false` if the group is missing or the new name is taken.
#[instrument(skip_all)]
pub async fn rename_muscle_group(
    pool: &Pool,
    user_id: i64,
    group_id: i64,
    new_name: &str,
) -> Result<bool> {
    let res = sqlx::query("UPDATE muscle_groups SET name = ? WHERE id = ? AND user_id = ?")
        .bind(new_name)
        .bind(group_id)
        .bind(user_id)
        .execute(pool)
        .await;
    match res {
        Ok(done) => Ok(done.rows_affected() > 0),
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err).context("failed to rename muscle group"),
    }
}

/// Exercises of the deleted group keep existing with a NULL group.
#[instrument(skip_all)]
pub async fn delete_muscle_group(pool: &Pool, user_id: i64, group_id: i64) -> Result<bool> {
    let res = sqlx::query("DELETE FROM muscle_groups WHERE id = ? AND user_id = ?")
        .bind(group_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("failed to delete muscle group")?;
    Ok(res.rows_affected() > 0)
}

async fn ensure_group_owned(pool: &Pool, user_id: i64, group_id: i64) -> Result<()> {
    let owner: Option<i64> = sqlx::query_scalar("SELECT user_id FROM muscle_groups WHERE id = ?")
        .bind(group_id)
        .fetch_optional(pool)
        .await?;
    match owner {
        Some(owner) if owner == user_id => Ok(()),
        _ => bail!("muscle group {} does not belong to user {}", group_id, user_id),
    }
}

// ---- exercises ----

/// Returns `false` when the user already has an exercise with this name.
#[instrument(skip_all)]
pub async fn add_exercise(pool: &Pool, user_id: i64, exercise: &NewExercise) -> Result<bool> {
    if let Some(group_id) = exercise.muscle_group {
        ensure_group_owned(pool, user_id, group_id).await?;
    }
    let res = sqlx::query(
        "INSERT INTO exercises (user_id, muscle_group, name, video, description) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(exercise.muscle_group)
    .bind(&exercise.name)
    .bind(&exercise.video)
    .bind(&exercise.description)
    .execute(pool)
    .await;
    match res {
        Ok(_) => {
            info!(user_id, name = %exercise.name, "added exercise");
            Ok(true)
        }
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err).context("failed to insert exercise"),
    }
}

/// The user's exercises with group names, grouped exercises first.
#[instrument(skip_all)]
pub async fn get_exercises(pool: &Pool, user_id: i64) -> Result<Vec<CatalogEntry>> {
    let rows = sqlx::query_as::<_, CatalogEntry>(
        "SELECT e.id, e.name, e.muscle_group, g.name AS muscle_group_name, e.video, e.description \
         FROM exercises e \
         LEFT JOIN muscle_groups g ON g.id = e.muscle_group \
         WHERE e.user_id = ? \
         ORDER BY g.id IS NULL, g.id, e.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn get_exercise_by_name(pool: &Pool, user_id: i64, name: &str) -> Result<Option<Exercise>> {
    let exercise = sqlx::query_as::<_, Exercise>(
        "SELECT id, user_id, muscle_group, name, video, description FROM exercises \
         WHERE user_id = ? AND name = ?",
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(exercise)
}

/// Rewrites only the supplied columns. Returns `false` for an empty update,
/// a missing exercise or a name collision.
#[instrument(skip_all)]
pub async fn update_exercise(
    pool: &Pool,
    user_id: i64,
    exercise_id: i64,
    update: &ExerciseUpdate,
) -> Result<bool> {
    if update.is_empty() {
        return Ok(false);
    }
    if let Some(group_id) = update.muscle_group {
        ensure_group_owned(pool, user_id, group_id).await?;
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE exercises SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(group_id) = update.muscle_group {
            set.push("muscle_group = ").push_bind_unseparated(group_id);
        }
        if let Some(name) = &update.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(video) = &update.video {
            set.push("video = ").push_bind_unseparated(video.clone());
        }
        if let Some(description) = &update.description {
            set.push("description = ").push_bind_unseparated(description.clone());
        }
    }
    qb.push(" WHERE id = ")
        .push_bind(exercise_id)
        .push(" AND user_id = ")
        .push_bind(user_id);

    match qb.build().execute(pool).await {
        Ok(done) => Ok(done.rows_affected() > 0),
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err).context("failed to update exercise"),
    }
}

#[instrument(skip_all)]
pub async fn delete_exercise(pool: &Pool, user_id: i64, exercise_id: i64) -> Result<bool> {
    let res = sqlx::query("DELETE FROM exercises WHERE id = ? AND user_id = ?")
        .bind(exercise_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("failed to delete exercise")?;
    Ok(res.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> Pool {
        let pool = init_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[test]
    fn memory_and_foreign_urls_pass_through() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(prepare_sqlite_url("postgres://x/y"), "postgres://x/y");
    }

    #[test]
    fn file_url_is_normalised_and_parent_created() {
        let td = tempfile::tempdir().unwrap();
        let db_path = td.path().join("nested").join("bot.db");
        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let normalized = prepare_sqlite_url(&url);
        assert_eq!(normalized, format!("sqlite://{}?mode=rwc", db_path.display()));
        assert!(td.path().join("nested").exists());
    }

    #[tokio::test]
    async fn upsert_keeps_token_and_refreshes_username() {
        let pool = setup_pool().await;
        upsert_user(&pool, 1, Some("old")).await.unwrap();
        assert!(set_user_token(&pool, 1, "123456789:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAA").await.unwrap());
        upsert_user(&pool, 1, Some("new")).await.unwrap();

        let user = get_user(&pool, 1).await.unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("new"));
        assert!(user.bot_token.is_some());
        assert!(get_user(&pool, 2).await.unwrap().is_none());
        assert!(!set_user_token(&pool, 2, "x").await.unwrap());
    }

    #[tokio::test]
    async fn empty_update_is_a_noop() {
        let pool = setup_pool().await;
        upsert_user(&pool, 1, None).await.unwrap();
        let ex = NewExercise { name: "Жим".into(), ..Default::default() };
        assert!(add_exercise(&pool, 1, &ex).await.unwrap());
        let stored = get_exercise_by_name(&pool, 1, "Жим").await.unwrap().unwrap();

        assert!(!update_exercise(&pool, 1, stored.id, &ExerciseUpdate::default()).await.unwrap());
        let after = get_exercise_by_name(&pool, 1, "Жим").await.unwrap().unwrap();
        assert_eq!(stored, after);
    }

    #[tokio::test]
    async fn partial_update_touches_only_given_columns() {
        let pool = setup_pool().await;
        upsert_user(&pool, 1, None).await.unwrap();
        let ex = NewExercise {
            name: "Присед".into(),
            video: "https://v".into(),
            description: "глубоко".into(),
            ..Default::default()
        };
        add_exercise(&pool, 1, &ex).await.unwrap();
        let stored = get_exercise_by_name(&pool, 1, "Присед").await.unwrap().unwrap();

        let update = ExerciseUpdate { description: Some("медленно".into()), ..Default::default() };
        assert!(update_exercise(&pool, 1, stored.id, &update).await.unwrap());

        let after = get_exercise_by_name(&pool, 1, "Присед").await.unwrap().unwrap();
        assert_eq!(after.description, "медленно");
        assert_eq!(after.video, "https://v");
    }
}
