//! ltk-db
//!
//! Persistence gateway. [`ScoreStore`] is the only surface the runtime sees;
//! [`PgScoreStore`] backs it with Postgres. Every call is individually
//! atomic; callers never assume a transaction spans two calls.

use anyhow::{anyhow, bail, Context, Result};
use ltk_reconcile::{RosterEntry, SessionLength};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::debug;

pub const ENV_DB_URL: &str = "LTK_DATABASE_URL";

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait ScoreStore: Send + Sync {
    /// Full roster, in a stable order.
    async fn get_roster(&self) -> Result<Vec<RosterEntry>>;

    /// Replace an entry's score sequence and its derived average in one write.
    async fn write_scores(&self, id: &str, scores: &[Option<u32>], average: f64) -> Result<()>;

    async fn get_session_length(&self) -> Result<SessionLength>;

    async fn set_session_length(&self, len: SessionLength) -> Result<()>;
}

#[async_trait::async_trait]
impl<T: ScoreStore + ?Sized> ScoreStore for Box<T> {
    async fn get_roster(&self) -> Result<Vec<RosterEntry>> {
        (**self).get_roster().await
    }

    async fn write_scores(&self, id: &str, scores: &[Option<u32>], average: f64) -> Result<()> {
        (**self).write_scores(id, scores, average).await
    }

    async fn get_session_length(&self) -> Result<SessionLength> {
        (**self).get_session_length().await
    }

    async fn set_session_length(&self, len: SessionLength) -> Result<()> {
        (**self).set_session_length(len).await
    }
}

// ---------------------------------------------------------------------------
// Connection helpers
// ---------------------------------------------------------------------------

/// Connect to Postgres using LTK_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(4)
        .connect(url)
        .await
        .context("failed to connect to Postgres")
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_bowlers_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='bowlers'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_bowlers_table: exists,
    })
}

// ---------------------------------------------------------------------------
// Postgres store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgScoreStore {
    pool: PgPool,
}

impl PgScoreStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn scores_to_db(scores: &[Option<u32>]) -> Result<Vec<Option<i32>>> {
    scores
        .iter()
        .map(|s| {
            s.map(|v| i32::try_from(v).map_err(|_| anyhow!("score {v} out of int4 range")))
                .transpose()
        })
        .collect()
}

fn scores_from_db(id: &str, raw: Vec<Option<i32>>) -> Result<Vec<Option<u32>>> {
    raw.into_iter()
        .map(|s| {
            s.map(|v| {
                u32::try_from(v).map_err(|_| anyhow!("bowler {id} has negative score {v}"))
            })
            .transpose()
        })
        .collect()
}

#[async_trait::async_trait]
impl ScoreStore for PgScoreStore {
    async fn get_roster(&self) -> Result<Vec<RosterEntry>> {
        let rows = sqlx::query(
            r#"
            select id, name, nicknames, scores, average
            from bowlers
            order by name asc, id asc
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("get_roster failed")?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let nicknames: Vec<String> = row.try_get("nicknames")?;
            let raw_scores: Vec<Option<i32>> = row.try_get("scores")?;
            let scores = scores_from_db(&id, raw_scores)?;
            out.push(RosterEntry {
                name: row.try_get("name")?,
                nicknames: nicknames.into_iter().collect(),
                scores,
                average: row.try_get("average")?,
                id,
            });
        }
        debug!(entries = out.len(), "roster loaded");
        Ok(out)
    }

    async fn write_scores(&self, id: &str, scores: &[Option<u32>], average: f64) -> Result<()> {
        let db_scores = scores_to_db(scores)?;
        let res = sqlx::query(
            r#"
            update bowlers
               set scores = $2,
                   average = $3,
                   updated_at_utc = now()
             where id = $1
            "#,
        )
        .bind(id)
        .bind(&db_scores)
        .bind(average)
        .execute(&self.pool)
        .await
        .with_context(|| format!("write_scores failed for bowler {id}"))?;

        if res.rows_affected() != 1 {
            bail!("write_scores: bowler {id} not found");
        }
        Ok(())
    }

    async fn get_session_length(&self) -> Result<SessionLength> {
        let (len,): (i32,) = sqlx::query_as::<_, (i32,)>(
            "select session_length from session_config where singleton",
        )
        .fetch_one(&self.pool)
        .await
        .context("get_session_length failed (run `ltk db migrate`?)")?;

        let len = u32::try_from(len).map_err(|_| anyhow!("negative session length {len}"))?;
        SessionLength::new(len).map_err(|e| anyhow!("stored session length invalid: {e}"))
    }

    async fn set_session_length(&self, len: SessionLength) -> Result<()> {
        let v = i32::try_from(len.get()).map_err(|_| anyhow!("session length {len} too large"))?;
        sqlx::query(
            r#"
            insert into session_config (singleton, session_length, updated_at_utc)
            values (true, $1, now())
            on conflict (singleton) do update
               set session_length = excluded.session_length,
                   updated_at_utc = excluded.updated_at_utc
            "#,
        )
        .bind(v)
        .execute(&self.pool)
        .await
        .context("set_session_length failed")?;
        Ok(())
    }
}
