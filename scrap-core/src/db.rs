use crate::error::ScrapResult;
use crate::models::{TokenMetadata, TokenPage};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    // Embed migrations from the workspace `migrations` directory.
    sqlx::migrate!("../migrations").run(pool).await?;
    Ok(())
}

/// Read access to the token registry.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Returns the rows whose address is in `addresses`; unknown addresses are skipped.
    async fn find_by_addresses(&self, addresses: &[String]) -> ScrapResult<Vec<TokenMetadata>>;

    /// Paged listing with an optional case-insensitive name/symbol filter.
    async fn list(&self, limit: i64, offset: i64, search: Option<&str>) -> ScrapResult<TokenPage>;
}

#[derive(Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TOKEN_COLUMNS: &str = r#"
    address,
    name,
    symbol,
    decimals,
    logo_uri,
    daily_volume,
    freeze_authority,
    mint_authority,
    permanent_delegate,
    minted_at,
    tags,
    extensions,
    created_at
"#;

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn find_by_addresses(&self, addresses: &[String]) -> ScrapResult<Vec<TokenMetadata>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE address = ANY($1)");
        let rows = sqlx::query_as::<_, TokenMetadata>(&sql)
            .bind(addresses)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn list(&self, limit: i64, offset: i64, search: Option<&str>) -> ScrapResult<TokenPage> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let (tokens, total) = if let Some(pattern) = pattern {
            let total: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM tokens
                WHERE LOWER(name) LIKE $1 OR LOWER(symbol) LIKE $1
                "#,
            )
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

            let sql = format!(
                r#"
                SELECT {TOKEN_COLUMNS} FROM tokens
                WHERE LOWER(name) LIKE $1 OR LOWER(symbol) LIKE $1
                ORDER BY id ASC
                LIMIT $2 OFFSET $3
                "#
            );
            let tokens = sqlx::query_as::<_, TokenMetadata>(&sql)
                .bind(&pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

            (tokens, total)
        } else {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens")
                .fetch_one(&self.pool)
                .await?;

            let sql = format!(
                r#"
                SELECT {TOKEN_COLUMNS} FROM tokens
                ORDER BY id ASC
                LIMIT $1 OFFSET $2
                "#
            );
            let tokens = sqlx::query_as::<_, TokenMetadata>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

            (tokens, total)
        };

        Ok(TokenPage { tokens, total })
    }
}
