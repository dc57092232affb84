use anyhow::{anyhow, Result};
use diesel::{
    r2d2::{ConnectionManager, Pool},
    PgConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn create_conn(database_url: &str) -> Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().build(manager)
}

/// Forward-only migrations, applied at startup before the server binds.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("failed to run migrations: {e}"))?;
    Ok(())
}

/// Translate (page, per_page) into limit/offset. `per_page = 0` means all
/// rows in a single page.
pub fn page_bounds(page: i64, per_page: i64) -> Option<(i64, i64)> {
    if per_page <= 0 {
        return None;
    }
    let page = page.max(1);
    Some((per_page, (page - 1) * per_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(1, 10), Some((10, 0)));
        assert_eq!(page_bounds(3, 20), Some((20, 40)));
        assert_eq!(page_bounds(0, 10), Some((10, 0)));
        assert_eq!(page_bounds(1, 0), None);
        assert_eq!(page_bounds(5, -1), None);
    }
}
