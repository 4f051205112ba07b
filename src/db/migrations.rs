use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::Connection;

/// Schema scripts in order; entry `i` upgrades `user_version` from `i` to `i + 1`.
const MIGRATIONS: &[(&str, &str)] = &[("schema_v1.sql", include_str!("schemas/schema_v1.sql"))];

fn schema_version() -> i32 {
    MIGRATIONS.len() as i32
}

/// Bring the schema up to the latest version in one transaction. A database
/// written by a newer build is refused rather than touched.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let target = schema_version();
    let found: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read schema version")?;

    match found {
        version if version == target => return Ok(()),
        version if version > target => {
            bail!("database schema v{version} is newer than this build understands (v{target})")
        }
        version if version < 0 => bail!("database reports invalid schema version {version}"),
        _ => {}
    }

    let tx = conn
        .transaction()
        .context("failed to begin schema migration")?;
    for (name, script) in &MIGRATIONS[found as usize..] {
        tx.execute_batch(script)
            .with_context(|| format!("failed to apply {name}"))?;
    }
    tx.pragma_update(None, "user_version", target)
        .context("failed to record schema version")?;
    tx.commit().context("failed to commit schema migration")?;

    info!("Database schema migrated from v{found} to v{target}");
    Ok(())
}
