use std::path::Path;

use crate::db::PanelDatabase;

const MIGRATIONS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER NOT NULL PRIMARY KEY,
    description TEXT NOT NULL
);
"#;

#[derive(Debug, rust_embed::Embed)]
#[folder = "migrations/"]
struct Migrations;

pub async fn migrate(db: &PanelDatabase) -> anyhow::Result<()> {
    let conn = db.connect()?;
    ensure_migrations_table(&conn).await?;
    let mut migrations = load_migrations()?;
    migrations.sort_by_key(|m| m.version);

    for migration in migrations {
        if is_migration_applied(&conn, migration.version).await? {
            continue;
        }
        log::info!(
            "applying migration {} ({})",
            migration.version,
            migration.description
        );
        conn.execute_batch(&migration.sql).await?;
        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            (migration.version, migration.description.as_str()),
        )
        .await?;
    }

    Ok(())
}

async fn ensure_migrations_table(conn: &turso::Connection) -> anyhow::Result<()> {
    conn.execute_batch(MIGRATIONS_TABLE_SQL).await?;
    Ok(())
}

async fn is_migration_applied(conn: &turso::Connection, version: i64) -> anyhow::Result<bool> {
    let mut rows = conn
        .query("SELECT 1 FROM _migrations WHERE version = ?1", (version,))
        .await?;
    Ok(rows.next().await?.is_some())
}

struct Migration {
    version: i64,
    description: String,
    sql: String,
}

/// Splits `<VERSION>_<DESCRIPTION>.sql` into its version and a readable description.
fn parse_migration_name(file_name: &str) -> Option<(i64, String)> {
    let (version, rest) = file_name.split_once('_')?;
    let description = rest.strip_suffix(".sql")?;
    let version = version.parse().ok()?;
    Some((version, description.replace('_', " ")))
}

fn load_migrations() -> anyhow::Result<Vec<Migration>> {
    let mut migrations = Vec::new();
    for path in Migrations::iter() {
        let Some(emb_file) = Migrations::get(&path) else {
            continue;
        };
        let file_name = Path::new(path.as_ref())
            .file_name()
            .and_then(|x| x.to_str())
            .unwrap_or("");
        let Some((version, description)) = parse_migration_name(file_name) else {
            // not of the format: <VERSION>_<DESCRIPTION>.sql; ignore
            continue;
        };
        let sql = std::str::from_utf8(emb_file.data.as_ref())?.to_owned();
        migrations.push(Migration {
            version,
            description,
            sql,
        });
    }
    Ok(migrations)
}
