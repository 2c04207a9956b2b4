use turso::{Connection, Row};

#[derive(Debug, Default)]
pub struct Kv {
    pub id: i64,
    pub module: String,
    pub key: String,
    pub sub_key: Option<String>,
    pub value: Option<String>,
}

pub async fn by_module_and_key(
    module: &str,
    key: &str,
    conn: &Connection,
) -> anyhow::Result<Option<Kv>> {
    let mut rows = conn
        .query(
            "SELECT id, module, key, sub_key, value FROM kvs WHERE module = ?1 AND key = ?2 LIMIT 1",
            (module, key),
        )
        .await?;
    row_to_kv(rows.next().await?)
}

/// Writes `value` under (`module`, `key`), updating the existing row if there is one.
pub async fn put(module: &str, key: &str, value: &str, conn: &Connection) -> anyhow::Result<i64> {
    if let Some(existing) = by_module_and_key(module, key, conn).await? {
        conn.execute(
            "UPDATE kvs SET value = ?1 WHERE id = ?2",
            (value, existing.id),
        )
        .await?;
        return Ok(existing.id);
    }

    conn.execute(
        "INSERT INTO kvs (module, key, sub_key, value) VALUES (?1, ?2, '', ?3)",
        (module, key, value),
    )
    .await?;
    Ok(conn.last_insert_rowid())
}

fn row_to_kv(row: Option<Row>) -> anyhow::Result<Option<Kv>> {
    if let Some(row) = row {
        let id = row
            .get_value(0)
            .map_err(anyhow::Error::from)?
            .as_integer()
            .ok_or_else(|| anyhow::anyhow!("id is null"))?
            .to_owned();
        let module = row
            .get_value(1)?
            .as_text()
            .ok_or_else(|| anyhow::anyhow!("module is null"))?
            .to_owned();
        let key = row
            .get_value(2)?
            .as_text()
            .ok_or_else(|| anyhow::anyhow!("key is null"))?
            .to_owned();
        let sub_key = row.get_value(3)?.as_text().map(|s| s.to_owned());
        let value = row.get_value(4)?.as_text().map(|s| s.to_owned());
        return Ok(Some(Kv {
            id,
            module,
            key,
            sub_key,
            value,
        }));
    }

    Ok(None)
}
