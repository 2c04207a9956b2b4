use turso::{Builder, Connection, Database};

pub struct DatabaseConfig<'a> {
    url: &'a str,
}

impl<'a> DatabaseConfig<'a> {
    pub fn new(url: &'a str) -> Self {
        Self { url }
    }
}

pub struct PanelDatabase {
    db: Database,
}

impl PanelDatabase {
    pub async fn new(config: &DatabaseConfig<'_>) -> anyhow::Result<Self> {
        let db = Builder::new_local(config.url).build().await?;

        if config.url != ":memory:" {
            // Enable WAL mode for better performance
            let conn = db.connect().map_err(anyhow::Error::from)?;
            conn.pragma_update("journal_mode", "wal").await?;
        }

        Ok(Self { db })
    }

    /// Opens the database at `url` and brings its schema up to date.
    pub async fn open(url: &str) -> anyhow::Result<Self> {
        let db = Self::new(&DatabaseConfig::new(url)).await?;
        crate::migrations::migrate(&db).await?;
        Ok(db)
    }

    pub fn connect(&self) -> anyhow::Result<Connection> {
        self.db.connect().map_err(anyhow::Error::from)
    }
}
