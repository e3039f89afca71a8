use anyhow::Result;
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{BookSource, NewBookSource, NewRssSource, RssSource, TxtTocRule};

const BATCH_SIZE: usize = 100;

impl Database {
    // ========================================================================
    // Book Sources
    // ========================================================================

    /// Insert or update book sources keyed by url. Returns how many rows were written.
    pub async fn upsert_book_sources(&self, sources: &[NewBookSource]) -> Result<usize> {
        if sources.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in sources.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("INSERT INTO book_sources (name, url, source_group, enabled) ");
            builder.push_values(chunk, |mut b, source| {
                b.push_bind(&source.name)
                    .push_bind(&source.url)
                    .push_bind(&source.group)
                    .push_bind(source.enabled);
            });
            builder.push(
                " ON CONFLICT(url) DO UPDATE SET name = excluded.name, \
                 source_group = excluded.source_group, enabled = excluded.enabled",
            );
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(sources.len())
    }

    /// Book sources ordered by group then name; ungrouped sources sort last.
    pub async fn get_book_sources(&self) -> Result<Vec<BookSource>> {
        let sources = sqlx::query_as::<_, BookSource>(
            r#"
            SELECT id, name, url, source_group, enabled
            FROM book_sources
            ORDER BY source_group IS NULL, source_group, name
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sources)
    }

    // ========================================================================
    // RSS Sources
    // ========================================================================

    pub async fn upsert_rss_sources(&self, sources: &[NewRssSource]) -> Result<usize> {
        if sources.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in sources.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT INTO rss_sources (name, url, source_group, enabled, sort_order) ",
            );
            builder.push_values(chunk, |mut b, source| {
                b.push_bind(&source.source_name)
                    .push_bind(&source.source_url)
                    .push_bind(&source.source_group)
                    .push_bind(source.enabled)
                    .push_bind(source.custom_order);
            });
            builder.push(
                " ON CONFLICT(url) DO UPDATE SET name = excluded.name, \
                 source_group = excluded.source_group, sort_order = excluded.sort_order",
            );
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(sources.len())
    }

    pub async fn get_rss_sources(&self) -> Result<Vec<RssSource>> {
        let sources = sqlx::query_as::<_, RssSource>(
            r#"
            SELECT id, name, url, source_group, enabled, sort_order
            FROM rss_sources
            ORDER BY sort_order, name
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sources)
    }

    // ========================================================================
    // TXT TOC Rules
    // ========================================================================

    /// Write the bundled rules, replacing rows with the same id.
    pub async fn import_txt_toc_rules(&self, rules: &[TxtTocRule]) -> Result<usize> {
        if rules.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in rules.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT OR REPLACE INTO txt_toc_rules (id, name, rule, example, enable, serial_number) ",
            );
            builder.push_values(chunk, |mut b, rule| {
                b.push_bind(rule.id)
                    .push_bind(&rule.name)
                    .push_bind(&rule.rule)
                    .push_bind(&rule.example)
                    .push_bind(rule.enable)
                    .push_bind(rule.serial_number);
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(rules.len())
    }

    pub async fn get_txt_toc_rules(&self) -> Result<Vec<TxtTocRule>> {
        let rules = sqlx::query_as::<_, TxtTocRule>(
            r#"
            SELECT id, name, rule, example, enable, serial_number
            FROM txt_toc_rules
            ORDER BY serial_number, id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, NewBookSource, NewRssSource, TxtTocRule};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn source(name: &str, url: &str, group: Option<&str>) -> NewBookSource {
        NewBookSource {
            name: name.to_string(),
            url: url.to_string(),
            group: group.map(str::to_string),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_book_sources_grouped_order() {
        let db = test_db().await;
        let sources = vec![
            source("Zeta", "https://z.example", None),
            source("Beta", "https://b.example", Some("Fiction")),
            source("Alpha", "https://a.example", Some("Fiction")),
            source("Gamma", "https://g.example", Some("Comics")),
        ];
        assert_eq!(db.upsert_book_sources(&sources).await.unwrap(), 4);

        let names: Vec<String> = db
            .get_book_sources()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta", "Zeta"]);
    }

    #[tokio::test]
    async fn test_book_source_upsert_by_url() {
        let db = test_db().await;
        db.upsert_book_sources(&[source("Old", "https://x.example", None)])
            .await
            .unwrap();
        db.upsert_book_sources(&[source("New", "https://x.example", Some("G"))])
            .await
            .unwrap();

        let sources = db.get_book_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "New");
        assert_eq!(sources[0].source_group.as_deref(), Some("G"));
    }

    #[tokio::test]
    async fn test_rss_sources_sorted_by_order() {
        let db = test_db().await;
        let sources = vec![
            NewRssSource {
                source_name: "Second".to_string(),
                source_url: "https://two.example/feed".to_string(),
                source_group: None,
                enabled: true,
                custom_order: 2,
            },
            NewRssSource {
                source_name: "First".to_string(),
                source_url: "https://one.example/feed".to_string(),
                source_group: None,
                enabled: false,
                custom_order: 1,
            },
        ];
        db.upsert_rss_sources(&sources).await.unwrap();

        let rows = db.get_rss_sources().await.unwrap();
        assert_eq!(rows[0].name, "First");
        assert!(!rows[0].enabled);
        assert_eq!(rows[1].name, "Second");
    }

    #[tokio::test]
    async fn test_import_toc_rules_replaces_by_id() {
        let db = test_db().await;
        let rule = TxtTocRule {
            id: 1,
            name: "Numbered".to_string(),
            rule: r"^\d+\.".to_string(),
            example: None,
            enable: true,
            serial_number: 0,
        };
        db.import_txt_toc_rules(&[rule.clone()]).await.unwrap();
        let mut changed = rule.clone();
        changed.name = "Numbered v2".to_string();
        db.import_txt_toc_rules(&[changed.clone()]).await.unwrap();

        assert_eq!(db.get_txt_toc_rules().await.unwrap(), vec![changed]);
    }
}
