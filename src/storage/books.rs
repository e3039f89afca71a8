use anyhow::Result;
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{Book, BookCheck, NewBook};

impl Database {
    // ========================================================================
    // Shelf Operations
    // ========================================================================

    /// Put a book on the shelf, or refresh its name and file stats if the
    /// same origin is already there. Returns the book id.
    pub async fn add_book(&self, book: &NewBook) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO books (name, author, origin, size, modified, added_at)
            VALUES (?, ?, ?, ?, ?, strftime('%s', 'now'))
            ON CONFLICT(origin) DO UPDATE SET
                name = excluded.name,
                author = excluded.author,
                size = excluded.size,
                modified = excluded.modified
            RETURNING id
        "#,
        )
        .bind(&book.name)
        .bind(&book.author)
        .bind(&book.origin)
        .bind(book.size)
        .bind(book.modified)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// All shelf books, most recently added first.
    pub async fn get_books(&self) -> Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, name, author, origin, size, modified, last_check_time,
                   has_update, can_update, added_at
            FROM books
            ORDER BY added_at DESC, id DESC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Books the periodic refresh should examine.
    pub async fn get_updatable_books(&self) -> Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, name, author, origin, size, modified, last_check_time,
                   has_update, can_update, added_at
            FROM books
            WHERE can_update = 1
            ORDER BY id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Ids of every shelf book.
    pub async fn book_ids(&self) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn remove_book(&self, book_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_book_can_update(&self, book_id: i64, can_update: bool) -> Result<()> {
        sqlx::query("UPDATE books SET can_update = ? WHERE id = ?")
            .bind(can_update)
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a batch of refresh results in one transaction.
    ///
    /// `has_update` is sticky: a changed file sets it, an unchanged one
    /// leaves the existing flag alone.
    pub async fn record_book_checks(&self, checks: &[BookCheck], checked_at: i64) -> Result<()> {
        if checks.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in checks.chunks(100) {
            let mut builder: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("UPDATE books SET last_check_time = ");
            builder.push_bind(checked_at);

            builder.push(", size = CASE id ");
            for check in chunk {
                builder.push("WHEN ");
                builder.push_bind(check.book_id);
                builder.push(" THEN ");
                builder.push_bind(check.size);
                builder.push(" ");
            }
            builder.push("END, modified = CASE id ");
            for check in chunk {
                builder.push("WHEN ");
                builder.push_bind(check.book_id);
                builder.push(" THEN ");
                builder.push_bind(check.modified);
                builder.push(" ");
            }
            builder.push("END, has_update = CASE id ");
            for check in chunk {
                builder.push("WHEN ");
                builder.push_bind(check.book_id);
                builder.push(" THEN ");
                if check.changed {
                    builder.push("1");
                } else {
                    builder.push("has_update");
                }
                builder.push(" ");
            }
            builder.push("END WHERE id IN (");
            let mut separated = builder.separated(", ");
            for check in chunk {
                separated.push_bind(check.book_id);
            }
            separated.push_unseparated(")");

            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Clear the update badge once a book has been opened.
    pub async fn clear_book_update(&self, book_id: i64) -> Result<()> {
        sqlx::query("UPDATE books SET has_update = 0 WHERE id = ?")
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{BookCheck, Database, NewBook};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn new_book(origin: &str) -> NewBook {
        NewBook {
            name: origin.trim_end_matches(".txt").to_string(),
            author: String::new(),
            origin: format!("/books/{origin}"),
            size: 100,
            modified: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_add_book_is_idempotent_per_origin() {
        let db = test_db().await;
        let first = db.add_book(&new_book("a.txt")).await.unwrap();
        let mut renamed = new_book("a.txt");
        renamed.name = "Renamed".to_string();
        let second = db.add_book(&renamed).await.unwrap();

        assert_eq!(first, second);
        let books = db.get_books().await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].name, "Renamed");
        assert!(books[0].can_update);
        assert!(!books[0].has_update);
    }

    #[tokio::test]
    async fn test_updatable_books_filters() {
        let db = test_db().await;
        let a = db.add_book(&new_book("a.txt")).await.unwrap();
        let b = db.add_book(&new_book("b.txt")).await.unwrap();
        db.set_book_can_update(a, false).await.unwrap();

        let books = db.get_updatable_books().await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, b);
    }

    #[tokio::test]
    async fn test_record_book_checks_sticky_update() {
        let db = test_db().await;
        let a = db.add_book(&new_book("a.txt")).await.unwrap();
        let b = db.add_book(&new_book("b.txt")).await.unwrap();

        let checks = [
            BookCheck { book_id: a, size: 250, modified: 1_700_000_500, changed: true },
            BookCheck { book_id: b, size: 100, modified: 1_700_000_000, changed: false },
        ];
        db.record_book_checks(&checks, 42).await.unwrap();

        // A later unchanged check must not clear the flag
        let again = [BookCheck { book_id: a, size: 250, modified: 1_700_000_500, changed: false }];
        db.record_book_checks(&again, 43).await.unwrap();

        let books = db.get_books().await.unwrap();
        let a_row = books.iter().find(|bk| bk.id == a).unwrap();
        let b_row = books.iter().find(|bk| bk.id == b).unwrap();
        assert!(a_row.has_update);
        assert_eq!(a_row.size, 250);
        assert_eq!(a_row.last_check_time, 43);
        assert!(!b_row.has_update);
        assert_eq!(b_row.last_check_time, 42);

        db.clear_book_update(a).await.unwrap();
        let books = db.get_books().await.unwrap();
        assert!(books.iter().all(|bk| !bk.has_update));
    }

    #[tokio::test]
    async fn test_remove_book() {
        let db = test_db().await;
        let a = db.add_book(&new_book("a.txt")).await.unwrap();
        assert!(db.remove_book(a).await.unwrap());
        assert!(!db.remove_book(a).await.unwrap());
        assert!(db.book_ids().await.unwrap().is_empty());
    }
}
