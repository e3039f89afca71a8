mod books;
mod caches;
mod local_config;
mod preferences;
mod schema;
mod sources;
mod types;

pub use schema::Database;
pub use types::{
    modified_secs, Book, BookCheck, BookSource, DatabaseError, Library, LocalConfig, NewBook,
    NewBookSource, NewRssSource, RssSource, TxtTocRule,
};

impl Database {
    /// Load everything the pages display.
    pub async fn load_library(&self) -> anyhow::Result<Library> {
        Ok(Library {
            books: self.get_books().await?,
            book_sources: self.get_book_sources().await?,
            rss_sources: self.get_rss_sources().await?,
        })
    }
}
