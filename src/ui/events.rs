//! Application event handling.
//!
//! Applies background task results to the application state.

use crate::app::{App, AppEvent};

/// Handle application events from background tasks.
pub(super) async fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::BooksRefreshed(summary) => {
            app.refreshing = false;
            reload(app).await;
            let mut msg = format!(
                "Checked {} books, {} updated",
                summary.checked, summary.updated
            );
            if summary.missing > 0 {
                msg.push_str(&format!(", {} missing", summary.missing));
            }
            app.set_status(msg);
        }
        AppEvent::CachesPurged(count) => {
            tracing::debug!(count, "Expired caches purged");
        }
        AppEvent::BackupWritten(path) => {
            app.set_status(format!("Backup written to {}", path.display()));
        }
        AppEvent::CacheCleared(count) => {
            tracing::debug!(count, "Removed book caches cleared");
        }
        AppEvent::DefaultDataImported { what, count } => {
            reload(app).await;
            app.set_status(format!("Imported {count} {what}"));
        }
        AppEvent::TaskPanicked { task, error } => {
            if task == "refresh_books" {
                app.refreshing = false;
            }
            app.set_status(format!("Internal error in {task}: {error}"));
        }
    }
}

async fn reload(app: &mut App) {
    if let Err(e) = app.reload_library().await {
        tracing::warn!(error = %e, "Failed to reload library");
        app.set_status(format!("Failed to reload library: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use crate::storage::NewRssSource;
    use crate::tasks::RefreshSummary;

    #[tokio::test]
    async fn test_refresh_result_clears_flag() {
        let mut app = test_app().await;
        app.refreshing = true;
        handle_app_event(
            &mut app,
            AppEvent::BooksRefreshed(RefreshSummary {
                checked: 3,
                updated: 1,
                missing: 1,
            }),
        )
        .await;

        assert!(!app.refreshing);
        assert_eq!(
            app.status_message.as_ref().map(|(m, _)| m.as_ref()),
            Some("Checked 3 books, 1 updated, 1 missing")
        );
    }

    #[tokio::test]
    async fn test_import_reloads_library() {
        let mut app = test_app().await;
        app.db
            .upsert_rss_sources(&[NewRssSource {
                source_name: "feed".into(),
                source_url: "https://feed.example".into(),
                source_group: None,
                enabled: true,
                custom_order: 0,
            }])
            .await
            .unwrap();
        assert!(app.library.rss_sources.is_empty());

        handle_app_event(
            &mut app,
            AppEvent::DefaultDataImported {
                what: "RSS sources",
                count: 1,
            },
        )
        .await;
        assert_eq!(app.library.rss_sources.len(), 1);
    }

    #[tokio::test]
    async fn test_panic_reported_in_status() {
        let mut app = test_app().await;
        app.refreshing = true;
        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: "refresh_books",
                error: "boom".into(),
            },
        )
        .await;
        assert!(!app.refreshing);
        assert!(app
            .status_message
            .as_ref()
            .is_some_and(|(m, _)| m.contains("boom")));
    }
}
