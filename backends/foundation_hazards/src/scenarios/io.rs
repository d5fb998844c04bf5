//! I/O-bound scenarios: the threads mostly wait, so overlapping them is
//! where the time goes, not CPU.

use core::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::HarnessConfig;
use crate::errors::HazardResult;
use crate::primitives::TaskPool;
use crate::workloads::{
    extract_title, find_matches, list_files, read_file, InMemorySource, Row, TabularSource,
};

const HREF_PATTERN: &str = r#"href=".*?""#;
const HREF_WORKERS: usize = 20;
const TITLE_LIMIT: usize = 2_000;
const QUERY_LATENCY: Duration = Duration::from_millis(500);
const ARTICLE_ROWS: usize = 500;

/// Counts `href="..."` occurrences in every `.html` file under the content
/// directory, one pool job per file.
///
/// # Errors
///
/// [`crate::HazardError::Io`] if the directory cannot be walked,
/// [`crate::HazardError::WaitTimeout`] if the pool does not drain in time.
pub fn count_hrefs(config: &HarnessConfig) -> HazardResult<()> {
    let files = list_files(config.get_content_dir(), "html")?;
    let total = files.len();
    let pool = TaskPool::new(HREF_WORKERS.max(config.get_workers()))?;
    let hrefs = Arc::new(AtomicUsize::new(0));

    for (index, file) in files.into_iter().enumerate() {
        let hrefs = Arc::clone(&hrefs);
        pool.execute(move || {
            let found = read_file(&file).and_then(|text| find_matches(&text, HREF_PATTERN));
            match found {
                Ok(matches) => {
                    hrefs.fetch_add(matches.len(), Ordering::Relaxed);
                    println!("{index}:{total} - {}", matches.len());
                }
                Err(err) => tracing::error!("skipping {}: {}", file.display(), err),
            }
        })?;
    }

    pool.await_termination(config.get_drain_wait())?;
    println!("{} hrefs in {total} files", hrefs.load(Ordering::Relaxed));
    Ok(())
}

/// Starts a slow query on the pool, reads page titles on the calling thread
/// meanwhile, then collects the query result.
///
/// # Errors
///
/// [`crate::HazardError::DataAccess`] from the query,
/// [`crate::HazardError::Io`] if the content directory cannot be walked.
pub fn sql_and_files(config: &HarnessConfig) -> HazardResult<()> {
    let pool = TaskPool::new(config.get_workers())?;
    let source: Arc<dyn TabularSource> =
        Arc::new(InMemorySource::new(article_rows()).with_latency(QUERY_LATENCY));

    let query = pool.submit(move || {
        println!("Running query");
        let result = source.query("model=F39");
        println!("Query completed");
        result
    })?;

    println!("Getting HTML titles");
    let mut titles = Vec::new();
    for page in list_files(config.get_content_dir(), "html")?.into_iter().take(TITLE_LIMIT) {
        let stem = page
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match read_file(&page) {
            Ok(html) => titles.push((stem, extract_title(&html).unwrap_or_default())),
            Err(err) => tracing::error!("skipping {}: {}", page.display(), err),
        }
    }
    println!("HTML titles completed");

    // returns at once if the query already finished
    let rows = query.wait()??;
    println!("{} titles from files, {} rows from the query", titles.len(), rows.len());

    pool.await_termination(config.get_drain_wait())
}

fn article_rows() -> Vec<Row> {
    (0..ARTICLE_ROWS)
        .map(|id| {
            let model = if id % 2 == 0 { "F39" } else { "F32" };
            Row::from([
                ("article_id".to_string(), id.to_string()),
                ("model".to_string(), model.to_string()),
                ("title".to_string(), format!("Article {id}")),
            ])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;

    #[test]
    #[timeout(30000)]
    fn io_scenarios_tolerate_an_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::new()
            .content_dir(dir.path())
            .drain_wait(Duration::from_secs(10));

        count_hrefs(&config).unwrap();
        sql_and_files(&config).unwrap();
    }

    #[test]
    fn demo_rows_split_by_model() {
        let source = InMemorySource::new(article_rows());
        assert_eq!(source.query("model=F39").unwrap().len(), ARTICLE_ROWS / 2);
    }
}
