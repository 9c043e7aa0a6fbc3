use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

use crate::data::{parse_dataset, Dataset};
use crate::error::{DashError, DashResult};
use crate::logging::{log, obj, v_num, v_str, Domain, Level};

/// Where the raw CSV text comes from.
#[async_trait]
pub trait DataSource {
    fn describe(&self) -> String;
    async fn fetch(&self) -> DashResult<String>;
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> DashResult<String> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}

pub struct HttpSource {
    client: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: Url) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            url,
        }
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> DashResult<String> {
        let resp = self.client.get(self.url.clone()).send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    File(PathBuf),
    Http(Url),
}

impl SourceKind {
    /// http(s) URLs are fetched over the network, anything else is a file path.
    pub fn from_location(location: &str) -> DashResult<Self> {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(SourceKind::Http(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(SourceKind::File)
                .map_err(|_| DashError::InvalidConfig(format!("bad file url: {}", location))),
            Ok(url) if url.scheme().len() > 1 => {
                Err(DashError::InvalidConfig(format!("unsupported scheme: {}", url.scheme())))
            }
            // Single-letter "schemes" are Windows drive letters.
            _ => Ok(SourceKind::File(PathBuf::from(location))),
        }
    }

    pub fn build(self) -> Box<dyn DataSource + Send + Sync> {
        match self {
            SourceKind::File(path) => Box::new(FileSource::new(path)),
            SourceKind::Http(url) => Box::new(HttpSource::new(url)),
        }
    }
}

/// Loads the dataset at most once and hands out shared handles for the process lifetime.
pub struct DatasetStore {
    source: Box<dyn DataSource + Send + Sync>,
    cell: OnceCell<Arc<Dataset>>,
}

impl DatasetStore {
    pub fn new(source: Box<dyn DataSource + Send + Sync>) -> Self {
        Self { source, cell: OnceCell::new() }
    }

    pub fn from_location(location: &str) -> DashResult<Self> {
        Ok(Self::new(SourceKind::from_location(location)?.build()))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> DashResult<Arc<Dataset>> {
        let ds = self
            .cell
            .get_or_try_init(|| async {
                let text = self.source.fetch().await?;
                let ds = parse_dataset(&text)?;
                log(
                    Level::Info,
                    Domain::Data,
                    "dataset.loaded",
                    obj(&[
                        ("source", v_str(&self.source.describe())),
                        ("rows", v_num(ds.len() as f64)),
                        ("sha256", v_str(&ds.hash_sha256)),
                    ]),
                );
                Ok::<_, DashError>(Arc::new(ds))
            })
            .await?;
        Ok(Arc::clone(ds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource {
        calls: Arc<AtomicU32>,
        body: &'static str,
    }

    #[async_trait]
    impl DataSource for CountingSource {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        async fn fetch(&self) -> DashResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.to_string())
        }
    }

    #[test]
    fn test_location_kinds() {
        assert!(matches!(
            SourceKind::from_location("https://example.com/bank.csv").unwrap(),
            SourceKind::Http(_)
        ));
        assert_eq!(
            SourceKind::from_location("data/bank.csv").unwrap(),
            SourceKind::File(PathBuf::from("data/bank.csv"))
        );
        assert!(SourceKind::from_location("ftp://example.com/bank.csv").is_err());
    }

    #[tokio::test]
    async fn test_store_fetches_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let store = DatasetStore::new(Box::new(CountingSource {
            calls: calls.clone(),
            body: "age,job,marital,balance\n30,admin.,married,10\n",
        }));
        assert!(!store.is_loaded());
        let a = store.get().await.unwrap();
        let b = store.get().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn test_store_does_not_cache_failed_load() {
        let calls = Arc::new(AtomicU32::new(0));
        let store = DatasetStore::new(Box::new(CountingSource {
            calls: calls.clone(),
            body: "age,job\n1,x\n",
        }));
        assert!(matches!(store.get().await, Err(DashError::MissingColumns(_))));
        assert!(!store.is_loaded());
        let _ = store.get().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_file_source_missing_file_is_io_error() {
        let src = FileSource::new("/definitely/not/here.csv");
        assert!(matches!(src.fetch().await, Err(DashError::Io(_))));
    }
}
