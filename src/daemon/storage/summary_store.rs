use std::{
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, info};

use crate::tracking::summary::Bucket;

/// Interface for abstracting storage of daily summaries.
pub trait SummaryStore {
    /// Returns the saved summary of `bucket` for `date`, or `None` if nothing was saved yet.
    fn load(
        &self,
        date: NaiveDate,
        bucket: Bucket,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Replaces the saved summary of `bucket` for `date`.
    fn save(
        &self,
        date: NaiveDate,
        bucket: Bucket,
        summary: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Stores every summary as `focus_tracker_<date><suffix>.log` inside a directory. The directory
/// is only created when the first summary is saved.
pub struct FileSummaryStore {
    summary_dir: PathBuf,
}

impl FileSummaryStore {
    pub fn new(summary_dir: PathBuf) -> Self {
        Self { summary_dir }
    }

    pub fn summary_dir(&self) -> &Path {
        &self.summary_dir
    }

    pub fn path_for(&self, date: NaiveDate, bucket: Bucket) -> PathBuf {
        self.summary_dir.join(bucket.file_name(date))
    }
}

impl SummaryStore for FileSummaryStore {
    async fn load(&self, date: NaiveDate, bucket: Bucket) -> Result<Option<String>> {
        async fn read(path: &Path) -> std::result::Result<String, std::io::Error> {
            debug!("Reading {path:?}");
            let mut file = File::open(path).await?;
            file.lock_shared()?;
            let mut text = String::new();
            let result = file.read_to_string(&mut text).await;
            file.unlock_async().await?;
            result.map(|_| text)
        }

        let path = self.path_for(date, bucket);
        match read(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)?,
        }
    }

    async fn save(&self, date: NaiveDate, bucket: Bucket, summary: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.summary_dir).await?;
        let path = self.path_for(date, bucket);
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        // Semi-safe acquire-release for a file. Truncation happens under the lock so readers never
        // see a half written summary.
        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.rewind().await?;
            file.write_all(summary.as_bytes()).await?;
            file.flush().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;
        file.unlock_async().await?;
        result?;

        info!("Summary written to {path:?}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::{FileSummaryStore, SummaryStore};
    use crate::tracking::summary::Bucket;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap()
    }

    #[tokio::test]
    async fn test_missing_summary_is_none() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSummaryStore::new(dir.path().to_owned());
        assert_eq!(store.load(date(), Bucket::Work).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_load_buckets_separately() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSummaryStore::new(dir.path().join("nested"));
        store.save(date(), Bucket::Work, "work\n").await?;
        store.save(date(), Bucket::Outside, "outside\n").await?;

        assert_eq!(store.load(date(), Bucket::Work).await?, Some("work\n".into()));
        assert_eq!(
            store.load(date(), Bucket::Outside).await?,
            Some("outside\n".into())
        );
        assert!(dir
            .path()
            .join("nested/focus_tracker_2018-07-04_outside.log")
            .exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_replaces_longer_content() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSummaryStore::new(dir.path().to_owned());
        store
            .save(date(), Bucket::Work, "a much longer summary\n")
            .await?;
        store.save(date(), Bucket::Work, "short\n").await?;

        assert_eq!(store.load(date(), Bucket::Work).await?, Some("short\n".into()));
        Ok(())
    }

    #[tokio::test]
    async fn test_reading_does_not_create_directory() -> Result<()> {
        let dir = tempdir()?;
        let summary_dir = dir.path().join("missing");
        let store = FileSummaryStore::new(summary_dir.clone());
        assert_eq!(store.load(date(), Bucket::Work).await?, None);
        assert!(!summary_dir.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_unwritable_directory_fails_on_save() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "")?;
        let store = FileSummaryStore::new(file.join("summaries"));

        assert!(store.save(date(), Bucket::Work, "work\n").await.is_err());
        Ok(())
    }
}
