use camino::Utf8Path;
use std::io;
use tokio::io::AsyncWrite;

pub type LocalWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[async_trait::async_trait]
pub trait LocalTarget: Send + Sync {
    /// Size of the file at `path`, or `None` when nothing usable is there.
    async fn stat(&self, path: &Utf8Path) -> io::Result<Option<u64>>;
    async fn create_truncate(&self, path: &Utf8Path) -> io::Result<LocalWriter>;
    async fn remove(&self, path: &Utf8Path) -> io::Result<()>;
}

/// The local filesystem.
pub struct FsLocalTarget;

#[async_trait::async_trait]
impl LocalTarget for FsLocalTarget {
    async fn stat(&self, path: &Utf8Path) -> io::Result<Option<u64>> {
        match tokio::fs::metadata(path.as_std_path()).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_truncate(&self, path: &Utf8Path) -> io::Result<LocalWriter> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path.as_std_path())
            .await?;
        Ok(Box::new(file))
    }

    async fn remove(&self, path: &Utf8Path) -> io::Result<()> {
        tokio::fs::remove_file(path.as_std_path()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn stat_create_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let path = root.join("clip.mp4");
        let target = FsLocalTarget;

        assert_eq!(target.stat(&path).await.unwrap(), None);

        std::fs::write(&path, b"old contents that are longer").unwrap();
        let mut w = target.create_truncate(&path).await.unwrap();
        w.write_all(b"new").await.unwrap();
        w.shutdown().await.unwrap();
        drop(w);

        assert_eq!(target.stat(&path).await.unwrap(), Some(3));
        assert_eq!(std::fs::read(&path).unwrap(), b"new");

        target.remove(&path).await.unwrap();
        assert_eq!(target.stat(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn directory_is_not_a_usable_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir(root.join("clip.mp4")).unwrap();

        assert_eq!(FsLocalTarget.stat(&root.join("clip.mp4")).await.unwrap(), None);
        assert!(FsLocalTarget
            .create_truncate(&root.join("clip.mp4"))
            .await
            .is_err());
    }
}
