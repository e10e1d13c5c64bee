//! FileMedia trait - abstract byte source for recovery data files.

use crate::error::{ExtractError, Result};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Inclusive byte range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadInterval {
    pub start: u64,
    pub end: u64,
}

impl ReadInterval {
    /// Interval covering `len` bytes from `start`, or `None` when `len` is 0.
    pub fn with_len(start: u64, len: u64) -> Option<Self> {
        (len > 0).then(|| Self {
            start,
            end: start + len - 1,
        })
    }

    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Fail unless the interval lies inside a file of `length` bytes.
    pub fn check(&self, length: u64) -> Result<()> {
        if self.start > self.end || self.end >= length {
            return Err(ExtractError::InvalidOffset {
                offset: self.end,
                length,
            });
        }
        Ok(())
    }
}

/// Local file implementation.
#[derive(Debug, Clone)]
pub struct LocalFileMedia {
    path: String,
    name: String,
    length: u64,
}

impl LocalFileMedia {
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            path: path.to_string_lossy().into_owned(),
            name,
            length: metadata.len(),
        })
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sync read
    pub fn read_range_sync(&self, interval: ReadInterval) -> Result<Vec<u8>> {
        interval.check(self.length)?;
        let mut file = std::fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(interval.start))?;
        let mut buffer = vec![0u8; interval.size() as usize];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read the whole file.
    pub fn read_all_sync(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }
}

// Async FileMedia trait (requires 'async' feature)
#[cfg(feature = "async")]
use std::future::Future;
#[cfg(feature = "async")]
use std::pin::Pin;

/// Abstract file source that can provide byte ranges asynchronously.
///
/// Implement this trait for custom byte sources (e.g., HTTP range requests
/// against a recovery data file on a share). The library provides
/// [`LocalFileMedia`] for local files.
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub trait FileMedia: Send + Sync {
    fn length(&self) -> u64;
    fn name(&self) -> &str;
    fn read_range(
        &self,
        interval: ReadInterval,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + '_>>;
}

#[cfg(feature = "async")]
impl FileMedia for LocalFileMedia {
    fn length(&self) -> u64 {
        self.length
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_range(
        &self,
        interval: ReadInterval,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + '_>> {
        let path = self.path.clone();
        let length = self.length;
        Box::pin(async move {
            use tokio::io::{AsyncReadExt, AsyncSeekExt};
            interval.check(length)?;
            let mut file = tokio::fs::File::open(&path).await?;
            file.seek(std::io::SeekFrom::Start(interval.start)).await?;
            let mut buffer = vec![0u8; interval.size() as usize];
            file.read_exact(&mut buffer).await?;
            Ok(buffer)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("lzx-stream-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_interval() {
        assert!(ReadInterval::with_len(10, 0).is_none());
        let interval = ReadInterval::with_len(10, 5).unwrap();
        assert_eq!(interval, ReadInterval { start: 10, end: 14 });
        assert_eq!(interval.size(), 5);
        assert!(interval.check(15).is_ok());
        assert!(matches!(
            interval.check(14),
            Err(ExtractError::InvalidOffset { offset: 14, length: 14 })
        ));
    }

    #[test]
    fn test_local_read_range() {
        let path = temp_file("range", b"0123456789");
        let media = LocalFileMedia::new(&path).unwrap();
        assert_eq!(media.length(), 10);
        assert!(media.name().ends_with("range"));
        assert_eq!(
            media.read_range_sync(ReadInterval { start: 2, end: 5 }).unwrap(),
            b"2345"
        );
        assert!(media.read_range_sync(ReadInterval { start: 8, end: 10 }).is_err());
        assert_eq!(media.read_all_sync().unwrap(), b"0123456789");
        std::fs::remove_file(path).unwrap();
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_local_read_range_async() {
        let path = temp_file("async-range", b"abcdef");
        let media = LocalFileMedia::new(&path).unwrap();
        let media: &dyn FileMedia = &media;
        let bytes = media.read_range(ReadInterval { start: 1, end: 3 }).await.unwrap();
        assert_eq!(bytes, b"bcd");
        std::fs::remove_file(path).unwrap();
    }
}
