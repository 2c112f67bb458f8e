mod local;

pub use local::LocalFileReader;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for random access reading from an archive source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer, returning the number of bytes read
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer from `offset`, failing if the source ends first
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                return Err(Error::malformed(format!(
                    "unexpected end of archive at offset {}",
                    offset + filled as u64
                )));
            }
            filled += n;
        }
        Ok(())
    }
}

#[async_trait]
impl ReadAt for Vec<u8> {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.len());
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_exact_past_end_is_malformed() {
        let data = b"PK\x03\x04".to_vec();
        let mut buf = [0u8; 8];
        let err = data.read_exact_at(0, &mut buf).await.unwrap_err();
        assert!(matches!(err, Error::MalformedArchive(_)));

        let mut buf = [0u8; 2];
        data.read_exact_at(2, &mut buf).await.unwrap();
        assert_eq!(&buf, b"\x03\x04");
    }
}
