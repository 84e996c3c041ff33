//! Bounded-batch line reader over the instrument price file
//!
//! Single forward pass: each call to [`ChunkReader::next_chunk`] returns up to
//! `chunk_size` lines. The final, possibly shorter batch is always returned.

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

/// One batch of raw lines
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// 0-based position in the file's chunk sequence
    pub index: usize,
    /// 1-based file line number of `lines[0]`
    pub first_line: usize,
    pub lines: Vec<String>,
}

pub struct ChunkReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    chunk_size: usize,
    next_index: usize,
    next_line: usize,
    exhausted: bool,
}

impl ChunkReader {
    /// Open the source file
    ///
    /// `chunk_size` must be non-zero.
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> std::io::Result<Self> {
        if chunk_size == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "chunk size must be at least 1",
            ));
        }

        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;

        log::info!("📖 Reading {} in chunks of {} lines", path.display(), chunk_size);

        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            chunk_size,
            next_index: 0,
            next_line: 1,
            exhausted: false,
        })
    }

    /// Read the next batch, `None` once the file is exhausted
    ///
    /// A read error mid-stream is returned as-is; the partial batch is dropped.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Chunk>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut lines = Vec::with_capacity(self.chunk_size);
        while lines.len() < self.chunk_size {
            match self.lines.next_line().await? {
                Some(line) => lines.push(line),
                None => {
                    self.exhausted = true;
                    break;
                }
            }
        }

        if lines.is_empty() {
            return Ok(None);
        }

        let chunk = Chunk {
            index: self.next_index,
            first_line: self.next_line,
            lines,
        };
        self.next_index += 1;
        self.next_line += chunk.lines.len();

        log::debug!(
            "📥 Chunk {} from {}: {} lines",
            chunk.index,
            self.path.display(),
            chunk.lines.len()
        );

        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn write_lines(path: &Path, count: usize) {
        let mut file = tokio::fs::File::create(path).await.unwrap();
        for i in 1..=count {
            file.write_all(format!("line{}\n", i).as_bytes()).await.unwrap();
        }
        file.flush().await.unwrap();
    }

    async fn collect(reader: &mut ChunkReader) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn test_final_partial_chunk_is_emitted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("prices.txt");
        write_lines(&file_path, 7).await;

        let mut reader = ChunkReader::open(&file_path, 3).await.unwrap();
        let chunks = collect(&mut reader).await;

        let sizes: Vec<usize> = chunks.iter().map(|c| c.lines.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(chunks[2].lines, vec!["line7".to_string()]);
        assert_eq!(chunks[1].first_line, 4);
        assert_eq!(chunks[2].index, 2);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_trailing_chunk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("prices.txt");
        write_lines(&file_path, 6).await;

        let mut reader = ChunkReader::open(&file_path, 3).await.unwrap();
        assert_eq!(collect(&mut reader).await.len(), 2);

        // Not restartable
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("empty.txt");
        write_lines(&file_path, 0).await;

        let mut reader = ChunkReader::open(&file_path, 10).await.unwrap();
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = ChunkReader::open(temp_dir.path().join("missing.txt"), 10).await;
        assert_eq!(result.err().unwrap().kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("prices.txt");
        write_lines(&file_path, 1).await;

        let result = ChunkReader::open(&file_path, 0).await;
        assert_eq!(result.err().unwrap().kind(), std::io::ErrorKind::InvalidInput);
    }
}
