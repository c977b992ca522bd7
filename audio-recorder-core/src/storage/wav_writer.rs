use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::RecorderError;
use crate::storage::wav_format::{self, DATA_SIZE_OFFSET, RIFF_SIZE_OFFSET};

/// Streaming writer for one 16-bit PCM WAV file.
///
/// The header is written with a zero data size on open and patched on
/// `close`, so a file left behind by a crash is still a readable (if
/// truncated-looking) WAV file.
pub struct WavFileWriter {
    file_path: PathBuf,
    file: BufWriter<File>,
    channels: u16,
    data_bytes: u64,
}

impl WavFileWriter {
    /// Create the file (and its parent directory) and write the header.
    pub fn create(file_path: impl Into<PathBuf>, channels: u16, sample_rate: u32) -> Result<Self, RecorderError> {
        let file_path = file_path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).map_err(|e| storage_error("failed to create directory", e))?;
        }

        let file = File::create(&file_path).map_err(|e| storage_error("failed to create file", e))?;
        let mut file = BufWriter::new(file);
        let header = wav_format::generate_wav_header(sample_rate, crate::models::config::SAMPLE_WIDTH, channels, 0);
        file.write_all(&header).map_err(|e| storage_error("write failed", e))?;

        Ok(Self {
            file_path,
            file,
            channels,
            data_bytes: 0,
        })
    }

    /// Append interleaved samples, little-endian.
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), RecorderError> {
        for sample in samples {
            self.file
                .write_all(&sample.to_le_bytes())
                .map_err(|e| storage_error("write failed", e))?;
        }
        self.data_bytes += samples.len() as u64 * 2;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.data_bytes / (self.channels.max(1) as u64 * 2)
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Patch the header sizes, flush, and return the file's SHA-256 checksum.
    ///
    /// Fails with `StorageError` if more audio was written than a WAV header
    /// can describe; the header is then left with zero sizes.
    pub fn close(self) -> Result<String, RecorderError> {
        let mut file = self
            .file
            .into_inner()
            .map_err(|e| storage_error("flush failed", e.into_error()))?;

        let (riff_size, data_size) = wav_format::chunk_sizes(self.data_bytes).ok_or_else(|| {
            RecorderError::StorageError(format!(
                "{} bytes of audio exceed the WAV size limit in {}",
                self.data_bytes,
                self.file_path.display()
            ))
        })?;
        file.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))
            .and_then(|_| file.write_all(&riff_size.to_le_bytes()))
            .and_then(|_| file.seek(SeekFrom::Start(DATA_SIZE_OFFSET)))
            .and_then(|_| file.write_all(&data_size.to_le_bytes()))
            .and_then(|_| file.sync_all())
            .map_err(|e| storage_error("failed to update header", e))?;
        drop(file);

        sha256_file(&self.file_path)
    }
}

/// SHA-256 hex digest of a file, read in a streaming fashion.
pub fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let mut file = File::open(path).map_err(|e| storage_error("failed to read file for checksum", e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| storage_error("failed to read file for checksum", e))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn storage_error(context: &str, e: io::Error) -> RecorderError {
    RecorderError::StorageError(format!("{}: {}", context, e))
}
