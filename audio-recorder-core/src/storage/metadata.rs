use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingMetadata;

/// Path of the JSON sidecar for a recording: `name.wav` → `name.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file next to the recording.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), RecorderError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| RecorderError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(recording_path), json)
        .map_err(|e| RecorderError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, RecorderError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| RecorderError::StorageError(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| RecorderError::StorageError(format!("failed to parse metadata: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn sidecar_round_trip() {
        let dir = std::env::temp_dir().join(format!("metadata_test_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let recording = dir.join("Station_2024-05-01_02.30.00_Z.wav");

        let metadata = RecordingMetadata::new("Station", &recording.to_string_lossy(), Utc::now(), 100, 1, 22050, 2, "ff");
        write_metadata(&metadata, &recording).unwrap();

        assert!(dir.join("Station_2024-05-01_02.30.00_Z.metadata.json").exists());
        assert_eq!(read_metadata(&recording).unwrap(), metadata);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_sidecar_is_storage_error() {
        let err = read_metadata(Path::new("/nonexistent/recording.wav")).unwrap_err();
        assert!(matches!(err, RecorderError::StorageError(_)));
    }
}
