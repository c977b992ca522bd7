use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Metadata written alongside each finished audio file.
///
/// Serializable for JSON export to whatever archives the recordings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub station_name: String,
    pub file_path: String,
    pub start_time: String,
    pub duration_secs: f64,
    pub frame_count: u64,
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_width: u16,
    pub checksum: String,
    pub created_at: String,
}

impl RecordingMetadata {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        station_name: &str,
        file_path: &str,
        start_time: DateTime<Utc>,
        frame_count: u64,
        channels: u16,
        sample_rate: u32,
        sample_width: u16,
        checksum: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            station_name: station_name.to_string(),
            file_path: file_path.to_string(),
            start_time: start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            duration_secs: frame_count as f64 / sample_rate as f64,
            frame_count,
            channels,
            sample_rate,
            sample_width,
            checksum: checksum.to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    #[test]
    fn duration_follows_frames() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 2, 30, 0).unwrap();
        let metadata = RecordingMetadata::new("Station", "a.wav", start, 44100, 1, 22050, 2, "abc");
        assert_relative_eq!(metadata.duration_secs, 2.0);
        assert_eq!(metadata.start_time, "2024-05-01T02:30:00.000Z");
        assert_eq!(metadata.id.len(), 36);
    }
}
