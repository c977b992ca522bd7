use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use crate::models::config::{RecorderConfiguration, SAMPLE_WIDTH};
use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingMetadata;
use crate::storage::metadata;
use crate::storage::wav_format::{MAX_WAV_FILE_SIZE, WAV_HEADER_SIZE};
use crate::storage::wav_writer::WavFileWriter;
use crate::traits::recorder_listener::RecorderListener;

/// Default upper bound on the size of one audio file, header included.
pub const DEFAULT_MAX_AUDIO_FILE_SIZE: u64 = 1 << 31;

const AUDIO_FILE_NAME_EXTENSION: &str = "wav";

struct OpenFile {
    writer: WavFileWriter,
    start_time: DateTime<Utc>,
}

#[derive(Default)]
struct WriterState {
    file: Option<OpenFile>,
    finished: Vec<PathBuf>,
}

/// Recorder listener that writes everything it hears to WAV files.
///
/// Files are named `{station}_{YYYY-MM-DD_HH.MM.SS}_Z.wav` after the UTC
/// time of their first frame. When a file reaches the size limit the current
/// buffer is split at a frame boundary and the rest goes to a new file.
/// Every closed file gets a `.metadata.json` sidecar with its checksum.
pub struct AudioFileWriter {
    station_name: String,
    recordings_dir: PathBuf,
    channels: u16,
    sample_rate: u32,
    max_file_frames: u64,
    state: Mutex<WriterState>,
}

impl AudioFileWriter {
    /// Create a writer for recordings made with `config`, creating the
    /// recordings directory if needed.
    pub fn new(
        station_name: impl Into<String>,
        recordings_dir: impl Into<PathBuf>,
        max_file_size: u64,
        config: &RecorderConfiguration,
    ) -> Result<Self, RecorderError> {
        let recordings_dir = recordings_dir.into();
        if max_file_size > MAX_WAV_FILE_SIZE {
            return Err(RecorderError::ConfigurationFailed(format!(
                "maximum audio file size {} exceeds the WAV limit of {} bytes",
                max_file_size, MAX_WAV_FILE_SIZE
            )));
        }
        let frame_size = config.frame_size() as u64;
        let max_file_frames = max_file_size.saturating_sub(WAV_HEADER_SIZE as u64) / frame_size.max(1);
        if max_file_frames == 0 {
            return Err(RecorderError::ConfigurationFailed(format!(
                "maximum audio file size {} leaves no room for audio",
                max_file_size
            )));
        }

        fs::create_dir_all(&recordings_dir).map_err(|e| {
            RecorderError::StorageError(format!(
                "failed to create recordings directory {}: {}",
                recordings_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            station_name: station_name.into(),
            recordings_dir,
            channels: config.channels,
            sample_rate: config.sample_rate,
            max_file_frames,
            state: Mutex::new(WriterState::default()),
        })
    }

    pub fn recordings_dir(&self) -> &Path {
        &self.recordings_dir
    }

    /// Paths of all files closed so far, oldest first.
    pub fn finished_files(&self) -> Vec<PathBuf> {
        self.state.lock().finished.clone()
    }

    fn file_name(&self, start_time: DateTime<Utc>) -> String {
        format!(
            "{}_{}_Z.{}",
            self.station_name,
            start_time.format("%Y-%m-%d_%H.%M.%S"),
            AUDIO_FILE_NAME_EXTENSION
        )
    }

    fn open_file(&self, start_time: DateTime<Utc>) -> Result<OpenFile, RecorderError> {
        let path = self.recordings_dir.join(self.file_name(start_time));
        log::debug!("opening audio file {}", path.display());
        let writer = WavFileWriter::create(path, self.channels, self.sample_rate)?;
        Ok(OpenFile { writer, start_time })
    }

    fn close_file(&self, state: &mut WriterState) {
        let Some(file) = state.file.take() else {
            return;
        };
        let path = file.writer.file_path().to_path_buf();
        let frame_count = file.writer.frames_written();

        let result = file.writer.close().and_then(|checksum| {
            let metadata = RecordingMetadata::new(
                &self.station_name,
                &path.to_string_lossy(),
                file.start_time,
                frame_count,
                self.channels,
                self.sample_rate,
                SAMPLE_WIDTH,
                &checksum,
            );
            metadata::write_metadata(&metadata, &path)
        });

        match result {
            Ok(()) => {
                log::info!("wrote audio file {} ({} frames)", path.display(), frame_count);
                state.finished.push(path);
            }
            Err(e) => log::error!("failed to finish audio file {}: {}", path.display(), e),
        }
    }

    fn write(&self, state: &mut WriterState, time: DateTime<Utc>, samples: &[i16]) -> Result<(), RecorderError> {
        let channels = self.channels.max(1) as usize;
        let mut remaining = &samples[..samples.len() - samples.len() % channels];
        let mut frames_done: u64 = 0;

        while !remaining.is_empty() {
            if state.file.is_none() {
                let offset = TimeDelta::microseconds((frames_done * 1_000_000 / self.sample_rate as u64) as i64);
                state.file = Some(self.open_file(time + offset)?);
            }
            let Some(file) = state.file.as_mut() else {
                break;
            };

            let room = self.max_file_frames - file.writer.frames_written();
            let frames = room.min((remaining.len() / channels) as u64);
            let (chunk, rest) = remaining.split_at(frames as usize * channels);
            file.writer.write_samples(chunk)?;
            remaining = rest;
            frames_done += frames;

            if file.writer.frames_written() == self.max_file_frames {
                self.close_file(state);
            }
        }

        Ok(())
    }
}

impl RecorderListener for AudioFileWriter {
    fn samples_arrived(&self, time: DateTime<Utc>, samples: &[i16], _frame_count: u32, _overflow: bool, _underflow: bool) {
        let mut state = self.state.lock();
        if let Err(e) = self.write(&mut state, time, samples) {
            log::error!("abandoning audio file after write error: {}", e);
            state.file = None;
        }
    }

    fn recording_stopped(&self, _time: DateTime<Utc>, _fault: Option<&RecorderError>) {
        let mut state = self.state.lock();
        self.close_file(&mut state);
    }
}

impl Drop for AudioFileWriter {
    fn drop(&mut self) {
        let mut state = std::mem::take(self.state.get_mut());
        self.close_file(&mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::wav_format::parse_wav_header;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("audio_file_writer_{}_{}", name, std::process::id()))
    }

    fn config(channels: u16) -> RecorderConfiguration {
        RecorderConfiguration {
            channels,
            sample_rate: 4,
            buffer_size: 4,
            ..Default::default()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 2, 30, 0).unwrap()
    }

    fn data(path: &Path) -> Vec<i16> {
        let bytes = fs::read(path).unwrap();
        bytes[WAV_HEADER_SIZE..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn splits_files_at_size_limit() {
        let dir = temp_dir("split");
        // Room for six mono frames per file.
        let writer = AudioFileWriter::new("Station", &dir, 44 + 12, &config(1)).unwrap();

        writer.recording_starting(t0());
        writer.samples_arrived(t0(), &[1, 2, 3, 4], 4, false, false);
        writer.samples_arrived(t0() + TimeDelta::seconds(1), &[5, 6, 7, 8], 4, false, false);
        writer.recording_stopped(t0() + TimeDelta::seconds(2), None);

        let files = writer.finished_files();
        assert_eq!(
            files,
            vec![
                dir.join("Station_2024-05-01_02.30.00_Z.wav"),
                dir.join("Station_2024-05-01_02.30.01_Z.wav"),
            ]
        );
        assert_eq!(data(&files[0]), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(data(&files[1]), vec![7, 8]);
        assert_eq!(fs::metadata(&files[0]).unwrap().len(), 56);

        let header = parse_wav_header(&fs::read(&files[1]).unwrap()).unwrap();
        assert_eq!(header.sample_rate, 4);
        assert_eq!(header.data_size, 4);

        let meta = metadata::read_metadata(&files[0]).unwrap();
        assert_eq!(meta.frame_count, 6);
        assert_relative_eq!(meta.duration_secs, 1.5);
        assert_eq!(meta.station_name, "Station");
        assert_eq!(meta.start_time, "2024-05-01T02:30:00.000Z");
        assert_eq!(meta.checksum.len(), 64);

        // The second file starts with frame 6, 1.5 s into the recording.
        let meta = metadata::read_metadata(&files[1]).unwrap();
        assert_eq!(meta.start_time, "2024-05-01T02:30:01.500Z");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn exact_fill_closes_without_empty_file() {
        let dir = temp_dir("exact");
        let writer = AudioFileWriter::new("S", &dir, 44 + 16, &config(2)).unwrap();

        // Four stereo frames fill the file exactly.
        writer.samples_arrived(t0(), &[1, -1, 2, -2, 3, -3, 4, -4], 4, false, false);
        assert_eq!(writer.finished_files().len(), 1);
        writer.recording_stopped(t0(), None);

        assert_eq!(writer.finished_files().len(), 1);
        assert_eq!(data(&writer.finished_files()[0]), vec![1, -1, 2, -2, 3, -3, 4, -4]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn each_recording_gets_its_own_file() {
        let dir = temp_dir("sessions");
        let writer = AudioFileWriter::new("S", &dir, DEFAULT_MAX_AUDIO_FILE_SIZE, &config(1)).unwrap();

        writer.samples_arrived(t0(), &[1, 2], 2, false, false);
        writer.recording_stopped(t0(), None);
        writer.recording_stopped(t0(), None);
        writer.samples_arrived(t0() + TimeDelta::seconds(10), &[3], 1, false, false);
        writer.recording_stopped(t0() + TimeDelta::seconds(11), None);

        let files = writer.finished_files();
        assert_eq!(files.len(), 2);
        assert_eq!(data(&files[0]), vec![1, 2]);
        assert_eq!(data(&files[1]), vec![3]);
        assert!(files[1].ends_with("S_2024-05-01_02.30.10_Z.wav"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn dropping_writer_finishes_open_file() {
        let dir = temp_dir("drop");
        let writer = AudioFileWriter::new("S", &dir, DEFAULT_MAX_AUDIO_FILE_SIZE, &config(1)).unwrap();
        writer.samples_arrived(t0(), &[9, 9, 9], 3, false, false);
        drop(writer);

        let path = dir.join("S_2024-05-01_02.30.00_Z.wav");
        assert_eq!(data(&path), vec![9, 9, 9]);
        assert!(metadata::metadata_path(&path).exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_size_beyond_wav_limit() {
        let dir = temp_dir("huge");
        let err = AudioFileWriter::new("S", &dir, 8 << 30, &config(1)).err().unwrap();
        assert!(matches!(err, RecorderError::ConfigurationFailed(_)));

        let writer = AudioFileWriter::new("S", &dir, MAX_WAV_FILE_SIZE, &config(1)).unwrap();
        assert_eq!(writer.max_file_frames, (MAX_WAV_FILE_SIZE - 44) / 2);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_size_without_room_for_a_frame() {
        let err = AudioFileWriter::new("S", temp_dir("tiny"), 45, &config(1)).err().unwrap();
        assert!(matches!(err, RecorderError::ConfigurationFailed(_)));
    }
}
