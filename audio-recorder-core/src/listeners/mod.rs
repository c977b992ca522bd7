pub mod audio_file_writer;
pub mod logging;
