//! Log output to the console and to `recorder.log` in the home directory.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Builder, Env, Target};

pub const LOG_FILE_NAME: &str = "recorder.log";

/// Copies every write to two writers.
struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

fn builder() -> Builder {
    Builder::from_env(Env::default().default_filter_or("info"))
}

/// Log to stderr only.
pub fn init_console() {
    builder().init();
}

/// Log to stderr and append to `<home>/recorder.log`.
///
/// Falls back to stderr alone if the file cannot be opened.
pub fn init_with_file(home: &Path) {
    let path = home.join(LOG_FILE_NAME);
    match open_log_file(&path) {
        Ok(file) => {
            builder()
                .target(Target::Pipe(Box::new(Tee {
                    first: io::stderr(),
                    second: file,
                })))
                .init();
            log::debug!("logging to {}", path.display());
        }
        Err(e) => {
            builder().init();
            log::warn!("cannot open log file {}: {}", path.display(), e);
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
