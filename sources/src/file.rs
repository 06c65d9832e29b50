//! Replay a captured Base Station feed from a file, one message per line.
//!

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::{MessageSource, SourceError};

#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    reader: BufReader<File>,
}

impl FileSource {
    #[tracing::instrument]
    pub fn open<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref().to_owned();
        let reader = BufReader::new(File::open(&path)?);
        Ok(FileSource { path, reader })
    }
}

impl MessageSource for FileSource {
    fn name(&self) -> String {
        format!("file({})", self.path.display())
    }

    fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        let mut line = String::new();
        match self.reader.read_line(&mut line)? {
            0 => {
                trace!("{}: end of replay", self.path.display());
                Ok(None)
            }
            _ => Ok(Some(line.trim_end().to_owned())),
        }
    }
}
