//! JSON-lines transport.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use tc_common::{Delivery, Transport};

/// Writes each record as one JSON line.
///
/// Implements [`Transport`] for any serializable record, so one shared
/// instance can be registered on both the event bus and the logger.
pub struct JsonlTransport<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonlTransport<File> {
    /// Append to `path`, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<R, W> Transport<R> for JsonlTransport<W>
where
    R: Serialize,
    W: Write + Send,
{
    fn deliver(&self, record: &R) -> Delivery {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(err) => return Delivery::failed(err),
        };
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        match writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            Ok(()) => Delivery::Done,
            Err(err) => Delivery::failed(err),
        }
    }
}
