//! Conversion drivers
//!
//! A driver owns one run from start to finish: it checks the output policy, opens
//! the input and the output, streams lines between them and releases both handles
//! in reverse order of acquisition. Each run walks the [`RunState`] machine and
//! ends in `Done` or `Failed`.
//!
//! - [`decompress`] turns a gzip/bzip2/xz archive into `<archive>.csv`
//! - [`compress`] goes the other way, `<text>` into `<text>.<ext>`

pub mod compress;
pub mod decompress;
pub mod types;

pub use compress::{compress_file, Compressor};
pub use decompress::{decompress_to_csv, Decompressor};
pub use types::{
    append_extension, CompressConfig, CompressMode, DecompressConfig, LineMode, RunReport,
    RunState, CSV_EXTENSION,
};

use crate::codec::Codec;
use crate::error::{ConvertError, Result};
use crate::file_handler::{LineScanner, OutputSink};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncBufRead;

/// Current state of a run plus the transition log
#[derive(Debug)]
pub(crate) struct StateTracker {
    label: PathBuf,
    state: RunState,
}

impl StateTracker {
    pub(crate) fn new(label: &Path) -> Self {
        Self {
            label: label.to_path_buf(),
            state: RunState::Idle,
        }
    }

    pub(crate) fn state(&self) -> RunState {
        self.state
    }

    /// Refuse to start a run that has already reached a terminal state
    pub(crate) fn begin(&self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(ConvertError::AlreadyFinished {
                path: self.label.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn advance(&mut self, next: RunState) {
        debug_assert!(!self.state.is_terminal(), "run already finished");
        log::debug!(
            "{}: {:?} -> {:?}",
            self.label.display(),
            self.state,
            next
        );
        self.state = next;
    }
}

/// Under the `fail` policy, refuse before any handle is opened.
///
/// A stat error other than "not found" counts as existing; the exclusive create
/// in [`OutputSink::open`] catches anything that appears afterwards.
pub(crate) async fn ensure_output_absent(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Ok(_) => Err(ConvertError::OutputExists {
            path: path.to_path_buf(),
        }),
        Err(e) => {
            log::warn!(
                "Cannot stat output {} ({}); treating it as existing",
                path.display(),
                e
            );
            Err(ConvertError::OutputExists {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Copy every scanned line to `sink`, each followed by `\n`.
///
/// `codec` names the compression of `input` for error classification (`None` for
/// plain text). Returns the number of lines written.
pub(crate) async fn copy_lines<R>(
    scanner: &mut LineScanner<R>,
    sink: &mut OutputSink,
    line_mode: LineMode,
    codec: Option<Codec>,
    input: &Path,
) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let line_no = scanner.lines_read() + 1;
        let written = match line_mode {
            LineMode::Bytes => match scanner.next_borrowed().await {
                Ok(Some(line)) => sink.write_line(line).await,
                Ok(None) => break,
                Err(e) => return Err(ConvertError::from_scan(e, codec, input, line_no)),
            },
            LineMode::Text => match scanner.next_owned().await {
                Ok(Some(line)) => sink.write_line(&line).await,
                Ok(None) => break,
                Err(e) => return Err(ConvertError::from_scan(e, codec, input, line_no)),
            },
        };
        written.map_err(|source| ConvertError::Write {
            path: sink.path().to_path_buf(),
            line: Some(line_no),
            source,
        })?;
    }
    Ok(scanner.lines_read())
}

/// Combine the streaming outcome with the sink's close outcome; the first error wins.
pub(crate) fn settle<T>(streamed: Result<T>, closed: Result<u64>) -> Result<(T, u64)> {
    match (streamed, closed) {
        (Ok(value), Ok(bytes)) => Ok((value, bytes)),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        (Err(e), Err(close_err)) => {
            log::warn!("Output close also failed: {close_err}");
            Err(e)
        }
    }
}
