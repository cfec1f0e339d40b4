//! Archive → CSV driver

use crate::error::Result;
use crate::file_handler::{
    validate_input_file, CompressedSource, ExistencePolicy, LineScanner, OutputSink,
};
use crate::pipeline::types::{DecompressConfig, RunReport, RunState};
use crate::pipeline::{copy_lines, ensure_output_absent, settle, StateTracker};
use std::time::Instant;

/// One decompression run
#[derive(Debug)]
pub struct Decompressor {
    config: DecompressConfig,
    tracker: StateTracker,
}

impl Decompressor {
    pub fn new(config: DecompressConfig) -> Self {
        let tracker = StateTracker::new(&config.input);
        Self { config, tracker }
    }

    pub fn config(&self) -> &DecompressConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.tracker.state()
    }

    /// Run the conversion to completion.
    ///
    /// On failure the output may hold the lines written before the error; it is
    /// flushed and closed but not removed. A driver runs once: calling this again
    /// after `Done` or `Failed` returns `AlreadyFinished` and leaves the state as is.
    pub async fn run(&mut self) -> Result<RunReport> {
        self.tracker.begin()?;
        let started = Instant::now();
        match self.execute(started).await {
            Ok(report) => {
                self.tracker.advance(RunState::Done);
                log::info!(
                    "Decompressed {} -> {}: {} lines, {} bytes in {:?}",
                    self.config.input.display(),
                    report.output.display(),
                    report.lines.unwrap_or_default(),
                    report.bytes_written,
                    report.elapsed
                );
                Ok(report)
            }
            Err(e) => {
                self.tracker.advance(RunState::Failed);
                log::debug!("Run failed during {}: {}", e.stage(), e);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, started: Instant) -> Result<RunReport> {
        let config = &self.config;
        let output = config.output_path();

        if config.policy == ExistencePolicy::Fail {
            ensure_output_absent(&output).await?;
        }
        validate_input_file(&config.input)?;

        let source =
            CompressedSource::open(&config.input, config.codec, config.input_mode).await?;
        self.tracker.advance(RunState::InputOpened);

        let mut sink = match OutputSink::open(&output, config.policy).await {
            Ok(sink) => sink,
            Err(e) => {
                source.close();
                return Err(e);
            }
        };
        self.tracker.advance(RunState::OutputOpened);

        let mut scanner = LineScanner::with_max_line_len(source, config.max_line_len);
        self.tracker.advance(RunState::Streaming);

        let streamed = copy_lines(
            &mut scanner,
            &mut sink,
            config.line_mode,
            Some(config.codec),
            &config.input,
        )
        .await;

        // Release in reverse order: output first, then input
        let closed = sink.close().await;
        scanner.into_inner().close();

        let (lines, bytes_written) = settle(streamed, closed)?;
        Ok(RunReport {
            output,
            lines: Some(lines),
            bytes_written,
            elapsed: started.elapsed(),
        })
    }
}

/// Convert `config.input` into `<input>.csv`.
pub async fn decompress_to_csv(config: DecompressConfig) -> Result<RunReport> {
    Decompressor::new(config).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Codec;
    use crate::error::ConvertError;
    use crate::file_handler::InputMode;
    use crate::pipeline::types::LineMode;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_gz(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_crlf_archive_becomes_lf_csv() {
        let dir = TempDir::new().unwrap();
        let input = write_gz(dir.path(), "data.csv.gz", b"a,1\r\nb,2\r\n");

        let config = DecompressConfig::new(&input, Codec::Gzip).unwrap();
        let mut run = Decompressor::new(config);
        let report = run.run().await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(report.output, dir.path().join("data.csv.gz.csv"));
        assert_eq!(report.lines, Some(2));
        assert_eq!(report.bytes_written, 8);
        assert_eq!(std::fs::read(&report.output).unwrap(), b"a,1\nb,2\n");
    }

    #[tokio::test]
    async fn test_second_run_is_refused() {
        let dir = TempDir::new().unwrap();
        let input = write_gz(dir.path(), "once.gz", b"a\n");

        let mut run = Decompressor::new(DecompressConfig::new(&input, Codec::Gzip).unwrap());
        assert_eq!(run.run().await.unwrap().lines, Some(1));

        std::fs::write(dir.path().join("once.gz.csv"), b"kept\n").unwrap();
        let err = run.run().await.unwrap_err();
        assert!(matches!(err, ConvertError::AlreadyFinished { .. }));
        assert_eq!(run.state(), RunState::Done);
        assert_eq!(std::fs::read(dir.path().join("once.gz.csv")).unwrap(), b"kept\n");
    }

    #[tokio::test]
    async fn test_modes_produce_identical_output() {
        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..2000)
            .flat_map(|i| format!("{i},row {i}\r\n").into_bytes())
            .collect();
        let input = write_gz(dir.path(), "rows.gz", &content);

        let mut outputs = Vec::new();
        for input_mode in [InputMode::Streaming, InputMode::Mapped] {
            for line_mode in [LineMode::Bytes, LineMode::Text] {
                let config = DecompressConfig::new(&input, Codec::Gzip)
                    .unwrap()
                    .with_input_mode(input_mode)
                    .with_line_mode(line_mode);
                let report = decompress_to_csv(config).await.unwrap();
                assert_eq!(report.lines, Some(2000));
                outputs.push(std::fs::read(&report.output).unwrap());
            }
        }
        assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test]
    async fn test_fail_policy_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_gz(dir.path(), "data.gz", b"x\n");
        let output = dir.path().join("data.gz.csv");
        std::fs::write(&output, b"previous\n").unwrap();

        let config = DecompressConfig::new(&input, Codec::Gzip)
            .unwrap()
            .with_policy(ExistencePolicy::Fail);
        let mut run = Decompressor::new(config);
        let err = run.run().await.unwrap_err();

        assert!(matches!(err, ConvertError::OutputExists { .. }));
        assert_eq!(run.state(), RunState::Failed);
        assert_eq!(std::fs::read(&output).unwrap(), b"previous\n");
    }

    #[tokio::test]
    async fn test_fail_policy_checked_before_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("missing.gz");
        std::fs::write(dir.path().join("missing.gz.csv"), b"").unwrap();

        let config = DecompressConfig::new(&input, Codec::Gzip)
            .unwrap()
            .with_policy(ExistencePolicy::Fail);
        let err = decompress_to_csv(config).await.unwrap_err();
        assert!(matches!(err, ConvertError::OutputExists { .. }));
    }

    #[tokio::test]
    async fn test_bad_header_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("plain.gz");
        std::fs::write(&input, b"not gzip at all\n").unwrap();

        let config = DecompressConfig::new(&input, Codec::Gzip).unwrap();
        let err = decompress_to_csv(config).await.unwrap_err();

        assert!(matches!(err, ConvertError::Codec { line: None, .. }));
        assert!(!dir.path().join("plain.gz.csv").exists());
    }

    #[tokio::test]
    async fn test_truncated_archive_fails_after_partial_output() {
        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..5000)
            .flat_map(|i| format!("{i},value\n").into_bytes())
            .collect();
        let full = write_gz(dir.path(), "full.gz", &content);
        let bytes = std::fs::read(&full).unwrap();
        let input = dir.path().join("cut.gz");
        std::fs::write(&input, &bytes[..bytes.len() / 2]).unwrap();

        let config = DecompressConfig::new(&input, Codec::Gzip).unwrap();
        let err = decompress_to_csv(config).await.unwrap_err();
        assert!(matches!(
            err,
            ConvertError::TruncatedStream { .. } | ConvertError::Codec { .. }
        ));
        assert!(dir.path().join("cut.gz.csv").exists());
    }

    #[tokio::test]
    async fn test_output_path_is_a_directory() {
        let dir = TempDir::new().unwrap();
        let input = write_gz(dir.path(), "in.gz", b"a\n");
        // A directory occupying the output name cannot be opened for writing
        std::fs::create_dir(dir.path().join("in.gz.csv")).unwrap();

        let config = DecompressConfig::new(&input, Codec::Gzip).unwrap();
        let err = decompress_to_csv(config).await.unwrap_err();
        assert!(matches!(err, ConvertError::OutputOpen { .. }));
    }
}
