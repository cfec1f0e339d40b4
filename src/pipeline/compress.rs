//! Text → archive driver
//!
//! `Streaming` and `Mapped` scan the input into lines and write them LF-terminated;
//! `Direct` maps the input and feeds it to the encoder untouched.

use crate::error::{ConvertError, Result};
use crate::file_handler::{
    validate_input_file, ByteSource, ExistencePolicy, InputMode, LineScanner, MappedFile,
    OutputSink,
};
use crate::pipeline::types::{CompressConfig, CompressMode, RunReport, RunState};
use crate::pipeline::{copy_lines, ensure_output_absent, settle, StateTracker};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One compression run
#[derive(Debug)]
pub struct Compressor {
    config: CompressConfig,
    tracker: StateTracker,
}

impl Compressor {
    pub fn new(config: CompressConfig) -> Self {
        let tracker = StateTracker::new(&config.input);
        Self { config, tracker }
    }

    pub fn config(&self) -> &CompressConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.tracker.state()
    }

    pub async fn run(&mut self) -> Result<RunReport> {
        self.tracker.begin()?;
        let started = Instant::now();
        let output = self.config.output_path();

        let result = match self.config.mode {
            CompressMode::Streaming => self.scan_into(output, InputMode::Streaming).await,
            CompressMode::Mapped => self.scan_into(output, InputMode::Mapped).await,
            CompressMode::Direct => self.copy_into(output).await,
        };

        match result {
            Ok((output, lines, bytes_written)) => {
                self.tracker.advance(RunState::Done);
                let report = RunReport {
                    output,
                    lines,
                    bytes_written,
                    elapsed: started.elapsed(),
                };
                log::info!(
                    "Compressed {} -> {} ({}): {} bytes in {:?}",
                    self.config.input.display(),
                    report.output.display(),
                    self.config.codec,
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

    async fn prepare(&self, output: &Path) -> Result<()> {
        if self.config.policy == ExistencePolicy::Fail {
            ensure_output_absent(output).await?;
        }
        validate_input_file(&self.config.input)
    }

    async fn scan_into(
        &mut self,
        output: PathBuf,
        input_mode: InputMode,
    ) -> Result<(PathBuf, Option<u64>, u64)> {
        self.prepare(&output).await?;
        let config = &self.config;

        let source = ByteSource::open(&config.input, input_mode).await?;
        self.tracker.advance(RunState::InputOpened);

        let mut sink = match OutputSink::open_encoded(&output, config.policy, config.codec).await {
            Ok(sink) => sink,
            Err(e) => {
                source.close();
                return Err(e);
            }
        };
        self.tracker.advance(RunState::OutputOpened);

        let mut scanner = LineScanner::with_max_line_len(source, config.max_line_len);
        self.tracker.advance(RunState::Streaming);

        let streamed =
            copy_lines(&mut scanner, &mut sink, config.line_mode, None, &config.input).await;

        // Release in reverse order: output first, then input
        let closed = sink.close().await;
        scanner.into_inner().close();

        let (lines, bytes_written) = settle(streamed, closed)?;
        Ok((output, Some(lines), bytes_written))
    }

    async fn copy_into(&mut self, output: PathBuf) -> Result<(PathBuf, Option<u64>, u64)> {
        self.prepare(&output).await?;
        let config = &self.config;

        let mapped = MappedFile::open(&config.input)?;
        self.tracker.advance(RunState::InputOpened);

        let mut sink = match OutputSink::open_encoded(&output, config.policy, config.codec).await {
            Ok(sink) => sink,
            Err(e) => {
                mapped.close();
                return Err(e);
            }
        };
        self.tracker.advance(RunState::OutputOpened);
        self.tracker.advance(RunState::Streaming);

        let streamed = sink
            .write_bytes(mapped.as_bytes())
            .await
            .map_err(|source| ConvertError::Write {
                path: output.clone(),
                line: None,
                source,
            });

        let closed = sink.close().await;
        mapped.close();

        let ((), bytes_written) = settle(streamed, closed)?;
        Ok((output, None, bytes_written))
    }
}

/// Compress `config.input` into `<input>.<ext>`.
pub async fn compress_file(config: CompressConfig) -> Result<RunReport> {
    Compressor::new(config).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Codec;
    use crate::pipeline::decompress_to_csv;
    use crate::pipeline::types::DecompressConfig;
    use flate2::read::MultiGzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn gunzip(path: &Path) -> Vec<u8> {
        let mut out = Vec::new();
        MultiGzDecoder::new(std::fs::File::open(path).unwrap())
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[tokio::test]
    async fn test_scanning_modes_normalise_line_endings() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("prices.csv");
        std::fs::write(&input, b"a,1\r\nb,2").unwrap();

        for mode in [CompressMode::Streaming, CompressMode::Mapped] {
            let config = CompressConfig::new(&input, Codec::Gzip)
                .unwrap()
                .with_mode(mode);
            let report = compress_file(config).await.unwrap();

            assert_eq!(report.output, dir.path().join("prices.csv.gz"));
            assert_eq!(report.lines, Some(2));
            assert_eq!(gunzip(&report.output), b"a,1\nb,2\n");
        }
    }

    #[tokio::test]
    async fn test_direct_mode_keeps_bytes() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw.txt");
        std::fs::write(&input, b"a,1\r\nb,2").unwrap();

        let config = CompressConfig::new(&input, Codec::Gzip)
            .unwrap()
            .with_mode(CompressMode::Direct);
        let mut run = Compressor::new(config);
        let report = run.run().await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(report.lines, None);
        assert_eq!(report.bytes_written, 9);
        assert_eq!(gunzip(&report.output), b"a,1\r\nb,2");
    }

    #[tokio::test]
    async fn test_append_adds_a_member() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("log.txt");
        std::fs::write(&input, b"x\n").unwrap();

        for _ in 0..2 {
            let config = CompressConfig::new(&input, Codec::Gzip)
                .unwrap()
                .with_policy(ExistencePolicy::Append);
            compress_file(config).await.unwrap();
        }
        assert_eq!(gunzip(&dir.path().join("log.txt.gz")), b"x\nx\n");
    }

    #[tokio::test]
    async fn test_round_trip_through_every_codec() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("table");
        let content: Vec<u8> = (0..500)
            .flat_map(|i| format!("{i},{}\n", i * 7).into_bytes())
            .collect();
        std::fs::write(&input, &content).unwrap();

        for codec in Codec::ALL {
            let config = CompressConfig::new(&input, codec).unwrap();
            let report = compress_file(config).await.unwrap();

            let back = decompress_to_csv(DecompressConfig::new(&report.output, codec).unwrap())
                .await
                .unwrap();
            assert_eq!(std::fs::read(&back.output).unwrap(), content, "{codec}");
        }
    }

    #[tokio::test]
    async fn test_unopenable_output_fails_every_mode_once() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("rows.txt");
        std::fs::write(&input, b"a,1\n").unwrap();
        // A directory occupying the archive name cannot be opened for writing
        std::fs::create_dir(dir.path().join("rows.txt.bz2")).unwrap();

        for mode in [CompressMode::Streaming, CompressMode::Mapped, CompressMode::Direct] {
            let config = CompressConfig::new(&input, Codec::Bzip2)
                .unwrap()
                .with_mode(mode);
            let mut run = Compressor::new(config);

            let err = run.run().await.unwrap_err();
            assert!(matches!(err, ConvertError::OutputOpen { .. }), "{mode}");
            assert_eq!(run.state(), RunState::Failed);

            let err = run.run().await.unwrap_err();
            assert!(matches!(err, ConvertError::AlreadyFinished { .. }));
            assert_eq!(run.state(), RunState::Failed);
        }
    }

    #[tokio::test]
    async fn test_direct_mode_rejects_empty_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("empty.txt");
        std::fs::write(&input, b"").unwrap();

        let config = CompressConfig::new(&input, Codec::Xz)
            .unwrap()
            .with_mode(CompressMode::Direct);
        let err = compress_file(config).await.unwrap_err();
        assert!(matches!(err, ConvertError::Map { .. }));
        assert!(!dir.path().join("empty.txt.xz").exists());
    }
}
