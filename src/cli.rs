//! Command-line front end shared by the six converters
//!
//! Each binary only picks a codec and a direction. Long flags are also accepted
//! with a single dash (`-mmap=scanner`); [`normalize_args`] rewrites those into
//! clap's `--mmap=scanner`.

use crate::codec::Codec;
use crate::config::{self, Settings};
use crate::error::{ConvertError, Result};
use crate::file_handler::{ExistencePolicy, InputMode};
use crate::pipeline::{
    compress_file, decompress_to_csv, CompressConfig, CompressMode, DecompressConfig, LineMode,
};
use clap::{value_parser, Arg, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

const LONG_FLAGS: [&str; 7] = ["mmap", "csv", "gz", "bz2", "xz", "lines", "max-line-len"];

/// Binary name of the archive → CSV converter for `codec`
pub fn decompress_name(codec: Codec) -> &'static str {
    match codec {
        Codec::Gzip => "gz2csv",
        Codec::Bzip2 => "bz2csv",
        Codec::Xz => "xz2csv",
    }
}

/// Binary name of the text → archive converter for `codec`
pub fn compress_name(codec: Codec) -> &'static str {
    match codec {
        Codec::Gzip => "csv2gz",
        Codec::Bzip2 => "csv2bz",
        Codec::Xz => "csv2xz",
    }
}

/// Rewrite `-flag` / `-flag=value` into `--flag` / `--flag=value` for known long flags.
///
/// The first element (program name) and anything else pass through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .enumerate()
        .map(|(index, arg)| {
            let arg = arg.into();
            if index == 0 {
                return arg;
            }
            match arg.to_str() {
                Some(text) if is_single_dash_long(text) => OsString::from(format!("-{text}")),
                _ => arg,
            }
        })
        .collect()
}

fn is_single_dash_long(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') {
        return false;
    }
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
    LONG_FLAGS.contains(&name)
}

fn common_args(command: Command) -> Command {
    command
        .version(crate::VERSION)
        .arg(
            Arg::new("input")
                .help("Path to the input file")
                .index(1),
        )
        .arg(
            Arg::new("lines")
                .long("lines")
                .value_name("MODE")
                .help("Line retrieval mode of the scanner [default: bytes]")
                .value_parser(["bytes", "text"]),
        )
        .arg(
            Arg::new("max-line-len")
                .long("max-line-len")
                .value_name("BYTES")
                .help("Longest accepted line, terminator excluded [default: 65536]")
                .value_parser(value_parser!(usize)),
        )
}

/// Argument parser for an archive → CSV converter
pub fn decompress_command(codec: Codec) -> Command {
    let command = Command::new(decompress_name(codec)).about(format!(
        "Decompress a {codec} archive into <input>.csv, normalising line endings to LF"
    ));
    common_args(command)
        .arg(
            Arg::new("mmap")
                .long("mmap")
                .value_name("MODE")
                .help("Input mode: none streams the file, scanner maps it [default: none]")
                .value_parser(["none", "scanner"]),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .value_name("POLICY")
                .help("When the CSV file exists: overwrite, append or fail [default: overwrite]")
                .value_parser(["overwrite", "append", "fail"]),
        )
}

/// Argument parser for a text → archive converter
pub fn compress_command(codec: Codec) -> Command {
    let command = Command::new(compress_name(codec)).about(format!(
        "Compress a text file into <input>.{} with {codec}",
        codec.extension()
    ));
    common_args(command)
        .arg(
            Arg::new("mmap")
                .long("mmap")
                .value_name("MODE")
                .help("Input mode: none, scanner or direct (unmodified bytes) [default: none]")
                .value_parser(["none", "scanner", "direct"]),
        )
        .arg(
            Arg::new("policy")
                .long(codec.extension())
                .value_name("POLICY")
                .help("When the archive exists: overwrite, append or fail [default: overwrite]")
                .value_parser(["overwrite", "append", "fail"]),
        )
}

fn parsed<T: FromStr<Err = ConvertError>>(matches: &ArgMatches, id: &str) -> Result<Option<T>> {
    matches
        .get_one::<String>(id)
        .map(|value| value.parse())
        .transpose()
}

fn input_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("input")
        .map(PathBuf::from)
        .unwrap_or_default()
}

fn max_line_len(matches: &ArgMatches, settings: &Settings) -> Result<Option<usize>> {
    match matches.get_one::<usize>("max-line-len").copied().or(settings.max_line_len) {
        Some(0) => Err(ConvertError::usage("max-line-len must be at least 1")),
        other => Ok(other),
    }
}

/// Build the run configuration from parsed flags; flags win over the loaded settings.
///
/// The input name is validated before `load_settings` runs, so a usage error is
/// reported even when the settings file is broken.
pub fn decompress_config<F>(
    codec: Codec,
    matches: &ArgMatches,
    load_settings: F,
) -> Result<DecompressConfig>
where
    F: FnOnce() -> Result<Settings>,
{
    let mut config = DecompressConfig::new(input_path(matches), codec)?;
    let settings = &load_settings()?;

    if let Some(mode) = parsed::<InputMode>(matches, "mmap")?.or(settings.mmap) {
        config = config.with_input_mode(mode);
    }
    if let Some(policy) = parsed::<ExistencePolicy>(matches, "csv")?.or(settings.csv) {
        config = config.with_policy(policy);
    }
    if let Some(line_mode) = parsed::<LineMode>(matches, "lines")?.or(settings.lines) {
        config = config.with_line_mode(line_mode);
    }
    if let Some(limit) = max_line_len(matches, settings)? {
        config = config.with_max_line_len(limit);
    }
    Ok(config)
}

/// Build the run configuration from parsed flags; flags win over the loaded settings.
///
/// The input name is validated before `load_settings` runs, so a usage error is
/// reported even when the settings file is broken.
pub fn compress_config<F>(
    codec: Codec,
    matches: &ArgMatches,
    load_settings: F,
) -> Result<CompressConfig>
where
    F: FnOnce() -> Result<Settings>,
{
    let mut config = CompressConfig::new(input_path(matches), codec)?;
    let settings = &load_settings()?;

    if let Some(mode) = parsed::<CompressMode>(matches, "mmap")? {
        config = config.with_mode(mode);
    }
    if let Some(policy) = parsed::<ExistencePolicy>(matches, "policy")? {
        config = config.with_policy(policy);
    }
    if let Some(line_mode) = parsed::<LineMode>(matches, "lines")?.or(settings.lines) {
        config = config.with_line_mode(line_mode);
    }
    if let Some(limit) = max_line_len(matches, settings)? {
        config = config.with_max_line_len(limit);
    }
    Ok(config)
}

/// Entry point of the `*2csv` binaries
pub async fn run_decompress(codec: Codec) -> anyhow::Result<()> {
    let matches = decompress_command(codec).get_matches_from(normalize_args(std::env::args_os()));
    let config = decompress_config(codec, &matches, config::load)?;

    println!("mmap={}, csv={}", config.input_mode, config.policy);
    let report = decompress_to_csv(config).await?;
    println!("elapsed {:?}", report.elapsed);
    Ok(())
}

/// Entry point of the `csv2*` binaries
pub async fn run_compress(codec: Codec) -> anyhow::Result<()> {
    let matches = compress_command(codec).get_matches_from(normalize_args(std::env::args_os()));
    let config = compress_config(codec, &matches, config::load)?;

    println!(
        "mmap={}, {}={}",
        config.mode,
        codec.extension(),
        config.policy
    );
    let report = compress_file(config).await?;
    println!("elapsed {:?}", report.elapsed);
    Ok(())
}
