//! xz2csv - decompress an xz archive into CSV

use csvzip::Codec;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    csvzip::cli::run_decompress(Codec::Xz).await
}
