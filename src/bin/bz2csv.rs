//! bz2csv - decompress a bzip2 archive into CSV

use csvzip::Codec;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    csvzip::cli::run_decompress(Codec::Bzip2).await
}
