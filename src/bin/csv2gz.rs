//! csv2gz - compress a text file with gzip

use csvzip::Codec;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    csvzip::cli::run_compress(Codec::Gzip).await
}
