//! csv2bz - compress a text file with bzip2

use csvzip::Codec;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    csvzip::cli::run_compress(Codec::Bzip2).await
}
