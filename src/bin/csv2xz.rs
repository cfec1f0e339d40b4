//! csv2xz - compress a text file with xz

use csvzip::Codec;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    csvzip::cli::run_compress(Codec::Xz).await
}
