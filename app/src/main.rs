#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tidemark_app::run().await
}
