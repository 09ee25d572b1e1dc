#[tokio::main]
async fn main() -> anyhow::Result<()> {
    phrasewall_lib::run().await
}
