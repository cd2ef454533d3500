use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    savebot::run().await
}
