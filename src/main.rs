#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockcast_lib::run().await
}
