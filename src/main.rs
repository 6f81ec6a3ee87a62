#[tokio::main]
async fn main() -> anyhow::Result<()> {
    postchain::node::run_cli().await
}
