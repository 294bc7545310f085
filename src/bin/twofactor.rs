use anyhow::Result;
use twofactor::cli::{actions::run, start::start};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, action) = start()?;

    run::handle(action, &config).await
}
