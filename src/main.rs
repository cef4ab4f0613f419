use stakehouse::app::run;
use stakehouse::config::Config;
use stakehouse::error::Result;
use stakehouse::logging::init;

#[tokio::main]
async fn main() -> Result<()> {
    init();

    let config = Config::from_env()?;

    run(config).await
}
