//! Creates the gym's single owner account.
//!
//! ```text
//! register_owner --username boss --password 'correct horse'
//! ```

use clap::Parser;
use gym_api::{auth, settings::Settings, sqlite};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "register_owner", about = "Create the gym owner account")]
struct Args {
    #[arg(long, env = "GYM_OWNER_USERNAME")]
    username: String,

    #[arg(long, env = "GYM_OWNER_PASSWORD", hide_env_values = true)]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = Settings::load()?;
    let pool = sqlite::create_pool(&settings.sqlite).await?;

    let owner = auth::register_owner(&args.username, &args.password, &pool).await?;
    println!("Registered owner '{}' (id {})", owner.username, owner.id);

    Ok(())
}
