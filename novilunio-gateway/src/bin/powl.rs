use serenity::prelude::GatewayIntents;
use tracing::info;

use novilunio_core::{BotKind, Config};
use novilunio_gateway::discord::{PowlBot, build_client};
use novilunio_gateway::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(BotKind::Powl)?;
    info!(dir = %config.data_dir.root().display(), "Configuration loaded");

    let bot = PowlBot::open(config.data_dir.clone())?;
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;
    let mut client = build_client(&config.secrets.discord_bot_token, intents, bot).await?;

    client.start().await?;
    Ok(())
}
