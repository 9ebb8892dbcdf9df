use std::sync::Arc;

use serenity::http::Http;
use serenity::prelude::GatewayIntents;
use tokio::sync::Mutex;
use tracing::info;

use novilunio_core::{BotKind, Config, SettingsStore};
use novilunio_gateway::discord::{
    DiscordAnnouncer, RoblinBot, SettingsTargets, SharedWatchSettings, build_client,
};
use novilunio_gateway::logging::init_tracing;
use novilunio_watch::{
    ArticleWatcher, DEFAULT_FETCH_TIMEOUT, HttpPageFetcher, WatchToggle, spawn_watch_loop,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(BotKind::Roblin)?;
    info!(dir = %config.data_dir.root().display(), "Configuration loaded");

    let token = &config.secrets.discord_bot_token;
    let settings: SharedWatchSettings = Arc::new(Mutex::new(SettingsStore::open(
        config.data_dir.watch_settings(),
    )?));

    // Own REST client: the watch loop starts before the gateway connects.
    let http = Arc::new(Http::new(token));
    let toggle = WatchToggle::new(false);
    let watcher = ArticleWatcher::new(
        HttpPageFetcher::new(DEFAULT_FETCH_TIMEOUT)?,
        DiscordAnnouncer::new(http, Arc::clone(&settings)),
        toggle.clone(),
        config.data_dir.watch_state(),
    )?;
    let watcher = Arc::new(Mutex::new(watcher));
    let _watch_loop = spawn_watch_loop(
        Arc::clone(&watcher),
        Arc::new(SettingsTargets::new(Arc::clone(&settings))),
    );

    let bot = RoblinBot::new(config.data_dir.clone(), settings, watcher, toggle);
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;
    let mut client = build_client(token, intents, bot).await?;

    client.start().await?;
    Ok(())
}
