use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::builder::{CreateAllowedMentions, CreateCommand, CreateCommandOption, CreateMessage};
use serenity::http::Http;
use serenity::model::Permissions;
use serenity::model::application::{
    Command, CommandInteraction, CommandOptionType, Interaction, ResolvedOption,
};
use serenity::model::channel::ChannelType;
use serenity::model::gateway::Ready;
use serenity::prelude::{Context, EventHandler};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use novilunio_core::config::MIN_CHECK_EVERY_SECS;
use novilunio_core::{DataDir, SettingsStore, StoreError, WatchSettings};
use novilunio_watch::{
    Announcement, Announcer, ArticleWatcher, HttpPageFetcher, WatchError, WatchTargets,
    WatchToggle, parse_page_url,
};

use super::options;
use super::{HandlerError, respond};
use crate::messages;

pub type SharedWatchSettings = Arc<Mutex<SettingsStore<WatchSettings>>>;

pub type DiscordWatcher = ArticleWatcher<HttpPageFetcher, DiscordAnnouncer>;

/// Posts new links to the configured channel, mentioning the configured role.
pub struct DiscordAnnouncer {
    http: Arc<Http>,
    settings: SharedWatchSettings,
}

impl DiscordAnnouncer {
    pub fn new(http: Arc<Http>, settings: SharedWatchSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl Announcer for DiscordAnnouncer {
    async fn announce(&self, announcement: &Announcement) -> Result<(), WatchError> {
        let (channel, role) = {
            let settings = self.settings.lock().await;
            (settings.get().channel, settings.get().role)
        };
        let channel = channel
            .and_then(options::channel_id)
            .ok_or_else(|| WatchError::Announce("notification channel not set".to_string()))?;
        let role = role.and_then(options::role_id);

        let mut mentions = CreateAllowedMentions::new();
        if let Some(role) = role {
            mentions = mentions.roles(vec![role]);
        }
        channel
            .send_message(
                &self.http,
                CreateMessage::new()
                    .content(messages::announcement(
                        role.map(|role| role.get()),
                        &announcement.link,
                    ))
                    .allowed_mentions(mentions),
            )
            .await
            .map_err(|e| WatchError::Announce(e.to_string()))?;
        Ok(())
    }
}

/// Watch targets read live from the settings store.
pub struct SettingsTargets {
    settings: SharedWatchSettings,
}

impl SettingsTargets {
    pub fn new(settings: SharedWatchSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl WatchTargets for SettingsTargets {
    async fn urls(&self) -> Vec<String> {
        self.settings.lock().await.get().urls.clone()
    }

    async fn interval(&self) -> Duration {
        self.settings.lock().await.get().interval()
    }
}

/// Slash-command handler of the article watcher bot.
///
/// Lock order is watcher, then settings, matching the watch loop.
pub struct RoblinBot {
    data_dir: DataDir,
    settings: SharedWatchSettings,
    watcher: Arc<Mutex<DiscordWatcher>>,
    toggle: WatchToggle,
}

impl RoblinBot {
    pub fn new(
        data_dir: DataDir,
        settings: SharedWatchSettings,
        watcher: Arc<Mutex<DiscordWatcher>>,
        toggle: WatchToggle,
    ) -> Self {
        Self {
            data_dir,
            settings,
            watcher,
            toggle,
        }
    }

    async fn run(&self, ctx: &Context, command: &CommandInteraction) -> Result<String, HandlerError> {
        let options = command.data.options();
        match command.data.name.as_str() {
            "aiuto" => Ok(messages::ROBLIN_HELP.to_string()),
            "impostazioni" => self.configure(&options).await,
            "ascolta" => Ok(self.listen()),
            "arruolami" => self.enlist(ctx, command).await,
            "reset" => self.reset(&options).await,
            other => {
                warn!(command = other, "unknown command");
                Ok(messages::GENERIC_ERROR.to_string())
            }
        }
    }

    async fn configure(&self, opts: &[ResolvedOption<'_>]) -> Result<String, HandlerError> {
        let channel = options::channel(opts, "canale");
        let add = options::string(opts, "aggiungi-url");
        let remove = options::string(opts, "rimuovi-url");
        let role = options::role(opts, "ruolo");
        let interval = options::integer(opts, "intervallo");

        let mut store = self.settings.lock().await;
        if channel.is_none() && add.is_none() && remove.is_none() && role.is_none() && interval.is_none()
        {
            return Ok(messages::watch_settings(store.get()));
        }

        if let Some(url) = add
            && let Err(e) = parse_page_url(url)
        {
            info!(url, error = %e, "rejected watch url");
            return Ok(messages::invalid_setting(&format!("{url} non è un indirizzo web valido")));
        }
        if let Some(secs) = interval
            && secs < MIN_CHECK_EVERY_SECS as i64
        {
            return Ok(messages::invalid_setting(&format!(
                "l'intervallo deve essere di almeno {MIN_CHECK_EVERY_SECS} secondi"
            )));
        }

        let notes = store.update(|settings| {
            let mut notes = Vec::new();
            if let Some(channel) = channel {
                settings.channel = Some(channel.get());
            }
            if let Some(role) = role {
                settings.role = Some(role.get());
            }
            if let Some(secs) = interval {
                settings.check_every = Some(secs);
            }
            if let Some(url) = add {
                let url = url.trim();
                notes.push(if settings.add_url(url) {
                    messages::url_added(url)
                } else {
                    messages::url_already_present(url)
                });
            }
            if let Some(url) = remove {
                let url = url.trim();
                notes.push(if settings.remove_url(url) {
                    messages::url_removed(url)
                } else {
                    messages::url_missing(url)
                });
            }
            Ok::<_, StoreError>(notes)
        })?;

        let mut reply = notes.join("\n");
        if !reply.is_empty() {
            reply.push('\n');
        }
        reply.push_str(&messages::watch_settings(store.get()));
        Ok(reply)
    }

    fn listen(&self) -> String {
        if self.toggle.toggle() {
            info!("article watch enabled");
            messages::LISTEN_ON.to_string()
        } else {
            info!("article watch disabled");
            messages::LISTEN_OFF.to_string()
        }
    }

    async fn enlist(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
    ) -> Result<String, HandlerError> {
        let Some(member) = command.member.as_deref() else {
            return Ok(messages::GUILD_ONLY.to_string());
        };
        let (role, urls) = {
            let store = self.settings.lock().await;
            (store.get().role, store.get().urls.clone())
        };
        let Some(role) = role.and_then(options::role_id) else {
            return Ok(messages::ROLE_NOT_SET.to_string());
        };

        if member.roles.contains(&role) {
            member.remove_role(&ctx.http, role).await?;
            info!(user = %member.user.id, role = %role, "role removed");
            Ok(messages::role_removed())
        } else {
            member.add_role(&ctx.http, role).await?;
            info!(user = %member.user.id, role = %role, "role granted");
            Ok(messages::role_granted(&urls))
        }
    }

    async fn reset(&self, opts: &[ResolvedOption<'_>]) -> Result<String, HandlerError> {
        if options::boolean(opts, "conferma") != Some(true) {
            return Ok(messages::RESET_CANCELLED.to_string());
        }
        let mut watcher = self.watcher.lock().await;
        let mut store = self.settings.lock().await;
        let removed = self.data_dir.reset()?;
        *store = SettingsStore::open(self.data_dir.watch_settings())?;
        watcher.reset()?;
        info!(removed, "watch data reset");
        Ok(messages::RESET_DONE.to_string())
    }
}

fn commands() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("aiuto").description("Mostra i comandi disponibili"),
        CreateCommand::new("impostazioni")
            .description("Mostra o modifica le impostazioni del bot")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "canale",
                    "Canale delle notifiche",
                )
                .channel_types(vec![ChannelType::Text, ChannelType::News]),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "aggiungi-url",
                "Sito da ascoltare",
            ))
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "rimuovi-url",
                "Sito da non ascoltare più",
            ))
            .add_option(CreateCommandOption::new(
                CommandOptionType::Role,
                "ruolo",
                "Ruolo da notificare",
            ))
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "intervallo",
                    "Secondi tra due controlli",
                )
                .min_int_value(MIN_CHECK_EVERY_SECS as u64),
            ),
        CreateCommand::new("ascolta")
            .description("Attiva o disattiva l'ascolto dei siti")
            .default_member_permissions(Permissions::ADMINISTRATOR),
        CreateCommand::new("arruolami")
            .description("Ricevi (o smetti di ricevere) le notifiche dei nuovi articoli"),
        CreateCommand::new("reset")
            .description("Elimina tutti i dati del bot")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Boolean,
                    "conferma",
                    "Conferma l'eliminazione",
                )
                .required(true),
            ),
    ]
}

#[async_trait]
impl EventHandler for RoblinBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);
        if let Err(e) = Command::set_global_commands(&ctx.http, commands()).await {
            error!("Failed to register slash commands: {}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        respond(&ctx, &command, self.run(&ctx, &command)).await;
    }
}
