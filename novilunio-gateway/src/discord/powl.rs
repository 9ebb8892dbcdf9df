use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serenity::async_trait;
use serenity::builder::{
    CreateAllowedMentions, CreateAttachment, CreateCommand, CreateCommandOption, CreateMessage,
    CreatePoll, CreatePollAnswer, CreateThread,
};
use serenity::model::Permissions;
use serenity::model::application::{
    Command, CommandInteraction, CommandOptionType, Interaction, ResolvedOption,
};
use serenity::model::channel::ChannelType;
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::{Context, EventHandler};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use novilunio_core::poll::{
    LEDGER_PAGE_SIZE, MAX_DURATION_SECS, ValidatedPoll, host, validate_settings, write_csv,
};
use novilunio_core::{
    DataDir, NewPoll, PlatformRef, PollDraft, PollError, PollId, PollLedger, PollRecord,
    PollSettings, PollStatus, SettingsStore, StoreError,
};

use super::options::{self, channel_ref, message_ref};
use super::poll_host::DiscordPollHost;
use super::send::say_all;
use super::{HandlerError, respond};
use crate::messages;

/// Shortest poll window the platform accepts.
const PLATFORM_MIN_WINDOW_SECS: u64 = 3600;

struct PowlState {
    ledger: PollLedger,
    settings: SettingsStore<PollSettings>,
}

impl PowlState {
    fn open(data_dir: &DataDir) -> Result<Self, StoreError> {
        Ok(Self {
            ledger: PollLedger::open(data_dir.poll_history())?,
            settings: SettingsStore::open(data_dir.poll_settings())?,
        })
    }
}

/// Slash-command handler of the poll bot.
///
/// Ledger and settings share one lock, never held across platform calls.
pub struct PowlBot {
    data_dir: DataDir,
    state: Mutex<PowlState>,
}

impl PowlBot {
    pub fn open(data_dir: DataDir) -> Result<Self, StoreError> {
        let state = PowlState::open(&data_dir)?;
        info!(
            polls = state.ledger.len(),
            dir = %data_dir.root().display(),
            "poll ledger loaded"
        );
        Ok(Self {
            data_dir,
            state: Mutex::new(state),
        })
    }

    async fn run(&self, ctx: &Context, command: &CommandInteraction) -> Result<String, HandlerError> {
        let options = command.data.options();
        match command.data.name.as_str() {
            "aiuto" => Ok(messages::POWL_HELP.to_string()),
            "impostazioni" => self.configure(&options).await,
            "votazione" => self.launch(ctx, command, &options).await,
            "gestisci" => self.manage(ctx, command, &options).await,
            "id" => self.thread_poll_id(command).await,
            "pinga" => self.thread_ping(ctx, command).await,
            "esporta" => self.thread_export(ctx, command).await,
            "reset" => self.reset(&options).await,
            other => {
                warn!(command = other, "unknown command");
                Ok(messages::GENERIC_ERROR.to_string())
            }
        }
    }

    async fn configure(&self, opts: &[ResolvedOption<'_>]) -> Result<String, HandlerError> {
        let channel = options::channel(opts, "canale");
        let majority = options::integer(opts, "maggioranza");
        let quorum = options::integer(opts, "quorum");
        let duration = options::integer(opts, "durata");

        let mut state = self.state.lock().await;
        if channel.is_none() && majority.is_none() && quorum.is_none() && duration.is_none() {
            return Ok(messages::poll_settings(state.settings.get()));
        }

        let mut candidate = state.settings.get().clone();
        if let Some(channel) = channel {
            candidate.channel = Some(channel.get());
        }
        candidate.majority = majority.or(candidate.majority);
        candidate.quorum = quorum.or(candidate.quorum);
        candidate.duration = duration.or(candidate.duration);

        match validate_settings(&candidate) {
            Ok(()) => {}
            Err(PollError::InvalidConfiguration(reason)) => {
                return Ok(messages::invalid_setting(&reason));
            }
            Err(e) => return Err(e.into()),
        }

        state.settings.update(move |settings| {
            *settings = candidate;
            Ok::<_, StoreError>(())
        })?;
        Ok(messages::poll_settings(state.settings.get()))
    }

    async fn launch(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
        opts: &[ResolvedOption<'_>],
    ) -> Result<String, HandlerError> {
        if command.guild_id.is_none() {
            return Ok(messages::GUILD_ONLY.to_string());
        }

        let mut draft = {
            let state = self.state.lock().await;
            PollDraft::from_settings(state.settings.get())
        };
        draft.title = options::string(opts, "titolo").map(str::to_string);
        draft.options = options::string(opts, "opzioni")
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|option| !option.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(channel) = options::channel(opts, "canale") {
            draft.channel = Some(channel.get());
        }
        draft.majority = options::integer(opts, "maggioranza").or(draft.majority);
        draft.quorum = options::integer(opts, "quorum").or(draft.quorum);
        draft.duration = options::integer(opts, "durata").or(draft.duration);

        let poll = draft.validate()?;
        let channel = channel_ref(poll.channel)?;
        let answers = poll
            .options
            .iter()
            .map(|option| CreatePollAnswer::new().text(option))
            .collect::<Vec<_>>();
        let message = channel
            .send_message(
                &ctx.http,
                CreateMessage::new()
                    .content(messages::poll_launched(command.user.id.get()))
                    .allowed_mentions(CreateAllowedMentions::new().everyone(true).all_users(true))
                    .poll(
                        CreatePoll::new()
                            .question(&poll.title)
                            .answers(answers)
                            .duration(platform_window(poll.duration)),
                    ),
            )
            .await?;

        let thread = channel
            .create_thread_from_message(
                &ctx.http,
                message.id,
                CreateThread::new(messages::thread_name(&poll.title)),
            )
            .await?;

        let id = self
            .state
            .lock()
            .await
            .ledger
            .register(launched_poll(&poll, message.id.get(), thread.id.get()))?;
        info!(poll_id = id, channel = %channel, author = %command.user.id, "poll launched");

        if let Err(e) = thread
            .id
            .send_message(
                &ctx.http,
                CreateMessage::new()
                    .content(messages::THREAD_INTRO)
                    .allowed_mentions(CreateAllowedMentions::new().everyone(true)),
            )
            .await
        {
            warn!(poll_id = id, thread = %thread.id, error = %e, "failed to post thread intro");
        }

        Ok(format!(
            "{}\n{}",
            messages::poll_started(id),
            messages::option_preview(&poll.options)
        ))
    }

    async fn manage(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
        opts: &[ResolvedOption<'_>],
    ) -> Result<String, HandlerError> {
        let Some((name, sub)) = options::subcommand(opts) else {
            return Ok(messages::GENERIC_ERROR.to_string());
        };
        self.sweep().await?;

        if name == "elenco" {
            let state = self.state.lock().await;
            let pages = state.ledger.page_count(LEDGER_PAGE_SIZE);
            let requested = options::integer(sub, "pagina").unwrap_or(1);
            let page = usize::try_from(requested.saturating_sub(1))
                .unwrap_or(0)
                .min(pages - 1);
            let entries = state.ledger.page(page * LEDGER_PAGE_SIZE, LEDGER_PAGE_SIZE);
            return Ok(messages::history_page(&entries, page, pages));
        }

        let Some(guild_id) = command.guild_id else {
            return Ok(messages::GUILD_ONLY.to_string());
        };
        let id = options::poll_id(sub, "id")?;
        let record = self.record(id).await?;

        match name {
            "dettagli" => self.details(ctx, guild_id, id, &record).await,
            "chiudi" => self.close(ctx, id, &record).await,
            "elimina" => self.delete(ctx, id, &record).await,
            "esporta" => self.export(ctx, guild_id, id, &record).await,
            "pinga" => {
                if record.status != PollStatus::Open {
                    return Ok(messages::illegal_transition(id, record.status));
                }
                self.ping(ctx, guild_id, id, &record).await
            }
            other => {
                warn!(subcommand = other, "unknown subcommand");
                Ok(messages::GENERIC_ERROR.to_string())
            }
        }
    }

    async fn details(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        id: PollId,
        record: &PollRecord,
    ) -> Result<String, HandlerError> {
        if record.status == PollStatus::Deleted {
            return Ok(messages::poll_deleted(id));
        }
        let host = DiscordPollHost::new(Arc::clone(&ctx.http), guild_id);
        let report = host::build_report(&host, id, record).await?;
        let pending = host::pending_voters(&host, id, record).await?;
        let jump_url = format!(
            "https://discord.com/channels/{guild_id}/{}/{}",
            record.channel, record.message
        );
        Ok(messages::poll_details(&report, record, &pending, &jump_url))
    }

    async fn close(
        &self,
        ctx: &Context,
        id: PollId,
        record: &PollRecord,
    ) -> Result<String, HandlerError> {
        if !record.status.can_become(PollStatus::Closed) {
            return Ok(messages::illegal_transition(id, record.status));
        }

        let channel = channel_ref(record.channel)?;
        let message = message_ref(record.message)?;
        if let Err(e) = ctx.http.expire_poll(channel, message).await {
            warn!(poll_id = id, error = %e, "failed to end poll on the platform");
        }
        if let Some(thread) = options::channel_id(record.thread.get()) {
            self.post_pinned(ctx, thread, CreateMessage::new().content(messages::POLL_CLOSED_NOTICE))
                .await;
        }

        self.state.lock().await.ledger.close(id)?;
        Ok(messages::closed(id))
    }

    async fn delete(
        &self,
        ctx: &Context,
        id: PollId,
        record: &PollRecord,
    ) -> Result<String, HandlerError> {
        if !record.status.can_become(PollStatus::Deleted) {
            return Ok(messages::illegal_transition(id, record.status));
        }

        if let Some(thread) = options::channel_id(record.thread.get())
            && let Err(e) = thread.delete(&ctx.http).await
        {
            warn!(poll_id = id, error = %e, "failed to delete poll thread");
        }
        let channel = channel_ref(record.channel)?;
        if let Err(e) = channel
            .delete_message(&ctx.http, message_ref(record.message)?)
            .await
        {
            warn!(poll_id = id, error = %e, "failed to delete poll message");
        }

        self.state.lock().await.ledger.delete(id)?;
        Ok(messages::deleted(id))
    }

    async fn export(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        id: PollId,
        record: &PollRecord,
    ) -> Result<String, HandlerError> {
        let host = DiscordPollHost::new(Arc::clone(&ctx.http), guild_id);
        let report = host::build_report(&host, id, record).await?;
        let path = write_csv(&self.data_dir, &report)?;
        info!(poll_id = id, path = %path.display(), "poll exported");

        let thread = options::channel_id(record.thread.get())
            .ok_or_else(|| PollError::Host(format!("invalid thread id {}", record.thread)))?;
        let attachment = CreateAttachment::path(&path).await?;
        self.post_pinned(
            ctx,
            thread,
            CreateMessage::new()
                .content(messages::POLL_EXPORTED_NOTICE)
                .add_file(attachment),
        )
        .await;
        Ok(messages::POLL_EXPORTED_NOTICE.to_string())
    }

    async fn ping(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        id: PollId,
        record: &PollRecord,
    ) -> Result<String, HandlerError> {
        let host = DiscordPollHost::new(Arc::clone(&ctx.http), guild_id);
        let pending = host::pending_voters(&host, id, record).await?;
        let chunks = messages::ping(&pending);
        if chunks.is_empty() {
            return Ok(messages::NOBODY_TO_PING.to_string());
        }
        let thread = options::channel_id(record.thread.get())
            .ok_or_else(|| PollError::Host(format!("invalid thread id {}", record.thread)))?;
        say_all(&ctx.http, thread, &chunks).await?;
        info!(poll_id = id, pinged = pending.len(), "non-voters pinged");
        Ok(format!("Ho menzionato {} utenti.", pending.len()))
    }

    async fn thread_poll_id(&self, command: &CommandInteraction) -> Result<String, HandlerError> {
        let state = self.state.lock().await;
        Ok(
            match state
                .ledger
                .find_by_thread(PlatformRef(command.channel_id.get()))
            {
                Some((id, _)) => messages::poll_id(id),
                None => messages::NOT_IN_POLL_THREAD.to_string(),
            },
        )
    }

    async fn thread_ping(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
    ) -> Result<String, HandlerError> {
        let Some(guild_id) = command.guild_id else {
            return Ok(messages::GUILD_ONLY.to_string());
        };
        self.sweep().await?;
        match self.thread_record(command.channel_id).await {
            Some((id, record)) if record.status == PollStatus::Open => {
                self.ping(ctx, guild_id, id, &record).await
            }
            _ => Ok(messages::NOT_IN_OPEN_POLL_THREAD.to_string()),
        }
    }

    async fn thread_export(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
    ) -> Result<String, HandlerError> {
        let Some(guild_id) = command.guild_id else {
            return Ok(messages::GUILD_ONLY.to_string());
        };
        self.sweep().await?;
        match self.thread_record(command.channel_id).await {
            Some((id, record)) => self.export(ctx, guild_id, id, &record).await,
            None => Ok(messages::NOT_IN_POLL_THREAD.to_string()),
        }
    }

    async fn reset(&self, opts: &[ResolvedOption<'_>]) -> Result<String, HandlerError> {
        if options::boolean(opts, "conferma") != Some(true) {
            return Ok(messages::RESET_CANCELLED.to_string());
        }
        let mut state = self.state.lock().await;
        let removed = self.data_dir.reset()?;
        *state = PowlState::open(&self.data_dir)?;
        info!(removed, "poll data reset");
        Ok(messages::RESET_DONE.to_string())
    }

    async fn sweep(&self) -> Result<usize, PollError> {
        self.state.lock().await.ledger.sweep(Utc::now())
    }

    async fn record(&self, id: PollId) -> Result<PollRecord, PollError> {
        self.state.lock().await.ledger.get(id).cloned()
    }

    async fn thread_record(&self, thread: ChannelId) -> Option<(PollId, PollRecord)> {
        let state = self.state.lock().await;
        state
            .ledger
            .find_by_thread(PlatformRef(thread.get()))
            .map(|(id, record)| (id, record.clone()))
    }

    /// Post to a poll thread and pin the message; both steps are best effort.
    async fn post_pinned(&self, ctx: &Context, thread: ChannelId, message: CreateMessage) {
        match thread.send_message(&ctx.http, message).await {
            Ok(posted) => {
                if let Err(e) = posted.pin(&ctx.http).await {
                    warn!(thread = %thread, error = %e, "failed to pin message");
                }
            }
            Err(e) => warn!(thread = %thread, error = %e, "failed to post in poll thread"),
        }
    }
}

/// Ledger entry for a poll whose message and thread already exist.
fn launched_poll(poll: &ValidatedPoll, message: u64, thread: u64) -> NewPoll {
    NewPoll {
        created_at: Utc::now(),
        duration: poll.duration,
        quorum: poll.quorum,
        majority: poll.majority,
        channel: poll.channel,
        message: PlatformRef(message),
        thread: PlatformRef(thread),
    }
}

/// The platform counts poll windows in whole hours, at least one.
fn platform_window(secs: u64) -> Duration {
    let hours = secs.div_ceil(PLATFORM_MIN_WINDOW_SECS).max(1);
    Duration::from_secs(hours * PLATFORM_MIN_WINDOW_SECS)
}

fn threshold_option(name: &str, description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::Integer, name, description)
        .min_int_value(0)
        .max_int_value(100)
}

fn duration_option() -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::Integer, "durata", "Durata in secondi")
        .min_int_value(0)
        .max_int_value(MAX_DURATION_SECS as u64)
}

fn channel_option(description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::Channel, "canale", description)
        .channel_types(vec![ChannelType::Text])
}

fn id_subcommand(name: &str, description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::SubCommand, name, description).add_sub_option(
        CreateCommandOption::new(CommandOptionType::Integer, "id", "ID della votazione")
            .min_int_value(1)
            .required(true),
    )
}

fn commands() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("aiuto").description("Mostra i comandi disponibili"),
        CreateCommand::new("impostazioni")
            .description("Mostra o modifica i parametri di default delle votazioni")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(channel_option("Canale in cui lanciare le votazioni"))
            .add_option(threshold_option("maggioranza", "Soglia di maggioranza (%)"))
            .add_option(threshold_option("quorum", "Quorum (%)"))
            .add_option(duration_option()),
        CreateCommand::new("votazione")
            .description("Lancia una nuova votazione")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "titolo", "Titolo")
                    .max_length(300)
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "opzioni",
                    "Opzioni di voto separate da ;",
                )
                .required(true),
            )
            .add_option(channel_option("Canale (se diverso da quello di default)"))
            .add_option(threshold_option("maggioranza", "Soglia di maggioranza (%)"))
            .add_option(threshold_option("quorum", "Quorum (%)"))
            .add_option(duration_option()),
        CreateCommand::new("gestisci")
            .description("Storico e gestione delle votazioni")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::SubCommand,
                    "elenco",
                    "Storico delle votazioni",
                )
                .add_sub_option(
                    CreateCommandOption::new(CommandOptionType::Integer, "pagina", "Pagina")
                        .min_int_value(1),
                ),
            )
            .add_option(id_subcommand("dettagli", "Dettagli di una votazione"))
            .add_option(id_subcommand("chiudi", "Termina una votazione"))
            .add_option(id_subcommand("elimina", "Elimina una votazione"))
            .add_option(id_subcommand("esporta", "Esporta una votazione su file"))
            .add_option(id_subcommand("pinga", "Menziona chi non ha ancora votato")),
        CreateCommand::new("id")
            .description("Mostra l'ID della votazione di questo thread")
            .default_member_permissions(Permissions::ADMINISTRATOR),
        CreateCommand::new("pinga")
            .description("Menziona chi non ha ancora votato")
            .default_member_permissions(Permissions::ADMINISTRATOR),
        CreateCommand::new("esporta")
            .description("Esporta la votazione di questo thread su file")
            .default_member_permissions(Permissions::ADMINISTRATOR),
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
impl EventHandler for PowlBot {
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
