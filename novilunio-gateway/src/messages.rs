//! User-facing texts of both bots.
//!
//! Everything here is pure string rendering so handlers stay thin.

use chrono::{DateTime, Local, Utc};
use novilunio_core::display::{self, FIELD_LIMIT, MESSAGE_LIMIT, UNSET};
use novilunio_core::poll::LEDGER_PAGE_SIZE;
use novilunio_core::{PollId, PollRecord, PollReport, PollSettings, PollStatus, WatchSettings};

pub const GENERIC_ERROR: &str =
    "Uh oh! Qualcosa è andato storto! Controlla i file di log per maggiori informazioni";

pub const NOT_IN_POLL_THREAD: &str =
    "Puoi usare questo comando solo nel thread dedicato ad una votazione!";

pub const NOT_IN_OPEN_POLL_THREAD: &str =
    "Puoi usare questo comando solo nel thread dedicato ad una votazione aperta!";

pub const GUILD_ONLY: &str = "Questo comando può essere usato solo in un server.";

pub const RESET_DONE: &str = "I dati sono stati eliminati.";

pub const RESET_CANCELLED: &str =
    "Operazione annullata. Usa `/reset conferma:True` per eliminare davvero tutti i dati.";

pub const THREAD_INTRO: &str =
    "@everyone, questo è il thread ufficiale per discutere la votazione.";

pub const POLL_CLOSED_NOTICE: &str = "La votazione è stata terminata.";

pub const POLL_EXPORTED_NOTICE: &str = "La votazione è stata esportata su file!";

pub const NOBODY_TO_PING: &str = "Hanno già votato tutti!";

pub const LISTEN_ON: &str = "Ho cominciato ad ascoltare il sito";

pub const LISTEN_OFF: &str = "Non sto più ascoltando il sito";

pub const ROLE_NOT_SET: &str =
    "Il ruolo per le notifiche non è ancora stato impostato. Chiedi a un amministratore di usare `/impostazioni`.";

const ROLE_NAME: &str = "Abbonatə a Novilunio";

/// Longest thread name the platform accepts.
const THREAD_NAME_LIMIT: usize = 100;

pub const POWL_HELP: &str = concat!(
    "Usami per lanciare e gestire le votazioni in un server Discord. Posso tenere traccia",
    " di tutte le votazioni lanciate nel passato, gestirle, esportare i dati e impostare soglie",
    " di maggioranza e quorum per agevolare il processo di voto.\n",
    "\n",
    "Questa è la lista dei comandi che puoi invocare ovunque:\n",
    "- `/aiuto`: mostra questo messaggio;\n",
    "- `/impostazioni`: mostra o modifica i parametri di default delle votazioni, come il",
    " *canale* in cui lanciarle, le soglie di *maggioranza* e *quorum* e la *durata*",
    " (sono comunque modificabili al momento della creazione);\n",
    "- `/votazione`: lancia una votazione con *titolo* e *opzioni di voto* separate da `;`",
    " (vengono aggiunte di default anche le opzioni \"Indifferente\" e",
    " \"Contrario a tutte le precedenti\");\n",
    "- `/gestisci`: visualizza lo storico delle votazioni e permette di vedere i dettagli,",
    " chiudere, eliminare, esportare su file o menzionare chi non ha ancora votato.",
    " **NOTA BENE: una volta eliminata, non è più possibile esportare i dati di una",
    " votazione**;\n",
    "- `/reset`: elimina le impostazioni correnti e i dati di tutte le votazioni, riportando",
    " il bot alla configurazione iniziale.\n",
    "\n",
    "Qui invece ci sono i comandi che possono essere invocati solo nel thread dedicato a una",
    " votazione:\n",
    "- `/id`: restituisce l'ID della votazione, utile per il comando `/gestisci`;\n",
    "- `/pinga`: menziona chi non ha ancora votato;\n",
    "- `/esporta`: esporta un file .csv contenente i dati della votazione.",
);

pub const ROBLIN_HELP: &str = concat!(
    "Gneh! Questa è la lista dei comandi che puoi invocare ovunque:\n",
    "- `/aiuto`: mostra questo messaggio;\n",
    "- `/impostazioni`: mostra o modifica il canale degli annunci, i siti da ascoltare,",
    " il ruolo da menzionare e l'intervallo di controllo;\n",
    "- `/reset`: elimina le impostazioni correnti, riportando il bot alla configurazione",
    " iniziale;\n",
    "- `/arruolami`: ti conferisce il ruolo per essere sempre aggiornato sui nuovi articoli;\n",
    "- `/ascolta`: attiva o disattiva l'ascolto e l'annuncio di nuovi articoli.",
);

pub fn channel_mention(id: Option<u64>) -> String {
    id.map_or_else(|| UNSET.to_string(), |id| format!("<#{id}>"))
}

pub fn role_mention(id: Option<u64>) -> String {
    id.map_or_else(|| UNSET.to_string(), |id| format!("<@&{id}>"))
}

pub fn user_mentions(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| format!("<@{id}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn poll_settings(settings: &PollSettings) -> String {
    format!(
        "**Impostazioni delle votazioni**\n\
         Canale: {}\n\
         Soglia di maggioranza: {}\n\
         Quorum: {}\n\
         Durata: {}",
        channel_mention(settings.channel),
        display::percent(settings.majority),
        display::percent(settings.quorum),
        display::duration(settings.duration),
    )
}

pub fn watch_settings(settings: &WatchSettings) -> String {
    let urls = if settings.urls.is_empty() {
        UNSET.to_string()
    } else {
        display::bullet_list(&settings.urls, FIELD_LIMIT)
    };
    format!(
        "**Impostazioni**\n\
         Canale: {}\n\
         Ruolo: {}\n\
         Intervallo di controllo: {}\n\
         Siti web:\n{}",
        channel_mention(settings.channel),
        role_mention(settings.role),
        display::duration(Some(settings.interval().as_secs() as i64)),
        urls,
    )
}

pub fn poll_launched(author: u64) -> String {
    format!("@everyone, <@{author}> ha appena lanciato una votazione, venghino!")
}

pub fn poll_started(id: PollId) -> String {
    format!("La votazione è ora avviata! ID: {id}")
}

pub fn thread_name(title: &str) -> String {
    let suffix = " - DISCUSSIONE";
    let room = THREAD_NAME_LIMIT - suffix.chars().count();
    format!("{}{suffix}", display::truncate(title, room))
}

pub fn poll_id(id: PollId) -> String {
    format!("L'ID della votazione corrente è: {id}")
}

/// Mentions of every non-voter, split into messages that each fit the chat
/// limit without breaking a mention. Empty when everybody voted.
pub fn ping(non_voters: &[u64]) -> Vec<String> {
    let suffix = " è stato richiesto il vostro voto!";
    let mentions = non_voters
        .iter()
        .map(|id| format!("<@{id}>"))
        .collect::<Vec<_>>();
    display::join_within(&mentions, ", ", MESSAGE_LIMIT - suffix.chars().count())
        .into_iter()
        .map(|chunk| format!("{chunk}{suffix}"))
        .collect()
}

/// History listing for `/gestisci elenco`; `page` is zero-based.
pub fn history_page(entries: &[(PollId, &PollRecord)], page: usize, pages: usize) -> String {
    if entries.is_empty() {
        return "**Storico votazioni**\nNessuna votazione registrata.".to_string();
    }
    let lines = entries
        .iter()
        .map(|(id, record)| format!("Votazione n.{id}: {}", record.status.label()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "**Storico votazioni** (pagina {}/{pages}, {LEDGER_PAGE_SIZE} per pagina)\n{lines}",
        page + 1
    )
}

pub fn poll_deleted(id: PollId) -> String {
    format!("**Votazione n.{id}**\n**Votazione eliminata**")
}

pub fn history_missing(id: PollId) -> String {
    format!("Non esiste nessuna votazione con ID {id}.")
}

pub fn illegal_transition(id: PollId, status: PollStatus) -> String {
    format!(
        "La votazione n.{id} è {} e non può essere modificata così.",
        status.label()
    )
}

pub fn closed(id: PollId) -> String {
    format!("La votazione n.{id} è stata chiusa.")
}

pub fn deleted(id: PollId) -> String {
    format!("La votazione n.{id} è stata eliminata.")
}

pub fn invalid_poll(reason: &str) -> String {
    format!("Impossibile lanciare la votazione: {reason}.")
}

pub fn invalid_setting(reason: &str) -> String {
    format!("Impostazione non valida: {reason}.")
}

/// Detail view of one poll.
pub fn poll_details(
    report: &PollReport,
    record: &PollRecord,
    non_voters: &[u64],
    jump_url: &str,
) -> String {
    let options = report
        .ranked()
        .into_iter()
        .map(|option| {
            let mut line = format!("[{} voti] {}", option.votes, option.text);
            if option.majority {
                line.push_str(" **(maggioranza raggiunta)**");
            }
            line
        })
        .collect::<Vec<_>>();

    let mut quorum = format!("{}%", report.quorum_threshold);
    if report.quorum_reached {
        quorum.push_str(" **(quorum raggiunto)**");
    }

    let non_voters = if non_voters.is_empty() {
        "*nessuno*".to_string()
    } else {
        display::truncate(&user_mentions(non_voters), FIELD_LIMIT)
    };

    format!(
        "**Votazione n.{id}** {status}\n\
         [Vai alla votazione!]({jump_url})\n\
         Creata in data: {created}\n\
         Scade il: {expires}\n\
         **Titolo**\n{title}\n\
         **Opzioni di voto**\n{options}\n\
         **Chi non ha votato?**\n{non_voters}\n\
         **Canale**: <#{channel}> | **Soglia di maggioranza**: {majority}% | **Quorum**: {quorum}\n\
         Hanno votato {total} su {eligible}",
        id = report.id,
        status = report.status.label(),
        created = local_time(record.created_at),
        expires = local_time(record.expires_at()),
        title = display::truncate(&report.question, FIELD_LIMIT),
        options = display::bullet_list(&options, FIELD_LIMIT),
        channel = record.channel,
        majority = report.majority_threshold,
        total = report.total_votes,
        eligible = report.eligible,
    )
}

pub fn announcement(role: Option<u64>, link: &str) -> String {
    match role {
        Some(role) => format!("<@&{role}> wake up! New article just dropped: {link}"),
        None => format!("Wake up! New article just dropped: {link}"),
    }
}

pub fn role_granted(urls: &[String]) -> String {
    let sites = urls
        .iter()
        .map(|url| format!("- {url}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Ti è stato conferito il ruolo \"{ROLE_NAME}\"! Da ora in poi riceverai notifiche \
         per i nuovi articoli pubblicati sui siti web:\n{sites}\n\
         Usa di nuovo questo comando se non desideri più essere notificato."
    )
}

pub fn role_removed() -> String {
    format!(
        "Il ruolo \"{ROLE_NAME}\" è stato rimosso dal tuo profilo. Non riceverai più notifiche \
         per i nuovi articoli."
    )
}

pub fn url_added(url: &str) -> String {
    format!("Sito aggiunto: {url}")
}

pub fn url_already_present(url: &str) -> String {
    format!("Il sito {url} è già in ascolto.")
}

pub fn url_removed(url: &str) -> String {
    format!("Sito rimosso: {url}")
}

pub fn url_missing(url: &str) -> String {
    format!("Il sito {url} non è nella lista.")
}

/// Options shown in the launch confirmation, defaults included.
pub fn option_preview(options: &[String]) -> String {
    display::bullet_list(options, FIELD_LIMIT)
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use novilunio_core::poll::{DEFAULT_OPTIONS, OptionTally, PollTally};
    use novilunio_core::{NewPoll, PlatformRef, PollLedger};

    #[test]
    fn test_poll_settings_partial() {
        let settings = PollSettings {
            channel: None,
            majority: Some(50),
            quorum: Some(250),
            duration: Some(3_600),
        };
        let text = poll_settings(&settings);
        assert!(text.contains("Canale: *non impostato*"));
        assert!(text.contains("Soglia di maggioranza: 50%"));
        assert!(text.contains("Quorum: *valore non valido*"));
        assert!(text.contains("Durata: 0 giorni, 1 ore, 0 minuti, 0 secondi"));
    }

    #[test]
    fn test_watch_settings_defaults() {
        let text = watch_settings(&WatchSettings::default());
        assert!(text.contains("Ruolo: *non impostato*"));
        assert!(text.contains("Intervallo di controllo: 0 giorni, 0 ore, 5 minuti, 0 secondi"));
    }

    #[test]
    fn test_ping() {
        assert!(ping(&[]).is_empty());
        assert_eq!(
            ping(&[1, 2]),
            vec!["<@1>, <@2> è stato richiesto il vostro voto!".to_string()]
        );
    }

    #[test]
    fn test_ping_splits_on_whole_mentions() {
        let ids = (0..200u64)
            .map(|i| 345_678_901_234_567_000 + i)
            .collect::<Vec<_>>();
        let chunks = ping(&ids);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MESSAGE_LIMIT));
        assert!(
            chunks
                .iter()
                .all(|c| c.ends_with(" è stato richiesto il vostro voto!"))
        );

        let mentioned = chunks
            .iter()
            .flat_map(|c| {
                c.trim_end_matches(" è stato richiesto il vostro voto!")
                    .split(", ")
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let expected = ids.iter().map(|id| format!("<@{id}>")).collect::<Vec<_>>();
        assert_eq!(mentioned, expected);
    }

    #[test]
    fn test_thread_name_fits() {
        let name = thread_name(&"t".repeat(300));
        assert!(name.chars().count() <= THREAD_NAME_LIMIT);
        assert!(name.ends_with(" - DISCUSSIONE"));
        assert_eq!(thread_name("Logo"), "Logo - DISCUSSIONE");
    }

    #[test]
    fn test_history_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = PollLedger::open(dir.path().join("poll_history.json")).unwrap();
        for thread in 1..=3 {
            ledger
                .register(NewPoll {
                    created_at: Utc::now(),
                    duration: 600,
                    quorum: 0,
                    majority: 50,
                    channel: PlatformRef(1),
                    message: PlatformRef(2),
                    thread: PlatformRef(thread),
                })
                .unwrap();
        }
        ledger.close(2).unwrap();

        let text = history_page(&ledger.page(0, LEDGER_PAGE_SIZE), 0, 1);
        assert!(text.contains("pagina 1/1"));
        assert!(text.contains("Votazione n.1: *APERTA*"));
        assert!(text.contains("Votazione n.2: *CHIUSA*"));

        assert!(history_page(&[], 0, 1).contains("Nessuna votazione"));
    }

    #[test]
    fn test_poll_details_ranks_and_flags() {
        let record = NewPoll {
            created_at: Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap(),
            duration: 3_600,
            quorum: 50,
            majority: 50,
            channel: PlatformRef(77),
            message: PlatformRef(2),
            thread: PlatformRef(3),
        };
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = PollLedger::open(dir.path().join("poll_history.json")).unwrap();
        let id = ledger.register(record).unwrap();
        let record = ledger.get(id).unwrap();

        let tally = PollTally::from_options(
            "Cena sociale",
            vec![
                OptionTally { text: "Venerdì".into(), votes: 2 },
                OptionTally { text: "Sabato".into(), votes: 7 },
            ],
        );
        let report = PollReport::evaluate(id, record, &tally, 12).unwrap();
        let text = poll_details(&report, record, &[5, 6], "https://discord.com/channels/1/77/2");

        let sabato = text.find("[7 voti] Sabato **(maggioranza raggiunta)**").unwrap();
        let venerdi = text.find("[2 voti] Venerdì").unwrap();
        assert!(sabato < venerdi);
        assert!(text.contains("50% **(quorum raggiunto)**"));
        assert!(text.contains("<@5>, <@6>"));
        assert!(text.contains("<#77>"));
    }

    #[test]
    fn test_announcement() {
        assert_eq!(
            announcement(Some(9), "https://x.example/a-b-c"),
            "<@&9> wake up! New article just dropped: https://x.example/a-b-c"
        );
    }

    #[test]
    fn test_option_preview() {
        let options: Vec<String> = ["A", "B", DEFAULT_OPTIONS[0], DEFAULT_OPTIONS[1]]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            option_preview(&options),
            "- A\n- B\n- Indifferente\n- Contrario a tutte le precedenti"
        );
    }
}
