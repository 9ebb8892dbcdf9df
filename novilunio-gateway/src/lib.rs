//! Discord front-ends of the poll ledger (powl) and the article watcher
//! (roblin).

pub mod discord;
pub mod logging;
pub mod messages;
