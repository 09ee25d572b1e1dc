mod connection;
mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::{
    ClickSubmission, GroupClicks, NewPhrase, NewPhraseOutcome, PhraseBrief, PhraseClicks,
    PhraseEdit, PhraseRecord, PhraseStatus, PhraseUpdateOutcome,
};
