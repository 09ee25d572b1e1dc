pub mod click;
pub mod phrase;

pub use click::{ClickSubmission, GroupClicks};
pub use phrase::{
    NewPhrase, NewPhraseOutcome, PhraseBrief, PhraseClicks, PhraseEdit, PhraseRecord,
    PhraseStatus, PhraseUpdateOutcome,
};
