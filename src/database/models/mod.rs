pub mod journal;
pub mod profile;

pub use journal::{EntryId, JournalEntry, JournalPatch, NewJournalEntry};
pub use profile::{strip_url_scheme, ProfileUpdate};
