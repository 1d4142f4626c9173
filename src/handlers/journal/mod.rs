pub mod entry;
pub mod list;
pub mod save;

// Re-export handler functions for use in routing
pub use entry::get as entry_get;
pub use list::list as journal_get;
pub use save::create as journal_post;
pub use save::update as journal_patch;
