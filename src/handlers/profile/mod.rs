pub mod public;

// Re-export handler functions for use in routing
pub use public::get as public_get;
pub use public::put as public_put;
