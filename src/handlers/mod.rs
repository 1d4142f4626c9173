// handlers/mod.rs - Route handlers, one module per resource
//
// Every handler takes the `AuthSession` extractor, so a request without a
// valid session is rejected with 403 before any input is read.
pub mod journal; // /journal, /journal/:id
pub mod profile; // /userProfile/public
pub mod system;  // /, /health
