// Interview Session Engine
// Timer, answer custody and the status state machine for a candidate's
// timed quiz attempt. Storage is reached only through `store::SessionStore`.

pub mod answers;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod machine;
pub mod models;
pub mod store;
pub mod timer;
