//! HTTP handlers. Each one resolves the caller through the `AuthUser` extractor
//! (where required), talks to the repositories in `AppState`, and returns either a
//! JSON body or an `ApiError`.

mod notes;
mod users;

pub use notes::*;
pub use users::*;
