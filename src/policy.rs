//! Note authorization policy.
//!
//! Every owner-scoped operation goes through this module instead of branching on the
//! caller's role at each call site.

use crate::{
    auth::AuthUser,
    models::Note,
    repository::{NoteRepository, StoreResult},
};

/// Whether `caller` may read `note` by id. Public notes are not special here:
/// they are exposed through the global listing only.
pub fn can_read(caller: &AuthUser, note: &Note) -> bool {
    caller.is_superuser || note.user_id == caller.id
}

/// authorize
///
/// Gate for update and delete. Superusers pass without a lookup; everyone else must
/// own the note (`assert_owner`), which also yields `NotFound` for a missing id.
pub async fn authorize(
    notes: &dyn NoteRepository,
    caller: &AuthUser,
    note_id: i64,
) -> StoreResult<()> {
    if caller.is_superuser {
        return Ok(());
    }
    notes.assert_owner(note_id, caller.id).await.map(|_| ())
}
