use sqlx::{Postgres, QueryBuilder, query_builder::Separated};

use super::Entity;
use crate::models::{NewNote, NewUser, Note, NoteUpdate, User, UserChanges};

impl Entity for Note {
    const NAME: &'static str = "note";
    const TABLE: &'static str = "notes";
    const COLUMNS: &'static str =
        "id, title, content, is_public, is_completed, user_id, created_at, updated_at";

    type Create = NewNote;
    type Update = NoteUpdate;

    // is_public and is_completed fall back to their column defaults (true).
    fn push_insert<'args>(values: NewNote, query: &mut QueryBuilder<'args, Postgres>) {
        query.push("(title, content, user_id) VALUES (");
        let mut binds = query.separated(", ");
        binds.push_bind(values.title);
        binds.push_bind(values.content);
        binds.push_bind(values.user_id);
        binds.push_unseparated(")");
    }

    fn push_assignments<'args>(
        changes: NoteUpdate,
        set: &mut Separated<'_, 'args, Postgres, &'static str>,
    ) {
        if let Some(title) = changes.title {
            set.push("title = ").push_bind_unseparated(title);
        }
        if let Some(content) = changes.content {
            set.push("content = ").push_bind_unseparated(content);
        }
        if let Some(is_public) = changes.is_public {
            set.push("is_public = ").push_bind_unseparated(is_public);
        }
        if let Some(is_completed) = changes.is_completed {
            set.push("is_completed = ").push_bind_unseparated(is_completed);
        }
    }
}

impl Entity for User {
    const NAME: &'static str = "user";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, email, hashed_password, is_active, is_superuser, \
         is_verified, full_name, age, created_at, updated_at";

    type Create = NewUser;
    type Update = UserChanges;

    fn push_insert<'args>(values: NewUser, query: &mut QueryBuilder<'args, Postgres>) {
        query.push("(email, hashed_password, full_name, age) VALUES (");
        let mut binds = query.separated(", ");
        binds.push_bind(values.email);
        binds.push_bind(values.hashed_password);
        binds.push_bind(values.full_name);
        binds.push_bind(values.age);
        binds.push_unseparated(")");
    }

    fn push_assignments<'args>(
        changes: UserChanges,
        set: &mut Separated<'_, 'args, Postgres, &'static str>,
    ) {
        if let Some(email) = changes.email {
            set.push("email = ").push_bind_unseparated(email);
        }
        if let Some(hashed_password) = changes.hashed_password {
            set.push("hashed_password = ").push_bind_unseparated(hashed_password);
        }
        if let Some(full_name) = changes.full_name {
            set.push("full_name = ").push_bind_unseparated(full_name);
        }
        if let Some(age) = changes.age {
            set.push("age = ").push_bind_unseparated(age);
        }
        if let Some(is_active) = changes.is_active {
            set.push("is_active = ").push_bind_unseparated(is_active);
        }
        if let Some(is_superuser) = changes.is_superuser {
            set.push("is_superuser = ").push_bind_unseparated(is_superuser);
        }
        if let Some(is_verified) = changes.is_verified {
            set.push("is_verified = ").push_bind_unseparated(is_verified);
        }
    }
}
