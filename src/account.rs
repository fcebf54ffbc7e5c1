//! Account records for people signed in through the external identity
//! provider. Accounts are not linked to bookmarks.

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::SqliteConnection;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{Account, AccountToInsert};
use crate::schema::account;

fn require(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidAccount(field));
    }
    Ok(())
}

/// Stores a new account. `clerk_id`, `email` and `photo` are required;
/// identity, email and username must all be unused.
pub fn register(conn: &SqliteConnection, new: &AccountToInsert) -> Result<Account> {
    require(new.clerk_id, "clerk_id")?;
    require(new.email, "email")?;
    require(new.photo, "photo")?;

    conn.immediate_transaction::<_, Error, _>(|| {
        let mut taken: i64 = account::table
            .filter(
                account::clerk_id
                    .eq(new.clerk_id)
                    .or(account::email.eq(new.email)),
            )
            .count()
            .get_result(conn)?;
        if let Some(username) = new.username {
            taken += account::table
                .filter(account::username.eq(username))
                .count()
                .get_result::<i64>(conn)?;
        }
        if taken > 0 {
            return Err(Error::DuplicateAccount);
        }

        diesel::insert_into(account::table)
            .values(new)
            .execute(conn)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    Error::DuplicateAccount
                }
                err => Error::Database(err),
            })?;

        let inserted = account::table
            .filter(account::clerk_id.eq(new.clerk_id))
            .first::<Account>(conn)?;
        info!(id = inserted.id, clerk_id = %inserted.clerk_id, "registered account");
        Ok(inserted)
    })
}

pub fn find_by_clerk_id(conn: &SqliteConnection, clerk_id: &str) -> Result<Option<Account>> {
    Ok(account::table
        .filter(account::clerk_id.eq(clerk_id))
        .first::<Account>(conn)
        .optional()?)
}
