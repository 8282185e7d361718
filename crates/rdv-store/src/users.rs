//! CRUD operations for [`User`] rows.

use rusqlite::params;

use rdv_shared::{User, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Insert or replace a user row (primary-key upsert).  Applying the same
    /// record twice yields the same row.
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO users (user_id, name, pfp, phone, email)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.as_str(),
                user.name,
                user.pfp,
                user.phone,
                user.email,
            ],
        )?;
        Ok(())
    }

    /// Replace the entire `users` table with the given records, inside one
    /// transaction.  On any error the previous contents are left untouched.
    pub fn replace_all_users(&mut self, users: &[User]) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        tx.execute("DELETE FROM users", [])?;
        for user in users {
            tx.execute(
                "INSERT OR REPLACE INTO users (user_id, name, pfp, phone, email)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id.as_str(),
                    user.name,
                    user.pfp,
                    user.phone,
                    user.email,
                ],
            )?;
        }
        tx.commit()?;

        tracing::debug!(count = users.len(), "users table replaced");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by id.
    pub fn get_user(&self, id: &UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT user_id, name, pfp, phone, email
                 FROM users
                 WHERE user_id = ?1",
                params![id.as_str()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List all users, ordered by name.
    pub fn get_all_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, name, pfp, phone, email
             FROM users
             ORDER BY name ASC",
        )?;

        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        name: row.get(1)?,
        pfp: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, email: &str) -> User {
        User {
            id: UserId::from(id),
            name: "Ada".to_string(),
            pfp: None,
            phone: Some("555-0100".to_string()),
            email: email.to_string(),
        }
    }

    #[test]
    fn upsert_is_idempotent_and_last_write_wins() {
        let db = Database::open_in_memory().unwrap();

        let mut user = sample("u1", "ada@example.com");
        db.upsert_user(&user).unwrap();
        db.upsert_user(&user).unwrap();
        assert_eq!(db.get_all_users().unwrap().len(), 1);

        user.name = "Ada L.".to_string();
        db.upsert_user(&user).unwrap();

        let stored = db.get_user(&user.id).unwrap();
        assert_eq!(stored, user);
    }

    #[test]
    fn get_missing_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.get_user(&UserId::from("nope")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn replace_all_swaps_contents() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_user(&sample("u1", "a@example.com")).unwrap();
        db.upsert_user(&sample("u2", "b@example.com")).unwrap();

        let replacement = vec![sample("u3", "c@example.com")];
        db.replace_all_users(&replacement).unwrap();

        let all = db.get_all_users().unwrap();
        assert_eq!(all, replacement);
    }
}
