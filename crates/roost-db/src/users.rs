use crate::models::UserRow;
use crate::{Database, OptionalExt, Result};
use rusqlite::Connection;

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        phone_number: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, first_name, last_name, phone_number)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, email, password_hash, first_name, last_name, phone_number],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, "SELECT id, email, password, first_name, last_name, phone_number, created_at FROM users WHERE email = ?1", email)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, "SELECT id, email, password, first_name, last_name, phone_number, created_at FROM users WHERE id = ?1", id)
        })
    }
}

fn query_user(conn: &Connection, sql: &str, key: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;

    let row = stmt
        .query_row([key], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                first_name: row.get(3)?,
                last_name: row.get(4)?,
                phone_number: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[test]
    fn create_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "amina@example.com", "hash", "Amina", "Bekele", None)
            .unwrap();

        let user = db.get_user_by_email("amina@example.com").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.first_name, "Amina");
        assert!(user.phone_number.is_none());

        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "amina@example.com", "hash", "Amina", "Bekele", None)
            .unwrap();
        let result = db.create_user("u2", "amina@example.com", "hash", "Another", "User", None);
        assert!(result.is_err());
    }
}
