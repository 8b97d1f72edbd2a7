use crate::models::MessageRow;
use crate::{Database, OptionalExt, Result, StoreError};
use rusqlite::Connection;

const MESSAGE_COLS: &str = "id, sender_id, recipient_id, body, sent_at";

impl Database {
    pub fn send_message(
        &self,
        id: &str,
        sender_id: &str,
        recipient_id: &str,
        body: &str,
    ) -> Result<MessageRow> {
        self.with_conn(|conn| {
            let recipient: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE id = ?1",
                    [recipient_id],
                    |row| row.get(0),
                )
                .optional()?;
            if recipient.is_none() {
                return Err(StoreError::NotFound);
            }

            conn.execute(
                "INSERT INTO messages (id, sender_id, recipient_id, body)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, sender_id, recipient_id, body],
            )?;

            query_message(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    /// Messages where the user is either sender or recipient, newest first.
    pub fn messages_involving(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLS} FROM messages
                 WHERE sender_id = ?1 OR recipient_id = ?1
                 ORDER BY sent_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let sql = format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_message).optional()?;
    Ok(row)
}

fn map_message(row: &rusqlite::Row<'_>) -> std::result::Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        body: row.get(3)?,
        sent_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::{Database, StoreError};

    #[test]
    fn send_and_list_messages() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("a", "a@example.com", "hash", "Abel", "Kassa", None)
            .unwrap();
        db.create_user("b", "b@example.com", "hash", "Bethel", "Alemu", None)
            .unwrap();

        db.send_message("m1", "a", "b", "Is the cabin free next week?")
            .unwrap();
        db.send_message("m2", "b", "a", "Yes, from Tuesday.").unwrap();

        assert_eq!(db.messages_involving("a").unwrap().len(), 2);
        assert_eq!(db.messages_involving("b").unwrap().len(), 2);
    }

    #[test]
    fn unknown_recipient_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("a", "a@example.com", "hash", "Abel", "Kassa", None)
            .unwrap();

        let err = db.send_message("m1", "a", "ghost", "Hello?").unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
