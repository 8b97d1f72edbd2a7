use crate::models::ReviewRow;
use crate::{Database, OptionalExt, Result, StoreError};
use rusqlite::Connection;

const REVIEW_COLS: &str = "id, listing_id, user_id, rating, comment, created_at";

impl Database {
    /// One review per (listing, user) pair; a second attempt is rejected
    /// before the UNIQUE constraint would fire, with a distinct error.
    pub fn add_review(
        &self,
        id: &str,
        listing_id: &str,
        user_id: &str,
        rating: i64,
        comment: &str,
    ) -> Result<ReviewRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM reviews WHERE listing_id = ?1 AND user_id = ?2",
                    rusqlite::params![listing_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::DuplicateReview);
            }

            tx.execute(
                "INSERT INTO reviews (id, listing_id, user_id, rating, comment)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, listing_id, user_id, rating, comment],
            )?;

            let row = query_review(&tx, id)?.ok_or(StoreError::NotFound)?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn reviews_for_listing(&self, listing_id: &str) -> Result<Vec<ReviewRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REVIEW_COLS} FROM reviews WHERE listing_id = ?1 ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([listing_id], map_review)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_review(conn: &Connection, id: &str) -> Result<Option<ReviewRow>> {
    let sql = format!("SELECT {REVIEW_COLS} FROM reviews WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_review).optional()?;
    Ok(row)
}

fn map_review(row: &rusqlite::Row<'_>) -> std::result::Result<ReviewRow, rusqlite::Error> {
    Ok(ReviewRow {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        user_id: row.get(2)?,
        rating: row.get(3)?,
        comment: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::{Database, StoreError};

    fn seed(db: &Database) {
        db.create_user("host", "host@example.com", "hash", "Hana", "Girma", None)
            .unwrap();
        db.create_user("guest", "guest@example.com", "hash", "Dawit", "Abebe", None)
            .unwrap();
        db.create_listing("l1", "host", "Lakeside Cabin", "Quiet cabin", "Awassa", 10_000)
            .unwrap();
    }

    #[test]
    fn one_review_per_listing_and_user() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.add_review("r1", "l1", "guest", 5, "Great place!").unwrap();
        let err = db.add_review("r2", "l1", "guest", 1, "Changed my mind").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateReview));

        assert_eq!(db.reviews_for_listing("l1").unwrap().len(), 1);
    }

    #[test]
    fn out_of_range_rating_is_rejected_by_schema() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        assert!(db.add_review("r1", "l1", "guest", 6, "Too good").is_err());
        assert!(db.add_review("r2", "l1", "guest", 0, "Too bad").is_err());
    }
}
