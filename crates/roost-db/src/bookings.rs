use crate::models::BookingRow;
use crate::{Database, OptionalExt, Result, StoreError};
use chrono::NaiveDate;
use rusqlite::Connection;
use roost_types::models::BookingStatus;

const BOOKING_COLS: &str =
    "id, listing_id, guest_id, start_date, end_date, total_price_cents, status, created_at";

const PREFIXED_BOOKING_COLS: &str =
    "b.id, b.listing_id, b.guest_id, b.start_date, b.end_date, b.total_price_cents, b.status, b.created_at";

impl Database {
    /// Availability check against half-open [start, end) intervals.
    /// Inverted or empty ranges are rejected before the overlap query runs.
    pub fn listing_is_available(
        &self,
        listing_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<bool> {
        if end_date <= start_date {
            return Err(StoreError::InvalidDateRange);
        }
        let start = start_date.to_string();
        let end = end_date.to_string();
        self.with_conn(|conn| {
            Ok(overlapping_active_bookings(conn, listing_id, &start, &end)? == 0)
        })
    }

    /// Create a booking with derived total price and status `pending`.
    ///
    /// The availability check and the insert run in one transaction on the
    /// writer connection, so two concurrent requests for overlapping dates
    /// cannot both pass the check and both commit.
    pub fn create_booking(
        &self,
        id: &str,
        listing_id: &str,
        guest_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BookingRow> {
        if end_date <= start_date {
            return Err(StoreError::InvalidDateRange);
        }
        let nights = (end_date - start_date).num_days();
        let start = start_date.to_string();
        let end = end_date.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let price_per_night_cents: i64 = tx
                .query_row(
                    "SELECT price_per_night_cents FROM listings WHERE id = ?1",
                    [listing_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(StoreError::NotFound)?;

            if overlapping_active_bookings(&tx, listing_id, &start, &end)? > 0 {
                return Err(StoreError::Unavailable);
            }

            let total_price_cents = price_per_night_cents * nights;
            tx.execute(
                "INSERT INTO bookings (id, listing_id, guest_id, start_date, end_date, total_price_cents)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, listing_id, guest_id, start, end, total_price_cents],
            )?;

            let row = query_booking(&tx, id)?.ok_or(StoreError::NotFound)?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_booking(&self, id: &str) -> Result<Option<BookingRow>> {
        self.with_conn(|conn| query_booking(conn, id))
    }

    /// Transition a booking. Role checks live in the API layer; any source
    /// state is accepted here.
    pub fn set_booking_status(&self, id: &str, status: BookingStatus) -> Result<BookingRow> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE bookings SET status = ?2 WHERE id = ?1",
                rusqlite::params![id, status.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            query_booking(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    pub fn bookings_for_guest(&self, guest_id: &str) -> Result<Vec<BookingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {BOOKING_COLS} FROM bookings WHERE guest_id = ?1 ORDER BY created_at DESC"
            );
            query_bookings(conn, &sql, guest_id)
        })
    }

    /// Bookings on any listing the user hosts.
    pub fn bookings_for_host(&self, host_id: &str) -> Result<Vec<BookingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PREFIXED_BOOKING_COLS} FROM bookings b
                 JOIN listings l ON b.listing_id = l.id
                 WHERE l.host_id = ?1
                 ORDER BY b.created_at DESC"
            );
            query_bookings(conn, &sql, host_id)
        })
    }

    /// Bookings where the user is either the guest or the host.
    pub fn bookings_involving(&self, user_id: &str) -> Result<Vec<BookingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT DISTINCT {PREFIXED_BOOKING_COLS} FROM bookings b
                 JOIN listings l ON b.listing_id = l.id
                 WHERE b.guest_id = ?1 OR l.host_id = ?1
                 ORDER BY b.created_at DESC"
            );
            query_bookings(conn, &sql, user_id)
        })
    }

    pub fn bookings_for_listing(&self, listing_id: &str) -> Result<Vec<BookingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {BOOKING_COLS} FROM bookings WHERE listing_id = ?1 ORDER BY created_at DESC"
            );
            query_bookings(conn, &sql, listing_id)
        })
    }
}

fn overlapping_active_bookings(
    conn: &Connection,
    listing_id: &str,
    start: &str,
    end: &str,
) -> Result<i64> {
    // Two half-open intervals [s1, e1) and [s2, e2) overlap iff s1 < e2 AND s2 < e1.
    let count = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE listing_id = ?1
           AND status NOT IN ('cancelled', 'rejected')
           AND start_date < ?3
           AND end_date > ?2",
        rusqlite::params![listing_id, start, end],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn query_booking(conn: &Connection, id: &str) -> Result<Option<BookingRow>> {
    let sql = format!("SELECT {BOOKING_COLS} FROM bookings WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_booking).optional()?;
    Ok(row)
}

fn query_bookings(conn: &Connection, sql: &str, key: &str) -> Result<Vec<BookingRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([key], map_booking)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_booking(row: &rusqlite::Row<'_>) -> std::result::Result<BookingRow, rusqlite::Error> {
    Ok(BookingRow {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        guest_id: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        total_price_cents: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed(db: &Database) {
        db.create_user("host", "host@example.com", "hash", "Hana", "Girma", None)
            .unwrap();
        db.create_user("guest", "guest@example.com", "hash", "Dawit", "Abebe", None)
            .unwrap();
        // 100.00 per night
        db.create_listing("l1", "host", "Lakeside Cabin", "Quiet cabin", "Awassa", 10_000)
            .unwrap();
    }

    #[test]
    fn total_price_is_nightly_times_nights() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        // 2025-12-01 -> 2025-12-05 is 4 nights at 100.00
        let booking = db
            .create_booking("b1", "l1", "guest", date(2025, 12, 1), date(2025, 12, 5))
            .unwrap();
        assert_eq!(booking.total_price_cents, 40_000);
        assert_eq!(booking.status, "pending");
    }

    #[test]
    fn inverted_or_empty_range_never_persists() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let err = db
            .create_booking("b1", "l1", "guest", date(2025, 12, 5), date(2025, 12, 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDateRange));

        let err = db
            .create_booking("b1", "l1", "guest", date(2025, 12, 1), date(2025, 12, 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDateRange));

        assert!(db.get_booking("b1").unwrap().is_none());
    }

    #[test]
    fn unknown_listing_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let err = db
            .create_booking("b1", "nope", "guest", date(2025, 12, 1), date(2025, 12, 5))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn overlapping_booking_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.create_booking("b1", "l1", "guest", date(2025, 12, 1), date(2025, 12, 5))
            .unwrap();

        let err = db
            .create_booking("b2", "l1", "guest", date(2025, 12, 3), date(2025, 12, 6))
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable));
        assert!(db.get_booking("b2").unwrap().is_none());
    }

    #[test]
    fn half_open_intervals_allow_back_to_back_stays() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.create_booking("b1", "l1", "guest", date(2025, 12, 1), date(2025, 12, 5))
            .unwrap();
        // Checkout day equals next check-in day: no overlap.
        db.create_booking("b2", "l1", "guest", date(2025, 12, 5), date(2025, 12, 8))
            .unwrap();

        assert!(db
            .listing_is_available("l1", date(2025, 12, 8), date(2025, 12, 10))
            .unwrap());
        assert!(!db
            .listing_is_available("l1", date(2025, 12, 4), date(2025, 12, 6))
            .unwrap());
    }

    #[test]
    fn cancelled_booking_frees_the_range() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.create_booking("b1", "l1", "guest", date(2025, 12, 1), date(2025, 12, 5))
            .unwrap();
        db.set_booking_status("b1", BookingStatus::Cancelled).unwrap();

        let booking = db
            .create_booking("b2", "l1", "guest", date(2025, 12, 3), date(2025, 12, 6))
            .unwrap();
        assert_eq!(booking.status, "pending");
    }

    #[test]
    fn availability_rejects_inverted_range() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let err = db
            .listing_is_available("l1", date(2025, 12, 5), date(2025, 12, 5))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDateRange));
    }

    #[test]
    fn scoped_booking_queries() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        db.create_user("other", "other@example.com", "hash", "Sara", "Tesfaye", None)
            .unwrap();
        db.create_listing("l2", "other", "City Loft", "Downtown loft", "Addis Ababa", 25_000)
            .unwrap();

        db.create_booking("b1", "l1", "guest", date(2025, 12, 1), date(2025, 12, 5))
            .unwrap();
        db.create_booking("b2", "l2", "guest", date(2025, 12, 1), date(2025, 12, 5))
            .unwrap();

        assert_eq!(db.bookings_for_guest("guest").unwrap().len(), 2);
        assert_eq!(db.bookings_for_host("host").unwrap().len(), 1);
        assert_eq!(db.bookings_involving("host").unwrap().len(), 1);
        assert_eq!(db.bookings_involving("guest").unwrap().len(), 2);
        assert_eq!(db.bookings_for_listing("l2").unwrap().len(), 1);
    }
}
