use crate::models::PaymentRow;
use crate::{Database, OptionalExt, Result, StoreError};
use rusqlite::Connection;
use roost_types::models::PaymentStatus;
use uuid::Uuid;

/// Result of applying a gateway-reported status to a payment row.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The compare-and-set changed the row: side effects may fire once.
    Transitioned(PaymentRow),
    /// The row was already in the reported state (webhook redelivery).
    Unchanged(PaymentRow),
}

const PAYMENT_COLS: &str = "p.id, p.booking_id, p.user_id, p.amount_cents, p.status, \
     p.transaction_id, p.tx_ref, m.name, p.currency, p.created_at, p.updated_at";

impl Database {
    /// Insert a payment for a booking. The payment method row is looked up by
    /// name and created on first use (restrict-delete lookup table).
    pub fn create_payment(
        &self,
        id: &str,
        booking_id: &str,
        user_id: &str,
        amount_cents: i64,
        currency: &str,
        method_name: &str,
    ) -> Result<PaymentRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let method_id: String = match tx
                .query_row(
                    "SELECT id FROM payment_methods WHERE name = ?1",
                    [method_name],
                    |row| row.get(0),
                )
                .optional()?
            {
                Some(existing) => existing,
                None => {
                    let new_id = Uuid::new_v4().to_string();
                    tx.execute(
                        "INSERT INTO payment_methods (id, name) VALUES (?1, ?2)",
                        rusqlite::params![new_id, method_name],
                    )?;
                    new_id
                }
            };

            tx.execute(
                "INSERT INTO payments (id, booking_id, user_id, amount_cents, currency, method_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, booking_id, user_id, amount_cents, currency, method_id],
            )?;

            let row = query_payment_by_id(&tx, id)?.ok_or(StoreError::NotFound)?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Attach the locally-generated transaction reference after the gateway
    /// accepted the initialization.
    pub fn set_payment_tx_ref(&self, id: &str, tx_ref: &str) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE payments SET tx_ref = ?2, updated_at = datetime('now') WHERE id = ?1",
                rusqlite::params![id, tx_ref],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    pub fn get_payment(&self, id: &str) -> Result<Option<PaymentRow>> {
        self.with_conn(|conn| query_payment_by_id(conn, id))
    }

    pub fn get_payment_by_tx_ref(&self, tx_ref: &str) -> Result<Option<PaymentRow>> {
        self.with_conn(|conn| query_payment_by_tx_ref(conn, tx_ref))
    }

    pub fn payments_for_user(&self, user_id: &str) -> Result<Vec<PaymentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PAYMENT_COLS} FROM payments p
                 JOIN payment_methods m ON p.method_id = m.id
                 WHERE p.user_id = ?1
                 ORDER BY p.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_payment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Compare-and-set a gateway-reported status onto the payment row keyed by
    /// its transaction reference.
    ///
    /// The guard (`status <> new`) makes webhook redelivery a no-op: the
    /// caller dispatches notifications only on `Transitioned`. The provider's
    /// own transaction id is stored once known and kept on redelivery.
    pub fn apply_gateway_status(
        &self,
        tx_ref: &str,
        status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> Result<ReconcileOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let changed = tx.execute(
                "UPDATE payments
                 SET status = ?2,
                     transaction_id = COALESCE(?3, transaction_id),
                     updated_at = datetime('now')
                 WHERE tx_ref = ?1 AND status <> ?2",
                rusqlite::params![tx_ref, status.as_str(), transaction_id],
            )?;

            let row = query_payment_by_tx_ref(&tx, tx_ref)?.ok_or(StoreError::NotFound)?;
            tx.commit()?;

            if changed == 1 {
                Ok(ReconcileOutcome::Transitioned(row))
            } else {
                Ok(ReconcileOutcome::Unchanged(row))
            }
        })
    }
}

fn query_payment_by_id(conn: &Connection, id: &str) -> Result<Option<PaymentRow>> {
    let sql = format!(
        "SELECT {PAYMENT_COLS} FROM payments p
         JOIN payment_methods m ON p.method_id = m.id
         WHERE p.id = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_payment).optional()?;
    Ok(row)
}

fn query_payment_by_tx_ref(conn: &Connection, tx_ref: &str) -> Result<Option<PaymentRow>> {
    let sql = format!(
        "SELECT {PAYMENT_COLS} FROM payments p
         JOIN payment_methods m ON p.method_id = m.id
         WHERE p.tx_ref = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([tx_ref], map_payment).optional()?;
    Ok(row)
}

fn map_payment(row: &rusqlite::Row<'_>) -> std::result::Result<PaymentRow, rusqlite::Error> {
    Ok(PaymentRow {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        user_id: row.get(2)?,
        amount_cents: row.get(3)?,
        status: row.get(4)?,
        transaction_id: row.get(5)?,
        tx_ref: row.get(6)?,
        method_name: row.get(7)?,
        currency: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_payment(db: &Database) -> PaymentRow {
        db.create_user("host", "host@example.com", "hash", "Hana", "Girma", None)
            .unwrap();
        db.create_user("guest", "guest@example.com", "hash", "Dawit", "Abebe", None)
            .unwrap();
        db.create_listing("l1", "host", "Lakeside Cabin", "Quiet cabin", "Awassa", 10_000)
            .unwrap();
        db.create_booking("b1", "l1", "guest", date(2025, 12, 1), date(2025, 12, 5))
            .unwrap();

        let payment = db
            .create_payment("p1", "b1", "guest", 40_000, "NGN", "Chapa")
            .unwrap();
        db.set_payment_tx_ref("p1", "X").unwrap();
        payment
    }

    #[test]
    fn create_payment_snapshots_booking_total() {
        let db = Database::open_in_memory().unwrap();
        let payment = seed_payment(&db);
        assert_eq!(payment.amount_cents, 40_000);
        assert_eq!(payment.status, "pending");
        assert_eq!(payment.method_name, "Chapa");
        assert!(payment.transaction_id.is_none());
    }

    #[test]
    fn method_rows_are_reused_by_name() {
        let db = Database::open_in_memory().unwrap();
        seed_payment(&db);

        // Second payment with the same method must not duplicate the lookup row.
        db.create_payment("p2", "b1", "guest", 40_000, "NGN", "Chapa")
            .unwrap();
        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM payment_methods WHERE name = 'Chapa'",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn webhook_success_transitions_and_stores_reference() {
        let db = Database::open_in_memory().unwrap();
        seed_payment(&db);

        let outcome = db
            .apply_gateway_status("X", PaymentStatus::Completed, Some("R1"))
            .unwrap();
        let row = match outcome {
            ReconcileOutcome::Transitioned(row) => row,
            ReconcileOutcome::Unchanged(_) => panic!("expected a transition"),
        };
        assert_eq!(row.status, "completed");
        assert_eq!(row.transaction_id.as_deref(), Some("R1"));
    }

    #[test]
    fn replayed_webhook_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        seed_payment(&db);

        db.apply_gateway_status("X", PaymentStatus::Completed, Some("R1"))
            .unwrap();
        let outcome = db
            .apply_gateway_status("X", PaymentStatus::Completed, Some("R1"))
            .unwrap();
        let row = match outcome {
            ReconcileOutcome::Unchanged(row) => row,
            ReconcileOutcome::Transitioned(_) => panic!("replay must not transition again"),
        };
        assert_eq!(row.status, "completed");
        assert_eq!(row.transaction_id.as_deref(), Some("R1"));
    }

    #[test]
    fn unknown_tx_ref_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        seed_payment(&db);

        let err = db
            .apply_gateway_status("missing", PaymentStatus::Completed, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn concurrent_poll_does_not_clobber_reference() {
        let db = Database::open_in_memory().unwrap();
        seed_payment(&db);

        db.apply_gateway_status("X", PaymentStatus::Completed, Some("R1"))
            .unwrap();
        // A later verification without the provider reference keeps it.
        db.apply_gateway_status("X", PaymentStatus::Refunded, None)
            .unwrap();
        let row = db.get_payment_by_tx_ref("X").unwrap().unwrap();
        assert_eq!(row.status, "refunded");
        assert_eq!(row.transaction_id.as_deref(), Some("R1"));
    }
}
