use crate::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            email         TEXT NOT NULL UNIQUE,
            password      TEXT NOT NULL,
            first_name    TEXT NOT NULL,
            last_name     TEXT NOT NULL,
            phone_number  TEXT,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS listings (
            id                     TEXT PRIMARY KEY,
            host_id                TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name                   TEXT NOT NULL,
            description            TEXT NOT NULL,
            location               TEXT NOT NULL,
            price_per_night_cents  INTEGER NOT NULL CHECK (price_per_night_cents > 0),
            created_at             TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at             TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_listings_host
            ON listings(host_id);
        CREATE INDEX IF NOT EXISTS idx_listings_location
            ON listings(location);
        CREATE INDEX IF NOT EXISTS idx_listings_price
            ON listings(price_per_night_cents);

        CREATE TABLE IF NOT EXISTS bookings (
            id                 TEXT PRIMARY KEY,
            listing_id         TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
            guest_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            start_date         TEXT NOT NULL,
            end_date           TEXT NOT NULL,
            total_price_cents  INTEGER NOT NULL,
            status             TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'confirmed', 'cancelled', 'completed', 'rejected')),
            created_at         TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK (end_date > start_date)
        );

        CREATE INDEX IF NOT EXISTS idx_bookings_listing
            ON bookings(listing_id);
        CREATE INDEX IF NOT EXISTS idx_bookings_guest
            ON bookings(guest_id);
        CREATE INDEX IF NOT EXISTS idx_bookings_dates
            ON bookings(start_date, end_date);

        CREATE TABLE IF NOT EXISTS payment_methods (
            id    TEXT PRIMARY KEY,
            name  TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS payments (
            id              TEXT PRIMARY KEY,
            booking_id      TEXT NOT NULL REFERENCES bookings(id) ON DELETE CASCADE,
            user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            amount_cents    INTEGER NOT NULL CHECK (amount_cents > 0),
            status          TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'completed', 'failed', 'refunded', 'reversed')),
            transaction_id  TEXT UNIQUE,
            tx_ref          TEXT UNIQUE,
            method_id       TEXT NOT NULL REFERENCES payment_methods(id) ON DELETE RESTRICT,
            currency        TEXT NOT NULL DEFAULT 'NGN',
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_payments_booking
            ON payments(booking_id);
        CREATE INDEX IF NOT EXISTS idx_payments_status
            ON payments(status);
        CREATE INDEX IF NOT EXISTS idx_payments_tx_ref
            ON payments(tx_ref);

        CREATE TABLE IF NOT EXISTS reviews (
            id          TEXT PRIMARY KEY,
            listing_id  TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            rating      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comment     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (listing_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_reviews_listing
            ON reviews(listing_id);

        CREATE TABLE IF NOT EXISTS messages (
            id            TEXT PRIMARY KEY,
            sender_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            recipient_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            body          TEXT NOT NULL,
            sent_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_sender
            ON messages(sender_id);
        CREATE INDEX IF NOT EXISTS idx_messages_recipient
            ON messages(recipient_id);

        -- Seed the default payment method
        INSERT OR IGNORE INTO payment_methods (id, name)
            VALUES ('00000000-0000-0000-0000-000000000001', 'Chapa');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
