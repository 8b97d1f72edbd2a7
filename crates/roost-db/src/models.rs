/// Database row types — these map directly to SQLite rows.
/// Distinct from roost-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub created_at: String,
}

pub struct ListingRow {
    pub id: String,
    pub host_id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub price_per_night_cents: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug)]
pub struct BookingRow {
    pub id: String,
    pub listing_id: String,
    pub guest_id: String,
    pub start_date: String,
    pub end_date: String,
    pub total_price_cents: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct PaymentRow {
    pub id: String,
    pub booking_id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub status: String,
    pub transaction_id: Option<String>,
    pub tx_ref: Option<String>,
    /// Joined from payment_methods.
    pub method_name: String,
    pub currency: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug)]
pub struct ReviewRow {
    pub id: String,
    pub listing_id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub sent_at: String,
}
