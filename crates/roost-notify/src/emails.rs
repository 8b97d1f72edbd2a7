//! Email rendering for each notification kind. Plain format strings; the
//! message bodies are small enough that a template engine would be overkill.

use crate::{EmailMessage, Notification};

fn price(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

pub fn render(notification: &Notification) -> EmailMessage {
    match notification {
        Notification::BookingCreated {
            to,
            guest_name,
            listing_name,
            location,
            start_date,
            end_date,
            total_price_cents,
        } => EmailMessage {
            to: to.clone(),
            subject: format!("Booking Created - {listing_name}"),
            html_body: format!(
                r#"<html>
<body>
    <h2>Booking Created!</h2>
    <p>Dear {guest_name},</p>
    <p>Your booking has been created successfully and is pending host confirmation.</p>

    <h3>Booking Details:</h3>
    <ul>
        <li><strong>Property:</strong> {listing_name}</li>
        <li><strong>Location:</strong> {location}</li>
        <li><strong>Check-in:</strong> {start_date}</li>
        <li><strong>Check-out:</strong> {end_date}</li>
        <li><strong>Total Price:</strong> ETB {total}</li>
    </ul>

    <p>You will receive another email once the host confirms your booking.</p>
    <p>Best regards,<br>The Roost Team</p>
</body>
</html>"#,
                total = price(*total_price_cents),
            ),
        },

        Notification::BookingConfirmed {
            to,
            guest_name,
            listing_name,
            location,
            start_date,
            end_date,
            total_price_cents,
            host_name,
            host_email,
            host_phone,
        } => EmailMessage {
            to: to.clone(),
            subject: format!("Booking Confirmed - {listing_name}"),
            html_body: format!(
                r#"<html>
<body>
    <h2>Booking Confirmed!</h2>
    <p>Dear {guest_name},</p>
    <p>Your booking has been confirmed by the host.</p>

    <h3>Booking Details:</h3>
    <ul>
        <li><strong>Property:</strong> {listing_name}</li>
        <li><strong>Location:</strong> {location}</li>
        <li><strong>Check-in:</strong> {start_date}</li>
        <li><strong>Check-out:</strong> {end_date}</li>
        <li><strong>Total Price:</strong> ETB {total}</li>
    </ul>

    <h3>Host Information:</h3>
    <ul>
        <li><strong>Name:</strong> {host_name}</li>
        <li><strong>Email:</strong> {host_email}</li>
        <li><strong>Phone:</strong> {phone}</li>
    </ul>

    <p>We hope you have a wonderful stay!</p>
    <p>Best regards,<br>The Roost Team</p>
</body>
</html>"#,
                total = price(*total_price_cents),
                phone = host_phone.as_deref().unwrap_or("N/A"),
            ),
        },

        Notification::PaymentConfirmed {
            to,
            guest_name,
            listing_name,
            location,
            start_date,
            end_date,
            nights,
            amount_cents,
            currency,
            transaction_id,
            payment_date,
        } => EmailMessage {
            to: to.clone(),
            subject: "Payment Confirmation - Your Booking".to_string(),
            html_body: format!(
                r#"<html>
<body>
    <h2>Payment Confirmed!</h2>
    <p>Dear {guest_name},</p>
    <p>Your payment has been successfully processed.</p>

    <h3>Booking Details:</h3>
    <ul>
        <li><strong>Property:</strong> {listing_name}</li>
        <li><strong>Location:</strong> {location}</li>
        <li><strong>Check-in:</strong> {start_date}</li>
        <li><strong>Check-out:</strong> {end_date}</li>
        <li><strong>Duration:</strong> {nights} nights</li>
    </ul>

    <h3>Payment Details:</h3>
    <ul>
        <li><strong>Amount Paid:</strong> {currency} {amount}</li>
        <li><strong>Transaction ID:</strong> {transaction_id}</li>
        <li><strong>Payment Date:</strong> {payment_date}</li>
    </ul>

    <p>Thank you for choosing our service!</p>
    <p>Best regards,<br>The Roost Team</p>
</body>
</html>"#,
                amount = price(*amount_cents),
            ),
        },

        Notification::PaymentFailed {
            to,
            guest_name,
            booking_id,
            amount_cents,
            currency,
        } => EmailMessage {
            to: to.clone(),
            subject: "Payment Failed - Action Required".to_string(),
            html_body: format!(
                r#"<html>
<body>
    <h2>Payment Failed</h2>
    <p>Dear {guest_name},</p>
    <p>Unfortunately, your payment could not be processed.</p>

    <p><strong>Booking Reference:</strong> {booking_id}</p>
    <p><strong>Amount:</strong> {currency} {amount}</p>

    <p>Please try again or contact our support team for assistance.</p>

    <p>Best regards,<br>The Roost Team</p>
</body>
</html>"#,
                amount = price(*amount_cents),
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_confirmation_includes_transaction_details() {
        let message = render(&Notification::PaymentConfirmed {
            to: "guest@example.com".into(),
            guest_name: "Dawit Abebe".into(),
            listing_name: "Lakeside Cabin".into(),
            location: "Awassa".into(),
            start_date: "2025-12-01".into(),
            end_date: "2025-12-05".into(),
            nights: 4,
            amount_cents: 40_000,
            currency: "NGN".into(),
            transaction_id: "R1".into(),
            payment_date: "2025-12-01 10:00".into(),
        });

        assert_eq!(message.to, "guest@example.com");
        assert_eq!(message.subject, "Payment Confirmation - Your Booking");
        assert!(message.html_body.contains("NGN 400.00"));
        assert!(message.html_body.contains("R1"));
        assert!(message.html_body.contains("4 nights"));
    }

    #[test]
    fn payment_failed_names_the_booking() {
        let message = render(&Notification::PaymentFailed {
            to: "guest@example.com".into(),
            guest_name: "Dawit Abebe".into(),
            booking_id: "b-42".into(),
            amount_cents: 12_550,
            currency: "NGN".into(),
        });

        assert_eq!(message.subject, "Payment Failed - Action Required");
        assert!(message.html_body.contains("b-42"));
        assert!(message.html_body.contains("NGN 125.50"));
    }

    #[test]
    fn booking_confirmed_shows_host_contact() {
        let message = render(&Notification::BookingConfirmed {
            to: "guest@example.com".into(),
            guest_name: "Dawit Abebe".into(),
            listing_name: "Lakeside Cabin".into(),
            location: "Awassa".into(),
            start_date: "2025-12-01".into(),
            end_date: "2025-12-05".into(),
            total_price_cents: 40_000,
            host_name: "Hana Girma".into(),
            host_email: "host@example.com".into(),
            host_phone: None,
        });

        assert!(message.subject.contains("Booking Confirmed"));
        assert!(message.html_body.contains("host@example.com"));
        assert!(message.html_body.contains("N/A"));
    }
}
