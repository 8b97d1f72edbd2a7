pub mod emails;
pub mod mailer;

pub use mailer::{EmailMessage, LogMailer, Mailer, SmtpMailer};

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

/// A notification job: template kind plus the context needed to render it.
/// Submitted by request handlers, delivered by the worker — never the other
/// way around.
#[derive(Debug, Clone)]
pub enum Notification {
    BookingCreated {
        to: String,
        guest_name: String,
        listing_name: String,
        location: String,
        start_date: String,
        end_date: String,
        total_price_cents: i64,
    },
    BookingConfirmed {
        to: String,
        guest_name: String,
        listing_name: String,
        location: String,
        start_date: String,
        end_date: String,
        total_price_cents: i64,
        host_name: String,
        host_email: String,
        host_phone: Option<String>,
    },
    PaymentConfirmed {
        to: String,
        guest_name: String,
        listing_name: String,
        location: String,
        start_date: String,
        end_date: String,
        nights: i64,
        amount_cents: i64,
        currency: String,
        transaction_id: String,
        payment_date: String,
    },
    PaymentFailed {
        to: String,
        guest_name: String,
        booking_id: String,
        amount_cents: i64,
        currency: String,
    },
}

/// Fire-and-forget submission handle. Cloneable; handlers call
/// [`Notifier::submit`] and move on — delivery happens on the worker task and
/// its outcome is never observed by the request path.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue a job. A closed channel (worker gone during shutdown) is
    /// ignored — submission must never fail the request.
    pub fn submit(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

/// Consume notification jobs until the channel closes. Rendering happens
/// here; the blocking SMTP send is pushed onto the blocking pool. Delivery
/// failures are logged and dropped — no retries, no ordering guarantees.
pub async fn run_worker(mut rx: mpsc::UnboundedReceiver<Notification>, mailer: Arc<dyn Mailer>) {
    while let Some(job) = rx.recv().await {
        let message = emails::render(&job);
        let to = message.to.clone();
        let mailer = mailer.clone();

        let sent = tokio::task::spawn_blocking(move || mailer.send(&message)).await;
        match sent {
            Ok(Ok(())) => info!("Notification email sent to {}", to),
            Ok(Err(e)) => error!("Error sending notification email to {}: {}", to, e),
            Err(e) => error!("Notification send task failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn booking_created() -> Notification {
        Notification::BookingCreated {
            to: "guest@example.com".into(),
            guest_name: "Dawit Abebe".into(),
            listing_name: "Lakeside Cabin".into(),
            location: "Awassa".into(),
            start_date: "2025-12-01".into(),
            end_date: "2025-12-05".into(),
            total_price_cents: 40_000,
        }
    }

    #[tokio::test]
    async fn worker_delivers_submitted_jobs() {
        let mailer = Arc::new(RecordingMailer {
            sent: Mutex::new(Vec::new()),
        });
        let (notifier, rx) = Notifier::new();

        notifier.submit(booking_created());
        drop(notifier); // close the channel so the worker drains and exits

        run_worker(rx, mailer.clone()).await;

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "guest@example.com");
        assert!(sent[0].subject.contains("Booking Created"));
    }

    #[test]
    fn submit_after_worker_shutdown_is_silent() {
        let (notifier, rx) = Notifier::new();
        drop(rx);
        // Must not panic or error.
        notifier.submit(booking_created());
    }
}
