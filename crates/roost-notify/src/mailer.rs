use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

/// A rendered email ready for delivery.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Delivery backend. Implementations block; the worker calls them from the
/// blocking pool.
pub trait Mailer: Send + Sync + 'static {
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// SMTP delivery via lettre.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from_header: String,
}

impl SmtpMailer {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        smtp_username: String,
        smtp_password: String,
        from_email: &str,
        from_name: &str,
    ) -> Result<Self> {
        let transport = SmtpTransport::relay(smtp_host)
            .context("SMTP relay setup failed")?
            .port(smtp_port)
            .credentials(Credentials::new(smtp_username, smtp_password))
            .build();

        Ok(Self {
            transport,
            from_header: format!("{} <{}>", from_name, from_email),
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from_header
                    .parse()
                    .context("invalid from address")?,
            )
            .to(message.to.parse().context("invalid to address")?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone())
            .context("failed to build email")?;

        self.transport.send(&email).context("SMTP send failed")?;
        Ok(())
    }
}

/// Dev fallback used when SMTP is not configured: logs instead of sending.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!("[email] to={} subject={:?}", message.to, message.subject);
        Ok(())
    }
}
