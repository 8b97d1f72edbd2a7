use serde::{Deserialize, Serialize};

/// Booking lifecycle states.
///
/// `pending` is the state every new booking starts in. `completed` and
/// `rejected` are set administratively; the API only ever transitions into
/// `confirmed` (host action) and `cancelled` (guest or host action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            "rejected" => Some(BookingStatus::Rejected),
            _ => None,
        }
    }

    /// A booking blocks a date range unless it has been cancelled or rejected.
    pub fn blocks_availability(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::Rejected)
    }
}

/// Local payment states the gateway vocabulary is reconciled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Reversed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Reversed => "reversed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            "reversed" => Some(PaymentStatus::Reversed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_status_round_trips() {
        for s in ["pending", "confirmed", "cancelled", "completed", "rejected"] {
            assert_eq!(BookingStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(BookingStatus::parse("deleted").is_none());
    }

    #[test]
    fn cancelled_and_rejected_do_not_block() {
        assert!(BookingStatus::Pending.blocks_availability());
        assert!(BookingStatus::Confirmed.blocks_availability());
        assert!(BookingStatus::Completed.blocks_availability());
        assert!(!BookingStatus::Cancelled.blocks_availability());
        assert!(!BookingStatus::Rejected.blocks_availability());
    }

    #[test]
    fn payment_status_round_trips() {
        for s in ["pending", "completed", "failed", "refunded", "reversed"] {
            assert_eq!(PaymentStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(PaymentStatus::parse("success").is_none());
    }
}
