//! Payment gateway port

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use tracing::debug;

use crate::pricing::OrderSummary;

/// Default simulated processing delay
pub const DEFAULT_PAYMENT_LATENCY: Duration = Duration::from_millis(2000);

/// Result of a payment attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment taken
    Approved,

    /// Payment refused
    Declined {
        /// Reason shown to the shopper
        reason: String,
    },
}

/// Takes payment for an order.
#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempt to charge the order total.
    async fn authorize(&self, summary: OrderSummary) -> PaymentOutcome;
}

/// A gateway that waits and then returns a fixed outcome.
#[derive(Debug, Clone)]
pub struct SimulatedPaymentGateway {
    latency: Duration,
    outcome: PaymentOutcome,
}

impl Default for SimulatedPaymentGateway {
    fn default() -> Self {
        Self::new(DEFAULT_PAYMENT_LATENCY)
    }
}

impl SimulatedPaymentGateway {
    /// Approve every payment after `latency`
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            outcome: PaymentOutcome::Approved,
        }
    }

    /// Decline every payment with `reason`.
    #[must_use]
    pub fn declining(mut self, reason: impl Into<String>) -> Self {
        self.outcome = PaymentOutcome::Declined {
            reason: reason.into(),
        };
        self
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn authorize(&self, summary: OrderSummary) -> PaymentOutcome {
        debug!(total = %summary.total, latency = ?self.latency, "processing simulated payment");

        tokio::time::sleep(self.latency).await;

        self.outcome.clone()
    }
}
