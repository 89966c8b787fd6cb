use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A charge the portal asks the gateway to collect
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub fee_id: Uuid,
    pub student_id: Uuid,
    pub amount: Decimal,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Approved { transaction_id: String },
    Declined { transaction_id: String, reason: String },
}

impl ChargeOutcome {
    pub fn transaction_id(&self) -> &str {
        match self {
            ChargeOutcome::Approved { transaction_id } | ChargeOutcome::Declined { transaction_id, .. } => {
                transaction_id
            }
        }
    }
}

/// Seam for payment providers; every attempt yields an outcome and a transaction id
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> ChargeOutcome;
}

/// Simulated gateway approving a configurable share of charges
pub struct MockGateway {
    success_rate: f64,
}

impl MockGateway {
    pub fn new(success_rate: f64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn charge(&self, request: &ChargeRequest) -> ChargeOutcome {
        let (approved, transaction_id) = {
            let mut rng = rand::rng();
            let approved = rng.random_bool(self.success_rate);
            (approved, transaction_id_with(rng.random_range(0..1_000_000)))
        };

        tracing::info!(
            "Mock gateway {} charge of {} for fee {} ({})",
            if approved { "approved" } else { "declined" },
            request.amount,
            request.fee_id,
            transaction_id
        );

        if approved {
            ChargeOutcome::Approved { transaction_id }
        } else {
            ChargeOutcome::Declined {
                transaction_id,
                reason: "Payment declined by issuer".to_string(),
            }
        }
    }
}

/// `TXN<yyyymmddHHMMSS><6 digits>`
fn transaction_id_with(suffix: u32) -> String {
    format!("TXN{}{:06}", Utc::now().format("%Y%m%d%H%M%S"), suffix % 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChargeRequest {
        ChargeRequest {
            fee_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            amount: Decimal::from(500),
            method: "card".to_string(),
        }
    }

    #[test]
    fn transaction_id_shape() {
        let id = transaction_id_with(42);
        assert!(id.starts_with("TXN"));
        assert_eq!(id.len(), 3 + 14 + 6);
        assert!(id.ends_with("000042"));
        assert!(id[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn certain_rates_are_deterministic() {
        let always = MockGateway::new(1.0);
        assert!(matches!(always.charge(&request()).await, ChargeOutcome::Approved { .. }));

        let never = MockGateway::new(0.0);
        let outcome = never.charge(&request()).await;
        assert!(matches!(outcome, ChargeOutcome::Declined { .. }));
        assert!(outcome.transaction_id().starts_with("TXN"));
    }

    #[test]
    fn out_of_range_rates_are_clamped() {
        assert_eq!(MockGateway::new(3.0).success_rate, 1.0);
        assert_eq!(MockGateway::new(-1.0).success_rate, 0.0);
    }
}
