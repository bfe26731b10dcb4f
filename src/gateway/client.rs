use failsafe::futures::CircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use std::time::Duration;

use super::{ChargeGateway, ChargeOutcome, ChargeRequest, GatewayError};

/// HTTP client for the payment gateway's charge endpoint.
pub struct HttpChargeGateway {
    client: Client,
    base_url: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>,
}

impl HttpChargeGateway {
    pub fn new(base_url: String) -> Self {
        Self::with_circuit_breaker_config(base_url, 5, Duration::from_secs(60))
    }

    pub fn with_circuit_breaker_config(
        base_url: String,
        failure_threshold: u32,
        reset_timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::exponential(Duration::from_secs(10), reset_timeout);
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        HttpChargeGateway {
            client,
            base_url,
            circuit_breaker,
        }
    }
}

#[async_trait::async_trait]
impl ChargeGateway for HttpChargeGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError> {
        let url = format!("{}/charges", self.base_url.trim_end_matches('/'));
        let client = self.client.clone();
        let body = serde_json::to_value(request)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.post(&url).json(&body).send().await?;

                if !response.status().is_success() {
                    return Err(GatewayError::InvalidResponse(format!(
                        "gateway returned {}",
                        response.status()
                    )));
                }

                let outcome = response.json::<ChargeOutcome>().await?;
                Ok(outcome)
            })
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

impl Clone for HttpChargeGateway {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            circuit_breaker: self.circuit_breaker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request() -> ChargeRequest {
        ChargeRequest {
            tenant_id: Uuid::new_v4(),
            pledge_id: Uuid::new_v4(),
            donor_user_id: None,
            amount_cents: 5000,
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn test_gateway_creation() {
        let gateway = HttpChargeGateway::new("http://localhost:9292".to_string());
        assert_eq!(gateway.base_url, "http://localhost:9292");
    }

    #[tokio::test]
    async fn test_charge_approved() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/charges")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result": "approved", "reference": "ch_12345"}"#)
            .create_async()
            .await;

        let gateway = HttpChargeGateway::new(server.url());
        let outcome = gateway.charge(&request()).await.unwrap();

        assert!(outcome.is_approved());
        match outcome {
            ChargeOutcome::Approved { reference } => assert_eq!(reference, "ch_12345"),
            ChargeOutcome::Declined { .. } => panic!("expected approval"),
        }
    }

    #[tokio::test]
    async fn test_charge_declined() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/charges")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result": "declined", "reason": "insufficient_funds"}"#)
            .create_async()
            .await;

        let gateway = HttpChargeGateway::new(server.url());
        let outcome = gateway.charge(&request()).await.unwrap();

        assert!(!outcome.is_approved());
    }

    #[tokio::test]
    async fn test_charge_server_error() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/charges")
            .with_status(502)
            .create_async()
            .await;

        let gateway = HttpChargeGateway::new(server.url());
        let result = gateway.charge(&request()).await;

        assert!(matches!(result, Err(GatewayError::InvalidResponse(_))));
    }
}
