use crate::domain::money::Money;
use crate::domain::order::Order;
use crate::domain::payment::{PaymentResult, PaymentToken, RefundResult};
use crate::domain::ports::PaymentGateway;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Serialize)]
struct ChargeRequest<'a> {
    amount: Money,
    source: &'a str,
    description: String,
    reference: &'a str,
}

#[derive(Serialize)]
struct RefundRequest<'a> {
    charge: &'a str,
    amount: Money,
}

#[derive(Deserialize)]
struct GatewayReply {
    id: Option<String>,
    status: String,
    #[serde(default)]
    failure_message: Option<String>,
}

impl GatewayReply {
    fn succeeded(&self) -> bool {
        self.status.eq_ignore_ascii_case("succeeded")
    }

    fn reason(self) -> String {
        self.failure_message
            .unwrap_or_else(|| format!("processor answered '{}'", self.status))
    }
}

/// Payment processor reached over HTTP.
///
/// `POST {base_url}/v1/charges` and `POST {base_url}/v1/refunds` with a bearer
/// API key. Replies with a non-success HTTP status are treated as declines.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<GatewayReply> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(%status, body = %text, "processor rejected request");
            return Ok(GatewayReply {
                id: None,
                status: status.to_string(),
                failure_message: Some(format!("processor returned HTTP {status}")),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    #[instrument(skip(self, order, token), fields(order_number = %order.order_number))]
    async fn authorize(&self, order: &Order, token: &PaymentToken) -> Result<PaymentResult> {
        let amount = order.amounts.total;
        let request = ChargeRequest {
            amount,
            source: token.as_str(),
            description: format!("Order {}", order.order_number),
            reference: order.order_number.as_str(),
        };
        let reply = self.post("/v1/charges", &request).await?;
        match reply.id.clone() {
            Some(transaction_id) if reply.succeeded() => Ok(PaymentResult::Approved {
                transaction_id,
                amount,
            }),
            _ => Ok(PaymentResult::declined(amount, reply.reason())),
        }
    }

    #[instrument(skip(self))]
    async fn refund(&self, transaction_id: &str, amount: Money) -> Result<RefundResult> {
        let request = RefundRequest {
            charge: transaction_id,
            amount,
        };
        let reply = self.post("/v1/refunds", &request).await?;
        match reply.id.clone() {
            Some(refund_id) if reply.succeeded() => Ok(RefundResult::Refunded { refund_id, amount }),
            _ => Ok(RefundResult::failed(amount, reply.reason())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_interpretation() {
        let ok: GatewayReply =
            serde_json::from_str(r#"{"id":"ch_1","status":"succeeded"}"#).unwrap();
        assert!(ok.succeeded());

        let declined: GatewayReply = serde_json::from_str(
            r#"{"id":null,"status":"failed","failure_message":"insufficient funds"}"#,
        )
        .unwrap();
        assert!(!declined.succeeded());
        assert_eq!(declined.reason(), "insufficient funds");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let gateway = HttpGateway::new("https://pay.test/", "key");
        assert_eq!(gateway.base_url, "https://pay.test");
    }
}
