//! Gateway payload normalization.
//!
//! Payment gateways disagree on field names: some send `transactionId`,
//! some `transaction_id` or just `id`; PayPal nests the amount as
//! `{ "value": "...", "currency_code": "..." }` while others send a bare
//! number. Everything is flattened into [`PaymentDetails`] at the boundary,
//! with the untouched payload kept under `raw_response` for audit. Nothing
//! downstream branches on the original shape.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::entities::PaymentDetails;

/// Status token a caller sends to report a successful payment.
const PAID_TOKEN: &str = "paid";
/// Gateway-side status that marks a completed capture.
const GATEWAY_COMPLETED: &str = "COMPLETED";

fn string_field(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| payload.get(*key))
        .and_then(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn decimal_from(value: &Value) -> Option<Decimal> {
    match value {
        // Going through the string representation keeps exact digits; f64
        // round-tripping would not.
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Flattens a gateway callback payload into the canonical shape.
pub fn normalize(payload: &Value) -> PaymentDetails {
    let mut details = PaymentDetails {
        transaction_id: string_field(payload, &["transactionId", "transaction_id", "id"]),
        gateway: string_field(payload, &["paymentGateway", "payment_gateway", "gateway", "provider"]),
        amount: None,
        currency: string_field(payload, &["currency", "currency_code"]),
        status: string_field(payload, &["status"]).map(|s| s.to_uppercase()),
        raw_response: Some(payload.clone()),
    };

    match payload.get("amount") {
        Some(Value::Object(nested)) => {
            details.amount = nested.get("value").and_then(decimal_from);
            if details.currency.is_none() {
                details.currency = nested
                    .get("currency_code")
                    .or_else(|| nested.get("currency"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
            }
        }
        Some(flat) => details.amount = decimal_from(flat),
        None => {}
    }

    details
}

/// Whether the caller token or the normalized gateway status marks this
/// payment as successful.
pub fn is_approved(status_token: &str, details: &PaymentDetails) -> bool {
    status_token.eq_ignore_ascii_case(PAID_TOKEN)
        || details.status.as_deref() == Some(GATEWAY_COMPLETED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn normalizes_flat_gateway_shape() {
        let payload = json!({
            "transactionId": "txn_123",
            "paymentGateway": "stripe",
            "amount": 200.50,
            "currency": "USD",
            "status": "succeeded"
        });

        let details = normalize(&payload);
        assert_eq!(details.transaction_id.as_deref(), Some("txn_123"));
        assert_eq!(details.gateway.as_deref(), Some("stripe"));
        assert_eq!(details.amount, Some(dec!(200.50)));
        assert_eq!(details.currency.as_deref(), Some("USD"));
        assert_eq!(details.status.as_deref(), Some("SUCCEEDED"));
        assert_eq!(details.raw_response, Some(payload));
    }

    #[test]
    fn normalizes_nested_amount_shape() {
        let payload = json!({
            "id": "5O190127TN364715T",
            "status": "completed",
            "amount": { "value": "99.99", "currency_code": "EUR" }
        });

        let details = normalize(&payload);
        assert_eq!(details.transaction_id.as_deref(), Some("5O190127TN364715T"));
        assert_eq!(details.amount, Some(dec!(99.99)));
        assert_eq!(details.currency.as_deref(), Some("EUR"));
        assert_eq!(details.status.as_deref(), Some("COMPLETED"));
    }

    #[test]
    fn preserves_unrecognized_fields_in_raw_response() {
        let payload = json!({
            "transaction_id": "t-1",
            "payer_email": "buyer@example.com",
            "facilitator": { "fee": "0.30" }
        });

        let details = normalize(&payload);
        let raw = details.raw_response.expect("raw payload retained");
        assert_eq!(raw["payer_email"], "buyer@example.com");
        assert_eq!(raw["facilitator"]["fee"], "0.30");
    }

    #[test]
    fn empty_payload_normalizes_to_defaults() {
        let details = normalize(&json!({}));
        assert_eq!(details.transaction_id, None);
        assert_eq!(details.amount, None);
        assert_eq!(details.status, None);
        assert_eq!(details.raw_response, Some(json!({})));
    }

    #[test]
    fn approval_accepts_paid_token_any_case() {
        let details = PaymentDetails::default();
        assert!(is_approved("paid", &details));
        assert!(is_approved("Paid", &details));
        assert!(is_approved("PAID", &details));
        assert!(!is_approved("pending", &details));
        assert!(!is_approved("", &details));
    }

    #[test]
    fn approval_accepts_completed_gateway_status() {
        let details = normalize(&json!({ "status": "Completed" }));
        assert!(is_approved("unknown", &details));

        let declined = normalize(&json!({ "status": "DECLINED" }));
        assert!(!is_approved("unknown", &declined));
    }
}
