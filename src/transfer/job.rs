//! TransferJob - the unit of work carried by the queue

use serde::{Deserialize, Serialize};

use crate::core::{AgentError, AgentResult};

/// Amount moved by every transfer the demo handler queues
pub const DEMO_TRANSFER_AMOUNT: u128 = 1;

/// One pending token transfer
///
/// Serialized as a flat JSON object; unknown fields are ignored on decode.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferJob {
    /// Token contract address
    pub token_address: String,
    /// Sending wallet
    pub source_address: String,
    /// Receiving wallet
    pub target_address: String,
    /// Hex private key of the sending wallet
    pub private_key: String,
    /// Amount in token base units (at least 1)
    pub amount: u128,
    /// Ledger JSON-RPC URL
    #[serde(alias = "web3_provider")]
    pub ledger_endpoint: String,
}

impl TransferJob {
    /// Check addresses, amount and endpoint
    pub fn validate(&self) -> AgentResult<()> {
        for (field, value) in [
            ("token_address", &self.token_address),
            ("source_address", &self.source_address),
            ("target_address", &self.target_address),
        ] {
            if !is_address(value) {
                return Err(AgentError::invalid_job(format!(
                    "{} is not a chain address: {:?}",
                    field, value
                )));
            }
        }
        if self.amount < 1 {
            return Err(AgentError::invalid_job("amount must be at least 1"));
        }
        if self.private_key.trim().is_empty() {
            return Err(AgentError::invalid_job("private_key is empty"));
        }
        if self.ledger_endpoint.trim().is_empty() {
            return Err(AgentError::invalid_job("ledger_endpoint is empty"));
        }
        Ok(())
    }

    /// Encode as the queue wire format
    pub fn to_json(&self) -> AgentResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the queue wire format and validate
    pub fn from_json(payload: &str) -> AgentResult<Self> {
        let job: Self = serde_json::from_str(payload)?;
        job.validate()?;
        Ok(job)
    }

    /// Same job with a different amount
    pub fn with_amount(mut self, amount: u128) -> Self {
        self.amount = amount;
        self
    }
}

impl std::fmt::Debug for TransferJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferJob")
            .field("token_address", &self.token_address)
            .field("source_address", &self.source_address)
            .field("target_address", &self.target_address)
            .field("private_key", &"<redacted>")
            .field("amount", &self.amount)
            .field("ledger_endpoint", &self.ledger_endpoint)
            .finish()
    }
}

/// `0x` followed by 40 hex digits
pub fn is_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// `0x1234...abcd` form for logs
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> TransferJob {
        TransferJob {
            token_address: "0x77f565d1f11ad8ecff3e55cf1cde77bb6b189e44".into(),
            source_address: "0x5d1d0b1d5790b1c88cc1e94366d3b242991dc05d".into(),
            target_address: "0xabAB8096c7C9922F991772164311Ba862bCE7622".into(),
            private_key: "d15c43126f6966491820b8dc093a3ebed8ff48fa980ce52105f34d2296b228dc".into(),
            amount: DEMO_TRANSFER_AMOUNT,
            ledger_endpoint: "http://127.0.0.1:8545".into(),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let value: serde_json::Value = serde_json::from_str(&job().to_json().unwrap()).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "amount",
                "ledger_endpoint",
                "private_key",
                "source_address",
                "target_address",
                "token_address"
            ]
        );
        assert_eq!(object["amount"], json!(1));
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let payload = json!({
            "token_address": "0x77f565d1f11ad8ecff3e55cf1cde77bb6b189e44",
            "source_address": "0x5d1d0b1d5790b1c88cc1e94366d3b242991dc05d",
            "target_address": "0xabAB8096c7C9922F991772164311Ba862bCE7622",
            "private_key": "0xK",
            "amount": 5,
            "ledger_endpoint": "http://node",
            "priority": "high"
        });
        let decoded = TransferJob::from_json(&payload.to_string()).unwrap();
        assert_eq!(decoded.amount, 5);
    }

    #[test]
    fn test_decode_accepts_web3_provider_alias() {
        let mut value = serde_json::to_value(job()).unwrap();
        let object = value.as_object_mut().unwrap();
        let endpoint = object.remove("ledger_endpoint").unwrap();
        object.insert("web3_provider".into(), endpoint);

        let decoded = TransferJob::from_json(&value.to_string()).unwrap();
        assert_eq!(decoded.ledger_endpoint, "http://127.0.0.1:8545");
    }

    #[test]
    fn test_zero_amount_rejected() {
        let payload = job().with_amount(0).to_json().unwrap();
        let err = TransferJob::from_json(&payload).unwrap_err();
        assert!(matches!(err, AgentError::InvalidJob(_)));
    }

    #[test]
    fn test_negative_amount_is_malformed() {
        let mut value = serde_json::to_value(job()).unwrap();
        value["amount"] = json!(-1);
        let err = TransferJob::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, AgentError::Serialization(_)));
    }

    #[test]
    fn test_bad_address_rejected() {
        let mut bad = job();
        bad.target_address = "0xB".into();
        assert!(matches!(bad.validate(), Err(AgentError::InvalidJob(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", job());
        assert!(!rendered.contains("d15c4312"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("0x5d1d0b1d5790b1c88cc1e94366d3b242991dc05d"),
            "0x5d1d...c05d"
        );
        assert_eq!(short_address("0xA"), "0xA");
    }
}
