//! Payment oracle facade: inbound proof verification with replay
//! protection, and best-effort outbound transfers.
//!
//! The used-proof set is process-wide and append-only for the process
//! lifetime. A proof is reserved before the ledger round-trip and released
//! only on failure, so two racing verifications of the same proof cannot
//! both succeed.

use crate::config::Config;
use serde::Deserialize;
use stakemate_types::Amount;
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("proof-replay")]
    Replay,
    #[error("proof-not-found")]
    NotFound,
    #[error("proof-insufficient")]
    Insufficient,
    #[error("proof-wrong-recipient")]
    WrongRecipient,
    #[error("payment ledger error: {0}")]
    Ledger(String),
}

/// A confirmed inbound credit as reported by the ledger.
#[derive(Clone, Debug, Deserialize)]
struct InboundCredit {
    confirmed: bool,
    amount: Amount,
    recipient: String,
}

enum Backend {
    /// Everything succeeds without touching a ledger.
    Test,
    /// External ledger bridge over HTTP.
    Ledger(LedgerClient),
    /// Canned credits for unit tests of the verification rules.
    #[cfg(test)]
    Mock(std::collections::HashMap<String, InboundCredit>),
}

pub struct PaymentOracle {
    backend: Backend,
    escrow_address: String,
    used_proofs: Mutex<HashSet<String>>,
}

impl PaymentOracle {
    pub fn from_config(config: &Config) -> Self {
        let backend = if config.test_mode {
            Backend::Test
        } else {
            Backend::Ledger(LedgerClient::new(config))
        };
        Self {
            backend,
            escrow_address: config.escrow_address.clone(),
            used_proofs: Mutex::new(HashSet::new()),
        }
    }

    #[cfg(test)]
    fn with_mock(credits: Vec<(&str, Amount, &str)>) -> Self {
        let credits = credits
            .into_iter()
            .map(|(proof, amount, recipient)| {
                (
                    proof.to_string(),
                    InboundCredit {
                        confirmed: true,
                        amount,
                        recipient: recipient.to_string(),
                    },
                )
            })
            .collect();
        Self {
            backend: Backend::Mock(credits),
            escrow_address: "escrow-test".to_string(),
            used_proofs: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_test_mode(&self) -> bool {
        matches!(self.backend, Backend::Test)
    }

    /// Resolve `proof` against the ledger and accept it once. The credit
    /// must be confirmed, addressed to the escrow account, and worth at
    /// least 99% of `expected`.
    pub async fn verify_inbound(
        &self,
        proof: &str,
        expected: Amount,
    ) -> Result<Amount, PaymentError> {
        if self.is_test_mode() {
            return Ok(expected);
        }

        // Reserve first; release on failure.
        {
            let mut used = self.used_proofs.lock().unwrap();
            if !used.insert(proof.to_string()) {
                return Err(PaymentError::Replay);
            }
        }

        let result = self.check_credit(proof, expected).await;
        if result.is_err() {
            self.used_proofs.lock().unwrap().remove(proof);
        }
        result
    }

    async fn check_credit(&self, proof: &str, expected: Amount) -> Result<Amount, PaymentError> {
        let credit = match &self.backend {
            Backend::Test => unreachable!("test mode short-circuits verification"),
            Backend::Ledger(client) => client.lookup(proof).await?,
            #[cfg(test)]
            Backend::Mock(credits) => credits
                .get(proof)
                .cloned()
                .ok_or(PaymentError::NotFound)?,
        };

        if !credit.confirmed {
            return Err(PaymentError::NotFound);
        }
        if credit.recipient != self.escrow_address {
            return Err(PaymentError::WrongRecipient);
        }
        // Tolerate up to 1% shortfall for transfer fees.
        if credit.amount as u128 * 100 < expected as u128 * 99 {
            return Err(PaymentError::Insufficient);
        }
        info!(proof, amount = credit.amount, "inbound payment verified");
        Ok(credit.amount)
    }

    /// Best-effort transfer out of escrow. Failures are the caller's to
    /// log; terminal room state is never reversed over them.
    pub async fn send_outbound(
        &self,
        destination: &str,
        amount: Amount,
    ) -> Result<String, PaymentError> {
        match &self.backend {
            Backend::Test => Ok(format!("test-transfer-{destination}-{amount}")),
            Backend::Ledger(client) => client.transfer(destination, amount).await,
            #[cfg(test)]
            Backend::Mock(_) => Ok(format!("mock-transfer-{destination}-{amount}")),
        }
    }
}

/// Thin HTTP client for the external ledger bridge.
struct LedgerClient {
    http: reqwest::Client,
    rpc_url: String,
    escrow_secret: String,
}

#[derive(Deserialize)]
struct TransferReceipt {
    #[serde(rename = "ref")]
    reference: String,
}

impl LedgerClient {
    fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.oracle_timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            rpc_url: config.ledger_rpc_url.clone().unwrap_or_default(),
            escrow_secret: config.escrow_secret.clone().unwrap_or_default(),
        }
    }

    async fn lookup(&self, proof: &str) -> Result<InboundCredit, PaymentError> {
        let url = format!("{}/payments/{proof}", self.rpc_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| PaymentError::Ledger(err.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::NotFound);
        }
        response
            .error_for_status()
            .map_err(|err| PaymentError::Ledger(err.to_string()))?
            .json::<InboundCredit>()
            .await
            .map_err(|err| PaymentError::Ledger(err.to_string()))
    }

    async fn transfer(&self, destination: &str, amount: Amount) -> Result<String, PaymentError> {
        let url = format!("{}/transfers", self.rpc_url);
        let body = serde_json::json!({
            "secret": self.escrow_secret,
            "destination": destination,
            "amount": amount,
        });
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| PaymentError::Ledger(err.to_string()))?
            .error_for_status()
            .map_err(|err| PaymentError::Ledger(err.to_string()))?;
        let receipt = response
            .json::<TransferReceipt>()
            .await
            .map_err(|err| PaymentError::Ledger(err.to_string()))?;
        info!(destination, amount, reference = %receipt.reference, "outbound transfer sent");
        Ok(receipt.reference)
    }
}

/// Refund a cancelled or disconnected seeker. No-op in test mode; logged
/// and forgotten on failure, like every outbound.
pub async fn refund_seeker(
    oracle: &PaymentOracle,
    wallet: &str,
    stake: Amount,
    proof: Option<&str>,
) {
    if oracle.is_test_mode() {
        return;
    }
    match oracle.send_outbound(wallet, stake).await {
        Ok(reference) => {
            info!(wallet, stake, reference, proof, "seeker refunded");
        }
        Err(err) => {
            warn!(wallet, stake, ?err, "seeker refund failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_accepts_confirmed_credit() {
        let oracle = PaymentOracle::with_mock(vec![("tx-1", 100, "escrow-test")]);
        let received = oracle.verify_inbound("tx-1", 100).await.expect("verified");
        assert_eq!(received, 100);
    }

    #[tokio::test]
    async fn test_verify_rejects_replay() {
        let oracle = PaymentOracle::with_mock(vec![("tx-1", 100, "escrow-test")]);
        oracle.verify_inbound("tx-1", 100).await.expect("first use");
        assert_eq!(
            oracle.verify_inbound("tx-1", 100).await,
            Err(PaymentError::Replay)
        );
    }

    #[tokio::test]
    async fn test_verify_tolerates_one_percent_shortfall() {
        let oracle = PaymentOracle::with_mock(vec![
            ("tx-99", 99, "escrow-test"),
            ("tx-98", 98, "escrow-test"),
        ]);
        assert!(oracle.verify_inbound("tx-99", 100).await.is_ok());
        assert_eq!(
            oracle.verify_inbound("tx-98", 100).await,
            Err(PaymentError::Insufficient)
        );
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_recipient_and_unknown() {
        let oracle = PaymentOracle::with_mock(vec![("tx-1", 100, "someone-else")]);
        assert_eq!(
            oracle.verify_inbound("tx-1", 100).await,
            Err(PaymentError::WrongRecipient)
        );
        assert_eq!(
            oracle.verify_inbound("tx-missing", 100).await,
            Err(PaymentError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_failed_verification_releases_proof() {
        let oracle = PaymentOracle::with_mock(vec![("tx-1", 100, "escrow-test")]);
        // Too little for this stake...
        assert_eq!(
            oracle.verify_inbound("tx-1", 1_000).await,
            Err(PaymentError::Insufficient)
        );
        // ...but still spendable at the right stake.
        assert!(oracle.verify_inbound("tx-1", 100).await.is_ok());
    }

    #[tokio::test]
    async fn test_test_mode_bypasses_everything() {
        let oracle = PaymentOracle::from_config(&Config::test());
        assert!(oracle.is_test_mode());
        assert!(oracle.verify_inbound("anything", 5).await.is_ok());
        assert!(oracle.verify_inbound("anything", 5).await.is_ok());
        assert!(oracle.send_outbound("wallet", 5).await.is_ok());
    }
}
