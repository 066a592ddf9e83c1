//! Ledger RPC Module
//!
//! This module provides the RPC client for communicating with a Solana
//! ledger endpoint. It includes:
//!
//! - `LedgerClient`: client struct wrapping the nonblocking JSON-RPC client
//! - The `Ledger` trait, one method per remote operation, so the transfer
//!   and history flows can run against a mock in tests
//! - `Checkpoint`: a recent blockhash plus its validity-height bound
//! - Display helpers for amounts and signatures
//!
//! The client is constructed once at startup and handed to the rest of the
//! application; it is never torn down.

pub mod history;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{ParseSignatureError, Signature};
use solana_sdk::transaction::{Transaction, TransactionError};
use solana_transaction_status::{EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding};
use thiserror::Error;

/// How often the confirmation loop re-checks a submitted signature.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Which cluster the client talks to. Selects the RPC endpoint and the
/// explorer link flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Network {
    Devnet,
    MainnetBeta,
}

impl Network {
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://api.devnet.solana.com",
            Network::MainnetBeta => "https://api.mainnet-beta.solana.com",
        }
    }

    /// Block-explorer link for a transaction signature.
    pub fn explorer_tx_url(&self, signature: &str) -> String {
        match self {
            Network::Devnet => {
                format!("https://explorer.solana.com/tx/{}?cluster=devnet", signature)
            }
            Network::MainnetBeta => format!("https://explorer.solana.com/tx/{}", signature),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Devnet => write!(f, "devnet"),
            Network::MainnetBeta => write!(f, "mainnet-beta"),
        }
    }
}

/// A recent ledger state reference. The blockhash anchors a transaction's
/// validity window; `last_valid_block_height` bounds how long the network
/// will still consider the transaction for inclusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger request failed: {0}")]
    Rpc(#[from] ClientError),
    #[error("transaction failed on chain: {0}")]
    Chain(TransactionError),
    #[error("transaction expired: not confirmed before block height {0}")]
    Expired(u64),
    #[error("malformed signature: {0}")]
    MalformedSignature(#[from] ParseSignatureError),
}

/// Remote ledger operations consumed by the application.
#[async_trait]
pub trait Ledger {
    /// Native-asset balance of `address`, in lamports.
    async fn balance(&self, address: &Pubkey) -> Result<u64, LedgerError>;

    /// Recent blockhash plus its validity-height bound. Must be fetched
    /// before a transaction is built so the transaction carries the anchor.
    async fn latest_checkpoint(&self) -> Result<Checkpoint, LedgerError>;

    /// Submits a signed transaction. Acceptance does not imply confirmation.
    async fn submit(&self, transaction: &Transaction) -> Result<Signature, LedgerError>;

    /// Polls until the signature reaches "processed" commitment, the
    /// transaction fails on chain, or the checkpoint's validity window ends.
    async fn confirm(
        &self,
        signature: &Signature,
        checkpoint: &Checkpoint,
    ) -> Result<(), LedgerError>;

    /// The most recent transaction signatures for `address`, newest first.
    async fn recent_signatures(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<String>, LedgerError>;

    /// Full parsed transaction detail, or `None` when the node no longer
    /// retains the transaction.
    async fn transaction_detail(
        &self,
        signature: &str,
    ) -> Result<Option<EncodedConfirmedTransactionWithStatusMeta>, LedgerError>;
}

pub struct LedgerClient {
    rpc: RpcClient,
}

impl LedgerClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(url.into(), CommitmentConfig::confirmed()),
        }
    }

    /// Round-trips a version request to verify the endpoint answers.
    pub async fn probe(&self) -> Result<String, LedgerError> {
        Ok(self.rpc.get_version().await?.solana_core)
    }
}

#[async_trait]
impl Ledger for LedgerClient {
    async fn balance(&self, address: &Pubkey) -> Result<u64, LedgerError> {
        Ok(self.rpc.get_balance(address).await?)
    }

    async fn latest_checkpoint(&self) -> Result<Checkpoint, LedgerError> {
        let (blockhash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
            .await?;
        Ok(Checkpoint {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn submit(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
        Ok(self.rpc.send_transaction(transaction).await?)
    }

    async fn confirm(
        &self,
        signature: &Signature,
        checkpoint: &Checkpoint,
    ) -> Result<(), LedgerError> {
        loop {
            let status = self
                .rpc
                .get_signature_status_with_commitment(signature, CommitmentConfig::processed())
                .await?;
            match status {
                Some(Ok(())) => return Ok(()),
                Some(Err(err)) => return Err(LedgerError::Chain(err)),
                None => {
                    let height = self
                        .rpc
                        .get_block_height_with_commitment(CommitmentConfig::processed())
                        .await?;
                    if height > checkpoint.last_valid_block_height {
                        return Err(LedgerError::Expired(checkpoint.last_valid_block_height));
                    }
                    tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
                }
            }
        }
    }

    async fn recent_signatures(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<String>, LedgerError> {
        let config = GetConfirmedSignaturesForAddress2Config {
            limit: Some(limit),
            ..Default::default()
        };
        let statuses = self
            .rpc
            .get_signatures_for_address_with_config(address, config)
            .await?;
        Ok(statuses.into_iter().map(|s| s.signature).collect())
    }

    async fn transaction_detail(
        &self,
        signature: &str,
    ) -> Result<Option<EncodedConfirmedTransactionWithStatusMeta>, LedgerError> {
        let signature = Signature::from_str(signature)?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        match self.rpc.get_transaction_with_config(&signature, config).await {
            Ok(detail) => Ok(Some(detail)),
            // getTransaction answers JSON null for signatures the node no
            // longer retains; the typed client surfaces that as a
            // deserialization error.
            Err(err) if matches!(err.kind(), ClientErrorKind::SerdeJson(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

// Helper functions for display

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Renders a lamport amount in SOL with trailing zeros trimmed.
pub fn format_sol(lamports: u64) -> String {
    let rendered = format!("{:.9}", lamports_to_sol(lamports));
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

/// First ten characters of a signature, for table cells.
pub fn short_signature(signature: &str) -> String {
    let head: String = signature.chars().take(10).collect();
    format!("{}...", head)
}

#[cfg(test)]
pub mod testing {
    //! Shared ledger double for exercising the wallet flows without a
    //! network.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use solana_client::client_error::{ClientError, ClientErrorKind};
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::Signature;
    use solana_sdk::transaction::Transaction;
    use solana_transaction_status::EncodedConfirmedTransactionWithStatusMeta;

    use super::{Checkpoint, Ledger, LedgerError};

    fn request_failed(message: &str) -> LedgerError {
        LedgerError::Rpc(ClientError {
            request: None,
            kind: ClientErrorKind::Custom(message.to_string()),
        })
    }

    /// Counts every call so validation tests can assert that no remote
    /// operation was reached.
    #[derive(Default)]
    pub struct MockLedger {
        pub balance_lamports: u64,
        pub checkpoint: Checkpoint,
        pub submitted_signature: Option<Signature>,
        pub fail_submit: bool,
        pub expire_confirmation: bool,
        pub signatures: Vec<String>,
        pub details: HashMap<String, Option<EncodedConfirmedTransactionWithStatusMeta>>,
        pub fail_detail_for: Option<String>,
        pub calls: AtomicUsize,
        pub submitted: Mutex<Option<Transaction>>,
    }

    impl MockLedger {
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record_call(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Ledger for MockLedger {
        async fn balance(&self, _address: &Pubkey) -> Result<u64, LedgerError> {
            self.record_call();
            Ok(self.balance_lamports)
        }

        async fn latest_checkpoint(&self) -> Result<Checkpoint, LedgerError> {
            self.record_call();
            Ok(self.checkpoint)
        }

        async fn submit(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
            self.record_call();
            if self.fail_submit {
                return Err(request_failed("submit rejected"));
            }
            *self.submitted.lock().unwrap() = Some(transaction.clone());
            Ok(self.submitted_signature.unwrap_or_default())
        }

        async fn confirm(
            &self,
            _signature: &Signature,
            checkpoint: &Checkpoint,
        ) -> Result<(), LedgerError> {
            self.record_call();
            if self.expire_confirmation {
                return Err(LedgerError::Expired(checkpoint.last_valid_block_height));
            }
            Ok(())
        }

        async fn recent_signatures(
            &self,
            _address: &Pubkey,
            limit: usize,
        ) -> Result<Vec<String>, LedgerError> {
            self.record_call();
            Ok(self.signatures.iter().take(limit).cloned().collect())
        }

        async fn transaction_detail(
            &self,
            signature: &str,
        ) -> Result<Option<EncodedConfirmedTransactionWithStatusMeta>, LedgerError> {
            self.record_call();
            if self.fail_detail_for.as_deref() == Some(signature) {
                return Err(request_failed("detail fetch failed"));
            }
            // `EncodedConfirmedTransactionWithStatusMeta` does not implement
            // `Clone`, so deep-copy the stored detail through its serde
            // representation to hand back an owned value.
            let detail = match self.details.get(signature) {
                Some(Some(detail)) => {
                    let value = serde_json::to_value(detail).unwrap();
                    Some(serde_json::from_value(value).unwrap())
                }
                _ => None,
            };
            Ok(detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_sol_trims_trailing_zeros() {
        assert_eq!(format_sol(1_000_000_000), "1");
        assert_eq!(format_sol(1_500_000_000), "1.5");
        assert_eq!(format_sol(1), "0.000000001");
        assert_eq!(format_sol(0), "0");
    }

    #[test]
    fn short_signature_truncates() {
        assert_eq!(short_signature("abcdefghijklmnop"), "abcdefghij...");
    }

    #[test]
    fn network_urls() {
        assert_eq!(Network::Devnet.rpc_url(), "https://api.devnet.solana.com");
        assert_eq!(
            Network::MainnetBeta.rpc_url(),
            "https://api.mainnet-beta.solana.com"
        );
        assert_eq!(
            Network::Devnet.explorer_tx_url("sig"),
            "https://explorer.solana.com/tx/sig?cluster=devnet"
        );
        assert_eq!(
            Network::MainnetBeta.explorer_tx_url("sig"),
            "https://explorer.solana.com/tx/sig"
        );
    }
}
