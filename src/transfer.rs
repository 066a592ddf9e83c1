//! Transfer Submission
//!
//! Validates user-entered recipient and amount, anchors the transaction to
//! a fresh ledger checkpoint, hands it to the wallet session for signing,
//! and polls for confirmation. The flow always reaches a terminal status;
//! it never parks in `Sending`.

use std::str::FromStr;

use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use thiserror::Error;

use crate::ledger::{Checkpoint, Ledger, LedgerError};
use crate::wallet::WalletSession;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Wallet not connected")]
    NotConnected,
    #[error("Invalid recipient address")]
    InvalidRecipient,
    #[error("Invalid amount")]
    InvalidAmount,
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    #[error("{0}")]
    Wallet(anyhow::Error),
}

/// Linear submission state machine; it never branches back.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Sending,
    Sent(Signature),
    Confirmed(Signature),
    Failed(String),
}

impl SubmissionStatus {
    /// While a submission is in flight the submit control stays disabled.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SubmissionStatus::Sending | SubmissionStatus::Sent(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Confirmed(_) | SubmissionStatus::Failed(_)
        )
    }

    /// User-facing status line, `None` while idle.
    pub fn message(&self) -> Option<String> {
        match self {
            SubmissionStatus::Idle => None,
            SubmissionStatus::Sending => Some("Sending transaction...".to_string()),
            SubmissionStatus::Sent(signature) => {
                Some(format!("Transaction sent: {}", signature))
            }
            SubmissionStatus::Confirmed(signature) => {
                Some(format!("Transaction confirmed: {}", signature))
            }
            SubmissionStatus::Failed(message) => Some(message.clone()),
        }
    }
}

/// Parses user input into a ledger address, enforcing the base58 encoding
/// rules.
pub fn parse_recipient(input: &str) -> Result<Pubkey, TransferError> {
    Pubkey::from_str(input.trim()).map_err(|_| TransferError::InvalidRecipient)
}

/// Converts a decimal SOL string into lamports. The scaled value must be a
/// finite positive number.
pub fn parse_amount_sol(input: &str) -> Result<u64, TransferError> {
    let sol: f64 = input
        .trim()
        .parse()
        .map_err(|_| TransferError::InvalidAmount)?;
    let lamports = sol * LAMPORTS_PER_SOL as f64;
    if !lamports.is_finite() || lamports <= 0.0 {
        return Err(TransferError::InvalidAmount);
    }
    Ok(lamports.round() as u64)
}

/// Builds the single-instruction transfer with the sender as fee payer,
/// anchored to the checkpoint's blockhash.
pub fn build_transfer_tx(
    sender: &Pubkey,
    recipient: &Pubkey,
    lamports: u64,
    checkpoint: &Checkpoint,
) -> Transaction {
    let instruction = system_instruction::transfer(sender, recipient, lamports);
    let mut transaction = Transaction::new_with_payer(&[instruction], Some(sender));
    transaction.message.recent_blockhash = checkpoint.blockhash;
    transaction
}

/// Runs the whole submission flow and returns a terminal status. `progress`
/// observes the intermediate transitions (`Sending`, then `Sent` once the
/// ledger accepts the transaction). Validation failures return `Failed`
/// before any ledger operation runs.
pub async fn submit_transfer<L, W, F>(
    ledger: &L,
    session: Option<&W>,
    recipient: &str,
    amount: &str,
    mut progress: F,
) -> SubmissionStatus
where
    L: Ledger + Sync,
    W: WalletSession + Sync,
    F: FnMut(&SubmissionStatus),
{
    let wallet = match session {
        Some(wallet) if wallet.is_connected() => wallet,
        _ => return SubmissionStatus::Failed(TransferError::NotConnected.to_string()),
    };
    let sender = match wallet.public_key() {
        Some(key) => key,
        None => return SubmissionStatus::Failed(TransferError::NotConnected.to_string()),
    };
    let recipient = match parse_recipient(recipient) {
        Ok(address) => address,
        Err(err) => return SubmissionStatus::Failed(err.to_string()),
    };
    let lamports = match parse_amount_sol(amount) {
        Ok(lamports) => lamports,
        Err(err) => return SubmissionStatus::Failed(err.to_string()),
    };

    progress(&SubmissionStatus::Sending);

    match drive_submission(ledger, wallet, &sender, &recipient, lamports, &mut progress).await {
        Ok(signature) => SubmissionStatus::Confirmed(signature),
        Err(err) => SubmissionStatus::Failed(format!("Transaction failed: {}", err)),
    }
}

/// Everything past the `Sending` transition. The checkpoint is fetched
/// before the transaction is built so the transaction always carries its
/// validity anchor; confirmation reuses the same checkpoint to detect
/// expiry instead of waiting indefinitely.
async fn drive_submission<L, W, F>(
    ledger: &L,
    wallet: &W,
    sender: &Pubkey,
    recipient: &Pubkey,
    lamports: u64,
    progress: &mut F,
) -> Result<Signature, TransferError>
where
    L: Ledger + Sync,
    W: WalletSession + Sync,
    F: FnMut(&SubmissionStatus),
{
    let checkpoint = ledger.latest_checkpoint().await?;
    let transaction = build_transfer_tx(sender, recipient, lamports, &checkpoint);
    let signature = wallet
        .sign_and_send(ledger, transaction, &checkpoint)
        .await
        .map_err(TransferError::Wallet)?;
    progress(&SubmissionStatus::Sent(signature));
    ledger.confirm(&signature, &checkpoint).await?;
    Ok(signature)
}
