//! Transaction History
//!
//! Derives display records from parsed ledger transactions. A record is one
//! native-asset transfer instruction; a single transaction can therefore
//! yield zero, one, or several records. Listing is all-or-nothing: any fetch
//! failure aborts with one error and no partial table is shown.

use chrono::{DateTime, Utc};
use serde_json::Value;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiInstruction, UiMessage,
    UiParsedInstruction,
};

use super::{Ledger, LedgerError};

/// How many signatures a history refresh requests. One detail fetch follows
/// per signature (N+1), which is acceptable at this size.
pub const HISTORY_LIMIT: usize = 10;

/// What a single instruction turned out to be once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    /// A native transfer through the system program.
    SystemTransfer { lamports: u64 },
    /// Parsed, but some other program or some other system operation.
    OtherProgram,
    /// Raw or only partially decoded; nothing to scan.
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::Failed => "Failed",
        }
    }
}

/// One native-asset transfer, derived read-only from ledger data.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    pub signature: String,
    pub amount_sol: f64,
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
}

/// Classifies one parsed instruction. Matched exhaustively so a new
/// instruction shape cannot silently fall through.
pub fn classify_instruction(instruction: &UiInstruction) -> InstructionKind {
    match instruction {
        UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => {
            if parsed.program_id != system_program::id().to_string() {
                return InstructionKind::OtherProgram;
            }
            let kind = parsed.parsed.get("type").and_then(Value::as_str);
            let lamports = parsed
                .parsed
                .pointer("/info/lamports")
                .and_then(Value::as_u64);
            match (kind, lamports) {
                (Some("transfer"), Some(lamports)) => InstructionKind::SystemTransfer { lamports },
                _ => InstructionKind::OtherProgram,
            }
        }
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(_)) => InstructionKind::Opaque,
        UiInstruction::Compiled(_) => InstructionKind::Opaque,
    }
}

/// Scans a transaction's instruction list for native transfers.
pub fn extract_transfer_records(
    signature: &str,
    detail: &EncodedConfirmedTransactionWithStatusMeta,
) -> Vec<TransferRecord> {
    let Some(meta) = &detail.transaction.meta else {
        return Vec::new();
    };
    let EncodedTransaction::Json(transaction) = &detail.transaction.transaction else {
        return Vec::new();
    };
    let UiMessage::Parsed(message) = &transaction.message else {
        return Vec::new();
    };

    let outcome = if meta.err.is_some() {
        Outcome::Failed
    } else {
        Outcome::Success
    };
    let timestamp = detail
        .block_time
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    message
        .instructions
        .iter()
        .filter_map(|instruction| match classify_instruction(instruction) {
            InstructionKind::SystemTransfer { lamports } => Some(TransferRecord {
                signature: signature.to_string(),
                amount_sol: lamports as f64 / LAMPORTS_PER_SOL as f64,
                timestamp,
                outcome,
            }),
            InstructionKind::OtherProgram | InstructionKind::Opaque => None,
        })
        .collect()
}

/// Fetches the recent transfer records for `address`, newest first. A
/// signature whose detail the node no longer retains is skipped; any fetch
/// error aborts the whole listing.
pub async fn load_recent_transfers<L>(
    ledger: &L,
    address: &Pubkey,
    limit: usize,
) -> Result<Vec<TransferRecord>, LedgerError>
where
    L: Ledger + Sync,
{
    let signatures = ledger.recent_signatures(address, limit).await?;
    let mut records = Vec::new();
    for signature in signatures {
        if let Some(detail) = ledger.transaction_detail(&signature).await? {
            records.extend(extract_transfer_records(&signature, &detail));
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testing::MockLedger;
    use serde_json::json;

    fn transfer_instruction(lamports: u64) -> Value {
        json!({
            "program": "system",
            "programId": system_program::id().to_string(),
            "parsed": {
                "type": "transfer",
                "info": {
                    "source": Pubkey::new_unique().to_string(),
                    "destination": Pubkey::new_unique().to_string(),
                    "lamports": lamports,
                }
            },
            "stackHeight": null,
        })
    }

    fn detail_from_json(
        err: Value,
        status: Value,
        block_time: Value,
        instructions: Value,
    ) -> EncodedConfirmedTransactionWithStatusMeta {
        // `EncodedConfirmedTransactionWithStatusMeta` flattens its inner
        // `EncodedTransactionWithStatusMeta`, so `transaction`/`meta`/`version`
        // sit at the top level alongside `slot` and `blockTime`.
        serde_json::from_value(json!({
            "slot": 4242,
            "blockTime": block_time,
            "transaction": {
                "signatures": ["1111111111111111111111111111111111111111111111111111111111111111"],
                "message": {
                    "accountKeys": [{
                        "pubkey": Pubkey::new_unique().to_string(),
                        "writable": true,
                        "signer": true,
                        "source": "transaction",
                    }],
                    "recentBlockhash": "11111111111111111111111111111111",
                    "instructions": instructions,
                    "addressTableLookups": null,
                }
            },
            "meta": {
                "err": err,
                "status": status,
                "fee": 5000,
                "preBalances": [10_000_000_000u64, 0],
                "postBalances": [8_999_995_000u64, 1_000_000_000],
                "innerInstructions": null,
                "logMessages": null,
                "preTokenBalances": null,
                "postTokenBalances": null,
                "rewards": null,
                "loadedAddresses": null,
                "returnData": null,
                "computeUnitsConsumed": null,
            },
            "version": null,
        }))
        .expect("detail fixture deserializes")
    }

    #[test]
    fn classifies_system_transfer() {
        let instruction: UiInstruction =
            serde_json::from_value(transfer_instruction(1_000_000_000)).unwrap();
        assert_eq!(
            classify_instruction(&instruction),
            InstructionKind::SystemTransfer {
                lamports: 1_000_000_000
            }
        );
    }

    #[test]
    fn classifies_other_system_operation() {
        let instruction: UiInstruction = serde_json::from_value(json!({
            "program": "system",
            "programId": system_program::id().to_string(),
            "parsed": {
                "type": "createAccount",
                "info": { "lamports": 42u64 }
            },
            "stackHeight": null,
        }))
        .unwrap();
        assert_eq!(classify_instruction(&instruction), InstructionKind::OtherProgram);
    }

    #[test]
    fn classifies_foreign_program() {
        let instruction: UiInstruction = serde_json::from_value(json!({
            "program": "spl-token",
            "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "parsed": {
                "type": "transfer",
                "info": { "lamports": 7u64 }
            },
            "stackHeight": null,
        }))
        .unwrap();
        assert_eq!(classify_instruction(&instruction), InstructionKind::OtherProgram);
    }

    #[test]
    fn classifies_opaque_instructions() {
        let compiled: UiInstruction = serde_json::from_value(json!({
            "programIdIndex": 2,
            "accounts": [0, 1],
            "data": "3Bxs4h24hBtQy9rw",
            "stackHeight": null,
        }))
        .unwrap();
        assert_eq!(classify_instruction(&compiled), InstructionKind::Opaque);

        let partially_decoded: UiInstruction = serde_json::from_value(json!({
            "programId": Pubkey::new_unique().to_string(),
            "accounts": [Pubkey::new_unique().to_string()],
            "data": "3Bxs4h24hBtQy9rw",
            "stackHeight": null,
        }))
        .unwrap();
        assert_eq!(classify_instruction(&partially_decoded), InstructionKind::Opaque);
    }

    #[test]
    fn two_transfers_yield_two_records_with_shared_timestamp() {
        let detail = detail_from_json(
            json!(null),
            json!({ "Ok": null }),
            json!(1_700_000_000i64),
            json!([
                transfer_instruction(1_000_000_000),
                transfer_instruction(250_000_000),
            ]),
        );
        let records = extract_transfer_records("sigA", &detail);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount_sol, 1.0);
        assert_eq!(records[1].amount_sol, 0.25);
        assert_eq!(records[0].timestamp, records[1].timestamp);
        assert_eq!(records[0].timestamp.timestamp(), 1_700_000_000);
        assert!(records.iter().all(|r| r.outcome == Outcome::Success));
        assert!(records.iter().all(|r| r.signature == "sigA"));
    }

    #[test]
    fn errored_meta_marks_records_failed() {
        let detail = detail_from_json(
            json!("AccountNotFound"),
            json!({ "Err": "AccountNotFound" }),
            json!(1_700_000_000i64),
            json!([transfer_instruction(5_000_000)]),
        );
        let records = extract_transfer_records("sigB", &detail);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, Outcome::Failed);
    }

    #[test]
    fn missing_block_time_defaults_to_now() {
        let before = Utc::now();
        let detail = detail_from_json(
            json!(null),
            json!({ "Ok": null }),
            json!(null),
            json!([transfer_instruction(1)]),
        );
        let records = extract_transfer_records("sigC", &detail);
        assert_eq!(records.len(), 1);
        assert!(records[0].timestamp >= before);
    }

    #[test]
    fn non_transfer_instructions_yield_no_records() {
        let detail = detail_from_json(
            json!(null),
            json!({ "Ok": null }),
            json!(1_700_000_000i64),
            json!([{
                "programIdIndex": 2,
                "accounts": [0, 1],
                "data": "3Bxs4h24hBtQy9rw",
                "stackHeight": null,
            }]),
        );
        assert!(extract_transfer_records("sigD", &detail).is_empty());
    }

    #[tokio::test]
    async fn listing_skips_unretained_details() {
        let mut ledger = MockLedger::default();
        ledger.signatures = vec!["kept".to_string(), "dropped".to_string()];
        ledger.details.insert(
            "kept".to_string(),
            Some(detail_from_json(
                json!(null),
                json!({ "Ok": null }),
                json!(1_700_000_000i64),
                json!([transfer_instruction(1_000_000_000)]),
            )),
        );
        ledger.details.insert("dropped".to_string(), None);

        let records = load_recent_transfers(&ledger, &Pubkey::new_unique(), HISTORY_LIMIT)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].signature, "kept");
    }

    #[tokio::test]
    async fn listing_aborts_on_fetch_error() {
        let mut ledger = MockLedger::default();
        ledger.signatures = vec!["good".to_string(), "bad".to_string()];
        ledger.details.insert(
            "good".to_string(),
            Some(detail_from_json(
                json!(null),
                json!({ "Ok": null }),
                json!(1_700_000_000i64),
                json!([transfer_instruction(1_000_000_000)]),
            )),
        );
        ledger.fail_detail_for = Some("bad".to_string());

        let result = load_recent_transfers(&ledger, &Pubkey::new_unique(), HISTORY_LIMIT).await;
        assert!(result.is_err());
    }
}
