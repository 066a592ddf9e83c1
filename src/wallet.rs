//! Wallet session seam. Key material stays behind this trait; the
//! submission flow only ever sees a public key and a sign-and-submit
//! operation.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;

use crate::ledger::{Checkpoint, Ledger};

/// An externally supplied signing capability: a connected flag, a public
/// address, and a sign-and-submit operation.
#[async_trait]
pub trait WalletSession {
    fn is_connected(&self) -> bool;

    fn public_key(&self) -> Option<Pubkey>;

    /// Signs `transaction` against the checkpoint's blockhash and submits it
    /// through `ledger`. Returns the transaction signature on acceptance.
    async fn sign_and_send<L>(
        &self,
        ledger: &L,
        transaction: Transaction,
        checkpoint: &Checkpoint,
    ) -> Result<Signature>
    where
        L: Ledger + Sync;
}

/// Wallet backed by a Solana CLI keypair file.
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn from_file(path: &Path) -> Result<Self> {
        let keypair = read_keypair_file(path)
            .map_err(|err| anyhow!("failed to read keypair {}: {}", path.display(), err))?;
        Ok(Self { keypair })
    }

    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

#[async_trait]
impl WalletSession for KeypairWallet {
    fn is_connected(&self) -> bool {
        true
    }

    fn public_key(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    async fn sign_and_send<L>(
        &self,
        ledger: &L,
        mut transaction: Transaction,
        checkpoint: &Checkpoint,
    ) -> Result<Signature>
    where
        L: Ledger + Sync,
    {
        transaction.try_sign(&[&self.keypair], checkpoint.blockhash)?;
        Ok(ledger.submit(&transaction).await?)
    }
}

/// The Solana CLI's default keypair location, when `$HOME` is known.
pub fn default_keypair_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(".config").join("solana").join("id.json"))
}
