//! Local storage of prepared bids.
//!
//! Bidders must keep every secret until the reveal window, and must reveal in
//! submission order. The vault records both in a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use thiserror::Error;

use auction_types::Address;

use crate::bid::PreparedBid;
use crate::reveal::RevealBatch;

/// Errors raised by the bid vault.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Vault I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed vault file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Prepared bids per bidder, in submission order.
#[serde_as]
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BidVault {
    #[serde(skip)]
    path: PathBuf,

    #[serde_as(as = "BTreeMap<Hex, _>")]
    bids: BTreeMap<Address, Vec<PreparedBid>>,
}

impl BidVault {
    /// Open a vault file, starting empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        let path = path.as_ref().to_path_buf();
        let mut vault = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_json::from_str::<Self>(&data)?
        } else {
            Self::default()
        };
        vault.path = path;
        Ok(vault)
    }

    /// Write the vault back to its file.
    pub fn save(&self) -> Result<(), VaultError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a bid once the chain accepted it at `index`.
    ///
    /// Entries are kept by position so a later reveal lines up with the
    /// engine's per-bidder list.
    pub fn record(&mut self, bidder: Address, index: u32, bid: PreparedBid) {
        let bids = self.bids.entry(bidder).or_default();
        let index = index as usize;
        if index < bids.len() {
            bids[index] = bid;
        } else {
            bids.push(bid);
        }
    }

    /// Prepared bids of a bidder.
    pub fn bids_for(&self, bidder: &Address) -> &[PreparedBid] {
        self.bids.get(bidder).map(Vec::as_slice).unwrap_or_default()
    }

    /// Reveal batch covering every recorded bid of a bidder.
    pub fn reveal_batch(&self, bidder: &Address) -> RevealBatch {
        RevealBatch::from_prepared(self.bids_for(bidder))
    }

    /// Forget a bidder's bids.
    pub fn clear(&mut self, bidder: &Address) -> Vec<PreparedBid> {
        self.bids.remove(bidder).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid::BidBuilder;
    use auction_types::{Secret, ONE_COIN};
    use rand::rngs::OsRng;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("auction-vault-{}-{}.json", std::process::id(), name))
    }

    #[test]
    fn test_vault_persists_bids_in_order() {
        let path = temp_path("persist");
        let bidder = [5u8; 32];
        let mut rng = OsRng;

        let first = BidBuilder::new(ONE_COIN).build(&mut rng).unwrap();
        let second = BidBuilder::new(ONE_COIN)
            .fake(true)
            .secret(Secret::from_label("decoy").unwrap())
            .build(&mut rng)
            .unwrap();

        let mut vault = BidVault::open(&path).unwrap();
        vault.record(bidder, 0, first.clone());
        vault.record(bidder, 1, second.clone());
        vault.save().unwrap();

        let reopened = BidVault::open(&path).unwrap();
        assert_eq!(reopened.bids_for(&bidder), &[first.clone(), second]);

        let batch = reopened.reveal_batch(&bidder);
        assert_eq!(batch.fakes, vec![false, true]);
        assert_eq!(batch.secrets[0], first.secret);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_vault_is_empty() {
        let vault = BidVault::open(temp_path("missing")).unwrap();
        assert!(vault.bids_for(&[1u8; 32]).is_empty());
        assert!(vault.reveal_batch(&[1u8; 32]).is_empty());
    }

    #[test]
    fn test_malformed_vault() {
        let path = temp_path("malformed");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(BidVault::open(&path), Err(VaultError::Malformed(_))));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_clear() {
        let mut vault = BidVault::default();
        let bidder = [9u8; 32];
        let bid = BidBuilder::new(ONE_COIN).build(&mut OsRng).unwrap();
        vault.record(bidder, 0, bid);

        assert_eq!(vault.clear(&bidder).len(), 1);
        assert!(vault.bids_for(&bidder).is_empty());
    }
}
