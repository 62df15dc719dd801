use crate::canonical::{Canonical, CanonicalObject};
use crate::constants::{GENESIS_RECIPIENT, GENESIS_SENDER, REWARD_SENDER, REWARD_SIGNATURE};
use crate::error::{LedgerError, Result};
use crate::wallet::validate_address;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch, with sub-second precision.
pub fn now_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// A value transfer between two addresses.
///
/// `signature` is attached when the ledger admits the transaction and is
/// never part of the signed payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Transaction {
    /// A user transfer stamped with the current time.
    ///
    /// Rejects a zero amount and addresses that are not 40 lowercase hex chars.
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Result<Self> {
        let (from, to) = (from.into(), to.into());
        validate_address(&from)?;
        validate_address(&to)?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        Ok(Self {
            from,
            to,
            amount,
            timestamp: now_timestamp(),
            signature: None,
        })
    }

    /// Miner payout. Bypasses signature checks by construction.
    pub fn reward(to: impl Into<String>, amount: u64) -> Self {
        Self {
            from: REWARD_SENDER.to_string(),
            to: to.into(),
            amount,
            timestamp: now_timestamp(),
            signature: Some(REWARD_SIGNATURE.to_string()),
        }
    }

    pub(crate) fn genesis_seed() -> Self {
        Self {
            from: GENESIS_SENDER.to_string(),
            to: GENESIS_RECIPIENT.to_string(),
            amount: 0,
            timestamp: now_timestamp(),
            signature: None,
        }
    }

    /// Reward payouts carry a sentinel instead of a real signature.
    pub fn is_reward(&self) -> bool {
        self.signature.as_deref() == Some(REWARD_SIGNATURE)
    }

    /// Canonical encoding without the signature: the bytes a wallet signs.
    pub fn signing_payload(&self) -> String {
        self.encode(None)
    }

    fn encode(&self, signature: Option<&str>) -> String {
        let obj = CanonicalObject::new()
            .uint("amount", self.amount)
            .string("from", &self.from)
            .float("timestamp", self.timestamp)
            .string("to", &self.to);
        let obj = match signature {
            Some(sig) => obj.string("signature", sig),
            None => obj,
        };
        obj.finish()
    }
}

impl Canonical for Transaction {
    fn canonical_json(&self) -> String {
        self.encode(self.signature.as_deref())
    }
}
