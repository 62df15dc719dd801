//! Ed25519 keypairs, addresses and transaction signatures.

use crate::constants::ADDRESS_HEX_SIZE;
use crate::error::{LedgerError, Result};
use crate::hash::sha256_hex;
use crate::transaction::Transaction;
use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex-encoded detached signature over a transaction's signing payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The verifying half of a wallet, handed to whoever checks its signatures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|e| LedgerError::InvalidPublicKey(e.to_string()))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// First 40 hex chars of SHA-256 over the encoded key.
    pub fn address(&self) -> String {
        let mut digest = sha256_hex(self.0.as_bytes());
        digest.truncate(ADDRESS_HEX_SIZE);
        digest
    }

    /// Check `signature` over `tx`'s signing payload.
    ///
    /// Any malformed signature, wrong key or altered payload yields `false`.
    pub fn verify(&self, tx: &Transaction, signature: &Signature) -> bool {
        let Ok(bytes) = hex::decode(signature.as_str()) else {
            return false;
        };
        let Ok(sig) = Ed25519Signature::from_slice(&bytes) else {
            return false;
        };
        self.0.verify(tx.signing_payload().as_bytes(), &sig).is_ok()
    }
}

/// Check that `address` has the shape produced by [`PublicKey::address`].
pub fn validate_address(address: &str) -> Result<()> {
    let well_formed = address.len() == ADDRESS_HEX_SIZE
        && address
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if well_formed {
        Ok(())
    } else {
        Err(LedgerError::InvalidAddress(address.to_string()))
    }
}

/// Owns a keypair. The secret key never leaves the wallet.
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    public_key: PublicKey,
    address: String,
}

impl Wallet {
    /// Fresh keypair from OS entropy.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(secret))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = PublicKey(signing_key.verifying_key());
        let address = public_key.address();
        Self {
            signing_key,
            public_key,
            address,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Sign `tx`'s canonical payload. An attached signature is ignored.
    pub fn sign(&self, tx: &Transaction) -> Signature {
        let sig = self.signing_key.sign(tx.signing_payload().as_bytes());
        Signature(hex::encode(sig.to_bytes()))
    }

    /// Same as [`PublicKey::verify`], against an arbitrary key.
    pub fn verify(tx: &Transaction, signature: &Signature, public_key: &PublicKey) -> bool {
        public_key.verify(tx, signature)
    }

    /// Build a transfer from this wallet and sign it.
    pub fn transfer(&self, to: &str, amount: u64) -> Result<(Transaction, Signature)> {
        let tx = Transaction::new(self.address.clone(), to, amount)?;
        let sig = self.sign(&tx);
        Ok((tx, sig))
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
