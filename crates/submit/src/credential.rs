//! Signing credential backed by an ed25519 keypair file.

use std::{fmt, path::Path};

use ed25519_dalek::{Signer, SigningKey};
use solana_program::pubkey::Pubkey;

use crate::error::{Result, SubmitError};

/// Length of a keypair file: 32 secret bytes followed by 32 public bytes.
const KEYPAIR_LENGTH: usize = 64;

/// Fee payer and signer of submitted transactions.
pub struct Credential {
    signing_key: SigningKey,
}

impl Credential {
    /// Builds a credential from a 32-byte ed25519 secret key.
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Builds a credential from 64 keypair bytes, checking that the public half
    /// matches the secret half.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; KEYPAIR_LENGTH] = bytes.try_into().map_err(|_| {
            SubmitError::Signing(format!(
                "keypair must be {KEYPAIR_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|e| SubmitError::Signing(format!("invalid keypair: {e}")))?;
        Ok(Self { signing_key })
    }

    /// Loads a keypair file written by the Solana CLI: a JSON array of 64 integers.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SubmitError::Signing(format!(
                "failed to read keypair file '{}': {e}",
                path.display()
            ))
        })?;
        let bytes: Vec<u8> = serde_json::from_str(&content).map_err(|e| {
            SubmitError::Signing(format!(
                "malformed keypair file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_keypair_bytes(&bytes)
    }

    /// Serializes the keypair in the Solana CLI file format.
    pub fn to_keypair_json(&self) -> String {
        serde_json::Value::from(self.signing_key.to_keypair_bytes().to_vec()).to_string()
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing_key.verifying_key().to_bytes())
    }

    pub(crate) fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
