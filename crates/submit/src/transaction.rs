//! Transaction assembly and signing.
//!
//! A submission is a legacy ledger message with exactly one instruction:
//!
//! ```text
//! program_id  <- target program
//! accounts    <- [state_account (writable)]
//! data        <- proof bytes, unmodified
//! ```
//!
//! The fee payer is the credential's public key, which is also the only signer.

use solana_program::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    short_vec::ShortU16,
};

use crate::{
    artifact::ProofArtifact,
    credential::Credential,
    error::{Result, SubmitError},
};

/// Largest serialized transaction the ledger accepts: an IPv6 MTU minus headers.
pub const PACKET_DATA_SIZE: usize = 1280 - 40 - 8;

/// Largest proof that fits when payer, state account and program are distinct.
pub const MAX_PROOF_LEN: usize = 1029;

/// Length of an ed25519 signature.
const SIGNATURE_LENGTH: usize = 64;

/// Everything needed to build one transaction. Rebuilt for every attempt.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionRequest<'a> {
    pub proof: &'a ProofArtifact,
    pub program_id: Pubkey,
    pub state_account: Pubkey,
    pub credential: &'a Credential,
}

/// Recent chain state a transaction is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockReference {
    pub blockhash: Hash,
    /// Transactions using `blockhash` are dropped once the chain passes this height.
    pub last_valid_block_height: u64,
    /// Slot the reference was observed at.
    pub slot: u64,
}

/// Unsigned transaction carrying a proof.
#[derive(Debug, Clone)]
pub struct Transaction {
    message: Message,
    message_bytes: Vec<u8>,
    block_reference: BlockReference,
}

impl Transaction {
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn block_reference(&self) -> &BlockReference {
        &self.block_reference
    }

    /// Data of the single instruction, i.e. the proof bytes.
    pub fn instruction_data(&self) -> &[u8] {
        self.message
            .instructions
            .first()
            .map(|ix| ix.data.as_slice())
            .unwrap_or_default()
    }

    /// The account paying fees; always the first account key.
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.message.account_keys.first()
    }
}

/// Transaction with its fee payer signature attached.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    signature: [u8; SIGNATURE_LENGTH],
    wire: Vec<u8>,
    transaction: Transaction,
}

impl SignedTransaction {
    /// Transaction id: the base58 fee payer signature.
    pub fn id(&self) -> String {
        bs58::encode(self.signature).into_string()
    }

    pub fn signature(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.signature
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Ledger wire format: signature count, signatures, message.
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }
}

/// Assembles the proof-carrying transaction for `request` against `block_reference`.
///
/// Fails with [`SubmitError::Encoding`] when the signed transaction would not fit
/// in a single packet.
pub fn build_transaction(
    request: &SubmissionRequest<'_>,
    block_reference: &BlockReference,
) -> Result<Transaction> {
    let instruction = Instruction::new_with_bytes(
        request.program_id,
        request.proof.as_bytes(),
        vec![AccountMeta::new(request.state_account, false)],
    );
    let payer = request.credential.pubkey();
    let message =
        Message::new_with_blockhash(&[instruction], Some(&payer), &block_reference.blockhash);
    let message_bytes = message.serialize();

    let signatures = message.header.num_required_signatures;
    let size = signature_count(signatures)?.len()
        + usize::from(signatures) * SIGNATURE_LENGTH
        + message_bytes.len();
    if size > PACKET_DATA_SIZE {
        return Err(SubmitError::Encoding {
            size,
            limit: PACKET_DATA_SIZE,
        });
    }

    Ok(Transaction {
        message,
        message_bytes,
        block_reference: *block_reference,
    })
}

/// Signs `transaction` with `credential`, which must be its fee payer.
pub fn sign(transaction: Transaction, credential: &Credential) -> Result<SignedTransaction> {
    let signer = credential.pubkey();
    match transaction.fee_payer() {
        Some(payer) if *payer == signer => {}
        Some(payer) => {
            return Err(SubmitError::Signing(format!(
                "credential {signer} is not the fee payer {payer}"
            )));
        }
        None => return Err(SubmitError::Signing("transaction has no fee payer".to_string())),
    }

    let signature = credential.sign(&transaction.message_bytes);

    let mut wire = signature_count(1)?;
    wire.reserve(SIGNATURE_LENGTH + transaction.message_bytes.len());
    wire.extend_from_slice(&signature);
    wire.extend_from_slice(&transaction.message_bytes);

    Ok(SignedTransaction {
        signature,
        wire,
        transaction,
    })
}

/// Signature count prefix in the ledger's compact-u16 encoding.
fn signature_count(count: u8) -> Result<Vec<u8>> {
    Ok(bincode::serialize(&ShortU16(u16::from(count)))?)
}
