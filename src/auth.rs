//! Caller verification for the HTTP surface.
//!
//! Every mutating request carries the caller's Ed25519 public key and a
//! signature over a canonical command string. The public key must derive to
//! the claimed player address, so a valid signature proves control of that
//! address. The ledger itself never sees keys or signatures, only the
//! verified caller identity.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::escrow::rules::Move;

/// Prefix for ledger addresses derived from Ed25519 public keys.
pub const ADDRESS_PREFIX: &str = "RPS_";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid public key: {0}")]
    BadPublicKey(String),

    #[error("invalid secret key: {0}")]
    BadSecretKey(String),

    #[error("invalid signature encoding: {0}")]
    BadSignatureEncoding(String),

    #[error("signature verification failed")]
    BadSignature,

    #[error("public key derives to {derived}, not {claimed}")]
    AddressMismatch { derived: String, claimed: String },
}

// ============================================================================
// ADDRESS DERIVATION
// ============================================================================

/// Derive a ledger address from a hex-encoded Ed25519 public key:
/// `RPS_` + uppercase hex of the first 20 bytes of SHA-256(pubkey).
pub fn derive_address(pubkey_hex: &str) -> Result<String, AuthError> {
    let pubkey_bytes =
        hex::decode(pubkey_hex).map_err(|e| AuthError::BadPublicKey(e.to_string()))?;
    if pubkey_bytes.len() != 32 {
        return Err(AuthError::BadPublicKey(format!(
            "expected 32 bytes, got {}",
            pubkey_bytes.len()
        )));
    }

    let hash = Sha256::digest(&pubkey_bytes);
    Ok(format!(
        "{}{}",
        ADDRESS_PREFIX,
        hex::encode(&hash[..20]).to_uppercase()
    ))
}

// ============================================================================
// SIGNATURE VERIFICATION
// ============================================================================

/// Verify `signature_hex` over `message` against `pubkey_hex`.
pub fn verify_signature(
    pubkey_hex: &str,
    message: &[u8],
    signature_hex: &str,
) -> Result<(), AuthError> {
    let pubkey_bytes =
        hex::decode(pubkey_hex).map_err(|e| AuthError::BadPublicKey(e.to_string()))?;
    let pubkey_array: [u8; 32] = pubkey_bytes
        .try_into()
        .map_err(|_| AuthError::BadPublicKey("expected 32 bytes".to_string()))?;
    let verifying_key = VerifyingKey::from_bytes(&pubkey_array)
        .map_err(|e| AuthError::BadPublicKey(e.to_string()))?;

    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| AuthError::BadSignatureEncoding(e.to_string()))?;
    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| AuthError::BadSignatureEncoding("expected 64 bytes".to_string()))?;
    let signature = Signature::from_bytes(&sig_array);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| AuthError::BadSignature)
}

/// Verify a signed command from `claimed`: the public key must derive to the
/// claimed address and the signature must check out over `message`.
pub fn verify_caller(
    pubkey_hex: &str,
    claimed: &str,
    message: &str,
    signature_hex: &str,
) -> Result<(), AuthError> {
    let derived = derive_address(pubkey_hex)?;
    if derived != claimed {
        return Err(AuthError::AddressMismatch {
            derived,
            claimed: claimed.to_string(),
        });
    }
    verify_signature(pubkey_hex, message.as_bytes(), signature_hex)
}

// ============================================================================
// CANONICAL COMMAND STRINGS
// ============================================================================

pub fn enroll_message(player: &str, amount: u128) -> String {
    format!("ENROLL:{player}:{amount}")
}

pub fn refund_message(player: &str) -> String {
    format!("REFUND:{player}")
}

pub fn play_message(player_a: &str, move_a: Move, player_b: &str, move_b: Move) -> String {
    format!("PLAY:{player_a}:{move_a}:{player_b}:{move_b}")
}

pub fn withdraw_message(player: &str) -> String {
    format!("WITHDRAW:{player}")
}

// ============================================================================
// KEY TOOLING
// ============================================================================

/// Generate a fresh keypair as `(public_hex, secret_hex)`.
pub fn generate_keypair() -> (String, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    (
        hex::encode(signing_key.verifying_key().to_bytes()),
        hex::encode(signing_key.to_bytes()),
    )
}

/// Sign `message` with a hex-encoded secret key, returning the signature as
/// hex.
pub fn sign_message(secret_hex: &str, message: &str) -> Result<String, AuthError> {
    let secret_bytes =
        hex::decode(secret_hex).map_err(|e| AuthError::BadSecretKey(e.to_string()))?;
    let secret_array: [u8; 32] = secret_bytes
        .try_into()
        .map_err(|_| AuthError::BadSecretKey("expected 32 bytes".to_string()))?;
    let signing_key = SigningKey::from_bytes(&secret_array);
    Ok(hex::encode(signing_key.sign(message.as_bytes()).to_bytes()))
}
