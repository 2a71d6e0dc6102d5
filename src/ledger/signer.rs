//! Legacy (EIP-155) ERC-20 transfer signing

use std::str::FromStr;

use alloy_primitives::{hex, keccak256, Address, Bytes, U256};
use alloy_rlp::{BufMut, Encodable, Header};
use anyhow::{anyhow, bail, Context, Result};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use super::{SignedTransaction, TransferRequest};

/// `transfer(address,uint256)` selector
const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

struct LegacyTransaction {
    nonce: u64,
    gas_price: U256,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    chain_id: u64,
}

impl LegacyTransaction {
    fn fields_length(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.to.length()
            + self.value.length()
            + self.data.length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.data.encode(out);
    }

    /// RLP of `[nonce, gasPrice, gas, to, value, data, chainId, 0, 0]`
    fn encode_for_signing(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.fields_length() + self.chain_id.length() + 2 * 0u8.length(),
        }
        .encode(out);
        self.encode_fields(out);
        self.chain_id.encode(out);
        0u8.encode(out);
        0u8.encode(out);
    }

    /// RLP of `[nonce, gasPrice, gas, to, value, data, v, r, s]`
    fn encode_signed(&self, v: u64, r: U256, s: U256, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.fields_length() + v.length() + r.length() + s.length(),
        }
        .encode(out);
        self.encode_fields(out);
        v.encode(out);
        r.encode(out);
        s.encode(out);
    }
}

fn parse_address(raw: &str, field: &str) -> Result<Address> {
    Address::from_str(raw.trim()).map_err(|e| anyhow!("invalid {} address {}: {}", field, raw, e))
}

fn parse_signing_key(raw: &str) -> Result<SigningKey> {
    let trimmed = raw.trim();
    let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
        .context("private key must be hex")?;
    SigningKey::from_slice(&bytes).map_err(|_| anyhow!("private key is not a valid secp256k1 scalar"))
}

fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().as_affine().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Address controlled by a hex private key
pub fn address_from_private_key(private_key: &str) -> Result<Address> {
    Ok(address_of(&parse_signing_key(private_key)?))
}

/// ABI-encoded call data for `transfer(to, amount)`
pub fn transfer_calldata(to: Address, amount: u128) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&TRANSFER_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(to.as_slice());
    data.extend_from_slice(&U256::from(amount).to_be_bytes::<32>());
    data
}

/// Build and sign an ERC-20 transfer as a legacy EIP-155 transaction
///
/// The key must control `request.from`.
pub fn sign_erc20_transfer(request: &TransferRequest) -> Result<SignedTransaction> {
    let token = parse_address(&request.token, "token")?;
    let from = parse_address(&request.from, "source")?;
    let to = parse_address(&request.to, "target")?;
    let key = parse_signing_key(&request.private_key)?;

    let signer = address_of(&key);
    if signer != from {
        bail!("private key controls {}, not source {}", signer, from);
    }

    let tx = LegacyTransaction {
        nonce: request.nonce,
        gas_price: U256::from(request.gas_price),
        gas_limit: request.gas_limit,
        to: token,
        value: U256::ZERO,
        data: Bytes::from(transfer_calldata(to, request.amount)),
        chain_id: request.chain_id,
    };

    let mut unsigned = Vec::new();
    tx.encode_for_signing(&mut unsigned);
    let sighash = keccak256(&unsigned);

    let (signature, recovery_id) = key
        .sign_prehash_recoverable(sighash.as_slice())
        .map_err(|e| anyhow!("signing failed: {}", e))?;
    let signature_bytes = signature.to_bytes();
    let r = U256::from_be_slice(&signature_bytes[..32]);
    let s = U256::from_be_slice(&signature_bytes[32..]);
    let v = eip155_v(request.chain_id, recovery_id.to_byte())?;

    let mut raw = Vec::new();
    tx.encode_signed(v, r, s, &mut raw);
    let hash = hex::encode_prefixed(keccak256(&raw));

    Ok(SignedTransaction { raw, hash })
}

/// `v = chain_id * 2 + 35 + recovery_id`
fn eip155_v(chain_id: u64, recovery_id: u8) -> Result<u64> {
    chain_id
        .checked_mul(2)
        .and_then(|doubled| doubled.checked_add(35 + u64::from(recovery_id)))
        .ok_or_else(|| anyhow!("chain id {} is too large for EIP-155", chain_id))
}
