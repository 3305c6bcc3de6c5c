// axlscan core: bech32 address derivation
// The staking module only hands out operator addresses and consensus
// public keys. Account and consensus addresses are derived from them so a
// validator record does not depend on the CLI proxy or a profile entry.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bech32::{Bech32, Hrp};
use log::debug;
use sha2::{Digest, Sha256};

use crate::atoms::constants::{ACCOUNT_PREFIX, CONSENSUS_PREFIX};

/// Length of an ed25519 public key.
const ED25519_KEY_LEN: usize = 32;

/// Tendermint addresses are the first 20 bytes of sha256(pubkey).
const ADDRESS_LEN: usize = 20;

/// Re-encode the payload of a bech32 address under another prefix.
pub fn convert_prefix(address: &str, prefix: &str) -> Option<String> {
    let (_, data) = bech32::decode(address.trim())
        .map_err(|e| debug!("[address] cannot decode '{}': {}", address, e))
        .ok()?;
    let hrp = Hrp::parse(prefix).ok()?;
    bech32::encode::<Bech32>(hrp, &data).ok()
}

/// Account (delegator) address of a validator operator.
pub fn operator_to_account(operator_address: &str) -> Option<String> {
    convert_prefix(operator_address, ACCOUNT_PREFIX)
}

/// Consensus address of a base64 ed25519 consensus public key.
/// Other key types yield `None`.
pub fn consensus_address(pubkey_base64: &str) -> Option<String> {
    let key = STANDARD.decode(pubkey_base64.trim()).ok()?;
    if key.len() != ED25519_KEY_LEN {
        return None;
    }
    let digest = Sha256::digest(&key);
    let hrp = Hrp::parse(CONSENSUS_PREFIX).ok()?;
    bech32::encode::<Bech32>(hrp, &digest[..ADDRESS_LEN]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::constants::OPERATOR_PREFIX;

    const OPERATOR: &str = "axelarvaloper1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5mdvnlj";
    const ACCOUNT: &str = "axelar1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5mv6kda";

    #[test]
    fn operator_maps_to_account() {
        assert_eq!(operator_to_account(OPERATOR).as_deref(), Some(ACCOUNT));
        assert_eq!(convert_prefix(ACCOUNT, OPERATOR_PREFIX).as_deref(), Some(OPERATOR));
        assert_eq!(operator_to_account("axelarvaloper1notbech32"), None);
    }

    #[test]
    fn consensus_address_from_pubkey() {
        assert_eq!(
            consensus_address("AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyA=").as_deref(),
            Some("axelarvalcons14cskcth4y3ar0qkpxhh6y7drunxuvyy5mfr9ud")
        );
        // Not base64, and a 33-byte secp256k1-sized key.
        assert_eq!(consensus_address("pk-big"), None);
        assert_eq!(consensus_address("AiEhISEhISEhISEhISEhISEhISEhISEhISEhISEhISEh"), None);
    }
}
