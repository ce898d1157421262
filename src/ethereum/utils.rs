use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Parse a `0x`-prefixed, 40 hex digit address. Surrounding whitespace is not
/// tolerated.
pub fn validate_address(address: &str) -> Result<Address> {
    if address.is_empty() {
        return Err(anyhow!("Address cannot be empty"));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(anyhow!(
            "Invalid address format: '{}'. Addresses must start with '0x'",
            address
        ));
    }

    if address.len() != 42 {
        return Err(anyhow!(
            "Invalid address length: '{}'. Addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        ));
    }

    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!(
            "Invalid address format: '{}'. Contains non-hexadecimal characters",
            address
        ));
    }

    Address::from_str(address).map_err(|e| anyhow!("Invalid address: '{}'. Error: {}", address, e))
}

/// Artifact network ids are either numeric chain ids or the symbolic names
/// `default` and `live`.
pub fn validate_network(network: &str, available_networks: &[String]) -> Result<()> {
    if network.is_empty() {
        return Err(anyhow!("Network id cannot be empty"));
    }

    if !available_networks.iter().any(|id| id == network) {
        return Err(anyhow!(
            "Unknown network: '{}'. Available networks: {}",
            network,
            available_networks.join(", ")
        ));
    }

    Ok(())
}

/// Decimal or `0x`-prefixed hex quantity (wei amounts, gas).
pub fn validate_hex_value(value_str: &str) -> Result<U256> {
    if value_str.is_empty() {
        return Err(anyhow!("Value cannot be empty"));
    }

    match value_str
        .strip_prefix("0x")
        .or_else(|| value_str.strip_prefix("0X"))
    {
        Some(hex) => U256::from_str_radix(hex, 16)
            .map_err(|_| anyhow!("Invalid hexadecimal value: '{}'", value_str)),
        None => U256::from_str(value_str).map_err(|_| {
            anyhow!(
                "Invalid numeric value: '{}'. Use decimal format or '0x' prefixed hex",
                value_str
            )
        }),
    }
}

/// Quantity as the `0x` hex string JSON-RPC expects.
pub fn to_quantity(value_str: &str) -> Result<String> {
    Ok(format!("0x{:x}", validate_hex_value(value_str)?))
}

/// User-facing explanation for common node errors.
pub fn interpret_rpc_error(error: &str) -> String {
    if error.contains("execution reverted") {
        "Transaction failed: The contract function reverted execution. This usually means the function's requirements were not met.".to_string()
    } else if error.contains("insufficient funds") {
        "Transaction failed: Insufficient funds to cover gas costs.".to_string()
    } else if error.contains("gas required exceeds allowance") || error.contains("out of gas") {
        "Transaction failed: Gas limit too low. Try increasing the gas option.".to_string()
    } else if error.contains("unknown account") {
        "Transaction failed: The node does not manage the 'from' account. Set it with --from or DAO_FROM.".to_string()
    } else if error.contains("nonce too low") {
        "Transaction failed: Nonce too low. Another transaction was already mined with this nonce.".to_string()
    } else if error.contains("connection refused") || error.contains("network unreachable") {
        "Network error: Cannot connect to RPC endpoint. Check the rpc_url setting.".to_string()
    } else if error.contains("wasn't processed in") {
        format!("{} It may still be mined later.", error)
    } else if error.contains("method not found") {
        "RPC error: The requested method is not supported by this RPC endpoint.".to_string()
    } else {
        format!("RPC error: {}", error)
    }
}
