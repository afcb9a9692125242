//! Address parsing and wire formatting.

use crate::error::ValidationError;
use alloy::primitives::Address;

/// Parse a 20-byte hex address, with or without `0x`.
pub fn parse_address(value: &str) -> Result<Address, ValidationError> {
    let trimmed = value.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if body.len() != 40 {
        return Err(ValidationError::InvalidAddress(value.to_string()));
    }
    body.parse::<Address>()
        .map_err(|_| ValidationError::InvalidAddress(value.to_string()))
}

/// Lowercase `0x`-prefixed form used in every request body.
pub fn address_to_wire(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let addr = parse_address("0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        assert_eq!(
            address_to_wire(&addr),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert_eq!(
            parse_address("f39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap(),
            addr
        );
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("").is_err());
        assert!(parse_address("0xzz9fd6e51aad88f6f4ce6ab8827279cfffb92266").is_err());
    }
}
