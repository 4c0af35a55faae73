//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::services::ledger::{BarcodeError, check_barcode};

/// Validates a wristband barcode as typed or scanned at the counter.
///
/// Same rule the ledger applies to every barcode it receives: surrounding
/// whitespace is ignored and what remains must be 1 to 64 ASCII letters,
/// digits, `-` or `_`. Case is not checked since barcodes are lowercased by
/// the ledger.
///
/// # Examples
///
/// ```ignore
/// validate_barcode("ZX-00042")  // Ok
/// validate_barcode(" zx_1 ")    // Ok
/// validate_barcode("")          // Err - empty
/// validate_barcode("zx 42")     // Err - inner space
/// ```
pub fn validate_barcode(barcode: &str) -> Result<(), ValidationError> {
    check_barcode(barcode).map(|_| ()).map_err(|problem| {
        let code = match problem {
            BarcodeError::Empty | BarcodeError::TooLong(_) => "barcode_length",
            BarcodeError::InvalidCharacter => "barcode_format",
        };
        let mut err = ValidationError::new(code);
        err.message = Some(problem.to_string().into());
        err
    })
}

/// Rejects names that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_barcode_valid() {
        assert!(validate_barcode("ZX-00042").is_ok());
        assert!(validate_barcode("abc123").is_ok());
        assert!(validate_barcode("  band_7\t").is_ok());
        assert!(validate_barcode(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_validate_barcode_invalid_length() {
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("    ").is_err());
        assert!(validate_barcode(&"a".repeat(65)).is_err());

        let err = validate_barcode(&"a".repeat(65)).unwrap_err();
        assert_eq!(err.code, "barcode_length");
    }

    #[test]
    fn test_validate_barcode_invalid_format() {
        assert!(validate_barcode("zx 42").is_err()); // inner space
        assert!(validate_barcode("zx/42").is_err());
        assert!(validate_barcode("pulsera-ñ").is_err()); // non ascii

        let err = validate_barcode("zx 42").unwrap_err();
        assert_eq!(err.code, "barcode_format");
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Agua").is_ok());
        assert!(validate_not_blank("  ").is_err());
    }
}
