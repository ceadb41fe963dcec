//! # Validation Module
//!
//! Checks that run before a record is written anywhere.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Entry form / edit / import                                             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  validate_new_sale / validate_sale / validate_customer  ← THIS MODULE   │
//! │        │                                                                │
//! │        ├── Err(ValidationError) → shown to the operator, nothing written│
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Reconciler::write (local cache + remote store)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust
//! use gemledger_core::validation::validate_phone;
//!
//! assert!(validate_phone("98765 43210").is_ok());
//! assert!(validate_phone("  ").is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CategoryLine, Customer, NewSale, Sale};
use crate::{MAX_CATEGORY_QUANTITY, MAX_LOGO_BYTES, MAX_TEXT_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Image types accepted for the custom logo.
pub const LOGO_MIME_TYPES: [&str; 4] = ["image/png", "image/jpg", "image/jpeg", "image/svg+xml"];

// =============================================================================
// Field Validators
// =============================================================================

/// Required free-text field (name, address line, category name).
pub fn validate_text(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    Ok(())
}

/// Phone numbers must contain at least one digit once formatting is removed.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    validate_text("customerPhone", phone)?;

    if !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "customerPhone".to_string(),
            reason: "must contain digits".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Amounts typed in by hand or edited in a sheet stay within [`Money::MAX`].
pub fn validate_amount_bound(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.in_range() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: -Money::MAX.major(),
            max: Money::MAX.major(),
        });
    }
    Ok(())
}

pub fn validate_positive(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// A sale needs at least one category, each named with quantity 1..=999.
pub fn validate_categories(categories: &[CategoryLine]) -> ValidationResult<()> {
    if categories.is_empty() {
        return Err(ValidationError::required("categories"));
    }

    for line in categories {
        validate_text("category", &line.category)?;

        if line.quantity < 1 || line.quantity > MAX_CATEGORY_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: i64::from(MAX_CATEGORY_QUANTITY),
            });
        }
    }

    Ok(())
}

fn validate_prices(cost: Money, selling: Money, shipping: Money) -> ValidationResult<()> {
    validate_amount_bound("costPrice", cost)?;
    validate_amount_bound("sellingPrice", selling)?;
    validate_amount_bound("shippingCost", shipping)?;
    validate_non_negative("costPrice", cost)?;
    validate_positive("sellingPrice", selling)?;
    validate_non_negative("shippingCost", shipping)?;
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates the sales entry form.
pub fn validate_new_sale(draft: &NewSale) -> ValidationResult<()> {
    validate_text("customerName", &draft.customer_name)?;
    validate_phone(&draft.customer_phone)?;
    validate_categories(&draft.categories)?;
    validate_prices(draft.cost_price, draft.selling_price, draft.shipping_cost)
}

/// Validates a complete sale before it is persisted (after an edit or import).
pub fn validate_sale(sale: &Sale) -> ValidationResult<()> {
    if sale.id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }
    validate_text("customerName", &sale.customer_name)?;
    validate_phone(&sale.customer_phone)?;
    validate_categories(&sale.categories)?;
    validate_amount_bound("profit", sale.profit)?;
    validate_prices(sale.cost_price, sale.selling_price, sale.shipping_cost)
}

pub fn validate_customer(customer: &Customer) -> ValidationResult<()> {
    if customer.id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }
    validate_text("name", &customer.name)?;
    validate_phone(&customer.phone)
}

/// Validates a custom logo given as a `data:<mime>;base64,<payload>` URI.
///
/// ## Rules
/// - Mime type must be png, jpg, jpeg or svg+xml
/// - Decoded size (estimated from the base64 length) at most 2 MiB
pub fn validate_logo_data_uri(uri: &str) -> ValidationResult<()> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "logo".to_string(),
        reason: reason.to_string(),
    };

    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| invalid("must be a data URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing payload"))?;
    let mime = header.split(';').next().unwrap_or("").to_lowercase();

    if !LOGO_MIME_TYPES.contains(&mime.as_str()) {
        return Err(ValidationError::NotAllowed {
            field: "logo type".to_string(),
            allowed: LOGO_MIME_TYPES.iter().map(|m| m.to_string()).collect(),
        });
    }

    let decoded_len = if header.ends_with(";base64") {
        let padding = payload.chars().rev().take_while(|c| *c == '=').count();
        ((payload.len() / 4) * 3).saturating_sub(padding.min(2))
    } else {
        payload.len()
    };

    if decoded_len > MAX_LOGO_BYTES {
        return Err(ValidationError::OutOfRange {
            field: "logo size".to_string(),
            min: 0,
            max: MAX_LOGO_BYTES as i64,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn draft() -> NewSale {
        NewSale {
            customer_name: "Asha".to_string(),
            customer_phone: "9876543210".to_string(),
            customer_email: None,
            customer_address: None,
            categories: vec![CategoryLine::new("rings", 1)],
            cost_price: Money::from_major(500),
            selling_price: Money::from_major(900),
            shipping_cost: Money::zero(),
            payment_mode: "Cash".to_string(),
            sale_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_valid_draft() {
        assert!(validate_new_sale(&draft()).is_ok());
    }

    #[test]
    fn test_missing_name_and_phone() {
        let mut d = draft();
        d.customer_name = "   ".to_string();
        assert_eq!(
            validate_new_sale(&d),
            Err(ValidationError::required("customerName"))
        );

        let mut d = draft();
        d.customer_phone = String::new();
        assert_eq!(
            validate_new_sale(&d),
            Err(ValidationError::required("customerPhone"))
        );

        let mut d = draft();
        d.customer_phone = "call me".to_string();
        assert!(matches!(
            validate_new_sale(&d),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_categories_rules() {
        let mut d = draft();
        d.categories.clear();
        assert_eq!(
            validate_new_sale(&d),
            Err(ValidationError::required("categories"))
        );

        d.categories = vec![CategoryLine::new("rings", 0)];
        assert!(matches!(
            validate_new_sale(&d),
            Err(ValidationError::OutOfRange { .. })
        ));

        d.categories = vec![CategoryLine::new(" ", 1)];
        assert_eq!(
            validate_new_sale(&d),
            Err(ValidationError::required("category"))
        );
    }

    #[test]
    fn test_price_rules() {
        let mut d = draft();
        d.selling_price = Money::zero();
        assert!(matches!(
            validate_new_sale(&d),
            Err(ValidationError::MustBePositive { .. })
        ));

        let mut d = draft();
        d.cost_price = Money::from_minor(-1);
        assert!(matches!(
            validate_new_sale(&d),
            Err(ValidationError::MustNotBeNegative { .. })
        ));

        let mut d = draft();
        d.shipping_cost = Money::from_minor(-1);
        assert!(validate_new_sale(&d).is_err());

        let mut d = draft();
        d.selling_price = Money::from_minor(Money::MAX.minor() + 1);
        assert!(matches!(
            validate_new_sale(&d),
            Err(ValidationError::OutOfRange { .. })
        ));
        d.selling_price = Money::MAX;
        assert!(validate_new_sale(&d).is_ok());
    }

    #[test]
    fn test_validate_sale_and_customer() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let sale = Sale::create(draft(), now);
        assert!(validate_sale(&sale).is_ok());

        let customer = Customer::new("Asha", "98765", None, None, now);
        assert!(validate_customer(&customer).is_ok());

        let nameless = Customer::new("", "98765", None, None, now);
        assert!(validate_customer(&nameless).is_err());
    }

    #[test]
    fn test_logo_data_uri() {
        assert!(validate_logo_data_uri("data:image/png;base64,iVBORw0KGgo=").is_ok());
        assert!(validate_logo_data_uri("data:image/svg+xml,<svg></svg>").is_ok());
        assert!(matches!(
            validate_logo_data_uri("data:image/gif;base64,R0lGOD=="),
            Err(ValidationError::NotAllowed { .. })
        ));
        assert!(validate_logo_data_uri("https://example.com/logo.png").is_err());

        let big = format!("data:image/png;base64,{}", "A".repeat(3 * 1024 * 1024));
        assert!(matches!(
            validate_logo_data_uri(&big),
            Err(ValidationError::OutOfRange { .. })
        ));
    }
}
