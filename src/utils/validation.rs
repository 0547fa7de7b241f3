//! Boundary validation for purchase input

use bigdecimal::BigDecimal;

use crate::types::*;

/// Validate that an amount is not negative
pub fn validate_non_negative_amount(amount: &BigDecimal) -> PurchaseResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(PurchaseError::Validation(
            "Amount cannot be negative".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate a single line item: product present, positive quantity,
/// non-negative unit price
pub fn validate_line_item(item: &LineItemInput) -> PurchaseResult<()> {
    if item.product_id == 0 {
        return Err(PurchaseError::Validation(
            "Line item is missing a product".to_string(),
        ));
    }

    if item.qty <= BigDecimal::from(0) {
        return Err(PurchaseError::Validation(format!(
            "Line item quantity must be positive, got {}",
            item.qty
        )));
    }

    if item.unit_price < BigDecimal::from(0) {
        return Err(PurchaseError::Validation(format!(
            "Line item unit price cannot be negative, got {}",
            item.unit_price
        )));
    }

    Ok(())
}

/// Validate that a particulars memo fits the column
pub fn validate_particulars(particulars: &str) -> PurchaseResult<()> {
    if particulars.len() > 500 {
        return Err(PurchaseError::Validation(
            "Particulars cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a full purchase input before it enters the engine
pub fn validate_purchase_input(input: &PurchaseInput) -> PurchaseResult<()> {
    if input.vendor_id == 0 {
        return Err(PurchaseError::Validation(
            "Vendor is required".to_string(),
        ));
    }

    match input.status {
        PurchaseStatus::Draft | PurchaseStatus::Posted => {}
        other => {
            return Err(PurchaseError::Validation(format!(
                "Status {other:?} cannot be set directly; bills are voided or closed by the engine"
            )));
        }
    }

    if let Some(amount) = &input.amount {
        validate_non_negative_amount(amount)?;
    } else if input.line_items.is_empty() {
        return Err(PurchaseError::Validation(
            "A purchase needs line items or an explicit amount".to_string(),
        ));
    }

    for item in &input.line_items {
        validate_line_item(item)?;
    }

    validate_particulars(&input.particulars)?;

    Ok(())
}
