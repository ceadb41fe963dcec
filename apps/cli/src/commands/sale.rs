//! # Sale Commands

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use gemledger_core::receipt::Receipt;
use gemledger_core::validation::{validate_new_sale, validate_sale};
use gemledger_core::{Customer, NewSale, NoFilter, Sale, SaleFilter, SaleUpdate};

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSale {
    pub sale: Sale,
    /// Set when this sale introduced a new customer.
    pub new_customer: Option<Customer>,
}

/// Validates and stores a new sale, then adds its buyer to the roster when
/// no customer with the same phone exists yet.
///
/// The sale and the customer are two independent writes.
pub async fn record_sale(ctx: &AppContext, draft: NewSale) -> Result<RecordedSale, AppError> {
    debug!(customer = %draft.customer_name, "record_sale command");
    validate_new_sale(&draft)?;

    let sale = ctx.reconciler().write(Sale::create(draft, Utc::now())).await;
    let new_customer = ensure_customers(ctx, std::slice::from_ref(&sale)).await.pop();

    info!(
        sale_id = %sale.id,
        remote_id = ?sale.remote_id,
        total = %sale.total_amount(),
        new_customer = new_customer.is_some(),
        "Sale recorded"
    );
    Ok(RecordedSale { sale, new_customer })
}

/// Creates a customer for every buyer whose phone is not on the roster.
/// The first sale seen for a phone decides the name.
pub(crate) async fn ensure_customers(ctx: &AppContext, sales: &[Sale]) -> Vec<Customer> {
    let mut known: Vec<Customer> = ctx.reconciler().read(&NoFilter).await;
    let mut created = Vec::new();

    for sale in sales {
        if sale.customer_phone.trim().is_empty() {
            continue;
        }
        if known.iter().any(|c| c.has_phone(&sale.customer_phone)) {
            continue;
        }

        let customer = ctx
            .reconciler()
            .write(Customer::from_sale(sale, Utc::now()))
            .await;
        debug!(customer_id = %customer.id, phone = %customer.phone, "Customer added from sale");
        known.push(customer.clone());
        created.push(customer);
    }

    created
}

pub async fn edit_sale(ctx: &AppContext, id: &str, update: SaleUpdate) -> Result<Sale, AppError> {
    debug!(sale_id = %id, "edit_sale command");
    let now = Utc::now();

    let sale = ctx
        .reconciler()
        .update::<Sale, _, AppError>(id, |sale| {
            sale.apply_update(update, now);
            validate_sale(sale)?;
            Ok(())
        })
        .await?
        .ok_or_else(|| AppError::not_found("Sale", id))?;

    info!(sale_id = %sale.id, profit = %sale.profit, "Sale updated");
    Ok(sale)
}

pub async fn delete_sale(ctx: &AppContext, id: &str) -> Result<(), AppError> {
    if ctx.reconciler().delete::<Sale>(id).await {
        info!(sale_id = %id, "Sale deleted");
        Ok(())
    } else {
        Err(AppError::not_found("Sale", id))
    }
}

/// Bulk delete. Requires explicit confirmation; there is no undo.
pub async fn delete_sales(ctx: &AppContext, ids: &[String], confirmed: bool) -> Result<usize, AppError> {
    if !confirmed {
        return Err(AppError::confirmation_required("Deleting sales"));
    }
    if ids.is_empty() {
        return Err(AppError::validation("No sales selected"));
    }

    let deleted = ctx.reconciler().delete_many::<Sale>(ids).await;
    info!(requested = ids.len(), deleted, "Bulk sale delete");
    Ok(deleted)
}

pub async fn list_sales(ctx: &AppContext, filter: &SaleFilter) -> Vec<Sale> {
    ctx.reconciler().read(filter).await
}

pub async fn receipt(ctx: &AppContext, id: &str) -> Result<Receipt, AppError> {
    let sale = ctx
        .reconciler()
        .find::<Sale>(id)
        .await
        .ok_or_else(|| AppError::not_found("Sale", id))?;
    Ok(Receipt::from_sale(&sale, ctx.settings()))
}
