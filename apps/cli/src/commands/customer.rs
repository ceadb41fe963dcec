//! # Customer Commands
//!
//! The roster, with purchase figures derived from sales on every listing.

use chrono::Utc;
use tracing::{debug, info};

use gemledger_core::aggregate::{customer_stats, CustomerStats};
use gemledger_core::validation::validate_customer;
use gemledger_core::{Customer, CustomerFilter, CustomerUpdate, NoFilter, Sale};

use crate::context::AppContext;
use crate::error::AppError;

/// Customers matching `filter`, each with totals over all recorded sales.
pub async fn list_customers(ctx: &AppContext, filter: &CustomerFilter) -> Vec<CustomerStats> {
    let customers: Vec<Customer> = ctx.reconciler().read(filter).await;
    let sales: Vec<Sale> = ctx.reconciler().read(&NoFilter).await;
    customer_stats(&sales, &customers)
}

#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Adds a customer. A phone already on the roster is rejected.
pub async fn add_customer(ctx: &AppContext, input: NewCustomer) -> Result<Customer, AppError> {
    debug!(name = %input.name, "add_customer command");

    let customer = Customer::new(input.name, input.phone, input.email, input.address, Utc::now());
    validate_customer(&customer)?;

    let existing: Vec<Customer> = ctx.reconciler().read(&NoFilter).await;
    if let Some(other) = existing.iter().find(|c| c.has_phone(&customer.phone)) {
        return Err(AppError::validation(format!(
            "A customer with phone {} already exists ({})",
            customer.phone, other.name
        )));
    }

    let customer = ctx.reconciler().write(customer).await;
    info!(customer_id = %customer.id, "Customer added");
    Ok(customer)
}

pub async fn edit_customer(
    ctx: &AppContext,
    id: &str,
    update: CustomerUpdate,
) -> Result<Customer, AppError> {
    let now = Utc::now();
    let customer = ctx
        .reconciler()
        .update::<Customer, _, AppError>(id, |customer| {
            customer.apply_update(update, now);
            validate_customer(customer)?;
            Ok(())
        })
        .await?
        .ok_or_else(|| AppError::not_found("Customer", id))?;

    info!(customer_id = %customer.id, "Customer updated");
    Ok(customer)
}

/// Removes a customer from the roster. Their sales are kept.
pub async fn delete_customer(ctx: &AppContext, id: &str) -> Result<(), AppError> {
    if ctx.reconciler().delete::<Customer>(id).await {
        info!(customer_id = %id, "Customer deleted");
        Ok(())
    } else {
        Err(AppError::not_found("Customer", id))
    }
}

/// Convenience for callers that only hold a search string.
pub fn search(text: Option<String>) -> CustomerFilter {
    CustomerFilter { search: text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sale::record_sale;
    use crate::error::ErrorCode;
    use chrono::NaiveDate;
    use gemledger_core::{CategoryLine, Money, NewSale};

    fn input(name: &str, phone: &str) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            phone: phone.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_phone() {
        let (ctx, _memory) = AppContext::for_tests(true).await;
        add_customer(&ctx, input("Asha", "98765 43210")).await.unwrap();

        let err = add_customer(&ctx, input("Asha Two", "9876543210")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = add_customer(&ctx, input("", "1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_list_includes_purchase_stats() {
        let (ctx, _memory) = AppContext::for_tests(false).await;
        record_sale(
            &ctx,
            NewSale {
                customer_name: "Ravi".to_string(),
                customer_phone: "555".to_string(),
                customer_email: Some("ravi@example.com".to_string()),
                customer_address: None,
                categories: vec![CategoryLine::new("bangles", 2)],
                cost_price: Money::from_major(100),
                selling_price: Money::from_major(300),
                shipping_cost: Money::zero(),
                payment_mode: "Cash".to_string(),
                sale_date: NaiveDate::from_ymd_opt(2024, 7, 4).unwrap(),
            },
        )
        .await
        .unwrap();
        add_customer(&ctx, input("Meera", "777")).await.unwrap();

        let all = list_customers(&ctx, &CustomerFilter::default()).await;
        assert_eq!(all.len(), 2);

        let ravi = list_customers(&ctx, &search(Some("example.com".to_string()))).await;
        assert_eq!(ravi.len(), 1);
        assert_eq!(ravi[0].total_purchases, 1);
        assert_eq!(ravi[0].total_spent, Money::from_major(300));
        assert_eq!(ravi[0].last_purchase_date, NaiveDate::from_ymd_opt(2024, 7, 4));
        let meera = list_customers(&ctx, &search(Some("meera".to_string()))).await;
        assert_eq!(meera[0].total_purchases, 0);
        assert!(meera[0].last_purchase_date.is_none());
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let (ctx, _memory) = AppContext::for_tests(true).await;
        let customer = add_customer(&ctx, input("Asha", "1")).await.unwrap();

        let edited = edit_customer(
            &ctx,
            &customer.id,
            CustomerUpdate {
                email: Some("asha@example.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(edited.email.as_deref(), Some("asha@example.com"));
        assert!(edited.updated_at.is_some());

        delete_customer(&ctx, &customer.id).await.unwrap();
        let err = delete_customer(&ctx, &customer.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
