//! Cross-entity joins computed client-side over state snapshots.
//!
//! The backend does not serve these aggregations; they are pure functions
//! so the containers stay independent of each other.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Customer, Sale, SaleStatus, Store, User};

/// Per-customer purchase aggregates derived from the sales window.
/// Refunded and cancelled sales do not count toward spend.
#[derive(Debug, Clone)]
pub struct CustomerMetrics {
    pub customer_id: Uuid,
    pub order_count: usize,
    pub total_spent: Decimal,
    pub last_purchase: Option<DateTime<Utc>>,
}

pub fn customer_metrics(customer: &Customer, sales: &[Sale]) -> CustomerMetrics {
    let mut order_count = 0;
    let mut total_spent = Decimal::ZERO;
    let mut last_purchase: Option<DateTime<Utc>> = None;

    for sale in sales {
        if sale.customer_id != Some(customer.id) || sale.status != SaleStatus::Completed {
            continue;
        }
        order_count += 1;
        total_spent += sale.total;
        if last_purchase.map_or(true, |seen| sale.created_at > seen) {
            last_purchase = Some(sale.created_at);
        }
    }

    CustomerMetrics {
        customer_id: customer.id,
        order_count,
        total_spent,
        last_purchase,
    }
}

/// A sale row resolved for display: ids joined to names where the
/// snapshots know them.
#[derive(Debug, Clone)]
pub struct SaleRow {
    pub sale: Sale,
    pub customer_name: Option<String>,
    pub cashier_name: Option<String>,
    pub store_name: Option<String>,
}

pub fn sale_rows(
    sales: &[Sale],
    customers: &[Customer],
    users: &[User],
    stores: &[Store],
) -> Vec<SaleRow> {
    sales
        .iter()
        .map(|sale| SaleRow {
            sale: sale.clone(),
            customer_name: sale.customer_id.and_then(|id| {
                customers.iter().find(|c| c.id == id).map(|c| c.name.clone())
            }),
            cashier_name: sale.cashier_id.and_then(|id| {
                users.iter().find(|u| u.id == id).map(|u| u.name.clone())
            }),
            store_name: sale.store_id.and_then(|id| {
                stores.iter().find(|s| s.id == id).map(|s| s.name.clone())
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscountType, PaymentMethod, UpiStatus};
    use rust_decimal_macros::dec;

    fn sale(customer_id: Option<Uuid>, total: Decimal, status: SaleStatus, day: u32) -> Sale {
        Sale {
            id: Uuid::new_v4(),
            invoice_no: format!("INV-{day:04}"),
            customer_id,
            store_id: None,
            cashier_id: None,
            payment_method: PaymentMethod::Cash,
            subtotal: total,
            discount: dec!(0),
            discount_type: DiscountType::Flat,
            discount_value_input: dec!(0),
            tax: dec!(0),
            total,
            paid_amount: total,
            change_amount: None,
            upi_status: UpiStatus::NotApplicable,
            payment_status: None,
            invoice_pdf_url: None,
            status,
            created_at: format!("2026-01-{day:02}T10:00:00Z").parse().unwrap(),
            items: Vec::new(),
        }
    }

    fn customer(id: Uuid) -> Customer {
        Customer {
            id,
            store_id: Uuid::new_v4(),
            name: "Priya Sharma".into(),
            phone: "9876543210".into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn metrics_skip_refunds_and_track_the_latest_purchase() {
        let id = Uuid::new_v4();
        let c = customer(id);
        let sales = vec![
            sale(Some(id), dec!(100), SaleStatus::Completed, 5),
            sale(Some(id), dec!(50), SaleStatus::Completed, 9),
            sale(Some(id), dec!(999), SaleStatus::Refunded, 10),
            sale(Some(Uuid::new_v4()), dec!(30), SaleStatus::Completed, 11),
            sale(None, dec!(20), SaleStatus::Completed, 12),
        ];

        let metrics = customer_metrics(&c, &sales);
        assert_eq!(metrics.order_count, 2);
        assert_eq!(metrics.total_spent, dec!(150));
        assert_eq!(
            metrics.last_purchase.unwrap().to_rfc3339(),
            "2026-01-09T10:00:00+00:00"
        );
    }

    #[test]
    fn metrics_for_a_customer_with_no_sales_are_zeroed() {
        let c = customer(Uuid::new_v4());
        let metrics = customer_metrics(&c, &[]);
        assert_eq!(metrics.order_count, 0);
        assert_eq!(metrics.total_spent, Decimal::ZERO);
        assert!(metrics.last_purchase.is_none());
    }

    #[test]
    fn rows_resolve_known_names_and_leave_unknown_ids_bare() {
        let cust_id = Uuid::new_v4();
        let mut s = sale(Some(cust_id), dec!(100), SaleStatus::Completed, 5);
        s.cashier_id = Some(Uuid::new_v4()); // not present in users

        let rows = sale_rows(&[s], &[customer(cust_id)], &[], &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].customer_name.as_deref(), Some("Priya Sharma"));
        assert!(rows[0].cashier_name.is_none());
        assert!(rows[0].store_name.is_none());
    }
}
