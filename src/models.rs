//! Typed records mirroring the backend resources.
//!
//! Response types are tolerant of partial envelopes: list endpoints return
//! trimmed rows (e.g. sales without line items), so fields that may be
//! absent carry serde defaults. Money fields use `Decimal`; the backend
//! accepts both string and numeric encodings.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Roles and permissions
// ---------------------------------------------------------------------------

/// Closed set of account roles. An unrecognized role string fails
/// deserialization instead of silently passing permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Manager,
    Cashier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageStores,
    ManageUsers,
    ManageProducts,
    ManageCustomers,
    CreateSale,
    ViewSales,
    ViewReports,
    ManageSettings,
}

/// Permissions granted to super admins (everything).
const SUPER_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ManageStores,
    Permission::ManageUsers,
    Permission::ManageProducts,
    Permission::ManageCustomers,
    Permission::CreateSale,
    Permission::ViewSales,
    Permission::ViewReports,
    Permission::ManageSettings,
];

/// Permissions granted to store managers.
const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::ManageUsers,
    Permission::ManageProducts,
    Permission::ManageCustomers,
    Permission::CreateSale,
    Permission::ViewSales,
    Permission::ViewReports,
];

/// Permissions granted to cashiers.
const CASHIER_PERMISSIONS: &[Permission] = &[
    Permission::ManageCustomers,
    Permission::CreateSale,
    Permission::ViewSales,
];

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Manager => "manager",
            Self::Cashier => "cashier",
        }
    }

    /// Super admins bypass individual permission checks entirely.
    pub fn is_admin(self) -> bool {
        matches!(self, Self::SuperAdmin)
    }

    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Self::SuperAdmin => SUPER_ADMIN_PERMISSIONS,
            Self::Manager => MANAGER_PERMISSIONS,
            Self::Cashier => CASHIER_PERMISSIONS,
        }
    }

    pub fn has_permission(self, permission: Permission) -> bool {
        self.is_admin() || self.permissions().contains(&permission)
    }
}

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Account/store lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Upi => "upi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[default]
    Flat,
    Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Completed,
    Refunded,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Settlement state of a sale's payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Partial,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Partial => "partial",
            Self::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpiStatus {
    Pending,
    Completed,
    Failed,
    #[default]
    #[serde(rename = "n/a")]
    NotApplicable,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: Status,
    #[serde(default)]
    pub store_id: Option<Uuid>,
    #[serde(default)]
    pub assigned_manager_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCreate {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub manager_id: Option<Uuid>,
    #[serde(default)]
    pub manager_name: Option<String>,
    #[serde(default)]
    pub manager_email: Option<String>,
    #[serde(default)]
    pub product_count: Option<i64>,
    #[serde(default)]
    pub total_sales: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: Status,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreStats {
    pub store_id: Uuid,
    pub store_name: String,
    pub total_sales: i64,
    pub total_revenue: Decimal,
    pub product_count: i64,
    pub user_count: i64,
    pub today_sales: i64,
    pub today_revenue: Decimal,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    #[serde(default)]
    pub store_id: Option<Uuid>,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub low_stock_threshold: Option<i32>,
    #[serde(default)]
    pub img_url: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductCreate {
    pub name: String,
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_stock_threshold: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    pub status: ProductStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_stock_threshold: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerCreate {
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// ---------------------------------------------------------------------------
// Sales
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleItemCreate {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
}

/// A completed checkout. Immutable from the client's perspective once
/// created; list endpoints return trimmed rows, hence the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub invoice_no: String,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub store_id: Option<Uuid>,
    #[serde(default)]
    pub cashier_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub discount_value_input: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    pub total: Decimal,
    pub paid_amount: Decimal,
    #[serde(default)]
    pub change_amount: Option<Decimal>,
    #[serde(default)]
    pub upi_status: UpiStatus,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub invoice_pdf_url: Option<String>,
    #[serde(default)]
    pub status: SaleStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<SaleItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleCreate {
    pub invoice_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashier_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub discount_type: DiscountType,
    pub discount_value_input: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub paid_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_amount: Option<Decimal>,
    pub upi_status: UpiStatus,
    pub status: SaleStatus,
    pub items: Vec<SaleItemCreate>,
}

/// Post-checkout corrections (admin only; always `PUT` server-side).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_status: Option<UpiStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SaleStatus>,
}

/// Filters for the sales list endpoint. Only present keys are serialized.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub store_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentBreakdown {
    pub method: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopProduct {
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaleSummary {
    pub total_sales: i64,
    pub total_revenue: Decimal,
    pub total_discount: Decimal,
    pub average_order_value: Decimal,
    pub payment_breakdown: Vec<PaymentBreakdown>,
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextInvoice {
    pub invoice_number: String,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: Uuid,
    pub store_name: String,
    #[serde(default)]
    pub store_address: Option<String>,
    #[serde(default)]
    pub store_phone: Option<String>,
    #[serde(default)]
    pub store_email: Option<String>,
    #[serde(default)]
    pub tax_rate: Option<f64>,
    #[serde(default)]
    pub currency_symbol: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub upi_id: Option<String>,
    #[serde(default)]
    pub store_logo_url: Option<String>,
    #[serde(default)]
    pub low_stock_threshold: Option<i32>,
    #[serde(default)]
    pub theme: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingsUpdate {
    pub store_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_stock_threshold: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

// ---------------------------------------------------------------------------
// Auth / tenants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// User record embedded in the login/signup response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub store_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: SessionUser,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Health-check payload; extra backend fields are kept as raw JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(flatten)]
    pub extra: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_strings_round_trip() {
        for (role, s) in [
            (Role::SuperAdmin, "super_admin"),
            (Role::Manager, "manager"),
            (Role::Cashier, "cashier"),
        ] {
            assert_eq!(serde_json::to_value(role).unwrap(), json!(s));
            assert_eq!(role.as_str(), s);
        }
        assert!(serde_json::from_value::<Role>(json!("owner")).is_err());
    }

    #[test]
    fn super_admin_holds_every_permission() {
        for p in [
            Permission::ManageStores,
            Permission::ManageUsers,
            Permission::ManageProducts,
            Permission::ManageCustomers,
            Permission::CreateSale,
            Permission::ViewSales,
            Permission::ViewReports,
            Permission::ManageSettings,
        ] {
            assert!(Role::SuperAdmin.has_permission(p));
        }
    }

    #[test]
    fn cashier_permissions_are_scoped_to_the_register() {
        assert!(Role::Cashier.has_permission(Permission::CreateSale));
        assert!(Role::Cashier.has_permission(Permission::ManageCustomers));
        assert!(!Role::Cashier.has_permission(Permission::ManageStores));
        assert!(!Role::Cashier.has_permission(Permission::ManageSettings));
        assert!(Role::Manager.has_permission(Permission::ManageUsers));
        assert!(!Role::Manager.has_permission(Permission::ManageStores));
    }

    #[test]
    fn upi_status_uses_the_backend_spelling() {
        assert_eq!(
            serde_json::to_value(UpiStatus::NotApplicable).unwrap(),
            json!("n/a")
        );
        assert_eq!(
            serde_json::from_value::<UpiStatus>(json!("pending")).unwrap(),
            UpiStatus::Pending
        );
    }

    #[test]
    fn sale_deserializes_from_a_trimmed_list_row() {
        // The list endpoint omits items, discount metadata, and UPI status.
        let row = json!({
            "id": "7d1f9a52-7a8f-4f7a-9a1d-0d5c4e3f2b10",
            "invoice_no": "INV-0001",
            "store_id": null,
            "customer_id": null,
            "cashier_id": null,
            "payment_method": "cash",
            "payment_status": "paid",
            "subtotal": 100.0,
            "discount": 0.0,
            "tax": 5.0,
            "total": 105.0,
            "paid_amount": 110.0,
            "change_amount": 5.0,
            "status": "completed",
            "has_invoice": false,
            "created_at": "2026-01-05T10:00:00Z"
        });
        let sale: Sale = serde_json::from_value(row).unwrap();
        assert_eq!(sale.invoice_no, "INV-0001");
        assert_eq!(sale.upi_status, UpiStatus::NotApplicable);
        assert!(sale.items.is_empty());
    }

    #[test]
    fn update_payloads_serialize_only_present_fields() {
        let update = UserUpdate {
            name: Some("New Name".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(&update).unwrap();
        assert_eq!(v, json!({ "name": "New Name" }));
    }
}
