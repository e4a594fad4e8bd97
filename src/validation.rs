//! Form-field validation and sanitization.
//!
//! Pure, synchronous checks applied before a payload reaches the network:
//! fixed-format rules only (patterns, bounds, lengths), no uniqueness or
//! other server-side checks. Single-field validators return the sanitized
//! value on success; composite validators return a per-field error map.
//! Also home to the login rate limiter and the CSRF token generator.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::DiscountType;

/// Largest accepted monetary amount.
const MAX_AMOUNT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);
/// Largest accepted stock quantity.
const MAX_STOCK: i32 = 1_000_000;

pub type FieldResult<T> = Result<T, String>;

/// Field name -> message, ordered for stable display.
pub type ValidationErrors = BTreeMap<&'static str, String>;

// ---------------------------------------------------------------------------
// Sanitization
// ---------------------------------------------------------------------------

/// Strip control characters, collapse whitespace runs, and trim.
/// Idempotent: sanitizing an already-sanitized string is a no-op.
pub fn sanitize_input(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for c in input.chars() {
        if c.is_control() {
            continue;
        }
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Single-field validators
// ---------------------------------------------------------------------------

/// Lowercased, trimmed email with the usual structural checks.
pub fn validate_email(email: &str) -> FieldResult<String> {
    let sanitized = sanitize_input(email).to_lowercase();

    if sanitized.is_empty() {
        return Err("Email is required".into());
    }
    if sanitized.len() > 254 {
        return Err("Email must be at most 254 characters".into());
    }

    let mut parts = sanitized.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err("Invalid email format".into()),
    };
    if local.is_empty() || local.len() > 64 {
        return Err("Invalid email format".into());
    }
    if domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err("Invalid email domain".into());
    }

    Ok(sanitized)
}

/// Indian mobile number: exactly 10 digits starting with 6-9 after
/// separators and an optional `+91`/`0` prefix are stripped.
pub fn validate_phone(phone: &str) -> FieldResult<String> {
    let mut digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err("Phone number is required".into());
    }
    if digits.len() == 12 && digits.starts_with("91") {
        digits.drain(..2);
    } else if digits.len() == 11 && digits.starts_with('0') {
        digits.remove(0);
    }

    if digits.len() != 10 {
        return Err("Phone number must be exactly 10 digits".into());
    }
    if !matches!(digits.as_bytes()[0], b'6'..=b'9') {
        return Err("Phone number must start with 6, 7, 8 or 9".into());
    }

    Ok(digits)
}

/// Person/store name: 2-100 characters of letters, spaces, hyphens and
/// apostrophes, with whitespace collapsed.
pub fn validate_name(name: &str) -> FieldResult<String> {
    let sanitized = sanitize_input(name);

    if sanitized.is_empty() {
        return Err("Name is required".into());
    }
    if sanitized.chars().count() < 2 || sanitized.chars().count() > 100 {
        return Err("Name must be 2-100 characters".into());
    }
    if !sanitized
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'' || c == '.')
    {
        return Err("Name may only contain letters, spaces, hyphens and apostrophes".into());
    }

    Ok(sanitized)
}

/// At least 8 characters with an uppercase letter, a lowercase letter, a
/// digit, and a special character. Passwords are never sanitized.
pub fn validate_password(password: &str) -> FieldResult<()> {
    if password.is_empty() {
        return Err("Password is required".into());
    }
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".into());
    }
    if password.len() > 128 {
        return Err("Password must be at most 128 characters".into());
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());
    if !(has_upper && has_lower && has_digit && has_special) {
        return Err(
            "Password must contain an uppercase letter, a lowercase letter, a digit and a special character"
                .into(),
        );
    }

    Ok(())
}

fn parse_decimal(input: &str, label: &str) -> FieldResult<Decimal> {
    sanitize_input(input)
        .parse::<Decimal>()
        .map_err(|_| format!("{label} must be a number"))
}

/// Non-negative price, rounded half-away-from-zero to 2 decimals.
pub fn validate_price(price: &str) -> FieldResult<Decimal> {
    let value = parse_decimal(price, "Price")?;
    if value.is_sign_negative() {
        return Err("Price cannot be negative".into());
    }
    if value > MAX_AMOUNT {
        return Err("Price is too large".into());
    }
    Ok(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Non-negative integer stock quantity.
pub fn validate_stock(stock: &str) -> FieldResult<i32> {
    let sanitized = sanitize_input(stock);
    let value = sanitized
        .parse::<i32>()
        .map_err(|_| "Stock must be a whole number".to_string())?;
    if value < 0 {
        return Err("Stock cannot be negative".into());
    }
    if value > MAX_STOCK {
        return Err("Stock is too large".into());
    }
    Ok(value)
}

/// Non-negative monetary amount (paid amount, tendered cash).
pub fn validate_amount(amount: &str) -> FieldResult<Decimal> {
    let value = parse_decimal(amount, "Amount")?;
    if value.is_sign_negative() {
        return Err("Amount cannot be negative".into());
    }
    if value > MAX_AMOUNT {
        return Err("Amount is too large".into());
    }
    Ok(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Discount value. Percentage discounts cap at 100; flat discounts follow
/// the amount bounds.
pub fn validate_discount(value: &str, discount_type: DiscountType) -> FieldResult<Decimal> {
    let amount = validate_amount(value).map_err(|e| e.replace("Amount", "Discount"))?;
    if discount_type == DiscountType::Percentage && amount > Decimal::ONE_HUNDRED {
        return Err("Discount cannot exceed 100%".into());
    }
    Ok(amount)
}

// ---------------------------------------------------------------------------
// Composite validators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CustomerForm {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct SanitizedCustomer {
    pub name: String,
    pub phone: String,
}

pub fn validate_customer(form: &CustomerForm) -> Result<SanitizedCustomer, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = collect(&mut errors, "name", validate_name(&form.name));
    let phone = collect(&mut errors, "phone", validate_phone(&form.phone));

    match (name, phone) {
        (Some(name), Some(phone)) if errors.is_empty() => Ok(SanitizedCustomer { name, phone }),
        _ => Err(errors),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SaleForm {
    pub item_count: usize,
    pub paid_amount: String,
    pub discount_value: String,
    pub discount_type: DiscountType,
}

#[derive(Debug, Clone)]
pub struct SanitizedSale {
    pub paid_amount: Decimal,
    pub discount: Decimal,
}

pub fn validate_sale(form: &SaleForm) -> Result<SanitizedSale, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if form.item_count == 0 {
        errors.insert("items", "A sale needs at least one item".into());
    }
    let paid = collect(&mut errors, "paid_amount", validate_amount(&form.paid_amount));
    let discount = collect(
        &mut errors,
        "discount",
        validate_discount(&form.discount_value, form.discount_type),
    );

    match (paid, discount) {
        (Some(paid_amount), Some(discount)) if errors.is_empty() => Ok(SanitizedSale {
            paid_amount,
            discount,
        }),
        _ => Err(errors),
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreSettingsForm {
    pub store_name: String,
    pub store_email: String,
    pub store_phone: String,
    pub tax_rate: String,
}

#[derive(Debug, Clone)]
pub struct SanitizedStoreSettings {
    pub store_name: String,
    pub store_email: Option<String>,
    pub store_phone: Option<String>,
    pub tax_rate: Decimal,
}

/// Email and phone are optional in settings; empty inputs pass as absent.
pub fn validate_store_settings(
    form: &StoreSettingsForm,
) -> Result<SanitizedStoreSettings, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let store_name = collect(&mut errors, "store_name", validate_name(&form.store_name));
    let store_email = if sanitize_input(&form.store_email).is_empty() {
        Some(None)
    } else {
        collect(&mut errors, "store_email", validate_email(&form.store_email)).map(Some)
    };
    let store_phone = if sanitize_input(&form.store_phone).is_empty() {
        Some(None)
    } else {
        collect(&mut errors, "store_phone", validate_phone(&form.store_phone)).map(Some)
    };
    let tax_rate = collect(
        &mut errors,
        "tax_rate",
        validate_discount(&form.tax_rate, DiscountType::Percentage)
            .map_err(|e| e.replace("Discount", "Tax rate")),
    );

    match (store_name, store_email, store_phone, tax_rate) {
        (Some(store_name), Some(store_email), Some(store_phone), Some(tax_rate))
            if errors.is_empty() =>
        {
            Ok(SanitizedStoreSettings {
                store_name,
                store_email,
                store_phone,
                tax_rate,
            })
        }
        _ => Err(errors),
    }
}

fn collect<T>(
    errors: &mut ValidationErrors,
    field: &'static str,
    result: FieldResult<T>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(message) => {
            errors.insert(field, message);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Rate limiting and CSRF tokens
// ---------------------------------------------------------------------------

/// Sliding-window attempt limiter keyed by an arbitrary identifier
/// (typically the login email). Attempts older than the window are
/// discarded; a denied call does not consume an attempt.
pub struct RateLimiter {
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
    max_attempts: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_attempts,
            window,
        }
    }

    /// Record an attempt for `id` if the window has room. Returns whether
    /// the attempt is allowed.
    pub fn can_attempt(&self, id: &str) -> bool {
        let Ok(mut attempts) = self.attempts.lock() else {
            return false;
        };
        let now = Instant::now();
        let window = self.window;

        // Evict identifiers whose window has fully elapsed so the map
        // stays bounded by currently-active identifiers.
        attempts.retain(|_, timestamps| {
            timestamps.retain(|t| now.duration_since(*t) < window);
            !timestamps.is_empty()
        });

        let timestamps = attempts.entry(id.to_string()).or_default();
        if timestamps.len() >= self.max_attempts {
            return false;
        }
        timestamps.push(now);
        true
    }

    /// Drop all recorded attempts for `id` (e.g. after a successful login).
    pub fn reset(&self, id: &str) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.remove(id);
        }
    }
}

/// Random 32-hex-character token for form submissions.
pub fn generate_csrf_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    let mut out = String::with_capacity(32);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
