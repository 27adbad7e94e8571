//! The operations the storefront UI calls.
//!
//! [`Storefront`] validates raw request input, then delegates to the
//! data-access facade and the OTP service. It also owns the default catalog
//! served when the product table has nothing to offer.

use quickdrop_core::{CartLine, Email, Order, OtpCode, Product, User, UserId, assemble};

use super::data_access::DataAccess;
use super::notifier::Notifier;
use super::otp::{OtpIssued, OtpService};
use crate::db::PrimaryStore;
use crate::error::{AppError, Result};

/// How a customer is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(UserId),
    Email(Email),
}

/// Storefront operations over a primary store `S` and notifier `N`.
#[derive(Debug)]
pub struct Storefront<S, N> {
    data: DataAccess<S>,
    otp: OtpService<S, N>,
    catalog: Vec<Product>,
}

impl<S: PrimaryStore, N: Notifier> Storefront<S, N> {
    /// Compose the storefront. `catalog` is served when the store has no products.
    #[must_use]
    pub const fn new(data: DataAccess<S>, otp: OtpService<S, N>, catalog: Vec<Product>) -> Self {
        Self { data, otp, catalog }
    }

    /// The data-access facade.
    #[must_use]
    pub const fn data(&self) -> &DataAccess<S> {
        &self.data
    }

    /// The OTP service.
    #[must_use]
    pub const fn otp(&self) -> &OtpService<S, N> {
        &self.otp
    }

    /// Resolve a customer by name, email and phone, creating or updating it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` or `AppError::Email` for bad input.
    /// Returns `AppError::Facade` if the user could be saved nowhere.
    pub async fn login(&self, name: &str, email: &str, phone: &str) -> Result<User> {
        let name = required("name", name)?;
        let email = Email::parse(required("email", email)?)?;
        let phone = required("phone", phone)?;

        let user = self.data.create_or_update_user(name, &email, phone).await?;
        Ok(user)
    }

    /// Issue a checkout passcode for `email`.
    ///
    /// The customer's name is looked up to personalise the notice; a failed
    /// lookup only loses the personalisation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Email` for an invalid email.
    /// Returns `AppError::Otp` if the passcode could not be stored.
    pub async fn request_otp(&self, email: &str) -> Result<OtpIssued> {
        let email = Email::parse(required("email", email)?)?;
        let display_name = self
            .data
            .find_user_by_email(&email)
            .await
            .map(|user| user.name);

        let issued = self.otp.send(&email, display_name.as_deref()).await?;
        Ok(issued)
    }

    /// Verify a checkout passcode.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Email` or `AppError::Code` for malformed input.
    /// Returns `AppError::Otp` if the code is invalid, expired or used, or
    /// the passcode store is unavailable.
    pub async fn confirm_otp(&self, email: &str, code: &str) -> Result<()> {
        let email = Email::parse(required("email", email)?)?;
        let code = OtpCode::parse(required("otp", code)?.trim())?;

        self.otp.verify(&email, &code).await?;
        Ok(())
    }

    /// Place an order for an existing customer.
    ///
    /// Prices come from the cart lines as submitted; the total is their sum.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` or `AppError::Cart` for bad input.
    /// Returns `AppError::NotFound` if the user exists in neither store.
    /// Returns `AppError::Facade` if unsaved orders are disabled and the
    /// order could not be written.
    pub async fn place_order(
        &self,
        user_id: UserId,
        address: &str,
        lines: &[CartLine],
    ) -> Result<Order> {
        let address = required("address", address)?;
        let assembled = assemble(lines)?;

        if self.data.get_user_by_id(user_id).await.is_none() {
            return Err(AppError::NotFound(format!("user {user_id}")));
        }

        let order = self
            .data
            .create_order(user_id, address, assembled.items, assembled.total_price)
            .await?;
        Ok(order)
    }

    /// The product list, or the default catalog when the store has none.
    pub async fn list_products(&self) -> Vec<Product> {
        let products = self.data.get_products().await;
        if products.is_empty() {
            tracing::debug!(count = self.catalog.len(), "serving default catalog");
            return self.catalog.clone();
        }
        products
    }

    /// Orders of one customer, newest first.
    pub async fn list_user_orders(&self, user_id: UserId) -> Vec<Order> {
        self.data.get_user_orders(user_id).await
    }

    /// Every order, newest first.
    pub async fn list_all_orders(&self) -> Vec<Order> {
        self.data.get_all_orders().await
    }

    /// Look up a customer in either store.
    pub async fn get_user(&self, lookup: &UserLookup) -> Option<User> {
        match lookup {
            UserLookup::Id(id) => self.data.get_user_by_id(*id).await,
            UserLookup::Email(email) => self.data.find_user_by_email(email).await,
        }
    }
}

/// Trimmed `value`, or `InvalidInput` naming `field` if it is blank.
fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidInput(format!("{field} is required")));
    }
    Ok(value)
}
