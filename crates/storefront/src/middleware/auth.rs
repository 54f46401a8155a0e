//! Caller identity extractors.
//!
//! Authentication happens upstream: the gateway in front of the storefront
//! verifies the session and forwards the caller's identity as headers.
//!
//! - `x-customer-id` (required) and `x-customer-name` (optional) for customers
//! - `x-staff-name` for shop staff
//!
//! A missing or malformed header rejects the request with 401.

use axum::{extract::FromRequestParts, http::request::Parts};

use sundry_core::CustomerId;
use sundry_core::order::Actor;

use crate::error::{AppError, set_sentry_user};

pub const CUSTOMER_ID_HEADER: &str = "x-customer-id";
pub const CUSTOMER_NAME_HEADER: &str = "x-customer-name";
pub const STAFF_NAME_HEADER: &str = "x-staff-name";

/// The authenticated customer making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentCustomer {
    pub id: CustomerId,
    pub name: String,
}

impl CurrentCustomer {
    /// Timeline actor for this customer.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::customer(self.name.clone())
    }
}

/// Extractor that requires a customer identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireCustomer(customer): RequireCustomer) -> String {
///     format!("Hello, {}!", customer.name)
/// }
/// ```
pub struct RequireCustomer(pub CurrentCustomer);

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = header(parts, CUSTOMER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Customer identity is required".to_string()))?;
        let id = raw_id
            .parse::<CustomerId>()
            .map_err(|_| AppError::Unauthorized("Invalid customer identity".to_string()))?;
        let name = header(parts, CUSTOMER_NAME_HEADER)
            .map_or_else(|| format!("Customer {id}"), str::to_owned);

        set_sentry_user(&id, Some(&name));
        tracing::Span::current().record("customer_id", id.as_i32());

        Ok(Self(CurrentCustomer { id, name }))
    }
}

/// A member of shop staff making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopStaff {
    pub name: String,
}

impl ShopStaff {
    /// Timeline actor for this staff member.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::shop(self.name.clone())
    }
}

/// Extractor that requires a shop staff identity.
pub struct RequireStaff(pub ShopStaff);

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = header(parts, STAFF_NAME_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Shop staff identity is required".to_string()))?
            .to_owned();

        set_sentry_user(&name, Some(&name));

        Ok(Self(ShopStaff { name }))
    }
}

/// A non-blank header value.
fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Request, StatusCode};

    use super::*;

    fn request_parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_customer_from_headers() {
        let mut parts = request_parts(&[(CUSTOMER_ID_HEADER, "42"), (CUSTOMER_NAME_HEADER, "An Nguyen")]);
        let RequireCustomer(customer) = RequireCustomer::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(customer.id, CustomerId::new(42));
        assert_eq!(customer.name, "An Nguyen");
    }

    #[tokio::test]
    async fn test_customer_name_defaults() {
        let mut parts = request_parts(&[(CUSTOMER_ID_HEADER, " 7 ")]);
        let RequireCustomer(customer) = RequireCustomer::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(customer.name, "Customer 7");
    }

    #[tokio::test]
    async fn test_missing_or_invalid_customer_is_unauthorized() {
        for headers in [&[][..], &[(CUSTOMER_ID_HEADER, "abc")][..], &[(CUSTOMER_ID_HEADER, "")][..]] {
            let mut parts = request_parts(headers);
            let err = RequireCustomer::from_request_parts(&mut parts, &())
                .await
                .err()
                .unwrap();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_staff_from_headers() {
        let mut parts = request_parts(&[(STAFF_NAME_HEADER, "Mai")]);
        let RequireStaff(staff) = RequireStaff::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(staff.actor(), Actor::shop("Mai"));

        let mut parts = request_parts(&[]);
        assert!(RequireStaff::from_request_parts(&mut parts, &()).await.is_err());
    }
}
