//! Order total aggregation.
//!
//! Both entry points run the same arithmetic over the same inputs; they differ
//! only in how a failing voucher, shipping method or point request is treated.
//! [`preview`] drops the offending element and explains why, [`finalize`]
//! refuses the order.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::line::{LineError, OrderLine};
use super::loyalty::{self, LoyaltyError, Redemption};
use super::shipping::{ShippingCatalog, ShippingError, ShippingMethod};
use super::voucher::{self, VoucherEvaluation, VoucherLookup, VoucherRejection};
use crate::{Money, VoucherCode, VoucherId};

/// Live state the order is priced against.
#[derive(Debug, Clone)]
pub struct CheckoutInput<'a> {
    /// Lines resolved from the catalog.
    pub lines: Vec<OrderLine>,
    pub catalog: &'a ShippingCatalog,
    /// The customer's selection, if any.
    pub shipping_method: Option<&'a str>,
    /// `None` when no voucher was requested.
    pub voucher: Option<VoucherLookup>,
    pub points_requested: i64,
    pub loyalty_balance: i64,
    pub now: DateTime<Utc>,
}

/// Why an order cannot be priced or placed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    /// Malformed request.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    InvalidLine(#[from] LineError),
    #[error(transparent)]
    InvalidPoints(#[from] LoyaltyError),
    #[error(transparent)]
    MethodUnavailable(#[from] ShippingError),
    #[error("Voucher can no longer be applied: {0}")]
    VoucherNoLongerValid(VoucherRejection),
    #[error("Not enough loyalty points: requested {requested}, available {available}")]
    InsufficientPoints { requested: i64, available: i64 },
    /// The recomputed total differs from what the customer confirmed.
    #[error("Order total changed: submitted {submitted}, computed {computed}")]
    PreviewStale { submitted: Money, computed: Money },
}

/// An order line with its derived prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotedLine {
    #[serde(flatten)]
    pub line: OrderLine,
    pub actual_unit_price: Money,
    pub line_total: Money,
}

impl From<OrderLine> for QuotedLine {
    fn from(line: OrderLine) -> Self {
        Self {
            actual_unit_price: line.actual_unit_price(),
            line_total: line.line_total(),
            line,
        }
    }
}

/// A fully priced order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuote {
    pub order_lines: Vec<QuotedLine>,
    pub shipping_method: String,
    pub shipping_method_name: String,
    /// `null` when no voucher is applied.
    pub voucher_code: Option<VoucherCode>,
    #[serde(skip)]
    pub voucher_id: Option<VoucherId>,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub discount: Money,
    pub points_applied: i64,
    pub total_amount: Money,
}

impl OrderQuote {
    /// `max(0, subtotal + shipping_fee - discount - points)`.
    ///
    /// Voucher and points are both taken off the full subtotal; they are not
    /// compounded.
    #[must_use]
    pub fn total(subtotal: Money, shipping_fee: Money, discount: Money, points: i64) -> Money {
        (subtotal + shipping_fee)
            .saturating_sub(discount)
            .saturating_sub(Money::new(points))
            .non_negative()
    }
}

/// Part of the preview request a notice refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeField {
    VoucherCode,
    PointsToApply,
    ShippingMethod,
}

/// Explains an element the preview dropped or adjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewNotice {
    pub field: NoticeField,
    pub reason: String,
}

/// Best-effort priced projection shown before confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub quote: OrderQuote,
    /// Outcome of the voucher check, when a code was entered.
    pub voucher: Option<VoucherEvaluation>,
    pub redemption: Redemption,
    pub notices: Vec<PreviewNotice>,
}

/// Price an order for display.
///
/// A rejected voucher is dropped, an unavailable shipping method falls back
/// to the default one and an excessive point request is clamped; each adds a
/// notice. The arithmetic matches [`finalize`] exactly, so confirming an
/// unchanged preview always succeeds.
///
/// # Errors
///
/// Fails only for malformed input (no lines, invalid lines, negative points)
/// or when no shipping method is available at all.
pub fn preview(input: &CheckoutInput<'_>) -> Result<Preview, CheckoutError> {
    let (order_lines, subtotal) = price_lines(&input.lines)?;
    let mut notices = Vec::new();

    let method = match input.shipping_method {
        None => input.catalog.default_method()?,
        Some(code) => match input.catalog.resolve(code) {
            Ok(method) => method,
            Err(err) => {
                let fallback = input.catalog.default_method()?;
                notices.push(PreviewNotice {
                    field: NoticeField::ShippingMethod,
                    reason: format!("{err}; using {} instead", fallback.name),
                });
                fallback
            }
        },
    };

    let mut evaluation = None;
    let mut applied = None;
    if let Some(lookup) = &input.voucher {
        let result = voucher::validate(lookup, subtotal, input.now);
        evaluation = Some(VoucherEvaluation::from_result(lookup.code().clone(), &result));
        match result {
            Ok(voucher) => applied = Some(voucher),
            Err(rejection) => notices.push(PreviewNotice {
                field: NoticeField::VoucherCode,
                reason: rejection.to_string(),
            }),
        }
    }

    let redemption = redeem_points(input, subtotal)?;
    if redemption.was_clamped() {
        notices.push(PreviewNotice {
            field: NoticeField::PointsToApply,
            reason: format!(
                "At most {} points can be applied to this order",
                redemption.max_applicable
            ),
        });
    }

    Ok(Preview {
        quote: assemble(order_lines, subtotal, method, applied, redemption.points_applied),
        voucher: evaluation,
        redemption,
        notices,
    })
}

/// Re-price an order at creation time and check it against what the
/// customer confirmed.
///
/// # Errors
///
/// - [`CheckoutError::Validation`] if no shipping method was chosen or the lines are empty
/// - [`CheckoutError::MethodUnavailable`] if the method is inactive or unknown
/// - [`CheckoutError::VoucherNoLongerValid`] if the voucher fails any check
/// - [`CheckoutError::InsufficientPoints`] if the request exceeds the balance
/// - [`CheckoutError::PreviewStale`] if the recomputed total differs from `submitted_total`
pub fn finalize(
    input: &CheckoutInput<'_>,
    submitted_total: Money,
) -> Result<OrderQuote, CheckoutError> {
    let (order_lines, subtotal) = price_lines(&input.lines)?;

    let code = input
        .shipping_method
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| CheckoutError::Validation("A shipping method is required".to_owned()))?;
    let method = input.catalog.resolve(code)?;

    let applied = input
        .voucher
        .as_ref()
        .map(|lookup| voucher::validate(lookup, subtotal, input.now))
        .transpose()
        .map_err(CheckoutError::VoucherNoLongerValid)?;

    let available = input.loyalty_balance.max(0);
    if input.points_requested > available {
        return Err(CheckoutError::InsufficientPoints {
            requested: input.points_requested,
            available,
        });
    }
    let redemption = redeem_points(input, subtotal)?;

    let quote = assemble(order_lines, subtotal, method, applied, redemption.points_applied);
    if quote.total_amount != submitted_total {
        return Err(CheckoutError::PreviewStale {
            submitted: submitted_total,
            computed: quote.total_amount,
        });
    }
    Ok(quote)
}

fn price_lines(lines: &[OrderLine]) -> Result<(Vec<QuotedLine>, Money), CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::Validation(
            "An order must contain at least one product".to_owned(),
        ));
    }
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        line.validate()?;
        if !seen.insert(line.product_id) {
            return Err(CheckoutError::Validation(format!(
                "Product {} appears more than once",
                line.product_id
            )));
        }
    }

    let quoted: Vec<QuotedLine> = lines.iter().cloned().map(QuotedLine::from).collect();
    let subtotal = quoted.iter().map(|l| l.line_total).sum();
    Ok((quoted, subtotal))
}

fn redeem_points(input: &CheckoutInput<'_>, subtotal: Money) -> Result<Redemption, LoyaltyError> {
    if input.points_requested == 0 {
        return Ok(Redemption::NONE);
    }
    loyalty::redeem(input.points_requested, input.loyalty_balance, subtotal)
}

fn assemble(
    order_lines: Vec<QuotedLine>,
    subtotal: Money,
    method: &ShippingMethod,
    applied: Option<voucher::AppliedVoucher>,
    points_applied: i64,
) -> OrderQuote {
    let discount = applied.as_ref().map_or(Money::ZERO, |v| v.discount);
    let (voucher_code, voucher_id) = applied.map_or((None, None), |v| (Some(v.code), Some(v.voucher_id)));

    OrderQuote {
        order_lines,
        shipping_method: method.code.clone(),
        shipping_method_name: method.name.clone(),
        voucher_code,
        voucher_id,
        subtotal,
        shipping_fee: method.fee,
        discount,
        points_applied,
        total_amount: OrderQuote::total(subtotal, method.fee, discount, points_applied),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::*;
    use crate::pricing::voucher::{UserVoucher, Voucher};
    use crate::{CustomerId, DiscountType, ProductId, VoucherVisibility};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    fn catalog() -> ShippingCatalog {
        ShippingCatalog::new(vec![
            ShippingMethod {
                code: "standard".to_owned(),
                name: "Standard".to_owned(),
                fee: Money::new(30_000),
                is_active: true,
                sort_order: 0,
            },
            ShippingMethod {
                code: "express".to_owned(),
                name: "Express".to_owned(),
                fee: Money::new(60_000),
                is_active: true,
                sort_order: 1,
            },
            ShippingMethod {
                code: "pickup".to_owned(),
                name: "Store pickup".to_owned(),
                fee: Money::ZERO,
                is_active: false,
                sort_order: 2,
            },
        ])
    }

    fn line(id: i32, unit_price: i64, quantity: u32) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(id),
            product_name: format!("Product {id}"),
            image_url: None,
            unit_price: Money::new(unit_price),
            discount_percent: Decimal::ZERO,
            quantity,
        }
    }

    fn voucher(min_purchase: i64) -> VoucherLookup {
        VoucherLookup::Found {
            voucher: Voucher {
                id: VoucherId::new(3),
                code: VoucherCode::parse("SPRING20").unwrap(),
                visibility: VoucherVisibility::Public,
                discount_type: DiscountType::Percentage,
                discount_value: Decimal::from(20),
                min_purchase_amount: Money::new(min_purchase),
                max_discount_amount: Some(Money::new(80_000)),
                usage_limit: None,
                used_count: 0,
                per_user_limit: 1,
                start_date: now() - Duration::days(1),
                end_date: now() + Duration::days(1),
                is_active: true,
            },
            redemption: Some(UserVoucher {
                customer_id: CustomerId::new(1),
                voucher_id: VoucherId::new(3),
                usage_count: 0,
            }),
        }
    }

    fn input(catalog: &ShippingCatalog) -> CheckoutInput<'_> {
        CheckoutInput {
            lines: vec![line(1, 200_000, 2), line(2, 100_000, 1)],
            catalog,
            shipping_method: Some("standard"),
            voucher: Some(voucher(200_000)),
            points_requested: 100_000,
            loyalty_balance: 200_000,
            now: now(),
        }
    }

    #[test]
    fn test_preview_full_scenario() {
        let catalog = catalog();
        let preview = preview(&input(&catalog)).unwrap();
        let quote = &preview.quote;

        assert_eq!(quote.subtotal, Money::new(500_000));
        assert_eq!(quote.discount, Money::new(80_000));
        assert_eq!(quote.shipping_fee, Money::new(30_000));
        assert_eq!(quote.points_applied, 100_000);
        assert_eq!(quote.total_amount, Money::new(350_000));
        assert_eq!(quote.voucher_code.as_ref().map(VoucherCode::as_str), Some("SPRING20"));
        assert!(preview.notices.is_empty());
    }

    #[test]
    fn test_preview_clamps_points_with_notice() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.points_requested = 300_000;
        input.loyalty_balance = 400_000;
        let preview = preview(&input).unwrap();

        assert_eq!(preview.quote.points_applied, 250_000);
        assert_eq!(preview.notices.len(), 1);
        assert_eq!(preview.notices[0].field, NoticeField::PointsToApply);
    }

    #[test]
    fn test_preview_drops_rejected_voucher() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.voucher = Some(voucher(600_000));
        let preview = preview(&input).unwrap();

        assert_eq!(preview.quote.discount, Money::ZERO);
        assert_eq!(preview.quote.voucher_code, None);
        let evaluation = preview.voucher.unwrap();
        assert!(!evaluation.applicable);
        assert_eq!(evaluation.reason_kind, Some("below_minimum"));
        assert_eq!(preview.notices[0].field, NoticeField::VoucherCode);
    }

    #[test]
    fn test_preview_defaults_shipping_method() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.shipping_method = None;
        let preview = preview(&input).unwrap();

        assert_eq!(preview.quote.shipping_method, "standard");
        assert!(preview.notices.is_empty());
    }

    #[test]
    fn test_preview_falls_back_from_inactive_method() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.shipping_method = Some("pickup");
        let preview = preview(&input).unwrap();

        assert_eq!(preview.quote.shipping_method, "standard");
        assert_eq!(preview.notices[0].field, NoticeField::ShippingMethod);
    }

    #[test]
    fn test_preview_without_voucher_or_points() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.voucher = None;
        input.points_requested = 0;
        let preview = preview(&input).unwrap();

        assert_eq!(preview.quote.total_amount, Money::new(530_000));
        assert_eq!(preview.voucher, None);
        assert_eq!(preview.redemption, Redemption::NONE);
    }

    #[test]
    fn test_preview_rejects_negative_points() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.points_requested = -5;
        assert!(matches!(
            preview(&input),
            Err(CheckoutError::InvalidPoints(LoyaltyError::NegativeRequest(-5)))
        ));
    }

    #[test]
    fn test_preview_rejects_empty_and_duplicate_lines() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.lines.clear();
        assert!(matches!(preview(&input), Err(CheckoutError::Validation(_))));

        input.lines = vec![line(1, 10, 1), line(1, 10, 2)];
        assert!(matches!(preview(&input), Err(CheckoutError::Validation(_))));
    }

    #[test]
    fn test_preview_is_idempotent() {
        let catalog = catalog();
        let input = input(&catalog);
        let first = serde_json::to_string(&preview(&input).unwrap()).unwrap();
        let second = serde_json::to_string(&preview(&input).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_finalize_accepts_matching_total() {
        let catalog = catalog();
        let quote = finalize(&input(&catalog), Money::new(350_000)).unwrap();
        assert_eq!(quote.voucher_id, Some(VoucherId::new(3)));
        assert_eq!(quote.points_applied, 100_000);
    }

    #[test]
    fn test_finalize_detects_lowered_total() {
        let catalog = catalog();
        assert_eq!(
            finalize(&input(&catalog), Money::new(300_000)),
            Err(CheckoutError::PreviewStale {
                submitted: Money::new(300_000),
                computed: Money::new(350_000),
            })
        );
    }

    #[test]
    fn test_finalize_requires_shipping_method() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.shipping_method = None;
        assert!(matches!(
            finalize(&input, Money::new(350_000)),
            Err(CheckoutError::Validation(_))
        ));

        input.shipping_method = Some("pickup");
        assert!(matches!(
            finalize(&input, Money::new(350_000)),
            Err(CheckoutError::MethodUnavailable(ShippingError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_finalize_rejects_invalid_voucher() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.voucher = Some(voucher(600_000));
        assert!(matches!(
            finalize(&input, Money::new(350_000)),
            Err(CheckoutError::VoucherNoLongerValid(VoucherRejection::BelowMinimum { .. }))
        ));
    }

    #[test]
    fn test_finalize_rejects_points_above_balance() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.loyalty_balance = 50_000;
        assert_eq!(
            finalize(&input, Money::new(350_000)),
            Err(CheckoutError::InsufficientPoints {
                requested: 100_000,
                available: 50_000,
            })
        );
    }

    #[test]
    fn test_total_clamps_at_zero() {
        assert_eq!(
            OrderQuote::total(Money::new(100), Money::new(10), Money::new(100), 50),
            Money::ZERO
        );
    }

    #[test]
    fn test_quote_serializes_null_voucher_code() {
        let catalog = catalog();
        let mut input = input(&catalog);
        input.voucher = None;
        let json = serde_json::to_value(preview(&input).unwrap().quote).unwrap();
        assert!(json.get("voucherCode").is_some_and(serde_json::Value::is_null));
        assert!(json.get("voucherId").is_none());
        assert_eq!(json["orderLines"][0]["lineTotal"], 400_000);
    }

    fn arb_voucher() -> impl Strategy<Value = VoucherLookup> {
        (1u32..=100, prop::option::of(0i64..200_000), any::<bool>()).prop_map(
            |(percent, cap, fixed)| {
                let VoucherLookup::Found { mut voucher, redemption } = voucher(0) else {
                    unreachable!()
                };
                voucher.discount_value = Decimal::from(percent);
                voucher.max_discount_amount = cap.map(Money::new);
                if fixed {
                    voucher.discount_type = DiscountType::Fixed;
                    voucher.discount_value = Decimal::from(u64::from(percent) * 10_000);
                }
                VoucherLookup::Found { voucher, redemption }
            },
        )
    }

    proptest! {
        #[test]
        fn prop_total_never_negative(
            prices in prop::collection::vec((0i64..2_000_000, 1u32..5), 1..5),
            points in 0i64..5_000_000,
            balance in 0i64..5_000_000,
            lookup in prop::option::of(arb_voucher()),
        ) {
            let catalog = catalog();
            let lines = prices
                .iter()
                .zip(1..)
                .map(|((price, qty), id)| line(id, *price, *qty))
                .collect();
            let input = CheckoutInput {
                lines,
                catalog: &catalog,
                shipping_method: Some("express"),
                voucher: lookup,
                points_requested: points,
                loyalty_balance: balance,
                now: now(),
            };
            let preview = preview(&input).unwrap();
            let quote = &preview.quote;

            prop_assert!(quote.total_amount >= Money::ZERO);
            prop_assert!(quote.points_applied <= quote.subtotal.half_floor().amount());
            prop_assert!(quote.points_applied <= balance);
            prop_assert!(quote.discount <= quote.subtotal);
        }

        #[test]
        fn prop_percentage_discount_respects_cap(
            subtotal in 0i64..1_000_000_000,
            percent in 1u32..=100,
            cap in 0i64..500_000,
        ) {
            let VoucherLookup::Found { mut voucher, .. } = voucher(0) else {
                unreachable!()
            };
            voucher.discount_value = Decimal::from(percent);
            voucher.max_discount_amount = Some(Money::new(cap));
            prop_assert!(voucher.discount_for(Money::new(subtotal)) <= Money::new(cap));
        }

        #[test]
        fn prop_unchanged_preview_finalizes(
            points in 0i64..400_000,
            method in prop::sample::select(vec!["standard", "express"]),
        ) {
            let catalog = catalog();
            let mut input = input(&catalog);
            input.points_requested = points;
            input.loyalty_balance = 400_000;
            input.shipping_method = Some(method);
            let previewed = preview(&input).unwrap().quote;

            input.points_requested = previewed.points_applied;
            let finalized = finalize(&input, previewed.total_amount).unwrap();
            prop_assert_eq!(finalized, previewed);
        }
    }
}
