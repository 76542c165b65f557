//! Data-quality gate between the raw event feed and the aggregation engine.
//!
//! Rows that cannot be attributed to a product, carry a non-positive price,
//! or fall outside the operator-chosen window are dropped silently and
//! counted. Dropping is recovery, not failure: the pipeline continues with
//! whatever valid events remain, even if that set is empty.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::DateWindow;
use crate::domain::event::{Event, EventKind, ProductSku, RawEvent};

/// Per-reason tally of rows excluded by the quality gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionStats {
    pub missing_sku: u64,
    pub non_positive_price: u64,
    pub invalid_date: u64,
    pub outside_window: u64,
    pub unknown_event_kind: u64,
}

impl ExclusionStats {
    pub fn total(&self) -> u64 {
        self.missing_sku
            + self.non_positive_price
            + self.invalid_date
            + self.outside_window
            + self.unknown_event_kind
    }
}

enum DropReason {
    MissingSku,
    NonPositivePrice,
    InvalidDate,
    OutsideWindow,
    UnknownEventKind,
}

pub fn normalize(rows: Vec<RawEvent>, window: &DateWindow) -> (Vec<Event>, ExclusionStats) {
    let mut events = Vec::with_capacity(rows.len());
    let mut stats = ExclusionStats::default();

    for row in rows {
        match canonicalize(row, window) {
            Ok(event) => events.push(event),
            Err(DropReason::MissingSku) => stats.missing_sku += 1,
            Err(DropReason::NonPositivePrice) => stats.non_positive_price += 1,
            Err(DropReason::InvalidDate) => stats.invalid_date += 1,
            Err(DropReason::OutsideWindow) => stats.outside_window += 1,
            Err(DropReason::UnknownEventKind) => stats.unknown_event_kind += 1,
        }
    }

    (events, stats)
}

fn canonicalize(row: RawEvent, window: &DateWindow) -> Result<Event, DropReason> {
    let product_sku = match row.product_sku.map(|sku| sku.trim().to_string()) {
        Some(sku) if !sku.is_empty() => ProductSku(sku),
        _ => return Err(DropReason::MissingSku),
    };

    let price = match row.price {
        Some(price) if price > Decimal::ZERO => price,
        _ => return Err(DropReason::NonPositivePrice),
    };

    let event_date = row
        .event_date
        .as_deref()
        .and_then(parse_event_date)
        .ok_or(DropReason::InvalidDate)?;
    if !window.contains(event_date) {
        return Err(DropReason::OutsideWindow);
    }

    let kind = row
        .event_name
        .as_deref()
        .and_then(EventKind::parse)
        .ok_or(DropReason::UnknownEventKind)?;

    // Revenue is only meaningful on a purchase; a stray value on any other
    // funnel stage is discarded here so it can never reach a revenue sum.
    let revenue = if kind == EventKind::Purchase { row.revenue } else { None };

    Ok(Event {
        product_sku,
        product_name: non_empty(row.product_name),
        category: non_empty(row.category),
        brand: non_empty(row.brand),
        price,
        event_date,
        user_id: non_empty(row.user_id),
        kind,
        revenue,
        country: non_empty(row.country),
        device_category: non_empty(row.device_category),
    })
}

fn parse_event_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::config::DateWindow;
    use crate::domain::event::{EventKind, RawEvent};

    use super::normalize;

    fn window() -> DateWindow {
        DateWindow {
            start: NaiveDate::from_ymd_opt(2021, 1, 1).expect("start"),
            end: NaiveDate::from_ymd_opt(2021, 3, 31).expect("end"),
        }
    }

    fn valid_row() -> RawEvent {
        RawEvent {
            product_sku: Some("SKU-1".to_string()),
            product_name: Some("Wireless Headphones".to_string()),
            category: Some("Audio".to_string()),
            brand: Some("AudioPro".to_string()),
            price: Some(Decimal::new(4999, 2)),
            event_date: Some("20210115".to_string()),
            user_id: Some("u-1".to_string()),
            event_name: Some("view_item".to_string()),
            revenue: None,
            country: Some("US".to_string()),
            device_category: Some("mobile".to_string()),
        }
    }

    #[test]
    fn keeps_valid_rows_and_counts_nothing() {
        let (events, stats) = normalize(vec![valid_row()], &window());
        assert_eq!(events.len(), 1);
        assert_eq!(stats.total(), 0);
        assert_eq!(events[0].kind, EventKind::ViewItem);
    }

    #[test]
    fn drops_rows_without_sku() {
        let mut missing = valid_row();
        missing.product_sku = None;
        let mut blank = valid_row();
        blank.product_sku = Some("   ".to_string());

        let (events, stats) = normalize(vec![missing, blank], &window());
        assert!(events.is_empty());
        assert_eq!(stats.missing_sku, 2);
    }

    #[test]
    fn drops_rows_with_non_positive_price() {
        let mut zero = valid_row();
        zero.price = Some(Decimal::ZERO);
        let mut negative = valid_row();
        negative.price = Some(Decimal::new(-100, 2));
        let mut absent = valid_row();
        absent.price = None;

        let (events, stats) = normalize(vec![zero, negative, absent], &window());
        assert!(events.is_empty());
        assert_eq!(stats.non_positive_price, 3);
    }

    #[test]
    fn drops_rows_outside_the_window() {
        let mut early = valid_row();
        early.event_date = Some("20201231".to_string());
        let mut late = valid_row();
        late.event_date = Some("20210401".to_string());

        let (events, stats) = normalize(vec![early, late], &window());
        assert!(events.is_empty());
        assert_eq!(stats.outside_window, 2);
    }

    #[test]
    fn drops_rows_with_malformed_dates_and_unknown_events() {
        let mut bad_date = valid_row();
        bad_date.event_date = Some("2021-01-15".to_string());
        let mut bad_kind = valid_row();
        bad_kind.event_name = Some("page_view".to_string());

        let (events, stats) = normalize(vec![bad_date, bad_kind], &window());
        assert!(events.is_empty());
        assert_eq!(stats.invalid_date, 1);
        assert_eq!(stats.unknown_event_kind, 1);
    }

    #[test]
    fn strips_revenue_from_non_purchase_events() {
        let mut stray = valid_row();
        stray.revenue = Some(Decimal::new(5000, 2));

        let (events, _) = normalize(vec![stray], &window());
        assert_eq!(events[0].revenue, None);
    }

    #[test]
    fn keeps_revenue_on_purchase_events() {
        let mut purchase = valid_row();
        purchase.event_name = Some("purchase".to_string());
        purchase.revenue = Some(Decimal::new(5000, 2));

        let (events, _) = normalize(vec![purchase], &window());
        assert_eq!(events[0].revenue, Some(Decimal::new(5000, 2)));
    }

    #[test]
    fn empty_valid_set_is_not_an_error() {
        let mut row = valid_row();
        row.product_sku = None;

        let (events, stats) = normalize(vec![row], &window());
        assert!(events.is_empty());
        assert_eq!(stats.total(), 1);
    }
}
