// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Search, time window and sort order applied to the reconciled receipts.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::receipt::ReceiptRecord;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    All,
    #[serde(rename = "week")]
    #[strum(serialize = "week")]
    PastWeek,
    #[serde(rename = "month")]
    #[strum(serialize = "month")]
    PastMonth,
    #[serde(rename = "year")]
    #[strum(serialize = "year")]
    PastYear,
}

impl TimeWindow {
    /// Length of the window, `None` for [`TimeWindow::All`].
    pub fn span(self) -> Option<TimeDelta> {
        match self {
            TimeWindow::All => None,
            TimeWindow::PastWeek => Some(TimeDelta::days(7)),
            TimeWindow::PastMonth => Some(TimeDelta::days(30)),
            TimeWindow::PastYear => Some(TimeDelta::days(365)),
        }
    }

    /// Earliest day still inside the window.
    fn first_day(self, now: DateTime<Utc>) -> Option<NaiveDate> {
        self.span().map(|span| (now - span).date_naive())
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    /// Case-insensitive search over retailer name, metadata payload and
    /// amount
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub window: TimeWindow,
    #[serde(default)]
    pub order: SortOrder,
}

/// Applies `view` to `records` as of now.
pub fn filter_and_sort(records: &[ReceiptRecord], view: &ViewQuery) -> Vec<ReceiptRecord> {
    filter_and_sort_at(records, view, Utc::now())
}

/// Applies `view` to `records` as of `now`.
///
/// A record is inside a time window when its date is on or after the day
/// the window starts. Records whose date cannot be parsed only survive the
/// [`TimeWindow::All`] window and always sort last.
pub fn filter_and_sort_at(
    records: &[ReceiptRecord],
    view: &ViewQuery,
    now: DateTime<Utc>,
) -> Vec<ReceiptRecord> {
    let needle = view.query.trim().to_lowercase();
    let first_day = view.window.first_day(now);

    let mut selected: Vec<(Option<NaiveDate>, &ReceiptRecord)> = records
        .iter()
        .filter(|record| needle.is_empty() || matches_query(record, &needle))
        .map(|record| (record.parsed_date(), record))
        .filter(|(date, _)| match (first_day, date) {
            (None, _) => true,
            (Some(first_day), Some(date)) => *date >= first_day,
            (Some(_), None) => false,
        })
        .collect();

    selected.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => match view.order {
            SortOrder::Newest => b.cmp(a),
            SortOrder::Oldest => a.cmp(b),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    selected
        .into_iter()
        .map(|(_, record)| record.clone())
        .collect()
}

fn matches_query(record: &ReceiptRecord, needle: &str) -> bool {
    [
        &record.retailer_name,
        &record.metadata_payload,
        &record.amount,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}
