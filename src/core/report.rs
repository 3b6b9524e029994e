//! Admin reports.
//!
//! Platform-wide counters for the dashboard and a CSV export of completed needs. All
//! functions return plain data; the HTTP layer decides how to serve it.

use crate::{
    entities::{
        ChatRoom, Home, Message, Need, NeedStatus, VerificationStatus, chat_room, home, need,
    },
    errors::Result,
};
use sea_orm::{Iterable, QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Header row of the completed-needs export.
pub const COMPLETED_NEEDS_HEADER: &str = "id,title,category,home,quantity,completed_at";

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformStats {
    /// Homes per verification status
    pub homes_by_status: BTreeMap<String, u64>,
    /// Needs per fulfillment status
    pub needs_by_status: BTreeMap<String, u64>,
    /// Rooms (pledges) ever opened
    pub rooms_total: u64,
    /// Rooms still open for messages
    pub rooms_active: u64,
    /// Messages ever sent
    pub messages_total: u64,
    /// Units pledged across all needs
    pub pledged_units: i64,
}

/// Collects the dashboard counters.
pub async fn platform_stats(db: &DatabaseConnection) -> Result<PlatformStats> {
    let mut stats = PlatformStats::default();

    for status in VerificationStatus::iter() {
        let count = Home::find()
            .filter(home::Column::VerificationStatus.eq(status))
            .count(db)
            .await?;
        stats.homes_by_status.insert(status.as_str().to_string(), count);
    }
    for status in NeedStatus::iter() {
        let count = Need::find()
            .filter(need::Column::Status.eq(status))
            .count(db)
            .await?;
        stats.needs_by_status.insert(status.as_str().to_string(), count);
    }

    stats.rooms_total = ChatRoom::find().count(db).await?;
    stats.rooms_active = ChatRoom::find()
        .filter(chat_room::Column::IsActive.eq(true))
        .count(db)
        .await?;
    stats.messages_total = Message::find().count(db).await?;
    stats.pledged_units = ChatRoom::find()
        .select_only()
        .column_as(chat_room::Column::Quantity.sum(), "pledged_units")
        .into_tuple::<Option<i64>>()
        .one(db)
        .await?
        .flatten()
        .unwrap_or(0);

    Ok(stats)
}

/// Quotes a CSV field when it contains a separator, quote or line break.
#[must_use]
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Exports completed needs as CSV, oldest completion first.
///
/// `since` keeps only needs completed at or after that instant.
pub async fn completed_needs_csv(
    db: &DatabaseConnection,
    since: Option<DateTimeUtc>,
) -> Result<String> {
    let mut query = Need::find()
        .find_also_related(Home)
        .filter(need::Column::Status.eq(NeedStatus::Completed))
        .order_by_asc(need::Column::CompletedAt)
        .order_by_asc(need::Column::Id);
    if let Some(since) = since {
        query = query.filter(need::Column::CompletedAt.gte(since));
    }

    let mut out = String::from(COMPLETED_NEEDS_HEADER);
    out.push('\n');
    for (need, home) in query.all(db).await? {
        let home_name = home.map(|h| h.name).unwrap_or_default();
        let completed_at = need
            .completed_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            need.id,
            csv_escape(&need.title),
            need.category.as_str(),
            csv_escape(&home_name),
            need.quantity,
            completed_at
        );
    }
    Ok(out)
}
