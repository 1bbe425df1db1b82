//! Dashboard report: delivery rate, monthly volumes, template categories.

use chrono::{DateTime, Datelike, Duration, Utc};
use database::{customer, message_history, template, DeliveryStatus};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::Result;

/// How many calendar months the monthly series covers, current month included.
const MONTHS_SHOWN: usize = 6;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One month of send/delivery volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    /// Label like "Mar 26".
    pub month: String,
    /// Recipients of broadcasts sent this month (sum of customer counts).
    pub sent: i64,
    /// Delivery-confirmed log rows created this month.
    pub delivered: i64,
}

/// Active template count for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Everything the dashboard shows, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub total_messages: i64,
    pub delivered_messages: i64,
    /// Percentage rounded to two decimals; 0.0 when nothing was sent.
    pub delivery_rate: f64,
    pub total_customers: i64,
    pub active_templates: i64,
    /// Last six calendar months, oldest first.
    pub monthly: Vec<MonthBucket>,
    /// Active templates per category, most numerous first.
    pub categories: Vec<CategoryCount>,
}

/// Compute the full report for one user.
pub async fn report(pool: &SqlitePool, user_id: &str) -> Result<AnalyticsReport> {
    report_at(pool, user_id, Utc::now()).await
}

/// Same as [`report`] but with an explicit "now", so the monthly window is
/// deterministic under test.
pub async fn report_at(
    pool: &SqlitePool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<AnalyticsReport> {
    let total_messages = message_history::count_history(pool, user_id).await?;
    let delivered_messages =
        message_history::count_logs_with_status(pool, user_id, DeliveryStatus::Delivered).await?;
    let delivery_rate = if total_messages == 0 {
        0.0
    } else {
        round2(delivered_messages as f64 / total_messages as f64 * 100.0)
    };

    let total_customers = customer::count_customers(pool, user_id).await?;
    let active_templates = template::count_active_templates(pool, user_id).await?;

    let monthly = monthly_series(pool, user_id, now).await?;
    let categories = template::count_by_category(pool, user_id)
        .await?
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();

    tracing::debug!(
        user_id = %user_id,
        total_messages,
        delivered_messages,
        delivery_rate,
        "analytics report computed"
    );

    Ok(AnalyticsReport {
        total_messages,
        delivered_messages,
        delivery_rate,
        total_customers,
        active_templates,
        monthly,
        categories,
    })
}

async fn monthly_series(
    pool: &SqlitePool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<MonthBucket>> {
    let keys = month_keys(now);

    // Over-fetch by date and bucket by calendar month; rows older than the
    // window simply match no key.
    let since = now - Duration::days(31 * MONTHS_SHOWN as i64);
    let history = message_history::list_history_since(pool, user_id, since).await?;
    let logs = message_history::list_logs_since(pool, user_id, since).await?;

    let mut buckets: Vec<MonthBucket> = keys
        .iter()
        .map(|&(year, month)| MonthBucket {
            month: month_label(year, month),
            sent: 0,
            delivered: 0,
        })
        .collect();

    for entry in &history {
        let key = (entry.sent_at.year(), entry.sent_at.month());
        if let Some(idx) = keys.iter().position(|&k| k == key) {
            buckets[idx].sent += entry.customer_count;
        }
    }
    for log in &logs {
        if log.delivery_status != DeliveryStatus::Delivered {
            continue;
        }
        let key = (log.created_at.year(), log.created_at.month());
        if let Some(idx) = keys.iter().position(|&k| k == key) {
            buckets[idx].delivered += 1;
        }
    }

    Ok(buckets)
}

/// (year, month) keys for the window, oldest first.
fn month_keys(now: DateTime<Utc>) -> Vec<(i32, u32)> {
    let mut keys = Vec::with_capacity(MONTHS_SHOWN);
    let mut year = now.year();
    let mut month = now.month();
    for _ in 0..MONTHS_SHOWN {
        keys.push((year, month));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    keys.reverse();
    keys
}

fn month_label(year: i32, month: u32) -> String {
    format!("{} {:02}", MONTH_NAMES[(month - 1) as usize], year.rem_euclid(100))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use database::{Database, NewCustomer};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_empty_report_has_zero_rate() {
        let db = test_db().await;

        let r = report(db.pool(), "user-1").await.unwrap();
        assert_eq!(r.total_messages, 0);
        assert_eq!(r.delivered_messages, 0);
        assert_eq!(r.delivery_rate, 0.0);
        assert_eq!(r.total_customers, 0);
        assert_eq!(r.active_templates, 0);
        assert_eq!(r.monthly.len(), MONTHS_SHOWN);
        assert!(r.monthly.iter().all(|b| b.sent == 0 && b.delivered == 0));
        assert!(r.categories.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_rate_rounds_to_two_decimals() {
        let db = test_db().await;
        let now = at(2026, 3, 15);

        let mut entry_id = String::new();
        for _ in 0..3 {
            let entry = message_history::append_history(db.pool(), "user-1", "t", "b", now, 1)
                .await
                .unwrap();
            entry_id = entry.id;
        }
        message_history::append_log(
            db.pool(),
            "user-1",
            &entry_id,
            "c-1",
            "+250788000001",
            DeliveryStatus::Delivered,
            None,
            Some(now),
            Some(now),
        )
        .await
        .unwrap();

        let r = report_at(db.pool(), "user-1", now).await.unwrap();
        assert_eq!(r.total_messages, 3);
        assert_eq!(r.delivered_messages, 1);
        // 1/3 = 33.333..., rounded to 33.33
        assert_eq!(r.delivery_rate, 33.33);
    }

    #[tokio::test]
    async fn test_monthly_series_is_ascending_and_windowed() {
        let db = test_db().await;
        let now = at(2026, 3, 15);

        // Inside the window: this month and two months back.
        message_history::append_history(db.pool(), "user-1", "a", "b", at(2026, 3, 2), 5)
            .await
            .unwrap();
        message_history::append_history(db.pool(), "user-1", "a", "b", at(2026, 1, 20), 2)
            .await
            .unwrap();
        // A year earlier: outside the window.
        message_history::append_history(db.pool(), "user-1", "a", "b", at(2025, 3, 2), 9)
            .await
            .unwrap();

        let r = report_at(db.pool(), "user-1", now).await.unwrap();
        let labels: Vec<&str> = r.monthly.iter().map(|b| b.month.as_str()).collect();
        assert_eq!(labels, vec!["Oct 25", "Nov 25", "Dec 25", "Jan 26", "Feb 26", "Mar 26"]);

        let sent: Vec<i64> = r.monthly.iter().map(|b| b.sent).collect();
        assert_eq!(sent, vec![0, 0, 0, 2, 0, 5]);
    }

    #[tokio::test]
    async fn test_monthly_delivered_counts_only_delivered_logs() {
        let db = test_db().await;
        let now = at(2026, 3, 15);

        let entry = message_history::append_history(db.pool(), "user-1", "t", "b", now, 3)
            .await
            .unwrap();
        for status in [DeliveryStatus::Delivered, DeliveryStatus::Failed, DeliveryStatus::Sent] {
            message_history::append_log(
                db.pool(),
                "user-1",
                &entry.id,
                "c-1",
                "+250788000001",
                status,
                None,
                Some(now),
                None,
            )
            .await
            .unwrap();
        }
        // append_log stamps created_at with the wall clock; pin it to the
        // test's fixed "now" so the logs land in the deterministic window.
        sqlx::query("UPDATE message_logs SET created_at = ?")
            .bind(now)
            .execute(db.pool())
            .await
            .unwrap();

        let r = report_at(db.pool(), "user-1", now).await.unwrap();
        let current = r.monthly.last().unwrap();
        assert_eq!(current.delivered, 1);
    }

    #[tokio::test]
    async fn test_counts_and_categories() {
        let db = test_db().await;

        customer::create_customer(
            db.pool(),
            "user-1",
            &NewCustomer {
                name: "Alice Uwase".to_string(),
                phone_number: "+250788000001".to_string(),
                segment: None,
            },
        )
        .await
        .unwrap();

        template::create_template(db.pool(), "user-1", "Promo", "Hi {name}", Some("marketing"), vec!["name".to_string()])
            .await
            .unwrap();
        template::create_template(db.pool(), "user-1", "Promo 2", "Hello", Some("marketing"), vec![])
            .await
            .unwrap();
        template::create_template(db.pool(), "user-1", "Note", "Body", None, vec![])
            .await
            .unwrap();
        // Other users never leak into the report.
        template::create_template(db.pool(), "user-2", "Other", "Body", Some("marketing"), vec![])
            .await
            .unwrap();

        let r = report(db.pool(), "user-1").await.unwrap();
        assert_eq!(r.total_customers, 1);
        assert_eq!(r.active_templates, 3);
        assert_eq!(r.categories.len(), 2);
        assert_eq!(r.categories[0].category, "marketing");
        assert_eq!(r.categories[0].count, 2);
        assert_eq!(r.categories[1].category, "uncategorized");
        assert_eq!(r.categories[1].count, 1);
    }
}
