//! Adaptive Card encoding for summary records.
//!
//! Pure translation from a [`SummaryRecord`] to the Adaptive Card v1.4 JSON
//! the webhook renders: a header container styled `attention` when anything
//! failed (`good` otherwise), the suite timestamps, the derived total, and
//! the four outcome counts in a two-by-two column layout.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::summary::SummaryRecord;

/// Encode a finalized record as an Adaptive Card.
pub fn encode(record: &SummaryRecord) -> Value {
    let style = if record.metrics.failed > 0 {
        "attention"
    } else {
        "good"
    };

    json!({
        "type": "AdaptiveCard",
        "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
        "version": "1.4",
        "body": [
            {
                "type": "Container",
                "style": style,
                "bleed": true,
                "items": [
                    {
                        "type": "TextBlock",
                        "text": record.title,
                        "wrap": true,
                        "fontType": "Monospace",
                        "size": "Medium",
                        "weight": "Bolder",
                        "isSubtle": false,
                        "horizontalAlignment": "Center"
                    }
                ]
            },
            {
                "type": "Container",
                "items": [
                    text_block(format!("Start time - {}", format_time(record.start))),
                    text_block(format!("End time - {}", end_time(record))),
                    text_block(format!("Total - {}", record.metrics.total)),
                    {
                        "type": "ColumnSet",
                        "columns": [
                            count_column(format!("Passed - {}", record.metrics.passed), "Good"),
                            count_column(format!("Failed - {}", record.metrics.failed), "Attention"),
                        ]
                    },
                    {
                        "type": "ColumnSet",
                        "columns": [
                            count_column(format!("Skipped - {}", record.metrics.skipped), "Warning"),
                            count_column(format!("Retried - {}", record.metrics.retried), "Warning"),
                        ]
                    }
                ]
            }
        ]
    })
}

fn text_block(text: String) -> Value {
    json!({
        "type": "TextBlock",
        "text": text,
        "wrap": true,
        "fontType": "Monospace",
        "horizontalAlignment": "Center"
    })
}

fn count_column(text: String, color: &str) -> Value {
    json!({
        "type": "Column",
        "width": "stretch",
        "items": [
            {
                "type": "TextBlock",
                "text": text,
                "wrap": true,
                "horizontalAlignment": "Center",
                "fontType": "Monospace",
                "color": color
            }
        ]
    })
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc2822()
}

fn end_time(record: &SummaryRecord) -> String {
    match record.end {
        Some(end) => format_time(end),
        None => "NA".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TestOutcome;
    use chrono::TimeZone;

    fn finished_record(failed: u64) -> SummaryRecord {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut record = SummaryRecord::new("Login Tests", start);
        for _ in 0..3 {
            record.metrics.record(TestOutcome::Passed);
        }
        for _ in 0..failed {
            record.metrics.record(TestOutcome::Failed);
        }
        record.finalize(start + chrono::Duration::seconds(60));
        record
    }

    #[test]
    fn test_failed_suite_uses_attention_style() {
        let card = encode(&finished_record(1));
        assert_eq!(card["body"][0]["style"], "attention");
    }

    #[test]
    fn test_clean_suite_uses_good_style() {
        let card = encode(&finished_record(0));
        assert_eq!(card["body"][0]["style"], "good");
    }

    #[test]
    fn test_card_carries_title_and_counts() {
        let card = encode(&finished_record(1));
        assert_eq!(card["body"][0]["items"][0]["text"], "Login Tests");

        let body = &card["body"][1]["items"];
        assert_eq!(body[2]["text"], "Total - 4");
        assert_eq!(body[3]["columns"][0]["items"][0]["text"], "Passed - 3");
        assert_eq!(body[3]["columns"][1]["items"][0]["text"], "Failed - 1");
        assert_eq!(body[4]["columns"][0]["items"][0]["text"], "Skipped - 0");
        assert_eq!(body[4]["columns"][1]["items"][0]["text"], "Retried - 0");
    }

    #[test]
    fn test_unfinished_record_reports_na_end_time() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = SummaryRecord::new("Still running", start);
        let card = encode(&record);
        assert_eq!(card["body"][1]["items"][1]["text"], "End time - NA");
    }
}
