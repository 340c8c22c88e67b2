//! Per-topic and whole-run harvest reports

use crate::crawler::CrawlReport;
use crate::pipeline::PipelineStats;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::time::Duration;

/// Everything known about one topic after its pipeline closed
#[derive(Debug, Clone)]
pub struct TopicReport {
    pub topic: String,
    pub destination: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub crawl: CrawlReport,
    pub pipeline: PipelineStats,
}

impl TopicReport {
    pub fn rows_written(&self) -> usize {
        self.pipeline.rows_written
    }

    pub fn failed_pages(&self) -> Vec<usize> {
        self.crawl.failed_pages()
    }

    /// True if every page succeeded
    pub fn is_complete(&self) -> bool {
        self.crawl.is_complete()
    }
}

/// Reports for every topic of a run, in processing order
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    pub topics: Vec<TopicReport>,
}

impl HarvestSummary {
    pub fn total_rows(&self) -> usize {
        self.topics.iter().map(TopicReport::rows_written).sum()
    }

    pub fn total_failed_pages(&self) -> usize {
        self.topics.iter().map(|t| t.crawl.failures.len()).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.topics.iter().all(TopicReport::is_complete)
    }
}

/// Renders the summary as plain text
pub fn render_summary(summary: &HarvestSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Harvest Summary ===");
    for topic in &summary.topics {
        let _ = writeln!(out);
        let _ = writeln!(out, "Topic: {}", topic.topic);
        let _ = writeln!(out, "  Destination: {}", topic.destination);
        let _ = writeln!(
            out,
            "  Started: {} ({:.2}s)",
            topic.started_at.to_rfc3339(),
            topic.duration.as_secs_f64()
        );
        let _ = writeln!(
            out,
            "  Pages: {}/{} succeeded",
            topic.crawl.pages_succeeded.len(),
            topic.crawl.pages_requested
        );
        let _ = writeln!(
            out,
            "  Rows written: {} ({} batches, {} duplicates dropped)",
            topic.pipeline.rows_written, topic.pipeline.batches_written, topic.pipeline.duplicates
        );

        for failure in &topic.crawl.failures {
            let _ = writeln!(out, "  ✗ page {}: {}", failure.page_index, failure.message);
        }
        for message in &topic.crawl.storage_errors {
            let _ = writeln!(out, "  ! storage: {}", message);
        }
        for message in &topic.crawl.worker_errors {
            let _ = writeln!(out, "  ! worker: {}", message);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total: {} rows across {} topics, {} failed pages",
        summary.total_rows(),
        summary.topics.len(),
        summary.total_failed_pages()
    );

    out
}

/// Prints the summary to stdout
pub fn print_summary(summary: &HarvestSummary) {
    print!("{}", render_summary(summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::PageFailure;

    fn topic_report(topic: &str, rows: usize, failures: Vec<PageFailure>) -> TopicReport {
        TopicReport {
            topic: topic.to_string(),
            destination: format!("./{}.csv", topic),
            started_at: Utc::now(),
            duration: Duration::from_millis(1500),
            crawl: CrawlReport {
                pages_requested: 3,
                pages_succeeded: (0..3 - failures.len()).collect(),
                failures,
                ..CrawlReport::default()
            },
            pipeline: PipelineStats {
                accepted: rows,
                rows_written: rows,
                batches_written: 1,
                ..PipelineStats::default()
            },
        }
    }

    #[test]
    fn test_totals() {
        let summary = HarvestSummary {
            topics: vec![
                topic_report("a", 30, vec![]),
                topic_report(
                    "b",
                    10,
                    vec![PageFailure {
                        page_index: 2,
                        message: "boom".to_string(),
                    }],
                ),
            ],
        };

        assert_eq!(summary.total_rows(), 40);
        assert_eq!(summary.total_failed_pages(), 1);
        assert!(!summary.is_complete());
        assert_eq!(summary.topics[1].failed_pages(), vec![2]);
    }

    #[test]
    fn test_render_lists_failures() {
        let summary = HarvestSummary {
            topics: vec![topic_report(
                "software-engineer",
                20,
                vec![PageFailure {
                    page_index: 1,
                    message: "Max retries exceeded".to_string(),
                }],
            )],
        };

        let text = render_summary(&summary);
        assert!(text.contains("Topic: software-engineer"));
        assert!(text.contains("Pages: 2/3 succeeded"));
        assert!(text.contains("page 1: Max retries exceeded"));
        assert!(text.contains("Total: 20 rows across 1 topics, 1 failed pages"));
    }

    #[test]
    fn test_empty_summary_is_complete() {
        let summary = HarvestSummary::default();
        assert!(summary.is_complete());
        assert_eq!(summary.total_rows(), 0);
    }
}
