use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::OutputFormat;

pub trait Formatter {
    fn format_run_stats(&self, stats: &RunStats) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub units_read: u64,
    pub records: u64,
    pub failures: u64,
    pub batch_size: usize,
    pub concurrency_limit: usize,
    pub mode: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunStats {
    /// Number of provider batches a run of this size forms.
    pub fn batches(&self) -> u64 {
        if self.batch_size == 0 {
            return 0;
        }
        self.units_read.div_ceil(self.batch_size as u64)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub embedding_url: String,
    pub healthy: bool,
    pub model_id: Option<String>,
    pub concurrency_limit: usize,
    pub batch_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_run_stats(&self, stats: &RunStats) -> String {
        let mut output = String::new();
        let title = if stats.error.is_some() {
            "Vectorization aborted"
        } else {
            "Vectorization complete"
        };
        writeln!(output, "{title}").unwrap();
        writeln!(output, "  Units read:   {}", stats.units_read).unwrap();
        writeln!(output, "  Records:      {}", stats.records).unwrap();
        if stats.failures > 0 {
            writeln!(output, "  Failures:     {}", stats.failures).unwrap();
        }
        writeln!(
            output,
            "  Batches:      {} (size {}, {} in flight, {} mode)",
            stats.batches(),
            stats.batch_size,
            stats.concurrency_limit,
            stats.mode
        )
        .unwrap();
        writeln!(output, "  Duration:     {}ms", stats.duration_ms).unwrap();
        if let Some(ref error) = stats.error {
            writeln!(output, "  Error:        {error}").unwrap();
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        let state = if status.healthy {
            "[HEALTHY]"
        } else {
            "[UNREACHABLE]"
        };
        writeln!(output, "Embedding:     {} {}", state, status.embedding_url).unwrap();
        if let Some(ref model) = status.model_id {
            writeln!(output, "  Model:       {model}").unwrap();
        }
        if let Some(ref error) = status.error {
            writeln!(output, "  Error:       {error}").unwrap();
        }
        writeln!(output, "Batch size:    {}", status.batch_size).unwrap();
        writeln!(output, "Concurrency:   {}", status.concurrency_limit).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {error}")
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        let mut output = rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
        output.push('\n');
        output
    }
}

impl Formatter for JsonFormatter {
    fn format_run_stats(&self, stats: &RunStats) -> String {
        let json = serde_json::json!({
            "units_read": stats.units_read,
            "records": stats.records,
            "failures": stats.failures,
            "batches": stats.batches(),
            "batch_size": stats.batch_size,
            "concurrency_limit": stats.concurrency_limit,
            "mode": stats.mode,
            "duration_ms": stats.duration_ms,
            "error": stats.error,
        });
        self.render(&json)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(status)
    }

    fn format_message(&self, message: &str) -> String {
        self.render(&serde_json::json!({ "message": message }))
    }

    fn format_error(&self, error: &str) -> String {
        self.render(&serde_json::json!({ "error": error }))
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> RunStats {
        RunStats {
            units_read: 5,
            records: 4,
            failures: 1,
            batch_size: 2,
            concurrency_limit: 1,
            mode: "per_item".to_string(),
            duration_ms: 12,
            error: None,
        }
    }

    #[test]
    fn test_batches_rounds_up() {
        assert_eq!(stats().batches(), 3);
        let empty = RunStats::default();
        assert_eq!(empty.batches(), 0);
    }

    #[test]
    fn test_text_run_stats() {
        let output = TextFormatter.format_run_stats(&stats());
        assert!(output.starts_with("Vectorization complete"));
        assert!(output.contains("Failures:     1"));
        assert!(output.contains("3 (size 2, 1 in flight, per_item mode)"));
    }

    #[test]
    fn test_json_run_stats() {
        let mut stats = stats();
        stats.error = Some("embedding timeout".to_string());
        let output = JsonFormatter::new(false).format_run_stats(&stats);
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["batches"], 3);
        assert_eq!(json["error"], "embedding timeout");
    }
}
