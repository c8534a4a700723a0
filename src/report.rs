//! Report sections and the host sink
//!
//! A plugin run produces an ordered list of sections plus one structured
//! data dump; both go through [`ReportSink`], which the host implements.
//! [`MemorySink`] collects everything in memory for tests and dry runs.

use anyhow::Result;
use serde::Serialize;

/// One self-contained unit of report output.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    /// Display name shown in the report navigation.
    pub name: String,
    /// Stable, human-readable identifier used for in-report linking.
    pub anchor: String,
    /// Short description rendered above the chart.
    pub description: String,
    /// Rendered chart content, opaque to this crate.
    pub content: String,
}

/// Host-provided destination for sections and structured data dumps.
pub trait ReportSink {
    /// Append a section to the host's ordered section list.
    fn append_section(&mut self, section: Section);

    /// Write the full accumulated per-sample record set for downstream
    /// export, keyed by a plugin-chosen id.
    fn write_data(&mut self, id: &str, data: serde_json::Value) -> Result<()>;
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub sections: Vec<Section>,
    pub data: Vec<(String, serde_json::Value)>,
}

impl ReportSink for MemorySink {
    fn append_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    fn write_data(&mut self, id: &str, data: serde_json::Value) -> Result<()> {
        self.data.push((id.to_string(), data));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_preserves_section_order() {
        let mut sink = MemorySink::default();
        for anchor in ["first", "second", "third"] {
            sink.append_section(Section {
                name: anchor.to_uppercase(),
                anchor: anchor.to_string(),
                description: String::new(),
                content: String::new(),
            });
        }
        let anchors: Vec<&str> = sink.sections.iter().map(|s| s.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_memory_sink_stores_data_dump() {
        let mut sink = MemorySink::default();
        sink.write_data("adapter_removal", serde_json::json!({"single": {}}))
            .unwrap();
        assert_eq!(sink.data.len(), 1);
        assert_eq!(sink.data[0].0, "adapter_removal");
    }
}
