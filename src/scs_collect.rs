//! SCS-Collect report plugin
//!
//! Parses SCS-Collect YAML output. Integer-keyed entries are genome-type
//! records, each with a `type` label and a `values` mapping of subtype
//! counts; they are flattened into one `{type}_{subtype}` -> count map per
//! sample. The `rnacomposition` entry passes through unchanged. A sample
//! contributes only when both halves are present.

use crate::plot::{BarConfig, BarData, Category, Renderer};
use crate::report::{ReportSink, Section};
use crate::{LogFile, Sample, SkipReason};
use anyhow::Result;
use serde_yaml::Value as Yaml;
use std::collections::BTreeMap;
use std::io::BufRead;

/// Everything extracted from one SCS-Collect document.
#[derive(Debug, Clone, PartialEq)]
pub struct ScsSample {
    /// Flattened `{type}_{subtype}` -> count map.
    pub genome_types: BTreeMap<String, u64>,
    /// The `rnacomposition` entry, passed through unchanged.
    pub composition: serde_json::Value,
}

/// Parse one document. `Ok(None)` means the document was readable but the
/// sample contributes nothing (missing genome types or composition); this
/// exclusion is silent by design.
pub fn parse_document<R: BufRead>(reader: R) -> Result<Option<ScsSample>, SkipReason> {
    let doc: Yaml =
        serde_yaml::from_reader(reader).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    let mapping = match doc {
        Yaml::Mapping(mapping) => mapping,
        _ => {
            return Err(SkipReason::MalformedField(
                "expected a top-level mapping".to_string(),
            ))
        }
    };

    let mut genome_types = BTreeMap::new();
    let mut composition = None;

    for (key, value) in &mapping {
        if key.as_i64().is_some() {
            flatten_genome_type(value, &mut genome_types)?;
        } else if key.as_str() == Some("rnacomposition") {
            composition = Some(
                serde_json::to_value(value)
                    .map_err(|e| SkipReason::MalformedField(e.to_string()))?,
            );
        }
        // any other top-level key is ignored
    }

    match (genome_types.is_empty(), composition) {
        (false, Some(composition)) => Ok(Some(ScsSample {
            genome_types,
            composition,
        })),
        _ => Ok(None),
    }
}

/// Flatten one genome-type entry into `{type}_{subtype}` -> count pairs.
fn flatten_genome_type(entry: &Yaml, out: &mut BTreeMap<String, u64>) -> Result<(), SkipReason> {
    let type_label = entry.get("type").and_then(Yaml::as_str).ok_or_else(|| {
        SkipReason::MalformedField("genome-type entry without a `type` label".to_string())
    })?;
    let values = entry
        .get("values")
        .and_then(Yaml::as_mapping)
        .ok_or_else(|| {
            SkipReason::MalformedField("genome-type entry without a `values` mapping".to_string())
        })?;

    for (subtype, count) in values {
        let subtype = subtype.as_str().ok_or_else(|| {
            SkipReason::MalformedField(format!("non-string subtype key in {:?}", type_label))
        })?;
        let count = count.as_u64().ok_or_else(|| {
            SkipReason::MalformedField(format!(
                "non-integer count for {}_{}",
                type_label, subtype
            ))
        })?;
        out.insert(format!("{}_{}", type_label, subtype), count);
    }
    Ok(())
}

/// Accumulated per-sample genome-type and composition records.
#[derive(Debug, Default)]
pub struct ScsCollectData {
    genome_types: BTreeMap<Sample, BTreeMap<String, u64>>,
    composition: BTreeMap<Sample, serde_json::Value>,
}

impl ScsCollectData {
    pub fn insert(&mut self, sample: Sample, parsed: ScsSample) {
        self.genome_types.insert(sample.clone(), parsed.genome_types);
        self.composition.insert(sample, parsed.composition);
    }

    /// Number of recognized reports: genome-type entries plus composition
    /// entries.
    pub fn len(&self) -> usize {
        self.genome_types.len() + self.composition.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genome_types.is_empty() && self.composition.is_empty()
    }

    fn genome_type_chart(&self) -> (BarData, Vec<Category>) {
        let mut data = BarData::new();
        let mut keys = std::collections::BTreeSet::new();
        for (sample, counts) in &self.genome_types {
            keys.extend(counts.keys().cloned());
            data.insert(sample.clone(), counts.clone());
        }
        let cats = keys
            .into_iter()
            .map(|key| Category::new(key.clone(), key))
            .collect();
        (data, cats)
    }

    /// Composition records coerced to bar data: the numeric top-level
    /// fields of each record become categories.
    fn composition_chart(&self) -> (BarData, Vec<Category>) {
        let mut data = BarData::new();
        let mut keys = std::collections::BTreeSet::new();
        for (sample, record) in &self.composition {
            let mut counts = BTreeMap::new();
            if let Some(fields) = record.as_object() {
                for (key, value) in fields {
                    if let Some(count) = value.as_u64() {
                        keys.insert(key.clone());
                        counts.insert(key.clone(), count);
                    }
                }
            }
            data.insert(sample.clone(), counts);
        }
        let cats = keys
            .into_iter()
            .map(|key| Category::new(key.clone(), key))
            .collect();
        (data, cats)
    }

    /// Full record set for the structured data dump; composition records
    /// are passed through untouched.
    pub fn dump(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "genome_types": self.genome_types,
            "composition": self.composition,
        }))
    }
}

/// Parse every discovered SCS-Collect document and emit this plugin's
/// sections and data dump.
///
/// Returns the number of recognized reports; zero reports aborts the
/// plugin with a "no data" error.
pub fn run<I, R, C, S>(files: I, renderer: &C, sink: &mut S) -> Result<usize>
where
    I: IntoIterator<Item = LogFile<R>>,
    R: BufRead,
    C: Renderer + ?Sized,
    S: ReportSink + ?Sized,
{
    let mut data = ScsCollectData::default();
    for file in files {
        match parse_document(file.reader) {
            Ok(Some(parsed)) => data.insert(file.sample, parsed),
            Ok(None) => {}
            Err(reason) => {
                log::warn!("SCS-Collect: skipping {}: {}", file.sample, reason);
            }
        }
    }

    if data.is_empty() {
        log::debug!("SCS-Collect: could not find any reports");
        anyhow::bail!("no SCS-Collect reports found");
    }
    log::info!("SCS-Collect: found {} reports", data.len());

    sink.write_data("scs_collect", data.dump()?)?;

    let (gt_data, gt_cats) = data.genome_type_chart();
    let gt_config = BarConfig {
        id: "gt_plot".to_string(),
        title: "genome types".to_string(),
        ylab: "# Reads".to_string(),
        hide_zero_cats: false,
        cpswitch_counts_label: "Number of Reads".to_string(),
    };
    sink.append_section(Section {
        name: "genome types and proportions".to_string(),
        anchor: "genome_types_plot".to_string(),
        description: String::new(),
        content: renderer.bargraph(&gt_data, &gt_cats, &gt_config)?,
    });

    let (comp_data, comp_cats) = data.composition_chart();
    let comp_config = BarConfig {
        id: "rna_composition".to_string(),
        title: "rna composition".to_string(),
        ..BarConfig::default()
    };
    sink.append_section(Section {
        name: "rna composition".to_string(),
        anchor: "rna_composition_plot".to_string(),
        description: String::new(),
        content: renderer.bargraph(&comp_data, &comp_cats, &comp_config)?,
    });

    Ok(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::JsonRenderer;
    use crate::report::MemorySink;
    use std::io::Cursor;

    fn full_document() -> String {
        let doc = r#"
1:
  type: virus
  values:
    dsDNA: 120
    ssDNA: 30
2:
  type: host
  values:
    genomic: 500
rnacomposition:
  mRNA: 300
  rRNA: 900
run_info: ignored
"#;
        doc.trim_start().to_string()
    }

    #[test]
    fn test_flattens_genome_types_by_type_and_subtype() {
        let parsed = parse_document(Cursor::new(full_document()))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.genome_types.len(), 3);
        assert_eq!(parsed.genome_types["virus_dsDNA"], 120);
        assert_eq!(parsed.genome_types["virus_ssDNA"], 30);
        assert_eq!(parsed.genome_types["host_genomic"], 500);
        assert_eq!(parsed.composition["mRNA"], 300);
    }

    #[test]
    fn test_flattening_round_trips_through_separator() {
        let parsed = parse_document(Cursor::new(full_document()))
            .unwrap()
            .unwrap();

        let mut regrouped: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();
        for (key, count) in &parsed.genome_types {
            let (type_label, subtype) = key.split_once('_').unwrap();
            regrouped
                .entry(type_label)
                .or_default()
                .insert(subtype, *count);
        }

        assert_eq!(regrouped["virus"].len(), 2);
        assert_eq!(regrouped["host"]["genomic"], 500);
    }

    #[test]
    fn test_missing_composition_is_silently_excluded() {
        let doc = "1:\n  type: virus\n  values:\n    dsDNA: 5\n";
        assert_eq!(parse_document(Cursor::new(doc)).unwrap(), None);
    }

    #[test]
    fn test_missing_genome_types_is_silently_excluded() {
        let doc = "rnacomposition:\n  mRNA: 1\n";
        assert_eq!(parse_document(Cursor::new(doc)).unwrap(), None);
    }

    #[test]
    fn test_non_mapping_document_is_a_skip() {
        assert!(matches!(
            parse_document(Cursor::new("just a scalar\n")),
            Err(SkipReason::MalformedField(_))
        ));
    }

    #[test]
    fn test_run_emits_both_sections() {
        let files = vec![LogFile::new("sample_1", Cursor::new(full_document()))];
        let mut sink = MemorySink::default();
        let count = run(files, &JsonRenderer, &mut sink).unwrap();

        assert_eq!(count, 2);
        let anchors: Vec<&str> = sink.sections.iter().map(|s| s.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["genome_types_plot", "rna_composition_plot"]);

        let (id, dump) = &sink.data[0];
        assert_eq!(id, "scs_collect");
        assert_eq!(dump["genome_types"]["sample_1"]["virus_dsDNA"], 120);
        assert_eq!(dump["composition"]["sample_1"]["rRNA"], 900);
    }

    #[test]
    fn test_run_excluded_samples_do_not_count() {
        let files = vec![
            LogFile::new(
                "no_composition",
                Cursor::new("1:\n  type: virus\n  values:\n    dsDNA: 5\n".to_string()),
            ),
            LogFile::new("complete", Cursor::new(full_document())),
        ];
        let mut sink = MemorySink::default();
        let count = run(files, &JsonRenderer, &mut sink).unwrap();

        assert_eq!(count, 2);
        let (_, dump) = &sink.data[0];
        assert!(dump["genome_types"]["no_composition"].is_null());
    }

    #[test]
    fn test_run_with_no_files_is_no_data() {
        let files: Vec<LogFile<Cursor<String>>> = Vec::new();
        let mut sink = MemorySink::default();
        let err = run(files, &JsonRenderer, &mut sink).unwrap_err();
        assert!(err.to_string().contains("no SCS-Collect reports"));
        assert!(sink.sections.is_empty());
    }
}
