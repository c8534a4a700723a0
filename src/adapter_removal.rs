//! Adapter Removal report plugin
//!
//! Parses AdapterRemoval settings files into per-sample trimming statistics
//! and read-length distributions, then emits three chart families:
//! - adapter alignment counts (aligned vs unaligned)
//! - retained vs discarded reads
//! - read-length distributions, one series per read category
//!
//! Files come in three structural variants (single-end, paired-end
//! noncollapsed, paired-end collapsed); each variant carries its own
//! column layout for the length-distribution table.

use crate::blocks::Blocks;
use crate::plot::{BarConfig, BarData, Category, DataLabel, LineConfig, Renderer, Series};
use crate::report::{ReportSink, Section};
use crate::{LogFile, Sample, SkipReason};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::BufRead;

const TRIM_STATS_BLOCK: &str = "Trimming statistics";
const LENGTH_DIST_BLOCK: &str = "Length distribution";

/// Structural variant of an AdapterRemoval run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Single,
    PairedNoncollapsed,
    PairedCollapsed,
}

/// One labeled numeric series within a length-distribution chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadCategory {
    Mate1,
    Mate2,
    Singleton,
    Collapsed,
    CollapsedTruncated,
    Discarded,
    All,
}

impl ReadCategory {
    /// Display name used for chart series labels.
    pub fn label(self) -> &'static str {
        match self {
            ReadCategory::Mate1 => "Mate1",
            ReadCategory::Mate2 => "Mate2",
            ReadCategory::Singleton => "Singleton",
            ReadCategory::Collapsed => "Collapsed",
            ReadCategory::CollapsedTruncated => "Collapsed Truncated",
            ReadCategory::Discarded => "Discarded",
            ReadCategory::All => "All",
        }
    }
}

impl Variant {
    /// Fixed emission order for report sections.
    pub const ALL: [Variant; 3] = [
        Variant::Single,
        Variant::PairedNoncollapsed,
        Variant::PairedCollapsed,
    ];

    /// Classify a file from the tab-separated header line of its
    /// `Length distribution` block.
    ///
    /// Paired iff the third column is `Mate2`; collapsed iff the
    /// third-from-last column is `CollapsedTruncated`. The single-end
    /// collapsed combination is not structurally well-formed and is
    /// rejected.
    pub fn classify(header: &str) -> Result<Self, SkipReason> {
        let columns: Vec<&str> = header.split('\t').collect();
        if columns.len() < 3 {
            return Err(SkipReason::MalformedField(format!(
                "length-distribution header has only {} columns",
                columns.len()
            )));
        }

        let paired = columns[2] == "Mate2";
        let collapsed = columns[columns.len() - 3] == "CollapsedTruncated";
        match (paired, collapsed) {
            (false, false) => Ok(Variant::Single),
            (false, true) => Err(SkipReason::UnsupportedLayout),
            (true, false) => Ok(Variant::PairedNoncollapsed),
            (true, true) => Ok(Variant::PairedCollapsed),
        }
    }

    pub fn is_paired(self) -> bool {
        !matches!(self, Variant::Single)
    }

    /// Column layout of the length-distribution table: the categories the
    /// columns after the length key map to, in file order.
    pub fn categories(self) -> &'static [ReadCategory] {
        use ReadCategory::*;
        match self {
            Variant::Single => &[Mate1, Discarded, All],
            Variant::PairedNoncollapsed => &[Mate1, Mate2, Singleton, Discarded, All],
            Variant::PairedCollapsed => &[
                Mate1,
                Mate2,
                Singleton,
                Collapsed,
                CollapsedTruncated,
                Discarded,
                All,
            ],
        }
    }

    fn label(self) -> &'static str {
        match self {
            Variant::Single => "Single-End",
            Variant::PairedNoncollapsed => "Paired-End Noncollapsed",
            Variant::PairedCollapsed => "Paired-End Collapsed",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Variant::Single => "se",
            Variant::PairedNoncollapsed => "penc",
            Variant::PairedCollapsed => "pec",
        }
    }

    // Anchors and plot ids are kept byte-for-byte from earlier report
    // versions (including the irregular spellings) so existing in-report
    // links stay valid.
    fn alignment_anchor(self) -> &'static str {
        match self {
            Variant::Single => "ar_alignment_se",
            Variant::PairedNoncollapsed => "adapter_removal_alignment_penc",
            Variant::PairedCollapsed => "adapter_removal_alignment_pec",
        }
    }

    fn retained_anchor(self) -> &'static str {
        match self {
            Variant::Single => "adapter_removal_retained_plot_se",
            Variant::PairedNoncollapsed => "adapter_removal_retained_plot_penc",
            Variant::PairedCollapsed => "adapter_removal_retained_plot_pec",
        }
    }

    fn length_dist_anchor(self) -> &'static str {
        match self {
            Variant::Single => "ar_lenght_count_se",
            Variant::PairedNoncollapsed => "ar_lenght_count_penc",
            Variant::PairedCollapsed => "ar_lenght_count_pec",
        }
    }
}

/// Per-sample trimming totals.
///
/// `reads_total` is `total` doubled for paired-end runs; `discarded` is
/// `reads_total - retained`. All counts are non-negative by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub total: u64,
    pub unaligned: u64,
    pub aligned: u64,
    pub reads_total: u64,
    pub retained: u64,
    pub discarded: u64,
}

/// Sparse per-category length -> count maps for one sample.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LengthTable {
    categories: BTreeMap<ReadCategory, BTreeMap<u64, u64>>,
}

impl LengthTable {
    fn insert(&mut self, category: ReadCategory, length: u64, count: u64) {
        self.categories
            .entry(category)
            .or_default()
            .insert(length, count);
    }

    pub fn get(&self, category: ReadCategory) -> Option<&BTreeMap<u64, u64>> {
        self.categories.get(&category)
    }
}

/// Everything extracted from one settings file.
#[derive(Debug)]
pub struct ParsedSettings {
    pub variant: Variant,
    pub stats: SettingsRecord,
    pub lengths: LengthTable,
}

/// Parse one settings file, or report why it must be skipped.
pub fn parse_settings<R: BufRead>(reader: R) -> Result<ParsedSettings, SkipReason> {
    let blocks = Blocks::parse(reader).map_err(|e| SkipReason::Unreadable(e.to_string()))?;

    let dist = blocks
        .get(LENGTH_DIST_BLOCK)
        .ok_or(SkipReason::MissingBlock(LENGTH_DIST_BLOCK))?;
    let header = dist.first().ok_or_else(|| {
        SkipReason::MalformedField("length-distribution block is empty".to_string())
    })?;
    let variant = Variant::classify(header)?;

    let trim = blocks
        .get(TRIM_STATS_BLOCK)
        .ok_or(SkipReason::MissingBlock(TRIM_STATS_BLOCK))?;
    let stats = extract_stats(trim, variant.is_paired())?;
    let lengths = reshape_lengths(&dist[1..], variant)?;

    Ok(ParsedSettings {
        variant,
        stats,
        lengths,
    })
}

/// Integer suffix of a `label: number` line at a fixed block position.
fn numeric_suffix(lines: &[String], index: usize) -> Result<u64, SkipReason> {
    let line = &lines[index];
    let value = line.split(": ").nth(1).ok_or_else(|| {
        SkipReason::MalformedField(format!("expected `label: number`, got {:?}", line))
    })?;
    value
        .trim()
        .parse()
        .map_err(|_| SkipReason::MalformedField(format!("expected an integer, got {:?}", line)))
}

/// Extract trimming totals by fixed line position: total, unaligned and
/// aligned at lines 0-2, retained at the third-from-last line.
fn extract_stats(lines: &[String], paired: bool) -> Result<SettingsRecord, SkipReason> {
    if lines.len() < 6 {
        return Err(SkipReason::MalformedField(format!(
            "trimming statistics block has only {} lines",
            lines.len()
        )));
    }

    let total = numeric_suffix(lines, 0)?;
    let unaligned = numeric_suffix(lines, 1)?;
    let aligned = numeric_suffix(lines, 2)?;
    let retained = numeric_suffix(lines, lines.len() - 3)?;

    let reads_total = if paired { total * 2 } else { total };
    let discarded = reads_total.checked_sub(retained).ok_or_else(|| {
        SkipReason::MalformedField(format!(
            "retained reads ({}) exceed total reads ({})",
            retained, reads_total
        ))
    })?;

    Ok(SettingsRecord {
        total,
        unaligned,
        aligned,
        reads_total,
        retained,
        discarded,
    })
}

/// Redistribute the length-distribution table into per-category sparse
/// maps following the variant's column layout.
fn reshape_lengths(rows: &[String], variant: Variant) -> Result<LengthTable, SkipReason> {
    let categories = variant.categories();
    let mut table = LengthTable::default();

    for row in rows {
        let fields = row
            .split('\t')
            .map(|field| field.trim().parse::<u64>())
            .collect::<Result<Vec<u64>, _>>()
            .map_err(|_| {
                SkipReason::MalformedField(format!("non-integer length-distribution row {:?}", row))
            })?;

        if fields.len() != categories.len() + 1 {
            return Err(SkipReason::MalformedField(format!(
                "length-distribution row has {} columns, expected {}",
                fields.len(),
                categories.len() + 1
            )));
        }

        let length = fields[0];
        for (category, count) in categories.iter().zip(&fields[1..]) {
            table.insert(*category, length, *count);
        }
    }

    Ok(table)
}

#[derive(Debug)]
struct SampleData {
    stats: SettingsRecord,
    lengths: LengthTable,
}

/// Accumulated per-sample records, keyed by `(Variant, Sample)`.
#[derive(Debug, Default)]
pub struct AdapterRemovalData {
    samples: BTreeMap<(Variant, Sample), SampleData>,
}

impl AdapterRemovalData {
    /// Store one parsed file. A repeated sample name within the same
    /// variant overwrites the earlier record.
    pub fn insert(&mut self, sample: Sample, parsed: ParsedSettings) {
        self.samples.insert(
            (parsed.variant, sample),
            SampleData {
                stats: parsed.stats,
                lengths: parsed.lengths,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn variant_samples(&self, variant: Variant) -> impl Iterator<Item = (&str, &SampleData)> {
        self.samples
            .iter()
            .filter(move |((v, _), _)| *v == variant)
            .map(|((_, sample), data)| (sample.as_str(), data))
    }

    fn populated(&self, variant: Variant) -> bool {
        self.variant_samples(variant).next().is_some()
    }

    /// Bar-chart data for one variant: every trimming total per sample.
    fn bar_data(&self, variant: Variant) -> BarData {
        let mut data = BarData::new();
        for (sample, sample_data) in self.variant_samples(variant) {
            let stats = &sample_data.stats;
            let mut counts = BTreeMap::new();
            counts.insert("total".to_string(), stats.total);
            counts.insert("unaligned".to_string(), stats.unaligned);
            counts.insert("aligned".to_string(), stats.aligned);
            counts.insert("reads_total".to_string(), stats.reads_total);
            counts.insert("retained".to_string(), stats.retained);
            counts.insert("discarded".to_string(), stats.discarded);
            data.insert(sample.to_string(), counts);
        }
        data
    }

    /// Line-chart series for one variant, in column-layout order.
    fn line_series(&self, variant: Variant) -> Vec<Series> {
        variant
            .categories()
            .iter()
            .map(|category| {
                let mut series = Series::new();
                for (sample, sample_data) in self.variant_samples(variant) {
                    if let Some(lengths) = sample_data.lengths.get(*category) {
                        series.insert(sample.to_string(), lengths.clone());
                    }
                }
                series
            })
            .collect()
    }

    /// Full record set grouped by variant, for the structured data dump.
    pub fn dump(&self) -> Result<serde_json::Value> {
        let mut single = serde_json::Map::new();
        let mut noncollapsed = serde_json::Map::new();
        let mut collapsed = serde_json::Map::new();

        for ((variant, sample), data) in &self.samples {
            let record = serde_json::to_value(&data.stats)?;
            match variant {
                Variant::Single => single.insert(sample.clone(), record),
                Variant::PairedNoncollapsed => noncollapsed.insert(sample.clone(), record),
                Variant::PairedCollapsed => collapsed.insert(sample.clone(), record),
            };
        }

        Ok(serde_json::json!({
            "single": single,
            "paired": {
                "noncollapsed": noncollapsed,
                "collapsed": collapsed,
            },
        }))
    }
}

/// Parse every discovered settings file, accumulate per-sample records and
/// emit this plugin's sections and data dump.
///
/// Per-file failures are logged and skipped. Returns the number of
/// recognized reports; zero reports aborts the plugin with a "no data"
/// error (the host continues with other plugins).
pub fn run<I, R, C, S>(files: I, renderer: &C, sink: &mut S) -> Result<usize>
where
    I: IntoIterator<Item = LogFile<R>>,
    R: BufRead,
    C: Renderer + ?Sized,
    S: ReportSink + ?Sized,
{
    let mut data = AdapterRemovalData::default();
    for file in files {
        match parse_settings(file.reader) {
            Ok(parsed) => data.insert(file.sample, parsed),
            Err(reason) => {
                log::warn!("Adapter Removal: skipping {}: {}", file.sample, reason);
            }
        }
    }

    if data.is_empty() {
        anyhow::bail!("no Adapter Removal reports found");
    }
    log::info!("Adapter Removal: found {} reports", data.len());

    sink.write_data("adapter_removal", data.dump()?)?;

    emit_alignment_sections(&data, renderer, sink)?;
    emit_retained_sections(&data, renderer, sink)?;
    emit_length_dist_sections(&data, renderer, sink)?;

    Ok(data.len())
}

fn emit_alignment_sections<C, S>(
    data: &AdapterRemovalData,
    renderer: &C,
    sink: &mut S,
) -> Result<()>
where
    C: Renderer + ?Sized,
    S: ReportSink + ?Sized,
{
    let cats = [
        Category::new("aligned", "with adapter"),
        Category::new("unaligned", "without adapter"),
    ];

    for variant in Variant::ALL {
        if !data.populated(variant) {
            continue;
        }
        let config = BarConfig {
            id: format!("ar_alignment_plot_{}", variant.slug()),
            title: "Adapter Alignments".to_string(),
            ylab: "# Reads".to_string(),
            hide_zero_cats: false,
            cpswitch_counts_label: "Number of Reads".to_string(),
        };
        let content = renderer.bargraph(&data.bar_data(variant), &cats, &config)?;
        sink.append_section(Section {
            name: format!("Adapter Alignments {}", variant.label()),
            anchor: variant.alignment_anchor().to_string(),
            description: "The proportions of reads with and without adapter.".to_string(),
            content,
        });
    }
    Ok(())
}

fn emit_retained_sections<C, S>(
    data: &AdapterRemovalData,
    renderer: &C,
    sink: &mut S,
) -> Result<()>
where
    C: Renderer + ?Sized,
    S: ReportSink + ?Sized,
{
    let cats = [
        Category::new("retained", "retained"),
        Category::new("discarded", "discarded"),
    ];

    for variant in Variant::ALL {
        if !data.populated(variant) {
            continue;
        }
        let config = BarConfig {
            id: format!("ar_retained_plot_{}", variant.slug()),
            title: "retained and discarded".to_string(),
            ylab: "# Reads".to_string(),
            hide_zero_cats: false,
            cpswitch_counts_label: "Number of Reads".to_string(),
        };
        let content = renderer.bargraph(&data.bar_data(variant), &cats, &config)?;
        sink.append_section(Section {
            name: format!("Retained and Discarded {}", variant.label()),
            anchor: variant.retained_anchor().to_string(),
            description: "The proportions of retained and discarded reads.".to_string(),
            content,
        });
    }
    Ok(())
}

fn emit_length_dist_sections<C, S>(
    data: &AdapterRemovalData,
    renderer: &C,
    sink: &mut S,
) -> Result<()>
where
    C: Renderer + ?Sized,
    S: ReportSink + ?Sized,
{
    for variant in Variant::ALL {
        if !data.populated(variant) {
            continue;
        }
        let config = LineConfig {
            id: format!("ar_lenght_count_plot_{}", variant.slug()),
            title: "Length Distribution".to_string(),
            ylab: "Counts".to_string(),
            xlab: "read length".to_string(),
            x_decimals: false,
            ymin: 0,
            tt_label: "<b>{point.x} bp trimmed</b>: {point.y:.0f}".to_string(),
            data_labels: variant
                .categories()
                .iter()
                .map(|category| DataLabel {
                    name: category.label().to_string(),
                    ylab: "Count".to_string(),
                })
                .collect(),
        };
        let content = renderer.linegraph(&data.line_series(variant), &config)?;
        sink.append_section(Section {
            name: format!("Length Distribution {}", variant.label()),
            anchor: variant.length_dist_anchor().to_string(),
            description: "The length distribution of reads after processing adapter alignment."
                .to_string(),
            content,
        });
    }
    Ok(())
}
