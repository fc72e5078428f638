//! Readers and writers around the core: fragment streams, BED files, cell
//! tables and the report files.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use polars::prelude::{
    Column, CsvParseOptions, CsvReadOptions, CsvWriter, DataFrame, SerReader, SerWriter,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::chromosomes::ChromosomeCodes;
use crate::config::CounterConfig;
use crate::errors::{Result, RumuletError};
use crate::multiplets::MultipletReport;
use crate::rumulet_structs::{MappingQualityStats, OverlapSegment, Read, Region};
use crate::stream::{CellCounts, RunStatistics};

pub const OVERLAP_COLUMNS: [&str; 11] = [
    "chr",
    "start",
    "end",
    "cell id",
    "Min Overlap Count",
    "Max Overlap Count",
    "Mean Mapping Quality",
    "Min Mapping Quality",
    "Max Mapping Quality",
    "Starts",
    "Ends",
];

/// Opens a plain or gzip-compressed (by `.gz` extension) text file.
pub fn open_text_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let is_gzip = path.extension().is_some_and(|ext| ext == "gz");
    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}

fn malformed(source_name: &str, line: usize, reason: String) -> RumuletError {
    RumuletError::MalformedRecord {
        source_name: source_name.to_string(),
        line,
        reason,
    }
}

fn parse_coordinate(value: &str, what: &str, source_name: &str, line: usize) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| malformed(source_name, line, format!("non-numeric {what} '{value}'")))
}

/// Parses one `chr start end barcode ...` fragment line.
///
/// Blank and `#` lines give `Ok(None)`. Offsets from `config` are added to
/// the coordinates as they are read. With `mapq_column` set, that column
/// must hold an unsigned mapping quality.
pub fn parse_fragment_line(
    line: &str,
    line_no: usize,
    source_name: &str,
    chromosomes: &mut ChromosomeCodes,
    config: &CounterConfig,
) -> Result<Option<Read>> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() || line.trim_start().starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 4 {
        return Err(malformed(
            source_name,
            line_no,
            format!("expected at least 4 tab-separated columns, found {}", fields.len()),
        ));
    }

    let start = parse_coordinate(fields[1], "start", source_name, line_no)? + config.start_offset;
    let end = parse_coordinate(fields[2], "end", source_name, line_no)? + config.end_offset;
    if start > end {
        return Err(malformed(source_name, line_no, format!("start {start} > end {end}")));
    }

    let mapq = match config.mapq_column {
        Some(column) => {
            let value = column.checked_sub(1).and_then(|i| fields.get(i)).ok_or_else(|| {
                malformed(
                    source_name,
                    line_no,
                    format!("no mapping quality column {column}, found {} columns", fields.len()),
                )
            })?;
            let mapq = value.trim().parse::<u32>().map_err(|_| {
                malformed(source_name, line_no, format!("non-numeric mapping quality '{value}'"))
            })?;
            Some(mapq)
        }
        None => None,
    };

    Ok(Some(Read {
        chr: chromosomes.encode(fields[0]),
        start,
        end,
        barcode: fields[3].trim().to_string(),
        mapq,
    }))
}

/// Iterates the reads of a fragment file, encoding chromosomes as it goes.
pub struct FragmentReader<R: BufRead> {
    lines: Lines<R>,
    source_name: String,
    line_no: usize,
    chromosomes: ChromosomeCodes,
    config: CounterConfig,
}

impl FragmentReader<Box<dyn BufRead>> {
    pub fn from_path(path: &Path, chromosomes: ChromosomeCodes, config: CounterConfig) -> Result<Self> {
        Ok(FragmentReader::new(
            open_text_reader(path)?,
            source_name(path),
            chromosomes,
            config,
        ))
    }
}

impl<R: BufRead> FragmentReader<R> {
    pub fn new(reader: R, source_name: String, chromosomes: ChromosomeCodes, config: CounterConfig) -> Self {
        FragmentReader {
            lines: reader.lines(),
            source_name,
            line_no: 0,
            chromosomes,
            config,
        }
    }

    pub fn lines_read(&self) -> usize {
        self.line_no
    }

    pub fn chromosomes(&self) -> &ChromosomeCodes {
        &self.chromosomes
    }

    pub fn into_chromosomes(self) -> ChromosomeCodes {
        self.chromosomes
    }
}

impl<R: BufRead> Iterator for FragmentReader<R> {
    type Item = Result<Read>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            match parse_fragment_line(
                &line,
                self.line_no,
                &self.source_name,
                &mut self.chromosomes,
                &self.config,
            ) {
                Ok(Some(read)) => return Some(Ok(read)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// One chromosome name per line.
pub fn read_chromosome_list(path: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for line in open_text_reader(path)?.lines() {
        let line = line?;
        let name = line.split(['\t', ',']).next().unwrap_or("").trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

fn read_string_table(path: &Path, has_header: bool, separator: u8) -> Result<DataFrame> {
    let parse_options = CsvParseOptions::default().with_separator(separator);
    let df = CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(Some(0))
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

fn string_column<'a>(df: &'a DataFrame, source_name: &str, name: &str) -> Result<Vec<Option<&'a str>>> {
    let column = df
        .column(name)
        .map_err(|_| RumuletError::MissingColumn {
            source_name: source_name.to_string(),
            column: name.to_string(),
        })?;
    Ok(column.str()?.into_iter().collect())
}

fn required<'a>(value: Option<&'a str>, what: &str, source_name: &str, row: usize) -> Result<&'a str> {
    value.ok_or_else(|| malformed(source_name, row + 2, format!("missing {what}")))
}

fn is_empty_file(path: &Path) -> Result<bool> {
    Ok(std::fs::metadata(path)?.len() == 0)
}

/// Barcodes flagged as cells (`is__cell_barcode == 1`) in a single-cell CSV,
/// first occurrence only.
pub fn read_cell_barcodes(path: &Path) -> Result<Vec<String>> {
    let name = source_name(path);
    let df = read_string_table(path, true, b',')?;
    let barcodes = string_column(&df, &name, "barcode")?;
    let is_cell = string_column(&df, &name, "is__cell_barcode")?;

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut cells = Vec::new();
    for (row, (barcode, flag)) in barcodes.into_iter().zip(is_cell).enumerate() {
        if flag.map(str::trim) == Some("1") {
            let barcode = required(barcode, "barcode", &name, row)?;
            if seen.insert(barcode) {
                cells.push(barcode.to_string());
            }
        }
    }
    Ok(cells)
}

/// Regions of a BED file, shifted into position format (`start + 1`).
pub fn read_bed_regions(path: &Path, chromosomes: &mut ChromosomeCodes) -> Result<Vec<Region>> {
    if is_empty_file(path)? {
        return Ok(Vec::new());
    }
    let name = source_name(path);
    let df = read_string_table(path, false, b'\t')?;
    let chrs = string_column(&df, &name, "column_1")?;
    let starts = string_column(&df, &name, "column_2")?;
    let ends = string_column(&df, &name, "column_3")?;

    let mut regions = Vec::with_capacity(chrs.len());
    for row in 0..chrs.len() {
        let line = row + 1;
        let chr = chrs[row].ok_or_else(|| malformed(&name, line, "missing chromosome".into()))?;
        let start = parse_coordinate(
            starts[row].ok_or_else(|| malformed(&name, line, "missing start".into()))?,
            "start",
            &name,
            line,
        )?;
        let end = parse_coordinate(
            ends[row].ok_or_else(|| malformed(&name, line, "missing end".into()))?,
            "end",
            &name,
            line,
        )?;
        let region = Region::new(chromosomes.encode(chr), start + 1, end);
        if region.start > region.end {
            return Err(malformed(&name, line, format!("start {} > end {}", start, end)));
        }
        regions.push(region);
    }
    Ok(regions)
}

fn parse_position_list(value: &str, what: &str, source_name: &str, line: usize) -> Result<Vec<i64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| parse_coordinate(v, what, source_name, line))
        .collect()
}

fn parse_mapq_stats(mean: Option<&str>, min: Option<&str>, max: Option<&str>) -> Option<MappingQualityStats> {
    Some(MappingQualityStats {
        mean: mean?.trim().parse().ok()?,
        min: min?.trim().parse().ok()?,
        max: max?.trim().parse().ok()?,
    })
}

/// Reads an overlap table as written by [`OverlapWriter`].
pub fn read_overlap_table(path: &Path, chromosomes: &mut ChromosomeCodes) -> Result<Vec<OverlapSegment>> {
    let name = source_name(path);
    let df = read_string_table(path, true, b'\t')?;
    let chrs = string_column(&df, &name, "chr")?;
    let starts = string_column(&df, &name, "start")?;
    let ends = string_column(&df, &name, "end")?;
    let barcodes = string_column(&df, &name, "cell id")?;
    let min_depths = string_column(&df, &name, "Min Overlap Count")?;
    let max_depths = string_column(&df, &name, "Max Overlap Count")?;
    let read_starts = string_column(&df, &name, "Starts")?;
    let read_ends = string_column(&df, &name, "Ends")?;
    let mapq_columns = (
        string_column(&df, &name, "Mean Mapping Quality").ok(),
        string_column(&df, &name, "Min Mapping Quality").ok(),
        string_column(&df, &name, "Max Mapping Quality").ok(),
    );

    let mut segments = Vec::with_capacity(chrs.len());
    for row in 0..chrs.len() {
        let line = row + 2;
        let chr = required(chrs[row], "chr", &name, row)?;
        let starts_list = parse_position_list(required(read_starts[row], "Starts", &name, row)?, "read start", &name, line)?;
        let ends_list = parse_position_list(required(read_ends[row], "Ends", &name, row)?, "read end", &name, line)?;
        if starts_list.len() != ends_list.len() {
            return Err(malformed(
                &name,
                line,
                format!("{} read starts but {} read ends", starts_list.len(), ends_list.len()),
            ));
        }
        let mapq = match &mapq_columns {
            (Some(mean), Some(min), Some(max)) => parse_mapq_stats(mean[row], min[row], max[row]),
            _ => None,
        };

        let start = parse_coordinate(required(starts[row], "start", &name, row)?, "start", &name, line)?;
        let end = parse_coordinate(required(ends[row], "end", &name, row)?, "end", &name, line)?;
        if start > end {
            return Err(malformed(&name, line, format!("start {start} > end {end}")));
        }

        segments.push(OverlapSegment {
            chr: chromosomes.encode(chr),
            start,
            end,
            min_depth: parse_coordinate(required(min_depths[row], "min depth", &name, row)?, "min depth", &name, line)?,
            max_depth: parse_coordinate(required(max_depths[row], "max depth", &name, row)?, "max depth", &name, line)?,
            read_starts: starts_list,
            read_ends: ends_list,
            barcode: required(barcodes[row], "cell id", &name, row)?.to_string(),
            mapq,
        });
    }
    Ok(segments)
}

/// Streams overlap segments to a tab-separated table.
pub struct OverlapWriter<W: Write> {
    writer: W,
}

impl OverlapWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        OverlapWriter::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> OverlapWriter<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{}", OVERLAP_COLUMNS.join("\t"))?;
        Ok(OverlapWriter { writer })
    }

    pub fn write_segment(&mut self, segment: &OverlapSegment, chromosomes: &ChromosomeCodes) -> Result<()> {
        let (mean, min, max) = match segment.mapq {
            Some(q) => (q.mean.to_string(), q.min.to_string(), q.max.to_string()),
            None => (".".to_string(), ".".to_string(), ".".to_string()),
        };
        let mut starts = String::new();
        let mut ends = String::new();
        for (s, e) in segment.read_starts.iter().zip(&segment.read_ends) {
            starts.push_str(&format!("{s},"));
            ends.push_str(&format!("{e},"));
        }
        writeln!(
            self.writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            chromosomes.name(segment.chr),
            segment.start,
            segment.end,
            segment.barcode,
            segment.min_depth,
            segment.max_depth,
            mean,
            min,
            max,
            starts,
            ends
        )?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn write_table(path: &Path, df: &mut DataFrame, include_header: bool) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    CsvWriter::new(&mut file)
        .include_header(include_header)
        .with_separator(b'\t')
        .finish(df)?;
    file.flush()?;
    Ok(())
}

/// Per-cell read and overlap counts of an overlap counting run.
pub fn write_overlap_summary(path: &Path, barcodes: &[String], counts: &[CellCounts]) -> Result<()> {
    let mut df = DataFrame::new(vec![
        Column::new("Cell Id".into(), barcodes.to_vec()),
        Column::new(
            "Number of Valid Reads".into(),
            counts.iter().map(|c| c.valid_reads as i64).collect::<Vec<_>>(),
        ),
        Column::new(
            "Number of Overlaps".into(),
            counts.iter().map(|c| c.overlaps as i64).collect::<Vec<_>>(),
        ),
        Column::new("Barcode".into(), barcodes.to_vec()),
        Column::new(
            "Total Number of Reads".into(),
            counts.iter().map(|c| c.total_reads as i64).collect::<Vec<_>>(),
        ),
    ])?;
    write_table(path, &mut df, true)
}

/// (cell id, barcode) pairs from an overlap summary table.
pub fn read_overlap_summary(path: &Path) -> Result<Vec<(String, String)>> {
    let name = source_name(path);
    let df = read_string_table(path, true, b'\t')?;
    let cell_ids = string_column(&df, &name, "Cell Id")?;
    let barcodes = string_column(&df, &name, "Barcode")?;

    cell_ids
        .into_iter()
        .zip(barcodes)
        .enumerate()
        .map(|(row, (cell, barcode))| {
            let cell = required(cell, "Cell Id", &name, row)?.to_string();
            let barcode = barcode.map_or_else(|| cell.clone(), str::to_string);
            Ok((cell, barcode))
        })
        .collect()
}

fn write_key_values(path: &Path, rows: Vec<(&str, String)>) -> Result<()> {
    let (keys, values): (Vec<&str>, Vec<String>) = rows.into_iter().unzip();
    let mut df = DataFrame::new(vec![
        Column::new("key".into(), keys),
        Column::new("value".into(), values),
    ])?;
    write_table(path, &mut df, false)
}

/// Whole-run read statistics of an overlap counting run.
pub fn write_run_statistics(path: &Path, stats: &RunStatistics, n_cells: usize) -> Result<()> {
    write_key_values(
        path,
        vec![
            ("Total Reads", stats.total_reads.to_string()),
            ("Valid Reads", stats.valid_reads.to_string()),
            ("Low Mapping Quality Reads", stats.low_mapq_reads.to_string()),
            ("Number of Cells", n_cells.to_string()),
            ("Mean Insert Size", stats.mean_insert_size().to_string()),
            ("Number of Read Groups", stats.groups.to_string()),
            ("Mean Reads per Group", stats.mean_group_size().to_string()),
            ("Max Reads per Group", stats.max_group_size.to_string()),
        ],
    )
}

/// `0.01` -> `01`, the suffix used for multiplet list file names.
pub fn threshold_suffix(q: f64) -> String {
    let text = q.to_string();
    match text.split_once('.') {
        Some((_, fraction)) => fraction.to_string(),
        None => text,
    }
}

fn write_lines(path: &Path, lines: &[&str]) -> Result<()> {
    let mut df = DataFrame::new(vec![Column::new("value".into(), lines.to_vec())])?;
    write_table(path, &mut df, false)
}

/// Writes probabilities, multiplet lists, region probabilities and the summary.
///
/// `barcodes` maps a cell id to the barcode reported next to it; cells
/// missing from it are reported under their own id.
pub fn write_multiplet_report(
    outdir: &Path,
    report: &MultipletReport,
    barcodes: &FxHashMap<String, String>,
    chromosomes: &ChromosomeCodes,
) -> Result<()> {
    let barcode_of = |cell: &str| -> String { barcodes.get(cell).cloned().unwrap_or_else(|| cell.to_string()) };

    let records = &report.multiplet_records;
    let mut probabilities = DataFrame::new(vec![
        Column::new(
            "cell_id".into(),
            records.iter().map(|r| report.cells[r.idx].clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "barcode".into(),
            records.iter().map(|r| barcode_of(report.cells[r.idx].as_str())).collect::<Vec<_>>(),
        ),
        Column::new("p-value".into(), records.iter().map(|r| r.raw_p).collect::<Vec<_>>()),
        Column::new("q-value".into(), records.iter().map(|r| r.corrected_p).collect::<Vec<_>>()),
    ])?;
    write_table(&outdir.join("MultipletProbabilities.txt"), &mut probabilities, true)?;

    let multiplets = report.multiplets();
    let multiplet_barcodes: Vec<String> = multiplets.iter().map(|c| barcode_of(*c)).collect();
    let suffix = threshold_suffix(report.q_threshold);
    write_lines(&outdir.join(format!("MultipletCellIds_{suffix}.txt")), &multiplets)?;
    write_lines(
        &outdir.join(format!("MultipletBarcodes_{suffix}.txt")),
        &multiplet_barcodes.iter().map(String::as_str).collect::<Vec<_>>(),
    )?;

    let rows = &report.repeat_records;
    let regions: Vec<Region> = rows.iter().map(|r| report.union_regions[r.idx]).collect();
    let mut region_probabilities = DataFrame::new(vec![
        Column::new(
            "chr".into(),
            regions.iter().map(|r| chromosomes.name(r.chr).to_string()).collect::<Vec<_>>(),
        ),
        Column::new("start".into(), regions.iter().map(|r| r.start).collect::<Vec<_>>()),
        Column::new("end".into(), regions.iter().map(|r| r.end).collect::<Vec<_>>()),
        Column::new("cells".into(), rows.iter().map(|r| r.observed as i64).collect::<Vec<_>>()),
        Column::new("p-value".into(), rows.iter().map(|r| r.raw_p).collect::<Vec<_>>()),
        Column::new("q-value".into(), rows.iter().map(|r| r.corrected_p).collect::<Vec<_>>()),
    ])?;
    write_table(&outdir.join("RepetitiveRegions.txt"), &mut region_probabilities, true)?;

    write_key_values(
        &outdir.join("MultipletSummary.txt"),
        vec![
            ("Number of Cells", report.n_cells().to_string()),
            ("Number of Merged Regions", report.n_union_regions().to_string()),
            ("Number of Multiplets", report.n_multiplets().to_string()),
            ("Multiplet Percent", report.multiplet_percent().to_string()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn fragment_lines_are_parsed_with_offsets() {
        let mut chroms = ChromosomeCodes::new();
        let cfg = CounterConfig {
            start_offset: 1,
            end_offset: -1,
            ..CounterConfig::default()
        };
        let read = parse_fragment_line("chr2\t100\t250\tAAAC-1\t3\n", 1, "f", &mut chroms, &cfg)
            .unwrap()
            .unwrap();
        assert_eq!(read.chr, chroms.get("chr2").unwrap());
        assert_eq!((read.start, read.end), (101, 249));
        assert_eq!(read.barcode, "AAAC-1");
        assert!(read.mapq.is_none());
    }

    #[rstest]
    #[case("# comment")]
    #[case("")]
    #[case("   ")]
    fn comments_and_blank_lines_are_skipped(#[case] line: &str) {
        let mut chroms = ChromosomeCodes::new();
        assert!(parse_fragment_line(line, 1, "f", &mut chroms, &CounterConfig::default())
            .unwrap()
            .is_none());
    }

    #[rstest]
    #[case("chr1\t100\t200")]
    #[case("chr1\tabc\t200\tBC")]
    #[case("chr1\t100\t2x0\tBC")]
    #[case("chr1\t500\t100\tBC")]
    fn malformed_fragment_lines_fail(#[case] line: &str) {
        let mut chroms = ChromosomeCodes::new();
        let err = parse_fragment_line(line, 7, "frags.tsv", &mut chroms, &CounterConfig::default())
            .unwrap_err();
        assert!(matches!(err, RumuletError::MalformedRecord { line: 7, .. }));
    }

    #[test]
    fn offsets_that_invert_a_fragment_are_rejected() {
        let mut chroms = ChromosomeCodes::new();
        let cfg = CounterConfig {
            start_offset: 5,
            end_offset: -5,
            ..CounterConfig::default()
        };
        let err = parse_fragment_line("chr1\t100\t108\tBC", 3, "f", &mut chroms, &cfg).unwrap_err();
        assert!(err.to_string().contains("start 105 > end 103"), "{err}");
        assert!(parse_fragment_line("chr1\t100\t110\tBC", 4, "f", &mut chroms, &cfg)
            .unwrap()
            .is_some());
    }

    #[test]
    fn mapping_quality_is_read_from_the_configured_column() {
        let mut chroms = ChromosomeCodes::new();
        let cfg = CounterConfig {
            mapq_column: Some(6),
            ..CounterConfig::default()
        };
        let read = parse_fragment_line("chr1\t10\t20\tBC\t1\t42", 1, "f", &mut chroms, &cfg)
            .unwrap()
            .unwrap();
        assert_eq!(read.mapq, Some(42));
    }

    #[rstest]
    #[case("chr1\t10\t20\tBC\t1")]
    #[case("chr1\t10\t20\tBC\t1\thigh")]
    fn missing_or_bad_mapping_quality_fails(#[case] line: &str) {
        let mut chroms = ChromosomeCodes::new();
        let cfg = CounterConfig {
            mapq_column: Some(6),
            ..CounterConfig::default()
        };
        let err = parse_fragment_line(line, 2, "f", &mut chroms, &cfg).unwrap_err();
        assert!(matches!(err, RumuletError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn fragment_reader_counts_lines_and_stops_on_errors() {
        let text = "#header\nchr1\t1\t5\tA\nchr1\t3\t8\tB\nchr1\tx\t8\tB\n";
        let mut reader = FragmentReader::new(
            Cursor::new(text),
            "mem".to_string(),
            ChromosomeCodes::new(),
            CounterConfig::default(),
        );
        assert_eq!(reader.next().unwrap().unwrap().barcode, "A");
        assert_eq!(reader.next().unwrap().unwrap().barcode, "B");
        assert!(reader.next().unwrap().is_err());
        assert_eq!(reader.lines_read(), 4);
    }

    #[test]
    fn gzip_fragments_are_decoded() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fragments.tsv.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"chr1\t10\t20\tA\n").unwrap();
        encoder.finish().unwrap();

        let reads: Vec<Read> = FragmentReader::from_path(&path, ChromosomeCodes::new(), CounterConfig::default())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(reads.len(), 1);
        assert_eq!((reads[0].start, reads[0].end), (10, 20));
    }

    #[test]
    fn cell_barcodes_keep_flagged_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("singlecell.csv");
        std::fs::write(
            &path,
            "barcode,total,is__cell_barcode\nNO_BARCODE,10,0\nAAAC-1,500,1\nAAAG-1,20,0\nTTTT-1,900,1\n",
        )
        .unwrap();
        assert_eq!(read_cell_barcodes(&path).unwrap(), vec!["AAAC-1", "TTTT-1"]);
    }

    #[test]
    fn repeated_cell_barcodes_are_listed_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("singlecell.csv");
        std::fs::write(
            &path,
            "barcode,is__cell_barcode\nTTTT-1,1\nAAAC-1,1\nTTTT-1,1\nAAAC-1,0\n",
        )
        .unwrap();
        assert_eq!(read_cell_barcodes(&path).unwrap(), vec!["TTTT-1", "AAAC-1"]);
    }

    #[test]
    fn missing_cell_column_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("singlecell.csv");
        std::fs::write(&path, "barcode,total\nAAAC-1,500\n").unwrap();
        let err = read_cell_barcodes(&path).unwrap_err();
        assert!(matches!(err, RumuletError::MissingColumn { .. }));
    }

    #[test]
    fn bed_regions_enter_position_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repeats.bed");
        std::fs::write(&path, "chr1\t0\t100\nchr2\t50\t60\n").unwrap();
        let mut chroms = ChromosomeCodes::new();
        let regions = read_bed_regions(&path, &mut chroms).unwrap();
        assert_eq!(regions[0], Region::new(chroms.get("chr1").unwrap(), 1, 100));
        assert_eq!(regions[1], Region::new(chroms.get("chr2").unwrap(), 51, 60));

        let empty = dir.path().join("empty.bed");
        std::fs::write(&empty, "").unwrap();
        assert!(read_bed_regions(&empty, &mut chroms).unwrap().is_empty());
    }

    #[test]
    fn chromosome_list_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chroms.txt");
        std::fs::write(&path, "chr1\n\nchr2\n").unwrap();
        assert_eq!(read_chromosome_list(&path).unwrap(), vec!["chr1", "chr2"]);
    }

    #[test]
    fn inverted_overlap_rows_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Overlaps.txt");
        std::fs::write(
            &path,
            format!("{}\n1\t9\t5\tBC1\t3\t3\t.\t.\t.\t1,2,3,\t10,11,12,\n", OVERLAP_COLUMNS.join("\t")),
        )
        .unwrap();
        let err = read_overlap_table(&path, &mut ChromosomeCodes::new()).unwrap_err();
        assert!(matches!(err, RumuletError::MalformedRecord { line: 2, .. }), "{err}");
    }

    #[test]
    fn overlap_table_reads_back_what_was_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Overlaps.txt");
        let mut chroms = ChromosomeCodes::new();
        let chr = chroms.encode("1");
        let segment = OverlapSegment {
            chr,
            start: 3,
            end: 5,
            min_depth: 2,
            max_depth: 2,
            read_starts: vec![1, 3],
            read_ends: vec![5, 8],
            barcode: "BC1".to_string(),
            mapq: None,
        };
        let mut writer = OverlapWriter::create(&path).unwrap();
        writer.write_segment(&segment, &chroms).unwrap();
        writer.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("1\t3\t5\tBC1\t2\t2\t.\t.\t.\t1,3,\t5,8,\n"));

        let mut fresh = ChromosomeCodes::new();
        let segments = read_overlap_table(&path, &mut fresh).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(fresh.name(segments[0].chr), "1");
        assert_eq!(segments[0].read_starts, vec![1, 3]);
        assert_eq!(segments[0].read_ends, vec![5, 8]);
        assert_eq!(segments[0].barcode, "BC1");
        assert!(segments[0].mapq.is_none());
    }

    #[test]
    fn overlap_summary_reads_cell_and_barcode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("OverlapSummary.txt");
        let counts = vec![
            CellCounts {
                total_reads: 10,
                valid_reads: 8,
                overlaps: 1,
            },
            CellCounts::default(),
        ];
        write_overlap_summary(&path, &["A".to_string(), "B".to_string()], &counts).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Cell Id\tNumber of Valid Reads\tNumber of Overlaps\tBarcode\tTotal Number of Reads\n"));
        assert!(text.contains("A\t8\t1\tA\t10\n"));

        let pairs = read_overlap_summary(&path).unwrap();
        assert_eq!(pairs, vec![("A".to_string(), "A".to_string()), ("B".to_string(), "B".to_string())]);
    }

    #[rstest]
    #[case(0.01, "01")]
    #[case(0.05, "05")]
    #[case(1.0, "1")]
    fn threshold_suffixes(#[case] q: f64, #[case] expected: &str) {
        assert_eq!(threshold_suffix(q), expected);
    }
}
