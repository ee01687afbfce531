//! Frequency/amplitude/phase (FAP) calibration table parser.
//!
//! Format:
//! - `#` or `!` start a comment, on their own line or after the data
//! - one row per line: `frequency amplitude phase`, phase in degrees
//! - columns separated by whitespace or commas
//! - an optional column header before the first row

use crate::error::{MetadataError, MetadataResult};
use lib_filters::{FilterBase, FilterStage, FrequencyResponseTableFilter};
use lib_types::units::Hertz;
use nom::{
    branch::alt,
    character::complete::{char, space0, space1},
    combinator::{all_consuming, opt, rest, value},
    number::complete::double,
    sequence::preceded,
    IResult, Parser,
};
use std::path::Path;

/// Parsed calibration table, phases in radians.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FapTable {
    pub frequencies: Vec<Hertz>,
    pub amplitudes: Vec<f64>,
    pub phases: Vec<f64>,
}

impl FapTable {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Turn the table into a validated filter stage.
    pub fn into_filter(self, base: FilterBase) -> MetadataResult<FrequencyResponseTableFilter> {
        let filter = FrequencyResponseTableFilter::new(base, self.frequencies, self.amplitudes, self.phases);
        filter.validate()?;
        Ok(filter)
    }
}

/// Parse a FAP table from a string.
pub fn parse_fap_table(content: &str) -> MetadataResult<FapTable> {
    let mut table = FapTable::default();
    let mut seen_content = false;

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        match all_consuming(data_row).parse(line) {
            Ok((_, (frequency, amplitude, phase))) => {
                table.frequencies.push(Hertz(frequency));
                table.amplitudes.push(amplitude);
                table.phases.push(phase.to_radians());
            }
            Err(_) if !seen_content && is_header(trimmed) => {
                tracing::debug!("Skipping FAP column header on line {}", line_number);
            }
            Err(e) => {
                return Err(MetadataError::syntax(
                    line_number,
                    format!("expected 'frequency amplitude phase' ({})", MetadataError::from(e)),
                ))
            }
        }
        seen_content = true;
    }

    if table.is_empty() {
        return Err(MetadataError::syntax(0, "no data rows in FAP table"));
    }

    Ok(table)
}

/// Parse a FAP table from a path.
pub fn parse_fap_file(path: &Path) -> MetadataResult<FapTable> {
    let content = std::fs::read_to_string(path)?;
    let table = parse_fap_table(&content)?;
    tracing::info!("Read {} calibration rows from {}", table.len(), path.display());
    Ok(table)
}

fn is_header(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

// ============================================================================
// Nom Parsers (nom 8 compatible)
// ============================================================================

fn separator(input: &str) -> IResult<&str, ()> {
    alt((value((), (space0, char(','), space0)), value((), space1))).parse(input)
}

fn trailing_comment(input: &str) -> IResult<&str, ()> {
    value((), preceded(alt((char('#'), char('!'))), rest)).parse(input)
}

fn data_row(input: &str) -> IResult<&str, (f64, f64, f64)> {
    let (input, _) = space0(input)?;
    let (input, frequency) = double(input)?;
    let (input, _) = separator(input)?;
    let (input, amplitude) = double(input)?;
    let (input, _) = separator(input)?;
    let (input, phase) = double(input)?;
    let (input, _) = opt(char(',')).parse(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = opt(trailing_comment).parse(input)?;

    Ok((input, (frequency, amplitude, phase)))
}
