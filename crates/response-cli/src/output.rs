//! Result output formatting and writing.

use crate::analysis::{ChannelSummary, ResponseCurve, UnitCheck};
use crate::OutputFormat;
use anyhow::Result;
use lib_metadata::FapTable;
use lib_types::response::Response;
use std::io::Write;
use std::path::Path;

/// Open `path` for writing, or stdout when no path is given.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    })
}

pub fn write_curve(curve: &ResponseCurve, w: &mut dyn Write, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(w, "Channel {} response", curve.channel)?;
            writeln!(w, "{:>14} {:>14} {:>10}", "Frequency (Hz)", "Amplitude", "Phase (deg)")?;
            for ((f, a), p) in curve.frequencies.iter().zip(&curve.amplitude).zip(&curve.phase) {
                writeln!(w, "{:>14.6e} {:>14.6e} {:>10.3}", f.0, a, p)?;
            }
        }
        OutputFormat::Json => {
            writeln!(w, "{}", serde_json::to_string_pretty(curve)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "frequency,amplitude,phase")?;
            for ((f, a), p) in curve.frequencies.iter().zip(&curve.amplitude).zip(&curve.phase) {
                writeln!(w, "{},{},{}", f.0, a, p)?;
            }
        }
    }
    Ok(())
}

pub fn write_summary(summary: &ChannelSummary, w: &mut dyn Write, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(w, "Channel {}", summary.channel)?;
            writeln!(w, "  Sample rate:    {} Hz", summary.sample_rate.0)?;
            writeln!(w, "  Filters:        {}", summary.filters.join(" -> "))?;
            writeln!(
                w,
                "  Units:          {} -> {}",
                summary.units_in.as_deref().unwrap_or("-"),
                summary.units_out.as_deref().unwrap_or("-")
            )?;
            match &summary.pass_band {
                Some(pb) => writeln!(w, "  Pass band:      {:.6e} - {:.6e} Hz", pb.low.0, pb.high.0)?,
                None => writeln!(w, "  Pass band:      none")?,
            }
            match summary.normalization_frequency {
                Some(f) => writeln!(w, "  Normalization:  {} Hz", f.0)?,
                None => writeln!(w, "  Normalization:  none")?,
            }
            match summary.sensitivity {
                Some(s) => writeln!(w, "  Sensitivity:    {}", s)?,
                None => writeln!(w, "  Sensitivity:    unavailable")?,
            }
            writeln!(w, "  Total delay:    {} s", summary.total_delay.0)?;
        }
        OutputFormat::Json => {
            writeln!(w, "{}", serde_json::to_string_pretty(summary)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "field,value")?;
            writeln!(w, "channel,{}", summary.channel)?;
            writeln!(w, "sample_rate,{}", summary.sample_rate.0)?;
            writeln!(w, "filters,{}", summary.filters.join(";"))?;
            writeln!(w, "units_in,{}", summary.units_in.as_deref().unwrap_or(""))?;
            writeln!(w, "units_out,{}", summary.units_out.as_deref().unwrap_or(""))?;
            writeln!(w, "pass_band_low,{}", summary.pass_band.map(|pb| pb.low.0.to_string()).unwrap_or_default())?;
            writeln!(w, "pass_band_high,{}", summary.pass_band.map(|pb| pb.high.0.to_string()).unwrap_or_default())?;
            writeln!(
                w,
                "normalization_frequency,{}",
                summary.normalization_frequency.map(|f| f.0.to_string()).unwrap_or_default()
            )?;
            writeln!(w, "sensitivity,{}", summary.sensitivity.map(|s| s.to_string()).unwrap_or_default())?;
            writeln!(w, "total_delay,{}", summary.total_delay.0)?;
        }
    }
    Ok(())
}

pub fn write_unit_checks(checks: &[UnitCheck], w: &mut dyn Write, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for check in checks {
                match &check.message {
                    None => writeln!(w, "{}: OK", check.channel)?,
                    Some(message) => writeln!(w, "{}: FAIL - {}", check.channel, message)?,
                }
            }
        }
        OutputFormat::Json => {
            writeln!(w, "{}", serde_json::to_string_pretty(checks)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "channel,consistent,message")?;
            for check in checks {
                writeln!(
                    w,
                    "{},{},\"{}\"",
                    check.channel,
                    check.consistent,
                    check.message.as_deref().unwrap_or("")
                )?;
            }
        }
    }
    Ok(())
}

/// Exported responses are always written as JSON.
pub fn write_export(response: &Response, w: &mut dyn Write) -> Result<()> {
    writeln!(w, "{}", serde_json::to_string_pretty(response)?)?;
    Ok(())
}

pub fn write_fap(table: &FapTable, w: &mut dyn Write, format: OutputFormat) -> Result<()> {
    let rows = table
        .frequencies
        .iter()
        .zip(&table.amplitudes)
        .zip(&table.phases)
        .map(|((f, a), p)| (f.0, *a, p.to_degrees()));

    match format {
        OutputFormat::Text => {
            writeln!(w, "FAP table: {} rows", table.len())?;
            if let (Some(first), Some(last)) = (table.frequencies.first(), table.frequencies.last()) {
                writeln!(w, "  Frequency range: {} - {} Hz", first.0, last.0)?;
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = rows
                .map(|(f, a, p)| serde_json::json!({"frequency": f, "amplitude": a, "phase": p}))
                .collect();
            writeln!(w, "{}", serde_json::to_string_pretty(&rows)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "frequency,amplitude,phase")?;
            for (f, a, p) in rows {
                writeln!(w, "{},{},{}", f, a, p)?;
            }
        }
    }
    Ok(())
}
