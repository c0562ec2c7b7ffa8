use std::io::Write;

use crate::analysis::{AnalysisReport, EstimateReport};
use crate::compare::CostProjection;
use crate::error::CostError;
use crate::estimate::AggregatedEstimate;
use crate::formatter::Formatter;
use crate::pricing::{ModelPriceRecord, format_cost};

/// Markdown tables for terminals and notes.
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn estimate(&self, report: &EstimateReport, writer: &mut dyn Write) -> Result<(), CostError> {
        writeln!(writer, "Mode: {} (tokenizer: {})", report.mode, report.tokenizer)?;
        writeln!(writer)?;
        write_file_table(&report.aggregate, writer)?;
        write_omissions(&report.aggregate, writer)?;
        Ok(())
    }

    fn comparison(
        &self,
        report: &AnalysisReport,
        writer: &mut dyn Write,
    ) -> Result<(), CostError> {
        writeln!(
            writer,
            "Mode: {} (tokenizer: {}), output ratio {}, prices as of {}",
            report.mode,
            report.tokenizer,
            report.output_token_ratio,
            report.priced_at.format("%Y-%m-%d %H:%M UTC"),
        )?;
        writeln!(writer)?;
        write_file_table(&report.aggregate, writer)?;
        writeln!(writer)?;

        if report.ranked.is_empty() {
            writeln!(writer, "No models could be priced.")?;
        } else {
            writeln!(
                writer,
                "| # | Model | Input | Output | Input cost | Output cost | Total | Context | Notes |"
            )?;
            writeln!(
                writer,
                "|--:|-------|------:|-------:|-----------:|------------:|------:|--------:|-------|"
            )?;
            for (i, p) in report.ranked.iter().enumerate() {
                writeln!(
                    writer,
                    "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                    i + 1,
                    model_label(p),
                    format_tokens(p.input_tokens),
                    format_tokens(p.estimated_output_tokens),
                    format_cost(p.input_cost),
                    format_cost(p.output_cost),
                    format_cost(p.total_cost),
                    format_tokens(p.context_window_tokens),
                    notes(p),
                )?;
            }
        }

        if !report.excluded_models.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Excluded models:")?;
            for m in &report.excluded_models {
                writeln!(writer, "- {}:{} ({})", m.provider_id, m.model_id, m.reason)?;
            }
        }
        write_omissions(&report.aggregate, writer)?;
        Ok(())
    }

    fn models(
        &self,
        records: &[&ModelPriceRecord],
        writer: &mut dyn Write,
    ) -> Result<(), CostError> {
        if records.is_empty() {
            writeln!(writer, "No models found.")?;
            return Ok(());
        }
        writeln!(
            writer,
            "| Model | Name | Input /1K | Output /1K | Context | Capabilities | Version |"
        )?;
        writeln!(
            writer,
            "|-------|------|----------:|-----------:|--------:|--------------|---------|"
        )?;
        for r in records {
            let caps: Vec<String> = r.capabilities.iter().map(|c| c.to_string()).collect();
            writeln!(
                writer,
                "| {} | {} | {} | {} | {} | {} | {} |",
                r.model_ref(),
                r.display_name.as_deref().unwrap_or("-"),
                format_cost(r.input_price_per_1k),
                format_cost(r.output_price_per_1k),
                format_tokens(r.context_window_tokens),
                if caps.is_empty() { "-".to_string() } else { caps.join(", ") },
                r.price_version_timestamp.format("%Y-%m-%d"),
            )?;
        }
        Ok(())
    }
}

fn write_file_table(agg: &AggregatedEstimate, writer: &mut dyn Write) -> Result<(), CostError> {
    writeln!(writer, "| File | Units | Tokens | Omitted |")?;
    writeln!(writer, "|------|------:|-------:|--------:|")?;
    let mut units = 0usize;
    let mut omitted = 0usize;
    for f in &agg.per_file_breakdown {
        writeln!(
            writer,
            "| {} | {} | {} | {} |",
            f.file_id,
            f.estimated_units,
            format_tokens(f.token_count),
            f.omitted.len(),
        )?;
        units += f.estimated_units;
        omitted += f.omitted.len();
    }
    writeln!(
        writer,
        "| **Total** | **{}** | **{}** | **{}** |",
        units,
        format_tokens(agg.total_input_tokens),
        omitted,
    )?;
    if let Some(tag) = agg.worst_accuracy_tag {
        writeln!(writer)?;
        writeln!(writer, "Worst accuracy tag: {tag}")?;
    }
    Ok(())
}

fn write_omissions(agg: &AggregatedEstimate, writer: &mut dyn Write) -> Result<(), CostError> {
    let mut omitted = agg.omitted_units().peekable();
    if omitted.peek().is_none() {
        return Ok(());
    }
    writeln!(writer)?;
    writeln!(writer, "Omitted units:")?;
    for o in omitted {
        writeln!(
            writer,
            "- {} ({}): {}: {}",
            o.content_unit_id, o.origin_file_id, o.reason, o.detail
        )?;
    }
    Ok(())
}

fn model_label(p: &CostProjection) -> String {
    match &p.display_name {
        Some(name) => format!("{name} ({}:{})", p.provider_id, p.model_id),
        None => format!("{}:{}", p.provider_id, p.model_id),
    }
}

fn notes(p: &CostProjection) -> String {
    let mut notes = Vec::new();
    if let Some(d) = &p.batch_discount {
        notes.push(format!(
            "batch -{:.0}% (was {})",
            d.rate * 100.0,
            format_cost(p.undiscounted_cost)
        ));
    }
    if p.long_context_pricing {
        notes.push("long-context rate".to_string());
    }
    if p.exceeds_context_window {
        notes.push("exceeds context window".to_string());
    }
    if notes.is_empty() {
        "-".to_string()
    } else {
        notes.join("; ")
    }
}

pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
