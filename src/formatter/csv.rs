use std::io::Write;

use crate::analysis::{AnalysisReport, EstimateReport};
use crate::error::CostError;
use crate::estimate::UnitOutcome;
use crate::formatter::Formatter;
use crate::pricing::ModelPriceRecord;

/// One row per unit, projection or price record.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn estimate(&self, report: &EstimateReport, writer: &mut dyn Write) -> Result<(), CostError> {
        write_row(
            writer,
            &[
                "file_id",
                "unit_id",
                "status",
                "kind",
                "strategy",
                "accuracy_tag",
                "tokens",
                "fallback",
                "reason",
            ],
        )?;
        for outcome in &report.estimates {
            match outcome {
                UnitOutcome::Estimated(e) => write_row(
                    writer,
                    &[
                        &e.origin_file_id,
                        &e.content_unit_id,
                        "estimated",
                        &e.kind.to_string(),
                        &e.strategy_used.to_string(),
                        &e.accuracy_tag.to_string(),
                        &e.token_count.to_string(),
                        &e.fallback.to_string(),
                        "",
                    ],
                )?,
                UnitOutcome::Omitted(o) => write_row(
                    writer,
                    &[
                        &o.origin_file_id,
                        &o.content_unit_id,
                        "omitted",
                        "",
                        "",
                        "",
                        "",
                        "",
                        &o.reason.to_string(),
                    ],
                )?,
            }
        }
        Ok(())
    }

    fn comparison(
        &self,
        report: &AnalysisReport,
        writer: &mut dyn Write,
    ) -> Result<(), CostError> {
        write_row(
            writer,
            &[
                "status",
                "rank",
                "provider_id",
                "model_id",
                "file_id",
                "unit_id",
                "input_tokens",
                "output_tokens",
                "input_cost",
                "output_cost",
                "undiscounted_cost",
                "total_cost",
                "batch_discount_rate",
                "context_window_tokens",
                "exceeds_context_window",
                "long_context_pricing",
                "reason",
                "detail",
            ],
        )?;
        for (i, p) in report.ranked.iter().enumerate() {
            let rate = p
                .batch_discount
                .as_ref()
                .map_or_else(String::new, |d| d.rate.to_string());
            write_row(
                writer,
                &[
                    "ranked",
                    &(i + 1).to_string(),
                    &p.provider_id,
                    &p.model_id,
                    "",
                    "",
                    &p.input_tokens.to_string(),
                    &p.estimated_output_tokens.to_string(),
                    &p.input_cost.to_string(),
                    &p.output_cost.to_string(),
                    &p.undiscounted_cost.to_string(),
                    &p.total_cost.to_string(),
                    &rate,
                    &p.context_window_tokens.to_string(),
                    &p.exceeds_context_window.to_string(),
                    &p.long_context_pricing.to_string(),
                    "",
                    "",
                ],
            )?;
        }
        for m in &report.excluded_models {
            write_row(
                writer,
                &[
                    "excluded",
                    "",
                    &m.provider_id,
                    &m.model_id,
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    &m.reason.to_string(),
                    &m.detail,
                ],
            )?;
        }
        for u in report.aggregate.omitted_units() {
            write_row(
                writer,
                &[
                    "omitted_unit",
                    "",
                    "",
                    "",
                    &u.origin_file_id,
                    &u.content_unit_id,
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    &u.reason.to_string(),
                    &u.detail,
                ],
            )?;
        }
        Ok(())
    }

    fn models(
        &self,
        records: &[&ModelPriceRecord],
        writer: &mut dyn Write,
    ) -> Result<(), CostError> {
        write_row(
            writer,
            &[
                "provider_id",
                "model_id",
                "display_name",
                "input_price_per_1k",
                "output_price_per_1k",
                "context_window_tokens",
                "capabilities",
                "price_version_timestamp",
            ],
        )?;
        for r in records {
            let caps: Vec<String> = r.capabilities.iter().map(|c| c.to_string()).collect();
            write_row(
                writer,
                &[
                    &r.provider_id,
                    &r.model_id,
                    r.display_name.as_deref().unwrap_or(""),
                    &r.input_price_per_1k.to_string(),
                    &r.output_price_per_1k.to_string(),
                    &r.context_window_tokens.to_string(),
                    &caps.join(";"),
                    &r.price_version_timestamp.to_rfc3339(),
                ],
            )?;
        }
        Ok(())
    }
}

fn write_row(writer: &mut dyn Write, fields: &[&str]) -> Result<(), CostError> {
    let line: Vec<String> = fields.iter().map(|f| escape(f)).collect();
    writeln!(writer, "{}", line.join(","))?;
    Ok(())
}

/// Quote a field when it contains a delimiter, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
