use std::io::Write;

use crate::analysis::{AnalysisReport, EstimateReport};
use crate::error::CostError;
use crate::formatter::Formatter;
use crate::pricing::ModelPriceRecord;

/// Pretty-printed JSON of the library's own report structures.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn estimate(&self, report: &EstimateReport, writer: &mut dyn Write) -> Result<(), CostError> {
        serde_json::to_writer_pretty(&mut *writer, report)?;
        writeln!(writer)?;
        Ok(())
    }

    fn comparison(
        &self,
        report: &AnalysisReport,
        writer: &mut dyn Write,
    ) -> Result<(), CostError> {
        serde_json::to_writer_pretty(&mut *writer, report)?;
        writeln!(writer)?;
        Ok(())
    }

    fn models(
        &self,
        records: &[&ModelPriceRecord],
        writer: &mut dyn Write,
    ) -> Result<(), CostError> {
        serde_json::to_writer_pretty(&mut *writer, records)?;
        writeln!(writer)?;
        Ok(())
    }
}
