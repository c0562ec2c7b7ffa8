pub mod csv;
pub mod json;
pub mod text;

use std::io::Write;

use crate::analysis::{AnalysisReport, EstimateReport};
use crate::error::CostError;
use crate::pricing::ModelPriceRecord;

pub trait Formatter {
    fn estimate(&self, report: &EstimateReport, writer: &mut dyn Write) -> Result<(), CostError>;

    fn comparison(&self, report: &AnalysisReport, writer: &mut dyn Write)
    -> Result<(), CostError>;

    /// Price records, one row each; used for both model listings and history.
    fn models(&self, records: &[&ModelPriceRecord], writer: &mut dyn Write)
    -> Result<(), CostError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn formatter(&self) -> Box<dyn Formatter> {
        match self {
            OutputFormat::Text => Box::new(text::TextFormatter),
            OutputFormat::Json => Box::new(json::JsonFormatter),
            OutputFormat::Csv => Box::new(csv::CsvFormatter),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" | "markdown" | "md" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {s}. Valid: text, json, csv")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_text() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
    }

    #[test]
    fn test_from_str_json_csv() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
    }

    #[test]
    fn test_from_str_invalid() {
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for fmt in [OutputFormat::Text, OutputFormat::Json, OutputFormat::Csv] {
            assert_eq!(fmt.to_string().parse::<OutputFormat>().unwrap(), fmt);
        }
    }
}
