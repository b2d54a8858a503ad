//! JSON output generator

use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub struct JsonGenerator;

impl JsonGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate<T: Serialize, P: AsRef<Path>>(&self, output: &T, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(output)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn generate_string<T: Serialize>(&self, output: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(output)?)
    }
}

impl Default for JsonGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::usage_accounting::{DayUsage, UsageReport};

    #[test]
    fn generate_string_renders_usage_report() {
        let generator = JsonGenerator::new();
        let report = UsageReport {
            schedule_name: "biz".to_string(),
            days: vec![DayUsage {
                date: chrono::NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
                billing_seconds: 3600,
                billing_hours: 1,
                intervals: vec![],
            }],
        };

        let json = generator.generate_string(&report).unwrap();
        assert!(json.contains("\"schedule_name\": \"biz\""));
        assert!(json.contains("\"billing_hours\": 1"));
    }
}
