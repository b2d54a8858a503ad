//! CSV output generator for usage reports (§4.8)

use anyhow::Result;
use csv::Writer;
use std::fs::File;
use std::path::Path;

use crate::application::services::usage_accounting::UsageReport;

pub struct CsvGenerator;

impl CsvGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate<P: AsRef<Path>>(&self, report: &UsageReport, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write(report, file)
    }

    pub fn generate_string(&self, report: &UsageReport) -> Result<String> {
        let mut wtr = Writer::from_writer(vec![]);
        self.write_rows(report, &mut wtr)?;
        Ok(String::from_utf8(wtr.into_inner()?)?)
    }

    fn write<W: std::io::Write>(&self, report: &UsageReport, writer: W) -> Result<()> {
        let mut wtr = Writer::from_writer(writer);
        self.write_rows(report, &mut wtr)
    }

    fn write_rows<W: std::io::Write>(&self, report: &UsageReport, wtr: &mut Writer<W>) -> Result<()> {
        wtr.write_record(["Schedule", "Date", "Billing Seconds", "Billing Hours", "Begin", "End"])?;

        for day in &report.days {
            if day.intervals.is_empty() {
                wtr.write_record([
                    &report.schedule_name,
                    &day.date.to_string(),
                    &day.billing_seconds.to_string(),
                    &day.billing_hours.to_string(),
                    "",
                    "",
                ])?;
                continue;
            }
            for interval in &day.intervals {
                wtr.write_record([
                    &report.schedule_name,
                    &day.date.to_string(),
                    &interval.billing_seconds.to_string(),
                    &interval.billing_hours.to_string(),
                    &interval.begin.to_string(),
                    &interval.end.to_string(),
                ])?;
            }
        }

        wtr.flush()?;
        Ok(())
    }
}

impl Default for CsvGenerator {
    fn default() -> Self {
        Self::new()
    }
}
