use std::path::Path;

use csv::WriterBuilder;
use markovrec_core::evaluation::{EvaluationMetric, EvaluationReport, UserScore};

use crate::errors::DataError;
use crate::files::write_output;

pub const COUNT_HEADER: [&str; 3] = ["user", "recs_purchased", "optimal_recs_purchased"];
pub const SCORE_HEADER: [&str; 2] = ["user", "score"];

/// Writes one tab-separated row per evaluated user. Undefined rank
/// correlations are written as `nan`.
pub fn write_evaluations(path: &Path, report: &EvaluationReport) -> Result<(), DataError> {
    write_output(path, |output| {
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(output);
        let header: &[&str] = match report.metric {
            EvaluationMetric::Count => &COUNT_HEADER,
            EvaluationMetric::Kendall => &SCORE_HEADER,
        };
        writer.write_record(header).map_err(|source| DataError::csv(path, source))?;

        for (user, score) in &report.scores {
            let row = match score {
                UserScore::Count(count) => vec![
                    user.clone(),
                    count.recs_purchased.to_string(),
                    count.optimal_recs_purchased.to_string(),
                ],
                UserScore::Kendall(tau) => vec![
                    user.clone(),
                    tau.map_or_else(|| "nan".to_string(), |value| value.to_string()),
                ],
            };
            writer.write_record(&row).map_err(|source| DataError::csv(path, source))?;
        }

        writer.flush().map_err(|source| DataError::io(path, source))
    })
}
