use crate::session::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "datasetName")]
    pub dataset_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ModerationSettings {
    pub dependent: Option<String>,
    pub predictor: Option<String>,
    pub moderators: Option<Vec<String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "dataSource")]
    pub data_source: DataSource,
    pub moderation: Option<ModerationSettings>,
}

impl AnalysisConfig {
    /// The moderation models to run, one per configured moderator.
    /// Defaults follow the original dashboard: emotional exhaustion
    /// against centered adaptability, moderated by workload, autonomy,
    /// perceived support and weekly hours.
    pub fn regression_specs(&self) -> Vec<RegressionSpec> {
        let moderation = self.moderation.clone().unwrap_or(ModerationSettings {
            dependent: None,
            predictor: None,
            moderators: None,
        });
        let dependent = moderation.dependent.unwrap_or_else(|| "EE".to_string());
        let predictor = moderation.predictor.unwrap_or_else(|| "ADT_c".to_string());
        let moderators = moderation.moderators.unwrap_or_else(|| {
            vec![
                "WKL_c".to_string(),
                "AUT_c".to_string(),
                "POS_c".to_string(),
                "HoursPerWeek_c".to_string(),
            ]
        });
        moderators
            .iter()
            .map(|m| RegressionSpec {
                dependent: dependent.clone(),
                predictor: predictor.clone(),
                moderator: m.clone(),
            })
            .collect()
    }
}

pub fn read_config(path: &str) -> SessionResult<AnalysisConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path.to_string(),
    })?;
    let config: AnalysisConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: String) -> SessionResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_default_moderation() {
        let config: AnalysisConfig = serde_json::from_str(
            r#"{
                "outputSettings": {"datasetName": "pilot"},
                "dataSource": {"filePath": "survey.xlsx"}
            }"#,
        )
        .unwrap();
        let specs = config.regression_specs();
        assert_eq!(specs.len(), 4);
        assert_eq!(specs[0].dependent, "EE");
        assert_eq!(specs[0].predictor, "ADT_c");
        assert_eq!(specs[3].moderator, "HoursPerWeek_c");
    }

    #[test]
    fn explicit_moderation_overrides_defaults() {
        let config: AnalysisConfig = serde_json::from_str(
            r#"{
                "outputSettings": {"datasetName": "pilot"},
                "dataSource": {"filePath": "survey.csv", "provider": "csv"},
                "moderation": {
                    "dependent": "DP",
                    "predictor": "EXT_c",
                    "moderators": ["AUT_c"]
                }
            }"#,
        )
        .unwrap();
        let specs = config.regression_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].dependent, "DP");
        assert_eq!(specs[0].moderator, "AUT_c");
    }
}
