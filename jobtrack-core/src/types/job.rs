use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ParametersError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    MetadataImport,
    TrackerImport,
    DataValueImport,
    CompleteDataSetRegistrationImport,
    GeojsonImport,
    Predictor,
    Monitoring,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::MetadataImport => "METADATA_IMPORT",
            JobType::TrackerImport => "TRACKER_IMPORT",
            JobType::DataValueImport => "DATA_VALUE_IMPORT",
            JobType::CompleteDataSetRegistrationImport => "COMPLETE_DATA_SET_REGISTRATION_IMPORT",
            JobType::GeojsonImport => "GEOJSON_IMPORT",
            JobType::Predictor => "PREDICTOR",
            JobType::Monitoring => "MONITORING",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cooperative cancellation signal shared between the runner and a tracker.
///
/// Clones observe the same flag. Once requested it stays requested.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Identity and parameters of one job, read by the engine and the job itself.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfiguration {
    pub id: Uuid,
    pub job_type: JobType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(skip)]
    cancellation: CancellationFlag,
}

impl JobConfiguration {
    pub fn new(job_type: JobType, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type,
            name: name.into(),
            parameters: None,
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_parameters<P: Serialize>(mut self, parameters: &P) -> Result<Self, serde_json::Error> {
        self.parameters = Some(serde_json::to_value(parameters)?);
        Ok(self)
    }

    /// Decode the opaque parameters into the type a job expects.
    pub fn parameters<P: DeserializeOwned>(&self) -> Result<P, ParametersError> {
        let value = self.parameters.as_ref().ok_or(ParametersError::Missing {
            job_type: self.job_type,
        })?;
        serde_json::from_value(value.clone()).map_err(|source| ParametersError::Invalid {
            job_type: self.job_type,
            source,
        })
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    pub fn request_cancellation(&self) {
        self.cancellation.request();
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.cancellation.is_requested()
    }
}

/// Result payload a job attaches once it completed, e.g. an import report.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub summary_type: String,
    pub payload: serde_json::Value,
}

impl JobReport {
    pub fn new(summary_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            summary_type: summary_type.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct ImportParams {
        dry_run: bool,
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let config = JobConfiguration::new(JobType::MetadataImport, "import");
        let copy = config.clone();
        assert!(!copy.is_cancellation_requested());
        config.request_cancellation();
        assert!(copy.is_cancellation_requested());
    }

    #[test]
    fn parameters_roundtrip_into_job_type() {
        let config = JobConfiguration::new(JobType::Predictor, "predict")
            .with_parameters(&ImportParams { dry_run: true })
            .unwrap();
        let params: ImportParams = config.parameters().unwrap();
        assert_eq!(params, ImportParams { dry_run: true });
    }

    #[test]
    fn missing_parameters_is_a_job_error() {
        let config = JobConfiguration::new(JobType::GeojsonImport, "geo");
        let err = config.parameters::<ImportParams>().unwrap_err();
        assert!(matches!(err, ParametersError::Missing { job_type: JobType::GeojsonImport }));
    }

    #[test]
    fn mismatched_parameters_is_reported() {
        let mut config = JobConfiguration::new(JobType::Monitoring, "monitor");
        config.parameters = Some(serde_json::json!({"dry_run": "yes"}));
        let err = config.parameters::<ImportParams>().unwrap_err();
        assert!(matches!(err, ParametersError::Invalid { .. }));
    }
}
