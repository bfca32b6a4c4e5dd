use aws_sdk_dynamodb::types::AttributeValue;

use algoprep_core::model::{
    JobStatus, JobSummary, JobType, ProblemExtractionJob, ScriptGenerationJob,
};
use algoprep_core::storage::RepositoryError;

use crate::envelope::{
    self, Envelope, Item, ATTR_GSI1_PK, ATTR_GSI1_SK, ATTR_GSI2_PK, ATTR_GSI2_SK, ATTR_TYPE,
    TYPE_EXTRACTION_JOB, TYPE_SCRIPT_JOB,
};
use crate::keys;

/// `dat` field names for job items.
mod field {
    pub const JOB_ID: &str = "jid";
    pub const URL: &str = "url";
    pub const PLATFORM: &str = "pf";
    pub const PROBLEM_ID: &str = "pid";
    pub const LANGUAGE: &str = "lng";
    pub const STATUS: &str = "st";
    pub const ERROR: &str = "err";
}

pub(crate) fn status_attr(status: JobStatus) -> AttributeValue {
    AttributeValue::S(status.as_str().to_string())
}

fn get_status(dat: &Item, key: &str) -> Result<JobStatus, RepositoryError> {
    let raw = envelope::get_string(dat, key)?;
    JobStatus::parse(&raw)
        .ok_or_else(|| RepositoryError::InvalidData(format!("Unknown job status: {}", raw)))
}

pub fn script_job_to_item(job: &ScriptGenerationJob) -> Item {
    let mut dat = Item::new();
    dat.insert(
        field::JOB_ID.to_string(),
        AttributeValue::S(job.job_id.to_string()),
    );
    dat.insert(
        field::PLATFORM.to_string(),
        AttributeValue::S(job.platform.clone()),
    );
    dat.insert(
        field::PROBLEM_ID.to_string(),
        AttributeValue::S(job.problem_id.clone()),
    );
    dat.insert(
        field::LANGUAGE.to_string(),
        AttributeValue::S(job.language.clone()),
    );
    dat.insert(field::STATUS.to_string(), status_attr(job.status));
    if let Some(error) = &job.error_message {
        dat.insert(field::ERROR.to_string(), AttributeValue::S(error.clone()));
    }

    let mut item = Envelope::new(
        keys::job_pk(JobType::ScriptGeneration, job.job_id),
        keys::META_SK.to_string(),
        TYPE_SCRIPT_JOB,
    )
    .timestamps(job.created_at, job.updated_at)
    .dat(dat)
    .build();

    let created_secs = job.created_at.timestamp();
    item.insert(
        ATTR_GSI1_PK.to_string(),
        AttributeValue::S(keys::job_gsi1_pk(JobType::ScriptGeneration, job.status)),
    );
    item.insert(
        ATTR_GSI1_SK.to_string(),
        AttributeValue::S(keys::job_gsi1_sk(created_secs, job.job_id)),
    );
    item.insert(
        ATTR_GSI2_PK.to_string(),
        AttributeValue::S(keys::script_job_gsi2_pk(&job.platform, &job.problem_id)),
    );
    item.insert(
        ATTR_GSI2_SK.to_string(),
        AttributeValue::S(keys::script_job_gsi2_sk(created_secs, job.job_id)),
    );

    item
}

pub fn item_to_script_job(item: &Item) -> Result<ScriptGenerationJob, RepositoryError> {
    let dat = envelope::dat(item)?;
    Ok(ScriptGenerationJob {
        job_id: envelope::get_uuid(dat, field::JOB_ID)?,
        platform: envelope::get_string(dat, field::PLATFORM)?,
        problem_id: envelope::get_string(dat, field::PROBLEM_ID)?,
        language: envelope::get_string(dat, field::LANGUAGE)?,
        status: get_status(dat, field::STATUS)?,
        error_message: envelope::get_optional_string(dat, field::ERROR),
        created_at: envelope::get_timestamp(item, envelope::ATTR_CREATED)?,
        updated_at: envelope::get_timestamp(item, envelope::ATTR_UPDATED)?,
    })
}

pub fn extraction_job_to_item(job: &ProblemExtractionJob) -> Item {
    let mut dat = Item::new();
    dat.insert(
        field::JOB_ID.to_string(),
        AttributeValue::S(job.job_id.to_string()),
    );
    dat.insert(field::URL.to_string(), AttributeValue::S(job.url.clone()));
    if let Some(platform) = &job.platform {
        dat.insert(
            field::PLATFORM.to_string(),
            AttributeValue::S(platform.clone()),
        );
    }
    if let Some(problem_id) = &job.problem_id {
        dat.insert(
            field::PROBLEM_ID.to_string(),
            AttributeValue::S(problem_id.clone()),
        );
    }
    dat.insert(field::STATUS.to_string(), status_attr(job.status));
    if let Some(error) = &job.error_message {
        dat.insert(field::ERROR.to_string(), AttributeValue::S(error.clone()));
    }

    let mut item = Envelope::new(
        keys::job_pk(JobType::ProblemExtraction, job.job_id),
        keys::META_SK.to_string(),
        TYPE_EXTRACTION_JOB,
    )
    .timestamps(job.created_at, job.updated_at)
    .dat(dat)
    .build();

    item.insert(
        ATTR_GSI1_PK.to_string(),
        AttributeValue::S(keys::job_gsi1_pk(JobType::ProblemExtraction, job.status)),
    );
    item.insert(
        ATTR_GSI1_SK.to_string(),
        AttributeValue::S(keys::job_gsi1_sk(job.created_at.timestamp(), job.job_id)),
    );

    item
}

pub fn item_to_extraction_job(item: &Item) -> Result<ProblemExtractionJob, RepositoryError> {
    let dat = envelope::dat(item)?;
    Ok(ProblemExtractionJob {
        job_id: envelope::get_uuid(dat, field::JOB_ID)?,
        url: envelope::get_string(dat, field::URL)?,
        platform: envelope::get_optional_string(dat, field::PLATFORM),
        problem_id: envelope::get_optional_string(dat, field::PROBLEM_ID),
        status: get_status(dat, field::STATUS)?,
        error_message: envelope::get_optional_string(dat, field::ERROR),
        created_at: envelope::get_timestamp(item, envelope::ATTR_CREATED)?,
        updated_at: envelope::get_timestamp(item, envelope::ATTR_UPDATED)?,
    })
}

/// Decodes either job flavor into the type-agnostic summary row that status
/// listings return.
pub fn item_to_job_summary(item: &Item) -> Result<JobSummary, RepositoryError> {
    let job_type = match envelope::get_string(item, ATTR_TYPE)?.as_str() {
        TYPE_SCRIPT_JOB => JobType::ScriptGeneration,
        TYPE_EXTRACTION_JOB => JobType::ProblemExtraction,
        other => {
            return Err(RepositoryError::InvalidData(format!(
                "Not a job item: {}",
                other
            )))
        }
    };
    let dat = envelope::dat(item)?;
    Ok(JobSummary {
        job_id: envelope::get_uuid(dat, field::JOB_ID)?,
        job_type,
        status: get_status(dat, field::STATUS)?,
        created_at: envelope::get_timestamp(item, envelope::ATTR_CREATED)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use uuid::Uuid;

    fn script_fixture() -> ScriptGenerationJob {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut job = ScriptGenerationJob::new("codeforces", "2149G", "python")
            .with_id(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap());
        job.created_at = ts;
        job.updated_at = ts;
        job
    }

    #[test]
    fn test_script_job_round_trip() {
        let job = script_fixture();
        assert_eq!(item_to_script_job(&script_job_to_item(&job)).unwrap(), job);
    }

    #[test]
    fn test_script_job_projections() {
        let item = script_job_to_item(&script_fixture());
        assert_eq!(
            item.get(ATTR_GSI1_PK).unwrap().as_s().unwrap(),
            "SGJOB#STATUS#PENDING"
        );
        assert_eq!(
            item.get(ATTR_GSI2_PK).unwrap().as_s().unwrap(),
            "SGJOB#codeforces#2149G"
        );
    }

    #[test]
    fn test_extraction_job_round_trip() {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut job = ProblemExtractionJob::new("https://codeforces.com/problemset/problem/2149/G")
            .with_id(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440003").unwrap());
        job.status = JobStatus::Failed;
        job.error_message = Some("fetch timed out".to_string());
        job.created_at = ts;
        job.updated_at = ts;

        let item = extraction_job_to_item(&job);
        assert_eq!(
            item.get(ATTR_GSI1_PK).unwrap().as_s().unwrap(),
            "PEJOB#STATUS#FAILED"
        );
        // Extraction jobs have no per-problem projection.
        assert!(!item.contains_key(ATTR_GSI2_PK));
        assert_eq!(item_to_extraction_job(&item).unwrap(), job);
    }

    #[test]
    fn test_job_summary_from_either_flavor() {
        let script = script_fixture();
        let summary = item_to_job_summary(&script_job_to_item(&script)).unwrap();
        assert_eq!(summary.job_id, script.job_id);
        assert_eq!(summary.job_type, JobType::ScriptGeneration);
        assert_eq!(summary.status, JobStatus::Pending);

        let extraction = ProblemExtractionJob::new("https://judge.example/p/1");
        let summary = item_to_job_summary(&extraction_job_to_item(&extraction)).unwrap();
        assert_eq!(summary.job_type, JobType::ProblemExtraction);
    }

    #[test]
    fn test_unknown_status_is_invalid_data() {
        let mut item = script_job_to_item(&script_fixture());
        if let Some(AttributeValue::M(dat)) = item.get_mut(envelope::ATTR_DATA) {
            dat.insert(
                field::STATUS.to_string(),
                AttributeValue::S("RUNNING".to_string()),
            );
        }
        assert!(matches!(
            item_to_script_job(&item),
            Err(RepositoryError::InvalidData(_))
        ));
    }
}
