use aws_sdk_dynamodb::types::AttributeValue;

use algoprep_core::model::{Deletion, Problem, TestCase};
use algoprep_core::storage::RepositoryError;

use crate::envelope::{
    self, Envelope, Item, ATTR_GSI3_PK, ATTR_GSI3_SK, TYPE_PROBLEM, TYPE_TEST_CASE,
};
use crate::keys;

/// `dat` field names for problem items.
mod field {
    pub const PLATFORM: &str = "pf";
    pub const PROBLEM_ID: &str = "pid";
    pub const TITLE: &str = "tt";
    pub const URL: &str = "url";
    pub const DIFFICULTY: &str = "dif";
    pub const COMPLETED: &str = "cmp";
    pub const SOLUTION: &str = "sol";
    pub const TEST_CASE_COUNT: &str = "tcc";
    pub const DELETED: &str = "del";
    pub const DELETED_AT: &str = "at";
    pub const DELETED_REASON: &str = "rsn";
}

/// `dat` field names for test-case items.
mod tc_field {
    pub const INDEX: &str = "idx";
    pub const INPUT: &str = "in";
    pub const OUTPUT: &str = "out";
    pub const BLOB_KEY: &str = "blb";
    pub const ORIGINAL_SIZE: &str = "osz";
}

pub fn problem_to_item(problem: &Problem) -> Item {
    let mut dat = Item::new();
    dat.insert(
        field::PLATFORM.to_string(),
        AttributeValue::S(problem.platform.clone()),
    );
    dat.insert(
        field::PROBLEM_ID.to_string(),
        AttributeValue::S(problem.problem_id.clone()),
    );
    dat.insert(
        field::TITLE.to_string(),
        AttributeValue::S(problem.title.clone()),
    );
    if let Some(url) = &problem.url {
        dat.insert(field::URL.to_string(), AttributeValue::S(url.clone()));
    }
    if let Some(difficulty) = problem.difficulty {
        dat.insert(
            field::DIFFICULTY.to_string(),
            AttributeValue::N(difficulty.to_string()),
        );
    }
    dat.insert(
        field::COMPLETED.to_string(),
        AttributeValue::Bool(problem.completed),
    );
    if let Some(solution) = &problem.solution {
        dat.insert(
            field::SOLUTION.to_string(),
            AttributeValue::S(solution.clone()),
        );
    }
    dat.insert(
        field::TEST_CASE_COUNT.to_string(),
        AttributeValue::N(problem.test_case_count.to_string()),
    );
    if let Some(deletion) = &problem.deleted {
        dat.insert(field::DELETED.to_string(), deletion_attr(deletion));
    }

    let mut item = Envelope::new(
        keys::problem_pk(&problem.platform, &problem.problem_id),
        keys::META_SK.to_string(),
        TYPE_PROBLEM,
    )
    .timestamps(problem.created_at, problem.updated_at)
    .dat(dat)
    .build();

    // Status-bucket projection is sparse: soft-deleted problems drop out of
    // the listing index entirely.
    if problem.deleted.is_none() {
        item.insert(
            ATTR_GSI3_PK.to_string(),
            AttributeValue::S(keys::problem_gsi3_pk(problem.completed)),
        );
        item.insert(
            ATTR_GSI3_SK.to_string(),
            AttributeValue::S(keys::problem_gsi3_sk(
                problem.updated_at.timestamp(),
                &problem.platform,
                &problem.problem_id,
            )),
        );
    }

    item
}

pub fn deletion_attr(deletion: &Deletion) -> AttributeValue {
    let mut map = Item::new();
    map.insert(
        field::DELETED_AT.to_string(),
        AttributeValue::N(deletion.at.timestamp().to_string()),
    );
    map.insert(
        field::DELETED_REASON.to_string(),
        AttributeValue::S(deletion.reason.clone()),
    );
    AttributeValue::M(map)
}

pub fn item_to_problem(item: &Item) -> Result<Problem, RepositoryError> {
    let dat = envelope::dat(item)?;
    let deleted = match dat.get(field::DELETED).and_then(|v| v.as_m().ok()) {
        Some(map) => Some(Deletion {
            at: envelope::get_timestamp(map, field::DELETED_AT)?,
            reason: envelope::get_string(map, field::DELETED_REASON)?,
        }),
        None => None,
    };

    Ok(Problem {
        platform: envelope::get_string(dat, field::PLATFORM)?,
        problem_id: envelope::get_string(dat, field::PROBLEM_ID)?,
        title: envelope::get_string(dat, field::TITLE)?,
        url: envelope::get_optional_string(dat, field::URL),
        difficulty: envelope::get_optional_i64(dat, field::DIFFICULTY),
        completed: envelope::get_bool(dat, field::COMPLETED)?,
        solution: envelope::get_optional_string(dat, field::SOLUTION),
        test_case_count: envelope::get_i64(dat, field::TEST_CASE_COUNT)? as u32,
        deleted,
        created_at: envelope::get_timestamp(item, envelope::ATTR_CREATED)?,
        updated_at: envelope::get_timestamp(item, envelope::ATTR_UPDATED)?,
    })
}

// ============================================================================
// Test cases
// ============================================================================

/// A decoded test-case item. The repository resolves offloaded records
/// against blob storage before handing callers a [`TestCase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestCaseRecord {
    Inline(TestCase),
    Offloaded {
        index: u32,
        object_key: String,
        size: u64,
    },
}

impl TestCaseRecord {
    pub fn index(&self) -> u32 {
        match self {
            TestCaseRecord::Inline(tc) => tc.index,
            TestCaseRecord::Offloaded { index, .. } => *index,
        }
    }
}

fn test_case_envelope(platform: &str, problem_id: &str, index: u32, dat: Item) -> Item {
    Envelope::new(
        keys::problem_pk(platform, problem_id),
        keys::test_case_sk(index),
        TYPE_TEST_CASE,
    )
    .dat(dat)
    .build()
}

/// Builds a test-case item with the payload stored inline.
pub fn inline_test_case_to_item(platform: &str, problem_id: &str, test_case: &TestCase) -> Item {
    let mut dat = Item::new();
    dat.insert(
        tc_field::INDEX.to_string(),
        AttributeValue::N(test_case.index.to_string()),
    );
    dat.insert(
        tc_field::INPUT.to_string(),
        AttributeValue::S(test_case.input.clone()),
    );
    dat.insert(
        tc_field::OUTPUT.to_string(),
        AttributeValue::S(test_case.output.clone()),
    );
    test_case_envelope(platform, problem_id, test_case.index, dat)
}

/// Builds a test-case item that points at an offloaded payload.
pub fn offloaded_test_case_to_item(
    platform: &str,
    problem_id: &str,
    index: u32,
    object_key: &str,
    size: u64,
) -> Item {
    let mut dat = Item::new();
    dat.insert(
        tc_field::INDEX.to_string(),
        AttributeValue::N(index.to_string()),
    );
    dat.insert(
        tc_field::BLOB_KEY.to_string(),
        AttributeValue::S(object_key.to_string()),
    );
    dat.insert(
        tc_field::ORIGINAL_SIZE.to_string(),
        AttributeValue::N(size.to_string()),
    );
    test_case_envelope(platform, problem_id, index, dat)
}

pub fn item_to_test_case_record(item: &Item) -> Result<TestCaseRecord, RepositoryError> {
    let dat = envelope::dat(item)?;
    let index = envelope::get_i64(dat, tc_field::INDEX)? as u32;
    match envelope::get_optional_string(dat, tc_field::BLOB_KEY) {
        Some(object_key) => Ok(TestCaseRecord::Offloaded {
            index,
            object_key,
            size: envelope::get_i64(dat, tc_field::ORIGINAL_SIZE)? as u64,
        }),
        None => Ok(TestCaseRecord::Inline(TestCase {
            index,
            input: envelope::get_string(dat, tc_field::INPUT)?,
            output: envelope::get_string(dat, tc_field::OUTPUT)?,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn fixture() -> Problem {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut problem = Problem::new("codeforces", "2149G", "Permutation Weights")
            .with_url("https://codeforces.com/problemset/problem/2149/G");
        problem.difficulty = Some(1800);
        problem.test_case_count = 3;
        problem.created_at = ts;
        problem.updated_at = ts;
        problem
    }

    #[test]
    fn test_round_trip() {
        let problem = fixture();
        assert_eq!(item_to_problem(&problem_to_item(&problem)).unwrap(), problem);
    }

    #[test]
    fn test_live_problem_is_in_status_bucket() {
        let mut problem = fixture();
        let item = problem_to_item(&problem);
        assert_eq!(item.get(ATTR_GSI3_PK).unwrap().as_s().unwrap(), "PROB#DRAFT");

        problem.completed = true;
        let item = problem_to_item(&problem);
        assert_eq!(
            item.get(ATTR_GSI3_PK).unwrap().as_s().unwrap(),
            "PROB#COMPLETED"
        );
    }

    #[test]
    fn test_deleted_problem_leaves_status_index() {
        let mut problem = fixture();
        problem.deleted = Some(Deletion {
            at: DateTime::from_timestamp(1_700_000_100, 0).unwrap(),
            reason: "duplicate".to_string(),
        });
        let item = problem_to_item(&problem);
        assert!(!item.contains_key(ATTR_GSI3_PK));
        assert!(!item.contains_key(ATTR_GSI3_SK));
        assert_eq!(item_to_problem(&item).unwrap(), problem);
    }

    #[test]
    fn test_inline_test_case_round_trip() {
        let tc = TestCase {
            index: 2,
            input: "3\n1 2 3\n".to_string(),
            output: "6\n".to_string(),
        };
        let item = inline_test_case_to_item("codeforces", "2149G", &tc);
        assert_eq!(
            item.get(envelope::ATTR_SK).unwrap().as_s().unwrap(),
            "TC#0002"
        );
        assert_eq!(
            item_to_test_case_record(&item).unwrap(),
            TestCaseRecord::Inline(tc)
        );
    }

    #[test]
    fn test_offloaded_test_case_round_trip() {
        let item = offloaded_test_case_to_item(
            "codeforces",
            "2149G",
            7,
            "testcases/codeforces/2149G/7.zst",
            120_000,
        );
        assert_eq!(
            item_to_test_case_record(&item).unwrap(),
            TestCaseRecord::Offloaded {
                index: 7,
                object_key: "testcases/codeforces/2149G/7.zst".to_string(),
                size: 120_000,
            }
        );
    }

    #[test]
    fn test_problem_timestamps_come_from_envelope() {
        let decoded = item_to_problem(&problem_to_item(&fixture())).unwrap();
        assert_eq!(decoded.created_at.timestamp(), 1_700_000_000);
    }
}
