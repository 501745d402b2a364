use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use tracing::warn;

use super::types::{JudgeId, LocalId, Participant, ParticipantDetails, RemoteId, SyncState};
use crate::error::ValidationError;
use crate::remote::{ParticipantPayload, RemoteParticipant};
use crate::scoring::ScoringConfig;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Pull an identifier out of either `"abc"` or `{"$oid": "abc"}`.
pub fn extract_id(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("$oid")?.as_str()?,
        _ => return None,
    };
    let id = id.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Empty or `YYYY-MM-DD`.
pub fn validate_birth_date(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok() {
        Ok(())
    } else {
        Err(ValidationError::InvalidBirthDate(value.to_string()))
    }
}

/// Remote dates occasionally arrive as full timestamps; keep the date part.
fn normalize_birth_date(raw: &str) -> Result<String, ValidationError> {
    let raw = raw.trim();
    if validate_birth_date(raw).is_ok() {
        return Ok(raw.to_string());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive().format(DATE_FORMAT).to_string())
        .map_err(|_| ValidationError::InvalidBirthDate(raw.to_string()))
}

fn parse_grade(judge: &str, value: &Value) -> Result<Option<f64>, ValidationError> {
    let malformed = || ValidationError::MalformedGrade {
        judge: judge.to_string(),
        raw: value.to_string(),
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).map(Some).ok_or_else(malformed),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(malformed),
        _ => Err(malformed()),
    }
}

/// Turn a loosely typed remote record into a well-formed, `Clean`
/// [`Participant`].
///
/// Every configured seat ends up in the score sheet; seats the payload does
/// not mention are absent. Grades for seats that are not configured are
/// dropped. `index` is the record's position in the remote list and is only
/// used for error messages.
pub fn decode_participant(
    index: usize,
    raw: &RemoteParticipant,
    config: &ScoringConfig,
    local_id: LocalId,
) -> Result<Participant, ValidationError> {
    let remote_id = raw
        .id
        .as_ref()
        .and_then(extract_id)
        .ok_or(ValidationError::MissingRemoteId(index))?;

    let text = |v: &Option<String>| v.as_deref().unwrap_or("").trim().to_string();
    let details = ParticipantDetails {
        full_name: text(&raw.name),
        birth_date: normalize_birth_date(raw.date_of_birth.as_deref().unwrap_or(""))?,
        city: text(&raw.city),
        school: text(&raw.school),
        mentor: text(&raw.mentor),
        apparatus: text(&raw.apparatus),
        thread: text(&raw.thread),
    };

    let mut scores = config.blank_sheet();
    if let Some(grades) = &raw.grades {
        for (judge, value) in grades {
            let seat = JudgeId::new(judge.as_str());
            match scores.get_mut(&seat) {
                Some(slot) => *slot = parse_grade(judge, value)?,
                None => warn!(
                    participant = %remote_id,
                    judge = %judge,
                    "Dropping grade for unconfigured judge seat"
                ),
            }
        }
    }

    Ok(Participant {
        local_id,
        remote_id: Some(RemoteId(remote_id)),
        details,
        scores,
        state: SyncState::Clean,
    })
}

/// Body for create/update calls. Absent scores are sent as `null`.
pub fn encode_payload(participant: &Participant) -> ParticipantPayload {
    let d = &participant.details;
    ParticipantPayload {
        name: d.full_name.clone(),
        date_of_birth: d.birth_date.clone(),
        thread: d.thread.clone(),
        school: d.school.clone(),
        mentor: d.mentor.clone(),
        city: d.city.clone(),
        apparatus: d.apparatus.clone(),
        grades: participant
            .scores
            .iter()
            .map(|(judge, entry)| (judge.0.clone(), *entry))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn raw(value: Value) -> RemoteParticipant {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_id_forms() {
        assert_eq!(extract_id(&json!("abc")), Some("abc".to_string()));
        assert_eq!(extract_id(&json!({"$oid": "65f0a1"})), Some("65f0a1".to_string()));
        assert_eq!(extract_id(&json!("  ")), None);
        assert_eq!(extract_id(&json!(42)), None);
        assert_eq!(extract_id(&json!({"id": "x"})), None);
    }

    #[test]
    fn test_decode_normalizes_missing_seats() {
        let config = ScoringConfig::default();
        let record = raw(json!({
            "_id": {"$oid": "65f0"},
            "name": " Anna Petrova ",
            "city": "Kazan",
            "grades": {"ДВ-1": 8.0, "ДВ-2": "8,4"}
        }));
        let p = decode_participant(0, &record, &config, LocalId(1)).unwrap();

        assert_eq!(p.remote_id, Some(RemoteId("65f0".to_string())));
        assert_eq!(p.state, SyncState::Clean);
        assert_eq!(p.details.full_name, "Anna Petrova");
        assert_eq!(p.details.school, "");
        assert_eq!(p.scores.len(), 12);
        assert_eq!(p.score(&JudgeId::new("ДВ-1")), Some(8.0));
        assert_eq!(p.score(&JudgeId::new("ДВ-2")), Some(8.4));
        assert_eq!(p.score(&JudgeId::new("Е-1")), None);
    }

    #[test]
    fn test_decode_zero_is_not_absent() {
        let config = ScoringConfig::default();
        let record = raw(json!({"_id": "a", "grades": {"Е-1": 0, "Е-2": "", "Е-3": null}}));
        let p = decode_participant(0, &record, &config, LocalId(1)).unwrap();
        assert_eq!(p.score(&JudgeId::new("Е-1")), Some(0.0));
        assert_eq!(p.scores[&JudgeId::new("Е-2")], None);
        assert_eq!(p.scores[&JudgeId::new("Е-3")], None);
    }

    #[test]
    fn test_decode_drops_unknown_seat() {
        let config = ScoringConfig::default();
        let record = raw(json!({"_id": "a", "grades": {"Z-9": 5.0}}));
        let p = decode_participant(0, &record, &config, LocalId(1)).unwrap();
        assert_eq!(p.scores.len(), 12);
        assert!(!p.scores.contains_key(&JudgeId::new("Z-9")));
    }

    #[test]
    fn test_decode_rejects_missing_id() {
        let config = ScoringConfig::default();
        let record = raw(json!({"name": "No id"}));
        let err = decode_participant(4, &record, &config, LocalId(1)).unwrap_err();
        assert_eq!(err, ValidationError::MissingRemoteId(4));
    }

    #[test]
    fn test_decode_rejects_garbage_grade() {
        let config = ScoringConfig::default();
        let record = raw(json!({"_id": "a", "grades": {"А-1": "abc"}}));
        let err = decode_participant(0, &record, &config, LocalId(1)).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedGrade { ref judge, .. } if judge == "А-1"));

        let record = raw(json!({"_id": "a", "grades": {"А-1": [1, 2]}}));
        assert!(decode_participant(0, &record, &config, LocalId(1)).is_err());
    }

    #[test]
    fn test_birth_date_forms() {
        assert!(validate_birth_date("").is_ok());
        assert!(validate_birth_date("2013-05-16").is_ok());
        assert!(validate_birth_date("16.05.2013").is_err());
        assert_eq!(
            normalize_birth_date("2013-05-16T00:00:00Z").unwrap(),
            "2013-05-16"
        );
        assert!(normalize_birth_date("soon").is_err());
    }

    #[test]
    fn test_encode_sends_absent_as_null() {
        let config = ScoringConfig::default();
        let mut scores = config.blank_sheet();
        scores.insert(JudgeId::new("Е-1"), Some(9.5));
        let p = Participant {
            local_id: LocalId(1),
            remote_id: None,
            details: ParticipantDetails {
                full_name: "Anna".to_string(),
                apparatus: "Hoop".to_string(),
                ..Default::default()
            },
            scores,
            state: SyncState::New,
        };
        let payload = encode_payload(&p);
        assert_eq!(payload.name, "Anna");
        assert_eq!(payload.grades.len(), 12);
        assert_eq!(payload.grades["Е-1"], Some(9.5));

        let body = serde_json::to_value(&payload).unwrap();
        assert!(body["grades"]["Е-2"].is_null());
        assert_eq!(body["apparatus"], json!("Hoop"));
        let _: BTreeMap<String, Option<f64>> =
            serde_json::from_value(body["grades"].clone()).unwrap();
    }
}
