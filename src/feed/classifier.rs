use serde::Deserialize;
use serde_json::Value;

use crate::models::{DetectionEvent, FrameBatch};

use super::FeedError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::log_debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDetection {
    name: Option<String>,
    set_id: Option<Value>,
    score: Option<Value>,
    image_url: Option<String>,
}

/// Normalizes the three classifier response shapes into a [`FrameBatch`].
///
/// `null`, `{}` and `{"match": null}` become an empty batch, a single object
/// becomes a one-element batch and an array keeps its order. Entries without
/// a name or set id cannot be identified and are dropped; other missing
/// fields are carried as absent.
///
/// A bare string, number or boolean is none of these shapes and is rejected
/// as [`FeedError::MalformedResponse`].
pub fn normalize_response(response: &Value, frame_index: u64) -> Result<FrameBatch, FeedError> {
    let detections = match response {
        Value::Null => Vec::new(),
        Value::Array(entries) => entries.iter().filter_map(parse_detection).collect(),
        Value::Object(_) => parse_detection(response).into_iter().collect(),
        other => {
            return Err(FeedError::MalformedResponse(format!(
                "expected an array or object, got {other}"
            )))
        }
    };
    Ok(FrameBatch::new(frame_index, detections))
}

fn parse_detection(entry: &Value) -> Option<DetectionEvent> {
    let raw: RawDetection = match serde_json::from_value(entry.clone()) {
        Ok(raw) => raw,
        Err(err) => {
            log_debug!("ignoring unparsable detection {entry}: {err}");
            return None;
        }
    };

    let name = raw.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
    let set_id = raw
        .set_id
        .as_ref()
        .and_then(scalar_to_string)
        .filter(|s| !s.is_empty())?;
    let score = raw.score.as_ref().and_then(scalar_to_f64);
    let image_ref = raw.image_url.filter(|url| !url.is_empty());

    Some(DetectionEvent::new(name, set_id, score, image_ref))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_to_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_shapes_become_empty_batches() {
        for response in [json!(null), json!({}), json!({"match": null}), json!([])] {
            let batch = normalize_response(&response, 7).expect("empty shape is valid");
            assert!(batch.is_empty(), "{response} should be empty");
            assert_eq!(batch.frame_index, 7);
        }
    }

    #[test]
    fn single_object_becomes_one_detection() {
        let response = json!({
            "name": "Charizard",
            "set_id": "base1-4",
            "score": 12,
            "image_url": "https://images.example/base1-4.png"
        });
        let batch = normalize_response(&response, 1).expect("object is valid");
        assert_eq!(batch.len(), 1);
        let event = &batch.detections[0];
        assert_eq!(event.display_name, "Charizard");
        assert_eq!(event.set_id, "base1-4");
        assert_eq!(event.score, Some(12.0));
        assert_eq!(event.image_ref.as_deref(), Some("https://images.example/base1-4.png"));
    }

    #[test]
    fn array_keeps_order_and_drops_unidentifiable_entries() {
        let response = json!([
            {"name": "Bulbasaur", "set_id": "base1-44", "score": 3.5},
            {"set_id": "base1-1"},
            {"name": "Squirtle", "set_id": "base1-63", "score": "8.25"},
            "garbage"
        ]);
        let batch = normalize_response(&response, 2).expect("array is valid");
        let names: Vec<_> = batch.detections.iter().map(|d| d.display_name.as_str()).collect();
        assert_eq!(names, vec!["Bulbasaur", "Squirtle"]);
        assert_eq!(batch.detections[1].score, Some(8.25));
    }

    #[test]
    fn missing_score_is_carried_as_absent() {
        let batch = normalize_response(&json!({"name": "Mew", "set_id": 151}), 3)
            .expect("object is valid");
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.detections[0].set_id, "151");
        assert_eq!(batch.detections[0].score, None);
        assert_eq!(batch.detections[0].image_ref, None);
    }

    #[test]
    fn scalar_response_is_malformed() {
        for response in [json!("Pikachu"), json!(42), json!(true)] {
            let err = normalize_response(&response, 4).expect_err("scalar is not a detection");
            assert!(
                matches!(err, FeedError::MalformedResponse(_)),
                "{response} gave {err:?}"
            );
        }
    }
}
