use crate::protocol::{Event, Map, Value};

// serde_json enforces its recursion limit when parsing, not when
// serializing, so an over-deep tree would serialize fine here and be
// rejected by the server-side parser. Values are bounded up front
// instead, well inside the parser's 128-level limit.
const MAX_VALUE_DEPTH: usize = 64;

fn within_depth(value: &Value, budget: usize) -> bool {
    if budget == 0 {
        return false;
    }
    match value {
        Value::Array(items) => items.iter().all(|item| within_depth(item, budget - 1)),
        Value::Object(fields) => fields.values().all(|field| within_depth(field, budget - 1)),
        _ => true,
    }
}

fn value_ok(value: &Value) -> bool {
    within_depth(value, MAX_VALUE_DEPTH)
}

/// Whether the free-form sections that stripping removes are representable.
fn strippable_sections_ok(event: &Event) -> bool {
    event.extra.values().all(value_ok)
        && event.contexts.values().all(value_ok)
        && event
            .breadcrumbs
            .iter()
            .flat_map(|breadcrumb| breadcrumb.data.values())
            .all(value_ok)
}

/// Whether the free-form sections that survive stripping are representable.
fn core_sections_ok(event: &Event) -> bool {
    event
        .exception
        .iter()
        .filter_map(|exception| exception.stacktrace.as_ref())
        .flat_map(|stacktrace| &stacktrace.frames)
        .flat_map(|frame| frame.vars.values())
        .all(value_ok)
        && event
            .spans
            .iter()
            .flat_map(|span| span.data.values())
            .all(value_ok)
}

/// Serializes an event to its JSON request body.
///
/// If the event is not representable, the most likely culprits are the
/// free-form attachment points (extra, breadcrumb data, contexts), so
/// those are stripped, a diagnostic note is left in `extra`, and the
/// stripped event is serialized instead. Returns `None` if the event
/// still is not representable, in which case it is dropped.
pub fn get_request_body_from_event(event: &Event) -> Option<Vec<u8>> {
    if !core_sections_ok(event) {
        crate::argus_debug!("event payload is nested too deeply, dropping event");
        return None;
    }

    if strippable_sections_ok(event) {
        return match serde_json::to_vec(event) {
            Ok(body) => Some(body),
            Err(err) => {
                crate::argus_debug!("could not serialize event, dropping: {}", err);
                None
            }
        };
    }

    crate::argus_debug!("event payload is nested too deeply, stripping details");
    let mut stripped = event.clone();
    stripped.breadcrumbs = Vec::new();
    stripped.extra = Map::new();
    stripped.contexts = Map::new();
    stripped.extra.insert(
        "info".into(),
        Value::String(
            "could not serialize the original event; breadcrumbs, extra and contexts were dropped"
                .into(),
        ),
    );
    match serde_json::to_vec(&stripped) {
        Ok(body) => Some(body),
        Err(err) => {
            crate::argus_debug!("could not serialize stripped event, dropping: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Breadcrumb, Exception, Frame, Stacktrace};

    // deeper than MAX_VALUE_DEPTH, so the body would be rejected by a
    // parser with the default serde_json recursion limit
    fn overly_nested_value() -> Value {
        let mut value = Value::Bool(true);
        for _ in 0..256 {
            value = Value::Array(vec![value]);
        }
        value
    }

    #[test]
    fn test_well_formed_event_serializes() {
        let event = Event {
            message: Some("hello".into()),
            ..Event::new()
        };
        let body = get_request_body_from_event(&event).unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["message"], "hello");
    }

    #[test]
    fn test_unserializable_extra_is_stripped() {
        let mut event = Event::new();
        event.message = Some("kept".into());
        event.extra.insert("poison".into(), overly_nested_value());

        let body = get_request_body_from_event(&event).unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["message"], "kept");
        assert!(parsed["extra"]["poison"].is_null());
        assert!(parsed["extra"]["info"]
            .as_str()
            .unwrap()
            .contains("could not serialize"));
    }

    #[test]
    fn test_unserializable_breadcrumb_data_is_stripped() {
        let mut event = Event::new();
        event.breadcrumbs.push(Breadcrumb {
            data: {
                let mut data = Map::new();
                data.insert("poison".into(), overly_nested_value());
                data
            },
            ..Default::default()
        });

        let body = get_request_body_from_event(&event).unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed["breadcrumbs"].is_null());
        assert!(parsed["extra"]["info"].is_string());
    }

    #[test]
    fn test_unserializable_core_drops_event() {
        // a poisoned value outside the stripped sections cannot be
        // recovered from
        let mut event = Event::new();
        event.exception.push(Exception {
            ty: "Error".into(),
            stacktrace: Some(Stacktrace {
                frames: vec![Frame {
                    vars: {
                        let mut vars = Map::new();
                        vars.insert("poison".into(), overly_nested_value());
                        vars
                    },
                    ..Default::default()
                }],
            }),
            ..Default::default()
        });
        assert!(get_request_body_from_event(&event).is_none());
    }

    #[test]
    fn test_deep_but_bounded_value_is_kept() {
        let mut value = Value::Bool(true);
        for _ in 0..32 {
            value = Value::Array(vec![value]);
        }
        let mut event = Event::new();
        event.extra.insert("deep".into(), value);

        let body = get_request_body_from_event(&event).unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed["extra"]["deep"].is_array());
    }
}
