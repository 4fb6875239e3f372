use std::sync::Arc;

use argus::protocol::{Breadcrumb, Event, Level};
use argus_core::test::{with_captured_events, with_captured_events_options};
use argus::ClientOptions;

#[test]
fn test_capture_message() {
    let events = with_captured_events(|hub| {
        let id = hub.capture_message("worked!", Level::Warning);
        assert!(id.is_some());
        assert_eq!(hub.last_event_id(), id);
    });
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.message.as_deref(), Some("worked!"));
    assert_eq!(event.level, Level::Warning);
    assert!(!event.event_id.is_nil());
    assert_eq!(event.sdk.as_ref().map(|s| s.name.as_str()), Some("argus.rust"));
}

#[test]
fn test_scope_data_applied() {
    let events = with_captured_events(|hub| {
        hub.configure_scope(|scope| {
            scope.set_tag("region", "eu-1");
            scope.set_extra("attempt", 3.into());
        });
        hub.add_breadcrumb(Breadcrumb {
            message: Some("opened connection".into()),
            ..Default::default()
        });
        hub.capture_message("boom", Level::Error);
    });
    let event = &events[0];
    assert_eq!(event.tags["region"], "eu-1");
    assert_eq!(event.extra["attempt"], 3);
    assert_eq!(event.breadcrumbs.len(), 1);
    assert_eq!(
        event.breadcrumbs[0].message.as_deref(),
        Some("opened connection")
    );
}

#[test]
fn test_pushed_scope_is_popped() {
    let events = with_captured_events(|hub| {
        {
            let _guard = hub.push_scope();
            hub.configure_scope(|scope| scope.set_tag("inner", "yes"));
            hub.capture_message("first", Level::Info);
        }
        hub.capture_message("second", Level::Info);
    });
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].tags.get("inner").map(String::as_str), Some("yes"));
    assert!(events[1].tags.get("inner").is_none());
}

#[test]
fn test_options_fill_event_defaults() {
    let options = ClientOptions {
        release: Some("myapp@1.2.3".into()),
        environment: Some("production".into()),
        server_name: Some("web-1".into()),
        ..Default::default()
    };
    let events = with_captured_events_options(
        |hub| {
            hub.capture_message("check", Level::Info);
        },
        options,
    );
    let event = &events[0];
    assert_eq!(event.release.as_deref(), Some("myapp@1.2.3"));
    assert_eq!(event.environment.as_deref(), Some("production"));
    assert_eq!(event.server_name.as_deref(), Some("web-1"));
}

#[test]
fn test_before_send() {
    let options = ClientOptions {
        before_send: Some(Arc::new(|mut event: Event| {
            if event.message.as_deref() == Some("secret") {
                return None;
            }
            event.tags.insert("reviewed".into(), "yes".into());
            Some(event)
        })),
        ..Default::default()
    };
    let events = with_captured_events_options(
        |hub| {
            assert!(hub.capture_message("secret", Level::Info).is_none());
            assert!(hub.capture_message("public", Level::Info).is_some());
        },
        options,
    );
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tags["reviewed"], "yes");
}

#[test]
fn test_before_breadcrumb() {
    let options = ClientOptions {
        before_breadcrumb: Some(Arc::new(|crumb: Breadcrumb| {
            if crumb.category.as_deref() == Some("noise") {
                None
            } else {
                Some(crumb)
            }
        })),
        ..Default::default()
    };
    let events = with_captured_events_options(
        |hub| {
            hub.add_breadcrumb(Breadcrumb {
                category: Some("noise".into()),
                ..Default::default()
            });
            hub.add_breadcrumb(Breadcrumb {
                category: Some("http".into()),
                ..Default::default()
            });
            hub.capture_message("done", Level::Info);
        },
        options,
    );
    assert_eq!(events[0].breadcrumbs.len(), 1);
    assert_eq!(events[0].breadcrumbs[0].category.as_deref(), Some("http"));
}

#[test]
fn test_client_event_processor() {
    let events = with_captured_events(|hub| {
        let client = hub.client().unwrap();
        client.add_event_processor(Arc::new(|mut event: Event| {
            event.tags.insert("processed".into(), "client".into());
            Some(event)
        }));
        client.add_event_processor(Arc::new(|event: Event| {
            if event.message.as_deref() == Some("noisy") {
                None
            } else {
                Some(event)
            }
        }));
        assert!(hub.capture_message("noisy", Level::Info).is_none());
        hub.capture_message("kept", Level::Info);
    });
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tags["processed"], "client");
}

#[test]
fn test_sample_rate_zero_drops_everything() {
    let options = ClientOptions {
        sample_rate: 0.0,
        ..Default::default()
    };
    let events = with_captured_events_options(
        |hub| {
            for _ in 0..10 {
                assert!(hub.capture_message("gone", Level::Info).is_none());
            }
        },
        options,
    );
    assert!(events.is_empty());
}

#[test]
fn test_capture_error_chain() {
    use std::error::Error;
    use std::fmt;

    #[derive(Debug)]
    struct QueryFailed(std::io::Error);

    impl fmt::Display for QueryFailed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "query failed")
        }
    }

    impl Error for QueryFailed {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    let events = with_captured_events(|hub| {
        let err = QueryFailed(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ));
        hub.capture_error(&err);
    });
    let event = &events[0];
    assert_eq!(event.level, Level::Error);
    assert_eq!(event.exception.len(), 2);
    assert_eq!(
        event.exception.last().and_then(|e| e.value.as_deref()),
        Some("query failed")
    );
}
