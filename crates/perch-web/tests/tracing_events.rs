//! Structured log records emitted while handling page events.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use perch_core::{DocumentArena, DocumentTree, HostEvent, PageMetrics, PointerEvent, SelectionSnapshot};
use perch_runtime::{MemoryStore, ScriptedAnswerSource, UserConfig};
use perch_web::PerchController;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use web_time::Duration;

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn message(&self) -> Option<&str> {
        self.fields.get("message").map(String::as_str)
    }
}

struct SpanCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl SpanCapture {
    fn new() -> (Self, CaptureHandle) {
        let spans = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let handle = CaptureHandle {
            spans: spans.clone(),
            events: events.clone(),
        };
        (Self { spans, events }, handle)
    }
}

struct CaptureHandle {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureHandle {
    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn messages(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| e.message().map(str::to_owned))
            .collect()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for SpanCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_tracing<F>(f: F) -> CaptureHandle
where
    F: FnOnce(),
{
    let (layer, handle) = SpanCapture::new();
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    handle
}

fn controller() -> PerchController {
    PerchController::new(
        UserConfig::default(),
        Box::new(ScriptedAnswerSource::default()),
        Box::new(MemoryStore::new()),
    )
    .expect("controller")
}

#[test]
fn handle_opens_span_named_after_event() {
    let handle = with_captured_tracing(|| {
        let mut doc = DocumentArena::new(PageMetrics::viewport(1200.0, 800.0));
        let mut ctl = controller();
        let body = doc.body().expect("body");
        ctl.handle(&mut doc, HostEvent::PointerDown(PointerEvent::at(body, 1.0, 1.0)));
    });

    let spans = handle.spans();
    let handled: Vec<_> = spans.iter().filter(|s| s.name == "perch.handle").collect();
    assert_eq!(handled.len(), 1);
    assert_eq!(
        handled[0].fields.get("event").map(String::as_str),
        Some("pointerdown")
    );
}

#[test]
fn toolbar_lifecycle_is_logged() {
    let handle = with_captured_tracing(|| {
        let mut doc =
            DocumentArena::new(PageMetrics::viewport(1200.0, 800.0).with_document_height(2000.0));
        let mut ctl = controller();
        let body = doc.body().expect("body");
        doc.set_selection(SelectionSnapshot::new("hello", Some(body)));
        ctl.handle(&mut doc, HostEvent::PointerUp(PointerEvent::at(body, 400.0, 300.0)));
        ctl.advance(&mut doc, Duration::ZERO);
        ctl.handle(&mut doc, HostEvent::PointerDown(PointerEvent::at(body, 1.0, 1.0)));
    });

    let messages = handle.messages();
    let mount = messages
        .iter()
        .position(|m| m == "panel.mount")
        .expect("mount logged");
    let dismiss = messages
        .iter()
        .position(|m| m == "panel.dismiss")
        .expect("dismiss logged");
    let close = messages
        .iter()
        .position(|m| m == "panel.close")
        .expect("close logged");
    assert!(mount < dismiss && dismiss < close);

    let dismiss_event = handle
        .events()
        .into_iter()
        .find(|e| e.message() == Some("panel.dismiss"))
        .expect("dismiss event");
    assert_eq!(
        dismiss_event.fields.get("reason").map(String::as_str),
        Some("outside_click")
    );
    assert_eq!(dismiss_event.fields.get("count").map(String::as_str), Some("1"));
}
