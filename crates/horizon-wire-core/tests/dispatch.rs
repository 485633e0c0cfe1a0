//! End-to-end tests: configuration, binding, signals and property sheets.

use std::io::Write;
use std::sync::Arc;
use std::thread;

use horizon_wire_core::{
    shared, CollectingSink, Color, Dispatcher, ErrorKind, InvokeError, PropertySheet, Range,
    Signal, Size, Value, ValueKind, WireConfig,
};
use horizon_wire_macros::slots;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn dispatcher() -> (Dispatcher, Arc<CollectingSink>) {
    init_tracing();
    let sink = Arc::new(CollectingSink::new());
    (Dispatcher::new().with_sink(sink.clone()), sink)
}

#[derive(Default)]
struct ContourView {
    levels: i32,
    interval: f64,
    range: Range,
    line_color: Color,
    size: Size,
    labels: bool,
    history: Vec<String>,
}

#[slots]
impl ContourView {
    pub fn set_levels(&mut self, levels: i32) {
        self.levels = levels;
    }

    pub fn levels(&self) -> i32 {
        self.levels
    }

    pub fn set_interval(&mut self, interval: f64) {
        self.interval = interval;
    }

    pub fn set_range(&mut self, range: Range) {
        self.range = range;
    }

    pub fn set_line_color(&mut self, color: Color) {
        self.line_color = color;
    }

    pub fn set_preferred_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn set_labels(&mut self, labels: bool) {
        self.labels = labels;
    }

    pub fn is_labels(&self) -> bool {
        self.labels
    }

    pub fn redraw(&mut self) {
        self.history.push("redraw".into());
    }

    pub fn zoom(&mut self, factor: f64) {
        self.history.push(format!("zoom {factor}"));
    }

    pub fn select(&mut self, level: i32) {
        self.history.push(format!("select {level}"));
    }

    pub fn set_layer_visible(&mut self, visible: bool, layer: i32) {
        let state = if visible { "on" } else { "off" };
        self.history.push(format!("layer {layer} {state}"));
    }

    pub fn annotate(&mut self, text: String) -> Result<(), String> {
        if text.is_empty() {
            return Err("empty annotation".into());
        }
        self.history.push(text);
        Ok(())
    }

    pub fn crash(&mut self) {
        panic!("renderer lost");
    }
}

#[test]
fn test_button_press_invokes_bound_method() {
    let (dispatcher, sink) = dispatcher();
    let view = shared(ContourView::default());

    let clicked = Signal::<()>::new();
    clicked.connect_invoker(dispatcher.bind(&view, "redraw", None).unwrap());
    clicked.connect_invoker(
        dispatcher
            .bind(&view, "zoom", Some(Value::Double(1.5)))
            .unwrap(),
    );

    clicked.emit(());
    clicked.emit(());

    assert_eq!(
        view.lock().history,
        ["redraw", "zoom 1.5", "redraw", "zoom 1.5"]
    );
    assert!(sink.is_empty());
}

#[test]
fn test_slider_event_value_is_coerced() {
    let (dispatcher, sink) = dispatcher();
    let view = shared(ContourView::default());

    let value_changed = Signal::<i32>::new();
    value_changed.connect_event(dispatcher.bind_event(&view, "zoom", None).unwrap());
    let selected = Signal::<String>::new();
    selected.connect_event(
        dispatcher
            .bind_event(&view, "select", Some(ValueKind::Int))
            .unwrap(),
    );

    value_changed.emit(2);
    selected.emit("7".to_string());
    selected.emit("seven".to_string());

    assert_eq!(view.lock().history, ["zoom 2", "select 7"]);
    let reports = sink.take();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].kind, Some(ErrorKind::Coercion));
}

#[test]
fn test_checkbox_toggles_its_own_layer() {
    let (dispatcher, sink) = dispatcher();
    let view = shared(ContourView::default());

    let toggled = Signal::<bool>::new();
    for layer in [0, 3] {
        toggled.connect_event(
            dispatcher
                .bind_event_with(
                    &view,
                    "set_layer_visible",
                    Some(ValueKind::Bool),
                    Value::Int(layer),
                )
                .unwrap(),
        );
    }

    toggled.emit(false);
    toggled.emit(true);

    assert_eq!(
        view.lock().history,
        ["layer 0 off", "layer 3 off", "layer 0 on", "layer 3 on"]
    );
    assert!(sink.is_empty());
}

#[test]
fn test_misconfigured_bindings_fail_at_bind_time() {
    let (dispatcher, sink) = dispatcher();
    let view = shared(ContourView::default());

    let err = dispatcher.bind(&view, "redrawAll", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MethodNotFound);

    // A text argument does not select a numeric overload.
    let err = dispatcher
        .bind(&view, "zoom", Some(Value::from("2")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MethodNotFound);

    let kinds: Vec<_> = sink.entries().into_iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        [Some(ErrorKind::MethodNotFound), Some(ErrorKind::MethodNotFound)]
    );
}

#[test]
fn test_failures_during_emit_are_reported_not_raised() {
    let (dispatcher, sink) = dispatcher();
    let view = shared(ContourView::default());

    let clicked = Signal::<()>::new();
    clicked.connect_invoker(dispatcher.bind(&view, "crash", None).unwrap());
    clicked.connect_invoker(
        dispatcher
            .bind(&view, "annotate", Some(Value::from("")))
            .unwrap(),
    );
    clicked.connect_invoker(dispatcher.bind(&view, "redraw", None).unwrap());

    clicked.emit(());

    assert_eq!(view.lock().history, ["redraw"]);
    let reports = sink.take();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.kind == Some(ErrorKind::Invocation)));
    assert!(
        reports[0]
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("renderer lost"))
    );
    assert!(
        reports[1]
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("empty annotation"))
    );
}

#[test]
fn test_binding_outlived_by_signal() {
    let (dispatcher, sink) = dispatcher();
    let view = shared(ContourView::default());
    let redraw = dispatcher.bind(&view, "redraw", None).unwrap();
    assert!(redraw.is_alive());

    drop(view);
    assert!(!redraw.is_alive());
    assert!(matches!(
        redraw.invoke(),
        Err(InvokeError::TargetDropped { method: "redraw", .. })
    ));
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_property_sheet_from_file() {
    let (dispatcher, sink) = dispatcher();
    let view = shared(ContourView::default());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
levels = 12
interval = "0.5"
range = "-10:10"
lineColor = "0,0,255"
preferredSize = [640, 480]
labels = true
opacity = 0.8
"#
    )
    .unwrap();

    let sheet = PropertySheet::from_toml_file(file.path()).unwrap();
    let report = dispatcher.apply_sheet(&mut *view.lock(), &sheet, false);

    assert_eq!(report.applied, 6);
    assert_eq!(report.failed_properties(), ["opacity"]);
    assert_eq!(report.failed[0].error.kind(), ErrorKind::MethodNotFound);
    assert_eq!(sink.len(), 1);

    let mut view = view.lock();
    assert_eq!(view.levels, 12);
    assert_eq!(view.interval, 0.5);
    assert_eq!(view.range, Range { min: -10.0, max: 10.0 });
    assert_eq!(view.line_color, Color::BLUE);
    assert_eq!(view.size, Size { width: 640, height: 480 });
    assert_eq!(
        dispatcher.get_property(&mut *view, "labels").unwrap(),
        Some(Value::Bool(true))
    );
}

#[test]
fn test_set_property_ignore_error() {
    let (dispatcher, sink) = dispatcher();
    let view = shared(ContourView::default());
    let mut view = view.lock();

    assert!(dispatcher.set_property(&mut *view, "levels", "42", false));
    assert_eq!(view.levels, 42);

    assert!(!dispatcher.set_property(&mut *view, "levels", "many", true));
    assert!(!dispatcher.set_property(&mut *view, "thickness", "2", true));
    assert!(sink.is_empty());

    assert!(!dispatcher.set_property(&mut *view, "levels", "many", false));
    assert_eq!(sink.len(), 1);
    assert_eq!(view.levels, 42);
}

#[test]
fn test_dispatcher_from_config() {
    init_tracing();
    let config = WireConfig::from_toml_str(
        r#"
        [coercion]
        color_fallback = "black"
        number_format = "de-DE"

        [reporting]
        level = "off"
        "#,
    )
    .unwrap();
    let dispatcher = Dispatcher::from_config(&config);
    let view = shared(ContourView::default());
    let mut view = view.lock();

    assert!(dispatcher.set_property(&mut *view, "interval", "2,5", false));
    assert_eq!(view.interval, 2.5);
    assert!(dispatcher.set_property(&mut *view, "lineColor", "no such color", false));
    assert_eq!(view.line_color, Color::BLACK);
}

#[test]
fn test_independent_bindings_on_threads() {
    let (dispatcher, sink) = dispatcher();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                let view = shared(ContourView::default());
                let select = dispatcher
                    .bind(&view, "select", Some(Value::Int(i)))
                    .unwrap();
                for _ in 0..25 {
                    select.invoke().unwrap();
                }
                let history = view.lock().history.clone();
                history
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let history = handle.join().unwrap();
        assert_eq!(history.len(), 25);
        assert!(history.iter().all(|h| *h == format!("select {i}")));
    }
    assert!(sink.is_empty());
    assert_eq!(dispatcher.cache().stats().entries, 1);
}
