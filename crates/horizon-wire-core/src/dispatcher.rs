//! The dispatch facade.
//!
//! A [`Dispatcher`] bundles the coercion rules, a resolution cache and a
//! report sink, and offers the binding and property operations on top of
//! them. It holds no global state; clones share the same cache and sink.
//!
//! ```ignore
//! let dispatcher = Dispatcher::new();
//! let zoom_in = dispatcher.bind(&view, "zoom", Some(Value::Double(2.0)))?;
//! button.clicked.connect_invoker(zoom_in);
//!
//! dispatcher.set_property(&mut *view.lock(), "background", "light gray", false);
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::cache::MethodCache;
use crate::coerce::{CoercionError, Coercer};
use crate::config::WireConfig;
use crate::error::WireError;
use crate::invoker::{invoke_guarded, BoundInvoker, EventInvoker};
use crate::logging::{span_names, targets};
use crate::meta::{MetaObject, MethodMeta, ParamQuery, ResolveError};
use crate::object::{Object, Shared};
use crate::property::{getter_names, setter_name, PropertySheet, SheetFailure, SheetReport};
use crate::report::{ReportSink, TracingSink};
use crate::value::{Value, ValueKind};

/// Entry point for binding, invocation and property access.
#[derive(Clone)]
pub struct Dispatcher {
    coercer: Arc<Coercer>,
    cache: Arc<MethodCache>,
    sink: Arc<dyn ReportSink>,
}

impl Dispatcher {
    /// A dispatcher with default coercion rules that reports through `tracing`.
    pub fn new() -> Self {
        Self {
            coercer: Arc::new(Coercer::default()),
            cache: Arc::new(MethodCache::new()),
            sink: Arc::new(TracingSink::default()),
        }
    }

    /// A dispatcher configured from a [`WireConfig`].
    pub fn from_config(config: &WireConfig) -> Self {
        Self {
            coercer: Arc::new(Coercer::new(config.coercion.clone())),
            cache: Arc::new(MethodCache::new()),
            sink: Arc::new(TracingSink::new(config.reporting.level)),
        }
    }

    /// Replace the report sink.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Share an existing resolution cache.
    pub fn with_cache(mut self, cache: Arc<MethodCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn coercer(&self) -> &Arc<Coercer> {
        &self.coercer
    }

    pub fn cache(&self) -> &Arc<MethodCache> {
        &self.cache
    }

    pub fn sink(&self) -> &Arc<dyn ReportSink> {
        &self.sink
    }

    /// Resolve a method through the cache.
    pub fn resolve(
        &self,
        meta: &'static MetaObject,
        name: &str,
        query: &ParamQuery,
    ) -> Result<&'static MethodMeta, ResolveError> {
        self.cache.resolve(meta, name, query)
    }

    /// Bind `method` on `target` with an optional fixed argument.
    ///
    /// The method is resolved with a zero-parameter query, or a one-parameter
    /// query of the argument's kind, and the argument is converted to the
    /// declared parameter kind now. Failures are reported and returned; the
    /// binding is never created in a broken state.
    pub fn bind<T: Object>(
        &self,
        target: &Shared<T>,
        method: &str,
        argument: Option<Value>,
    ) -> Result<BoundInvoker, WireError> {
        let query = match &argument {
            Some(arg) => ParamQuery::of([arg.kind()]),
            None => ParamQuery::none(),
        };

        let prepared = self
            .resolve(T::static_meta_object(), method, &query)
            .map_err(WireError::from)
            .and_then(|resolved| {
                let args = self.coerce_args(resolved, argument.into_iter().collect())?;
                Ok((resolved, args.into_iter().next()))
            });

        match prepared {
            Ok((resolved, argument)) => {
                tracing::debug!(
                    target: targets::INVOKE,
                    signature = %resolved.signature(),
                    "bound invoker created"
                );
                Ok(BoundInvoker::new(
                    erase(target),
                    resolved,
                    argument,
                    Arc::clone(&self.sink),
                ))
            }
            Err(err) => {
                self.sink.report(&format!("binding '{method}'"), Some(&err));
                Err(err)
            }
        }
    }

    /// Bind `method` on `target` to receive the value carried by an event.
    ///
    /// With `event_kind` the method must take one parameter accepting that
    /// kind; without it, any one-parameter method named `method` matches.
    pub fn bind_event<T: Object>(
        &self,
        target: &Shared<T>,
        method: &str,
        event_kind: Option<ValueKind>,
    ) -> Result<EventInvoker, WireError> {
        self.bind_event_inner(target, method, event_kind, None)
    }

    /// Bind `method` to receive the event value followed by a fixed `argument`.
    ///
    /// The method takes two parameters: the first accepts the event value as
    /// in [`bind_event`](Self::bind_event), the second the kind of `argument`,
    /// which is converted now. A checkbox toggling one layer binds
    /// `set_layer_visible(bool, i32)` with the layer index as `argument`.
    pub fn bind_event_with<T: Object>(
        &self,
        target: &Shared<T>,
        method: &str,
        event_kind: Option<ValueKind>,
        argument: Value,
    ) -> Result<EventInvoker, WireError> {
        self.bind_event_inner(target, method, event_kind, Some(argument))
    }

    fn bind_event_inner<T: Object>(
        &self,
        target: &Shared<T>,
        method: &str,
        event_kind: Option<ValueKind>,
        trailing: Option<Value>,
    ) -> Result<EventInvoker, WireError> {
        let mut kinds = vec![event_kind];
        kinds.extend(trailing.as_ref().map(|arg| Some(arg.kind())));
        let query = ParamQuery::Exact(kinds);

        let prepared = self
            .resolve(T::static_meta_object(), method, &query)
            .map_err(WireError::from)
            .and_then(|resolved| match (resolved.params.as_slice(), trailing) {
                ([param], None) => Ok((resolved, param.clone(), None)),
                ([param, kind], Some(arg)) => {
                    let arg = self.coercer.coerce(arg, kind)?;
                    Ok((resolved, param.clone(), Some(arg)))
                }
                _ => unreachable!("the query fixes the parameter count"),
            });

        match prepared {
            Ok((resolved, param, trailing)) => Ok(EventInvoker::new(
                erase(target),
                resolved,
                param,
                trailing,
                Arc::clone(&self.coercer),
                Arc::clone(&self.sink),
            )),
            Err(err) => {
                self.sink
                    .report(&format!("binding event handler '{method}'"), Some(&err));
                Err(err)
            }
        }
    }

    /// Set `property` on `target` from an external value.
    ///
    /// Resolves `set_<property>` with one parameter of any kind, converts
    /// `value` to the declared kind and calls the setter.
    pub fn try_set_property(
        &self,
        target: &mut dyn Object,
        property: &str,
        value: impl Into<Value>,
    ) -> Result<(), WireError> {
        let setter = self.resolve(target.meta_object(), &setter_name(property), &ParamQuery::unknown(1))?;
        let args = self.coerce_args(setter, vec![value.into()])?;
        invoke_guarded(setter, target, args)?;
        tracing::trace!(target: targets::PROPERTY, property, "property set");
        Ok(())
    }

    /// Set `property`, degrading every failure to `false`.
    ///
    /// Failures are reported unless `ignore_error` is set.
    pub fn set_property(
        &self,
        target: &mut dyn Object,
        property: &str,
        value: impl Into<Value>,
        ignore_error: bool,
    ) -> bool {
        match self.try_set_property(target, property, value) {
            Ok(()) => true,
            Err(err) => {
                if !ignore_error {
                    self.sink
                        .report(&format!("setting property '{property}'"), Some(&err));
                }
                false
            }
        }
    }

    /// Read `property` through its zero-parameter getter.
    ///
    /// Tries `<property>`, `get_<property>` and `is_<property>` in that order.
    /// Only a missing getter moves on to the next name; an ambiguous one is an
    /// error. Returns `None` for a getter without a return value.
    pub fn get_property(
        &self,
        target: &mut dyn Object,
        property: &str,
    ) -> Result<Option<Value>, WireError> {
        let meta = target.meta_object();
        let none = ParamQuery::none();
        let [plain, get, is] = getter_names(property);
        let missing = match self.resolve(meta, &plain, &none) {
            Ok(getter) => return Ok(invoke_guarded(getter, target, Vec::new())?),
            Err(err @ ResolveError::MethodNotFound { .. }) => err,
            Err(err) => return Err(err.into()),
        };
        for name in [get, is] {
            match self.resolve(meta, &name, &none) {
                Ok(getter) => return Ok(invoke_guarded(getter, target, Vec::new())?),
                Err(ResolveError::MethodNotFound { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(missing.into())
    }

    /// Apply every assignment of `sheet` to `target`, in order.
    ///
    /// A failing property does not stop the rest of the sheet.
    pub fn apply_sheet(
        &self,
        target: &mut dyn Object,
        sheet: &PropertySheet,
        ignore_errors: bool,
    ) -> SheetReport {
        let span = tracing::debug_span!(
            target: targets::PROPERTY,
            span_names::SHEET,
            type_name = target.meta_object().type_name,
            properties = sheet.len()
        );
        let _entered = span.enter();

        let mut report = SheetReport::default();
        for (property, text) in sheet.iter() {
            match self.try_set_property(target, property, text) {
                Ok(()) => report.applied += 1,
                Err(error) => {
                    if !ignore_errors {
                        self.sink
                            .report(&format!("applying property '{property}'"), Some(&error));
                    }
                    report.failed.push(SheetFailure {
                        property: property.to_owned(),
                        error,
                    });
                }
            }
        }
        crate::wire_debug!(
            applied = report.applied,
            failed = report.failed.len(),
            "property sheet applied"
        );
        report
    }

    fn coerce_args(
        &self,
        method: &MethodMeta,
        args: Vec<Value>,
    ) -> Result<Vec<Value>, CoercionError> {
        args.into_iter()
            .zip(&method.params)
            .map(|(arg, kind)| self.coercer.coerce(arg, kind))
            .collect()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn erase<T: Object>(target: &Shared<T>) -> Weak<Mutex<dyn Object>> {
    let erased: Arc<Mutex<dyn Object>> = Arc::clone(target) as Arc<Mutex<dyn Object>>;
    Arc::downgrade(&erased)
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;
    use crate::error::ErrorKind;
    use crate::geometry::{Color, Size};
    use crate::object::shared;
    use crate::report::CollectingSink;

    #[derive(Default)]
    struct Panel {
        value: i32,
        visible: bool,
        background: Color,
        size: Size,
        title: String,
    }

    impl Object for Panel {
        fn meta_object(&self) -> &'static MetaObject {
            Self::static_meta_object()
        }

        fn static_meta_object() -> &'static MetaObject {
            static META: LazyLock<MetaObject> = LazyLock::new(|| {
                MetaObject::builder::<Panel>("Panel")
                    .slot1("set_value", |p: &mut Panel, v: i32| p.value = v)
                    .slot0("value", |p: &mut Panel| p.value)
                    .slot1("set_visible", |p: &mut Panel, v: bool| p.visible = v)
                    .slot0("is_visible", |p: &mut Panel| p.visible)
                    .slot1("set_background", |p: &mut Panel, c: Color| p.background = c)
                    .slot1("set_preferred_size", |p: &mut Panel, s: Size| p.size = s)
                    .slot1("set_title", |p: &mut Panel, t: String| p.title = t)
                    .slot1("set_title", |p: &mut Panel, t: i32| p.title = format!("#{t}"))
                    .slot0("get_title", |p: &mut Panel| p.title.clone())
                    .slot1("set_limit", |_: &mut Panel, v: i32| -> Result<(), String> {
                        if v < 0 {
                            Err("limit must be positive".into())
                        } else {
                            Ok(())
                        }
                    })
                    .slot1("shift", |p: &mut Panel, by: i64| p.value += by as i32)
                    .build()
            });
            &META
        }
    }

    #[derive(Default)]
    struct Switch {
        on: bool,
        layers: [bool; 4],
    }

    impl Object for Switch {
        fn meta_object(&self) -> &'static MetaObject {
            Self::static_meta_object()
        }

        fn static_meta_object() -> &'static MetaObject {
            static META: LazyLock<MetaObject> = LazyLock::new(|| {
                MetaObject::builder::<Switch>("Switch")
                    .slot0("get_on", |s: &mut Switch| s.on)
                    .slot0("get_on", |s: &mut Switch| String::from(if s.on { "on" } else { "off" }))
                    .slot0("is_on", |s: &mut Switch| s.on)
                    .slot0("state", |s: &mut Switch| s.on)
                    .slot0("state", |s: &mut Switch| i32::from(s.on))
                    .slot2("set_layer_visible", |s: &mut Switch, visible: bool, layer: i32| {
                        s.layers[layer as usize] = visible;
                    })
                    .slot2("set_layer_visible", |s: &mut Switch, visible: bool, name: String| {
                        s.on = visible && !name.is_empty();
                    })
                    .build()
            });
            &META
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        (Dispatcher::new().with_sink(sink.clone()), sink)
    }

    #[test]
    fn test_set_property_from_text() {
        let (dispatcher, sink) = dispatcher();
        let mut panel = Panel::default();

        assert!(dispatcher.set_property(&mut panel, "value", "42", false));
        assert_eq!(panel.value, 42);
        assert!(dispatcher.set_property(&mut panel, "background", "pink", false));
        assert_eq!(panel.background, Color::PINK);
        assert!(dispatcher.set_property(&mut panel, "preferredSize", "200:100", false));
        assert_eq!(panel.size, Size::new(200, 100));
        assert!(dispatcher.set_property(&mut panel, "visible", "TRUE", false));
        assert!(panel.visible);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_missing_setter_with_ignore_error_is_silent() {
        let (dispatcher, sink) = dispatcher();
        let mut panel = Panel::default();

        assert!(!dispatcher.set_property(&mut panel, "opacity", "0.5", true));
        assert!(sink.is_empty());

        assert!(!dispatcher.set_property(&mut panel, "opacity", "0.5", false));
        let reports = sink.take();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, Some(ErrorKind::MethodNotFound));
        assert_eq!(reports[0].message, "setting property 'opacity'");
    }

    #[test]
    fn test_set_property_failures() {
        let (dispatcher, _sink) = dispatcher();
        let mut panel = Panel::default();

        let err = dispatcher
            .try_set_property(&mut panel, "value", "forty-two")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Coercion);
        assert_eq!(panel.value, 0);

        let err = dispatcher
            .try_set_property(&mut panel, "title", "x")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMethod);

        let err = dispatcher
            .try_set_property(&mut panel, "limit", -1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invocation);
        assert!(err.to_string().contains("limit must be positive"));
    }

    #[test]
    fn test_get_property_lookup_order() {
        let (dispatcher, _sink) = dispatcher();
        let mut panel = Panel {
            value: 9,
            visible: true,
            title: "Plot".into(),
            ..Default::default()
        };

        assert_eq!(dispatcher.get_property(&mut panel, "value").unwrap(), Some(Value::Int(9)));
        assert_eq!(
            dispatcher.get_property(&mut panel, "visible").unwrap(),
            Some(Value::Bool(true))
        );
        assert_eq!(
            dispatcher.get_property(&mut panel, "title").unwrap(),
            Some(Value::Str("Plot".into()))
        );
        let err = dispatcher.get_property(&mut panel, "opacity").unwrap_err();
        assert!(err.to_string().contains("Panel::opacity()"));
    }

    #[test]
    fn test_ambiguous_getter_is_not_skipped() {
        let (dispatcher, _sink) = dispatcher();
        let mut switch = Switch {
            on: true,
            ..Default::default()
        };

        // `get_on` is ambiguous even though `is_on` would match.
        let err = dispatcher.get_property(&mut switch, "on").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMethod);

        let err = dispatcher.get_property(&mut switch, "state").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMethod);
    }

    #[test]
    fn test_bind_event_with_fixed_argument() {
        let (dispatcher, sink) = dispatcher();
        let switch = shared(Switch::default());

        let layer_two = dispatcher
            .bind_event_with(&switch, "set_layer_visible", Some(ValueKind::Bool), Value::Int(2))
            .unwrap();
        assert_eq!(layer_two.argument(), Some(&Value::Int(2)));
        assert_eq!(layer_two.signature().to_string(), "Switch::set_layer_visible(bool, int)");

        layer_two.invoke_with(true).unwrap();
        assert_eq!(switch.lock().layers, [false, false, true, false]);
        layer_two.invoke_with("false").unwrap();
        assert_eq!(switch.lock().layers, [false; 4]);

        let err = dispatcher
            .bind_event_with(&switch, "set_layer_visible", None, Value::Long(2))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotFound);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_bind_fails_fast() {
        let (dispatcher, sink) = dispatcher();
        let panel = shared(Panel::default());

        let err = dispatcher.bind(&panel, "no_such_method", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotFound);
        assert_eq!(sink.len(), 1);

        // A string argument does not match an int parameter
        let err = dispatcher
            .bind(&panel, "set_value", Some(Value::from("3")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotFound);
    }

    #[test]
    fn test_bind_widens_fixed_argument() {
        let (dispatcher, _sink) = dispatcher();
        let panel = shared(Panel::default());

        let invoker = dispatcher.bind(&panel, "shift", Some(Value::Int(4))).unwrap();
        assert_eq!(invoker.argument(), Some(&Value::Long(4)));
        invoker.invoke().unwrap();
        invoker.invoke().unwrap();
        assert_eq!(panel.lock().value, 8);
    }

    #[test]
    fn test_bind_event() {
        let (dispatcher, sink) = dispatcher();
        let panel = shared(Panel::default());

        let on_change = dispatcher
            .bind_event(&panel, "set_value", Some(ValueKind::Int))
            .unwrap();
        on_change.invoke_with(17).unwrap();
        assert_eq!(panel.lock().value, 17);

        let err = dispatcher
            .bind_event(&panel, "set_title", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMethod);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_apply_sheet_continues_after_failures() {
        let (dispatcher, sink) = dispatcher();
        let mut panel = Panel::default();
        let sheet = PropertySheet::new()
            .with("value", "5")
            .with("opacity", "0.3")
            .with("background", "0,0,255")
            .with("preferredSize", "wide");

        let report = dispatcher.apply_sheet(&mut panel, &sheet, false);
        assert_eq!(report.applied, 2);
        assert_eq!(report.failed_properties(), ["opacity", "preferredSize"]);
        assert!(!report.is_complete());
        assert_eq!(panel.value, 5);
        assert_eq!(panel.background, Color::BLUE);
        assert_eq!(sink.len(), 2);

        let quiet = dispatcher.apply_sheet(&mut panel, &sheet, true);
        assert_eq!(quiet.failed.len(), 2);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_resolution_goes_through_shared_cache() {
        let (dispatcher, _sink) = dispatcher();
        let clone = dispatcher.clone();
        let mut panel = Panel::default();

        dispatcher.set_property(&mut panel, "value", "1", false);
        clone.set_property(&mut panel, "value", "2", false);
        let stats = dispatcher.cache().stats();
        assert_eq!((stats.misses, stats.hits), (1, 1));
    }
}
