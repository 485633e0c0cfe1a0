//! Method tables and name-based method resolution.
//!
//! A [`MetaObject`] lists the dispatchable methods of one type. Tables are
//! normally generated by the `#[slots]` attribute from `horizon-wire-macros`,
//! but can also be assembled by hand with [`MetaObject::builder`]:
//!
//! ```
//! use std::sync::LazyLock;
//! use horizon_wire_core::{MetaObject, Object, ParamQuery, ValueKind};
//!
//! #[derive(Default)]
//! struct Gauge {
//!     level: i32,
//! }
//!
//! impl Object for Gauge {
//!     fn meta_object(&self) -> &'static MetaObject {
//!         Self::static_meta_object()
//!     }
//!
//!     fn static_meta_object() -> &'static MetaObject {
//!         static META: LazyLock<MetaObject> = LazyLock::new(|| {
//!             MetaObject::builder::<Gauge>("Gauge")
//!                 .slot1("set_level", |g: &mut Gauge, level: i32| g.level = level)
//!                 .slot0("level", |g: &mut Gauge| g.level)
//!                 .build()
//!         });
//!         &META
//!     }
//! }
//!
//! let meta = Gauge::static_meta_object();
//! let setter = meta.resolve("set_level", &ParamQuery::Any).unwrap();
//! assert_eq!(setter.params, [ValueKind::Int]);
//! ```

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

use thiserror::Error;

use crate::coerce::CoercionError;
use crate::logging::targets;
use crate::object::{object_cast_mut, Object};
use crate::value::{FromValue, IntoSlotReturn, Value, ValueKind};

/// Failure raised on the target side of a call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TargetError {
    /// The method was called on an object of another type.
    #[error("method of {expected} called on {found}")]
    WrongTarget {
        expected: &'static str,
        found: &'static str,
    },
    /// The number of arguments does not match the parameter list.
    #[error("expected {expected} argument(s), got {found}")]
    ArgumentCount { expected: usize, found: usize },
    /// An argument is not of the declared kind.
    #[error("bad argument: {0}")]
    Argument(#[from] CoercionError),
    /// The method itself reported a failure.
    #[error("{0}")]
    Raised(String),
}

/// Type-erased entry point of a registered method.
pub type MethodFn = Box<
    dyn Fn(&mut dyn Object, Vec<Value>) -> Result<Option<Value>, TargetError> + Send + Sync,
>;

/// Declaring type, name and parameter kinds of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub declaring_type: &'static str,
    pub name: &'static str,
    pub params: Vec<ValueKind>,
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.declaring_type, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(param.name())?;
        }
        f.write_str(")")
    }
}

/// One dispatchable method of a type.
pub struct MethodMeta {
    /// Method name.
    pub name: &'static str,
    /// Name of the type that declares the method.
    pub declaring_type: &'static str,
    /// Declared parameter kinds, in order.
    pub params: Vec<ValueKind>,
    invoker: MethodFn,
}

impl MethodMeta {
    /// The signature of this method.
    pub fn signature(&self) -> MethodSignature {
        MethodSignature {
            declaring_type: self.declaring_type,
            name: self.name,
            params: self.params.clone(),
        }
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Call the method on `target` with already-coerced arguments.
    pub fn invoke(
        &self,
        target: &mut dyn Object,
        args: Vec<Value>,
    ) -> Result<Option<Value>, TargetError> {
        if args.len() != self.params.len() {
            return Err(TargetError::ArgumentCount {
                expected: self.params.len(),
                found: args.len(),
            });
        }
        (self.invoker)(target, args)
    }
}

impl fmt::Debug for MethodMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMeta")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// The parameter shape a caller asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamQuery {
    /// Match on name only.
    Any,
    /// Match methods with exactly this many parameters where each known kind
    /// is assignable to the declared one. `None` matches any parameter.
    Exact(Vec<Option<ValueKind>>),
}

impl ParamQuery {
    /// A zero-parameter query.
    pub fn none() -> Self {
        Self::Exact(Vec::new())
    }

    /// A query for `arity` parameters of unknown kind.
    pub fn unknown(arity: usize) -> Self {
        Self::Exact(vec![None; arity])
    }

    /// A query with every parameter kind known.
    pub fn of(kinds: impl IntoIterator<Item = ValueKind>) -> Self {
        Self::Exact(kinds.into_iter().map(Some).collect())
    }

    /// A query matching the runtime kinds of `args`.
    pub fn for_args(args: &[Value]) -> Self {
        Self::of(args.iter().map(Value::kind))
    }

    /// Whether a method with the given parameters satisfies the query.
    pub fn matches(&self, params: &[ValueKind]) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(query) => {
                query.len() == params.len()
                    && query.iter().zip(params).all(|(actual, declared)| {
                        actual
                            .as_ref()
                            .is_none_or(|actual| declared.is_assignable_from(actual))
                    })
            }
        }
    }
}

impl fmt::Display for ParamQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("(..)"),
            Self::Exact(kinds) => {
                f.write_str("(")?;
                for (i, kind) in kinds.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(kind.as_ref().map_or("?", ValueKind::name))?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Failure to find a unique method.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("no method {type_name}::{method}{query}")]
    MethodNotFound {
        type_name: &'static str,
        method: String,
        query: ParamQuery,
    },
    #[error(
        "ambiguous method {type_name}::{method}{query}, candidates: {}",
        join_signatures(.candidates)
    )]
    AmbiguousMethod {
        type_name: &'static str,
        method: String,
        query: ParamQuery,
        candidates: Vec<MethodSignature>,
    },
}

fn join_signatures(candidates: &[MethodSignature]) -> String {
    candidates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The method table of one type.
pub struct MetaObject {
    /// `TypeId` of the described type.
    pub type_id: TypeId,
    /// Display name of the described type.
    pub type_name: &'static str,
    methods: Vec<MethodMeta>,
}

impl MetaObject {
    /// Start building the table for `T`.
    pub fn builder<T: Object>(type_name: &'static str) -> MetaObjectBuilder<T> {
        MetaObjectBuilder {
            type_name,
            methods: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// All registered methods, in registration order.
    pub fn methods(&self) -> &[MethodMeta] {
        &self.methods
    }

    /// All methods registered under `name`.
    pub fn methods_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a MethodMeta> + use<'a, 'n> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    /// Distinct method names, in registration order.
    pub fn method_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for method in &self.methods {
            if !names.contains(&method.name) {
                names.push(method.name);
            }
        }
        names
    }

    /// Whether any method is registered under `name`.
    pub fn has_method(&self, name: &str) -> bool {
        self.methods_named(name).next().is_some()
    }

    /// Find the unique method named `name` whose parameters satisfy `query`.
    ///
    /// Several matches are an error; resolution never picks one of them.
    pub fn resolve(&self, name: &str, query: &ParamQuery) -> Result<&MethodMeta, ResolveError> {
        let mut matches = self
            .methods_named(name)
            .filter(|method| query.matches(&method.params));

        let Some(first) = matches.next() else {
            tracing::trace!(target: targets::RESOLVE, type_name = self.type_name, name, %query, "no match");
            return Err(ResolveError::MethodNotFound {
                type_name: self.type_name,
                method: name.to_owned(),
                query: query.clone(),
            });
        };

        let rest: Vec<&MethodMeta> = matches.collect();
        if rest.is_empty() {
            tracing::trace!(target: targets::RESOLVE, signature = %first.signature(), "resolved");
            return Ok(first);
        }

        Err(ResolveError::AmbiguousMethod {
            type_name: self.type_name,
            method: name.to_owned(),
            query: query.clone(),
            candidates: std::iter::once(first)
                .chain(rest)
                .map(MethodMeta::signature)
                .collect(),
        })
    }
}

impl fmt::Debug for MetaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaObject")
            .field("type_name", &self.type_name)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Incremental construction of a [`MetaObject`].
pub struct MetaObjectBuilder<T> {
    type_name: &'static str,
    methods: Vec<MethodMeta>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Object> MetaObjectBuilder<T> {
    /// Register a method taking no arguments.
    pub fn slot0<R, F>(self, name: &'static str, f: F) -> Self
    where
        R: IntoSlotReturn,
        F: Fn(&mut T) -> R + Send + Sync + 'static,
    {
        let expected = self.type_name;
        self.slot_raw(name, Vec::new(), move |target, args| {
            let this = downcast::<T>(target, expected)?;
            let [] = take_args::<0>(args)?;
            f(this).into_slot_return()
        })
    }

    /// Register a method taking one argument.
    pub fn slot1<A, R, F>(self, name: &'static str, f: F) -> Self
    where
        A: FromValue,
        R: IntoSlotReturn,
        F: Fn(&mut T, A) -> R + Send + Sync + 'static,
    {
        let expected = self.type_name;
        self.slot_raw(name, vec![A::kind()], move |target, args| {
            let this = downcast::<T>(target, expected)?;
            let [a0] = take_args::<1>(args)?;
            f(this, A::from_value(a0)?).into_slot_return()
        })
    }

    /// Register a method taking two arguments.
    pub fn slot2<A, B, R, F>(self, name: &'static str, f: F) -> Self
    where
        A: FromValue,
        B: FromValue,
        R: IntoSlotReturn,
        F: Fn(&mut T, A, B) -> R + Send + Sync + 'static,
    {
        let expected = self.type_name;
        self.slot_raw(name, vec![A::kind(), B::kind()], move |target, args| {
            let this = downcast::<T>(target, expected)?;
            let [a0, a1] = take_args::<2>(args)?;
            f(this, A::from_value(a0)?, B::from_value(a1)?).into_slot_return()
        })
    }

    /// Register a method with an explicit parameter list and untyped body.
    pub fn slot_raw<F>(mut self, name: &'static str, params: Vec<ValueKind>, f: F) -> Self
    where
        F: Fn(&mut dyn Object, Vec<Value>) -> Result<Option<Value>, TargetError>
            + Send
            + Sync
            + 'static,
    {
        self.methods.push(MethodMeta {
            name,
            declaring_type: self.type_name,
            params,
            invoker: Box::new(f),
        });
        self
    }

    /// Finish the table.
    ///
    /// Two registrations with the same name and parameter list can never be
    /// told apart by resolution; they are kept but logged as a warning.
    pub fn build(self) -> MetaObject {
        for (i, method) in self.methods.iter().enumerate() {
            let duplicate = self.methods[..i]
                .iter()
                .any(|earlier| earlier.name == method.name && earlier.params == method.params);
            if duplicate {
                crate::wire_warn!(
                    signature = %method.signature(),
                    "duplicate method registration, calls by this signature are ambiguous"
                );
            }
        }
        crate::wire_trace!(
            type_name = self.type_name,
            methods = self.methods.len(),
            "method table built"
        );
        MetaObject {
            type_id: TypeId::of::<T>(),
            type_name: self.type_name,
            methods: self.methods,
        }
    }
}

fn downcast<'a, T: Object>(
    target: &'a mut dyn Object,
    expected: &'static str,
) -> Result<&'a mut T, TargetError> {
    let found = target.meta_object().type_name;
    object_cast_mut::<T>(target).ok_or(TargetError::WrongTarget { expected, found })
}

fn take_args<const N: usize>(args: Vec<Value>) -> Result<[Value; N], TargetError> {
    args.try_into().map_err(|args: Vec<Value>| TargetError::ArgumentCount {
        expected: N,
        found: args.len(),
    })
}
