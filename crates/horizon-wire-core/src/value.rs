//! The closed value model shared by coercion and dispatch.
//!
//! Every argument that crosses a binding boundary is a [`Value`], and every
//! declared parameter is described by a [`ValueKind`]. The set of kinds is
//! fixed; arbitrary domain objects travel as [`Value::Opaque`] and are
//! identified by their `TypeId`.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use crate::coerce::CoercionError;
use crate::geometry::{Color, Point, Range, Rect, Size};
use crate::meta::TargetError;

/// Parser building an opaque value from its textual form.
pub type ParseFn = fn(&str) -> Result<Value, CoercionError>;

/// Identity of an opaque (domain) parameter type.
///
/// Two kinds are equal when they name the same Rust type; the optional
/// parser does not take part in comparisons.
#[derive(Clone, Copy)]
pub struct OpaqueKind {
    type_id: TypeId,
    type_name: &'static str,
    parse: Option<ParseFn>,
}

impl OpaqueKind {
    /// An opaque kind that can only be satisfied by a value of type `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            parse: None,
        }
    }

    /// An opaque kind that can also be built from text through `T::from_str`.
    pub fn parsed<T>() -> Self
    where
        T: FromStr + Any + Send + Sync,
        T::Err: fmt::Display,
    {
        Self {
            parse: Some(parse_domain::<T>),
            ..Self::of::<T>()
        }
    }

    /// The `TypeId` of the described type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The Rust type name of the described type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The text parser, when the type has one.
    pub fn parser(&self) -> Option<ParseFn> {
        self.parse
    }
}

impl PartialEq for OpaqueKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for OpaqueKind {}

impl Hash for OpaqueKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for OpaqueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueKind")
            .field("type_name", &self.type_name)
            .field("parsed", &self.parse.is_some())
            .finish()
    }
}

/// Parse `text` as a `T` and wrap it as an opaque value.
pub(crate) fn parse_domain<T>(text: &str) -> Result<Value, CoercionError>
where
    T: FromStr + Any + Send + Sync,
    T::Err: fmt::Display,
{
    text.parse::<T>()
        .map(|value| Value::Opaque(OpaqueValue::new(Arc::new(value))))
        .map_err(|err| CoercionError::parse(std::any::type_name::<T>(), text, err.to_string()))
}

/// The declared type of a method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Accepts every value unchanged.
    Any,
    Bool,
    Int,
    Long,
    Float,
    Double,
    Str,
    Color,
    Point,
    Size,
    Rect,
    Range,
    Opaque(OpaqueKind),
}

impl ValueKind {
    /// A short, human-readable name used in signatures and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Str => "string",
            Self::Color => "color",
            Self::Point => "point",
            Self::Size => "size",
            Self::Rect => "rect",
            Self::Range => "range",
            Self::Opaque(kind) => kind.type_name(),
        }
    }

    /// Whether a value of kind `source` can be passed where `self` is declared
    /// without going through text.
    ///
    /// Besides identity and `Any`, only lossless numeric widening is allowed.
    pub fn is_assignable_from(&self, source: &ValueKind) -> bool {
        if self == source {
            return true;
        }
        matches!(
            (self, source),
            (Self::Any, _)
                | (Self::Long, Self::Int)
                | (Self::Double, Self::Int)
                | (Self::Double, Self::Float)
        )
    }

    /// Whether the kind is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Long | Self::Float | Self::Double)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A shared, type-erased domain object.
#[derive(Clone)]
pub struct OpaqueValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl OpaqueValue {
    /// Wrap a shared value.
    pub fn new<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the wrapped value.
    pub fn type_id(&self) -> TypeId {
        let any: &dyn Any = &*self.value;
        any.type_id()
    }

    /// The Rust type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let any: &dyn Any = &*self.value;
        any.downcast_ref::<T>()
    }

    /// Get a new handle to the wrapped value as `Arc<T>`.
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    fn kind(&self) -> OpaqueKind {
        OpaqueKind {
            type_id: self.type_id(),
            type_name: self.type_name,
            parse: None,
        }
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueValue<{}>", self.type_name)
    }
}

/// A dynamically typed argument or return value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Color(Color),
    Point(Point),
    Size(Size),
    Rect(Rect),
    Range(Range),
    Opaque(OpaqueValue),
}

impl Value {
    /// The runtime kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::Str(_) => ValueKind::Str,
            Self::Color(_) => ValueKind::Color,
            Self::Point(_) => ValueKind::Point,
            Self::Size(_) => ValueKind::Size,
            Self::Rect(_) => ValueKind::Rect,
            Self::Range(_) => ValueKind::Range,
            Self::Opaque(value) => ValueKind::Opaque(value.kind()),
        }
    }

    /// Wrap a shared domain object.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(OpaqueValue::new(Arc::new(value)))
    }

    /// Borrow the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Extract a typed value, requiring the exact kind.
    pub fn get<T: FromValue>(self) -> Result<T, CoercionError> {
        T::from_value(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
            Self::Color(v) => write!(f, "{v}"),
            Self::Point(v) => write!(f, "{v}"),
            Self::Size(v) => write!(f, "{v}"),
            Self::Rect(v) => write!(f, "{v}"),
            Self::Range(v) => write!(f, "{v}"),
            Self::Opaque(v) => write!(f, "<{}>", v.type_name()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

/// Typed extraction of a parameter from a [`Value`].
///
/// Extraction is strict: the value must already be of [`FromValue::kind`].
/// Conversion from other kinds is the coercer's job.
pub trait FromValue: Sized {
    /// The parameter kind this type declares.
    fn kind() -> ValueKind;

    /// Take the value apart.
    fn from_value(value: Value) -> Result<Self, CoercionError>;
}

/// Conversion of a method's return into a dispatch result.
pub trait IntoSlotReturn {
    fn into_slot_return(self) -> Result<Option<Value>, TargetError>;
}

impl FromValue for Value {
    fn kind() -> ValueKind {
        ValueKind::Any
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        Ok(value)
    }
}

impl IntoSlotReturn for Value {
    fn into_slot_return(self) -> Result<Option<Value>, TargetError> {
        Ok(Some(self))
    }
}

impl IntoSlotReturn for () {
    fn into_slot_return(self) -> Result<Option<Value>, TargetError> {
        Ok(None)
    }
}

impl<T: IntoSlotReturn> IntoSlotReturn for Option<T> {
    fn into_slot_return(self) -> Result<Option<Value>, TargetError> {
        match self {
            Some(value) => value.into_slot_return(),
            None => Ok(None),
        }
    }
}

impl<T, E> IntoSlotReturn for Result<T, E>
where
    T: IntoSlotReturn,
    E: fmt::Display,
{
    fn into_slot_return(self) -> Result<Option<Value>, TargetError> {
        match self {
            Ok(value) => value.into_slot_return(),
            Err(err) => Err(TargetError::Raised(err.to_string())),
        }
    }
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl FromValue for $ty {
                fn kind() -> ValueKind {
                    ValueKind::$variant
                }

                fn from_value(value: Value) -> Result<Self, CoercionError> {
                    match value {
                        Value::$variant(inner) => Ok(inner),
                        other => Err(CoercionError::Mismatch {
                            expected: ValueKind::$variant.name(),
                            found: other.kind().name(),
                        }),
                    }
                }
            }

            impl IntoSlotReturn for $ty {
                fn into_slot_return(self) -> Result<Option<Value>, TargetError> {
                    Ok(Some(Value::$variant(self)))
                }
            }
        )*
    };
}

impl_value_conversions! {
    bool => Bool,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => Str,
    Color => Color,
    Point => Point,
    Size => Size,
    Rect => Rect,
    Range => Range,
}

/// A parameter holding a shared domain object of type `T`.
///
/// The argument must be supplied as an opaque `T`; it cannot be built from text.
#[derive(Debug)]
pub struct Opaque<T>(pub Arc<T>);

impl<T> Clone for Opaque<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Opaque<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Any + Send + Sync> From<Opaque<T>> for Value {
    fn from(value: Opaque<T>) -> Self {
        Value::Opaque(OpaqueValue::new(value.0))
    }
}

impl<T: Any + Send + Sync> FromValue for Opaque<T> {
    fn kind() -> ValueKind {
        ValueKind::Opaque(OpaqueKind::of::<T>())
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        downcast_opaque::<T>(value).map(Opaque)
    }
}

impl<T: Any + Send + Sync> IntoSlotReturn for Opaque<T> {
    fn into_slot_return(self) -> Result<Option<Value>, TargetError> {
        Ok(Some(self.into()))
    }
}

/// A parameter holding a domain value type built through its `FromStr`.
///
/// Text arguments are parsed with `T::from_str`; an opaque `T` passes through.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain<T>(pub T);

impl<T> Deref for Domain<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> Domain<T> {
    /// Unwrap the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Any + Send + Sync> From<Domain<T>> for Value {
    fn from(value: Domain<T>) -> Self {
        Value::opaque(value.0)
    }
}

impl<T> FromValue for Domain<T>
where
    T: FromStr + Clone + Any + Send + Sync,
    T::Err: fmt::Display,
{
    fn kind() -> ValueKind {
        ValueKind::Opaque(OpaqueKind::parsed::<T>())
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        let shared = downcast_opaque::<T>(value)?;
        Ok(Domain(Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone())))
    }
}

impl<T: Any + Send + Sync> IntoSlotReturn for Domain<T> {
    fn into_slot_return(self) -> Result<Option<Value>, TargetError> {
        Ok(Some(self.into()))
    }
}

fn downcast_opaque<T: Any + Send + Sync>(value: Value) -> Result<Arc<T>, CoercionError> {
    let found = value.kind().name();
    let shared = match value {
        Value::Opaque(opaque) => opaque.downcast_arc::<T>(),
        _ => None,
    };
    shared.ok_or(CoercionError::Mismatch {
        expected: std::any::type_name::<T>(),
        found,
    })
}
