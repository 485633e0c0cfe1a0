//! Conversion of loosely typed values into declared parameter kinds.
//!
//! The [`Coercer`] applies a fixed precedence:
//!
//! 1. A value whose kind is assignable to the target passes through
//!    unchanged (numeric kinds may widen losslessly).
//! 2. Integers converting to `float` or `double` must be exactly
//!    representable there. A `double` narrowed to `float` rounds to the
//!    nearest `float` and fails if it is out of range.
//! 3. Otherwise the value's textual form is converted by the rule for the
//!    target kind: integers, locale-aware floats, booleans, strings, colors,
//!    geometry tuples, and domain types with a `FromStr` parser.
//!
//! Float text that overflows to infinity is rejected unless it spells out
//! `inf` or `infinity`.
//!
//! Target kinds without a rule fail with [`CoercionError::Unsupported`];
//! coercion never produces an absent value.
//!
//! # Example
//!
//! ```
//! use horizon_wire_core::{Coercer, Rect, Value, ValueKind};
//!
//! let coercer = Coercer::default();
//! let rect = coercer.coerce(Value::from("1,2,3,4"), &ValueKind::Rect).unwrap();
//! assert_eq!(rect, Value::Rect(Rect::new(1.0, 2.0, 3.0, 4.0)));
//!
//! assert!(coercer.coerce(Value::from("1,2,3"), &ValueKind::Rect).is_err());
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::geometry::Color;
use crate::logging::targets;
use crate::value::{FromValue, Value, ValueKind};

/// Failure to convert a value into a declared parameter kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    /// The text does not follow the target's format.
    #[error("cannot convert '{text}' to {target}: {reason}")]
    Parse {
        target: &'static str,
        text: String,
        reason: String,
    },
    /// A delimited tuple has the wrong number of components.
    #[error("'{text}' has {found} component(s) but {target} needs {expected}")]
    Arity {
        target: &'static str,
        expected: usize,
        found: usize,
        text: String,
    },
    /// There is no rule converting `from` into `to`.
    #[error("no conversion from {from} to {to}")]
    Unsupported { from: &'static str, to: &'static str },
    /// Strict extraction found a value of another kind.
    #[error("expected a {expected} value but found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl CoercionError {
    pub(crate) fn parse(target: &'static str, text: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            target,
            text: text.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Decimal separator convention used when parsing floating-point text.
///
/// A `.` is accepted under every convention. Deserializes from `"c"`,
/// `"system"`, or a locale tag such as `"de-DE"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct NumberFormat {
    decimal_separator: char,
}

impl NumberFormat {
    /// The locale-independent format: `.` only.
    pub const C: Self = Self {
        decimal_separator: '.',
    };

    /// A format with an explicit decimal separator.
    pub const fn with_separator(decimal_separator: char) -> Self {
        Self { decimal_separator }
    }

    /// The format conventionally used by a BCP 47 / POSIX locale tag.
    pub fn for_locale(locale: &str) -> Self {
        let lang = locale
            .split(['-', '_', '.'])
            .next()
            .unwrap_or("en")
            .to_lowercase();

        let comma_decimal = matches!(
            lang.as_str(),
            "de" | "fr" | "es" | "it" | "pt" | "nl" | "da" | "fi" | "nb" | "nn" | "sv"
                | "pl" | "cs" | "sk" | "hu" | "ro" | "bg" | "hr" | "sl" | "sr" | "uk" | "ru"
                | "el" | "tr" | "vi" | "id" | "ca" | "gl" | "eu" | "et" | "lv" | "lt"
        );

        if comma_decimal {
            Self::with_separator(',')
        } else {
            Self::C
        }
    }

    /// The format of the current system locale, or [`NumberFormat::C`] when
    /// it cannot be detected.
    pub fn from_system_locale() -> Self {
        sys_locale::get_locale()
            .map(|locale| Self::for_locale(&locale))
            .unwrap_or(Self::C)
    }

    /// The locale's decimal separator.
    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    /// Parse floating-point text under this convention.
    pub fn parse<T>(&self, text: &str, target: &'static str) -> Result<T, CoercionError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let normalized = if self.decimal_separator != '.' && text.contains(self.decimal_separator) {
            Cow::Owned(text.replace(self.decimal_separator, "."))
        } else {
            Cow::Borrowed(text)
        };
        normalized
            .parse::<T>()
            .map_err(|err| CoercionError::parse(target, text, err.to_string()))
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::C
    }
}

impl From<String> for NumberFormat {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "c" | "posix" => Self::C,
            "system" => Self::from_system_locale(),
            locale => Self::for_locale(locale),
        }
    }
}

/// Configuration of the coercion rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoercionConfig {
    /// Color used when text names no recognizable color.
    pub color_fallback: Color,
    /// Decimal convention for float and double targets.
    pub number_format: NumberFormat,
    /// Trim surrounding whitespace before parsing non-string targets.
    pub trim: bool,
}

impl Default for CoercionConfig {
    fn default() -> Self {
        Self {
            color_fallback: Color::WHITE,
            number_format: NumberFormat::C,
            trim: true,
        }
    }
}

/// Applies the coercion rule table.
#[derive(Debug, Clone, Default)]
pub struct Coercer {
    config: CoercionConfig,
}

impl Coercer {
    /// Create a coercer with the given configuration.
    pub fn new(config: CoercionConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &CoercionConfig {
        &self.config
    }

    /// Convert `value` into `target`.
    pub fn coerce(&self, value: Value, target: &ValueKind) -> Result<Value, CoercionError> {
        let source = value.kind();
        if target.is_assignable_from(&source) {
            return Ok(widen(value, target));
        }
        if let Some(converted) = narrow_number(&value, target) {
            return converted;
        }

        let text = match value {
            Value::Str(text) => text,
            Value::Opaque(opaque) => {
                return Err(CoercionError::Unsupported {
                    from: opaque.type_name(),
                    to: target.name(),
                });
            }
            other => other.to_string(),
        };
        self.coerce_text(&text, target)
    }

    /// Convert `value` and extract it as `T`.
    pub fn coerce_to<T: FromValue>(&self, value: impl Into<Value>) -> Result<T, CoercionError> {
        self.coerce(value.into(), &T::kind()).and_then(T::from_value)
    }

    /// Convert text into `target` using the rule for that kind.
    pub fn coerce_text(&self, text: &str, target: &ValueKind) -> Result<Value, CoercionError> {
        let trimmed = if self.config.trim { text.trim() } else { text };

        match target {
            ValueKind::Any | ValueKind::Str => Ok(Value::Str(text.to_owned())),
            ValueKind::Bool => parse_bool(trimmed).map(Value::Bool),
            ValueKind::Int => parse_integer::<i32>(trimmed, "int").map(Value::Int),
            ValueKind::Long => parse_integer::<i64>(trimmed, "long").map(Value::Long),
            ValueKind::Float => self
                .parse_float(trimmed, "float", f32::is_infinite)
                .map(Value::Float),
            ValueKind::Double => self
                .parse_float(trimmed, "double", f64::is_infinite)
                .map(Value::Double),
            ValueKind::Color => Ok(Value::Color(self.color_or_fallback(trimmed))),
            ValueKind::Point => trimmed.parse().map(Value::Point),
            ValueKind::Size => trimmed.parse().map(Value::Size),
            ValueKind::Rect => trimmed.parse().map(Value::Rect),
            ValueKind::Range => trimmed.parse().map(Value::Range),
            ValueKind::Opaque(kind) => match kind.parser() {
                Some(parse) => parse(trimmed),
                None => Err(CoercionError::Unsupported {
                    from: ValueKind::Str.name(),
                    to: kind.type_name(),
                }),
            },
        }
    }

    fn parse_float<T>(
        &self,
        text: &str,
        target: &'static str,
        is_infinite: fn(T) -> bool,
    ) -> Result<T, CoercionError>
    where
        T: FromStr + Copy,
        T::Err: fmt::Display,
    {
        let value = self.config.number_format.parse::<T>(text, target)?;
        if is_infinite(value) && !names_infinity(text) {
            return Err(CoercionError::parse(target, text, format!("out of range for {target}")));
        }
        Ok(value)
    }

    fn color_or_fallback(&self, text: &str) -> Color {
        decode_color(text).unwrap_or_else(|| {
            tracing::debug!(
                target: targets::COERCE,
                text,
                fallback = %self.config.color_fallback,
                "unrecognized color, using fallback"
            );
            self.config.color_fallback
        })
    }
}

fn widen(value: Value, target: &ValueKind) -> Value {
    match (value, target) {
        (Value::Int(v), ValueKind::Long) => Value::Long(i64::from(v)),
        (Value::Int(v), ValueKind::Double) => Value::Double(f64::from(v)),
        (Value::Float(v), ValueKind::Double) => Value::Double(f64::from(v)),
        (value, _) => value,
    }
}

/// Numeric conversions that are checked on the typed value instead of its
/// text. `None` leaves the value to the text rules.
fn narrow_number(value: &Value, target: &ValueKind) -> Option<Result<Value, CoercionError>> {
    let converted = match (value, target) {
        (Value::Int(v), ValueKind::Float) => exact_float(i64::from(*v)),
        (Value::Long(v), ValueKind::Float) => exact_float(*v),
        (Value::Long(v), ValueKind::Double) => exact_double(*v),
        (Value::Double(v), ValueKind::Float) => {
            let narrowed = *v as f32;
            if narrowed.is_infinite() && v.is_finite() {
                Err(CoercionError::parse("float", &v.to_string(), "out of range for float"))
            } else {
                Ok(Value::Float(narrowed))
            }
        }
        _ => return None,
    };
    Some(converted)
}

fn exact_float(v: i64) -> Result<Value, CoercionError> {
    let converted = v as f32;
    if converted as i128 == i128::from(v) {
        Ok(Value::Float(converted))
    } else {
        Err(inexact(v, "float"))
    }
}

fn exact_double(v: i64) -> Result<Value, CoercionError> {
    let converted = v as f64;
    if converted as i128 == i128::from(v) {
        Ok(Value::Double(converted))
    } else {
        Err(inexact(v, "double"))
    }
}

fn inexact(v: i64, target: &'static str) -> CoercionError {
    CoercionError::parse(target, &v.to_string(), format!("not exactly representable as {target}"))
}

fn names_infinity(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

fn parse_bool(text: &str) -> Result<bool, CoercionError> {
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(CoercionError::parse("bool", text, "expected 'true' or 'false'"))
    }
}

fn parse_integer<T>(text: &str, target: &'static str) -> Result<T, CoercionError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.parse::<T>()
        .map_err(|err| CoercionError::parse(target, text, err.to_string()))
}

/// Split `text` on the first of `separators` it contains and parse exactly
/// `N` components.
pub(crate) fn parse_tuple<T, const N: usize>(
    text: &str,
    separators: &[char],
    target: &'static str,
) -> Result<[T; N], CoercionError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let text = text.trim();
    let parts: Vec<&str> = match separators.iter().copied().find(|sep| text.contains(*sep)) {
        Some(sep) => text.split(sep).map(str::trim).collect(),
        None => vec![text],
    };

    let arity = |found| CoercionError::Arity {
        target,
        expected: N,
        found,
        text: text.to_owned(),
    };
    if parts.len() != N {
        return Err(arity(parts.len()));
    }

    let values = parts
        .iter()
        .map(|part| {
            part.parse::<T>()
                .map_err(|err| CoercionError::parse(target, part, err.to_string()))
        })
        .collect::<Result<Vec<T>, _>>()?;
    values.try_into().map_err(|values: Vec<T>| arity(values.len()))
}

/// Decode an integer literal: optional sign, then decimal, `0x`/`#`
/// hexadecimal, or leading-zero octal digits.
pub fn decode_int(text: &str) -> Option<i64> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (radix, digits) = if let Some(hex) = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .or_else(|| rest.strip_prefix('#'))
    {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };

    if digits.is_empty() || digits.starts_with(['-', '+']) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Decode a color from an `R,G,B[,A]` or `R G B[ A]` tuple, a packed
/// `0xRRGGBB` integer, or a color name.
///
/// Returns `None` when the text matches none of these forms.
pub fn decode_color(text: &str) -> Option<Color> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parts: Vec<&str> = if text.contains(',') {
        text.split(',').map(str::trim).collect()
    } else {
        text.split_whitespace().collect()
    };
    if matches!(parts.len(), 3 | 4) {
        let channels: Option<Vec<u8>> = parts.iter().map(|part| channel(part)).collect();
        if let Some(channels) = channels {
            let alpha = channels.get(3).copied().unwrap_or(255);
            return Some(Color::from_rgba(channels[0], channels[1], channels[2], alpha));
        }
    }

    if let Some(packed) = decode_int(text).and_then(|v| i32::try_from(v).ok()) {
        return Some(Color::from_packed(packed as u32));
    }

    Color::named(&text.to_lowercase())
}

fn channel(part: &str) -> Option<u8> {
    decode_int(part).and_then(|v| u8::try_from(v).ok())
}
