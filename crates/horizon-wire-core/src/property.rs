//! Property naming and property sheets.
//!
//! A property `name` is written through the method `set_<name>` and read
//! through `<name>`, `get_<name>` or `is_<name>`, with the property name
//! converted to snake case first (`lineWidth` is set by `set_line_width`).
//!
//! A [`PropertySheet`] is an ordered list of property assignments in textual
//! form, typically loaded from TOML and applied with
//! [`Dispatcher::apply_sheet`](crate::Dispatcher::apply_sheet):
//!
//! ```toml
//! title = "Contours"
//! line_width = 2
//! background = "light gray"
//! bounds = [0, 0, 640, 480]
//! ```

use std::path::Path;

use crate::config::ConfigError;
use crate::error::WireError;

/// Convert a property name to snake case.
///
/// Acronyms stay together (`URLText` becomes `url_text`) and `-` or spaces
/// become `_`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
        } else if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// The setter method name for `property`.
pub fn setter_name(property: &str) -> String {
    format!("set_{}", to_snake_case(property))
}

/// Getter method names for `property`, in lookup order.
pub fn getter_names(property: &str) -> [String; 3] {
    let base = to_snake_case(property);
    [base.clone(), format!("get_{base}"), format!("is_{base}")]
}

/// An ordered list of textual property assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySheet {
    entries: Vec<(String, String)>,
}

impl PropertySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an assignment, replacing an earlier one for the same property.
    pub fn insert(&mut self, property: impl Into<String>, text: impl Into<String>) {
        let property = property.into();
        let text = text.into();
        match self.entries.iter_mut().find(|(name, _)| *name == property) {
            Some(entry) => entry.1 = text,
            None => self.entries.push((property, text)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, property: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(property, text);
        self
    }

    /// The text assigned to `property`.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, text)| text.as_str())
    }

    /// Assignments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a sheet from a flat TOML table.
    ///
    /// Scalars become their textual form and arrays are joined with `,`
    /// (`[1, 2, 3, 4]` becomes `"1,2,3,4"`). Nested tables are rejected.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(text)?;
        let mut sheet = Self::new();
        for (key, value) in table {
            let text = toml_text(&key, &value)?;
            sheet.insert(key, text);
        }
        Ok(sheet)
    }

    /// Read a sheet from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::io(path, err))?;
        Self::from_toml_str(&text)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertySheet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut sheet = Self::new();
        for (property, text) in iter {
            sheet.insert(property, text);
        }
        sheet
    }
}

fn toml_text(key: &str, value: &toml::Value) -> Result<String, ConfigError> {
    match value {
        toml::Value::String(text) => Ok(text.clone()),
        toml::Value::Integer(v) => Ok(v.to_string()),
        toml::Value::Float(v) => Ok(v.to_string()),
        toml::Value::Boolean(v) => Ok(v.to_string()),
        toml::Value::Datetime(v) => Ok(v.to_string()),
        toml::Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| match item {
                    toml::Value::Array(_) | toml::Value::Table(_) => {
                        Err(ConfigError::UnsupportedValue {
                            key: key.to_owned(),
                            found: "nested array",
                        })
                    }
                    scalar => toml_text(key, scalar),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(parts.join(","))
        }
        toml::Value::Table(_) => Err(ConfigError::UnsupportedValue {
            key: key.to_owned(),
            found: "table",
        }),
    }
}

/// One property that could not be applied.
#[derive(Debug)]
pub struct SheetFailure {
    pub property: String,
    pub error: WireError,
}

/// Outcome of applying a [`PropertySheet`].
#[derive(Debug, Default)]
pub struct SheetReport {
    /// Number of properties set successfully.
    pub applied: usize,
    /// Properties that failed, in sheet order.
    pub failed: Vec<SheetFailure>,
}

impl SheetReport {
    /// Whether every property was applied.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Names of the properties that failed.
    pub fn failed_properties(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.property.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("value"), "value");
        assert_eq!(to_snake_case("lineWidth"), "line_width");
        assert_eq!(to_snake_case("LineWidth"), "line_width");
        assert_eq!(to_snake_case("URLText"), "url_text");
        assert_eq!(to_snake_case("contour2Interval"), "contour2_interval");
        assert_eq!(to_snake_case("font-size"), "font_size");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("ID"), "id");
    }

    #[test]
    fn test_accessor_names() {
        assert_eq!(setter_name("preferredSize"), "set_preferred_size");
        assert_eq!(
            getter_names("visible"),
            ["visible".to_string(), "get_visible".into(), "is_visible".into()]
        );
    }

    #[test]
    fn test_sheet_insert_replaces_and_keeps_order() {
        let mut sheet = PropertySheet::new().with("b", "1").with("a", "2");
        sheet.insert("b", "3");
        let pairs: Vec<_> = sheet.iter().collect();
        assert_eq!(pairs, [("b", "3"), ("a", "2")]);
        assert_eq!(sheet.get("a"), Some("2"));
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn test_sheet_from_toml() {
        let sheet = PropertySheet::from_toml_str(
            r#"
            title = "Contours"
            lineWidth = 2
            opacity = 0.5
            visible = true
            bounds = [0, 0, 640, 480]
            "#,
        )
        .unwrap();

        let pairs: Vec<_> = sheet.iter().collect();
        assert_eq!(
            pairs,
            [
                ("title", "Contours"),
                ("lineWidth", "2"),
                ("opacity", "0.5"),
                ("visible", "true"),
                ("bounds", "0,0,640,480"),
            ]
        );
    }

    #[test]
    fn test_sheet_rejects_tables() {
        let err = PropertySheet::from_toml_str("[font]\nsize = 12").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedValue { ref key, found: "table" } if key == "font"
        ));
        assert!(PropertySheet::from_toml_str("x = [[1]]").is_err());
    }

    #[test]
    fn test_sheet_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "background = \"pink\"").unwrap();
        let sheet = PropertySheet::from_toml_file(file.path()).unwrap();
        assert_eq!(sheet.get("background"), Some("pink"));
    }
}
