//! Theme-setting-aware custom Sass functions.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Stylesheets read theme settings through a fixed family of functions
//! (`stencilNumber`, `stencilColor`, ...). Each function is plain data in a
//! [`FunctionRegistry`]: a name, a parameter list and an invoke closure over
//! [`ThemeSettings`]. Backends adapt the registry to their own convention.
//!
//! No function fails. Missing or malformed settings evaluate to `null` (or
//! `0` for numbers), which Sass then drops from the output.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::settings::ThemeSettings;

/// Leading numeric prefix, as read by a lenient float parse.
static LEADING_FLOAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap());

static IMAGE_SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+x\d+$").unwrap());

const SIZE_PLACEHOLDER: &str = "{:size}";
const GOOGLE_PROVIDER: &str = "Google";

/// A value returned to the stylesheet by a theme function.
#[derive(Debug, Clone, PartialEq)]
pub enum SassValue {
    Null,
    Number { value: f64, unit: String },
    /// Fully opaque RGB color
    Color { r: u8, g: u8, b: u8 },
    /// String contents, emitted without added quotes
    String(String),
}

impl SassValue {
    pub fn number(value: f64, unit: impl Into<String>) -> Self {
        SassValue::Number {
            value,
            unit: unit.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SassValue::Null)
    }

    /// Render the value as SCSS source that evaluates back to it.
    ///
    /// A string that is already a plain double-quoted literal (font families)
    /// is emitted as-is; any other string goes through `unquote()` so that
    /// Sass keeps it unquoted.
    pub fn to_literal(&self) -> String {
        match self {
            SassValue::Null => "null".to_string(),
            SassValue::Number { value, unit } => {
                let number = if value.fract() == 0.0 && value.abs() < 1e15 {
                    format!("{}", *value as i64)
                } else {
                    format!("{}", value)
                };
                if is_css_unit(unit) {
                    format!("{}{}", number, unit)
                } else {
                    number
                }
            }
            SassValue::Color { r, g, b } => format!("#{:02x}{:02x}{:02x}", r, g, b),
            SassValue::String(text) if is_plain_quoted(text) => text.clone(),
            SassValue::String(text) => {
                format!("unquote(\"{}\")", text.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }
}

impl fmt::Display for SassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

pub(crate) fn is_css_unit(unit: &str) -> bool {
    unit == "%" || (!unit.is_empty() && unit.chars().all(|c| c.is_ascii_alphabetic()))
}

fn is_plain_quoted(text: &str) -> bool {
    quoted_contents(text).is_some()
}

/// Contents of a plain double-quoted literal such as `"Open Sans"`.
pub(crate) fn quoted_contents(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    (!inner.contains(['"', '\\', '\n'])).then_some(inner)
}

/// A declared function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Name without the leading `$`
    pub name: &'static str,
    pub default: Option<&'static str>,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }
}

type InvokeFn = dyn Fn(&[String]) -> SassValue + Send + Sync;

/// A named custom function callable from stylesheets.
#[derive(Clone)]
pub struct ThemeFunction {
    name: &'static str,
    params: Vec<Param>,
    invoke: Arc<InvokeFn>,
}

impl ThemeFunction {
    pub fn new(
        name: &'static str,
        params: Vec<Param>,
        invoke: impl Fn(&[String]) -> SassValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            params,
            invoke: Arc::new(invoke),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Sass-style signature, e.g. `stencilNumber($name, $unit: px)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match p.default {
                Some(default) => format!("${}: {}", p.name, default),
                None => format!("${}", p.name),
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// Match call arguments to parameters.
    ///
    /// Keyword names may be given with or without `$`. Returns `None` when an
    /// argument is unknown, given twice, surplus, or a required one is missing.
    pub fn bind(&self, positional: &[String], keywords: &[(String, String)]) -> Option<Vec<String>> {
        if positional.len() > self.params.len() {
            return None;
        }
        let mut bound: Vec<Option<String>> = positional.iter().cloned().map(Some).collect();
        bound.resize(self.params.len(), None);

        for (name, value) in keywords {
            let name = name.trim_start_matches('$');
            let idx = self.params.iter().position(|p| p.name == name)?;
            if bound[idx].is_some() {
                return None;
            }
            bound[idx] = Some(value.clone());
        }

        bound
            .into_iter()
            .zip(&self.params)
            .map(|(value, param)| value.or_else(|| param.default.map(str::to_string)))
            .collect()
    }

    /// Fill parameter defaults into values supplied by an engine, one slot per
    /// parameter in declaration order.
    pub fn complete_args(
        &self,
        values: impl IntoIterator<Item = Option<String>>,
    ) -> Result<Vec<String>, String> {
        let mut values = values.into_iter();
        self.params
            .iter()
            .map(|param| match (values.next().flatten(), param.default) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.to_string()),
                (None, None) => Err(format!("Missing argument ${}.", param.name)),
            })
            .collect()
    }

    /// Invoke with already bound arguments.
    pub fn invoke(&self, args: &[String]) -> SassValue {
        (self.invoke)(args)
    }
}

impl fmt::Debug for ThemeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeFunction")
            .field("signature", &self.signature())
            .finish()
    }
}

/// Custom functions keyed by name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: IndexMap<&'static str, ThemeFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function, replacing any previous one with the same name.
    pub fn register(&mut self, function: ThemeFunction) {
        self.functions.insert(function.name, function);
    }

    pub fn get(&self, name: &str) -> Option<&ThemeFunction> {
        self.functions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThemeFunction> {
        self.functions.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Which half of a font setting to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontPart {
    Family,
    Weight,
}

/// Build the theme function family over `settings`.
pub fn theme_functions(settings: Arc<ThemeSettings>) -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();

    let s = Arc::clone(&settings);
    registry.register(ThemeFunction::new(
        "stencilNumber",
        vec![Param::required("name"), Param::optional("unit", "px")],
        move |args| stencil_number(s.get(arg(args, 0)), arg_or(args, 1, "px")),
    ));

    let s = Arc::clone(&settings);
    registry.register(ThemeFunction::new(
        "stencilColor",
        vec![Param::required("name")],
        move |args| stencil_color(s.get(arg(args, 0))),
    ));

    let s = Arc::clone(&settings);
    registry.register(ThemeFunction::new(
        "stencilString",
        vec![Param::required("name")],
        move |args| stencil_string(s.get(arg(args, 0))),
    ));

    let s = Arc::clone(&settings);
    registry.register(ThemeFunction::new(
        "stencilImage",
        vec![Param::required("image"), Param::required("size")],
        move |args| stencil_image(s.get(arg(args, 0)), s.get(arg(args, 1))),
    ));

    let s = Arc::clone(&settings);
    registry.register(ThemeFunction::new(
        "stencilFontFamily",
        vec![Param::required("name")],
        move |args| stencil_font(s.get(arg(args, 0)), FontPart::Family),
    ));

    let s = settings;
    registry.register(ThemeFunction::new(
        "stencilFontWeight",
        vec![Param::required("name")],
        move |args| stencil_font(s.get(arg(args, 0)), FontPart::Weight),
    ));

    registry
}

fn arg(args: &[String], index: usize) -> &str {
    arg_or(args, index, "")
}

fn arg_or<'a>(args: &'a [String], index: usize, default: &'a str) -> &'a str {
    args.get(index).map_or(default, String::as_str)
}

/// Numeric setting with `unit`; missing or unparsable settings give `0`.
pub fn stencil_number(setting: Option<&Value>, unit: &str) -> SassValue {
    let value = match setting {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => leading_float(s).unwrap_or(0.0),
        _ => 0.0,
    };
    let value = if value.is_finite() { value } else { 0.0 };
    SassValue::number(value, unit)
}

fn leading_float(text: &str) -> Option<f64> {
    LEADING_FLOAT
        .find(text.trim_start())
        .and_then(|m| m.as_str().parse().ok())
}

/// Hex color setting, with or without a leading `#`.
pub fn stencil_color(setting: Option<&Value>) -> SassValue {
    match setting.and_then(truthy_text) {
        Some(text) => parse_hex_color(&text).unwrap_or(SassValue::Null),
        None => SassValue::Null,
    }
}

fn parse_hex_color(text: &str) -> Option<SassValue> {
    let hex = text.strip_prefix('#').unwrap_or(text);
    let digits: String = hex.chars().take_while(char::is_ascii_hexdigit).collect();
    let digits: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        n if n >= 6 => digits[..6].to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(SassValue::Color {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

/// String setting; missing or empty gives `null`.
pub fn stencil_string(setting: Option<&Value>) -> SassValue {
    setting
        .and_then(truthy_text)
        .map_or(SassValue::Null, SassValue::String)
}

/// Image URL with its `{:size}` placeholder filled from the size setting.
pub fn stencil_image(image: Option<&Value>, size: Option<&Value>) -> SassValue {
    let (Some(Value::String(image)), Some(Value::String(size))) = (image, size) else {
        return SassValue::Null;
    };
    if image.contains(SIZE_PLACEHOLDER) && IMAGE_SIZE.is_match(size) {
        SassValue::String(image.replacen(SIZE_PLACEHOLDER, size, 1))
    } else {
        SassValue::Null
    }
}

/// Font family or weight from a `<family>_<weights>[_<extra>]` setting.
///
/// `Google_Open+Sans_400,700` gives family `"Open Sans"` and weight `400`.
pub fn stencil_font(setting: Option<&Value>, part: FontPart) -> SassValue {
    let Some(Value::String(value)) = setting else {
        return SassValue::Null;
    };

    let mut segments: Vec<&str> = value.split('_').collect();
    if segments.first() == Some(&GOOGLE_PROVIDER) {
        segments.remove(0);
    }

    let index = match part {
        FontPart::Family => 0,
        FontPart::Weight => 1,
    };
    let Some(segment) = segments.get(index).filter(|s| !s.is_empty()) else {
        return SassValue::Null;
    };

    let first = segment.split(',').next().unwrap_or_default();
    let cleaned: String = first
        .replace('+', " ")
        .chars()
        .filter(|c| *c != '\'' && *c != '"')
        .collect();

    match part {
        FontPart::Family => SassValue::String(format!("\"{}\"", cleaned)),
        FontPart::Weight => SassValue::String(cleaned),
    }
}

/// Text of a setting that counts as present: non-empty strings, numbers and `true`.
fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> Arc<ThemeSettings> {
        Arc::new(ThemeSettings::new(json!({
            "google-font-size": "14",
            "global": { "h1": { "font-size": { "value": 16 } } },
            "google-font-wrong-size": "abc",
            "img-url": "stencil/{:size}/example.jpg",
            "img-size": "1000x400",
            "img-url-empty": "",
            "img-url-wrong--format": "stencil/example.jpg",
            "img-size-wrong--format": "1000-400",
            "google-font": "Google_Open+Sans_400",
            "native-font": "Times New Roman_400",
            "color-primary": "#0000AA",
            "color-short": "fa0"
        })))
    }

    fn call(name: &str, args: &[&str]) -> SassValue {
        let registry = theme_functions(settings());
        let function = registry.get(name).unwrap();
        let positional: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let bound = function.bind(&positional, &[]).unwrap();
        function.invoke(&bound)
    }

    #[test]
    fn test_registry_signatures() {
        let registry = theme_functions(settings());
        let signatures: Vec<String> = registry.iter().map(ThemeFunction::signature).collect();
        assert_eq!(
            signatures,
            vec![
                "stencilNumber($name, $unit: px)",
                "stencilColor($name)",
                "stencilString($name)",
                "stencilImage($image, $size)",
                "stencilFontFamily($name)",
                "stencilFontWeight($name)",
            ]
        );
        assert_eq!(registry.get("stencilNumber").unwrap().arity(), 2);
    }

    #[test]
    fn test_stencil_number() {
        assert_eq!(call("stencilNumber", &["google-font-size"]), SassValue::number(14.0, "px"));
        assert_eq!(
            call("stencilNumber", &["global.h1.font-size.value", "em"]),
            SassValue::number(16.0, "em")
        );
        assert_eq!(call("stencilNumber", &["google-font-wrong-size"]), SassValue::number(0.0, "px"));
        assert_eq!(call("stencilNumber", &["missing"]), SassValue::number(0.0, "px"));
        assert_eq!(call("stencilNumber", &["google-font-size"]).to_literal(), "14px");
    }

    #[test]
    fn test_leading_float_prefix() {
        let value = json!("1.5rem");
        assert_eq!(stencil_number(Some(&value), "em").to_literal(), "1.5em");
        let negative = json!("-2");
        assert_eq!(stencil_number(Some(&negative), "%").to_literal(), "-2%");
    }

    #[test]
    fn test_stencil_color() {
        assert_eq!(
            call("stencilColor", &["color-primary"]),
            SassValue::Color { r: 0, g: 0, b: 0xaa }
        );
        assert_eq!(call("stencilColor", &["color-short"]).to_literal(), "#ffaa00");
        assert_eq!(call("stencilColor", &["missing"]), SassValue::Null);
        assert_eq!(call("stencilColor", &["img-size"]), SassValue::Null);
    }

    #[test]
    fn test_stencil_string() {
        assert_eq!(
            call("stencilString", &["google-font"]),
            SassValue::String("Google_Open+Sans_400".to_string())
        );
        assert_eq!(call("stencilString", &["img-url-empty"]), SassValue::Null);
        assert_eq!(call("stencilString", &["missing"]), SassValue::Null);
    }

    #[test]
    fn test_stencil_image() {
        assert_eq!(
            call("stencilImage", &["img-url", "img-size"]),
            SassValue::String("stencil/1000x400/example.jpg".to_string())
        );
        assert_eq!(call("stencilImage", &["img-url-empty", "img-size"]), SassValue::Null);
        assert_eq!(
            call("stencilImage", &["img-url-wrong--format", "img-size"]),
            SassValue::Null
        );
        assert_eq!(
            call("stencilImage", &["img-url", "img-size-wrong--format"]),
            SassValue::Null
        );
        assert_eq!(call("stencilImage", &["missing", "img-size"]), SassValue::Null);
    }

    #[test]
    fn test_stencil_font_family_and_weight() {
        assert_eq!(
            call("stencilFontFamily", &["google-font"]).to_literal(),
            "\"Open Sans\""
        );
        assert_eq!(
            call("stencilFontWeight", &["google-font"]),
            SassValue::String("400".to_string())
        );
        assert_eq!(
            call("stencilFontFamily", &["native-font"]),
            SassValue::String("\"Times New Roman\"".to_string())
        );
        assert_eq!(call("stencilFontFamily", &["missing"]), SassValue::Null);
    }

    #[test]
    fn test_font_parser_examples() {
        let google = json!("Google_Open+Sans_700");
        assert_eq!(
            stencil_font(Some(&google), FontPart::Family),
            SassValue::String("\"Open Sans\"".to_string())
        );
        let native = json!("Times New Roman_400,700");
        assert_eq!(
            stencil_font(Some(&native), FontPart::Weight),
            SassValue::String("400".to_string())
        );
        let family_only = json!("Google_Open+Sans");
        assert_eq!(stencil_font(Some(&family_only), FontPart::Weight), SassValue::Null);
        let quoted = json!("'Roboto'_300_sans");
        assert_eq!(
            stencil_font(Some(&quoted), FontPart::Family),
            SassValue::String("\"Roboto\"".to_string())
        );
        assert_eq!(stencil_font(Some(&json!(12)), FontPart::Family), SassValue::Null);
    }

    #[test]
    fn test_bind_keywords_and_defaults() {
        let registry = theme_functions(settings());
        let number = registry.get("stencilNumber").unwrap();

        let bound = number
            .bind(&["a".to_string()], &[("$unit".to_string(), "em".to_string())])
            .unwrap();
        assert_eq!(bound, vec!["a", "em"]);

        assert_eq!(number.bind(&["a".to_string()], &[]).unwrap(), vec!["a", "px"]);
        assert!(number.bind(&[], &[]).is_none());
        assert!(number
            .bind(&["a".to_string()], &[("name".to_string(), "b".to_string())])
            .is_none());
        assert!(number
            .bind(&["a".to_string(), "b".to_string(), "c".to_string()], &[])
            .is_none());
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(SassValue::Null.to_literal(), "null");
        assert_eq!(
            SassValue::String("a\"b".to_string()).to_literal(),
            "unquote(\"a\\\"b\")"
        );
        assert_eq!(SassValue::number(2.0, "").to_literal(), "2");
    }

    #[test]
    fn test_invoke_without_args_does_not_panic() {
        let registry = theme_functions(settings());
        for function in registry.iter() {
            let value = function.invoke(&[]);
            assert!(value.is_null() || value == SassValue::number(0.0, "px"));
        }
    }

    #[test]
    fn test_complete_args_fills_defaults() {
        let registry = theme_functions(settings());
        let number = registry.get("stencilNumber").unwrap();

        assert_eq!(
            number.complete_args([Some("a".to_string()), None]).unwrap(),
            vec!["a", "px"]
        );
        assert_eq!(
            number.complete_args([None, Some("em".to_string())]).unwrap_err(),
            "Missing argument $name."
        );
    }

    #[test]
    fn test_quoted_contents() {
        assert_eq!(quoted_contents("\"Open Sans\""), Some("Open Sans"));
        assert_eq!(quoted_contents("Open Sans"), None);
        assert_eq!(quoted_contents("\""), None);
    }
}
