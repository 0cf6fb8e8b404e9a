//! Parser for `key=value` override strings
//!
//! Accepts the syntax used by `--set` style overrides:
//!
//! ```text
//! image.tag=v2,replicas=3
//! hosts={a.example.com,b.example.com}
//! annotation=one\,two
//! ```
//!
//! Keys are dot separated and create intermediate mappings. A value wrapped in
//! braces becomes a sequence. A backslash escapes the next character, which is
//! how a literal `,`, `.`, `=` or brace is written. There is no index syntax.
//!
//! With type inference enabled, `true`/`false` become booleans, `null` becomes
//! null, and integers or decimal floats without a leading zero become numbers.
//! Everything else stays a string.

use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};
use crate::values::{Values, set_nested};

/// Parse a `key=value` string into fresh values
pub fn parse(input: &str) -> Result<Values> {
    let mut values = Values::new();
    parse_into(input, &mut values)?;
    Ok(values)
}

/// Parse a `key=value` string into existing values, inferring scalar types
pub fn parse_into(input: &str, dest: &mut Values) -> Result<()> {
    Parser::new(input, false).parse(dest)
}

/// Parse a `key=value` string into existing values, keeping every value a string
pub fn parse_into_string(input: &str, dest: &mut Values) -> Result<()> {
    Parser::new(input, true).parse(dest)
}

/// Split a dotted key into segments, honouring backslash escapes
///
/// `labels.app\.kubernetes\.io/name` has two segments. Empty segments are
/// rejected the same way the `key=value` parser rejects them.
pub fn split_key(key: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.extend(chars.next()),
            '.' => segments.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    segments.push(current);

    if segments.iter().any(String::is_empty) {
        return Err(CoreError::KeyValueSyntax {
            input: key.to_string(),
            message: format!("key {:?} has an empty segment", key),
        });
    }
    Ok(segments)
}

/// Convert a raw right-hand side to a typed value
pub fn typed_value(raw: &str, force_string: bool) -> JsonValue {
    if force_string {
        return JsonValue::String(raw.to_string());
    }
    if raw.eq_ignore_ascii_case("true") {
        return JsonValue::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return JsonValue::Bool(false);
    }
    if raw.eq_ignore_ascii_case("null") {
        return JsonValue::Null;
    }
    if raw == "0" {
        return JsonValue::Number(0.into());
    }
    if raw.is_empty() || has_leading_zero(raw) {
        return JsonValue::String(raw.to_string());
    }
    if let Ok(int) = raw.parse::<i64>() {
        return JsonValue::Number(int.into());
    }
    if looks_like_float(raw) {
        if let Some(num) = raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            return JsonValue::Number(num);
        }
    }
    JsonValue::String(raw.to_string())
}

/// `007` or `-01` are identifiers (zip codes, octal modes), not numbers
fn has_leading_zero(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    let mut chars = digits.chars();
    chars.next() == Some('0') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

fn looks_like_float(raw: &str) -> bool {
    raw.chars().any(|c| c.is_ascii_digit())
        && raw.contains(['.', 'e', 'E'])
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
    force_string: bool,
}

/// Where a scanned token stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Equals,
    Comma,
    Close,
    End,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, force_string: bool) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
            force_string,
        }
    }

    fn error(&self, message: impl Into<String>) -> CoreError {
        CoreError::KeyValueSyntax {
            input: self.input.to_string(),
            message: message.into(),
        }
    }

    fn parse(mut self, dest: &mut Values) -> Result<()> {
        while self.pos < self.chars.len() {
            let segments = self.key()?;
            let value = if self.peek() == Some('{') {
                self.pos += 1;
                self.list()?
            } else {
                let (raw, _) = self.scan(&[',']);
                typed_value(&raw, self.force_string)
            };

            let parts: Vec<&str> = segments.iter().map(String::as_str).collect();
            set_nested(dest.inner_mut(), &parts, &segments.join("."), value)?;
        }
        Ok(())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Read characters until one of `stops`, honouring backslash escapes.
    /// The stop character is consumed.
    fn scan(&mut self, stops: &[char]) -> (String, Stop) {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    if let Some(next) = self.peek() {
                        out.push(next);
                        self.pos += 1;
                    }
                }
                c if stops.contains(&c) => {
                    let stop = match c {
                        '=' => Stop::Equals,
                        ',' => Stop::Comma,
                        '}' => Stop::Close,
                        _ => Stop::End,
                    };
                    return (out, stop);
                }
                c => out.push(c),
            }
        }
        (out, Stop::End)
    }

    /// Read a dotted key up to and including the `=`
    fn key(&mut self) -> Result<Vec<String>> {
        let mut segments = Vec::new();
        let mut current = String::new();
        loop {
            let Some(c) = self.peek() else {
                segments.push(current);
                return Err(self.error(format!("key {:?} has no value", segments.join("."))));
            };
            self.pos += 1;
            match c {
                '\\' => {
                    if let Some(next) = self.peek() {
                        current.push(next);
                        self.pos += 1;
                    }
                }
                '.' => segments.push(std::mem::take(&mut current)),
                '=' => {
                    segments.push(current);
                    break;
                }
                ',' => {
                    segments.push(current);
                    return Err(self.error(format!(
                        "key {:?} has no value (cannot end with ,)",
                        segments.join(".")
                    )));
                }
                c => current.push(c),
            }
        }

        if segments.iter().any(String::is_empty) {
            return Err(self.error(format!("key {:?} has an empty segment", segments.join("."))));
        }
        Ok(segments)
    }

    /// Read a brace-wrapped list; the opening brace is already consumed
    fn list(&mut self) -> Result<JsonValue> {
        let mut items = Vec::new();
        if self.peek() == Some('}') {
            self.pos += 1;
        } else {
            loop {
                let (raw, stop) = self.scan(&[',', '}']);
                match stop {
                    Stop::Comma => items.push(typed_value(&raw, self.force_string)),
                    Stop::Close => {
                        items.push(typed_value(&raw, self.force_string));
                        break;
                    }
                    _ => return Err(self.error("list is missing its closing brace")),
                }
            }
        }

        match self.peek() {
            None => {}
            Some(',') => self.pos += 1,
            Some(c) => {
                return Err(self.error(format!("unexpected {c:?} after closing brace")));
            }
        }
        Ok(JsonValue::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_set_values() {
        let values = parse("image.tag=v2,replicas=5,debug=true").unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "v2");
        assert_eq!(values.get("replicas").unwrap(), 5);
        assert_eq!(values.get("debug").unwrap(), true);
    }

    #[test]
    fn test_type_inference() {
        assert_eq!(typed_value("42", false), json!(42));
        assert_eq!(typed_value("-7", false), json!(-7));
        assert_eq!(typed_value("1.5", false), json!(1.5));
        assert_eq!(typed_value("0.25", false), json!(0.25));
        assert_eq!(typed_value("0", false), json!(0));
        assert_eq!(typed_value("TRUE", false), json!(true));
        assert_eq!(typed_value("null", false), JsonValue::Null);
        assert_eq!(typed_value("007", false), json!("007"));
        assert_eq!(typed_value("1.2.3", false), json!("1.2.3"));
        assert_eq!(typed_value("inf", false), json!("inf"));
        assert_eq!(typed_value("NaN", false), json!("NaN"));
        assert_eq!(typed_value("", false), json!(""));
    }

    #[test]
    fn test_force_string() {
        let mut values = Values::new();
        parse_into_string("count=42,enabled=true", &mut values).unwrap();

        assert_eq!(values.get("count").unwrap(), "42");
        assert_eq!(values.get("enabled").unwrap(), "true");
    }

    #[test]
    fn test_list_values() {
        let values = parse("items={3,1,2}").unwrap();
        assert_eq!(values.get("items").unwrap(), &json!([3, 1, 2]));

        let values = parse("empty={}").unwrap();
        assert_eq!(values.get("empty").unwrap(), &json!([]));

        let values = parse("hosts={a.example.com,b},port=80").unwrap();
        assert_eq!(values.get("hosts").unwrap(), &json!(["a.example.com", "b"]));
        assert_eq!(values.get("port").unwrap(), 80);
    }

    #[test]
    fn test_escapes() {
        let values = parse(r"annotation=one\,two").unwrap();
        assert_eq!(values.get("annotation").unwrap(), "one,two");

        let values = parse(r"labels.app\.kubernetes\.io/name=web").unwrap();
        assert_eq!(
            values.inner(),
            &json!({"labels": {"app.kubernetes.io/name": "web"}})
        );
    }

    #[test]
    fn test_value_may_contain_equals() {
        let values = parse("args=--flag=1").unwrap();
        assert_eq!(values.get("args").unwrap(), "--flag=1");
    }

    #[test]
    fn test_missing_value_is_error() {
        let err = parse("name").unwrap_err();
        assert!(err.to_string().contains("has no value"), "{err}");

        let err = parse("a=1,b").unwrap_err();
        assert!(err.to_string().contains(r#""b""#), "{err}");
    }

    #[test]
    fn test_empty_segment_is_error() {
        assert!(parse("a..b=1").is_err());
        assert!(parse("=1").is_err());
    }

    #[test]
    fn test_split_key() {
        assert_eq!(
            split_key(r"labels.app\.kubernetes\.io/name").unwrap(),
            vec!["labels", "app.kubernetes.io/name"]
        );
        assert_eq!(split_key("image").unwrap(), vec!["image"]);
        assert!(matches!(split_key("a..b"), Err(CoreError::KeyValueSyntax { .. })));
        assert!(split_key("").is_err());
    }

    #[test]
    fn test_unterminated_list_is_error() {
        assert!(parse("items={1,2").is_err());
        assert!(parse("items={1}x").is_err());
    }

    #[test]
    fn test_nested_paths_merge_into_existing() {
        let mut values = Values::from_yaml("image:\n  repository: nginx").unwrap();
        parse_into("image.tag=1.25", &mut values).unwrap();

        assert_eq!(values.get("image.repository").unwrap(), "nginx");
        assert_eq!(values.get("image.tag").unwrap(), 1.25);
    }

    #[test]
    fn test_descending_through_scalar_is_conflict() {
        let mut values = Values::from_yaml("image: nginx").unwrap();
        let err = parse_into("image.tag=v1", &mut values).unwrap_err();

        assert!(matches!(err, CoreError::TypeConflict { .. }));
    }
}
