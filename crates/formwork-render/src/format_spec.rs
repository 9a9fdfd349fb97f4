//! Brace-style replacement fields with a standard format-spec mini-language.
//!
//! Fields look like `{model.persons[0].age!s:>08.2f}`: a reference path,
//! an optional conversion (`!s` or `!r`) and an optional spec:
//!
//! ```text
//! [[fill]align][sign][#][0][width][,|_][.precision][type]
//! ```
//!
//! `{{` and `}}` render literal braces.
//!
//! ```rust
//! use formwork_render::format_spec::format_fields;
//! use serde_json::json;
//!
//! let root = json!({"model": {"name": "Pluto", "age": 42}});
//! let out = format_fields("Hello {model.name} {model.age:03}!", &root)?;
//! assert_eq!(out, "Hello Pluto 042!");
//! # Ok::<(), formwork_render::FormworkError>(())
//! ```

use std::str::FromStr;

use serde_json::Value;

use crate::error::{FormworkError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign and the digits.
    AfterSign,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Sign {
    #[default]
    Negative,
    Always,
    Space,
}

/// A parsed format spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub fill: char,
    pub align: Option<Align>,
    pub sign: Sign,
    pub alternate: bool,
    pub zero: bool,
    pub width: Option<usize>,
    pub grouping: Option<char>,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            sign: Sign::Negative,
            alternate: false,
            zero: false,
            width: None,
            grouping: None,
            precision: None,
            kind: None,
        }
    }
}

fn align_of(ch: char) -> Option<Align> {
    match ch {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

impl FromStr for FormatSpec {
    type Err = FormworkError;

    fn from_str(s: &str) -> Result<Self> {
        let chars: Vec<char> = s.chars().collect();
        let mut spec = FormatSpec::default();
        let mut i = 0;

        if chars.len() >= 2 && align_of(chars[1]).is_some() {
            spec.fill = chars[0];
            spec.align = align_of(chars[1]);
            i = 2;
        } else if let Some(align) = chars.first().copied().and_then(align_of) {
            spec.align = Some(align);
            i = 1;
        }

        match chars.get(i) {
            Some('+') => {
                spec.sign = Sign::Always;
                i += 1;
            }
            Some('-') => i += 1,
            Some(' ') => {
                spec.sign = Sign::Space;
                i += 1;
            }
            _ => {}
        }
        if chars.get(i) == Some(&'#') {
            spec.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            spec.zero = true;
            i += 1;
        }
        let (width, next) = read_number(s, &chars, i)?;
        spec.width = width;
        i = next;
        if let Some(&g @ (',' | '_')) = chars.get(i) {
            spec.grouping = Some(g);
            i += 1;
        }
        if chars.get(i) == Some(&'.') {
            let (precision, next) = read_number(s, &chars, i + 1)?;
            if precision.is_none() {
                return Err(bad_spec(s, "format specifier missing precision"));
            }
            spec.precision = precision;
            i = next;
        }
        if let Some(&kind) = chars.get(i) {
            if !"sdbcoxXneEfFgG%".contains(kind) {
                return Err(bad_spec(s, &format!("unknown format code '{kind}'")));
            }
            spec.kind = Some(kind);
            i += 1;
        }
        if i != chars.len() {
            return Err(bad_spec(s, "invalid format specifier"));
        }
        Ok(spec)
    }
}

fn read_number(spec: &str, chars: &[char], start: usize) -> Result<(Option<usize>, usize)> {
    let end = chars[start.min(chars.len())..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map(|p| start + p)
        .unwrap_or(chars.len());
    if end <= start {
        return Ok((None, start));
    }
    let digits: String = chars[start..end].iter().collect();
    let number = digits
        .parse()
        .map_err(|_| bad_spec(spec, "too many decimal digits"))?;
    Ok((Some(number), end))
}

fn bad_spec(spec: &str, message: &str) -> FormworkError {
    FormworkError::render(format!("{message} in `{spec}`"))
}

impl FormatSpec {
    /// Formats a JSON value according to this spec.
    pub fn apply(&self, value: &Value) -> Result<String> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    self.format_int(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    self.format_int(i128::from(u))
                } else {
                    self.format_float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::Bool(b) if self.is_numeric_kind() => self.format_int(i128::from(*b)),
            other => self.format_str(&display_value(other)),
        }
    }

    fn is_numeric_kind(&self) -> bool {
        matches!(self.kind, Some(k) if k != 's')
    }

    fn format_str(&self, text: &str) -> Result<String> {
        if let Some(kind) = self.kind.filter(|&k| k != 's') {
            return Err(FormworkError::render(format!(
                "unknown format code '{kind}' for a string value"
            )));
        }
        if self.sign != Sign::Negative || self.alternate || self.grouping.is_some() {
            return Err(FormworkError::render(
                "sign, `#` and grouping are not allowed in string format specifiers",
            ));
        }
        if self.align == Some(Align::AfterSign) {
            return Err(FormworkError::render(
                "'=' alignment not allowed in string format specifier",
            ));
        }
        let body: String = match self.precision {
            Some(p) => text.chars().take(p).collect(),
            None => text.to_string(),
        };
        Ok(self.pad("", &body, Align::Left))
    }

    fn format_int(&self, value: i128) -> Result<String> {
        let magnitude = value.unsigned_abs();
        let (prefix, digits) = match self.kind {
            None | Some('d') | Some('n') => {
                if self.precision.is_some() {
                    return Err(FormworkError::render(
                        "precision not allowed in integer format specifier",
                    ));
                }
                ("", group(&magnitude.to_string(), self.grouping, 3))
            }
            Some('b') => ("0b", group(&format!("{magnitude:b}"), self.grouping.map(|_| '_'), 4)),
            Some('o') => ("0o", group(&format!("{magnitude:o}"), self.grouping.map(|_| '_'), 4)),
            Some('x') => ("0x", group(&format!("{magnitude:x}"), self.grouping.map(|_| '_'), 4)),
            Some('X') => ("0X", group(&format!("{magnitude:X}"), self.grouping.map(|_| '_'), 4)),
            Some('c') => {
                let ch = u32::try_from(value)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| FormworkError::render(format!("%c arg not in range: {value}")))?;
                return Ok(self.pad("", &ch.to_string(), Align::Left));
            }
            Some('s') => {
                return Err(FormworkError::render(
                    "unknown format code 's' for an integer value",
                ))
            }
            Some(_) => return self.format_float(value as f64),
        };
        let prefix = if self.alternate { prefix } else { "" };
        let sign = self.sign_for(value < 0);
        Ok(self.pad(&format!("{sign}{prefix}"), &digits, Align::Right))
    }

    fn format_float(&self, value: f64) -> Result<String> {
        let negative = value.is_sign_negative() && value != 0.0;
        let magnitude = value.abs();
        let precision = self.precision.unwrap_or(6);
        let body = match self.kind {
            Some('d') | Some('b') | Some('o') | Some('x') | Some('X') | Some('c') | Some('s') => {
                return Err(FormworkError::render(format!(
                    "unknown format code '{}' for a float value",
                    self.kind.unwrap_or('?')
                )))
            }
            Some('f') | Some('F') => fixed(magnitude, precision, self.alternate),
            Some('e') | Some('E') => scientific(magnitude, precision, self.alternate),
            Some('g') | Some('G') | Some('n') => general(magnitude, precision, self.alternate),
            Some('%') => format!("{}%", fixed(magnitude * 100.0, precision, self.alternate)),
            None => match self.precision {
                Some(p) => with_point(general(magnitude, p, self.alternate)),
                None => shortest(magnitude),
            },
            Some(other) => {
                return Err(FormworkError::render(format!("unknown format code '{other}'")))
            }
        };
        let body = if matches!(self.kind, Some('F') | Some('E') | Some('G')) {
            body.to_uppercase()
        } else {
            body
        };
        let body = group_float(&body, self.grouping);
        let sign = self.sign_for(negative);
        Ok(self.pad(sign, &body, Align::Right))
    }

    fn sign_for(&self, negative: bool) -> &'static str {
        match (negative, self.sign) {
            (true, _) => "-",
            (false, Sign::Always) => "+",
            (false, Sign::Space) => " ",
            (false, Sign::Negative) => "",
        }
    }

    fn pad(&self, sign: &str, body: &str, default_align: Align) -> String {
        let (fill, align) = match (self.align, self.zero) {
            (Some(align), _) => (self.fill, align),
            (None, true) if default_align == Align::Right => ('0', Align::AfterSign),
            (None, true) => ('0', default_align),
            (None, false) => (self.fill, default_align),
        };
        let len = sign.chars().count() + body.chars().count();
        let missing = self.width.unwrap_or(0).saturating_sub(len);
        let filler = |n: usize| fill.to_string().repeat(n);
        match align {
            Align::Left => format!("{sign}{body}{}", filler(missing)),
            Align::Right => format!("{}{sign}{body}", filler(missing)),
            Align::Center => {
                let left = missing / 2;
                format!("{}{sign}{body}{}", filler(left), filler(missing - left))
            }
            Align::AfterSign => format!("{sign}{}{body}", filler(missing)),
        }
    }
}

fn group(digits: &str, separator: Option<char>, every: usize) -> String {
    let Some(separator) = separator else {
        return digits.to_string();
    };
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / every);
    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % every == 0 {
            out.push(separator);
        }
        out.push(*ch);
    }
    out
}

fn group_float(body: &str, separator: Option<char>) -> String {
    if separator.is_none() {
        return body.to_string();
    }
    let split = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (int_part, rest) = body.split_at(split);
    format!("{}{rest}", group(int_part, separator, 3))
}

fn fixed(value: f64, precision: usize, alternate: bool) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    let out = format!("{value:.precision$}");
    if alternate && precision == 0 {
        format!("{out}.")
    } else {
        out
    }
}

fn scientific(value: f64, precision: usize, alternate: bool) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    let raw = format!("{value:.precision$e}");
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let dot = if alternate && precision == 0 { "." } else { "" };
    let exp_sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}{dot}e{exp_sign}{:02}", exponent.abs())
}

fn general(value: f64, precision: usize, alternate: bool) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    let precision = precision.max(1);
    let exponent = if value == 0.0 {
        0
    } else {
        let raw = format!("{value:.prec$e}", prec = precision - 1);
        raw.split_once('e')
            .and_then(|(_, e)| e.parse::<i32>().ok())
            .unwrap_or(0)
    };
    let out = if exponent >= -4 && exponent < precision as i32 {
        fixed(value, (precision as i32 - 1 - exponent) as usize, false)
    } else {
        scientific(value, precision - 1, false)
    };
    if alternate {
        out
    } else {
        strip_trailing_zeros(&out)
    }
}

/// Keeps a float recognizable when general formatting dropped its
/// fractional part: `2` becomes `2.0`.
fn with_point(text: String) -> String {
    if text.bytes().all(|b| b.is_ascii_digit()) {
        format!("{text}.0")
    } else {
        text
    }
}

fn strip_trailing_zeros(text: &str) -> String {
    let (mantissa, exponent) = match text.find('e') {
        Some(pos) => text.split_at(pos),
        None => (text, ""),
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    format!("{mantissa}{exponent}")
}

/// Shortest round-tripping representation, always with a fractional part
/// or an exponent so floats stay recognizable as floats.
fn shortest(value: f64) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    if value != 0.0 && !(1e-4..1e16).contains(&value) {
        let raw = format!("{value:e}");
        let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{exp_sign}{:02}", exponent.abs());
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn non_finite(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        "inf".to_string()
    }
}

/// Plain-text rendering of a JSON value: strings unquoted, `null` empty,
/// containers as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) if n.is_f64() => {
            let f = n.as_f64().unwrap_or(f64::NAN);
            let body = shortest(f.abs());
            if f.is_sign_negative() && f != 0.0 {
                format!("-{body}")
            } else {
                body
            }
        }
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// A value conversion applied before formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// `!s`: the plain-text rendering.
    Str,
    /// `!r`: strings quoted, everything else as JSON.
    Repr,
}

impl Conversion {
    pub fn parse(text: &str) -> Result<Self> {
        match text {
            "s" => Ok(Conversion::Str),
            "r" | "a" => Ok(Conversion::Repr),
            other => Err(FormworkError::render(format!(
                "unknown conversion specifier `{other}`"
            ))),
        }
    }

    pub fn apply(self, value: &Value) -> Value {
        match (self, value) {
            (Conversion::Str, v) => Value::String(display_value(v)),
            (Conversion::Repr, Value::String(s)) => {
                Value::String(format!("'{}'", s.replace('\'', "\\'")))
            }
            (Conversion::Repr, v) => Value::String(v.to_string()),
        }
    }
}

/// Formats `value` with an optional conversion and spec.
pub fn format_value(value: &Value, conversion: Option<Conversion>, spec: &str) -> Result<String> {
    let converted;
    let value = match conversion {
        Some(conversion) => {
            converted = conversion.apply(value);
            &converted
        }
        None => value,
    };
    if spec.is_empty() {
        return Ok(display_value(value));
    }
    spec.parse::<FormatSpec>()?.apply(value)
}

/// One `{...}` field split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<'a> {
    pub expression: &'a str,
    pub conversion: Option<Conversion>,
    pub spec: &'a str,
}

impl<'a> Field<'a> {
    /// Splits a field body at the first top-level `!` (not part of `!=`) or
    /// `:`. Brackets, parentheses, braces and quoted strings are skipped.
    pub fn split(body: &'a str) -> Result<Self> {
        let bytes = body.as_bytes();
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) => {
                    if b == b'\\' {
                        i += 1;
                    } else if b == q {
                        quote = None;
                    }
                }
                None => match b {
                    b'\'' | b'"' => quote = Some(b),
                    b'[' | b'(' | b'{' => depth += 1,
                    b']' | b')' | b'}' => depth = depth.saturating_sub(1),
                    b'!' if depth == 0 && bytes.get(i + 1) != Some(&b'=') => {
                        let rest = &body[i + 1..];
                        let (conv, spec) = match rest.split_once(':') {
                            Some((conv, spec)) => (conv, spec),
                            None => (rest, ""),
                        };
                        return Ok(Field {
                            expression: &body[..i],
                            conversion: Some(Conversion::parse(conv.trim())?),
                            spec,
                        });
                    }
                    b':' if depth == 0 => {
                        return Ok(Field {
                            expression: &body[..i],
                            conversion: None,
                            spec: &body[i + 1..],
                        });
                    }
                    _ => {}
                },
            }
            i += 1;
        }
        Ok(Field {
            expression: body,
            conversion: None,
            spec: "",
        })
    }
}

/// A piece of a brace template: literal text or a field body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(String),
    Field(&'a str),
}

/// Splits a brace template into literal text and field bodies.
///
/// Field bodies may contain balanced braces and quoted strings, so
/// expressions such as `{ {'a': 1}['a'] }` survive intact.
pub fn segments(template: &str) -> Result<Vec<Segment<'_>>> {
    let bytes = template.as_bytes();
    let mut out = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    let mut literal_start = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                literal.push_str(&template[literal_start..i]);
                literal.push('{');
                i += 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                literal.push_str(&template[literal_start..i]);
                literal.push('}');
                i += 2;
                literal_start = i;
            }
            b'}' => {
                return Err(FormworkError::render(format!(
                    "single '}}' encountered at offset {i}"
                )))
            }
            b'{' => {
                literal.push_str(&template[literal_start..i]);
                if !literal.is_empty() {
                    out.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let end = matching_brace(template, i)?;
                let body = &template[i + 1..end];
                if body.trim().is_empty() {
                    return Err(FormworkError::render(format!(
                        "empty replacement field at offset {i}"
                    )));
                }
                out.push(Segment::Field(body));
                i = end + 1;
                literal_start = i;
            }
            _ => i += 1,
        }
    }
    literal.push_str(&template[literal_start..]);
    if !literal.is_empty() {
        out.push(Segment::Literal(literal));
    }
    Ok(out)
}

fn matching_brace(template: &str, open: usize) -> Result<usize> {
    let bytes = template.as_bytes();
    let mut depth = 0usize;
    let mut brackets = 0usize;
    let mut quote: Option<u8> = None;
    // Past the top-level `:` quotes are fill characters, not strings.
    let mut in_spec = false;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' if i > open && !in_spec => quote = Some(b),
                b'[' | b'(' if !in_spec => brackets += 1,
                b']' | b')' if !in_spec => brackets = brackets.saturating_sub(1),
                b':' if depth == 1 && brackets == 0 => in_spec = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    Err(FormworkError::render(format!(
        "unclosed replacement field starting at offset {open}"
    )))
}

/// Resolves a reference like `model.persons[1].surname` inside `root`.
///
/// `[n]` indexes lists (or looks up the key `n` in maps); `[key]` looks up
/// a map key.
pub fn resolve<'v>(root: &'v Value, reference: &str) -> Result<&'v Value> {
    let reference = reference.trim();
    let undefined = || FormworkError::render(format!("undefined reference `{reference}`"));
    let malformed = || FormworkError::render(format!("malformed reference `{reference}`"));

    let name_end = reference.find(['.', '[']).unwrap_or(reference.len());
    let (name, mut rest) = reference.split_at(name_end);
    if name.is_empty() {
        return Err(malformed());
    }
    let mut current = root.get(name).ok_or_else(undefined)?;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            let attr = &after[..end];
            if attr.is_empty() {
                return Err(malformed());
            }
            current = current.get(attr).ok_or_else(undefined)?;
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']').ok_or_else(malformed)?;
            let key = &after[..end];
            current = match (key.parse::<usize>(), current) {
                (Ok(index), Value::Array(items)) => items.get(index),
                (_, Value::Object(map)) => map.get(key),
                _ => None,
            }
            .ok_or_else(undefined)?;
            rest = &after[end + 1..];
        } else {
            return Err(malformed());
        }
    }
    Ok(current)
}

/// Renders every field of `template` against `root`, whose top-level keys
/// are the names fields may start with.
pub fn format_fields(template: &str, root: &Value) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    for segment in segments(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Field(body) => {
                let field = Field::split(body)?;
                if field.spec.contains('{') {
                    return Err(FormworkError::render(
                        "nested replacement fields are not supported",
                    ));
                }
                let value = resolve(root, field.expression)?;
                out.push_str(&format_value(value, field.conversion, field.spec)?);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fmt(value: Value, spec: &str) -> String {
        format_value(&value, None, spec).unwrap()
    }

    #[test]
    fn test_zero_padded_width() {
        assert_eq!(fmt(json!(42), "03"), "042");
        assert_eq!(fmt(json!(-42), "05"), "-0042");
    }

    #[test]
    fn test_alignment_and_fill() {
        assert_eq!(fmt(json!("ab"), "<5"), "ab   ");
        assert_eq!(fmt(json!("ab"), ">5"), "   ab");
        assert_eq!(fmt(json!("ab"), "*^6"), "**ab**");
        assert_eq!(fmt(json!(7), "x<3"), "7xx");
    }

    #[test]
    fn test_string_precision_truncates() {
        assert_eq!(fmt(json!("Pluto"), ".3"), "Plu");
    }

    #[test]
    fn test_float_types() {
        assert_eq!(fmt(json!(3.14159), ".2f"), "3.14");
        assert_eq!(fmt(json!(1234.5), "e"), "1.234500e+03");
        assert_eq!(fmt(json!(0.25), ".1%"), "25.0%");
        assert_eq!(fmt(json!(1234.5678), "g"), "1234.57");
        assert_eq!(fmt(json!(0.00001234), "g"), "1.234e-05");
        assert_eq!(fmt(json!(2.5), ""), "2.5");
        assert_eq!(fmt(json!(2.0), "+"), "+2.0");
    }

    #[test]
    fn test_float_precision_without_type_keeps_point() {
        assert_eq!(fmt(json!(2.0), ".3"), "2.0");
        assert_eq!(fmt(json!(2.5), ".3"), "2.5");
        assert_eq!(fmt(json!(1234.5678), ".2"), "1.2e+03");
        assert_eq!(fmt(json!(2.0), "#.3"), "2.00");
    }

    #[test]
    fn test_integer_radix_and_grouping() {
        assert_eq!(fmt(json!(255), "x"), "ff");
        assert_eq!(fmt(json!(255), "#X"), "0XFF");
        assert_eq!(fmt(json!(5), "#b"), "0b101");
        assert_eq!(fmt(json!(1234567), ","), "1,234,567");
        assert_eq!(fmt(json!(1234567.891), ",.2f"), "1,234,567.89");
        assert_eq!(fmt(json!(65), "c"), "A");
    }

    #[test]
    fn test_sign_options() {
        assert_eq!(fmt(json!(5), "+"), "+5");
        assert_eq!(fmt(json!(5), " "), " 5");
        assert_eq!(fmt(json!(-5), "+"), "-5");
    }

    #[test]
    fn test_invalid_specs() {
        assert!(format_value(&json!("x"), None, "d").is_err());
        assert!(format_value(&json!(1), None, ".2").is_err());
        assert!(format_value(&json!(1.5), None, "x").is_err());
        assert!(format_value(&json!(1), None, "q").is_err());
        assert!(format_value(&json!("x"), None, "=5").is_err());
    }

    #[test]
    fn test_oversized_width_and_precision_rejected() {
        let err = format_value(&json!(1), None, "99999999999999999999999").unwrap_err();
        assert!(err.to_string().contains("too many decimal digits"));
        assert!(format_value(&json!(1.5), None, ".99999999999999999999999f").is_err());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(format_value(&json!("hi"), Some(Conversion::Repr), "").unwrap(), "'hi'");
        assert_eq!(format_value(&json!(3), Some(Conversion::Str), ">3").unwrap(), "  3");
    }

    #[test]
    fn test_segments_escapes() {
        let segs = segments("a {{b}} {c}").unwrap();
        assert_eq!(
            segs,
            vec![Segment::Literal("a {b} ".into()), Segment::Field("c")]
        );
    }

    #[test]
    fn test_segments_nested_braces_in_expression() {
        let segs = segments("{ {'a': '}'}['a'] }!").unwrap();
        assert_eq!(segs[0], Segment::Field(" {'a': '}'}['a'] "));
        assert_eq!(segs[1], Segment::Literal("!".into()));
    }

    #[test]
    fn test_segments_quote_as_fill_character() {
        assert_eq!(segments("{x:'^5}").unwrap(), vec![Segment::Field("x:'^5")]);
        assert_eq!(segments("{x!r:\"<4}.").unwrap()[0], Segment::Field("x!r:\"<4"));
        let root = json!({"model": {"name": "x"}});
        assert_eq!(format_fields("{model.name:'^5}", &root).unwrap(), "''x''");
    }

    #[test]
    fn test_segments_colon_inside_brackets_is_not_a_spec() {
        let segs = segments("{ d['a:b'] }").unwrap();
        assert_eq!(segs, vec![Segment::Field(" d['a:b'] ")]);
    }

    #[test]
    fn test_segments_errors() {
        assert!(segments("a {b").is_err());
        assert!(segments("a } b").is_err());
        assert!(segments("a {} b").is_err());
    }

    #[test]
    fn test_field_split() {
        let field = Field::split("model.age:03").unwrap();
        assert_eq!(field.expression, "model.age");
        assert_eq!(field.spec, "03");

        let field = Field::split("x != 1").unwrap();
        assert_eq!(field.expression, "x != 1");

        let field = Field::split("name!r:>8").unwrap();
        assert_eq!(field.conversion, Some(Conversion::Repr));
        assert_eq!(field.spec, ">8");

        let field = Field::split("items[1:2]").unwrap();
        assert_eq!(field.expression, "items[1:2]");
    }

    #[test]
    fn test_resolve_paths() {
        let root = json!({
            "model": {
                "persons": [{"surname": "Mario"}, {"surname": "Paolo"}],
                "m": {"k": 1}
            }
        });
        assert_eq!(resolve(&root, "model.persons[1].surname").unwrap(), &json!("Paolo"));
        assert_eq!(resolve(&root, "model[m][k]").unwrap(), &json!(1));
        assert!(resolve(&root, "model.missing").is_err());
        assert!(resolve(&root, "nothing").is_err());
        assert!(resolve(&root, "model..x").is_err());
    }

    #[test]
    fn test_format_fields_end_to_end() {
        let root = json!({"model": {"name": "Pluto", "age": 42}});
        assert_eq!(
            format_fields("Hello {model.name} {model.age:03}!", &root).unwrap(),
            "Hello Pluto 042!"
        );
    }
}
