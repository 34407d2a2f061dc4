//! Literal-anchor templates with typed placeholders
//!
//! A template is plain text with `{...}` placeholders, e.g.
//! `"Step Size: {size:>e} s, Total Time: {time:>f} s"`. Literal text must match
//! exactly (case-sensitive); placeholders capture a typed value.
//!
//! # Placeholder syntax
//!
//! `{[name][:[>][type]]}` where
//! - `name` is optional; unnamed fields are addressed by position
//! - `>` marks a right-aligned field, which may be preceded by padding blanks
//! - `type` is `f` (fixed-point), `e` (scientific) or empty (string)
//!
//! Strings are matched lazily and never cross a line break. A literal `\n`
//! in the template also accepts `\r\n`.

use regex::Regex;
use thiserror::Error;

/// Optional sign, digits with optional fraction (`3.`, `.5`), optional exponent.
///
/// Fixed-point and scientific fields share this grammar so a value the solver
/// prints in the other notation still matches.
const NUMBER: &str = r"[-+]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][-+]?[0-9]+)?";

const STRING: &str = r"[^\r\n]+?";

const PADDING: &str = r"[ \t]*";

/// Template compilation errors.
#[derive(Debug, Error)]
pub enum PatternError {
    /// A `{` without a matching `}`.
    #[error("unclosed placeholder starting at byte {position}")]
    UnclosedPlaceholder {
        /// Byte offset of the opening brace
        position: usize,
    },

    /// A placeholder type other than `f`, `e` or empty.
    #[error("unknown placeholder type '{spec}'")]
    UnknownType {
        /// Format spec as written after the colon
        spec: String,
    },

    /// The generated expression was rejected by the regex engine.
    #[error("anchor template rejected: {0}")]
    Regex(#[from] regex::Error),
}

/// Value type a placeholder captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Decimal number without required exponent
    FixedPoint,
    /// Decimal number in exponent notation
    Scientific,
    /// Free text up to the next literal
    Text,
}

#[derive(Debug, Clone)]
struct Field {
    name: Option<String>,
    kind: FieldKind,
}

/// A compiled anchor template.
#[derive(Debug, Clone)]
pub struct AnchorPattern {
    template: String,
    fields: Vec<Field>,
    regex: Regex,
}

impl AnchorPattern {
    /// Compile a template into a matcher.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for an unclosed brace or an unknown field type.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let mut expr = String::with_capacity(template.len() * 2);
        let mut fields = Vec::new();
        let mut literal = String::new();
        let mut rest = template;
        let mut offset = 0;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            push_literal(&mut expr, &literal);
            literal.clear();

            let after = &rest[open + 1..];
            let close = after.find('}').ok_or(PatternError::UnclosedPlaceholder {
                position: offset + open,
            })?;
            let (field, padded) = parse_field(&after[..close])?;
            if padded {
                expr.push_str(PADDING);
            }
            expr.push('(');
            expr.push_str(match field.kind {
                FieldKind::FixedPoint | FieldKind::Scientific => NUMBER,
                FieldKind::Text => STRING,
            });
            expr.push(')');
            fields.push(field);

            let consumed = open + 1 + close + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }
        literal.push_str(rest);
        push_literal(&mut expr, &literal);

        Ok(Self {
            template: template.to_string(),
            fields,
            regex: Regex::new(&expr)?,
        })
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// First match anywhere in `text`.
    pub fn search<'t>(&self, text: &'t str) -> Option<AnchorMatch<'_, 't>> {
        self.regex.captures(text).map(|caps| self.to_match(&caps))
    }

    /// Every non-overlapping match in document order.
    pub fn find_all<'p, 't>(&'p self, text: &'t str) -> impl Iterator<Item = AnchorMatch<'p, 't>> + 'p
    where
        't: 'p,
    {
        self.regex
            .captures_iter(text)
            .map(move |caps| self.to_match(&caps))
    }

    fn to_match<'t>(&self, caps: &regex::Captures<'t>) -> AnchorMatch<'_, 't> {
        let values = (1..=self.fields.len())
            .map(|i| caps.get(i).map_or("", |m| m.as_str()))
            .collect();
        AnchorMatch {
            fields: &self.fields,
            values,
        }
    }
}

/// Split a placeholder body into its field and right-alignment flag.
fn parse_field(body: &str) -> Result<(Field, bool), PatternError> {
    let (name, spec) = body.split_once(':').unwrap_or((body, ""));
    let padded = spec.starts_with('>');
    let ty = spec.strip_prefix('>').unwrap_or(spec);
    let kind = match ty {
        "f" => FieldKind::FixedPoint,
        "e" => FieldKind::Scientific,
        "" => FieldKind::Text,
        _ => {
            return Err(PatternError::UnknownType {
                spec: spec.to_string(),
            })
        }
    };
    let field = Field {
        name: (!name.is_empty()).then(|| name.to_string()),
        kind,
    };
    Ok((field, padded))
}

fn push_literal(expr: &mut String, literal: &str) {
    for (i, line) in literal.split('\n').enumerate() {
        if i > 0 {
            expr.push_str(r"\r?\n");
        }
        expr.push_str(&regex::escape(line));
    }
}

/// One match of an [`AnchorPattern`].
#[derive(Debug, Clone)]
pub struct AnchorMatch<'p, 't> {
    fields: &'p [Field],
    values: Vec<&'t str>,
}

impl<'t> AnchorMatch<'_, 't> {
    /// Raw captured text of the field at `index`.
    pub fn raw(&self, index: usize) -> Option<&'t str> {
        self.values.get(index).copied()
    }

    /// Numeric value of the field at `index`.
    pub fn float_at(&self, index: usize) -> Option<f64> {
        let field = self.fields.get(index)?;
        if field.kind == FieldKind::Text {
            return None;
        }
        self.raw(index)?.parse().ok()
    }

    /// Numeric value of the named field.
    pub fn float(&self, name: &str) -> Option<f64> {
        self.float_at(self.index_of(name)?)
    }

    /// Text of the named field.
    pub fn text(&self, name: &str) -> Option<&'t str> {
        self.raw(self.index_of(name)?)
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
    }
}
