//! Variable declarations
//!
//! Everything between `<` and `>` in `<mtu:uint16 range[576:9216] show:"MTU">`: the declared type and
//! the constraints a token must satisfy to bind to the variable.

use crate::cvec::Cvec;
use crate::registry::{Expander, Translator, VarTypeHandler};
use crate::var::{CgVar, VarError, VarType};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A `regexp:"..."` constraint. The compiled form is anchored on both ends.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let compiled = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            compiled,
        })
    }

    /// The pattern as written in the grammar.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.compiled.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// `name("args")` expand function of a variable.
#[derive(Clone)]
pub struct ExpandBinding {
    pub name: String,
    pub args: Cvec,
    pub func: Arc<dyn Expander>,
}

impl fmt::Debug for ExpandBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpandBinding")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ExpandBinding {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.args == other.args
    }
}

/// `translate:name()` function of a variable.
#[derive(Clone)]
pub struct TranslateBinding {
    pub name: String,
    pub func: Arc<dyn Translator>,
}

impl fmt::Debug for TranslateBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslateBinding")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for TranslateBinding {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Declared type and constraints of a variable object.
///
/// Ranges are kept as two vectors of equal length: entry `i` of `range_low` and `range_high` form one
/// interval. A missing lower bound is an `empty` typed entry. On string-like types the intervals bound
/// the length of the text (`length[..]`), on numeric types the value itself (`range[..]`). A value
/// passes when it falls into any one interval.
#[derive(Clone)]
pub struct VarSpec {
    type_name: String,
    handler: Arc<dyn VarTypeHandler>,
    range_low: Cvec,
    range_high: Cvec,
    patterns: Vec<Pattern>,
    show: Option<String>,
    expand: Option<ExpandBinding>,
    translate: Option<TranslateBinding>,
    choices: Vec<String>,
    fraction_digits: Option<u8>,
}

impl VarSpec {
    pub fn new(handler: Arc<dyn VarTypeHandler>) -> Self {
        Self {
            type_name: handler.name().to_string(),
            handler,
            range_low: Cvec::new(),
            range_high: Cvec::new(),
            patterns: Vec::new(),
            show: None,
            expand: None,
            translate: None,
            choices: Vec::new(),
            fraction_digits: None,
        }
    }

    /// Type name as written in the grammar.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Payload type of matched values.
    pub fn base(&self) -> VarType {
        self.handler.base()
    }

    pub fn handler(&self) -> &Arc<dyn VarTypeHandler> {
        &self.handler
    }

    /// Add an interval. `low` of `None` means "no lower bound".
    pub fn add_range(&mut self, low: Option<CgVar>, high: CgVar) {
        self.range_low.push(low.unwrap_or_else(|| CgVar::new(VarType::Empty)));
        self.range_high.push(high);
    }

    /// `(low, high)` pairs; `low` is `None` when only an upper bound was given.
    pub fn ranges(&self) -> impl Iterator<Item = (Option<&CgVar>, &CgVar)> {
        self.range_low
            .iter()
            .zip(self.range_high.iter())
            .map(|(low, high)| ((low.ty() != VarType::Empty).then_some(low), high))
    }

    pub fn range_low(&self) -> &Cvec {
        &self.range_low
    }

    pub fn range_high(&self) -> &Cvec {
        &self.range_high
    }

    pub fn add_pattern(&mut self, source: &str) -> Result<(), regex::Error> {
        self.patterns.push(Pattern::new(source)?);
        Ok(())
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn show(&self) -> Option<&str> {
        self.show.as_deref()
    }

    pub fn set_show(&mut self, show: Option<&str>) {
        self.show = show.map(str::to_string);
    }

    pub fn expand(&self) -> Option<&ExpandBinding> {
        self.expand.as_ref()
    }

    pub fn set_expand(&mut self, expand: Option<ExpandBinding>) {
        self.expand = expand;
    }

    pub fn translate(&self) -> Option<&TranslateBinding> {
        self.translate.as_ref()
    }

    pub fn set_translate(&mut self, translate: Option<TranslateBinding>) {
        self.translate = translate;
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn set_choices(&mut self, choices: Vec<String>) {
        self.choices = choices;
    }

    pub fn fraction_digits(&self) -> Option<u8> {
        self.fraction_digits
    }

    pub fn set_fraction_digits(&mut self, digits: Option<u8>) {
        self.fraction_digits = digits;
    }

    /// Whether any constraint narrows the declared type.
    pub fn is_constrained(&self) -> bool {
        !self.range_high.is_empty() || !self.patterns.is_empty() || !self.choices.is_empty()
    }

    /// Same declared type. Two such variables at one level compete for the same tokens, whatever
    /// their constraints.
    pub fn equivalent(&self, other: &VarSpec) -> bool {
        self.type_name == other.type_name
    }

    fn same_constraints(&self, other: &VarSpec) -> bool {
        self.range_low == other.range_low
            && self.range_high == other.range_high
            && self.patterns == other.patterns
            && self.choices == other.choices
            && self.fraction_digits == other.fraction_digits
    }

    /// Parse `text` into a variable named `name`, then check the constraints.
    pub fn parse(&self, name: &str, text: &str) -> Result<CgVar, VarError> {
        let mut var = CgVar::named(name, self.base());
        if let Some(digits) = self.fraction_digits {
            var.set_fraction_digits(digits)?;
        }
        self.handler.parse(&mut var, text)?;
        self.validate(&var)?;
        Ok(var)
    }

    /// Check a candidate value against ranges, patterns and choices.
    pub fn validate(&self, var: &CgVar) -> Result<(), VarError> {
        self.check_ranges(var)?;
        let text = self.handler.format(var);
        if let Some(pattern) = self.patterns.iter().find(|p| !p.is_match(&text)) {
            return Err(VarError::PatternMismatch {
                value: text,
                pattern: pattern.source().to_string(),
            });
        }
        if !self.choices.is_empty() && !self.choices.iter().any(|c| *c == text) {
            return Err(VarError::NotAChoice {
                value: text,
                choices: self.choices.join("|"),
            });
        }
        Ok(())
    }

    /// `range[1:10]` / `length[8]` style text of every interval, space separated.
    pub fn describe_ranges(&self) -> String {
        let keyword = if self.base().is_string() { "length" } else { "range" };
        self.ranges()
            .map(|(low, high)| match low {
                Some(low) => format!("{}[{}:{}]", keyword, low, high),
                None => format!("{}[{}]", keyword, high),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn check_ranges(&self, var: &CgVar) -> Result<(), VarError> {
        if self.range_high.is_empty() {
            return Ok(());
        }
        let measured;
        let (subject, by_length) = if self.base().is_string() {
            let mut length = CgVar::new(VarType::Uint64);
            length.set_uint64(self.handler.format(var).chars().count() as u64)?;
            measured = length;
            (&measured, true)
        } else {
            (var, false)
        };
        let compare = |a: &CgVar, b: &CgVar| {
            if by_length {
                a.compare(b)
            } else {
                self.handler.compare(a, b)
            }
        };
        for (low, high) in self.ranges() {
            let above_low = match low {
                Some(low) => compare(subject, low)? != Ordering::Less,
                None => true,
            };
            if above_low && compare(subject, high)? != Ordering::Greater {
                return Ok(());
            }
        }
        Err(VarError::RangeViolation {
            value: self.handler.format(var),
            allowed: self.describe_ranges(),
        })
    }
}

impl fmt::Debug for VarSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarSpec")
            .field("type_name", &self.type_name)
            .field("range_low", &self.range_low)
            .field("range_high", &self.range_high)
            .field("patterns", &self.patterns)
            .field("show", &self.show)
            .field("expand", &self.expand)
            .field("translate", &self.translate)
            .field("choices", &self.choices)
            .field("fraction_digits", &self.fraction_digits)
            .finish()
    }
}

impl PartialEq for VarSpec {
    fn eq(&self, other: &Self) -> bool {
        self.equivalent(other)
            && self.same_constraints(other)
            && self.show == other.show
            && self.expand == other.expand
            && self.translate == other.translate
    }
}
