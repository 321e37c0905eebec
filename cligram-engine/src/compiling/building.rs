//! Grammar building
//!
//! Turns parsed items into grammar trees.
//!
//! Each statement is first converted into shapes: prototype objects for keywords, variables and
//! references (with their registry lookups done and constraints checked), nested inside groups.
//! Groups then expand into every path they allow, alternation times optionality, and each path is
//! inserted into the current level:
//!
//!   - an object identical to one already at the level is merged with it (help from the first),
//!   - an object equivalent to an existing one, but not identical, is ambiguous,
//!   - anything else is appended in source order.
//!
//! The last object of a path is the statement's target. A `;` makes it terminal (an `Empty` child)
//! and binds the callbacks to it; a block is built below it. Callbacks on a block without `;` are
//! inherited by the terminals inside that declare none.
//!
//! References are checked once everything else is built, so a reference may precede the tree it
//! names.

use super::parsing::{Attr, Block, Element, Item, Qualifier, RangeKind, Statement, Term, VarDecl};
use super::{CompileError, CompileErrorKind};
use crate::cvec::Cvec;
use crate::grammar::{Grammar, DEFAULT_TREE};
use crate::object::{CallbackBinding, CgObj, ExpandBinding, ObjFlags, ObjKind, TranslateBinding, VarSpec};
use crate::parsetree::ParseTree;
use crate::registry::Registry;
use crate::var::{CgVar, VarType, MAX_FRACTION_DIGITS};
use std::cmp::Ordering;
use std::ops::Range;
use tracing::{debug, trace};

/// Build `items` into `grammar`.
pub fn build(
    registry: &Registry,
    grammar: &mut Grammar,
    source: &str,
    items: &[Item],
) -> Result<(), CompileError> {
    let mut builder = Builder {
        registry,
        source,
        references: Vec::new(),
    };
    let mut current = DEFAULT_TREE.to_string();

    for item in items {
        match item {
            Item::Assign { name, value, .. } => {
                if name == "treename" {
                    current = value.clone();
                }
                grammar.set_global(name, value);
            }
            Item::Statement(stmt) => {
                let tree = grammar.tree_or_insert(&current);
                let mut root = CgObj::command("");
                *root.tree_mut() = std::mem::take(tree);
                let result = builder.statement(&mut root, true, stmt, &[]);
                *tree = std::mem::take(root.tree_mut());
                result?;
            }
        }
    }

    builder.resolve(grammar)
}

/// An object ready to be inserted, with the source range it came from.
#[derive(Debug)]
struct Proto {
    obj: CgObj,
    span: Range<usize>,
}

#[derive(Debug)]
enum Shape {
    Node(Proto),
    Group { alts: Vec<Vec<Shape>>, optional: bool },
}

/// Every path through a sequence of shapes.
fn expand(shapes: &[Shape]) -> Vec<Vec<&Proto>> {
    let mut paths: Vec<Vec<&Proto>> = vec![Vec::new()];
    for shape in shapes {
        let tails: Vec<Vec<&Proto>> = match shape {
            Shape::Node(proto) => vec![vec![proto]],
            Shape::Group { alts, optional } => {
                let mut tails = if *optional { vec![Vec::new()] } else { Vec::new() };
                for alt in alts {
                    tails.extend(expand(alt));
                }
                tails
            }
        };
        paths = paths
            .iter()
            .flat_map(|head| {
                tails.iter().map(move |tail| {
                    let mut path = head.clone();
                    path.extend(tail.iter().copied());
                    path
                })
            })
            .collect();
    }
    paths
}

struct Builder<'a> {
    registry: &'a Registry,
    source: &'a str,
    /// Reference targets and where they were written.
    references: Vec<(String, usize)>,
}

impl<'a> Builder<'a> {
    fn error(&self, offset: usize, kind: CompileErrorKind) -> CompileError {
        CompileError::at(self.source, offset, kind)
    }

    fn items(
        &mut self,
        owner: &mut CgObj,
        items: &[Item],
        inherited: &[CallbackBinding],
    ) -> Result<(), CompileError> {
        for item in items {
            match item {
                Item::Assign { span, .. } => {
                    return Err(self.error(
                        span.start,
                        CompileErrorKind::Syntax(
                            "assignments are only allowed at top level".to_string(),
                        ),
                    ))
                }
                Item::Statement(stmt) => self.statement(owner, false, stmt, inherited)?,
            }
        }
        Ok(())
    }

    /// Build one statement below `owner`. At top level `owner` is a holder for the tree itself.
    fn statement(
        &mut self,
        owner: &mut CgObj,
        is_root: bool,
        stmt: &Statement,
        inherited: &[CallbackBinding],
    ) -> Result<(), CompileError> {
        let shapes = self.shapes(&stmt.terms)?;
        let (flags, callbacks) = self.attrs(&stmt.attrs)?;

        for path in expand(&shapes) {
            match path.split_first() {
                Some((first, rest)) => {
                    let target = self.place(owner.tree_mut(), first, rest)?;
                    self.finish(target, stmt, flags, &callbacks, inherited)?;
                }
                None if is_root => {
                    if !callbacks.is_empty() || stmt.block.is_some() || !flags.is_empty() {
                        return Err(self.error(
                            stmt.end,
                            CompileErrorKind::Syntax(
                                "an empty top-level command cannot carry callbacks, flags or a block"
                                    .to_string(),
                            ),
                        ));
                    }
                }
                None => self.finish(owner, stmt, flags, &callbacks, inherited)?,
            }
        }
        Ok(())
    }

    /// Insert a path below `tree`, returning its last object.
    fn place<'t>(
        &mut self,
        tree: &'t mut ParseTree,
        first: &Proto,
        rest: &[&Proto],
    ) -> Result<&'t mut CgObj, CompileError> {
        if first.obj.kind() == ObjKind::Reference && !rest.is_empty() {
            return Err(self.error(
                first.span.start,
                CompileErrorKind::Syntax(format!(
                    "reference `@{}` must end its command",
                    first.obj.text()
                )),
            ));
        }
        let i = self.merge_or_push(tree, first)?;
        let obj = &mut tree[i];
        match rest.split_first() {
            None => Ok(obj),
            Some((next, tail)) => self.place(obj.tree_mut(), next, tail),
        }
    }

    fn merge_or_push(&mut self, tree: &mut ParseTree, proto: &Proto) -> Result<usize, CompileError> {
        for i in 0..tree.len() {
            let obj = &mut tree[i];
            if obj.kind() == ObjKind::Empty {
                continue;
            }
            if obj.identical(&proto.obj) {
                if obj.help().is_empty() && !proto.obj.help().is_empty() {
                    obj.set_help(proto.obj.help().to_vec());
                }
                trace!(object = %obj.display_name(), "merged with existing object");
                return Ok(i);
            }
            if obj.equivalent(&proto.obj) {
                let message = format!(
                    "`{}` and `{}` accept the same input at one level",
                    proto.obj.display_name(),
                    obj.display_name()
                );
                return Err(self.error(proto.span.start, CompileErrorKind::AmbiguousGrammar(message)));
            }
        }
        if proto.obj.kind() == ObjKind::Reference {
            self.references
                .push((proto.obj.text().to_string(), proto.span.start));
        }
        tree.push(proto.obj.clone());
        Ok(tree.len() - 1)
    }

    /// Apply the statement's end (`;`, flags, callbacks, block) to the object a path ended at.
    fn finish(
        &mut self,
        target: &mut CgObj,
        stmt: &Statement,
        flags: ObjFlags,
        callbacks: &[CallbackBinding],
        inherited: &[CallbackBinding],
    ) -> Result<(), CompileError> {
        let mut merged = target.flags();
        merged.insert(flags);
        target.set_flags(merged);

        if stmt.terminated {
            if target.is_terminal() {
                let message = format!(
                    "the command ending at `{}` is defined more than once",
                    target.display_name()
                );
                return Err(self.error(stmt.end, CompileErrorKind::AmbiguousGrammar(message)));
            }
            target.tree_mut().push(CgObj::empty());
            let bound = if callbacks.is_empty() { inherited } else { callbacks };
            target.set_callbacks(bound.to_vec());
        }

        if let Some(block) = &stmt.block {
            self.block(target, stmt, block, callbacks, inherited)?;
        }
        Ok(())
    }

    fn block(
        &mut self,
        target: &mut CgObj,
        stmt: &Statement,
        block: &Block,
        callbacks: &[CallbackBinding],
        inherited: &[CallbackBinding],
    ) -> Result<(), CompileError> {
        if target.kind() == ObjKind::Reference {
            return Err(self.error(
                stmt.end,
                CompileErrorKind::Syntax(format!(
                    "reference `@{}` cannot open a block",
                    target.text()
                )),
            ));
        }
        if block.sets {
            target.tree_mut().set_sets(true);
        }
        let inherit = if !stmt.terminated && !callbacks.is_empty() {
            callbacks
        } else {
            inherited
        };
        self.items(target, &block.items, inherit)
    }

    fn shapes(&self, terms: &[Term]) -> Result<Vec<Shape>, CompileError> {
        terms.iter().map(|term| self.shape(term)).collect()
    }

    fn shape(&self, term: &Term) -> Result<Shape, CompileError> {
        let mut obj = match &term.element {
            Element::Keyword(text) => CgObj::command(text),
            Element::Reference(target) => CgObj::reference(target),
            Element::Variable(decl) => CgObj::variable(&decl.name, self.var_spec(decl, term.span.start)?),
            Element::Group { alts, optional } => {
                let alts = alts
                    .iter()
                    .map(|alt| self.shapes(alt))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Shape::Group {
                    alts,
                    optional: *optional,
                });
            }
        };
        if let Some(help) = &term.help {
            obj.set_help(help.split('\n').map(str::to_string).collect());
        }
        Ok(Shape::Node(Proto {
            obj,
            span: term.span.clone(),
        }))
    }

    fn var_spec(&self, decl: &VarDecl, offset: usize) -> Result<VarSpec, CompileError> {
        let type_name = decl.type_name.as_deref().unwrap_or(&decl.name);
        let handler = self
            .registry
            .var_type(type_name)
            .ok_or_else(|| self.error(offset, CompileErrorKind::UnknownType(type_name.to_string())))?;
        let base = handler.base();
        let mut spec = VarSpec::new(handler);

        // Bounds of a decimal64 depend on its fraction digits, wherever they are written.
        for qualifier in &decl.qualifiers {
            if let Qualifier::FractionDigits { digits, span } = qualifier {
                if base != VarType::Decimal64 {
                    return Err(self.error(
                        span.start,
                        CompileErrorKind::InvalidValue(format!(
                            "fraction-digits only applies to decimal64, not `{}`",
                            type_name
                        )),
                    ));
                }
                let parsed = digits
                    .parse::<u8>()
                    .ok()
                    .filter(|d| (1..=MAX_FRACTION_DIGITS).contains(d))
                    .ok_or_else(|| {
                        self.error(
                            span.start,
                            CompileErrorKind::InvalidValue(format!(
                                "fraction-digits must be between 1 and {}, got `{}`",
                                MAX_FRACTION_DIGITS, digits
                            )),
                        )
                    })?;
                spec.set_fraction_digits(Some(parsed));
            }
        }

        for qualifier in &decl.qualifiers {
            match qualifier {
                Qualifier::Range {
                    kind,
                    low,
                    high,
                    span,
                } => {
                    let bound_type = match kind {
                        RangeKind::Range if base.is_numeric() => base,
                        RangeKind::Length if base.is_string() => VarType::Uint64,
                        RangeKind::Range => {
                            return Err(self.error(
                                span.start,
                                CompileErrorKind::InvalidRange(format!(
                                    "range[] needs a numeric type, `{}` is not",
                                    type_name
                                )),
                            ))
                        }
                        RangeKind::Length => {
                            return Err(self.error(
                                span.start,
                                CompileErrorKind::InvalidRange(format!(
                                    "length[] needs a string type, `{}` is not",
                                    type_name
                                )),
                            ))
                        }
                    };
                    let digits = spec.fraction_digits();
                    let low = low
                        .as_deref()
                        .map(|text| self.bound(bound_type, digits, text, span.start))
                        .transpose()?;
                    let high = self.bound(bound_type, digits, high, span.start)?;
                    if let Some(low) = &low {
                        if low.compare(&high) == Ok(Ordering::Greater) {
                            return Err(self.error(
                                span.start,
                                CompileErrorKind::InvalidRange(format!(
                                    "lower bound {} is greater than upper bound {}",
                                    low, high
                                )),
                            ));
                        }
                    }
                    spec.add_range(low, high);
                }
                Qualifier::Show(text) => spec.set_show(Some(text.as_str())),
                Qualifier::Regexp { pattern, span } => {
                    spec.add_pattern(pattern).map_err(|e| {
                        self.error(span.start, CompileErrorKind::InvalidRegex(e.to_string()))
                    })?;
                }
                Qualifier::Translate { name, span } => {
                    let func = self.registry.translator(name).ok_or_else(|| {
                        self.error(span.start, CompileErrorKind::UnknownCallback(name.clone()))
                    })?;
                    spec.set_translate(Some(TranslateBinding {
                        name: name.clone(),
                        func,
                    }));
                }
                Qualifier::Choice(choices) => {
                    for choice in choices {
                        let mut parsed = CgVar::new(base);
                        spec.handler().parse(&mut parsed, choice).map_err(|e| {
                            self.error(offset, CompileErrorKind::InvalidValue(e.to_string()))
                        })?;
                    }
                    spec.set_choices(choices.clone());
                }
                Qualifier::FractionDigits { .. } => {}
                Qualifier::Expand { name, args, span } => {
                    let func = self.registry.expander(name).ok_or_else(|| {
                        self.error(span.start, CompileErrorKind::UnknownCallback(name.clone()))
                    })?;
                    spec.set_expand(Some(ExpandBinding {
                        name: name.clone(),
                        args: string_args(args),
                        func,
                    }));
                }
            }
        }
        Ok(spec)
    }

    fn bound(
        &self,
        ty: VarType,
        fraction_digits: Option<u8>,
        text: &str,
        offset: usize,
    ) -> Result<CgVar, CompileError> {
        let mut var = CgVar::new(ty);
        let result = match fraction_digits {
            Some(digits) if ty == VarType::Decimal64 => var.set_fraction_digits(digits),
            _ => Ok(()),
        };
        result.and_then(|()| var.parse(text)).map_err(|e| {
            self.error(
                offset,
                CompileErrorKind::InvalidRange(format!("bad bound `{}`: {}", text, e)),
            )
        })?;
        Ok(var)
    }

    fn attrs(&self, attrs: &[Attr]) -> Result<(ObjFlags, Vec<CallbackBinding>), CompileError> {
        let mut flags = ObjFlags::NONE;
        let mut callbacks = Vec::new();
        for attr in attrs {
            match attr {
                Attr::Hide => flags.insert(ObjFlags::HIDE),
                Attr::HideDatabase => flags.insert(ObjFlags::HIDE_DATABASE),
                Attr::HideDatabaseAutoCompletion => {
                    flags.insert(ObjFlags::HIDE | ObjFlags::HIDE_DATABASE)
                }
                Attr::Callback { name, args, span } => {
                    let func = self.registry.callback(name).ok_or_else(|| {
                        self.error(span.start, CompileErrorKind::UnknownCallback(name.clone()))
                    })?;
                    callbacks.push(CallbackBinding::new(name, string_args(args), func));
                }
            }
        }
        Ok((flags, callbacks))
    }

    fn resolve(&self, grammar: &Grammar) -> Result<(), CompileError> {
        for (name, offset) in &self.references {
            grammar.resolve(name).map_err(|_| {
                self.error(*offset, CompileErrorKind::UnresolvedReference(name.clone()))
            })?;
        }
        debug!(references = self.references.len(), "resolved references");
        Ok(())
    }
}

fn string_args(args: &[String]) -> Cvec {
    args.iter().map(|a| CgVar::string(None, a)).collect()
}
