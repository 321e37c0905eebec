//! Grammar printing
//!
//! Renders compiled trees back as grammar text, and dumps their structure for debugging.
//!
//! Layout
//!
//!     An object with a single, non-empty child prints it on the same line. An object with several
//!     children opens a `{ ... }` block (`@{` for a sets tree), indented three spaces per level,
//!     and so does a sets tree or an object carrying flags or callbacks, whatever the number of
//!     children. A terminal object is followed by `;`.
//!
//!         show version;
//!         set mtu <mtu:uint16 range[576:9216]>;
//!         interface <name:string>;@{
//!            shutdown;
//!            mtu <m:uint16>;
//!         }
//!
//! Brief and full
//!
//!     Full output carries everything the compiler needs: variable types and qualifiers, help
//!     strings, flags and callbacks. Recompiling it gives a tree that accepts the same lines, though
//!     not the same text: groups such as `[a|b]` come back expanded.
//!
//!     Brief output is for people: variables print as `<name>` (or their `show` text, or `(a|b)`
//!     for choices), and help, flags and callbacks are left out.

use crate::compiling::lexing::escape;
use crate::grammar::Grammar;
use crate::object::{CgObj, ObjFlags, ObjKind};
use crate::parsetree::ParseTree;
use std::fmt::Write;

pub fn print_tree(tree: &ParseTree, brief: bool) -> String {
    let mut out = String::new();
    write_tree(&mut out, tree, 0, brief);
    out
}

/// One object followed by everything below it.
pub fn print_object(obj: &CgObj, brief: bool) -> String {
    let mut out = String::new();
    write_object(&mut out, obj, 0, brief);
    out
}

/// Every tree of `grammar`, each under its `treename` assignment, after the other assignments.
pub fn print_trees(grammar: &Grammar, brief: bool) -> String {
    let mut out = String::new();
    for var in grammar.globals() {
        match var.name() {
            Some("treename") | None => {}
            Some(name) => {
                let _ = writeln!(out, "{}=\"{}\";", name, escape(&var.to_text()));
            }
        }
    }
    for tree in grammar.trees() {
        if let Some(name) = tree.name() {
            let _ = writeln!(out, "treename=\"{}\";", escape(name));
        }
        write_tree(&mut out, tree, 0, brief);
    }
    out
}

fn write_tree(out: &mut String, tree: &ParseTree, margin: usize, brief: bool) {
    for obj in tree.iter().filter(|o| o.kind() != ObjKind::Empty) {
        pad(out, margin);
        write_object(out, obj, margin, brief);
    }
}

fn write_object(out: &mut String, obj: &CgObj, margin: usize, brief: bool) {
    match obj.kind() {
        ObjKind::Command => out.push_str(obj.text()),
        ObjKind::Reference => {
            out.push('@');
            out.push_str(obj.text());
        }
        ObjKind::Variable => out.push_str(&variable_syntax(obj, brief)),
        ObjKind::Empty => out.push(';'),
    }

    if !brief {
        if !obj.help().is_empty() {
            let _ = write!(out, "(\"{}\")", escape(&obj.help().join("\n")));
        }
        let flags = obj.flags();
        let both = ObjFlags::HIDE | ObjFlags::HIDE_DATABASE;
        if flags.contains(both) {
            out.push_str(", hide-database-auto-completion");
        } else if flags.contains(ObjFlags::HIDE) {
            out.push_str(", hide");
        } else if flags.contains(ObjFlags::HIDE_DATABASE) {
            out.push_str(", hide-database");
        }
        for callback in obj.callbacks() {
            let args: Vec<String> = callback.args().iter().map(|a| quoted(&a.to_text())).collect();
            let _ = write!(out, ", {}({})", callback.name(), args.join(","));
        }
    }

    if obj.is_terminal() {
        out.push(';');
    }

    let tree = obj.tree();
    let children = tree.iter().filter(|o| o.kind() != ObjKind::Empty).count();
    // After `, attr` the parser wants `;` or `{`, so such an object cannot run on into its child.
    let attrs = !brief && (!obj.flags().is_empty() || !obj.callbacks().is_empty());
    if children > 0 && (tree.len() > 1 || tree.sets() || attrs) {
        if tree.sets() {
            out.push('@');
        }
        out.push_str("{\n");
        write_tree(out, tree, margin + 3, brief);
        pad(out, margin);
        out.push_str("}\n");
    } else if let Some(child) = tree.get(0).filter(|_| children == 1) {
        out.push(' ');
        write_object(out, child, margin + 3, brief);
    } else {
        out.push('\n');
    }
}

/// `<name:type qualifiers...>` in full, `<name>`, `<show>` or `(a|b)` in brief. Other objects give
/// their display name.
pub fn variable_syntax(obj: &CgObj, brief: bool) -> String {
    let Some(spec) = obj.var() else {
        return obj.display_name();
    };
    if brief {
        return obj.display_name();
    }

    let mut out = format!("<{}:{}", obj.text(), spec.type_name());
    let ranges = spec.describe_ranges();
    if !ranges.is_empty() {
        out.push(' ');
        out.push_str(&ranges);
    }
    if let Some(show) = spec.show() {
        let _ = write!(out, " show:{}", quoted(show));
    }
    if let Some(expand) = spec.expand() {
        let args: Vec<String> = expand.args.iter().map(|a| quoted(&a.to_text())).collect();
        let _ = write!(out, " {}({})", expand.name, args.join(","));
    }
    for pattern in spec.patterns() {
        let _ = write!(out, " regexp:{}", quoted(pattern.source()));
    }
    if let Some(translate) = spec.translate() {
        let _ = write!(out, " translate:{}()", translate.name);
    }
    if !spec.choices().is_empty() {
        let choices: Vec<String> = spec.choices().iter().map(|c| word_or_quoted(c)).collect();
        let _ = write!(out, " choice:{}", choices.join("|"));
    }
    if let Some(digits) = spec.fraction_digits() {
        let _ = write!(out, " fraction-digits:{}", digits);
    }
    out.push('>');
    out
}

/// Indented structure listing, one line per tree and object.
pub fn dump_tree(tree: &ParseTree) -> String {
    let mut out = String::new();
    dump_tree_at(&mut out, tree, 0);
    out
}

pub fn dump_object(obj: &CgObj) -> String {
    let mut out = String::new();
    dump_object_at(&mut out, obj, 0);
    out
}

fn dump_tree_at(out: &mut String, tree: &ParseTree, indent: usize) {
    out.push_str(&"   ".repeat(indent));
    match tree.name() {
        Some(name) => {
            let _ = write!(out, "pt {} [{}]", name, tree.len());
        }
        None => {
            let _ = write!(out, "pt [{}]", tree.len());
        }
    }
    if tree.sets() {
        out.push_str(" SETS");
    }
    out.push('\n');
    for obj in tree {
        dump_object_at(out, obj, indent + 1);
    }
}

fn dump_object_at(out: &mut String, obj: &CgObj, indent: usize) {
    out.push_str(&"   ".repeat(indent));
    match obj.kind() {
        ObjKind::Command => out.push_str(&format!("co {}", obj.text())),
        ObjKind::Reference => out.push_str(&format!("co @{}", obj.text())),
        ObjKind::Variable => out.push_str(&format!("co <{}>", obj.text())),
        ObjKind::Empty => out.push_str("empty;"),
    }
    out.push('\n');
    if !obj.tree().is_empty() {
        dump_tree_at(out, obj.tree(), indent);
    }
}

fn pad(out: &mut String, margin: usize) {
    out.extend(std::iter::repeat(' ').take(margin));
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", escape(text))
}

/// Bare when the grammar lexer reads the text back as one word.
fn word_or_quoted(text: &str) -> String {
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|c| !c.is_whitespace() && !";,{}()[]<>|:=@\"#".contains(c));
    if plain {
        text.to_string()
    } else {
        quoted(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::DEFAULT_TREE;
    use crate::testing;

    fn main_tree(source: &str) -> ParseTree {
        testing::compile(source).tree(DEFAULT_TREE).unwrap().clone()
    }

    #[test]
    fn test_single_children_stay_inline() {
        let tree = main_tree("show version; set mtu <mtu:uint16>;");
        assert_eq!(print_tree(&tree, false), "show version;\nset mtu <mtu:uint16>;\n");
        assert_eq!(print_tree(&main_tree("a;"), false), "a;\n");
    }

    #[test]
    fn test_blocks() {
        let tree = main_tree(
            "show version; show clock detail; interface <name:string>; @{ shutdown; mtu <m:uint16>; }",
        );
        insta::assert_snapshot!(print_tree(&tree, false).trim_end(), @r###"
        show{
           version;
           clock detail;
        }
        interface <name:string>;@{
           shutdown;
           mtu <m:uint16>;
        }
        "###);
    }

    #[test]
    fn test_full_object_details() {
        let tree = main_tree(
            "secret(\"Do not \\\"touch\\\"\"), hide, cb(\"x\", \"y z\"); \
             db, hide-database; both, hide-database-auto-completion; @sub;\ntreename=\"sub\"; s;",
        );
        insta::assert_snapshot!(print_tree(&tree, false).trim_end(), @r###"
        secret("Do not \"touch\""), hide, cb("x","y z");
        db, hide-database;
        both, hide-database-auto-completion;
        @sub;
        "###);
    }

    #[test]
    fn test_variable_syntax() {
        let tree = main_tree(
            "v <n:int32 range[1:10] range[100] show:\"number\"> \
             <s:string length[2:8] regexp:\"[a-z]+\" translate:upper() list(\"a\")> \
             <c:string choice:red|\"dark blue\"> <d:decimal64 fraction-digits:3>;",
        );
        let n = &tree[0].tree()[0];
        let s = &n.tree()[0];
        let c = &s.tree()[0];
        let d = &c.tree()[0];
        assert_eq!(
            variable_syntax(n, false),
            "<n:int32 range[1:10] range[100] show:\"number\">"
        );
        assert_eq!(variable_syntax(n, true), "<number>");
        assert_eq!(
            variable_syntax(s, false),
            "<s:string length[2:8] list(\"a\") regexp:\"[a-z]+\" translate:upper()>"
        );
        assert_eq!(variable_syntax(s, true), "<s>");
        assert_eq!(variable_syntax(c, false), "<c:string choice:red|\"dark blue\">");
        assert_eq!(variable_syntax(c, true), "(red|dark blue)");
        assert_eq!(variable_syntax(d, false), "<d:decimal64 fraction-digits:3>");
    }

    #[test]
    fn test_brief_drops_details() {
        let tree = main_tree("show(\"Show\") <x:int32 range[1:2]>, cb();");
        assert_eq!(print_tree(&tree, true), "show <x>;\n");
        assert_eq!(print_object(&tree[0], false), "show(\"Show\") <x:int32 range[1:2]>, cb();\n");
    }

    #[test]
    fn test_print_trees_and_recompile() {
        let grammar = testing::compile("prompt=\"r> \";\nip @addr;\ntreename=\"addr\";\n(a|b);");
        let printed = print_trees(&grammar, false);
        insta::assert_snapshot!(printed.trim_end(), @r###"
        prompt="r> ";
        treename="main";
        ip @addr;
        treename="addr";
        a;
        b;
        "###);
        let again = testing::compile(&printed);
        assert_eq!(again.tree_names(), grammar.tree_names());
        assert_eq!(print_trees(&again, false), printed);
    }

    #[test]
    fn test_flagged_parents_open_blocks() {
        let grammar = testing::compile("show, hide { version; }\nset @{ mtu <m:uint16>; }");
        let printed = print_trees(&grammar, false);
        insta::assert_snapshot!(printed.trim_end(), @r###"
        treename="main";
        show, hide{
           version;
        }
        set@{
           mtu <m:uint16>;
        }
        "###);
        let again = testing::compile(&printed);
        assert_eq!(print_trees(&again, false), printed);
        let tree = again.tree(DEFAULT_TREE).unwrap();
        assert!(tree[0].is_hidden());
        assert!(tree[1].tree().sets());
        assert_eq!(print_tree(tree, true), "show version;\nset@{\n   mtu <m>;\n}\n");
    }

    #[test]
    fn test_dump() {
        let tree = main_tree("show version; set @{ a; b; }");
        insta::assert_snapshot!(dump_tree(&tree).trim_end(), @r###"
        pt main [2]
           co show
           pt [1]
              co version
              pt [1]
                 empty;
           co set
           pt [2] SETS
              co a
              pt [1]
                 empty;
              co b
              pt [1]
                 empty;
        "###);
        assert_eq!(
            dump_object(&tree[0].tree()[0]),
            "co version\npt [1]\n   empty;\n"
        );
    }
}
