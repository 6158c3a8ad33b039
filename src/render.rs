//! Template rendering.
//!
//! Page templates use a Mustache-compatible subset, which is what site
//! authors already write:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `{{ page.title }}` | HTML-escaped value; dotted names walk nested objects |
//! | `{{{ page.body }}}`, `{{& page.body }}` | unescaped value |
//! | `{{# items }} … {{/ items }}` | section: once per array element, once for a truthy value |
//! | `{{^ items }} … {{/ items }}` | inverted section: only when the value is falsy |
//! | `{{.}}` | the current value inside a section |
//! | `{{! note }}` | comment |
//!
//! Rendering is permissive and infallible. A name that does not resolve
//! renders as nothing, an unclosed `{{` is kept as literal text, an unclosed
//! section runs to the end of the template, and a stray close tag is ignored.
//! Partials (`{{> name}}`) and delimiter changes (`{{=<% %>=}}`) are not
//! supported and render as nothing.
//!
//! [`render`] is a pure function of its two inputs: no I/O, no caching, no
//! shared state, so it can run on any worker thread.

use crate::model::Page;
use serde_json::{Value, json};

/// Expand `template` against `context`.
pub fn render(template: &str, context: &Value) -> String {
    let nodes = parse(template);
    let mut out = String::with_capacity(template.len());
    let mut stack = vec![context];
    render_nodes(&nodes, &mut stack, &mut out);
    out
}

/// The context a page template is rendered against.
///
/// ```text
/// { "page": { "title": …, "body": …, "path": "/a/b.html" } }
/// ```
pub fn page_context(page: &Page) -> Value {
    json!({
        "page": {
            "title": page.title,
            "body": page.body,
            "path": page.path.as_str(),
        }
    })
}

#[derive(Debug, PartialEq)]
enum Node<'a> {
    Text(&'a str),
    Var {
        name: &'a str,
        escape: bool,
    },
    Section {
        name: &'a str,
        inverted: bool,
        children: Vec<Node<'a>>,
    },
}

/// An open section while parsing.
struct Frame<'a> {
    name: &'a str,
    inverted: bool,
    children: Vec<Node<'a>>,
}

fn parse(template: &str) -> Vec<Node<'_>> {
    let mut root: Vec<Node<'_>> = Vec::new();
    let mut open: Vec<Frame<'_>> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            push(&mut root, &mut open, Node::Text(&rest[..start]));
        }
        let after = &rest[start..];

        let (tag, consumed) = if after.starts_with("{{{") {
            match after[3..].find("}}}") {
                Some(end) => (Tag::Raw(after[3..3 + end].trim()), 3 + end + 3),
                None => {
                    push(&mut root, &mut open, Node::Text(after));
                    rest = "";
                    break;
                }
            }
        } else {
            match after[2..].find("}}") {
                Some(end) => (Tag::classify(after[2..2 + end].trim()), 2 + end + 2),
                None => {
                    push(&mut root, &mut open, Node::Text(after));
                    rest = "";
                    break;
                }
            }
        };
        rest = &after[consumed..];

        match tag {
            Tag::Escaped(name) => push(&mut root, &mut open, Node::Var { name, escape: true }),
            Tag::Raw(name) => push(&mut root, &mut open, Node::Var { name, escape: false }),
            Tag::Open { name, inverted } => open.push(Frame {
                name,
                inverted,
                children: Vec::new(),
            }),
            Tag::Close(name) => {
                if open.iter().any(|f| f.name == name) {
                    // Closes the named section and any unclosed sections inside it.
                    while let Some(frame) = open.pop() {
                        let done = frame.name == name;
                        close(&mut root, &mut open, frame);
                        if done {
                            break;
                        }
                    }
                }
            }
            Tag::Ignored => {}
        }
    }

    if !rest.is_empty() {
        push(&mut root, &mut open, Node::Text(rest));
    }
    while let Some(frame) = open.pop() {
        close(&mut root, &mut open, frame);
    }
    root
}

fn push<'a>(root: &mut Vec<Node<'a>>, open: &mut [Frame<'a>], node: Node<'a>) {
    match open.last_mut() {
        Some(frame) => frame.children.push(node),
        None => root.push(node),
    }
}

fn close<'a>(root: &mut Vec<Node<'a>>, open: &mut [Frame<'a>], frame: Frame<'a>) {
    let node = Node::Section {
        name: frame.name,
        inverted: frame.inverted,
        children: frame.children,
    };
    push(root, open, node);
}

enum Tag<'a> {
    Escaped(&'a str),
    Raw(&'a str),
    Open { name: &'a str, inverted: bool },
    Close(&'a str),
    Ignored,
}

impl<'a> Tag<'a> {
    fn classify(content: &'a str) -> Self {
        let mut chars = content.chars();
        match chars.next() {
            Some('!') | Some('>') | Some('=') => Tag::Ignored,
            Some('&') => Tag::Raw(chars.as_str().trim()),
            Some('#') => Tag::Open {
                name: chars.as_str().trim(),
                inverted: false,
            },
            Some('^') => Tag::Open {
                name: chars.as_str().trim(),
                inverted: true,
            },
            Some('/') => Tag::Close(chars.as_str().trim()),
            _ => Tag::Escaped(content),
        }
    }
}

fn render_nodes<'v>(nodes: &[Node<'_>], stack: &mut Vec<&'v Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { name, escape } => {
                if let Some(value) = lookup(stack, name) {
                    let text = display(value);
                    if *escape {
                        escape_html(&text, out);
                    } else {
                        out.push_str(&text);
                    }
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = lookup(stack, name);
                let truthy = value.is_some_and(is_truthy);
                if *inverted {
                    if !truthy {
                        render_nodes(children, stack, out);
                    }
                    continue;
                }
                let Some(value) = value.filter(|v| is_truthy(v)) else {
                    continue;
                };
                match value {
                    Value::Array(items) => {
                        for item in items {
                            stack.push(item);
                            render_nodes(children, stack, out);
                            stack.pop();
                        }
                    }
                    other => {
                        stack.push(other);
                        render_nodes(children, stack, out);
                        stack.pop();
                    }
                }
            }
        }
    }
}

/// Resolve a (possibly dotted) name against the context stack.
///
/// The first segment is searched from the innermost context outwards; the
/// remaining segments walk down from wherever it was found.
fn lookup<'v>(stack: &[&'v Value], name: &str) -> Option<&'v Value> {
    if name == "." {
        return stack.last().copied();
    }
    let mut segments = name.split('.');
    let first = segments.next()?;
    let mut value = stack.iter().rev().find_map(|ctx| ctx.get(first))?;
    for segment in segments {
        value = value.get(segment)?;
    }
    Some(value)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
