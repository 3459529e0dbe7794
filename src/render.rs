use crate::error::Result;
use crate::fs_utils::read_file_contents;
use crate::parser::{Node, Template, parse};
use crate::path::{Scope, is_truthy, write_value};
use serde_json::Value;
use std::borrow::Cow;
use std::iter::Enumerate;
use std::path::Path;
use std::slice;

impl Template {
    /// Renders this template against a context. Missing data never fails.
    pub fn render(&self, context: &Value) -> String {
        evaluate(self, context)
    }
}

/// Evaluates a parsed template against a context and returns the resolved document.
///
/// Absent paths render as empty text and count as falsy; `{{#each}}` over anything
/// that is not an array produces no output. Nesting depth is tracked on a heap
/// work stack, so deeply nested templates cannot exhaust the call stack.
pub fn evaluate(template: &Template, context: &Value) -> String {
    let mut out = String::new();
    let mut work = vec![Work::Nodes {
        nodes: template.nodes().iter(),
        scope: Scope::root(context),
    }];

    while let Some(top) = work.last_mut() {
        match top {
            Work::Nodes { nodes, scope } => {
                let scope = *scope;
                let Some(node) = nodes.next() else {
                    work.pop();
                    continue;
                };
                match node {
                    Node::Text(text) => out.push_str(text),
                    Node::Variable(path) => write_value(&mut out, scope.resolve(path).as_deref()),
                    Node::If { path, body } => {
                        if is_truthy(scope.resolve(path).as_deref()) {
                            work.push(Work::Nodes {
                                nodes: body.iter(),
                                scope,
                            });
                        }
                    }
                    Node::Each { path, body } => {
                        if let Some(Cow::Borrowed(Value::Array(items))) = scope.resolve(path) {
                            work.push(Work::Each {
                                body,
                                items: items.iter().enumerate(),
                            });
                        }
                    }
                }
            }
            Work::Each { body, items } => {
                let body = *body;
                match items.next() {
                    Some((index, item)) => work.push(Work::Nodes {
                        nodes: body.iter(),
                        scope: Scope::iteration(item, index),
                    }),
                    None => {
                        work.pop();
                    }
                }
            }
        }
    }

    out
}

/// Pending evaluation: the rest of a node list, or the remaining iterations of a loop
enum Work<'n, 'v> {
    Nodes {
        nodes: slice::Iter<'n, Node>,
        scope: Scope<'v>,
    },
    Each {
        body: &'n [Node],
        items: Enumerate<slice::Iter<'v, Value>>,
    },
}

/// Parses and renders a template string in one step
///
/// # Errors
///
/// Returns the parse error; no partial output is produced for a broken template.
pub fn render(template: &str, context: &Value) -> Result<String> {
    Ok(parse(template)?.render(context))
}

/// Reads a template file and renders it
///
/// # Errors
///
/// - `DocfillError::FileNotFound` if the template file doesn't exist.
/// - Parse errors from `parse`.
pub fn render_file(template_path: &Path, context: &Value) -> Result<String> {
    let template = read_file_contents(template_path)?;
    render(&template, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocfillError;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_passthrough_without_directives() {
        for source in ["", "plain text", "single { brace } and }} closers", "£ and ünïcode"] {
            assert_eq!(render(source, &json!({"a": 1})).unwrap(), source);
        }
    }

    #[test]
    fn test_nested_if_inside_each() {
        let context = json!({"items": [{"flag": true}, {"flag": false}, {"flag": true}]});
        let output = render("{{#each items}}{{#if flag}}X{{/if}}{{/each}}", &context).unwrap();
        assert_eq!(output, "XX");
    }

    #[test]
    fn test_missing_paths_are_silent() {
        assert_eq!(render("{{#if missing}}Y{{/if}}", &json!({})).unwrap(), "");
        assert_eq!(render("Hello {{name}}", &json!({})).unwrap(), "Hello ");
        assert_eq!(render("[{{a.b.c}}]", &json!({"a": null})).unwrap(), "[]");
    }

    #[test]
    fn test_each_over_non_array() {
        assert_eq!(render("{{#each x}}A{{/each}}", &json!({"x": 5})).unwrap(), "");
        assert_eq!(render("{{#each x}}A{{/each}}", &json!({"x": {"k": 1}})).unwrap(), "");
        assert_eq!(render("{{#each x}}A{{/each}}", &json!({})).unwrap(), "");
    }

    #[test]
    fn test_appliance_quote() {
        let template = "{{#each appliances}}{{name}}: {{cost}} {{/each}}{{#if boilerCost}}Boiler: {{boilerCost}}{{/if}}";
        let context = json!({
            "appliances": [{"name": "Washer", "cost": "£8.50"}],
            "boilerCost": "£24.99"
        });
        assert_eq!(
            render(template, &context).unwrap(),
            "Washer: £8.50 Boiler: £24.99"
        );
    }

    #[test]
    fn test_no_boiler_cover_omits_section() {
        let template = "Total{{#if boilerCost}} incl. boiler {{boilerCost}}{{/if}}.";
        assert_eq!(render(template, &json!({})).unwrap(), "Total.");
        assert_eq!(render(template, &json!({"boilerCost": ""})).unwrap(), "Total.");
    }

    #[test]
    fn test_each_scope_has_no_parent_fallback() {
        let context = json!({"currency": "GBP", "items": [{"name": "Oven"}]});
        let output = render("{{#each items}}{{name}}({{currency}}){{/each}}", &context).unwrap();
        assert_eq!(output, "Oven()");
    }

    #[test]
    fn test_each_index_and_this() {
        let context = json!({"names": ["a", "b", "c"]});
        let output = render("{{#each names}}{{@index}}={{this}};{{/each}}", &context).unwrap();
        assert_eq!(output, "0=a;1=b;2=c;");

        let context = json!({"rows": [{"v": 1}, {"v": 2}]});
        let output = render("{{#each rows}}{{#if @index}}, {{/if}}{{v}}{{/each}}", &context).unwrap();
        assert_eq!(output, "1, 2");
    }

    #[test]
    fn test_nested_each() {
        let context = json!({
            "customers": [
                {"name": "Ann", "sales": [{"id": 1}, {"id": 2}]},
                {"name": "Bob", "sales": []}
            ]
        });
        let template = "{{#each customers}}{{name}}:{{#each sales}}#{{id}}{{/each}}{{#if sales}}!{{/if}} {{/each}}";
        assert_eq!(render(template, &context).unwrap(), "Ann:#1#2! Bob: ");
    }

    #[test]
    fn test_scalar_formatting() {
        let context = json!({"n": 3, "f": 2.5, "t": true, "z": 0, "nil": null});
        let output = render("{{n}}|{{f}}|{{t}}|{{z}}|{{nil}}", &context).unwrap();
        assert_eq!(output, "3|2.5|true|0|");
    }

    #[test]
    fn test_parsed_template_is_reusable() {
        let template = parse("Dear {{customer.name}},").unwrap();
        assert_eq!(template.render(&json!({"customer": {"name": "Ann"}})), "Dear Ann,");
        assert_eq!(template.render(&json!({"customer": {"name": "Bob"}})), "Dear Bob,");
        assert_eq!(evaluate(&template, &json!({})), "Dear ,");
    }

    #[test]
    fn test_parallel_renders_share_tree() {
        let template = parse("{{#each xs}}{{this}}{{/each}}").unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let template = &template;
                    s.spawn(move || template.render(&json!({"xs": [i, i]})))
                })
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                assert_eq!(handle.join().unwrap(), format!("{i}{i}"));
            }
        });
    }

    #[test]
    fn test_deep_nesting_renders_without_recursion() {
        let depth = 100_000;
        let source = format!("{}x{}", "{{#if a}}".repeat(depth), "{{/if}}".repeat(depth));
        let template = parse(&source).unwrap();
        assert_eq!(template.render(&json!({"a": true})), "x");
        assert_eq!(template.render(&json!({"a": false})), "");
        drop(template);

        let source = format!(
            "{}{{{{this}}}}{}",
            "{{#each this}}".repeat(depth),
            "{{/each}}".repeat(depth)
        );
        let mut context = json!("leaf");
        for _ in 0..3 {
            context = json!([context]);
        }
        assert_eq!(render(&source, &context).unwrap(), "");
    }

    #[test]
    fn test_parse_error_yields_no_output() {
        let result = render("Hello {{name}} {{#if a}}", &json!({"name": "x"}));
        assert!(matches!(result, Err(DocfillError::UnmatchedDirective { .. })));
    }

    #[test]
    fn test_render_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("quote.txt");
        fs::write(&file, "Quote for {{customer}}").unwrap();

        let output = render_file(&file, &json!({"customer": "Ann"})).unwrap();
        assert_eq!(output, "Quote for Ann");

        let missing = temp_dir.path().join("missing.txt");
        let result = render_file(&missing, &json!({}));
        assert!(matches!(result, Err(DocfillError::FileNotFound { .. })));
    }
}
