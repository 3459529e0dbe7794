//! # docfill
//!
//! A small template interpreter for generated business documents (quotes, receipts,
//! customer emails). Templates mix literal text with three directive forms, rendered
//! against JSON data:
//!
//! - `{{path}}` interpolates a value found by a dotted path such as `sale.customer.email`
//! - `{{#each path}} ... {{/each}}` repeats its body once per array element
//! - `{{#if path}} ... {{/if}}` emits its body only when the value is truthy
//!
//! Blocks nest to any depth and are paired structurally, so a conditional inside a
//! loop, or an `if` inside another `if`, always closes where it should.
//!
//! Broken markup is an error; missing data is not. A missing field renders as empty
//! text and counts as false.
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```
//! use serde_json::json;
//!
//! let template = "{{#each appliances}}{{name}}: {{cost}} {{/each}}\
//!                 {{#if boilerCost}}Boiler: {{boilerCost}}{{/if}}";
//! let context = json!({
//!     "appliances": [{"name": "Washer", "cost": "£8.50"}],
//!     "boilerCost": "£24.99"
//! });
//!
//! let output = docfill::render(template, &context).unwrap();
//! assert_eq!(output, "Washer: £8.50 Boiler: £24.99");
//! ```
//!
//! Parse once and render many times with [`parse`] and [`Template::render`], or
//! share parsed trees between threads with [`TemplateCache`].
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Render a template with a JSON context
//! docfill -t quote.txt -c sale.json
//!
//! # Validate a template without rendering it
//! docfill -t quote.txt --check
//! ```

pub mod cache;
pub mod error;
pub mod fs_utils;
pub mod parser;
pub mod path;
pub mod render;

// Re-export main types and functions for convenience
pub use cache::TemplateCache;
pub use error::{DocfillError, Result};
pub use parser::{DirectiveInfo, DirectiveKind, Node, Template, find_directives, parse};
pub use path::PathExpr;
pub use render::{evaluate, render, render_file};
