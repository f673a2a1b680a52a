use std::fmt::Write;

use crate::data_models::{SearchResponse, SearchResultItem};
use crate::query_parser;

pub fn render_response(response: &SearchResponse) -> String {
    let mut out = String::new();

    if response.items.is_empty() {
        out.push_str("No structured results could be extracted. Raw model output:\n\n");
        out.push_str(response.raw_text.trim());
        out.push('\n');
    } else {
        let _ = writeln!(out, "{} result(s)\n", response.items.len());
        for item in &response.items {
            render_item(&mut out, item);
        }
    }

    let cited: Vec<_> = response
        .citations
        .iter()
        .filter(|c| !c.uri.is_empty())
        .collect();
    if !cited.is_empty() {
        out.push_str("\nGrounding sources:\n");
        for (i, c) in cited.iter().enumerate() {
            let _ = writeln!(out, "  [{}] {} <{}>", i + 1, c.title, c.uri);
        }
    }
    out
}

fn render_item(out: &mut String, item: &SearchResultItem) {
    let _ = writeln!(out, "== {} [{}]", item.title, item.kind);
    if !item.main_data.is_empty() {
        let _ = writeln!(out, "   match: {}", item.main_data);
    }
    if !item.description.is_empty() {
        let _ = writeln!(out, "   {}", item.description);
    }
    for linked in &item.linked_data {
        let _ = write!(
            out,
            "   - {}: {} ({})",
            linked.kind, linked.value, linked.confidence
        );
        match &linked.source {
            Some(source) => {
                let _ = writeln!(out, " via {source}");
            }
            None => out.push('\n'),
        }
    }
    let _ = writeln!(out, "   sources: {}", item.sources.len());
    out.push('\n');
}

pub fn render_flag_help() -> String {
    let mut out = String::from("Inline flags (anywhere in the query, case-insensitive):\n");
    for (data_type, spellings) in query_parser::flag_help() {
        let _ = writeln!(out, "  {:<36} {}", spellings.join(", "), data_type);
    }
    out
}
