use folio::application::render::{ComrakRenderService, RenderRequest, RenderService, TocEntry};

const FIELD_NOTES: &str = "# Field notes

## Contents

## Getting started

### Install

### Configure

#### Deep detail

## Usage

## Usage
";

fn outline(entries: &[TocEntry], depth: usize, lines: &mut Vec<String>) {
    for entry in entries {
        lines.push(format!(
            "{}- {}: {}",
            "  ".repeat(depth),
            entry.anchor,
            entry.text
        ));
        outline(&entry.children, depth + 1, lines);
    }
}

#[test]
fn field_notes_toc_skips_its_own_heading_and_deep_levels() {
    let output = ComrakRenderService::default()
        .render(&RenderRequest::new("field-notes", FIELD_NOTES))
        .expect("render");

    let mut lines = Vec::new();
    outline(&output.toc, 0, &mut lines);
    insta::assert_snapshot!("field_notes_toc", lines.join("\n"));
}

#[test]
fn toc_list_follows_the_contents_heading() {
    let output = ComrakRenderService::default()
        .render(&RenderRequest::new("field-notes", FIELD_NOTES))
        .expect("render");

    let heading = output.html.find("id=\"contents\"").expect("contents heading");
    let list = output.html.find("<ul class=\"toc\">").expect("toc list");
    let next_heading = output
        .html
        .find("id=\"getting-started\"")
        .expect("next heading");
    assert!(heading < list && list < next_heading);
}
