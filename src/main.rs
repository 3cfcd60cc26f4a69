//! # Quire CLI
//!
//! Usage:
//!   quire input.json -o layout.json
//!   echo '{ ... }' | quire --strict
//!   quire --config layout-config.json input.json
//!   quire --example > sample.json
//!
//! Prints the laid-out tree as JSON. `RUST_LOG=debug` shows pagination and
//! overflow decisions.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use quire::config::{Conformance, LayoutConfig};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_document_json());
        return;
    }

    if let Err(message) = run(&args) {
        eprintln!("✗ {message}");
        process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let value_of = |flag: &str| {
        args.windows(2)
            .find(|w| w[0] == flag)
            .map(|w| w[1].clone())
    };

    let mut config = match value_of("--config") {
        Some(path) => {
            let json = fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read config '{path}': {e}"))?;
            LayoutConfig::from_json(&json).map_err(|e| e.to_string())?
        }
        None => LayoutConfig::default(),
    };
    if args.iter().any(|a| a == "--strict") {
        config.conformance = Conformance::Strict;
    }

    let input_path = args
        .iter()
        .enumerate()
        .find(|(i, a)| {
            !a.starts_with('-')
                && (*i == 0 || !matches!(args[i - 1].as_str(), "-o" | "--config"))
        })
        .map(|(_, a)| a.clone());
    let input = match input_path {
        Some(path) => fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read input file '{path}': {e}"))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("Failed to read stdin: {e}"))?;
            buf
        }
    };

    let laid_out = quire::layout_json(&input, &config).map_err(|e| e.to_string())?;
    if laid_out.halted {
        eprintln!("! Layout stopped early; some content was not placed");
    }
    let json = serde_json::to_string_pretty(&laid_out).map_err(|e| e.to_string())?;

    match value_of("-o") {
        Some(path) => {
            fs::write(&path, &json).map_err(|e| format!("Failed to write '{path}': {e}"))?;
            eprintln!(
                "✓ Laid out {} page(s) into {}",
                laid_out.pages.len(),
                path
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn example_document_json() -> &'static str {
    r##"{
  "metadata": {
    "title": "Field notes",
    "author": "Quire"
  },
  "defaultPage": {
    "size": "A5",
    "margin": { "top": 36, "right": 36, "bottom": 36, "left": 36 }
  },
  "style": { "fontFamily": "Times", "fontSize": 11 },
  "header": {
    "kind": { "type": "Text", "content": "Field notes" },
    "style": { "fontSize": 8, "horizontalAlign": "Right" }
  },
  "children": [
    {
      "kind": { "type": "Text", "content": "Observations" },
      "id": "title",
      "bookmark": "Observations",
      "style": { "fontSize": 18, "fontWeight": 700, "margin": { "top": 0, "right": 0, "bottom": 8, "left": 0 } }
    },
    {
      "kind": { "type": "View" },
      "style": { "width": { "Pt": 90 }, "float": "Right", "padding": { "top": 4, "right": 4, "bottom": 4, "left": 4 } },
      "children": [
        { "kind": { "type": "Text", "content": "Weather was clear all week." }, "style": { "fontSize": 8 } }
      ]
    },
    {
      "kind": { "type": "Text", "content": "The survey covered three sites along the river. Each site was visited twice, once in the morning and once at dusk, and every sighting was recorded with its time and position." },
      "style": { "horizontalAlign": "Justify" }
    },
    {
      "kind": { "type": "List" },
      "style": { "listStyle": "LowerRoman" },
      "children": [
        { "kind": { "type": "ListItem" }, "children": [ { "kind": { "type": "Text", "content": "Upper bend" } } ] },
        { "kind": { "type": "ListItem" }, "children": [ { "kind": { "type": "Text", "content": "Old mill" } } ] },
        { "kind": { "type": "ListItem" }, "children": [ { "kind": { "type": "Text", "content": "Estuary" } } ] }
      ]
    },
    {
      "kind": { "type": "Table" },
      "style": { "margin": { "top": 12, "right": 0, "bottom": 0, "left": 0 } },
      "children": [
        {
          "kind": { "type": "TableRow", "repeat_at_top": true },
          "children": [
            { "kind": { "type": "TableCell" }, "children": [ { "kind": { "type": "Text", "content": "Site" } } ] },
            { "kind": { "type": "TableCell" }, "children": [ { "kind": { "type": "Text", "content": "Count" } } ] }
          ]
        },
        {
          "kind": { "type": "TableRow" },
          "children": [
            { "kind": { "type": "TableCell" }, "children": [ { "kind": { "type": "Text", "content": "Upper bend" } } ] },
            { "kind": { "type": "TableCell" }, "children": [ { "kind": { "type": "Text", "content": "14" } } ] }
          ]
        },
        {
          "kind": { "type": "TableRow" },
          "children": [
            { "kind": { "type": "TableCell", "col_span": 2 }, "children": [ { "kind": { "type": "Text", "content": "Totals follow in the appendix." } } ] }
          ]
        }
      ]
    }
  ]
}
"##
}
