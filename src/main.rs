//! # cardlayout CLI
//!
//! Usage:
//!   cardlayout import words.json -o cards.json [--page 148x105]
//!   cardlayout template cards.json --card a1 -o template.json
//!   cardlayout apply cards.json --template template.json [--exclude a1] -o out.json
//!   cardlayout --example > words.json
//!
//! The command defaults to `import`, so `cardlayout words.json` works too.
//! Flags may come before or after the command. Input is read from stdin
//! when no file is given. Output goes to stdout
//! without `-o`. Logging follows `RUST_LOG` (default `info`) on stderr.

use std::env;
use std::fs;
use std::io::{self, Read};

use cardlayout::config::Settings;
use cardlayout::model::PageSize;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const COMMANDS: [&str; 3] = ["import", "template", "apply"];
/// Flags followed by a value.
const VALUE_FLAGS: [&str; 6] = ["--config", "--page", "--card", "--template", "--exclude", "-o"];

fn main() {
    init_logging();
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_import_json());
        return;
    }

    let settings = match flag(&args, "--config") {
        Some(path) => {
            let text = read_file(&path);
            Settings::from_json(&text).unwrap_or_else(|e| fail(&format!("Bad settings file: {}", e)))
        }
        None => Settings::default(),
    };
    let page = match flag(&args, "--page") {
        Some(raw) => PageSize::parse(&raw)
            .unwrap_or_else(|| fail(&format!("Bad page size '{}', expected WxH in mm", raw))),
        None => settings.default_page_size,
    };

    let (command, input_path) = command_and_input(&args);
    let input = read_input(input_path);
    let result = match command {
        "import" => cardlayout::normalize_json(&input, &page).and_then(|cards| {
            eprintln!("✓ Imported {} cards", cards.len());
            cardlayout::export_json(&cards)
        }),
        "template" => {
            let card = flag(&args, "--card").unwrap_or_else(|| fail("template needs --card <id>"));
            cardlayout::extract_template_json(&input, &card, &page)
        }
        "apply" => {
            let path = flag(&args, "--template").unwrap_or_else(|| fail("apply needs --template <file>"));
            let template = read_file(&path);
            let exclude = flag(&args, "--exclude");
            cardlayout::apply_template_json(&input, &template, exclude.as_deref())
        }
        other => fail(&format!("Unknown command '{}'", other)),
    };

    match result {
        Ok(json) => write_output(&args, &json),
        Err(e) => fail(&e.to_string()),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .init();
}

fn flag(args: &[String], name: &str) -> Option<String> {
    args.windows(2).find(|w| w[0] == name).map(|w| w[1].clone())
}

/// Arguments that are neither flags nor flag values.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            rest.next();
        } else if !arg.starts_with('-') {
            out.push(arg.as_str());
        }
    }
    out
}

/// A leading positional that is not a command name is the input file of
/// an implicit `import`.
fn command_and_input(args: &[String]) -> (&str, Option<&str>) {
    match positionals(args).as_slice() {
        [] => ("import", None),
        [first, rest @ ..] if COMMANDS.contains(first) => (*first, rest.first().copied()),
        [first, ..] => ("import", Some(*first)),
    }
}

/// The input file, or stdin.
fn read_input(path: Option<&str>) -> String {
    match path {
        Some(path) => read_file(path),
        None => {
            let mut buf = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buf) {
                fail(&format!("Failed to read stdin: {}", e));
            }
            buf
        }
    }
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(&format!("Failed to read {}: {}", path, e)))
}

fn write_output(args: &[String], json: &str) {
    match flag(args, "-o") {
        Some(path) => {
            if let Err(e) = fs::write(&path, json) {
                fail(&format!("Failed to write {}: {}", path, e));
            }
            eprintln!("✓ Written {} bytes to {}", json.len(), path);
        }
        None => println!("{}", json),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("✗ {}", message);
    std::process::exit(1);
}

fn example_import_json() -> &'static str {
    r##"{
  "verbs": [
    {
      "infinitive": "gehen",
      "freq": 5,
      "tags": ["A1", "Bewegung"],
      "translations": [
        { "ru": "идти", "ctx": "пешком" },
        { "ru": "ходить" }
      ],
      "forms": { "p3": "geht", "praet": "ging", "p2": "gegangen", "aux": "ist" },
      "synonyms": [{ "de": "laufen", "ru": "бежать" }],
      "examples": [
        { "de": "Ich gehe nach Hause.", "ru": "Я иду домой.", "tag": "A1" },
        { "de": "Wie geht es dir?", "ru": "Как у тебя дела?", "tag": "A1" }
      ],
      "recommendations": [{ "de": "spazieren gehen", "ru": "гулять" }]
    },
    {
      "infinitive": "machen",
      "freq": 4,
      "translations": [{ "value": "делать" }],
      "forms_p3": "macht",
      "forms_praet": "machte",
      "forms_p2": "gemacht",
      "forms_aux": "hat"
    }
  ]
}
"##
}
