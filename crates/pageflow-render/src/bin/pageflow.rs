use std::env;
use std::fmt;
use std::path::Path;
use std::process::ExitCode;

use pageflow::{parse_markup, DocumentNode, MarkupError};
use pageflow_render::{PaginationDiagnostic, Repaginator, RepaginatorOptions};

#[derive(Clone, Debug)]
struct Args {
    input_path: String,
    page_width: f32,
    page_height: f32,
    margin: f32,
    font_size: f32,
    line_height: f32,
    max_pages: usize,
    snippet_chars: usize,
    json: bool,
}

#[derive(Debug)]
enum CliError {
    Usage(String),
    Io { path: String, source: std::io::Error },
    Markup(MarkupError),
    Json(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(msg) => f.write_str(msg),
            Self::Io { path, source } => write!(f, "cannot read '{}': {}", path, source),
            Self::Markup(err) => write!(f, "{}", err),
            Self::Json(err) => write!(f, "json error: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Usage(_) => None,
            Self::Io { source, .. } => Some(source),
            Self::Markup(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<MarkupError> for CliError {
    fn from(err: MarkupError) -> Self {
        Self::Markup(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

fn main() -> ExitCode {
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            if matches!(err, CliError::Usage(_)) {
                eprintln!("{}", help_text());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), CliError> {
    let cli = parse_args(args)?;
    let document = load_document(&cli.input_path)?;

    let mut opts = RepaginatorOptions::for_page(cli.page_width, cli.page_height);
    opts.layout.margin_left_px = cli.margin;
    opts.layout.margin_right_px = cli.margin;
    opts.layout.margin_top_px = cli.margin;
    opts.layout.margin_bottom_px = cli.margin;
    opts.layout.font_size_px = cli.font_size;
    opts.layout.line_height = cli.line_height;
    opts.max_pages = cli.max_pages;
    opts.snippet_chars = cli.snippet_chars;

    let mut repaginator = Repaginator::new(opts);
    repaginator.set_diagnostic_sink(|diagnostic| {
        if !matches!(diagnostic, PaginationDiagnostic::ReflowTimeMs(_)) {
            eprintln!("warning: {:?}", diagnostic);
        }
    });
    let pages = repaginator.repaginate(&document);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    }
    for (page, snippet) in pages.iter().zip(repaginator.snippets(&pages)) {
        println!("[{}] {}", page.id, snippet);
    }
    Ok(())
}

fn load_document(path: &str) -> Result<Vec<DocumentNode>, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_string(),
        source,
    })?;
    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let mut nodes: Vec<DocumentNode> = serde_json::from_str(&raw)?;
        pageflow::assign_text_runs(&mut nodes);
        Ok(nodes)
    } else {
        Ok(parse_markup(&raw)?)
    }
}

fn parse_args(args: Vec<String>) -> Result<Args, CliError> {
    let mut cfg = Args {
        input_path: String::new(),
        page_width: 794.0,
        page_height: 1123.0,
        margin: 96.0,
        font_size: 16.0,
        line_height: 1.5,
        max_pages: 200,
        snippet_chars: 150,
        json: false,
    };

    let mut i = 1usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Err(CliError::Usage("help requested".to_string())),
            "--json" => {
                cfg.json = true;
                i += 1;
            }
            "--width" => {
                cfg.page_width = parse_value(&args, i)?;
                i += 2;
            }
            "--height" => {
                cfg.page_height = parse_value(&args, i)?;
                i += 2;
            }
            "--margin" => {
                cfg.margin = parse_value(&args, i)?;
                i += 2;
            }
            "--font-size" => {
                cfg.font_size = parse_value(&args, i)?;
                i += 2;
            }
            "--line-height" => {
                cfg.line_height = parse_value(&args, i)?;
                i += 2;
            }
            "--max-pages" => {
                cfg.max_pages = parse_value(&args, i)?;
                i += 2;
            }
            "--snippet" => {
                cfg.snippet_chars = parse_value(&args, i)?;
                i += 2;
            }
            flag if flag.starts_with("--") => {
                return Err(CliError::Usage(format!("unknown flag '{}'", flag)));
            }
            path => {
                if !cfg.input_path.is_empty() {
                    return Err(CliError::Usage(format!("unexpected argument '{}'", path)));
                }
                cfg.input_path = path.to_string();
                i += 1;
            }
        }
    }

    if cfg.input_path.is_empty() {
        return Err(CliError::Usage("missing input FILE".to_string()));
    }
    Ok(cfg)
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize) -> Result<T, CliError> {
    let flag = &args[i];
    let v = args
        .get(i + 1)
        .ok_or_else(|| CliError::Usage(format!("{} requires a value", flag)))?;
    v.parse::<T>()
        .map_err(|_| CliError::Usage(format!("invalid {} value '{}'", flag, v)))
}

fn help_text() -> &'static str {
    "usage: pageflow FILE [--width PX] [--height PX] [--margin PX] [--font-size PX]\n\
     \x20                    [--line-height X] [--max-pages N] [--snippet N] [--json]\n\
     \n\
     FILE is XHTML-like markup, or a JSON node forest when it ends in .json.\n\
     Prints one preview line per page, or the full page list with --json."
}
