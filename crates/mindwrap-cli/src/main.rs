use futures::executor::block_on;
use mindwrap::render::{HeadlessError, Size, layout_html, layout_markdown, size};
use mindwrap::{
    DeriveFlags, MindmapOptions, PayloadNode, RawOptions, Transformer, derive_options,
    find_wrap_blocks,
};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Layout(HeadlessError),
    Json(serde_json::Error),
    NoWraps,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Layout(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::NoWraps => write!(f, "No [wrap=markmap] block found"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<HeadlessError> for CliError {
    fn from(value: HeadlessError) -> Self {
        Self::Layout(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Tree,
    Layout,
    Wraps,
}

#[derive(Debug)]
struct Args {
    command: Command,
    input: Option<String>,
    markdown: bool,
    pretty: bool,
    verbose: bool,
    title: Option<String>,
    options: RawOptions,
    viewport: Size,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            command: Command::Tree,
            input: None,
            markdown: false,
            pretty: false,
            verbose: false,
            title: None,
            options: RawOptions::new(),
            viewport: size(800.0, 500.0),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WrapOut<'a> {
    index: usize,
    title: Option<&'a str>,
    options: MindmapOptions,
    tree: PayloadNode,
}

fn usage() -> &'static str {
    "mindwrap-cli\n\
\n\
USAGE:\n\
  mindwrap-cli [tree] [--markdown] [--title <t>] [--option <key>=<value>]... [--pretty] [--verbose] [<path>|-]\n\
  mindwrap-cli layout [--markdown] [--title <t>] [--option <key>=<value>]... [--viewport <w>x<h>] [--pretty] [--verbose] [<path>|-]\n\
  mindwrap-cli wraps [--pretty] [--verbose] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - Input is HTML unless --markdown is given or <path> ends with .md.\n\
  - --option takes wrap-block dataset keys (maxWidth=300, color=#f00,#0f0, autoFit=false).\n\
  - layout uses a deterministic text measurer, so output is stable across machines.\n\
  - wraps lists every [wrap=markmap] block of an HTML container with its derived options.\n\
"
}

fn parse_viewport(raw: &str) -> Option<Size> {
    let (w, h) = raw.split_once(['x', 'X'])?;
    let w = w.trim().parse::<f64>().ok()?;
    let h = h.trim().parse::<f64>().ok()?;
    (w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0).then(|| size(w, h))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "tree" => args.command = Command::Tree,
            "layout" => args.command = Command::Layout,
            "wraps" => args.command = Command::Wraps,
            "--markdown" => args.markdown = true,
            "--pretty" => args.pretty = true,
            "--verbose" | "-v" => args.verbose = true,
            "--title" => {
                let Some(title) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.title = Some(title.clone());
            }
            "--option" => {
                let Some(pair) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let Some((key, value)) = pair.split_once('=') else {
                    return Err(CliError::Usage(usage()));
                };
                args.options
                    .insert(key.trim().to_string(), Value::String(value.to_string()));
            }
            "--viewport" => {
                let Some(raw) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.viewport = parse_viewport(raw).ok_or(CliError::Usage(usage()))?;
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if args
        .input
        .as_deref()
        .is_some_and(|p| p.ends_with(".md") || p.ends_with(".markdown"))
    {
        args.markdown = true;
    }
    Ok(args)
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = if verbose {
        EnvFilter::new(fallback)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn build_options(args: &Args) -> MindmapOptions {
    let mut raw = args.options.clone();
    if let Some(title) = &args.title {
        raw.insert("title".to_string(), Value::String(title.clone()));
    }
    derive_options(&raw, DeriveFlags::default())
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    tracing::debug!(
        command = ?args.command,
        markdown = args.markdown,
        bytes = text.len(),
        "input read"
    );
    let transformer = Transformer::default();
    let options = build_options(&args);
    let title = options.title.as_deref();

    match args.command {
        Command::Tree => {
            let tree = if args.markdown {
                transformer.transform_markdown(&text, title)
            } else {
                transformer.transform(&text, title)
            };
            write_json(&tree, args.pretty)
        }
        Command::Layout => {
            let layout = if args.markdown {
                block_on(layout_markdown(&text, &options, args.viewport))?
            } else {
                block_on(layout_html(&text, &options, args.viewport))?
            };
            write_json(&layout, args.pretty)
        }
        Command::Wraps => {
            let blocks = find_wrap_blocks(&text);
            if blocks.is_empty() {
                return Err(CliError::NoWraps);
            }
            let out: Vec<WrapOut<'_>> = blocks
                .iter()
                .map(|block| WrapOut {
                    index: block.index,
                    title: block.title(),
                    options: derive_options(
                        &block.attributes,
                        DeriveFlags { use_default: false },
                    ),
                    tree: transformer.transform_wrap(block),
                })
                .collect();
            write_json(&out, args.pretty)
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => {}
        Err(CliError::NoWraps) => {
            eprintln!("{}", CliError::NoWraps);
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
