use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use rdfa_edit::{
    Document, Editor, EditorConfig, NodeId,
    update::{Selection, Strategy, UpdateSpec},
};
use tracing_subscriber::EnvFilter;

/// Loads an HTML+RDFa document, optionally applies an update to it, and
/// prints the resulting graph or markup.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// A file path or an http(s) URL.
    #[arg(value_name = "INPUT")]
    input: String,

    /// Base IRI; defaults to the URL when the input is fetched.
    #[arg(long)]
    base: Option<String>,

    /// Editor settings as JSON.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable `rdfa:copy` expansion.
    #[arg(long)]
    no_copy: bool,

    /// A change spec (JSON) to apply before output.
    #[arg(long, value_name = "FILE")]
    update: Option<PathBuf>,

    /// Select every element with this tag as the update context.
    #[arg(long, value_name = "TAG", conflicts_with = "highlight")]
    select: Option<String>,

    /// Select text by character offsets, e.g. `4..9`.
    #[arg(long, value_name = "START..END", value_parser = parse_span)]
    highlight: Option<(usize, usize)>,

    /// Override the strategy chosen for the update.
    #[arg(long, value_enum)]
    force: Option<ForceArg>,

    #[arg(long, value_enum, default_value_t = Format::Turtle)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum ForceArg {
    Wrap,
    Nest,
}

impl From<ForceArg> for Strategy {
    fn from(value: ForceArg) -> Self {
        match value {
            ForceArg::Wrap => Strategy::Wrap,
            ForceArg::Nest => Strategy::Nest,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Turtle,
    Html,
}

fn parse_span(s: &str) -> Result<(usize, usize), String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got `{s}`"))?;
    let start = start.trim().parse().map_err(|e| format!("start: {e}"))?;
    let end = end.trim().parse().map_err(|e| format!("end: {e}"))?;
    if start > end {
        return Err(format!("start {start} is after end {end}"));
    }
    Ok((start, end))
}

/// Reads the input and reports the base IRI implied by where it came from.
fn load(input: &str) -> Result<(String, Option<String>), Box<dyn std::error::Error>> {
    match url::Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            tracing::info!(%url, "fetching");
            let response = reqwest::blocking::Client::new()
                .get(url.clone())
                .send()?
                .error_for_status()?;
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            if content_type.is_some_and(|ct| !ct.starts_with("text/html")) {
                return Err(format!("{url} is not text/html").into());
            }
            Ok((response.text()?, Some(url.to_string())))
        }
        _ => Ok((fs::read_to_string(input)?, None)),
    }
}

fn selection(doc: &Document, args: &Args) -> Result<Selection, rdfa_edit::Error> {
    if let Some((start, end)) = args.highlight {
        return Selection::highlight(doc, start, end);
    }
    let nodes: Vec<NodeId> = match &args.select {
        Some(tag) => doc
            .descendants(doc.root())
            .filter(|&id| {
                doc.element(id)
                    .is_some_and(|e| e.tag.eq_ignore_ascii_case(tag))
            })
            .collect(),
        None => vec![doc.root()],
    };
    Selection::of_nodes(doc, &nodes)
}

fn write_turtle(
    graph: &oxrdf::Graph,
    base: Option<&str>,
    out: impl std::io::Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut serializer = oxttl::TurtleSerializer::new();
    if let Some(base) = base {
        serializer = rdfa_edit::initial_context_prefixes()
            .mappings()
            .try_fold(serializer.with_base_iri(base)?, |s, (prefix, iri)| {
                s.with_prefix(prefix, iri)
            })?;
    }
    let mut writer = serializer.for_writer(out);
    for triple in graph.iter() {
        writer.serialize_triple(triple)?;
    }
    writer.finish()?;
    Ok(())
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let (content, fetched_from) = load(&args.input)?;

    let mut config: EditorConfig = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => EditorConfig::default(),
    };
    if let Some(base) = args.base.clone().or(fetched_from) {
        config.processor.base = oxiri::Iri::parse(base)?.into_inner();
    }
    if args.no_copy {
        config.processor.pattern_copying = false;
    }

    let mut editor = Editor::from_html(&content, config)?;

    if let Some(path) = &args.update {
        let spec: UpdateSpec = serde_json::from_str(&fs::read_to_string(path)?)?;
        let selected = selection(editor.document(), &args)?;
        let report = editor.update(&selected, &spec, args.force.map(Strategy::from))?;
        match report.strategy {
            Some(strategy) => {
                tracing::info!(?strategy, nodes = report.nodes.len(), "update applied")
            }
            None => {
                eprintln!("Update was not applied.");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    match args.format {
        Format::Html => println!("{}", editor.to_html()?),
        Format::Turtle => {
            let base = editor.config().processor.base.clone();
            let index = editor.index()?;
            // warnings and errors go to stderr
            write_turtle(index.processor_graph(), None, std::io::stderr().lock())?;
            write_turtle(index.graph(), Some(&base), std::io::stdout().lock())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
