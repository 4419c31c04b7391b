use std::{
    fs::File,
    io::{self, Read, Write},
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Args;
use humantime::format_duration;
use tracing::info;
use xmlfilter_core::{
    dom::Document,
    predicate::{PathPredicate, Predicate},
    transform::{CopyTransformer, PathTransformer, Transformer},
    StreamFilter, XmlStreamFilter,
};

use super::path_error::IntoPathSyntaxError;

/// Filter and transform the elements of an XML document
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// The local name of the elements to process
    #[arg(short, long)]
    pub element: String,

    /// A path expression that must select at least one node in an element
    /// for the element to be transformed (default: every element passes)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// A path expression whose selected nodes are written to the output
    /// (default: the element is copied as XML)
    #[arg(short, long)]
    pub transform: Option<String>,

    /// The file to read from (default: stdin). Gzip-compressed input is
    /// detected automatically.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// The file to write to (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the filter with the given arguments
pub fn run_filter(args: FilterArgs) -> Result<()> {
    // compile path expressions
    let predicate = args
        .filter
        .as_deref()
        .map(|p| PathPredicate::new(p).map_err(|e| e.into_path_syntax_error("filter", p)))
        .transpose()?;
    let transformer = args
        .transform
        .as_deref()
        .map(|p| PathTransformer::new(p).map_err(|e| e.into_path_syntax_error("transform", p)))
        .transpose()?;

    let filter = XmlStreamFilter::new(
        args.element,
        move |document: &Document| predicate.as_ref().map_or(true, |p| p.test(document)),
        move |document: &Document, sink: &mut dyn Write| match &transformer {
            Some(t) => t.apply(document, sink),
            None => CopyTransformer.apply(document, sink),
        },
    )?;

    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path)
                .with_context(|| format!("Unable to open input file `{}'", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Unable to create output file `{}'", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let start = Instant::now();

    let summary = filter.filter(input, output)?;

    info!(
        "Matched {} elements, {} passed the filter in {}",
        summary.elements_matched,
        summary.elements_passed,
        format_duration(Duration::from_millis(start.elapsed().as_millis() as u64))
    );

    Ok(())
}
