use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{ensure, Context};
use colored::Colorize;
use rkv_codec::Data;
use rkv_object::{BucketProps, Client, ClientConfig, DataObject, InMemoryTransport};
use rkv_types::Link;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Simulate(args) => cmd_simulate(&args, cli.format),
        Command::Config(args) => cmd_config(&args, cli.format),
        Command::Links(args) => cmd_links(&args, cli.format),
    }
}

/// Outcome of one conflict simulation.
#[derive(Debug)]
pub struct SimulationReport {
    /// Values of the conflicting versions, in sibling order.
    pub siblings: Vec<String>,
    pub resolved: String,
    /// Reads issued to fetch siblings known only by tag.
    pub sibling_fetches: usize,
    pub versions_after: usize,
}

/// Race `writers` blind writes on one key, then resolve by storing the
/// sorted union of their values on top of the conflict.
pub fn simulate(args: &SimulateArgs) -> anyhow::Result<SimulationReport> {
    ensure!(args.writers > 0, "need at least one writer");

    let transport = Arc::new(
        InMemoryTransport::new()
            .with_allow_mult(true)
            .with_sibling_tags(args.tags_only),
    );
    let client = Client::from_shared(transport.clone(), ClientConfig::default());
    let bucket = client.bucket(args.bucket.as_str());

    for i in 0..args.writers {
        let mut obj = bucket.new_object(Some(args.key.as_str()), format!("writer-{i}"));
        obj.store(None, None, false)?;
    }

    let obj = bucket.get(&args.key, None)?;
    let gets_before = transport.get_count();
    let versions = obj.siblings(None)?;
    let sibling_fetches = transport.get_count() - gets_before;

    let siblings: Vec<String> = versions
        .iter()
        .filter(|v| v.exists())
        .filter_map(|v| v.data().and_then(Data::as_text).map(str::to_string))
        .collect();
    let mut merged = siblings.clone();
    merged.sort();
    let resolved = merged.join("+");

    // A version that was actually read carries the clock to descend from.
    let mut resolver = versions
        .into_iter()
        .find(DataObject::exists)
        .context("no readable version of the key")?;
    resolver.set_data(resolved.as_str());
    resolver.store(None, None, true)?;
    ensure!(!resolver.has_siblings(), "conflict still present after resolution");

    Ok(SimulationReport {
        siblings,
        resolved,
        sibling_fetches,
        versions_after: transport.version_count(&args.bucket, &args.key),
    })
}

fn cmd_simulate(args: &SimulateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let report = simulate(args)?;
    if format == OutputFormat::Json {
        let out = json!({
            "bucket": args.bucket,
            "key": args.key,
            "siblings": report.siblings,
            "resolved": report.resolved,
            "sibling_fetches": report.sibling_fetches,
            "versions_after": report.versions_after,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{} writers raced on {}/{}",
        args.writers.to_string().bold(),
        args.bucket.cyan(),
        args.key.cyan()
    );
    println!("Siblings ({}):", report.siblings.len().to_string().bold());
    for value in &report.siblings {
        println!("  {} {}", "-".dimmed(), value.yellow());
    }
    if args.tags_only {
        println!("  fetched individually: {}", report.sibling_fetches);
    }
    println!("{} Resolved to {}", "✓".green().bold(), report.resolved.green());
    println!("  Versions stored now: {}", report.versions_after);
    Ok(())
}

fn props_json(props: BucketProps) -> serde_json::Value {
    json!({
        "r": props.r.to_string(),
        "w": props.w.to_string(),
        "dw": props.dw.to_string(),
        "rw": props.rw.to_string(),
    })
}

fn cmd_config(args: &ConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = match &args.path {
        Some(path) => ClientConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => ClientConfig::default(),
    };
    let buckets: BTreeSet<&str> = config
        .buckets
        .keys()
        .map(String::as_str)
        .chain(args.bucket.iter().map(String::as_str))
        .collect();

    if format == OutputFormat::Json {
        let resolved: serde_json::Map<String, serde_json::Value> = buckets
            .iter()
            .map(|b| (b.to_string(), props_json(config.props_for(b))))
            .collect();
        let out = json!({
            "link_prefix": config.link_prefix,
            "encode_data": config.encode_data,
            "defaults": props_json(config.defaults),
            "buckets": resolved,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Link prefix: {}", config.link_prefix.cyan());
    println!("Encode data: {}", config.encode_data);
    let show = |name: &str, props: BucketProps| {
        println!(
            "  {:<16} r={} w={} dw={} rw={}",
            name.bold(),
            props.r,
            props.w,
            props.dw,
            props.rw
        );
    };
    show("(default)", config.defaults);
    for bucket in buckets {
        show(bucket, config.props_for(bucket));
    }
    Ok(())
}

fn cmd_links(args: &LinksArgs, format: OutputFormat) -> anyhow::Result<()> {
    let links = Link::parse_header(&args.header);
    let prefix = args.prefix.as_deref().unwrap_or(rkv_types::link::DEFAULT_LINK_PREFIX);

    if format == OutputFormat::Json {
        let out: Vec<_> = links
            .iter()
            .map(|l| json!({"bucket": l.bucket, "key": l.key, "tag": l.tag}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if links.is_empty() {
        println!("No object links in header.");
        return Ok(());
    }
    for link in &links {
        println!("  {}/{} {}", link.bucket.cyan(), link.key, format!("[{}]", link.tag).yellow());
    }
    let rendered: Vec<String> = links.iter().map(|l| l.to_header(prefix)).collect();
    println!("{}", rendered.join(", ").dimmed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(writers: usize, tags_only: bool) -> SimulateArgs {
        SimulateArgs {
            writers,
            bucket: "demo".into(),
            key: "counter".into(),
            tags_only,
        }
    }

    #[test]
    fn simulation_resolves_conflict() {
        let report = simulate(&args(3, false)).unwrap();
        assert_eq!(report.siblings.len(), 3);
        assert_eq!(report.resolved, "writer-0+writer-1+writer-2");
        assert_eq!(report.sibling_fetches, 0);
        assert_eq!(report.versions_after, 1);
    }

    #[test]
    fn simulation_with_tags_fetches_each_sibling() {
        let report = simulate(&args(2, true)).unwrap();
        assert_eq!(report.siblings, vec!["writer-0", "writer-1"]);
        assert_eq!(report.sibling_fetches, 2);
        assert_eq!(report.versions_after, 1);
    }

    #[test]
    fn single_writer_has_nothing_to_resolve() {
        let report = simulate(&args(1, false)).unwrap();
        assert_eq!(report.siblings, vec!["writer-0"]);
        assert_eq!(report.versions_after, 1);
    }

    #[test]
    fn zero_writers_is_rejected() {
        assert!(simulate(&args(0, false)).is_err());
    }
}
