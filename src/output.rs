//! Output formatting for the command line

use crate::error::QuerySyntaxError;
use crate::index::detail::ActionDetail;
use crate::index::stats::StatsResult;
use crate::index::types::IndexBuildStats;
use crate::query::cache::CacheStats;
use crate::query::executor::QueryResult;
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

pub fn color_choice(color: bool) -> ColorChoice {
    if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

pub fn stdout(color: bool) -> StandardStream {
    StandardStream::stdout(color_choice(color))
}

pub fn stderr(color: bool) -> StandardStream {
    StandardStream::stderr(color_choice(color))
}

/// Pretty-printed JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let out = io::stdout();
    let mut out = out.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)
}

fn path_color() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Magenta));
    spec
}

fn locator_color() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Green));
    spec
}

fn label_color() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Cyan)).set_bold(true);
    spec
}

fn dim() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_dimmed(true);
    spec
}

/// `file:json_path  summary` per match, then a footer line
pub fn write_query_result(out: &mut impl WriteColor, result: &QueryResult) -> io::Result<()> {
    for record in &result.results {
        out.set_color(&path_color())?;
        write!(out, "{}", record.skill_file)?;
        out.reset()?;
        write!(out, ":")?;
        out.set_color(&locator_color())?;
        write!(out, "{}", record.json_path)?;
        out.reset()?;
        writeln!(out, "  {}", record.summary)?;
    }

    out.set_color(&dim())?;
    write!(
        out,
        "{} of {} matches in {:.2}ms",
        result.results.len(),
        result.total_matches,
        result.query_time_ms
    )?;
    if result.cache_hit {
        write!(out, " (cached)")?;
    }
    out.reset()?;
    writeln!(out)
}

pub fn write_build_stats(out: &mut impl WriteColor, stats: &IndexBuildStats) -> io::Result<()> {
    out.set_color(&label_color())?;
    write!(out, "Indexed")?;
    out.reset()?;
    writeln!(
        out,
        " {}/{} files, {} actions in {:.1}ms",
        stats.indexed_files, stats.total_files, stats.total_actions, stats.elapsed_ms
    )?;
    if stats.reused_files > 0 {
        writeln!(out, "  {} unchanged files reused", stats.reused_files)?;
    }
    if stats.skipped_actions > 0 {
        writeln!(out, "  {} malformed actions skipped", stats.skipped_actions)?;
    }

    if !stats.failed_files.is_empty() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        writeln!(out, "{} files failed:", stats.failed_files.len())?;
        out.reset()?;
        for failed in &stats.failed_files {
            out.set_color(&path_color())?;
            write!(out, "  {}", failed.file)?;
            out.reset()?;
            writeln!(out, ": {}", failed.reason)?;
        }
    }
    Ok(())
}

/// One block per group: count, then `key avg/min/max` per numeric parameter
pub fn write_stats(out: &mut impl WriteColor, stats: &StatsResult) -> io::Result<()> {
    writeln!(
        out,
        "{} actions grouped by {}",
        stats.total_actions, stats.group_by
    )?;

    for (group, summary) in &stats.groups {
        out.set_color(&label_color())?;
        write!(out, "{}", group)?;
        out.reset()?;
        writeln!(out, " ({})", summary.count)?;

        for key in summary.numeric_keys() {
            let value = |prefix: &str| summary.get(&format!("{}_{}", prefix, key)).unwrap_or(0.0);
            writeln!(
                out,
                "  {:<24} avg {:>10.2}  min {:>10.2}  max {:>10.2}",
                key,
                value("avg"),
                value("min"),
                value("max")
            )?;
        }
    }
    Ok(())
}

pub fn write_detail(out: &mut impl WriteColor, detail: &ActionDetail) -> io::Result<()> {
    let ctx = &detail.context;

    out.set_color(&path_color())?;
    write!(out, "{}", detail.skill_file)?;
    out.reset()?;
    write!(out, ":")?;
    out.set_color(&locator_color())?;
    writeln!(out, "{}", detail.json_path)?;
    out.reset()?;

    writeln!(out, "skill:  {}", ctx.skill_name)?;
    writeln!(out, "track:  {} (#{})", ctx.track_name, ctx.track_index)?;
    writeln!(out, "action: {} (#{})", ctx.action_type, ctx.action_index)?;
    writeln!(out, "size:   {} bytes", detail.size_bytes)?;

    out.set_color(&label_color())?;
    writeln!(out, "data")?;
    out.reset()?;
    let data = serde_json::to_string_pretty(&detail.data).map_err(io::Error::other)?;
    for line in data.lines() {
        writeln!(out, "  {}", line)?;
    }

    if !ctx.neighbors.is_empty() {
        out.set_color(&label_color())?;
        writeln!(out, "neighbors")?;
        out.reset()?;
        for neighbor in &ctx.neighbors {
            out.set_color(&locator_color())?;
            write!(out, "  {}", neighbor.json_path)?;
            out.reset()?;
            writeln!(out, "  {}", neighbor.summary)?;
        }
    }
    Ok(())
}

pub fn write_cache_stats(out: &mut impl WriteColor, stats: &CacheStats) -> io::Result<()> {
    writeln!(
        out,
        "cache: {}/{} entries, {} hits, {} misses, hit rate {:.1}%",
        stats.size,
        stats.max_size,
        stats.hits,
        stats.misses,
        stats.hit_rate * 100.0
    )
}

/// Echo the query with a caret under the offending position
pub fn write_query_error(
    out: &mut impl WriteColor,
    query: &str,
    err: &QuerySyntaxError,
) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    write!(out, "error")?;
    out.reset()?;
    writeln!(out, ": {}", err)?;

    let column = query
        .get(..err.position.min(query.len()))
        .map(|prefix| prefix.chars().count())
        .unwrap_or(0);
    writeln!(out, "  {}", query)?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
    writeln!(out, "  {}^", " ".repeat(column))?;
    out.reset()
}
