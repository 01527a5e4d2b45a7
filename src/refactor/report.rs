//! Human-readable rendering of planned moves and ambiguous matches.
//!
//! Output is plain text without ANSI codes; the command writes it to
//! stderr so it stays apart from regular log output.
use std::io::{self, Write};

use super::EnvironmentPlan;
use super::matcher::AmbiguousMatch;

const HEADERS: [&str; 3] = ["Resource Type", "Source Location", "Destination Location"];

/// Write one block per environment with a non-empty group, or
/// `Nothing to refactor.` when there is none.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_mappings(out: &mut dyn Write, plans: &[EnvironmentPlan]) -> io::Result<()> {
    let blocks: Vec<_> = plans
        .iter()
        .filter_map(|plan| plan.result.as_ref().ok().map(|p| (&plan.environment, p)))
        .filter(|(_, planned)| !planned.outcome.group.is_empty())
        .collect();
    if blocks.is_empty() {
        return writeln!(out, "Nothing to refactor.");
    }

    writeln!(out, "The following resources were moved or renamed:")?;
    for (environment, planned) in blocks {
        let rows: Vec<[String; 3]> = planned
            .outcome
            .group
            .mappings()
            .iter()
            .map(|m| {
                [
                    planned.resource_type(m).to_string(),
                    m.source.to_string(),
                    m.destination.to_string(),
                ]
            })
            .collect();
        writeln!(out)?;
        writeln!(out, "{environment}")?;
        write_table(out, &rows)?;
    }
    Ok(())
}

fn write_table(out: &mut dyn Write, rows: &[[String; 3]]) -> io::Result<()> {
    let width = |col: usize| {
        rows.iter()
            .filter_map(|r| r.get(col))
            .map(String::len)
            .chain(HEADERS.get(col).map(|h| h.len()))
            .max()
            .unwrap_or(0)
    };
    let (w0, w1) = (width(0), width(1));
    let [h0, h1, h2] = HEADERS;
    writeln!(out, "  {h0:<w0$}  {h1:<w1$}  {h2}")?;
    for [resource_type, source, destination] in rows {
        writeln!(out, "  {resource_type:<w0$}  {source:<w1$}  {destination}")?;
    }
    Ok(())
}

/// Write the candidates withheld from automatic matching, if any.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_ambiguities(out: &mut dyn Write, plans: &[EnvironmentPlan]) -> io::Result<()> {
    let blocks: Vec<_> = plans
        .iter()
        .filter_map(|plan| plan.result.as_ref().ok().map(|p| (&plan.environment, p)))
        .filter(|(_, planned)| !planned.outcome.ambiguities.is_empty())
        .collect();
    if blocks.is_empty() {
        return Ok(());
    }

    writeln!(
        out,
        "Ambiguous resource matches were left out of the mapping. Resolve them with --mapping-file:"
    )?;
    for (environment, planned) in blocks {
        writeln!(out)?;
        writeln!(out, "{environment}")?;
        for ambiguity in &planned.outcome.ambiguities {
            write_ambiguity(out, ambiguity)?;
        }
    }
    Ok(())
}

fn write_ambiguity(out: &mut dyn Write, ambiguity: &AmbiguousMatch) -> io::Result<()> {
    let cycle = if ambiguity.digest.confident {
        ""
    } else {
        ", reference cycle"
    };
    writeln!(
        out,
        "  {} (digest {}{cycle})",
        ambiguity.resource_type,
        ambiguity.digest.short()
    )?;
    for removal in &ambiguity.removals {
        writeln!(out, "    - {removal}")?;
    }
    for addition in &ambiguity.additions {
        writeln!(out, "    + {addition}")?;
    }
    Ok(())
}
