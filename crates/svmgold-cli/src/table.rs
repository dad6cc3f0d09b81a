//! Solver results table.
//!
//! A results folder holds one directory per test; each test directory holds
//! `<n>.results` files, one per solver query, with `solver<TAB>result` lines.
//! The `Human` solver is the reference: cells that agree with it are
//! highlighted, and the totals count how many queries some solver got right
//! and which solver agrees with the reference most often.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::Args;
use regex_lite::Regex;
use serde::Serialize;

use crate::error::{CliError, Result};

pub const REFERENCE_SOLVER: &str = "Human";

const TIMED_RESULT: &str = r"^\(([\w\s]+), (\d+)\)$";
const RESULTS_SUFFIX: &str = ".results";

const GREEN: &str = "\x1b[92m";
const BLUE: &str = "\x1b[94m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Args)]
pub struct TableArgs {
    /// Results folders, each holding one directory per test.
    #[arg(required = true)]
    pub folders: Vec<PathBuf>,

    /// Never colour the output.
    #[arg(long)]
    pub plain: bool,

    /// Print only the totals, as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Sat,
    Unsat,
    TimeLimit,
    SolverError,
    NoResult,
}

impl Verdict {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sat => "sat",
            Self::Unsat => "unsat",
            Self::TimeLimit => "TL",
            Self::SolverError => "z3 :(",
            Self::NoResult => "-",
        }
    }

    fn classify(text: &str) -> Self {
        if text.contains("Sat") {
            Self::Sat
        } else if text.contains("Unsat") {
            Self::Unsat
        } else if text.contains("Time limit") {
            Self::TimeLimit
        } else if text.contains("z3: ") {
            Self::SolverError
        } else {
            Self::NoResult
        }
    }
}

/// One solver's answer to one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub verdict: Verdict,
    /// Solving time; only kept for sat/unsat answers.
    pub time: Option<String>,
    /// Same verdict as the reference solver.
    pub matches_reference: bool,
}

impl Cell {
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            verdict: Verdict::NoResult,
            time: None,
            matches_reference: false,
        }
    }

    /// Classify a raw result, optionally written as `(<result>, <time>)`.
    #[must_use]
    pub fn parse(raw: &str, timed: &Regex) -> Self {
        let raw = raw.trim_end();
        let (text, time) = match timed.captures(raw) {
            Some(caps) => (
                caps.get(1).map_or(raw, |m| m.as_str()),
                caps.get(2).map(|m| m.as_str().to_string()),
            ),
            None => (raw, None),
        };
        let verdict = Verdict::classify(text);
        let time = time.filter(|_| matches!(verdict, Verdict::Sat | Verdict::Unsat));
        Self {
            verdict,
            time,
            matches_reference: false,
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        match &self.time {
            Some(time) => format!("{}({time})", self.verdict.label()),
            None => self.verdict.label().to_string(),
        }
    }

    fn color(&self) -> Option<&'static str> {
        if self.matches_reference {
            Some(GREEN)
        } else if matches!(self.verdict, Verdict::TimeLimit | Verdict::SolverError) {
            Some(BLUE)
        } else {
            None
        }
    }
}

/// Solver → answer for one query.
pub type QueryResults = BTreeMap<String, Cell>;

pub fn timed_pattern() -> Result<Regex> {
    Regex::new(TIMED_RESULT).map_err(|e| CliError::invalid(format!("result pattern: {e}")))
}

/// Parse one `.results` file and mark answers that agree with the reference.
#[must_use]
pub fn parse_results(content: &str, timed: &Regex) -> QueryResults {
    let mut results = QueryResults::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let (solver, raw) = line.split_once('\t').unwrap_or((line, ""));
        results.insert(solver.to_string(), Cell::parse(raw, timed));
    }
    if let Some(reference) = results.get(REFERENCE_SOLVER).map(|c| c.verdict) {
        for cell in results.values_mut() {
            cell.matches_reference = cell.verdict == reference;
        }
    }
    results
}

/// Test name for a test directory: drops up to two trailing `.`-separated
/// parts, so `Lists.Length.0` becomes `Lists`.
#[must_use]
pub fn test_name(dir_name: &str) -> &str {
    dir_name.rsplitn(3, '.').last().unwrap_or(dir_name)
}

/// Query files of one test directory, ordered by number. Files whose stem is
/// not a number are ignored.
pub fn read_test(dir: &Path, timed: &Regex) -> Result<Vec<QueryResults>> {
    let mut queries: BTreeMap<i64, PathBuf> = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(|e| CliError::io(dir, e))? {
        let entry = entry.map_err(|e| CliError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.ends_with(RESULTS_SUFFIX) {
            continue;
        }
        let stem = name.split('.').next().unwrap_or_default();
        if let Ok(n) = stem.parse::<i64>() {
            queries.insert(n, entry.path());
        }
    }
    queries
        .into_values()
        .map(|path| {
            let content = fs::read_to_string(&path).map_err(|e| CliError::io(&path, e))?;
            Ok(parse_results(&content, timed))
        })
        .collect()
}

/// Every test directory under `folder`, keyed by test name. Directories are
/// visited in name order; a later directory with the same test name wins.
pub fn read_folder(folder: &Path, timed: &Regex) -> Result<BTreeMap<String, Vec<QueryResults>>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(folder).map_err(|e| CliError::io(folder, e))? {
        let entry = entry.map_err(|e| CliError::io(folder, e))?;
        if entry.file_type().map_err(|e| CliError::io(entry.path(), e))?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();

    let mut tests = BTreeMap::new();
    for dir in dirs {
        let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let name = test_name(dir_name).to_string();
        tests.insert(name, read_test(&dir, timed)?);
    }
    Ok(tests)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub test: String,
    pub query: usize,
    /// One cell per column of [`SolverTable::solvers`].
    pub cells: Vec<Cell>,
    pub has_reference: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableTotals {
    pub total_queries: usize,
    pub coverage: usize,
    pub best_solver: Option<String>,
    pub best_score: usize,
}

/// Rows sorted by test name; columns are the solvers in name order with the
/// reference last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverTable {
    pub solvers: Vec<String>,
    pub rows: Vec<Row>,
}

impl SolverTable {
    #[must_use]
    pub fn build(tests: &BTreeMap<String, Vec<QueryResults>>) -> Self {
        let names: BTreeSet<&str> = tests
            .values()
            .flatten()
            .flat_map(|q| q.keys().map(String::as_str))
            .filter(|s| *s != REFERENCE_SOLVER)
            .collect();
        let mut solvers: Vec<String> = names.into_iter().map(str::to_string).collect();
        solvers.push(REFERENCE_SOLVER.to_string());

        let rows = tests
            .iter()
            .flat_map(|(test, queries)| {
                let solvers = &solvers;
                queries.iter().enumerate().map(move |(query, results)| Row {
                    test: test.clone(),
                    query,
                    cells: solvers
                        .iter()
                        .map(|s| results.get(s).cloned().unwrap_or_else(Cell::missing))
                        .collect(),
                    has_reference: results.contains_key(REFERENCE_SOLVER),
                })
            })
            .collect();
        Self { solvers, rows }
    }

    /// Coverage counts queries with a reference answer that at least one
    /// solver reproduces; scores count per solver.
    #[must_use]
    pub fn totals(&self) -> TableTotals {
        let solver_count = self.solvers.len().saturating_sub(1);
        let mut scores = vec![0usize; solver_count];
        let mut coverage = 0;
        for row in self.rows.iter().filter(|r| r.has_reference) {
            let Some(reference) = row.cells.last().map(|c| c.verdict) else {
                continue;
            };
            let mut covered = false;
            for (score, cell) in scores.iter_mut().zip(&row.cells) {
                if cell.verdict == reference {
                    *score += 1;
                    covered = true;
                }
            }
            coverage += usize::from(covered);
        }

        let mut best: Option<(usize, usize)> = None;
        for (i, &score) in scores.iter().enumerate() {
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((i, score));
            }
        }
        TableTotals {
            total_queries: self.rows.len(),
            coverage,
            best_solver: best.map(|(i, _)| self.solvers[i].clone()),
            best_score: best.map_or(0, |(_, score)| score),
        }
    }

    /// Aligned table with a `title` banner and the totals.
    #[must_use]
    pub fn render(&self, title: &str, color: bool) -> String {
        let mut header: Vec<String> = vec!["Test name".to_string(), "query".to_string()];
        header.extend(self.solvers.iter().cloned());
        let body: Vec<Vec<(String, Option<&'static str>)>> = self
            .rows
            .iter()
            .map(|row| {
                let mut line = vec![(row.test.clone(), None), (row.query.to_string(), None)];
                line.extend(row.cells.iter().map(|c| (c.text(), c.color())));
                line
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for line in &body {
            for (width, (text, _)) in widths.iter_mut().zip(line) {
                *width = (*width).max(text.chars().count());
            }
        }

        let header_line = header
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!("{h:>w$}"))
            .collect::<Vec<_>>()
            .join(" ");
        let header_len = header_line.chars().count();
        let rule = "-".repeat(header_len);

        let pad = header_len.saturating_sub(title.chars().count());
        let (left, right) = (pad - pad / 2, pad / 2);

        let mut out = format!("{}{title}{}\n", "=".repeat(left), "=".repeat(right));
        out.push_str(&header_line);
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        for line in &body {
            let cells: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|((text, paint), w)| {
                    let padded = format!("{text:>w$}");
                    match paint {
                        Some(code) if color => format!("{code}{padded}{RESET}"),
                        _ => padded,
                    }
                })
                .collect();
            out.push_str(&cells.join(" "));
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');

        let totals = self.totals();
        out.push_str(&format!("Total queries:\t\t{}\n", totals.total_queries));
        out.push_str(&format!("Solver coverage:\t{}\n", totals.coverage));
        if let Some(best) = &totals.best_solver {
            out.push_str(&format!("Best {best} with score:\t{}\n", totals.best_score));
        }
        out
    }
}

pub fn run_table(args: TableArgs) -> Result<()> {
    let timed = timed_pattern()?;
    let color = !args.plain && std::io::stdout().is_terminal();
    for folder in &args.folders {
        let tests = read_folder(folder, &timed)?;
        let table = SolverTable::build(&tests);
        if args.json {
            println!("{}", serde_json::to_string(&table.totals())?);
        } else {
            println!("{}", table.render(&folder.display().to_string(), color));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn classification_follows_result_text() {
        let re = timed_pattern().unwrap();
        assert_eq!(Cell::parse("Sat\n", &re).text(), "sat");
        assert_eq!(Cell::parse("(Unsat, 120)", &re).text(), "unsat(120)");
        assert_eq!(Cell::parse("(Time limit, 5000)", &re).text(), "TL");
        assert_eq!(Cell::parse("z3: segfault", &re).text(), "z3 :(");
        assert_eq!(Cell::parse("Unknown", &re).text(), "-");
        assert_eq!(Cell::parse("", &re).verdict, Verdict::NoResult);
    }

    #[test]
    fn reference_agreement_ignores_timing() {
        let re = timed_pattern().unwrap();
        let results = parse_results("z3\t(Sat, 10)\ncvc\tUnsat\nHuman\tSat\n", &re);
        assert!(results["z3"].matches_reference);
        assert!(!results["cvc"].matches_reference);
        assert!(results["Human"].matches_reference);
    }

    #[test]
    fn without_reference_nothing_matches() {
        let re = timed_pattern().unwrap();
        let results = parse_results("z3\tSat\n", &re);
        assert!(!results["z3"].matches_reference);
    }

    #[test]
    fn test_names_drop_two_trailing_parts() {
        assert_eq!(test_name("Lists.Length.0"), "Lists");
        assert_eq!(test_name("A.B.C.D"), "A.B");
        assert_eq!(test_name("Plain"), "Plain");
        assert_eq!(test_name("One.Two"), "One");
    }

    #[test]
    fn folder_table_counts_coverage_and_best_solver() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("Beta.x.1/0.results"), "z3\tSat\ncvc\tUnsat\nHuman\tSat\n");
        write(&root.join("Beta.x.1/1.results"), "z3\tTime limit\ncvc\tUnsat\nHuman\tUnsat\n");
        write(&root.join("Beta.x.1/10.results"), "z3\tUnsat\ncvc\tSat\nHuman\tSat\n");
        write(&root.join("Alpha.y.2/0.results"), "z3\t(Sat, 12)\ncvc\tSat\n");
        write(&root.join("Alpha.y.2/notes.results"), "ignored\tSat\n");
        write(&root.join("Alpha.y.2/readme.txt"), "ignored");

        let re = timed_pattern().unwrap();
        let tests = read_folder(root, &re).unwrap();
        let table = SolverTable::build(&tests);

        assert_eq!(table.solvers, ["cvc", "z3", "Human"]);
        let order: Vec<(String, usize)> =
            table.rows.iter().map(|r| (r.test.clone(), r.query)).collect();
        assert_eq!(
            order,
            [
                ("Alpha".to_string(), 0),
                ("Beta".to_string(), 0),
                ("Beta".to_string(), 1),
                ("Beta".to_string(), 2),
            ]
        );
        // Beta query 2 is the file numbered 10.
        assert_eq!(table.rows[3].cells[1].verdict, Verdict::Unsat);

        let totals = table.totals();
        assert_eq!(totals.total_queries, 4);
        assert_eq!(totals.coverage, 3);
        // Alpha has no reference and counts for nobody.
        assert_eq!(totals.best_solver.as_deref(), Some("cvc"));
        assert_eq!(totals.best_score, 2);
    }

    #[test]
    fn render_aligns_columns_and_prints_totals() {
        let re = timed_pattern().unwrap();
        let mut tests = BTreeMap::new();
        tests.insert(
            "Lists".to_string(),
            vec![parse_results("z3\t(Sat, 7)\nHuman\tSat\n", &re)],
        );
        let text = SolverTable::build(&tests).render("Folder", false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[1], "Test name query     z3 Human");
        assert_eq!(lines[0].chars().count(), lines[1].chars().count());
        assert!(lines[0].contains("Folder"));
        assert!(lines[0].starts_with("========"));
        assert_eq!(lines[3], "    Lists     0 sat(7)   sat");
        assert!(text.contains("Total queries:\t\t1\n"));
        assert!(text.contains("Solver coverage:\t1\n"));
        assert!(text.contains("Best z3 with score:\t1\n"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn colour_marks_matches_and_limits() {
        let re = timed_pattern().unwrap();
        let mut tests = BTreeMap::new();
        tests.insert(
            "T".to_string(),
            vec![parse_results("a\tTime limit\nb\tSat\nHuman\tSat\n", &re)],
        );
        let text = SolverTable::build(&tests).render("F", true);
        assert!(text.contains(&format!("{BLUE}TL{RESET}")), "{text}");
        assert!(text.contains(&format!("{GREEN}sat{RESET}")), "{text}");
    }
}
