//! Markdown docs parser.
//!
//! Walks a docs root, applies include/exclude globs and turns every
//! matching markdown file into a [`Document`] snapshot for the engine.
//!
//! Derivation rules:
//!
//! | Field | Source |
//! |-------|--------|
//! | `id` | relative path without extension, lowercased, `/` separators, whitespace as `-` |
//! | `title` | frontmatter, else first `#` heading, else file stem |
//! | `section` | frontmatter, else first directory, else file stem (slugged) |
//! | `subsection` | frontmatter, else second directory (slugged) |
//! | `tags` | frontmatter list or comma-separated string |

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use klipper_docs_core::models::{Difficulty, Document, DocumentMetadata, Heading};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::DocsConfig;

const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    title: Option<String>,
    section: Option<String>,
    subsection: Option<String>,
    tags: Option<TagList>,
    difficulty: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagList {
    List(Vec<String>),
    Csv(String),
}

impl TagList {
    fn into_set(self) -> BTreeSet<String> {
        let raw = match self {
            TagList::List(list) => list,
            TagList::Csv(s) => s.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Parse every matching markdown file under `root`.
///
/// Files that cannot be read as UTF-8 are skipped with a warning. The
/// result is sorted by document id.
pub fn scan_docs(root: &Path, docs: &DocsConfig) -> Result<Vec<Document>> {
    if !root.exists() {
        anyhow::bail!("Docs root does not exist: {}", root.display());
    }

    let include_set = build_globset(&docs.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(docs.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut documents = Vec::new();

    let walker = WalkDir::new(root).follow_links(docs.follow_symlinks);
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        let last_modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        documents.push(parse_document(&rel_str, &raw, last_modified));
    }

    documents.sort_by(|a, b| a.id.cmp(&b.id));
    tracing::debug!(root = %root.display(), documents = documents.len(), "docs scanned");
    Ok(documents)
}

/// Build a [`Document`] from one file's relative path and raw text.
pub fn parse_document(relative_path: &str, raw: &str, last_modified: DateTime<Utc>) -> Document {
    let relative_path = relative_path.replace('\\', "/");
    let (frontmatter, body) = split_frontmatter(raw, &relative_path);
    let headings = extract_headings(body);

    let components: Vec<&str> = relative_path.split('/').filter(|c| !c.is_empty()).collect();
    let file_name = components.last().copied().unwrap_or("");
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let dirs = &components[..components.len().saturating_sub(1)];

    let title = frontmatter
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| headings.iter().find(|h| h.level == 1).map(|h| h.text.clone()))
        .unwrap_or_else(|| stem.replace(['_', '-'], " "));

    let section = frontmatter
        .section
        .as_deref()
        .map(slugify)
        .filter(|s| !s.is_empty())
        .or_else(|| dirs.first().map(|d| slugify(d)))
        .unwrap_or_else(|| slugify(stem));

    let subsection = frontmatter
        .subsection
        .as_deref()
        .map(slugify)
        .or_else(|| dirs.get(1).map(|d| slugify(d)))
        .filter(|s| !s.is_empty());

    let word_count = body.split_whitespace().count();
    let difficulty = frontmatter
        .difficulty
        .as_deref()
        .and_then(|d| match d.parse::<Difficulty>() {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(path = %relative_path, error = %e, "ignoring frontmatter difficulty");
                None
            }
        })
        .unwrap_or_else(|| estimate_difficulty(word_count, body));

    Document {
        id: document_id(&relative_path),
        title: title.trim().to_string(),
        content: body.to_string(),
        section,
        subsection,
        path: relative_path.clone(),
        last_modified,
        metadata: DocumentMetadata {
            word_count,
            reading_time: reading_time(word_count),
            difficulty,
            tags: frontmatter.tags.map(TagList::into_set).unwrap_or_default(),
            headings,
        },
    }
}

/// Stable identifier for a relative path.
///
/// ```
/// use klipper_docs::parser::document_id;
///
/// assert_eq!(document_id("Config_Reference.md"), "config_reference");
/// assert_eq!(document_id("guides\\Bed Level.md"), "guides/bed-level");
/// ```
pub fn document_id(relative_path: &str) -> String {
    let normalized = relative_path.replace('\\', "/");
    let without_ext = match normalized.rsplit_once('.') {
        Some((base, ext)) if !ext.contains('/') && !base.is_empty() && !base.ends_with('/') => {
            base.to_string()
        }
        _ => normalized,
    };
    without_ext
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Lowercase, runs of non-alphanumerics collapsed to `-`.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

fn reading_time(word_count: usize) -> u32 {
    word_count.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

fn estimate_difficulty(word_count: usize, body: &str) -> Difficulty {
    let code_blocks = body
        .lines()
        .filter(|l| l.trim_start().starts_with("```"))
        .count()
        / 2;
    if word_count > 3000 || code_blocks > 10 {
        Difficulty::Advanced
    } else if word_count > 1000 || code_blocks > 3 {
        Difficulty::Intermediate
    } else {
        Difficulty::Beginner
    }
}

/// Split a leading `---` YAML block from the body.
fn split_frontmatter<'a>(raw: &'a str, path: &str) -> (Frontmatter, &'a str) {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return (Frontmatter::default(), raw);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let frontmatter = match serde_yaml::from_str::<Option<Frontmatter>>(yaml) {
                Ok(fm) => fm.unwrap_or_default(),
                Err(e) => {
                    tracing::warn!(path, error = %e, "ignoring malformed frontmatter");
                    Frontmatter::default()
                }
            };
            return (frontmatter, body.trim_start_matches(['\r', '\n']));
        }
        offset += line.len();
    }

    (Frontmatter::default(), raw)
}

/// ATX headings outside fenced code blocks.
pub fn extract_headings(body: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    // Opening fence character and run length.
    let mut fence: Option<(char, usize)> = None;

    for line in body.lines() {
        let trimmed = line.trim_start();
        let marker = trimmed
            .chars()
            .next()
            .filter(|c| *c == '`' || *c == '~')
            .map(|c| (c, trimmed.chars().take_while(|x| *x == c).count()))
            .filter(|(_, n)| *n >= 3);

        match (fence, marker) {
            (None, Some(open)) => {
                fence = Some(open);
                continue;
            }
            (Some((ch, len)), Some((mch, mlen)))
                if ch == mch && mlen >= len && trimmed.trim_start_matches(ch).trim().is_empty() =>
            {
                fence = None;
                continue;
            }
            (Some(_), _) => continue,
            (None, None) => {}
        }

        let level = trimmed.chars().take_while(|c| *c == '#').count();
        if level == 0 || level > 6 {
            continue;
        }
        let rest = &trimmed[level..];
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let text = rest.trim().trim_end_matches('#').trim_end().to_string();
        if text.is_empty() {
            continue;
        }

        let base = anchor(&text);
        let count = seen.entry(base.clone()).or_insert(0);
        let anchor = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;

        headings.push(Heading {
            level: level as u8,
            text,
            anchor,
        });
    }

    headings
}

/// GitHub-style heading anchor.
fn anchor(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter_map(|c| match c {
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('-'),
            _ => None,
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
