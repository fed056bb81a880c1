//! Configuration-section extraction.
//!
//! Locates the block that documents one named option (for example
//! `[bed_mesh]`) inside a free-form markdown reference page. This is a
//! line-oriented text heuristic, not a markdown parser:
//!
//! 1. The option name is expanded into variants: as given, underscores as
//!    spaces, hyphens as underscores.
//! 2. For every variant, look for a heading whose bracketed label starts
//!    with the variant (`### [bed_mesh]`). The block runs up to the next
//!    heading of the same or a higher level.
//! 3. Otherwise look for a bare label line (`[bed_mesh]`). The block runs up
//!    to the next label or heading; the nearest preceding heading is kept
//!    as context.
//! 4. Otherwise there is no match.
//!
//! Code fences (backtick or tilde, any length) are tracked so that `#`
//! comment lines inside sample configs are not mistaken for headings.
//! Hand-authored pages with unusual layouts can still produce blocks that
//! are too long or too short; absence of a match is never an error.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(#{1,6})(?:[ \t]|\[|$)").expect("valid heading regex"))
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[([^\]]+)\]\s*(?:#.*)?$").expect("valid label regex"))
}

/// How a section was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Heading,
    Label,
}

/// An extracted configuration block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSection {
    /// Enclosing heading line, set for label matches when one exists.
    pub context: Option<String>,
    /// The matched marker line.
    pub header: String,
    /// Lines after the header, trailing whitespace removed.
    pub body: String,
    pub kind: MatchKind,
    /// 1-based line number of `header`.
    pub line: usize,
}

impl ConfigSection {
    /// The header and body as one contiguous block.
    pub fn block(&self) -> String {
        if self.body.is_empty() {
            self.header.clone()
        } else {
            format!("{}\n{}", self.header, self.body)
        }
    }
}

impl fmt::Display for ConfigSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{}\n\n{}", context, self.block()),
            None => f.write_str(&self.block()),
        }
    }
}

struct Line<'a> {
    text: &'a str,
    heading_level: Option<usize>,
    label: Option<String>,
}

/// Classify every line, tracking fenced code blocks.
fn scan_lines(content: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut fence: Option<(char, usize)> = None;

    for text in content.lines() {
        let trimmed = text.trim_start();
        let fence_marker = trimmed
            .chars()
            .next()
            .filter(|c| *c == '`' || *c == '~')
            .map(|c| (c, trimmed.chars().take_while(|x| *x == c).count()))
            .filter(|(_, n)| *n >= 3);

        match (fence, fence_marker) {
            (None, Some(marker)) => {
                fence = Some(marker);
                lines.push(Line {
                    text,
                    heading_level: None,
                    label: None,
                });
                continue;
            }
            (Some((ch, len)), Some((mch, mlen)))
                if ch == mch && mlen >= len && trimmed.trim_start_matches(ch).trim().is_empty() =>
            {
                fence = None;
                lines.push(Line {
                    text,
                    heading_level: None,
                    label: None,
                });
                continue;
            }
            _ => {}
        }

        let heading_level = if fence.is_none() {
            heading_re().captures(text).map(|c| c[1].len())
        } else {
            None
        };
        let label = if heading_level.is_none() {
            label_re().captures(text).map(|c| c[1].trim().to_lowercase())
        } else {
            None
        };

        lines.push(Line {
            text,
            heading_level,
            label,
        });
    }

    lines
}

/// The bracketed label on a heading line, lowercased.
fn heading_label(text: &str) -> Option<String> {
    let rest = text.trim_start().trim_start_matches('#').trim_start();
    let inner = rest.strip_prefix('[')?;
    let end = inner.find(']')?;
    Some(inner[..end].trim().to_lowercase())
}

/// Name variants tried in order, deduplicated.
///
/// ```
/// use klipper_docs_core::extract::option_variants;
///
/// assert_eq!(option_variants("bed_mesh"), vec!["bed_mesh", "bed mesh"]);
/// assert_eq!(option_variants("[probe-eddy]"), vec!["probe-eddy", "probe_eddy"]);
/// ```
pub fn option_variants(option: &str) -> Vec<String> {
    let base = option
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .to_string();
    if base.is_empty() {
        return Vec::new();
    }

    let mut variants = Vec::new();
    for v in [base.clone(), base.replace('_', " "), base.replace('-', "_")] {
        if !variants.contains(&v) {
            variants.push(v);
        }
    }
    variants
}

fn join_block(lines: &[Line<'_>], start: usize, end: usize) -> (String, String) {
    let header = lines[start].text.trim_end().to_string();
    let body = lines[start + 1..end]
        .iter()
        .map(|l| l.text)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string();
    (header, body)
}

fn find_heading_match(lines: &[Line<'_>], variant: &str) -> Option<ConfigSection> {
    let start = lines.iter().position(|l| {
        l.heading_level.is_some()
            && heading_label(l.text).is_some_and(|label| label.starts_with(variant))
    })?;
    let level = lines[start].heading_level?;

    let end = lines[start + 1..]
        .iter()
        .position(|l| l.heading_level.is_some_and(|lvl| lvl <= level))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());

    let (header, body) = join_block(lines, start, end);
    Some(ConfigSection {
        context: None,
        header,
        body,
        kind: MatchKind::Heading,
        line: start + 1,
    })
}

fn find_label_match(lines: &[Line<'_>], variant: &str) -> Option<ConfigSection> {
    let start = lines
        .iter()
        .position(|l| l.label.as_deref().is_some_and(|label| label.starts_with(variant)))?;

    let end = lines[start + 1..]
        .iter()
        .position(|l| l.label.is_some() || l.heading_level.is_some())
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());

    let context = lines[..start]
        .iter()
        .rev()
        .find(|l| l.heading_level.is_some())
        .map(|l| l.text.trim_end().to_string());

    let (header, body) = join_block(lines, start, end);
    Some(ConfigSection {
        context,
        header,
        body,
        kind: MatchKind::Label,
        line: start + 1,
    })
}

/// Locate the configuration block for `option` in `content`.
///
/// Heading matches for every variant are tried before any label match.
pub fn find_config_section(content: &str, option: &str) -> Option<ConfigSection> {
    let variants: Vec<String> = option_variants(option)
        .into_iter()
        .map(|v| v.to_lowercase())
        .collect();
    if variants.is_empty() {
        return None;
    }

    let lines = scan_lines(content);

    variants
        .iter()
        .find_map(|v| find_heading_match(&lines, v))
        .or_else(|| variants.iter().find_map(|v| find_label_match(&lines, v)))
}

/// Text of the configuration block for `option`, or `None`.
///
/// # Example
///
/// ```
/// use klipper_docs_core::extract::extract_config_section;
///
/// let doc = "### [bed_mesh]\nfoo\n### [extruder]\nbar";
/// assert_eq!(
///     extract_config_section(doc, "bed_mesh").as_deref(),
///     Some("### [bed_mesh]\nfoo")
/// );
/// assert_eq!(extract_config_section(doc, "heater_bed"), None);
/// ```
pub fn extract_config_section(content: &str, option: &str) -> Option<String> {
    find_config_section(content, option).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "\
# Configuration reference

## Bed mesh

### [bed_mesh]

Mesh bed leveling.

```
[bed_mesh]
#speed: 50
#   The speed (in mm/s) of non-probing moves.
## not a heading inside a fence
```

#### Profiles

Profile details.

### [extruder]

```
[extruder]
rotation_distance: 33.5
```

## Misc

Plain paragraph mentioning [heater_generic my_heater] inline.

```
[temperature_sensor chamber]
sensor_type: ATC Semitec 104GT-2
```

Trailing notes.

### Z Tilt

```
[z_tilt]
z_positions: 0,0
[quad_gantry_level]
gantry_corners: 0,0
```
";

    #[test]
    fn test_exact_block_up_to_next_heading() {
        let doc = "### [bed_mesh]\nfoo\n### [extruder]\nbar";
        assert_eq!(
            extract_config_section(doc, "bed_mesh").as_deref(),
            Some("### [bed_mesh]\nfoo")
        );
    }

    #[test]
    fn test_heading_match_includes_deeper_headings_and_fences() {
        let section = find_config_section(REFERENCE, "bed_mesh").unwrap();
        assert_eq!(section.kind, MatchKind::Heading);
        assert_eq!(section.header, "### [bed_mesh]");
        assert!(section.body.contains("#   The speed"));
        assert!(section.body.contains("## not a heading inside a fence"));
        assert!(section.body.contains("#### Profiles"));
        assert!(section.body.ends_with("Profile details."));
        assert!(!section.body.contains("[extruder]"));
    }

    #[test]
    fn test_heading_match_stops_at_higher_level() {
        let section = find_config_section(REFERENCE, "extruder").unwrap();
        assert!(section.body.contains("rotation_distance: 33.5"));
        assert!(!section.body.contains("## Misc"));
    }

    #[test]
    fn test_case_insensitive() {
        let section = find_config_section(REFERENCE, "BED_MESH").unwrap();
        assert_eq!(section.header, "### [bed_mesh]");
    }

    #[test]
    fn test_space_variant_matches_heading() {
        let doc = "## [bed mesh]\nspaced label\n## Next";
        let section = find_config_section(doc, "bed_mesh").unwrap();
        assert_eq!(section.block(), "## [bed mesh]\nspaced label");
    }

    #[test]
    fn test_hyphen_variant() {
        let doc = "### [probe_eddy_current]\neddy\n";
        let section = find_config_section(doc, "probe-eddy-current").unwrap();
        assert_eq!(section.header, "### [probe_eddy_current]");
    }

    #[test]
    fn test_label_fallback_prepends_context() {
        let section = find_config_section(REFERENCE, "temperature_sensor").unwrap();
        assert_eq!(section.kind, MatchKind::Label);
        assert_eq!(section.context.as_deref(), Some("## Misc"));
        assert_eq!(section.header, "[temperature_sensor chamber]");
        let text = section.to_string();
        assert!(text.starts_with("## Misc\n\n[temperature_sensor chamber]"));
        assert!(text.contains("Trailing notes."));
        assert!(!text.contains("### Z Tilt"));
    }

    #[test]
    fn test_label_block_stops_at_next_label() {
        let section = find_config_section(REFERENCE, "z_tilt").unwrap();
        assert_eq!(section.context.as_deref(), Some("### Z Tilt"));
        assert_eq!(section.body, "z_positions: 0,0");
    }

    #[test]
    fn test_inline_brackets_are_not_labels() {
        assert!(find_config_section(REFERENCE, "heater_generic").is_none());
    }

    #[test]
    fn test_not_found_and_empty_option() {
        assert!(extract_config_section(REFERENCE, "tmc2209").is_none());
        assert!(extract_config_section(REFERENCE, "").is_none());
        assert!(extract_config_section("", "bed_mesh").is_none());
    }

    #[test]
    fn test_irregular_spacing_and_unclosed_fence() {
        let doc = "  ###[fan]   \nfan body\n```\n### [fan] inside\n";
        let section = find_config_section(doc, "fan").unwrap();
        assert_eq!(section.header, "  ###[fan]");
        assert!(section.body.contains("### [fan] inside"));
    }

    #[test]
    fn test_longer_fence_contains_shorter() {
        let doc = "### [a]\n````\n```\n## fake\n```\n````\ntext\n## real\n";
        let section = find_config_section(doc, "a").unwrap();
        assert!(section.body.contains("## fake"));
        assert!(section.body.ends_with("text"));
    }

    #[test]
    fn test_heading_without_label_is_ignored() {
        let doc = "## bed_mesh notes\nnot a config block\n";
        assert!(find_config_section(doc, "bed_mesh").is_none());
    }
}
