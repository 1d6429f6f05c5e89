//! `{tag}` placeholder substitution

use crate::constants::{LATEST_VERSION_TAG, LOWER_SUFFIX, UPPER_SUFFIX};
use crate::error::{DrsError, Result};
use crate::models::{DatasetDescriptor, TagValue};
use regex::Regex;
use std::sync::OnceLock;

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^}]*)\}").expect("valid tag regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseFold {
    Keep,
    Lower,
    Upper,
}

/// Split `name.lower` / `name.upper` into the tag name and its modifier
fn caps_options(tag: &str) -> (&str, CaseFold) {
    if let Some(name) = tag.strip_suffix(LOWER_SUFFIX) {
        (name, CaseFold::Lower)
    } else if let Some(name) = tag.strip_suffix(UPPER_SUFFIX) {
        (name, CaseFold::Upper)
    } else {
        (tag, CaseFold::Keep)
    }
}

fn apply_caps(value: &str, fold: CaseFold) -> String {
    match fold {
        CaseFold::Keep => value.to_string(),
        CaseFold::Lower => value.to_lowercase(),
        CaseFold::Upper => value.to_uppercase(),
    }
}

/// Substitute one placeholder in every path, one output path per value
fn replace_tag(paths: &[String], placeholder: &str, value: &TagValue, fold: CaseFold) -> Vec<String> {
    let mut result = Vec::with_capacity(paths.len() * value.values().len());
    for item in value.values() {
        let text = apply_caps(item, fold);
        result.extend(paths.iter().map(|path| path.replace(placeholder, &text)));
    }
    result
}

/// Expand a path template into every path it describes
///
/// Leading and trailing `/` are stripped first. A tag bound to a list fans
/// out into one path per value, in list order; several list-valued tags
/// compound. `{latestversion}` is left in place for the version resolver.
pub fn replace_tags(template: &str, descriptor: &DatasetDescriptor) -> Result<Vec<String>> {
    let template = template.trim_matches('/');

    let mut tags: Vec<&str> = Vec::new();
    for capture in tag_regex().captures_iter(template) {
        if let Some(tag) = capture.get(1).map(|m| m.as_str()) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }

    let mut paths = vec![template.to_string()];
    for original_tag in tags {
        let (tag, fold) = caps_options(original_tag);
        if tag == LATEST_VERSION_TAG {
            continue;
        }
        let value = descriptor.get(tag).ok_or_else(|| DrsError::MissingTag {
            tag: tag.to_string(),
            descriptor: descriptor.to_string(),
        })?;
        paths = replace_tag(&paths, &format!("{{{}}}", original_tag), value, fold);
    }
    Ok(paths)
}
