//! Citation files for output products
//!
//! The provenance of a product lists the recipe, diagnostic script and
//! input data it was made from. From that a BibTeX file is written with
//! the recipe and diagnostic references, CMIP6 data citations fetched from
//! the CERA citation service, and the tool paper as the final entry. Any
//! references that cannot be turned into BibTeX end up as URLs in a plain
//! text file next to it.

use crate::config::Config;
use crate::constants::{CITATION_INFO_TITLE, CMIP6_URL_STEM, TOOL_CITATION};
use crate::error::Result;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attributes forming a CMIP6 dataset id, in order
const CMIP6_ID_ATTRIBUTES: &[&str] = &[
    "mip_era",
    "activity_id",
    "institution_id",
    "source_id",
    "experiment_id",
];

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// One provenance entity of a product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvenanceRecord {
    /// `recipe` for the recipe entity
    pub namespace: String,
    /// Attribute name and value pairs in recorded order
    pub attributes: Vec<(String, String)>,
    pub references: Vec<String>,
    /// The entity is a diagnostic script
    pub is_script: bool,
}

impl ProvenanceRecord {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_references(mut self, references: &[&str]) -> Self {
        self.references
            .extend(references.iter().map(|r| r.to_string()));
        self
    }

    pub fn as_script(mut self) -> Self {
        self.is_script = true;
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Source of CMIP6 data citation records
pub trait CitationService {
    /// JSON citation record at `url`, if it can be retrieved
    fn fetch(&self, url: &str) -> Option<Value>;
}

/// Looks citations up over HTTPS
pub struct HttpCitationService {
    client: reqwest::blocking::Client,
}

impl HttpCitationService {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl CitationService for HttpCitationService {
    fn fetch(&self, url: &str) -> Option<Value> {
        if !url.to_lowercase().starts_with("https") {
            return None;
        }
        match self.client.get(url).send() {
            Ok(response) if response.status().is_success() => response.json().ok(),
            Ok(response) => {
                warn!("Error in the CMIP6 citation link {}: {}", url, response.status());
                None
            }
            Err(e) => {
                info!("No network connection, unable to retrieve CMIP6 citation information: {}", e);
                None
            }
        }
    }
}

/// Never finds anything
pub struct OfflineCitationService;

impl CitationService for OfflineCitationService {
    fn fetch(&self, _url: &str) -> Option<Value> {
        None
    }
}

/// Dot-separated CMIP6 dataset id from the record's attributes
fn make_url_prefix(record: &ProvenanceRecord) -> String {
    CMIP6_ID_ATTRIBUTES
        .iter()
        .map(|key| record.attribute(key).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(".")
}

pub fn make_json_url(url_prefix: &str) -> String {
    format!("{}/cerarest/exportcmip6?input={}", CMIP6_URL_STEM, url_prefix)
}

pub fn make_info_url(url_prefix: &str) -> String {
    format!("{}/cmip6?input=CMIP6.{}", CMIP6_URL_STEM, url_prefix)
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// BibTeX entry from a CERA citation record
pub fn json_to_bibtex(data: &Value) -> String {
    let title = data
        .get("titles")
        .and_then(|t| t.get(0))
        .map(json_text)
        .unwrap_or_else(|| "title not found".to_string());
    let publisher = data
        .get("publisher")
        .map(json_text)
        .unwrap_or_else(|| "publisher not found".to_string());
    let year = data
        .get("publicationYear")
        .map(json_text)
        .unwrap_or_else(|| "publicationYear not found".to_string());

    let creators: Vec<String> = data
        .get("creators")
        .and_then(Value::as_array)
        .map(|creators| {
            creators
                .iter()
                .filter_map(|c| c.get("creatorName").map(json_text))
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let authors = if creators.is_empty() {
        "creators not found".to_string()
    } else {
        creators.join(" and ")
    };

    let (doi, url) = match data.get("identifier").and_then(|i| i.get("id")) {
        Some(id) => {
            let doi = json_text(id);
            let url = format!("https://doi.org/{}", doi);
            (doi, url)
        }
        None => ("doi not found".to_string(), "url not found".to_string()),
    };

    format!(
        "\n@misc{{{url},\n\turl = {{{url}}},\n\ttitle = {{{title}}},\n\tpublisher = {{{publisher}}},\n\tyear = {year},\n\tauthor = {{{authors}}},\n\tdoi = {{{doi}}},\n}}\n"
    )
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("valid word regex"))
}

/// Individual tags in recorded reference strings, first occurrence first
pub fn extract_tags(references: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for reference in references {
        for tag in word_regex().find_iter(reference) {
            if !tags.iter().any(|t| t == tag.as_str()) {
                tags.push(tag.as_str().to_string());
            }
        }
    }
    tags
}

/// Writes citation files through a [`CitationService`]
pub struct CitationWriter<'a> {
    references_path: Option<PathBuf>,
    service: &'a dyn CitationService,
}

impl<'a> CitationWriter<'a> {
    pub fn new(references_path: Option<PathBuf>, service: &'a dyn CitationService) -> Self {
        Self {
            references_path,
            service,
        }
    }

    fn bibtex_for_tag(&self, references_path: &Path, tag: &str) -> String {
        let bibtex_file = references_path.join(format!("{}.bibtex", tag));
        match fs::read_to_string(&bibtex_file) {
            Ok(entry) => entry,
            Err(_) => {
                warn!("The reference file {} does not exist.", bibtex_file.display());
                String::new()
            }
        }
    }

    /// Write the citation files of `product`; returns the files written
    ///
    /// Missing reference files and failed lookups only leave their entry
    /// out.
    pub fn write(&self, product: &Path, records: &[ProvenanceRecord]) -> Result<Vec<PathBuf>> {
        let mut info_urls: Vec<String> = Vec::new();
        let mut json_urls = Vec::new();
        let mut tags = Vec::new();
        for record in records {
            if record.attribute("mip_era").is_some_and(|era| era.contains("CMIP6")) {
                let prefix = make_url_prefix(record);
                info_urls.push(make_info_url(&prefix));
                json_urls.push(make_json_url(&prefix));
            }
            if record.references.is_empty() {
                continue;
            }
            if record.namespace == "recipe" || record.is_script {
                tags.extend(record.references.iter().cloned());
            } else {
                info_urls.extend(record.references.iter().cloned());
            }
        }

        let stem = product.with_extension("");
        let stem = stem.display();
        let mut written = Vec::new();

        if !info_urls.is_empty() {
            let mut lines = vec![CITATION_INFO_TITLE.to_string()];
            for url in info_urls {
                if !lines.contains(&url) {
                    lines.push(url);
                }
            }
            let info_file = PathBuf::from(format!("{}_data_citation_info.txt", stem));
            fs::write(&info_file, lines.join("\n"))?;
            written.push(info_file);
        }

        let mut entries = Vec::new();
        for url in &json_urls {
            if let Some(data) = self.service.fetch(url) {
                entries.push(json_to_bibtex(&data));
            }
        }
        if let Some(references_path) = &self.references_path {
            for tag in extract_tags(&tags) {
                entries.push(self.bibtex_for_tag(references_path, &tag));
            }
        }
        entries.push(TOOL_CITATION.to_string());

        let bibtex_file = PathBuf::from(format!("{}_citation.bibtex", stem));
        debug!("Writing {} citation entries to {}", entries.len(), bibtex_file.display());
        fs::write(&bibtex_file, entries.join("\n"))?;
        written.push(bibtex_file);
        Ok(written)
    }
}

/// Write the citation files of `product` using the configured references
/// and network access
pub fn write_citation_file(product: &Path, records: &[ProvenanceRecord], config: &Config) -> Result<Vec<PathBuf>> {
    let references_path = config.user.references_path.clone();
    if config.user.offline {
        CitationWriter::new(references_path, &OfflineCitationService).write(product, records)
    } else {
        let service = HttpCitationService::new()?;
        CitationWriter::new(references_path, &service).write(product, records)
    }
}
