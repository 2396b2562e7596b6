//! Loader for the section based configuration file.
//!
//! ```text
//! # global keys
//! keepalive = true
//! timeout = 10
//!
//! [search]
//! weight = 2
//! method = GET
//! url = http://127.0.0.1:2080/search
//! ```
//!
//! Loading happens in two steps. The text is first read into a [`ConfigDocument`], a plain
//! string map for the global keys plus one map per section. The document is then mapped onto a
//! [`RunConfig`] key by key, see [`ConfigDocument::apply_to`].

use log::{debug, trace};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io::Error as StdIoError;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use stress_types::{RequestTemplate, RunConfig};

pub const KEY_KEEP_ALIVE: &str = "keepalive";
pub const KEY_TIMEOUT: &str = "timeout";
pub const KEY_HEADER: &str = "header";
pub const KEY_WEIGHT: &str = "weight";
pub const KEY_METHOD: &str = "method";
pub const KEY_URL: &str = "url";
pub const KEY_CONTENT_TYPE: &str = "contenttype";
pub const KEY_POST_DATA: &str = "postdata";

#[derive(Debug)]
pub enum ConfigFileError {
    Io(StdIoError),
    /// `line` is 1-based
    Syntax { line: usize, content: String },
}

impl Display for ConfigFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFileError::Io(e) => write!(f, "failed to read config file: {}", e),
            ConfigFileError::Syntax { line, content } => {
                write!(f, "line {}: invalid config syntax: {}", line, content)
            }
        }
    }
}

impl StdError for ConfigFileError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigFileError::Io(e) => Some(e),
            ConfigFileError::Syntax { .. } => None,
        }
    }
}

impl From<StdIoError> for ConfigFileError {
    fn from(e: StdIoError) -> Self {
        ConfigFileError::Io(e)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub entries: HashMap<String, String>,
}

/// Raw content of a config file, nothing is interpreted yet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    pub global: HashMap<String, String>,
    /// in file order. A section name used twice keeps its first position and the last content.
    pub sections: Vec<Section>,
    /// global `header` keys, in file order, as the global map keeps only the last one
    pub headers: Vec<String>,
}

impl FromStr for ConfigDocument {
    type Err = ConfigFileError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut document = ConfigDocument::default();
        let mut current: Option<Section> = None;
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            // very short lines can't hold a `k=v` pair, skip them like comments
            if line.is_empty() || line.starts_with('#') || line.len() <= 3 {
                continue;
            }

            if line.starts_with('[') {
                if !line.ends_with(']') {
                    return Err(syntax_error(idx, line));
                }
                if let Some(section) = current.take() {
                    document.push_section(section);
                }
                current = Some(Section {
                    name: line.trim_matches(|c| c == '[' || c == ']').to_string(),
                    entries: HashMap::new(),
                });
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| syntax_error(idx, line))?;
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            trace!("[ConfigDocument] - line {}: {} = {}", idx + 1, &key, &value);
            match current.as_mut() {
                Some(section) => {
                    section.entries.insert(key, value);
                }
                None => {
                    if key == KEY_HEADER {
                        document.headers.push(value.clone());
                    }
                    document.global.insert(key, value);
                }
            }
        }
        if let Some(section) = current.take() {
            document.push_section(section);
        }
        Ok(document)
    }
}

fn syntax_error(idx: usize, line: &str) -> ConfigFileError {
    ConfigFileError::Syntax {
        line: idx + 1,
        content: line.to_string(),
    }
}

impl ConfigDocument {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        debug!("[ConfigDocument] - loading {}", path.display());
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }

    fn push_section(&mut self, section: Section) {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => existing.entries = section.entries,
            None => self.sections.push(section),
        }
    }

    /// Build the run configuration, starting from `base` (usually built from command line flags).
    ///
    /// Global keys override the matching `base` fields, headers are appended to the base
    /// headers and every section becomes a template, in file order. Templates in `base` are
    /// replaced.
    pub fn apply_to(&self, base: RunConfig) -> RunConfig {
        let mut config = base;
        for (key, value) in self.global.iter() {
            match key.as_str() {
                KEY_KEEP_ALIVE => {
                    if let Some(keep_alive) = parse_bool(value) {
                        config.keep_alive = keep_alive;
                    }
                }
                KEY_TIMEOUT => {
                    if let Ok(secs) = u64::from_str(value) {
                        config.timeout = Duration::from_secs(secs);
                    }
                }
                KEY_HEADER => {}
                _ => debug!("[ConfigDocument] - ignoring unknown global key: {}", key),
            }
        }
        config.headers.extend(self.headers.iter().cloned());
        config.templates = self.sections.iter().map(Section::to_template).collect();
        config
    }
}

impl Section {
    pub fn to_template(&self) -> RequestTemplate {
        let mut template = RequestTemplate::default();
        for (key, value) in self.entries.iter() {
            match key.as_str() {
                KEY_WEIGHT => template.weight = u32::from_str(value).unwrap_or(0),
                KEY_METHOD => template.method = value.clone(),
                KEY_URL => template.url = value.clone(),
                KEY_CONTENT_TYPE => template.content_type = value.clone(),
                KEY_POST_DATA => template.body = value.clone(),
                _ => debug!(
                    "[Section] - ignoring unknown key {} in section {}",
                    key, &self.name
                ),
            }
        }
        template
    }
}

/// Empty value means "not set". Anything that's not a recognized true value counts as false.
fn parse_bool(value: &str) -> Option<bool> {
    if value.is_empty() {
        return None;
    }
    Some(matches!(value.to_lowercase().as_str(), "1" | "t" | "true"))
}

/// Read the file at `path` and apply it to `base`
pub fn load_run_config<P: AsRef<Path>>(
    path: P,
    base: RunConfig,
) -> Result<RunConfig, ConfigFileError> {
    let document = ConfigDocument::load(path)?;
    Ok(document.apply_to(base))
}
