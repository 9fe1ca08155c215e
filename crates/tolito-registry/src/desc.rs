//! Parsing of repository database `desc` records.
//!
//! A record is a sequence of `%SECTION%` headers, each followed by its value lines:
//!
//! ```text
//! %NAME%
//! bar
//!
//! %VERSION%
//! 1.0-1
//! ```

/// One package entry of a repository database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub depends: Vec<String>,
    pub filename: String,
}

#[derive(Clone, Copy)]
enum Section {
    Name,
    Version,
    Desc,
    Filename,
    Depends,
    Other,
}

impl Section {
    fn from_header(header: &str) -> Self {
        match header {
            "NAME" => Section::Name,
            "VERSION" => Section::Version,
            "DESC" => Section::Desc,
            "FILENAME" => Section::Filename,
            "DEPENDS" => Section::Depends,
            _ => Section::Other,
        }
    }
}

fn header_of(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('%')?.strip_suffix('%')?;
    (!inner.is_empty()).then_some(inner)
}

/// Parses a single `desc` record. Returns `None` when it carries no package name.
pub fn parse_desc(content: &str) -> Option<PackageInfo> {
    let mut info = PackageInfo::default();
    let mut section: Option<Section> = None;

    for line in content.lines() {
        let line = line.trim();

        if let Some(header) = header_of(line) {
            section = Some(Section::from_header(header));
            continue;
        }

        let Some(current) = section else {
            continue;
        };

        match current {
            Section::Depends => {
                if !line.is_empty() {
                    info.depends.push(line.to_string());
                }
            }
            Section::Name => info.name = line.to_string(),
            Section::Version => info.version = line.to_string(),
            Section::Desc => info.description = line.to_string(),
            Section::Filename => info.filename = line.to_string(),
            Section::Other => {}
        }

        // single-value sections take only the line right after the header
        if !matches!(current, Section::Depends) {
            section = None;
        }
    }

    (!info.name.is_empty()).then_some(info)
}
