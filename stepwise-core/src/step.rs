use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

pub const FOLDER_DELIMITER: &str = "|>";
pub const STEP_NAME_SEPARATOR: &str = "<|||";
pub const STEP_NAME_TERMINATOR: &str = "|||>";
const INDEX_SEPARATOR: &str = " ### ";
const METHOD_SEPARATOR: &str = " ~~> ";

/// Folder segments from the collection root down to the step's parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FolderPath(Vec<String>);

impl FolderPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parses `a|>b|>c`; leading and trailing delimiters are ignored.
    pub fn from_delimited(path: &str) -> Self {
        let trimmed = path
            .trim()
            .trim_start_matches(FOLDER_DELIMITER)
            .trim_end_matches(FOLDER_DELIMITER);
        if trimmed.is_empty() {
            return Self::root();
        }
        Self::new(trimmed.split(FOLDER_DELIMITER))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    /// True when `sub` occurs as a contiguous run of segments.
    pub fn contains_subpath(&self, sub: &FolderPath) -> bool {
        if sub.is_root() {
            return true;
        }
        self.0.windows(sub.0.len()).any(|w| w == sub.0.as_slice())
    }

    pub fn ends_with(&self, suffix: &FolderPath) -> bool {
        self.0.ends_with(&suffix.0)
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(FOLDER_DELIMITER))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Auth {
    Bearer { token: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptKind {
    PreRequest,
    Test,
}

/// Raw script text attached to a step; evaluation is delegated to a `ScriptEvaluator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Script {
    pub kind: ScriptKind,
    pub source: String,
}

/// Unresolved request: every string may still contain `{{name}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestTemplate {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub auth: Option<Auth>,
}

impl RequestTemplate {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
            auth: None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Auth::Bearer { token: token.into() });
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One executable request in a collection, flattened out of its folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub index: String,
    pub name: String,
    pub folder: FolderPath,
    pub request: RequestTemplate,
    pub tags: BTreeSet<String>,
    pub scripts: Vec<Script>,
}

impl Step {
    pub fn new(index: impl Into<String>, name: impl Into<String>, request: RequestTemplate) -> Self {
        Self {
            index: index.into(),
            name: name.into(),
            folder: FolderPath::root(),
            request,
            tags: BTreeSet::new(),
            scripts: Vec::new(),
        }
    }

    pub fn with_folder(mut self, folder: FolderPath) -> Self {
        self.folder = folder;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_script(mut self, kind: ScriptKind, source: impl Into<String>) -> Self {
        self.scripts.push(Script { kind, source: source.into() });
        self
    }

    pub fn method(&self) -> &str {
        &self.request.method
    }

    pub fn is_in_root(&self) -> bool {
        self.folder.is_root()
    }

    /// `folder|>sub<|||name|||>`, or just the name for root steps.
    pub fn display_path(&self) -> String {
        if self.folder.is_root() {
            self.name.clone()
        } else {
            format!("{}{STEP_NAME_SEPARATOR}{}{STEP_NAME_TERMINATOR}", self.folder, self.name)
        }
    }

    /// `index ### METHOD ~~> display_path`, unique within a collection.
    pub fn display_name(&self) -> String {
        format!(
            "{}{INDEX_SEPARATOR}{}{METHOD_SEPARATOR}{}",
            self.index,
            self.request.method,
            self.display_path()
        )
    }

    /// Accepts the plain name, the display name, or a `folder|>sub<|||name` suffix path.
    pub fn name_matches(&self, step_name: &str) -> bool {
        self.name == step_name || self.display_name() == step_name || self.path_ends_with(step_name)
    }

    /// A blank path only matches root steps.
    pub fn in_folder(&self, folder_path: &str) -> bool {
        let wanted = FolderPath::from_delimited(folder_path);
        if wanted.is_root() {
            return self.folder.is_root();
        }
        self.folder.contains_subpath(&wanted)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn scripts_of(&self, kind: ScriptKind) -> impl Iterator<Item = &Script> {
        self.scripts.iter().filter(move |s| s.kind == kind)
    }

    fn path_ends_with(&self, semi_path: &str) -> bool {
        let Some((folder, name)) = semi_path.split_once(STEP_NAME_SEPARATOR) else {
            return false;
        };
        let name = name.strip_suffix(STEP_NAME_TERMINATOR).unwrap_or(name);
        if name != self.name {
            return false;
        }
        let suffix = FolderPath::from_delimited(folder);
        !suffix.is_root() && self.folder.ends_with(&suffix)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}
