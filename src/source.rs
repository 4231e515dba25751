//! Per-request value sources read by the field walker.
//!
//! Every origin (path, query, headers, form bodies) is normalized into a
//! [`FieldSource`]; multipart uploads additionally produce a [`FileSource`].
//! Both are ordered multimaps: keys keep their first-insertion order and
//! values keep their arrival order under each key.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Ordered multimap from external field name to values.
///
/// # Examples
///
/// ```
/// use request_binder::FieldSource;
///
/// let mut source = FieldSource::new();
/// source.append("tag", "a".to_string());
/// source.append("tag", "b".to_string());
///
/// assert_eq!(source.get("tag"), Some(&["a".to_string(), "b".to_string()][..]));
/// assert_eq!(source.lookup("TAG").map(<[String]>::len), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Multimap<V> {
    entries: Vec<(String, Vec<V>)>,
    index: HashMap<String, usize>,
}

/// Multimap of string values keyed by external field name.
pub type FieldSource = Multimap<String>;

/// Multimap of uploaded files keyed by form field name.
pub type FileSource = Multimap<UploadedFile>;

impl<V> Multimap<V> {
    /// Creates an empty multimap.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Appends a value under `key`, after any values already present.
    pub fn append(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1.push(value),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, vec![value]));
            }
        }
    }

    /// Replaces every value under `key` with the single `value`.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1 = vec![value],
            None => self.append(key, value),
        }
    }

    /// Returns the values stored under exactly `key`.
    pub fn get(&self, key: &str) -> Option<&[V]> {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1.as_slice())
    }

    /// Returns the values for `key`, falling back to a case-insensitive scan.
    ///
    /// The exact key always wins. Otherwise the first key, in insertion
    /// order, that matches ignoring case is used.
    pub fn lookup(&self, key: &str) -> Option<&[V]> {
        self.get(key).or_else(|| {
            self.entries
                .iter()
                .find(|(candidate, _)| eq_ignore_case(candidate, key))
                .map(|(_, values)| values.as_slice())
        })
    }

    /// Returns `true` if `key` is present with exactly this casing.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no key is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates keys with their values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[V])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}

impl<V> Default for Multimap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> Extend<(K, V)> for Multimap<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.append(key, value);
        }
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Multimap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
        || a
            .chars()
            .flat_map(char::to_lowercase)
            .eq(b.chars().flat_map(char::to_lowercase))
}

/// Handle to a file uploaded in a multipart body.
///
/// The handle is cheap to clone: the content is shared, so binding the same
/// upload into several fields does not copy it.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    content: Arc<[u8]>,
}

impl UploadedFile {
    /// Creates a handle from the part's filename, declared type and content.
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            content: Arc::from(content.into()),
        }
    }

    /// Client-supplied filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Content type declared for the part, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// File content.
    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    /// Content length in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

impl Default for UploadedFile {
    fn default() -> Self {
        Self::new(String::new(), None, Vec::new())
    }
}

// Content is left out so uploads never end up in logs.
impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.content.len())
            .finish()
    }
}

/// A multipart body already decoded by the transport.
///
/// Text parts land in `values`, file parts in `files`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    /// Text parts by form field name.
    pub values: FieldSource,
    /// File parts by form field name.
    pub files: FileSource,
}

impl MultipartForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text part.
    pub fn add_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.append(name, value.into());
    }

    /// Adds a file part.
    pub fn add_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.files.append(name, file);
    }
}
