//! Resource locator.
//!
//! Turns a call's options into a byte stream: a local file, an HTTP
//! payload, one entry of a zip archive, or inline `content`. Archives and
//! folders are also listed here, filtered to what the
//! [`TriplifierRegistry`] recognizes, so that listed names can be fed back
//! into nested calls.

use crate::config::LocatorConfig;
use crate::error::FacadeError;
use crate::properties::{keys, OptionSet};
use crate::triplifier::registry::{extension_of, DIRECTORY_MEDIA_TYPE};
use crate::triplifier::TriplifierRegistry;
use parking_lot::Mutex;
use regex::Regex;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("Neither a location nor inline content was given")]
    NoLocation,

    #[error("'{0}' does not exist")]
    NotFound(String),

    #[error("'{0}' is a directory")]
    IsDirectory(String),

    #[error("Cannot read '{location}': {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request for '{location}' failed: {reason}")]
    Http { location: String, reason: String },

    #[error("Cannot read archive '{archive}': {reason}")]
    Archive { archive: String, reason: String },

    #[error("Entry '{entry}' not found in archive '{archive}'")]
    EntryNotFound { archive: String, entry: String },
}

impl LocatorError {
    /// The location the failure refers to.
    pub fn location(&self) -> String {
        match self {
            LocatorError::NoLocation => String::new(),
            LocatorError::NotFound(location) | LocatorError::IsDirectory(location) => location.clone(),
            LocatorError::Io { location, .. } | LocatorError::Http { location, .. } => location.clone(),
            LocatorError::Archive { archive, .. } => archive.clone(),
            LocatorError::EntryNotFound { archive, entry } => format!("{archive}!/{entry}"),
        }
    }
}

impl From<LocatorError> for FacadeError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::NoLocation => FacadeError::missing_option(keys::LOCATION),
            err => FacadeError::ResourceUnavailable { location: err.location(), reason: err.to_string() },
        }
    }
}

/// Where a call's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Content(String),
    File(PathBuf),
    Directory(PathBuf),
    Http(String),
    ArchiveEntry { archive: String, entry: String },
}

/// What can be told about a resource without reading it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceProbe {
    pub extension: Option<String>,
    pub media_type: Option<String>,
    pub is_directory: bool,
}

trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

pub struct ResourceLocator {
    config: LocatorConfig,
    client: Mutex<Option<reqwest::blocking::Client>>,
}

impl ResourceLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config, client: Mutex::new(None) }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Classify the resource a call addresses.
    ///
    /// With `from-archive` the archive is the container and `location` the
    /// entry path inside it. Without a location, inline `content` is used.
    pub fn resolve(&self, options: &OptionSet) -> Result<Resource, LocatorError> {
        if let Some(archive) = options.from_archive() {
            let entry = options.location().ok_or(LocatorError::NoLocation)?;
            return Ok(Resource::ArchiveEntry {
                archive: archive.to_string(),
                entry: entry.trim_start_matches('/').to_string(),
            });
        }
        match options.location() {
            Some(location) if is_http(location) => Ok(Resource::Http(location.to_string())),
            Some(location) => {
                let path = self.path_of(location);
                if path.is_dir() {
                    Ok(Resource::Directory(path))
                } else {
                    Ok(Resource::File(path))
                }
            }
            None => options
                .content()
                .map(|content| Resource::Content(content.to_string()))
                .ok_or(LocatorError::NoLocation),
        }
    }

    /// Local path of a location, `file://` stripped and relative paths
    /// resolved against the configured base directory.
    pub fn path_of(&self, location: &str) -> PathBuf {
        let path = match location.strip_prefix("file://") {
            Some(rest) => PathBuf::from(urlencoding::decode(rest).map(|d| d.into_owned()).unwrap_or_else(|_| rest.to_string())),
            None => PathBuf::from(location),
        };
        match &self.config.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    /// Inspect a resource without converting it.
    ///
    /// Directories report the directory media type. HTTP locations without
    /// an extension or a `media-type` option are asked for their
    /// `Content-Type` with a `HEAD` request, and a failed request leaves
    /// the media type unknown.
    pub fn probe(&self, options: &OptionSet) -> ResourceProbe {
        match self.resolve(options) {
            Ok(Resource::Directory(_)) => ResourceProbe {
                extension: None,
                media_type: Some(DIRECTORY_MEDIA_TYPE.to_string()),
                is_directory: true,
            },
            Ok(Resource::ArchiveEntry { entry, .. }) => {
                ResourceProbe { extension: extension_of(&entry), ..Default::default() }
            }
            Ok(Resource::File(_)) => ResourceProbe {
                extension: options.location().and_then(extension_of),
                ..Default::default()
            },
            Ok(Resource::Http(url)) => {
                let extension = options.location().and_then(extension_of);
                // Only ask the server when nothing else could pick a converter
                let media_type = match (&extension, options.media_type()) {
                    (None, None) => self.content_type(&url, options),
                    _ => None,
                };
                ResourceProbe { extension, media_type, ..Default::default() }
            }
            Ok(Resource::Content(_)) | Err(_) => ResourceProbe::default(),
        }
    }

    /// Stable identity of the addressed resource. Existing local paths are
    /// canonicalized so that two spellings of one file share an identity.
    pub fn identity(&self, options: &OptionSet) -> String {
        match self.resolve(options) {
            Ok(Resource::File(path)) | Ok(Resource::Directory(path)) => canonical(path),
            Ok(Resource::Http(url)) => url,
            Ok(Resource::ArchiveEntry { archive, entry }) => {
                let archive = if is_http(&archive) { archive } else { canonical(self.path_of(&archive)) };
                format!("{archive}!/{entry}")
            }
            Ok(Resource::Content(_)) | Err(_) => "content:".to_string(),
        }
    }

    /// Fail early for resources that are known to be missing.
    ///
    /// HTTP locations are only checked when they are read.
    pub fn check_available(&self, options: &OptionSet) -> Result<(), LocatorError> {
        match self.resolve(options)? {
            Resource::File(path) if !path.exists() => {
                Err(LocatorError::NotFound(path.display().to_string()))
            }
            Resource::ArchiveEntry { archive, entry } => {
                let mut zip = self.open_archive(&archive)?;
                zip.by_name(&entry).map(|_| ()).map_err(|e| entry_error(&archive, &entry, e))
            }
            _ => Ok(()),
        }
    }

    /// Open the addressed resource for reading.
    pub fn open(&self, options: &OptionSet) -> Result<Box<dyn Read + Send>, LocatorError> {
        match self.resolve(options)? {
            Resource::Content(content) => Ok(Box::new(Cursor::new(content.into_bytes()))),
            Resource::File(path) => {
                let file = File::open(&path).map_err(|source| io_error(&path, source))?;
                Ok(Box::new(BufReader::new(file)))
            }
            Resource::Directory(path) => Err(LocatorError::IsDirectory(path.display().to_string())),
            Resource::Http(url) => Ok(Box::new(self.fetch(&url, options)?)),
            Resource::ArchiveEntry { archive, entry } => {
                let mut zip = self.open_archive(&archive)?;
                let mut file = zip.by_name(&entry).map_err(|e| entry_error(&archive, &entry, e))?;
                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes).map_err(|source| LocatorError::Io {
                    location: format!("{archive}!/{entry}"),
                    source,
                })?;
                Ok(Box::new(Cursor::new(bytes)))
            }
        }
    }

    /// Names of the archive entries some converter recognizes, sorted.
    /// Directory entries are never listed.
    pub fn list_archive(
        &self,
        archive: &str,
        registry: &TriplifierRegistry,
        matches: Option<&Regex>,
    ) -> Result<Vec<String>, LocatorError> {
        let zip = self.open_archive(archive)?;
        let mut names: Vec<String> = zip
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .filter(|name| registry.recognizes(name))
            .filter(|name| matches.map_or(true, |regex| regex.is_match(name)))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Absolute paths of the recognized immediate children of a directory,
    /// sorted. Subdirectories count as recognized when a directory
    /// converter is registered.
    pub fn list_folder(
        &self,
        location: &str,
        registry: &TriplifierRegistry,
        matches: Option<&Regex>,
    ) -> Result<Vec<String>, LocatorError> {
        let dir = self.path_of(location);
        let dir = dir.canonicalize().map_err(|source| io_error(&dir, source))?;
        let entries = std::fs::read_dir(&dir).map_err(|source| io_error(&dir, source))?;

        let mut children = Vec::new();
        for entry in entries {
            let path = entry.map_err(|source| io_error(&dir, source))?.path();
            let name = path.display().to_string();
            let recognized = if path.is_dir() {
                registry.recognizes_directories()
            } else {
                registry.recognizes(&name)
            };
            if recognized && matches.map_or(true, |regex| regex.is_match(&name)) {
                children.push(name);
            }
        }
        children.sort();
        Ok(children)
    }

    fn open_archive(&self, archive: &str) -> Result<ZipArchive<Box<dyn ReadSeek>>, LocatorError> {
        let reader: Box<dyn ReadSeek> = if is_http(archive) {
            let mut bytes = Vec::new();
            self.fetch(archive, &OptionSet::new())?
                .read_to_end(&mut bytes)
                .map_err(|source| LocatorError::Io { location: archive.to_string(), source })?;
            Box::new(Cursor::new(bytes))
        } else {
            let path = self.path_of(archive);
            if !path.exists() {
                return Err(LocatorError::NotFound(path.display().to_string()));
            }
            Box::new(File::open(&path).map_err(|source| io_error(&path, source))?)
        };
        ZipArchive::new(reader).map_err(|e| LocatorError::Archive {
            archive: archive.to_string(),
            reason: e.to_string(),
        })
    }

    fn client(&self) -> Result<reqwest::blocking::Client, LocatorError> {
        let mut client = self.client.lock();
        if let Some(client) = client.as_ref() {
            return Ok(client.clone());
        }
        let built = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.http_timeout_secs))
            .user_agent(self.config.user_agent.clone())
            .build()
            .map_err(|e| LocatorError::Http { location: String::new(), reason: e.to_string() })?;
        *client = Some(built.clone());
        Ok(built)
    }

    fn fetch(&self, url: &str, options: &OptionSet) -> Result<reqwest::blocking::Response, LocatorError> {
        let request = with_headers(self.client()?.get(url), options);
        tracing::debug!(url, "fetching");
        let response = request
            .send()
            .map_err(|e| LocatorError::Http { location: url.to_string(), reason: e.to_string() })?;
        if !response.status().is_success() {
            return Err(LocatorError::Http {
                location: url.to_string(),
                reason: format!("status {}", response.status()),
            });
        }
        Ok(response)
    }

    /// Media type the server declares for `url`, parameters dropped.
    fn content_type(&self, url: &str, options: &OptionSet) -> Option<String> {
        let client = self.client().ok()?;
        let response = match with_headers(client.head(url), options).send() {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!(url, status = %response.status(), "no content type");
                return None;
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "no content type");
                return None;
            }
        };
        let value = response.headers().get(reqwest::header::CONTENT_TYPE)?.to_str().ok()?;
        let media_type = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        (!media_type.is_empty()).then_some(media_type)
    }
}

fn with_headers(
    mut request: reqwest::blocking::RequestBuilder,
    options: &OptionSet,
) -> reqwest::blocking::RequestBuilder {
    for (name, value) in options.with_prefix(keys::HTTP_HEADER_PREFIX) {
        request = request.header(name, value);
    }
    request
}

impl Default for ResourceLocator {
    fn default() -> Self {
        Self::new(LocatorConfig::default())
    }
}

fn is_http(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn canonical(path: PathBuf) -> String {
    path.canonicalize().unwrap_or(path).display().to_string()
}

fn io_error(path: &std::path::Path, source: std::io::Error) -> LocatorError {
    if source.kind() == std::io::ErrorKind::NotFound {
        LocatorError::NotFound(path.display().to_string())
    } else {
        LocatorError::Io { location: path.display().to_string(), source }
    }
}

fn entry_error(archive: &str, entry: &str, err: ZipError) -> LocatorError {
    match err {
        ZipError::FileNotFound => {
            LocatorError::EntryNotFound { archive: archive.to_string(), entry: entry.to_string() }
        }
        other => LocatorError::Archive { archive: archive.to_string(), reason: other.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> OptionSet {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_resolve_kinds() {
        let locator = ResourceLocator::default();
        assert_eq!(
            locator.resolve(&options(&[("location", "https://example.org/a.csv")])).unwrap(),
            Resource::Http("https://example.org/a.csv".to_string())
        );
        assert_eq!(
            locator.resolve(&options(&[("location", "/a.csv"), ("from-archive", "x.zip")])).unwrap(),
            Resource::ArchiveEntry { archive: "x.zip".to_string(), entry: "a.csv".to_string() }
        );
        assert_eq!(
            locator.resolve(&options(&[("content", "1,2")])).unwrap(),
            Resource::Content("1,2".to_string())
        );
        assert!(matches!(locator.resolve(&OptionSet::new()), Err(LocatorError::NoLocation)));
    }

    #[test]
    fn test_base_dir_and_file_scheme() {
        let config = LocatorConfig { base_dir: Some(PathBuf::from("/data")), ..Default::default() };
        let locator = ResourceLocator::new(config);
        assert_eq!(locator.path_of("a.csv"), PathBuf::from("/data/a.csv"));
        assert_eq!(locator.path_of("/abs/a.csv"), PathBuf::from("/abs/a.csv"));
        assert_eq!(locator.path_of("file:///abs/my%20file.csv"), PathBuf::from("/abs/my file.csv"));
    }

    #[test]
    fn test_missing_file_maps_to_resource_unavailable() {
        let locator = ResourceLocator::default();
        let err = locator
            .check_available(&options(&[("location", "/definitely/not/here.csv")]))
            .unwrap_err();
        assert!(matches!(FacadeError::from(err), FacadeError::ResourceUnavailable { .. }));
    }

    const JSON_BODY: &str = r#"{"a": 1}"#;

    /// Serve `connections` requests for a JSON document whose URL has no
    /// extension.
    fn serve_json(connections: usize) -> String {
        use std::io::Write;

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming().take(connections) {
                let mut stream = stream.unwrap();
                let mut request = Vec::new();
                let mut byte = [0u8; 1];
                while !request.ends_with(b"\r\n\r\n") && stream.read(&mut byte).unwrap() == 1 {
                    request.push(byte[0]);
                }
                let body = if request.starts_with(b"HEAD") { "" } else { JSON_BODY };
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json; charset=utf-8\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    JSON_BODY.len()
                )
                .unwrap();
            }
        });
        format!("http://{address}/document")
    }

    #[test]
    fn test_http_content_type_is_recorded() {
        let url = serve_json(2);
        let locator = ResourceLocator::default();
        let options = options(&[("location", url.as_str())]);

        let found = locator.probe(&options);
        assert_eq!(found.extension, None);
        assert_eq!(found.media_type.as_deref(), Some("application/json"));
        assert!(!found.is_directory);

        let mut body = String::new();
        locator.open(&options).unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, JSON_BODY);
    }

    #[test]
    fn test_unreachable_http_has_no_media_type() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/document", listener.local_addr().unwrap());
        drop(listener);

        let found = ResourceLocator::default().probe(&options(&[("location", url.as_str())]));
        assert_eq!(found, ResourceProbe::default());
    }
}
