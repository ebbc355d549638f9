//! Value types that acquire something (a file, a stream, a connection) while
//! converting, and the per-parse scope that releases them if the parse fails.

use std::any::Any;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

use crate::error::TypeError;
use crate::types::{ValueType, single_token};
use crate::value::Value;

/// Something opened during conversion. Dropping it releases it.
pub trait Resource: Any + Send + fmt::Debug {
    /// The token the resource was opened from.
    fn location(&self) -> &str;
}

type Slot = Option<Box<dyn Resource>>;

/// Shared handle to an opened [`Resource`].
///
/// Clones share the resource. [`ResourceHandle::close`] releases it for
/// every clone.
#[derive(Clone)]
pub struct ResourceHandle {
    location: Arc<str>,
    slot: Arc<Mutex<Slot>>,
}

impl ResourceHandle {
    pub fn new(resource: Box<dyn Resource>) -> Self {
        Self {
            location: Arc::from(resource.location()),
            slot: Arc::new(Mutex::new(Some(resource))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Run `f` against the resource if it is still open and is a `T`.
    pub fn with<T: Resource, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.lock();
        let resource: &mut dyn Any = guard.as_deref_mut()?;
        resource.downcast_mut::<T>().map(f)
    }

    /// Release the resource. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let resource = self.lock().take();
        resource.is_some()
    }
}

impl PartialEq for ResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("location", &self.location)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Resources opened during one parse.
///
/// The engine registers every handle a conversion produces. On failure the
/// scope is released, closing them before the error leaves the engine.
#[derive(Debug, Default)]
pub struct ResourceScope {
    opened: Vec<ResourceHandle>,
}

impl ResourceScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, value: &Value) {
        self.opened.extend(value.resources());
    }

    pub fn len(&self) -> usize {
        self.opened.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opened.is_empty()
    }

    /// Close everything registered so far, newest first.
    pub fn release(self) -> usize {
        let mut closed = 0;
        for handle in self.opened.into_iter().rev() {
            if handle.close() {
                tracing::debug!(location = handle.location(), "released resource");
                closed += 1;
            }
        }
        closed
    }

    /// Hand ownership of the resources to the parse result.
    pub fn commit(self) {
        drop(self.opened);
    }
}

/// Opens a resource from a token.
pub trait Opener: fmt::Debug + Send + Sync {
    fn open(&self, target: &str) -> io::Result<Box<dyn Resource>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Create or truncate.
    Write,
    /// Create or append.
    Append,
}

impl OpenMode {
    fn options(self) -> fs::OpenOptions {
        let mut options = fs::OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
        };
        options
    }
}

/// An open local file.
#[derive(Debug)]
pub struct FileResource {
    location: String,
    path: PathBuf,
    file: fs::File,
}

impl FileResource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&mut self) -> &mut fs::File {
        &mut self.file
    }
}

impl Resource for FileResource {
    fn location(&self) -> &str {
        &self.location
    }
}

impl Read for FileResource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileResource {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Standard input or output, selected with the `-` token.
#[derive(Debug)]
pub enum StdStream {
    Stdin(io::Stdin),
    Stdout(io::Stdout),
}

impl Resource for StdStream {
    fn location(&self) -> &str {
        "-"
    }
}

impl Read for StdStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            StdStream::Stdin(stdin) => stdin.read(buf),
            StdStream::Stdout(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stdout is not readable",
            )),
        }
    }
}

impl Write for StdStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StdStream::Stdout(stdout) => stdout.write(buf),
            StdStream::Stdin(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stdin is not writable",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StdStream::Stdout(stdout) => stdout.flush(),
            StdStream::Stdin(_) => Ok(()),
        }
    }
}

/// Opens local paths, and a standard stream for the stream token (`-`).
#[derive(Debug, Clone)]
pub struct LocalOpener {
    mode: OpenMode,
    std_stream: Option<String>,
}

impl LocalOpener {
    pub fn new(mode: OpenMode) -> Self {
        Self {
            mode,
            std_stream: Some("-".to_string()),
        }
    }

    /// Change the token that selects a standard stream.
    pub fn std_stream_token(mut self, token: impl Into<String>) -> Self {
        self.std_stream = Some(token.into());
        self
    }

    /// Treat the stream token as an ordinary path.
    pub fn without_std_streams(mut self) -> Self {
        self.std_stream = None;
        self
    }

    fn open_path(&self, location: &str, path: PathBuf) -> io::Result<Box<dyn Resource>> {
        let file = self.mode.options().open(&path)?;
        Ok(Box::new(FileResource {
            location: location.to_string(),
            path,
            file,
        }))
    }
}

impl Opener for LocalOpener {
    fn open(&self, target: &str) -> io::Result<Box<dyn Resource>> {
        if self.std_stream.as_deref() == Some(target) {
            let stream = match self.mode {
                OpenMode::Read => StdStream::Stdin(io::stdin()),
                OpenMode::Write | OpenMode::Append => StdStream::Stdout(io::stdout()),
            };
            return Ok(Box::new(stream));
        }
        self.open_path(target, PathBuf::from(target))
    }
}

/// A response body fetched over HTTP(S).
#[cfg(feature = "http")]
#[derive(Debug)]
pub struct HttpResource {
    location: String,
    response: reqwest::blocking::Response,
}

#[cfg(feature = "http")]
impl Resource for HttpResource {
    fn location(&self) -> &str {
        &self.location
    }
}

#[cfg(feature = "http")]
impl Read for HttpResource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.response.read(buf)
    }
}

/// Fetches `http://` and `https://` URLs with a blocking GET.
///
/// Only [`OpenMode::Read`] is supported. A non-success status fails the open,
/// so the token is reported as a type error.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpOpener {
    mode: OpenMode,
    timeout: std::time::Duration,
    client: Arc<std::sync::OnceLock<reqwest::blocking::Client>>,
}

#[cfg(feature = "http")]
impl HttpOpener {
    pub fn new(mode: OpenMode) -> Self {
        Self {
            mode,
            timeout: std::time::Duration::from_secs(30),
            client: Arc::default(),
        }
    }

    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn client(&self) -> io::Result<&reqwest::blocking::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("argtree/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()
            .map_err(io::Error::other)?;
        Ok(self.client.get_or_init(|| client))
    }
}

#[cfg(feature = "http")]
impl Opener for HttpOpener {
    fn open(&self, target: &str) -> io::Result<Box<dyn Resource>> {
        if self.mode != OpenMode::Read {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "http resources can only be read",
            ));
        }
        let response = self
            .client()?
            .get(target)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(io::Error::other)?;
        tracing::debug!(url = target, status = %response.status(), "fetched");
        Ok(Box::new(HttpResource {
            location: target.to_string(),
            response,
        }))
    }
}

fn open_failed(token: &str, type_name: &str, err: impl fmt::Display) -> TypeError {
    TypeError::new(token, type_name, format!("cannot open {token:?}: {err}"))
}

/// A local file (or standard stream) opened during conversion.
#[derive(Debug, Clone)]
pub struct File {
    opener: Arc<dyn Opener>,
}

impl File {
    pub fn new(mode: OpenMode) -> Self {
        Self::with_opener(LocalOpener::new(mode))
    }

    pub fn read() -> Self {
        Self::new(OpenMode::Read)
    }

    pub fn write() -> Self {
        Self::new(OpenMode::Write)
    }

    pub fn append() -> Self {
        Self::new(OpenMode::Append)
    }

    pub fn with_opener(opener: impl Opener + 'static) -> Self {
        Self {
            opener: Arc::new(opener),
        }
    }
}

impl ValueType for File {
    fn name(&self) -> &str {
        "file"
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        let token = single_token(tokens, self.name())?;
        let resource = self
            .opener
            .open(token)
            .map_err(|err| open_failed(token, self.name(), err))?;
        Ok(Value::Resource(ResourceHandle::new(resource)))
    }
}

/// A resource addressed by URL, dispatched on the scheme.
///
/// Tokens without a scheme (and single-letter schemes such as Windows drive
/// letters) are local paths. `file://` URLs are opened as local paths unless
/// an opener is registered for `file`. With the `http` feature, `http` and
/// `https` are registered by default. Other schemes need a registered opener.
#[derive(Debug, Clone)]
pub struct UrlResource {
    local: LocalOpener,
    schemes: IndexMap<String, Arc<dyn Opener>>,
}

impl UrlResource {
    pub fn new(mode: OpenMode) -> Self {
        Self::with_local(LocalOpener::new(mode))
    }

    pub fn with_local(local: LocalOpener) -> Self {
        let mut schemes: IndexMap<String, Arc<dyn Opener>> = IndexMap::new();
        #[cfg(feature = "http")]
        {
            let http: Arc<dyn Opener> = Arc::new(HttpOpener::new(local.mode));
            schemes.insert("http".to_string(), Arc::clone(&http));
            schemes.insert("https".to_string(), http);
        }
        Self { local, schemes }
    }

    /// Register (or replace) the opener for `scheme`.
    pub fn scheme(mut self, scheme: impl Into<String>, opener: impl Opener + 'static) -> Self {
        self.schemes
            .insert(scheme.into().to_ascii_lowercase(), Arc::new(opener));
        self
    }

    pub fn handles_scheme(&self, scheme: &str) -> bool {
        self.schemes.contains_key(&scheme.to_ascii_lowercase())
    }
}

impl ValueType for UrlResource {
    fn name(&self) -> &str {
        "resource"
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        let token = single_token(tokens, self.name())?;
        let url = url::Url::parse(token)
            .ok()
            .filter(|url| url.scheme().len() > 1);

        let resource = match url {
            None => self.local.open(token),
            Some(url) => match self.schemes.get(url.scheme()) {
                Some(opener) => opener.open(token),
                None if url.scheme() == "file" => {
                    let path = url.to_file_path().map_err(|()| {
                        TypeError::new(token, self.name(), format!("{token:?} is not a local path"))
                    })?;
                    self.local.open_path(token, path)
                }
                None => {
                    return Err(TypeError::new(
                        token,
                        self.name(),
                        format!("unsupported scheme '{}' in {token:?}", url.scheme()),
                    ));
                }
            },
        }
        .map_err(|err| open_failed(token, self.name(), err))?;

        Ok(Value::Resource(ResourceHandle::new(resource)))
    }
}
