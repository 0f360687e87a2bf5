//! Buffered triple sources.
//!
//! A [`BufferedTripleSource`] holds the append-only triple sequence of one
//! virtual graph. A single [`SourceWriter`] appends while readers scan,
//! readers that reach the frontier block until more triples arrive, and
//! once the writer completes the sequence is immutable and can be rescanned
//! any number of times without converting the resource again.

use crate::core::Quad;
use crate::error::{FacadeError, Result};
use crate::facade_x::{BuilderError, TripleSink};
use oxigraph::model::{NamedNode, Term};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

pub mod cache;

pub use cache::{Fingerprint, VirtualGraphCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializationState {
    Empty,
    Materializing,
    Complete,
    Failed,
}

impl fmt::Display for MaterializationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MaterializationState::Empty => "empty",
            MaterializationState::Materializing => "materializing",
            MaterializationState::Complete => "complete",
            MaterializationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct Buffer {
    state: MaterializationState,
    quads: Vec<Quad>,
    error: Option<FacadeError>,
    scans: u64,
    rescans: u64,
    readers: usize,
    started: Option<Instant>,
}

/// The shared, append-only triple buffer of one virtual graph.
pub struct BufferedTripleSource {
    id: String,
    buffer: Mutex<Buffer>,
    appended: Condvar,
    subjects: OnceLock<HashMap<Term, Vec<usize>>>,
}

impl BufferedTripleSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            buffer: Mutex::new(Buffer {
                state: MaterializationState::Empty,
                quads: Vec::new(),
                error: None,
                scans: 0,
                rescans: 0,
                readers: 0,
                started: None,
            }),
            appended: Condvar::new(),
            subjects: OnceLock::new(),
        }
    }

    /// Graph id of the virtual graph this buffer holds.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> MaterializationState {
        self.buffer.lock().state
    }

    /// Number of triples buffered so far.
    pub fn len(&self) -> usize {
        self.buffer.lock().quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Final triple count, `None` until the source is complete.
    pub fn triple_count(&self) -> Option<usize> {
        let buffer = self.buffer.lock();
        (buffer.state == MaterializationState::Complete).then_some(buffer.quads.len())
    }

    pub fn error(&self) -> Option<FacadeError> {
        self.buffer.lock().error.clone()
    }

    /// Number of scans currently alive.
    pub fn active_readers(&self) -> usize {
        self.buffer.lock().readers
    }

    /// True while a writer exists or scans are alive.
    pub fn is_in_use(&self) -> bool {
        let buffer = self.buffer.lock();
        buffer.readers > 0 || buffer.state == MaterializationState::Materializing
    }

    /// Claim the single writer of this source.
    ///
    /// Returns `None` unless the source is still `Empty`, so at most one
    /// writer is ever handed out.
    pub fn begin(self: &Arc<Self>) -> Option<SourceWriter> {
        let mut buffer = self.buffer.lock();
        if buffer.state != MaterializationState::Empty {
            return None;
        }
        buffer.state = MaterializationState::Materializing;
        buffer.started = Some(Instant::now());
        tracing::info!(graph = %self.id, "materialization started");
        Some(SourceWriter { source: Arc::clone(self), finished: false })
    }

    /// Run `produce` on a background thread if this source has not been
    /// materialized yet. Returns whether this call started it.
    pub fn materialize_with<F>(self: &Arc<Self>, produce: F) -> bool
    where
        F: FnOnce(&mut SourceWriter) -> Result<()> + Send + 'static,
    {
        let Some(mut writer) = self.begin() else {
            return false;
        };
        let spawned = std::thread::Builder::new()
            .name("facadex-materialize".to_string())
            .spawn(move || match produce(&mut writer) {
                Ok(()) => writer.complete(),
                Err(err) => writer.fail(err),
            });
        if let Err(e) = spawned {
            // The closure, and the writer with it, was dropped by the failed
            // spawn, which already marked the source as failed.
            tracing::warn!(graph = %self.id, error = %e, "could not spawn materialization thread");
        }
        true
    }

    /// Start a scan from the first triple.
    ///
    /// The first scan of a source, and every scan started before it is
    /// complete, shares the original materialization pass and reports
    /// generation 0. Later scans of a complete source report the next
    /// generation.
    pub fn scan(self: &Arc<Self>) -> TripleScan {
        self.open_scan(None)
    }

    /// Like [`scan`](Self::scan) but only yields triples with the given
    /// subject. Completed sources answer from a subject index.
    pub fn scan_subject(self: &Arc<Self>, subject: &Term) -> TripleScan {
        self.open_scan(Some(subject.clone()))
    }

    fn open_scan(self: &Arc<Self>, subject: Option<Term>) -> TripleScan {
        let mut buffer = self.buffer.lock();
        buffer.readers += 1;
        // The first scan ever opened reads the original pass even when the
        // writer finished before it got here.
        let generation = if buffer.state == MaterializationState::Complete && buffer.scans > 0 {
            buffer.rescans += 1;
            buffer.rescans
        } else {
            0
        };
        buffer.scans += 1;
        let positions = match (&subject, buffer.state) {
            (Some(subject), MaterializationState::Complete) => Some(
                self.subject_index(&buffer).get(subject).cloned().unwrap_or_default(),
            ),
            _ => None,
        };
        drop(buffer);
        TripleScan {
            source: Arc::clone(self),
            generation,
            subject,
            positions,
            cursor: 0,
            done: false,
        }
    }

    fn subject_index(&self, buffer: &MutexGuard<'_, Buffer>) -> &HashMap<Term, Vec<usize>> {
        self.subjects.get_or_init(|| {
            let mut index: HashMap<Term, Vec<usize>> = HashMap::new();
            for (position, quad) in buffer.quads.iter().enumerate() {
                index.entry(quad.triple.subject.clone()).or_default().push(position);
            }
            index
        })
    }

    /// `(graph, triple count)` for every per-call graph, ordered by graph
    /// IRI, once the source is complete. Reads the buffer without opening a
    /// scan, so it does not count as a generation.
    pub fn graph_counts(&self) -> Result<Vec<(NamedNode, usize)>> {
        self.wait()?;
        let buffer = self.buffer.lock();
        let mut counts: BTreeMap<&str, (&NamedNode, usize)> = BTreeMap::new();
        for quad in &buffer.quads {
            counts.entry(quad.graph.as_str()).or_insert((&quad.graph, 0)).1 += 1;
        }
        Ok(counts.into_values().map(|(graph, count)| (graph.clone(), count)).collect())
    }

    /// Block until the source is complete or failed.
    pub fn wait(&self) -> Result<usize> {
        let mut buffer = self.buffer.lock();
        loop {
            match buffer.state {
                MaterializationState::Complete => return Ok(buffer.quads.len()),
                MaterializationState::Failed => return Err(failure(&buffer)),
                MaterializationState::Empty => {
                    return Err(FacadeError::Evaluation(format!(
                        "virtual graph {} was never materialized",
                        self.id
                    )))
                }
                MaterializationState::Materializing => self.appended.wait(&mut buffer),
            }
        }
    }

    fn push(&self, quad: Quad) {
        self.buffer.lock().quads.push(quad);
        self.appended.notify_all();
    }

    fn finish(&self, outcome: std::result::Result<(), FacadeError>) {
        let mut buffer = self.buffer.lock();
        let elapsed = buffer.started.map(|s| s.elapsed()).unwrap_or_default();
        match outcome {
            Ok(()) => {
                buffer.state = MaterializationState::Complete;
                tracing::info!(
                    graph = %self.id,
                    triples = buffer.quads.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "materialization complete"
                );
            }
            Err(err) => {
                tracing::warn!(graph = %self.id, error = %err, "materialization failed");
                buffer.state = MaterializationState::Failed;
                buffer.error = Some(err);
            }
        }
        drop(buffer);
        self.appended.notify_all();
    }

    fn release_reader(&self) {
        let mut buffer = self.buffer.lock();
        buffer.readers = buffer.readers.saturating_sub(1);
    }
}

impl fmt::Debug for BufferedTripleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buffer = self.buffer.lock();
        f.debug_struct("BufferedTripleSource")
            .field("id", &self.id)
            .field("state", &buffer.state)
            .field("triples", &buffer.quads.len())
            .field("readers", &buffer.readers)
            .finish()
    }
}

fn failure(buffer: &Buffer) -> FacadeError {
    buffer
        .error
        .clone()
        .unwrap_or_else(|| FacadeError::Evaluation("materialization failed".to_string()))
}

/// The single writer of a [`BufferedTripleSource`].
///
/// Dropping a writer without calling [`complete`](Self::complete) fails the
/// source, so readers never wait on an abandoned materialization.
pub struct SourceWriter {
    source: Arc<BufferedTripleSource>,
    finished: bool,
}

impl SourceWriter {
    pub fn source(&self) -> &Arc<BufferedTripleSource> {
        &self.source
    }

    pub fn append(&mut self, quad: Quad) {
        self.source.push(quad);
    }

    pub fn complete(mut self) {
        self.finished = true;
        self.source.finish(Ok(()));
    }

    pub fn fail(mut self, err: FacadeError) {
        self.finished = true;
        self.source.finish(Err(err));
    }
}

impl TripleSink for SourceWriter {
    fn accept(&mut self, quad: Quad) -> std::result::Result<(), BuilderError> {
        self.append(quad);
        Ok(())
    }
}

impl TripleSink for &mut SourceWriter {
    fn accept(&mut self, quad: Quad) -> std::result::Result<(), BuilderError> {
        self.append(quad);
        Ok(())
    }
}

impl Drop for SourceWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.source.finish(Err(FacadeError::Evaluation(format!(
                "materialization of {} was abandoned",
                self.source.id
            ))));
        }
    }
}

/// One reader over a [`BufferedTripleSource`].
///
/// Yields buffered quads in order, blocking at the frontier while the
/// source is materializing. A failed source yields its error once. Dropping
/// a scan early never affects the buffer or other readers.
pub struct TripleScan {
    source: Arc<BufferedTripleSource>,
    generation: u64,
    subject: Option<Term>,
    positions: Option<Vec<usize>>,
    cursor: usize,
    done: bool,
}

impl TripleScan {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> &Arc<BufferedTripleSource> {
        &self.source
    }

    fn next_indexed(&mut self) -> Option<Result<Quad>> {
        let positions = self.positions.as_ref()?;
        let &position = positions.get(self.cursor)?;
        self.cursor += 1;
        let buffer = self.source.buffer.lock();
        buffer.quads.get(position).cloned().map(Ok)
    }
}

impl Iterator for TripleScan {
    type Item = Result<Quad>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.positions.is_some() {
            let next = self.next_indexed();
            self.done = next.is_none();
            return next;
        }

        let mut buffer = self.source.buffer.lock();
        loop {
            while let Some(quad) = buffer.quads.get(self.cursor) {
                self.cursor += 1;
                if self.subject.as_ref().map_or(true, |s| *s == quad.triple.subject) {
                    return Some(Ok(quad.clone()));
                }
            }
            match buffer.state {
                MaterializationState::Complete => {
                    self.done = true;
                    return None;
                }
                MaterializationState::Failed => {
                    self.done = true;
                    return Some(Err(failure(&buffer)));
                }
                MaterializationState::Empty => {
                    self.done = true;
                    return Some(Err(FacadeError::Evaluation(format!(
                        "virtual graph {} was never materialized",
                        self.source.id
                    ))));
                }
                MaterializationState::Materializing => self.source.appended.wait(&mut buffer),
            }
        }
    }
}

impl Drop for TripleScan {
    fn drop(&mut self) {
        self.source.release_reader();
    }
}
