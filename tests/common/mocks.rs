use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use validate_json::error::{LoaderError, LoaderResult};
use validate_json::{SchemaLoader, ValidationMessage, WalkEvent, WalkFlow, WalkListener};

/// Loader serving canned documents and recording every IRI it was asked for
#[derive(Default)]
pub struct MockSchemaLoader {
    documents: Mutex<HashMap<String, MockResponse>>,
    request_log: Mutex<Vec<String>>,
}

#[derive(Clone, Debug)]
pub enum MockResponse {
    Document(String),
    Failure(LoaderError),
}

impl MockSchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, iri: &str, document: &str) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(iri.to_string(), MockResponse::Document(document.to_string()));
        self
    }

    pub fn with_failure(self, iri: &str, error: LoaderError) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(iri.to_string(), MockResponse::Failure(error));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.request_log.lock().unwrap().clone()
    }

    pub fn request_count(&self, iri: &str) -> usize {
        self.request_log
            .lock()
            .unwrap()
            .iter()
            .filter(|requested| requested.as_str() == iri)
            .count()
    }
}

impl SchemaLoader for MockSchemaLoader {
    fn load(&self, absolute_iri: &str) -> LoaderResult<Option<String>> {
        self.request_log
            .lock()
            .unwrap()
            .push(absolute_iri.to_string());
        match self.documents.lock().unwrap().get(absolute_iri) {
            Some(MockResponse::Document(document)) => Ok(Some(document.clone())),
            Some(MockResponse::Failure(error)) => Err(error.clone()),
            None => Ok(None),
        }
    }
}

/// One listener callback as seen by [`RecordingListener`]
#[derive(Clone, Debug, PartialEq)]
pub struct WalkRecord {
    pub phase: &'static str,
    pub keyword: String,
    pub evaluation_path: String,
    pub instance_location: String,
    pub error_count: usize,
}

/// Walk listener remembering every call, optionally skipping one keyword
/// or evaluation path
#[derive(Default)]
pub struct RecordingListener {
    records: Mutex<Vec<WalkRecord>>,
    skip_paths: Vec<String>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn skipping(paths: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            skip_paths: paths.iter().map(|path| path.to_string()).collect(),
        })
    }

    pub fn records(&self) -> Vec<WalkRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn pre_paths(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|record| record.phase == "pre")
            .map(|record| record.evaluation_path)
            .collect()
    }

    fn record(&self, phase: &'static str, event: &WalkEvent<'_>, error_count: usize) {
        self.records.lock().unwrap().push(WalkRecord {
            phase,
            keyword: event.keyword.to_string(),
            evaluation_path: event.evaluation_path.to_pointer(),
            instance_location: event.instance_location.to_pointer(),
            error_count,
        });
    }
}

impl WalkListener for RecordingListener {
    fn pre_walk(&self, event: &WalkEvent<'_>) -> WalkFlow {
        self.record("pre", event, 0);
        if self
            .skip_paths
            .iter()
            .any(|path| *path == event.evaluation_path.to_pointer())
        {
            WalkFlow::Skip
        } else {
            WalkFlow::Continue
        }
    }

    fn post_walk(&self, event: &WalkEvent<'_>, errors: &[ValidationMessage]) {
        self.record("post", event, errors.len());
    }
}
