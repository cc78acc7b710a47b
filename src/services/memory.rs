//! In-process backends for local dry runs and tests.
//!
//! [`InMemoryLogSource`] serves scripted event pages per log group and records every
//! request it receives. [`InMemoryBlobStore`] keeps objects in a map and can be told to
//! fail reads or writes for specific keys.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::blob_store::{BlobError, BlobStore};
use super::log_source::{EventPage, FilterRequest, GroupPage, LogSource, SourceError};
use crate::export::LogEvent;

const DEFAULT_GROUP_PAGE_SIZE: usize = 50;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct SourceState {
    groups: Vec<String>,
    group_page_size: Option<usize>,
    pages: HashMap<String, Vec<Vec<LogEvent>>>,
    failing_groups: HashMap<String, String>,
    discovery_failure: Option<String>,
    filter_requests: Vec<FilterRequest>,
    list_calls: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryLogSource {
    state: Mutex<SourceState>,
}

impl InMemoryLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source already holding the given (empty) groups.
    pub fn with_groups<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let source = Self::new();
        for name in names {
            source.add_group(name.as_ref());
        }
        source
    }

    /// Register a group with no events.
    pub fn add_group(&self, name: &str) {
        let mut state = lock(&self.state);
        if !state.groups.iter().any(|g| g == name) {
            state.groups.push(name.to_string());
        }
        state.pages.entry(name.to_string()).or_default();
    }

    /// Append a scripted page for a group. Every page but the last carries a cursor.
    pub fn push_page(&self, name: &str, events: Vec<LogEvent>) {
        self.add_group(name);
        lock(&self.state)
            .pages
            .entry(name.to_string())
            .or_default()
            .push(events);
    }

    pub fn fail_group(&self, name: &str, message: &str) {
        self.add_group(name);
        lock(&self.state)
            .failing_groups
            .insert(name.to_string(), message.to_string());
    }

    pub fn fail_discovery(&self, message: &str) {
        lock(&self.state).discovery_failure = Some(message.to_string());
    }

    pub fn set_group_page_size(&self, size: usize) {
        lock(&self.state).group_page_size = Some(size.max(1));
    }

    pub fn filter_requests(&self, name: &str) -> Vec<FilterRequest> {
        lock(&self.state)
            .filter_requests
            .iter()
            .filter(|r| r.log_group_name == name)
            .cloned()
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        lock(&self.state).list_calls
    }
}

fn parse_cursor(token: Option<&str>) -> Result<usize, SourceError> {
    match token {
        None => Ok(0),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| SourceError::Service(format!("InvalidParameterException: bad token {raw}"))),
    }
}

#[async_trait]
impl LogSource for InMemoryLogSource {
    async fn list_log_groups(&self, next_token: Option<String>) -> Result<GroupPage, SourceError> {
        let mut state = lock(&self.state);
        state.list_calls += 1;
        if let Some(message) = &state.discovery_failure {
            return Err(SourceError::Service(message.clone()));
        }

        let offset = parse_cursor(next_token.as_deref())?;
        let size = state.group_page_size.unwrap_or(DEFAULT_GROUP_PAGE_SIZE);
        let end = (offset + size).min(state.groups.len());
        let names = state.groups.get(offset..end).unwrap_or_default().to_vec();
        let next_token = (end < state.groups.len()).then(|| end.to_string());

        Ok(GroupPage { names, next_token })
    }

    async fn filter_events(&self, request: &FilterRequest) -> Result<EventPage, SourceError> {
        let mut state = lock(&self.state);
        state.filter_requests.push(request.clone());

        if let Some(message) = state.failing_groups.get(&request.log_group_name) {
            return Err(SourceError::Service(message.clone()));
        }
        let Some(pages) = state.pages.get(&request.log_group_name) else {
            return Err(SourceError::Service(format!(
                "ResourceNotFoundException: log group {} does not exist",
                request.log_group_name
            )));
        };

        let index = parse_cursor(request.next_token.as_deref())?;
        if pages.is_empty() && index == 0 {
            return Ok(EventPage::default());
        }
        let Some(page) = pages.get(index) else {
            return Err(SourceError::Service(format!(
                "InvalidParameterException: token {index} out of range"
            )));
        };

        let events = page
            .iter()
            .filter(|e| request.window.contains(e.timestamp_millis))
            .cloned()
            .collect();
        let next_token = (index + 1 < pages.len()).then(|| (index + 1).to_string());

        Ok(EventPage { events, next_token })
    }
}

fn object_id(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<String, String>,
    failing_reads: HashMap<String, String>,
    failing_writes: HashMap<String, String>,
    invalid_utf8: HashSet<String>,
    puts: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    state: Mutex<StoreState>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, body: &str) {
        lock(&self.state)
            .objects
            .insert(object_id(bucket, key), body.to_string());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<String> {
        lock(&self.state).objects.get(&object_id(bucket, key)).cloned()
    }

    pub fn fail_reads(&self, bucket: &str, key: &str, message: &str) {
        lock(&self.state)
            .failing_reads
            .insert(object_id(bucket, key), message.to_string());
    }

    pub fn fail_writes(&self, bucket: &str, key: &str, message: &str) {
        lock(&self.state)
            .failing_writes
            .insert(object_id(bucket, key), message.to_string());
    }

    /// Make an existing object undecodable, as if it held binary content.
    pub fn corrupt(&self, bucket: &str, key: &str) {
        lock(&self.state).invalid_utf8.insert(object_id(bucket, key));
    }

    pub fn put_count(&self) -> usize {
        lock(&self.state).puts
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get_text(&self, bucket: &str, key: &str) -> Result<String, BlobError> {
        let state = lock(&self.state);
        let id = object_id(bucket, key);

        if let Some(message) = state.failing_reads.get(&id) {
            return Err(BlobError::Service(message.clone()));
        }
        if state.invalid_utf8.contains(&id) {
            return Err(BlobError::InvalidUtf8 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        state.objects.get(&id).cloned().ok_or_else(|| BlobError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn put_text(&self, bucket: &str, key: &str, body: String) -> Result<(), BlobError> {
        let mut state = lock(&self.state);
        let id = object_id(bucket, key);

        if let Some(message) = state.failing_writes.get(&id) {
            return Err(BlobError::Service(message.clone()));
        }
        state.invalid_utf8.remove(&id);
        state.objects.insert(id, body);
        state.puts += 1;
        Ok(())
    }
}
