//! Shared fakes for integration tests

#![allow(dead_code)]

pub mod capture;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use sidra_etl::app::{ClassificationMetadata, Period, SidraApi, TableRequest};
use sidra_etl::errors::{ClientError, ClientResult};

/// Call counters shared between a test and the fake it handed to a fetcher
#[derive(Debug, Default)]
pub struct Calls {
    pub list_periods: AtomicUsize,
    pub get_classifications: AtomicUsize,
    pub fetch_values: AtomicUsize,
    pub closed: AtomicBool,
    pub dropped: AtomicBool,
    pub requests: Mutex<Vec<TableRequest>>,
}

impl Calls {
    pub fn fetches(&self) -> usize {
        self.fetch_values.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TableRequest> {
        self.requests.lock().unwrap().clone()
    }
}

type BodyFn = dyn Fn(&TableRequest) -> Vec<u8> + Send + Sync;

/// In-process `SidraApi` with scripted failures
pub struct FakeApi {
    periods: Vec<Period>,
    classifications: Vec<ClassificationMetadata>,
    failures: Mutex<VecDeque<ClientError>>,
    always_fail: Option<fn(&TableRequest) -> ClientError>,
    body: Box<BodyFn>,
    calls: Arc<Calls>,
}

impl FakeApi {
    pub fn new(periods: Vec<Period>) -> Self {
        Self {
            periods,
            classifications: Vec::new(),
            failures: Mutex::new(VecDeque::new()),
            always_fail: None,
            body: Box::new(|request| {
                format!(
                    r#"[{{"D2C": "Ano", "V": "Valor"}}, {{"D2C": "{}", "V": "1"}}]"#,
                    request.periods.join(",")
                )
                .into_bytes()
            }),
            calls: Arc::new(Calls::default()),
        }
    }

    pub fn with_classifications(mut self, classifications: Vec<ClassificationMetadata>) -> Self {
        self.classifications = classifications;
        self
    }

    /// Fail the next fetches with these errors, in order
    pub fn failing_with(self, errors: Vec<ClientError>) -> Self {
        *self.failures.lock().unwrap() = errors.into();
        self
    }

    /// Fail every fetch
    pub fn always_failing(mut self, error: fn(&TableRequest) -> ClientError) -> Self {
        self.always_fail = Some(error);
        self
    }

    pub fn with_body<F>(mut self, body: F) -> Self
    where
        F: Fn(&TableRequest) -> Vec<u8> + Send + Sync + 'static,
    {
        self.body = Box::new(body);
        self
    }

    pub fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SidraApi for FakeApi {
    async fn list_periods(&self, _table_id: &str) -> ClientResult<Vec<Period>> {
        self.calls.list_periods.fetch_add(1, Ordering::SeqCst);
        Ok(self.periods.clone())
    }

    async fn get_classifications(
        &self,
        _table_id: &str,
    ) -> ClientResult<Vec<ClassificationMetadata>> {
        self.calls.get_classifications.fetch_add(1, Ordering::SeqCst);
        Ok(self.classifications.clone())
    }

    async fn fetch_values(&self, request: &TableRequest) -> ClientResult<Vec<u8>> {
        self.calls.fetch_values.fetch_add(1, Ordering::SeqCst);
        self.calls.requests.lock().unwrap().push(request.clone());

        if let Some(error) = self.always_fail {
            return Err(error(request));
        }
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok((self.body)(request))
    }

    async fn close(&self) {
        self.calls.closed.store(true, Ordering::SeqCst);
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.calls.dropped.store(true, Ordering::SeqCst);
    }
}

pub fn period(id: &str, year: i32, month: u32, day: u32) -> Period {
    Period::new(id, NaiveDate::from_ymd_opt(year, month, day).unwrap())
}

pub fn timeout() -> ClientError {
    ClientError::Timeout {
        url: "https://apisidra.ibge.gov.br/values/t/1612".to_string(),
    }
}
