//! Fetcher integration tests against an in-process SIDRA API

mod common;

use std::time::Duration;

use tempfile::TempDir;

use common::{period, timeout, FakeApi};
use sidra_etl::app::{
    CacheConfig, CacheManager, ClassificationMetadata, Classifications, FetchConfig, Fetcher,
    TableQuery, Territories,
};
use sidra_etl::errors::{ClientError, FetchError};

fn territories() -> Territories {
    let mut territories = Territories::new();
    territories.insert("6".to_string(), Vec::new());
    territories
}

fn fast_retries() -> FetchConfig {
    FetchConfig::default().with_retry_delay(Duration::from_millis(1))
}

async fn fetcher(api: FakeApi, data_dir: &std::path::Path, config: FetchConfig) -> Fetcher {
    let cache = CacheManager::new(CacheConfig::with_data_dir(data_dir))
        .await
        .unwrap();
    Fetcher::new(Box::new(api), cache, config)
}

fn produto() -> Classifications {
    let mut classifications = Classifications::new();
    classifications.insert("81".to_string(), vec!["allxt".to_string()]);
    classifications
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let temp_dir = TempDir::new().unwrap();
    let periods = vec![period("2016", 2017, 9, 28), period("2017", 2018, 9, 27)];

    let first_api = FakeApi::new(periods.clone());
    let first_calls = first_api.calls();
    let first = fetcher(first_api, temp_dir.path(), fast_retries()).await;
    let first_files = first
        .download_table_with("1612", &territories(), None, &produto())
        .await
        .unwrap();
    first.close().await;

    assert_eq!(first_calls.fetches(), 2);
    assert_eq!(first_files.len(), 2);
    for file in &first_files {
        assert!(file.path.exists());
    }

    let second_api = FakeApi::new(periods);
    let second_calls = second_api.calls();
    let second = fetcher(second_api, temp_dir.path(), fast_retries()).await;
    let second_files = second
        .download_table_with("1612", &territories(), None, &produto())
        .await
        .unwrap();

    assert_eq!(second_calls.fetches(), 0);
    let first_paths: Vec<_> = first_files.iter().map(|f| f.path.clone()).collect();
    let second_paths: Vec<_> = second_files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(first_paths, second_paths);
}

#[tokio::test]
async fn test_files_follow_period_order_and_layout() {
    let temp_dir = TempDir::new().unwrap();
    let api = FakeApi::new(vec![period("2016", 2017, 9, 28), period("2017", 2018, 9, 27)]);
    let fetcher = fetcher(api, temp_dir.path(), fast_retries()).await;

    let files = fetcher
        .download_table_with("1612", &territories(), None, &produto())
        .await
        .unwrap();

    assert_eq!(files[0].period.id, "2016");
    assert_eq!(files[1].period.id, "2017");
    assert_eq!(files[0].path.parent().unwrap(), temp_dir.path().join("t-1612"));
    assert_eq!(
        files[0].path.file_name().unwrap().to_str().unwrap(),
        "t-1612_p-2016_f-C_n6-all_v-all_c81-allxt@2017-09-28.json"
    );

    // No temporary files are left behind
    let listed = fetcher.cache().list_table_files("1612").await.unwrap();
    assert_eq!(listed.len(), 2);
    let entries = std::fs::read_dir(temp_dir.path().join("t-1612")).unwrap().count();
    assert_eq!(entries, 2);
}

#[tokio::test]
async fn test_new_modification_date_is_a_cache_miss() {
    let temp_dir = TempDir::new().unwrap();

    let api = FakeApi::new(vec![period("2017", 2018, 9, 27)]);
    let first = fetcher(api, temp_dir.path(), fast_retries()).await;
    first
        .download_table_with("1612", &territories(), None, &produto())
        .await
        .unwrap();

    let revised = FakeApi::new(vec![period("2017", 2019, 3, 1)]);
    let calls = revised.calls();
    let second = fetcher(revised, temp_dir.path(), fast_retries()).await;
    let files = second
        .download_table_with("1612", &territories(), None, &produto())
        .await
        .unwrap();

    assert_eq!(calls.fetches(), 1);
    assert!(files[0]
        .path
        .to_string_lossy()
        .ends_with("@2019-03-01.json"));
}

#[tokio::test]
async fn test_unfiltered_requests_every_classification_without_categories() {
    let temp_dir = TempDir::new().unwrap();
    let api = FakeApi::new(vec![period("2020", 2021, 1, 1)]).with_classifications(vec![
        ClassificationMetadata::from_ids("81", ["0", "2688"]),
        ClassificationMetadata::from_ids("226", ["0", "4844"]),
    ]);
    let calls = api.calls();
    let fetcher = fetcher(api, temp_dir.path(), fast_retries()).await;

    let variables = vec!["214".to_string()];
    let files = fetcher
        .download_table_unfiltered("1612", &territories(), Some(&variables))
        .await
        .unwrap();

    assert_eq!(files.len(), 1);
    let request = &calls.requests()[0];
    assert_eq!(request.variables, variables);
    assert_eq!(request.classifications.get("81"), Some(&Vec::new()));
    assert_eq!(request.classifications.get("226"), Some(&Vec::new()));
    assert!(files[0]
        .path
        .to_string_lossy()
        .contains("_v-214_c81-_c226-@2021-01-01"));
}

#[tokio::test]
async fn test_unnested_downloads_each_combination() {
    let temp_dir = TempDir::new().unwrap();
    let api = FakeApi::new(vec![period("2019", 2020, 1, 1), period("2020", 2021, 1, 1)])
        .with_classifications(vec![
            ClassificationMetadata::from_ids("1", ["0", "10", "20"]),
            ClassificationMetadata::from_ids("2", ["100"]),
        ]);
    let calls = api.calls();
    let fetcher = fetcher(api, temp_dir.path(), fast_retries()).await;

    let query = TableQuery::new("1612", territories()).unnested();
    let files = fetcher.download(&query).await.unwrap();

    assert_eq!(files.len(), 4);
    assert_eq!(calls.fetches(), 4);

    let combos: Vec<_> = calls
        .requests()
        .iter()
        .map(|r| {
            r.classifications
                .iter()
                .map(|(id, cats)| format!("{}={}", id, cats.join(",")))
                .collect::<Vec<_>>()
                .join("&")
        })
        .collect();
    assert_eq!(
        combos,
        vec!["1=10&2=100", "1=10&2=100", "1=20&2=100", "1=20&2=100"]
    );
}

#[tokio::test]
async fn test_timeout_is_retried_once_then_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let api = FakeApi::new(vec![period("2017", 2018, 9, 27)]).failing_with(vec![timeout()]);
    let calls = api.calls();
    let fetcher = fetcher(api, temp_dir.path(), fast_retries()).await;

    let files = fetcher
        .download_table_with("1612", &territories(), None, &produto())
        .await
        .unwrap();

    assert_eq!(calls.fetches(), 2);
    assert!(files[0].path.exists());
}

#[tokio::test]
async fn test_protocol_errors_are_retried() {
    let temp_dir = TempDir::new().unwrap();
    let protocol = || ClientError::Protocol {
        url: "https://apisidra.ibge.gov.br/values".to_string(),
        reason: "connection closed before message completed".to_string(),
    };
    let api = FakeApi::new(vec![period("2017", 2018, 9, 27)])
        .failing_with(vec![protocol(), protocol(), timeout()]);
    let calls = api.calls();
    let fetcher = fetcher(api, temp_dir.path(), fast_retries()).await;

    let files = fetcher
        .download_table_with("1612", &territories(), None, &produto())
        .await
        .unwrap();

    assert_eq!(calls.fetches(), 4);
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_other_errors_abort_without_retry() {
    let temp_dir = TempDir::new().unwrap();
    let api = FakeApi::new(vec![period("2016", 2017, 9, 28), period("2017", 2018, 9, 27)])
        .always_failing(|_| ClientError::ServerError {
            status: 500,
            url: "https://apisidra.ibge.gov.br/values".to_string(),
        });
    let calls = api.calls();
    let fetcher = fetcher(api, temp_dir.path(), fast_retries()).await;

    let result = fetcher
        .download_table_with("1612", &territories(), None, &produto())
        .await;

    assert!(matches!(
        result,
        Err(FetchError::Client(ClientError::ServerError { status: 500, .. }))
    ));
    assert_eq!(calls.fetches(), 1);
    assert!(fetcher.cache().list_table_files("1612").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retry_bound_when_configured() {
    let temp_dir = TempDir::new().unwrap();
    let api = FakeApi::new(vec![period("2017", 2018, 9, 27)]).always_failing(|_| timeout());
    let calls = api.calls();
    let fetcher = fetcher(api, temp_dir.path(), fast_retries().with_max_retries(2)).await;

    let result = fetcher
        .download_table_with("1612", &territories(), None, &produto())
        .await;

    assert!(matches!(
        result,
        Err(FetchError::RetriesExhausted { attempts: 3, .. })
    ));
    assert_eq!(calls.fetches(), 3);
}

#[tokio::test]
async fn test_close_releases_client() {
    let temp_dir = TempDir::new().unwrap();
    let api = FakeApi::new(Vec::new());
    let calls = api.calls();
    let fetcher = fetcher(api, temp_dir.path(), fast_retries()).await;

    let files = fetcher
        .download(&TableQuery::new("1612", territories()).with_classifications(produto()))
        .await
        .unwrap();
    assert!(files.is_empty());
    assert!(!calls.is_closed());
    assert!(!calls.is_dropped());

    fetcher.close().await;
    assert!(calls.is_closed());
    assert!(calls.is_dropped());
}

#[tokio::test]
async fn test_unnested_without_classifications_downloads_unfiltered() {
    let temp_dir = TempDir::new().unwrap();
    let api = FakeApi::new(vec![period("2019", 2020, 1, 1), period("2020", 2021, 1, 1)]);
    let calls = api.calls();
    let fetcher = fetcher(api, temp_dir.path(), fast_retries()).await;

    let files = fetcher
        .download(&TableQuery::new("6579", territories()).unnested())
        .await
        .unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(calls.fetches(), 2);
    assert!(calls.requests().iter().all(|r| r.classifications.is_empty()));
    assert_eq!(
        files[0].path.file_name().unwrap().to_str().unwrap(),
        "t-6579_p-2019_f-C_n6-all_v-all@2020-01-01.json"
    );
}
