//! URL construction for the IBGE APIs
//!
//! The values API takes its query as path segments:
//!
//! ```text
//! {base}/t/{table}/n{level}/{ids|all}/v/{variables}/p/{periods}/c{id}/{categories|all}/d/{precision}/f/{format}/h/y
//! ```
//!
//! `h/y` asks for the header record that the reader later uses as column
//! labels.

use url::Url;

use crate::app::models::TableRequest;
use crate::constants::sidra;
use crate::errors::{ClientError, ClientResult};

fn join_or_all(values: &[String]) -> String {
    if values.is_empty() {
        sidra::ALL.to_string()
    } else {
        values.join(",")
    }
}

fn parse(raw: String) -> ClientResult<Url> {
    Url::parse(&raw).map_err(|e| ClientError::InvalidUrl {
        url: raw.clone(),
        error: e.to_string(),
    })
}

/// Values API URL for one request
pub fn values_url(base: &str, request: &TableRequest) -> ClientResult<Url> {
    let mut path = format!("t/{}", request.table_id);

    for (level, ids) in &request.territories {
        path.push_str(&format!("/n{}/{}", level, join_or_all(ids)));
    }

    path.push_str(&format!("/v/{}", join_or_all(&request.variables)));
    path.push_str(&format!("/p/{}", join_or_all(&request.periods)));

    for (classification, categories) in &request.classifications {
        if classification.is_empty() {
            continue;
        }
        path.push_str(&format!("/c{}/{}", classification, join_or_all(categories)));
    }

    path.push_str(&format!(
        "/d/{}/f/{}/h/y",
        request.precision.code(),
        request.format.code().to_ascii_lowercase()
    ));

    parse(format!("{}/{}", base.trim_end_matches('/'), path))
}

/// Periods endpoint of a table
pub fn periods_url(base: &str, table_id: &str) -> ClientResult<Url> {
    parse(format!("{}/{}/periodos", base.trim_end_matches('/'), table_id))
}

/// Metadata endpoint of a table
pub fn metadata_url(base: &str, table_id: &str) -> ClientResult<Url> {
    parse(format!("{}/{}/metadados", base.trim_end_matches('/'), table_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{Classifications, Format, Precision, Territories};
    use crate::constants::{METADATA_BASE_URL, VALUES_BASE_URL};

    #[test]
    fn test_values_url_grammar() {
        let mut territories = Territories::new();
        territories.insert("6".to_string(), Vec::new());
        territories.insert("3".to_string(), vec!["35".to_string(), "33".to_string()]);
        let mut classifications = Classifications::new();
        classifications.insert("81".to_string(), vec!["allxt".to_string()]);
        classifications.insert("226".to_string(), Vec::new());

        let request = TableRequest {
            table_id: "1612".to_string(),
            periods: vec!["2017".to_string()],
            territories,
            variables: vec!["214".to_string(), "216".to_string()],
            classifications,
            format: Format::Codes,
            precision: Precision::Maximum,
        };

        let url = values_url(VALUES_BASE_URL, &request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://apisidra.ibge.gov.br/values/t/1612/n6/all/n3/35,33/v/214,216/p/2017/c81/allxt/c226/all/d/m/f/c/h/y"
        );
    }

    #[test]
    fn test_values_url_skips_unnamed_classification() {
        let mut classifications = Classifications::new();
        classifications.insert(String::new(), Vec::new());
        let request = TableRequest {
            table_id: "6579".to_string(),
            periods: vec!["2020".to_string()],
            territories: Territories::new(),
            variables: Vec::new(),
            classifications,
            format: Format::CodesAndNames,
            precision: Precision::Digits(2),
        };

        let url = values_url("http://localhost:8080/values/", &request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/values/t/6579/v/all/p/2020/d/2/f/a/h/y"
        );
    }

    #[test]
    fn test_metadata_urls() {
        assert_eq!(
            periods_url(METADATA_BASE_URL, "1612").unwrap().as_str(),
            "https://servicodados.ibge.gov.br/api/v3/agregados/1612/periodos"
        );
        assert_eq!(
            metadata_url(METADATA_BASE_URL, "1612").unwrap().as_str(),
            "https://servicodados.ibge.gov.br/api/v3/agregados/1612/metadados"
        );
        assert!(periods_url("not a url", "1").is_err());
    }
}
