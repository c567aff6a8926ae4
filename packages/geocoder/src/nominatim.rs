//! Nominatim / `OpenStreetMap` search client.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use carbonflow_marketplace_models::Location;

use crate::GeocodeError;

/// Geocodes a free-form query using Nominatim.
///
/// The caller is responsible for rate limiting.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn geocode_freeform(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
) -> Result<Option<Location>, GeocodeError> {
    let resp = client
        .get(base_url)
        .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
        .send()
        .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }
    if !status.is_success() {
        return Err(GeocodeError::Status {
            status: status.as_u16(),
        });
    }

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses a Nominatim JSON response, taking the best (first) hit.
fn parse_response(body: &serde_json::Value) -> Result<Option<Location>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = coordinate(first, "lat")?;
    let lon = coordinate(first, "lon")?;

    let location = Location::new(lat, lon);
    location.validate().map_err(|e| GeocodeError::Parse {
        message: e.to_string(),
    })?;

    Ok(Some(location))
}

/// Nominatim sends coordinates as strings; accept bare numbers too.
fn coordinate(hit: &serde_json::Value, key: &str) -> Result<f64, GeocodeError> {
    let value = &hit[key];
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .ok_or_else(|| GeocodeError::Parse {
            message: format!("Missing {key} in Nominatim response"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([
            {
                "lat": "52.5200066",
                "lon": "13.404954",
                "display_name": "Berlin, Deutschland"
            },
            {
                "lat": "0",
                "lon": "0",
                "display_name": "somewhere else"
            }
        ]);
        let location = parse_response(&body).unwrap().unwrap();
        assert!((location.lat - 52.520_006_6).abs() < 1e-6);
        assert!((location.lon - 13.404_954).abs() < 1e-6);
    }

    #[test]
    fn accepts_numeric_coordinates() {
        let body = serde_json::json!([{ "lat": -33.86, "lon": 151.21 }]);
        let location = parse_response(&body).unwrap().unwrap();
        assert!((location.lon - 151.21).abs() < 1e-9);
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_bodies() {
        for body in [
            serde_json::json!({ "error": "bad request" }),
            serde_json::json!([{ "lat": "north", "lon": "1.0" }]),
            serde_json::json!([{ "lat": "91.0", "lon": "1.0" }]),
        ] {
            assert!(matches!(
                parse_response(&body),
                Err(GeocodeError::Parse { .. })
            ));
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_an_http_error() {
        let geocoder = crate::Geocoder::new(&crate::GeocoderConfig {
            base_url: "http://127.0.0.1:9/search".to_string(),
            user_agent: "carbonflow-test".to_string(),
        })
        .unwrap();
        assert!(matches!(
            geocoder.geocode("Berlin").await,
            Err(GeocodeError::Http(_))
        ));
    }
}
