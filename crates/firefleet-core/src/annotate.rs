//! Reverse-geocoded place names for incidents.

use crate::models::{IncidentPoint, UNKNOWN_PLACE};
use crate::services::Geocoder;
use futures::stream::{self, StreamExt};

/// Look up the place name of one location, `"Unknown"` on any failure.
pub async fn place_name<G: Geocoder>(geocoder: &G, lat: f64, lon: f64) -> String {
    match geocoder.reverse(lat, lon).await {
        Ok(Some(address)) if !address.trim().is_empty() => address,
        Ok(_) => UNKNOWN_PLACE.to_string(),
        Err(err) => {
            tracing::warn!("Geocoding error at ({}, {}): {}", lat, lon, err);
            UNKNOWN_PLACE.to_string()
        }
    }
}

/// Fill `place_name` on every incident, at most `concurrency` lookups at a time.
///
/// Names are written back as each lookup completes, so dropping the future
/// part way keeps the names already found; the rest stay `None`. Geometry and
/// cluster assignment are never touched.
pub async fn annotate_places<G: Geocoder>(
    points: &mut [IncidentPoint],
    geocoder: &G,
    concurrency: usize,
) {
    let lookups: Vec<(usize, f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(index, point)| (index, point.lat, point.lon))
        .collect();

    let mut names = stream::iter(lookups)
        .map(|(index, lat, lon)| async move { (index, place_name(geocoder, lat, lon).await) })
        .buffer_unordered(concurrency.max(1));

    let mut unknown = 0;
    while let Some((index, name)) = names.next().await {
        if name == UNKNOWN_PLACE {
            unknown += 1;
        }
        points[index].place_name = Some(name);
    }
    tracing::info!(
        "Annotated {} incidents ({} unknown)",
        points.len(),
        unknown
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    struct Gazetteer;

    impl Geocoder for Gazetteer {
        async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, ServiceError> {
            if lat < 0.0 {
                Err(ServiceError::Status {
                    status: 503,
                    body: "busy".to_string(),
                })
            } else if lon > 100.0 {
                Ok(None)
            } else {
                Ok(Some(format!("{lat:.1} N {lon:.1} E")))
            }
        }
    }

    fn incident(id: usize, lon: f64, lat: f64) -> IncidentPoint {
        IncidentPoint {
            id,
            lon,
            lat,
            cluster_id: 0,
            place_name: None,
            properties: None,
        }
    }

    #[tokio::test]
    async fn failures_and_misses_become_unknown() {
        let mut points = vec![
            incident(0, 10.0, 50.0),
            incident(1, 10.0, -5.0),
            incident(2, 150.0, 5.0),
        ];
        annotate_places(&mut points, &Gazetteer, 2).await;
        assert_eq!(points[0].place_name.as_deref(), Some("50.0 N 10.0 E"));
        assert_eq!(points[1].place_name.as_deref(), Some(UNKNOWN_PLACE));
        assert_eq!(points[2].place_name.as_deref(), Some(UNKNOWN_PLACE));
        assert_eq!(points[1].lat, -5.0);
        assert_eq!(points[2].cluster_id, 0);
    }

    #[tokio::test]
    async fn blank_addresses_are_unknown() {
        struct Blank;
        impl Geocoder for Blank {
            async fn reverse(&self, _lat: f64, _lon: f64) -> Result<Option<String>, ServiceError> {
                Ok(Some("   ".to_string()))
            }
        }
        assert_eq!(place_name(&Blank, 1.0, 1.0).await, UNKNOWN_PLACE);
    }

    /// Answers west of 5°E at once and never answers east of it.
    struct WestOnly;

    impl Geocoder for WestOnly {
        async fn reverse(&self, _lat: f64, lon: f64) -> Result<Option<String>, ServiceError> {
            if lon < 5.0 {
                Ok(Some("West".to_string()))
            } else {
                std::future::pending().await
            }
        }
    }

    #[tokio::test]
    async fn timed_out_batch_keeps_names_already_found() {
        let mut points = vec![
            incident(0, 0.0, 0.0),
            incident(1, 0.0, 1.0),
            incident(2, 10.0, 0.0),
            incident(3, 10.0, 1.0),
        ];
        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            annotate_places(&mut points, &WestOnly, 4),
        )
        .await;
        assert!(outcome.is_err());

        let names: Vec<Option<&str>> = points.iter().map(|p| p.place_name.as_deref()).collect();
        assert_eq!(names, vec![Some("West"), Some("West"), None, None]);
    }
}
