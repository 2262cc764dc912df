//! External clustering service
//!
//! Some deployments outsource employee grouping to a third-party
//! clustering endpoint instead of sequencing in-house. The endpoint is a
//! black box: it takes employee coordinates and vehicle capacities and
//! returns a proposed grouping. A mock implementation chunks employees by
//! capacity for environments without the endpoint.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pickup point submitted for clustering
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPoint {
    pub employee_id: Uuid,
    pub lat: f64,
    pub lng: f64,
}

/// A candidate vehicle with its capacity
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVehicle {
    pub vehicle_id: Uuid,
    pub capacity: i32,
}

/// One proposed grouping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment {
    pub vehicle_id: Uuid,
    pub employee_ids: Vec<Uuid>,
}

/// Clustering outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResult {
    pub clusters: Vec<ClusterAssignment>,
    /// Employees no vehicle had room for
    pub unassigned: Vec<Uuid>,
}

/// Clustering service trait (HTTP endpoint or mock)
#[async_trait]
pub trait ClusterService: Send + Sync {
    /// Group employee pickup points onto vehicles
    async fn cluster(
        &self,
        points: &[ClusterPoint],
        vehicles: &[ClusterVehicle],
    ) -> Result<ClusterResult>;

    /// Service name for logging
    fn name(&self) -> &str;
}

/// HTTP client for the clustering endpoint
pub struct HttpClusterService {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterRequestBody<'a> {
    points: &'a [ClusterPoint],
    vehicles: &'a [ClusterVehicle],
}

impl HttpClusterService {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl ClusterService for HttpClusterService {
    async fn cluster(
        &self,
        points: &[ClusterPoint],
        vehicles: &[ClusterVehicle],
    ) -> Result<ClusterResult> {
        let url = format!("{}/cluster", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ClusterRequestBody { points, vehicles })
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("clustering endpoint returned status {}", response.status());
        }

        Ok(response.json::<ClusterResult>().await?)
    }

    fn name(&self) -> &str {
        "HttpClustering"
    }
}

/// Mock clustering for environments without the endpoint.
/// Fills vehicles in input order, `capacity` employees per vehicle.
pub struct MockClusterService;

#[async_trait]
impl ClusterService for MockClusterService {
    async fn cluster(
        &self,
        points: &[ClusterPoint],
        vehicles: &[ClusterVehicle],
    ) -> Result<ClusterResult> {
        let mut clusters = Vec::with_capacity(vehicles.len());
        let mut remaining = points.iter();

        for vehicle in vehicles {
            let take = vehicle.capacity.max(0) as usize;
            let employee_ids: Vec<Uuid> = remaining
                .by_ref()
                .take(take)
                .map(|p| p.employee_id)
                .collect();
            clusters.push(ClusterAssignment {
                vehicle_id: vehicle.vehicle_id,
                employee_ids,
            });
        }

        let unassigned: Vec<Uuid> = remaining.map(|p| p.employee_id).collect();

        Ok(ClusterResult { clusters, unassigned })
    }

    fn name(&self) -> &str {
        "MockClustering"
    }
}

/// Create the clustering service, falling back to the mock when the
/// endpoint is not configured or does not answer its health check.
pub async fn create_cluster_service_with_fallback(
    clustering_url: Option<String>,
) -> Box<dyn ClusterService> {
    use tracing::{info, warn};

    if let Some(url) = clustering_url {
        match check_endpoint_health(&url).await {
            Ok(()) => match HttpClusterService::new(&url) {
                Ok(service) => {
                    info!("Clustering endpoint available at {}", url);
                    return Box::new(service);
                }
                Err(e) => {
                    warn!("Failed to build clustering client: {}", e);
                }
            },
            Err(e) => {
                warn!(
                    "Clustering endpoint not available at {}: {}. Falling back to mock clustering.",
                    url, e
                );
            }
        }
    }

    info!("Using mock clustering (endpoint not configured or unavailable)");
    Box::new(MockClusterService)
}

/// Probe the endpoint's status route
async fn check_endpoint_health(base_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let url = format!("{}/status", base_url);
    let response = client.get(&url).send().await?;

    if response.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("clustering endpoint returned status {}", response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> ClusterPoint {
        ClusterPoint {
            employee_id: Uuid::new_v4(),
            lat,
            lng,
        }
    }

    #[tokio::test]
    async fn test_mock_chunks_by_capacity() {
        let points: Vec<ClusterPoint> = (0..5).map(|i| point(9.0 + i as f64 * 0.01, 38.7)).collect();
        let vehicles = vec![
            ClusterVehicle { vehicle_id: Uuid::new_v4(), capacity: 2 },
            ClusterVehicle { vehicle_id: Uuid::new_v4(), capacity: 2 },
        ];

        let result = MockClusterService.cluster(&points, &vehicles).await.unwrap();

        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.clusters[0].employee_ids.len(), 2);
        assert_eq!(result.clusters[1].employee_ids.len(), 2);
        assert_eq!(result.unassigned.len(), 1);
        assert_eq!(result.unassigned[0], points[4].employee_id);
    }

    #[tokio::test]
    async fn test_mock_no_vehicles_leaves_all_unassigned() {
        let points = vec![point(9.0, 38.7), point(9.1, 38.8)];

        let result = MockClusterService.cluster(&points, &[]).await.unwrap();

        assert!(result.clusters.is_empty());
        assert_eq!(result.unassigned.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_spare_capacity() {
        let points = vec![point(9.0, 38.7)];
        let vehicles = vec![ClusterVehicle { vehicle_id: Uuid::new_v4(), capacity: 10 }];

        let result = MockClusterService.cluster(&points, &vehicles).await.unwrap();

        assert_eq!(result.clusters[0].employee_ids.len(), 1);
        assert!(result.unassigned.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_without_url_uses_mock() {
        let service = create_cluster_service_with_fallback(None).await;
        assert_eq!(service.name(), "MockClustering");
    }

    #[test]
    fn test_service_names() {
        assert_eq!(MockClusterService.name(), "MockClustering");
    }
}
