//! NATS message handlers

pub mod ping;
pub mod route;
pub mod vehicle;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use sqlx::PgPool;
use tokio::select;
use tracing::{error, info};

use crate::config::Config;
use crate::services::clustering::{create_cluster_service_with_fallback, ClusterService};

/// Start all message handlers
pub async fn start_handlers(client: Client, pool: PgPool, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    // Create the clustering service with automatic endpoint detection
    let cluster_service: Arc<dyn ClusterService> = Arc::from(
        create_cluster_service_with_fallback(config.clustering_url.clone()).await,
    );
    info!("Clustering service initialized: {}", cluster_service.name());

    // Subscribe to all subjects
    let ping_sub = client.subscribe("shuttle.ping").await?;
    let route_create_sub = client.subscribe("shuttle.route.create").await?;
    let route_update_sub = client.subscribe("shuttle.route.update").await?;
    let route_delete_sub = client.subscribe("shuttle.route.delete").await?;
    let route_restore_sub = client.subscribe("shuttle.route.restore").await?;
    let route_status_sub = client.subscribe("shuttle.route.status").await?;
    let route_get_sub = client.subscribe("shuttle.route.get").await?;
    let route_sequence_sub = client.subscribe("shuttle.route.sequence").await?;
    let route_map_sub = client.subscribe("shuttle.route.map").await?;
    let route_cluster_sub = client.subscribe("shuttle.route.cluster").await?;
    let stop_add_sub = client.subscribe("shuttle.route.stop.add").await?;
    let stop_remove_sub = client.subscribe("shuttle.route.stop.remove").await?;
    let vehicle_available_sub = client.subscribe("shuttle.vehicle.available").await?;

    info!("Subscribed to NATS subjects");

    // Clone for each handler
    let client_ping = client.clone();
    let client_route_create = client.clone();
    let client_route_update = client.clone();
    let client_route_delete = client.clone();
    let client_route_restore = client.clone();
    let client_route_status = client.clone();
    let client_route_get = client.clone();
    let client_route_sequence = client.clone();
    let client_route_map = client.clone();
    let client_route_cluster = client.clone();
    let client_stop_add = client.clone();
    let client_stop_remove = client.clone();
    let client_vehicle_available = client.clone();

    let pool_route_create = pool.clone();
    let pool_route_update = pool.clone();
    let pool_route_delete = pool.clone();
    let pool_route_restore = pool.clone();
    let pool_route_status = pool.clone();
    let pool_route_get = pool.clone();
    let pool_route_sequence = pool.clone();
    let pool_route_map = pool.clone();
    let pool_route_cluster = pool.clone();
    let pool_stop_add = pool.clone();
    let pool_stop_remove = pool.clone();
    let pool_vehicle_available = pool.clone();

    let cluster_service_route = Arc::clone(&cluster_service);

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub).await
    });

    let route_create_handle = tokio::spawn(async move {
        route::handle_create(client_route_create, route_create_sub, pool_route_create).await
    });

    let route_update_handle = tokio::spawn(async move {
        route::handle_update(client_route_update, route_update_sub, pool_route_update).await
    });

    let route_delete_handle = tokio::spawn(async move {
        route::handle_delete(client_route_delete, route_delete_sub, pool_route_delete).await
    });

    let route_restore_handle = tokio::spawn(async move {
        route::handle_restore(client_route_restore, route_restore_sub, pool_route_restore).await
    });

    let route_status_handle = tokio::spawn(async move {
        route::handle_status(client_route_status, route_status_sub, pool_route_status).await
    });

    let route_get_handle = tokio::spawn(async move {
        route::handle_get(client_route_get, route_get_sub, pool_route_get).await
    });

    let route_sequence_handle = tokio::spawn(async move {
        route::handle_sequence(client_route_sequence, route_sequence_sub, pool_route_sequence).await
    });

    let route_map_handle = tokio::spawn(async move {
        route::handle_map(client_route_map, route_map_sub, pool_route_map).await
    });

    let route_cluster_handle = tokio::spawn(async move {
        route::handle_cluster(
            client_route_cluster,
            route_cluster_sub,
            pool_route_cluster,
            cluster_service_route,
        )
        .await
    });

    let stop_add_handle = tokio::spawn(async move {
        route::handle_stop_add(client_stop_add, stop_add_sub, pool_stop_add).await
    });

    let stop_remove_handle = tokio::spawn(async move {
        route::handle_stop_remove(client_stop_remove, stop_remove_sub, pool_stop_remove).await
    });

    let vehicle_available_handle = tokio::spawn(async move {
        vehicle::handle_available(
            client_vehicle_available,
            vehicle_available_sub,
            pool_vehicle_available,
        )
        .await
    });

    info!("All handlers started, waiting for messages...");

    // Wait for any handler to finish (which means an error occurred)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = route_create_handle => {
            error!("Route create handler finished: {:?}", result);
        }
        result = route_update_handle => {
            error!("Route update handler finished: {:?}", result);
        }
        result = route_delete_handle => {
            error!("Route delete handler finished: {:?}", result);
        }
        result = route_restore_handle => {
            error!("Route restore handler finished: {:?}", result);
        }
        result = route_status_handle => {
            error!("Route status handler finished: {:?}", result);
        }
        result = route_get_handle => {
            error!("Route get handler finished: {:?}", result);
        }
        result = route_sequence_handle => {
            error!("Route sequence handler finished: {:?}", result);
        }
        result = route_map_handle => {
            error!("Route map handler finished: {:?}", result);
        }
        result = route_cluster_handle => {
            error!("Route cluster handler finished: {:?}", result);
        }
        result = stop_add_handle => {
            error!("Stop add handler finished: {:?}", result);
        }
        result = stop_remove_handle => {
            error!("Stop remove handler finished: {:?}", result);
        }
        result = vehicle_available_handle => {
            error!("Vehicle available handler finished: {:?}", result);
        }
    }

    Ok(())
}
