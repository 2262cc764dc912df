//! Route assembly message handlers

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use chrono::Utc;
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::services::assembler;
use crate::services::clustering::{ClusterPoint, ClusterService, ClusterVehicle};
use crate::services::error::ScheduleError;
use crate::services::map::project_stops;
use crate::services::route_status::derive_driver_status;
use crate::services::sequencer::{resolve_origin, sequence_stops};
use crate::types::{
    ChangeRouteStatusRequest, ClusterRouteRequest, CreateRouteRequest, ErrorResponse, Request,
    RouteDetailResponse, RouteIdRequest, RouteStopRequest, SequenceStopsRequest,
    SequencedStopsResponse, SuccessResponse, UpdateRouteRequest,
};

fn schedule_error(request_id: Uuid, error: &ScheduleError) -> ErrorResponse {
    ErrorResponse::new(request_id, error.code(), error.to_string())
}

/// Handle route.create messages
pub async fn handle_create(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.create message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CreateRouteRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match assembler::create_route(&pool, organization_id, &request.payload).await {
            Ok(route) => {
                let response = SuccessResponse::new(request.id, route);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to create route: {}", e);
                let error = schedule_error(request.id, &e);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle route.update messages
pub async fn handle_update(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UpdateRouteRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match assembler::update_route(&pool, organization_id, &request.payload).await {
            Ok(route) => {
                let response = SuccessResponse::new(request.id, route);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to update route: {}", e);
                let error = schedule_error(request.id, &e);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle route.delete messages (soft delete)
pub async fn handle_delete(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.delete message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<RouteIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match assembler::delete_route(&pool, organization_id, request.payload.route_id).await {
            Ok(deleted) => {
                let response = SuccessResponse::new(request.id, deleted);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to delete route: {}", e);
                let error = schedule_error(request.id, &e);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle route.restore messages
pub async fn handle_restore(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.restore message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<RouteIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match assembler::restore_route(&pool, organization_id, request.payload.route_id).await {
            Ok(route) => {
                let response = SuccessResponse::new(request.id, route);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to restore route: {}", e);
                let error = schedule_error(request.id, &e);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle route.status messages
pub async fn handle_status(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.status message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        // Unknown status strings fail here, before any lookup.
        let request: Request<ChangeRouteStatusRequest> = match serde_json::from_slice(&msg.payload)
        {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let payload = request.payload;
        match assembler::change_status(&pool, organization_id, payload.route_id, payload.status)
            .await
        {
            Ok(route) => {
                let response = SuccessResponse::new(request.id, route);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to change route status: {}", e);
                let error = schedule_error(request.id, &e);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle route.stop.add messages
pub async fn handle_stop_add(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.stop.add message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<RouteStopRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match assembler::add_stop(&pool, organization_id, &request.payload).await {
            Ok(route) => {
                let response = SuccessResponse::new(request.id, route);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to add stop to route: {}", e);
                let error = schedule_error(request.id, &e);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle route.stop.remove messages
pub async fn handle_stop_remove(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.stop.remove message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<RouteStopRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match assembler::remove_stop(&pool, organization_id, &request.payload).await {
            Ok(route) => {
                let response = SuccessResponse::new(request.id, route);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to remove stop from route: {}", e);
                let error = schedule_error(request.id, &e);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle route.get messages: route with ordered stops and driver status
pub async fn handle_get(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<RouteIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let route = match queries::route::find_route(&pool, organization_id, request.payload.route_id).await {
            Ok(Some(route)) => route,
            Ok(None) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "route not found");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
            Err(e) => {
                error!("Failed to load route: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match queries::stop::list_for_route(&pool, route.id).await {
            Ok(stops) => {
                let driver_status = derive_driver_status(&route, Utc::now());
                let response = SuccessResponse::new(
                    request.id,
                    RouteDetailResponse {
                        route,
                        stops,
                        driver_status,
                    },
                );
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to load route stops: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle route.sequence messages: preview the greedy visiting order for
/// a set of employees
pub async fn handle_sequence(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.sequence message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<SequenceStopsRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let payload = &request.payload;
        if payload.employee_ids.is_empty() {
            let response = SuccessResponse::new(
                request.id,
                SequencedStopsResponse { stops: vec![], origin: None },
            );
            let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            continue;
        }

        // HQ is only a fallback; a missing organization row just means no
        // default origin.
        let hq = match queries::organization::find_organization(&pool, organization_id).await {
            Ok(Some(org)) => org.hq_coordinates(),
            Ok(None) => {
                warn!("Organization {} not found, sequencing without HQ origin", organization_id);
                None
            }
            Err(e) => {
                error!("Failed to load organization: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match queries::stop::list_for_employees(&pool, organization_id, &payload.employee_ids).await
        {
            Ok(stops) => {
                let origin = resolve_origin(payload.origin, hq);
                let ordered = sequence_stops(stops, origin);
                let response = SuccessResponse::new(
                    request.id,
                    SequencedStopsResponse { stops: ordered, origin },
                );
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to load stops for sequencing: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle route.map messages: display payload for an ordered route
pub async fn handle_map(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.map message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<RouteIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let route = match queries::route::find_route(&pool, organization_id, request.payload.route_id).await {
            Ok(Some(route)) => route,
            Ok(None) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "route not found");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
            Err(e) => {
                error!("Failed to load route: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match queries::stop::list_for_route(&pool, route.id).await {
            Ok(stops) => {
                let map = project_stops(&stops);
                let response = SuccessResponse::new(request.id, map);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to load route stops: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle route.cluster messages: delegate grouping to the external
/// clustering endpoint
pub async fn handle_cluster(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    cluster_service: Arc<dyn ClusterService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.cluster message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ClusterRouteRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let organization_id = match request.organization_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "MISSING_ORGANIZATION",
                    "Organization ID required",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let payload = &request.payload;

        let stops = match queries::stop::list_for_employees(&pool, organization_id, &payload.employee_ids).await {
            Ok(stops) => stops,
            Err(e) => {
                error!("Failed to load stops for clustering: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let vehicles = match queries::vehicle::list_by_ids(&pool, organization_id, &payload.vehicle_ids).await {
            Ok(vehicles) => vehicles,
            Err(e) => {
                error!("Failed to load vehicles for clustering: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        // The endpoint only understands located employees; everything else
        // comes back as unassigned.
        let points: Vec<ClusterPoint> = stops
            .iter()
            .filter_map(|stop| {
                let coords = stop.coordinates()?;
                let employee_id = stop.employee_id?;
                Some(ClusterPoint {
                    employee_id,
                    lat: coords.lat,
                    lng: coords.lng,
                })
            })
            .collect();
        let located: HashSet<Uuid> = points.iter().map(|p| p.employee_id).collect();

        let capacities: Vec<ClusterVehicle> = vehicles
            .iter()
            .map(|vehicle| ClusterVehicle {
                vehicle_id: vehicle.id,
                capacity: vehicle.capacity,
            })
            .collect();

        match cluster_service.cluster(&points, &capacities).await {
            Ok(mut result) => {
                result.unassigned.extend(
                    payload
                        .employee_ids
                        .iter()
                        .copied()
                        .filter(|id| !located.contains(id)),
                );
                let response = SuccessResponse::new(request.id, result);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Clustering endpoint failed: {}", e);
                let error = ErrorResponse::new(request.id, "CLUSTERING_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
