//! Vehicle availability message handlers

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::services::assembler::{route_window, validate_total_time};
use crate::services::availability;
use crate::types::{
    AvailableVehiclesRequest, AvailableVehiclesResponse, ErrorResponse, Request, SuccessResponse,
};

/// Handle vehicle.available messages: vehicles free for a shift/date
/// window of the proposed duration
pub async fn handle_available(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received vehicle.available message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<AvailableVehiclesRequest> = match serde_json::from_slice(&msg.payload)
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

        let payload = &request.payload;

        if let Err(e) = validate_total_time(payload.total_time_minutes) {
            let error = ErrorResponse::new(request.id, e.code(), e.to_string());
            let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            continue;
        }

        let shift = match queries::shift::find_shift(&pool, organization_id, payload.shift_id).await
        {
            Ok(Some(shift)) => shift,
            Ok(None) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "shift not found");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
            Err(e) => {
                error!("Failed to load shift: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let (start_time, end_time) =
            route_window(payload.date, shift.end_time, payload.total_time_minutes);

        match availability::find_available_vehicles(
            &pool,
            organization_id,
            payload.shift_id,
            payload.date,
            start_time,
            end_time,
        )
        .await
        {
            Ok(vehicles) => {
                let total = vehicles.len() as i64;
                let response = SuccessResponse::new(
                    request.id,
                    AvailableVehiclesResponse { vehicles, total },
                );
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to list available vehicles: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
