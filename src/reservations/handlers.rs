use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{CreateReservationRequest, CreateReservationResponse};
use super::model::ReservationView;
use super::services::CreateReservation;
use crate::{auth::AuthUser, error::ApiError, state::AppState};

pub fn reservation_routes() -> Router<AppState> {
    Router::new()
        .route("/reservations", get(list_reservations).post(create_reservation))
        .route("/reservations/:id", delete(delete_reservation))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_reservations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ReservationView>>, ApiError> {
    let items = state.booking().list(&user.email).await?;
    Ok(Json(items))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateReservationResponse>), ApiError> {
    let Json(body) = payload?;
    let (Some(equipment_id), Some(start_date), Some(end_date)) =
        (body.equipment_id, body.start_date, body.end_date)
    else {
        warn!("reservation request with missing fields");
        return Err(ApiError::BadRequest("Missing required fields.".into()));
    };

    let created = state
        .booking()
        .create(CreateReservation {
            equipment_id,
            requester: user.email,
            start_date,
            end_date,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateReservationResponse {
            id: created.id,
            message: created.message,
        }),
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if state.booking().delete(id, &user.email).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Reservation not found.".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(email: &str) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: email.into(),
        }
    }

    fn body(equipment_id: Option<i64>, start: Option<&str>, end: Option<&str>) -> CreateReservationRequest {
        CreateReservationRequest {
            equipment_id,
            start_date: start.map(Into::into),
            end_date: end.map(Into::into),
        }
    }

    async fn create(
        state: &AppState,
        who: &str,
        req: CreateReservationRequest,
    ) -> Result<(StatusCode, Json<CreateReservationResponse>), ApiError> {
        create_reservation(State(state.clone()), user(who), Ok(Json(req))).await
    }

    #[tokio::test]
    async fn create_returns_201_with_id() {
        let (state, store) = AppState::fake();
        let (status, Json(res)) = create(
            &state,
            "alice@company.test",
            body(Some(1), Some("2026-03-10T09:00"), Some("2026-03-12T18:00")),
        )
        .await
        .expect("created");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(res.id, 1);
        assert_eq!(res.message, "Reservation created successfully.");
        assert_eq!(store.saves(), 1);
    }

    #[tokio::test]
    async fn missing_fields_are_bad_request() {
        let (state, store) = AppState::fake();
        let err = create(&state, "alice@company.test", body(Some(1), None, Some("2026-03-12T18:00")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing required fields.");
        assert_eq!(store.overlap_queries(), 0);
    }

    #[tokio::test]
    async fn unknown_equipment_and_bad_range_are_bad_request() {
        let (state, _store) = AppState::fake();
        let err = create(
            &state,
            "alice@company.test",
            body(Some(404), Some("2026-03-10T09:00"), Some("2026-03-12T18:00")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Equipment not found.");

        let err = create(
            &state,
            "alice@company.test",
            body(Some(1), Some("2026-03-12T18:00"), Some("2026-03-10T09:00")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "End date must be after start date.");
    }

    #[tokio::test]
    async fn overlap_is_409() {
        let (state, _store) = AppState::fake();
        let (status, _) = create(
            &state,
            "alice@company.test",
            body(Some(1), Some("2026-03-10T09:00"), Some("2026-03-12T18:00")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let err = create(
            &state,
            "bob@company.test",
            body(Some(1), Some("2026-03-10T10:00"), Some("2026-03-10T16:00")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn list_and_delete_are_scoped_to_caller() {
        let (state, _store) = AppState::fake();
        let (_, Json(created)) = create(
            &state,
            "alice@company.test",
            body(Some(2), Some("2026-03-15T10:00"), Some("2026-03-16T17:00")),
        )
        .await
        .unwrap();

        let Json(bob_items) = list_reservations(State(state.clone()), user("bob@company.test"))
            .await
            .unwrap();
        assert!(bob_items.is_empty());

        let err = delete_reservation(State(state.clone()), user("bob@company.test"), Ok(Path(created.id)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let Json(alice_items) = list_reservations(State(state.clone()), user("alice@company.test"))
            .await
            .unwrap();
        assert_eq!(alice_items.len(), 1);
        assert_eq!(alice_items[0].equipment.id, 2);

        let status = delete_reservation(State(state.clone()), user("alice@company.test"), Ok(Path(created.id)))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
